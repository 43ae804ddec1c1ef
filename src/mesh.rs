//! # Mesh Data
//!
//! CPU side description of an imported mesh, ready to be uploaded by a renderer.

use glam::Vec3;

/// # Attribute
///
/// Vertex attributes in the order they are interleaved in [MeshData::vertex_data].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Attribute {
    /// Position, 3 floats.
    Position,
    /// Vertex colour, 4 floats in `0..=1`.
    Colour,
    /// Normal, 3 floats.
    Normal,
    /// Tangent, 3 floats.
    Tangent,
    /// Bitangent, 3 floats.
    Bitangent,
    /// First texture coordinate set, 2 floats.
    UV0,
    /// Joint indices, 4 floats holding whole numbers.
    BlendIndices,
    /// Joint weights, 4 floats in `0..=1`.
    BlendWeights,
}

impl Attribute {
    /// Number of attributes.
    pub const COUNT: usize = 8;

    /// Every attribute in interleaving order.
    pub const ALL: [Attribute; Self::COUNT] = [
        Attribute::Position,
        Attribute::Colour,
        Attribute::Normal,
        Attribute::Tangent,
        Attribute::Bitangent,
        Attribute::UV0,
        Attribute::BlendIndices,
        Attribute::BlendWeights,
    ];

    /// Returns the slot of the attribute in the interleaving order.
    pub const fn slot(self) -> usize {
        self as usize
    }
}

/// # Primitive Type
///
/// IQM files only describe triangle lists.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum PrimitiveType {
    /// Every three indices form a triangle.
    #[default]
    Triangles,
}

/// # Submesh
///
/// Index buffer drawing part of the mesh with a single material.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Submesh {
    /// Name of the submesh.
    pub name: String,
    /// Name of the material assigned in the source file.
    pub material: String,
    /// Vertex indices.
    pub indices: Vec<u32>,
    /// How the indices are assembled into primitives.
    pub primitive_type: PrimitiveType,
}

impl Submesh {
    /// Returns the number of indices.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Returns the indices as bytes for upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// # Bounding Box
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl BoundingBox {
    /// Returns a box with the given corners.
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Returns the midpoint of the box.
    pub fn center(&self) -> Vec3 {
        self.min + (self.max - self.min) / 2.0
    }

    /// Returns the length of the diagonal.
    pub fn diagonal(&self) -> f32 {
        (self.max - self.min).length()
    }
}

/// # Bounding Sphere
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BoundingSphere {
    /// Centre of the sphere.
    pub center: Vec3,
    /// Radius of the sphere.
    pub radius: f32,
}

/// # Mesh Data
///
/// Interleaved vertex buffer, per-submesh index buffers and bounds of one mesh. A mesh with no
/// vertices is what a failed import produces.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    /// Interleaved vertex data, [MeshData::vertex_stride] bytes per vertex.
    pub vertex_data: Vec<f32>,
    /// Size of one vertex in bytes.
    pub vertex_stride: usize,
    /// Number of vertices.
    pub vertex_count: usize,
    /// Number of floats per attribute, indexed by [Attribute::slot]. Zero if absent.
    pub attributes: [u32; Attribute::COUNT],
    /// Index buffers.
    pub submeshes: Vec<Submesh>,
    /// Axis aligned bounds of the mesh.
    pub bounding_box: BoundingBox,
    /// Bounding sphere of the mesh.
    pub bounding_sphere: BoundingSphere,
}

impl MeshData {
    /// Returns true if the mesh has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }

    /// Returns the number of floats of the attribute in each vertex, or zero if absent.
    pub fn attribute_size(&self, attribute: Attribute) -> u32 {
        self.attributes[attribute.slot()]
    }

    /// Returns true if the vertices contain the attribute.
    pub fn has_attribute(&self, attribute: Attribute) -> bool {
        self.attribute_size(attribute) > 0
    }

    /// Returns the offset of the attribute within a vertex, in floats.
    pub fn attribute_offset(&self, attribute: Attribute) -> Option<usize> {
        if !self.has_attribute(attribute) {
            return None;
        }

        Some(
            self.attributes[..attribute.slot()]
                .iter()
                .map(|size| *size as usize)
                .sum(),
        )
    }

    /// Returns the floats of one vertex.
    pub fn vertex(&self, index: usize) -> Option<&[f32]> {
        let floats = self.vertex_stride / std::mem::size_of::<f32>();
        self.vertex_data.get(index * floats..(index + 1) * floats)
    }

    /// Returns the floats of one attribute of one vertex.
    pub fn vertex_attribute(&self, index: usize, attribute: Attribute) -> Option<&[f32]> {
        let offset = self.attribute_offset(attribute)?;
        let size = self.attribute_size(attribute) as usize;
        self.vertex(index)?.get(offset..offset + size)
    }

    /// Returns the vertex data as bytes for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertex_data)
    }
}
