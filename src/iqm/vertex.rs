//! Vertex and index stage of the import: attribute arrays, triangles, tangent frames and bounds.

use glam::Vec2;
use glam::Vec3;
use glam::Vec4;

use crate::iqm::format;
use crate::iqm::format::BoundsRecord;
use crate::iqm::format::Header;
use crate::iqm::format::MeshRecord;
use crate::iqm::format::TextTable;
use crate::iqm::format::VertexArray;
use crate::iqm::ImportError;
use crate::mesh::Attribute;
use crate::mesh::BoundingBox;
use crate::mesh::BoundingSphere;
use crate::mesh::MeshData;
use crate::mesh::PrimitiveType;
use crate::mesh::Submesh;
use crate::Diagnostics;
use crate::Severity;

/// Attribute arrays of the file, one entry per vertex.
#[derive(Debug, Default)]
struct Streams {
    positions: Option<Vec<Vec3>>,
    colours: Option<Vec<[u8; 4]>>,
    normals: Option<Vec<Vec3>>,
    tangents: Option<Vec<Vec4>>,
    uvs: Option<Vec<Vec2>>,
    blend_indices: Option<Vec<[u8; 4]>>,
    blend_weights: Option<Vec<[u8; 4]>>,
}

/// Normals, tangents and bitangents of every vertex.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct TangentFrames {
    pub normals: Vec<Vec3>,
    pub tangents: Option<Vec<Vec3>>,
    pub bitangents: Option<Vec<Vec3>>,
}

/// Builds the mesh of the file. Returns an empty mesh if the file has no vertices.
pub(crate) fn build_mesh(
    bytes: &[u8],
    header: &Header,
    text: &TextTable,
    diagnostics: &dyn Diagnostics,
) -> Result<MeshData, ImportError> {
    let vertex_count = header.num_vertexes as usize;
    if vertex_count == 0 {
        return Ok(MeshData::default());
    }

    let streams = read_streams(bytes, header, diagnostics)?;
    let Some(positions) = streams.positions else {
        diagnostics.log("file has vertices but no position array", Severity::Warning);
        return Ok(MeshData::default());
    };

    let triangles = format::read_table(
        bytes,
        "triangle",
        header.ofs_triangles,
        header.num_triangles,
        format::TRIANGLE_SIZE,
        format::read_triangle,
    )?;
    if let Some(index) = triangles.iter().flatten().find(|index| **index >= header.num_vertexes) {
        return Err(ImportError::InvalidFormat(format!(
            "triangle references vertex {index} of {vertex_count}"
        )));
    }

    let meshes = format::read_table(
        bytes,
        "mesh",
        header.ofs_meshes,
        header.num_meshes,
        format::MESH_SIZE,
        MeshRecord::read,
    )?;
    let submeshes = build_submeshes(&meshes, &triangles, text)?;

    let frames = match (streams.normals, streams.tangents) {
        (Some(normals), Some(tangents)) => explicit_tangent_frames(normals, &tangents),
        _ => {
            diagnostics.log("calculating missing tangents", Severity::Info);
            synthesize_tangent_frames(&positions, streams.uvs.as_deref(), &triangles)
        }
    };

    let mut attributes = [0; Attribute::COUNT];
    attributes[Attribute::Position.slot()] = 3;
    attributes[Attribute::Normal.slot()] = 3;
    if streams.colours.is_some() {
        attributes[Attribute::Colour.slot()] = 4;
    }
    if frames.tangents.is_some() {
        attributes[Attribute::Tangent.slot()] = 3;
    }
    if frames.bitangents.is_some() {
        attributes[Attribute::Bitangent.slot()] = 3;
    }
    if streams.uvs.is_some() {
        attributes[Attribute::UV0.slot()] = 2;
    }
    if streams.blend_indices.is_some() {
        attributes[Attribute::BlendIndices.slot()] = 4;
    }
    if streams.blend_weights.is_some() {
        attributes[Attribute::BlendWeights.slot()] = 4;
    }

    let floats_per_vertex = attributes.iter().sum::<u32>() as usize;
    let mut vertex_data = Vec::with_capacity(vertex_count * floats_per_vertex);
    for i in 0..vertex_count {
        vertex_data.extend_from_slice(&positions[i].to_array());
        if let Some(colours) = &streams.colours {
            vertex_data.extend(colours[i].iter().map(|c| f32::from(*c) / 255.0));
        }
        vertex_data.extend_from_slice(&frames.normals[i].to_array());
        if let Some(tangents) = &frames.tangents {
            vertex_data.extend_from_slice(&tangents[i].to_array());
        }
        if let Some(bitangents) = &frames.bitangents {
            vertex_data.extend_from_slice(&bitangents[i].to_array());
        }
        if let Some(uvs) = &streams.uvs {
            vertex_data.extend_from_slice(&uvs[i].to_array());
        }
        if let Some(blend_indices) = &streams.blend_indices {
            vertex_data.extend(blend_indices[i].iter().map(|index| f32::from(*index)));
        }
        if let Some(blend_weights) = &streams.blend_weights {
            vertex_data.extend(blend_weights[i].iter().map(|w| f32::from(*w) / 255.0));
        }
    }

    let (bounding_box, radius) = if header.ofs_bounds > 0 {
        let bounds = format::read_table(
            bytes,
            "bounds",
            header.ofs_bounds,
            1,
            format::BOUNDS_SIZE,
            BoundsRecord::read,
        )?;
        let bounds = bounds[0];
        (BoundingBox::new(bounds.min, bounds.max), bounds.radius)
    } else {
        let bounding_box = measure_bounds(&positions);
        (bounding_box, bounding_box.diagonal() / 2.0)
    };

    Ok(MeshData {
        vertex_data,
        vertex_stride: floats_per_vertex * std::mem::size_of::<f32>(),
        vertex_count,
        attributes,
        submeshes,
        bounding_sphere: BoundingSphere {
            center: bounding_box.center(),
            radius,
        },
        bounding_box,
    })
}

fn read_streams(
    bytes: &[u8],
    header: &Header,
    diagnostics: &dyn Diagnostics,
) -> Result<Streams, ImportError> {
    let arrays = format::read_table(
        bytes,
        "vertex array",
        header.ofs_vertex_arrays,
        header.num_vertex_arrays,
        format::VERTEX_ARRAY_SIZE,
        VertexArray::read,
    )?;

    let count = header.num_vertexes;
    let mut streams = Streams::default();
    for array in arrays {
        let expected = match array.kind {
            format::POSITION | format::NORMAL => Some((format::FORMAT_FLOAT, 3)),
            format::TANGENT => Some((format::FORMAT_FLOAT, 4)),
            format::TEXCOORD => Some((format::FORMAT_FLOAT, 2)),
            format::BLEND_INDEXES | format::BLEND_WEIGHTS | format::COLOR => {
                Some((format::FORMAT_UBYTE, 4))
            }
            _ => None,
        };

        match expected {
            Some(expected) if expected == (array.format, array.size) => {}
            Some(_) => {
                diagnostics.log(
                    &format!(
                        "skipping vertex array {} with format {} and size {}",
                        array.kind, array.format, array.size
                    ),
                    Severity::Warning,
                );
                continue;
            }
            None => {
                diagnostics.log(
                    &format!("skipping unsupported vertex array {}", array.kind),
                    Severity::Warning,
                );
                continue;
            }
        }

        match array.kind {
            format::POSITION => {
                let floats = read_floats(bytes, "position", array.offset, count, 3)?;
                streams.positions = Some(floats.chunks_exact(3).map(Vec3::from_slice).collect());
            }
            format::NORMAL => {
                let floats = read_floats(bytes, "normal", array.offset, count, 3)?;
                streams.normals = Some(floats.chunks_exact(3).map(Vec3::from_slice).collect());
            }
            format::TANGENT => {
                let floats = read_floats(bytes, "tangent", array.offset, count, 4)?;
                streams.tangents = Some(floats.chunks_exact(4).map(Vec4::from_slice).collect());
            }
            format::TEXCOORD => {
                let floats = read_floats(bytes, "texcoord", array.offset, count, 2)?;
                streams.uvs = Some(floats.chunks_exact(2).map(Vec2::from_slice).collect());
            }
            format::BLEND_INDEXES => {
                streams.blend_indices = Some(read_ubytes(bytes, "blend index", array.offset, count)?);
            }
            format::BLEND_WEIGHTS => {
                streams.blend_weights =
                    Some(read_ubytes(bytes, "blend weight", array.offset, count)?);
            }
            _ => {
                streams.colours = Some(read_ubytes(bytes, "colour", array.offset, count)?);
            }
        }
    }

    Ok(streams)
}

fn read_floats(
    bytes: &[u8],
    name: &str,
    offset: u32,
    count: u32,
    components: u32,
) -> Result<Vec<f32>, ImportError> {
    let count = count.checked_mul(components).ok_or_else(|| {
        ImportError::InvalidFormat(format!("{name} array of {count} vertices is too large"))
    })?;
    let data = format::table(bytes, name, offset, count, std::mem::size_of::<f32>())?;

    Ok(data
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn read_ubytes(
    bytes: &[u8],
    name: &str,
    offset: u32,
    count: u32,
) -> Result<Vec<[u8; 4]>, ImportError> {
    let data = format::table(bytes, name, offset, count, 4)?;

    Ok(data
        .chunks_exact(4)
        .map(|chunk| [chunk[0], chunk[1], chunk[2], chunk[3]])
        .collect())
}

fn build_submeshes(
    meshes: &[MeshRecord],
    triangles: &[[u32; 3]],
    text: &TextTable,
) -> Result<Vec<Submesh>, ImportError> {
    if meshes.is_empty() {
        if triangles.is_empty() {
            return Ok(Vec::new());
        }

        return Ok(vec![Submesh {
            indices: reverse_winding(triangles),
            ..Submesh::default()
        }]);
    }

    meshes
        .iter()
        .map(|mesh| {
            let start = mesh.first_triangle as usize;
            let range = triangles
                .get(start..start + mesh.num_triangles as usize)
                .ok_or_else(|| {
                    ImportError::InvalidFormat(format!(
                        "mesh {:?} references triangles outside the triangle table",
                        text.get(mesh.name)
                    ))
                })?;

            Ok(Submesh {
                name: text.get(mesh.name),
                material: text.get(mesh.material),
                indices: reverse_winding(range),
                primitive_type: PrimitiveType::Triangles,
            })
        })
        .collect()
}

/// Flattens the triangles into indices, emitting the vertices of each triangle in reverse order.
pub(crate) fn reverse_winding(triangles: &[[u32; 3]]) -> Vec<u32> {
    triangles
        .iter()
        .flat_map(|[a, b, c]| [*c, *b, *a])
        .collect()
}

/// Drops the handedness of the file's tangents, deriving the bitangent from it instead.
pub(crate) fn explicit_tangent_frames(normals: Vec<Vec3>, tangents: &[Vec4]) -> TangentFrames {
    let bitangents = normals
        .iter()
        .zip(tangents)
        .map(|(normal, tangent)| normal.cross(tangent.truncate()) * -tangent.w)
        .collect();

    TangentFrames {
        tangents: Some(tangents.iter().map(|tangent| tangent.truncate()).collect()),
        bitangents: Some(bitangents),
        normals,
    }
}

/// Computes vertex normals from the faces and, given texture coordinates, tangents and
/// bitangents from the UV gradients. Each vertex accumulates the vectors of its faces.
pub(crate) fn synthesize_tangent_frames(
    positions: &[Vec3],
    uvs: Option<&[Vec2]>,
    triangles: &[[u32; 3]],
) -> TangentFrames {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    let mut tangents = vec![Vec3::ZERO; positions.len()];
    let mut bitangents = vec![Vec3::ZERO; positions.len()];

    for &triangle in triangles {
        let [a, b, c] = triangle.map(|index| index as usize);

        let delta_pos1 = positions[b] - positions[a];
        let delta_pos2 = positions[c] - positions[a];
        let face_normal = -delta_pos1.cross(delta_pos2);
        for index in [a, b, c] {
            normals[index] += face_normal;
        }

        let Some(uvs) = uvs else {
            continue;
        };

        let delta_uv1 = uvs[b] - uvs[a];
        let delta_uv2 = uvs[c] - uvs[a];
        let sign = 1.0 / (delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x);
        if !sign.is_finite() {
            continue;
        }

        let face_tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * sign;
        let face_bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * sign;
        for index in [a, b, c] {
            tangents[index] += face_tangent;
            bitangents[index] += face_bitangent;
        }
    }

    let normalize = |vectors: Vec<Vec3>| -> Vec<Vec3> {
        vectors.into_iter().map(Vec3::normalize_or_zero).collect()
    };

    match uvs {
        Some(_) => TangentFrames {
            normals: normalize(normals),
            tangents: Some(normalize(tangents)),
            bitangents: Some(normalize(bitangents)),
        },
        None => TangentFrames {
            normals: normalize(normals),
            tangents: None,
            bitangents: None,
        },
    }
}

/// Returns the smallest box containing every position.
pub(crate) fn measure_bounds(positions: &[Vec3]) -> BoundingBox {
    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for position in positions {
        min = min.min(*position);
        max = max.max(*position);
    }

    if positions.is_empty() {
        BoundingBox::default()
    } else {
        BoundingBox::new(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: [Vec3; 3] = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ];

    #[test]
    fn reverse_winding_emits_last_vertex_first() {
        let indices = reverse_winding(&[[0, 1, 2], [3, 4, 5]]);

        assert_eq!(indices, vec![2, 1, 0, 5, 4, 3]);
    }

    #[test]
    fn synthesize_tangent_frames_with_uvs_follows_uv_gradient() {
        let uvs = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];

        let frames = synthesize_tangent_frames(&TRIANGLE, Some(&uvs), &[[0, 1, 2]]);

        let tangents = frames.tangents.unwrap();
        let bitangents = frames.bitangents.unwrap();
        for i in 0..3 {
            assert!(frames.normals[i].abs_diff_eq(Vec3::NEG_Z, 1e-6));
            assert!(tangents[i].abs_diff_eq(Vec3::X, 1e-6));
            assert!(bitangents[i].abs_diff_eq(Vec3::Y, 1e-6));
        }
    }

    #[test]
    fn synthesize_tangent_frames_without_uvs_returns_normals_only() {
        let frames = synthesize_tangent_frames(&TRIANGLE, None, &[[0, 1, 2]]);

        assert_eq!(frames.normals.len(), 3);
        assert_eq!(frames.tangents, None);
        assert_eq!(frames.bitangents, None);
    }

    #[test]
    fn synthesize_tangent_frames_with_degenerate_uvs_keeps_normals() {
        let uvs = [Vec2::ZERO; 3];

        let frames = synthesize_tangent_frames(&TRIANGLE, Some(&uvs), &[[0, 1, 2]]);

        assert!(frames.normals[0].abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert_eq!(frames.tangents.unwrap()[0], Vec3::ZERO);
    }

    #[test]
    fn explicit_tangent_frames_flips_bitangent_with_handedness() {
        let normals = vec![Vec3::Z, Vec3::Z];
        let tangents = [Vec4::new(1.0, 0.0, 0.0, 1.0), Vec4::new(1.0, 0.0, 0.0, -1.0)];

        let frames = explicit_tangent_frames(normals, &tangents);

        let bitangents = frames.bitangents.unwrap();
        assert_eq!(bitangents[0], Vec3::NEG_Y);
        assert_eq!(bitangents[1], Vec3::Y);
        assert_eq!(frames.tangents.unwrap()[0], Vec3::X);
    }

    #[test]
    fn measure_bounds_returns_min_and_max_per_axis() {
        let positions = [Vec3::new(-1.0, 2.0, 0.5), Vec3::new(3.0, -4.0, 0.25)];

        let bounds = measure_bounds(&positions);

        assert_eq!(bounds.min, Vec3::new(-1.0, -4.0, 0.25));
        assert_eq!(bounds.max, Vec3::new(3.0, 2.0, 0.5));
    }
}
