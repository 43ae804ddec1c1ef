//! Binary layout of IQM version 2 files. Every field is little-endian and read without alignment
//! assumptions.

use glam::Quat;
use glam::Vec3;

use crate::iqm::ImportError;

pub(crate) const MAGIC: &[u8; 16] = b"INTERQUAKEMODEL\0";
pub(crate) const VERSION: u32 = 2;
pub(crate) const HEADER_SIZE: usize = 124;

pub(crate) const VERTEX_ARRAY_SIZE: usize = 20;
pub(crate) const MESH_SIZE: usize = 24;
pub(crate) const TRIANGLE_SIZE: usize = 12;
pub(crate) const JOINT_SIZE: usize = 48;
pub(crate) const POSE_SIZE: usize = 88;
pub(crate) const ANIM_SIZE: usize = 20;
pub(crate) const BOUNDS_SIZE: usize = 32;

pub(crate) const POSITION: u32 = 0;
pub(crate) const TEXCOORD: u32 = 1;
pub(crate) const NORMAL: u32 = 2;
pub(crate) const TANGENT: u32 = 3;
pub(crate) const BLEND_INDEXES: u32 = 4;
pub(crate) const BLEND_WEIGHTS: u32 = 5;
pub(crate) const COLOR: u32 = 6;

pub(crate) const FORMAT_UBYTE: u32 = 1;
pub(crate) const FORMAT_FLOAT: u32 = 7;

pub(crate) const ANIM_LOOP: u32 = 1;

/// Number of channels of a pose: translation, rotation and scale.
pub(crate) const POSE_CHANNELS: usize = 10;

/// Cursor over a byte slice failing with [ImportError::InvalidFormat] when it runs past the end.
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub(crate) fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], ImportError> {
        let end = self.position + N;
        let bytes = self
            .bytes
            .get(self.position..end)
            .and_then(|bytes| <[u8; N]>::try_from(bytes).ok())
            .ok_or_else(|| {
                ImportError::InvalidFormat(format!("unexpected end of data at byte {}", self.position))
            })?;
        self.position = end;
        Ok(bytes)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, ImportError> {
        Ok(u16::from_le_bytes(self.read_bytes()?))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, ImportError> {
        Ok(u32::from_le_bytes(self.read_bytes()?))
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32, ImportError> {
        Ok(i32::from_le_bytes(self.read_bytes()?))
    }

    pub(crate) fn read_f32(&mut self) -> Result<f32, ImportError> {
        Ok(f32::from_le_bytes(self.read_bytes()?))
    }

    pub(crate) fn read_vec3(&mut self) -> Result<Vec3, ImportError> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }
}

/// Returns the bytes of a table of `count` records of `record_size` bytes at `offset`.
pub(crate) fn table<'a>(
    bytes: &'a [u8],
    name: &str,
    offset: u32,
    count: u32,
    record_size: usize,
) -> Result<&'a [u8], ImportError> {
    let start = offset as usize;
    (count as usize)
        .checked_mul(record_size)
        .and_then(|length| start.checked_add(length))
        .and_then(|end| bytes.get(start..end))
        .ok_or_else(|| {
            ImportError::InvalidFormat(format!(
                "{name} table of {count} entries at byte {offset} exceeds the file"
            ))
        })
}

/// Reads a table of `count` records of `record_size` bytes at `offset`.
pub(crate) fn read_table<T>(
    bytes: &[u8],
    name: &str,
    offset: u32,
    count: u32,
    record_size: usize,
    read: impl Fn(&mut Reader) -> Result<T, ImportError>,
) -> Result<Vec<T>, ImportError> {
    let mut reader = Reader::new(table(bytes, name, offset, count, record_size)?);
    (0..count).map(|_| read(&mut reader)).collect()
}

/// Header of an IQM file.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Header {
    pub file_size: u32,
    pub num_text: u32,
    pub ofs_text: u32,
    pub num_meshes: u32,
    pub ofs_meshes: u32,
    pub num_vertex_arrays: u32,
    pub num_vertexes: u32,
    pub ofs_vertex_arrays: u32,
    pub num_triangles: u32,
    pub ofs_triangles: u32,
    pub num_joints: u32,
    pub ofs_joints: u32,
    pub num_poses: u32,
    pub ofs_poses: u32,
    pub num_anims: u32,
    pub ofs_anims: u32,
    pub num_frames: u32,
    pub num_frame_channels: u32,
    pub ofs_frames: u32,
    pub ofs_bounds: u32,
}

impl Header {
    /// Reads the header, checking the buffer size, magic and version in that order.
    pub(crate) fn parse(bytes: &[u8]) -> Result<Self, ImportError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ImportError::InvalidFormat(format!(
                "file of {} bytes is smaller than the header",
                bytes.len()
            )));
        }

        let mut reader = Reader::new(bytes);
        let magic = reader.read_bytes::<16>()?;
        if &magic != MAGIC {
            return Err(ImportError::InvalidFormat(format!(
                "not an IQM file, found magic {:?}",
                String::from_utf8_lossy(&magic).trim_end_matches('\0')
            )));
        }

        let version = reader.read_u32()?;
        if version != VERSION {
            return Err(ImportError::UnsupportedVersion {
                found: version,
                expected: VERSION,
            });
        }

        let file_size = reader.read_u32()?;
        let _flags = reader.read_u32()?;
        let num_text = reader.read_u32()?;
        let ofs_text = reader.read_u32()?;
        let num_meshes = reader.read_u32()?;
        let ofs_meshes = reader.read_u32()?;
        let num_vertex_arrays = reader.read_u32()?;
        let num_vertexes = reader.read_u32()?;
        let ofs_vertex_arrays = reader.read_u32()?;
        let num_triangles = reader.read_u32()?;
        let ofs_triangles = reader.read_u32()?;
        let _ofs_adjacency = reader.read_u32()?;
        let num_joints = reader.read_u32()?;
        let ofs_joints = reader.read_u32()?;
        let num_poses = reader.read_u32()?;
        let ofs_poses = reader.read_u32()?;
        let num_anims = reader.read_u32()?;
        let ofs_anims = reader.read_u32()?;
        let num_frames = reader.read_u32()?;
        let num_frame_channels = reader.read_u32()?;
        let ofs_frames = reader.read_u32()?;
        let ofs_bounds = reader.read_u32()?;

        Ok(Self {
            file_size,
            num_text,
            ofs_text,
            num_meshes,
            ofs_meshes,
            num_vertex_arrays,
            num_vertexes,
            ofs_vertex_arrays,
            num_triangles,
            ofs_triangles,
            num_joints,
            ofs_joints,
            num_poses,
            ofs_poses,
            num_anims,
            ofs_anims,
            num_frames,
            num_frame_channels,
            ofs_frames,
            ofs_bounds,
        })
    }
}

/// Null terminated strings referenced by byte offset.
pub(crate) struct TextTable<'a> {
    bytes: &'a [u8],
}

impl<'a> TextTable<'a> {
    pub(crate) fn read(bytes: &'a [u8], header: &Header) -> Result<Self, ImportError> {
        Ok(Self {
            bytes: table(bytes, "text", header.ofs_text, header.num_text, 1)?,
        })
    }

    /// Returns the string at the offset, or an empty string if the offset is outside the table.
    pub(crate) fn get(&self, offset: u32) -> String {
        let Some(rest) = self.bytes.get(offset as usize..) else {
            return String::new();
        };
        let end = rest.iter().position(|byte| *byte == 0).unwrap_or(rest.len());
        String::from_utf8_lossy(&rest[..end]).into_owned()
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct VertexArray {
    pub kind: u32,
    pub format: u32,
    pub size: u32,
    pub offset: u32,
}

impl VertexArray {
    pub(crate) fn read(reader: &mut Reader) -> Result<Self, ImportError> {
        let kind = reader.read_u32()?;
        let _flags = reader.read_u32()?;
        Ok(Self {
            kind,
            format: reader.read_u32()?,
            size: reader.read_u32()?,
            offset: reader.read_u32()?,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct MeshRecord {
    pub name: u32,
    pub material: u32,
    pub first_triangle: u32,
    pub num_triangles: u32,
}

impl MeshRecord {
    pub(crate) fn read(reader: &mut Reader) -> Result<Self, ImportError> {
        let name = reader.read_u32()?;
        let material = reader.read_u32()?;
        let _first_vertex = reader.read_u32()?;
        let _num_vertexes = reader.read_u32()?;
        Ok(Self {
            name,
            material,
            first_triangle: reader.read_u32()?,
            num_triangles: reader.read_u32()?,
        })
    }
}

pub(crate) fn read_triangle(reader: &mut Reader) -> Result<[u32; 3], ImportError> {
    Ok([reader.read_u32()?, reader.read_u32()?, reader.read_u32()?])
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct JointRecord {
    pub name: u32,
    pub parent: i32,
    pub translate: Vec3,
    pub rotate: Quat,
    pub scale: Vec3,
}

impl JointRecord {
    pub(crate) fn read(reader: &mut Reader) -> Result<Self, ImportError> {
        Ok(Self {
            name: reader.read_u32()?,
            parent: reader.read_i32()?,
            translate: reader.read_vec3()?,
            rotate: Quat::from_xyzw(
                reader.read_f32()?,
                reader.read_f32()?,
                reader.read_f32()?,
                reader.read_f32()?,
            ),
            scale: reader.read_vec3()?,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct PoseRecord {
    pub parent: i32,
    pub mask: u32,
    pub channel_offset: [f32; POSE_CHANNELS],
    pub channel_scale: [f32; POSE_CHANNELS],
}

impl PoseRecord {
    pub(crate) fn read(reader: &mut Reader) -> Result<Self, ImportError> {
        let parent = reader.read_i32()?;
        let mask = reader.read_u32()?;
        let mut channel_offset = [0.0; POSE_CHANNELS];
        for value in &mut channel_offset {
            *value = reader.read_f32()?;
        }
        let mut channel_scale = [0.0; POSE_CHANNELS];
        for value in &mut channel_scale {
            *value = reader.read_f32()?;
        }

        Ok(Self {
            parent,
            mask,
            channel_offset,
            channel_scale,
        })
    }

    /// Returns the number of channels stored in the frame data.
    pub(crate) fn animated_channels(&self) -> usize {
        (0..POSE_CHANNELS).filter(|channel| self.is_animated(*channel)).count()
    }

    pub(crate) fn is_animated(&self, channel: usize) -> bool {
        self.mask & (1 << channel) != 0
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct AnimRecord {
    pub name: u32,
    pub first_frame: u32,
    pub num_frames: u32,
    pub frame_rate: f32,
    pub flags: u32,
}

impl AnimRecord {
    pub(crate) fn read(reader: &mut Reader) -> Result<Self, ImportError> {
        Ok(Self {
            name: reader.read_u32()?,
            first_frame: reader.read_u32()?,
            num_frames: reader.read_u32()?,
            frame_rate: reader.read_f32()?,
            flags: reader.read_u32()?,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct BoundsRecord {
    pub min: Vec3,
    pub max: Vec3,
    pub radius: f32,
}

impl BoundsRecord {
    pub(crate) fn read(reader: &mut Reader) -> Result<Self, ImportError> {
        let min = reader.read_vec3()?;
        let max = reader.read_vec3()?;
        let _xy_radius = reader.read_f32()?;
        Ok(Self {
            min,
            max,
            radius: reader.read_f32()?,
        })
    }
}
