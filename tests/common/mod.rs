#![allow(dead_code)]

//! Writes IQM files in memory for the integration tests.

pub const MAGIC: &[u8; 16] = b"INTERQUAKEMODEL\0";

pub const POSITION: u32 = 0;
pub const TEXCOORD: u32 = 1;
pub const NORMAL: u32 = 2;
pub const TANGENT: u32 = 3;
pub const BLEND_INDEXES: u32 = 4;
pub const BLEND_WEIGHTS: u32 = 5;
pub const COLOR: u32 = 6;

pub const UBYTE: u32 = 1;
pub const FLOAT: u32 = 7;

pub struct Joint {
    pub name: String,
    pub parent: i32,
    pub translate: [f32; 3],
    pub rotate: [f32; 4],
    pub scale: [f32; 3],
}

pub struct Pose {
    pub parent: i32,
    pub mask: u32,
    pub offset: [f32; 10],
    pub scale: [f32; 10],
}

pub struct Anim {
    pub name: String,
    pub first_frame: u32,
    pub num_frames: u32,
    pub frame_rate: f32,
    pub flags: u32,
}

pub struct Mesh {
    pub name: String,
    pub material: String,
    pub first_triangle: u32,
    pub num_triangles: u32,
}

/// Vertex array with raw little-endian data.
pub struct VertexArray {
    pub kind: u32,
    pub format: u32,
    pub size: u32,
    pub data: Vec<u8>,
}

impl VertexArray {
    pub fn floats<const N: usize>(kind: u32, values: &[[f32; N]]) -> Self {
        Self {
            kind,
            format: FLOAT,
            size: N as u32,
            data: values
                .iter()
                .flatten()
                .flat_map(|value| value.to_le_bytes())
                .collect(),
        }
    }

    pub fn ubytes(kind: u32, values: &[[u8; 4]]) -> Self {
        Self {
            kind,
            format: UBYTE,
            size: 4,
            data: values.iter().flatten().copied().collect(),
        }
    }
}

pub struct IqmWriter {
    pub magic: [u8; 16],
    pub version: u32,
    pub file_size: Option<u32>,
    pub num_vertexes: u32,
    pub arrays: Vec<VertexArray>,
    pub triangles: Vec<[u32; 3]>,
    pub meshes: Vec<Mesh>,
    pub joints: Vec<Joint>,
    pub poses: Vec<Pose>,
    pub num_frames: u32,
    pub frames: Vec<u16>,
    pub anims: Vec<Anim>,
    pub bounds: Option<([f32; 3], [f32; 3], f32)>,
}

impl Default for IqmWriter {
    fn default() -> Self {
        Self {
            magic: *MAGIC,
            version: 2,
            file_size: None,
            num_vertexes: 0,
            arrays: Vec::new(),
            triangles: Vec::new(),
            meshes: Vec::new(),
            joints: Vec::new(),
            poses: Vec::new(),
            num_frames: 0,
            frames: Vec::new(),
            anims: Vec::new(),
            bounds: None,
        }
    }
}

struct Text {
    bytes: Vec<u8>,
}

impl Text {
    fn add(&mut self, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(text.as_bytes());
        self.bytes.push(0);
        offset
    }
}

fn put_u32(bytes: &mut Vec<u8>, value: u32) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn put_i32(bytes: &mut Vec<u8>, value: i32) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn put_f32s(bytes: &mut Vec<u8>, values: &[f32]) {
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
}

impl IqmWriter {
    /// Returns a writer for a single triangle with positions only.
    pub fn triangle() -> Self {
        Self {
            num_vertexes: 3,
            arrays: vec![VertexArray::floats(
                POSITION,
                &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            )],
            triangles: vec![[0, 1, 2]],
            meshes: vec![Mesh {
                name: "body".to_string(),
                material: "skin".to_string(),
                first_triangle: 0,
                num_triangles: 1,
            }],
            ..Self::default()
        }
    }

    pub fn write(&self) -> Vec<u8> {
        let mut text = Text { bytes: vec![0] };
        let mesh_names = self
            .meshes
            .iter()
            .map(|mesh| (text.add(&mesh.name), text.add(&mesh.material)))
            .collect::<Vec<_>>();
        let joint_names = self
            .joints
            .iter()
            .map(|joint| text.add(&joint.name))
            .collect::<Vec<_>>();
        let anim_names = self
            .anims
            .iter()
            .map(|anim| text.add(&anim.name))
            .collect::<Vec<_>>();

        let mut body = Vec::new();
        let base = 124u32;
        let offset = |body: &Vec<u8>| base + body.len() as u32;

        let ofs_text = offset(&body);
        body.extend_from_slice(&text.bytes);

        let mut array_offsets = Vec::new();
        for array in &self.arrays {
            array_offsets.push(offset(&body));
            body.extend_from_slice(&array.data);
        }

        let ofs_vertex_arrays = offset(&body);
        for (array, data_offset) in self.arrays.iter().zip(&array_offsets) {
            put_u32(&mut body, array.kind);
            put_u32(&mut body, 0);
            put_u32(&mut body, array.format);
            put_u32(&mut body, array.size);
            put_u32(&mut body, *data_offset);
        }

        let ofs_triangles = offset(&body);
        for triangle in &self.triangles {
            for index in triangle {
                put_u32(&mut body, *index);
            }
        }

        let ofs_meshes = offset(&body);
        for (mesh, (name, material)) in self.meshes.iter().zip(&mesh_names) {
            put_u32(&mut body, *name);
            put_u32(&mut body, *material);
            put_u32(&mut body, 0);
            put_u32(&mut body, self.num_vertexes);
            put_u32(&mut body, mesh.first_triangle);
            put_u32(&mut body, mesh.num_triangles);
        }

        let ofs_joints = offset(&body);
        for (joint, name) in self.joints.iter().zip(&joint_names) {
            put_u32(&mut body, *name);
            put_i32(&mut body, joint.parent);
            put_f32s(&mut body, &joint.translate);
            put_f32s(&mut body, &joint.rotate);
            put_f32s(&mut body, &joint.scale);
        }

        let ofs_poses = offset(&body);
        for pose in &self.poses {
            put_i32(&mut body, pose.parent);
            put_u32(&mut body, pose.mask);
            put_f32s(&mut body, &pose.offset);
            put_f32s(&mut body, &pose.scale);
        }

        let ofs_anims = offset(&body);
        for (anim, name) in self.anims.iter().zip(&anim_names) {
            put_u32(&mut body, *name);
            put_u32(&mut body, anim.first_frame);
            put_u32(&mut body, anim.num_frames);
            put_f32s(&mut body, &[anim.frame_rate]);
            put_u32(&mut body, anim.flags);
        }

        let ofs_frames = offset(&body);
        for value in &self.frames {
            body.extend_from_slice(&value.to_le_bytes());
        }

        let ofs_bounds = match self.bounds {
            Some((min, max, radius)) => {
                let ofs_bounds = offset(&body);
                put_f32s(&mut body, &min);
                put_f32s(&mut body, &max);
                put_f32s(&mut body, &[radius, radius]);
                ofs_bounds
            }
            None => 0,
        };

        let num_frame_channels = match self.num_frames {
            0 => 0,
            frames => self.frames.len() as u32 / frames,
        };

        let mut bytes = self.magic.to_vec();
        let fields = [
            self.version,
            self.file_size.unwrap_or(base + body.len() as u32),
            0,
            text.bytes.len() as u32,
            ofs_text,
            self.meshes.len() as u32,
            ofs_meshes,
            self.arrays.len() as u32,
            self.num_vertexes,
            ofs_vertex_arrays,
            self.triangles.len() as u32,
            ofs_triangles,
            0,
            self.joints.len() as u32,
            ofs_joints,
            self.poses.len() as u32,
            ofs_poses,
            self.anims.len() as u32,
            ofs_anims,
            self.num_frames,
            num_frame_channels,
            ofs_frames,
            ofs_bounds,
            0,
            0,
            0,
            0,
        ];
        for field in fields {
            put_u32(&mut bytes, field);
        }
        assert_eq!(bytes.len(), base as usize);

        bytes.extend_from_slice(&body);
        bytes
    }
}

const IDENTITY_CHANNELS: [f32; 10] = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];

/// Returns a writer for a quad skinned to a two joint arm whose second joint bends a quarter turn
/// around Z over a looping two frame animation.
pub fn skinned_quad() -> IqmWriter {
    let step = 1.0 / 65535.0;
    let half_sqrt = std::f32::consts::FRAC_1_SQRT_2;

    let mut elbow = IDENTITY_CHANNELS;
    elbow[1] = 1.0;
    let mut elbow_scale = [0.0; 10];
    elbow_scale[5] = step;
    elbow_scale[6] = -step;

    IqmWriter {
        num_vertexes: 4,
        arrays: vec![
            VertexArray::floats(
                POSITION,
                &[
                    [-1.0, 0.0, 0.0],
                    [1.0, 0.0, 0.0],
                    [1.0, 2.0, 0.0],
                    [-1.0, 2.0, 0.0],
                ],
            ),
            VertexArray::floats(TEXCOORD, &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]),
            VertexArray::ubytes(BLEND_INDEXES, &[[0, 0, 0, 0], [0, 0, 0, 0], [1, 0, 0, 0], [1, 0, 0, 0]]),
            VertexArray::ubytes(
                BLEND_WEIGHTS,
                &[[255, 0, 0, 0], [255, 0, 0, 0], [255, 0, 0, 0], [255, 0, 0, 0]],
            ),
        ],
        triangles: vec![[0, 1, 2], [0, 2, 3]],
        meshes: vec![Mesh {
            name: "arm".to_string(),
            material: "metal".to_string(),
            first_triangle: 0,
            num_triangles: 2,
        }],
        joints: vec![
            Joint {
                name: "shoulder".to_string(),
                parent: -1,
                translate: [0.0, 0.0, 0.0],
                rotate: [0.0, 0.0, 0.0, 1.0],
                scale: [1.0, 1.0, 1.0],
            },
            Joint {
                name: "elbow".to_string(),
                parent: 0,
                translate: [0.0, 1.0, 0.0],
                rotate: [0.0, 0.0, 0.0, 1.0],
                scale: [1.0, 1.0, 1.0],
            },
        ],
        poses: vec![
            Pose {
                parent: -1,
                mask: 0,
                offset: IDENTITY_CHANNELS,
                scale: [0.0; 10],
            },
            Pose {
                parent: 0,
                mask: (1 << 5) | (1 << 6),
                offset: elbow,
                scale: elbow_scale,
            },
        ],
        num_frames: 2,
        frames: vec![
            0,
            0,
            (half_sqrt / step).round() as u16,
            ((1.0 - half_sqrt) / step).round() as u16,
        ],
        anims: vec![Anim {
            name: "wave".to_string(),
            first_frame: 0,
            num_frames: 2,
            frame_rate: 4.0,
            flags: 1,
        }],
        ..IqmWriter::default()
    }
}
