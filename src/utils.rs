use wgpu::util::DeviceExt;
use bytemuck::NoUninit;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, NoUninit)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub joints: [u32; 4],
    pub weights: [f32; 4],
}

impl Vertex {
    /// Static vertex bound fully to joint 0, which is identity for unskinned draws.
    pub fn new(pos: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            pos,
            normal,
            uv,
            joints: [0; 4],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }

    pub const ATTRIBUTES: [wgpu::VertexAttribute; 5] = [
        wgpu::VertexAttribute { offset: 0, shader_location: 0, format: wgpu::VertexFormat::Float32x3 },
        wgpu::VertexAttribute { offset: 12, shader_location: 1, format: wgpu::VertexFormat::Float32x3 },
        wgpu::VertexAttribute { offset: 24, shader_location: 2, format: wgpu::VertexFormat::Float32x2 },
        wgpu::VertexAttribute { offset: 32, shader_location: 3, format: wgpu::VertexFormat::Uint32x4 },
        wgpu::VertexAttribute { offset: 48, shader_location: 4, format: wgpu::VertexFormat::Float32x4 },
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }

    /// Smooth normals from the area-weighted face normals around each vertex.
    pub fn compute_normals(&mut self) {
        let mut acc = vec![glam::Vec3::ZERO; self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (Some(pa), Some(pb), Some(pc)) = (self.vertices.get(a), self.vertices.get(b), self.vertices.get(c)) else {
                continue;
            };
            let pa = glam::Vec3::from(pa.pos);
            let face = (glam::Vec3::from(pb.pos) - pa).cross(glam::Vec3::from(pc.pos) - pa);
            acc[a] += face;
            acc[b] += face;
            acc[c] += face;
        }
        for (v, n) in self.vertices.iter_mut().zip(acc) {
            v.normal = n.try_normalize().unwrap_or(glam::Vec3::Y).to_array();
        }
    }

    /// Edge list of every triangle, for line-topology wireframes.
    pub fn to_wireframe(&self) -> Mesh {
        let mut indices = Vec::with_capacity(self.indices.len() * 2);
        for tri in self.indices.chunks_exact(3) {
            indices.extend_from_slice(&[tri[0], tri[1], tri[1], tri[2], tri[2], tri[0]]);
        }
        Mesh {
            vertices: self.vertices.clone(),
            indices,
        }
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {

        let vertices = bytemuck::cast_slice(&self.vertices);
        let indices = bytemuck::cast_slice(&self.indices);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: indices,
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_struct_size() {
        assert_eq!(std::mem::size_of::<Vertex>(), 64);
        assert_eq!(Vertex::ATTRIBUTES[4].offset, 48);
    }

    #[test]
    fn computed_normals_follow_winding() {
        let mut mesh = Mesh {
            vertices: vec![
                Vertex::new([0.0, 0.0, 0.0], [0.0; 3], [0.0; 2]),
                Vertex::new([1.0, 0.0, 0.0], [0.0; 3], [0.0; 2]),
                Vertex::new([0.0, 0.0, -1.0], [0.0; 3], [0.0; 2]),
                Vertex::new([5.0, 5.0, 5.0], [0.0; 3], [0.0; 2]),
            ],
            indices: vec![0, 1, 2],
        };
        mesh.compute_normals();
        assert_eq!(mesh.vertices[0].normal, [0.0, 1.0, 0.0]);
        assert_eq!(mesh.vertices[2].normal, [0.0, 1.0, 0.0]);
        // unreferenced vertices fall back to +Y
        assert_eq!(mesh.vertices[3].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn wireframe_has_three_edges_per_triangle() {
        let v = Vertex::new([0.0; 3], [0.0, 1.0, 0.0], [0.0; 2]);
        let mesh = Mesh { vertices: vec![v; 4], indices: vec![0, 1, 2, 2, 3, 0] };
        let wire = mesh.to_wireframe();
        assert_eq!(wire.indices.len(), 12);
        assert_eq!(&wire.indices[..6], &[0, 1, 1, 2, 2, 0]);
    }
}
