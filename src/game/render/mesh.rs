use glam::{Vec2, Vec3, Vec4};
use renderer::{BufferId, PrimitiveTopology, Renderer};

#[derive(
    Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable, renderer_macros::AsVertexLayout,
)]
#[repr(C)]
pub struct MeshVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coord: Vec2,
}

#[derive(
    Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable, renderer_macros::AsVertexLayout,
)]
#[repr(C)]
pub struct DebugVertex {
    pub position: Vec3,
    pub color: [f32; 4],
}

/// Indexed geometry uploaded to the renderer.
#[derive(Clone, Copy, Debug)]
pub struct Mesh {
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub vertex_count: u32,
    pub primitive_count: u32,
    pub topology: PrimitiveTopology,
}

impl Mesh {
    fn upload<V>(
        renderer: &mut Renderer,
        label: &str,
        vertices: &[V],
        indices: &[u32],
        topology: PrimitiveTopology,
    ) -> Self
    where
        V: renderer::AsVertexLayout + bytemuck::Pod,
    {
        Self {
            vertex_buffer: renderer.create_vertex_buffer(&format!("{label}_vertices"), vertices),
            index_buffer: renderer.create_index_buffer(&format!("{label}_indices"), indices),
            vertex_count: vertices.len() as u32,
            primitive_count: indices.len() as u32 / topology.vertices_per_primitive(),
            topology,
        }
    }

    /// Unit cube spanning 0..1 on every axis, with faces pointing outward.
    pub fn cube(renderer: &mut Renderer, label: &str) -> Self {
        const FACES: [(Vec3, Vec3, Vec3); 6] = [
            // normal, u axis, v axis
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in FACES {
            let first = vertices.len() as u32;
            let center = Vec3::splat(0.5) + normal * 0.5;
            for (s, t) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
                vertices.push(MeshVertex {
                    position: center + u * s + v * t,
                    normal,
                    tex_coord: Vec2::new(s + 0.5, 0.5 - t),
                });
            }
            indices.extend([first, first + 1, first + 2, first, first + 2, first + 3]);
        }

        Self::upload(renderer, label, &vertices, &indices, PrimitiveTopology::TriangleList)
    }

    /// Unit quad in the XZ plane spanning 0..1, facing up.
    pub fn quad(renderer: &mut Renderer, label: &str) -> Self {
        let vertices = [(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)].map(|(x, z)| MeshVertex {
            position: Vec3::new(x, 0.0, z),
            normal: Vec3::Y,
            tex_coord: Vec2::new(x, z),
        });
        let indices = [0, 1, 2, 0, 2, 3];

        Self::upload(renderer, label, &vertices, &indices, PrimitiveTopology::TriangleList)
    }

    /// The 12 edges of the unit cube as a line list.
    pub fn wire_cube(renderer: &mut Renderer, label: &str, color: Vec4) -> Self {
        let vertices = crate::game::math::BoundingBox::new(Vec3::ZERO, Vec3::ONE)
            .corners()
            .map(|position| DebugVertex {
                position,
                color: color.to_array(),
            });

        #[rustfmt::skip]
        let indices = [
            0, 1, 1, 2, 2, 3, 3, 0, // bottom
            4, 5, 5, 6, 6, 7, 7, 4, // top
            0, 4, 1, 5, 2, 6, 3, 7, // sides
        ];

        Self::upload(renderer, label, &vertices, &indices, PrimitiveTopology::LineList)
    }
}
