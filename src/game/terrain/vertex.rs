use glam::Vec3;

/// Terrain vertices are baked in world space.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    bytemuck::Pod,
    bytemuck::Zeroable,
    renderer_macros::AsVertexLayout,
)]
#[repr(C)]
pub struct TerrainVertex {
    pub position: Vec3,
    pub normal: Vec3,
}
