use glam::{Mat4, Vec3};

use crate::game::{
    render::{
        chunks::RenderOrder,
        materials::{MaterialId, MissingMaterial},
        mesh::Mesh,
        pass::{RenderPassDescriptor, RenderPassFlags},
        provider::{ChunkCollector, RenderChunkProvider},
    },
    resources::SharedResources,
};

/// A box that follows the camera and is drawn before everything else.
pub struct Sky {
    /// Edge length of the box around the camera.
    pub size: f32,
    mesh: Mesh,
    material: MaterialId,
}

impl Sky {
    pub const MATERIAL: &str = "sky";

    pub fn new(resources: &SharedResources) -> Result<Self, MissingMaterial> {
        Ok(Self {
            size: 100.0,
            mesh: resources.cube,
            material: resources.materials.require(Self::MATERIAL)?,
        })
    }
}

impl RenderChunkProvider for Sky {
    fn query_render_chunks(&self, desc: &mut RenderPassDescriptor, chunks: &mut ChunkCollector) {
        if !desc.wants(RenderPassFlags::SKY) {
            return;
        }

        let half = Vec3::splat(self.size * 0.5);
        let chunk = chunks.geometry();
        chunk.vertex_buffer = Some(self.mesh.vertex_buffer);
        chunk.index_buffer = Some(self.mesh.index_buffer);
        chunk.vertex_count = self.mesh.vertex_count;
        chunk.primitive_count = self.mesh.primitive_count;
        chunk.topology = self.mesh.topology;
        chunk.world = Mat4::from_translation(desc.camera_position - half)
            * Mat4::from_scale(Vec3::splat(self.size));
        chunk.material = Some(self.material);
        chunk.technique.push_str("Sky");
        chunk.render_order = RenderOrder::RenderFirst;
    }
}
