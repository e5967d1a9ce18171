use glam::Vec3;

use crate::game::{
    math::BoundingBox,
    render::{
        chunks::LightKind,
        pass::{RenderPassDescriptor, RenderPassFlags},
        provider::{ChunkCollector, RenderChunkProvider},
    },
};

#[derive(Clone, Debug)]
pub struct Light {
    pub kind: LightKind,
    pub position: Vec3,
    /// Direction the light travels in.
    pub direction: Vec3,
    pub color: Vec3,
    /// Distance at which a point light no longer contributes.
    pub range: f32,
    pub casts_shadows: bool,
}

impl Light {
    /// A light infinitely far away, like the sun. Directional lights cast shadows.
    pub fn directional(direction: Vec3, color: Vec3) -> Self {
        Self {
            kind: LightKind::Directional,
            position: Vec3::ZERO,
            direction: direction.normalize_or(Vec3::NEG_Y),
            color,
            range: f32::INFINITY,
            casts_shadows: true,
        }
    }

    pub fn point(position: Vec3, color: Vec3, range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            direction: Vec3::ZERO,
            color,
            range,
            casts_shadows: false,
        }
    }

    fn is_visible(&self, desc: &RenderPassDescriptor) -> bool {
        match self.kind {
            LightKind::Directional => true,
            LightKind::Point => {
                let extent = Vec3::splat(self.range);
                desc.frustum.intersects_bounding_box(&BoundingBox::new(
                    self.position - extent,
                    self.position + extent,
                ))
            }
        }
    }
}

impl RenderChunkProvider for Light {
    fn query_render_chunks(&self, desc: &mut RenderPassDescriptor, chunks: &mut ChunkCollector) {
        if !desc.wants(RenderPassFlags::LIGHTS) || !self.is_visible(desc) {
            return;
        }

        let chunk = chunks.light();
        chunk.kind = self.kind;
        chunk.position = self.position;
        chunk.direction = self.direction;
        chunk.color = self.color;
        chunk.range = self.range;
        chunk.casts_shadows = self.casts_shadows;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        camera::Camera,
        render::{
            chunks::{ChunkPools, RenderChunkList},
            pass::RenderPassType,
        },
        terrain::Lod,
    };

    fn lighting_pass() -> RenderPassDescriptor {
        let camera = Camera::default();
        RenderPassDescriptor::new(
            RenderPassType::Normal,
            camera.view_projection(),
            camera.position,
            Lod::High,
        )
        .with_flags(RenderPassFlags::LIGHTS)
    }

    #[test]
    fn point_lights_are_culled() {
        let mut pools = ChunkPools::default();
        let mut list = RenderChunkList::default();
        let mut desc = lighting_pass();

        let mut collector = ChunkCollector::new(&mut pools, &mut list);
        // In front of the camera.
        Light::point(Vec3::new(0.0, 0.0, -20.0), Vec3::ONE, 5.0)
            .query_render_chunks(&mut desc, &mut collector);
        // Behind the camera.
        Light::point(Vec3::new(0.0, 0.0, 20.0), Vec3::ONE, 5.0)
            .query_render_chunks(&mut desc, &mut collector);
        Light::directional(Vec3::new(0.0, -2.0, 0.0), Vec3::ONE)
            .query_render_chunks(&mut desc, &mut collector);

        assert_eq!(list.lights.len(), 2);
        let sun = pools.lights.get(list.lights[1]).unwrap();
        assert_eq!(sun.kind, LightKind::Directional);
        assert_eq!(sun.direction, Vec3::NEG_Y);
        assert!(sun.casts_shadows);
    }

    #[test]
    fn only_lighting_passes_collect_lights() {
        let mut pools = ChunkPools::default();
        let mut list = RenderChunkList::default();
        let mut desc = lighting_pass().with_flags(RenderPassFlags::GEOMETRY);

        Light::directional(Vec3::NEG_Y, Vec3::ONE)
            .query_render_chunks(&mut desc, &mut ChunkCollector::new(&mut pools, &mut list));
        assert!(list.is_empty());
    }
}
