use glam::{Mat4, Vec2, Vec3};

use crate::game::{
    math::{BoundingBox, Plane},
    render::{
        materials::{MaterialId, MissingMaterial},
        mesh::Mesh,
        pass::{RenderPassDescriptor, RenderPassFlags},
        provider::{ChunkCollector, RenderChunkProvider},
    },
    resources::SharedResources,
};

/// Clip planes are pushed this far past the surface so geometry touching the water does not
/// leave a seam along the shore.
pub const WATER_CLIP_BIAS: f32 = 0.25;

/// Clip planes used to render the water textures for a camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaterPlanes {
    pub camera_underwater: bool,
    /// The water surface, facing up.
    pub surface: Plane,
    /// Keeps what is on the camera's side of the surface.
    pub reflection: Plane,
    /// Keeps what is on the far side of the surface.
    pub refraction: Plane,
}

impl WaterPlanes {
    pub fn new(elevation: f32, camera_position: Vec3) -> Self {
        let camera_underwater = camera_position.y < elevation;
        let surface = Plane::horizontal(elevation);

        let camera_side = if camera_underwater {
            surface.flipped()
        } else {
            surface
        };

        Self {
            camera_underwater,
            surface,
            reflection: camera_side.offset(-WATER_CLIP_BIAS),
            refraction: camera_side.flipped().offset(-WATER_CLIP_BIAS),
        }
    }
}

/// A flat body of water covering a rectangle of the XZ plane.
pub struct Water {
    pub elevation: f32,
    min: Vec2,
    max: Vec2,
    mesh: Mesh,
    material: MaterialId,
}

impl Water {
    pub const MATERIAL: &str = "water";

    pub fn new(
        elevation: f32,
        min: Vec2,
        max: Vec2,
        resources: &SharedResources,
    ) -> Result<Self, MissingMaterial> {
        Ok(Self {
            elevation,
            min: min.min(max),
            max: min.max(max),
            mesh: resources.quad,
            material: resources.materials.require(Self::MATERIAL)?,
        })
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(
            Vec3::new(self.min.x, self.elevation, self.min.y),
            Vec3::new(self.max.x, self.elevation, self.max.y),
        )
    }

    /// Whether `position` is under the surface and inside the water's horizontal extent.
    pub fn is_submerged(&self, position: Vec3) -> bool {
        let xz = Vec2::new(position.x, position.z);
        position.y < self.elevation && xz.cmpge(self.min).all() && xz.cmple(self.max).all()
    }

    fn world(&self) -> Mat4 {
        let size = self.max - self.min;
        Mat4::from_translation(Vec3::new(self.min.x, self.elevation, self.min.y))
            * Mat4::from_scale(Vec3::new(size.x, 1.0, size.y))
    }
}

impl RenderChunkProvider for Water {
    fn query_render_chunks(&self, desc: &mut RenderPassDescriptor, chunks: &mut ChunkCollector) {
        if self.is_submerged(desc.camera_position) {
            desc.camera_underwater = true;
        }

        if !desc.wants(RenderPassFlags::WATER)
            || !desc.frustum.intersects_bounding_box(&self.bounding_box())
        {
            return;
        }

        let chunk = chunks.water();
        chunk.vertex_buffer = Some(self.mesh.vertex_buffer);
        chunk.index_buffer = Some(self.mesh.index_buffer);
        chunk.primitive_count = self.mesh.primitive_count;
        chunk.elevation = self.elevation;
        chunk.world = self.world();
        chunk.material = Some(self.material);
        chunk.technique.push_str("Water");
    }
}

#[cfg(test)]
mod tests {
    use renderer::Renderer;

    use super::*;
    use crate::game::{
        camera::Camera,
        render::{
            chunks::{ChunkPools, RenderChunkList},
            pass::RenderPassType,
        },
        terrain::Lod,
    };

    #[test]
    fn planes_above_water() {
        let planes = WaterPlanes::new(10.0, Vec3::new(0.0, 20.0, 0.0));
        assert!(!planes.camera_underwater);

        assert_eq!(planes.reflection.normal, Vec3::Y);
        assert_eq!(planes.reflection.distance, -(10.0 - WATER_CLIP_BIAS));
        // Just below the surface is kept, deeper is not.
        assert!(planes.reflection.signed_distance(Vec3::new(0.0, 9.9, 0.0)) > 0.0);
        assert!(planes.reflection.signed_distance(Vec3::new(0.0, 9.0, 0.0)) < 0.0);

        assert_eq!(planes.refraction.normal, Vec3::NEG_Y);
        assert!(planes.refraction.signed_distance(Vec3::new(0.0, 5.0, 0.0)) > 0.0);
        assert!(planes.refraction.signed_distance(Vec3::new(0.0, 11.0, 0.0)) < 0.0);
    }

    #[test]
    fn planes_below_water() {
        let above = WaterPlanes::new(10.0, Vec3::new(0.0, 20.0, 0.0));
        let below = WaterPlanes::new(10.0, Vec3::new(0.0, 5.0, 0.0));
        assert!(below.camera_underwater);

        // The reflection plane faces the other way.
        assert_eq!(below.reflection.normal, -above.reflection.normal);
        assert_eq!(below.reflection.distance, 10.0 + WATER_CLIP_BIAS);
        assert!(below.reflection.signed_distance(Vec3::new(0.0, 5.0, 0.0)) > 0.0);
        assert!(below.reflection.signed_distance(Vec3::new(0.0, 11.0, 0.0)) < 0.0);
        assert_eq!(below.refraction.normal, Vec3::Y);
    }

    #[test]
    fn camera_below_surface_is_flagged() {
        let mut renderer = Renderer::default();
        let resources = SharedResources::new(&mut renderer);
        let water = Water::new(10.0, Vec2::ZERO, Vec2::splat(100.0), &resources).unwrap();

        let mut camera = Camera {
            position: Vec3::new(50.0, 5.0, 80.0),
            ..Default::default()
        };
        camera.look_at(Vec3::new(50.0, 10.0, 50.0));

        let mut pools = ChunkPools::default();
        let mut list = RenderChunkList::default();
        let mut desc = RenderPassDescriptor::new(
            RenderPassType::Normal,
            camera.view_projection(),
            camera.position,
            Lod::High,
        );
        water.query_render_chunks(&mut desc, &mut ChunkCollector::new(&mut pools, &mut list));

        assert!(desc.camera_underwater);
        assert_eq!(list.water.len(), 1);
        let chunk = pools.water.get(list.water[0]).unwrap();
        assert_eq!(chunk.elevation, 10.0);
        assert!(
            chunk
                .world
                .transform_point3(Vec3::new(1.0, 0.0, 1.0))
                .abs_diff_eq(Vec3::new(100.0, 10.0, 100.0), 1e-5)
        );

        // Passes that do not draw water are still flagged.
        list.clear();
        let mut desc = RenderPassDescriptor::new(
            RenderPassType::OpaqueOnly,
            camera.view_projection(),
            camera.position,
            Lod::High,
        );
        water.query_render_chunks(&mut desc, &mut ChunkCollector::new(&mut pools, &mut list));
        assert!(desc.camera_underwater);
        assert!(list.water.is_empty());
    }

    #[test]
    fn camera_beside_the_water_is_not_underwater() {
        let mut renderer = Renderer::default();
        let resources = SharedResources::new(&mut renderer);
        let water = Water::new(10.0, Vec2::ZERO, Vec2::splat(100.0), &resources).unwrap();

        assert!(water.is_submerged(Vec3::new(50.0, 5.0, 50.0)));
        assert!(water.is_submerged(Vec3::new(100.0, 5.0, 0.0)));
        assert!(!water.is_submerged(Vec3::new(150.0, 5.0, 50.0)));
        assert!(!water.is_submerged(Vec3::new(50.0, 5.0, -1.0)));
        assert!(!water.is_submerged(Vec3::new(50.0, 15.0, 50.0)));

        // Below the surface elevation but outside the lake.
        let mut camera = Camera {
            position: Vec3::new(150.0, 5.0, 50.0),
            ..Default::default()
        };
        camera.look_at(Vec3::new(50.0, 10.0, 50.0));

        let mut pools = ChunkPools::default();
        let mut list = RenderChunkList::default();
        let mut desc = RenderPassDescriptor::new(
            RenderPassType::Normal,
            camera.view_projection(),
            camera.position,
            Lod::High,
        );
        water.query_render_chunks(&mut desc, &mut ChunkCollector::new(&mut pools, &mut list));

        assert!(!desc.camera_underwater);
        assert_eq!(list.water.len(), 1);
    }
}
