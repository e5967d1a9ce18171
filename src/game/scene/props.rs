use glam::{Mat4, Quat, Vec3};

use crate::game::{
    math::{BoundingBox, PlaneSide},
    render::{
        materials::{MaterialId, MissingMaterial},
        mesh::Mesh,
        pass::{RenderPassDescriptor, RenderPassType},
        provider::{ChunkCollector, RenderChunkProvider},
    },
    resources::SharedResources,
};

/// A static box placed in the world.
pub struct Prop {
    transform: Mat4,
    bounding_box: BoundingBox,
    pub transparent: bool,
    pub casts_shadows: bool,
    mesh: Mesh,
    material: MaterialId,
}

impl Prop {
    pub const MATERIAL: &str = "prop";

    /// A box of `size` with its base centered on `position`.
    pub fn new(
        position: Vec3,
        size: Vec3,
        rotation: Quat,
        resources: &SharedResources,
    ) -> Result<Self, MissingMaterial> {
        // The cube mesh spans 0..1, move it so the base is centered on the origin.
        let transform = Mat4::from_scale_rotation_translation(size, rotation, position)
            * Mat4::from_translation(Vec3::new(-0.5, 0.0, -0.5));

        Ok(Self {
            transform,
            bounding_box: BoundingBox::new(Vec3::ZERO, Vec3::ONE).transformed(&transform),
            transparent: false,
            casts_shadows: true,
            mesh: resources.cube,
            material: resources.materials.require(Self::MATERIAL)?,
        })
    }

    pub fn transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    pub fn casts_shadows(mut self, casts_shadows: bool) -> Self {
        self.casts_shadows = casts_shadows;
        self
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }
}

impl RenderChunkProvider for Prop {
    fn query_render_chunks(&self, desc: &mut RenderPassDescriptor, chunks: &mut ChunkCollector) {
        if !desc.accepts_geometry(self.transparent, self.casts_shadows) {
            return;
        }

        if let Some(clip_plane) = desc.clip_plane {
            if clip_plane.classify_box(&self.bounding_box) == PlaneSide::Back {
                return;
            }
        }

        if !desc.frustum.intersects_bounding_box(&self.bounding_box) {
            return;
        }

        let chunk = chunks.geometry();
        chunk.vertex_buffer = Some(self.mesh.vertex_buffer);
        chunk.index_buffer = Some(self.mesh.index_buffer);
        chunk.vertex_count = self.mesh.vertex_count;
        chunk.primitive_count = self.mesh.primitive_count;
        chunk.topology = self.mesh.topology;
        chunk.world = self.transform;
        chunk.material = Some(self.material);
        chunk.technique.push_str(match desc.pass_type {
            RenderPassType::ShadowMapCreate => "ShadowMapCreate",
            _ => "Prop",
        });
        chunk.casts_shadows = self.casts_shadows;
        chunk.receives_shadows = true;
        chunk.transparent = self.transparent;
    }
}

#[cfg(test)]
mod tests {
    use renderer::Renderer;

    use super::*;
    use crate::game::{
        camera::Camera,
        math::Plane,
        render::chunks::{ChunkPools, RenderChunkList},
        terrain::Lod,
    };

    fn pass(pass_type: RenderPassType) -> RenderPassDescriptor {
        let mut camera = Camera {
            position: Vec3::new(0.0, 10.0, 20.0),
            ..Default::default()
        };
        camera.look_at(Vec3::ZERO);
        RenderPassDescriptor::new(pass_type, camera.view_projection(), camera.position, Lod::High)
    }

    fn collect(props: &[Prop], mut desc: RenderPassDescriptor) -> Vec<String> {
        let mut pools = ChunkPools::default();
        let mut list = RenderChunkList::default();
        let mut collector = ChunkCollector::new(&mut pools, &mut list);
        for prop in props {
            prop.query_render_chunks(&mut desc, &mut collector);
        }
        list.geometry
            .iter()
            .map(|&handle| pools.geometry.get(handle).unwrap().technique.clone())
            .collect()
    }

    #[test]
    fn bounding_box_follows_transform() {
        let mut renderer = Renderer::default();
        let resources = SharedResources::new(&mut renderer);
        let prop = Prop::new(
            Vec3::new(10.0, 2.0, 10.0),
            Vec3::new(2.0, 4.0, 2.0),
            Quat::IDENTITY,
            &resources,
        )
        .unwrap();

        let b = prop.bounding_box();
        assert!(b.min.abs_diff_eq(Vec3::new(9.0, 2.0, 9.0), 1e-5));
        assert!(b.max.abs_diff_eq(Vec3::new(11.0, 6.0, 11.0), 1e-5));
    }

    #[test]
    fn passes_select_props() {
        let mut renderer = Renderer::default();
        let resources = SharedResources::new(&mut renderer);
        let new_prop = |position| Prop::new(position, Vec3::ONE, Quat::IDENTITY, &resources);

        let props = [
            new_prop(Vec3::new(-2.0, 0.0, 0.0)).unwrap(),
            new_prop(Vec3::ZERO).unwrap().transparent(true),
            new_prop(Vec3::new(2.0, 0.0, 0.0)).unwrap().casts_shadows(false),
            // Behind the camera.
            new_prop(Vec3::new(0.0, 10.0, 40.0)).unwrap(),
        ];

        assert_eq!(collect(&props, pass(RenderPassType::Normal)).len(), 3);
        assert_eq!(collect(&props, pass(RenderPassType::OpaqueOnly)).len(), 2);
        assert_eq!(collect(&props, pass(RenderPassType::SemiTransparentOnly)).len(), 1);
        assert_eq!(
            collect(&props, pass(RenderPassType::ShadowMapCreate)),
            vec!["ShadowMapCreate".to_string()]
        );
        assert!(collect(&props, pass(RenderPassType::SkyOnly)).is_empty());
    }

    #[test]
    fn clip_plane_removes_props_behind_it() {
        let mut renderer = Renderer::default();
        let resources = SharedResources::new(&mut renderer);
        let above = Prop::new(Vec3::new(0.0, 5.0, 0.0), Vec3::ONE, Quat::IDENTITY, &resources)
            .unwrap();
        let below = Prop::new(Vec3::new(0.0, -5.0, 0.0), Vec3::ONE, Quat::IDENTITY, &resources)
            .unwrap();

        let desc = pass(RenderPassType::WaterReflection).with_clip_plane(Plane::horizontal(0.0));
        assert_eq!(collect(&[above, below], desc), vec!["Prop".to_string()]);
    }
}
