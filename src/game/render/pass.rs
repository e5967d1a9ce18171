use glam::Vec3;

use crate::game::{
    math::{Frustum, Plane, ViewProjection},
    terrain::Lod,
};

/// Selects which part of the scene a pass draws, and from which point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum RenderPassType {
    Normal,
    OpaqueOnly,
    SemiTransparentOnly,
    WaterReflection,
    WaterRefraction,
    SkyOnly,
    ShadowMapCreate,
    GUIOnly,
}

impl RenderPassType {
    pub fn default_flags(self) -> RenderPassFlags {
        use RenderPassFlags as F;
        match self {
            Self::Normal => F::GEOMETRY | F::TERRAIN | F::SKY | F::WATER | F::PARTICLES,
            Self::OpaqueOnly => F::GEOMETRY | F::TERRAIN | F::SKY,
            Self::SemiTransparentOnly => F::GEOMETRY,
            Self::WaterReflection => F::GEOMETRY | F::TERRAIN | F::SKY,
            Self::WaterRefraction => F::GEOMETRY | F::TERRAIN,
            Self::SkyOnly => F::SKY,
            Self::ShadowMapCreate => F::GEOMETRY,
            Self::GUIOnly => F::GUI,
        }
    }
}

bitflags::bitflags! {
    /// Kinds of chunks requested from providers during a pass.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RenderPassFlags: u32 {
        const GEOMETRY = 1 << 0;
        const TERRAIN = 1 << 1;
        const SKY = 1 << 2;
        const WATER = 1 << 3;
        const PARTICLES = 1 << 4;
        const LIGHTS = 1 << 5;
        const GUI = 1 << 6;
    }
}

/// Describes a single pass to the chunk providers. Built fresh for every pass.
#[derive(Clone, Debug)]
pub struct RenderPassDescriptor {
    pub pass_type: RenderPassType,
    pub flags: RenderPassFlags,
    pub view_projection: ViewProjection,
    pub frustum: Frustum,
    /// Position of the camera the pass is rendered for.
    pub camera_position: Vec3,
    /// Geometry entirely behind this plane is skipped.
    pub clip_plane: Option<Plane>,
    /// Requested terrain detail.
    pub lod: Lod,
    /// Emit wireframe boxes around visible terrain leaves.
    pub render_bounding_boxes: bool,
    /// Set by water providers when the camera is below their surface.
    pub camera_underwater: bool,
}

impl RenderPassDescriptor {
    pub fn new(
        pass_type: RenderPassType,
        view_projection: ViewProjection,
        camera_position: Vec3,
        lod: Lod,
    ) -> Self {
        let frustum = view_projection.frustum();
        Self {
            pass_type,
            flags: pass_type.default_flags(),
            view_projection,
            frustum,
            camera_position,
            clip_plane: None,
            lod,
            render_bounding_boxes: false,
            camera_underwater: false,
        }
    }

    pub fn with_flags(mut self, flags: RenderPassFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_clip_plane(mut self, clip_plane: Plane) -> Self {
        self.clip_plane = Some(clip_plane);
        self
    }

    pub fn wants(&self, flags: RenderPassFlags) -> bool {
        self.flags.intersects(flags)
    }

    /// Whether geometry with the given properties belongs in this pass.
    pub fn accepts_geometry(&self, transparent: bool, casts_shadows: bool) -> bool {
        if !self.flags.contains(RenderPassFlags::GEOMETRY) {
            return false;
        }

        match self.pass_type {
            RenderPassType::Normal
            | RenderPassType::WaterReflection
            | RenderPassType::WaterRefraction => true,
            RenderPassType::OpaqueOnly => !transparent,
            RenderPassType::SemiTransparentOnly => transparent,
            RenderPassType::ShadowMapCreate => casts_shadows && !transparent,
            RenderPassType::SkyOnly | RenderPassType::GUIOnly => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(pass_type: RenderPassType) -> RenderPassDescriptor {
        RenderPassDescriptor::new(pass_type, ViewProjection::default(), Vec3::ZERO, Lod::High)
    }

    #[test]
    fn geometry_filtering() {
        let opaque = descriptor(RenderPassType::OpaqueOnly);
        assert!(opaque.accepts_geometry(false, false));
        assert!(!opaque.accepts_geometry(true, false));

        let transparent = descriptor(RenderPassType::SemiTransparentOnly);
        assert!(transparent.accepts_geometry(true, false));
        assert!(!transparent.accepts_geometry(false, true));

        let shadows = descriptor(RenderPassType::ShadowMapCreate);
        assert!(shadows.accepts_geometry(false, true));
        assert!(!shadows.accepts_geometry(false, false));
        assert!(!shadows.wants(RenderPassFlags::TERRAIN));

        let gui = descriptor(RenderPassType::GUIOnly);
        assert!(!gui.accepts_geometry(false, false));
        assert!(gui.wants(RenderPassFlags::GUI));
    }

    #[test]
    fn flags_can_be_overridden() {
        let lights = descriptor(RenderPassType::Normal).with_flags(RenderPassFlags::LIGHTS);
        assert!(lights.wants(RenderPassFlags::LIGHTS));
        assert!(!lights.accepts_geometry(false, false));
    }

    #[test]
    fn clip_plane() {
        let desc =
            descriptor(RenderPassType::WaterReflection).with_clip_plane(Plane::horizontal(3.0));
        assert_eq!(desc.clip_plane, Some(Plane::horizontal(3.0)));
    }
}
