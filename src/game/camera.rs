use glam::{Mat4, Quat, Vec3};

use crate::game::math::{Plane, ViewProjection};

/// A perspective camera. Y is up and the camera looks down its local -Z axis.
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fov: 60_f32.to_radians(),
            aspect_ratio: 16.0 / 10.0,
            near: 0.5,
            far: 2_000.0,
        }
    }
}

impl Camera {
    pub const FORWARD: Vec3 = Vec3::NEG_Z;
    pub const RIGHT: Vec3 = Vec3::X;
    pub const UP: Vec3 = Vec3::Y;

    pub fn forward(&self) -> Vec3 {
        self.rotation * Self::FORWARD
    }

    /// Rotate the camera to face `target` without rolling.
    pub fn look_at(&mut self, target: Vec3) {
        let direction = (target - self.position).normalize_or_zero();
        if direction == Vec3::ZERO {
            return;
        }

        let yaw = (-direction.x).atan2(-direction.z);
        let pitch = direction.y.clamp(-1.0, 1.0).asin();
        self.rotation = Quat::from_rotation_y(yaw) * Quat::from_rotation_x(pitch);
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.rotation * Self::UP)
    }

    /// Depth is mapped to 0..1.
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }

    pub fn view_projection(&self) -> ViewProjection {
        ViewProjection::from_projection_view(self.projection(), self.view())
    }

    /// View of the scene as seen in a mirror lying on `plane`.
    pub fn mirrored_view(&self, plane: &Plane) -> Mat4 {
        self.view() * plane.reflection()
    }

    pub fn mirrored_view_projection(&self, plane: &Plane) -> ViewProjection {
        ViewProjection::from_projection_view(self.projection(), self.mirrored_view(plane))
    }
}
