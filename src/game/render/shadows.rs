use glam::{Mat4, Vec3, Vec4};
use renderer::{RenderTargetDescriptor, RenderTargetId, Renderer, TextureFormat};

use crate::game::{camera::Camera, math::ViewProjection};

/// Depth target rendered from the sun's point of view.
pub struct ShadowMap {
    /// Pixel resolution of the (square) depth target.
    pub resolution: u32,
    pub target: RenderTargetId,
    /// Orthographic view projection covering the camera frustum, fitted every frame.
    pub view_projection: ViewProjection,
}

impl ShadowMap {
    /// Only this much of the camera frustum receives shadows.
    pub const MAX_DISTANCE: f32 = 500.0;
    /// Extra room around the fitted box, in world units.
    const GUARD: f32 = 50.0;

    pub fn new(renderer: &mut Renderer, resolution: u32) -> Self {
        let target = renderer.create_render_target(RenderTargetDescriptor {
            label: "shadow_map".to_string(),
            width: resolution,
            height: resolution,
            format: TextureFormat::Depth32Float,
        });

        Self {
            resolution,
            target,
            view_projection: ViewProjection::default(),
        }
    }

    /// Refit the light's view projection around the visible part of `camera`.
    pub fn update(&mut self, sun_direction: Vec3, camera: &Camera) {
        let camera = Camera {
            far: camera.far.min(Self::MAX_DISTANCE).max(camera.near + 1.0),
            ..camera.clone()
        };

        self.view_projection = fit_directional_light(
            sun_direction,
            camera.rotation * Camera::RIGHT,
            camera.rotation * Camera::UP,
            &camera.view_projection().corners(),
            self.resolution,
            Self::GUARD,
        );
    }
}

/// Fit an orthographic projection looking along `sun_direction` tightly around `corners`.
///
/// The light basis follows the camera's on-screen orientation so the fitted box rotates with the
/// camera instead of the world. The box center is snapped to the texel grid to keep shadow
/// edges stable while the camera pans.
pub fn fit_directional_light(
    sun_direction: Vec3,
    camera_right: Vec3,
    camera_up: Vec3,
    corners: &[Vec3; 8],
    resolution: u32,
    guard: f32,
) -> ViewProjection {
    let light_forward = sun_direction.normalize_or(Vec3::NEG_Y);

    let project = |v: Vec3| v - light_forward * v.dot(light_forward);
    let mut light_right = project(camera_right);
    if light_right.length_squared() < 1e-8 {
        light_right = project(camera_up);
    }
    if light_right.length_squared() < 1e-8 {
        let aux = if light_forward.abs_diff_eq(Vec3::Z, 1e-4) {
            Vec3::X
        } else {
            Vec3::Z
        };
        light_right = project(aux);
    }
    let light_right = light_right.normalize();

    // Right handed, looking down -Z.
    let light_up = light_right.cross(light_forward).normalize();
    let light_back = -light_forward;

    let center = corners.iter().copied().sum::<Vec3>() / corners.len() as f32;

    let view = Mat4::from_cols(
        Vec4::new(light_right.x, light_up.x, light_back.x, 0.0),
        Vec4::new(light_right.y, light_up.y, light_back.y, 0.0),
        Vec4::new(light_right.z, light_up.z, light_back.z, 0.0),
        Vec4::new(
            -light_right.dot(center),
            -light_up.dot(center),
            -light_back.dot(center),
            1.0,
        ),
    );

    let (min, max) = corners.iter().fold(
        (Vec3::INFINITY, Vec3::NEG_INFINITY),
        |(min, max), &corner| {
            let q = view.transform_point3(corner);
            (min.min(q), max.max(q))
        },
    );
    let min = min - Vec3::splat(guard);
    let max = max + Vec3::splat(guard);

    // Snap the center to the texel grid, keeping the size.
    let size = (max - min).max(Vec3::splat(1e-6));
    let step_x = size.x / resolution as f32;
    let step_y = size.y / resolution as f32;
    let cx = ((min.x + max.x) * 0.5 / step_x).floor() * step_x;
    let cy = ((min.y + max.y) * 0.5 / step_y).floor() * step_y;
    let half_w = size.x * 0.5;
    let half_h = size.y * 0.5;

    // View space z is negative in front of the light.
    let projection = Mat4::orthographic_rh(
        cx - half_w,
        cx + half_w,
        cy - half_h,
        cy + half_h,
        -max.z,
        -min.z,
    );

    ViewProjection::from_projection_view(projection, view)
}
