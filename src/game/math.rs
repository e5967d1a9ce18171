use glam::{Mat4, Vec3, Vec4};

/// Combined projection * view matrix with its inverse.
#[derive(Clone, Debug)]
pub struct ViewProjection {
    pub mat: Mat4,
    pub inv: Mat4,
}

impl Default for ViewProjection {
    fn default() -> Self {
        Self {
            mat: Mat4::IDENTITY,
            inv: Mat4::IDENTITY,
        }
    }
}

impl ViewProjection {
    pub fn from_projection_view(projection: Mat4, view: Mat4) -> Self {
        let mat = projection * view;
        Self {
            mat,
            inv: mat.inverse(),
        }
    }

    /// Unproject a point in normalized device coordinates (z in 0..1) into world space.
    #[inline]
    pub fn unproject_ndc(&self, point: Vec3) -> Vec3 {
        debug_assert!(point.x >= -1.0 && point.x <= 1.0);
        debug_assert!(point.y >= -1.0 && point.y <= 1.0);
        debug_assert!(point.z >= 0.0 && point.z <= 1.0);
        self.inv.project_point3(point)
    }

    /// World space corners of the view volume. The 4 near corners come first.
    pub fn corners(&self) -> [Vec3; 8] {
        const NDC: &[(f32, f32)] = &[(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let mut result = [Vec3::ZERO; 8];
        for (i, &(x, y)) in NDC.iter().enumerate() {
            result[i] = self.unproject_ndc(Vec3::new(x, y, 0.0)); // near
            result[i + 4] = self.unproject_ndc(Vec3::new(x, y, 1.0)); // far
        }
        result
    }

    pub fn frustum(&self) -> Frustum {
        let r0 = self.mat.row(0);
        let r1 = self.mat.row(1);
        let r2 = self.mat.row(2);
        let r3 = self.mat.row(3);

        let left = Plane::from_row(r3 + r0);
        let right = Plane::from_row(r3 - r0);
        let bottom = Plane::from_row(r3 + r1);
        let top = Plane::from_row(r3 - r1);
        let near = Plane::from_row(r2); // 0..1 depth
        let far = Plane::from_row(r3 - r2);

        Frustum {
            planes: [left, right, bottom, top, near, far],
            corners: self.corners(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Frustum {
    /// Planes facing inwards: left, right, bottom, top, near, far.
    pub planes: [Plane; 6],
    /// Same layout as [ViewProjection::corners].
    pub corners: [Vec3; 8],
}

impl Frustum {
    pub fn intersects_bounding_box(&self, b: &BoundingBox) -> bool {
        const EPS: f32 = 1e-5;
        for pl in &self.planes {
            let mask = pl.normal.cmplt(Vec3::ZERO);
            let p = Vec3::select(mask, b.min, b.max);
            if pl.signed_distance(p) < -EPS {
                return false;
            }
        }
        true
    }

    /// The first near plane corner. Used as the reference point for distance based decisions.
    pub fn near_corner(&self) -> Vec3 {
        self.corners[0]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaneSide {
    /// Entirely on the side the normal points to.
    Front,
    /// Entirely behind the plane.
    Back,
    Straddling,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    /// Create a plane from a normal and a distance. The normal is normalized.
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self::from_row(normal.extend(distance))
    }

    /// Horizontal plane at the given elevation, facing up.
    pub fn horizontal(elevation: f32) -> Self {
        Self {
            normal: Vec3::Y,
            distance: -elevation,
        }
    }

    fn from_row(row: Vec4) -> Self {
        let normal = row.truncate();
        let length = normal.length();

        // A degenerate plane accepts everything.
        if length <= f32::EPSILON || !length.is_finite() {
            return Self {
                normal: Vec3::Y,
                distance: f32::MAX,
            };
        }

        let inv_length = 1.0 / length;
        Self {
            normal: normal * inv_length,
            distance: row.w * inv_length,
        }
    }

    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            distance: -self.distance,
        }
    }

    /// Offset the plane along its normal.
    pub fn offset(&self, amount: f32) -> Self {
        Self {
            normal: self.normal,
            distance: self.distance - amount,
        }
    }

    pub fn as_vec4(&self) -> Vec4 {
        self.normal.extend(self.distance)
    }

    pub fn classify_box(&self, b: &BoundingBox) -> PlaneSide {
        let mask = self.normal.cmplt(Vec3::ZERO);
        // Corner furthest along the normal and the one furthest against it.
        let positive = Vec3::select(mask, b.min, b.max);
        let negative = Vec3::select(mask, b.max, b.min);

        if self.signed_distance(positive) < 0.0 {
            PlaneSide::Back
        } else if self.signed_distance(negative) >= 0.0 {
            PlaneSide::Front
        } else {
            PlaneSide::Straddling
        }
    }

    /// Matrix that mirrors points about this plane.
    pub fn reflection(&self) -> Mat4 {
        let n = self.normal;
        let d = self.distance;
        Mat4::from_cols(
            Vec4::new(1.0 - 2.0 * n.x * n.x, -2.0 * n.x * n.y, -2.0 * n.x * n.z, 0.0),
            Vec4::new(-2.0 * n.x * n.y, 1.0 - 2.0 * n.y * n.y, -2.0 * n.y * n.z, 0.0),
            Vec4::new(-2.0 * n.x * n.z, -2.0 * n.y * n.z, 1.0 - 2.0 * n.z * n.z, 0.0),
            Vec4::new(-2.0 * d * n.x, -2.0 * d * n.y, -2.0 * d * n.z, 1.0),
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        debug_assert!(min.cmple(max).all());
        Self { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| match acc {
            None => Some(Self { min: p, max: p }),
            Some(b) => Some(Self {
                min: b.min.min(p),
                max: b.max.max(p),
            }),
        })
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (min, max) = (self.min, self.max);
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(max.x, max.y, max.z),
            Vec3::new(min.x, max.y, max.z),
        ]
    }

    /// Distance from the point to the closest point on or in the box.
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        point.clamp(self.min, self.max).distance(point)
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Axis aligned box around this box after transformation.
    pub fn transformed(&self, transform: &Mat4) -> Self {
        Self::from_points(self.corners().map(|c| transform.transform_point3(c)))
            .unwrap_or_default()
    }

    /// Matrix that maps the unit cube (0..1 on each axis) onto this box.
    pub fn unit_cube_transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.size(), glam::Quat::IDENTITY, self.min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_view_projection() -> ViewProjection {
        // Camera at the origin, looking down -Z.
        let projection = Mat4::perspective_rh(60_f32.to_radians(), 1.0, 1.0, 100.0);
        let view = Mat4::look_to_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        ViewProjection::from_projection_view(projection, view)
    }

    #[test]
    fn bounding_box_size() {
        let b = BoundingBox::new(Vec3::new(0.0, 2.0, 4.0), Vec3::new(2.0, 4.0, 8.0));
        assert_eq!(b.size(), Vec3::new(2.0, 2.0, 4.0));
    }

    #[test]
    fn bounding_box_distance() {
        let b = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(b.distance_to_point(Vec3::splat(0.5)), 0.0);
        assert!((b.distance_to_point(Vec3::new(4.0, 0.5, 0.5)) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn frustum_culls_boxes() {
        let frustum = camera_view_projection().frustum();

        let in_front = BoundingBox::new(Vec3::new(-1.0, -1.0, -11.0), Vec3::new(1.0, 1.0, -9.0));
        assert!(frustum.intersects_bounding_box(&in_front));

        let behind = BoundingBox::new(Vec3::new(-1.0, -1.0, 9.0), Vec3::new(1.0, 1.0, 11.0));
        assert!(!frustum.intersects_bounding_box(&behind));

        let beyond_far = BoundingBox::new(Vec3::new(-1.0, -1.0, -300.0), Vec3::new(1.0, 1.0, -200.0));
        assert!(!frustum.intersects_bounding_box(&beyond_far));

        let far_left = BoundingBox::new(Vec3::new(-100.0, -1.0, -11.0), Vec3::new(-90.0, 1.0, -9.0));
        assert!(!frustum.intersects_bounding_box(&far_left));

        // Straddling the left plane still counts as visible.
        let straddling = BoundingBox::new(Vec3::new(-20.0, -1.0, -11.0), Vec3::new(0.0, 1.0, -9.0));
        assert!(frustum.intersects_bounding_box(&straddling));
    }

    #[test]
    fn frustum_corners() {
        let vp = camera_view_projection();
        let corners = vp.corners();
        for near in &corners[0..4] {
            assert!((near.z + 1.0).abs() < 1e-3);
        }
        for far in &corners[4..8] {
            assert!((far.z + 100.0).abs() < 1e-1);
        }
    }

    #[test]
    fn plane_normalizes() {
        let plane = Plane::new(Vec3::new(0.0, 2.0, 0.0), -4.0);
        assert_eq!(plane.normal, Vec3::Y);
        assert_eq!(plane.distance, -2.0);
        assert_eq!(plane.signed_distance(Vec3::new(5.0, 3.0, 5.0)), 1.0);
    }

    #[test]
    fn plane_classifies_boxes() {
        let water = Plane::horizontal(10.0);
        let above = BoundingBox::new(Vec3::new(0.0, 11.0, 0.0), Vec3::new(1.0, 12.0, 1.0));
        let below = BoundingBox::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 9.0, 1.0));
        let across = BoundingBox::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(1.0, 15.0, 1.0));

        assert_eq!(water.classify_box(&above), PlaneSide::Front);
        assert_eq!(water.classify_box(&below), PlaneSide::Back);
        assert_eq!(water.classify_box(&across), PlaneSide::Straddling);

        assert_eq!(water.flipped().classify_box(&above), PlaneSide::Back);
        assert_eq!(water.flipped().classify_box(&below), PlaneSide::Front);
    }

    #[test]
    fn plane_reflection() {
        let water = Plane::horizontal(10.0);
        let mirror = water.reflection();
        let p = mirror.transform_point3(Vec3::new(3.0, 15.0, -2.0));
        assert!(p.abs_diff_eq(Vec3::new(3.0, 5.0, -2.0), 1e-5));
        let on_plane = mirror.transform_point3(Vec3::new(1.0, 10.0, 1.0));
        assert!(on_plane.abs_diff_eq(Vec3::new(1.0, 10.0, 1.0), 1e-5));
    }

    #[test]
    fn unit_cube_transform() {
        let b = BoundingBox::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(3.0, 6.0, 4.0));
        let m = b.unit_cube_transform();
        assert!(m.transform_point3(Vec3::ZERO).abs_diff_eq(b.min, 1e-6));
        assert!(m.transform_point3(Vec3::ONE).abs_diff_eq(b.max, 1e-6));
        assert_eq!(b.transformed(&Mat4::IDENTITY), b);
    }
}
