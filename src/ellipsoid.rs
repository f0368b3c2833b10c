//! Ellipsoid primitive.
//!
//! The ray is moved into the ellipsoid's local frame and scaled per axis so the
//! shape becomes the unit sphere, where the hit is a plain quadratic.

use crate::geometry::{Intersect, Intersection};
use crate::interval::Interval;
use crate::light::Light;
use crate::material::{Color, Material};
use crate::math::{normalize_or_self, Quaternion, Vector};
use crate::ray::Ray;

const EPSILON: f64 = 1e-8;

/// Ellipsoid defined by center, semi-axes, a uniform radius multiplier and an
/// orientation.
#[derive(Debug, Clone)]
pub struct Ellipsoid {
    /// Center in world coordinates.
    pub center: Vector,
    /// Semi-axis lengths along the local x, y and z axes.
    pub semi_axes: Vector,
    /// Uniform multiplier applied to every semi-axis.
    pub radius: f64,
    /// Local-to-world rotation. Defaults to [`Quaternion::NONE`].
    pub rotation: Quaternion,
    /// Phong material used for shading.
    pub material: Material,
    /// Flat colour carried on the intersection record.
    pub color: Color,
}

impl Ellipsoid {
    /// Create an ellipsoid with the default orientation.
    pub fn new(center: Vector, semi_axes: Vector, radius: f64, material: Material, color: Color) -> Self {
        Self { center, semi_axes, radius, rotation: Quaternion::NONE, material, color }
    }

    /// Same ellipsoid with a different orientation.
    pub fn with_rotation(mut self, rotation: Quaternion) -> Self {
        self.rotation = rotation;
        self
    }
}

impl Intersect for Ellipsoid {
    fn intersect(&self, ray: &Ray, range: Interval, _lights: &[Light]) -> Intersection<'static> {
        let rotation = self.rotation.normalize();
        let inverse = rotation.conjugate();

        let axes = self.semi_axes * self.radius;
        if axes.abs().min_element() <= EPSILON {
            return Intersection::NONE;
        }

        // Local frame: rotated, still scaled
        let local_origin = inverse.rotate(ray.origin - self.center);
        let local_dir = inverse.rotate(ray.direction);

        // Unit-sphere frame
        let origin = local_origin / axes;
        let dir = local_dir / axes;

        let a = dir.dot(dir);
        if a.abs() <= EPSILON {
            return Intersection::NONE;
        }
        let b = 2.0 * origin.dot(dir);
        let c = origin.dot(origin) - 1.0;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant.is_nan() || discriminant < 0.0 {
            return Intersection::NONE;
        }

        let sqrtd = discriminant.sqrt();
        let t1 = (-b - sqrtd) / (2.0 * a);
        let t2 = (-b + sqrtd) / (2.0 * a);
        let (near, far) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };

        let accepted = Interval::new(range.min.max(EPSILON), range.max);
        let t = if accepted.contains(near) {
            near
        } else if accepted.contains(far) {
            far
        } else {
            return Intersection::NONE;
        };

        let local_hit = local_origin + t * local_dir;
        let local_normal = local_hit / (axes * axes);
        let normal = normalize_or_self(rotation.rotate(local_normal));
        if !normal.is_finite() {
            return Intersection::NONE;
        }

        Intersection {
            valid: true,
            visible: true,
            geometry: None,
            ray: *ray,
            t,
            normal,
            material: self.material,
            color: self.color,
        }
    }
}
