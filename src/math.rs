//! Vector and quaternion algebra.
//!
//! Vectors are plain `glam::DVec3` values; every operation returns a new value.
//! Quaternions carry their own type because this renderer stores them in
//! `(w, x, y, z)` order and uses a non-identity "no rotation" sentinel.

use glam::{DQuat, DVec3};

/// 3D vector in world or object space.
pub type Vector = DVec3;

/// Return `v` scaled to unit length, or `v` unchanged if it has zero length.
pub fn normalize_or_self(v: Vector) -> Vector {
    v.try_normalize().unwrap_or(v)
}

/// Rotation quaternion stored as `(w, x, y, z)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    /// Scalar part
    pub w: f64,
    /// X component of the vector part
    pub x: f64,
    /// Y component of the vector part
    pub y: f64,
    /// Z component of the vector part
    pub z: f64,
}

impl Quaternion {
    /// Default orientation of scene shapes.
    ///
    /// Note this is a half turn about X, not the mathematical identity. Shapes
    /// symmetric about their axes (every ellipsoid) render the same either way.
    pub const NONE: Quaternion = Quaternion::new(0.0, 1.0, 0.0, 0.0);

    /// Mathematical identity rotation.
    pub const IDENTITY: Quaternion = Quaternion::new(1.0, 0.0, 0.0, 0.0);

    /// Create a quaternion from its four components.
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Rotation of `angle` radians about `axis`.
    ///
    /// A zero-length axis yields [`Quaternion::IDENTITY`].
    pub fn from_axis_angle(angle: f64, axis: Vector) -> Self {
        let length = axis.length();
        if length <= 1e-12 {
            return Self::IDENTITY;
        }

        let axis = axis / length;
        let (sin_half, cos_half) = (angle * 0.5).sin_cos();
        Self::new(cos_half, axis.x * sin_half, axis.y * sin_half, axis.z * sin_half).normalize()
    }

    /// Squared norm.
    pub fn norm_squared(&self) -> f64 {
        self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    /// Unit-length copy. A zero quaternion is returned unchanged.
    pub fn normalize(self) -> Self {
        let norm = self.norm();
        if norm <= 1e-12 {
            return self;
        }
        Self::new(self.w / norm, self.x / norm, self.y / norm, self.z / norm)
    }

    /// Conjugate; the inverse rotation of a unit quaternion.
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Multiplicative inverse (conjugate over squared norm).
    pub fn inverse(self) -> Self {
        let n2 = self.norm_squared();
        if n2 <= 1e-24 {
            return self;
        }
        let c = self.conjugate();
        Self::new(c.w / n2, c.x / n2, c.y / n2, c.z / n2)
    }

    /// Rotate `v` by this quaternion after normalizing it.
    ///
    /// A degenerate (near-zero) quaternion leaves `v` untouched.
    pub fn rotate(&self, v: Vector) -> Vector {
        if self.norm() <= 1e-12 {
            return v;
        }
        let q = self.normalize();
        DQuat::from_xyzw(q.x, q.y, q.z, q.w) * v
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn approx(a: Vector, b: Vector) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn test_none_sentinel_is_half_turn_about_x() {
        let v = Quaternion::NONE.rotate(Vector::new(1.0, 2.0, 3.0));
        assert!(approx(v, Vector::new(1.0, -2.0, -3.0)));
    }

    #[test]
    fn test_axis_angle_quarter_turn() {
        let q = Quaternion::from_axis_angle(FRAC_PI_2, Vector::Z);
        assert!(approx(q.rotate(Vector::X), Vector::Y));
    }

    #[test]
    fn test_zero_axis_is_identity() {
        assert_eq!(Quaternion::from_axis_angle(1.0, Vector::ZERO), Quaternion::IDENTITY);
    }

    #[test]
    fn test_conjugate_undoes_rotation() {
        let q = Quaternion::from_axis_angle(0.7, Vector::new(1.0, 1.0, 0.0));
        let v = Vector::new(0.3, -1.2, 2.5);
        assert!(approx(q.conjugate().rotate(q.rotate(v)), v));
        assert!(approx(q.inverse().rotate(q.rotate(v)), v));
    }

    #[test]
    fn test_rotate_normalizes_scaled_quaternion() {
        let q = Quaternion::new(2.0, 0.0, 0.0, 0.0);
        assert!(approx(q.rotate(Vector::X), Vector::X));
    }

    #[test]
    fn test_degenerate_quaternion_is_noop() {
        let q = Quaternion::new(0.0, 0.0, 0.0, 0.0);
        assert!(approx(q.rotate(Vector::Y), Vector::Y));
        assert_eq!(q.normalize(), q);
    }

    #[test]
    fn test_normalize_zero_vector_is_noop() {
        assert_eq!(normalize_or_self(Vector::ZERO), Vector::ZERO);
        assert!(approx(normalize_or_self(Vector::new(0.0, 3.0, 4.0)), Vector::new(0.0, 0.6, 0.8)));
    }
}
