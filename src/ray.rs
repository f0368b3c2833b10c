//! Ray representation.
//!
//! A ray is r(t) = origin + t * direction. Rays built with [`Ray::through`]
//! carry a unit direction, so t is a world-space distance.

use crate::math::{normalize_or_self, Vector};

/// Ray in 3D space defined by origin and direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Starting point in world coordinates.
    pub origin: Vector,

    /// Direction of travel.
    ///
    /// Intersectors accept any non-zero length; the renderer always passes a
    /// unit vector so that hit parameters compare as distances.
    pub direction: Vector,
}

impl Ray {
    /// Ray used as a placeholder in records that carry no real hit.
    pub const ZERO: Ray = Ray { origin: Vector::ZERO, direction: Vector::ZERO };

    /// Create a new ray with origin and direction.
    pub fn new(origin: Vector, direction: Vector) -> Self {
        Self { origin, direction }
    }

    /// Ray starting at `from` heading toward `to`, with a unit direction.
    pub fn through(from: Vector, to: Vector) -> Self {
        Self::new(from, normalize_or_self(to - from))
    }

    /// Point at parameter t along the ray.
    pub fn at(&self, t: f64) -> Vector {
        self.origin + t * self.direction
    }
}
