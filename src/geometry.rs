//! Ray-object intersection system.
//!
//! Defines the [`Intersect`] trait implemented by every shape, the
//! [`Intersection`] record they produce, and the [`Geometry`] sum type the
//! renderer scans. Opaque and volumetric shapes share the intersection call but
//! the renderer composites and shadows them differently, so it branches on the
//! variant.

use crate::ctscan::CtScan;
use crate::ellipsoid::Ellipsoid;
use crate::interval::Interval;
use crate::light::Light;
use crate::material::{Color, Material};
use crate::math::Vector;
use crate::ray::Ray;
use glam::DVec4;

/// Result of intersecting a ray with one geometry.
///
/// For analytic surfaces `t`, `normal` and `material` describe the nearest
/// hit. For volumes `t` is the entry distance and `color` holds the composited
/// RGB and opacity of the whole segment.
#[derive(Debug, Clone, Copy)]
pub struct Intersection<'a> {
    /// False for a miss; every other field is then meaningless.
    pub valid: bool,
    /// Whether the hit should be drawn.
    pub visible: bool,
    /// Scene object that produced the hit, set by [`Geometry::intersect`].
    pub geometry: Option<&'a Geometry>,
    /// Ray the hit was computed against.
    pub ray: Ray,
    /// Distance along the ray.
    pub t: f64,
    /// Unit surface normal (analytic surfaces only).
    pub normal: Vector,
    /// Surface material (analytic surfaces only).
    pub material: Material,
    /// Shape colour, or composited RGBA for volumes.
    pub color: Color,
}

impl Intersection<'_> {
    /// The "no hit" record.
    pub const NONE: Self = Intersection {
        valid: false,
        visible: false,
        geometry: None,
        ray: Ray::ZERO,
        t: 0.0,
        normal: Vector::ZERO,
        material: Material::BLANK,
        color: DVec4::ZERO,
    };

    /// Valid and visible.
    pub fn is_hit(&self) -> bool {
        self.valid && self.visible
    }

    /// World-space hit point.
    pub fn position(&self) -> Vector {
        self.ray.at(self.t)
    }
}

/// Shapes that can be intersected by rays.
///
/// `lights` is the read-only scene light list; volumes use it to light their
/// samples, analytic surfaces ignore it. Shapes leave `geometry` unset, so the
/// record does not borrow them.
pub trait Intersect: Sync + Send {
    /// Nearest intersection with `t` inside `range`, or [`Intersection::NONE`].
    fn intersect(&self, ray: &Ray, range: Interval, lights: &[Light]) -> Intersection<'static>;
}

/// Scene object.
#[derive(Debug, Clone)]
pub enum Geometry {
    /// Opaque analytic surface: shaded, casts shadows.
    Analytic(Ellipsoid),
    /// Semi-transparent CT volume: composited in front of surfaces, never
    /// casts shadows.
    Volumetric(CtScan),
}

impl Geometry {
    /// True for CT volumes.
    pub fn is_volumetric(&self) -> bool {
        matches!(self, Geometry::Volumetric(_))
    }

    /// Intersect the wrapped shape and tag the result with `self`.
    pub fn intersect(&self, ray: &Ray, range: Interval, lights: &[Light]) -> Intersection<'_> {
        let mut hit: Intersection<'_> = match self {
            Geometry::Analytic(shape) => shape.intersect(ray, range, lights),
            Geometry::Volumetric(scan) => scan.intersect(ray, range, lights),
        };
        if hit.valid {
            hit.geometry = Some(self);
        }
        hit
    }
}

impl From<Ellipsoid> for Geometry {
    fn from(shape: Ellipsoid) -> Self {
        Geometry::Analytic(shape)
    }
}

impl From<CtScan> for Geometry {
    fn from(scan: CtScan) -> Self {
        Geometry::Volumetric(scan)
    }
}
