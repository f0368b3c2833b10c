//! Point lights.

use crate::material::Color;
use crate::math::Vector;

/// Point light with separate Phong colour terms.
///
/// Lights are immutable during a render and shared read-only by every
/// intersection query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// World-space position
    pub position: Vector,
    /// Ambient contribution
    pub ambient: Color,
    /// Diffuse contribution
    pub diffuse: Color,
    /// Specular contribution
    pub specular: Color,
}

impl Light {
    /// Create a light.
    pub fn new(position: Vector, ambient: Color, diffuse: Color, specular: Color) -> Self {
        Self { position, ambient, diffuse, specular }
    }
}
