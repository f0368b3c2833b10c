//! Surface colour and Phong material description.

use glam::DVec4;

/// RGBA colour with channels in [0, 1].
pub type Color = DVec4;

/// Build a colour from its four channels.
pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Color {
    DVec4::new(r, g, b, a)
}

/// Clamp every channel of `c` to [0, 1].
pub fn clamp_color(c: Color) -> Color {
    c.clamp(DVec4::ZERO, DVec4::ONE)
}

/// Phong reflectance parameters of an opaque surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Reflectance under ambient light.
    pub ambient: Color,
    /// Lambertian reflectance.
    pub diffuse: Color,
    /// Specular highlight colour.
    pub specular: Color,
    /// Phong exponent; larger means a tighter highlight.
    pub shininess: f64,
}

impl Material {
    /// Material that reflects nothing. Used by volumetric hits.
    pub const BLANK: Material = Material {
        ambient: DVec4::ZERO,
        diffuse: DVec4::ZERO,
        specular: DVec4::ZERO,
        shininess: 0.0,
    };

    /// Create a material.
    pub fn new(ambient: Color, diffuse: Color, specular: Color, shininess: f64) -> Self {
        Self { ambient, diffuse, specular, shininess }
    }

    /// Plastic-looking material derived from a single base colour.
    pub fn from_color(color: Color) -> Self {
        Self {
            ambient: color * 0.1,
            diffuse: color * 0.6,
            specular: rgba(0.4, 0.4, 0.4, 1.0),
            shininess: 32.0,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::BLANK
    }
}
