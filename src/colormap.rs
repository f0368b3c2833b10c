//! Transfer function from CT density to colour.

use crate::material::Color;
use glam::DVec4;

/// One density range of a [`ColorMap`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorRange {
    /// Lowest density mapped by this range (inclusive)
    pub min: u16,
    /// Highest density mapped by this range (inclusive)
    pub max: u16,
    /// Colour and opacity assigned to the range
    pub color: Color,
}

/// Piecewise-constant density to RGBA lookup.
///
/// Ranges are checked in insertion order; densities no range covers are fully
/// transparent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorMap {
    ranges: Vec<ColorRange>,
}

impl ColorMap {
    /// Create an empty map (every density transparent).
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a range, builder style.
    pub fn add(mut self, min: u16, max: u16, color: Color) -> Self {
        self.ranges.push(ColorRange { min, max, color });
        self
    }

    /// Configured ranges in lookup order.
    pub fn ranges(&self) -> &[ColorRange] {
        &self.ranges
    }

    /// Colour for density `value`.
    pub fn lookup(&self, value: u16) -> Color {
        self.ranges
            .iter()
            .find(|r| r.min <= value && value <= r.max)
            .map(|r| r.color)
            .unwrap_or(DVec4::ZERO)
    }
}

impl FromIterator<ColorRange> for ColorMap {
    fn from_iter<I: IntoIterator<Item = ColorRange>>(iter: I) -> Self {
        Self { ranges: iter.into_iter().collect() }
    }
}
