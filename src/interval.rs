//! Closed intervals of ray parameters.

/// Closed interval [min, max] of ray parameter values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
}

impl Interval {
    /// Create a new interval with given min and max values
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// True when no value lies strictly inside the interval (max <= min).
    pub fn is_empty(&self) -> bool {
        self.max <= self.min
    }

    /// Check if the interval contains the given value (inclusive bounds)
    pub fn contains(&self, x: f64) -> bool {
        self.min <= x && x <= self.max
    }

    /// Width of the interval
    pub fn size(&self) -> f64 {
        self.max - self.min
    }
}
