//! Dense voxel grid backing a CT scan.
//!
//! The grid stores one density byte per voxel, x fastest, then y, then z. Reads
//! outside the grid return zero density, so callers can sample freely near the
//! edges. Fields are built once, from a `.dat` metadata file and a `.raw` byte
//! stream or procedurally, and never change afterwards.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::debug;

use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::math::Vector;
use crate::ray::Ray;

/// Direction components below this magnitude are treated as parallel to a slab.
const PARALLEL_EPSILON: f64 = 1e-8;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vector,
    /// Maximum corner
    pub max: Vector,
}

impl Aabb {
    /// Box spanned by two arbitrary opposite corners.
    pub fn from_corners(a: Vector, b: Vector) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    /// Whether `p` lies inside the box grown by `eps` on every side.
    pub fn contains(&self, p: Vector, eps: f64) -> bool {
        p.cmpge(self.min - eps).all() && p.cmple(self.max + eps).all()
    }

    /// Clip `range` to the part of `ray` inside the box (slab method).
    ///
    /// Returns `None` when the ray misses the box or only touches it in a
    /// single point.
    pub fn clip(&self, ray: &Ray, range: Interval) -> Option<Interval> {
        let mut t_min = range.min;
        let mut t_max = range.max;

        for axis in 0..3 {
            let dir = ray.direction[axis];
            let orig = ray.origin[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if dir.abs() < PARALLEL_EPSILON {
                if orig < lo || orig > hi {
                    return None;
                }
                continue;
            }

            let inv_dir = 1.0 / dir;
            let mut t0 = (lo - orig) * inv_dir;
            let mut t1 = (hi - orig) * inv_dir;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }

            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        let clipped = Interval::new(t_min.max(range.min), t_max.min(range.max));
        if clipped.is_empty() || !clipped.min.is_finite() || !clipped.max.is_finite() {
            return None;
        }
        Some(clipped)
    }
}

/// Grid description read from a `.dat` file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeMetadata {
    /// Voxel count per axis
    pub resolution: [usize; 3],
    /// Physical slice thickness per axis
    pub thickness: [f64; 3],
}

impl VolumeMetadata {
    /// Parse `Resolution` and `SliceThickness` lines.
    ///
    /// Fields are separated by any run of `:`, tab or space. Other keys are
    /// ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let mut resolution = None;
        let mut thickness = None;

        for line in text.lines() {
            let fields: Vec<&str> = line
                .trim()
                .split([':', '\t', ' '])
                .filter(|s| !s.is_empty())
                .collect();

            match fields.first() {
                Some(&"Resolution") => resolution = Some(parse_triple::<usize>("Resolution", &fields[1..])?),
                Some(&"SliceThickness") => thickness = Some(parse_triple::<f64>("SliceThickness", &fields[1..])?),
                _ => {}
            }
        }

        Ok(Self {
            resolution: resolution.ok_or_else(|| Error::InvalidMetadata("missing Resolution".into()))?,
            thickness: thickness.ok_or_else(|| Error::InvalidMetadata("missing SliceThickness".into()))?,
        })
    }
}

fn parse_triple<T: FromStr + Copy>(key: &str, fields: &[&str]) -> Result<[T; 3]> {
    if fields.len() < 3 {
        return Err(Error::InvalidMetadata(format!("{key} needs 3 values, got {}", fields.len())));
    }
    let parse = |s: &str| {
        s.parse::<T>()
            .map_err(|_| Error::InvalidMetadata(format!("{key}: cannot parse '{s}'")))
    };
    Ok([parse(fields[0])?, parse(fields[1])?, parse(fields[2])?])
}

/// Immutable density grid placed in world space.
#[derive(Debug, Clone)]
pub struct VolumeField {
    resolution: [usize; 3],
    thickness: Vector,
    scale: f64,
    position: Vector,
    pitch: Vector,
    bounds: Aabb,
    data: Vec<u8>,
}

impl VolumeField {
    /// Build a field from raw voxel bytes.
    ///
    /// Fails if any resolution is zero, a thickness is not a positive finite
    /// number, or `data` does not hold exactly `nx * ny * nz` bytes.
    pub fn new(
        resolution: [usize; 3],
        thickness: [f64; 3],
        position: Vector,
        scale: f64,
        data: Vec<u8>,
    ) -> Result<Self> {
        if resolution.contains(&0) {
            return Err(Error::InvalidMetadata(format!("resolution must be positive, got {resolution:?}")));
        }
        if thickness.iter().any(|t| !t.is_finite() || *t <= 0.0) {
            return Err(Error::InvalidMetadata(format!("slice thickness must be positive, got {thickness:?}")));
        }

        let expected = resolution
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| Error::InvalidMetadata(format!("resolution {resolution:?} overflows")))?;
        if data.len() != expected {
            return Err(Error::VoxelCountMismatch { expected, actual: data.len() });
        }

        let thickness = Vector::from_array(thickness);
        let extent = Vector::new(resolution[0] as f64, resolution[1] as f64, resolution[2] as f64) * thickness * scale;

        Ok(Self {
            resolution,
            thickness,
            scale,
            position,
            pitch: thickness * scale,
            bounds: Aabb::from_corners(position, position + extent),
            data,
        })
    }

    /// Build a field by evaluating `density(x, y, z)` at every voxel.
    pub fn from_fn(
        resolution: [usize; 3],
        thickness: [f64; 3],
        position: Vector,
        scale: f64,
        density: impl Fn(usize, usize, usize) -> u8,
    ) -> Result<Self> {
        let [nx, ny, nz] = resolution;
        let mut data = Vec::with_capacity(nx.saturating_mul(ny).saturating_mul(nz));
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    data.push(density(x, y, z));
                }
            }
        }
        Self::new(resolution, thickness, position, scale, data)
    }

    /// Load a field from a `.dat` metadata file and a `.raw` voxel file.
    pub fn load(dat_path: impl AsRef<Path>, raw_path: impl AsRef<Path>, position: Vector, scale: f64) -> Result<Self> {
        let dat_path = dat_path.as_ref();
        let raw_path = raw_path.as_ref();

        let text = fs::read_to_string(dat_path).map_err(|e| Error::io(dat_path, e))?;
        let meta = VolumeMetadata::parse(&text)?;
        let data = fs::read(raw_path).map_err(|e| Error::io(raw_path, e))?;

        let field = Self::new(meta.resolution, meta.thickness, position, scale, data)?;
        debug!(
            "Loaded volume {} ({:?} voxels, bounds {:?} .. {:?})",
            raw_path.display(),
            field.resolution,
            field.bounds.min,
            field.bounds.max
        );
        Ok(field)
    }

    /// Voxel count per axis.
    pub fn resolution(&self) -> [usize; 3] {
        self.resolution
    }

    /// World-space size of one voxel on each axis (thickness times scale).
    pub fn pitch(&self) -> Vector {
        self.pitch
    }

    /// World-space origin of voxel (0, 0, 0).
    pub fn position(&self) -> Vector {
        self.position
    }

    /// World-space bounding box.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Ray-march step: half the smallest voxel pitch.
    pub fn step(&self) -> f64 {
        self.thickness.min_element() * self.scale * 0.5
    }

    /// Density of voxel (x, y, z), or 0 outside the grid.
    pub fn value(&self, x: i64, y: i64, z: i64) -> u8 {
        let [nx, ny, nz] = self.resolution;
        if x < 0 || y < 0 || z < 0 {
            return 0;
        }
        let (x, y, z) = (x as usize, y as usize, z as usize);
        if x >= nx || y >= ny || z >= nz {
            return 0;
        }
        self.data[(z * ny + y) * nx + x]
    }

    /// Trilinearly interpolated density at world position `p`.
    pub fn sample(&self, p: Vector) -> f64 {
        let local = (p - self.position) / self.pitch;
        if !local.is_finite() {
            return 0.0;
        }

        let base = local.floor();
        let f = local - base;
        // Clamped so far cells keep both corners outside the grid
        let [nx, ny, nz] = self.resolution;
        let index = |v: f64, n: usize| v.clamp(-2.0, n as f64) as i64;
        let (ix, iy, iz) = (index(base.x, nx), index(base.y, ny), index(base.z, nz));
        let c = |dx: i64, dy: i64, dz: i64| f64::from(self.value(ix + dx, iy + dy, iz + dz));

        let c00 = c(0, 0, 0) * (1.0 - f.x) + c(1, 0, 0) * f.x;
        let c10 = c(0, 1, 0) * (1.0 - f.x) + c(1, 1, 0) * f.x;
        let c01 = c(0, 0, 1) * (1.0 - f.x) + c(1, 0, 1) * f.x;
        let c11 = c(0, 1, 1) * (1.0 - f.x) + c(1, 1, 1) * f.x;

        let c0 = c00 * (1.0 - f.y) + c10 * f.y;
        let c1 = c01 * (1.0 - f.y) + c11 * f.y;

        c0 * (1.0 - f.z) + c1 * f.z
    }

    /// Density gradient at `p` by central differences one pitch either side,
    /// with the stencil clamped to the bounding box.
    pub fn gradient(&self, p: Vector) -> Vector {
        let mut gradient = Vector::ZERO;
        for axis in 0..3 {
            let mut ahead = p;
            let mut behind = p;
            ahead[axis] = (p[axis] + self.pitch[axis]).min(self.bounds.max[axis]);
            behind[axis] = (p[axis] - self.pitch[axis]).max(self.bounds.min[axis]);

            let span = (ahead[axis] - behind[axis]).max(PARALLEL_EPSILON);
            gradient[axis] = (self.sample(ahead) - self.sample(behind)) / span;
        }
        gradient
    }
}
