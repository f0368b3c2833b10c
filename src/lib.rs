//! ctray: CT-volume ray tracer
//!
//! Renders CT scans as semi-transparent volumes composited over Phong-shaded
//! ellipsoids, one primary ray per pixel. Outputs PNG and EXR.

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod camera;
pub mod colormap;
pub mod ctscan;
pub mod ellipsoid;
pub mod error;
pub mod geometry;
pub mod interval;
pub mod light;
pub mod material;
pub mod math;
pub mod output;
pub mod ray;
pub mod renderer;
pub mod scene;
pub mod volume;

pub use error::{Error, Result};
