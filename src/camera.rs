//! Pinhole camera and view-plane ray generation.

use crate::math::{normalize_or_self, Vector};
use crate::ray::Ray;

/// Pinhole camera looking through a rectangular view plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Eye position in world space
    pub position: Vector,
    /// Viewing direction (normalized before use)
    pub direction: Vector,
    /// Approximate up direction (re-orthogonalized before use)
    pub up: Vector,
    /// Distance from the eye to the view plane
    pub view_plane_distance: f64,
    /// View plane width in world units
    pub view_plane_width: f64,
    /// View plane height in world units
    pub view_plane_height: f64,
    /// Nearest distance along a ray that is rendered
    pub front_plane_distance: f64,
    /// Farthest distance along a ray that is rendered
    pub back_plane_distance: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vector::new(0.0, 0.0, 10.0),
            direction: Vector::new(0.0, 0.0, -1.0),
            up: Vector::Y,
            view_plane_distance: 1.0,
            view_plane_width: 1.6,
            view_plane_height: 1.0,
            front_plane_distance: 0.0,
            back_plane_distance: 1000.0,
        }
    }
}

impl Camera {
    /// Orthonormal camera basis for an image of `width` x `height` pixels.
    ///
    /// Computes once what every pixel ray needs: the view-plane center, the
    /// right/up axes and the pixel size.
    pub fn frame(&self, width: u32, height: u32) -> CameraFrame {
        let forward = normalize_or_self(self.direction);
        let up = normalize_or_self(self.up);
        let right = normalize_or_self(forward.cross(up));
        let up = normalize_or_self(right.cross(forward));

        CameraFrame {
            eye: self.position,
            view_plane_center: self.position + forward * self.view_plane_distance,
            right,
            up,
            width,
            height,
            view_plane_width: self.view_plane_width,
            view_plane_height: self.view_plane_height,
        }
    }
}

/// Precomputed view-plane geometry for one image size.
#[derive(Debug, Clone, Copy)]
pub struct CameraFrame {
    eye: Vector,
    view_plane_center: Vector,
    right: Vector,
    up: Vector,
    width: u32,
    height: u32,
    view_plane_width: f64,
    view_plane_height: f64,
}

/// Offset of pixel index `n` from the view-plane center, measured from the
/// plane's positive edge.
fn image_to_view_plane(n: u32, image_size: u32, view_plane_size: f64) -> f64 {
    -f64::from(n) * view_plane_size / f64::from(image_size) + view_plane_size / 2.0
}

impl CameraFrame {
    /// World position of the center of pixel (i, j); (0, 0) is the top left.
    pub fn pixel_position(&self, i: u32, j: u32) -> Vector {
        let pixel_width = self.view_plane_width / f64::from(self.width);
        let pixel_height = self.view_plane_height / f64::from(self.height);

        let x = image_to_view_plane(i, self.width, self.view_plane_width) - pixel_width * 0.5;
        let y = image_to_view_plane(j, self.height, self.view_plane_height) - pixel_height * 0.5;

        self.view_plane_center - self.right * x + self.up * y
    }

    /// Primary ray from the eye through pixel (i, j), with unit direction.
    pub fn ray(&self, i: u32, j: u32) -> Ray {
        Ray::through(self.eye, self.pixel_position(i, j))
    }
}
