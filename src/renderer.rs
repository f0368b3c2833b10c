//! Scene rendering.
//!
//! For every pixel the renderer finds the nearest opaque hit, integrates every
//! CT volume in front of it, shades the hit with Phong lighting and hard
//! shadows, and composites volume over surface over background.

use image::{ImageBuffer, Rgb};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rayon::prelude::*;

use crate::camera::Camera;
use crate::ctscan::OPAQUE_THRESHOLD;
use crate::geometry::{Geometry, Intersection};
use crate::interval::Interval;
use crate::light::Light;
use crate::material::{clamp_color, rgba, Color};
use crate::math::{normalize_or_self, Vector};
use crate::ray::Ray;

/// Colour of pixels that hit no opaque surface.
pub const BACKGROUND: Color = rgba(0.2, 0.2, 0.2, 1.0);

/// Offset used to step off surfaces and to keep volumes in front of them.
const EPSILON: f64 = 1e-4;

/// Linear image with one f32 RGB triple per pixel.
pub type Image = ImageBuffer<Rgb<f32>, Vec<f32>>;

/// Renders a fixed list of geometries and lights.
///
/// Scene state is read-only during a render, so pixels are traced in parallel.
pub struct RayTracer {
    geometries: Vec<Geometry>,
    lights: Vec<Light>,
    show_progress: bool,
}

impl RayTracer {
    /// Create a renderer. Geometry order is the tie-break order for hits at
    /// equal distance.
    pub fn new(geometries: Vec<Geometry>, lights: Vec<Light>) -> Self {
        Self { geometries, lights, show_progress: false }
    }

    /// Enable or disable the terminal progress bar.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Scene geometries in scan order.
    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    /// Scene lights.
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    fn opaque(&self) -> impl Iterator<Item = &Geometry> {
        self.geometries.iter().filter(|g| !g.is_volumetric())
    }

    fn volumes(&self) -> impl Iterator<Item = &Geometry> {
        self.geometries.iter().filter(|g| g.is_volumetric())
    }

    /// Nearest valid, visible hit among the opaque geometries.
    ///
    /// Ties keep the geometry that comes first in the scene list.
    pub fn find_first_intersection(&self, ray: &Ray, range: Interval) -> Intersection<'_> {
        let mut nearest = Intersection::NONE;
        for geometry in self.opaque() {
            let hit = geometry.intersect(ray, range, &self.lights);
            if !hit.is_hit() {
                continue;
            }
            if !nearest.is_hit() || hit.t < nearest.t {
                nearest = hit;
            }
        }
        nearest
    }

    /// Whether `point` sees `light` unobstructed by any opaque geometry.
    ///
    /// Volumes never block light.
    pub fn is_lit(&self, point: Vector, light: &Light) -> bool {
        let to_light = light.position - point;
        let distance = to_light.length();
        if distance <= EPSILON {
            return true;
        }

        let direction = to_light / distance;
        let ray = Ray::new(point + direction * EPSILON, direction);
        let max_distance = distance - EPSILON;

        !self.opaque().any(|geometry| {
            let hit = geometry.intersect(&ray, Interval::new(EPSILON, max_distance), &self.lights);
            hit.is_hit() && hit.t < max_distance
        })
    }

    /// Composite every volume along `range` front to back.
    ///
    /// Returns the premultiplied colour and the accumulated opacity.
    fn composite_volumes(&self, ray: &Ray, range: Interval) -> (Color, f64) {
        let mut color = Color::ZERO;
        let mut alpha = 0.0;
        if range.is_empty() {
            return (color, alpha);
        }

        for volume in self.volumes() {
            let hit = volume.intersect(ray, range, &self.lights);
            if !hit.valid {
                continue;
            }

            let sample_alpha = hit.color.w.clamp(0.0, 1.0);
            if sample_alpha <= 0.0 {
                continue;
            }

            let transmittance = 1.0 - alpha;
            if transmittance <= 0.0 {
                break;
            }

            color += hit.color * transmittance;
            alpha += transmittance * sample_alpha;
            if alpha > OPAQUE_THRESHOLD {
                break;
            }
        }

        (color, alpha)
    }

    /// Phong colour of an opaque hit seen from `eye`, summed over all lights.
    pub fn shade(&self, hit: &Intersection<'_>, eye: Vector) -> Color {
        let point = hit.position();
        let normal = normalize_or_self(hit.normal);
        let view = normalize_or_self(eye - point);
        let material = &hit.material;

        let mut color = Color::ZERO;
        for light in &self.lights {
            color += material.ambient * light.ambient;

            let to_light = light.position - point;
            let distance = to_light.length();
            if distance <= EPSILON || !self.is_lit(point + normal * EPSILON, light) {
                continue;
            }
            let to_light = to_light / distance;

            let diffuse = normal.dot(to_light).max(0.0);
            if diffuse > 0.0 {
                color += material.diffuse * light.diffuse * diffuse;
            }

            let half = normalize_or_self(to_light + view);
            let specular = normal.dot(half).max(0.0).powf(material.shininess);
            if specular > 0.0 {
                color += material.specular * light.specular * specular;
            }
        }
        color
    }

    /// Final colour seen along `ray`, channels clamped to [0, 1], alpha 1.
    pub fn trace(&self, ray: &Ray, camera: &Camera) -> Color {
        let front = camera.front_plane_distance;
        let back = camera.back_plane_distance;

        let opaque = self.find_first_intersection(ray, Interval::new(front, back));

        let mut volume_far = back;
        if opaque.is_hit() {
            volume_far = (opaque.t - EPSILON).min(back).max(front);
        }
        let (volume_color, alpha) = self.composite_volumes(ray, Interval::new(front, volume_far));

        let mut color = BACKGROUND;
        if alpha < OPAQUE_THRESHOLD && opaque.is_hit() {
            color = self.shade(&opaque, camera.position);
        }
        if alpha > 0.0 {
            color = volume_color + color * (1.0 - alpha);
        }

        let color = clamp_color(color);
        rgba(color.x, color.y, color.z, 1.0)
    }

    /// Render a `width` x `height` image.
    pub fn render(&self, camera: &Camera, width: u32, height: u32) -> Image {
        let frame = camera.frame(width, height);
        let mut image: Image = ImageBuffer::new(width, height);

        info!(
            "Rendering {}x{} ({} geometries, {} lights) on {} threads...",
            width,
            height,
            self.geometries.len(),
            self.lights.len(),
            rayon::current_num_threads()
        );
        let start = std::time::Instant::now();

        let pb = if self.show_progress {
            ProgressBar::new(u64::from(width) * u64::from(height))
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} ETA: {eta}") {
            pb.set_style(style);
        }

        image.enumerate_pixels_mut().par_bridge().for_each(|(i, j, pixel)| {
            let c = self.trace(&frame.ray(i, j), camera);
            *pixel = Rgb([c.x as f32, c.y as f32, c.z as f32]);
            pb.inc(1);
        });

        pb.finish_and_clear();
        info!("Image rendered in {:.2?}", start.elapsed());
        debug!("Background {:?}, {} volumes", BACKGROUND, self.volumes().count());

        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::ColorMap;
    use crate::ctscan::CtScan;
    use crate::ellipsoid::Ellipsoid;
    use crate::geometry::Intersect;
    use crate::material::Material;
    use crate::volume::VolumeField;

    fn sphere(center: Vector, radius: f64, color: Color) -> Geometry {
        let material = Material::new(
            rgba(0.1, 0.1, 0.1, 1.0),
            rgba(0.5, 0.5, 0.5, 1.0),
            rgba(0.3, 0.3, 0.3, 1.0),
            16.0,
        );
        Ellipsoid::new(center, Vector::ONE, radius, material, color).into()
    }

    fn fog_cube(min: Vector, size: usize, alpha: f64) -> Geometry {
        let field = VolumeField::from_fn([size; 3], [1.0; 3], min, 1.0, |_, _, _| 100).unwrap();
        CtScan::new(field, ColorMap::new().add(1, 255, rgba(1.0, 1.0, 1.0, alpha))).into()
    }

    fn white_light(position: Vector) -> Light {
        let white = rgba(1.0, 1.0, 1.0, 1.0);
        Light::new(position, white, white, white)
    }

    fn looking_down_z() -> Camera {
        Camera { position: Vector::new(0.0, 0.0, 10.0), ..Camera::default() }
    }

    #[test]
    fn test_empty_scene_is_background() {
        let tracer = RayTracer::new(Vec::new(), vec![white_light(Vector::splat(5.0))]);
        let image = tracer.render(&looking_down_z(), 8, 6);
        assert_eq!(image.dimensions(), (8, 6));
        for pixel in image.pixels() {
            assert_eq!(*pixel, Rgb([0.2f32, 0.2, 0.2]));
        }
    }

    #[test]
    fn test_nearest_hit_wins() {
        let tracer = RayTracer::new(
            vec![
                sphere(Vector::new(0.0, 0.0, -5.0), 1.0, rgba(1.0, 0.0, 0.0, 1.0)),
                sphere(Vector::new(0.0, 0.0, 0.0), 1.0, rgba(0.0, 1.0, 0.0, 1.0)),
            ],
            Vec::new(),
        );
        let ray = Ray::new(Vector::new(0.0, 0.0, 10.0), -Vector::Z);
        let hit = tracer.find_first_intersection(&ray, Interval::new(0.0, 100.0));
        assert!((hit.t - 9.0).abs() < 1e-10);
        assert_eq!(hit.color, rgba(0.0, 1.0, 0.0, 1.0));
        assert!(std::ptr::eq(hit.geometry.unwrap(), &tracer.geometries()[1]));
    }

    #[test]
    fn test_tie_keeps_first_geometry() {
        let tracer = RayTracer::new(
            vec![
                sphere(Vector::ZERO, 1.0, rgba(1.0, 0.0, 0.0, 1.0)),
                sphere(Vector::ZERO, 1.0, rgba(0.0, 0.0, 1.0, 1.0)),
            ],
            Vec::new(),
        );
        let ray = Ray::new(Vector::new(0.0, 0.0, 10.0), -Vector::Z);
        let hit = tracer.find_first_intersection(&ray, Interval::new(0.0, 100.0));
        assert_eq!(hit.color, rgba(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_volumes_are_not_opaque_hits() {
        let tracer = RayTracer::new(vec![fog_cube(Vector::splat(-2.0), 4, 0.5)], Vec::new());
        let ray = Ray::new(Vector::new(0.0, 0.0, 10.0), -Vector::Z);
        assert!(!tracer.find_first_intersection(&ray, Interval::new(0.0, 100.0)).valid);
    }

    #[test]
    fn test_occluder_blocks_light() {
        let light = white_light(Vector::new(0.0, 10.0, 0.0));
        let tracer = RayTracer::new(vec![sphere(Vector::new(0.0, 5.0, 0.0), 1.0, rgba(1.0, 1.0, 1.0, 1.0))], vec![light]);
        assert!(!tracer.is_lit(Vector::ZERO, &light));
        assert!(tracer.is_lit(Vector::new(5.0, 0.0, 0.0), &light));
    }

    #[test]
    fn test_volumes_cast_no_shadow() {
        let light = white_light(Vector::new(0.0, 10.0, 0.0));
        let tracer = RayTracer::new(vec![fog_cube(Vector::new(-2.0, 3.0, -2.0), 4, 1.0)], vec![light]);
        assert!(tracer.is_lit(Vector::ZERO, &light));
    }

    #[test]
    fn test_shadowed_point_gets_ambient_only() {
        let light = white_light(Vector::new(0.0, 10.0, 0.0));
        let tracer = RayTracer::new(
            vec![
                sphere(Vector::ZERO, 1.0, rgba(1.0, 1.0, 1.0, 1.0)),
                sphere(Vector::new(0.0, 5.0, 0.0), 1.0, rgba(1.0, 1.0, 1.0, 1.0)),
            ],
            vec![light],
        );
        // Top of the lower sphere, facing the light but behind the occluder
        let ray = Ray::new(Vector::new(0.0, 2.0, 0.0), -Vector::Y);
        let hit = tracer.find_first_intersection(&ray, Interval::new(0.0, 1.5));
        assert!(hit.is_hit());
        let color = tracer.shade(&hit, Vector::new(0.0, 2.0, 0.0));
        assert!((color - rgba(0.1, 0.1, 0.1, 1.0)).length() < 1e-12);

        // Without the occluder the same point also gets diffuse and specular
        let open = RayTracer::new(vec![sphere(Vector::ZERO, 1.0, rgba(1.0, 1.0, 1.0, 1.0))], vec![light]);
        let hit = open.find_first_intersection(&ray, Interval::new(0.0, 1.5));
        let color = open.shade(&hit, Vector::new(0.0, 2.0, 0.0));
        assert!((color.x - (0.1 + 0.5 + 0.3)).abs() < 1e-9);
    }

    #[test]
    fn test_no_lights_leaves_surface_black() {
        let tracer = RayTracer::new(vec![sphere(Vector::ZERO, 1.0, rgba(1.0, 1.0, 1.0, 1.0))], Vec::new());
        let ray = Ray::new(Vector::new(0.0, 0.0, 10.0), -Vector::Z);
        assert_eq!(tracer.trace(&ray, &looking_down_z()), rgba(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_volume_over_background() {
        let fog = fog_cube(Vector::splat(-2.0), 4, 0.05);
        let tracer = RayTracer::new(vec![fog.clone()], Vec::new());
        let camera = looking_down_z();
        let ray = Ray::new(camera.position, -Vector::Z);

        let Geometry::Volumetric(scan) = &fog else { unreachable!() };
        let volume = scan.intersect(&ray, Interval::new(camera.front_plane_distance, camera.back_plane_distance), &[]);
        assert!(volume.valid);

        let expected = clamp_color(volume.color + BACKGROUND * (1.0 - volume.color.w));
        let color = tracer.trace(&ray, &camera);
        assert!((color.truncate() - expected.truncate()).length() < 1e-12);
        assert_eq!(color.w, 1.0);
    }

    #[test]
    fn test_volume_behind_surface_is_hidden() {
        let tracer = RayTracer::new(
            vec![
                fog_cube(Vector::new(-2.0, -2.0, -10.0), 4, 0.5),
                sphere(Vector::ZERO, 1.0, rgba(1.0, 1.0, 1.0, 1.0)),
            ],
            Vec::new(),
        );
        let ray = Ray::new(Vector::new(0.0, 0.0, 10.0), -Vector::Z);
        assert_eq!(tracer.trace(&ray, &looking_down_z()), rgba(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_opaque_volume_hides_surface() {
        let tracer = RayTracer::new(
            vec![
                sphere(Vector::ZERO, 1.0, rgba(1.0, 1.0, 1.0, 1.0)),
                fog_cube(Vector::new(-2.0, -2.0, 3.0), 4, 1.0),
            ],
            vec![white_light(Vector::new(0.0, 0.0, 20.0))],
        );
        let ray = Ray::new(Vector::new(0.0, 0.0, 10.0), -Vector::Z);
        let (_, alpha) = tracer.composite_volumes(&ray, Interval::new(0.0, 9.0 - EPSILON));
        assert!(alpha > OPAQUE_THRESHOLD);

        // The first sample saturates; its gradient faces away from the light,
        // leaving the ambient floor 1.0 * 0.2 + 0.05 and nothing from behind.
        let color = tracer.trace(&ray, &looking_down_z());
        assert!((color.x - 0.25).abs() < 1e-9);
    }
}
