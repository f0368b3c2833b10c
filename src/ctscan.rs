//! Volumetric CT-scan geometry.
//!
//! A ray is marched through the scan's bounding box in half-voxel steps. Each
//! step samples the density field, maps it through the colour map, lights it
//! with a gradient normal and composites it front to back. The whole segment
//! collapses into one [`Intersection`] whose colour carries the premultiplied
//! RGB and accumulated opacity.

use std::path::Path;

use crate::colormap::ColorMap;
use crate::error::Result;
use crate::geometry::{Intersect, Intersection};
use crate::interval::Interval;
use crate::light::Light;
use crate::material::{clamp_color, rgba, Color, Material};
use crate::math::Vector;
use crate::ray::Ray;
use crate::volume::VolumeField;

const EPSILON: f64 = 1e-8;

/// Accumulated opacity above which marching stops.
pub const OPAQUE_THRESHOLD: f64 = 0.995;

/// Brightness of samples with no usable normal, or when the scene is unlit.
pub const AMBIENT_ONLY: f64 = 0.15;

/// CT scan rendered as a semi-transparent volume.
#[derive(Debug, Clone)]
pub struct CtScan {
    field: VolumeField,
    color_map: ColorMap,
}

impl CtScan {
    /// Wrap an existing field.
    pub fn new(field: VolumeField, color_map: ColorMap) -> Self {
        Self { field, color_map }
    }

    /// Load a scan from `.dat` + `.raw` files placed at `position`.
    pub fn load(
        dat_path: impl AsRef<Path>,
        raw_path: impl AsRef<Path>,
        position: Vector,
        scale: f64,
        color_map: ColorMap,
    ) -> Result<Self> {
        Ok(Self::new(VolumeField::load(dat_path, raw_path, position, scale)?, color_map))
    }

    /// Density grid.
    pub fn field(&self) -> &VolumeField {
        &self.field
    }

    /// Density transfer function.
    pub fn color_map(&self) -> &ColorMap {
        &self.color_map
    }

    /// Colour of one density sample after lighting, channels in [0, 1].
    fn shade_sample(&self, base: Color, position: Vector, lights: &[Light]) -> Vector {
        let base = base.truncate().clamp(Vector::ZERO, Vector::ONE);
        let normal = self.field.gradient(position);
        let has_normal = normal.length() > 1e-6;

        if lights.is_empty() || !has_normal {
            return (base * AMBIENT_ONLY).clamp(Vector::ZERO, Vector::ONE);
        }
        let normal = normal.normalize();

        let mut ambient = 0.0;
        let mut diffuse = Vector::ZERO;
        for light in lights {
            let a = light.ambient;
            ambient += (a.x + a.y + a.z) / 3.0;

            let to_light = light.position - position;
            let distance = to_light.length();
            if distance < EPSILON {
                continue;
            }
            let n_dot_l = normal.dot(to_light / distance).max(0.0);
            if n_dot_l <= 0.0 {
                continue;
            }
            diffuse += light.diffuse.truncate() * n_dot_l;
        }

        let count = lights.len() as f64;
        let ambient = ambient / count * 0.2 + 0.05;
        let diffuse = diffuse / count;
        let factor = (Vector::splat(ambient) + diffuse).clamp(Vector::ZERO, Vector::ONE);

        (base * factor).clamp(Vector::ZERO, Vector::ONE)
    }

    /// March the segment `span` of `ray`, calling `on_step` with the
    /// accumulated alpha after every composited sample.
    fn march(&self, ray: &Ray, span: Interval, lights: &[Light], mut on_step: impl FnMut(f64)) -> Color {
        let step = self.field.step();
        let bounds = self.field.bounds();

        let mut color = Vector::ZERO;
        let mut alpha = 0.0;

        let mut t = span.min;
        while t <= span.max && alpha < OPAQUE_THRESHOLD {
            let position = ray.at(t);
            t += step;

            if !bounds.contains(position, EPSILON) {
                continue;
            }

            let density = self.field.sample(position);
            if density <= 0.0 {
                continue;
            }

            let mapped = self.color_map.lookup(density.round_ties_even().clamp(0.0, f64::from(u16::MAX)) as u16);
            let sample_alpha = mapped.w.clamp(0.0, 1.0);
            if sample_alpha <= 0.0 {
                continue;
            }

            let transmittance = 1.0 - alpha;
            if transmittance <= 0.0 {
                break;
            }

            let lit = self.shade_sample(mapped, position, lights);
            let weight = transmittance * sample_alpha;
            color += lit * weight;
            alpha += weight;
            on_step(alpha);
        }

        color.extend(alpha)
    }
}

impl Intersect for CtScan {
    fn intersect(&self, ray: &Ray, range: Interval, lights: &[Light]) -> Intersection<'static> {
        let Some(span) = self.field.bounds().clip(ray, range) else {
            return Intersection::NONE;
        };
        if self.field.step() <= EPSILON {
            return Intersection::NONE;
        }

        let accumulated = self.march(ray, span, lights, |_| {});
        if accumulated.w <= 0.0 || !accumulated.is_finite() {
            return Intersection::NONE;
        }

        Intersection {
            valid: true,
            visible: true,
            geometry: None,
            ray: *ray,
            t: span.min,
            normal: Vector::ZERO,
            material: Material::BLANK,
            color: clamp_color(rgba(accumulated.x, accumulated.y, accumulated.z, accumulated.w)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::rgba;

    /// 8x8x8 cube of uniform density 100 occupying [0, 8]^3.
    fn solid_cube(color: Color) -> CtScan {
        let field = VolumeField::from_fn([8, 8, 8], [1.0; 3], Vector::ZERO, 1.0, |_, _, _| 100).unwrap();
        CtScan::new(field, ColorMap::new().add(1, 255, color))
    }

    /// Ball of density 200 with radius 3 voxels in a 9^3 grid.
    fn ball(color: Color) -> CtScan {
        let field = VolumeField::from_fn([9, 9, 9], [1.0; 3], Vector::ZERO, 1.0, |x, y, z| {
            let d = Vector::new(x as f64, y as f64, z as f64) - Vector::splat(4.0);
            if d.length() <= 3.0 { 200 } else { 0 }
        })
        .unwrap();
        CtScan::new(field, ColorMap::new().add(1, 255, color))
    }

    fn white_light(position: Vector) -> Light {
        Light::new(position, rgba(1.0, 1.0, 1.0, 1.0), rgba(1.0, 1.0, 1.0, 1.0), rgba(1.0, 1.0, 1.0, 1.0))
    }

    /// Two voxels along x with densities `first` and `first + 1`.
    fn voxel_pair(first: u8, mapped: u16) -> CtScan {
        let field = VolumeField::from_fn([2, 1, 1], [1.0; 3], Vector::ZERO, 1.0, |x, _, _| first + x as u8).unwrap();
        CtScan::new(field, ColorMap::new().add(mapped, mapped, rgba(1.0, 1.0, 1.0, 1.0)))
    }

    #[test]
    fn test_half_density_rounds_to_even() {
        let ray = Ray::new(Vector::ZERO, Vector::X);
        let span = Interval::new(0.0, 0.5);

        // 50.5 rounds down to 50, which the map leaves transparent
        let scan = voxel_pair(50, 51);
        assert_eq!(scan.field().sample(ray.at(0.5)), 50.5);
        assert_eq!(scan.march(&ray, span, &[], |_| {}).w, 0.0);

        // 51.5 rounds up to 52
        let scan = voxel_pair(51, 52);
        assert_eq!(scan.march(&ray, span, &[], |_| {}).w, 1.0);
    }

    #[test]
    fn test_bright_map_colour_is_clamped() {
        let scan = solid_cube(rgba(2.0, 2.0, 2.0, 1.0));
        let lit = scan.shade_sample(rgba(2.0, 2.0, 2.0, 1.0), Vector::splat(4.0), &[]);
        assert!((lit - Vector::splat(AMBIENT_ONLY)).length() < 1e-12);
    }

    #[test]
    fn test_ray_outside_box_is_invalid() {
        let scan = solid_cube(rgba(1.0, 1.0, 1.0, 0.1));
        let ray = Ray::new(Vector::new(-5.0, 20.0, 4.0), Vector::X);
        assert!(!scan.intersect(&ray, Interval::new(0.0, 100.0), &[]).valid);

        // Pointing away from the box
        let ray = Ray::new(Vector::new(-5.0, 4.0, 4.0), -Vector::X);
        assert!(!scan.intersect(&ray, Interval::new(0.0, 100.0), &[]).valid);
    }

    #[test]
    fn test_grazing_ray_is_invalid() {
        let scan = solid_cube(rgba(1.0, 1.0, 1.0, 0.5));
        let ray = Ray::new(Vector::new(-1.0, 7.0, 4.0), Vector::new(1.0, 1.0, 0.0));
        assert!(!scan.intersect(&ray, Interval::new(0.0, 100.0), &[]).valid);
    }

    #[test]
    fn test_transparent_map_is_invalid() {
        let scan = solid_cube(rgba(1.0, 1.0, 1.0, 0.0));
        let ray = Ray::new(Vector::new(-5.0, 4.0, 4.0), Vector::X);
        assert!(!scan.intersect(&ray, Interval::new(0.0, 100.0), &[]).valid);
    }

    #[test]
    fn test_hit_reports_entry_and_opacity() {
        let scan = solid_cube(rgba(1.0, 0.5, 0.25, 0.05));
        let ray = Ray::new(Vector::new(-5.0, 4.0, 4.0), Vector::X);
        let hit = scan.intersect(&ray, Interval::new(0.0, 100.0), &[]);
        assert!(hit.valid && hit.visible);
        assert!((hit.t - 5.0).abs() < 1e-12);
        assert!(hit.color.w > 0.0 && hit.color.w <= 1.0);
        assert_eq!(hit.material, Material::BLANK);
    }

    #[test]
    fn test_alpha_monotone_and_bounded() {
        let scan = solid_cube(rgba(1.0, 1.0, 1.0, 0.3));
        let ray = Ray::new(Vector::new(-5.0, 4.0, 4.0), Vector::X);
        let span = scan.field().bounds().clip(&ray, Interval::new(0.0, 100.0)).unwrap();

        let mut history = Vec::new();
        let result = scan.march(&ray, span, &[], |a| history.push(a));
        assert!(!history.is_empty());
        assert!(history.windows(2).all(|w| w[1] >= w[0]));
        assert!(history.iter().all(|&a| a <= 1.0));
        assert!(result.w > OPAQUE_THRESHOLD);
    }

    #[test]
    fn test_early_out_stops_marching() {
        let scan = solid_cube(rgba(1.0, 1.0, 1.0, 0.9));
        let ray = Ray::new(Vector::new(-5.0, 4.0, 4.0), Vector::X);
        let span = scan.field().bounds().clip(&ray, Interval::new(0.0, 100.0)).unwrap();

        let mut steps = 0;
        scan.march(&ray, span, &[], |_| steps += 1);
        // 0.9, 0.99, 0.999 -> stops after the third sample
        assert_eq!(steps, 3);
    }

    #[test]
    fn test_no_lights_is_ambient_only() {
        let base = rgba(0.8, 0.4, 0.2, 1.0);
        let scan = ball(base);
        // Sample on the ball's surface where the gradient is non-zero
        let p = Vector::new(1.2, 4.0, 4.0);
        assert!(scan.field().gradient(p).length() > 1e-6);

        let lit = scan.shade_sample(base, p, &[]);
        assert!((lit - Vector::new(0.8, 0.4, 0.2) * AMBIENT_ONLY).length() < 1e-12);
    }

    #[test]
    fn test_flat_density_is_ambient_only() {
        let base = rgba(1.0, 1.0, 1.0, 1.0);
        let scan = solid_cube(base);
        let lit = scan.shade_sample(base, Vector::splat(4.0), &[white_light(Vector::new(-10.0, 4.0, 4.0))]);
        assert!((lit - Vector::splat(AMBIENT_ONLY)).length() < 1e-12);
    }

    #[test]
    fn test_diffuse_follows_density_gradient() {
        let base = rgba(1.0, 1.0, 1.0, 1.0);
        let scan = ball(base);
        let lights = [white_light(Vector::new(-20.0, 4.0, 4.0))];

        // The gradient points into the ball, so the far side faces the light.
        let toward = scan.shade_sample(base, Vector::new(6.8, 4.0, 4.0), &lights);
        let away = scan.shade_sample(base, Vector::new(1.2, 4.0, 4.0), &lights);
        assert!((toward.x - 1.0).abs() < 1e-9);
        // Only the ambient floor: 1.0 * 0.2 + 0.05
        assert!((away.x - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_range_limits_marching() {
        let scan = solid_cube(rgba(1.0, 1.0, 1.0, 0.01));
        let ray = Ray::new(Vector::new(-5.0, 4.0, 4.0), Vector::X);
        let short = scan.intersect(&ray, Interval::new(0.0, 6.0), &[]);
        let long = scan.intersect(&ray, Interval::new(0.0, 100.0), &[]);
        assert!(short.valid);
        assert!(short.color.w < long.color.w);

        // Range ends before the box
        assert!(!scan.intersect(&ray, Interval::new(0.0, 4.0), &[]).valid);
    }

    #[test]
    fn test_zero_scale_is_invalid() {
        let field = VolumeField::from_fn([2, 2, 2], [1.0; 3], Vector::ZERO, 0.0, |_, _, _| 100).unwrap();
        let scan = CtScan::new(field, ColorMap::new().add(1, 255, rgba(1.0, 1.0, 1.0, 1.0)));
        let ray = Ray::new(Vector::new(0.0, 0.0, -5.0), Vector::Z);
        assert!(!scan.intersect(&ray, Interval::new(0.0, 100.0), &[]).valid);
    }
}
