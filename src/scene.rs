//! Scene description.
//!
//! Scenes are read from TOML:
//!
//! ```toml
//! [image]
//! width = 800
//! height = 500
//!
//! [camera]
//! position = [0.0, 0.0, 30.0]
//! direction = [0.0, 0.0, -1.0]
//! up = [0.0, 1.0, 0.0]
//!
//! [[light]]
//! position = [20.0, 20.0, 20.0]
//! ambient = [0.2, 0.2, 0.2]
//! diffuse = [0.8, 0.8, 0.8]
//! specular = [1.0, 1.0, 1.0]
//!
//! [[ellipsoid]]
//! center = [0.0, 0.0, 0.0]
//! semi_axes = [2.0, 1.0, 1.0]
//! radius = 1.5
//! rotation_axis = [0.0, 0.0, 1.0]
//! rotation_angle = 30.0
//! color = [1.0, 0.2, 0.2]
//!
//! [[volume]]
//! dat = "head.dat"
//! raw = "head.raw"
//! position = [-10.0, -10.0, -10.0]
//! scale = 0.1
//! color_map = [
//!     { min = 40, max = 90, color = [0.9, 0.6, 0.5, 0.01] },
//!     { min = 91, max = 255, color = [1.0, 1.0, 0.95, 0.2] },
//! ]
//! ```
//!
//! Colours take three or four channels; alpha defaults to 1. Volume data paths
//! are resolved relative to the scene file.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::camera::Camera;
use crate::colormap::{ColorMap, ColorRange};
use crate::ctscan::CtScan;
use crate::ellipsoid::Ellipsoid;
use crate::error::{Error, Result};
use crate::geometry::Geometry;
use crate::light::Light;
use crate::material::{rgba, Color, Material};
use crate::math::{Quaternion, Vector};
use crate::renderer::RayTracer;
use crate::volume::VolumeField;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SceneConfig {
    #[serde(default)]
    image: ImageConfig,
    #[serde(default)]
    camera: CameraConfig,
    #[serde(default, rename = "light")]
    lights: Vec<LightConfig>,
    #[serde(default, rename = "ellipsoid")]
    ellipsoids: Vec<EllipsoidConfig>,
    #[serde(default, rename = "volume")]
    volumes: Vec<VolumeConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ImageConfig {
    width: u32,
    height: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self { width: 800, height: 500 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CameraConfig {
    position: [f64; 3],
    direction: [f64; 3],
    up: [f64; 3],
    view_plane_distance: f64,
    view_plane_width: f64,
    view_plane_height: f64,
    front_plane_distance: f64,
    back_plane_distance: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let camera = Camera::default();
        Self {
            position: camera.position.to_array(),
            direction: camera.direction.to_array(),
            up: camera.up.to_array(),
            view_plane_distance: camera.view_plane_distance,
            view_plane_width: camera.view_plane_width,
            view_plane_height: camera.view_plane_height,
            front_plane_distance: camera.front_plane_distance,
            back_plane_distance: camera.back_plane_distance,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LightConfig {
    position: [f64; 3],
    ambient: Vec<f64>,
    diffuse: Vec<f64>,
    specular: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MaterialConfig {
    ambient: Vec<f64>,
    diffuse: Vec<f64>,
    specular: Vec<f64>,
    shininess: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EllipsoidConfig {
    center: [f64; 3],
    semi_axes: [f64; 3],
    #[serde(default = "default_one")]
    radius: f64,
    /// Explicit quaternion as [w, x, y, z]
    rotation: Option<[f64; 4]>,
    rotation_axis: Option<[f64; 3]>,
    /// Degrees
    rotation_angle: Option<f64>,
    material: Option<MaterialConfig>,
    color: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VolumeConfig {
    dat: PathBuf,
    raw: PathBuf,
    #[serde(default)]
    position: [f64; 3],
    #[serde(default = "default_one")]
    scale: f64,
    color_map: Vec<ColorRangeConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColorRangeConfig {
    min: u16,
    max: u16,
    color: Vec<f64>,
}

fn default_one() -> f64 {
    1.0
}

fn parse_color(values: &[f64], what: &str) -> Result<Color> {
    match *values {
        [r, g, b] => Ok(rgba(r, g, b, 1.0)),
        [r, g, b, a] => Ok(rgba(r, g, b, a)),
        _ => Err(Error::InvalidScene(format!("{what}: expected 3 or 4 channels, got {}", values.len()))),
    }
}

impl CameraConfig {
    fn build(&self) -> Result<Camera> {
        if self.view_plane_width <= 0.0 || self.view_plane_height <= 0.0 {
            return Err(Error::InvalidScene("camera view plane must have positive size".into()));
        }
        Ok(Camera {
            position: Vector::from_array(self.position),
            direction: Vector::from_array(self.direction),
            up: Vector::from_array(self.up),
            view_plane_distance: self.view_plane_distance,
            view_plane_width: self.view_plane_width,
            view_plane_height: self.view_plane_height,
            front_plane_distance: self.front_plane_distance,
            back_plane_distance: self.back_plane_distance,
        })
    }
}

impl LightConfig {
    fn build(&self, index: usize) -> Result<Light> {
        Ok(Light::new(
            Vector::from_array(self.position),
            parse_color(&self.ambient, &format!("light {index} ambient"))?,
            parse_color(&self.diffuse, &format!("light {index} diffuse"))?,
            parse_color(&self.specular, &format!("light {index} specular"))?,
        ))
    }
}

impl EllipsoidConfig {
    fn build(&self, index: usize) -> Result<Ellipsoid> {
        let color = parse_color(&self.color, &format!("ellipsoid {index} color"))?;
        let material = match &self.material {
            Some(m) => Material::new(
                parse_color(&m.ambient, &format!("ellipsoid {index} material ambient"))?,
                parse_color(&m.diffuse, &format!("ellipsoid {index} material diffuse"))?,
                parse_color(&m.specular, &format!("ellipsoid {index} material specular"))?,
                m.shininess,
            ),
            None => Material::from_color(color),
        };

        let rotation = match (self.rotation, self.rotation_axis, self.rotation_angle) {
            (Some([w, x, y, z]), None, None) => Quaternion::new(w, x, y, z),
            (None, Some(axis), Some(angle)) => Quaternion::from_axis_angle(angle.to_radians(), Vector::from_array(axis)),
            (None, None, None) => Quaternion::NONE,
            _ => {
                return Err(Error::InvalidScene(format!(
                    "ellipsoid {index}: give either rotation or rotation_axis + rotation_angle"
                )))
            }
        };

        Ok(Ellipsoid::new(
            Vector::from_array(self.center),
            Vector::from_array(self.semi_axes),
            self.radius,
            material,
            color,
        )
        .with_rotation(rotation))
    }
}

impl VolumeConfig {
    fn build(&self, index: usize, base_dir: &Path) -> Result<CtScan> {
        let ranges = self
            .color_map
            .iter()
            .map(|r| {
                if r.min > r.max {
                    return Err(Error::InvalidScene(format!("volume {index}: color range {}..{} is reversed", r.min, r.max)));
                }
                Ok(ColorRange { min: r.min, max: r.max, color: parse_color(&r.color, &format!("volume {index} color map"))? })
            })
            .collect::<Result<ColorMap>>()?;

        CtScan::load(
            base_dir.join(&self.dat),
            base_dir.join(&self.raw),
            Vector::from_array(self.position),
            self.scale,
            ranges,
        )
    }
}

/// Everything needed to render one image.
#[derive(Debug, Clone)]
pub struct Scene {
    /// Viewpoint
    pub camera: Camera,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Objects in scan order
    pub geometries: Vec<Geometry>,
    /// Point lights
    pub lights: Vec<Light>,
}

impl Scene {
    /// Read a scene file. Volume paths resolve against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml(&text, base_dir)
    }

    /// Parse a scene from TOML text.
    pub fn from_toml(text: &str, base_dir: &Path) -> Result<Self> {
        let config: SceneConfig = toml::from_str(text)?;
        if config.image.width == 0 || config.image.height == 0 {
            return Err(Error::InvalidScene("image size must be positive".into()));
        }

        let mut geometries = Vec::with_capacity(config.ellipsoids.len() + config.volumes.len());
        for (i, e) in config.ellipsoids.iter().enumerate() {
            geometries.push(Geometry::from(e.build(i)?));
        }
        for (i, v) in config.volumes.iter().enumerate() {
            geometries.push(Geometry::from(v.build(i, base_dir)?));
        }
        let lights = config
            .lights
            .iter()
            .enumerate()
            .map(|(i, l)| l.build(i))
            .collect::<Result<Vec<_>>>()?;

        let scene = Self {
            camera: config.camera.build()?,
            width: config.image.width,
            height: config.image.height,
            geometries,
            lights,
        };
        debug!(
            "Scene: {} ellipsoids, {} volumes, {} lights",
            config.ellipsoids.len(),
            config.volumes.len(),
            scene.lights.len()
        );
        Ok(scene)
    }

    /// Built-in scene: three ellipsoids inside a procedural CT phantom.
    pub fn demo() -> Result<Self> {
        let camera = Camera {
            position: Vector::new(0.0, 4.0, 30.0),
            direction: Vector::new(0.0, -0.15, -1.0),
            up: Vector::Y,
            view_plane_distance: 1.0,
            view_plane_width: 1.6,
            view_plane_height: 1.0,
            front_plane_distance: 0.0,
            back_plane_distance: 1000.0,
        };

        let red = rgba(0.9, 0.2, 0.2, 1.0);
        let blue = rgba(0.2, 0.3, 0.9, 1.0);
        let grey = rgba(0.6, 0.6, 0.6, 1.0);

        let ellipsoids = [
            Ellipsoid::new(Vector::new(-5.0, 0.0, 0.0), Vector::new(2.0, 1.0, 1.0), 1.5, Material::from_color(red), red)
                .with_rotation(Quaternion::from_axis_angle(30f64.to_radians(), Vector::Z)),
            Ellipsoid::new(Vector::new(5.0, 0.0, 0.0), Vector::new(1.0, 2.0, 1.0), 1.5, Material::from_color(blue), blue),
            Ellipsoid::new(Vector::new(0.0, -9.0, 0.0), Vector::new(20.0, 0.5, 20.0), 1.0, Material::from_color(grey), grey),
        ];

        // 32^3 phantom centred on the origin: soft core inside a dense shell
        let phantom = VolumeField::from_fn([32, 32, 32], [1.0; 3], Vector::splat(-8.0), 0.5, |x, y, z| {
            let r = (Vector::new(x as f64, y as f64, z as f64) - Vector::splat(15.5)).length();
            match r {
                r if r < 4.0 => 120,
                r if (11.0..13.0).contains(&r) => 220,
                _ => 0,
            }
        })?;
        let color_map = ColorMap::new()
            .add(100, 150, rgba(1.0, 0.75, 0.6, 0.03))
            .add(180, 255, rgba(0.95, 0.95, 0.9, 0.08));

        let white = rgba(1.0, 1.0, 1.0, 1.0);
        let lights = vec![
            Light::new(Vector::new(20.0, 25.0, 25.0), rgba(0.2, 0.2, 0.2, 1.0), white * 0.8, white),
            Light::new(Vector::new(-25.0, 10.0, 20.0), rgba(0.1, 0.1, 0.1, 1.0), white * 0.4, white * 0.5),
        ];

        let mut geometries: Vec<Geometry> = ellipsoids.into_iter().map(Geometry::from).collect();
        geometries.push(CtScan::new(phantom, color_map).into());

        Ok(Self { camera, width: 800, height: 500, geometries, lights })
    }

    /// Renderer owning this scene's geometries and lights.
    pub fn into_tracer(self) -> (RayTracer, Camera, u32, u32) {
        (RayTracer::new(self.geometries, self.lights), self.camera, self.width, self.height)
    }
}
