/// TOML scene configuration.
///
/// Every section has defaults matching the stock scene, so a partial file
/// (or none at all) works.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::lighting::{AmbientLight, GridHelper, Lighting, PointLight};
use crate::starfield::StarfieldParams;

/// Upper bound on sphere segments per axis
pub const MAX_SPHERE_SEGMENTS: u32 = 256;
pub const MAX_STARFIELD_COUNT: usize = 100_000;
pub const MAX_GRID_DIVISIONS: u32 = 1_000;

/// Procedural models shipped with the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinModel {
    Star,
    Flower,
}

/// Where a model comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Builtin(BuiltinModel),
    /// STL file on disk
    Path(PathBuf),
}

impl ModelSource {
    pub fn describe(&self) -> String {
        match self {
            ModelSource::Builtin(model) => format!("builtin:{model:?}").to_lowercase(),
            ModelSource::Path(path) => path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub min_distance: f32,
    pub max_distance: f32,
    pub damping: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 0.0, 50.0],
            min_distance: 1.0,
            max_distance: 500.0,
            damping: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarConfig {
    pub model: ModelSource,
    pub scale: f32,
    pub position: [f32; 3],
    /// Radians added to each rotation axis every frame
    pub rotation_step: f32,
}

impl Default for StarConfig {
    fn default() -> Self {
        Self {
            model: ModelSource::Builtin(BuiltinModel::Star),
            scale: 5.0,
            position: [0.0, 0.0, 0.0],
            rotation_step: 0.005,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowerConfig {
    pub model: ModelSource,
    pub scale: f32,
    pub positions: Vec<[f32; 3]>,
}

impl Default for FlowerConfig {
    fn default() -> Self {
        Self {
            model: ModelSource::Builtin(BuiltinModel::Flower),
            scale: 5.0,
            positions: vec![[60.0, 0.0, -60.0], [-60.0, 0.0, -30.0], [0.0, 0.0, 60.0]],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarfieldConfig {
    pub count: usize,
    pub spread: f32,
    pub radius: f32,
    pub segments: u32,
    pub seed: u64,
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        let params = StarfieldParams::default();
        Self {
            count: params.count,
            spread: params.spread,
            radius: params.radius,
            segments: params.segments,
            seed: params.seed,
        }
    }
}

impl StarfieldConfig {
    pub fn params(&self) -> StarfieldParams {
        StarfieldParams {
            count: self.count,
            spread: self.spread,
            radius: self.radius,
            segments: self.segments,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub point_position: [f32; 3],
    pub point_intensity: f32,
    pub ambient_intensity: f32,
    pub show_light_marker: bool,
    pub show_grid: bool,
    pub grid_size: f32,
    pub grid_divisions: u32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            point_position: [5.0, 5.0, 5.0],
            point_intensity: 1.0,
            ambient_intensity: 0.2,
            show_light_marker: true,
            show_grid: true,
            grid_size: 200.0,
            grid_divisions: 50,
        }
    }
}

impl LightingConfig {
    pub fn lighting(&self) -> Lighting {
        let [x, y, z] = self.point_position;
        Lighting::new(
            PointLight {
                position: nalgebra::Point3::new(x, y, z),
                color: [1.0, 1.0, 1.0],
                intensity: self.point_intensity,
            },
            AmbientLight {
                color: [1.0, 1.0, 1.0],
                intensity: self.ambient_intensity,
            },
        )
    }

    pub fn grid(&self) -> Option<GridHelper> {
        self.show_grid
            .then(|| GridHelper::new(self.grid_size, self.grid_divisions))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub label: String,
    pub href: String,
    /// World-space height of the button above the star
    pub offset_y: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            label: "Go to Comment Page".into(),
            href: "comment.html".into(),
            offset_y: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub fps: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { fps: 60 }
    }
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Background image (PNG or JPEG)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<PathBuf>,
    pub camera: CameraConfig,
    pub star: StarConfig,
    pub flowers: FlowerConfig,
    pub starfield: StarfieldConfig,
    pub lighting: LightingConfig,
    pub overlay: OverlayConfig,
    pub frame: FrameConfig,
}

impl SceneConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: SceneConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("loaded scene config from {}", path.display());
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: String| Err(ConfigError::Validation(msg));

        if let Some(field) = self.first_non_finite() {
            return fail(format!("{field} must be a finite number"));
        }

        let cam = &self.camera;
        if !(cam.fov_degrees > 0.0 && cam.fov_degrees < 180.0) {
            return fail(format!("camera.fov_degrees must be in (0, 180), got {}", cam.fov_degrees));
        }
        if !(cam.near > 0.0 && cam.far > cam.near) {
            return fail(format!(
                "camera clip planes must satisfy 0 < near < far, got near={} far={}",
                cam.near, cam.far
            ));
        }
        if !(cam.min_distance > 0.0 && cam.max_distance >= cam.min_distance) {
            return fail("camera distance limits must satisfy 0 < min <= max".into());
        }
        if !(cam.damping > 0.0 && cam.damping <= 1.0) {
            return fail(format!("camera.damping must be in (0, 1], got {}", cam.damping));
        }
        if self.star.scale <= 0.0 || self.flowers.scale <= 0.0 {
            return fail("model scales must be positive".into());
        }
        if self.starfield.spread < 0.0 || self.starfield.radius <= 0.0 {
            return fail("starfield spread must be >= 0 and radius > 0".into());
        }
        if self.starfield.count > MAX_STARFIELD_COUNT {
            return fail(format!("starfield.count must be at most {MAX_STARFIELD_COUNT}"));
        }
        if !(3..=MAX_SPHERE_SEGMENTS).contains(&self.starfield.segments) {
            return fail(format!(
                "starfield.segments must be in [3, {MAX_SPHERE_SEGMENTS}], got {}",
                self.starfield.segments
            ));
        }
        if self.lighting.show_grid
            && !(1..=MAX_GRID_DIVISIONS).contains(&self.lighting.grid_divisions)
        {
            return fail(format!(
                "lighting.grid_divisions must be in [1, {MAX_GRID_DIVISIONS}]"
            ));
        }
        if self.frame.fps == 0 {
            return fail("frame.fps must be positive".into());
        }
        Ok(())
    }

    /// Name of the first float field holding NaN or an infinity.
    fn first_non_finite(&self) -> Option<&'static str> {
        let cam = &self.camera;
        let lit = &self.lighting;
        let fields: [(&'static str, &[f32]); 12] = [
            ("camera.fov_degrees/near/far", &[cam.fov_degrees, cam.near, cam.far]),
            ("camera.position", &cam.position),
            (
                "camera distance limits and damping",
                &[cam.min_distance, cam.max_distance, cam.damping],
            ),
            ("star.scale", &[self.star.scale]),
            ("star.position", &self.star.position),
            ("star.rotation_step", &[self.star.rotation_step]),
            ("flowers.scale", &[self.flowers.scale]),
            (
                "starfield.spread/radius",
                &[self.starfield.spread, self.starfield.radius],
            ),
            ("lighting.point_position", &lit.point_position),
            (
                "lighting intensities",
                &[lit.point_intensity, lit.ambient_intensity],
            ),
            ("lighting.grid_size", &[lit.grid_size]),
            ("overlay.offset_y", &[self.overlay.offset_y]),
        ];
        fields
            .iter()
            .find(|(_, values)| values.iter().any(|v| !v.is_finite()))
            .map(|(name, _)| *name)
            .or_else(|| {
                self.flowers
                    .positions
                    .iter()
                    .any(|p| p.iter().any(|v| !v.is_finite()))
                    .then_some("flowers.positions")
            })
    }
}
