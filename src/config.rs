use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::paths;

const CONFIG_FILE: &str = "config.toml";

#[derive(Resource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    pub map: MapConfig,
    pub measurement: MeasurementConfig,
    pub export: ExportConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Asset path of the glTF/GLB file, relative to `assets/`
    pub path: String,
    /// World-space translation applied to the model root
    pub offset: [f32; 3],
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    /// Fraction of pending orbit input applied per frame
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    pub directional_illuminance: f32,
    pub directional_position: [f32; 3],
    pub ambient_brightness: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    pub enabled: bool,
    /// Geographic position of the model origin
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u8,
    /// Tiles loaded in each direction around the model origin
    pub tile_radius: u8,
    /// XYZ tile URL template with `{z}`, `{x}` and `{y}` placeholders
    pub endpoint: String,
    pub user_agent: String,
    /// World units per meter of ground distance
    pub units_per_meter: f64,
    /// Height of the map plane in world units
    pub elevation: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MeasurementConfig {
    /// Whether placed markers and segments can be picked as surface points
    pub pick_markers: bool,
    pub marker_radius: f32,
    pub segment_radius: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    pub file_name: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "models/model.glb".to_string(),
            offset: [0.0, 0.0, 0.0],
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 50.0, 150.0],
            target: [0.0, 0.0, 0.0],
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 1.0,
            max_distance: 900.0,
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            directional_illuminance: 10_000.0,
            directional_position: [10.0, 10.0, 10.0],
            ambient_brightness: 500.0,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            latitude: constants::DEFAULT_LATITUDE,
            longitude: constants::DEFAULT_LONGITUDE,
            zoom: constants::DEFAULT_TILE_ZOOM,
            tile_radius: constants::TILE_DOWNLOAD_RADIUS,
            endpoint: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            user_agent: format!("model_ruler/{}", env!("CARGO_PKG_VERSION")),
            units_per_meter: 1.0,
            elevation: 0.0,
        }
    }
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            pick_markers: true,
            marker_radius: 0.5,
            segment_radius: 0.1,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: "rendered_model.png".to_string(),
        }
    }
}

impl AppConfig {
    pub fn camera_position(&self) -> Vec3 {
        Vec3::from_array(self.camera.position)
    }

    pub fn camera_target(&self) -> Vec3 {
        Vec3::from_array(self.camera.target)
    }

    pub fn model_offset(&self) -> Vec3 {
        Vec3::from_array(self.model.offset)
    }
}

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(load_config());
    }
}

fn config_path() -> PathBuf {
    paths::config_dir().join(CONFIG_FILE)
}

pub fn load_config() -> AppConfig {
    let path = config_path();
    if path.exists() {
        match read_config(&path) {
            Ok(config) => {
                info!("Loaded config from {:?}", path);
                return config;
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                return AppConfig::default();
            }
        }
    }

    let config = AppConfig::default();
    save_config(&config);
    config
}

pub fn read_config(path: &Path) -> Result<AppConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config: {}", e))?;
    toml::from_str(&contents).map_err(|e| format!("Failed to parse config: {}", e))
}

pub fn save_config(config: &AppConfig) {
    let path = config_path();
    if let Err(e) = write_config(config, &path) {
        error!("{}", e);
    } else {
        info!("Saved config to {:?}", path);
    }
}

pub fn write_config(config: &AppConfig, path: &Path) -> Result<(), String> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    if let Some(parent) = path.parent() {
        paths::ensure_dir(parent);
    }
    fs::write(path, contents).map_err(|e| format!("Failed to write config: {}", e))
}
