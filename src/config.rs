use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "SHAPELAB_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "shapelab.json";
const SUZANNE_URL: &str = "https://raw.githubusercontent.com/KhronosGroup/glTF-Sample-Models/main/2.0/Suzanne/glTF/Suzanne.gltf";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Start-up configuration. Every section falls back to its defaults, so a
/// partial file only needs the keys it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub motion: MotionConstants,
    pub assets: AssetCatalog,
    /// Start-up values for panel settings, keyed `"category.field"`, e.g.
    /// `{"geometry.shape": "Cone", "geometry.color": "#ff8800"}`.
    pub settings: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "shapelab".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Per-tick increments used by the frame loop. They are applied once per
/// rendered frame, not scaled by elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConstants {
    pub object_rotation_step: [f32; 2],
    pub light_orbit_step: f32,
    pub light_orbit_radius: f32,
    pub light_orbit_height: f32,
}

impl Default for MotionConstants {
    fn default() -> Self {
        Self {
            object_rotation_step: [0.01, 0.02],
            light_orbit_step: std::f32::consts::PI * 0.01,
            light_orbit_radius: 1.0,
            light_orbit_height: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAsset {
    pub path: String,
    pub scale: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureAsset {
    pub source: String,
    pub repeat: [f32; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetCatalog {
    pub suzanne: ModelAsset,
    pub texture_1: TextureAsset,
    pub texture_2: TextureAsset,
}

impl Default for AssetCatalog {
    fn default() -> Self {
        Self {
            suzanne: ModelAsset {
                path: SUZANNE_URL.to_string(),
                scale: 0.4,
            },
            texture_1: TextureAsset {
                source: "https://i.imgur.com/e69Z1hI.jpg".to_string(),
                repeat: [10.0, 10.0],
            },
            texture_2: TextureAsset {
                source: "https://i.imgur.com/OIasWMD.jpg".to_string(),
                repeat: [1.0, 1.0],
            },
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// Resolves the config path from the environment, then loads it. A missing
    /// file is not an error; a broken one is logged and replaced by defaults.
    pub fn load_or_default() -> Self {
        let path = std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from_optional(&path)
    }

    pub fn load_from_optional(path: &Path) -> Self {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(err) => {
                log::warn!("Ignoring config: {}", err);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        path.push(format!("shapelab_{}_{}_{}.json", tag, std::process::id(), nonce));
        path
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = temp_path("partial");
        std::fs::write(&path, r#"{ "motion": { "light_orbit_step": 0.5 } }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.motion.light_orbit_step, 0.5);
        assert_eq!(config.motion.object_rotation_step, [0.01, 0.02]);
        assert_eq!(config.window, WindowConfig::default());
        assert_eq!(config.assets, AssetCatalog::default());

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn setting_overrides_are_read_by_key() {
        let path = temp_path("overrides");
        std::fs::write(&path, r#"{ "settings": { "geometry.shape": "Cone" } }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.settings.len(), 1);
        assert_eq!(config.settings["geometry.shape"], serde_json::json!("Cone"));
        assert_eq!(config.window, WindowConfig::default());

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = temp_path("missing");
        assert_eq!(AppConfig::load_from_optional(&path), AppConfig::default());
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let path = temp_path("broken");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Json { .. })));
        assert_eq!(AppConfig::load_from_optional(&path), AppConfig::default());

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn defaults_survive_a_write_and_reload() {
        let path = temp_path("roundtrip");
        let config = AppConfig::default();
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
        let _ = std::fs::remove_file(path);
    }
}
