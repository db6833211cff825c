use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path} at {json_path}: {source}")]
    Parse {
        path: String,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Session configuration, built once at startup and passed by reference to
/// the generator, controller, and placement code. Every section has working
/// defaults; `assets/config.json` overrides them field by field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    pub(crate) window: WindowConfig,
    pub(crate) world: WorldConfig,
    pub(crate) terrain: TerrainConfig,
    pub(crate) items: ItemsConfig,
    pub(crate) inventory: InventoryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WindowConfig {
    pub(crate) title: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Skerry".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WorldConfig {
    pub(crate) grid_size: u32,
    pub(crate) cell_size_px: f32,
    pub(crate) move_speed_px_per_second: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            grid_size: 30,
            cell_size_px: 24.0,
            move_speed_px_per_second: 96.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct TerrainConfig {
    pub(crate) land_ratio: f32,
    pub(crate) center_radius: f32,
    pub(crate) edge_water_range: u32,
    pub(crate) max_retries: u32,
    pub(crate) seed: Option<u64>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            land_ratio: 0.65,
            center_radius: 0.35,
            edge_water_range: 3,
            max_retries: 5,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ItemsConfig {
    pub(crate) spawn_clear_radius_cells: f32,
    pub(crate) kinds: Vec<ItemSpawnConfig>,
}

impl Default for ItemsConfig {
    fn default() -> Self {
        Self {
            spawn_clear_radius_cells: 3.0,
            kinds: vec![
                ItemSpawnConfig {
                    kind: "seed".to_string(),
                    target_count: 12,
                    accept_probability: 0.8,
                },
                ItemSpawnConfig {
                    kind: "coin".to_string(),
                    target_count: 8,
                    accept_probability: 0.6,
                },
                ItemSpawnConfig {
                    kind: "shell".to_string(),
                    target_count: 6,
                    accept_probability: 0.5,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ItemSpawnConfig {
    pub(crate) kind: String,
    pub(crate) target_count: u32,
    #[serde(default = "default_accept_probability")]
    pub(crate) accept_probability: f32,
}

fn default_accept_probability() -> f32 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct InventoryConfig {
    /// 0 means unlimited distinct kinds.
    pub(crate) max_distinct_kinds: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            max_distinct_kinds: 0,
        }
    }
}

pub(crate) fn load_game_config(path: &Path) -> Result<GameConfig, ConfigError> {
    if !path.is_file() {
        info!(path = %path.display(), "config_file_missing_using_defaults");
        return Ok(GameConfig::default());
    }

    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        ConfigError::Parse {
            path: path.display().to_string(),
            json_path,
            source: error.into_inner(),
        }
    })
}
