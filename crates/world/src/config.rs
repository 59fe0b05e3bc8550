//! Tunable generation parameters loaded from TOML.

use crate::stronghold::StrongholdPieceType;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error;
use tracing::warn;

/// Errors raised by strict config parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid generation config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("stronghold weight table lists {0:?} more than once")]
    DuplicateWeight(StrongholdPieceType),
    #[error("`{field}` must be at least {min}, got {value}")]
    TooSmall {
        field: &'static str,
        min: i32,
        value: i32,
    },
}

/// Parameters for every structure family.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub sea_level: i32,
    pub min_y: i32,
    pub mineshaft: MineshaftConfig,
    pub stronghold: StrongholdConfig,
    pub ocean_monument: OceanMonumentConfig,
    pub end_city: EndCityConfig,
    pub woodland_mansion: WoodlandMansionConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            sea_level: 63,
            min_y: 0,
            mineshaft: MineshaftConfig::default(),
            stronghold: StrongholdConfig::default(),
            ocean_monument: OceanMonumentConfig::default(),
            end_city: EndCityConfig::default(),
            woodland_mansion: WoodlandMansionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MineshaftConfig {
    pub max_depth: i32,
    /// Horizontal reach from the starting room, in blocks.
    pub max_distance: i32,
    /// Blocks kept between the structure top and sea level.
    pub sea_level_offset: i32,
}

impl Default for MineshaftConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_distance: 80,
            sea_level_offset: 10,
        }
    }
}

/// One row of the stronghold weight table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PieceWeightConfig {
    pub kind: StrongholdPieceType,
    pub weight: i32,
    /// `0` means unlimited.
    pub max_place_count: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StrongholdConfig {
    pub max_depth: i32,
    pub max_distance: i32,
    /// Weighted draws per frontier before falling back to a filler corridor.
    pub selection_attempts: i32,
    /// Full layouts tried until one contains a portal room.
    pub start_attempts: i32,
    /// Candidate boxes must have `min_y` above this.
    pub min_box_y: i32,
    pub weights: Vec<PieceWeightConfig>,
}

impl Default for StrongholdConfig {
    fn default() -> Self {
        Self {
            max_depth: 50,
            max_distance: 112,
            selection_attempts: 5,
            start_attempts: 16,
            min_box_y: 10,
            weights: StrongholdPieceType::DEFAULT_WEIGHTS
                .iter()
                .map(|&(kind, weight, max_place_count)| PieceWeightConfig {
                    kind,
                    weight,
                    max_place_count,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OceanMonumentConfig {
    pub base_y: i32,
}

impl Default for OceanMonumentConfig {
    fn default() -> Self {
        Self { base_y: 39 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EndCityConfig {
    pub max_depth: i32,
    pub base_y: i32,
}

impl Default for EndCityConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            base_y: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WoodlandMansionConfig {
    pub floor_height: i32,
    pub cell_size: i32,
    pub base_y: i32,
}

impl Default for WoodlandMansionConfig {
    fn default() -> Self {
        Self {
            floor_height: 8,
            cell_size: 8,
            base_y: 64,
        }
    }
}

impl GenerationConfig {
    /// Strict parse; unknown values and invalid tables are errors.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: GenerationConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults on any error.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    Self::default()
                }
            },
            Err(err) => {
                warn!("Failed to read {}: {err}. Using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Pretty TOML rendering of this config.
    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let minimums = [
            ("mineshaft.max_depth", 0, self.mineshaft.max_depth),
            ("stronghold.max_depth", 0, self.stronghold.max_depth),
            ("stronghold.selection_attempts", 1, self.stronghold.selection_attempts),
            ("stronghold.start_attempts", 1, self.stronghold.start_attempts),
            ("end_city.max_depth", 0, self.end_city.max_depth),
            ("woodland_mansion.floor_height", 1, self.woodland_mansion.floor_height),
            ("woodland_mansion.cell_size", 1, self.woodland_mansion.cell_size),
        ];
        for (field, min, value) in minimums {
            if value < min {
                return Err(ConfigError::TooSmall { field, min, value });
            }
        }
        let mut seen = Vec::new();
        for row in &self.stronghold.weights {
            if seen.contains(&row.kind) {
                return Err(ConfigError::DuplicateWeight(row.kind));
            }
            seen.push(row.kind);
        }
        Ok(())
    }
}
