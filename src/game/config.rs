use std::{path::Path, str::FromStr};

use tracing::warn;

use crate::{engine::config_file::ConfigFile, game::terrain::Lod};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid value \"{value}\" for \"{key}\" on line {line}")]
    InvalidValue {
        line: usize,
        key: String,
        value: String,
    },

    #[error("Missing value for \"{key}\" on line {line}")]
    MissingValue { line: usize, key: String },
}

/// Global rendering quality. Decides which LODs are generated up front and whether the detailed
/// terrain technique may be used.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumIter, strum::EnumString,
)]
pub enum GraphicsQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl GraphicsQuality {
    /// LODs generated at load time in addition to the configured detail level.
    pub fn extra_lods(self) -> &'static [Lod] {
        match self {
            Self::Low => &[Lod::Minimum],
            Self::Medium => &[Lod::Low, Lod::Minimum],
            Self::High => &[Lod::High, Lod::Med, Lod::Low, Lod::Minimum],
        }
    }

    pub fn allows_detail_technique(self) -> bool {
        self == Self::High
    }
}

#[derive(Clone, Debug)]
pub struct TerrainConfig {
    /// Leaf nodes hold at most this many cells. Must be a power of two.
    pub min_leaf_size: u32,
    /// World units between two height samples.
    pub scale_factor: u32,
    /// Multiplier applied to normalized height samples.
    pub elevation_strength: f32,
    pub smoothing_passes: u32,
    /// LOD requested for normal passes.
    pub detail: Lod,
    /// Leaves closer than this to the camera use the detailed terrain technique.
    pub detail_technique_distance: f32,
}

impl TerrainConfig {
    pub const MAX_SCALE_FACTOR: u32 = 16;
    pub const DEFAULT_SMOOTHING_PASSES: u32 = 5;
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            min_leaf_size: 128 * 128,
            scale_factor: 1,
            elevation_strength: 64.0,
            smoothing_passes: Self::DEFAULT_SMOOTHING_PASSES,
            detail: Lod::High,
            detail_technique_distance: 150.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GraphicsConfig {
    pub quality: GraphicsQuality,
    pub shadow_map_resolution: u32,
    pub water_texture_resolution: u32,
    /// Emit wireframe boxes around visible terrain leaves.
    pub render_bounding_boxes: bool,
    /// Draw the shadow map in a corner of the screen.
    pub show_shadow_map: bool,
    pub surface_width: u32,
    pub surface_height: u32,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            quality: GraphicsQuality::default(),
            shadow_map_resolution: 2048,
            water_texture_resolution: 512,
            render_bounding_boxes: false,
            show_shadow_map: false,
            surface_width: 1280,
            surface_height: 800,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Config {
    pub terrain: TerrainConfig,
    pub graphics: GraphicsConfig,
    /// Elevation of the water plane, if the scene has water.
    pub water_elevation: Option<f32>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in ConfigFile::new(text) {
            let key = line.key();
            let Some(&value) = line.values().first() else {
                return Err(ConfigError::MissingValue {
                    line: line.line_number,
                    key: key.to_string(),
                });
            };

            let n = line.line_number;

            match key {
                "min_leaf_size" => config.terrain.min_leaf_size = parse_value(n, key, value)?,
                "scale_factor" => {
                    let scale: u32 = parse_value(n, key, value)?;
                    let clamped = scale.clamp(1, TerrainConfig::MAX_SCALE_FACTOR);
                    if clamped != scale {
                        warn!("scale_factor {scale} clamped to {clamped}.");
                    }
                    config.terrain.scale_factor = clamped;
                }
                "elevation_strength" => {
                    config.terrain.elevation_strength = parse_value(n, key, value)?
                }
                "smoothing_passes" => config.terrain.smoothing_passes = parse_value(n, key, value)?,
                "detail" => config.terrain.detail = parse_value(n, key, value)?,
                "detail_technique_distance" => {
                    config.terrain.detail_technique_distance = parse_value(n, key, value)?
                }
                "quality" => config.graphics.quality = parse_value(n, key, value)?,
                "shadow_map_resolution" => {
                    config.graphics.shadow_map_resolution = parse_value(n, key, value)?
                }
                "water_texture_resolution" => {
                    config.graphics.water_texture_resolution = parse_value(n, key, value)?
                }
                "bounding_boxes" => {
                    config.graphics.render_bounding_boxes = parse_value(n, key, value)?
                }
                "show_shadow_map" => config.graphics.show_shadow_map = parse_value(n, key, value)?,
                "surface_width" => config.graphics.surface_width = parse_value(n, key, value)?,
                "surface_height" => config.graphics.surface_height = parse_value(n, key, value)?,
                "water_elevation" => config.water_elevation = Some(parse_value(n, key, value)?),
                _ => warn!("Unknown config key \"{key}\" on line {}.", line.line_number),
            }
        }

        Ok(config)
    }
}

fn parse_value<T: FromStr>(line: usize, key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        line,
        key: key.to_string(),
        value: value.to_string(),
    })
}
