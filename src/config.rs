//! Generation parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration problems detected before any simulation starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("map must have a non-zero area (got {0}x{1})")]
    ZeroAreaMap(usize, usize),
    #[error("plate grid spacing must be non-zero")]
    ZeroPlateSize,
    #[error("simulation step size must be positive")]
    NonPositiveStepSize,
}

/// All tunable constants of one generation run.
///
/// One immutable value of this type parameterizes the whole pipeline; the
/// defaults reproduce the standard 2048×2048 map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Map width in pixels.
    pub map_width: usize,
    /// Map height in pixels.
    pub map_height: usize,

    /// Spacing of the tectonic plate seeding grid, in pixels.
    pub plate_size: u32,
    /// Voronoi edge endpoints are clamped to the map rectangle grown by
    /// this margin, in pixels.
    pub edge_clamp_margin: i32,
    /// Maximum drift vector length of tectonic plates (pixels). Recorded on
    /// each plate; not yet read by any downstream computation.
    pub max_plate_linear_velocity: f32,
    /// Maximum rotational drift angle of tectonic plates (radians).
    /// Recorded on each plate; not yet read by any downstream computation.
    pub max_plate_angular_velocity: f32,

    /// Median filter passes applied before erosion.
    pub median_filter_passes: u32,
    /// Box convolution passes applied before erosion.
    pub box_filter_passes: u32,

    /// Time delta between simulation steps (seconds).
    pub step_size: f32,
    /// Number of rain rounds over the whole simulation.
    pub rain_rounds: u32,
    /// Duration of each rain round (seconds).
    pub rain_round_duration: f32,
    /// Rain drops spawned per map pixel per rain round.
    pub rain_drops_per_pixel: f32,
    /// Radius of a single rain drop (pixels).
    pub rain_drop_radius: u32,
    /// Water height added by a rain drop.
    pub rain_drop_height: f32,
    /// Gravity constant for the water simulation.
    pub gravity: f32,
    /// Scale applied when carrying capacity exceeds dissolved volume.
    pub erosion_factor: f32,
    /// Scale applied when dissolved volume exceeds carrying capacity.
    pub deposition_factor: f32,
    /// Sediment carrying capacity coefficient.
    pub soil_capacity: f32,
    /// Water removed per cell per second.
    pub evaporation_per_second: f32,
    /// Clamp for directional flux magnitudes.
    pub max_flux: f32,
    /// Clamp for the water column height.
    pub max_water_height: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            map_width: 2048,
            map_height: 2048,

            plate_size: 120,
            edge_clamp_margin: 200,
            max_plate_linear_velocity: 1.0,
            max_plate_angular_velocity: 0.3,

            median_filter_passes: 2,
            box_filter_passes: 2,

            step_size: 0.04,
            rain_rounds: 10,
            rain_round_duration: 3.0,
            rain_drops_per_pixel: 0.02,
            rain_drop_radius: 7,
            rain_drop_height: 0.015,
            gravity: 20.0,
            erosion_factor: 1.0,
            deposition_factor: 2.0,
            soil_capacity: 0.2,
            evaporation_per_second: 0.002,
            max_flux: 1.0,
            max_water_height: 1.0,
        }
    }
}

impl WorldConfig {
    /// A small square map with the plate grid and rain schedule scaled down
    /// proportionally. Intended for tests and quick previews.
    pub fn small(size: usize) -> Self {
        Self {
            map_width: size,
            map_height: size,
            plate_size: (size as u32 / 8).max(8),
            rain_rounds: 4,
            rain_round_duration: 0.4,
            rain_drop_radius: 2,
            ..Default::default()
        }
    }

    /// Fails fast on degenerate configurations, before any simulation
    /// state is allocated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.map_width == 0 || self.map_height == 0 {
            return Err(ConfigError::ZeroAreaMap(self.map_width, self.map_height));
        }
        if self.plate_size == 0 {
            return Err(ConfigError::ZeroPlateSize);
        }
        if self.step_size <= 0.0 {
            return Err(ConfigError::NonPositiveStepSize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WorldConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.map_width, 2048);
        assert_eq!(config.plate_size, 120);
        assert_eq!(config.rain_rounds, 10);
    }

    #[test]
    fn test_small_config_is_valid() {
        let config = WorldConfig::small(64);
        assert!(config.validate().is_ok());
        assert_eq!(config.map_width, 64);
        assert!(config.plate_size >= 8);
    }

    #[test]
    fn test_zero_area_map_rejected() {
        let config = WorldConfig {
            map_width: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroAreaMap(0, 2048)));
    }

    #[test]
    fn test_non_positive_step_rejected() {
        let config = WorldConfig {
            step_size: 0.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NonPositiveStepSize));
    }
}
