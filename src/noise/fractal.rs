//! Multi-octave fractal Brownian motion (fBm) noise generation.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use simdnoise::NoiseBuilder;

/// Configuration for multi-octave fractal noise generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FractalNoiseConfig {
    /// Number of noise octaves (4-10 typical).
    pub octaves: u8,
    /// Base frequency in cycles per map pixel.
    pub frequency: f32,
    /// Frequency multiplier per octave (typically 2.0).
    pub lacunarity: f32,
    /// Amplitude decay per octave (0.4-0.6 typical).
    pub persistence: f32,
    /// Random seed for reproducible generation.
    pub seed: i32,
}

impl Default for FractalNoiseConfig {
    fn default() -> Self {
        Self {
            octaves: 8,
            frequency: 1.0 / 200.0,
            lacunarity: 2.0,
            persistence: 0.5,
            seed: 42,
        }
    }
}

impl FractalNoiseConfig {
    /// Creates a new noise configuration with the given seed.
    pub fn with_seed(seed: i32) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Large-scale field used to seed the initial terrain texture.
    pub fn base_terrain(seed: i32) -> Self {
        Self::with_seed(seed)
    }

    /// Field modulating the ridge/trench contribution along plate edges.
    pub fn ridge_modulation(seed: i32) -> Self {
        Self {
            octaves: 10,
            seed,
            ..Default::default()
        }
    }

    /// Smaller-scale field layered on top of the plate base heights.
    pub fn detail(seed: i32) -> Self {
        Self {
            frequency: 1.0 / 100.0,
            seed,
            ..Default::default()
        }
    }
}

/// Samples fractal noise at a 2D map position.
///
/// Octaves are accumulated manually so each octave gets its own derived
/// seed, then the sum is normalized by the total amplitude.
///
/// # Arguments
/// * `pos` - Position in map pixels
/// * `config` - Noise configuration parameters
///
/// # Returns
/// A noise value in approximately [-1, 1]
pub fn sample_fractal_noise(pos: Vec2, config: &FractalNoiseConfig) -> f32 {
    let mut total = 0.0f32;
    let mut amplitude = 1.0f32;
    let mut frequency = config.frequency;
    let mut max_amplitude = 0.0f32;

    for octave in 0..config.octaves {
        let octave_seed = config.seed.wrapping_add(octave as i32 * 31337);

        let x = pos.x * frequency;
        let y = pos.y * frequency;

        let noise_value = NoiseBuilder::fbm_2d_offset(x, 1, y, 1)
            .with_seed(octave_seed)
            .with_freq(1.0)
            .with_octaves(1)
            .generate()
            .0[0];

        total += noise_value * amplitude;
        max_amplitude += amplitude;
        amplitude *= config.persistence;
        frequency *= config.lacunarity;
    }

    total / max_amplitude
}

/// Generates a full `width`×`height` grid of fractal noise in row-major
/// order, sampled at integer pixel positions.
///
/// Equivalent to calling [`sample_fractal_noise`] per pixel but lets
/// simdnoise vectorize whole rows per octave.
pub fn generate_fractal_noise_grid(
    width: usize,
    height: usize,
    config: &FractalNoiseConfig,
) -> Vec<f32> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut results = vec![0.0f32; width * height];
    let mut amplitude = 1.0f32;
    let mut frequency = config.frequency;
    let mut max_amplitude = 0.0f32;

    for octave in 0..config.octaves {
        let octave_seed = config.seed.wrapping_add(octave as i32 * 31337);

        let octave_values = NoiseBuilder::fbm_2d_offset(0.0, width, 0.0, height)
            .with_seed(octave_seed)
            .with_freq(frequency)
            .with_octaves(1)
            .generate()
            .0;

        for (result, value) in results.iter_mut().zip(octave_values.iter()) {
            *result += value * amplitude;
        }

        max_amplitude += amplitude;
        amplitude *= config.persistence;
        frequency *= config.lacunarity;
    }

    for result in &mut results {
        *result /= max_amplitude;
    }

    results
}
