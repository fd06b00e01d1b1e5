//! Terrain classification over the finished maps.
//!
//! Pure helpers for the external renderer: a coarse biome class per pixel
//! (driven by height, moisture relative to the map mean, and slope) and a
//! hillshade factor. No pixel encoding happens here.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::grid::Grid;
use super::world::WorldMaps;

/// Coarse terrain class of one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerrainClass {
    /// Below zero elevation.
    Water,
    /// Moist lowland at the waterline.
    Sand,
    /// Moist or flat vegetated terrain.
    Forest,
    /// Dry rocky terrain.
    Rock,
    /// Dry elevated terrain.
    Highland,
    /// Peaks above the snow line.
    Snow,
}

/// Classifies a single pixel. `mean_moisture` is the mean of the
/// normalized moisture map.
pub fn classify(
    heights: &Grid<f32>,
    moisture: &Grid<f32>,
    mean_moisture: f32,
    x: usize,
    y: usize,
) -> TerrainClass {
    let h = heights[(x, y)];

    if h < 0.0 {
        return TerrainClass::Water;
    }

    let moist = moisture[(x, y)] > 0.1 * mean_moisture;
    let flat_lowland = h < 1.0 && surface_gradient(heights, x, y).length() < 1.0;

    if moist || flat_lowland {
        if h < 0.3 {
            TerrainClass::Sand
        } else {
            TerrainClass::Forest
        }
    } else if h < 1.5 {
        TerrainClass::Rock
    } else if h < 3.5 {
        TerrainClass::Highland
    } else {
        TerrainClass::Snow
    }
}

/// Classifies every pixel of the finished maps.
pub fn classify_map(maps: &WorldMaps) -> Grid<TerrainClass> {
    let width = maps.heights.width();
    let height = maps.heights.height();
    let mut classes = Grid::new(width, height, TerrainClass::Water);

    for y in 0..height {
        for x in 0..width {
            classes[(x, y)] =
                classify(&maps.heights, &maps.moisture, maps.mean_moisture, x, y);
        }
    }

    classes
}

/// Directional light factor in [0, 1] for a pixel, from the local surface
/// gradient against a light direction of (0, -1). Water renders fully lit.
pub fn hillshade(heights: &Grid<f32>, x: usize, y: usize) -> f32 {
    if heights[(x, y)] < 0.0 {
        return 1.0;
    }

    let gradient = surface_gradient(heights, x, y);
    (0.2 + gradient.dot(Vec2::new(0.0, -1.0))).clamp(0.0, 1.0)
}

/// Gradient used for shading: central difference where available, spikes
/// beyond |100| discarded, normalized once it exceeds 0.05.
fn surface_gradient(heights: &Grid<f32>, x: usize, y: usize) -> Vec2 {
    if !heights.interior(x, y, 1) {
        return Vec2::ZERO;
    }

    let mut gradient = heights.gradient(x, y);

    if gradient.x.abs() > 100.0 || gradient.y.abs() > 100.0 {
        gradient = Vec2::ZERO;
    }
    if gradient.length() > 0.05 {
        gradient = gradient.normalize();
    }

    gradient
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maps_with(heights: Grid<f32>, moisture: Grid<f32>, mean_moisture: f32) -> WorldMaps {
        let w = heights.width();
        let h = heights.height();
        WorldMaps {
            heights,
            moisture,
            erosion: Grid::new(w, h, 0.0),
            deposition: Grid::new(w, h, 0.0),
            plates: Default::default(),
            mean_moisture,
        }
    }

    #[test]
    fn test_classify_by_height_bands() {
        let mut heights = Grid::new(5, 5, 0.0f32);
        let moisture = Grid::new(5, 5, 0.0f32);

        heights[(1, 1)] = -1.0;
        heights[(2, 1)] = 1.2;
        heights[(3, 1)] = 2.0;
        heights[(1, 2)] = 5.0;

        let maps = maps_with(heights, moisture, 1.0);
        let classes = classify_map(&maps);

        assert_eq!(classes[(1, 1)], TerrainClass::Water);
        assert_eq!(classes[(2, 1)], TerrainClass::Rock);
        assert_eq!(classes[(3, 1)], TerrainClass::Highland);
        assert_eq!(classes[(1, 2)], TerrainClass::Snow);
    }

    #[test]
    fn test_moist_pixels_become_vegetated() {
        let mut heights = Grid::new(5, 5, 2.0f32);
        let mut moisture = Grid::new(5, 5, 0.0f32);
        heights[(2, 2)] = 0.2;
        moisture[(2, 2)] = 0.5;
        moisture[(3, 2)] = 0.5;

        let maps = maps_with(heights, moisture, 1.0);

        assert_eq!(classify(&maps.heights, &maps.moisture, 1.0, 2, 2), TerrainClass::Sand);
        assert_eq!(classify(&maps.heights, &maps.moisture, 1.0, 3, 2), TerrainClass::Forest);
    }

    #[test]
    fn test_hillshade_range_and_water() {
        let mut heights = Grid::new(5, 5, 1.0f32);
        heights[(2, 2)] = -1.0;

        assert_eq!(hillshade(&heights, 2, 2), 1.0);
        for y in 0..5 {
            for x in 0..5 {
                let light = hillshade(&heights, x, y);
                assert!((0.0..=1.0).contains(&light));
            }
        }
    }
}
