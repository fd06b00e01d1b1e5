//! World state threaded through the generation pipeline, and the final
//! output maps.

use serde::{Deserialize, Serialize};

use crate::config::WorldConfig;
use crate::tectonics::PlateGraph;

use super::grid::Grid;

/// Mutable state of one generation run. Stages fill the optional fields in
/// pipeline order.
#[derive(Debug, Clone, Default)]
pub struct World {
    /// Terrain heights. Written by the tectonic stage, smoothed by the
    /// post-processing stage, sculpted by the erosion stage.
    pub heights: Grid<f32>,
    /// Plate/edge graph (populated by the tectonic stage).
    pub plates: Option<PlateGraph>,
    /// Accumulated water exposure, normalized to [0, 1] (erosion stage).
    pub moisture: Option<Grid<f32>>,
    /// Accumulated removed soil, normalized to [0, 1] (erosion stage).
    pub erosion: Option<Grid<f32>>,
    /// Accumulated deposited soil, normalized to [0, 1] (erosion stage).
    pub deposition: Option<Grid<f32>>,
    /// Mean of the normalized moisture map.
    pub mean_moisture: f32,
}

impl World {
    /// Creates the empty state for a run over `config`'s map.
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            heights: Grid::new(config.map_width, config.map_height, 0.0),
            plates: None,
            moisture: None,
            erosion: None,
            deposition: None,
            mean_moisture: 1.0,
        }
    }

    /// Global min and max of the height grid.
    pub fn height_range(&self) -> (f32, f32) {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for &h in self.heights.as_slice() {
            min = min.min(h);
            max = max.max(h);
        }
        (min, max)
    }

    /// Consumes the state into the final output maps; `None` while any
    /// stage output is still missing.
    pub fn into_maps(self) -> Option<WorldMaps> {
        Some(WorldMaps {
            heights: self.heights,
            moisture: self.moisture?,
            erosion: self.erosion?,
            deposition: self.deposition?,
            plates: self.plates?,
            mean_moisture: self.mean_moisture,
        })
    }
}

/// Terminal output of a generation run.
///
/// Channel packing and encoding belong to the external image encoder; the
/// plate graph is consumed by the external diagnostic renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldMaps {
    /// Final terrain heights.
    pub heights: Grid<f32>,
    /// Cumulative water exposure per pixel, in [0, 1].
    pub moisture: Grid<f32>,
    /// Cumulative erosion intensity per pixel, in [0, 1].
    pub erosion: Grid<f32>,
    /// Cumulative deposition intensity per pixel, in [0, 1].
    pub deposition: Grid<f32>,
    /// Raw tectonic plate/edge graph.
    pub plates: PlateGraph,
    /// Mean of the normalized moisture map.
    pub mean_moisture: f32,
}
