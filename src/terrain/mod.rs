//! Map storage, heightfield synthesis and post-processing filters.

pub mod classify;
pub mod filters;
mod grid;
mod heightmap;
mod world;

pub use classify::{classify_map, hillshade, TerrainClass};
pub use grid::Grid;
pub use heightmap::{synthesize_heightmap, HeightmapError};
pub use world::{World, WorldMaps};
