//! Seeded terrain heightfield synthesis.
//!
//! This crate grows a large heightfield out of a single seed by simulating
//! two physical processes: tectonic plate formation and hydraulic erosion.
//! Plate topology drives the initial heights, the heights drive the water
//! flow, and the water sculpts the final terrain plus its moisture and
//! erosion maps.
//!
//! The pipeline, stage by stage:
//! 1. Scatter plate seeds on a jittered grid and partition the plane into
//!    a Voronoi plate graph with fractally jittered boundaries.
//! 2. Rasterize the boundaries, flood-fill plate ownership, and synthesize
//!    per-pixel heights from plate base height, ridge/trench falloff and
//!    fractal noise.
//! 3. Smooth the raw heightfield and flatten the map borders.
//! 4. Run a flux-based shallow-water erosion simulation with periodic
//!    rainfall, producing the final height, moisture, erosion and
//!    deposition grids.
//!
//! Image encoding, file I/O and the CLI live outside this crate: a run
//! ends with a [`WorldMaps`] value plus the raw plate graph, and reports
//! its progress through a caller-supplied [`ProgressSink`].

pub mod config;
pub mod erosion;
pub mod generator;
pub mod noise;
pub mod pipeline;
pub mod rng;
pub mod tectonics;
pub mod terrain;

pub use config::{ConfigError, WorldConfig};
pub use generator::WorldGenerator;
pub use noise::FractalNoiseConfig;
pub use pipeline::{
    CallbackSink, GenerationError, GenerationStage, NullSink, Pipeline, ProgressSink,
};
pub use tectonics::{EdgeId, PlateGraph, PlateId, TectonicEdge, TectonicPlate};
pub use terrain::{Grid, TerrainClass, World, WorldMaps};
