//! Tectonic plate partitioning.
//!
//! This module builds the plate graph that drives the heightmap:
//! - Jittered-grid plate scatter with an off-map margin
//! - Planar Voronoi tessellation for plate boundaries
//! - Left/right plate assignment per boundary edge
//! - Recursive edge jitter for organic plate boundaries

mod jitter;
mod plate;
mod voronoi;

pub use jitter::jitter_edges;
pub use plate::{edge_side, EdgeId, PlateGraph, PlateId, TectonicEdge, TectonicPlate};
pub use voronoi::{generate_plates, TectonicError};
