//! Hydraulic erosion pipeline.
//!
//! Sculpts terrain with a flux-based shallow-water model: rainfall, flow,
//! capacity-driven erosion/deposition and sediment advection.

mod simulator;

pub use simulator::{ErosionMaps, ErosionSimulator};
