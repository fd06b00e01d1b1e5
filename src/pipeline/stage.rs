//! Generation stage trait and pipeline orchestration.

use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::config::{ConfigError, WorldConfig};
use crate::erosion::{ErosionMaps, ErosionSimulator};
use crate::tectonics::{generate_plates, jitter_edges, TectonicError};
use crate::terrain::filters::{box_filter, flatten_border, median_filter};
use crate::terrain::{synthesize_heightmap, HeightmapError, World};

use super::progress::{ProgressSink, ProgressTracker};

/// Errors that can occur during pipeline execution.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Tectonics(#[from] TectonicError),
    #[error(transparent)]
    Heightmap(#[from] HeightmapError),
    #[error("generation ended before producing all output maps")]
    IncompleteOutput,
}

/// Per-run state handed to every stage: the configuration, the seeded RNG
/// threaded through the stages, and the progress tracker.
pub struct GenContext<'a> {
    pub config: &'a WorldConfig,
    pub seed: u64,
    pub rng: &'a mut ChaCha8Rng,
    pub(crate) progress: ProgressTracker<'a>,
}

impl<'a> GenContext<'a> {
    pub fn new(
        config: &'a WorldConfig,
        seed: u64,
        rng: &'a mut ChaCha8Rng,
        sink: &'a mut dyn ProgressSink,
    ) -> Self {
        Self {
            config,
            seed,
            rng,
            progress: ProgressTracker::new(sink),
        }
    }

    /// Reports overall progress, `fraction` in [0, 1].
    pub fn progress(&mut self, fraction: f32) {
        self.progress.report(fraction);
    }

    /// Emits a stage label or diagnostic message.
    pub fn info(&mut self, info: &str) {
        self.progress.info(info);
    }
}

/// Trait for implementing generation stages.
///
/// Each stage transforms the world in place, building upon the stages
/// before it. The trait-based design keeps the phases composable and lets
/// tests run them in isolation.
pub trait GenerationStage: Send + Sync {
    /// Human-readable stage label, emitted when the stage starts.
    fn label(&self) -> &'static str;

    /// Executes the stage, modifying the world in place.
    fn execute(&self, world: &mut World, ctx: &mut GenContext<'_>) -> Result<(), GenerationError>;
}

/// Orchestrates generation stages into a complete pipeline.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn GenerationStage>>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard tectonics → post-processing → erosion pipeline.
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        pipeline
            .add_stage(TectonicStage)
            .add_stage(PostProcessStage)
            .add_stage(ErosionStage);
        pipeline
    }

    /// Adds a stage to the pipeline.
    pub fn add_stage<S: GenerationStage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Returns the number of stages in the pipeline.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Executes all stages in order, announcing each through the info
    /// channel.
    pub fn run(&self, world: &mut World, ctx: &mut GenContext<'_>) -> Result<(), GenerationError> {
        for stage in &self.stages {
            ctx.info(stage.label());
            stage.execute(world, ctx)?;
        }
        Ok(())
    }
}

/// Plate scatter, Voronoi partitioning, edge jitter and heightfield
/// synthesis. Covers progress up to 50%.
pub struct TectonicStage;

impl GenerationStage for TectonicStage {
    fn label(&self) -> &'static str {
        "Simulating Tectonics"
    }

    fn execute(&self, world: &mut World, ctx: &mut GenContext<'_>) -> Result<(), GenerationError> {
        let config = ctx.config;
        let noise_seed = ctx.seed as i32;

        let mut graph = generate_plates(config, ctx.rng)?;
        jitter_edges(&mut graph, ctx.rng);
        ctx.progress(0.1);

        let heights = synthesize_heightmap(&graph, config, noise_seed, |fraction| {
            ctx.progress(0.1 + 0.4 * fraction);
        })?;

        world.heights = heights;
        world.plates = Some(graph);
        Ok(())
    }
}

/// Median/box smoothing passes and border flattening of the raw
/// heightfield.
pub struct PostProcessStage;

impl GenerationStage for PostProcessStage {
    fn label(&self) -> &'static str {
        "Post-Processing"
    }

    fn execute(&self, world: &mut World, ctx: &mut GenContext<'_>) -> Result<(), GenerationError> {
        let config = ctx.config;

        for _ in 0..config.median_filter_passes {
            world.heights = median_filter(&world.heights);
        }
        for _ in 0..config.box_filter_passes {
            world.heights = box_filter(&world.heights);
        }
        flatten_border(&mut world.heights, 0.0);

        ctx.progress(0.5);
        Ok(())
    }
}

/// Rainfall-driven hydraulic erosion; fills the moisture, erosion and
/// deposition maps. Covers progress from 50% to 95%.
pub struct ErosionStage;

impl GenerationStage for ErosionStage {
    fn label(&self) -> &'static str {
        "Simulating Erosion"
    }

    fn execute(&self, world: &mut World, ctx: &mut GenContext<'_>) -> Result<(), GenerationError> {
        let simulator = ErosionSimulator::new(ctx.config, std::mem::take(&mut world.heights));

        let GenContext { rng, progress, .. } = ctx;
        let (heights, maps) = simulator.run(&mut **rng, |fraction| {
            progress.report(0.5 + 0.45 * fraction);
        });

        let ErosionMaps {
            mut moisture,
            mut erosion,
            deposition,
            mean_moisture,
        } = maps;

        world.heights = heights;
        flatten_border(&mut world.heights, 0.0);
        flatten_border(&mut moisture, 1.0);
        flatten_border(&mut erosion, 0.0);

        world.moisture = Some(moisture);
        world.erosion = Some(erosion);
        world.deposition = Some(deposition);
        world.mean_moisture = mean_moisture;

        ctx.progress(0.95);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::NullSink;
    use rand::SeedableRng;

    #[test]
    fn test_stage_labels() {
        assert_eq!(TectonicStage.label(), "Simulating Tectonics");
        assert_eq!(PostProcessStage.label(), "Post-Processing");
        assert_eq!(ErosionStage.label(), "Simulating Erosion");
    }

    #[test]
    fn test_standard_pipeline_populates_world() {
        let config = WorldConfig::small(64);
        let mut world = World::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut sink = NullSink;
        let mut ctx = GenContext::new(&config, 42, &mut rng, &mut sink);

        let pipeline = Pipeline::standard();
        assert_eq!(pipeline.stage_count(), 3);
        pipeline.run(&mut world, &mut ctx).unwrap();

        assert!(world.plates.is_some());
        assert!(world.moisture.is_some());
        assert!(world.erosion.is_some());
        assert!(world.deposition.is_some());
        let (min, max) = world.height_range();
        assert!(min < max, "terrain should have variation");
    }

    #[test]
    fn test_empty_pipeline_is_a_no_op() {
        let config = WorldConfig::small(16);
        let mut world = World::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut sink = NullSink;
        let mut ctx = GenContext::new(&config, 1, &mut rng, &mut sink);

        Pipeline::new().run(&mut world, &mut ctx).unwrap();

        assert!(world.plates.is_none());
        assert!(world.moisture.is_none());
    }
}
