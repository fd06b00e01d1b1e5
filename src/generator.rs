//! Top-level world generation entry point.

use std::thread::JoinHandle;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::{ConfigError, WorldConfig};
use crate::pipeline::{GenContext, GenerationError, Pipeline, ProgressSink};
use crate::terrain::{World, WorldMaps};

/// Generates complete worlds from a seed.
///
/// One generator can serve any number of runs; each run owns its grids, so
/// concurrent generations never share state.
#[derive(Debug, Clone)]
pub struct WorldGenerator {
    config: WorldConfig,
}

impl WorldGenerator {
    /// Creates a generator, failing fast on a degenerate configuration.
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Generator over the default 2048×2048 configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: WorldConfig::default(),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Runs one full generation.
    ///
    /// Progress percentages and stage labels stream through `sink` while
    /// the run executes. On failure the error is announced once through
    /// the info channel, progress is forced to 100%, and the error is
    /// returned; no partial artifact is produced.
    pub fn generate(
        &self,
        seed: u64,
        sink: &mut dyn ProgressSink,
    ) -> Result<WorldMaps, GenerationError> {
        let started = Instant::now();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut world = World::new(&self.config);
        let mut ctx = GenContext::new(&self.config, seed, &mut rng, sink);

        let result = Pipeline::standard()
            .run(&mut world, &mut ctx)
            .and_then(|_| world.into_maps().ok_or(GenerationError::IncompleteOutput));

        match result {
            Ok(maps) => {
                ctx.info(&format!(
                    "Generation finished in {:.2} seconds",
                    started.elapsed().as_secs_f64()
                ));
                ctx.progress(1.0);
                Ok(maps)
            }
            Err(error) => {
                ctx.progress(1.0);
                ctx.info("Error while generating world.");
                Err(error)
            }
        }
    }

    /// Runs one generation on a background thread.
    ///
    /// The caller may join the handle to await completion; `sink` receives
    /// the same notification stream as [`WorldGenerator::generate`].
    pub fn spawn<S>(&self, seed: u64, mut sink: S) -> JoinHandle<Result<WorldMaps, GenerationError>>
    where
        S: ProgressSink + 'static,
    {
        let generator = self.clone();
        std::thread::spawn(move || generator.generate(seed, &mut sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{CallbackSink, NullSink};

    fn small_generator() -> WorldGenerator {
        WorldGenerator::new(WorldConfig::small(64)).unwrap()
    }

    #[test]
    fn test_rejects_degenerate_config() {
        let config = WorldConfig {
            map_width: 0,
            ..Default::default()
        };
        assert!(WorldGenerator::new(config).is_err());
    }

    #[test]
    fn test_generate_produces_complete_maps() {
        let generator = small_generator();
        let mut sink = NullSink;
        let maps = generator.generate(123, &mut sink).unwrap();

        let cells = 64 * 64;
        assert_eq!(maps.heights.len(), cells);
        assert_eq!(maps.moisture.len(), cells);
        assert_eq!(maps.erosion.len(), cells);
        assert_eq!(maps.deposition.len(), cells);
        assert!(maps.plates.num_plates() >= 2);

        assert!(maps.heights.as_slice().iter().all(|h| h.is_finite()));
        assert!(maps
            .moisture
            .as_slice()
            .iter()
            .all(|&v| (0.0..=1.0).contains(&v)));
        assert!(maps
            .erosion
            .as_slice()
            .iter()
            .all(|&v| (0.0..=1.0).contains(&v)));
        assert!(maps
            .deposition
            .as_slice()
            .iter()
            .all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_runs_are_bit_identical_per_seed() {
        let generator = small_generator();
        let mut sink = NullSink;

        let first = generator.generate(7, &mut sink).unwrap();
        let second = generator.generate(7, &mut sink).unwrap();

        assert_eq!(first.heights, second.heights);
        assert_eq!(first.moisture, second.moisture);
        assert_eq!(first.erosion, second.erosion);
        assert_eq!(first.deposition, second.deposition);
    }

    #[test]
    fn test_progress_is_monotonic_and_completes() {
        let generator = small_generator();
        let mut percents: Vec<u8> = Vec::new();
        let mut labels: Vec<String> = Vec::new();

        {
            let mut sink = CallbackSink {
                progress: |p| percents.push(p),
                info: |s: &str| labels.push(s.to_string()),
            };
            generator.generate(42, &mut sink).unwrap();
        }

        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(percents.last(), Some(&100));
        assert!(labels.iter().any(|l| l == "Simulating Tectonics"));
        assert!(labels.iter().any(|l| l == "Post-Processing"));
        assert!(labels.iter().any(|l| l == "Simulating Erosion"));
    }

    #[test]
    fn test_spawn_completes_in_background() {
        let generator = small_generator();
        let handle = generator.spawn(5, NullSink);
        let maps = handle.join().expect("generation thread panicked").unwrap();
        assert_eq!(maps.heights.len(), 64 * 64);
    }
}
