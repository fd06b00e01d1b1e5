//! Generation pipeline: stage trait, orchestration and progress reporting.

mod progress;
mod stage;

pub use progress::{CallbackSink, NullSink, ProgressSink};
pub use stage::{
    ErosionStage, GenContext, GenerationError, GenerationStage, Pipeline, PostProcessStage,
    TectonicStage,
};

pub(crate) use progress::ProgressTracker;
