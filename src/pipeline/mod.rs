//! The classification pipeline.
//!
//! [`ImageEvaluator`] turns one (image, metadata) pair into a probability
//! map; [`MaterialPipeline`] runs it over every pair, folds the maps into a
//! [`ResultCombiner`](matclass_core::fusion::ResultCombiner) and hands the
//! fused result to the output writer.

mod config;
pub mod evaluator;
pub mod runner;
pub mod stats;
#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ConfigFormat, ConfigLoader, PipelineConfig};
pub use evaluator::{ImageEvaluation, ImageEvaluator};
pub use runner::{FusionOutcome, MaterialPipeline};
pub use stats::{ImageStats, RunStats};
