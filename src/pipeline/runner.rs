//! Multi-image classification and fusion.

use super::config::PipelineConfig;
use super::evaluator::{ImageEvaluation, ImageEvaluator};
use super::stats::RunStats;
use crate::io::{GeoTiffReader, GeoTiffWriter, ImdMetadataReader};
use matclass_core::core::config::ConfigValidator;
use matclass_core::core::errors::SimpleError;
use matclass_core::core::validation::{validate_non_empty, validate_positive, validate_same_length};
use matclass_core::core::{MaterialError, MaterialResult, PixelClassifier, RasterWriter};
use matclass_core::domain::GeoReference;
use matclass_core::fusion::{FusedMap, FusionStrategy, ResultCombiner};
use matclass_core::predictors::MaterialClassifier;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};

/// Fused result of a run, before or after it is written.
#[derive(Debug, Clone)]
pub struct FusionOutcome {
    pub fused: FusedMap,
    /// Georeferencing of the first image; all inputs share its grid.
    pub georef: GeoReference,
    pub stats: RunStats,
    /// Files written by the output writer, empty for [`MaterialPipeline::fuse`].
    pub written: Vec<PathBuf>,
}

/// Evaluates every (image, metadata) pair and fuses the results.
#[derive(Debug)]
pub struct MaterialPipeline {
    evaluator: ImageEvaluator,
    strategy: FusionStrategy,
    writer: Option<Arc<dyn RasterWriter>>,
    concurrent_images: bool,
}

impl MaterialPipeline {
    pub fn new(evaluator: ImageEvaluator, strategy: FusionStrategy) -> Self {
        Self {
            evaluator,
            strategy,
            writer: None,
            concurrent_images: false,
        }
    }

    pub fn with_writer(mut self, writer: Arc<dyn RasterWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Evaluate several images at once; combiner updates stay serialized.
    pub fn with_concurrent_images(mut self, enabled: bool) -> Self {
        self.concurrent_images = enabled;
        self
    }

    /// Builds the file-backed pipeline: ONNX classifier, GeoTIFF and IMD
    /// readers, GeoTIFF writer.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a zero batch size, `ConfigError` for other invalid
    /// settings, `ModelLoad` if the model cannot be loaded.
    pub fn from_config(config: &PipelineConfig) -> MaterialResult<Self> {
        validate_positive(config.batch_size, "batch_size")?;
        config.validate()?;
        let classifier = MaterialClassifier::from_config(&config.classifier)?;
        let writer = GeoTiffWriter::new(&config.output_dir)
            .with_base_name(config.output_base.clone())
            .with_probabilities(config.write_probabilities)
            .with_preview(config.preview)
            .with_classes(classifier.classes().clone());

        let evaluator = ImageEvaluator::new(
            Arc::new(classifier),
            Arc::new(GeoTiffReader::new().with_nodata(config.nodata)),
            Arc::new(ImdMetadataReader::new()),
        )
        .with_batch_size(config.batch_size)?
        .with_parallel_policy(config.parallel.clone())?;

        Ok(Self::new(evaluator, config.strategy)
            .with_writer(Arc::new(writer))
            .with_concurrent_images(config.parallel.concurrent_images))
    }

    pub fn strategy(&self) -> FusionStrategy {
        self.strategy
    }

    pub fn classifier(&self) -> &Arc<dyn PixelClassifier> {
        self.evaluator.classifier()
    }

    /// Checks the path lists before any file is opened.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the lists are empty or differ in length.
    pub fn validate_inputs<P: AsRef<Path>, Q: AsRef<Path>>(
        image_paths: &[P],
        metadata_paths: &[Q],
    ) -> MaterialResult<()> {
        validate_non_empty(image_paths, "image_paths")?;
        validate_same_length(image_paths, metadata_paths, "image_paths", "metadata_paths")
    }

    /// Evaluates every pair and fuses the probability maps.
    ///
    /// Maps are folded into the combiner in input order, also when images
    /// are evaluated concurrently, so every strategy gives the same result
    /// on every run. Any failure aborts the run; no partial result is
    /// returned.
    pub fn fuse<P, Q>(
        &self,
        image_paths: &[P],
        metadata_paths: &[Q],
    ) -> MaterialResult<FusionOutcome>
    where
        P: AsRef<Path> + Sync,
        Q: AsRef<Path> + Sync,
    {
        Self::validate_inputs(image_paths, metadata_paths)?;
        let started = Instant::now();
        info!(
            images = image_paths.len(),
            strategy = %self.strategy,
            concurrent = self.concurrent_images,
            "starting fusion run"
        );

        let state = Mutex::new(RunState::new(self.strategy));
        let evaluate = |index: usize| -> MaterialResult<()> {
            let evaluation = self
                .evaluator
                .evaluate(image_paths[index].as_ref(), metadata_paths[index].as_ref())?;
            let mut state = state.lock().map_err(|_| {
                MaterialError::fusion_error(
                    "combiner lock",
                    SimpleError::new("a worker panicked while updating the combiner"),
                )
            })?;
            state.accept(index, evaluation)
        };

        if self.concurrent_images {
            (0..image_paths.len()).into_par_iter().try_for_each(evaluate)?;
        } else {
            (0..image_paths.len()).try_for_each(evaluate)?;
        }

        let RunState {
            combiner,
            mut stats,
            georef,
            ..
        } = state.into_inner().map_err(|_| {
            MaterialError::fusion_error(
                "combiner lock",
                SimpleError::new("combiner state poisoned"),
            )
        })?;
        let fused = combiner.finalize()?;
        let georef = georef.unwrap_or_default();
        if georef.is_empty() {
            warn!("first image carries no georeferencing; output will not be georeferenced");
        }

        stats.covered_pixels = fused.covered_pixels();
        stats.total_elapsed = started.elapsed();
        info!(
            images = stats.image_count(),
            covered_pixels = stats.covered_pixels,
            elapsed_ms = stats.total_elapsed.as_millis() as u64,
            "fusion complete"
        );
        Ok(FusionOutcome {
            fused,
            georef,
            stats,
            written: Vec::new(),
        })
    }

    /// Fuses every pair and writes the result.
    pub fn run<P, Q>(
        &self,
        image_paths: &[P],
        metadata_paths: &[Q],
    ) -> MaterialResult<FusionOutcome>
    where
        P: AsRef<Path> + Sync,
        Q: AsRef<Path> + Sync,
    {
        let mut outcome = self.fuse(image_paths, metadata_paths)?;
        if let Some(writer) = &self.writer {
            outcome.written = writer.write(&outcome.fused, &outcome.georef)?;
        } else {
            warn!("no output writer configured; fused result is not persisted");
        }
        Ok(outcome)
    }
}

struct RunState {
    combiner: ResultCombiner,
    stats: RunStats,
    /// Georeferencing of the first image.
    georef: Option<GeoReference>,
    /// Index of the next evaluation to fold.
    next: usize,
    /// Finished evaluations waiting for their predecessors.
    pending: BTreeMap<usize, ImageEvaluation>,
}

impl RunState {
    fn new(strategy: FusionStrategy) -> Self {
        Self {
            combiner: ResultCombiner::new(strategy),
            stats: RunStats::new(),
            georef: None,
            next: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Queues `evaluation` and folds every queued one whose predecessors
    /// have all been folded.
    fn accept(&mut self, index: usize, evaluation: ImageEvaluation) -> MaterialResult<()> {
        self.pending.insert(index, evaluation);
        while let Some(evaluation) = self.pending.remove(&self.next) {
            self.combiner.update(&evaluation.probabilities)?;
            self.stats.record(evaluation.stats);
            self.georef.get_or_insert(evaluation.georef);
            self.next += 1;
        }
        Ok(())
    }
}
