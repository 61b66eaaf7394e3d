//! Whole-image evaluation.
//!
//! [`ImageEvaluator`] drives a [`PixelBatcher`] and a [`PixelClassifier`]
//! across one image. Batches are row-major and contiguous, so batch `i`
//! owns the slice `[i * B * K, (i + 1) * B * K)` of the output buffer and
//! workers never write to overlapping regions.

use super::stats::ImageStats;
use matclass_core::core::config::ParallelPolicy;
use matclass_core::core::constants::{DEFAULT_BATCH_SIZE, MAX_CLASSES, NODATA_LABEL};
use matclass_core::core::validation::validate_positive;
use matclass_core::core::{
    BatchPrediction, MaterialError, MaterialResult, MetadataReader, PixelBatcher,
    PixelClassifier, RasterReader,
};
use matclass_core::domain::{GeoReference, ImageMetadata, LabelMap, ProbabilityMap, RasterImage};
use ndarray::{Array2, Array3, Zip};
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Result of evaluating one image.
#[derive(Debug, Clone)]
pub struct ImageEvaluation {
    /// Classifier labels; uncovered pixels hold [`NODATA_LABEL`].
    pub labels: LabelMap,
    pub probabilities: ProbabilityMap,
    pub georef: GeoReference,
    pub stats: ImageStats,
}

/// Evaluates whole images with a classifier.
#[derive(Debug, Clone)]
pub struct ImageEvaluator {
    classifier: Arc<dyn PixelClassifier>,
    raster_reader: Arc<dyn RasterReader>,
    metadata_reader: Arc<dyn MetadataReader>,
    batch_size: usize,
    policy: ParallelPolicy,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl ImageEvaluator {
    pub fn new(
        classifier: Arc<dyn PixelClassifier>,
        raster_reader: Arc<dyn RasterReader>,
        metadata_reader: Arc<dyn MetadataReader>,
    ) -> Self {
        Self {
            classifier,
            raster_reader,
            metadata_reader,
            batch_size: DEFAULT_BATCH_SIZE,
            policy: ParallelPolicy::default(),
            pool: None,
        }
    }

    /// Sets the number of pixels per classifier call.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a zero batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> MaterialResult<Self> {
        validate_positive(batch_size, "batch_size")?;
        self.batch_size = batch_size;
        Ok(self)
    }

    /// Applies a parallel policy, building a dedicated pool when
    /// `max_threads` is set.
    pub fn with_parallel_policy(mut self, policy: ParallelPolicy) -> MaterialResult<Self> {
        self.pool = match policy.max_threads {
            Some(threads) => Some(Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("matclass-batch-{i}"))
                    .build()
                    .map_err(|e| {
                        MaterialError::config_error(format!("cannot build thread pool: {e}"))
                    })?,
            )),
            None => None,
        };
        self.policy = policy;
        Ok(self)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn classifier(&self) -> &Arc<dyn PixelClassifier> {
        &self.classifier
    }

    /// Loads an image and its metadata, then evaluates it.
    ///
    /// # Errors
    ///
    /// `ImageLoad` and `MetadataLoad` from the readers are propagated;
    /// metadata describing a different band count than the image is a
    /// `MetadataLoad` error.
    pub fn evaluate(
        &self,
        image_path: &Path,
        metadata_path: &Path,
    ) -> MaterialResult<ImageEvaluation> {
        let started = Instant::now();
        let (image, georef) = self.raster_reader.read(image_path)?;
        let metadata = self.metadata_reader.read(metadata_path)?;
        if metadata.num_bands() != image.bands() {
            return Err(MaterialError::metadata_load_error(
                metadata_path,
                format!(
                    "metadata describes {} bands but {} has {}",
                    metadata.num_bands(),
                    image_path.display(),
                    image.bands()
                ),
                None::<std::io::Error>,
            ));
        }

        let (labels, probabilities) = self.evaluate_image(&image, &metadata)?;
        let stats = ImageStats {
            image_path: Some(image_path.to_path_buf()),
            height: image.height(),
            width: image.width(),
            batches: PixelBatcher::new(image.height(), image.width(), self.batch_size)?
                .num_batches(),
            valid_pixels: probabilities.valid_pixels(),
            elapsed: started.elapsed(),
        };
        info!(
            image = %image_path.display(),
            height = stats.height,
            width = stats.width,
            batches = stats.batches,
            valid_pixels = stats.valid_pixels,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "image evaluated"
        );
        Ok(ImageEvaluation {
            labels,
            probabilities,
            georef,
            stats,
        })
    }

    /// Classifies every pixel of an in-memory image.
    ///
    /// Output pixel `(row, col)` corresponds to image pixel `(row, col)`
    /// whatever order the batches complete in.
    pub fn evaluate_image(
        &self,
        image: &RasterImage,
        metadata: &ImageMetadata,
    ) -> MaterialResult<(LabelMap, ProbabilityMap)> {
        let batcher = PixelBatcher::new(image.height(), image.width(), self.batch_size)?;
        let classes = self.classifier.num_classes();
        if classes == 0 || classes > MAX_CLASSES {
            return Err(MaterialError::invalid_input(format!(
                "classifier reports {classes} classes, expected 1..={MAX_CLASSES}"
            )));
        }

        let pixels = batcher.total_pixels();
        let mut probabilities = vec![0.0f32; pixels * classes];
        let mut labels = vec![NODATA_LABEL; pixels];
        let classifier = self.classifier.as_ref();

        let run_batch = |index: usize, probs: &mut [f32], labels: &mut [u8]| {
            let batch = batcher.batch(index).ok_or_else(|| {
                MaterialError::invalid_input(format!("batch {index} out of range"))
            })?;
            let prediction = classifier.classify_batch(&batch, image, metadata)?;
            prediction.check_against(&batch, classes)?;
            write_prediction(&prediction, probs, labels);
            Ok::<(), MaterialError>(())
        };

        let num_batches = batcher.num_batches();
        let batch_size = batcher.batch_size();
        if self.policy.parallel_batches(num_batches) {
            debug!(batches = num_batches, "classifying batches in parallel");
            let mut work = || {
                probabilities
                    .par_chunks_mut(batch_size * classes)
                    .zip(labels.par_chunks_mut(batch_size))
                    .enumerate()
                    .try_for_each(|(index, (probs, labels))| run_batch(index, probs, labels))
            };
            match &self.pool {
                Some(pool) => pool.install(work)?,
                None => work()?,
            }
        } else {
            debug!(batches = num_batches, "classifying batches sequentially");
            for (index, (probs, labels)) in probabilities
                .chunks_mut(batch_size * classes)
                .zip(labels.chunks_mut(batch_size))
                .enumerate()
            {
                run_batch(index, probs, labels)?;
            }
        }

        let probabilities = ProbabilityMap::new(
            Array3::from_shape_vec((image.height(), image.width(), classes), probabilities)?,
            image.valid_mask(),
        )?;
        let mut labels = Array2::from_shape_vec((image.height(), image.width()), labels)?;
        Zip::from(&mut labels)
            .and(probabilities.valid_mask())
            .for_each(|label, &valid| {
                if !valid {
                    *label = NODATA_LABEL;
                }
            });
        Ok((labels, probabilities))
    }
}

fn write_prediction(prediction: &BatchPrediction, probs: &mut [f32], labels: &mut [u8]) {
    let classes = prediction.num_classes();
    for (dst, src) in probs
        .chunks_mut(classes)
        .zip(prediction.probabilities.rows())
    {
        for (d, s) in dst.iter_mut().zip(src.iter()) {
            *d = *s;
        }
    }
    labels.copy_from_slice(&prediction.labels);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::*;
    use std::sync::atomic::Ordering;

    fn evaluator(
        classifier: Arc<dyn PixelClassifier>,
        reader: MemoryRasterReader,
        bands: usize,
    ) -> ImageEvaluator {
        ImageEvaluator::new(
            classifier,
            Arc::new(reader),
            Arc::new(IdentityMetadataReader { bands }),
        )
    }

    fn ramp(height: usize, width: usize) -> RasterImage {
        let samples = (0..height * width).map(|v| v as f32).collect();
        RasterImage::from_interleaved(height, width, 1, samples).unwrap()
    }

    #[test]
    fn test_uniform_image_yields_fixed_distribution() {
        let dist = [0.1, 0.6, 0.3];
        let classifier = Arc::new(FixedClassifier::new(&dist));
        let reader = MemoryRasterReader::default()
            .with("scene.tif", RasterImage::filled(5, 7, &[3.0, 4.0]).unwrap());
        let evaluation = evaluator(classifier.clone(), reader, 2)
            .with_batch_size(8)
            .unwrap()
            .evaluate(Path::new("scene.tif"), Path::new("scene.IMD"))
            .unwrap();

        assert_eq!(
            evaluation.probabilities,
            ProbabilityMap::broadcast(5, 7, &dist).unwrap()
        );
        assert!(evaluation.labels.iter().all(|&l| l == 1));
        assert_eq!(evaluation.stats.batches, 5);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 5);
        assert!(evaluation.probabilities.check_normalized(1e-5).is_ok());
    }

    #[test]
    fn test_spatial_correspondence_across_batch_sizes() {
        let (height, width, classes) = (6, 5, 7);
        let image = ramp(height, width);
        for batch_size in [1, 3, 4, 7, 30, 1000] {
            for policy in [
                ParallelPolicy::default(),
                ParallelPolicy::default().with_batch_threshold(usize::MAX),
                ParallelPolicy::default().with_max_threads(Some(2)),
            ] {
                let (labels, probs) = evaluator(
                    Arc::new(ValueClassifier { classes }),
                    MemoryRasterReader::default(),
                    1,
                )
                .with_batch_size(batch_size)
                .unwrap()
                .with_parallel_policy(policy)
                .unwrap()
                .evaluate_image(&image, &ImageMetadata::identity(1))
                .unwrap();

                for r in 0..height {
                    for c in 0..width {
                        let expected = (r * width + c) % classes;
                        assert_eq!(labels[[r, c]] as usize, expected);
                        assert_eq!(probs.pixel(r, c)[expected], 1.0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_nodata_pixels_are_masked() {
        let image = RasterImage::from_interleaved(1, 3, 1, vec![0.0, 2.0, f32::NAN])
            .unwrap()
            .with_nodata(Some(0.0));
        let (labels, probs) = evaluator(
            Arc::new(FixedClassifier::new(&[0.25, 0.75])),
            MemoryRasterReader::default(),
            1,
        )
        .evaluate_image(&image, &ImageMetadata::identity(1))
        .unwrap();

        assert_eq!(labels.row(0).to_vec(), vec![NODATA_LABEL, 1, NODATA_LABEL]);
        assert_eq!(probs.valid_pixels(), 1);
        assert_eq!(probs.pixel(0, 0).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_io_errors_propagate() {
        let reader = MemoryRasterReader::default()
            .with("scene.tif", RasterImage::filled(2, 2, &[1.0]).unwrap());
        let eval = evaluator(Arc::new(FixedClassifier::new(&[1.0])), reader, 1);

        let err = eval
            .evaluate(Path::new("other.tif"), Path::new("scene.IMD"))
            .unwrap_err();
        assert!(matches!(err, MaterialError::ImageLoad { .. }));

        let err = eval
            .evaluate(Path::new("scene.tif"), Path::new("missing.IMD"))
            .unwrap_err();
        assert!(matches!(err, MaterialError::MetadataLoad { .. }));
    }

    #[test]
    fn test_band_count_mismatch_is_metadata_error() {
        let reader = MemoryRasterReader::default()
            .with("scene.tif", RasterImage::filled(2, 2, &[1.0, 2.0, 3.0]).unwrap());
        let err = evaluator(Arc::new(FixedClassifier::new(&[1.0])), reader, 4)
            .evaluate(Path::new("scene.tif"), Path::new("scene.IMD"))
            .unwrap_err();
        assert!(matches!(err, MaterialError::MetadataLoad { .. }));
    }

    #[test]
    fn test_inference_failure_is_fatal() {
        for policy in [
            ParallelPolicy::default(),
            ParallelPolicy::default().with_batch_threshold(usize::MAX),
        ] {
            let err = evaluator(
                Arc::new(FailingClassifier { fail_on: 2 }),
                MemoryRasterReader::default(),
                1,
            )
            .with_batch_size(2)
            .unwrap()
            .with_parallel_policy(policy)
            .unwrap()
            .evaluate_image(&ramp(3, 3), &ImageMetadata::identity(1))
            .unwrap_err();
            assert!(matches!(err, MaterialError::Inference { .. }));
        }
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = evaluator(
            Arc::new(FixedClassifier::new(&[1.0])),
            MemoryRasterReader::default(),
            1,
        )
        .with_batch_size(0);
        assert!(matches!(result, Err(MaterialError::InvalidInput { .. })));
    }
}
