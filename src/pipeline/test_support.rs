//! Stub collaborators for evaluator and pipeline tests.

use matclass_core::core::{
    BatchPrediction, MaterialError, MaterialResult, MetadataReader, PixelBatch, PixelClassifier,
    RasterReader, Tensor2D,
};
use matclass_core::domain::{GeoReference, ImageMetadata, RasterImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns the same distribution for every pixel.
#[derive(Debug)]
pub struct FixedClassifier {
    pub distribution: Vec<f32>,
    pub calls: AtomicUsize,
}

impl FixedClassifier {
    pub fn new(distribution: &[f32]) -> Self {
        Self {
            distribution: distribution.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl PixelClassifier for FixedClassifier {
    fn num_classes(&self) -> usize {
        self.distribution.len()
    }

    fn classify_batch(
        &self,
        batch: &PixelBatch,
        _image: &RasterImage,
        _metadata: &ImageMetadata,
    ) -> MaterialResult<BatchPrediction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let k = self.distribution.len();
        let probs = Tensor2D::from_shape_fn((batch.len(), k), |(_, c)| self.distribution[c]);
        Ok(BatchPrediction::from_probabilities(probs))
    }
}

/// One-hot on `band0 % K` of each pixel, to check spatial placement.
#[derive(Debug)]
pub struct ValueClassifier {
    pub classes: usize,
}

impl PixelClassifier for ValueClassifier {
    fn num_classes(&self) -> usize {
        self.classes
    }

    fn classify_batch(
        &self,
        batch: &PixelBatch,
        image: &RasterImage,
        _metadata: &ImageMetadata,
    ) -> MaterialResult<BatchPrediction> {
        let mut probs = Tensor2D::zeros((batch.len(), self.classes));
        for (i, (row, col)) in batch.coords().enumerate() {
            let value = image.pixel(row, col)[0].max(0.0) as usize;
            probs[[i, value % self.classes]] = 1.0;
        }
        Ok(BatchPrediction::from_probabilities(probs))
    }
}

/// Two classes `[v, 1 - v]` from the first band value `v` of each pixel.
#[derive(Debug)]
pub struct ConfidenceClassifier;

impl PixelClassifier for ConfidenceClassifier {
    fn num_classes(&self) -> usize {
        2
    }

    fn classify_batch(
        &self,
        batch: &PixelBatch,
        image: &RasterImage,
        _metadata: &ImageMetadata,
    ) -> MaterialResult<BatchPrediction> {
        let mut probs = Tensor2D::zeros((batch.len(), 2));
        for (i, (row, col)) in batch.coords().enumerate() {
            let value = image.pixel(row, col)[0];
            probs[[i, 0]] = value;
            probs[[i, 1]] = 1.0 - value;
        }
        Ok(BatchPrediction::from_probabilities(probs))
    }
}

/// Fails on the given batch index.
#[derive(Debug)]
pub struct FailingClassifier {
    pub fail_on: usize,
}

impl PixelClassifier for FailingClassifier {
    fn num_classes(&self) -> usize {
        2
    }

    fn classify_batch(
        &self,
        batch: &PixelBatch,
        image: &RasterImage,
        metadata: &ImageMetadata,
    ) -> MaterialResult<BatchPrediction> {
        if batch.index() == self.fail_on {
            return Err(MaterialError::inference_error(
                "stub",
                &format!("batch {}", batch.index()),
                std::io::Error::other("device lost"),
            ));
        }
        FixedClassifier::new(&[0.5, 0.5]).classify_batch(batch, image, metadata)
    }
}

/// Serves rasters from memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemoryRasterReader {
    pub images: HashMap<PathBuf, RasterImage>,
    pub opened: AtomicUsize,
}

impl MemoryRasterReader {
    pub fn with(mut self, path: &str, image: RasterImage) -> Self {
        self.images.insert(PathBuf::from(path), image);
        self
    }
}

impl RasterReader for MemoryRasterReader {
    fn read(&self, path: &Path) -> MaterialResult<(RasterImage, GeoReference)> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let image = self.images.get(path).cloned().ok_or_else(|| {
            MaterialError::image_load_error(path, "no such raster", None::<std::io::Error>)
        })?;
        let georef = GeoReference {
            pixel_scale: Some(vec![1.0, 1.0, 0.0]),
            ..Default::default()
        };
        Ok((image, georef))
    }
}

/// Identity calibration for a fixed band count; paths containing
/// `missing` fail.
#[derive(Debug)]
pub struct IdentityMetadataReader {
    pub bands: usize,
}

impl MetadataReader for IdentityMetadataReader {
    fn read(&self, path: &Path) -> MaterialResult<ImageMetadata> {
        if path.to_string_lossy().contains("missing") {
            return Err(MaterialError::metadata_load_error(
                path,
                "no such metadata",
                None::<std::io::Error>,
            ));
        }
        Ok(ImageMetadata::identity(self.bands))
    }
}
