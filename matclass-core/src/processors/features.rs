//! Per-pixel feature extraction.
//!
//! Raw band values are calibrated with the image metadata and then
//! standardised per band, folded into one affine map per band:
//! `feature = value * alpha + beta` with `alpha = gain / std` and
//! `beta = -mean / std`.

use crate::core::batch::{PixelBatch, Tensor2D};
use crate::core::errors::{MaterialError, MaterialResult};
use crate::core::validation::validate_finite;
use crate::domain::{ImageMetadata, RasterImage};
use ndarray::Array2;

/// Per-band standardisation applied after calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureNormalization {
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl FeatureNormalization {
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> MaterialResult<Self> {
        if mean.len() != std.len() {
            return Err(MaterialError::config_error(format!(
                "feature mean has {} entries but std has {}",
                mean.len(),
                std.len()
            )));
        }
        for (i, &m) in mean.iter().enumerate() {
            validate_finite(m, &format!("mean[{i}]"))?;
        }
        for (i, &s) in std.iter().enumerate() {
            if !s.is_finite() || s <= 0.0 {
                return Err(MaterialError::config_error(format!(
                    "standard deviation at index {i} must be greater than 0, got {s}"
                )));
            }
        }
        Ok(Self { mean, std })
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

/// Builds model input features from raster pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureExtractor {
    normalization: Option<FeatureNormalization>,
}

impl FeatureExtractor {
    pub fn new(normalization: Option<FeatureNormalization>) -> Self {
        Self { normalization }
    }

    /// Builds an extractor from optional mean/std lists.
    pub fn from_parts(mean: Option<Vec<f32>>, std: Option<Vec<f32>>) -> MaterialResult<Self> {
        let normalization = match (mean, std) {
            (Some(mean), Some(std)) => Some(FeatureNormalization::new(mean, std)?),
            (None, None) => None,
            _ => {
                return Err(MaterialError::config_error(
                    "feature mean and std must be given together",
                ));
            }
        };
        Ok(Self::new(normalization))
    }

    /// Per-band `(alpha, beta)` for an image with `bands` bands.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the metadata or the normalisation describe
    /// a different number of bands than the image has.
    pub fn coefficients(
        &self,
        metadata: &ImageMetadata,
        bands: usize,
    ) -> MaterialResult<(Vec<f32>, Vec<f32>)> {
        if metadata.num_bands() != bands {
            return Err(MaterialError::invalid_input(format!(
                "metadata describes {} bands but the image has {bands}",
                metadata.num_bands()
            )));
        }
        let gains = metadata.gains();
        match &self.normalization {
            None => Ok((gains, vec![0.0; bands])),
            Some(norm) if norm.len() != bands => Err(MaterialError::invalid_input(format!(
                "feature normalisation is configured for {} bands but the image has {bands}",
                norm.len()
            ))),
            Some(norm) => {
                let alpha = gains.iter().zip(&norm.std).map(|(g, s)| g / s).collect();
                let beta = norm.mean.iter().zip(&norm.std).map(|(m, s)| -m / s).collect();
                Ok((alpha, beta))
            }
        }
    }

    /// Features of the batch pixels, `[batch.len(), bands]`.
    ///
    /// Non-finite inputs produce zero features; such pixels are masked out of
    /// the probability map afterwards.
    pub fn extract(
        &self,
        batch: &PixelBatch,
        image: &RasterImage,
        metadata: &ImageMetadata,
    ) -> MaterialResult<Tensor2D> {
        let bands = image.bands();
        let (alpha, beta) = self.coefficients(metadata, bands)?;
        let samples = image.data().as_slice().ok_or_else(|| {
            MaterialError::invalid_input("raster samples are not contiguous in memory")
        })?;

        let range = batch.range();
        let source = samples
            .get(range.start * bands..range.end * bands)
            .ok_or_else(|| {
                MaterialError::invalid_input(format!(
                    "batch {} ({}..{}) lies outside the {}x{} image",
                    batch.index(),
                    range.start,
                    range.end,
                    image.height(),
                    image.width()
                ))
            })?;

        let mut features = Vec::with_capacity(source.len());
        for pixel in source.chunks_exact(bands) {
            let finite = pixel.iter().all(|v| v.is_finite());
            features.extend(pixel.iter().enumerate().map(|(c, &v)| {
                if finite { v * alpha[c] + beta[c] } else { 0.0 }
            }));
        }
        Ok(Array2::from_shape_vec((batch.len(), bands), features)?)
    }
}
