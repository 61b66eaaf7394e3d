//! Interfaces between the pipeline stages and their collaborators.
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌────────────────┐   ┌────────────┐
//! │RasterReader│──▶│              │   │                │   │            │
//! │            │   │ImageEvaluator│──▶│ ResultCombiner │──▶│RasterWriter│
//! │MetadataRdr │──▶│ + Classifier │   │                │   │            │
//! └────────────┘   └──────────────┘   └────────────────┘   └────────────┘
//! ```
//!
//! Readers and writers sit at the I/O boundary; [`PixelClassifier`] is the
//! inference engine evaluated once per [`PixelBatch`].

use crate::core::batch::{PixelBatch, Tensor2D};
use crate::core::errors::{MaterialError, MaterialResult};
use crate::domain::{GeoReference, ImageMetadata, RasterImage, argmax};
use crate::fusion::FusedMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Output of one classifier call: a label and a probability vector per pixel,
/// in the batch's pixel order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPrediction {
    pub labels: Vec<u8>,
    /// `[batch.len(), num_classes]`
    pub probabilities: Tensor2D,
}

impl BatchPrediction {
    /// Pairs probabilities with their argmax labels.
    pub fn from_probabilities(probabilities: Tensor2D) -> Self {
        let labels = probabilities
            .rows()
            .into_iter()
            .map(|row| match row.as_slice() {
                Some(values) => argmax(values) as u8,
                None => argmax(&row.to_vec()) as u8,
            })
            .collect();
        Self {
            labels,
            probabilities,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.probabilities.ncols()
    }

    /// Checks that the prediction covers `batch` with `num_classes` classes.
    pub fn check_against(&self, batch: &PixelBatch, num_classes: usize) -> MaterialResult<()> {
        let (rows, cols) = self.probabilities.dim();
        if rows != batch.len() || self.labels.len() != batch.len() || cols != num_classes {
            return Err(MaterialError::invalid_input(format!(
                "batch {} prediction is {rows}x{cols} with {} labels, expected {}x{num_classes}",
                batch.index(),
                self.labels.len(),
                batch.len()
            )));
        }
        Ok(())
    }
}

/// A pretrained pixel-wise classifier.
///
/// Implementations must not mutate shared state between calls beyond the
/// loaded model, and must return probabilities that are already normalised.
pub trait PixelClassifier: Send + Sync + Debug {
    /// Number of material classes `K` in every probability vector.
    fn num_classes(&self) -> usize;

    /// Classifies the pixels of `batch`.
    fn classify_batch(
        &self,
        batch: &PixelBatch,
        image: &RasterImage,
        metadata: &ImageMetadata,
    ) -> MaterialResult<BatchPrediction>;

    /// Display names for the classes, when known.
    fn class_names(&self) -> Option<&[String]> {
        None
    }
}

/// Loads raster pixels and their georeferencing.
pub trait RasterReader: Send + Sync + Debug {
    fn read(&self, path: &Path) -> MaterialResult<(RasterImage, GeoReference)>;
}

/// Loads the calibration metadata paired with an image.
pub trait MetadataReader: Send + Sync + Debug {
    fn read(&self, path: &Path) -> MaterialResult<ImageMetadata>;
}

/// Persists a fused result; returns the paths written.
pub trait RasterWriter: Send + Sync + Debug {
    fn write(&self, fused: &FusedMap, georef: &GeoReference) -> MaterialResult<Vec<PathBuf>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PixelBatcher;
    use ndarray::array;

    #[test]
    fn test_from_probabilities_labels() {
        let prediction =
            BatchPrediction::from_probabilities(array![[0.1, 0.9], [0.5, 0.5], [0.7, 0.3]]);
        assert_eq!(prediction.labels, vec![1, 0, 0]);
        assert_eq!(prediction.num_classes(), 2);
    }

    #[test]
    fn test_check_against_batch() {
        let batch = PixelBatcher::new(1, 3, 3).unwrap().batch(0).unwrap();
        let prediction =
            BatchPrediction::from_probabilities(array![[0.1, 0.9], [0.5, 0.5], [0.7, 0.3]]);
        assert!(prediction.check_against(&batch, 2).is_ok());
        assert!(prediction.check_against(&batch, 3).is_err());

        let short = BatchPrediction::from_probabilities(array![[1.0, 0.0]]);
        assert!(short.check_against(&batch, 2).is_err());
    }
}
