//! Per-pixel class probability surfaces.

use crate::core::constants::NODATA_LABEL;
use crate::core::errors::{MapShape, MaterialError, MaterialResult};
use crate::core::validation::validate_distribution;
use ndarray::{Array1, Array2, Array3, ArrayView1, Axis};

/// Per-pixel class labels, `[height, width]`; uncovered pixels hold
/// [`NODATA_LABEL`].
pub type LabelMap = Array2<u8>;

/// Index of the largest value; the lowest index wins ties.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Label map of a `[height, width, classes]` surface under a validity mask.
pub(crate) fn labels_of(probabilities: &Array3<f32>, valid: &Array2<bool>) -> LabelMap {
    let (height, width, _) = probabilities.dim();
    Array2::from_shape_fn((height, width), |(r, c)| {
        if !valid[[r, c]] {
            return NODATA_LABEL;
        }
        let pixel = probabilities.slice(ndarray::s![r, c, ..]);
        match pixel.as_slice() {
            Some(values) => argmax(values) as u8,
            None => argmax(&pixel.to_vec()) as u8,
        }
    })
}

/// Class probabilities for every pixel of one image, `[height, width, classes]`.
///
/// Entries of valid pixels are probability distributions. Pixels outside the
/// image's coverage are flagged invalid and hold zeros; fusion treats them as
/// not contributing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityMap {
    probabilities: Array3<f32>,
    valid: Array2<bool>,
}

impl ProbabilityMap {
    /// Wraps a probability array and its validity mask.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the mask does not match the array's first two
    /// dimensions or the array has no classes.
    pub fn new(probabilities: Array3<f32>, valid: Array2<bool>) -> MaterialResult<Self> {
        let (height, width, classes) = probabilities.dim();
        if classes == 0 {
            return Err(MaterialError::invalid_input(
                "probability map must have at least one class",
            ));
        }
        if valid.dim() != (height, width) {
            return Err(MaterialError::invalid_input(format!(
                "validity mask is {:?}, probability map is {height}x{width}",
                valid.dim()
            )));
        }
        let mut probabilities = probabilities;
        for ((r, c), &ok) in valid.indexed_iter() {
            if !ok {
                probabilities
                    .slice_mut(ndarray::s![r, c, ..])
                    .fill(0.0);
            }
        }
        Ok(Self {
            probabilities,
            valid,
        })
    }

    /// A map in which every pixel is valid.
    pub fn fully_covered(probabilities: Array3<f32>) -> MaterialResult<Self> {
        let (height, width, _) = probabilities.dim();
        Self::new(probabilities, Array2::from_elem((height, width), true))
    }

    /// The same distribution at every pixel.
    pub fn broadcast(height: usize, width: usize, distribution: &[f32]) -> MaterialResult<Self> {
        let dist = Array1::from(distribution.to_vec());
        let probabilities = Array3::from_shape_fn((height, width, dist.len()), |(_, _, k)| dist[k]);
        Self::fully_covered(probabilities)
    }

    pub fn shape(&self) -> MapShape {
        let (height, width, classes) = self.probabilities.dim();
        MapShape::new(height, width, classes)
    }

    pub fn height(&self) -> usize {
        self.probabilities.len_of(Axis(0))
    }

    pub fn width(&self) -> usize {
        self.probabilities.len_of(Axis(1))
    }

    pub fn num_classes(&self) -> usize {
        self.probabilities.len_of(Axis(2))
    }

    pub fn probabilities(&self) -> &Array3<f32> {
        &self.probabilities
    }

    pub fn valid_mask(&self) -> &Array2<bool> {
        &self.valid
    }

    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.valid[[row, col]]
    }

    /// Number of pixels inside the image's coverage.
    pub fn valid_pixels(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    pub fn pixel(&self, row: usize, col: usize) -> ArrayView1<'_, f32> {
        self.probabilities.slice(ndarray::s![row, col, ..])
    }

    /// Argmax class per pixel.
    pub fn labels(&self) -> LabelMap {
        labels_of(&self.probabilities, &self.valid)
    }

    /// Checks that every valid pixel holds a distribution within `tolerance`.
    pub fn check_normalized(&self, tolerance: f32) -> MaterialResult<()> {
        for ((row, col), &ok) in self.valid.indexed_iter() {
            if !ok {
                continue;
            }
            let pixel = self.pixel(row, col).to_vec();
            if let Err(sum) = validate_distribution(&pixel, tolerance) {
                return Err(MaterialError::InvalidProbabilities {
                    row,
                    col,
                    sum,
                    tolerance,
                });
            }
        }
        Ok(())
    }

    pub fn into_parts(self) -> (Array3<f32>, Array2<bool>) {
        (self.probabilities, self.valid)
    }
}
