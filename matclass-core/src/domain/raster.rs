//! In-memory multispectral raster.

use crate::core::errors::{MaterialError, MaterialResult};
use ndarray::{Array2, Array3, ArrayView1, Axis};

/// A `height x width x bands` grid of band values.
///
/// Pixels whose bands all equal the nodata value, or that contain a
/// non-finite value, are outside the image's coverage.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    data: Array3<f32>,
    nodata: Option<f32>,
}

impl RasterImage {
    /// Wraps a `[height, width, bands]` array.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the array has no bands.
    pub fn new(data: Array3<f32>) -> MaterialResult<Self> {
        if data.len_of(Axis(2)) == 0 {
            return Err(MaterialError::invalid_input("raster has no bands"));
        }
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        Ok(Self { data, nodata: None })
    }

    /// Builds a raster from pixel-interleaved samples (`band` varies fastest).
    pub fn from_interleaved(
        height: usize,
        width: usize,
        bands: usize,
        samples: Vec<f32>,
    ) -> MaterialResult<Self> {
        let expected = height * width * bands;
        if samples.len() != expected {
            return Err(MaterialError::invalid_input(format!(
                "raster {height}x{width} with {bands} bands needs {expected} samples, got {}",
                samples.len()
            )));
        }
        Self::new(Array3::from_shape_vec((height, width, bands), samples)?)
    }

    /// A raster whose every pixel holds `values`.
    pub fn filled(height: usize, width: usize, values: &[f32]) -> MaterialResult<Self> {
        let bands = values.len();
        let samples = values
            .iter()
            .copied()
            .cycle()
            .take(height * width * bands)
            .collect();
        Self::from_interleaved(height, width, bands, samples)
    }

    pub fn with_nodata(mut self, nodata: Option<f32>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn height(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn width(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn bands(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Band values of one pixel.
    pub fn pixel(&self, row: usize, col: usize) -> ArrayView1<'_, f32> {
        self.data.slice(ndarray::s![row, col, ..])
    }

    /// Whether a pixel carries real measurements.
    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        let pixel = self.pixel(row, col);
        if pixel.iter().any(|v| !v.is_finite()) {
            return false;
        }
        match self.nodata {
            Some(nodata) => !pixel.iter().all(|&v| v == nodata),
            None => true,
        }
    }

    /// Validity of every pixel, `[height, width]`.
    pub fn valid_mask(&self) -> Array2<bool> {
        Array2::from_shape_fn((self.height(), self.width()), |(r, c)| self.is_valid(r, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_interleaved_layout() {
        let raster =
            RasterImage::from_interleaved(1, 2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(raster.pixel(0, 1).to_vec(), vec![4.0, 5.0, 6.0]);
        assert_eq!((raster.height(), raster.width(), raster.bands()), (1, 2, 3));
    }

    #[test]
    fn test_from_interleaved_rejects_bad_length() {
        assert!(RasterImage::from_interleaved(2, 2, 3, vec![0.0; 11]).is_err());
    }

    #[test]
    fn test_nodata_mask() {
        let raster = RasterImage::from_interleaved(
            1,
            4,
            2,
            vec![0.0, 0.0, 0.0, 5.0, f32::NAN, 1.0, 2.0, 3.0],
        )
        .unwrap()
        .with_nodata(Some(0.0));
        let mask = raster.valid_mask();
        assert_eq!(mask.row(0).to_vec(), vec![false, true, false, true]);
    }

    #[test]
    fn test_filled() {
        let raster = RasterImage::filled(3, 2, &[7.0, 8.0]).unwrap();
        assert!(raster.data().outer_iter().all(|row| {
            row.outer_iter().all(|px| px.to_vec() == vec![7.0, 8.0])
        }));
        assert!(raster.valid_mask().iter().all(|&v| v));
    }
}
