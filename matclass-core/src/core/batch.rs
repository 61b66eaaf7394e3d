//! Pixel batching.
//!
//! An image's pixel grid is carved into fixed-size batches in row-major
//! order. Batch `i` covers the linear pixel indices
//! `[i * batch_size, min((i + 1) * batch_size, height * width))`, so batches
//! never overlap, never skip a pixel, and each one maps to a contiguous region
//! of a row-major output buffer.

use crate::core::errors::{MaterialError, MaterialResult};
use std::iter::FusedIterator;
use std::ops::Range;

/// A 2-dimensional tensor of f32 values.
pub type Tensor2D = ndarray::Array2<f32>;

/// A dynamic-dimensional tensor of f32 values.
pub type TensorD = ndarray::ArrayD<f32>;

/// Partitions an `height x width` pixel grid into batches of at most
/// `batch_size` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBatcher {
    height: usize,
    width: usize,
    batch_size: usize,
}

impl PixelBatcher {
    /// Creates a batcher for an image of the given dimensions.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `batch_size` is zero or the image has no pixels.
    pub fn new(height: usize, width: usize, batch_size: usize) -> MaterialResult<Self> {
        if batch_size == 0 {
            return Err(MaterialError::invalid_input(
                "batch size must be a positive integer, got 0",
            ));
        }
        if height == 0 || width == 0 {
            return Err(MaterialError::invalid_input(format!(
                "image has zero pixels ({height}x{width})"
            )));
        }
        Ok(Self {
            height,
            width,
            batch_size,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn total_pixels(&self) -> usize {
        self.height * self.width
    }

    pub fn num_batches(&self) -> usize {
        self.total_pixels().div_ceil(self.batch_size)
    }

    /// Returns the batch at `index`, or `None` past the last batch.
    pub fn batch(&self, index: usize) -> Option<PixelBatch> {
        let total = self.total_pixels();
        let start = index.checked_mul(self.batch_size)?;
        if start >= total {
            return None;
        }
        Some(PixelBatch {
            index,
            start,
            len: self.batch_size.min(total - start),
            width: self.width,
        })
    }

    /// Returns a fresh iterator over all batches.
    ///
    /// Each call starts again from the first batch.
    pub fn batches(&self) -> PixelBatches {
        PixelBatches {
            batcher: *self,
            next: 0,
            end: self.num_batches(),
        }
    }
}

impl IntoIterator for &PixelBatcher {
    type Item = PixelBatch;
    type IntoIter = PixelBatches;

    fn into_iter(self) -> Self::IntoIter {
        self.batches()
    }
}

/// A contiguous run of pixels in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBatch {
    index: usize,
    start: usize,
    len: usize,
    width: usize,
}

impl PixelBatch {
    /// Position of this batch in the batch sequence.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Linear index of the first pixel.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Linear pixel indices covered by this batch.
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }

    /// `(row, col)` coordinates of the batch pixels, in order.
    pub fn coords(&self) -> impl ExactSizeIterator<Item = (usize, usize)> + '_ {
        let width = self.width;
        self.range().map(move |i| (i / width, i % width))
    }
}

/// Iterator over the batches of a [`PixelBatcher`].
#[derive(Debug, Clone)]
pub struct PixelBatches {
    batcher: PixelBatcher,
    next: usize,
    end: usize,
}

impl Iterator for PixelBatches {
    type Item = PixelBatch;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let batch = self.batcher.batch(self.next);
        self.next += 1;
        batch
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for PixelBatches {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        self.end -= 1;
        self.batcher.batch(self.end)
    }
}

impl ExactSizeIterator for PixelBatches {}

impl FusedIterator for PixelBatches {}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(batcher: &PixelBatcher) -> Vec<usize> {
        let mut counts = vec![0usize; batcher.total_pixels()];
        for batch in batcher.batches() {
            assert!(batch.len() <= batcher.batch_size());
            for (row, col) in batch.coords() {
                counts[row * batcher.width() + col] += 1;
            }
        }
        counts
    }

    #[test]
    fn test_every_pixel_covered_exactly_once() {
        for &(h, w, b) in &[(7, 5, 3), (4, 4, 16), (1, 1, 1), (13, 17, 1024), (10, 10, 7)] {
            let batcher = PixelBatcher::new(h, w, b).unwrap();
            let counts = coverage(&batcher);
            assert!(counts.iter().all(|&c| c == 1), "{h}x{w} batch {b}");
            assert_eq!(batcher.batches().count(), batcher.num_batches());
        }
    }

    #[test]
    fn test_last_batch_may_be_short() {
        let batcher = PixelBatcher::new(3, 3, 4).unwrap();
        let lens: Vec<usize> = batcher.batches().map(|b| b.len()).collect();
        assert_eq!(lens, vec![4, 4, 1]);
    }

    #[test]
    fn test_batch_larger_than_image_is_single_batch() {
        let batcher = PixelBatcher::new(4, 6, 1000).unwrap();
        let batches: Vec<PixelBatch> = batcher.batches().collect();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].range(), 0..24);
    }

    #[test]
    fn test_batch_size_one_yields_one_batch_per_pixel() {
        let batcher = PixelBatcher::new(3, 5, 1).unwrap();
        assert_eq!(batcher.batches().count(), 15);
        assert!(coverage(&batcher).iter().all(|&c| c == 1));
    }

    #[test]
    fn test_row_major_order() {
        let batcher = PixelBatcher::new(2, 3, 4).unwrap();
        let coords: Vec<(usize, usize)> = batcher
            .batches()
            .flat_map(|b| b.coords().collect::<Vec<_>>())
            .collect();
        assert_eq!(
            coords,
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]
        );
    }

    #[test]
    fn test_batches_are_restartable() {
        let batcher = PixelBatcher::new(5, 5, 4).unwrap();
        let first: Vec<PixelBatch> = batcher.batches().collect();
        let second: Vec<PixelBatch> = (&batcher).into_iter().collect();
        assert_eq!(first, second);

        let mut reversed: Vec<PixelBatch> = batcher.batches().rev().collect();
        reversed.reverse();
        assert_eq!(first, reversed);
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(matches!(
            PixelBatcher::new(4, 4, 0),
            Err(MaterialError::InvalidInput { .. })
        ));
        assert!(matches!(
            PixelBatcher::new(0, 4, 16),
            Err(MaterialError::InvalidInput { .. })
        ));
        assert!(matches!(
            PixelBatcher::new(4, 0, 16),
            Err(MaterialError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_batch_lookup_out_of_range() {
        let batcher = PixelBatcher::new(2, 2, 3).unwrap();
        assert!(batcher.batch(1).is_some());
        assert!(batcher.batch(2).is_none());
        assert!(batcher.batch(usize::MAX).is_none());
    }
}
