//! Output activations for classifier logits.

use crate::core::batch::Tensor2D;
use ndarray::parallel::prelude::*;
use ndarray::{ArrayViewMut1, Axis};

/// Rows at or above this count are normalised on the rayon pool.
const PARALLEL_ROW_THRESHOLD: usize = 4096;

/// Numerically stable softmax over each row, in place.
pub fn softmax_rows(logits: &mut Tensor2D) {
    if logits.nrows() >= PARALLEL_ROW_THRESHOLD {
        logits
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .for_each(softmax_in_place);
    } else {
        logits.axis_iter_mut(Axis(0)).for_each(softmax_in_place);
    }
}

fn softmax_in_place(mut row: ArrayViewMut1<'_, f32>) {
    let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    row.mapv_inplace(|v| (v - max).exp());
    let sum = row.fold(0.0f32, |acc, &v| acc + v);
    if sum > 0.0 && sum.is_finite() {
        row.mapv_inplace(|v| v / sum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ShapeBuilder, array};

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let mut logits = array![[1.0f32, 2.0, 3.0], [1000.0, 1000.0, -1000.0]];
        softmax_rows(&mut logits);
        for row in logits.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }
        assert!((logits[[1, 0]] - 0.5).abs() < 1e-6);
        assert!(logits[[0, 2]] > logits[[0, 1]] && logits[[0, 1]] > logits[[0, 0]]);
    }

    #[test]
    fn test_softmax_parallel_path() {
        let mut logits = Tensor2D::from_shape_fn((PARALLEL_ROW_THRESHOLD + 3, 4), |(r, c)| {
            (r % 7) as f32 * 0.1 + c as f32
        });
        softmax_rows(&mut logits);
        assert!(logits.rows().into_iter().all(|row| (row.sum() - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_softmax_column_major_rows() {
        let values = [1.0f32, 2.0, 3.0, -1.0, 0.0, 1.0];
        let mut standard = Tensor2D::from_shape_vec((2, 3), values.to_vec()).unwrap();
        let mut column_major = Tensor2D::zeros((2, 3).f());
        column_major.assign(&standard);
        assert!(column_major.row(0).as_slice().is_none());

        softmax_rows(&mut standard);
        softmax_rows(&mut column_major);
        for (a, b) in column_major.iter().zip(standard.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
        assert!((column_major.row(1).sum() - 1.0).abs() < 1e-6);
    }
}
