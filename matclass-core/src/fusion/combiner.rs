//! Multi-image probability fusion.
//!
//! A [`ResultCombiner`] folds one [`ProbabilityMap`] per source image into a
//! running accumulator and produces an immutable [`FusedMap`] once every
//! source has been added. Pixels outside a source's coverage do not
//! contribute to that pixel's fused value under any strategy.

use super::strategy::FusionStrategy;
use crate::core::errors::{MapShape, MaterialError, MaterialResult};
use crate::domain::probability::labels_of;
use crate::domain::{LabelMap, ProbabilityMap, argmax};
use ndarray::{Array2, Array3, ArrayView1, Axis, Zip};
use tracing::debug;

#[derive(Debug, Clone)]
struct Accumulator {
    shape: MapShape,
    /// Running max, sum or vote total, depending on the strategy.
    values: Array3<f32>,
    /// Number of sources covering each pixel.
    coverage: Array2<u32>,
    sources: usize,
}

impl Accumulator {
    fn new(strategy: FusionStrategy, shape: MapShape) -> Self {
        let init = match strategy {
            FusionStrategy::MaxProbability => f32::NEG_INFINITY,
            FusionStrategy::Mean | FusionStrategy::WeightedVote => 0.0,
        };
        Self {
            shape,
            values: Array3::from_elem((shape.height, shape.width, shape.num_classes), init),
            coverage: Array2::zeros((shape.height, shape.width)),
            sources: 0,
        }
    }

    fn fold(&mut self, strategy: FusionStrategy, map: &ProbabilityMap) {
        Zip::from(self.values.lanes_mut(Axis(2)))
            .and(&mut self.coverage)
            .and(map.probabilities().lanes(Axis(2)))
            .and(map.valid_mask())
            .par_for_each(|mut acc, count, probs, &valid| {
                if !valid {
                    return;
                }
                *count += 1;
                match strategy {
                    FusionStrategy::MaxProbability => {
                        acc.zip_mut_with(&probs, |a, &p| *a = a.max(p));
                    }
                    FusionStrategy::Mean => {
                        acc.zip_mut_with(&probs, |a, &p| *a += p);
                    }
                    FusionStrategy::WeightedVote => {
                        let winner = lane_argmax(probs);
                        acc[winner] += probs[winner];
                    }
                }
            });
        self.sources += 1;
    }

    fn finish(self, strategy: FusionStrategy) -> FusedMap {
        let Accumulator {
            mut values,
            coverage,
            sources,
            ..
        } = self;
        Zip::from(values.lanes_mut(Axis(2)))
            .and(&coverage)
            .par_for_each(|mut acc, &count| {
                if count == 0 {
                    acc.fill(0.0);
                    return;
                }
                match strategy {
                    FusionStrategy::MaxProbability => {}
                    FusionStrategy::Mean => {
                        let n = count as f32;
                        acc.mapv_inplace(|v| v / n);
                    }
                    FusionStrategy::WeightedVote => {
                        let total = acc.sum();
                        if total > 0.0 {
                            acc.mapv_inplace(|v| v / total);
                        }
                    }
                }
            });
        let valid = coverage.mapv(|count| count > 0);
        let labels = labels_of(&values, &valid);
        FusedMap {
            strategy,
            labels,
            probabilities: values,
            valid,
            sources,
        }
    }
}

fn lane_argmax(lane: ArrayView1<'_, f32>) -> usize {
    match lane.as_slice() {
        Some(values) => argmax(values),
        None => argmax(&lane.to_vec()),
    }
}

/// Accumulates probability maps and fuses them with one strategy.
///
/// ```rust
/// use matclass_core::domain::ProbabilityMap;
/// use matclass_core::fusion::{FusionStrategy, ResultCombiner};
///
/// let mut combiner = ResultCombiner::new(FusionStrategy::MaxProbability);
/// combiner.update(&ProbabilityMap::broadcast(4, 4, &[0.9, 0.1]).unwrap()).unwrap();
/// combiner.update(&ProbabilityMap::broadcast(4, 4, &[0.2, 0.8]).unwrap()).unwrap();
///
/// let fused = combiner.finalize().unwrap();
/// assert_eq!(fused.pixel(0, 0).to_vec(), vec![0.9, 0.8]);
/// assert_eq!(fused.labels()[[0, 0]], 0);
/// ```
#[derive(Debug, Clone)]
pub struct ResultCombiner {
    strategy: FusionStrategy,
    accumulator: Option<Accumulator>,
}

impl ResultCombiner {
    pub fn new(strategy: FusionStrategy) -> Self {
        Self {
            strategy,
            accumulator: None,
        }
    }

    pub fn strategy(&self) -> FusionStrategy {
        self.strategy
    }

    /// Number of maps folded in so far.
    pub fn sources(&self) -> usize {
        self.accumulator.as_ref().map_or(0, |acc| acc.sources)
    }

    /// Shape established by the first update.
    pub fn shape(&self) -> Option<MapShape> {
        self.accumulator.as_ref().map(|acc| acc.shape)
    }

    /// Folds one more map into the accumulator.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `map` differs in height, width or class
    /// count from the first map; the accumulator is left unchanged.
    pub fn update(&mut self, map: &ProbabilityMap) -> MaterialResult<()> {
        let shape = map.shape();
        let strategy = self.strategy;
        let accumulator = self
            .accumulator
            .get_or_insert_with(|| Accumulator::new(strategy, shape));
        if accumulator.shape != shape {
            return Err(MaterialError::shape_mismatch(accumulator.shape, shape));
        }
        accumulator.fold(strategy, map);
        debug!(
            strategy = %strategy,
            shape = %shape,
            sources = accumulator.sources,
            "probability map accumulated"
        );
        Ok(())
    }

    /// Produces the fused result.
    ///
    /// # Errors
    ///
    /// Returns `EmptyAccumulation` if no map was ever added.
    pub fn finalize(self) -> MaterialResult<FusedMap> {
        let strategy = self.strategy;
        self.accumulator
            .map(|acc| acc.finish(strategy))
            .ok_or_else(|| MaterialError::empty_accumulation(strategy.name()))
    }
}

/// Final combined surface handed to the output boundary.
///
/// Pixels no source covered are invalid, hold zero probabilities and carry
/// the nodata label.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedMap {
    strategy: FusionStrategy,
    labels: LabelMap,
    probabilities: Array3<f32>,
    valid: Array2<bool>,
    sources: usize,
}

impl FusedMap {
    pub fn strategy(&self) -> FusionStrategy {
        self.strategy
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    pub fn probabilities(&self) -> &Array3<f32> {
        &self.probabilities
    }

    pub fn valid_mask(&self) -> &Array2<bool> {
        &self.valid
    }

    /// Number of source maps fused.
    pub fn sources(&self) -> usize {
        self.sources
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

    pub fn pixel(&self, row: usize, col: usize) -> ArrayView1<'_, f32> {
        self.probabilities.slice(ndarray::s![row, col, ..])
    }

    /// Pixels covered by at least one source.
    pub fn covered_pixels(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Pixel count per label, indexed by class; nodata pixels are excluded.
    pub fn class_histogram(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_classes()];
        for (&label, _) in self.labels.iter().zip(self.valid.iter()).filter(|(_, v)| **v) {
            if let Some(count) = counts.get_mut(label as usize) {
                *count += 1;
            }
        }
        counts
    }
}
