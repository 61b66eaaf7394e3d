//! Parallel processing policy.

use serde::{Deserialize, Serialize};

/// Controls how batches and images are spread over worker threads.
///
/// Batches of one image write to disjoint regions of the output surface and
/// run on the rayon pool once their count exceeds `batch_threshold`. Images
/// are evaluated one at a time unless `concurrent_images` is set, in which
/// case combiner updates are serialized behind a lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelPolicy {
    /// Size of a dedicated rayon pool. `None` uses the global pool.
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Batch count at or below which an image is classified sequentially.
    #[serde(default = "ParallelPolicy::default_batch_threshold")]
    pub batch_threshold: usize,

    /// Evaluate several images at the same time.
    #[serde(default)]
    pub concurrent_images: bool,
}

impl ParallelPolicy {
    /// Create a new ParallelPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of threads.
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the batch threshold.
    pub fn with_batch_threshold(mut self, threshold: usize) -> Self {
        self.batch_threshold = threshold;
        self
    }

    /// Enable or disable concurrent image evaluation.
    pub fn with_concurrent_images(mut self, enabled: bool) -> Self {
        self.concurrent_images = enabled;
        self
    }

    /// Whether `num_batches` batches should be dispatched to the thread pool.
    pub fn parallel_batches(&self, num_batches: usize) -> bool {
        num_batches > self.batch_threshold
    }

    fn default_batch_threshold() -> usize {
        1
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            max_threads: None,
            batch_threshold: Self::default_batch_threshold(),
            concurrent_images: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_policy_defaults() {
        let policy = ParallelPolicy::default();
        assert_eq!(policy.max_threads, None);
        assert_eq!(policy.batch_threshold, 1);
        assert!(!policy.concurrent_images);
        assert!(!policy.parallel_batches(1));
        assert!(policy.parallel_batches(2));
    }

    #[test]
    fn test_parallel_policy_deserialize_partial() {
        let policy: ParallelPolicy = serde_json::from_str(r#"{"max_threads": 2}"#).unwrap();
        assert_eq!(policy.max_threads, Some(2));
        assert_eq!(policy.batch_threshold, 1);
    }
}
