//! Feature extraction and output post-processing.

pub mod activation;
pub mod features;

pub use activation::softmax_rows;
pub use features::{FeatureExtractor, FeatureNormalization};
