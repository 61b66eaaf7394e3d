//! Inference engines implementing [`PixelClassifier`](crate::core::PixelClassifier).

pub mod material_classifier;

pub use material_classifier::MaterialClassifier;
