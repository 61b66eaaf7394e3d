//! Fusion of per-image probability maps.

pub mod combiner;
pub mod strategy;

pub use combiner::{FusedMap, ResultCombiner};
pub use strategy::FusionStrategy;
