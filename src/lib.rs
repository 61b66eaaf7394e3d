//! # matclass
//!
//! Per-pixel material classification of orthorectified overhead imagery,
//! fusing the predictions of several images of the same area into one
//! probability surface.
//!
//! ## Components
//!
//! - **Batching and inference**: images are split into fixed-size pixel
//!   batches classified by an ONNX model (see [`matclass_core`])
//! - **Evaluation**: batch outputs are reassembled into a probability map
//!   aligned with the image grid
//! - **Fusion**: probability maps of all images are combined with a
//!   selectable strategy (`max_prob`, `mean_prob`, `weighted_vote`)
//! - **I/O**: GeoTIFF rasters, WorldView `.IMD` metadata (bare or in a
//!   `.tar`), GeoTIFF and PNG outputs
//!
//! ## Modules
//!
//! * [`io`] - Raster and metadata readers, result writer
//! * [`pipeline`] - Image evaluation, multi-image fusion runs, configuration
//! * [`utils`] - Logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use matclass::pipeline::{MaterialPipeline, PipelineConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::new("models/materials.onnx", "out/");
//! let images = ["scene_a.tif", "scene_b.tif"];
//! let metadata = ["scene_a.tar", "scene_b.tar"];
//!
//! MaterialPipeline::validate_inputs(&images, &metadata)?;
//! let outcome = MaterialPipeline::from_config(&config)?.run(&images, &metadata)?;
//! println!("wrote {:?}", outcome.written);
//! # Ok(())
//! # }
//! ```

pub mod io;
pub mod pipeline;
pub mod utils;

pub use matclass_core::core;
pub use matclass_core::domain;
pub use matclass_core::fusion;
pub use matclass_core::predictors;
pub use matclass_core::processors;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use matclass_core::prelude::*;

    // I/O
    pub use crate::io::{GeoTiffReader, GeoTiffWriter, ImdMetadataReader};

    // Pipeline
    pub use crate::pipeline::{
        ConfigLoader, FusionOutcome, ImageEvaluator, MaterialPipeline, PipelineConfig, RunStats,
    };

    pub use crate::utils::init_tracing;
}
