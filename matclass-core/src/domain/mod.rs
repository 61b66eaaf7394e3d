//! Domain types: rasters, calibration metadata, georeferencing, probability
//! surfaces and the material catalogue.

pub mod georef;
pub mod materials;
pub mod metadata;
pub mod probability;
pub mod raster;

pub use georef::GeoReference;
pub use materials::MaterialClasses;
pub use metadata::{BandCalibration, ImageMetadata, MetadataParseError};
pub use probability::{LabelMap, ProbabilityMap, argmax};
pub use raster::RasterImage;
