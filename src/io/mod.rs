//! File-backed collaborators: raster and metadata readers, result writer.

pub mod geotiff;
pub mod imd;

pub use geotiff::{GeoTiffReader, GeoTiffWriter};
pub use imd::ImdMetadataReader;
