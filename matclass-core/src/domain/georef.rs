//! GeoTIFF georeferencing carried from an input raster to the fused output.

use serde::{Deserialize, Serialize};

/// The GeoTIFF tags that place a raster on the ground.
///
/// The core never interprets the coordinate system; it copies these values
/// from one source image to the output, all inputs being pixel-aligned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoReference {
    /// `ModelPixelScaleTag`: `(sx, sy, sz)`.
    pub pixel_scale: Option<Vec<f64>>,
    /// `ModelTiepointTag`: repeated `(i, j, k, x, y, z)`.
    pub tiepoints: Option<Vec<f64>>,
    /// `ModelTransformationTag`: row-major 4x4 affine matrix.
    pub transformation: Option<Vec<f64>>,
    pub geo_key_directory: Option<Vec<u16>>,
    pub geo_double_params: Option<Vec<f64>>,
    pub geo_ascii_params: Option<String>,
}

impl GeoReference {
    pub fn is_empty(&self) -> bool {
        self.pixel_scale.is_none()
            && self.tiepoints.is_none()
            && self.transformation.is_none()
            && self.geo_key_directory.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiepoint_georef_is_not_empty() {
        let georef = GeoReference {
            pixel_scale: Some(vec![0.5, 0.5, 0.0]),
            tiepoints: Some(vec![0.0, 0.0, 0.0, 435000.0, 3354000.0, 0.0]),
            ..Default::default()
        };
        assert!(!georef.is_empty());
    }

    #[test]
    fn test_ascii_params_alone_do_not_georeference() {
        let georef = GeoReference {
            geo_ascii_params: Some("WGS 84 / UTM zone 17N|".to_string()),
            ..Default::default()
        };
        assert!(georef.is_empty());
    }

    #[test]
    fn test_empty() {
        assert!(GeoReference::default().is_empty());
    }
}
