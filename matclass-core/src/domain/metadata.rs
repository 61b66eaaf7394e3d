//! Sensor calibration metadata.
//!
//! Raw digital numbers are converted to top-of-atmosphere radiance with the
//! per-band factors of a DigitalGlobe/Maxar `.IMD` file:
//! `radiance = DN * absCalFactor / effectiveBandwidth`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Radiometric calibration of one band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandCalibration {
    /// Group name of the band, e.g. `BAND_C`.
    pub name: String,
    pub abs_cal_factor: f64,
    pub effective_bandwidth: f64,
}

impl BandCalibration {
    pub fn new(name: impl Into<String>, abs_cal_factor: f64, effective_bandwidth: f64) -> Self {
        Self {
            name: name.into(),
            abs_cal_factor,
            effective_bandwidth,
        }
    }

    /// Multiplier turning a raw band value into radiance.
    pub fn gain(&self) -> f32 {
        (self.abs_cal_factor / self.effective_bandwidth) as f32
    }
}

/// Errors raised while parsing an IMD document.
#[derive(Error, Debug, PartialEq)]
pub enum MetadataParseError {
    #[error("line {line}: malformed entry '{text}'")]
    Malformed { line: usize, text: String },
    #[error("line {line}: '{key}' value '{value}' is not a number")]
    InvalidNumber {
        line: usize,
        key: String,
        value: String,
    },
    #[error("line {line}: END_GROUP = {found} does not close {expected}")]
    UnbalancedGroup {
        line: usize,
        expected: String,
        found: String,
    },
    #[error("band {band} is missing {field}")]
    MissingField { band: String, field: &'static str },
    #[error("effective bandwidth of band {band} must be positive, got {value}")]
    InvalidBandwidth { band: String, value: f64 },
    #[error("no BAND_* groups found")]
    NoBands,
}

/// Calibration data associated 1:1 with an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub satellite_id: Option<String>,
    pub acquisition_time: Option<String>,
    pub sun_azimuth: Option<f64>,
    pub sun_elevation: Option<f64>,
    /// Calibration per band, in the image's band order.
    pub bands: Vec<BandCalibration>,
}

#[derive(Default)]
struct PartialBand {
    name: String,
    abs_cal_factor: Option<f64>,
    effective_bandwidth: Option<f64>,
}

impl ImageMetadata {
    /// Metadata that leaves `bands` band values unchanged.
    pub fn identity(bands: usize) -> Self {
        Self {
            bands: (0..bands)
                .map(|i| BandCalibration::new(format!("BAND_{i}"), 1.0, 1.0))
                .collect(),
            ..Default::default()
        }
    }

    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }

    /// Per-band multipliers, in band order.
    pub fn gains(&self) -> Vec<f32> {
        self.bands.iter().map(BandCalibration::gain).collect()
    }

    /// Parses the text of an `.IMD` file.
    ///
    /// Entries are `key = value;` lines; `BEGIN_GROUP = X` / `END_GROUP = X`
    /// delimit groups. Every `BAND_*` group must provide `absCalFactor` and
    /// `effectiveBandwidth`; bands keep their order of appearance.
    pub fn from_imd_str(text: &str) -> Result<Self, MetadataParseError> {
        let mut metadata = ImageMetadata::default();
        let mut groups: Vec<String> = Vec::new();
        let mut band: Option<PartialBand> = None;
        let mut in_list = false;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line == "END;" {
                continue;
            }
            if in_list {
                in_list = !line.contains(')');
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(MetadataParseError::Malformed {
                    line: line_no,
                    text: line.to_string(),
                });
            };
            let key = key.trim();
            let value = value.trim().trim_end_matches(';').trim().trim_matches('"');
            if value.starts_with('(') {
                // Multi-line lists (e.g. per-line attitude) carry nothing we use.
                in_list = !value.contains(')');
                continue;
            }

            match key {
                "BEGIN_GROUP" => {
                    if value.starts_with("BAND_") && groups.is_empty() {
                        band = Some(PartialBand {
                            name: value.to_string(),
                            ..Default::default()
                        });
                    }
                    groups.push(value.to_string());
                }
                "END_GROUP" => {
                    let expected = groups.pop().unwrap_or_default();
                    if expected != value {
                        return Err(MetadataParseError::UnbalancedGroup {
                            line: line_no,
                            expected,
                            found: value.to_string(),
                        });
                    }
                    if groups.is_empty() {
                        if let Some(done) = band.take() {
                            metadata.bands.push(Self::finish_band(done)?);
                        }
                    }
                }
                "absCalFactor" if band.is_some() => {
                    let parsed = parse_number(line_no, key, value)?;
                    if let Some(b) = band.as_mut() {
                        b.abs_cal_factor = Some(parsed);
                    }
                }
                "effectiveBandwidth" if band.is_some() => {
                    let parsed = parse_number(line_no, key, value)?;
                    if let Some(b) = band.as_mut() {
                        b.effective_bandwidth = Some(parsed);
                    }
                }
                "satId" if metadata.satellite_id.is_none() => {
                    metadata.satellite_id = Some(value.to_string());
                }
                "firstLineTime" | "earliestAcqTime" if metadata.acquisition_time.is_none() => {
                    metadata.acquisition_time = Some(value.to_string());
                }
                "meanSunAz" => metadata.sun_azimuth = Some(parse_number(line_no, key, value)?),
                "meanSunEl" => metadata.sun_elevation = Some(parse_number(line_no, key, value)?),
                _ => {}
            }
        }

        if metadata.bands.is_empty() {
            return Err(MetadataParseError::NoBands);
        }
        Ok(metadata)
    }

    fn finish_band(band: PartialBand) -> Result<BandCalibration, MetadataParseError> {
        let abs_cal_factor = band.abs_cal_factor.ok_or_else(|| MetadataParseError::MissingField {
            band: band.name.clone(),
            field: "absCalFactor",
        })?;
        let effective_bandwidth =
            band.effective_bandwidth
                .ok_or_else(|| MetadataParseError::MissingField {
                    band: band.name.clone(),
                    field: "effectiveBandwidth",
                })?;
        if effective_bandwidth <= 0.0 {
            return Err(MetadataParseError::InvalidBandwidth {
                band: band.name,
                value: effective_bandwidth,
            });
        }
        Ok(BandCalibration::new(band.name, abs_cal_factor, effective_bandwidth))
    }
}

fn parse_number(line: usize, key: &str, value: &str) -> Result<f64, MetadataParseError> {
    value
        .parse::<f64>()
        .map_err(|_| MetadataParseError::InvalidNumber {
            line,
            key: key.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMD: &str = r#"version = "28.3";
generationTime = 2016-01-28T18:42:51.000000Z;
numRows = 2048;
BEGIN_GROUP = BAND_C
	ULLon = 56.27;
	absCalFactor = 9.295654e-03;
	effectiveBandwidth = 4.730000e-02;
END_GROUP = BAND_C
BEGIN_GROUP = BAND_B
	absCalFactor = 1.260825e-02;
	effectiveBandwidth = 5.430000e-02;
END_GROUP = BAND_B
BEGIN_GROUP = IMAGE_1
	satId = "WV03";
	firstLineTime = 2015-10-22T07:41:59.481150Z;
	meanSunAz = 155.2;
	meanSunEl = 48.7;
	attList = (
		1.0, 2.0,
		3.0 );
	BEGIN_GROUP = BAND_INNER
	END_GROUP = BAND_INNER
END_GROUP = IMAGE_1
END;
"#;

    #[test]
    fn test_parse_imd() {
        let metadata = ImageMetadata::from_imd_str(IMD).unwrap();
        assert_eq!(metadata.num_bands(), 2);
        assert_eq!(metadata.bands[0].name, "BAND_C");
        assert_eq!(metadata.bands[1].name, "BAND_B");
        assert_eq!(metadata.satellite_id.as_deref(), Some("WV03"));
        assert_eq!(
            metadata.acquisition_time.as_deref(),
            Some("2015-10-22T07:41:59.481150Z")
        );
        assert_eq!(metadata.sun_azimuth, Some(155.2));
        assert_eq!(metadata.sun_elevation, Some(48.7));

        let gain = metadata.bands[0].gain();
        assert!((gain - (9.295654e-03 / 4.73e-02) as f32).abs() < 1e-7);
    }

    #[test]
    fn test_missing_field() {
        let text = "BEGIN_GROUP = BAND_R\n absCalFactor = 0.01;\nEND_GROUP = BAND_R\n";
        assert_eq!(
            ImageMetadata::from_imd_str(text),
            Err(MetadataParseError::MissingField {
                band: "BAND_R".to_string(),
                field: "effectiveBandwidth",
            })
        );
    }

    #[test]
    fn test_unbalanced_group() {
        let text = "BEGIN_GROUP = BAND_R\nEND_GROUP = BAND_G\n";
        assert!(matches!(
            ImageMetadata::from_imd_str(text),
            Err(MetadataParseError::UnbalancedGroup { line: 2, .. })
        ));
    }

    #[test]
    fn test_no_bands() {
        assert_eq!(
            ImageMetadata::from_imd_str("satId = \"WV02\";\nEND;\n"),
            Err(MetadataParseError::NoBands)
        );
    }

    #[test]
    fn test_invalid_number() {
        let text = "BEGIN_GROUP = BAND_R\n absCalFactor = abc;\nEND_GROUP = BAND_R\n";
        assert!(matches!(
            ImageMetadata::from_imd_str(text),
            Err(MetadataParseError::InvalidNumber { line: 2, .. })
        ));
    }

    #[test]
    fn test_identity() {
        let metadata = ImageMetadata::identity(3);
        assert_eq!(metadata.gains(), vec![1.0, 1.0, 1.0]);
    }
}
