//! GeoTIFF raster reading and fused-result writing.

use image::{Rgb, RgbImage};
use matclass_core::core::constants::NODATA_LABEL;
use matclass_core::core::{MaterialError, MaterialResult, RasterReader, RasterWriter};
use matclass_core::domain::{GeoReference, MaterialClasses, RasterImage};
use matclass_core::fusion::FusedMap;
use ndarray::Axis;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek};
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;
use tiff::{ColorType, TiffError};
use tracing::{debug, info};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GEO_DOUBLE_PARAMS: u16 = 34736;
const GEO_ASCII_PARAMS: u16 = 34737;
const GDAL_NODATA: u16 = 42113;

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Reads pixel-interleaved GeoTIFFs into [`RasterImage`]s.
#[derive(Debug, Clone, Default)]
pub struct GeoTiffReader {
    /// Overrides the file's `GDAL_NODATA` value when set.
    nodata: Option<f32>,
}

impl GeoTiffReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodata(mut self, nodata: Option<f32>) -> Self {
        self.nodata = nodata;
        self
    }

    fn decode<R: Read + Seek>(&self, reader: R) -> Result<(RasterImage, GeoReference), LoadError> {
        let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());
        let (width, height) = decoder.dimensions()?;
        let bands = band_count(decoder.colortype()?)?;

        let georef = GeoReference {
            pixel_scale: find_f64_vec(&mut decoder, MODEL_PIXEL_SCALE)?,
            tiepoints: find_f64_vec(&mut decoder, MODEL_TIEPOINT)?,
            transformation: find_f64_vec(&mut decoder, MODEL_TRANSFORMATION)?,
            geo_key_directory: decoder.find_tag_unsigned_vec::<u16>(tag(GEO_KEY_DIRECTORY))?,
            geo_double_params: find_f64_vec(&mut decoder, GEO_DOUBLE_PARAMS)?,
            geo_ascii_params: find_string(&mut decoder, GEO_ASCII_PARAMS)?,
        };
        let file_nodata = find_string(&mut decoder, GDAL_NODATA)?
            .and_then(|s| s.trim_end_matches('\0').trim().parse::<f32>().ok());

        let samples = to_f32(decoder.read_image()?);
        let image =
            RasterImage::from_interleaved(height as usize, width as usize, bands, samples)
                .map_err(LoadError::Layout)?
                .with_nodata(self.nodata.or(file_nodata));
        Ok((image, georef))
    }
}

impl RasterReader for GeoTiffReader {
    fn read(&self, path: &Path) -> MaterialResult<(RasterImage, GeoReference)> {
        let file = File::open(path).map_err(|e| {
            MaterialError::image_load_error(path, "cannot open raster", Some(e))
        })?;
        let (image, georef) = self.decode(BufReader::new(file)).map_err(|e| match e {
            LoadError::Tiff(e) => {
                MaterialError::image_load_error(path, "cannot decode GeoTIFF", Some(e))
            }
            LoadError::Layout(e) => {
                MaterialError::image_load_error(path, "unexpected raster layout", Some(e))
            }
        })?;
        debug!(
            path = %path.display(),
            height = image.height(),
            width = image.width(),
            bands = image.bands(),
            nodata = ?image.nodata(),
            georeferenced = !georef.is_empty(),
            "raster loaded"
        );
        Ok((image, georef))
    }
}

#[derive(Debug, thiserror::Error)]
enum LoadError {
    #[error(transparent)]
    Tiff(#[from] TiffError),
    #[error(transparent)]
    Layout(MaterialError),
}

fn band_count(color: ColorType) -> Result<usize, LoadError> {
    let bands = match color {
        ColorType::Gray(_) => 1,
        ColorType::GrayA(_) => 2,
        ColorType::RGB(_) => 3,
        ColorType::RGBA(_) | ColorType::CMYK(_) => 4,
        ColorType::Multiband { num_samples, .. } => num_samples as usize,
        other => {
            return Err(LoadError::Tiff(TiffError::UnsupportedError(
                tiff::TiffUnsupportedError::UnsupportedColorType(other),
            )));
        }
    };
    Ok(bands)
}

fn to_f32(result: DecodingResult) -> Vec<f32> {
    match result {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
    }
}

fn find_f64_vec<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    code: u16,
) -> Result<Option<Vec<f64>>, TiffError> {
    decoder
        .find_tag(tag(code))?
        .map(|value| value.into_f64_vec())
        .transpose()
}

fn find_string<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    code: u16,
) -> Result<Option<String>, TiffError> {
    decoder
        .find_tag(tag(code))?
        .map(|value| value.into_string())
        .transpose()
}

/// Writes a fused result as GeoTIFF, with optional extras.
///
/// Files are named `<output_dir>/<base><strategy>.tif`; the probability
/// raster adds `_probabilities` and the preview uses `.png`.
#[derive(Debug, Clone)]
pub struct GeoTiffWriter {
    output_dir: PathBuf,
    base_name: String,
    write_probabilities: bool,
    preview: bool,
    classes: MaterialClasses,
}

impl GeoTiffWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_name: String::new(),
            write_probabilities: false,
            preview: false,
            classes: MaterialClasses::default(),
        }
    }

    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = base_name.into();
        self
    }

    pub fn with_probabilities(mut self, enabled: bool) -> Self {
        self.write_probabilities = enabled;
        self
    }

    pub fn with_preview(mut self, enabled: bool) -> Self {
        self.preview = enabled;
        self
    }

    pub fn with_classes(mut self, classes: MaterialClasses) -> Self {
        self.classes = classes;
        self
    }

    /// Path of the label raster for `strategy_name`.
    pub fn label_path(&self, strategy_name: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}{strategy_name}.tif", self.base_name))
    }

    pub fn probabilities_path(&self, strategy_name: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}{strategy_name}_probabilities.tif", self.base_name))
    }

    pub fn preview_path(&self, strategy_name: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}{strategy_name}.png", self.base_name))
    }

    fn write_labels(
        &self,
        path: &Path,
        fused: &FusedMap,
        georef: &GeoReference,
    ) -> Result<(), TiffError> {
        let (width, height) = (fused.width() as u32, fused.height() as u32);
        let labels: Vec<u8> = fused.labels().iter().copied().collect();

        let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
        let mut image = encoder.new_image::<colortype::Gray8>(width, height)?;
        write_georef(image.encoder(), georef)?;
        image
            .encoder()
            .write_tag(tag(GDAL_NODATA), NODATA_LABEL.to_string().as_str())?;
        image.write_data(&labels)
    }

    fn write_probability_pages(
        &self,
        path: &Path,
        fused: &FusedMap,
        georef: &GeoReference,
    ) -> Result<(), TiffError> {
        let (width, height) = (fused.width() as u32, fused.height() as u32);
        let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
        for class in fused.probabilities().axis_iter(Axis(2)) {
            let page: Vec<f32> = class.iter().copied().collect();
            let mut image = encoder.new_image::<colortype::Gray32Float>(width, height)?;
            write_georef(image.encoder(), georef)?;
            image.write_data(&page)?;
        }
        Ok(())
    }

    fn write_preview(&self, path: &Path, fused: &FusedMap) -> Result<(), image::ImageError> {
        let labels = fused.labels();
        let preview = RgbImage::from_fn(fused.width() as u32, fused.height() as u32, |x, y| {
            Rgb(self.classes.color(labels[[y as usize, x as usize]]))
        });
        preview.save(path)
    }
}

fn write_georef<W: std::io::Write + Seek, K: tiff::encoder::TiffKind>(
    encoder: &mut tiff::encoder::DirectoryEncoder<'_, W, K>,
    georef: &GeoReference,
) -> Result<(), TiffError> {
    if let Some(scale) = &georef.pixel_scale {
        encoder.write_tag(tag(MODEL_PIXEL_SCALE), scale.as_slice())?;
    }
    if let Some(tiepoints) = &georef.tiepoints {
        encoder.write_tag(tag(MODEL_TIEPOINT), tiepoints.as_slice())?;
    }
    if let Some(matrix) = &georef.transformation {
        encoder.write_tag(tag(MODEL_TRANSFORMATION), matrix.as_slice())?;
    }
    if let Some(keys) = &georef.geo_key_directory {
        encoder.write_tag(tag(GEO_KEY_DIRECTORY), keys.as_slice())?;
    }
    if let Some(params) = &georef.geo_double_params {
        encoder.write_tag(tag(GEO_DOUBLE_PARAMS), params.as_slice())?;
    }
    if let Some(ascii) = &georef.geo_ascii_params {
        encoder.write_tag(tag(GEO_ASCII_PARAMS), ascii.as_str())?;
    }
    Ok(())
}

impl RasterWriter for GeoTiffWriter {
    fn write(&self, fused: &FusedMap, georef: &GeoReference) -> MaterialResult<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            MaterialError::output_error(&self.output_dir, "cannot create output directory", Some(e))
        })?;
        let strategy = fused.strategy().name();
        let mut written = Vec::new();

        let path = self.label_path(strategy);
        self.write_labels(&path, fused, georef).map_err(|e| {
            MaterialError::output_error(&path, "cannot write label GeoTIFF", Some(e))
        })?;
        written.push(path);

        if self.write_probabilities {
            let path = self.probabilities_path(strategy);
            self.write_probability_pages(&path, fused, georef)
                .map_err(|e| {
                    MaterialError::output_error(&path, "cannot write probability GeoTIFF", Some(e))
                })?;
            written.push(path);
        }

        if self.preview {
            let path = self.preview_path(strategy);
            self.write_preview(&path, fused).map_err(|e| {
                MaterialError::output_error(&path, "cannot write preview", Some(e))
            })?;
            written.push(path);
        }

        info!(
            strategy,
            height = fused.height(),
            width = fused.width(),
            files = written.len(),
            "fused result written"
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matclass_core::domain::ProbabilityMap;
    use matclass_core::fusion::{FusionStrategy, ResultCombiner};
    use ndarray::{Array2, Array3};

    fn sample_georef() -> GeoReference {
        GeoReference {
            pixel_scale: Some(vec![0.5, 0.5, 0.0]),
            tiepoints: Some(vec![0.0, 0.0, 0.0, 500_000.0, 4_100_000.0, 0.0]),
            geo_key_directory: Some(vec![1, 1, 0, 1, 3072, 0, 1, 32617]),
            ..Default::default()
        }
    }

    fn write_multiband(path: &Path, width: u32, height: u32, samples: &[u16]) {
        let mut encoder = TiffEncoder::new(File::create(path).unwrap()).unwrap();
        let mut image = encoder.new_image::<colortype::RGB16>(width, height).unwrap();
        write_georef(image.encoder(), &sample_georef()).unwrap();
        image.encoder().write_tag(tag(GDAL_NODATA), "0").unwrap();
        image.write_data(samples).unwrap();
    }

    #[test]
    fn test_read_multiband_with_georef() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.tif");
        let samples: Vec<u16> = (0..2 * 3 * 3).map(|v| v as u16).collect();
        write_multiband(&path, 3, 2, &samples);

        let (image, georef) = GeoTiffReader::new().read(&path).unwrap();
        assert_eq!((image.height(), image.width(), image.bands()), (2, 3, 3));
        assert_eq!(image.pixel(1, 2).to_vec(), vec![15.0, 16.0, 17.0]);
        assert_eq!(image.nodata(), Some(0.0));
        assert_eq!(georef, sample_georef());
    }

    #[test]
    fn test_nodata_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.tif");
        write_multiband(&path, 1, 1, &[1, 2, 3]);
        let (image, _) = GeoTiffReader::new()
            .with_nodata(Some(-1.0))
            .read(&path)
            .unwrap();
        assert_eq!(image.nodata(), Some(-1.0));
    }

    #[test]
    fn test_read_missing_file() {
        let err = GeoTiffReader::new()
            .read(Path::new("/nonexistent/scene.tif"))
            .unwrap_err();
        assert!(matches!(err, MaterialError::ImageLoad { .. }));
    }

    #[test]
    fn test_read_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.tif");
        std::fs::write(&path, b"definitely not a tiff").unwrap();
        let err = GeoTiffReader::new().read(&path).unwrap_err();
        assert!(matches!(err, MaterialError::ImageLoad { .. }));
    }

    fn fused_fixture() -> FusedMap {
        let mut valid = Array2::from_elem((2, 3), true);
        valid[[0, 0]] = false;
        let probs = Array3::from_shape_fn((2, 3, 2), |(r, c, k)| {
            let p = if (r + c) % 2 == 0 { 0.8 } else { 0.3 };
            if k == 0 { p } else { 1.0 - p }
        });
        let mut combiner = ResultCombiner::new(FusionStrategy::MaxProbability);
        combiner
            .update(&ProbabilityMap::new(probs, valid).unwrap())
            .unwrap();
        combiner.finalize().unwrap()
    }

    #[test]
    fn test_write_outputs_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let writer = GeoTiffWriter::new(&out)
            .with_base_name("site_")
            .with_probabilities(true)
            .with_preview(true);
        let fused = fused_fixture();

        let written = writer.write(&fused, &sample_georef()).unwrap();
        assert_eq!(
            written,
            vec![
                out.join("site_max_prob.tif"),
                out.join("site_max_prob_probabilities.tif"),
                out.join("site_max_prob.png"),
            ]
        );

        let (labels, georef) = GeoTiffReader::new().read(&written[0]).unwrap();
        assert_eq!(georef, sample_georef());
        assert_eq!(labels.bands(), 1);
        assert_eq!(labels.pixel(0, 0)[0], f32::from(NODATA_LABEL));
        assert_eq!(labels.pixel(0, 1)[0], 1.0);
        assert_eq!(labels.pixel(1, 1)[0], 0.0);

        let file = File::open(&written[1]).unwrap();
        let mut decoder = Decoder::new(file).unwrap();
        let mut pages = 1;
        while decoder.more_images() {
            decoder.next_image().unwrap();
            pages += 1;
        }
        assert_eq!(pages, fused.num_classes());

        let preview = image::open(&written[2]).unwrap().to_rgb8();
        assert_eq!(preview.dimensions(), (3, 2));
    }

    #[test]
    fn test_default_name_matches_strategy() {
        let writer = GeoTiffWriter::new("/data/out");
        assert_eq!(
            writer.label_path("max_prob"),
            PathBuf::from("/data/out/max_prob.tif")
        );
    }
}
