//! WorldView `.IMD` calibration metadata, bare or inside a `.tar` delivery.

use matclass_core::core::{MaterialError, MaterialResult, MetadataReader};
use matclass_core::domain::ImageMetadata;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Reads [`ImageMetadata`] from an `.IMD` file or the first `.IMD` member of
/// a tar archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImdMetadataReader;

impl ImdMetadataReader {
    pub fn new() -> Self {
        Self
    }

    fn read_text(path: &Path) -> MaterialResult<String> {
        let file = File::open(path).map_err(|e| {
            MaterialError::metadata_load_error(path, "cannot open metadata file", Some(e))
        })?;
        if has_extension(path, "tar") {
            return imd_from_tar(path, BufReader::new(file));
        }
        let mut text = String::new();
        BufReader::new(file)
            .read_to_string(&mut text)
            .map_err(|e| {
                MaterialError::metadata_load_error(path, "cannot read metadata file", Some(e))
            })?;
        Ok(text)
    }
}

impl MetadataReader for ImdMetadataReader {
    fn read(&self, path: &Path) -> MaterialResult<ImageMetadata> {
        let text = Self::read_text(path)?;
        let metadata = ImageMetadata::from_imd_str(&text).map_err(|e| {
            MaterialError::metadata_load_error(path, "invalid IMD content", Some(e))
        })?;
        debug!(
            path = %path.display(),
            bands = metadata.num_bands(),
            satellite = metadata.satellite_id.as_deref().unwrap_or("unknown"),
            "metadata loaded"
        );
        Ok(metadata)
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn imd_from_tar(path: &Path, reader: impl Read) -> MaterialResult<String> {
    let io_error = |e: std::io::Error| {
        MaterialError::metadata_load_error(path, "cannot read tar archive", Some(e))
    };
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries().map_err(io_error)? {
        let mut entry = entry.map_err(io_error)?;
        let is_imd = entry
            .path()
            .map(|p| has_extension(&p, "imd"))
            .map_err(io_error)?;
        if !is_imd {
            continue;
        }
        let mut text = String::new();
        entry.read_to_string(&mut text).map_err(io_error)?;
        return Ok(text);
    }
    Err(MaterialError::metadata_load_error(
        path,
        "tar archive contains no .IMD file",
        None::<std::io::Error>,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMD: &str = "BEGIN_GROUP = BAND_B\n\tabsCalFactor = 0.5;\n\teffectiveBandwidth = 0.25;\nEND_GROUP = BAND_B\nBEGIN_GROUP = BAND_G\n\tabsCalFactor = 0.3;\n\teffectiveBandwidth = 0.1;\nEND_GROUP = BAND_G\nBEGIN_GROUP = IMAGE_1\n\tsatId = \"WV02\";\nEND_GROUP = IMAGE_1\nEND;\n";

    fn append(builder: &mut tar::Builder<File>, name: &str, data: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, data).unwrap();
    }

    #[test]
    fn test_read_bare_imd() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.IMD");
        std::fs::write(&path, IMD).unwrap();

        let metadata = ImdMetadataReader::new().read(&path).unwrap();
        assert_eq!(metadata.num_bands(), 2);
        assert_eq!(metadata.gains(), vec![2.0, 3.0]);
        assert_eq!(metadata.satellite_id.as_deref(), Some("WV02"));
    }

    #[test]
    fn test_read_imd_from_tar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("delivery.tar");
        let mut builder = tar::Builder::new(File::create(&path).unwrap());
        append(&mut builder, "delivery/README.TXT", b"readme");
        append(&mut builder, "delivery/16OCT22-P1BS.IMD", IMD.as_bytes());
        builder.finish().unwrap();
        drop(builder);

        let metadata = ImdMetadataReader::new().read(&path).unwrap();
        assert_eq!(metadata.num_bands(), 2);
    }

    #[test]
    fn test_tar_without_imd() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("delivery.tar");
        let mut builder = tar::Builder::new(File::create(&path).unwrap());
        append(&mut builder, "README.TXT", b"readme");
        builder.finish().unwrap();
        drop(builder);

        let err = ImdMetadataReader::new().read(&path).unwrap_err();
        assert!(matches!(err, MaterialError::MetadataLoad { .. }));
    }

    #[test]
    fn test_invalid_and_missing_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.IMD");
        std::fs::write(&path, "version = \"1\";\n").unwrap();
        let reader = ImdMetadataReader::new();
        assert!(matches!(
            reader.read(&path).unwrap_err(),
            MaterialError::MetadataLoad { .. }
        ));
        assert!(matches!(
            reader.read(Path::new("/nonexistent/scene.IMD")).unwrap_err(),
            MaterialError::MetadataLoad { .. }
        ));
    }
}
