//! Content hashing and change detection.
//!
//! The hash covers the format version, the metadata body and the raw atlas
//! (and palette) pixels. It is stored as the first line of the metadata file;
//! a rebuild whose hash matches that line writes nothing.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use image::RgbaImage;

use crate::error::{AtlasError, AtlasResult};

/// Version tag mixed into every hash. Bump when the output format changes.
pub const ATLAS_FORMAT_VERSION: u32 = 1;

/// Compute the BLAKE3 content hash of an atlas build, as lowercase hex.
pub fn content_hash(metadata: &str, atlas: &RgbaImage, palette: Option<&RgbaImage>) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(ATLAS_FORMAT_VERSION.to_string().as_bytes());
    hasher.update(metadata.as_bytes());
    hasher.update(atlas.as_raw());
    if let Some(palette) = palette {
        hasher.update(palette.as_raw());
    }
    hasher.finalize().to_hex().to_string()
}

/// Read the hash line of an existing metadata file.
///
/// Returns `None` when the file does not exist.
pub fn read_previous_hash(metadata_path: &Path) -> AtlasResult<Option<String>> {
    let file = match File::open(metadata_path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(AtlasError::io(metadata_path, e)),
    };

    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .map_err(|e| AtlasError::io(metadata_path, e))?;
    Ok(Some(line.trim().to_string()))
}

/// Whether the metadata file at `metadata_path` already records `hash`.
pub fn is_unchanged(metadata_path: &Path, hash: &str) -> AtlasResult<bool> {
    Ok(read_previous_hash(metadata_path)?.as_deref() == Some(hash))
}
