//! Error types for atlas packing.

use std::path::PathBuf;

use thiserror::Error;

use crate::png::PngError;

/// Result type for atlas operations.
pub type AtlasResult<T> = Result<T, AtlasError>;

/// Errors that can occur while building one atlas.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// A frame does not share the size of the first frame.
    #[error(
        "frame {} is {}x{}, expected {}x{} like the other frames",
        path.display(), found.0, found.1, expected.0, expected.1
    )]
    DimensionMismatch {
        /// Offending frame.
        path: PathBuf,
        /// Size of the first loaded frame.
        expected: (u32, u32),
        /// Size of the offending frame.
        found: (u32, u32),
    },

    /// The atlas has no frames to lay out.
    #[error("atlas contains no frames")]
    NoFrames,

    /// The source path has no final component to name the atlas after.
    #[error("cannot name an atlas after {}", path.display())]
    UnnamedAtlas {
        /// Atlas source directory.
        path: PathBuf,
    },

    /// Two entries produced the same animation name.
    #[error("duplicate animation name '{name}'")]
    DuplicateAnimation {
        /// The repeated name.
        name: String,
    },

    /// A settings tag carried a number that does not fit.
    #[error("invalid value '{value}' for setting '{tag}'")]
    InvalidSetting {
        /// Settings tag.
        tag: &'static str,
        /// Raw value text.
        value: String,
    },

    /// The computed atlas dimensions overflow.
    #[error("atlas dimensions overflow for {columns}x{rows} cells of {cell_width}x{cell_height}")]
    AtlasTooLarge {
        /// Grid columns.
        columns: u32,
        /// Grid rows.
        rows: u32,
        /// Padded cell width.
        cell_width: u32,
        /// Padded cell height.
        cell_height: u32,
    },

    /// An input image could not be decoded.
    #[error("failed to decode image {}: {source}", path.display())]
    Decode {
        /// Image path.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: image::ImageError,
    },

    /// File system error.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal error.
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// PNG encoding error.
    #[error("PNG encoding error: {0}")]
    Png(#[from] PngError),
}

impl AtlasError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AtlasError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = AtlasError::DimensionMismatch {
            path: PathBuf::from("walk/02.png"),
            expected: (16, 16),
            found: (16, 17),
        };
        let msg = err.to_string();
        assert!(msg.contains("walk/02.png"));
        assert!(msg.contains("16x17"));
        assert!(msg.contains("expected 16x16"));
    }

    #[test]
    fn test_decode_error_names_path() {
        let source = image::ImageError::IoError(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "truncated",
        ));
        let err = AtlasError::Decode {
            path: PathBuf::from("idle/00.png"),
            source,
        };
        assert!(err.to_string().contains("idle/00.png"));
    }
}
