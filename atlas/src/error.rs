//! Error types for the map build pipeline.
//!
//! Matcher "no result" outcomes are `Option`s, not errors; coordinate
//! arithmetic bugs panic rather than surface here.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::Dimensions;

/// Errors that can occur while building a map.
#[derive(Debug, Error)]
pub enum Error {
    #[error("frame dimensions {actual:?} do not match the configured window {expected:?}")]
    FrameDimensions {
        expected: Dimensions,
        actual: Dimensions,
    },

    #[error("palette index {value:#x} at byte {offset} is out of range")]
    InvalidColor { value: u8, offset: usize },

    #[error("descriptor requires 25 pixels, got {pixels}")]
    DescriptorUnderrun { pixels: usize },

    #[error("compressed stream corrupt at bit {bit}")]
    Corrupt { bit: usize },

    #[error("decompressed {actual} pixels, expected {expected}")]
    PayloadSize { expected: usize, actual: usize },

    #[error("feed produced no frame after has_more() returned false")]
    FeedExhausted,

    #[error("fragment file '{path}' is truncated")]
    Truncated { path: PathBuf },

    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode '{path}': {source}")]
    Png {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_dimensions_message() {
        let err = Error::FrameDimensions {
            expected: Dimensions::new(388, 312),
            actual: Dimensions::new(388, 200),
        };
        let msg = err.to_string();
        assert!(msg.contains("388"));
        assert!(msg.contains("200"));
    }

    #[test]
    fn test_read_error_source_chain() {
        use std::error::Error as StdError;

        let err = Error::Read {
            path: PathBuf::from("/frames/0"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/frames/0"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_corrupt_message() {
        let err = Error::Corrupt { bit: 17 };
        assert!(err.to_string().contains("17"));
    }
}
