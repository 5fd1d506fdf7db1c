//! Error types for the segmentation pipeline

use std::fmt;

/// Errors that can occur during onset detection, segmentation or clip extraction
#[derive(Debug, Clone)]
pub enum SegmentationError {
    /// Invalid input data (empty buffer, zero sample rate, frequencies above Nyquist)
    InvalidInput(String),

    /// Invalid configuration, raised before any signal processing starts
    Configuration(String),

    /// Audio decoding error
    DecodingError(String),

    /// The external pitch tracker is missing or failed
    PitchTracker(String),

    /// Processing error during analysis or extraction
    ProcessingError(String),

    /// File system error
    Io(String),
}

impl fmt::Display for SegmentationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentationError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            SegmentationError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            SegmentationError::DecodingError(msg) => write!(f, "Decoding error: {}", msg),
            SegmentationError::PitchTracker(msg) => write!(f, "Pitch tracker error: {}", msg),
            SegmentationError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            SegmentationError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for SegmentationError {}

impl From<std::io::Error> for SegmentationError {
    fn from(err: std::io::Error) -> Self {
        SegmentationError::Io(err.to_string())
    }
}

impl From<hound::Error> for SegmentationError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => SegmentationError::Io(e.to_string()),
            other => SegmentationError::DecodingError(other.to_string()),
        }
    }
}

impl From<symphonia::core::errors::Error> for SegmentationError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        SegmentationError::DecodingError(err.to_string())
    }
}

impl From<csv::Error> for SegmentationError {
    fn from(err: csv::Error) -> Self {
        SegmentationError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        let err = SegmentationError::Configuration("unknown detector 'foo'".to_string());
        assert_eq!(err.to_string(), "Configuration error: unknown detector 'foo'");

        let err = SegmentationError::PitchTracker("binary not found".to_string());
        assert!(err.to_string().starts_with("Pitch tracker error"));
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.wav");
        let err: SegmentationError = io.into();
        assert!(matches!(err, SegmentationError::Io(_)));
    }
}
