//! Segmentation and result types
//!
//! - Segmenter: scores onsets on the log envelope and applies the threshold
//! - Result types and metadata

pub mod result;
pub mod segmenter;
