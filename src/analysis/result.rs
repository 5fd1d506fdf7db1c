//! Segmentation result types

use serde::{Deserialize, Serialize};

use crate::analysis::segmenter::SegmentRecord;

/// Segmentation flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentationFlag {
    /// The detector found no onsets
    NoOnsets,
    /// Onsets were found but none passed the acceptance threshold
    AllRejected,
    /// Some onsets lie past the end of the signal and were skipped
    OnsetsPastEnd,
}

/// Complete segmentation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationResult {
    /// Accepted segments in ascending onset time
    pub segments: Vec<SegmentRecord>,

    /// Offset times in seconds, for detectors that report them
    pub offsets: Vec<f64>,

    /// Segmentation metadata
    pub metadata: SegmentationMetadata,
}

impl SegmentationResult {
    /// Accepted onset times in seconds
    pub fn onset_times(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.time).collect()
    }
}

/// Segmentation metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationMetadata {
    /// Detector key used
    pub detector: String,

    /// Onsets reported by the detector
    pub candidate_count: usize,

    /// Onsets kept after scoring
    pub accepted_count: usize,

    /// Global mean of the scoring envelope in dB
    pub global_envelope_mean: f32,

    /// Audio duration in seconds
    pub duration_seconds: f64,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Algorithm version
    pub algorithm_version: String,

    /// Segmentation flags
    pub flags: Vec<SegmentationFlag>,
}
