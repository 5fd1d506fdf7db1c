//! Onset detection modules
//!
//! Three interchangeable detectors share one interface:
//! - Envelope: edge-kernel novelty over a down-sampled log envelope
//! - Log-CQT: edge-kernel novelty averaged across constant-Q bins
//! - Pitch track: voicing changes in an external pitch track (also yields offsets)
//!
//! Detectors are looked up by key in a [`DetectorRegistry`]; unknown keys are a
//! configuration error.
//!
//! # Alignment
//!
//! Every novelty curve comes from a causal FIR filter, so its peaks trail the
//! event that caused them. The pitch-track detector subtracts the kernel's group
//! delay, since its voicing curve is a clean step. The envelope detector snaps
//! each peak back to the steepest rise of the envelope inside the kernel span.
//! The log-CQT detector snaps to the frame where the bin-mean level climbs
//! halfway to its maximum inside the kernel span.

pub mod envelope;
pub mod logcqt;
pub mod pitch_track;

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::DetectorParams;
use crate::error::SegmentationError;
use crate::features::pitch_tracker::PitchTracker;
use crate::io::audio_signal::AudioSignal;

pub use envelope::EnvelopeDetector;
pub use logcqt::LogCqtDetector;
pub use pitch_track::PitchTrackDetector;

/// A detected boundary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnsetCandidate {
    /// Time in seconds
    pub time: f64,

    /// Aligned frame index in the detector's novelty curve
    pub frame: usize,

    /// Novelty value at the detected peak
    pub strength: f32,
}

/// Onsets (and, for detectors that find them, offsets) in ascending time order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Boundaries {
    /// Note starts
    pub onsets: Vec<OnsetCandidate>,

    /// Note ends (empty for detectors that only find onsets)
    pub offsets: Vec<OnsetCandidate>,
}

impl Boundaries {
    /// Onset times in seconds
    pub fn onset_times(&self) -> Vec<f64> {
        self.onsets.iter().map(|c| c.time).collect()
    }

    /// Offset times in seconds
    pub fn offset_times(&self) -> Vec<f64> {
        self.offsets.iter().map(|c| c.time).collect()
    }
}

/// Strategy interface shared by all detectors
pub trait OnsetDetector: Send + Sync {
    /// Registry key
    fn name(&self) -> &'static str;

    /// Detect boundaries in `signal`, applying `params` over the detector's defaults
    fn detect(
        &self,
        signal: &AudioSignal,
        params: &DetectorParams,
    ) -> Result<Boundaries, SegmentationError>;
}

/// Keys served by the pitch-track detector once a tracker is registered
pub const PITCH_TRACK_KEYS: [&str; 2] = ["pitchtrack", "hll"];

/// Key-to-detector lookup table
#[derive(Clone, Default)]
pub struct DetectorRegistry {
    detectors: HashMap<String, Arc<dyn OnsetDetector>>,
}

impl DetectorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the envelope and log-CQT detectors
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("envelope", Arc::new(EnvelopeDetector::default()));
        registry.register("logcqt", Arc::new(LogCqtDetector::default()));
        registry
    }

    /// Add the pitch-track detector under `pitchtrack` and its alias `hll`
    pub fn with_pitch_tracker(mut self, tracker: Arc<dyn PitchTracker>) -> Self {
        let detector: Arc<dyn OnsetDetector> = Arc::new(PitchTrackDetector::new(tracker));
        for key in PITCH_TRACK_KEYS {
            self.register(key, detector.clone());
        }
        self
    }

    /// Register `detector` under `key`, replacing any previous entry
    pub fn register(&mut self, key: &str, detector: Arc<dyn OnsetDetector>) {
        self.detectors.insert(key.to_string(), detector);
    }

    /// Look up a detector
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::PitchTracker` for a pitch-track key when no
    /// tracker has been registered, and `SegmentationError::Configuration` for any
    /// other unknown key.
    pub fn get(&self, key: &str) -> Result<Arc<dyn OnsetDetector>, SegmentationError> {
        if let Some(detector) = self.detectors.get(key) {
            return Ok(detector.clone());
        }
        if PITCH_TRACK_KEYS.contains(&key) {
            return Err(SegmentationError::PitchTracker(format!(
                "Detector '{}' requires a registered pitch tracker \
                 (DetectorRegistry::with_pitch_tracker, then segment or segment_file)",
                key
            )));
        }
        Err(SegmentationError::Configuration(format!(
            "Unknown onset detector '{}' (available: {})",
            key,
            self.keys().join(", ")
        )))
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.detectors.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl std::fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}

/// Shift peak frames back by a filter's group delay (saturating at 0)
pub(crate) fn compensate_delay(peaks: &[usize], delay: usize) -> Vec<usize> {
    peaks.iter().map(|&p| p.saturating_sub(delay)).collect()
}
