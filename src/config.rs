//! Configuration parameters for onset detection and segmentation

use serde::{Deserialize, Serialize};

use crate::error::SegmentationError;
use crate::features::peak_picking::PeakPickParams;

/// Default detector key
pub const DEFAULT_DETECTOR: &str = "envelope";

/// Default acceptance threshold in dB above the global envelope mean
pub const DEFAULT_ACCEPT_THRESHOLD_DB: f32 = 2.5;

/// Default look-ahead window after each onset, in seconds
pub const DEFAULT_WINDOW_SECONDS: f32 = 1.0;

/// Default envelope smoothing length in samples
pub const DEFAULT_ENVELOPE_FILTER_LENGTH: usize = 100;

/// Sample rate audio is converted to before analysis
pub const DEFAULT_ANALYSIS_SAMPLE_RATE: u32 = 22050;

/// Keyword overrides forwarded to a detector
///
/// Every field is optional; a detector fills the gaps from its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorParams {
    /// Minimum peak height above the local mean
    pub delta: Option<f32>,
    /// Minimum spacing between peaks, in novelty frames
    pub wait: Option<usize>,
    /// Frames before a candidate in the local-max window
    pub pre_max: Option<usize>,
    /// Frames from a candidate in the local-max window
    pub post_max: Option<usize>,
    /// Frames before a candidate in the local-mean window
    pub pre_avg: Option<usize>,
    /// Frames from a candidate in the local-mean window
    pub post_avg: Option<usize>,
    /// Voicing threshold (pitch-track detector only)
    pub threshold: Option<f32>,
}

impl DetectorParams {
    /// Parse `key=value` pairs, e.g. `["delta=0.1", "wait=20"]`
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::Configuration` for a malformed pair, an unknown
    /// key or a value that does not parse.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, SegmentationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Self::default();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                SegmentationError::Configuration(format!(
                    "Expected key=value detector parameter, got '{}'",
                    pair
                ))
            })?;
            params.set(key.trim(), value.trim())?;
        }
        Ok(params)
    }

    /// Set one parameter from its textual form
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SegmentationError> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SegmentationError> {
            value.parse::<T>().map_err(|_| {
                SegmentationError::Configuration(format!(
                    "Invalid value '{}' for detector parameter '{}'",
                    value, key
                ))
            })
        }

        match key {
            "delta" => self.delta = Some(parse(key, value)?),
            "wait" => self.wait = Some(parse(key, value)?),
            "pre_max" => self.pre_max = Some(parse(key, value)?),
            "post_max" => self.post_max = Some(parse(key, value)?),
            "pre_avg" => self.pre_avg = Some(parse(key, value)?),
            "post_avg" => self.post_avg = Some(parse(key, value)?),
            "threshold" => self.threshold = Some(parse(key, value)?),
            other => {
                return Err(SegmentationError::Configuration(format!(
                    "Unknown detector parameter '{}'",
                    other
                )))
            }
        }
        Ok(())
    }

    /// Overlay these overrides on a detector's peak-picking defaults
    pub fn resolve(&self, defaults: PeakPickParams) -> PeakPickParams {
        PeakPickParams {
            pre_max: self.pre_max.unwrap_or(defaults.pre_max),
            post_max: self.post_max.unwrap_or(defaults.post_max),
            pre_avg: self.pre_avg.unwrap_or(defaults.pre_avg),
            post_avg: self.post_avg.unwrap_or(defaults.post_avg),
            delta: self.delta.unwrap_or(defaults.delta),
            wait: self.wait.unwrap_or(defaults.wait),
        }
    }

    /// Check values that do not depend on a detector's defaults
    pub fn validate(&self) -> Result<(), SegmentationError> {
        if let Some(delta) = self.delta {
            if !(delta.is_finite() && delta >= 0.0) {
                return Err(SegmentationError::Configuration(format!(
                    "delta must be >= 0, got {}",
                    delta
                )));
            }
        }
        if let Some(threshold) = self.threshold {
            if !threshold.is_finite() {
                return Err(SegmentationError::Configuration(format!(
                    "threshold must be finite, got {}",
                    threshold
                )));
            }
        }
        if self.post_max == Some(0) || self.post_avg == Some(0) {
            return Err(SegmentationError::Configuration(
                "post_max and post_avg must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Segmentation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Registry key of the onset detector (default: "envelope")
    pub detector: String,

    /// Overrides forwarded to the detector
    pub params: DetectorParams,

    /// A segment is kept when its window maximum exceeds the global envelope
    /// mean by more than this many dB (default: 2.5)
    pub accept_threshold_db: f32,

    /// Length of the envelope window scored after each onset (default: 1.0 s)
    pub window_seconds: f32,

    /// Hann smoothing length for the scoring envelope (default: 100 samples)
    pub envelope_filter_length: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            detector: DEFAULT_DETECTOR.to_string(),
            params: DetectorParams::default(),
            accept_threshold_db: DEFAULT_ACCEPT_THRESHOLD_DB,
            window_seconds: DEFAULT_WINDOW_SECONDS,
            envelope_filter_length: DEFAULT_ENVELOPE_FILTER_LENGTH,
        }
    }
}

impl SegmentConfig {
    /// Configuration for the given detector key, other fields at their defaults
    pub fn with_detector(detector: &str) -> Self {
        Self {
            detector: detector.to_string(),
            ..Self::default()
        }
    }

    /// Fail fast on values that would make segmentation meaningless
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::Configuration` for a non-positive threshold,
    /// window or filter length, or invalid detector parameters.
    pub fn validate(&self) -> Result<(), SegmentationError> {
        if self.detector.trim().is_empty() {
            return Err(SegmentationError::Configuration(
                "Detector key must not be empty".to_string(),
            ));
        }
        if !(self.accept_threshold_db.is_finite() && self.accept_threshold_db > 0.0) {
            return Err(SegmentationError::Configuration(format!(
                "Acceptance threshold must be > 0 dB, got {}",
                self.accept_threshold_db
            )));
        }
        if !(self.window_seconds.is_finite() && self.window_seconds > 0.0) {
            return Err(SegmentationError::Configuration(format!(
                "Window length must be > 0 s, got {}",
                self.window_seconds
            )));
        }
        if self.envelope_filter_length == 0 {
            return Err(SegmentationError::Configuration(
                "Envelope filter length must be > 0".to_string(),
            ));
        }
        self.params.validate()
    }
}
