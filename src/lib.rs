//! # Stratum Notes
//!
//! Onset detection and note segmentation for isolated-instrument recordings:
//! find where each note starts (and, with a pitch tracker, where it ends),
//! keep the onsets that stand out from the background, and cut the recording
//! into one clip per note.
//!
//! ## Features
//!
//! - **Envelope detector**: edge filtering of a down-sampled log-power envelope
//! - **Log-CQT detector**: edge filtering of a constant-Q spectrogram, averaged over bins
//! - **Pitch-track detector**: voicing changes from an external pitch tracker (onsets and offsets)
//! - **Segmenter**: per-onset envelope statistics with a dB acceptance threshold
//! - **Clip extraction**: cut/pad note clips from the source recording
//! - **Batch**: parallel segmentation of whole collections
//!
//! ## Quick Start
//!
//! ```no_run
//! use stratum_notes::{segment_audio, SegmentConfig};
//!
//! // Mono samples at 22050 Hz
//! let samples: Vec<f32> = vec![0.0; 22050 * 5];
//!
//! let result = segment_audio(&samples, 22050, &SegmentConfig::default())?;
//! for segment in &result.segments {
//!     println!("{:.3}s  delta {:.1} dB", segment.time, segment.env_delta);
//! }
//! # Ok::<(), stratum_notes::SegmentationError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Audio → Envelope / Log-CQT / Pitch track → Edge filter → Peak picking
//!       → Segmenter (score + threshold) → Clip extraction
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod batch;
pub mod config;
pub mod error;
pub mod extraction;
pub mod features;
pub mod io;
pub mod preprocessing;

use std::path::Path;

// Re-export main types
pub use analysis::result::{SegmentationFlag, SegmentationMetadata, SegmentationResult};
pub use analysis::segmenter::{segment, SegmentRecord};
pub use batch::{segment_many, BatchItem, BatchOptions, BatchOutcome};
pub use config::{DetectorParams, SegmentConfig};
pub use error::SegmentationError;
pub use extraction::{extract_clip, segment_audio_from_onsets, NoteClip, PadPolicy};
pub use features::onset::{Boundaries, DetectorRegistry, OnsetCandidate, OnsetDetector};
pub use io::{AudioBackend, AudioSignal, NativeBackend};

/// Main segmentation function
///
/// Runs the detector named in `config` (from the default registry: "envelope"
/// or "logcqt") over the samples and keeps the onsets whose envelope window
/// rises more than `accept_threshold_db` above the global envelope mean.
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz (typically 22050)
/// * `config` - Segmentation configuration
///
/// # Returns
///
/// `SegmentationResult` with accepted segments in ascending time
///
/// # Errors
///
/// Returns `SegmentationError` for an invalid sample rate, an unknown detector or
/// invalid parameters. The pitch-track detector needs an external tracker, so
/// `"pitchtrack"` (or `"hll"`) gives `SegmentationError::PitchTracker`; register one
/// with [`DetectorRegistry::with_pitch_tracker`] and call [`segment`] or
/// [`segment_file`] instead.
///
/// # Example
///
/// ```no_run
/// use stratum_notes::{segment_audio, SegmentConfig};
///
/// let samples = vec![0.0f32; 22050 * 5]; // 5 seconds of silence
/// let result = segment_audio(&samples, 22050, &SegmentConfig::default())?;
/// assert!(result.segments.is_empty());
/// # Ok::<(), stratum_notes::SegmentationError>(())
/// ```
pub fn segment_audio(
    samples: &[f32],
    sample_rate: u32,
    config: &SegmentConfig,
) -> Result<SegmentationResult, SegmentationError> {
    let registry = DetectorRegistry::with_defaults();
    let detector = registry.get(&config.detector)?;
    let signal = AudioSignal::new(samples.to_vec(), sample_rate)?;
    segment(&signal, detector.as_ref(), config)
}

/// Read `path` through `backend` and segment it with a detector from `registry`
pub fn segment_file(
    path: &Path,
    config: &SegmentConfig,
    registry: &DetectorRegistry,
    backend: &dyn AudioBackend,
) -> Result<SegmentationResult, SegmentationError> {
    config.validate()?;
    let detector = registry.get(&config.detector)?;
    let signal = backend.read(path)?;
    log::debug!(
        "Loaded {}: {:.2}s at {} Hz",
        path.display(),
        signal.duration_seconds(),
        signal.sample_rate()
    );
    segment(&signal, detector.as_ref(), config)
}
