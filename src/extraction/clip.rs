//! Single-clip extraction with optional padding
//!
//! A clip is the span `[start, end)` of a source file, clamped to the file. With a
//! target duration longer than the span, the tail is filled according to a
//! [`PadPolicy`] until the clip is exactly `round(target * sample_rate)` samples
//! long. A target shorter than the span never truncates.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SegmentationError;
use crate::io::audio_signal::AudioSignal;
use crate::io::backend::AudioBackend;
use crate::preprocessing::dither::Dither;

/// Standard deviation of noise padding
pub const DEFAULT_PAD_NOISE_SCALE: f32 = 1e-4;

/// How a clip is filled up to its target duration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PadPolicy {
    /// Digital silence
    #[default]
    Silence,
    /// Low-level Gaussian noise
    Noise {
        /// Noise standard deviation
        scale: f32,
        /// Fixed seed for reproducible padding
        seed: Option<u64>,
    },
}

impl PadPolicy {
    /// Noise padding at the default level, seeded from the OS
    pub fn noise() -> Self {
        PadPolicy::Noise {
            scale: DEFAULT_PAD_NOISE_SCALE,
            seed: None,
        }
    }

    /// Check the noise level
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::Configuration` for a negative or non-finite
    /// noise scale.
    pub fn validate(&self) -> Result<(), SegmentationError> {
        match *self {
            PadPolicy::Silence => Ok(()),
            PadPolicy::Noise { scale, .. } if scale.is_finite() && scale >= 0.0 => Ok(()),
            PadPolicy::Noise { scale, .. } => Err(SegmentationError::Configuration(format!(
                "Pad noise scale must be finite and >= 0, got {}",
                scale
            ))),
        }
    }

    fn fill(&self, len: usize) -> Result<Vec<f32>, SegmentationError> {
        match *self {
            PadPolicy::Silence => Ok(vec![0.0; len]),
            PadPolicy::Noise { scale, seed } => {
                let dither = match seed {
                    Some(seed) => Dither::seeded(seed),
                    None => Dither::from_os(),
                };
                dither.with_scale(scale).noise(len)
            }
        }
    }
}

/// A note clip written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteClip {
    /// Source recording
    pub source: PathBuf,
    /// Written clip
    pub path: PathBuf,
    /// Start of the span in the source, seconds
    pub start_time: f64,
    /// End of the span in the source, seconds
    pub end_time: f64,
    /// Duration of the written clip, seconds (includes padding)
    pub duration: f64,
}

/// Cut `[start, end)` out of `signal` and pad it to `target_duration`
///
/// # Errors
///
/// Returns `SegmentationError::InvalidInput` if `end <= start` or the clamped span
/// is empty, and `SegmentationError::Configuration` for a bad noise level.
pub fn render_clip(
    signal: &AudioSignal,
    start: f64,
    end: f64,
    target_duration: Option<f64>,
    pad: PadPolicy,
) -> Result<AudioSignal, SegmentationError> {
    pad.validate()?;
    check_span(start, end)?;

    let clip = signal.slice_seconds(start, end);
    if clip.is_empty() {
        return Err(SegmentationError::InvalidInput(format!(
            "Span [{:.3}, {:.3}) lies outside the {:.3}s source",
            start,
            end,
            signal.duration_seconds()
        )));
    }

    pad_clip(clip, target_duration, pad)
}

/// Extend `clip` with `pad` to `round(target_duration * sample_rate)` samples
///
/// A missing or non-positive target, or one no longer than the clip, returns the
/// clip unchanged.
///
/// # Errors
///
/// Returns `SegmentationError::Configuration` for a bad noise level.
pub fn pad_clip(
    clip: AudioSignal,
    target_duration: Option<f64>,
    pad: PadPolicy,
) -> Result<AudioSignal, SegmentationError> {
    pad.validate()?;
    let target_len = match target_duration {
        Some(target) if target.is_finite() && target > 0.0 => {
            (target * clip.sample_rate() as f64).round() as usize
        }
        _ => return Ok(clip),
    };
    if target_len <= clip.len() {
        return Ok(clip);
    }

    let sample_rate = clip.sample_rate();
    let mut samples = clip.into_samples();
    let fill = pad.fill(target_len - samples.len())?;
    samples.extend(fill);
    AudioSignal::new(samples, sample_rate)
}

fn check_span(start: f64, end: f64) -> Result<(), SegmentationError> {
    if !(end > start) {
        return Err(SegmentationError::InvalidInput(format!(
            "Clip end ({:.3}s) must be after start ({:.3}s)",
            end, start
        )));
    }
    Ok(())
}

/// Write `[start, end)` of `source` to `destination`, padded to `target_duration`
///
/// The cut goes through [`AudioBackend::trim`]. When the target is longer than the
/// cut, the clip is read back, padded and written again.
///
/// # Returns
///
/// The written clip's description. Any failure (unreadable source, empty span,
/// unwritable destination) is returned as an error for the caller to log and skip.
pub fn extract_clip(
    backend: &dyn AudioBackend,
    source: &Path,
    destination: &Path,
    start: f64,
    end: f64,
    target_duration: Option<f64>,
    pad: PadPolicy,
) -> Result<NoteClip, SegmentationError> {
    pad.validate()?;
    check_span(start, end)?;
    let start = start.max(0.0);

    backend.trim(source, destination, start, end)?;
    let trimmed = backend.read(destination)?;
    let span = trimmed.duration_seconds();
    let trimmed_len = trimmed.len();

    let clip = pad_clip(trimmed, target_duration, pad)?;
    if clip.len() > trimmed_len {
        backend.write(destination, &clip)?;
    }

    log::debug!(
        "Clip [{:.3}, {:.3}) of {} -> {} ({:.3}s)",
        start,
        start + span,
        source.display(),
        destination.display(),
        clip.duration_seconds()
    );

    Ok(NoteClip {
        source: source.to_path_buf(),
        path: destination.to_path_buf(),
        start_time: start,
        end_time: start + span,
        duration: clip.duration_seconds(),
    })
}

/// Write `[start, end)` of an already decoded source, without padding
pub(crate) fn write_clip(
    backend: &dyn AudioBackend,
    signal: &AudioSignal,
    source: &Path,
    destination: &Path,
    start: f64,
    end: f64,
) -> Result<NoteClip, SegmentationError> {
    let duration = signal.duration_seconds();
    let start = start.max(0.0);
    let end = end.min(duration);

    let clip = render_clip(signal, start, end, None, PadPolicy::Silence)?;
    backend.write(destination, &clip)?;

    log::debug!(
        "Clip [{:.3}, {:.3}) of {} -> {} ({:.3}s)",
        start,
        end,
        source.display(),
        destination.display(),
        clip.duration_seconds()
    );

    Ok(NoteClip {
        source: source.to_path_buf(),
        path: destination.to_path_buf(),
        start_time: start,
        end_time: end,
        duration: clip.duration_seconds(),
    })
}
