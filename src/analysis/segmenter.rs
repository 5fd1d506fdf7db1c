//! Onset scoring and segment acceptance
//!
//! Every detected onset is scored on the smoothed log envelope: the window of
//! `window_seconds` starting at the onset sample (clipped at the end of the
//! signal) yields max, mean and population standard deviation, and
//! `env_delta = window_max - global_mean`. Onsets with
//! `env_delta > accept_threshold_db` become segments.
//!
//! Raising the threshold can only remove segments, never add them.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::analysis::result::{SegmentationFlag, SegmentationMetadata, SegmentationResult};
use crate::config::SegmentConfig;
use crate::error::SegmentationError;
use crate::features::envelope::log_envelope;
use crate::features::onset::OnsetDetector;
use crate::io::audio_signal::AudioSignal;

/// One accepted note segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    /// Onset time in seconds
    pub time: f64,
    /// Envelope maximum over the window (dB)
    pub env_max: f32,
    /// Envelope mean over the window (dB)
    pub env_mean: f32,
    /// Envelope standard deviation over the window (dB)
    pub env_std: f32,
    /// `env_max` minus the global envelope mean (dB)
    pub env_delta: f32,
}

/// Detect onsets in `signal` and keep the ones that stand out from the envelope
///
/// # Arguments
///
/// * `signal` - Mono audio
/// * `detector` - Onset detector to run
/// * `config` - Detector parameters, acceptance threshold and window length
///
/// # Returns
///
/// Accepted segments in ascending time, the detector's offsets, and metadata
///
/// # Errors
///
/// Returns `SegmentationError::Configuration` for an invalid configuration and
/// propagates detector errors.
pub fn segment(
    signal: &AudioSignal,
    detector: &dyn OnsetDetector,
    config: &SegmentConfig,
) -> Result<SegmentationResult, SegmentationError> {
    config.validate()?;
    let start_time = Instant::now();

    log::debug!(
        "Segmenting {:.2}s at {} Hz with '{}' detector",
        signal.duration_seconds(),
        signal.sample_rate(),
        detector.name()
    );

    let boundaries = detector.detect(signal, &config.params)?;
    let onset_times = boundaries.onset_times();

    let envelope = log_envelope(
        signal.samples(),
        signal.sample_rate(),
        config.envelope_filter_length,
    )?;
    let global_mean = mean(&envelope);
    let window_len = ((config.window_seconds as f64 * signal.sample_rate() as f64) as usize).max(1);

    let mut flags = Vec::new();
    let in_range = onset_times
        .iter()
        .filter(|&&t| signal.time_to_sample(t) < envelope.len())
        .count();
    if in_range < onset_times.len() {
        flags.push(SegmentationFlag::OnsetsPastEnd);
    }

    let segments = score_onsets(
        &envelope,
        signal.sample_rate(),
        &onset_times,
        window_len,
        config.accept_threshold_db,
    );

    if onset_times.is_empty() {
        flags.push(SegmentationFlag::NoOnsets);
    } else if segments.is_empty() {
        flags.push(SegmentationFlag::AllRejected);
    }

    log::debug!(
        "Accepted {} of {} onsets (global envelope mean {:.2} dB)",
        segments.len(),
        onset_times.len(),
        global_mean
    );

    let processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;

    Ok(SegmentationResult {
        metadata: SegmentationMetadata {
            detector: detector.name().to_string(),
            candidate_count: onset_times.len(),
            accepted_count: segments.len(),
            global_envelope_mean: global_mean,
            duration_seconds: signal.duration_seconds(),
            sample_rate: signal.sample_rate(),
            processing_time_ms,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            flags,
        },
        segments,
        offsets: boundaries.offset_times(),
    })
}

/// Score onsets against a precomputed envelope
///
/// Onsets whose sample index `floor(t * sample_rate)` falls at or past the end of
/// the envelope are skipped. The window is `[idx, idx + window_len)`, clipped.
pub fn score_onsets(
    envelope: &[f32],
    sample_rate: u32,
    onset_times: &[f64],
    window_len: usize,
    accept_threshold_db: f32,
) -> Vec<SegmentRecord> {
    if envelope.is_empty() {
        return Vec::new();
    }
    let global_mean = mean(envelope);

    onset_times
        .iter()
        .filter_map(|&time| {
            let idx = if time <= 0.0 {
                0
            } else {
                (time * sample_rate as f64).floor() as usize
            };
            if idx >= envelope.len() {
                return None;
            }
            let end = (idx + window_len.max(1)).min(envelope.len());
            let record = window_stats(time, &envelope[idx..end], global_mean);
            (record.env_delta > accept_threshold_db).then_some(record)
        })
        .collect()
}

fn window_stats(time: f64, window: &[f32], global_mean: f32) -> SegmentRecord {
    let env_max = window.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let env_mean = mean(window);
    let variance = window
        .iter()
        .map(|&v| {
            let d = v as f64 - env_mean as f64;
            d * d
        })
        .sum::<f64>()
        / window.len() as f64;

    SegmentRecord {
        time,
        env_max,
        env_mean,
        env_std: variance.sqrt() as f32,
        env_delta: env_max - global_mean,
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64) as f32
}
