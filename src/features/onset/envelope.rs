//! Envelope-based onset detection
//!
//! Algorithm:
//! 1. Smoothed log-power envelope (Hann, 100 samples)
//! 2. Keep every 100th value and remove the mean
//! 3. Causal edge filter (`canny(100, 3.5, 1)`, unit absolute sum)
//! 4. Half-wave rectify: only rising edges remain
//! 5. Peak picking (pre/post max 500, pre/post avg 10, delta 0.025, wait 100)
//! 6. Snap each peak back to the steepest envelope rise inside the kernel span
//!
//! Frames are converted to seconds with the 100-sample hop.

use crate::config::DetectorParams;
use crate::error::SegmentationError;
use crate::features::envelope::{log_envelope, DEFAULT_FILTER_LENGTH};
use crate::features::filters::lfilter;
use crate::features::kernel::make_edge_kernel;
use crate::features::onset::{Boundaries, OnsetCandidate, OnsetDetector};
use crate::features::peak_picking::{peak_pick, PeakPickParams};
use crate::io::audio_signal::AudioSignal;

/// Envelope down-sampling factor (samples per novelty frame)
pub const ENVELOPE_HOP: usize = 100;

/// Edge kernel length in frames
pub const ENVELOPE_KERNEL_LENGTH: usize = 100;

/// Peak-picking defaults for the envelope novelty curve
pub const ENVELOPE_PEAK_PARAMS: PeakPickParams = PeakPickParams {
    pre_max: 500,
    post_max: 500,
    pre_avg: 10,
    post_avg: 10,
    delta: 0.025,
    wait: 100,
};

/// Onset detector over the down-sampled log envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeDetector {
    filter_length: usize,
}

impl EnvelopeDetector {
    /// Detector smoothing the envelope over `filter_length` samples
    pub fn new(filter_length: usize) -> Self {
        Self { filter_length }
    }
}

impl Default for EnvelopeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_FILTER_LENGTH)
    }
}

impl OnsetDetector for EnvelopeDetector {
    fn name(&self) -> &'static str {
        "envelope"
    }

    fn detect(
        &self,
        signal: &AudioSignal,
        params: &DetectorParams,
    ) -> Result<Boundaries, SegmentationError> {
        params.validate()?;
        let peak_params = params.resolve(ENVELOPE_PEAK_PARAMS);
        peak_params.validate()?;

        if signal.is_empty() {
            return Ok(Boundaries::default());
        }

        let kernel = make_edge_kernel(ENVELOPE_KERNEL_LENGTH, 3.5, 1.0)?.normalized();
        let envelope = log_envelope(signal.samples(), signal.sample_rate(), self.filter_length)?;

        let frames: Vec<f32> = envelope.iter().step_by(ENVELOPE_HOP).copied().collect();
        let mean = (frames.iter().map(|&v| v as f64).sum::<f64>() / frames.len() as f64) as f32;
        let centred: Vec<f32> = frames.iter().map(|&v| v - mean).collect();

        let novelty: Vec<f32> = lfilter(kernel.coefficients(), &centred)
            .into_iter()
            .map(|v| v.max(0.0))
            .collect();

        let peaks = peak_pick(&novelty, &peak_params)?;
        let aligned = snap_to_rise(&frames, &peaks, kernel.len());

        let onsets: Vec<OnsetCandidate> = peaks
            .iter()
            .zip(aligned.iter())
            .map(|(&peak, &frame)| OnsetCandidate {
                time: signal.sample_to_time(frame * ENVELOPE_HOP),
                frame,
                strength: novelty[peak],
            })
            .collect();

        log::debug!(
            "Envelope detector: {} frames, {} onsets",
            frames.len(),
            onsets.len()
        );

        Ok(Boundaries {
            onsets,
            offsets: Vec::new(),
        })
    }
}

/// Move each peak to the frame with the largest rise `env[m] - env[m - 1]`
/// among `[peak - span + 1, peak]`
///
/// The search never reaches back to or before the previous aligned frame, so the
/// output stays strictly increasing. Ties keep the earliest frame.
fn snap_to_rise(envelope: &[f32], peaks: &[usize], span: usize) -> Vec<usize> {
    let mut aligned = Vec::with_capacity(peaks.len());
    let mut floor = 0usize;

    for &peak in peaks {
        let lower = (peak + 1).saturating_sub(span.max(1)).max(floor).max(1);
        let mut best = peak;
        let mut best_rise = f32::NEG_INFINITY;
        for m in lower..=peak {
            let rise = envelope[m] - envelope[m - 1];
            if rise > best_rise {
                best_rise = rise;
                best = m;
            }
        }
        aligned.push(best);
        floor = best + 1;
    }

    aligned
}
