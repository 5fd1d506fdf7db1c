//! Pitch-track (voicing) onset and offset detection
//!
//! Algorithm:
//! 1. Track frequency and amplitude frame by frame
//! 2. Median filter both (51 frames)
//! 3. Voicing: `frequency * amplitude > threshold` (default 0.5)
//! 4. Causal edge filter (`canny(25, 3.5, 1)`) over the 0/1 voicing sequence
//! 5. Positive part -> onsets, negated negative part -> offsets
//! 6. Normalised peak picking on each (pre/post max 1, pre avg 4, post avg 5,
//!    delta 0.07, wait 100), then group-delay compensation
//!
//! Frame indices are mapped to seconds through the track's own time axis.

use std::sync::Arc;

use crate::config::DetectorParams;
use crate::error::SegmentationError;
use crate::features::filters::{lfilter, medfilt};
use crate::features::kernel::make_edge_kernel;
use crate::features::onset::{compensate_delay, Boundaries, OnsetCandidate, OnsetDetector};
use crate::features::peak_picking::{onset_detect, PeakPickParams};
use crate::features::pitch_tracker::{PitchTrack, PitchTracker};
use crate::io::audio_signal::AudioSignal;

/// Median filter length applied to frequency and amplitude
pub const PITCH_MEDIAN_LENGTH: usize = 51;

/// Edge kernel length in track frames
pub const PITCH_KERNEL_LENGTH: usize = 25;

/// Default voicing threshold on `frequency * amplitude`
pub const DEFAULT_VOICING_THRESHOLD: f32 = 0.5;

/// Peak-picking defaults for the voicing novelty curves
pub const PITCH_PEAK_PARAMS: PeakPickParams = PeakPickParams {
    pre_max: 1,
    post_max: 1,
    pre_avg: 4,
    post_avg: 5,
    delta: 0.07,
    wait: 100,
};

/// Onset/offset detector driven by a pitch tracker
pub struct PitchTrackDetector {
    tracker: Arc<dyn PitchTracker>,
    median_length: usize,
}

impl PitchTrackDetector {
    /// Detector using `tracker` with the default 51-frame median filter
    pub fn new(tracker: Arc<dyn PitchTracker>) -> Self {
        Self {
            tracker,
            median_length: PITCH_MEDIAN_LENGTH,
        }
    }

    /// Use a different median filter length (must be odd)
    pub fn with_median_length(mut self, median_length: usize) -> Self {
        self.median_length = median_length;
        self
    }
}

impl std::fmt::Debug for PitchTrackDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PitchTrackDetector")
            .field("median_length", &self.median_length)
            .finish()
    }
}

impl OnsetDetector for PitchTrackDetector {
    fn name(&self) -> &'static str {
        "pitchtrack"
    }

    fn detect(
        &self,
        signal: &AudioSignal,
        params: &DetectorParams,
    ) -> Result<Boundaries, SegmentationError> {
        params.validate()?;
        let peak_params = params.resolve(PITCH_PEAK_PARAMS);
        peak_params.validate()?;
        let threshold = params.threshold.unwrap_or(DEFAULT_VOICING_THRESHOLD);

        let track = self.tracker.track(signal)?;
        boundaries_from_track(&track, &peak_params, threshold, self.median_length)
    }
}

/// Turn a pitch track into onset and offset boundaries
///
/// # Arguments
///
/// * `track` - Frame-wise frequency/amplitude estimates
/// * `params` - Peak-picking parameters for both novelty curves
/// * `threshold` - Voicing threshold on `frequency * amplitude`
/// * `median_length` - Median filter length (odd)
///
/// # Errors
///
/// Returns `SegmentationError::Configuration` for an even median length or invalid
/// peak-picking parameters.
pub fn boundaries_from_track(
    track: &PitchTrack,
    params: &PeakPickParams,
    threshold: f32,
    median_length: usize,
) -> Result<Boundaries, SegmentationError> {
    if track.is_empty() {
        params.validate()?;
        return Ok(Boundaries::default());
    }

    let frequencies = medfilt(&track.frequencies, median_length)?;
    let amplitudes = medfilt(&track.amplitudes, median_length)?;

    let voicing: Vec<f32> = frequencies
        .iter()
        .zip(amplitudes.iter())
        .map(|(&f, &a)| if f * a > threshold { 1.0 } else { 0.0 })
        .collect();

    let kernel = make_edge_kernel(PITCH_KERNEL_LENGTH, 3.5, 1.0)?;
    let novelty = lfilter(kernel.coefficients(), &voicing);

    let rising: Vec<f32> = novelty.iter().map(|&v| v.max(0.0)).collect();
    let falling: Vec<f32> = novelty.iter().map(|&v| (-v).max(0.0)).collect();

    let delay = kernel.group_delay();
    let to_candidates = |curve: &[f32]| -> Result<Vec<OnsetCandidate>, SegmentationError> {
        let peaks = onset_detect(curve, params)?;
        let aligned = compensate_delay(&peaks, delay);
        Ok(peaks
            .iter()
            .zip(aligned.iter())
            .map(|(&peak, &frame)| OnsetCandidate {
                time: track.times[frame],
                frame,
                strength: curve[peak],
            })
            .collect())
    };

    let onsets = to_candidates(&rising)?;
    let offsets = to_candidates(&falling)?;

    log::debug!(
        "Pitch-track detector: {} frames, {} voiced, {} onsets, {} offsets",
        track.len(),
        voicing.iter().filter(|&&v| v > 0.0).count(),
        onsets.len(),
        offsets.len()
    );

    Ok(Boundaries { onsets, offsets })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 100 frames per second, voiced inside each `(start, end)` span
    fn synthetic_track(seconds: f64, voiced: &[(f64, f64)]) -> PitchTrack {
        let n = (seconds * 100.0) as usize;
        let times: Vec<f64> = (0..n).map(|i| i as f64 / 100.0).collect();
        let on = |t: f64| voiced.iter().any(|&(s, e)| t >= s && t < e);
        let frequencies = times.iter().map(|&t| if on(t) { 440.0 } else { 0.0 }).collect();
        let amplitudes = times.iter().map(|&t| if on(t) { 0.8 } else { 0.0 }).collect();
        PitchTrack::new(times, frequencies, amplitudes).unwrap()
    }

    struct FixedTracker(PitchTrack);

    impl PitchTracker for FixedTracker {
        fn track(&self, _signal: &AudioSignal) -> Result<PitchTrack, SegmentationError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_onsets_and_offsets_from_voicing() {
        let track = synthetic_track(6.0, &[(1.0, 2.5), (3.5, 5.0)]);
        let boundaries =
            boundaries_from_track(&track, &PITCH_PEAK_PARAMS, 0.5, PITCH_MEDIAN_LENGTH).unwrap();

        let onsets = boundaries.onset_times();
        let offsets = boundaries.offset_times();
        assert_eq!(onsets.len(), 2, "onsets: {:?}", onsets);
        assert_eq!(offsets.len(), 2, "offsets: {:?}", offsets);
        assert!((onsets[0] - 1.0).abs() < 0.05);
        assert!((onsets[1] - 3.5).abs() < 0.05);
        assert!((offsets[0] - 2.5).abs() < 0.05);
        assert!((offsets[1] - 5.0).abs() < 0.05);
    }

    #[test]
    fn test_threshold_controls_voicing() {
        // f * a = 352, so a threshold above that means nothing is voiced
        let track = synthetic_track(4.0, &[(1.0, 3.0)]);
        let boundaries =
            boundaries_from_track(&track, &PITCH_PEAK_PARAMS, 1000.0, PITCH_MEDIAN_LENGTH).unwrap();
        assert!(boundaries.onsets.is_empty());
        assert!(boundaries.offsets.is_empty());
    }

    #[test]
    fn test_detector_uses_tracker_and_params() {
        let tracker = Arc::new(FixedTracker(synthetic_track(6.0, &[(1.0, 2.5), (3.5, 5.0)])));
        let detector = PitchTrackDetector::new(tracker);
        let signal = AudioSignal::new(vec![0.0; 100], 22050).unwrap();

        let boundaries = detector.detect(&signal, &DetectorParams::default()).unwrap();
        assert_eq!(boundaries.onsets.len(), 2);

        // Waiting longer than the gap between notes keeps only the first onset
        let params = DetectorParams {
            wait: Some(300),
            ..Default::default()
        };
        let boundaries = detector.detect(&signal, &params).unwrap();
        assert_eq!(boundaries.onsets.len(), 1);
    }

    #[test]
    fn test_empty_track_and_even_median() {
        let empty = PitchTrack::default();
        assert!(boundaries_from_track(&empty, &PITCH_PEAK_PARAMS, 0.5, 51)
            .unwrap()
            .onsets
            .is_empty());

        let track = synthetic_track(2.0, &[(0.5, 1.5)]);
        assert!(boundaries_from_track(&track, &PITCH_PEAK_PARAMS, 0.5, 50).is_err());
    }

    #[test]
    fn test_tracker_failure_propagates() {
        struct Broken;
        impl PitchTracker for Broken {
            fn track(&self, _signal: &AudioSignal) -> Result<PitchTrack, SegmentationError> {
                Err(SegmentationError::PitchTracker("missing binary".to_string()))
            }
        }
        let detector = PitchTrackDetector::new(Arc::new(Broken));
        let signal = AudioSignal::new(vec![0.0; 100], 22050).unwrap();
        assert!(matches!(
            detector.detect(&signal, &DetectorParams::default()),
            Err(SegmentationError::PitchTracker(_))
        ));
    }
}
