//! Log-power envelope extraction
//!
//! Algorithm:
//! 1. Per-sample log power: `10 log10(10^-4.5 + x^2)` (the floor keeps silence at -45 dB)
//! 2. Zero-phase smoothing with a unit-sum Hann window
//!
//! Zero-phase filtering keeps the envelope aligned with the samples, so an onset
//! located in the envelope maps straight back to a sample index.

use crate::error::SegmentationError;
use crate::features::filters::{filtfilt, hann};

/// Power floor added before taking the log (-45 dB)
pub const POWER_FLOOR: f32 = 3.162_277_7e-5;

/// Default smoothing window length in samples
pub const DEFAULT_FILTER_LENGTH: usize = 100;

/// Compute the smoothed log-power envelope of a mono signal
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate in Hz (only validated; the filter length is in samples)
/// * `filter_length` - Hann smoothing window length in samples (typically 100)
///
/// # Returns
///
/// Envelope in dB, one value per input sample
///
/// # Errors
///
/// Returns `SegmentationError::Configuration` if `filter_length` is zero and
/// `SegmentationError::InvalidInput` if `sample_rate` is zero.
pub fn log_envelope(
    samples: &[f32],
    sample_rate: u32,
    filter_length: usize,
) -> Result<Vec<f32>, SegmentationError> {
    if filter_length == 0 {
        return Err(SegmentationError::Configuration(
            "Envelope filter length must be > 0".to_string(),
        ));
    }
    if sample_rate == 0 {
        return Err(SegmentationError::InvalidInput(
            "Invalid sample rate".to_string(),
        ));
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let log_power: Vec<f32> = samples
        .iter()
        .map(|&x| 10.0 * (POWER_FLOOR + x * x).log10())
        .collect();

    let mut window = hann(filter_length);
    let sum: f32 = window.iter().sum();
    if sum > 0.0 {
        for w in window.iter_mut() {
            *w /= sum;
        }
    } else {
        // hann(2) is all zeros; fall back to a pass-through tap
        window = vec![1.0];
    }

    log::debug!(
        "Log envelope: {} samples, filter_length={}",
        samples.len(),
        filter_length
    );

    filtfilt(&window, &log_power)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_length_matches_input() {
        for len in [1usize, 2, 50, 301, 4410] {
            let samples: Vec<f32> = (0..len).map(|i| (i as f32 * 0.1).sin() * 0.3).collect();
            let env = log_envelope(&samples, 22050, 100).unwrap();
            assert_eq!(env.len(), len);
        }
    }

    #[test]
    fn test_envelope_silence_floor() {
        let env = log_envelope(&vec![0.0f32; 22050], 22050, 100).unwrap();
        assert!(env.iter().all(|&v| (v + 45.0).abs() < 1e-2));
    }

    #[test]
    fn test_envelope_tracks_level() {
        let sr = 22050;
        let samples: Vec<f32> = (0..sr)
            .map(|i| {
                let amp = if i < sr / 2 { 0.01 } else { 0.5 };
                amp * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sr as f32).sin()
            })
            .collect();
        let env = log_envelope(&samples, sr as u32, 100).unwrap();
        let quiet = env[sr / 4];
        let loud = env[3 * sr / 4];
        assert!(loud - quiet > 20.0, "loud={} quiet={}", loud, quiet);
    }

    #[test]
    fn test_envelope_empty_and_invalid() {
        assert!(log_envelope(&[], 22050, 100).unwrap().is_empty());
        assert!(log_envelope(&[0.1], 22050, 0).is_err());
        assert!(log_envelope(&[0.1], 0, 100).is_err());
    }
}
