//! Peak picking over 1-D novelty curves
//!
//! A sample `x[n]` is reported as a peak when:
//! 1. `x[n] == max(x[n - pre_max .. n + post_max])` (window truncated at the edges)
//! 2. `x[n] >= mean(x[n - pre_avg .. n + post_avg]) + delta`
//! 3. `x[n] != 0`
//! 4. `n > last_peak + wait` (greedy, ascending index)
//!
//! The greedy pass keeps the earliest of several qualifying samples inside one
//! `wait` span, which settles ties by index.
//!
//! # Reference
//!
//! Böck, S., Krebs, F., & Schedl, M. (2012). Evaluating the Online Capabilities of
//! Onset Detection Methods. *Proceedings of the International Society for Music
//! Information Retrieval Conference*.
//!
//! # Example
//!
//! ```
//! use stratum_notes::features::peak_picking::{peak_pick, PeakPickParams};
//!
//! let signal = vec![0.0, 0.5, 1.0, 0.7, 0.3, 0.9, 0.2];
//! let params = PeakPickParams { pre_max: 1, post_max: 2, pre_avg: 1, post_avg: 2, delta: 0.1, wait: 1 };
//! let peaks = peak_pick(&signal, &params)?;
//! assert_eq!(peaks, vec![2, 5]);
//! # Ok::<(), stratum_notes::SegmentationError>(())
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::SegmentationError;

/// Peak picking window and threshold parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakPickParams {
    /// Samples before `n` in the local-maximum window
    pub pre_max: usize,
    /// Samples from `n` (inclusive) in the local-maximum window (must be >= 1)
    pub post_max: usize,
    /// Samples before `n` in the local-mean window
    pub pre_avg: usize,
    /// Samples from `n` (inclusive) in the local-mean window (must be >= 1)
    pub post_avg: usize,
    /// Minimum height above the local mean (must be >= 0)
    pub delta: f32,
    /// Minimum number of samples between reported peaks
    pub wait: usize,
}

impl PeakPickParams {
    /// Check window sizes and threshold
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::Configuration` when a window would be empty or
    /// `delta` is negative or not finite.
    pub fn validate(&self) -> Result<(), SegmentationError> {
        if self.post_max == 0 {
            return Err(SegmentationError::Configuration(
                "post_max must be >= 1".to_string(),
            ));
        }
        if self.post_avg == 0 {
            return Err(SegmentationError::Configuration(
                "post_avg must be >= 1".to_string(),
            ));
        }
        if !(self.delta.is_finite() && self.delta >= 0.0) {
            return Err(SegmentationError::Configuration(format!(
                "delta must be >= 0, got {}",
                self.delta
            )));
        }
        Ok(())
    }
}

/// Find peak indices in `signal`
///
/// # Returns
///
/// Peak indices in ascending order. An empty or peakless signal yields an empty vector.
///
/// # Errors
///
/// Returns `SegmentationError::Configuration` if `params` are invalid.
pub fn peak_pick(signal: &[f32], params: &PeakPickParams) -> Result<Vec<usize>, SegmentationError> {
    params.validate()?;

    if signal.is_empty() {
        return Ok(Vec::new());
    }

    let mov_max = sliding_max(signal, params.pre_max, params.post_max);

    let mut prefix = Vec::with_capacity(signal.len() + 1);
    prefix.push(0.0f64);
    for &x in signal {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + x as f64);
    }

    let len = signal.len();
    let mut peaks = Vec::new();
    let mut last_peak: Option<usize> = None;

    for n in 0..len {
        let x = signal[n];
        if x == 0.0 || x != mov_max[n] {
            continue;
        }

        let start = n.saturating_sub(params.pre_avg);
        let end = (n + params.post_avg).min(len);
        let mean = ((prefix[end] - prefix[start]) / (end - start) as f64) as f32;
        if x < mean + params.delta {
            continue;
        }

        if let Some(last) = last_peak {
            if n <= last + params.wait {
                continue;
            }
        }

        peaks.push(n);
        last_peak = Some(n);
    }

    log::debug!(
        "Peak picking: {} samples, delta={:.3}, wait={} -> {} peaks",
        len,
        params.delta,
        params.wait,
        peaks.len()
    );

    Ok(peaks)
}

/// Peak picking on a min/max normalised copy of `signal`
///
/// The curve is shifted so its minimum is zero and scaled so its maximum is one
/// before [`peak_pick`] runs, so `delta` is relative to the curve's range. A flat
/// curve has no peaks.
pub fn onset_detect(signal: &[f32], params: &PeakPickParams) -> Result<Vec<usize>, SegmentationError> {
    params.validate()?;

    if signal.is_empty() {
        return Ok(Vec::new());
    }

    let min = signal.iter().copied().fold(f32::INFINITY, f32::min);
    let shifted: Vec<f32> = signal.iter().map(|&x| x - min).collect();
    let max = shifted.iter().copied().fold(0.0f32, f32::max);

    if !(max.is_finite() && max > f32::EPSILON) {
        log::debug!("Novelty curve is flat, no onsets");
        return Ok(Vec::new());
    }

    let normalized: Vec<f32> = shifted.iter().map(|&x| x / max).collect();
    peak_pick(&normalized, params)
}

/// Maximum over `[n - pre, n + post)` for every `n`, truncated at the edges
fn sliding_max(signal: &[f32], pre: usize, post: usize) -> Vec<f32> {
    let len = signal.len();
    let mut output = Vec::with_capacity(len);
    let mut window: VecDeque<usize> = VecDeque::new();
    let mut next = 0usize;

    for n in 0..len {
        let end = (n + post).min(len);
        while next < end {
            while let Some(&back) = window.back() {
                if signal[back] <= signal[next] {
                    window.pop_back();
                } else {
                    break;
                }
            }
            window.push_back(next);
            next += 1;
        }

        let start = n.saturating_sub(pre);
        while let Some(&front) = window.front() {
            if front < start {
                window.pop_front();
            } else {
                break;
            }
        }

        output.push(window.front().map(|&i| signal[i]).unwrap_or(f32::NEG_INFINITY));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pre_max: usize, post_max: usize, delta: f32, wait: usize) -> PeakPickParams {
        PeakPickParams {
            pre_max,
            post_max,
            pre_avg: pre_max,
            post_avg: post_max,
            delta,
            wait,
        }
    }

    #[test]
    fn test_peak_pick_basic() {
        let signal = vec![0.0, 0.5, 1.0, 0.7, 0.3, 0.9, 0.2];
        let peaks = peak_pick(&signal, &params(1, 2, 0.1, 1)).unwrap();
        assert_eq!(peaks, vec![2, 5]);
    }

    #[test]
    fn test_peak_pick_empty() {
        assert!(peak_pick(&[], &params(1, 1, 0.0, 0)).unwrap().is_empty());
        assert!(onset_detect(&[], &params(1, 1, 0.0, 0)).unwrap().is_empty());
    }

    #[test]
    fn test_peak_pick_zero_signal() {
        let peaks = peak_pick(&[0.0; 50], &params(3, 3, 0.0, 0)).unwrap();
        assert!(peaks.is_empty());
    }

    #[test]
    fn test_peak_pick_wait_keeps_earliest() {
        // Two equal peaks closer than `wait`: only the first survives
        let mut signal = vec![0.0f32; 40];
        signal[10] = 1.0;
        signal[15] = 1.0;
        signal[30] = 1.0;
        let peaks = peak_pick(&signal, &params(2, 3, 0.1, 8)).unwrap();
        assert_eq!(peaks, vec![10, 30]);
    }

    #[test]
    fn test_peak_pick_local_max_window_prefers_highest() {
        let mut signal = vec![0.0f32; 40];
        signal[10] = 0.6;
        signal[13] = 1.0;
        let peaks = peak_pick(&signal, &params(5, 6, 0.1, 0)).unwrap();
        assert_eq!(peaks, vec![13]);
    }

    #[test]
    fn test_peak_pick_delta() {
        let signal = vec![0.0, 0.1, 0.2, 0.1, 0.0, 0.0, 0.9, 0.0, 0.0];
        let peaks = peak_pick(&signal, &params(2, 3, 0.3, 0)).unwrap();
        assert_eq!(peaks, vec![6]);
    }

    #[test]
    fn test_peak_pick_ascending() {
        let signal: Vec<f32> = (0..500).map(|i| ((i as f32) * 0.37).sin().max(0.0)).collect();
        let peaks = peak_pick(&signal, &params(3, 3, 0.0, 2)).unwrap();
        assert!(peaks.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_peak_pick_invalid_params() {
        let signal = vec![0.0, 1.0, 0.0];
        assert!(peak_pick(&signal, &params(1, 0, 0.1, 0)).is_err());
        let mut p = params(1, 1, 0.1, 0);
        p.post_avg = 0;
        assert!(peak_pick(&signal, &p).is_err());
        assert!(peak_pick(&signal, &params(1, 1, -0.5, 0)).is_err());
    }

    #[test]
    fn test_onset_detect_normalises() {
        // Same shape at two scales gives the same peaks
        let base = vec![0.0, 0.1, 0.2, 1.0, 0.2, 0.1, 0.0, 0.0, 0.5, 0.0];
        let scaled: Vec<f32> = base.iter().map(|v| v * 1000.0 + 3.0).collect();
        let p = params(1, 2, 0.05, 0);
        assert_eq!(onset_detect(&base, &p).unwrap(), onset_detect(&scaled, &p).unwrap());
    }

    #[test]
    fn test_onset_detect_flat() {
        let peaks = onset_detect(&[2.0; 20], &params(1, 1, 0.0, 0)).unwrap();
        assert!(peaks.is_empty());
    }

    #[test]
    fn test_sliding_max() {
        let signal = vec![1.0, 3.0, 2.0, 5.0, 4.0];
        assert_eq!(sliding_max(&signal, 1, 2), vec![3.0, 3.0, 5.0, 5.0, 5.0]);
        assert_eq!(sliding_max(&signal, 0, 1), signal);
    }
}
