//! Linear and rank filters shared by the extractors and detectors
//!
//! - `lfilter`: causal FIR filtering (denominator fixed to `[1]`)
//! - `lfilter_steady`: causal FIR filtering from a steady-state start
//! - `filtfilt`: zero-phase forward/backward FIR filtering with odd-extension padding
//! - `medfilt`: zero-padded running median
//! - `hann`: symmetric Hann window

use crate::error::SegmentationError;

/// Symmetric Hann window of `length` taps
///
/// `w[n] = 0.5 - 0.5 cos(2 pi n / (length - 1))`. A single-tap window is `[1.0]`.
pub fn hann(length: usize) -> Vec<f32> {
    match length {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let denom = (length - 1) as f64;
            (0..length)
                .map(|n| (0.5 - 0.5 * (2.0 * std::f64::consts::PI * n as f64 / denom).cos()) as f32)
                .collect()
        }
    }
}

/// Causal FIR filter with zero initial state
///
/// `y[n] = sum_k taps[k] * x[n - k]`, output length equal to input length.
pub fn lfilter(taps: &[f32], signal: &[f32]) -> Vec<f32> {
    fir_with_history(taps, signal, 0.0)
}

/// Causal FIR filter started from steady state
///
/// The history before the first sample is held at `signal[0]`, so a signal that
/// starts at a non-zero level produces no start-up transient.
pub fn lfilter_steady(taps: &[f32], signal: &[f32]) -> Vec<f32> {
    match signal.first() {
        Some(&first) => fir_with_history(taps, signal, first),
        None => Vec::new(),
    }
}

/// Causal FIR filter whose history before the first sample is held at `history`
///
/// Holding the history at the first input value is the steady-state initial
/// condition used by zero-phase filtering.
fn fir_with_history(taps: &[f32], signal: &[f32], history: f32) -> Vec<f32> {
    let mut output = Vec::with_capacity(signal.len());
    for n in 0..signal.len() {
        let mut acc = 0.0f32;
        for (k, &b) in taps.iter().enumerate() {
            let x = if n >= k { signal[n - k] } else { history };
            acc += b * x;
        }
        output.push(acc);
    }
    output
}

/// Zero-phase FIR filtering (forward, then backward)
///
/// The signal is extended at both ends by odd reflection of `3 * taps.len()`
/// samples (capped at `len - 1`). Each pass starts from its steady state, so a
/// constant input with unit-sum taps comes back unchanged. Output length equals
/// input length.
///
/// # Errors
///
/// Returns `SegmentationError::Configuration` if `taps` is empty.
pub fn filtfilt(taps: &[f32], signal: &[f32]) -> Result<Vec<f32>, SegmentationError> {
    if taps.is_empty() {
        return Err(SegmentationError::Configuration(
            "Filter must have at least one tap".to_string(),
        ));
    }
    if signal.is_empty() {
        return Ok(Vec::new());
    }

    let len = signal.len();
    let pad = (3 * taps.len()).min(len - 1);

    let first = signal[0];
    let last = signal[len - 1];
    let mut extended = Vec::with_capacity(len + 2 * pad);
    for i in (1..=pad).rev() {
        extended.push(2.0 * first - signal[i]);
    }
    extended.extend_from_slice(signal);
    for i in 1..=pad {
        extended.push(2.0 * last - signal[len - 1 - i]);
    }

    let forward = fir_with_history(taps, &extended, extended[0]);
    let mut reversed: Vec<f32> = forward.into_iter().rev().collect();
    let backward_start = reversed[0];
    reversed = fir_with_history(taps, &reversed, backward_start);
    reversed.reverse();

    Ok(reversed[pad..pad + len].to_vec())
}

/// Running median with zero padding at both ends
///
/// # Errors
///
/// Returns `SegmentationError::Configuration` if `kernel_size` is zero or even.
pub fn medfilt(signal: &[f32], kernel_size: usize) -> Result<Vec<f32>, SegmentationError> {
    if kernel_size == 0 || kernel_size % 2 == 0 {
        return Err(SegmentationError::Configuration(format!(
            "Median filter size must be odd and > 0, got {}",
            kernel_size
        )));
    }

    let half = kernel_size / 2;
    let mut window = Vec::with_capacity(kernel_size);
    let mut output = Vec::with_capacity(signal.len());

    for i in 0..signal.len() {
        window.clear();
        for offset in 0..kernel_size {
            let pos = i as isize + offset as isize - half as isize;
            if pos < 0 || pos >= signal.len() as isize {
                window.push(0.0);
            } else {
                window.push(signal[pos as usize]);
            }
        }
        window.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        output.push(window[half]);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_shape() {
        let w = hann(5);
        assert_eq!(w.len(), 5);
        assert!(w[0].abs() < 1e-7);
        assert!((w[2] - 1.0).abs() < 1e-7);
        assert!(w[4].abs() < 1e-7);
        assert_eq!(hann(1), vec![1.0]);
    }

    #[test]
    fn test_lfilter_impulse_response() {
        let taps = [0.5, 0.25, -0.25];
        let mut impulse = vec![0.0f32; 6];
        impulse[1] = 1.0;
        let y = lfilter(&taps, &impulse);
        assert_eq!(y, vec![0.0, 0.5, 0.25, -0.25, 0.0, 0.0]);
    }

    #[test]
    fn test_lfilter_steady_has_no_startup_step() {
        let taps = [0.5, 0.0, -0.5];
        let y = lfilter_steady(&taps, &[2.0, 2.0, 2.0, 3.0]);
        assert_eq!(y, vec![0.0, 0.0, 0.0, 0.5]);
        assert_eq!(lfilter(&taps, &[2.0, 2.0, 2.0, 3.0]), vec![1.0, 1.0, 0.0, 0.5]);
        assert!(lfilter_steady(&taps, &[]).is_empty());
    }

    #[test]
    fn test_filtfilt_preserves_constant() {
        let taps: Vec<f32> = {
            let w = hann(100);
            let sum: f32 = w.iter().sum();
            w.iter().map(|v| v / sum).collect()
        };
        let signal = vec![-45.0f32; 2000];
        let y = filtfilt(&taps, &signal).unwrap();
        assert_eq!(y.len(), signal.len());
        assert!(y.iter().all(|&v| (v + 45.0).abs() < 1e-3));
    }

    #[test]
    fn test_filtfilt_zero_phase() {
        // A symmetric bump stays centred after zero-phase smoothing
        let mut signal = vec![0.0f32; 301];
        for (i, v) in signal.iter_mut().enumerate().take(171).skip(130) {
            *v = 1.0 - ((i as f32 - 150.0) / 20.0).abs();
        }
        let taps = vec![0.2f32; 5];
        let y = filtfilt(&taps, &signal).unwrap();
        let argmax = y
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(argmax, 150);
    }

    #[test]
    fn test_filtfilt_short_signal() {
        let taps = vec![0.25f32; 4];
        let y = filtfilt(&taps, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(y.len(), 3);
        assert!(filtfilt(&taps, &[]).unwrap().is_empty());
        assert!(filtfilt(&[], &[1.0]).is_err());
    }

    #[test]
    fn test_medfilt_removes_spikes() {
        let signal = vec![1.0, 1.0, 9.0, 1.0, 1.0, 1.0];
        let y = medfilt(&signal, 3).unwrap();
        assert_eq!(y, vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_medfilt_zero_padding() {
        let signal = vec![5.0, 5.0, 5.0];
        let y = medfilt(&signal, 5).unwrap();
        // Edges see two padded zeros out of five values
        assert_eq!(y, vec![5.0, 5.0, 5.0]);
        let y = medfilt(&[5.0, 5.0], 5).unwrap();
        assert_eq!(y, vec![0.0, 0.0]);
    }

    #[test]
    fn test_medfilt_invalid_size() {
        assert!(medfilt(&[1.0], 0).is_err());
        assert!(medfilt(&[1.0], 4).is_err());
    }
}
