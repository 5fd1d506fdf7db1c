//! Constant-Q transform and log-compressed CQT magnitude
//!
//! The transform uses the sparse spectral-kernel method: every bin's Hann-windowed
//! complex exponential is transformed once, only its significant spectral
//! coefficients are kept, and each frame then costs one FFT plus a sparse dot
//! product per bin.
//!
//! # Reference
//!
//! Brown, J. C., & Puckette, M. S. (1992). An efficient algorithm for the calculation
//! of a constant Q transform. *Journal of the Acoustical Society of America*, 92(5), 2698-2701.
//!
//! # Example
//!
//! ```no_run
//! use stratum_notes::features::cqt::log_cqt;
//! use stratum_notes::preprocessing::dither::Dither;
//!
//! let samples = vec![0.0f32; 22050 * 5];
//! let lcqt = log_cqt(&samples, 22050, &mut Dither::seeded(0))?;
//! assert_eq!(lcqt.len(), 192);
//! # Ok::<(), stratum_notes::SegmentationError>(())
//! ```

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::SegmentationError;
use crate::features::filters::hann;
use crate::preprocessing::dither::Dither;

/// Lowest bin centre (A0)
pub const CQT_FMIN: f32 = 27.5;

/// Bins per octave
pub const CQT_BINS_PER_OCTAVE: usize = 24;

/// Total number of bins (8 octaves)
pub const CQT_N_BINS: usize = 24 * 8;

/// Hop between frames in samples
pub const CQT_HOP_LENGTH: usize = 1024;

/// Gain applied before log compression
pub const LOG_CQT_GAIN: f32 = 5000.0;

/// Spectral coefficients below this fraction of a kernel's peak are dropped
const SPARSITY_THRESHOLD: f32 = 0.005;

/// Constant-Q analysis parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CqtParams {
    /// Centre frequency of the lowest bin in Hz
    pub fmin: f32,
    /// Bins per octave
    pub bins_per_octave: usize,
    /// Number of bins
    pub n_bins: usize,
    /// Hop length in samples
    pub hop_length: usize,
}

impl Default for CqtParams {
    fn default() -> Self {
        Self {
            fmin: CQT_FMIN,
            bins_per_octave: CQT_BINS_PER_OCTAVE,
            n_bins: CQT_N_BINS,
            hop_length: CQT_HOP_LENGTH,
        }
    }
}

/// One bin's kernel in the frequency domain: (FFT index, weight) pairs
#[derive(Debug, Clone)]
struct SparseKernel {
    entries: Vec<(usize, Complex<f32>)>,
}

/// Precomputed constant-Q filterbank for one sample rate
pub struct ConstantQ {
    params: CqtParams,
    fft_len: usize,
    kernels: Vec<SparseKernel>,
    fft: Arc<dyn Fft<f32>>,
}

impl ConstantQ {
    /// Build the filterbank for `sample_rate`
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::Configuration` for zero bins, hop or
    /// bins-per-octave, and `SegmentationError::InvalidInput` if the top bin lies
    /// above Nyquist.
    pub fn new(sample_rate: u32, params: CqtParams) -> Result<Self, SegmentationError> {
        if params.n_bins == 0 || params.bins_per_octave == 0 || params.hop_length == 0 {
            return Err(SegmentationError::Configuration(
                "CQT bins, bins per octave and hop length must be > 0".to_string(),
            ));
        }
        if !(params.fmin.is_finite() && params.fmin > 0.0) {
            return Err(SegmentationError::Configuration(format!(
                "CQT fmin must be positive, got {}",
                params.fmin
            )));
        }
        if sample_rate == 0 {
            return Err(SegmentationError::InvalidInput(
                "Invalid sample rate".to_string(),
            ));
        }

        let sr = sample_rate as f64;
        let bpo = params.bins_per_octave as f64;
        let q = 1.0 / (2f64.powf(1.0 / bpo) - 1.0);
        let freqs: Vec<f64> = (0..params.n_bins)
            .map(|k| params.fmin as f64 * 2f64.powf(k as f64 / bpo))
            .collect();

        let f_top = freqs[freqs.len() - 1];
        if f_top >= sr / 2.0 {
            return Err(SegmentationError::InvalidInput(format!(
                "Top CQT bin {:.1} Hz exceeds Nyquist ({:.1} Hz) at {} Hz",
                f_top,
                sr / 2.0,
                sample_rate
            )));
        }

        let lengths: Vec<usize> = freqs.iter().map(|f| (q * sr / f).ceil() as usize).collect();
        let fft_len = lengths[0].max(params.hop_length).next_power_of_two();

        log::debug!(
            "Building CQT filterbank: {} bins, Q={:.2}, fft_len={}, sr={}",
            params.n_bins,
            q,
            fft_len,
            sample_rate
        );

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_len);

        let mut kernels = Vec::with_capacity(params.n_bins);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); fft_len];

        for (&freq, &len) in freqs.iter().zip(lengths.iter()) {
            let len = len.min(fft_len);
            let window = hann(len);
            let l1: f64 = window.iter().map(|&w| w as f64).sum::<f64>().max(f64::MIN_POSITIVE);

            buffer.iter_mut().for_each(|c| *c = Complex::new(0.0, 0.0));
            let offset = fft_len / 2 - len / 2;
            let half = (len / 2) as f64;
            for (n, &w) in window.iter().enumerate() {
                let phase = 2.0 * std::f64::consts::PI * freq * (n as f64 - half) / sr;
                let scale = w as f64 / l1;
                buffer[offset + n] = Complex::new((scale * phase.cos()) as f32, (scale * phase.sin()) as f32);
            }

            fft.process(&mut buffer);

            let peak = buffer[..=fft_len / 2]
                .iter()
                .map(|c| c.norm())
                .fold(0.0f32, f32::max);
            let cutoff = peak * SPARSITY_THRESHOLD;
            let norm = fft_len as f32;

            let entries = buffer[..=fft_len / 2]
                .iter()
                .enumerate()
                .filter(|(_, c)| c.norm() >= cutoff)
                .map(|(j, c)| (j, c.conj() / norm))
                .collect();

            kernels.push(SparseKernel { entries });
        }

        Ok(Self {
            params,
            fft_len,
            kernels,
            fft,
        })
    }

    /// Analysis parameters
    pub fn params(&self) -> &CqtParams {
        &self.params
    }

    /// Number of frames produced for a signal of `len` samples
    pub fn n_frames(&self, len: usize) -> usize {
        1 + len / self.params.hop_length
    }

    /// Complex-magnitude CQT of `samples`
    ///
    /// Frames are centred on `t * hop_length`; samples outside the signal are taken
    /// from its mirror image (reflection without repeating the edge sample), so the
    /// first and last frames see the same level as their neighbours.
    ///
    /// # Returns
    ///
    /// Magnitudes as `n_bins` rows of `n_frames` values
    pub fn magnitude(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let n_frames = self.n_frames(samples.len());
        let half = self.fft_len / 2;
        let hop = self.params.hop_length;

        let mut output = vec![vec![0.0f32; n_frames]; self.kernels.len()];
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.fft_len];

        for t in 0..n_frames {
            // Frame covers samples [t*hop - half, t*hop + half)
            let centre = t * hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let pos = centre as isize + i as isize - half as isize;
                let value = reflect_index(pos, samples.len())
                    .map(|idx| samples[idx])
                    .unwrap_or(0.0);
                *slot = Complex::new(value, 0.0);
            }

            self.fft.process(&mut buffer);

            for (row, kernel) in output.iter_mut().zip(self.kernels.iter()) {
                let mut acc = Complex::new(0.0f32, 0.0);
                for &(j, w) in &kernel.entries {
                    acc += buffer[j] * w;
                }
                row[t] = acc.norm();
            }
        }

        output
    }
}

/// Map a possibly out-of-range position onto `0..len` by mirror reflection
///
/// `-1` maps to `1` and `len` maps to `len - 2`; the pattern repeats with period
/// `2 (len - 1)`. A single-sample signal maps everything to `0`, an empty one to `None`.
fn reflect_index(pos: isize, len: usize) -> Option<usize> {
    match len {
        0 => None,
        1 => Some(0),
        _ => {
            let period = 2 * (len as isize - 1);
            let folded = pos.rem_euclid(period);
            let idx = if folded >= len as isize { period - folded } else { folded };
            Some(idx as usize)
        }
    }
}

/// Compute the log-compressed CQT magnitude of a mono signal
///
/// Dither from `dither` is added first, then the default constant-Q filterbank
/// (27.5 Hz, 24 bins/octave, 192 bins, hop 1024) is applied and each magnitude is
/// mapped through `ln(1 + 5000 |C|)`.
///
/// # Returns
///
/// `n_bins` rows (low to high frequency) of `1 + len / 1024` frames
///
/// # Errors
///
/// Returns `SegmentationError::InvalidInput` for a zero sample rate or a rate too low
/// for the top bin.
pub fn log_cqt(
    samples: &[f32],
    sample_rate: u32,
    dither: &mut Dither,
) -> Result<Vec<Vec<f32>>, SegmentationError> {
    let cqt = ConstantQ::new(sample_rate, CqtParams::default())?;
    let noisy = dither.apply(samples)?;

    log::debug!(
        "Log-CQT: {} samples at {} Hz -> {} frames",
        samples.len(),
        sample_rate,
        cqt.n_frames(samples.len())
    );

    let mut magnitudes = cqt.magnitude(&noisy);
    for row in magnitudes.iter_mut() {
        for v in row.iter_mut() {
            *v = (LOG_CQT_GAIN * *v).ln_1p();
        }
    }
    Ok(magnitudes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amp: f32, seconds: f32, sr: u32) -> Vec<f32> {
        let n = (seconds * sr as f32) as usize;
        (0..n)
            .map(|i| amp * (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    #[test]
    fn test_cqt_shape() {
        let sr = 22050;
        let samples = vec![0.0f32; sr as usize * 2];
        let lcqt = log_cqt(&samples, sr, &mut Dither::seeded(3)).unwrap();
        assert_eq!(lcqt.len(), CQT_N_BINS);
        assert_eq!(lcqt[0].len(), 1 + samples.len() / CQT_HOP_LENGTH);
    }

    #[test]
    fn test_cqt_peak_bin_matches_tone() {
        // 440 Hz is 4 octaves above 27.5 Hz -> bin 96
        let sr = 22050;
        let samples = sine(440.0, 0.5, 2.0, sr);
        let cqt = ConstantQ::new(sr, CqtParams::default()).unwrap();
        let mag = cqt.magnitude(&samples);
        let mid = mag[0].len() / 2;
        let best = (0..mag.len())
            .max_by(|&a, &b| mag[a][mid].partial_cmp(&mag[b][mid]).unwrap())
            .unwrap();
        assert!((best as i32 - 96).abs() <= 1, "peak bin {}", best);
        // L1-normalised kernels report half the sinusoid amplitude
        assert!((mag[96][mid] - 0.25).abs() < 0.05, "magnitude {}", mag[96][mid]);
    }

    #[test]
    fn test_log_cqt_seeded_is_deterministic() {
        let sr = 22050;
        let samples = sine(220.0, 0.3, 1.0, sr);
        let a = log_cqt(&samples, sr, &mut Dither::seeded(11)).unwrap();
        let b = log_cqt(&samples, sr, &mut Dither::seeded(11)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cqt_rejects_low_sample_rate() {
        // Top bin is ~6.8 kHz, so 8 kHz audio cannot hold it
        assert!(ConstantQ::new(8000, CqtParams::default()).is_err());
        assert!(ConstantQ::new(0, CqtParams::default()).is_err());
    }

    #[test]
    fn test_reflect_index() {
        let mapped: Vec<usize> = (-4..8).map(|p| reflect_index(p, 4).unwrap()).collect();
        assert_eq!(mapped, vec![2, 3, 2, 1, 0, 1, 2, 3, 2, 1, 0, 1]);
        assert_eq!(reflect_index(-7, 1), Some(0));
        assert_eq!(reflect_index(0, 0), None);
    }

    #[test]
    fn test_edge_frame_keeps_level() {
        // A cosine mirrors onto itself, so the first frame sees a full window of tone
        let sr = 22050;
        let samples: Vec<f32> = (0..sr as usize * 2)
            .map(|i| 0.5 * (2.0 * std::f64::consts::PI * 440.0 * i as f64 / sr as f64).cos() as f32)
            .collect();
        let cqt = ConstantQ::new(sr, CqtParams::default()).unwrap();
        let mag = cqt.magnitude(&samples);
        let mid = mag[96].len() / 2;
        assert!(
            (mag[96][0] - mag[96][mid]).abs() < 0.02,
            "edge {} vs interior {}",
            mag[96][0],
            mag[96][mid]
        );
    }
}
