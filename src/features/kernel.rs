//! Edge (derivative-of-Gaussian) kernels
//!
//! A "canny" kernel is the first derivative of a Gaussian sampled on a linear
//! domain. Convolving a level curve with it gives a response that is positive on
//! rising edges and negative on falling edges.
//!
//! # Example
//!
//! ```
//! use stratum_notes::features::kernel::make_edge_kernel;
//!
//! let kernel = make_edge_kernel(100, 3.5, 1.0)?;
//! assert_eq!(kernel.len(), 100);
//! # Ok::<(), stratum_notes::SegmentationError>(())
//! ```

use crate::error::SegmentationError;

/// Derivative-of-Gaussian filter coefficients
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    coefficients: Vec<f32>,
    beta: f32,
    sigma: f32,
}

impl Kernel {
    /// Kernel coefficients, in tap order
    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }

    /// Number of taps
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// Always false for a constructed kernel
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Half-width of the sampled domain
    pub fn beta(&self) -> f32 {
        self.beta
    }

    /// Gaussian width
    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    /// Copy of the kernel scaled to unit absolute sum
    ///
    /// An all-zero kernel is returned unchanged.
    pub fn normalized(&self) -> Kernel {
        let abs_sum: f32 = self.coefficients.iter().map(|c| c.abs()).sum();
        if abs_sum <= f32::EPSILON {
            return self.clone();
        }
        Kernel {
            coefficients: self.coefficients.iter().map(|c| c / abs_sum).collect(),
            beta: self.beta,
            sigma: self.sigma,
        }
    }

    /// Delay (in taps) of the kernel centre under causal filtering
    pub fn group_delay(&self) -> usize {
        self.coefficients.len().saturating_sub(1) / 2
    }

    /// Index of the largest coefficient
    ///
    /// Causal filtering delays an impulse's strongest response by this many taps.
    pub fn peak_lag(&self) -> usize {
        let mut best = 0;
        for (i, &c) in self.coefficients.iter().enumerate() {
            if c > self.coefficients[best] {
                best = i;
            }
        }
        best
    }
}

/// Build a derivative-of-Gaussian edge kernel
///
/// The domain is `length` evenly spaced points over `[-beta, beta]`, and each tap is
/// `(-n / sigma^2) * exp(-n^2 / (2 sigma^2))`. No normalization is applied; use
/// [`Kernel::normalized`] when unit absolute sum is needed.
///
/// # Arguments
///
/// * `length` - Number of taps (must be > 0)
/// * `beta` - Half-width of the sampled domain (must be > 0)
/// * `sigma` - Gaussian width (must be > 0)
///
/// # Errors
///
/// Returns `SegmentationError::Configuration` for a zero length or a non-positive
/// (or non-finite) `beta`/`sigma`.
pub fn make_edge_kernel(length: usize, beta: f32, sigma: f32) -> Result<Kernel, SegmentationError> {
    if length == 0 {
        return Err(SegmentationError::Configuration(
            "Kernel length must be > 0".to_string(),
        ));
    }
    if !(beta.is_finite() && beta > 0.0) {
        return Err(SegmentationError::Configuration(format!(
            "Kernel beta must be positive, got {}",
            beta
        )));
    }
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(SegmentationError::Configuration(format!(
            "Kernel sigma must be positive, got {}",
            sigma
        )));
    }

    let sigma_sq = sigma * sigma;
    let coefficients = linspace(-beta, beta, length)
        .into_iter()
        .map(|n| (-n / sigma_sq) * (-(n * n) / (2.0 * sigma_sq)).exp())
        .collect();

    Ok(Kernel {
        coefficients,
        beta,
        sigma,
    })
}

/// `length` evenly spaced points from `start` to `stop` inclusive
///
/// Points are mirrored from both ends so the domain stays exactly symmetric.
fn linspace(start: f32, stop: f32, length: usize) -> Vec<f32> {
    if length == 1 {
        return vec![start];
    }
    let step = (stop as f64 - start as f64) / (length - 1) as f64;
    let mut points = vec![0.0f32; length];
    for i in 0..length {
        let j = length - 1 - i;
        if i <= j {
            let value = (start as f64 + step * i as f64) as f32;
            points[i] = value;
            points[j] = if i == j { 0.0 } else { -value };
        }
    }
    points
}
