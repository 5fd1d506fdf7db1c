//! Gaussian dither / low-level noise source
//!
//! The spectral extractor adds a little noise before the transform so near-silent
//! passages do not collapse to exact zeros. The clip extractor reuses the same
//! source for noise padding. Seed it for reproducible output; the default draws
//! its seed from the operating system.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::error::SegmentationError;

/// Standard deviation of the dither added before the CQT
pub const DEFAULT_DITHER_SCALE: f32 = 1e-3;

/// Seedable Gaussian noise generator
#[derive(Debug, Clone)]
pub struct Dither {
    rng: StdRng,
    scale: f32,
}

impl Dither {
    /// Noise source with a fixed seed (reproducible)
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            scale: DEFAULT_DITHER_SCALE,
        }
    }

    /// Noise source seeded from the operating system
    pub fn from_os() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            scale: DEFAULT_DITHER_SCALE,
        }
    }

    /// Set the noise standard deviation
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Noise standard deviation
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Draw `len` noise samples
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::Configuration` if the scale is negative or not finite.
    pub fn noise(&mut self, len: usize) -> Result<Vec<f32>, SegmentationError> {
        // Normal::new accepts a negative std_dev
        if !(self.scale.is_finite() && self.scale >= 0.0) {
            return Err(SegmentationError::Configuration(format!(
                "Dither scale must be finite and >= 0, got {}",
                self.scale
            )));
        }
        let normal = Normal::new(0.0f32, self.scale).map_err(|e| {
            SegmentationError::Configuration(format!("Invalid dither scale {}: {}", self.scale, e))
        })?;
        Ok((0..len).map(|_| normal.sample(&mut self.rng)).collect())
    }

    /// Return a copy of `samples` with noise added
    pub fn apply(&mut self, samples: &[f32]) -> Result<Vec<f32>, SegmentationError> {
        let noise = self.noise(samples.len())?;
        Ok(samples.iter().zip(noise).map(|(&x, n)| x + n).collect())
    }
}

impl Default for Dither {
    fn default() -> Self {
        Self::from_os()
    }
}
