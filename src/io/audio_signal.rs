//! Mono audio signal with its sample rate

use crate::error::SegmentationError;

/// Mono PCM samples in [-1.0, 1.0] plus the rate they were sampled at
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSignal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSignal {
    /// Wrap `samples` recorded at `sample_rate`
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::InvalidInput` for a zero sample rate.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, SegmentationError> {
        if sample_rate == 0 {
            return Err(SegmentationError::InvalidInput(
                "Invalid sample rate".to_string(),
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Sample values
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the signal holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Sample index at `seconds` (floor, negative times map to 0)
    pub fn time_to_sample(&self, seconds: f64) -> usize {
        if seconds <= 0.0 {
            0
        } else {
            (seconds * self.sample_rate as f64).floor() as usize
        }
    }

    /// Time in seconds of sample `index`
    pub fn sample_to_time(&self, index: usize) -> f64 {
        index as f64 / self.sample_rate as f64
    }

    /// Copy of the samples in `[start, end)` seconds, clamped to the signal
    pub fn slice_seconds(&self, start: f64, end: f64) -> AudioSignal {
        let len = self.samples.len();
        let from = ((start.max(0.0) * self.sample_rate as f64).round() as usize).min(len);
        let to = ((end.max(0.0) * self.sample_rate as f64).round() as usize).clamp(from, len);
        AudioSignal {
            samples: self.samples[from..to].to_vec(),
            sample_rate: self.sample_rate,
        }
    }

    /// Consume the signal, returning its samples
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}
