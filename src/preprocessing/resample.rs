//! Sample-rate conversion
//!
//! Band-limited sinc interpolation (rubato) in fixed-size input chunks.
//! `SincFixedIn` centres its first interpolation window on the start of the
//! input, so output frames are already aligned with input time; the filter tail
//! is flushed and the result cut to `round(len * to / from)` samples, so times map
//! 1:1 across rates.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::SegmentationError;

/// Input frames fed to the resampler per call
const RESAMPLE_CHUNK: usize = 1024;

fn resample_error(e: impl std::fmt::Display) -> SegmentationError {
    SegmentationError::ProcessingError(format!("Resampling failed: {}", e))
}

/// Resample a mono signal from `from_rate` to `to_rate`
///
/// # Errors
///
/// Returns `SegmentationError::InvalidInput` for a zero rate and
/// `SegmentationError::ProcessingError` if the resampler fails.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, SegmentationError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(SegmentationError::InvalidInput(
            "Invalid sample rate".to_string(),
        ));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLE_CHUNK, 1).map_err(resample_error)?;

    let expected = (samples.len() as f64 * ratio).round() as usize;
    let mut output: Vec<f32> = Vec::with_capacity(expected + RESAMPLE_CHUNK);

    log::debug!(
        "Resampling {} samples: {} Hz -> {} Hz",
        samples.len(),
        from_rate,
        to_rate
    );

    let mut pos = 0;
    while samples.len() - pos >= resampler.input_frames_next() {
        let n = resampler.input_frames_next();
        let frame: [&[f32]; 1] = [&samples[pos..pos + n]];
        let chunk = resampler
            .process(&frame[..], None)
            .map_err(resample_error)?;
        output.extend_from_slice(&chunk[0]);
        pos += n;
    }

    if pos < samples.len() {
        let tail: [&[f32]; 1] = [&samples[pos..]];
        let chunk = resampler
            .process_partial(Some(&tail[..]), None)
            .map_err(resample_error)?;
        output.extend_from_slice(&chunk[0]);
    }

    // Flush the filter tail
    while output.len() < expected {
        let chunk = resampler
            .process_partial::<Vec<f32>>(None, None)
            .map_err(resample_error)?;
        if chunk[0].is_empty() {
            break;
        }
        output.extend_from_slice(&chunk[0]);
    }

    output.truncate(expected);
    Ok(output)
}
