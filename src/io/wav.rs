//! WAV output using hound

use std::path::Path;

use crate::error::SegmentationError;

/// Write mono samples as 16-bit PCM WAV
///
/// Samples outside [-1.0, 1.0] are clipped.
///
/// # Errors
///
/// Returns `SegmentationError::Io` if the file cannot be created or written.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), SegmentationError> {
    if sample_rate == 0 {
        return Err(SegmentationError::InvalidInput(
            "Invalid sample rate".to_string(),
        ));
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(value)?;
    }
    writer.finalize()?;

    log::debug!(
        "Wrote {} samples at {} Hz to {}",
        samples.len(),
        sample_rate,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_wav_roundtrip_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<f32> = (0..2205).map(|i| (i as f32 * 0.05).sin() * 2.0).collect();
        write_wav(&path, &samples, 22050).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.duration(), 2205);
        let max = reader
            .into_samples::<i16>()
            .map(|s| s.unwrap())
            .max()
            .unwrap();
        assert_eq!(max, i16::MAX);
    }
}
