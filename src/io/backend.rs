//! Pluggable audio file access
//!
//! Segmentation and clip extraction only need to read a file, write one, and cut
//! a time span out of one. [`NativeBackend`] does all three in-process with
//! Symphonia (decode) and hound (16-bit WAV encode); other backends can wrap
//! external tools behind the same trait.

use std::path::Path;

use crate::config::DEFAULT_ANALYSIS_SAMPLE_RATE;
use crate::error::SegmentationError;
use crate::io::audio_signal::AudioSignal;
use crate::io::decoder::load_audio;
use crate::io::wav::write_wav;

/// Audio file reader/writer
pub trait AudioBackend: Send + Sync {
    /// Decode `path` to a mono signal
    fn read(&self, path: &Path) -> Result<AudioSignal, SegmentationError>;

    /// Encode `signal` to `path`
    fn write(&self, path: &Path, signal: &AudioSignal) -> Result<(), SegmentationError>;

    /// Whether [`write`](Self::write) can produce files with this extension
    fn can_write(&self, _extension: &str) -> bool {
        true
    }

    /// Duration of `path` in seconds
    fn duration(&self, path: &Path) -> Result<f64, SegmentationError> {
        Ok(self.read(path)?.duration_seconds())
    }

    /// Copy `[start, end)` seconds of `src` into `dst`
    ///
    /// The span is clamped to the file; an empty result is an error.
    fn trim(&self, src: &Path, dst: &Path, start: f64, end: f64) -> Result<(), SegmentationError> {
        let signal = self.read(src)?;
        let clip = signal.slice_seconds(start, end);
        if clip.is_empty() {
            return Err(SegmentationError::InvalidInput(format!(
                "Empty span [{:.3}, {:.3}) in {}",
                start,
                end,
                src.display()
            )));
        }
        self.write(dst, &clip)
    }
}

/// Extensions [`NativeBackend`] writes (compared case-insensitively)
pub const NATIVE_WRITE_EXTENSIONS: [&str; 2] = ["wav", "wave"];

/// In-process backend: Symphonia decode, hound 16-bit WAV encode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NativeBackend {
    target_sample_rate: Option<u32>,
}

impl NativeBackend {
    /// Backend that keeps each file's own sample rate
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that resamples everything it reads to `sample_rate`
    pub fn resampling_to(sample_rate: u32) -> Self {
        Self {
            target_sample_rate: Some(sample_rate),
        }
    }

    /// Backend that reads at the analysis rate (22050 Hz)
    pub fn for_analysis() -> Self {
        Self::resampling_to(DEFAULT_ANALYSIS_SAMPLE_RATE)
    }

    /// Rate signals are converted to on read, if any
    pub fn target_sample_rate(&self) -> Option<u32> {
        self.target_sample_rate
    }
}

impl AudioBackend for NativeBackend {
    fn read(&self, path: &Path) -> Result<AudioSignal, SegmentationError> {
        load_audio(path, self.target_sample_rate)
    }

    fn write(&self, path: &Path, signal: &AudioSignal) -> Result<(), SegmentationError> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !self.can_write(extension) {
            return Err(SegmentationError::Configuration(format!(
                "Cannot write {}: only WAV output is supported",
                path.display()
            )));
        }
        write_wav(path, signal.samples(), signal.sample_rate())
    }

    fn can_write(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        NATIVE_WRITE_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(seconds: f32, sr: u32) -> AudioSignal {
        let n = (seconds * sr as f32) as usize;
        let samples = (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sr as f32).sin())
            .collect();
        AudioSignal::new(samples, sr).unwrap()
    }

    #[test]
    fn test_native_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let backend = NativeBackend::new();
        backend.write(&path, &tone(1.0, 22050)).unwrap();

        let signal = backend.read(&path).unwrap();
        assert_eq!(signal.sample_rate(), 22050);
        assert_eq!(signal.len(), 22050);
        assert!((backend.duration(&path).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_trim_clamps_and_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.wav");
        let dst = dir.path().join("dst.wav");
        let backend = NativeBackend::new();
        backend.write(&src, &tone(2.0, 22050)).unwrap();

        backend.trim(&src, &dst, 1.5, 5.0).unwrap();
        assert!((backend.duration(&dst).unwrap() - 0.5).abs() < 1e-3);

        assert!(backend.trim(&src, &dst, 3.0, 4.0).is_err());
    }

    #[test]
    fn test_native_writes_wav_only() {
        let dir = tempfile::tempdir().unwrap();
        let backend = NativeBackend::new();
        assert!(backend.can_write("wav"));
        assert!(backend.can_write(".WAV"));
        assert!(!backend.can_write("flac"));

        let flac = dir.path().join("tone.flac");
        assert!(matches!(
            backend.write(&flac, &tone(0.1, 22050)),
            Err(SegmentationError::Configuration(_))
        ));
        assert!(!flac.exists());
        backend.write(&dir.path().join("tone.WAV"), &tone(0.1, 22050)).unwrap();
    }

    #[test]
    fn test_read_missing_file() {
        let backend = NativeBackend::new();
        assert!(matches!(
            backend.read(Path::new("/nonexistent/file.wav")),
            Err(SegmentationError::Io(_))
        ));
    }
}
