//! Pitch tracking collaborators for the voicing-based detector
//!
//! A tracker turns a signal into parallel time/frequency/amplitude sequences.
//! [`ExternalPitchTracker`] shells out to a command-line tracker:
//!
//! ```text
//! <binary> <input.wav> <output.csv> <params.csv>
//! ```
//!
//! The input is written as 44.1 kHz mono 16-bit WAV. The output CSV has a header
//! row followed by `time,frequency,amplitude` rows, with time in samples.
//! Amplitudes above 0.999 mark frames with no pitch; both frequency and
//! amplitude are zeroed there.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::SegmentationError;
use crate::io::audio_signal::AudioSignal;
use crate::io::wav::write_wav;
use crate::preprocessing::resample::resample;

/// Sample rate the external tracker expects
pub const TRACKER_SAMPLE_RATE: u32 = 44100;

/// Amplitudes above this are treated as "no pitch"
const NULL_AMPLITUDE: f32 = 0.999;

/// Frame-wise pitch estimates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitchTrack {
    /// Frame times in seconds
    pub times: Vec<f64>,
    /// Frequencies in Hz (0 where unpitched)
    pub frequencies: Vec<f32>,
    /// Amplitudes (0 where unpitched)
    pub amplitudes: Vec<f32>,
}

impl PitchTrack {
    /// Build a track from parallel sequences
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::PitchTracker` if the lengths differ.
    pub fn new(
        times: Vec<f64>,
        frequencies: Vec<f32>,
        amplitudes: Vec<f32>,
    ) -> Result<Self, SegmentationError> {
        if times.len() != frequencies.len() || times.len() != amplitudes.len() {
            return Err(SegmentationError::PitchTracker(format!(
                "Mismatched track lengths: {} times, {} frequencies, {} amplitudes",
                times.len(),
                frequencies.len(),
                amplitudes.len()
            )));
        }
        Ok(Self {
            times,
            frequencies,
            amplitudes,
        })
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True when the track has no frames
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Source of pitch tracks
pub trait PitchTracker: Send + Sync {
    /// Track the pitch of `signal`
    fn track(&self, signal: &AudioSignal) -> Result<PitchTrack, SegmentationError>;
}

/// Pitch tracker backed by an external executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalPitchTracker {
    binary: PathBuf,
    params_file: PathBuf,
}

impl ExternalPitchTracker {
    /// Tracker using `binary` with its parameter file `params_file`
    pub fn new(binary: impl Into<PathBuf>, params_file: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            params_file: params_file.into(),
        }
    }

    /// Tracker installed under `~/hll` (`hll_mono` and `HLL_MONO_PARAMS.csv`)
    pub fn from_home() -> Result<Self, SegmentationError> {
        let home = std::env::var_os("HOME").ok_or_else(|| {
            SegmentationError::PitchTracker("HOME is not set; cannot locate the tracker".to_string())
        })?;
        let root = Path::new(&home).join("hll");
        Ok(Self::new(root.join("hll_mono"), root.join("HLL_MONO_PARAMS.csv")))
    }

    /// Path to the executable
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Path to the parameter file
    pub fn params_file(&self) -> &Path {
        &self.params_file
    }

    /// Check that both the executable and the parameter file exist
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError::PitchTracker` naming the missing paths.
    pub fn check_available(&self) -> Result<(), SegmentationError> {
        let missing: Vec<String> = [&self.binary, &self.params_file]
            .iter()
            .filter(|p| !p.exists())
            .map(|p| p.display().to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SegmentationError::PitchTracker(format!(
                "Requires the following files: {}",
                missing.join(", ")
            )))
        }
    }
}

impl PitchTracker for ExternalPitchTracker {
    fn track(&self, signal: &AudioSignal) -> Result<PitchTrack, SegmentationError> {
        self.check_available()?;

        let samples = resample(signal.samples(), signal.sample_rate(), TRACKER_SAMPLE_RATE)?;

        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("input.wav");
        let output = workdir.path().join("output.csv");
        write_wav(&input, &samples, TRACKER_SAMPLE_RATE)?;

        log::debug!(
            "Running pitch tracker {} on {} samples",
            self.binary.display(),
            samples.len()
        );

        let result = Command::new(&self.binary)
            .arg(&input)
            .arg(&output)
            .arg(&self.params_file)
            .output()
            .map_err(|e| {
                SegmentationError::PitchTracker(format!(
                    "Failed to run {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !result.status.success() {
            return Err(SegmentationError::PitchTracker(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        let file = std::fs::File::open(&output).map_err(|e| {
            SegmentationError::PitchTracker(format!("Tracker produced no output: {}", e))
        })?;
        parse_track_csv(file, TRACKER_SAMPLE_RATE)
    }
}

/// Parse tracker output (header row, then `time_in_samples,frequency,amplitude`)
pub fn parse_track_csv<R: Read>(reader: R, sample_rate: u32) -> Result<PitchTrack, SegmentationError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut track = PitchTrack::default();
    for (line, row) in csv_reader.records().enumerate() {
        let row = row?;
        let field = |i: usize| -> Result<f64, SegmentationError> {
            row.get(i)
                .and_then(|v| v.parse::<f64>().ok())
                .ok_or_else(|| {
                    SegmentationError::PitchTracker(format!(
                        "Malformed tracker output at row {}",
                        line + 1
                    ))
                })
        };

        let time = field(0)? / sample_rate as f64;
        let mut frequency = field(1)?.abs() as f32;
        let mut amplitude = field(2)?.abs() as f32;
        if amplitude > NULL_AMPLITUDE {
            frequency = 0.0;
            amplitude = 0.0;
        }

        track.times.push(time);
        track.frequencies.push(frequency);
        track.amplitudes.push(amplitude);
    }
    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_track_csv() {
        let csv = "time,freq,amp\n0,0,1.0\n441,440.0,0.5\n882,-220.0,-0.25\n";
        let track = parse_track_csv(csv.as_bytes(), 44100).unwrap();
        assert_eq!(track.times, vec![0.0, 0.01, 0.02]);
        assert_eq!(track.frequencies, vec![0.0, 440.0, 220.0]);
        assert_eq!(track.amplitudes, vec![0.0, 0.5, 0.25]);
    }

    #[test]
    fn test_parse_track_csv_malformed() {
        assert!(parse_track_csv("t,f,a\n1,2\n".as_bytes(), 44100).is_err());
        assert!(parse_track_csv("t,f,a\nx,2,3\n".as_bytes(), 44100).is_err());
    }

    #[test]
    fn test_missing_tracker() {
        let tracker = ExternalPitchTracker::new("/nonexistent/hll_mono", "/nonexistent/params.csv");
        let signal = AudioSignal::new(vec![0.0; 100], 22050).unwrap();
        match tracker.track(&signal) {
            Err(SegmentationError::PitchTracker(msg)) => assert!(msg.contains("hll_mono")),
            other => panic!("expected tracker error, got {:?}", other),
        }
    }

    #[test]
    fn test_track_length_mismatch() {
        assert!(PitchTrack::new(vec![0.0], vec![], vec![0.0]).is_err());
    }
}
