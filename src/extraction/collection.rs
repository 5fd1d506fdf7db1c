//! Splitting a recording into note clips at its onsets

use std::path::{Path, PathBuf};

use crate::error::SegmentationError;
use crate::extraction::clip::{write_clip, NoteClip};
use crate::io::backend::AudioBackend;

/// Extension used for clip file names
pub const DEFAULT_CLIP_EXTENSION: &str = "wav";

/// Consecutive `(start, end)` spans between onsets
///
/// `duration` is appended as the final boundary before sorting, so `N` onsets
/// give `N` spans. Starts are clamped to `>= 0` and ends to `<= duration`.
pub fn clip_spans(onset_times: &[f64], duration: f64) -> Vec<(f64, f64)> {
    if onset_times.is_empty() {
        return Vec::new();
    }

    let mut boundaries: Vec<f64> = onset_times.to_vec();
    boundaries.push(duration);
    boundaries.sort_by(f64::total_cmp);

    boundaries
        .windows(2)
        .map(|pair| (pair[0].max(0.0), pair[1].min(duration)))
        .collect()
}

/// `{dir}/{source basename}_{index}.{extension}`
pub fn clip_path(output_dir: &Path, source: &Path, index: usize, extension: &str) -> PathBuf {
    let base = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string());
    output_dir.join(format!("{}_{}.{}", base, index, extension.trim_start_matches('.')))
}

/// Cut `audio_file` into one clip per onset
///
/// Clips that cannot be produced (an empty span, a failed write) are logged and
/// skipped; the rest are still written. An empty onset list yields no clips.
///
/// # Returns
///
/// Clips actually written, in onset order
///
/// # Errors
///
/// Returns `SegmentationError::Configuration` if `backend` cannot write files with
/// `extension`, checked before anything is read. Otherwise an error is returned
/// only if the source cannot be read or the output directory cannot be created.
pub fn segment_audio_from_onsets(
    backend: &dyn AudioBackend,
    audio_file: &Path,
    onset_times: &[f64],
    output_dir: &Path,
    extension: &str,
) -> Result<Vec<NoteClip>, SegmentationError> {
    if !backend.can_write(extension) {
        return Err(SegmentationError::Configuration(format!(
            "Backend cannot write '{}' clips",
            extension
        )));
    }
    if onset_times.is_empty() {
        log::warn!(
            "No onsets for {}; nothing to extract",
            audio_file.display()
        );
        return Ok(Vec::new());
    }

    let signal = backend.read(audio_file)?;
    std::fs::create_dir_all(output_dir)?;

    let spans = clip_spans(onset_times, signal.duration_seconds());
    let mut clips = Vec::with_capacity(spans.len());

    for (index, &(start, end)) in spans.iter().enumerate() {
        let destination = clip_path(output_dir, audio_file, index, extension);
        match write_clip(backend, &signal, audio_file, &destination, start, end) {
            Ok(clip) => clips.push(clip),
            Err(e) => log::warn!("Skipping clip {}: {}", destination.display(), e),
        }
    }

    log::debug!(
        "Extracted {} of {} clips from {}",
        clips.len(),
        spans.len(),
        audio_file.display()
    );

    Ok(clips)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_spans_append_duration_and_sort() {
        let spans = clip_spans(&[2.0, 0.5, 1.0], 3.0);
        assert_eq!(spans, vec![(0.5, 1.0), (1.0, 2.0), (2.0, 3.0)]);
    }

    #[test]
    fn test_clip_spans_clamp() {
        let spans = clip_spans(&[-0.2, 1.0], 2.0);
        assert_eq!(spans, vec![(0.0, 1.0), (1.0, 2.0)]);

        // An onset past the end sorts after the duration and clamps to it
        let spans = clip_spans(&[1.0, 5.0], 2.0);
        assert_eq!(spans, vec![(1.0, 2.0), (2.0, 2.0)]);
    }

    #[test]
    fn test_clip_spans_empty() {
        assert!(clip_spans(&[], 10.0).is_empty());
    }

    #[test]
    fn test_clip_path() {
        let path = clip_path(Path::new("/out"), Path::new("/data/violin_A4.aiff"), 3, ".wav");
        assert_eq!(path, PathBuf::from("/out/violin_A4_3.wav"));
    }
}
