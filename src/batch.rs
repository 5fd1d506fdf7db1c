//! Parallel segmentation of many files
//!
//! Each file runs the same single-threaded pipeline (read, detect, score, write
//! `{key}-{detector}.csv`) on a rayon pool. Failures are returned per item and
//! never stop the rest of the batch. Outcomes come back in input order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::segmenter::segment;
use crate::config::SegmentConfig;
use crate::error::SegmentationError;
use crate::features::onset::{DetectorRegistry, OnsetDetector};
use crate::io::backend::AudioBackend;
use crate::io::records::write_segments_csv;

/// Batch execution options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Worker threads; `None` uses every available CPU
    pub jobs: Option<usize>,
}

impl BatchOptions {
    /// Worker count after resolving the default
    pub fn resolved_jobs(&self) -> usize {
        match self.jobs {
            Some(n) => n.max(1),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// One file to segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Unique key naming the output table
    pub key: String,
    /// Audio file to read
    pub audio_file: PathBuf,
}

impl BatchItem {
    /// Item for `audio_file` under `key`
    pub fn new(key: impl Into<String>, audio_file: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            audio_file: audio_file.into(),
        }
    }
}

/// Result for one batch item
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Item key
    pub key: String,
    /// Input audio file
    pub audio_file: PathBuf,
    /// Path of the written segment table, or why it could not be produced
    pub result: Result<PathBuf, SegmentationError>,
}

/// Segment one file and write its table to `output_dir/{key}-{detector}.csv`
pub fn segment_one(
    item: &BatchItem,
    detector: &dyn OnsetDetector,
    config: &SegmentConfig,
    backend: &dyn AudioBackend,
    output_dir: &Path,
) -> Result<PathBuf, SegmentationError> {
    let signal = backend.read(&item.audio_file)?;
    let result = segment(&signal, detector, config)?;

    let output = output_dir.join(format!("{}-{}.csv", item.key, config.detector));
    write_segments_csv(&output, &result.segments)?;

    log::info!(
        "{}: {} segments -> {}",
        item.key,
        result.segments.len(),
        output.display()
    );
    Ok(output)
}

/// Segment every item on a worker pool
///
/// # Errors
///
/// Fails up front, before any work starts, for duplicate keys, an invalid
/// configuration, an unknown detector, an unusable output directory, or a pool
/// that cannot be built. Per-file failures are reported in the outcomes instead.
pub fn segment_many(
    items: &[BatchItem],
    config: &SegmentConfig,
    registry: &DetectorRegistry,
    backend: &dyn AudioBackend,
    output_dir: &Path,
    options: &BatchOptions,
) -> Result<Vec<BatchOutcome>, SegmentationError> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.key.as_str()) {
            return Err(SegmentationError::Configuration(format!(
                "Duplicate batch key '{}'",
                item.key
            )));
        }
    }

    config.validate()?;
    let detector = registry.get(&config.detector)?;
    std::fs::create_dir_all(output_dir)?;

    let jobs = options.resolved_jobs();
    log::info!(
        "Batch: {} files, detector '{}', jobs={}",
        items.len(),
        config.detector,
        jobs
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| SegmentationError::ProcessingError(format!("Failed to build thread pool: {}", e)))?;

    let outcomes: Vec<BatchOutcome> = pool.install(|| {
        items
            .par_iter()
            .map(|item| {
                let result = segment_one(item, detector.as_ref(), config, backend, output_dir);
                if let Err(e) = &result {
                    log::warn!("{} ({}): {}", item.key, item.audio_file.display(), e);
                }
                BatchOutcome {
                    key: item.key.clone(),
                    audio_file: item.audio_file.clone(),
                    result,
                }
            })
            .collect()
    });

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    log::info!("Batch finished: {} ok, {} failed", outcomes.len() - failed, failed);

    Ok(outcomes)
}

/// Row of the batch index table
#[derive(Debug, Serialize)]
struct IndexRow<'a> {
    key: &'a str,
    audio_file: String,
    output: String,
    error: String,
}

/// Write `key,audio_file,output,error` for every outcome
pub fn write_batch_index(path: &Path, outcomes: &[BatchOutcome]) -> Result<(), SegmentationError> {
    let mut writer = csv::Writer::from_path(path)?;
    for outcome in outcomes {
        let (output, error) = match &outcome.result {
            Ok(p) => (p.display().to_string(), String::new()),
            Err(e) => (String::new(), e.to_string()),
        };
        writer.serialize(IndexRow {
            key: &outcome.key,
            audio_file: outcome.audio_file.display().to_string(),
            output,
            error,
        })?;
    }
    writer.flush()?;
    Ok(())
}
