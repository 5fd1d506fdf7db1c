//! Example: Segment a single audio file
//!
//! Usage:
//!   cargo run --release --example segment_file -- [--config FILE] [--detector KEY]
//!       [--threshold DB] [--param key=value]... [--json] <file>
//!
//! Prints one `time,env_max,env_mean,env_std,env_delta` row per accepted onset, or
//! the full result as JSON with `--json`. The `pitchtrack` detector expects the
//! external tracker under `~/hll`.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use stratum_notes::features::pitch_tracker::ExternalPitchTracker;
use stratum_notes::io::records::write_segments;
use stratum_notes::{segment_file, DetectorParams, DetectorRegistry, NativeBackend, SegmentConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut json = false;
    let mut config = SegmentConfig::default();
    let mut pairs: Vec<String> = Vec::new();
    let mut path: Option<PathBuf> = None;

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--config" => {
                let file = std::fs::File::open(args.first().ok_or("--config requires a path")?)?;
                config = serde_json::from_reader(file)?;
                args.remove(0);
            }
            "--detector" => {
                config.detector = args.first().ok_or("--detector requires a value")?.clone();
                args.remove(0);
            }
            "--threshold" => {
                config.accept_threshold_db = args
                    .first()
                    .ok_or("--threshold requires a value")?
                    .parse::<f32>()?;
                args.remove(0);
            }
            "--param" => {
                pairs.push(args.first().ok_or("--param requires key=value")?.clone());
                args.remove(0);
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: segment_file [--config FILE] [--detector KEY] [--threshold DB] [--param k=v]... [--json] <file>\n\
                     \n\
                     --config FILE    JSON segmentation config (missing fields take defaults)\n\
                     --detector KEY   envelope (default), logcqt, pitchtrack\n\
                     --threshold DB   Acceptance threshold above the envelope mean (default: 2.5)\n\
                     --param k=v      Detector override: delta, wait, pre_max, post_max, pre_avg, post_avg, threshold\n\
                     --json           Emit the full result as JSON\n"
                );
                return Ok(());
            }
            _ => path = Some(PathBuf::from(a)),
        }
    }

    let Some(path) = path else {
        eprintln!("ERROR: Provide an audio file path. Use --help for usage.");
        std::process::exit(2);
    };

    if !pairs.is_empty() {
        config.params = DetectorParams::from_pairs(&pairs)?;
    }

    let mut registry = DetectorRegistry::with_defaults();
    if config.detector == "pitchtrack" || config.detector == "hll" {
        let tracker = ExternalPitchTracker::from_home()?;
        tracker.check_available()?;
        registry = registry.with_pitch_tracker(Arc::new(tracker));
    }

    let backend = NativeBackend::for_analysis();
    let result = segment_file(&path, &config, &registry, &backend)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        write_segments(std::io::stdout(), &result.segments)?;
    }

    eprintln!(
        "{}: {} of {} onsets accepted in {:.2} ms",
        path.display(),
        result.metadata.accepted_count,
        result.metadata.candidate_count,
        result.metadata.processing_time_ms
    );

    Ok(())
}
