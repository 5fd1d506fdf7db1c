//! Example: Segment many audio files in parallel
//!
//! Usage:
//!   cargo run --release --example segment_batch -- [--jobs N] [--detector KEY]
//!       [--out DIR] <file1> <file2> ...
//!
//! Each file is keyed by its stem and written to `DIR/{stem}-{detector}.csv`. A
//! summary of every file lands in `DIR/index.csv`.

use std::env;
use std::path::PathBuf;
use std::time::Instant;

use stratum_notes::batch::write_batch_index;
use stratum_notes::{
    segment_many, BatchItem, BatchOptions, DetectorRegistry, NativeBackend, SegmentConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut jobs: Option<usize> = None;
    let mut config = SegmentConfig::default();
    let mut out_dir = PathBuf::from("segments");
    let mut paths: Vec<PathBuf> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--jobs" => {
                let v = args
                    .first()
                    .ok_or("--jobs requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--detector" => {
                config.detector = args.first().ok_or("--detector requires a value")?.clone();
                args.remove(0);
            }
            "--out" => {
                out_dir = PathBuf::from(args.first().ok_or("--out requires a value")?);
                args.remove(0);
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: segment_batch [--jobs N] [--detector KEY] [--out DIR] <file1> <file2> ...\n\
                     \n\
                     --jobs N         Parallel workers (default: all CPU threads)\n\
                     --detector KEY   envelope (default) or logcqt\n\
                     --out DIR        Output directory (default: ./segments)\n"
                );
                return Ok(());
            }
            _ => paths.push(PathBuf::from(a)),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one audio file path. Use --help for usage.");
        std::process::exit(2);
    }

    let items: Vec<BatchItem> = paths
        .iter()
        .map(|p| {
            let key = p
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string());
            BatchItem::new(key, p)
        })
        .collect();

    let t0 = Instant::now();
    let outcomes = segment_many(
        &items,
        &config,
        &DetectorRegistry::with_defaults(),
        &NativeBackend::for_analysis(),
        &out_dir,
        &BatchOptions { jobs },
    )?;
    write_batch_index(&out_dir.join("index.csv"), &outcomes)?;

    for (idx, o) in outcomes.iter().enumerate() {
        match &o.result {
            Ok(output) => println!(
                "[{}/{}] {} -> {}",
                idx + 1,
                outcomes.len(),
                o.audio_file.display(),
                output.display()
            ),
            Err(e) => println!(
                "[{}/{}] {}: ERROR: {}",
                idx + 1,
                outcomes.len(),
                o.audio_file.display(),
                e
            ),
        }
    }

    let ok = outcomes.iter().filter(|o| o.result.is_ok()).count();
    eprintln!(
        "Done: ok={}/{} wall={:.0}ms index={}",
        ok,
        outcomes.len(),
        t0.elapsed().as_secs_f64() * 1000.0,
        out_dir.join("index.csv").display()
    );

    Ok(())
}
