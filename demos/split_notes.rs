//! Example: Cut a recording into note clips from an onset table
//!
//! Usage:
//!   cargo run --release --example split_notes -- <audio> <onsets.csv> <out_dir> [--ext EXT]
//!
//! The onset table is any CSV with a `time` column, such as the output of
//! `segment_file` or `segment_batch`. The native backend writes WAV, so `--ext`
//! accepts `wav` or `wave`; anything else is rejected before any clip is cut.

use std::env;
use std::path::PathBuf;

use stratum_notes::extraction::collection::DEFAULT_CLIP_EXTENSION;
use stratum_notes::io::records::read_onset_times_csv;
use stratum_notes::{segment_audio_from_onsets, NativeBackend};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut extension = DEFAULT_CLIP_EXTENSION.to_string();
    let mut positional: Vec<PathBuf> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--ext" => {
                extension = args.first().ok_or("--ext requires a value")?.clone();
                args.remove(0);
            }
            "--help" | "-h" => {
                eprintln!("Usage: split_notes <audio> <onsets.csv> <out_dir> [--ext EXT]");
                return Ok(());
            }
            _ => positional.push(PathBuf::from(a)),
        }
    }

    let [audio, onsets, out_dir] = positional.as_slice() else {
        eprintln!("ERROR: Expected <audio> <onsets.csv> <out_dir>. Use --help for usage.");
        std::process::exit(2);
    };

    let onset_times = read_onset_times_csv(onsets)?;
    let clips = segment_audio_from_onsets(
        &NativeBackend::new(),
        audio,
        &onset_times,
        out_dir,
        &extension,
    )?;

    for clip in &clips {
        println!(
            "{}\t{:.3}\t{:.3}",
            clip.path.display(),
            clip.start_time,
            clip.end_time
        );
    }
    eprintln!("Wrote {} of {} clips", clips.len(), onset_times.len());

    Ok(())
}
