//! Performance benchmarks for onset detection and segmentation

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stratum_notes::config::DetectorParams;
use stratum_notes::features::envelope::log_envelope;
use stratum_notes::features::onset::{EnvelopeDetector, LogCqtDetector, OnsetDetector};
use stratum_notes::{segment_audio, AudioSignal, SegmentConfig};

/// 30 seconds at 22.05kHz: a 440 Hz note every half second
fn note_train() -> Vec<f32> {
    let sr = 22050usize;
    (0..sr * 30)
        .map(|i| {
            let in_note = i % (sr / 2);
            let decay = (-(in_note as f32) / (sr as f32 * 0.1)).exp();
            (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / sr as f32).sin() * 0.5 * decay
        })
        .collect()
}

fn bench_log_envelope(c: &mut Criterion) {
    let samples = note_train();

    c.bench_function("log_envelope_30s", |b| {
        b.iter(|| {
            let _ = log_envelope(black_box(&samples), black_box(22050), black_box(100));
        });
    });
}

fn bench_detectors(c: &mut Criterion) {
    let signal = AudioSignal::new(note_train(), 22050).unwrap();
    let params = DetectorParams::default();

    let envelope = EnvelopeDetector::default();
    c.bench_function("envelope_detector_30s", |b| {
        b.iter(|| {
            let _ = envelope.detect(black_box(&signal), black_box(&params));
        });
    });

    let logcqt = LogCqtDetector::seeded(7);
    c.bench_function("logcqt_detector_30s", |b| {
        b.iter(|| {
            let _ = logcqt.detect(black_box(&signal), black_box(&params));
        });
    });
}

fn bench_segment_audio(c: &mut Criterion) {
    let samples = note_train();
    let config = SegmentConfig::default();

    c.bench_function("segment_audio_30s", |b| {
        b.iter(|| {
            let _ = segment_audio(black_box(&samples), black_box(22050), black_box(&config));
        });
    });
}

criterion_group!(benches, bench_log_envelope, bench_detectors, bench_segment_audio);
criterion_main!(benches);
