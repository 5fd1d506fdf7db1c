//! Audio decoding using Symphonia

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::SegmentationError;
use crate::io::audio_signal::AudioSignal;
use crate::preprocessing::channel_mixer::{downmix, ChannelMixMode};
use crate::preprocessing::resample::resample;

/// Decode an audio file to interleaved PCM samples
///
/// # Arguments
///
/// * `path` - Path to audio file (any container/codec Symphonia was built with)
///
/// # Returns
///
/// Tuple of (interleaved samples, sample_rate, channels)
///
/// # Errors
///
/// Returns `SegmentationError::Io` if the file cannot be opened and
/// `SegmentationError::DecodingError` if it holds no decodable audio track.
pub fn decode_audio(path: &Path) -> Result<(Vec<f32>, u32, usize), SegmentationError> {
    log::debug!("Decoding audio file: {}", path.display());

    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = symphonia::default::get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| {
            SegmentationError::DecodingError(format!(
                "No supported audio tracks found in {}",
                path.display()
            ))
        })?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count();

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupted packet; keep going
                log::warn!("Skipping undecodable packet in {}: {}", path.display(), e);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if sample_rate == 0 || channels == 0 {
        return Err(SegmentationError::DecodingError(format!(
            "Unknown sample rate or channel layout in {}",
            path.display()
        )));
    }

    log::debug!(
        "Decoded {} frames, {} channels at {} Hz",
        interleaved.len() / channels,
        channels,
        sample_rate
    );

    Ok((interleaved, sample_rate, channels))
}

/// Decode a file to a mono signal, optionally resampled to `target_rate`
pub fn load_audio(path: &Path, target_rate: Option<u32>) -> Result<AudioSignal, SegmentationError> {
    let (interleaved, sample_rate, channels) = decode_audio(path)?;
    let mono = downmix(&interleaved, channels, ChannelMixMode::Mono)?;

    match target_rate {
        Some(rate) if rate != sample_rate => AudioSignal::new(resample(&mono, sample_rate, rate)?, rate),
        _ => AudioSignal::new(mono, sample_rate),
    }
}
