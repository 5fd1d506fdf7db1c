//! Channel mixing utilities (multichannel to mono conversion)

use crate::error::SegmentationError;

/// Channel mixing mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelMixMode {
    /// Average of all channels
    #[default]
    Mono,
    /// First channel only
    First,
    /// Per frame, the channel with the largest magnitude
    Dominant,
}

/// Convert interleaved multichannel samples to mono
///
/// # Arguments
///
/// * `interleaved` - Samples ordered frame by frame (`[l0, r0, l1, r1, ...]`)
/// * `channels` - Number of channels per frame
/// * `mode` - Mixing mode
///
/// # Returns
///
/// One sample per frame. A trailing partial frame is dropped.
///
/// # Errors
///
/// Returns `SegmentationError::InvalidInput` if `channels` is zero.
pub fn downmix(
    interleaved: &[f32],
    channels: usize,
    mode: ChannelMixMode,
) -> Result<Vec<f32>, SegmentationError> {
    if channels == 0 {
        return Err(SegmentationError::InvalidInput(
            "Channel count must be > 0".to_string(),
        ));
    }
    if channels == 1 {
        return Ok(interleaved.to_vec());
    }

    log::debug!("Downmixing {} channels using {:?}", channels, mode);

    let mono = interleaved
        .chunks_exact(channels)
        .map(|frame| match mode {
            ChannelMixMode::Mono => frame.iter().sum::<f32>() / channels as f32,
            ChannelMixMode::First => frame[0],
            ChannelMixMode::Dominant => frame
                .iter()
                .copied()
                .fold(0.0f32, |best, x| if x.abs() > best.abs() { x } else { best }),
        })
        .collect();
    Ok(mono)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_average() {
        let stereo = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(downmix(&stereo, 2, ChannelMixMode::Mono).unwrap(), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_downmix_first_and_dominant() {
        let stereo = vec![0.1, -0.9, 0.4, 0.2];
        assert_eq!(downmix(&stereo, 2, ChannelMixMode::First).unwrap(), vec![0.1, 0.4]);
        assert_eq!(downmix(&stereo, 2, ChannelMixMode::Dominant).unwrap(), vec![-0.9, 0.4]);
    }

    #[test]
    fn test_downmix_mono_passthrough_and_partial_frame() {
        assert_eq!(downmix(&[0.3, 0.2], 1, ChannelMixMode::Mono).unwrap(), vec![0.3, 0.2]);
        assert_eq!(downmix(&[1.0, 1.0, 1.0], 2, ChannelMixMode::Mono).unwrap(), vec![1.0]);
        assert!(downmix(&[1.0], 0, ChannelMixMode::Mono).is_err());
    }
}
