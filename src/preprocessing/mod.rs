//! Audio preprocessing modules
//!
//! This module contains utilities for preparing audio for analysis:
//! - Channel mixing (multichannel to mono)
//! - Sample-rate conversion
//! - Dither / noise generation

pub mod channel_mixer;
pub mod dither;
pub mod resample;
