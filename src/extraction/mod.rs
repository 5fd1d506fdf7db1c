//! Note clip extraction
//!
//! - `clip`: cut one span out of a recording, with optional padding
//! - `collection`: cut a recording into consecutive clips at its onsets

pub mod clip;
pub mod collection;

pub use clip::{extract_clip, NoteClip, PadPolicy};
pub use collection::segment_audio_from_onsets;
