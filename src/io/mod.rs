//! Audio I/O: decoding, WAV output, CSV tables and file backends

pub mod audio_signal;
pub mod backend;
pub mod decoder;
pub mod records;
pub mod wav;

pub use audio_signal::AudioSignal;
pub use backend::{AudioBackend, NativeBackend};
