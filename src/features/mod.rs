//! Feature extraction modules
//!
//! This module contains the signal representations and detectors:
//! - Edge kernels and FIR/median filters
//! - Log-power envelope
//! - Constant-Q transform
//! - Peak picking
//! - Pitch tracking collaborators
//! - Onset detectors (envelope, log-CQT, pitch track)

pub mod cqt;
pub mod envelope;
pub mod filters;
pub mod kernel;
pub mod onset;
pub mod peak_picking;
pub mod pitch_tracker;
