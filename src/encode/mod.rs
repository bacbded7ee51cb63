//! Video encoding sinks.
//!
//! Sinks consume frames in sequence order and are driven by [`crate::assemble`].

/// `ffmpeg`-based sink (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink trait and the in-memory sink.
pub mod sink;
