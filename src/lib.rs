//! pvreel turns a spectral data cube into a position-velocity movie.
//!
//! The pipeline runs in two file-based phases:
//!
//! - Generate: load a [`Cube`], [`reduce`] it once to a moment-0 [`ReferenceMap`], then for
//!   every spatial-B index [`extract`] a [`PvSlice`] and let the [`FrameComposer`] write one
//!   annotated PNG. [`SequenceDriver`] runs this loop.
//! - Assemble: [`FrameCollector`] rediscovers the frames in numeric order and [`assemble`]
//!   streams them into a [`FrameSink`] (an `ffmpeg` MP4 by default).
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Video assembly from a collected frame sequence.
pub mod assemble;
/// Frame discovery and numeric ordering.
pub mod collect;
/// JSON run configuration.
pub mod config;
pub mod cube;
/// Encoding sinks.
pub mod encode;
/// Frame file naming.
pub mod naming;
/// Frame generation over every cut index.
pub mod pipeline;
/// Spectral integration into the reference map.
pub mod projection;
/// Composite frame rendering.
pub mod render;
/// Position-velocity slice extraction.
pub mod slice;

pub use crate::foundation::core::{CubeShape, IntensityRange};
pub use crate::foundation::error::{PvError, PvResult};

pub use crate::assemble::{VideoStats, assemble, assemble_into};
pub use crate::collect::{FrameCollector, FrameEntry, FrameSequence};
pub use crate::config::PvConfig;
pub use crate::cube::{AxisMeta, Cube, CubeMeta};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::naming::FrameNaming;
pub use crate::pipeline::{ExistingFrames, SequenceDriver, SequenceStats};
pub use crate::projection::{ReferenceMap, reduce};
pub use crate::render::{AxisLabels, Frame, FrameComposer, FrameStyle};
pub use crate::slice::{PvSlice, extract};
