use std::path::{Path, PathBuf};

/// Convenience result type used throughout the crate.
pub type PvResult<T> = Result<T, PvError>;

/// Error type for all fallible pvreel operations.
#[derive(thiserror::Error, Debug)]
pub enum PvError {
    /// An input file or directory does not exist.
    #[error("not found: '{}'", .0.display())]
    NotFound(PathBuf),

    /// A container could not be read as a 3-D numeric cube.
    #[error("format error: {0}")]
    Format(String),

    /// An index falls outside an axis.
    #[error("index error: {axis} index {index} out of range 0..{len}")]
    Index {
        /// Axis name (`spectral`, `spatial-A` or `spatial-B`).
        axis: &'static str,
        /// Requested index.
        index: usize,
        /// Axis length.
        len: usize,
    },

    /// A directory holds no frames for the dataset.
    #[error("empty frame sequence: no matching frames in '{}'", .0.display())]
    EmptySequence(PathBuf),

    /// A frame differs in size from the first frame of its sequence.
    #[error(
        "dimension mismatch: frame '{}' is {}x{}, expected {}x{}",
        .path.display(), .got.0, .got.1, .expected.0, .expected.1
    )]
    DimensionMismatch {
        /// Offending frame.
        path: PathBuf,
        /// Size of the first frame.
        expected: (u32, u32),
        /// Size of the offending frame.
        got: (u32, u32),
    },

    /// Filesystem failure.
    #[error("io error at '{}': {source}", .path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// PNG encode or decode failure.
    #[error("image error at '{}': {source}", .path.display())]
    Image {
        /// Image path.
        path: PathBuf,
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// Invalid configuration, argument or contract violation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Video encoder failure.
    #[error("encode error: {0}")]
    Encode(String),

    /// Any other error, usually carrying `anyhow` context.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PvError {
    /// Build a [`PvError::Format`] error.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Build a [`PvError::Validation`] error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`PvError::Encode`] error.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`PvError::Index`] error.
    pub fn index(axis: &'static str, index: usize, len: usize) -> Self {
        Self::Index { axis, index, len }
    }

    /// Wrap an I/O error, mapping `NotFound` onto [`PvError::NotFound`].
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// Wrap an `image` error for `path`.
    pub fn image(path: impl AsRef<Path>, source: image::ImageError) -> Self {
        Self::Image {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
