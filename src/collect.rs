use std::path::{Path, PathBuf};

use crate::{
    foundation::error::{PvError, PvResult},
    naming::FrameNaming,
};

/// One frame file and its embedded index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameEntry {
    /// Index parsed from the file name.
    pub index: u64,
    /// Full path of the frame.
    pub path: PathBuf,
}

/// Frames discovered on disk, ordered by their embedded numeric index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSequence {
    dir: PathBuf,
    entries: Vec<FrameEntry>,
}

impl FrameSequence {
    /// Directory the frames were found in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no frames were found.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Frames in ascending index order.
    pub fn entries(&self) -> &[FrameEntry] {
        &self.entries
    }

    /// Frame indices in order.
    pub fn indices(&self) -> Vec<u64> {
        self.entries.iter().map(|e| e.index).collect()
    }

    /// Indices missing between the first and last frame.
    pub fn gaps(&self) -> Vec<u64> {
        let mut gaps = Vec::new();
        for pair in self.entries.windows(2) {
            gaps.extend(pair[0].index + 1..pair[1].index);
        }
        gaps
    }
}

/// Finds the frames of one dataset in a directory.
#[derive(Clone, Debug)]
pub struct FrameCollector {
    naming: FrameNaming,
}

impl FrameCollector {
    /// Collector for frames named by `naming`.
    pub fn new(naming: FrameNaming) -> Self {
        Self { naming }
    }

    /// List `dir`, keep files matching the frame naming scheme and sort them numerically.
    ///
    /// Directory enumeration order is never trusted; a name like `_10` sorts after `_9`
    /// regardless of padding.
    #[tracing::instrument(skip(self))]
    pub fn collect(&self, dir: &Path) -> PvResult<FrameSequence> {
        let read = std::fs::read_dir(dir).map_err(|e| PvError::io(dir, e))?;

        let mut entries = Vec::new();
        for entry in read {
            let entry = entry.map_err(|e| PvError::io(dir, e))?;
            let name = entry.file_name();
            let Some(index) = name.to_str().and_then(|n| self.naming.parse_index(n)) else {
                continue;
            };
            let file_type = entry.file_type().map_err(|e| PvError::io(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            entries.push(FrameEntry {
                index,
                path: entry.path(),
            });
        }

        if entries.is_empty() {
            return Err(PvError::EmptySequence(dir.to_path_buf()));
        }

        entries.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.path.cmp(&b.path)));
        if let Some(pair) = entries.windows(2).find(|p| p[0].index == p[1].index) {
            return Err(PvError::validation(format!(
                "frame index {} appears twice: '{}' and '{}'",
                pair[0].index,
                pair[0].path.display(),
                pair[1].path.display()
            )));
        }

        let sequence = FrameSequence {
            dir: dir.to_path_buf(),
            entries,
        };
        let gaps = sequence.gaps();
        if !gaps.is_empty() {
            tracing::warn!(missing = gaps.len(), first_missing = gaps[0], "frame sequence has gaps");
        }
        tracing::info!(frames = sequence.len(), "collected frames");
        Ok(sequence)
    }
}
