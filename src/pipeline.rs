use std::path::{Path, PathBuf};

use crate::{
    cube::Cube,
    foundation::error::{PvError, PvResult},
    naming::FrameNaming,
    projection::reduce,
    render::{Frame, FrameComposer},
    slice::extract,
};

/// What to do with frames of the same dataset already present in the output directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistingFrames {
    /// Delete them before generating, so a shorter rerun leaves no stale frames behind.
    #[default]
    Replace,
    /// Refuse to run.
    Fail,
}

/// Outcome of [`SequenceDriver::run`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceStats {
    /// Frames written by this run.
    pub frames_written: usize,
    /// Frames of an earlier run deleted under [`ExistingFrames::Replace`].
    pub frames_removed: usize,
    /// Written frames in index order.
    pub frames: Vec<Frame>,
}

/// Generates one composite frame per spatial-B index, in ascending order.
pub struct SequenceDriver {
    composer: FrameComposer,
    existing: ExistingFrames,
}

impl SequenceDriver {
    /// Driver writing through `composer`, applying `existing` to earlier frames.
    pub fn new(composer: FrameComposer, existing: ExistingFrames) -> Self {
        Self { composer, existing }
    }

    /// Composer used for every frame.
    pub fn composer(&self) -> &FrameComposer {
        &self.composer
    }

    /// Render every cut of `cube`. Stops at the first failure; frames written before it stay.
    #[tracing::instrument(skip_all, fields(out_dir = %self.composer.out_dir().display()))]
    pub fn run(&self, cube: &Cube) -> PvResult<SequenceStats> {
        let shape = cube.shape();
        let cols = shape.cols;
        self.composer.naming().check_capacity(cols)?;
        // Style errors must surface before anything on disk changes.
        self.composer.layout((shape.rows, shape.cols))?;

        let out_dir = self.composer.out_dir();
        std::fs::create_dir_all(out_dir).map_err(|e| PvError::io(out_dir, e))?;
        let frames_removed = self.clear_existing(out_dir)?;

        let reference = reduce(cube);
        tracing::info!(
            frames = cols,
            reference_rows = reference.rows(),
            reference_cols = reference.cols(),
            "generating frames"
        );

        let mut frames = Vec::with_capacity(cols);
        for i in 0..cols {
            let slice = extract(cube, i)?;
            frames.push(self.composer.compose(&reference, &slice, i)?);
        }

        tracing::info!(frames = frames.len(), "frame generation complete");
        Ok(SequenceStats {
            frames_written: frames.len(),
            frames_removed,
            frames,
        })
    }

    fn clear_existing(&self, out_dir: &Path) -> PvResult<usize> {
        let existing = matching_files(out_dir, self.composer.naming())?;
        if existing.is_empty() {
            return Ok(0);
        }
        match self.existing {
            ExistingFrames::Fail => Err(PvError::validation(format!(
                "'{}' already holds {} frame(s) for dataset '{}'",
                out_dir.display(),
                existing.len(),
                self.composer.naming().dataset_id()
            ))),
            ExistingFrames::Replace => {
                for path in &existing {
                    std::fs::remove_file(path).map_err(|e| PvError::io(path, e))?;
                }
                tracing::info!(removed = existing.len(), "removed frames from a previous run");
                Ok(existing.len())
            }
        }
    }
}

fn matching_files(dir: &Path, naming: &FrameNaming) -> PvResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| PvError::io(dir, e))?;
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PvError::io(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if naming.parse_index(name).is_some() {
            out.push(entry.path());
        }
    }
    Ok(out)
}
