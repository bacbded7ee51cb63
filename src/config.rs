use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use crate::{
    foundation::{
        core::IntensityRange,
        error::{PvError, PvResult},
    },
    naming::FrameNaming,
    pipeline::ExistingFrames,
    render::{
        FrameStyle,
        layout::{MAX_PANEL_HEIGHT, MIN_PANEL_HEIGHT},
    },
};

/// Run configuration, loadable from JSON. Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PvConfig {
    /// Prefix of frame and video file names.
    pub dataset_id: String,
    /// Panel title prefix; the dataset id when absent.
    pub title: Option<String>,
    /// Colour range of the reference map.
    pub reference_range: IntensityRange,
    /// Colour range of the PV slice.
    pub slice_range: IntensityRange,
    /// Digits in the zero-padded frame index.
    pub frame_padding_width: usize,
    /// Frames per second of the output video.
    pub frame_rate: u32,
    /// Directory the frames are written to.
    pub output_directory: PathBuf,
    /// Defaults to `<output_directory>/<dataset_id>_pv_movie.mp4`.
    pub video_path: Option<PathBuf>,
    /// Panel height in pixels.
    pub panel_height: u32,
    /// Font family for titles and labels.
    pub font_family: String,
    /// What to do with frames left by an earlier run.
    pub existing_frames: ExistingFrames,
}

impl Default for PvConfig {
    fn default() -> Self {
        let style = FrameStyle::default();
        Self {
            dataset_id: "NGC7538_CII".to_string(),
            title: None,
            reference_range: style.reference_range,
            slice_range: style.slice_range,
            frame_padding_width: 3,
            frame_rate: 10,
            output_directory: PathBuf::from("."),
            video_path: None,
            panel_height: style.panel_height,
            font_family: style.font_family,
            existing_frames: ExistingFrames::default(),
        }
    }
}

impl PvConfig {
    /// Load and validate a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> PvResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| PvError::io(path, e))?;
        Self::from_reader(BufReader::new(f)).map_err(|e| match e {
            PvError::Validation(msg) => {
                PvError::validation(format!("config '{}': {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Parse and validate JSON from `r`.
    pub fn from_reader(r: impl std::io::Read) -> PvResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| PvError::validation(format!("invalid config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check naming, ranges, frame rate and panel height.
    pub fn validate(&self) -> PvResult<()> {
        self.naming()?;
        self.reference_range.validate()?;
        self.slice_range.validate()?;
        if self.frame_rate == 0 {
            return Err(PvError::validation("frame_rate must be positive"));
        }
        if !(MIN_PANEL_HEIGHT..=MAX_PANEL_HEIGHT).contains(&self.panel_height) {
            return Err(PvError::validation(format!(
                "panel_height must be in {MIN_PANEL_HEIGHT}..={MAX_PANEL_HEIGHT}, got {}",
                self.panel_height
            )));
        }
        Ok(())
    }

    /// Frame naming derived from the dataset id and padding width.
    pub fn naming(&self) -> PvResult<FrameNaming> {
        FrameNaming::new(self.dataset_id.clone(), self.frame_padding_width)
    }

    /// Rendering style for [`FrameComposer`](crate::FrameComposer).
    pub fn style(&self) -> FrameStyle {
        FrameStyle {
            title: self.title.clone().unwrap_or_else(|| self.dataset_id.clone()),
            reference_range: self.reference_range,
            slice_range: self.slice_range,
            panel_height: self.panel_height,
            font_family: self.font_family.clone(),
            ..FrameStyle::default()
        }
    }

    /// Output video path, explicit or derived.
    pub fn video_path(&self) -> PathBuf {
        match &self.video_path {
            Some(p) => p.clone(),
            None => self
                .output_directory
                .join(format!("{}_pv_movie.mp4", self.dataset_id)),
        }
    }
}
