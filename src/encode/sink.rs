use crate::foundation::error::{PvError, PvResult};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames per second.
    pub fps: u32,
}

impl SinkConfig {
    /// Reject zero sizes and a zero frame rate.
    pub fn validate(&self) -> PvResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PvError::validation("sink width/height must be non-zero"));
        }
        if self.fps == 0 {
            return Err(PvError::validation("sink fps must be non-zero"));
        }
        Ok(())
    }
}

/// Sink contract for consuming frames in sequence order.
///
/// Ordering contract: `push_frame` is called with strictly increasing indices.
pub trait FrameSink {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> PvResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, idx: u64, frame: &image::RgbaImage) -> PvResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> PvResult<()>;
    /// Release resources after a failure; partial output is discarded.
    fn abort(&mut self) {}
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(u64, image::RgbaImage)>,
    finished: bool,
}

impl InMemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Captured frames in push order.
    pub fn frames(&self) -> &[(u64, image::RgbaImage)] {
        &self.frames
    }

    /// `true` once `end` has run.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> PvResult<()> {
        cfg.validate()?;
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &image::RgbaImage) -> PvResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| PvError::encode("in-memory sink not started"))?;
        if let Some((last, _)) = self.frames.last()
            && idx <= *last
        {
            return Err(PvError::encode(format!(
                "out-of-order frame index {idx} after {last}"
            )));
        }
        if frame.dimensions() != (cfg.width, cfg.height) {
            return Err(PvError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                cfg.width,
                cfg.height
            )));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> PvResult<()> {
        self.finished = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.frames.clear();
        self.cfg = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SinkConfig {
        SinkConfig {
            width: 2,
            height: 2,
            fps: 10,
        }
    }

    #[test]
    fn config_validation_catches_bad_values() {
        assert!(SinkConfig { width: 0, ..cfg() }.validate().is_err());
        assert!(SinkConfig { fps: 0, ..cfg() }.validate().is_err());
        assert!(cfg().validate().is_ok());
    }

    #[test]
    fn in_memory_sink_enforces_order_and_size() {
        let mut sink = InMemorySink::new();
        assert!(sink.push_frame(0, &image::RgbaImage::new(2, 2)).is_err());

        sink.begin(cfg()).unwrap();
        sink.push_frame(3, &image::RgbaImage::new(2, 2)).unwrap();
        assert!(sink.push_frame(3, &image::RgbaImage::new(2, 2)).is_err());
        assert!(sink.push_frame(4, &image::RgbaImage::new(4, 2)).is_err());
        sink.push_frame(7, &image::RgbaImage::new(2, 2)).unwrap();
        sink.end().unwrap();

        let idx: Vec<u64> = sink.frames().iter().map(|(i, _)| *i).collect();
        assert_eq!(idx, vec![3, 7]);
        assert!(sink.is_finished());
    }
}
