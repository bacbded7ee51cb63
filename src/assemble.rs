use std::path::{Path, PathBuf};

use crate::{
    collect::FrameSequence,
    encode::{
        ffmpeg::{FfmpegSink, FfmpegSinkOpts},
        sink::{FrameSink, SinkConfig},
    },
    foundation::error::{PvError, PvResult},
};

/// Summary of an encoded video.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoStats {
    /// Frames written.
    pub frames: usize,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame rate.
    pub fps: u32,
    /// Output file, when the sink writes one.
    pub out_path: Option<PathBuf>,
}

/// Encode `sequence` into an H.264 MP4 at `out_path`, one frame per image, in sequence order.
///
/// No video file is left behind when any frame fails to decode or has the wrong size.
#[tracing::instrument(skip(sequence), fields(frames = sequence.len()))]
pub fn assemble(sequence: &FrameSequence, out_path: &Path, fps: u32) -> PvResult<VideoStats> {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(out_path));
    let mut stats = assemble_into(sequence, fps, &mut sink)?;
    stats.out_path = Some(out_path.to_path_buf());
    tracing::info!(out = %out_path.display(), frames = stats.frames, "video written");
    Ok(stats)
}

/// Stream `sequence` into any [`FrameSink`].
///
/// Every frame header is checked against the first frame before the sink is started.
pub fn assemble_into(
    sequence: &FrameSequence,
    fps: u32,
    sink: &mut dyn FrameSink,
) -> PvResult<VideoStats> {
    if fps == 0 {
        return Err(PvError::validation("frame rate must be positive"));
    }
    let entries = sequence.entries();
    let Some(first) = entries.first() else {
        return Err(PvError::EmptySequence(sequence.dir().to_path_buf()));
    };

    let expected = image::image_dimensions(&first.path).map_err(|e| PvError::image(&first.path, e))?;
    for entry in &entries[1..] {
        let got = image::image_dimensions(&entry.path).map_err(|e| PvError::image(&entry.path, e))?;
        if got != expected {
            return Err(PvError::DimensionMismatch {
                path: entry.path.clone(),
                expected,
                got,
            });
        }
    }

    let (width, height) = expected;
    sink.begin(SinkConfig { width, height, fps })?;
    if let Err(e) = push_all(sequence, expected, sink) {
        sink.abort();
        return Err(e);
    }

    Ok(VideoStats {
        frames: entries.len(),
        width,
        height,
        fps,
        out_path: None,
    })
}

fn push_all(sequence: &FrameSequence, expected: (u32, u32), sink: &mut dyn FrameSink) -> PvResult<()> {
    for entry in sequence.entries() {
        let frame = image::open(&entry.path)
            .map_err(|e| PvError::image(&entry.path, e))?
            .to_rgba8();
        // The file may have changed since the header pass.
        if frame.dimensions() != expected {
            return Err(PvError::DimensionMismatch {
                path: entry.path.clone(),
                expected,
                got: frame.dimensions(),
            });
        }
        sink.push_frame(entry.index, &frame)?;
        tracing::trace!(index = entry.index, "pushed frame");
    }
    sink.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{collect::FrameCollector, encode::sink::InMemorySink, naming::FrameNaming};

    fn fresh_dir(name: &str) -> PathBuf {
        let dir = PathBuf::from("target").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_solid(dir: &Path, index: usize, size: (u32, u32), rgba: [u8; 4]) {
        let img = image::RgbaImage::from_pixel(size.0, size.1, image::Rgba(rgba));
        img.save(dir.join(format!("asm_pv_diagram_{index:02}.png"))).unwrap();
    }

    fn collect(dir: &Path) -> FrameSequence {
        FrameCollector::new(FrameNaming::new("asm", 2).unwrap())
            .collect(dir)
            .unwrap()
    }

    #[test]
    fn frames_are_pushed_in_sequence_order() {
        let dir = fresh_dir("assemble_order");
        write_solid(&dir, 2, (4, 2), [0, 0, 255, 255]);
        write_solid(&dir, 0, (4, 2), [255, 0, 0, 255]);
        write_solid(&dir, 1, (4, 2), [0, 255, 0, 255]);

        let mut sink = InMemorySink::new();
        let stats = assemble_into(&collect(&dir), 5, &mut sink).unwrap();
        assert_eq!(stats.frames, 3);
        assert_eq!((stats.width, stats.height, stats.fps), (4, 2, 5));

        let pushed: Vec<(u64, [u8; 4])> = sink
            .frames()
            .iter()
            .map(|(i, f)| (*i, f.get_pixel(0, 0).0))
            .collect();
        assert_eq!(
            pushed,
            vec![
                (0, [255, 0, 0, 255]),
                (1, [0, 255, 0, 255]),
                (2, [0, 0, 255, 255])
            ]
        );
        assert!(sink.is_finished());
    }

    #[test]
    fn mismatched_frame_fails_before_the_sink_starts() {
        let dir = fresh_dir("assemble_mismatch");
        write_solid(&dir, 0, (4, 2), [0; 4]);
        write_solid(&dir, 1, (6, 2), [0; 4]);

        let mut sink = InMemorySink::new();
        let err = assemble_into(&collect(&dir), 5, &mut sink).unwrap_err();
        match err {
            PvError::DimensionMismatch { path, expected, got } => {
                assert_eq!(path, dir.join("asm_pv_diagram_01.png"));
                assert_eq!(expected, (4, 2));
                assert_eq!(got, (6, 2));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(sink.config().is_none());
        assert!(sink.frames().is_empty());
    }

    #[test]
    fn mismatch_leaves_no_video_file() {
        let dir = fresh_dir("assemble_mismatch_video");
        write_solid(&dir, 0, (4, 2), [0; 4]);
        write_solid(&dir, 1, (2, 2), [0; 4]);

        let out = dir.join("movie.mp4");
        assert!(matches!(
            assemble(&collect(&dir), &out, 10),
            Err(PvError::DimensionMismatch { .. })
        ));
        assert!(!out.exists());
    }

    #[test]
    fn zero_fps_is_rejected() {
        let dir = fresh_dir("assemble_zero_fps");
        write_solid(&dir, 0, (2, 2), [0; 4]);
        let mut sink = InMemorySink::new();
        assert!(matches!(
            assemble_into(&collect(&dir), 0, &mut sink),
            Err(PvError::Validation(_))
        ));
    }
}
