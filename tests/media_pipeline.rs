use std::{
    path::{Path, PathBuf},
    process::Command,
};

use ndarray::Array3;
use pvreel::{
    AxisLabels, Cube, CubeMeta, ExistingFrames, FfmpegSink, FfmpegSinkOpts, FrameCollector,
    FrameComposer, FrameNaming, FrameSink, FrameStyle, PvError, SequenceDriver, SinkConfig,
    assemble,
};

fn ffmpeg_tools_available() -> bool {
    let has_tool = |tool: &str| {
        Command::new(tool)
            .arg("-version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    };
    has_tool("ffmpeg") && has_tool("ffprobe")
}

fn count_video_frames(path: &Path) -> anyhow::Result<u64> {
    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-count_frames",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=nb_read_frames,codec_name,pix_fmt",
            "-of",
            "json",
        ])
        .arg(path)
        .output()?;
    anyhow::ensure!(out.status.success(), "ffprobe failed");
    let v: serde_json::Value = serde_json::from_slice(&out.stdout)?;
    let stream = &v["streams"][0];
    anyhow::ensure!(stream["codec_name"] == "h264", "unexpected codec: {stream}");
    anyhow::ensure!(stream["pix_fmt"] == "yuv420p", "unexpected pix_fmt: {stream}");
    let frames = stream["nb_read_frames"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("missing nb_read_frames"))?
        .parse()?;
    Ok(frames)
}

#[test]
fn cube_to_mp4_has_one_video_frame_per_cut() {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return;
    }

    let dir = PathBuf::from("target").join("media_pipeline");
    let _ = std::fs::remove_dir_all(&dir);

    let mut data = Array3::<f64>::zeros((4, 5, 3));
    data[[2, 3, 1]] = 10.0;
    let cube = Cube::from_array(data, CubeMeta::default()).unwrap();

    let composer = FrameComposer::new(
        FrameStyle {
            panel_height: 64,
            ..Default::default()
        },
        AxisLabels::from_meta(cube.meta()),
        FrameNaming::new("media", 3).unwrap(),
        &dir,
    )
    .unwrap();
    SequenceDriver::new(composer, ExistingFrames::Replace)
        .run(&cube)
        .unwrap();

    let sequence = FrameCollector::new(FrameNaming::new("media", 3).unwrap())
        .collect(&dir)
        .unwrap();
    let out = dir.join("media_pv_movie.mp4");
    let stats = assemble(&sequence, &out, 10).unwrap();
    assert_eq!(stats.frames, 3);
    assert_eq!(stats.out_path.as_deref(), Some(out.as_path()));

    assert_eq!(count_video_frames(&out).unwrap(), 3);
}

fn started_sink(out: &Path) -> FfmpegSink {
    let _ = std::fs::remove_file(out);
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(out));
    sink.begin(SinkConfig {
        width: 64,
        height: 64,
        fps: 10,
    })
    .unwrap();
    let frame = image::RgbaImage::from_pixel(64, 64, image::Rgba([200, 30, 30, 255]));
    for i in 0..5 {
        sink.push_frame(i, &frame).unwrap();
    }
    sink
}

#[test]
fn aborted_encode_removes_partial_video() {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return;
    }

    let out = PathBuf::from("target").join("media_abort").join("partial.mp4");
    let mut sink = started_sink(&out);

    let wrong = image::RgbaImage::new(32, 64);
    let err = sink.push_frame(5, &wrong).unwrap_err();
    assert!(matches!(err, PvError::Validation(_)));
    sink.abort();

    assert!(!out.exists());
}

#[test]
fn dropped_sink_removes_partial_video() {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not on PATH");
        return;
    }

    let out = PathBuf::from("target").join("media_drop").join("partial.mp4");
    let sink = started_sink(&out);
    drop(sink);

    assert!(!out.exists());
}
