use std::path::{Path, PathBuf};

use ndarray::Array3;
use pvreel::{
    AxisLabels, AxisMeta, Cube, CubeMeta, ExistingFrames, FrameCollector, FrameComposer,
    FrameNaming, FrameStyle, InMemorySink, IntensityRange, PvError, SequenceDriver,
    assemble_into, render::colormap::ColorScale,
};

const MARKER: (usize, usize, usize) = (2, 3, 1);

fn fresh_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn marker_cube() -> Cube {
    let mut data = Array3::<f64>::zeros((4, 5, 3));
    data[[MARKER.0, MARKER.1, MARKER.2]] = 10.0;
    let meta = CubeMeta {
        spectral: AxisMeta {
            ctype: Some("VRAD".into()),
            cunit: Some("km/s".into()),
            crval: Some(-60.0),
            cdelt: Some(0.5),
            crpix: Some(1.0),
        },
        object: Some("MARKER".into()),
        bunit: Some("K".into()),
        ..Default::default()
    };
    Cube::from_array(data, meta).unwrap()
}

fn driver(dir: &Path, dataset: &str) -> SequenceDriver {
    let style = FrameStyle {
        title: dataset.to_string(),
        reference_range: IntensityRange::new(0.0, 20.0).unwrap(),
        slice_range: IntensityRange::new(0.0, 10.0).unwrap(),
        panel_height: 120,
        ..Default::default()
    };
    let cube = marker_cube();
    let composer = FrameComposer::new(
        style,
        AxisLabels::from_meta(cube.meta()),
        FrameNaming::new(dataset, 3).unwrap(),
        dir,
    )
    .unwrap();
    SequenceDriver::new(composer, ExistingFrames::Replace)
}

#[test]
fn marker_voxel_shows_only_in_its_own_frame() {
    let dir = fresh_dir("e2e_marker");
    let fits = dir.join("marker.fits");
    marker_cube().save_fits(&fits).unwrap();
    let cube = Cube::load(&fits).unwrap();
    assert_eq!(cube.shape().as_tuple(), (4, 5, 3));

    let driver = driver(&dir, "marker");
    let stats = driver.run(&cube).unwrap();
    assert_eq!(stats.frames_written, 3);

    let style = driver.composer().style();
    let hot = ColorScale::new(style.slice_range, style.background).map(10.0);
    let cold = ColorScale::new(style.slice_range, style.background).map(0.0);
    let layout = driver.composer().layout((5, 3)).unwrap();
    let (x, y) = layout
        .slice
        .cell_center(MARKER.0, MARKER.1, 4, 5)
        .unwrap();

    let sequence = FrameCollector::new(FrameNaming::new("marker", 3).unwrap())
        .collect(&dir)
        .unwrap();
    assert_eq!(sequence.indices(), vec![0, 1, 2]);

    for entry in sequence.entries() {
        let img = image::open(&entry.path).unwrap().to_rgba8();
        let px = img.get_pixel(x, y).0;
        if entry.index as usize == MARKER.2 {
            assert_eq!(px, hot, "frame {}", entry.index);
        } else {
            assert_eq!(px, cold, "frame {}", entry.index);
        }
    }

    let mut sink = InMemorySink::new();
    let video = assemble_into(&sequence, 10, &mut sink).unwrap();
    assert_eq!(video.frames, 3);
    let order: Vec<u64> = sink.frames().iter().map(|(i, _)| *i).collect();
    assert_eq!(order, vec![0, 1, 2]);
    assert_eq!(
        sink.frames()[MARKER.2].1.get_pixel(x, y).0,
        hot,
        "sink receives frames unmodified"
    );
}

#[test]
fn run_writes_one_frame_per_cut_index() {
    let dir = fresh_dir("e2e_frame_count");
    let cube = Cube::from_array(Array3::from_elem((3, 4, 12), 1.0), CubeMeta::default()).unwrap();
    let stats = driver(&dir, "count").run(&cube).unwrap();
    assert_eq!(stats.frames_written, 12);

    let indices: Vec<usize> = stats.frames.iter().map(|f| f.index).collect();
    assert_eq!(indices, (0..12).collect::<Vec<_>>());
    for frame in &stats.frames {
        assert!(frame.path.exists());
        assert_eq!(frame.width % 2, 0);
        assert_eq!(frame.height % 2, 0);
    }
    assert!(dir.join("count_pv_diagram_011.png").exists());
}

#[test]
fn collector_orders_mixed_padding_numerically() {
    let dir = fresh_dir("e2e_mixed_padding");
    let names = [
        "mix_pv_diagram_10.png",
        "mix_pv_diagram_9.png",
        "mix_pv_diagram_02.png",
        "mix_pv_diagram_0.png",
        "mix_pv_diagram_001.png",
        "mix_pv_diagram_3.png",
        "mix_pv_diagram_0004.png",
        "mix_pv_diagram_5.png",
        "mix_pv_diagram_06.png",
        "mix_pv_diagram_7.png",
        "mix_pv_diagram_008.png",
    ];
    for n in names {
        std::fs::write(dir.join(n), b"").unwrap();
    }

    let seq = FrameCollector::new(FrameNaming::new("mix", 3).unwrap())
        .collect(&dir)
        .unwrap();
    assert_eq!(seq.indices(), (0..=10).collect::<Vec<u64>>());
    assert!(seq.gaps().is_empty());
}

#[test]
fn collector_without_matching_frames_is_empty_sequence() {
    let dir = fresh_dir("e2e_empty");
    std::fs::write(dir.join("readme.txt"), b"").unwrap();
    std::fs::write(dir.join("other_pv_diagram_000.png"), b"").unwrap();

    let err = FrameCollector::new(FrameNaming::new("mine", 3).unwrap())
        .collect(&dir)
        .unwrap_err();
    assert!(matches!(err, PvError::EmptySequence(p) if p == dir));
}

#[test]
fn missing_cube_is_not_found() {
    let err = Cube::load(Path::new("target/e2e_no_such_cube.fits")).unwrap_err();
    assert!(matches!(err, PvError::NotFound(_)));
}
