//! Composite frame rendering: moment-0 reference panel with the cut marker next to the PV
//! slice panel, each with its own colour scale.

/// Value-to-colour mapping.
pub mod colormap;
/// Panel geometry.
pub mod layout;
pub mod overlay;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use ndarray::ArrayView2;

use crate::{
    cube::{AxisMeta, CubeMeta},
    foundation::{
        core::IntensityRange,
        error::{PvError, PvResult},
    },
    naming::FrameNaming,
    projection::ReferenceMap,
    render::{
        colormap::ColorScale,
        layout::{FrameLayout, PanelRect},
        overlay::{Annotations, OverlayInput},
    },
    slice::PvSlice,
};

/// Explicit rendering parameters; frames depend on nothing else.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameStyle {
    /// Name used in panel titles.
    pub title: String,
    /// Colour window of the reference panel.
    pub reference_range: IntensityRange,
    /// Colour window of the slice panel.
    pub slice_range: IntensityRange,
    /// Height in pixels of both data panels.
    pub panel_height: u32,
    /// Font family for all text.
    pub font_family: String,
    /// Canvas colour, also used for NaN cells.
    pub background: [u8; 4],
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self {
            title: "cube".to_string(),
            reference_range: IntensityRange {
                min: 0.0,
                max: 1000.0,
            },
            slice_range: IntensityRange { min: 0.0, max: 10.0 },
            panel_height: 480,
            font_family: "Helvetica, Arial, sans-serif".to_string(),
            background: [255, 255, 255, 255],
        }
    }
}

/// Axis text taken from the cube header.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AxisLabels {
    /// Spatial-B label, the x axis of the reference panel.
    pub cols: String,
    /// Spatial-A label.
    pub rows: String,
    /// Spectral label, the y axis of the slice panel.
    pub spectral: String,
    /// Colourbar label.
    pub intensity: String,
    /// Spectral WCS used for tick values.
    pub spectral_axis: AxisMeta,
}

impl AxisLabels {
    /// Labels from `CTYPE`/`CUNIT` and `BUNIT`, with generic fallbacks.
    pub fn from_meta(meta: &CubeMeta) -> Self {
        let intensity = match meta.bunit.as_deref().map(str::trim) {
            Some(unit) if !unit.is_empty() => format!("Intensity [{unit}]"),
            _ => "Intensity".to_string(),
        };
        Self {
            cols: meta.cols.label("Axis B"),
            rows: meta.rows.label("Axis A"),
            spectral: meta.spectral.label("Velocity"),
            intensity,
            spectral_axis: meta.spectral.clone(),
        }
    }
}

/// One serialised composite frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Cut index, also the index in the file name.
    pub index: usize,
    /// Written PNG.
    pub path: PathBuf,
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
}

/// Renders composite frames with a fixed style and naming.
pub struct FrameComposer {
    style: FrameStyle,
    labels: AxisLabels,
    naming: FrameNaming,
    out_dir: PathBuf,
    fontdb: Arc<usvg::fontdb::Database>,
}

impl FrameComposer {
    /// Fails when either intensity range is invalid. Loads the system fonts once.
    pub fn new(
        style: FrameStyle,
        labels: AxisLabels,
        naming: FrameNaming,
        out_dir: impl Into<PathBuf>,
    ) -> PvResult<Self> {
        style.reference_range.validate()?;
        style.slice_range.validate()?;
        Ok(Self {
            style,
            labels,
            naming,
            out_dir: out_dir.into(),
            fontdb: overlay::load_fontdb(),
        })
    }

    /// Naming used for written frames.
    pub fn naming(&self) -> &FrameNaming {
        &self.naming
    }

    /// Directory frames are written to.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Rendering style.
    pub fn style(&self) -> &FrameStyle {
        &self.style
    }

    /// Pixel layout used for a reference map of the given `(rows, cols)`.
    pub fn layout(&self, reference_shape: (usize, usize)) -> PvResult<FrameLayout> {
        FrameLayout::new(reference_shape, self.style.panel_height)
    }

    /// Render and write the frame for `slice`; `marker_column` must be the slice's cut index.
    pub fn compose(
        &self,
        reference: &ReferenceMap,
        slice: &PvSlice,
        marker_column: usize,
    ) -> PvResult<Frame> {
        let image = self.render(reference, slice, marker_column)?;
        let name = self.naming.file_name(slice.index())?;
        let path = self.out_dir.join(name);
        write_png(&path, &image)?;

        tracing::debug!(index = slice.index(), path = %path.display(), "wrote frame");
        Ok(Frame {
            index: slice.index(),
            path,
            width: image.width(),
            height: image.height(),
        })
    }

    /// Render the composite image without touching the filesystem.
    pub fn render(
        &self,
        reference: &ReferenceMap,
        slice: &PvSlice,
        marker_column: usize,
    ) -> PvResult<image::RgbaImage> {
        if marker_column != slice.index() {
            return Err(PvError::validation(format!(
                "marker column {marker_column} does not match cut index {}",
                slice.index()
            )));
        }
        if marker_column >= reference.cols() {
            return Err(PvError::index("spatial-B", marker_column, reference.cols()));
        }
        if slice.cols() != reference.rows() {
            return Err(PvError::validation(format!(
                "slice spans {} spatial rows but the reference map has {}",
                slice.cols(),
                reference.rows()
            )));
        }

        let layout = self.layout((reference.rows(), reference.cols()))?;
        let bg = self.style.background;
        let mut pixmap = resvg::tiny_skia::Pixmap::new(layout.width, layout.height)
            .ok_or_else(|| PvError::validation("failed to allocate frame pixmap"))?;
        pixmap.fill(resvg::tiny_skia::Color::from_rgba8(bg[0], bg[1], bg[2], bg[3]));

        let reference_scale = ColorScale::new(self.style.reference_range, bg);
        let slice_scale = ColorScale::new(self.style.slice_range, bg);
        paint_panel(&mut pixmap, &layout.reference, reference.view(), &reference_scale);
        paint_panel(&mut pixmap, &layout.slice, slice.view(), &slice_scale);
        paint_colorbar(&mut pixmap, &layout.reference_bar, &reference_scale);
        paint_colorbar(&mut pixmap, &layout.slice_bar, &slice_scale);

        let text = self.annotations(slice.index());
        let svg = overlay::build_overlay(&OverlayInput {
            layout: &layout,
            text: &text,
            font_family: &self.style.font_family,
            reference_shape: (reference.rows(), reference.cols()),
            slice_shape: (slice.rows(), slice.cols()),
            spectral_axis: &self.labels.spectral_axis,
            reference_range: self.style.reference_range,
            slice_range: self.style.slice_range,
            marker_column,
        });
        overlay::rasterize_over(&svg, &self.fontdb, &mut pixmap)?;

        // The canvas is opaque, so premultiplied and straight RGBA coincide.
        image::RgbaImage::from_raw(layout.width, layout.height, pixmap.take())
            .ok_or_else(|| PvError::validation("frame buffer size mismatch"))
    }

    fn annotations(&self, index: usize) -> Annotations {
        let title = &self.style.title;
        Annotations {
            reference_title: format!("{title} Moment 0 Map - Red Crosscut"),
            slice_title: format!("{title} PV Diagram - Vertical Cut {index}"),
            reference_x: self.labels.cols.clone(),
            reference_y: self.labels.rows.clone(),
            slice_x: self.labels.rows.clone(),
            slice_y: self.labels.spectral.clone(),
            reference_bar: String::new(),
            slice_bar: self.labels.intensity.clone(),
        }
    }
}

fn put_pixel(buf: &mut [u8], stride: usize, x: u32, y: u32, rgba: [u8; 4]) {
    let off = y as usize * stride + x as usize * 4;
    buf[off..off + 4].copy_from_slice(&rgba);
}

fn paint_panel(
    pixmap: &mut resvg::tiny_skia::Pixmap,
    rect: &PanelRect,
    data: ArrayView2<'_, f64>,
    scale: &ColorScale,
) {
    let (rows, cols) = data.dim();
    let stride = pixmap.width() as usize * 4;
    let buf = pixmap.data_mut();
    for dy in 0..rect.height {
        for dx in 0..rect.width {
            let (row, col) = rect.cell_at(dx, dy, rows, cols);
            put_pixel(buf, stride, rect.x + dx, rect.y + dy, scale.map(data[[row, col]]));
        }
    }
}

fn paint_colorbar(pixmap: &mut resvg::tiny_skia::Pixmap, rect: &PanelRect, scale: &ColorScale) {
    let stride = pixmap.width() as usize * 4;
    let buf = pixmap.data_mut();
    for dy in 0..rect.height {
        let t = 1.0 - (f64::from(dy) + 0.5) / f64::from(rect.height);
        let rgba = scale.map(scale.range.lerp(t));
        for dx in 0..rect.width {
            put_pixel(buf, stride, rect.x + dx, rect.y + dy, rgba);
        }
    }
}

/// Write `image` as PNG via a `.partial` sibling so a crash never leaves a truncated frame
/// under a valid frame name.
fn write_png(path: &Path, image: &image::RgbaImage) -> PvResult<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{file_name}.partial"));

    if let Err(e) = image.save_with_format(&tmp, image::ImageFormat::Png) {
        let _ = std::fs::remove_file(&tmp);
        return Err(PvError::image(&tmp, e));
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(PvError::io(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::*;
    use crate::{cube::Cube, projection::reduce, slice::extract};

    fn composer(out_dir: &Path) -> FrameComposer {
        let style = FrameStyle {
            title: "TEST".into(),
            panel_height: 60,
            ..Default::default()
        };
        FrameComposer::new(
            style,
            AxisLabels::from_meta(&CubeMeta::default()),
            FrameNaming::new("test", 3).unwrap(),
            out_dir,
        )
        .unwrap()
    }

    fn cube() -> Cube {
        let data = Array3::from_shape_fn((4, 5, 3), |(v, a, b)| (v + a + b) as f64);
        Cube::from_array(data, CubeMeta::default()).unwrap()
    }

    #[test]
    fn marker_must_match_cut_index() {
        let c = composer(Path::new("target/unused"));
        let cube = cube();
        let map = reduce(&cube);
        let slice = extract(&cube, 1).unwrap();
        assert!(matches!(c.render(&map, &slice, 2), Err(PvError::Validation(_))));
    }

    #[test]
    fn slice_extent_must_match_reference_rows() {
        let c = composer(Path::new("target/unused"));
        let cube = cube();
        let other = Cube::from_array(Array3::zeros((4, 6, 3)), CubeMeta::default()).unwrap();
        let slice = extract(&other, 0).unwrap();
        assert!(matches!(
            c.render(&reduce(&cube), &slice, 0),
            Err(PvError::Validation(_))
        ));
    }

    #[test]
    fn rendered_panels_follow_the_colour_scales() {
        let c = composer(Path::new("target/unused"));
        let cube = cube();
        let map = reduce(&cube);
        let slice = extract(&cube, 2).unwrap();
        let img = c.render(&map, &slice, 2).unwrap();

        let layout = c.layout((5, 3)).unwrap();
        assert_eq!((img.width(), img.height()), (layout.width, layout.height));

        // slice[v=3, a=4] = 3 + 4 + 2 = 9 on the 0..10 scale.
        let (x, y) = layout.slice.cell_center(3, 4, 4, 5).unwrap();
        let expected = ColorScale::new(c.style().slice_range, [255; 4]).map(9.0);
        assert_eq!(img.get_pixel(x, y).0, expected);

        // map[a=0, b=0] = Σ_v v = 6 on the 0..1000 scale.
        let (x, y) = layout.reference.cell_center(0, 0, 5, 3).unwrap();
        let expected = ColorScale::new(c.style().reference_range, [255; 4]).map(6.0);
        assert_eq!(img.get_pixel(x, y).0, expected);
    }

    #[test]
    fn marker_line_is_red_on_the_cut_column() {
        let c = composer(Path::new("target/unused"));
        let cube = cube();
        let map = reduce(&cube);
        let slice = extract(&cube, 1).unwrap();
        let img = c.render(&map, &slice, 1).unwrap();

        let layout = c.layout((5, 3)).unwrap();
        let x = layout.reference.column_center_x(1, 3).floor() as u32;
        let reddish = (layout.reference.y + 1..layout.reference.bottom() - 1).any(|y| {
            let [r, g, b, _] = img.get_pixel(x, y).0;
            r > 200 && g < 80 && b < 80
        });
        assert!(reddish);
    }

    #[test]
    fn failed_rename_leaves_no_partial_file() {
        let dir = PathBuf::from("target").join("render_rename_failure");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        // A non-empty directory cannot be replaced by a file.
        let target = dir.join("test_pv_diagram_000.png");
        std::fs::create_dir_all(target.join("occupied")).unwrap();

        let err = write_png(&target, &image::RgbaImage::new(2, 2)).unwrap_err();
        assert!(matches!(err, PvError::Io { .. }));
        assert!(!dir.join("test_pv_diagram_000.png.partial").exists());
    }

    #[test]
    fn compose_writes_named_png() {
        let dir = PathBuf::from("target").join("render_compose_unit");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let c = composer(&dir);
        let cube = cube();
        let map = reduce(&cube);
        let frame = c.compose(&map, &extract(&cube, 0).unwrap(), 0).unwrap();

        assert_eq!(frame.path, dir.join("test_pv_diagram_000.png"));
        assert!(frame.path.exists());
        assert!(!dir.join("test_pv_diagram_000.png.partial").exists());
        assert_eq!(
            image::image_dimensions(&frame.path).unwrap(),
            (frame.width, frame.height)
        );
    }
}
