//! Vector annotations (titles, axes, ticks, colourbar labels, cut marker) drawn over the
//! raster panels. The overlay is emitted as an SVG document and rasterised with `resvg`.

use std::{fmt::Write as _, sync::Arc};

use anyhow::Context as _;

use crate::{
    cube::AxisMeta,
    foundation::{core::IntensityRange, error::PvResult},
    render::layout::{FrameLayout, PanelRect},
};

const MARKER_COLOR: &str = "#ff0000";
const INK: &str = "#000000";
const TITLE_SIZE: u32 = 18;
const LABEL_SIZE: u32 = 15;
const TICK_SIZE: u32 = 12;
const TICK_LEN: f64 = 5.0;
const MAX_TICKS: usize = 6;

/// Load system fonts once; text is dropped silently by `usvg` when no face matches.
pub fn load_fontdb() -> Arc<usvg::fontdb::Database> {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    Arc::new(db)
}

/// Rasterise `svg` on top of `pixmap` (same pixel size).
pub fn rasterize_over(
    svg: &str,
    fontdb: &Arc<usvg::fontdb::Database>,
    pixmap: &mut resvg::tiny_skia::Pixmap,
) -> PvResult<()> {
    let opts = usvg::Options {
        fontdb: Arc::clone(fontdb),
        ..Default::default()
    };
    let tree = usvg::Tree::from_data(svg.as_bytes(), &opts).context("parse frame overlay svg")?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::identity(),
        &mut pixmap.as_mut(),
    );
    Ok(())
}

pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Up to `max` evenly stepped indices in `0..n`, step drawn from 1-2-5 decades.
pub(crate) fn index_ticks(n: usize, max: usize) -> Vec<usize> {
    if n <= 1 || max <= 1 {
        return vec![0];
    }
    let want = (n - 1).div_ceil(max - 1).max(1);
    let mut decade = 1usize;
    let step = loop {
        if let Some(s) = [1, 2, 5].iter().map(|m| m * decade).find(|s| *s >= want) {
            break s;
        }
        decade *= 10;
    };
    (0..n).step_by(step).collect()
}

pub(crate) fn format_value(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    let a = v.abs();
    if !(1e-3..1e5).contains(&a) {
        return format!("{v:.2e}");
    }
    let s = format!("{v:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

/// Text for titles and axis labels.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotations {
    /// Title above the map.
    pub reference_title: String,
    /// Title above the slice.
    pub slice_title: String,
    /// Map x-axis label.
    pub reference_x: String,
    /// Map y-axis label.
    pub reference_y: String,
    /// Slice x-axis label.
    pub slice_x: String,
    /// Slice y-axis label.
    pub slice_y: String,
    /// Map colourbar label.
    pub reference_bar: String,
    /// Slice colourbar label.
    pub slice_bar: String,
}

pub(crate) struct OverlayInput<'a> {
    pub layout: &'a FrameLayout,
    pub text: &'a Annotations,
    pub font_family: &'a str,
    pub reference_shape: (usize, usize),
    pub slice_shape: (usize, usize),
    pub spectral_axis: &'a AxisMeta,
    pub reference_range: IntensityRange,
    pub slice_range: IntensityRange,
    pub marker_column: usize,
}

struct Svg {
    buf: String,
}

impl Svg {
    fn new(width: u32, height: u32, font_family: &str) -> Self {
        let mut buf = String::new();
        let _ = write!(
            buf,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}"><g font-family="{}" fill="{INK}">"#,
            escape_xml(font_family)
        );
        Self { buf }
    }

    fn text(&mut self, x: f64, y: f64, size: u32, anchor: &str, body: &str) {
        let _ = write!(
            self.buf,
            r#"<text x="{x:.2}" y="{y:.2}" font-size="{size}" text-anchor="{anchor}">{}</text>"#,
            escape_xml(body)
        );
    }

    fn vertical_text(&mut self, x: f64, y: f64, size: u32, body: &str) {
        let _ = write!(
            self.buf,
            r#"<text transform="translate({x:.2},{y:.2}) rotate(-90)" font-size="{size}" text-anchor="middle">{}</text>"#,
            escape_xml(body)
        );
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str, width: f64, dash: Option<&str>) {
        let dash = dash
            .map(|d| format!(r#" stroke-dasharray="{d}""#))
            .unwrap_or_default();
        let _ = write!(
            self.buf,
            r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}" stroke="{stroke}" stroke-width="{width}"{dash}/>"#
        );
    }

    fn frame(&mut self, r: &PanelRect) {
        let _ = write!(
            self.buf,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{INK}" stroke-width="1"/>"#,
            f64::from(r.x) + 0.5,
            f64::from(r.y) + 0.5,
            r.width.saturating_sub(1),
            r.height.saturating_sub(1)
        );
    }

    fn finish(mut self) -> String {
        self.buf.push_str("</g></svg>");
        self.buf
    }
}

fn x_axis(svg: &mut Svg, rect: &PanelRect, cols: usize, label: &str) {
    let bottom = f64::from(rect.bottom());
    for t in index_ticks(cols, MAX_TICKS) {
        let x = rect.column_center_x(t, cols);
        svg.line(x, bottom, x, bottom + TICK_LEN, INK, 1.0, None);
        svg.text(x, bottom + 20.0, TICK_SIZE, "middle", &t.to_string());
    }
    let mid = f64::from(rect.x) + f64::from(rect.width) / 2.0;
    svg.text(mid, bottom + 46.0, LABEL_SIZE, "middle", label);
}

fn y_axis(svg: &mut Svg, rect: &PanelRect, rows: usize, label: &str, world: Option<&AxisMeta>) {
    let left = f64::from(rect.x);
    for t in index_ticks(rows, MAX_TICKS) {
        let y = rect.row_center_y(t, rows);
        svg.line(left - TICK_LEN, y, left, y, INK, 1.0, None);
        let text = match world.and_then(|axis| axis.world(t as f64)) {
            Some(w) => format_value(w),
            None => t.to_string(),
        };
        svg.text(left - 8.0, y + 4.0, TICK_SIZE, "end", &text);
    }
    let mid = f64::from(rect.y) + f64::from(rect.height) / 2.0;
    svg.vertical_text(left - 70.0, mid, LABEL_SIZE, label);
}

fn colorbar(svg: &mut Svg, bar: &PanelRect, range: IntensityRange, label: &str) {
    svg.frame(bar);
    let right = f64::from(bar.right());
    for t in [0.0, 0.5, 1.0] {
        let y = f64::from(bar.bottom()) - t * f64::from(bar.height);
        svg.line(right, y, right + TICK_LEN, y, INK, 1.0, None);
        svg.text(right + 8.0, y + 4.0, TICK_SIZE, "start", &format_value(range.lerp(t)));
    }
    if !label.is_empty() {
        let mid = f64::from(bar.y) + f64::from(bar.height) / 2.0;
        svg.vertical_text(right + 74.0, mid, LABEL_SIZE, label);
    }
}

pub(crate) fn build_overlay(input: &OverlayInput<'_>) -> String {
    let l = input.layout;
    let mut svg = Svg::new(l.width, l.height, input.font_family);

    let title_y = f64::from(l.reference.y) - 16.0;
    let center = |r: &PanelRect| f64::from(r.x) + f64::from(r.width) / 2.0;
    svg.text(center(&l.reference), title_y, TITLE_SIZE, "middle", &input.text.reference_title);
    svg.text(center(&l.slice), title_y, TITLE_SIZE, "middle", &input.text.slice_title);

    let (ref_rows, ref_cols) = input.reference_shape;
    svg.frame(&l.reference);
    x_axis(&mut svg, &l.reference, ref_cols, &input.text.reference_x);
    y_axis(&mut svg, &l.reference, ref_rows, &input.text.reference_y, None);
    colorbar(&mut svg, &l.reference_bar, input.reference_range, &input.text.reference_bar);

    let (slice_rows, slice_cols) = input.slice_shape;
    svg.frame(&l.slice);
    x_axis(&mut svg, &l.slice, slice_cols, &input.text.slice_x);
    let world = input.spectral_axis.has_world().then_some(input.spectral_axis);
    y_axis(&mut svg, &l.slice, slice_rows, &input.text.slice_y, world);
    colorbar(&mut svg, &l.slice_bar, input.slice_range, &input.text.slice_bar);

    let x = l.reference.column_center_x(input.marker_column, ref_cols);
    svg.line(
        x,
        f64::from(l.reference.y),
        x,
        f64::from(l.reference.bottom()),
        MARKER_COLOR,
        2.0,
        Some("8 5"),
    );

    svg.finish()
}
