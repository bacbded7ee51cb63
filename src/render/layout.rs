use crate::foundation::error::{PvError, PvResult};

const MARGIN_LEFT: u32 = 96;
const MARGIN_RIGHT: u32 = 16;
const TITLE_HEIGHT: u32 = 52;
const MARGIN_BOTTOM: u32 = 68;
const BAR_GAP: u32 = 12;
const BAR_WIDTH: u32 = 18;
const BAR_LABELS: u32 = 88;
const PANEL_GAP: u32 = 96;

/// Smallest accepted panel height in pixels.
pub const MIN_PANEL_HEIGHT: u32 = 16;
/// Largest accepted panel height in pixels.
pub const MAX_PANEL_HEIGHT: u32 = 8192;

/// Pixel rectangle on the frame canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Pixel span `[lo, hi]` covered by cell `i` of `n` laid over `extent` pixels, under the
/// nearest-neighbour rule `cell = px * n / extent`.
fn span(i: usize, n: usize, extent: u32) -> Option<(u32, u32)> {
    let (i, n, extent) = (i as u64, n as u64, u64::from(extent));
    let lo = (i * extent).div_ceil(n);
    let hi = ((i + 1) * extent).div_ceil(n);
    (hi > lo).then(|| (lo as u32, (hi - 1) as u32))
}

impl PanelRect {
    /// One past the right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// One past the bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Data cell `(row, col)` drawn at local pixel `(dx, dy)`, with row 0 at the bottom.
    pub fn cell_at(&self, dx: u32, dy: u32, rows: usize, cols: usize) -> (usize, usize) {
        let col = (u64::from(dx) * cols as u64 / u64::from(self.width)) as usize;
        let from_top = (u64::from(dy) * rows as u64 / u64::from(self.height)) as usize;
        (rows - 1 - from_top.min(rows - 1), col.min(cols - 1))
    }

    /// Canvas pixel at the centre of the area showing cell `(row, col)`. `None` when the cell
    /// is too small to own a pixel.
    pub fn cell_center(&self, row: usize, col: usize, rows: usize, cols: usize) -> Option<(u32, u32)> {
        let (x0, x1) = span(col, cols, self.width)?;
        let (y0, y1) = span(rows - 1 - row, rows, self.height)?;
        Some((self.x + (x0 + x1) / 2, self.y + (y0 + y1) / 2))
    }

    /// Horizontal canvas coordinate through the middle of column `col`.
    pub fn column_center_x(&self, col: usize, cols: usize) -> f64 {
        match span(col, cols, self.width) {
            Some((lo, hi)) => f64::from(self.x) + f64::from(lo + hi + 1) / 2.0,
            None => f64::from(self.x) + (col as f64 + 0.5) * f64::from(self.width) / cols as f64,
        }
    }

    /// Vertical canvas coordinate through the middle of row `row` (row 0 at the bottom).
    pub fn row_center_y(&self, row: usize, rows: usize) -> f64 {
        let from_top = rows - 1 - row;
        match span(from_top, rows, self.height) {
            Some((lo, hi)) => f64::from(self.y) + f64::from(lo + hi + 1) / 2.0,
            None => {
                f64::from(self.y) + (from_top as f64 + 0.5) * f64::from(self.height) / rows as f64
            }
        }
    }
}

/// Placement of both panels and their colourbars on the composite frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLayout {
    /// Canvas width, always even.
    pub width: u32,
    /// Canvas height, always even.
    pub height: u32,
    /// Moment-0 map panel.
    pub reference: PanelRect,
    /// Colourbar of the map.
    pub reference_bar: PanelRect,
    /// PV slice panel.
    pub slice: PanelRect,
    /// Colourbar of the slice.
    pub slice_bar: PanelRect,
}

impl FrameLayout {
    /// `reference` is the map's `(rows, cols)`; the reference panel keeps the map's aspect
    /// ratio, the slice panel is square.
    pub fn new(reference: (usize, usize), panel_height: u32) -> PvResult<Self> {
        if !(MIN_PANEL_HEIGHT..=MAX_PANEL_HEIGHT).contains(&panel_height) {
            return Err(PvError::validation(format!(
                "panel height must be in {MIN_PANEL_HEIGHT}..={MAX_PANEL_HEIGHT}, got {panel_height}"
            )));
        }
        let (rows, cols) = reference;
        if rows == 0 || cols == 0 {
            return Err(PvError::validation("reference map must be non-empty"));
        }

        let aspect_width = (f64::from(panel_height) * cols as f64 / rows as f64).round();
        let ref_width = aspect_width.clamp(
            f64::from(MIN_PANEL_HEIGHT),
            f64::from(panel_height) * 4.0,
        ) as u32;

        let reference = PanelRect {
            x: MARGIN_LEFT,
            y: TITLE_HEIGHT,
            width: ref_width,
            height: panel_height,
        };
        let reference_bar = PanelRect {
            x: reference.right() + BAR_GAP,
            y: TITLE_HEIGHT,
            width: BAR_WIDTH,
            height: panel_height,
        };
        let slice = PanelRect {
            x: reference_bar.right() + BAR_LABELS + PANEL_GAP,
            y: TITLE_HEIGHT,
            width: panel_height,
            height: panel_height,
        };
        let slice_bar = PanelRect {
            x: slice.right() + BAR_GAP,
            y: TITLE_HEIGHT,
            width: BAR_WIDTH,
            height: panel_height,
        };

        let width = slice_bar.right() + BAR_LABELS + MARGIN_RIGHT;
        let height = TITLE_HEIGHT + panel_height + MARGIN_BOTTOM;

        Ok(Self {
            // yuv420p needs even dimensions.
            width: width.next_multiple_of(2),
            height: height.next_multiple_of(2),
            reference,
            reference_bar,
            slice,
            slice_bar,
        })
    }
}
