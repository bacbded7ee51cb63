use crate::foundation::core::IntensityRange;

/// Evenly spaced viridis anchors (0.0, 0.1, ..., 1.0).
const VIRIDIS: [[u8; 3]; 11] = [
    [68, 1, 84],
    [72, 36, 117],
    [65, 68, 135],
    [53, 95, 141],
    [42, 120, 142],
    [33, 145, 140],
    [34, 168, 132],
    [68, 191, 112],
    [122, 209, 81],
    [189, 223, 38],
    [253, 231, 37],
];

/// Colour for `t` in `[0, 1]`, linearly interpolated between anchors.
pub fn viridis(t: f64) -> [u8; 3] {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let pos = t * (VIRIDIS.len() - 1) as f64;
    let lo = (pos.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = pos - lo as f64;

    let a = VIRIDIS[lo];
    let b = VIRIDIS[lo + 1];
    let mix = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * frac).round() as u8;
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])]
}

/// Maps sample values to opaque RGBA through a fixed intensity window.
///
/// Values outside the window are clipped to the end colours; NaN samples get `bad`.
#[derive(Clone, Copy, Debug)]
pub struct ColorScale {
    /// Intensity window.
    pub range: IntensityRange,
    /// Colour for NaN samples.
    pub bad: [u8; 4],
}

impl ColorScale {
    /// Scale over `range` with `bad` for NaN.
    pub fn new(range: IntensityRange, bad: [u8; 4]) -> Self {
        Self { range, bad }
    }

    /// RGBA for `value`.
    pub fn map(&self, value: f64) -> [u8; 4] {
        match self.range.normalize(value) {
            Some(t) => {
                let [r, g, b] = viridis(t);
                [r, g, b, 255]
            }
            None => self.bad,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_hit_anchors() {
        assert_eq!(viridis(0.0), [68, 1, 84]);
        assert_eq!(viridis(0.5), [33, 145, 140]);
        assert_eq!(viridis(1.0), [253, 231, 37]);
    }

    #[test]
    fn interpolates_between_anchors() {
        let near_start = viridis(0.02);
        assert_eq!(near_start, [69, 8, 91]);
    }

    #[test]
    fn scale_clips_out_of_range_and_flags_nan() {
        let scale = ColorScale::new(IntensityRange::new(0.0, 10.0).unwrap(), [255, 255, 255, 255]);
        assert_eq!(scale.map(-5.0), [68, 1, 84, 255]);
        assert_eq!(scale.map(50.0), [253, 231, 37, 255]);
        assert_eq!(scale.map(5.0), [33, 145, 140, 255]);
        assert_eq!(scale.map(f64::NAN), [255, 255, 255, 255]);
    }
}
