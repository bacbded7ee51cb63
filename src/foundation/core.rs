use crate::foundation::error::{PvError, PvResult};

/// Cube dimensions in (spectral, spatial-A, spatial-B) order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CubeShape {
    /// Spectral channels.
    pub spectral: usize,
    /// Spatial-A length.
    pub rows: usize,
    /// Spatial-B length, the cut axis.
    pub cols: usize,
}

impl CubeShape {
    /// Build a shape; every dimension must be positive.
    pub fn new(spectral: usize, rows: usize, cols: usize) -> PvResult<Self> {
        if spectral == 0 || rows == 0 || cols == 0 {
            return Err(PvError::format(format!(
                "cube dimensions must be positive, got ({spectral}, {rows}, {cols})"
            )));
        }
        Ok(Self {
            spectral,
            rows,
            cols,
        })
    }

    /// `(spectral, rows, cols)`.
    pub fn as_tuple(self) -> (usize, usize, usize) {
        (self.spectral, self.rows, self.cols)
    }
}

impl std::fmt::Display for CubeShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.spectral, self.rows, self.cols)
    }
}

/// Fixed `{min, max}` intensity window used to colour a panel.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IntensityRange {
    /// Value mapped to the low end of the colour scale.
    pub min: f64,
    /// Value mapped to the high end of the colour scale.
    pub max: f64,
}

impl IntensityRange {
    /// Build a validated range.
    pub fn new(min: f64, max: f64) -> PvResult<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    /// Bounds must be finite with `min < max`.
    pub fn validate(&self) -> PvResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(PvError::validation("intensity range bounds must be finite"));
        }
        if self.min >= self.max {
            return Err(PvError::validation(format!(
                "intensity range min ({}) must be < max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Position of `v` inside the window, clipped to `[0, 1]`. `None` for NaN.
    pub fn normalize(&self, v: f64) -> Option<f64> {
        if v.is_nan() {
            return None;
        }
        Some(((v - self.min) / (self.max - self.min)).clamp(0.0, 1.0))
    }

    /// Value at fraction `t` of the window.
    pub fn lerp(&self, t: f64) -> f64 {
        self.min + (self.max - self.min) * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_rejects_zero_dims() {
        assert!(CubeShape::new(0, 2, 2).is_err());
        assert!(CubeShape::new(2, 0, 2).is_err());
        assert!(CubeShape::new(2, 2, 0).is_err());
        assert_eq!(CubeShape::new(4, 5, 3).unwrap().as_tuple(), (4, 5, 3));
    }

    #[test]
    fn range_validation() {
        assert!(IntensityRange::new(0.0, 10.0).is_ok());
        assert!(IntensityRange::new(10.0, 10.0).is_err());
        assert!(IntensityRange::new(5.0, 1.0).is_err());
        assert!(IntensityRange::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn normalize_clips_and_skips_nan() {
        let r = IntensityRange::new(0.0, 10.0).unwrap();
        assert_eq!(r.normalize(5.0), Some(0.5));
        assert_eq!(r.normalize(-3.0), Some(0.0));
        assert_eq!(r.normalize(42.0), Some(1.0));
        assert_eq!(r.normalize(f64::NAN), None);
        assert_eq!(r.lerp(0.25), 2.5);
    }
}
