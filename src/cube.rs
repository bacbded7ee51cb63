//! Spectral cube access: the 3-D sample array plus the axis metadata used for labelling.
//!
//! Axis order is fixed to (spectral, spatial-A, spatial-B). In FITS terms spatial-B is
//! `NAXIS1`, spatial-A is `NAXIS2` and the spectral axis is `NAXIS3`.

/// FITS primary-HDU reader and writer.
pub mod fits;

use std::path::Path;

use ndarray::{Array3, ArrayView3};

use crate::foundation::{
    core::CubeShape,
    error::{PvError, PvResult},
};

/// Linear world-coordinate description of one axis (`CTYPEn`, `CUNITn`, `CRVALn`, `CDELTn`,
/// `CRPIXn`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AxisMeta {
    /// Axis type, e.g. `RA---SIN` or `VRAD`.
    pub ctype: Option<String>,
    /// Axis unit.
    pub cunit: Option<String>,
    /// World value at the reference pixel.
    pub crval: Option<f64>,
    /// World increment per pixel.
    pub cdelt: Option<f64>,
    /// 1-based reference pixel.
    pub crpix: Option<f64>,
}

impl AxisMeta {
    /// World coordinate of 0-based pixel `p`, when the axis carries a linear WCS.
    pub fn world(&self, p: f64) -> Option<f64> {
        let crval = self.crval?;
        let cdelt = self.cdelt?;
        let crpix = self.crpix.unwrap_or(0.0);
        Some(crval + (p + 1.0 - crpix) * cdelt)
    }

    /// `true` when [`AxisMeta::world`] yields values.
    pub fn has_world(&self) -> bool {
        self.crval.is_some() && self.cdelt.is_some()
    }

    /// Human-readable axis name derived from `CTYPE`, falling back to `fallback`.
    pub fn label(&self, fallback: &str) -> String {
        let name = match self.ctype.as_deref().map(str::trim) {
            Some(ct) if !ct.is_empty() => describe_ctype(ct),
            _ => fallback.to_string(),
        };
        match self.cunit.as_deref().map(str::trim) {
            Some(unit) if !unit.is_empty() => format!("{name} [{unit}]"),
            _ => name,
        }
    }
}

fn describe_ctype(ctype: &str) -> String {
    let head = ctype.split('-').next().unwrap_or(ctype).to_ascii_uppercase();
    let name = match head.as_str() {
        "RA" => "Right Ascension",
        "DEC" => "Declination",
        "GLON" => "Galactic Longitude",
        "GLAT" => "Galactic Latitude",
        "ELON" => "Ecliptic Longitude",
        "ELAT" => "Ecliptic Latitude",
        "VRAD" | "VELO" | "VOPT" | "VELOCITY" => "Velocity",
        "FREQ" => "Frequency",
        "WAVE" | "AWAV" => "Wavelength",
        _ => return ctype.to_string(),
    };
    name.to_string()
}

/// Header metadata used for labels only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CubeMeta {
    /// `NAXIS3`.
    pub spectral: AxisMeta,
    /// `NAXIS2`.
    pub rows: AxisMeta,
    /// `NAXIS1`.
    pub cols: AxisMeta,
    /// `OBJECT` card.
    pub object: Option<String>,
    /// `BUNIT` card, the sample unit.
    pub bunit: Option<String>,
}

impl CubeMeta {
    /// `CTYPE` of `NAXIS1`, `NAXIS2`, `NAXIS3`, in that order.
    pub fn axis_types(&self) -> [Option<&str>; 3] {
        [
            self.cols.ctype.as_deref(),
            self.rows.ctype.as_deref(),
            self.spectral.ctype.as_deref(),
        ]
    }
}

/// A loaded spectral cube. Read-only once constructed.
#[derive(Clone, Debug)]
pub struct Cube {
    data: Array3<f64>,
    shape: CubeShape,
    meta: CubeMeta,
}

impl Cube {
    /// Read a FITS cube from disk.
    #[tracing::instrument]
    pub fn load(path: &Path) -> PvResult<Self> {
        let cube = fits::read_cube(path)?;
        tracing::info!(shape = %cube.shape, "loaded cube");
        Ok(cube)
    }

    /// Wrap an in-memory `(spectral, rows, cols)` array.
    ///
    /// Fails with [`PvError::Format`] when any dimension is zero.
    pub fn from_array(data: Array3<f64>, meta: CubeMeta) -> PvResult<Self> {
        let (v, a, b) = data.dim();
        let shape = CubeShape::new(v, a, b)?;
        Ok(Self { data, shape, meta })
    }

    /// Cube dimensions.
    pub fn shape(&self) -> CubeShape {
        self.shape
    }

    /// Axis and header metadata.
    pub fn meta(&self) -> &CubeMeta {
        &self.meta
    }

    /// Read-only view of the samples, indexed `[v, a, b]`.
    pub fn view(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    /// Sample at `(v, a, b)`; [`PvError::Index`] outside the cube.
    pub fn sample(&self, v: usize, a: usize, b: usize) -> PvResult<f64> {
        if v >= self.shape.spectral {
            return Err(PvError::index("spectral", v, self.shape.spectral));
        }
        if a >= self.shape.rows {
            return Err(PvError::index("spatial-A", a, self.shape.rows));
        }
        if b >= self.shape.cols {
            return Err(PvError::index("spatial-B", b, self.shape.cols));
        }
        Ok(self.data[[v, a, b]])
    }

    /// Write the cube as a FITS primary HDU (`BITPIX = -64`).
    pub fn save_fits(&self, path: &Path) -> PvResult<()> {
        fits::write_cube(path, self)
    }
}
