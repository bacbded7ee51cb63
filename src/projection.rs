use ndarray::{Array2, ArrayView2, Axis};

use crate::cube::Cube;

/// Spectrally integrated (moment-0) map with shape (spatial-A, spatial-B).
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceMap {
    data: Array2<f64>,
}

impl ReferenceMap {
    /// Spatial-A length.
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Spatial-B length.
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Map values, indexed `[a, b]`.
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }
}

/// Sum `cube` over its spectral axis: `map[a, b] = Σ_v cube[v, a, b]`.
///
/// NaN samples propagate into the affected map cells.
pub fn reduce(cube: &Cube) -> ReferenceMap {
    ReferenceMap {
        data: cube.view().sum_axis(Axis(0)),
    }
}
