use ndarray::{Array2, ArrayView2, Axis};

use crate::{
    cube::Cube,
    foundation::error::{PvError, PvResult},
};

/// Position-velocity cut at fixed spatial-B index; shape (spectral, spatial-A).
#[derive(Clone, Debug, PartialEq)]
pub struct PvSlice {
    index: usize,
    data: Array2<f64>,
}

impl PvSlice {
    /// The spatial-B index this slice was cut at.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Spectral length.
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Spatial-A length.
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Slice values, indexed `[v, a]`.
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }
}

/// `slice[v, a] = cube[v, a, i]`.
pub fn extract(cube: &Cube, i: usize) -> PvResult<PvSlice> {
    let cols = cube.shape().cols;
    if i >= cols {
        return Err(PvError::index("spatial-B", i, cols));
    }
    Ok(PvSlice {
        index: i,
        data: cube.view().index_axis(Axis(2), i).to_owned(),
    })
}
