//! Linear response matrices over sets of field sources.
use nalgebra::{DMatrix, DVector};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, trace};

use crate::error::{check_len, check_points, FieldResult};
use crate::physics::coil::FieldSource;

/// Which field quantity to evaluate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantity {
    /// (Wb) poloidal flux
    Psi,
    /// (T) radial flux density
    Br,
    /// (T) vertical flux density
    Bz,
}

impl Quantity {
    pub fn eval<S: FieldSource + ?Sized>(
        self,
        source: &S,
        current: f64,
        r: &[f64],
        z: &[f64],
    ) -> FieldResult<Vec<f64>> {
        match self {
            Quantity::Psi => source.psi_prediction(current, r, z),
            Quantity::Br => source.br_prediction(current, r, z),
            Quantity::Bz => source.bz_prediction(current, r, z),
        }
    }
}

/// Response matrix of shape `(n_points, sources.len())`, with column `j` holding
/// `quantity` for source `j` driven by `current`.
///
/// Columns are evaluated in parallel. Each is computed independently of the others,
/// so the result does not depend on scheduling.
pub fn response_matrix<S: FieldSource + Sync>(
    sources: &[S],
    current: f64,
    quantity: Quantity,
    r: &[f64],
    z: &[f64],
) -> FieldResult<DMatrix<f64>> {
    check_points(r, z)?;
    debug!(
        ?quantity,
        n_points = r.len(),
        n_sources = sources.len(),
        "assembling response matrix"
    );

    let columns: Vec<Vec<f64>> = sources
        .par_iter()
        .map(|s| quantity.eval(s, current, r, z))
        .collect::<FieldResult<_>>()?;
    trace!(n_columns = columns.len(), "response columns evaluated");

    Ok(DMatrix::from_iterator(
        r.len(),
        sources.len(),
        columns.into_iter().flatten(),
    ))
}

/// Apply a response matrix to a vector of per-column drives, `M * x`.
pub fn apply_response(matrix: &DMatrix<f64>, x: &[f64]) -> FieldResult<Vec<f64>> {
    check_len("response drives", x, matrix.ncols())?;
    let field = matrix * DVector::from_column_slice(x);
    Ok(field.iter().copied().collect())
}
