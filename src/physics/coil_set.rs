//! Independently driven coils and circuits, and their response matrices.
use std::sync::Arc;

use nalgebra::DMatrix;

use crate::error::{check_finite, check_len, check_points, FieldError, FieldResult};
use crate::physics::coil::{CoilCircuit, FieldSource, FilamentCoil};
use crate::physics::response::{response_matrix, Quantity};

/// One independently driven member of a [`CoilSet`].
#[derive(Clone, Debug)]
pub enum Coil {
    Filament(Arc<FilamentCoil>),
    Circuit(CoilCircuit),
}

impl From<FilamentCoil> for Coil {
    fn from(coil: FilamentCoil) -> Self {
        Coil::Filament(Arc::new(coil))
    }
}

impl From<Arc<FilamentCoil>> for Coil {
    fn from(coil: Arc<FilamentCoil>) -> Self {
        Coil::Filament(coil)
    }
}

impl From<CoilCircuit> for Coil {
    fn from(circuit: CoilCircuit) -> Self {
        Coil::Circuit(circuit)
    }
}

impl FieldSource for Coil {
    fn psi_prediction(&self, current: f64, r: &[f64], z: &[f64]) -> FieldResult<Vec<f64>> {
        match self {
            Coil::Filament(c) => c.psi_prediction(current, r, z),
            Coil::Circuit(c) => c.psi_prediction(current, r, z),
        }
    }
}

/// An ordered set of independently driven coils and circuits.
///
/// Index `i` of any currents vector belongs to member `i`; the order is fixed at
/// construction.
#[derive(Clone, Debug)]
pub struct CoilSet {
    coils: Vec<Coil>,
}

impl CoilSet {
    pub fn new(coils: Vec<Coil>) -> FieldResult<Self> {
        if coils.is_empty() {
            return Err(FieldError::Empty("coil set"));
        }
        Ok(Self { coils })
    }

    pub fn n_coils(&self) -> usize {
        self.coils.len()
    }

    pub fn coils(&self) -> &[Coil] {
        &self.coils
    }

    /// (Wb) Poloidal flux with member `i` driven by `currents[i]` (A).
    pub fn psi(&self, currents: &[f64], r: &[f64], z: &[f64]) -> FieldResult<Vec<f64>> {
        self.superpose(Quantity::Psi, currents, r, z)
    }

    /// (T) Radial flux density with member `i` driven by `currents[i]` (A).
    pub fn br(&self, currents: &[f64], r: &[f64], z: &[f64]) -> FieldResult<Vec<f64>> {
        self.superpose(Quantity::Br, currents, r, z)
    }

    /// (T) Vertical flux density with member `i` driven by `currents[i]` (A).
    pub fn bz(&self, currents: &[f64], r: &[f64], z: &[f64]) -> FieldResult<Vec<f64>> {
        self.superpose(Quantity::Bz, currents, r, z)
    }

    /// (Wb/A) Flux response matrix, shape `(n_points, n_coils)`.
    ///
    /// `psi_matrix(r, z) * currents` reproduces [`CoilSet::psi`].
    pub fn psi_matrix(&self, r: &[f64], z: &[f64]) -> FieldResult<DMatrix<f64>> {
        response_matrix(&self.coils, 1.0, Quantity::Psi, r, z)
    }

    /// (T/A) Radial flux density response matrix, shape `(n_points, n_coils)`.
    pub fn br_matrix(&self, r: &[f64], z: &[f64]) -> FieldResult<DMatrix<f64>> {
        response_matrix(&self.coils, 1.0, Quantity::Br, r, z)
    }

    /// (T/A) Vertical flux density response matrix, shape `(n_points, n_coils)`.
    pub fn bz_matrix(&self, r: &[f64], z: &[f64]) -> FieldResult<DMatrix<f64>> {
        response_matrix(&self.coils, 1.0, Quantity::Bz, r, z)
    }

    fn superpose(
        &self,
        quantity: Quantity,
        currents: &[f64],
        r: &[f64],
        z: &[f64],
    ) -> FieldResult<Vec<f64>> {
        check_len("coil currents", currents, self.n_coils())?;
        check_finite("coil currents", currents)?;
        check_points(r, z)?;

        let mut out = vec![0.0; r.len()];
        for (coil, current) in self.coils.iter().zip(currents.iter()) {
            let f = quantity.eval(coil, *current, r, z)?;
            out.iter_mut().zip(f).for_each(|(o, f)| *o += f);
        }

        Ok(out)
    }
}
