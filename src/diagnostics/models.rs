//! Forward models mapping current-density amplitudes and coil currents to diagnostic signals.
//!
//! Current density enters as log amplitudes `ln_J`, one per basis element, so that the
//! density stays positive for any parameter value. Coil currents enter linearly.
use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::basis::BasisSet;
use crate::diagnostics::data::{CurrentData, FieldSensorData, FluxloopData};
use crate::error::{check_finite, FieldError, FieldResult};
use crate::physics::coil_set::CoilSet;

/// Parameter name of the log current-density amplitudes.
pub const LN_J: &str = "ln_J";

/// Parameter name of the coil currents.
pub const COIL_CURRENTS: &str = "coil_currents";

/// A named block of model parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParameterVector {
    pub name: String,
    pub size: usize,
}

impl ParameterVector {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Values of named parameter vectors.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterValues {
    values: BTreeMap<String, DVector<f64>>,
}

impl ParameterValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the values of parameter `name`, replacing any previous values.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) -> FieldResult<()> {
        check_finite("parameter values", &values)?;
        self.values.insert(name.into(), DVector::from_vec(values));
        Ok(())
    }

    /// Builder form of [`ParameterValues::insert`].
    pub fn with(mut self, name: impl Into<String>, values: Vec<f64>) -> FieldResult<Self> {
        self.insert(name, values)?;
        Ok(self)
    }

    /// Values of `parameter`, checked against its declared size.
    pub fn get(&self, parameter: &ParameterVector) -> FieldResult<&DVector<f64>> {
        let values = self
            .values
            .get(&parameter.name)
            .ok_or_else(|| FieldError::UnknownParameter(parameter.name.clone()))?;
        if values.len() != parameter.size {
            return Err(FieldError::InvalidParameter(format!(
                "parameter '{}' has {} values, expected {}",
                parameter.name,
                values.len(),
                parameter.size
            )));
        }
        Ok(values)
    }
}

/// Derivative of the predictions with respect to each named parameter vector,
/// each of shape `(n_outputs, parameter.size)`.
pub type Jacobians = BTreeMap<String, DMatrix<f64>>;

/// A forward model of one group of diagnostics.
pub trait DiagnosticModel {
    /// Parameter vectors the model depends on.
    fn parameters(&self) -> &[ParameterVector];

    /// Predicted signal of each diagnostic.
    fn predictions(&self, values: &ParameterValues) -> FieldResult<DVector<f64>>;

    /// Predicted signals and their jacobians with respect to [`DiagnosticModel::parameters`].
    fn predictions_and_jacobians(
        &self,
        values: &ParameterValues,
    ) -> FieldResult<(DVector<f64>, Jacobians)>;
}

/// Chain rule through `amplitude = exp(ln_J)`: scales column `j` of `matrix` by `amplitudes[j]`.
fn log_amplitude_jacobian(matrix: &DMatrix<f64>, amplitudes: &DVector<f64>) -> DMatrix<f64> {
    let mut jac = matrix.clone();
    for (mut col, a) in jac.column_iter_mut().zip(amplitudes.iter()) {
        col *= *a;
    }
    jac
}

/// Signals linear in basis amplitudes and coil currents, `B exp(ln_J) + C I`.
#[derive(Clone, Debug)]
struct LinearResponse {
    basis_matrix: DMatrix<f64>,
    coil_matrix: DMatrix<f64>,
    parameters: [ParameterVector; 2],
}

impl LinearResponse {
    fn new(basis_matrix: DMatrix<f64>, coil_matrix: DMatrix<f64>) -> Self {
        let parameters = [
            ParameterVector::new(LN_J, basis_matrix.ncols()),
            ParameterVector::new(COIL_CURRENTS, coil_matrix.ncols()),
        ];
        Self {
            basis_matrix,
            coil_matrix,
            parameters,
        }
    }

    fn inputs(&self, values: &ParameterValues) -> FieldResult<(DVector<f64>, DVector<f64>)> {
        let amplitudes = values.get(&self.parameters[0])?.map(f64::exp);
        let currents = values.get(&self.parameters[1])?.clone();
        Ok((amplitudes, currents))
    }

    fn predictions(&self, values: &ParameterValues) -> FieldResult<DVector<f64>> {
        let (amplitudes, currents) = self.inputs(values)?;
        Ok(&self.basis_matrix * amplitudes + &self.coil_matrix * currents)
    }

    fn predictions_and_jacobians(
        &self,
        values: &ParameterValues,
    ) -> FieldResult<(DVector<f64>, Jacobians)> {
        let (amplitudes, currents) = self.inputs(values)?;
        let predictions = &self.basis_matrix * &amplitudes + &self.coil_matrix * currents;

        let mut jacobians = Jacobians::new();
        jacobians.insert(
            LN_J.to_owned(),
            log_amplitude_jacobian(&self.basis_matrix, &amplitudes),
        );
        jacobians.insert(COIL_CURRENTS.to_owned(), self.coil_matrix.clone());

        Ok((predictions, jacobians))
    }
}

/// Flux loops: the poloidal flux at each loop position.
#[derive(Clone, Debug)]
pub struct FluxloopModel {
    data: FluxloopData,
    response: LinearResponse,
}

impl FluxloopModel {
    /// Assemble the basis and coil flux matrices at the loop positions.
    pub fn new(data: FluxloopData, basis: &BasisSet, coils: &CoilSet) -> FieldResult<Self> {
        let basis_matrix = basis.psi_matrix(data.r(), data.z())?;
        let coil_matrix = coils.psi_matrix(data.r(), data.z())?;
        debug!(
            n_sensors = data.n_sensors(),
            n_basis = basis.n_basis(),
            n_coils = coils.n_coils(),
            "built fluxloop model"
        );

        Ok(Self {
            data,
            response: LinearResponse::new(basis_matrix, coil_matrix),
        })
    }

    pub fn data(&self) -> &FluxloopData {
        &self.data
    }

    /// (Wb m^2/A) shape `(n_sensors, n_basis)`
    pub fn basis_matrix(&self) -> &DMatrix<f64> {
        &self.response.basis_matrix
    }

    /// (Wb/A) shape `(n_sensors, n_coils)`
    pub fn coil_matrix(&self) -> &DMatrix<f64> {
        &self.response.coil_matrix
    }
}

impl DiagnosticModel for FluxloopModel {
    fn parameters(&self) -> &[ParameterVector] {
        &self.response.parameters
    }

    fn predictions(&self, values: &ParameterValues) -> FieldResult<DVector<f64>> {
        self.response.predictions(values)
    }

    fn predictions_and_jacobians(
        &self,
        values: &ParameterValues,
    ) -> FieldResult<(DVector<f64>, Jacobians)> {
        self.response.predictions_and_jacobians(values)
    }
}

/// Row `i` of the field along sensor `i`'s direction, `cal[i] * (cos(t[i]) M_R + sin(t[i]) M_z)`.
fn project_onto_sensors(
    m_r: &DMatrix<f64>,
    m_z: &DMatrix<f64>,
    data: &FieldSensorData,
) -> DMatrix<f64> {
    let angle = data.poloidal_angle();
    let calibration = data.calibration();
    DMatrix::from_fn(m_r.nrows(), m_r.ncols(), |i, j| {
        let (s, c) = angle[i].sin_cos();
        calibration[i] * (c * m_r[(i, j)] + s * m_z[(i, j)])
    })
}

/// Pickup coils: the calibrated field component along each sensor's poloidal angle.
#[derive(Clone, Debug)]
pub struct FieldSensorModel {
    data: FieldSensorData,
    response: LinearResponse,
}

impl FieldSensorModel {
    pub fn new(data: FieldSensorData, basis: &BasisSet, coils: &CoilSet) -> FieldResult<Self> {
        let (r, z) = (data.loops().r(), data.loops().z());
        let basis_matrix = project_onto_sensors(
            &basis.br_matrix(r, z)?,
            &basis.bz_matrix(r, z)?,
            &data,
        );
        let coil_matrix = project_onto_sensors(
            &coils.br_matrix(r, z)?,
            &coils.bz_matrix(r, z)?,
            &data,
        );
        debug!(
            n_sensors = data.n_sensors(),
            n_basis = basis.n_basis(),
            n_coils = coils.n_coils(),
            "built field sensor model"
        );

        Ok(Self {
            data,
            response: LinearResponse::new(basis_matrix, coil_matrix),
        })
    }

    pub fn data(&self) -> &FieldSensorData {
        &self.data
    }

    /// (T m^2/A) shape `(n_sensors, n_basis)`
    pub fn basis_matrix(&self) -> &DMatrix<f64> {
        &self.response.basis_matrix
    }

    /// (T/A) shape `(n_sensors, n_coils)`
    pub fn coil_matrix(&self) -> &DMatrix<f64> {
        &self.response.coil_matrix
    }
}

impl DiagnosticModel for FieldSensorModel {
    fn parameters(&self) -> &[ParameterVector] {
        &self.response.parameters
    }

    fn predictions(&self, values: &ParameterValues) -> FieldResult<DVector<f64>> {
        self.response.predictions(values)
    }

    fn predictions_and_jacobians(
        &self,
        values: &ParameterValues,
    ) -> FieldResult<(DVector<f64>, Jacobians)> {
        self.response.predictions_and_jacobians(values)
    }
}

/// Total plasma current, the sum of every basis element's current.
#[derive(Clone, Debug)]
pub struct PlasmaCurrentModel {
    data: CurrentData,
    element_current: f64,
    parameters: [ParameterVector; 1],
}

impl PlasmaCurrentModel {
    pub fn new(data: CurrentData, basis: &BasisSet) -> Self {
        Self {
            data,
            element_current: basis.total_current(),
            parameters: [ParameterVector::new(LN_J, basis.n_basis())],
        }
    }

    pub fn data(&self) -> &CurrentData {
        &self.data
    }

    /// (A) Current of each element at its amplitude.
    fn element_currents(&self, values: &ParameterValues) -> FieldResult<DVector<f64>> {
        let amplitudes = values.get(&self.parameters[0])?.map(f64::exp);
        Ok(amplitudes * self.element_current)
    }
}

impl DiagnosticModel for PlasmaCurrentModel {
    fn parameters(&self) -> &[ParameterVector] {
        &self.parameters
    }

    fn predictions(&self, values: &ParameterValues) -> FieldResult<DVector<f64>> {
        let currents = self.element_currents(values)?;
        Ok(DVector::from_element(1, currents.sum()))
    }

    fn predictions_and_jacobians(
        &self,
        values: &ParameterValues,
    ) -> FieldResult<(DVector<f64>, Jacobians)> {
        let currents = self.element_currents(values)?;
        let predictions = DVector::from_element(1, currents.sum());

        let mut jacobians = Jacobians::new();
        jacobians.insert(
            LN_J.to_owned(),
            DMatrix::from_row_slice(1, currents.len(), currents.as_slice()),
        );

        Ok((predictions, jacobians))
    }
}
