//! Magnetic diagnostics: measured data and the forward models that predict it.
pub mod data;
pub mod models;

pub use data::{CurrentData, FieldSensorData, FluxloopData};
pub use models::{
    DiagnosticModel, FieldSensorModel, FluxloopModel, Jacobians, ParameterValues,
    ParameterVector, PlasmaCurrentModel, COIL_CURRENTS, LN_J,
};
