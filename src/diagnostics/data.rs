//! Measured magnetic diagnostic signals, validated on construction.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{check_finite, check_len, check_radii, FieldError, FieldResult};

fn check_uncertainties(what: &'static str, errors: &[f64]) -> FieldResult<()> {
    check_finite(what, errors)?;
    match errors.iter().position(|e| *e <= 0.0) {
        Some(i) => Err(FieldError::InvalidParameter(format!(
            "{what} must be positive, got {} at index {i}",
            errors[i]
        ))),
        None => Ok(()),
    }
}

/// Flux loop positions and their measured flux.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "FluxloopRecord")
)]
pub struct FluxloopData {
    names: Vec<String>,
    r: Vec<f64>,
    z: Vec<f64>,
    measurements: Vec<f64>,
    errors: Vec<f64>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct FluxloopRecord {
    names: Vec<String>,
    r: Vec<f64>,
    z: Vec<f64>,
    measurements: Vec<f64>,
    errors: Vec<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<FluxloopRecord> for FluxloopData {
    type Error = FieldError;

    fn try_from(rec: FluxloopRecord) -> FieldResult<Self> {
        Self::new(rec.names, rec.r, rec.z, rec.measurements, rec.errors)
    }
}

impl FluxloopData {
    /// # Arguments
    ///
    /// * `names`:        sensor identifiers, length `n`
    /// * `r`:            (m) r-coord of each sensor, all > 0
    /// * `z`:            (m) z-coord of each sensor
    /// * `measurements`: measured signal of each sensor
    /// * `errors`:       one-sigma uncertainty of each measurement, all > 0
    pub fn new(
        names: Vec<String>,
        r: Vec<f64>,
        z: Vec<f64>,
        measurements: Vec<f64>,
        errors: Vec<f64>,
    ) -> FieldResult<Self> {
        let n = names.len();
        if n == 0 {
            return Err(FieldError::Empty("sensor data"));
        }
        check_len("sensor r-coords", &r, n)?;
        check_len("sensor z-coords", &z, n)?;
        check_len("sensor measurements", &measurements, n)?;
        check_len("sensor errors", &errors, n)?;
        check_radii("sensor", &r)?;
        check_finite("sensor z-coords", &z)?;
        check_finite("sensor measurements", &measurements)?;
        check_uncertainties("sensor errors", &errors)?;

        Ok(Self {
            names,
            r,
            z,
            measurements,
            errors,
        })
    }

    pub fn n_sensors(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// (m)
    pub fn r(&self) -> &[f64] {
        &self.r
    }

    /// (m)
    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn measurements(&self) -> &[f64] {
        &self.measurements
    }

    pub fn errors(&self) -> &[f64] {
        &self.errors
    }
}

/// Pickup coils measuring the field component along their poloidal angle.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "FieldSensorRecord")
)]
pub struct FieldSensorData {
    loops: FluxloopData,
    poloidal_angle: Vec<f64>,
    calibration: Vec<f64>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct FieldSensorRecord {
    loops: FluxloopData,
    poloidal_angle: Vec<f64>,
    calibration: Vec<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<FieldSensorRecord> for FieldSensorData {
    type Error = FieldError;

    fn try_from(rec: FieldSensorRecord) -> FieldResult<Self> {
        Self::with_calibration(rec.loops, rec.poloidal_angle, rec.calibration)
    }
}

impl FieldSensorData {
    /// Sensors with unit calibration.
    ///
    /// * `poloidal_angle`: (rad) sensor orientation measured from the +R axis towards +z
    pub fn new(loops: FluxloopData, poloidal_angle: Vec<f64>) -> FieldResult<Self> {
        let calibration = vec![1.0; loops.n_sensors()];
        Self::with_calibration(loops, poloidal_angle, calibration)
    }

    /// Sensors with a per-sensor multiplicative calibration factor.
    pub fn with_calibration(
        loops: FluxloopData,
        poloidal_angle: Vec<f64>,
        calibration: Vec<f64>,
    ) -> FieldResult<Self> {
        check_len("sensor poloidal angles", &poloidal_angle, loops.n_sensors())?;
        check_len("sensor calibration", &calibration, loops.n_sensors())?;
        check_finite("sensor poloidal angles", &poloidal_angle)?;
        check_finite("sensor calibration", &calibration)?;

        Ok(Self {
            loops,
            poloidal_angle,
            calibration,
        })
    }

    /// Positions, names and measurements.
    pub fn loops(&self) -> &FluxloopData {
        &self.loops
    }

    pub fn n_sensors(&self) -> usize {
        self.loops.n_sensors()
    }

    /// (rad)
    pub fn poloidal_angle(&self) -> &[f64] {
        &self.poloidal_angle
    }

    pub fn calibration(&self) -> &[f64] {
        &self.calibration
    }
}

/// A scalar current measurement, e.g. from a Rogowski coil.
///
/// Fields are public; [`CurrentData::new`] and deserialization both validate.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "CurrentRecord")
)]
pub struct CurrentData {
    /// (A)
    pub measurement: f64,
    /// (A) one-sigma uncertainty
    pub error: f64,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct CurrentRecord {
    measurement: f64,
    error: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<CurrentRecord> for CurrentData {
    type Error = FieldError;

    fn try_from(rec: CurrentRecord) -> FieldResult<Self> {
        Self::new(rec.measurement, rec.error)
    }
}

impl CurrentData {
    pub fn new(measurement: f64, error: f64) -> FieldResult<Self> {
        check_finite("current measurement", &[measurement])?;
        check_uncertainties("current error", &[error])?;
        Ok(Self { measurement, error })
    }
}
