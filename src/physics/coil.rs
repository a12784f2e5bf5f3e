//! Coils built from circular filaments, and series circuits of coils.
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{
    check_difference_radii, check_finite, check_len, check_points, check_radii, FieldError,
    FieldResult,
};
use crate::physics::circular_filament::flux_circular_filament_par;
use crate::{FD_STEP, WEIGHT_SUM_TOLERANCE};

/// Anything that produces a poloidal flux from a single scalar drive current.
///
/// Only the flux is required. Radial and vertical flux density are central differences
/// of the flux with step [`FD_STEP`], taken at the level of the whole source rather than
/// per filament.
pub trait FieldSource {
    /// (Wb) Poloidal flux at each observation point `(r, z)` with `current` (A) driving this source.
    fn psi_prediction(&self, current: f64, r: &[f64], z: &[f64]) -> FieldResult<Vec<f64>>;

    /// (T) Radial flux density, $B_R = -\frac{1}{R} \frac{\partial \psi}{\partial z}$.
    fn br_prediction(&self, current: f64, r: &[f64], z: &[f64]) -> FieldResult<Vec<f64>> {
        check_points(r, z)?;
        let zlo: Vec<f64> = z.iter().map(|z| z - FD_STEP).collect();
        let zhi: Vec<f64> = z.iter().map(|z| z + FD_STEP).collect();
        let f1 = self.psi_prediction(current, r, &zlo)?;
        let f2 = self.psi_prediction(current, r, &zhi)?;

        Ok(f1
            .iter()
            .zip(f2.iter())
            .zip(r.iter())
            .map(|((f1, f2), r)| (f1 - f2) / (2.0 * FD_STEP * r))
            .collect())
    }

    /// (T) Vertical flux density, $B_z = \frac{1}{R} \frac{\partial \psi}{\partial R}$.
    ///
    /// Every `r` must exceed [`FD_STEP`] so the inner stencil point stays off the axis;
    /// otherwise [`FieldError::InsideDifferenceStep`] names the offending point.
    fn bz_prediction(&self, current: f64, r: &[f64], z: &[f64]) -> FieldResult<Vec<f64>> {
        check_points(r, z)?;
        check_difference_radii(r, FD_STEP)?;
        let rlo: Vec<f64> = r.iter().map(|r| r - FD_STEP).collect();
        let rhi: Vec<f64> = r.iter().map(|r| r + FD_STEP).collect();
        let f1 = self.psi_prediction(current, &rlo, z)?;
        let f2 = self.psi_prediction(current, &rhi, z)?;

        Ok(f1
            .iter()
            .zip(f2.iter())
            .zip(r.iter())
            .map(|((f1, f2), r)| (f2 - f1) / (2.0 * FD_STEP * r))
            .collect())
    }
}

/// A single circular current filament and its share of its coil's current.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Filament {
    /// (m) major radius
    pub r: f64,
    /// (m) vertical position
    pub z: f64,
    /// (dimensionless) fraction of the coil current carried by this filament
    pub weight: f64,
}

/// How a coil's current is shared between its filaments.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FilamentWeights {
    /// Every filament carries `1 / n` of the current.
    Uniform,
    /// Per-filament fractions, summing to 1.
    Explicit(Vec<f64>),
}

/// A coil represented as a weighted set of circular filaments.
///
/// Immutable once built; the filament radii are all strictly positive.
/// Deserialization goes through [`FilamentCoil::with_weights`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "FilamentCoilRecord")
)]
pub struct FilamentCoil {
    rfil: Vec<f64>,
    zfil: Vec<f64>,
    weights: FilamentWeights,
}

/// Unchecked wire form of a [`FilamentCoil`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct FilamentCoilRecord {
    rfil: Vec<f64>,
    zfil: Vec<f64>,
    weights: FilamentWeights,
}

#[cfg(feature = "serde")]
impl TryFrom<FilamentCoilRecord> for FilamentCoil {
    type Error = FieldError;

    fn try_from(rec: FilamentCoilRecord) -> FieldResult<Self> {
        Self::with_weights(rec.rfil, rec.zfil, rec.weights)
    }
}

impl FilamentCoil {
    /// Coil with current shared uniformly between filaments.
    ///
    /// # Arguments
    ///
    /// * `rfil`: (m) r-coord of each filament, length `n`, all > 0
    /// * `zfil`: (m) z-coord of each filament, length `n`
    pub fn new(rfil: Vec<f64>, zfil: Vec<f64>) -> FieldResult<Self> {
        Self::with_weights(rfil, zfil, FilamentWeights::Uniform)
    }

    /// Coil with an explicit share of the current in each filament.
    ///
    /// Explicit weights must have one entry per filament and sum to 1 within
    /// [`WEIGHT_SUM_TOLERANCE`]; they are not renormalized.
    pub fn with_weights(
        rfil: Vec<f64>,
        zfil: Vec<f64>,
        weights: FilamentWeights,
    ) -> FieldResult<Self> {
        if rfil.is_empty() {
            return Err(FieldError::Empty("filament coil"));
        }
        check_len("filament z-coords", &zfil, rfil.len())?;
        check_radii("filament", &rfil)?;
        check_finite("filament z-coords", &zfil)?;

        if let FilamentWeights::Explicit(w) = &weights {
            check_len("filament weights", w, rfil.len())?;
            check_finite("filament weights", w)?;
            let sum: f64 = w.iter().sum();
            if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(FieldError::WeightSum { sum });
            }
        }

        Ok(Self {
            rfil,
            zfil,
            weights,
        })
    }

    pub fn n_filaments(&self) -> usize {
        self.rfil.len()
    }

    /// (m) r-coord of each filament
    pub fn rfil(&self) -> &[f64] {
        &self.rfil
    }

    /// (m) z-coord of each filament
    pub fn zfil(&self) -> &[f64] {
        &self.zfil
    }

    pub fn weights(&self) -> &FilamentWeights {
        &self.weights
    }

    /// Fraction of the coil current carried by filament `i`.
    pub fn weight(&self, i: usize) -> f64 {
        match &self.weights {
            FilamentWeights::Uniform => 1.0 / self.n_filaments() as f64,
            FilamentWeights::Explicit(w) => w[i],
        }
    }

    pub fn filaments(&self) -> impl Iterator<Item = Filament> + '_ {
        (0..self.n_filaments()).map(|i| Filament {
            r: self.rfil[i],
            z: self.zfil[i],
            weight: self.weight(i),
        })
    }

    /// Weighted mean filament position, (r, z).
    pub fn centroid(&self) -> (f64, f64) {
        self.filaments()
            .fold((0.0, 0.0), |(r, z), f| (f.r.mul_add(f.weight, r), f.z.mul_add(f.weight, z)))
    }
}

impl FieldSource for FilamentCoil {
    fn psi_prediction(&self, current: f64, r: &[f64], z: &[f64]) -> FieldResult<Vec<f64>> {
        check_points(r, z)?;

        let ifil: Vec<f64> = (0..self.n_filaments())
            .map(|i| current * self.weight(i))
            .collect();

        let mut out = vec![0.0; r.len()];
        flux_circular_filament_par(&ifil, &self.rfil, &self.zfil, r, z, &mut out)?;

        Ok(out)
    }
}

/// Coils wired in series on one supply, each seeing the drive current times a fixed multiplier.
///
/// Coils are shared rather than owned, so one coil may sit in several circuits.
#[derive(Clone, Debug)]
pub struct CoilCircuit {
    coils: Vec<Arc<FilamentCoil>>,
    multipliers: Vec<f64>,
}

impl CoilCircuit {
    pub fn new(coils: Vec<Arc<FilamentCoil>>, multipliers: Vec<f64>) -> FieldResult<Self> {
        if coils.is_empty() {
            return Err(FieldError::Empty("coil circuit"));
        }
        check_len("circuit multipliers", &multipliers, coils.len())?;
        check_finite("circuit multipliers", &multipliers)?;

        Ok(Self { coils, multipliers })
    }

    pub fn coils(&self) -> &[Arc<FilamentCoil>] {
        &self.coils
    }

    pub fn multipliers(&self) -> &[f64] {
        &self.multipliers
    }
}

impl FieldSource for CoilCircuit {
    fn psi_prediction(&self, current: f64, r: &[f64], z: &[f64]) -> FieldResult<Vec<f64>> {
        let mut out = vec![0.0; r.len()];
        for (coil, mult) in self.coils.iter().zip(self.multipliers.iter()) {
            let psi = coil.psi_prediction(current * mult, r, z)?;
            out.iter_mut().zip(psi).for_each(|(o, p)| *o += p);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::physics::circular_filament::{greens_br, greens_bz, greens_psi};
    use approx::assert_relative_eq;

    fn obs() -> (Vec<f64>, Vec<f64>) {
        let r: Vec<f64> = (0..17).map(|i| 0.3 + 0.15 * i as f64).collect();
        let z: Vec<f64> = (0..17).map(|i| -1.2 + 0.13 * i as f64).collect();
        (r, z)
    }

    fn square_coil(rc: f64, zc: f64) -> FilamentCoil {
        let d = 0.02;
        FilamentCoil::new(
            vec![rc - d, rc + d, rc - d, rc + d],
            vec![zc - d, zc - d, zc + d, zc + d],
        )
        .unwrap()
    }

    #[test]
    fn test_construction_errors() {
        assert_eq!(
            FilamentCoil::new(vec![], vec![]),
            Err(FieldError::Empty("filament coil"))
        );
        assert!(matches!(
            FilamentCoil::new(vec![1.0, 2.0], vec![0.0]),
            Err(FieldError::LengthMismatch { .. })
        ));
        assert!(matches!(
            FilamentCoil::new(vec![1.0, -2.0], vec![0.0, 0.0]),
            Err(FieldError::NonPositiveRadius { index: 1, .. })
        ));
        assert!(matches!(
            FilamentCoil::with_weights(
                vec![1.0, 2.0],
                vec![0.0, 0.0],
                FilamentWeights::Explicit(vec![0.5, 0.6])
            ),
            Err(FieldError::WeightSum { .. })
        ));
        assert!(matches!(
            FilamentCoil::with_weights(
                vec![1.0, 2.0],
                vec![0.0, 0.0],
                FilamentWeights::Explicit(vec![1.0])
            ),
            Err(FieldError::LengthMismatch { .. })
        ));
        assert!(FilamentCoil::with_weights(
            vec![1.0, 2.0],
            vec![0.0, 0.0],
            FilamentWeights::Explicit(vec![0.25, 0.75])
        )
        .is_ok());
    }

    /// Points closer to the axis than the difference step are valid for psi and Br,
    /// but Bz reports the caller's own radius
    #[test]
    fn test_bz_inside_difference_step() {
        let coil = square_coil(1.0, 0.0);
        let r = [0.5, 5e-5];
        let z = [0.0, 0.1];
        assert!(coil.psi_prediction(1.0, &r, &z).is_ok());
        assert!(coil.br_prediction(1.0, &r, &z).is_ok());
        assert_eq!(
            coil.bz_prediction(1.0, &r, &z),
            Err(FieldError::InsideDifferenceStep {
                index: 1,
                r: 5e-5,
                step: FD_STEP
            })
        );

        let circuit = CoilCircuit::new(vec![Arc::new(coil)], vec![2.0]).unwrap();
        assert!(matches!(
            circuit.bz_prediction(1.0, &[5e-5], &[0.0]),
            Err(FieldError::InsideDifferenceStep { index: 0, .. })
        ));
    }

    /// A single-filament coil is the bare Green's function
    #[test]
    fn test_single_filament() {
        let (r, z) = obs();
        let coil = FilamentCoil::new(vec![1.1], vec![0.2]).unwrap();
        let current = 3.5;
        let psi = coil.psi_prediction(current, &r, &z).unwrap();
        let br = coil.br_prediction(current, &r, &z).unwrap();
        let bz = coil.bz_prediction(current, &r, &z).unwrap();
        for i in 0..r.len() {
            assert_relative_eq!(psi[i], current * greens_psi(1.1, 0.2, r[i], z[i]), max_relative = 1e-14);
            assert_relative_eq!(
                br[i],
                current * greens_br(1.1, 0.2, r[i], z[i]),
                max_relative = 1e-9,
                epsilon = 1e-15
            );
            assert_relative_eq!(
                bz[i],
                current * greens_bz(1.1, 0.2, r[i], z[i]),
                max_relative = 1e-9,
                epsilon = 1e-15
            );
        }
    }

    #[test]
    fn test_weighted_superposition() {
        let (r, z) = obs();
        let rfil = vec![0.8, 1.0, 1.3];
        let zfil = vec![0.4, -0.1, 0.0];
        let w = vec![0.2, 0.3, 0.5];
        let coil =
            FilamentCoil::with_weights(rfil.clone(), zfil.clone(), FilamentWeights::Explicit(w.clone()))
                .unwrap();
        let current = -2.0;
        let psi = coil.psi_prediction(current, &r, &z).unwrap();
        for i in 0..r.len() {
            let expected: f64 = (0..3)
                .map(|j| w[j] * greens_psi(rfil[j], zfil[j], r[i], z[i]) * current)
                .sum();
            assert_relative_eq!(psi[i], expected, max_relative = 1e-13);
        }

        let uniform = square_coil(1.0, 0.0);
        assert_eq!(uniform.weight(2), 0.25);
        let (rc, zc) = uniform.centroid();
        assert_relative_eq!(rc, 1.0, epsilon = 1e-14);
        assert_relative_eq!(zc, 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_observation_point_errors() {
        let coil = square_coil(1.0, 0.0);
        assert!(matches!(
            coil.psi_prediction(1.0, &[1.0, 2.0], &[0.0]),
            Err(FieldError::LengthMismatch { .. })
        ));
        assert!(matches!(
            coil.bz_prediction(1.0, &[0.0], &[0.0]),
            Err(FieldError::NonPositiveRadius { .. })
        ));
    }

    #[test]
    fn test_circuit() {
        let (r, z) = obs();
        let upper = Arc::new(square_coil(1.5, 0.8));
        let lower = Arc::new(square_coil(1.5, -0.8));
        let mults = vec![1.0, -0.7];
        let circuit = CoilCircuit::new(vec![upper.clone(), lower.clone()], mults.clone()).unwrap();

        let current = 1.3e3;
        let psi = circuit.psi_prediction(current, &r, &z).unwrap();
        let bz = circuit.bz_prediction(current, &r, &z).unwrap();
        let psi_u = upper.psi_prediction(current, &r, &z).unwrap();
        let psi_l = lower.psi_prediction(current, &r, &z).unwrap();
        let bz_u = upper.bz_prediction(current, &r, &z).unwrap();
        let bz_l = lower.bz_prediction(current, &r, &z).unwrap();
        for i in 0..r.len() {
            assert_relative_eq!(
                psi[i],
                mults[0] * psi_u[i] + mults[1] * psi_l[i],
                max_relative = 1e-12,
                epsilon = 1e-15
            );
            assert_relative_eq!(
                bz[i],
                mults[0] * bz_u[i] + mults[1] * bz_l[i],
                max_relative = 1e-6,
                epsilon = 1e-12
            );
        }

        assert!(matches!(
            CoilCircuit::new(vec![upper], vec![1.0, 1.0]),
            Err(FieldError::LengthMismatch { .. })
        ));
        assert!(matches!(
            CoilCircuit::new(vec![], vec![]),
            Err(FieldError::Empty(_))
        ));
    }

    /// Up-down symmetric pair driven in the same sense has no radial field on the midplane
    #[test]
    fn test_symmetric_circuit_midplane() {
        let upper = Arc::new(square_coil(1.5, 0.8));
        let lower = Arc::new(square_coil(1.5, -0.8));
        let circuit = CoilCircuit::new(vec![upper, lower], vec![1.0, 1.0]).unwrap();
        let r = [0.5, 1.0, 2.0];
        let z = [0.0; 3];
        let br = circuit.br_prediction(1e4, &r, &z).unwrap();
        let bz = circuit.bz_prediction(1e4, &r, &z).unwrap();
        for i in 0..3 {
            assert!(br[i].abs() < 1e-9 * bz[i].abs());
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_test {
    use super::*;

    #[test]
    fn test_coil_deserialize_validates() {
        let bad_radius = r#"{"rfil":[-1.0,0.0],"zfil":[0.0,0.0],"weights":"Uniform"}"#;
        assert!(serde_json::from_str::<FilamentCoil>(bad_radius).is_err());

        let bad_weights = r#"{"rfil":[1.0,2.0],"zfil":[0.0,0.0],"weights":{"Explicit":[3.0,2.0]}}"#;
        let err = serde_json::from_str::<FilamentCoil>(bad_weights).unwrap_err();
        assert!(err.to_string().contains("sum to 1"));

        let short_z = r#"{"rfil":[1.0,2.0],"zfil":[0.0],"weights":"Uniform"}"#;
        assert!(serde_json::from_str::<FilamentCoil>(short_z).is_err());
    }

    #[test]
    fn test_coil_serde_roundtrip() {
        let coil = FilamentCoil::with_weights(
            vec![1.0, 1.25],
            vec![0.5, -0.5],
            FilamentWeights::Explicit(vec![0.25, 0.75]),
        )
        .unwrap();
        let text = serde_json::to_string(&coil).unwrap();
        let back: FilamentCoil = serde_json::from_str(&text).unwrap();
        assert_eq!(back, coil);
    }
}
