//! Hexagonal current-density basis functions built from clusters of circular filaments.
//!
//! A [`HexaconeBasis`] element is a hat function on a regular hexagon: unit amplitude
//! at the centre, falling linearly to zero at the six outer vertices. Neighbouring
//! elements on the triangular lattice of [`BasisSet::lattice`] overlap so that their
//! hat functions sum to one, giving a piecewise-linear current density.
use nalgebra::DMatrix;
use tracing::debug;

use crate::error::{check_finite, check_len, FieldError, FieldResult};
use crate::mesh::TriangularMesh;
use crate::physics::coil::{FieldSource, FilamentCoil, FilamentWeights};
use crate::physics::response::{response_matrix, Quantity};

/// Refinement level used when none is given.
pub const DEFAULT_REFINEMENT_LEVEL: usize = 3;

/// Deepest supported refinement, 6 * 4^8 = 393216 filaments per element.
pub const MAX_REFINEMENT_LEVEL: usize = 8;

/// Filament offsets and weights for a unit-circumradius hexacone.
///
/// The unit hexagon is refined uniformly `level` times. Filaments sit at the
/// sub-triangle centroids, weighted by the unrefined hexagon's centre-vertex hat
/// function evaluated there and normalised to sum 1.
///
/// Returns `(r, z, weights)`, each of length `6 * 4^level`.
pub fn hexacone_filaments(level: usize) -> FieldResult<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    if level > MAX_REFINEMENT_LEVEL {
        return Err(FieldError::InvalidParameter(format!(
            "refinement level {level} exceeds maximum of {MAX_REFINEMENT_LEVEL}"
        )));
    }

    let hexagon = TriangularMesh::unit_hexagon();
    let mut mesh = hexagon.clone();
    for _ in 0..level {
        mesh = mesh.refine_all();
    }

    let (r, z) = mesh.centroids();
    let interp = hexagon.interpolator_matrix(&r, &z)?;
    let hat: Vec<f64> = interp.column(0).iter().copied().collect();
    let total: f64 = hat.iter().sum();
    let weights = hat.iter().map(|w| w / total).collect();

    Ok((r, z, weights))
}

/// One hexagonal basis element, independent of where it is placed.
#[derive(Clone, Debug, PartialEq)]
pub struct HexaconeBasis {
    resolution: f64,
    refinement_level: usize,
    r_offsets: Vec<f64>,
    z_offsets: Vec<f64>,
    weights: Vec<f64>,
    total_current: f64,
}

impl HexaconeBasis {
    /// # Arguments
    ///
    /// * `resolution`:       (m) hexagon circumradius, equal to the lattice spacing
    /// * `refinement_level`: number of uniform refinements of the unit hexagon
    pub fn new(resolution: f64, refinement_level: usize) -> FieldResult<Self> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(FieldError::InvalidParameter(format!(
                "basis resolution must be finite and positive, got {resolution}"
            )));
        }

        let (r, z, weights) = hexacone_filaments(refinement_level)?;
        let r_offsets = r.iter().map(|r| r * resolution).collect();
        let z_offsets = z.iter().map(|z| z * resolution).collect();
        // Volume of the unit-height hat function over a hexagon of circumradius `resolution`
        let total_current = 0.5 * 3.0_f64.sqrt() * resolution * resolution;

        debug!(
            resolution,
            refinement_level,
            n_filaments = weights.len(),
            "built hexacone basis"
        );

        Ok(Self {
            resolution,
            refinement_level,
            r_offsets,
            z_offsets,
            weights,
            total_current,
        })
    }

    /// Basis element at [`DEFAULT_REFINEMENT_LEVEL`].
    pub fn with_resolution(resolution: f64) -> FieldResult<Self> {
        Self::new(resolution, DEFAULT_REFINEMENT_LEVEL)
    }

    /// (m)
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn refinement_level(&self) -> usize {
        self.refinement_level
    }

    pub fn n_filaments(&self) -> usize {
        self.weights.len()
    }

    /// (m) Filament r-offsets from the element centre.
    pub fn r_offsets(&self) -> &[f64] {
        &self.r_offsets
    }

    /// (m) Filament z-offsets from the element centre.
    pub fn z_offsets(&self) -> &[f64] {
        &self.z_offsets
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// (A) Current carried by the element at unit peak current density (A/m^2).
    pub fn total_current(&self) -> f64 {
        self.total_current
    }

    /// The filament cluster centred on `(r0, z0)`.
    ///
    /// Fails with [`FieldError::NonPositiveRadius`] when the element reaches the axis.
    pub fn place(&self, r0: f64, z0: f64) -> FieldResult<FilamentCoil> {
        let rfil = self.r_offsets.iter().map(|dr| r0 + dr).collect();
        let zfil = self.z_offsets.iter().map(|dz| z0 + dz).collect();
        FilamentCoil::with_weights(rfil, zfil, FilamentWeights::Explicit(self.weights.clone()))
    }

    /// (Wb) Flux of the element centred on `(r0, z0)` carrying `current` (A) in total.
    pub fn psi_prediction(
        &self,
        r0: f64,
        z0: f64,
        current: f64,
        r: &[f64],
        z: &[f64],
    ) -> FieldResult<Vec<f64>> {
        self.place(r0, z0)?.psi_prediction(current, r, z)
    }

    /// (T) Radial flux density of the element centred on `(r0, z0)`.
    pub fn br_prediction(
        &self,
        r0: f64,
        z0: f64,
        current: f64,
        r: &[f64],
        z: &[f64],
    ) -> FieldResult<Vec<f64>> {
        self.place(r0, z0)?.br_prediction(current, r, z)
    }

    /// (T) Vertical flux density of the element centred on `(r0, z0)`.
    pub fn bz_prediction(
        &self,
        r0: f64,
        z0: f64,
        current: f64,
        r: &[f64],
        z: &[f64],
    ) -> FieldResult<Vec<f64>> {
        self.place(r0, z0)?.bz_prediction(current, r, z)
    }
}

/// An ordered set of basis elements sharing one [`HexaconeBasis`] shape.
///
/// Column `j` of every response matrix belongs to the element centred on
/// `(r_centres[j], z_centres[j])`.
#[derive(Clone, Debug)]
pub struct BasisSet {
    basis: HexaconeBasis,
    r_centres: Vec<f64>,
    z_centres: Vec<f64>,
    elements: Vec<FilamentCoil>,
}

impl BasisSet {
    pub fn new(basis: HexaconeBasis, r_centres: Vec<f64>, z_centres: Vec<f64>) -> FieldResult<Self> {
        if r_centres.is_empty() {
            return Err(FieldError::Empty("basis set"));
        }
        check_len("basis z-centres", &z_centres, r_centres.len())?;
        check_finite("basis r-centres", &r_centres)?;
        check_finite("basis z-centres", &z_centres)?;

        let elements = r_centres
            .iter()
            .zip(z_centres.iter())
            .map(|(r0, z0)| basis.place(*r0, *z0))
            .collect::<FieldResult<Vec<_>>>()?;

        debug!(
            n_basis = elements.len(),
            n_filaments = basis.n_filaments(),
            "placed basis set"
        );

        Ok(Self {
            basis,
            r_centres,
            z_centres,
            elements,
        })
    }

    /// Elements on the triangular lattice of spacing `resolution` covering a rectangle.
    ///
    /// Lattice columns are `resolution * sqrt(3) / 2` apart in r, starting at `r_bounds.0`.
    /// Within a column centres are `resolution` apart in z, starting at `z_bounds.0`,
    /// with odd columns shifted up by half a spacing. Only centres inside the closed
    /// rectangle are kept.
    pub fn lattice(
        basis: HexaconeBasis,
        r_bounds: (f64, f64),
        z_bounds: (f64, f64),
    ) -> FieldResult<Self> {
        let (r_min, r_max) = r_bounds;
        let (z_min, z_max) = z_bounds;
        check_finite("lattice bounds", &[r_min, r_max, z_min, z_max])?;
        if r_max < r_min || z_max < z_min {
            return Err(FieldError::InvalidParameter(format!(
                "lattice bounds are inverted: r {r_bounds:?}, z {z_bounds:?}"
            )));
        }

        let dz = basis.resolution();
        let dr = 0.5 * 3.0_f64.sqrt() * dz;
        // Slack so bounds that land on a lattice point keep it
        let slack = 1e-9 * dz;
        let n_cols = ((r_max - r_min + slack) / dr).floor() as usize + 1;

        let mut r_centres = Vec::new();
        let mut z_centres = Vec::new();
        for i in 0..n_cols {
            let r0 = r_min + dr * i as f64;
            let shift = if i % 2 == 1 { 0.5 * dz } else { 0.0 };
            let mut j = 0;
            loop {
                let z0 = z_min + shift + dz * j as f64;
                if z0 > z_max + slack {
                    break;
                }
                r_centres.push(r0);
                z_centres.push(z0);
                j += 1;
            }
        }

        Self::new(basis, r_centres, z_centres)
    }

    pub fn n_basis(&self) -> usize {
        self.elements.len()
    }

    pub fn basis(&self) -> &HexaconeBasis {
        &self.basis
    }

    /// (A) Current of any one element at unit peak current density.
    pub fn total_current(&self) -> f64 {
        self.basis.total_current()
    }

    /// (m)
    pub fn r_centres(&self) -> &[f64] {
        &self.r_centres
    }

    /// (m)
    pub fn z_centres(&self) -> &[f64] {
        &self.z_centres
    }

    /// Placed filament clusters, one per element.
    pub fn elements(&self) -> &[FilamentCoil] {
        &self.elements
    }

    /// (Wb m^2/A) Flux per unit peak current density, shape `(n_points, n_basis)`.
    pub fn psi_matrix(&self, r: &[f64], z: &[f64]) -> FieldResult<DMatrix<f64>> {
        response_matrix(&self.elements, self.total_current(), Quantity::Psi, r, z)
    }

    /// (T m^2/A) Radial flux density per unit peak current density, shape `(n_points, n_basis)`.
    pub fn br_matrix(&self, r: &[f64], z: &[f64]) -> FieldResult<DMatrix<f64>> {
        response_matrix(&self.elements, self.total_current(), Quantity::Br, r, z)
    }

    /// (T m^2/A) Vertical flux density per unit peak current density, shape `(n_points, n_basis)`.
    pub fn bz_matrix(&self, r: &[f64], z: &[f64]) -> FieldResult<DMatrix<f64>> {
        response_matrix(&self.elements, self.total_current(), Quantity::Bz, r, z)
    }
}
