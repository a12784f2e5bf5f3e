//! Magnetics calculations for circular current filaments.
use std::num::NonZeroUsize;

use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::{ParallelSlice, ParallelSliceMut},
};

use crate::error::{check_len, FieldResult};
use crate::math::ellipke;
use crate::{FD_STEP, K2_CLAMP, MU0_OVER_2PI};

/// (Wb/A) Poloidal flux at an observation point `(r, z)` per unit current in a circular
/// filament at `(rfil, zfil)`, which happens to be the Green's function for the
/// Grad-Shafranov elliptic operator, $\Delta^{\*}$.
///
/// # Commentary
///
/// With $L = \frac{1}{4}\left((R + R_0)^2 + (z - z_0)^2\right)$ and $k^2 = R R_0 / L$,
///
/// $$
/// \psi = \frac{\mu_0}{2\pi} \sqrt{L} \left( (2 - k^2) K(k^2) - 2 E(k^2) \right)
/// $$
///
/// where `K` and `E` take the modulus squared (scipy convention).
///
/// `k^2` is clamped to `[K2_CLAMP, 1 - K2_CLAMP]`, so coincident points give a large but
/// finite flux rather than a NaN or inf.
///
/// The expression is symmetric under exchange of the filament and the observation point,
/// down to the last bit.
///
/// No validation is done here; both radii must be positive.
#[inline]
pub fn greens_psi(rfil: f64, zfil: f64, r: f64, z: f64) -> f64 {
    let r_plus_rfil = r + rfil;
    let z_minus_zfil = z - zfil;
    let l = 0.25 * r_plus_rfil.mul_add(r_plus_rfil, z_minus_zfil * z_minus_zfil); // [m^2]
    let k2 = (r * rfil / l).clamp(K2_CLAMP, 1.0 - K2_CLAMP); // [nondim]

    let (ellip_k, ellip_e) = ellipke(k2);

    MU0_OVER_2PI * l.sqrt() * (2.0 - k2).mul_add(ellip_k, -2.0 * ellip_e)
}

/// (T/A) Radial flux density per unit filament current, by central difference of [`greens_psi`].
///
/// $B_R = -\frac{1}{R} \frac{\partial \psi}{\partial z}$
#[inline]
pub fn greens_br(rfil: f64, zfil: f64, r: f64, z: f64) -> f64 {
    let f1 = greens_psi(rfil, zfil, r, z - FD_STEP);
    let f2 = greens_psi(rfil, zfil, r, z + FD_STEP);
    (f1 - f2) / (2.0 * FD_STEP * r)
}

/// (T/A) Vertical flux density per unit filament current, by central difference of [`greens_psi`].
///
/// $B_z = \frac{1}{R} \frac{\partial \psi}{\partial R}$
///
/// The stencil steps inward by [`FD_STEP`], so `r` must exceed it.
#[inline]
pub fn greens_bz(rfil: f64, zfil: f64, r: f64, z: f64) -> f64 {
    let f1 = greens_psi(rfil, zfil, r - FD_STEP, z);
    let f2 = greens_psi(rfil, zfil, r + FD_STEP, z);
    (f2 - f1) / (2.0 * FD_STEP * r)
}

/// Flux contributions from some circular filaments to some observation points.
/// This variant of the function is parallelized over chunks of observation points.
///
/// Each observation point is summed over filaments in the same order as the serial
/// [`flux_circular_filament`], so the two produce identical results.
///
/// # Arguments
///
/// * `ifil`:    (A) current in each filament, length `m`
/// * `rfil`:    (m) r-coord of each filament, length `m`
/// * `zfil`:    (m) z-coord of each filament, length `m`
/// * `rprime`:  (m) r-coord of each observation point, length `n`
/// * `zprime`:  (m) z-coord of each observation point, length `n`
/// * `out_psi`: (Wb) poloidal flux at observation locations, length `n`, accumulated in-place
pub fn flux_circular_filament_par(
    ifil: &[f64],
    rfil: &[f64],
    zfil: &[f64],
    rprime: &[f64],
    zprime: &[f64],
    out_psi: &mut [f64],
) -> FieldResult<()> {
    let n = rprime.len();
    check_len("observation z-coords", zprime, n)?;
    check_len("flux output", out_psi, n)?;
    if n == 0 {
        return Ok(());
    }

    // Chunk inputs
    let ncores = std::thread::available_parallelism()
        .unwrap_or(NonZeroUsize::MIN)
        .get();

    let chunk = (n / ncores).max(1);

    let rprimec = rprime.par_chunks(chunk);
    let zprimec = zprime.par_chunks(chunk);

    let outc = out_psi.par_chunks_mut(chunk);

    // Run calcs
    outc.zip(rprimec.zip(zprimec))
        .try_for_each(|(outc, (rc, zc))| flux_circular_filament(ifil, rfil, zfil, rc, zc, outc))?;

    Ok(())
}

/// Flux contributions from some circular filaments to some observation points.
///
/// # Arguments
///
/// * `ifil`:    (A) current in each filament, length `m`
/// * `rfil`:    (m) r-coord of each filament, length `m`
/// * `zfil`:    (m) z-coord of each filament, length `m`
/// * `rprime`:  (m) r-coord of each observation point, length `n`
/// * `zprime`:  (m) z-coord of each observation point, length `n`
/// * `out_psi`: (Wb) poloidal flux at observation locations, length `n`, accumulated in-place
///
/// # Commentary
///
/// Represents contribution from a current at (R, Z) to an observation point at (Rprime, Zprime)
/// via [`greens_psi`].
///
/// Note Jardin's 4.61-4.66 presents it with a different definition of
/// the elliptic integrals from what is used here and in scipy.
///
/// # References
///
///   \[1\] S. Jardin, *Computational Methods in Plasma Physics*, 1st ed. USA: CRC Press, Inc., 2010.
///
///   \[2\] J. Huang and J. Menard, “Development of an Auto-Convergent Free-Boundary Axisymmetric Equilibrium Solver,”
///         Journal of Undergraduate Research, vol. 6, Jan. 2006, Accessed: May 05, 2021. \[Online\].
///         Available: <https://www.osti.gov/biblio/1051805-development-auto-convergent-free-boundary-axisymmetric-equilibrium-solver>
pub fn flux_circular_filament(
    ifil: &[f64],
    rfil: &[f64],
    zfil: &[f64],
    rprime: &[f64],
    zprime: &[f64],
    out_psi: &mut [f64],
) -> FieldResult<()> {
    // Check lengths; Error if they do not match
    let m: usize = ifil.len();
    let n: usize = rprime.len();
    check_len("filament r-coords", rfil, m)?;
    check_len("filament z-coords", zfil, m)?;
    check_len("observation z-coords", zprime, n)?;
    check_len("flux output", out_psi, n)?;

    for i in 0..n {
        let mut psi = 0.0;
        for j in 0..m {
            psi = ifil[j].mul_add(greens_psi(rfil[j], zfil[j], rprime[i], zprime[i]), psi);
        }
        out_psi[i] += psi;
    }

    Ok(())
}
