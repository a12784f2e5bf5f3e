//! Poloidal flux and field of axisymmetric current distributions.
//!
//! Filaments compose into coils, coils into series circuits and coil sets,
//! and filament clusters into the hexagonal basis functions used to
//! discretize a plasma current density. Every composite answers the same
//! question: the poloidal flux at some observation points for some drive
//! current. Radial and vertical fields follow from that by central
//! differences, and response matrices are assembled once per geometry.

pub mod basis;
pub mod diagnostics;
pub mod error;
pub mod math;
pub mod mesh;
pub mod physics;

pub use error::{FieldError, FieldResult};

/// (H/m) vacuum magnetic permeability, classical SI value.
pub const MU_0: f64 = 4e-7 * core::f64::consts::PI; // [H/m]

/// (H/m) `mu_0 / 2pi`, the prefactor of the circular filament flux Green's function.
/// Collapsed to its exact value to reduce float error.
pub const MU0_OVER_2PI: f64 = 2e-7; // [H/m]

/// (H/m) `mu_0 / 4pi`
pub const MU0_OVER_4PI: f64 = 1e-7; // [H/m]

/// (m) Step used for central differences of the flux when evaluating B_R and B_z.
pub const FD_STEP: f64 = 1e-4;

/// Lower clamp for the elliptic parameter `k^2`. The upper clamp is `1 - K2_CLAMP`.
///
/// Coincident source and observation points drive `k^2` to 1, where `K(k^2)` diverges,
/// and far-field points drive it to 0. The flux is evaluated with `k^2` clamped to
/// `[K2_CLAMP, 1 - K2_CLAMP]` so that it is always finite.
pub const K2_CLAMP: f64 = 1e-10;

/// Absolute tolerance on the sum of explicit filament weights.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;
