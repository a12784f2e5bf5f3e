//! Electromagnetics calculations.
pub mod circular_filament;
pub mod coil;
pub mod coil_set;
pub mod response;

pub use circular_filament::{flux_circular_filament, greens_br, greens_bz, greens_psi};
pub use coil::{CoilCircuit, FieldSource, Filament, FilamentCoil, FilamentWeights};
pub use coil_set::{Coil, CoilSet};
pub use response::{apply_response, response_matrix, Quantity};
