use thiserror::Error;

/// Precondition failures surfaced by construction and evaluation.
///
/// Every variant is a deterministic validation failure; nothing here is retryable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("Length mismatch for {what}: expected {expected}, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Radius of {what} at index {index} must be finite and > 0, got {value}")]
    NonPositiveRadius {
        what: &'static str,
        index: usize,
        value: f64,
    },

    #[error(
        "Observation point {index} at r = {r} lies within the finite-difference step {step} of the axis"
    )]
    InsideDifferenceStep { index: usize, r: f64, step: f64 },

    #[error("Non-finite value in {what} at index {index}")]
    NonFinite { what: &'static str, index: usize },

    #[error("Filament weights must sum to 1, got {sum}")]
    WeightSum { sum: f64 },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown parameter group: {0}")]
    UnknownParameter(String),

    #[error("Triangle {triangle} references vertex {vertex}, but the mesh has {n_vertices} vertices")]
    InvalidTriangle {
        triangle: usize,
        vertex: usize,
        n_vertices: usize,
    },
}

pub type FieldResult<T> = Result<T, FieldError>;

/// Check that a slice has the expected length.
pub(crate) fn check_len(what: &'static str, v: &[f64], expected: usize) -> FieldResult<()> {
    if v.len() != expected {
        return Err(FieldError::LengthMismatch {
            what,
            expected,
            got: v.len(),
        });
    }
    Ok(())
}

/// Check that every entry is finite.
pub(crate) fn check_finite(what: &'static str, v: &[f64]) -> FieldResult<()> {
    match v.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(FieldError::NonFinite { what, index }),
        None => Ok(()),
    }
}

/// Check that every radius is finite and strictly positive.
pub(crate) fn check_radii(what: &'static str, r: &[f64]) -> FieldResult<()> {
    match r.iter().position(|x| !(x.is_finite() && *x > 0.0)) {
        Some(index) => Err(FieldError::NonPositiveRadius {
            what,
            index,
            value: r[index],
        }),
        None => Ok(()),
    }
}

/// Validate a set of (r, z) observation points.
pub(crate) fn check_points(r: &[f64], z: &[f64]) -> FieldResult<()> {
    check_len("observation z-coords", z, r.len())?;
    check_radii("observation point", r)?;
    check_finite("observation z-coords", z)
}

/// Check that a radial central difference of width `step` stays off the axis.
pub(crate) fn check_difference_radii(r: &[f64], step: f64) -> FieldResult<()> {
    match r.iter().position(|x| *x <= step) {
        Some(index) => Err(FieldError::InsideDifferenceStep {
            index,
            r: r[index],
            step,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_point_validation() {
        assert!(check_points(&[1.0, 2.0], &[0.0, 0.0]).is_ok());
        assert_eq!(
            check_points(&[1.0, 2.0], &[0.0]),
            Err(FieldError::LengthMismatch {
                what: "observation z-coords",
                expected: 2,
                got: 1
            })
        );
        assert!(matches!(
            check_points(&[1.0, 0.0], &[0.0, 0.0]),
            Err(FieldError::NonPositiveRadius { index: 1, .. })
        ));
        assert!(matches!(
            check_points(&[1.0], &[f64::NAN]),
            Err(FieldError::NonFinite { index: 0, .. })
        ));
    }

    #[test]
    fn test_difference_radii() {
        assert!(check_difference_radii(&[1.0, 2e-4], 1e-4).is_ok());
        assert_eq!(
            check_difference_radii(&[1.0, 5e-5], 1e-4),
            Err(FieldError::InsideDifferenceStep {
                index: 1,
                r: 5e-5,
                step: 1e-4
            })
        );
        assert!(check_difference_radii(&[1e-4], 1e-4).is_err());
    }

    #[test]
    fn test_messages() {
        let e = FieldError::WeightSum { sum: 0.5 };
        assert_eq!(e.to_string(), "Filament weights must sum to 1, got 0.5");
        let e = FieldError::Empty("coil set");
        assert_eq!(e.to_string(), "coil set must not be empty");
    }
}
