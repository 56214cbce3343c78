//! # kaonff-core
//!
//! This is an internal crate used by `kaonff`.
#![warn(clippy::perf, clippy::style)]
#![allow(clippy::excessive_precision)]

use thiserror::Error;

/// Particle masses, widths, and the electromagnetic constants shared by every model.
pub mod constants;
/// The [`Curve`](crate::model::Curve) and [`Density`](crate::model::Density) traits which
/// connect physics models to cost functions.
pub mod model;
/// Utility functions, enums, and traits
pub mod utils;
/// Useful traits for all crate structs
pub mod traits {
    pub use crate::model::{Curve, Density};
}

pub use crate::constants::{PhysicalConstants, CONSTANTS};
pub use crate::model::{Curve, Density};
pub use crate::utils::enums::{FitMode, KaonChannel};

/// The floating-point type used throughout the library.
pub type Float = f64;

/// The mathematical constant $`\pi`$.
pub const PI: Float = std::f64::consts::PI;

/// A [`Result`] with a [`KaonffError`] as its error type.
pub type KaonffResult<T> = Result<T, KaonffError>;

/// The error type used by all `kaonff` internal methods
#[derive(Error, Debug)]
pub enum KaonffError {
    /// An error which occurs when a raw parameter vector does not have the length a model
    /// requires to derive its coefficients.
    #[error("Expected a parameter vector of length {expected}, got {got}!")]
    ParameterLengthError {
        /// The length required by the model
        expected: usize,
        /// The length which was supplied
        got: usize,
    },
    /// An error which occurs when a model declares a parameter which the fit configuration does
    /// not provide (or a constraint names a parameter the model does not use).
    #[error("No parameter with name \"{name}\"!")]
    ParameterNotFound {
        /// Name of the parameter which failed lookup
        name: String,
    },
    /// An error which occurs when the user tries to parse an invalid string of text, typically
    /// into an enum variant.
    #[error("Failed to parse string: \"{name}\" does not correspond to a valid \"{object}\"!")]
    ParseError {
        /// The string which was parsed
        name: String,
        /// The name of the object it failed to parse into
        object: String,
    },
    /// A numerical integration which produced a non-finite or non-positive normalization.
    #[error("Quadrature failed: {reason}")]
    QuadratureError {
        /// Description of the failure
        reason: String,
    },
    /// A fit or integration domain with `xmin >= xmax` (or non-finite edges).
    #[error("Invalid domain: expected xmin < xmax, got ({xmin}, {xmax})")]
    InvalidDomain {
        /// Lower edge
        xmin: Float,
        /// Upper edge
        xmax: Float,
    },
    /// Results were requested from a fitter which has not been run yet.
    #[error("The fit has not been run yet!")]
    NotFitted,
    /// A custom fallback error for errors too complex or too infrequent to warrant their own error
    /// category.
    #[error("{0}")]
    Custom(String),
}

impl Clone for KaonffError {
    // minimizer statuses hold cloneable errors
    fn clone(&self) -> Self {
        let err_string = self.to_string();
        KaonffError::Custom(err_string)
    }
}

/// Check that `(xmin, xmax)` describes a finite, non-empty interval.
pub fn validate_domain(domain: (Float, Float)) -> KaonffResult<()> {
    let (xmin, xmax) = domain;
    if xmin.is_finite() && xmax.is_finite() && xmin < xmax {
        Ok(())
    } else {
        Err(KaonffError::InvalidDomain { xmin, xmax })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_validation() {
        assert!(validate_domain((480.0, 515.0)).is_ok());
        assert!(matches!(
            validate_domain((515.0, 480.0)),
            Err(KaonffError::InvalidDomain { .. })
        ));
        assert!(validate_domain((0.0, Float::INFINITY)).is_err());
    }

    #[test]
    fn test_error_clone_keeps_message() {
        let err = KaonffError::ParameterLengthError {
            expected: 24,
            got: 3,
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }
}
