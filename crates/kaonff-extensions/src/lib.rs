//! # kaonff-extensions
//!
//! This is an internal crate used by `kaonff`.
#![warn(clippy::perf, clippy::style, missing_docs)]

/// The [`Fitter`](crate::fitter::Fitter) harness, its configuration, and its results.
pub mod fitter;
/// Cost terms, their combination, and minimization.
pub mod likelihoods;
/// Peak and background densities.
pub mod shapes;

pub use fitter::{fit_all, Bounds, FitConfiguration, FitResult, FitStatus, Fitter};
pub use likelihoods::{
    ExtendedNLL, LeastSquares, LikelihoodEvaluator, LikelihoodExpression, LikelihoodID,
    LikelihoodManager, LikelihoodTerm, MinimizerOptions, NormalConstraint,
};
pub use shapes::{linear_norm, Background, Cruijff, PeakModel};

pub use ganesh;
