//! # kaonff-amplitudes
//!
//! This is an internal crate used by `kaonff`.
#![warn(clippy::perf, clippy::style, missing_docs)]
#![allow(clippy::excessive_precision)]

/// Relativistic Breit-Wigner propagators and resonance parameters.
pub mod breit_wigner;
/// The $`e^+e^-\to K\bar{K}`$ Born cross section.
pub mod cross_section;
/// The vector-meson-dominance kaon form factor.
pub mod form_factor;
/// Two- and three-body phase-space factors.
pub mod phase_space;
/// Initial-state radiative corrections.
pub mod radiative;
/// Energy-dependent resonance widths.
pub mod widths;

pub use breit_wigner::{breit_wigner, ResonanceParameters};
pub use cross_section::CrossSectionModel;
pub use form_factor::{Coefficients, FormFactor, FormFactorParameters};
pub use radiative::RadiativeCorrection;
pub use widths::WidthFunction;
