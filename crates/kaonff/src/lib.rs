//! `kaonff` is a library for studies of $`e^+e^-\to K\bar{K}`$: it models the kaon electromagnetic
//! form factor in vector-meson dominance, turns it into Born cross sections, and fits peaks in
//! invariant-mass spectra with extended unbinned likelihoods.
//!
//! <div class="warning">
//!
//! This crate is still in an early development phase, and the API is not stable.
//!
//! </div>
//!
//! # Table of Contents
//! - [Key Features](#key-features)
//! - [Quick Start](#quick-start)
//!   - [Evaluating a Cross Section](#evaluating-a-cross-section)
//!   - [Fitting a Peak](#fitting-a-peak)
//!   - [Fitting Measured Cross Sections](#fitting-measured-cross-sections)
//! - [Radiative Corrections](#radiative-corrections)
//! - [Parallelism](#parallelism)
//!
//! # Key Features
//! * A [`FormFactor`] built from relativistic Breit-Wigner propagators of the $`\rho`$, $`\omega`$,
//!   and $`\phi`$ families with energy-dependent widths, for both the charged and neutral
//!   [`KaonChannel`]s.
//! * A [`CrossSectionModel`] which converts between form factors and cross sections.
//! * A [`Fitter`] which minimizes extended unbinned likelihoods or least-squares costs with
//!   [`ganesh`](https://github.com/denehoffman/ganesh), with Gaussian constraints and a
//!   covariance estimate.
//! * [`Cruijff`] peaks and [`Background`] shapes normalized over the fit range.
//! * Small statistics helpers: histogram $`\chi^2`$ comparisons, Bayesian efficiencies, and a
//!   [`RegistrationEfficiency`] curve.
//!
//! # Quick Start
//! ## Evaluating a Cross Section
//! The form factor is controlled by 24 parameters. [`FormFactorParameters::default`] is the
//! ground-state-dominance limit, where only the $`\rho(770)`$, $`\omega(782)`$, and
//! $`\phi(1020)`$ contribute:
//! ```rust
//! use kaonff::{CrossSectionModel, FormFactorParameters};
//!
//! let model = CrossSectionModel::neutral();
//! let params = FormFactorParameters::default();
//! let peak = model.cross_section(1.0195, &params); // nb
//! assert!(peak > model.cross_section(1.05, &params));
//! // below threshold the cross section vanishes
//! assert_eq!(model.cross_section(0.9, &params), 0.0);
//! ```
//!
//! ## Fitting a Peak
//! A [`FitConfiguration`] holds the fit range, the [`FitMode`], and a starting value and limits
//! for every parameter of the model. [`Fitter::peak`] fits a Cruijff signal plus a linear
//! background (`n_sig, m, sL, sR, aL, aR, y0, dy`):
//! ```rust,no_run
//! use kaonff::{FitConfiguration, Fitter};
//!
//! # let masses: Vec<f64> = vec![];
//! let config = FitConfiguration::new((480.0, 515.0))
//!     .with_parameter("n_sig", 500.0, (Some(0.0), None))
//!     .with_parameter("m", 497.0, (490.0, 505.0))
//!     .with_parameter("sL", 2.0, (0.1, 10.0))
//!     .with_parameter("sR", 2.0, (0.1, 10.0))
//!     .with_parameter("aL", 0.1, (0.0, 1.0))
//!     .with_parameter("aR", 0.1, (0.0, 1.0))
//!     .with_parameter("y0", 5.0, (Some(0.0), None))
//!     .with_free_parameter("dy", 0.0)
//!     .with_constraint("sL", 2.0, 0.5);
//! let mut fitter = Fitter::peak(&masses, config).unwrap();
//! let result = fitter.fit().unwrap();
//! println!("m = {} ± {}", result.value("m").unwrap(), result.error("m").unwrap());
//! // narrow the mass window for a second fit
//! let limits = fitter.limits(2.0, &["m", "sL"], &Default::default()).unwrap();
//! ```
//! An invalid fit (no convergence or a Hessian which is not positive definite) is reported
//! with `valid = false` and a `tracing` warning rather than an error.
//!
//! ## Fitting Measured Cross Sections
//! [`CrossSectionModel`] implements [`Curve`](crate::traits::Curve), so it can be fitted to
//! measured points with [`Fitter::least_squares`]. The parameter names are listed in
//! [`PARAMETER_NAMES`](crate::amplitudes::form_factor::PARAMETER_NAMES).
//!
//! # Radiative Corrections
//! [`RadiativeCorrection`] takes a tabulated Born cross section and integrates it against the
//! initial-state radiator, optionally weighted by a [`RegistrationEfficiency`] of the photon
//! energy:
//! ```rust
//! use kaonff::RadiativeCorrection;
//!
//! let energies: Vec<f64> = (0..20).map(|i| 505.0 + 5.0 * i as f64).collect();
//! let born = vec![20.0; energies.len()];
//! let rc = RadiativeCorrection::new(&energies, &born).unwrap();
//! let delta = rc.correction(550.0, None, 0.2).unwrap();
//! assert!(delta.value > 0.5 && delta.value < 1.5);
//! ```
//!
//! # Parallelism
//! The `rayon` feature evaluates vectorized models and likelihood sums in parallel and runs
//! [`fit_all`] over independent fitters concurrently.
#![warn(clippy::perf, clippy::style, missing_docs)]

/// Resonances, form factors, cross sections, and radiative corrections.
pub mod amplitudes {
    pub use kaonff_amplitudes::*;
}

/// Likelihoods, fitting, and peak shapes.
pub mod extensions {
    pub use kaonff_extensions::*;
}

/// Utility functions, enums, and statistics.
pub mod utils {
    pub use kaonff_core::utils::*;
}

/// Useful traits for all crate structs
pub mod traits {
    pub use kaonff_core::traits::*;
    pub use kaonff_extensions::likelihoods::LikelihoodTerm;
}

pub use kaonff_amplitudes::*;
pub use kaonff_core::utils::quadrature::{integrate, Integral};
pub use kaonff_core::utils::statistics::{
    chi2_ndf, efficiency, efficiency_error, Chi2, RegistrationEfficiency,
};
pub use kaonff_core::{
    FitMode, Float, KaonChannel, KaonffError, KaonffResult, PhysicalConstants, CONSTANTS, PI,
};
pub use kaonff_extensions::*;
pub use num::complex::Complex64;
pub use serde::{Deserialize, Serialize};
