use kaonff_core::{Float, PhysicalConstants};
use num::complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::widths::WidthFunction;

/// A relativistic Breit-Wigner propagator with an energy-dependent width, normalized to
/// $`\imath M/\Gamma(M^2)`$ at the pole:
///
/// ```math
/// BW(s; M, \Gamma_0) = \frac{M^2}{M^2 - s - \imath M \Gamma(s)}
/// ```
///
/// where $`\Gamma(s)`$ is given by `width_function` evaluated with nominal width $`\Gamma_0`$.
pub fn breit_wigner(
    s: Float,
    mass: Float,
    width: Float,
    width_function: WidthFunction,
    constants: &PhysicalConstants,
) -> Complex64 {
    let m_sq = mass * mass;
    let gamma = width_function.evaluate(s, width, mass, constants);
    Complex64::from(m_sq) / Complex64::new(m_sq - s, -mass * gamma)
}

/// The mass, nominal width, and width function of a single vector resonance.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResonanceParameters {
    /// Mass (MeV)
    pub mass: Float,
    /// Nominal width (MeV)
    pub width: Float,
    /// Energy dependence of the width
    pub width_function: WidthFunction,
}

impl ResonanceParameters {
    /// Construct a new resonance.
    pub fn new(mass: Float, width: Float, width_function: WidthFunction) -> Self {
        Self {
            mass,
            width,
            width_function,
        }
    }
    /// $`\rho(770)`$ with the given constants.
    pub fn rho(constants: &PhysicalConstants) -> Self {
        Self::new(constants.m_rho, constants.w0_rho, WidthFunction::Rho)
    }
    /// $`\omega(782)`$ with the given constants.
    pub fn omega(constants: &PhysicalConstants) -> Self {
        Self::new(constants.m_omega, constants.w0_omega, WidthFunction::Omega)
    }
    /// $`\phi(1020)`$ with the given constants.
    pub fn phi(constants: &PhysicalConstants) -> Self {
        Self::new(constants.m_phi, constants.w0_phi, WidthFunction::Phi)
    }
    /// $`\rho(1450)`$
    pub fn rho_1450() -> Self {
        Self::new(1465.0, 400.0, WidthFunction::Rho1450)
    }
    /// $`\rho(1700)`$
    pub fn rho_1700() -> Self {
        Self::new(1720.0, 250.0, WidthFunction::RhoPiPi)
    }
    /// $`\omega(1420)`$
    pub fn omega_1420() -> Self {
        Self::new(1420.0, 220.0, WidthFunction::Omega1420)
    }
    /// $`\omega(1650)`$ at its fitted mass of 1670 MeV
    pub fn omega_1650() -> Self {
        Self::new(1670.0, 315.0, WidthFunction::OmegaPiPi)
    }
    /// $`\phi(1680)`$
    pub fn phi_1680() -> Self {
        Self::new(1673.0, 182.0, WidthFunction::Phi1680)
    }
    /// $`\phi(2170)`$
    pub fn phi_2170() -> Self {
        Self::new(2198.0, 71.0, WidthFunction::Phi1680)
    }
    /// Evaluate the propagator at squared energy `s` (MeV$`^2`$).
    pub fn propagator(&self, s: Float, constants: &PhysicalConstants) -> Complex64 {
        breit_wigner(s, self.mass, self.width, self.width_function, constants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kaonff_core::CONSTANTS;

    #[test]
    fn test_pole_behavior() {
        for res in [
            ResonanceParameters::rho(&CONSTANTS),
            ResonanceParameters::omega(&CONSTANTS),
            ResonanceParameters::phi(&CONSTANTS),
            ResonanceParameters::phi_1680(),
            ResonanceParameters::rho_1700(),
            ResonanceParameters::omega_1420(),
            ResonanceParameters::omega_1650(),
        ] {
            let s0 = res.mass * res.mass;
            let at_pole = res.propagator(s0, &CONSTANTS);
            assert_relative_eq!(at_pole.arg(), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
            assert_relative_eq!(at_pole.norm(), res.mass / res.width, max_relative = 1e-12);
            let delta = res.mass * res.width;
            assert!(at_pole.norm() > res.propagator(s0 - delta, &CONSTANTS).norm());
            assert!(at_pole.norm() > res.propagator(s0 + delta, &CONSTANTS).norm());
        }
    }

    #[test]
    fn test_far_below_pole() {
        let bw = ResonanceParameters::phi(&CONSTANTS).propagator(0.0, &CONSTANTS);
        assert_relative_eq!(bw.re, 1.0);
        assert_eq!(bw.im, 0.0);
    }
}
