use kaonff_core::{Float, KaonChannel, KaonffError, KaonffResult, PhysicalConstants, CONSTANTS};
use num::complex::Complex64;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{breit_wigner::ResonanceParameters, widths::WidthFunction};

/// The number of entries in a raw form-factor parameter vector.
pub const N_PARAMETERS: usize = 24;

/// Names of the raw form-factor parameters, indexed as in the parameter vector.
pub const PARAMETER_NAMES: [&str; N_PARAMETERS] = [
    "n",
    "c_rho1",
    "c_rho2",
    "c_rho3",
    "c_phi1",
    "c_phi2",
    "m_rho1700",
    "w_rho1700",
    "m_omega1650",
    "w_omega1650",
    "m_phi1680",
    "w_phi1680",
    "m_v2150",
    "w_v2150",
    "m_rho1450",
    "w_rho1450",
    "m_omega1420",
    "w_omega1420",
    "m_phi2170",
    "w_phi2170",
    "c_omega0",
    "c_omega1",
    "c_omega2",
    "c_omega3",
];

/// A (mass, width) pair of an excited state in MeV.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MassWidth {
    /// Mass (MeV)
    pub mass: Float,
    /// Nominal width (MeV)
    pub width: Float,
}

impl MassWidth {
    fn new(mass: Float, width: Float) -> Self {
        Self { mass, width }
    }

    fn with(&self, width_function: WidthFunction) -> ResonanceParameters {
        ResonanceParameters::new(self.mass, self.width, width_function)
    }
}

/// A typed view of the raw 24-entry parameter vector of the form factor.
///
/// The free coupling coefficients are $`C_{\rho,1..3}`$, $`C_{\omega,0..3}`$ and
/// $`C_{\phi,1..2}`$; the remaining $`C_{\rho,4}`$ and $`C_{\phi,3}`$ are fixed by the
/// normalization conditions (see [`Coefficients::derive`]).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormFactorParameters {
    /// Isospin-breaking factor multiplying the ground-state $`\phi`$ term in the neutral channel
    /// (ignored for the charged channel)
    pub isospin_factor: Float,
    /// $`C_{\rho,1..3}`$
    pub c_rho: [Float; 3],
    /// $`C_{\phi,1..2}`$
    pub c_phi: [Float; 2],
    /// $`C_{\omega,0..3}`$
    pub c_omega: [Float; 4],
    /// $`\rho(1450)`$
    pub rho_1450: MassWidth,
    /// $`\rho(1700)`$
    pub rho_1700: MassWidth,
    /// $`\omega(1420)`$
    pub omega_1420: MassWidth,
    /// $`\omega(1650)`$
    pub omega_1650: MassWidth,
    /// A heavy state shared by the third excited $`\rho`$ and $`\omega`$ terms
    pub v_2150: MassWidth,
    /// $`\phi(1680)`$
    pub phi_1680: MassWidth,
    /// $`\phi(2170)`$
    pub phi_2170: MassWidth,
}

impl Default for FormFactorParameters {
    /// Ground-state dominance with literature masses and widths for the excited states.
    fn default() -> Self {
        Self {
            isospin_factor: 1.0,
            c_rho: [1.0, 0.0, 0.0],
            c_phi: [1.0, 0.0],
            c_omega: [1.0, 0.0, 0.0, 0.0],
            rho_1450: MassWidth::new(1465.0, 400.0),
            rho_1700: MassWidth::new(1720.0, 250.0),
            omega_1420: MassWidth::new(1420.0, 220.0),
            omega_1650: MassWidth::new(1670.0, 315.0),
            v_2150: MassWidth::new(2150.0, 350.0),
            phi_1680: MassWidth::new(1673.0, 182.0),
            phi_2170: MassWidth::new(2198.0, 71.0),
        }
    }
}

impl FormFactorParameters {
    /// Build the typed view from a raw parameter vector ordered as [`PARAMETER_NAMES`].
    ///
    /// # Errors
    ///
    /// Returns [`KaonffError::ParameterLengthError`] if `p` does not have exactly
    /// [`N_PARAMETERS`] entries.
    pub fn from_slice(p: &[Float]) -> KaonffResult<Self> {
        if p.len() != N_PARAMETERS {
            return Err(KaonffError::ParameterLengthError {
                expected: N_PARAMETERS,
                got: p.len(),
            });
        }
        Ok(Self {
            isospin_factor: p[0],
            c_rho: [p[1], p[2], p[3]],
            c_phi: [p[4], p[5]],
            rho_1700: MassWidth::new(p[6], p[7]),
            omega_1650: MassWidth::new(p[8], p[9]),
            phi_1680: MassWidth::new(p[10], p[11]),
            v_2150: MassWidth::new(p[12], p[13]),
            rho_1450: MassWidth::new(p[14], p[15]),
            omega_1420: MassWidth::new(p[16], p[17]),
            phi_2170: MassWidth::new(p[18], p[19]),
            c_omega: [p[20], p[21], p[22], p[23]],
        })
    }

    /// The raw parameter vector, ordered as [`PARAMETER_NAMES`].
    pub fn to_vec(&self) -> Vec<Float> {
        vec![
            self.isospin_factor,
            self.c_rho[0],
            self.c_rho[1],
            self.c_rho[2],
            self.c_phi[0],
            self.c_phi[1],
            self.rho_1700.mass,
            self.rho_1700.width,
            self.omega_1650.mass,
            self.omega_1650.width,
            self.phi_1680.mass,
            self.phi_1680.width,
            self.v_2150.mass,
            self.v_2150.width,
            self.rho_1450.mass,
            self.rho_1450.width,
            self.omega_1420.mass,
            self.omega_1420.width,
            self.phi_2170.mass,
            self.phi_2170.width,
            self.c_omega[0],
            self.c_omega[1],
            self.c_omega[2],
            self.c_omega[3],
        ]
    }
}

/// Coupling coefficients derived from [`FormFactorParameters`] for a given channel.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    /// $`C_\rho`$, closed so that the four entries sum to one
    pub c_rho: [Float; 4],
    /// $`C_\omega`$
    pub c_omega: [Float; 4],
    /// $`C_\phi`$, closed so that $`\sum C_\phi + \sum C_\omega / 2 = 3/2`$
    pub c_phi: [Float; 3],
    /// $`K_\rho = \pm C_\rho / 2`$ (positive for charged kaons)
    pub k_rho: [Float; 4],
    /// $`K_\omega = C_\omega / 6`$
    pub k_omega: [Float; 4],
    /// $`K_\phi = C_\phi / 3`$
    pub k_phi: [Float; 3],
    /// The factor multiplying the ground-state $`\phi`$ term
    pub isospin_factor: Float,
}

impl Coefficients {
    /// Apply the normalization conditions and isospin signs to the free coefficients.
    pub fn derive(params: &FormFactorParameters, channel: KaonChannel) -> Self {
        let [r1, r2, r3] = params.c_rho;
        let c_rho = [r1, r2, r3, 1.0 - (r1 + r2 + r3)];
        let c_omega = params.c_omega;
        let [p1, p2] = params.c_phi;
        let c_phi = [p1, p2, 1.5 - c_omega.iter().sum::<Float>() / 2.0 - (p1 + p2)];
        let (rho_sign, isospin_factor) = match channel {
            KaonChannel::Charged => (1.0, 1.0),
            KaonChannel::Neutral => (-1.0, params.isospin_factor),
        };
        Self {
            c_rho,
            c_omega,
            c_phi,
            k_rho: c_rho.map(|c| rho_sign * c / 2.0),
            k_omega: c_omega.map(|c| c / 6.0),
            k_phi: c_phi.map(|c| c / 3.0),
            isospin_factor,
        }
    }
}

/// The kaon electromagnetic form factor in the vector-meson-dominance model with the ground
/// $`\rho, \omega, \phi`$ states and their excitations:
///
/// ```math
/// F(s) = \sum_{V} K_V \, BW_V(s)
/// ```
///
/// with $`K_V`$ from [`Coefficients::derive`].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormFactor {
    channel: KaonChannel,
    constants: PhysicalConstants,
}

impl FormFactor {
    /// The form factor of the given kaon channel with the default [`CONSTANTS`].
    pub fn new(channel: KaonChannel) -> Self {
        Self::with_constants(channel, CONSTANTS)
    }

    /// The form factor of the given kaon channel with custom constants.
    pub fn with_constants(channel: KaonChannel, constants: PhysicalConstants) -> Self {
        Self { channel, constants }
    }

    /// The kaon channel.
    pub fn channel(&self) -> KaonChannel {
        self.channel
    }

    /// The physical constants in use.
    pub fn constants(&self) -> &PhysicalConstants {
        &self.constants
    }

    /// The ground-state contribution
    /// $`K_\rho BW_\rho + K_\omega BW_\omega + n K_\phi BW_\phi`$ at center-of-mass energy `x`
    /// (GeV).
    pub fn base_amplitude(
        &self,
        x: Float,
        k_rho: Float,
        k_omega: Float,
        k_phi: Float,
        isospin_factor: Float,
    ) -> Complex64 {
        let s = (x * 1e3).powi(2);
        self.base_amplitude_s(s, k_rho, k_omega, k_phi, isospin_factor)
    }

    fn base_amplitude_s(
        &self,
        s: Float,
        k_rho: Float,
        k_omega: Float,
        k_phi: Float,
        isospin_factor: Float,
    ) -> Complex64 {
        let c = &self.constants;
        ResonanceParameters::rho(c).propagator(s, c) * k_rho
            + ResonanceParameters::omega(c).propagator(s, c) * k_omega
            + ResonanceParameters::phi(c).propagator(s, c) * (isospin_factor * k_phi)
    }

    /// Evaluate the form factor at center-of-mass energy `x` (GeV).
    pub fn evaluate(&self, x: Float, params: &FormFactorParameters) -> Complex64 {
        self.evaluate_s((x * 1e3).powi(2), params)
    }

    /// Evaluate the form factor at squared center-of-mass energy `s` (MeV$`^2`$).
    pub fn evaluate_s(&self, s: Float, params: &FormFactorParameters) -> Complex64 {
        let k = Coefficients::derive(params, self.channel);
        self.evaluate_with(s, params, &k)
    }

    fn evaluate_with(
        &self,
        s: Float,
        params: &FormFactorParameters,
        k: &Coefficients,
    ) -> Complex64 {
        let c = &self.constants;
        let bw = |mw: &MassWidth, width_function| mw.with(width_function).propagator(s, c);
        self.base_amplitude_s(s, k.k_rho[0], k.k_omega[0], k.k_phi[0], k.isospin_factor)
            + bw(&params.rho_1450, WidthFunction::Rho1450) * k.k_rho[1]
            + bw(&params.rho_1700, WidthFunction::RhoPiPi) * k.k_rho[2]
            + bw(&params.v_2150, WidthFunction::RhoPiPi) * k.k_rho[3]
            + bw(&params.omega_1420, WidthFunction::Omega1420) * k.k_omega[1]
            + bw(&params.omega_1650, WidthFunction::OmegaPiPi) * k.k_omega[2]
            + bw(&params.v_2150, WidthFunction::OmegaPiPi) * k.k_omega[3]
            + bw(&params.phi_1680, WidthFunction::Phi1680) * k.k_phi[1]
            + bw(&params.phi_2170, WidthFunction::Phi1680) * k.k_phi[2]
    }

    /// Evaluate the form factor at each energy in `xs` (GeV).
    #[cfg(feature = "rayon")]
    pub fn evaluate_many(&self, xs: &[Float], params: &FormFactorParameters) -> Vec<Complex64> {
        let k = Coefficients::derive(params, self.channel);
        xs.par_iter()
            .map(|&x| self.evaluate_with((x * 1e3).powi(2), params, &k))
            .collect()
    }

    /// Evaluate the form factor at each energy in `xs` (GeV).
    #[cfg(not(feature = "rayon"))]
    pub fn evaluate_many(&self, xs: &[Float], params: &FormFactorParameters) -> Vec<Complex64> {
        let k = Coefficients::derive(params, self.channel);
        xs.iter()
            .map(|&x| self.evaluate_with((x * 1e3).powi(2), params, &k))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_parameters() -> FormFactorParameters {
        let mut p = FormFactorParameters::default();
        p.isospin_factor = 1.027;
        p.c_rho = [1.1, -0.15, 0.08];
        p.c_phi = [1.02, -0.03];
        p.c_omega = [1.3, -0.2, 0.1, -0.05];
        p
    }

    #[test]
    fn test_parameter_slice() {
        let p = test_parameters();
        let raw = p.to_vec();
        assert_eq!(raw.len(), N_PARAMETERS);
        assert_eq!(FormFactorParameters::from_slice(&raw).unwrap(), p);
        assert_eq!(raw[14], 1465.0);
        assert_eq!(raw[18], 2198.0);
        assert!(matches!(
            FormFactorParameters::from_slice(&raw[..23]),
            Err(KaonffError::ParameterLengthError {
                expected: 24,
                got: 23
            })
        ));
    }

    #[test]
    fn test_coefficient_closure() {
        let p = test_parameters();
        for channel in [KaonChannel::Charged, KaonChannel::Neutral] {
            let k = Coefficients::derive(&p, channel);
            assert_relative_eq!(k.c_rho.iter().sum::<Float>(), 1.0, epsilon = 1e-14);
            assert_relative_eq!(
                k.c_phi.iter().sum::<Float>() + k.c_omega.iter().sum::<Float>() / 2.0,
                1.5,
                epsilon = 1e-14
            );
        }
        let charged = Coefficients::derive(&p, KaonChannel::Charged);
        let neutral = Coefficients::derive(&p, KaonChannel::Neutral);
        assert_relative_eq!(charged.k_rho[0], -neutral.k_rho[0]);
        assert_relative_eq!(charged.k_omega[2], neutral.k_omega[2]);
        assert_eq!(charged.isospin_factor, 1.0);
        assert_eq!(neutral.isospin_factor, 1.027);
    }

    #[test]
    fn test_ground_state_limit() {
        let ff = FormFactor::new(KaonChannel::Charged);
        let p = FormFactorParameters::default();
        let k = Coefficients::derive(&p, KaonChannel::Charged);
        assert_eq!(k.c_phi[2], 0.0);
        let x = 1.05;
        let full = ff.evaluate(x, &p);
        let base = ff.base_amplitude(x, 0.5, 1.0 / 6.0, 1.0 / 3.0, 1.0);
        assert_relative_eq!(full.re, base.re, max_relative = 1e-12);
        assert_relative_eq!(full.im, base.im, max_relative = 1e-12);
        // F(0) = 1 for charged kaons in the ground-state limit
        let at_zero = ff.evaluate(0.0, &p);
        assert_relative_eq!(at_zero.re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_phi_peak_dominates() {
        let p = test_parameters();
        let ff = FormFactor::new(KaonChannel::Neutral);
        let on_peak = ff.evaluate(CONSTANTS.m_phi * 1e-3, &p).norm();
        let off_peak = ff.evaluate(1.1, &p).norm();
        assert!(on_peak > 10.0 * off_peak);
        let many = ff.evaluate_many(&[1.0, 1.02, 1.1], &p);
        assert_eq!(many.len(), 3);
        assert_relative_eq!(many[2].re, ff.evaluate(1.1, &p).re);
    }
}
