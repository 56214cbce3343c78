use kaonff_core::{Float, PhysicalConstants};
use serde::{Deserialize, Serialize};

use crate::phase_space::{
    radiative_decay, three_body_ratio, two_body_equal_mass, two_body_unequal_mass,
    ThreeBodyChannel,
};

const OMEGA_BR_3PI: Float = 0.892;
const OMEGA_BR_PI0_GAMMA: Float = 0.084;
const OMEGA_BR_2PI: Float = 0.0153;

const PHI_BR_KC: Float = 0.492;
const PHI_BR_K0: Float = 0.34;
const PHI_BR_3PI: Float = 0.1524;
const PHI_BR_ETA_GAMMA: Float = 0.01303;

/// An energy-dependent width $`\Gamma(s) = \Gamma_0 \sum_i \mathcal{B}_i P_i(s)`$ where each
/// $`P_i`$ is a decay-channel phase space normalized to one at the resonance mass.
///
/// Any branching fraction not covered by the listed channels is folded into the dominant one,
/// so $`\Gamma(M^2) = \Gamma_0`$.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WidthFunction {
    /// $`\rho\to\pi^+\pi^-`$
    Rho,
    /// $`\omega\to 3\pi, \pi^0\gamma, \pi^+\pi^-`$
    Omega,
    /// $`\phi\to K^+K^-, K_SK_L, 3\pi, \eta\gamma`$
    Phi,
    /// $`\phi(1680)\to K^*K`$
    Phi1680,
    /// $`\rho(1450)\to\omega\pi^0`$
    Rho1450,
    /// $`\rho(1700)\to\rho\pi\pi`$
    RhoPiPi,
    /// $`\omega(1420)\to\rho\pi`$
    Omega1420,
    /// $`\omega(1650)\to\omega\pi\pi`$
    OmegaPiPi,
    /// $`\pi^+\pi^-`$ only
    RhoX,
    /// $`\rho\pi^0`$ only
    OmegaX,
    /// $`K^+K^-`$ only
    PhiX,
}

impl WidthFunction {
    /// Evaluate $`\Gamma(s)`$ for a resonance with mass `mass` and nominal width `width`.
    pub fn evaluate(
        &self,
        s: Float,
        width: Float,
        mass: Float,
        constants: &PhysicalConstants,
    ) -> Float {
        let c = constants;
        match self {
            Self::Rho => width * two_body_equal_mass(s, mass, c.m_pic),
            Self::Omega => {
                let other = 1.0 - (OMEGA_BR_3PI + OMEGA_BR_PI0_GAMMA + OMEGA_BR_2PI);
                width
                    * ((OMEGA_BR_3PI + other)
                        * three_body_ratio(s, mass, ThreeBodyChannel::ThreePi, c)
                        + OMEGA_BR_PI0_GAMMA * radiative_decay(s, mass, c.m_pi0)
                        + OMEGA_BR_2PI * two_body_equal_mass(s, mass, c.m_pic))
            }
            Self::Phi => {
                let other = 1.0 - (PHI_BR_KC + PHI_BR_K0 + PHI_BR_3PI + PHI_BR_ETA_GAMMA);
                width
                    * ((PHI_BR_KC + other) * two_body_equal_mass(s, mass, c.m_kc)
                        + PHI_BR_K0 * two_body_equal_mass(s, mass, c.m_k0)
                        + PHI_BR_3PI * three_body_ratio(s, mass, ThreeBodyChannel::ThreePi, c)
                        + PHI_BR_ETA_GAMMA * radiative_decay(s, mass, c.m_eta))
            }
            Self::Phi1680 => width * two_body_unequal_mass(s, mass, c.m_kc, c.m_kstar),
            Self::Rho1450 => width * two_body_unequal_mass(s, mass, c.m_pi0, c.m_omega),
            Self::RhoPiPi => width * three_body_ratio(s, mass, ThreeBodyChannel::RhoPiPi, c),
            Self::Omega1420 => width * two_body_unequal_mass(s, mass, c.m_pi0, c.m_rho),
            Self::OmegaPiPi => width * three_body_ratio(s, mass, ThreeBodyChannel::OmegaPiPi, c),
            Self::RhoX => width * two_body_equal_mass(s, mass, c.m_pic),
            Self::OmegaX => width * two_body_unequal_mass(s, mass, c.m_rho, c.m_pi0),
            Self::PhiX => width * two_body_equal_mass(s, mass, c.m_kc),
        }
    }
}
