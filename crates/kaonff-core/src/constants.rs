use serde::{Deserialize, Serialize};

use crate::Float;

/// Particle masses and nominal widths (in MeV) together with the fine-structure constant and the
/// cross-section unit conversion constant $`(\hbar c)^2`$ (in MeV$`^2`$ nb).
///
/// A single read-only instance, [`CONSTANTS`], is shared by every model in the library.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicalConstants {
    /// Fine-structure constant $`\alpha`$
    pub alpha: Float,
    /// Conversion constant from MeV$`^{-2}`$ to nb
    pub conversion: Float,
    /// $`\phi(1020)`$ mass
    pub m_phi: Float,
    /// $`\rho(770)`$ mass
    pub m_rho: Float,
    /// $`\omega(782)`$ mass
    pub m_omega: Float,
    /// Neutral kaon mass
    pub m_k0: Float,
    /// Neutral pion mass
    pub m_pi0: Float,
    /// Charged kaon mass
    pub m_kc: Float,
    /// Charged pion mass
    pub m_pic: Float,
    /// $`K^*(892)`$ mass
    pub m_kstar: Float,
    /// $`\eta`$ mass
    pub m_eta: Float,
    /// $`\phi(1020)`$ nominal width
    pub w0_phi: Float,
    /// $`\rho(770)`$ nominal width
    pub w0_rho: Float,
    /// $`\omega(782)`$ nominal width
    pub w0_omega: Float,
}

/// The constants used by all published fits of the model.
pub const CONSTANTS: PhysicalConstants = PhysicalConstants {
    alpha: 7.297352e-3,
    conversion: 0.3893793656e12,
    m_phi: 1019.464,
    m_rho: 775.26,
    m_omega: 782.65,
    m_k0: 497.611,
    m_pi0: 135.0,
    m_kc: 493.677,
    m_pic: 139.57,
    m_kstar: 891.76,
    m_eta: 547.862,
    w0_phi: 4.247,
    w0_rho: 149.1,
    w0_omega: 8.49,
};

impl Default for PhysicalConstants {
    fn default() -> Self {
        CONSTANTS
    }
}
