use kaonff_core::{Float, PhysicalConstants};
use serde::{Deserialize, Serialize};

/// The velocity $`\beta = P/E`$ of each particle of mass `mass` in a symmetric pair produced at
/// squared center-of-mass energy `s`, where $`E = \sqrt{s}/2`$.
///
/// Returns exactly zero below threshold (including $`s \leq 0`$).
pub fn beta_factor(s: Float, mass: Float) -> Float {
    if s <= 0.0 {
        return 0.0;
    }
    let e = s.sqrt() / 2.0;
    if e < mass {
        return 0.0;
    }
    (e * e - mass * mass).sqrt() / e
}

/// The breakup momentum of a state with invariant mass `m` into daughters with masses `m1` and
/// `m2`, or zero if $`m \leq m_1 + m_2`$.
///
/// ```math
/// q = \frac{\sqrt{(m^2 - (m_1 - m_2)^2)(m^2 - (m_1 + m_2)^2)}}{2m}
/// ```
pub fn breakup_momentum(m: Float, m1: Float, m2: Float) -> Float {
    if m <= m1 + m2 {
        return 0.0;
    }
    let m2_sq = m * m;
    ((m2_sq - (m1 - m2).powi(2)) * (m2_sq - (m1 + m2).powi(2))).sqrt() / (2.0 * m)
}

/// The P-wave phase space of a resonance of mass `resonance_mass` decaying into two particles
/// of equal mass `daughter_mass`, normalized to one at the resonance mass:
///
/// ```math
/// \left(\frac{s - 4m^2}{M^2 - 4m^2}\right)^{3/2}\frac{M^2}{s}
/// ```
pub fn two_body_equal_mass(s: Float, resonance_mass: Float, daughter_mass: Float) -> Float {
    let threshold = 4.0 * daughter_mass * daughter_mass;
    if s <= threshold {
        return 0.0;
    }
    let m_sq = resonance_mass * resonance_mass;
    ((s - threshold) / (m_sq - threshold)).powf(1.5) * m_sq / s
}

/// The P-wave phase space $`(q(\sqrt{s})/q(M))^3`$ for a decay into two particles with masses
/// `m_i` and `m_j`.
pub fn two_body_unequal_mass(s: Float, resonance_mass: Float, m_i: Float, m_j: Float) -> Float {
    if s <= 0.0 {
        return 0.0;
    }
    let q = breakup_momentum(s.sqrt(), m_i, m_j);
    if q == 0.0 {
        return 0.0;
    }
    let q0 = breakup_momentum(resonance_mass, m_i, m_j);
    (q / q0).powi(3)
}

/// The radiative-decay phase space for $`X\to Y\gamma`$ with photon energy
/// $`k = (s - m_Y^2)/(2\sqrt{s})`$, normalized to one at the resonance mass:
/// $`(k(s)/k(M^2))^3`$. Zero where the photon energy would be negative.
pub fn radiative_decay(s: Float, resonance_mass: Float, daughter_mass: Float) -> Float {
    if s <= 0.0 {
        return 0.0;
    }
    let k = ((s - daughter_mass.powi(2)) / (2.0 * s.sqrt())).powi(3);
    if k <= 0.0 {
        return 0.0;
    }
    let k0 = ((resonance_mass.powi(2) - daughter_mass.powi(2)) / (2.0 * resonance_mass)).powi(3);
    k / k0
}

/// Three-body final states whose phase space is described by an empirical polynomial.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreeBodyChannel {
    /// $`\rho\pi\pi`$
    RhoPiPi,
    /// $`\omega\pi\pi`$
    OmegaPiPi,
    /// $`\pi^+\pi^-\pi^0`$
    ThreePi,
}

impl ThreeBodyChannel {
    fn breakpoint(&self) -> Float {
        match self {
            Self::RhoPiPi | Self::OmegaPiPi => 1.2,
            Self::ThreePi => 1.0,
        }
    }

    fn coefficients(&self, below: bool) -> [Float; 6] {
        match (self, below) {
            (Self::RhoPiPi, true) => [1.9e-3, 2.68e-2, 2.446e-1, 3.1487, 23.3131, 59.7669],
            (Self::RhoPiPi, false) => [1.9e-3, 2.33e-2, 6.65e-2, -3.84e-2, 2.36e-2, -6.5e-3],
            (Self::OmegaPiPi, true) => [1.7e-3, 2.61e-2, 2.67e-1, 3.61199, 27.6, 73.6433],
            (Self::OmegaPiPi, false) => [1.7e-3, 2.18e-2, 6.89e-2, -4.52e-2, 3.25e-2, -1.09e-2],
            (Self::ThreePi, true) => [5.196, 59.17, 227.7, 147.0, -998.0, -1712.0],
            (Self::ThreePi, false) => [5.196, 80.0, 200.0, 590.0, -510.0, 220.0],
        }
    }

    /// The lowest $`\sqrt{s}`$ (MeV) at which the channel is open, if the ratio is guarded.
    fn threshold(&self, constants: &PhysicalConstants) -> Option<Float> {
        match self {
            Self::RhoPiPi => Some(constants.m_rho + 2.0 * constants.m_pi0),
            Self::OmegaPiPi => Some(constants.m_omega + 2.0 * constants.m_pi0),
            Self::ThreePi => None,
        }
    }
}

/// The empirical three-body phase-space polynomial at squared energy `s` (MeV$`^2`$).
///
/// The polynomial is a quintic in $`d = e - e_0`$ where $`e = \sqrt{s}`$ in GeV and $`e_0`$ is
/// the channel breakpoint (1.2 GeV for $`\rho\pi\pi`$ and $`\omega\pi\pi`$, 1.0 GeV for
/// $`3\pi`$). Separate coefficient sets are used on either side of the breakpoint.
pub fn three_body_empirical(s: Float, channel: ThreeBodyChannel) -> Float {
    let e = s.max(0.0).sqrt() * 1e-3;
    let e0 = channel.breakpoint();
    let d = e - e0;
    channel
        .coefficients(e < e0)
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * d + c)
}

/// The three-body phase space normalized to one at the resonance mass,
/// `three_body_empirical(s) / three_body_empirical(M^2)`.
///
/// The $`\rho\pi\pi`$ and $`\omega\pi\pi`$ ratios vanish at and below
/// $`m_\rho + 2m_{\pi^0}`$ and $`m_\omega + 2m_{\pi^0}`$ respectively. The $`3\pi`$ ratio is
/// only guarded against $`s \leq 0`$.
pub fn three_body_ratio(
    s: Float,
    resonance_mass: Float,
    channel: ThreeBodyChannel,
    constants: &PhysicalConstants,
) -> Float {
    if s <= 0.0 {
        return 0.0;
    }
    if let Some(threshold) = channel.threshold(constants) {
        if s.sqrt() <= threshold {
            return 0.0;
        }
    }
    three_body_empirical(s, channel) / three_body_empirical(resonance_mass.powi(2), channel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kaonff_core::CONSTANTS;

    #[test]
    fn test_beta_factor() {
        let m = CONSTANTS.m_k0;
        assert_eq!(beta_factor((2.0 * m).powi(2) * 0.99, m), 0.0);
        assert_eq!(beta_factor(0.0, m), 0.0);
        assert_eq!(beta_factor(-1.0, m), 0.0);
        assert_eq!(beta_factor((2.0 * m).powi(2), m), 0.0);
        let beta = beta_factor(1020.0f64.powi(2), m);
        assert!(beta > 0.0 && beta < 1.0);
        assert_relative_eq!(beta_factor(1e12, m), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_two_body_thresholds() {
        let m = CONSTANTS.m_rho;
        let mpi = CONSTANTS.m_pic;
        assert_eq!(two_body_equal_mass((2.0 * mpi).powi(2), m, mpi), 0.0);
        assert_eq!(two_body_equal_mass(1000.0, m, mpi), 0.0);
        assert_relative_eq!(two_body_equal_mass(m * m, m, mpi), 1.0);
        assert!(two_body_equal_mass(600.0f64.powi(2), m, mpi) > 0.0);

        let (mi, mj) = (CONSTANTS.m_kc, CONSTANTS.m_kstar);
        assert_eq!(two_body_unequal_mass((mi + mj).powi(2), 1673.0, mi, mj), 0.0);
        assert_eq!(two_body_unequal_mass(-5.0, 1673.0, mi, mj), 0.0);
        assert_relative_eq!(two_body_unequal_mass(1673.0f64.powi(2), 1673.0, mi, mj), 1.0);
        assert!(two_body_unequal_mass(1500.0f64.powi(2), 1673.0, mi, mj) > 0.0);
    }

    #[test]
    fn test_radiative_decay() {
        let m = CONSTANTS.m_omega;
        let mpi = CONSTANTS.m_pi0;
        assert_eq!(radiative_decay((mpi * 0.9).powi(2), m, mpi), 0.0);
        assert_eq!(radiative_decay(0.0, m, mpi), 0.0);
        assert_relative_eq!(radiative_decay(m * m, m, mpi), 1.0);
    }

    #[test]
    fn test_three_body() {
        // continuity at the breakpoints
        for channel in [
            ThreeBodyChannel::RhoPiPi,
            ThreeBodyChannel::OmegaPiPi,
            ThreeBodyChannel::ThreePi,
        ] {
            let e0 = channel.breakpoint() * 1e3;
            assert_relative_eq!(
                three_body_empirical((e0 - 1e-6).powi(2), channel),
                three_body_empirical((e0 + 1e-6).powi(2), channel),
                max_relative = 1e-6
            );
        }
        assert_relative_eq!(
            three_body_empirical(1200.0f64.powi(2), ThreeBodyChannel::RhoPiPi),
            1.9e-3,
            max_relative = 1e-12
        );
        let threshold = CONSTANTS.m_rho + 2.0 * CONSTANTS.m_pi0;
        assert_eq!(
            three_body_ratio(
                threshold.powi(2),
                1720.0,
                ThreeBodyChannel::RhoPiPi,
                &CONSTANTS
            ),
            0.0
        );
        assert!(
            three_body_ratio(
                (threshold + 50.0).powi(2),
                1720.0,
                ThreeBodyChannel::RhoPiPi,
                &CONSTANTS
            ) > 0.0
        );
        assert_relative_eq!(
            three_body_ratio(
                1670.0f64.powi(2),
                1670.0,
                ThreeBodyChannel::OmegaPiPi,
                &CONSTANTS
            ),
            1.0
        );
        assert_eq!(
            three_body_ratio(0.0, 782.65, ThreeBodyChannel::ThreePi, &CONSTANTS),
            0.0
        );
        assert_relative_eq!(
            three_body_ratio(
                1019.464f64.powi(2),
                1019.464,
                ThreeBodyChannel::ThreePi,
                &CONSTANTS
            ),
            1.0
        );
    }
}
