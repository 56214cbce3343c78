use kaonff_core::{
    utils::{
        quadrature::{integrate_with, Integral, DEFAULT_ORDER},
        statistics::RegistrationEfficiency,
    },
    Float, KaonffError, KaonffResult, PI,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

const ALPHA: Float = 7.297e-3;
const ELECTRON_MASS: Float = 0.511;
const REL_TOL: Float = 1e-7;

/// The default beam-energy threshold (MeV) below which the Born cross section vanishes.
pub const DEFAULT_THRESHOLD: Float = 497.6;

/// Initial-state radiative corrections computed from a tabulated Born cross section.
///
/// The visible cross section at beam energy $`E`$ is
///
/// ```math
/// \sigma_{\text{vis}}(E) = \int_0^{x_{\max}} F(x, s)\,\sigma(E\sqrt{1 - x})\,\varepsilon(E x)\,dx
/// ```
///
/// with $`s = 4E^2`$, $`F`$ the radiator of [`RadiativeCorrection::radiator`], and
/// $`\varepsilon`$ an optional registration efficiency of the radiated photon energy. The Born
/// cross section between tabulated points is interpolated linearly in beam energy, clamped to
/// the last point above the table, and rises linearly from zero at the threshold below the
/// first point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadiativeCorrection {
    energies: Vec<Float>,
    cross_sections: Vec<Float>,
    threshold: Float,
}

impl RadiativeCorrection {
    /// Tabulate the Born cross section (nb) at beam energies (MeV) with the
    /// [`DEFAULT_THRESHOLD`].
    pub fn new(energies: &[Float], cross_sections: &[Float]) -> KaonffResult<Self> {
        Self::with_threshold(energies, cross_sections, DEFAULT_THRESHOLD)
    }

    /// Tabulate the Born cross section (nb) at beam energies (MeV) which vanishes at and below
    /// `threshold` (MeV).
    ///
    /// # Errors
    ///
    /// Returns an error if the table is empty or the two slices have different lengths.
    pub fn with_threshold(
        energies: &[Float],
        cross_sections: &[Float],
        threshold: Float,
    ) -> KaonffResult<Self> {
        if energies.len() != cross_sections.len() {
            return Err(KaonffError::Custom(format!(
                "Energies and cross sections have different lengths ({} vs {})",
                energies.len(),
                cross_sections.len()
            )));
        }
        let mut points: Vec<(Float, Float)> = energies
            .iter()
            .zip(cross_sections)
            .filter(|(e, _)| **e > threshold)
            .map(|(&e, &cs)| (e, cs))
            .collect();
        if points.is_empty() {
            return Err(KaonffError::Custom(format!(
                "No tabulated cross sections above the threshold {} MeV",
                threshold
            )));
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (energies, cross_sections) = points.into_iter().unzip();
        Ok(Self {
            energies,
            cross_sections,
            threshold,
        })
    }

    /// The beam-energy threshold (MeV).
    pub fn threshold(&self) -> Float {
        self.threshold
    }

    /// The interpolated Born cross section (nb) at beam energy `e_beam` (MeV).
    pub fn born(&self, e_beam: Float) -> Float {
        if e_beam <= self.threshold {
            return 0.0;
        }
        let n = self.energies.len();
        let i = self.energies.partition_point(|&e| e < e_beam);
        let ((e0, y0), (e1, y1)) = if i == 0 {
            (
                (self.threshold, 0.0),
                (self.energies[0], self.cross_sections[0]),
            )
        } else if i == n {
            return self.cross_sections[n - 1];
        } else {
            (
                (self.energies[i - 1], self.cross_sections[i - 1]),
                (self.energies[i], self.cross_sections[i]),
            )
        };
        y0 + (y1 - y0) * (e_beam - e0) / (e1 - e0)
    }

    fn log_term(s: Float) -> Float {
        (s / ELECTRON_MASS.powi(2)).ln()
    }

    /// The radiator exponent $`\beta = \frac{2\alpha}{\pi}(L - 1)`$ with
    /// $`L = \ln(s/m_e^2)`$.
    pub fn beta(s: Float) -> Float {
        (2.0 * ALPHA / PI) * (Self::log_term(s) - 1.0)
    }

    fn soft_factor(s: Float) -> Float {
        let b = Self::beta(s);
        let l = Self::log_term(s);
        let s1 = (ALPHA / PI) * (PI.powi(2) / 3.0 - 0.5) + 0.75 * b;
        let s2 = (-b.powi(2) / 24.0) * (l / 3.0 + 2.0 * PI.powi(2) - 37.0 / 4.0);
        1.0 + s1 + s2
    }

    /// The radiator without its integrable $`\beta x^{\beta-1}`$ soft-photon term.
    fn hard_part(x: Float, s: Float) -> Float {
        let b = Self::beta(s);
        let l = Self::log_term(s);
        let m = ELECTRON_MASS;
        let e = s.sqrt() / 4.0;
        let s3 = -b * (1.0 - x / 2.0);
        let s4 = 4.0 * (2.0 - x) * (1.0 / x).ln();
        let s5 = (1.0 / x) * (1.0 + 3.0 * (1.0 - x).powi(2)) * (1.0 / (1.0 - x)).ln();
        let s6 = -6.0 + x;
        let pair_threshold = 2.0 * m / e;
        let (s7, s8) = if x < pair_threshold {
            (0.0, 0.0)
        } else {
            let log_pair = (s * x * x / (m * m)).ln() - 5.0 / 3.0;
            (
                (1.0 / (6.0 * x))
                    * (x - pair_threshold).powf(b)
                    * log_pair.powi(2)
                    * (2.0 - 2.0 * x + x * x + (b / 3.0) * log_pair),
                (l.powi(2) / 2.0)
                    * ((2.0 / 3.0) * ((1.0 - (1.0 - x).powi(3)) / (1.0 - x))
                        - (2.0 - x) * (1.0 / (1.0 - x)).ln()
                        + x / 2.0),
            )
        };
        s3 + 0.125 * b.powi(2) * (s4 + s5 + s6) + (ALPHA / PI).powi(2) * (s7 + s8)
    }

    /// The probability density $`F(x, s)`$ for the initial state to radiate a fraction `x` of
    /// the beam energy at squared center-of-mass energy `s` (MeV$`^2`$), including virtual and
    /// soft corrections at second order and real pair emission.
    pub fn radiator(x: Float, s: Float) -> Float {
        let b = Self::beta(s);
        b * x.powf(b - 1.0) * Self::soft_factor(s) + Self::hard_part(x, s)
    }

    /// The visible cross section (nb) at beam energy `e_beam` (MeV), integrating the radiated
    /// energy fraction up to `x_max`, with an absolute error estimate.
    ///
    /// The $`x^{\beta-1}`$ endpoint singularity is removed by integrating over
    /// $`u = x^\beta`$.
    pub fn integral(
        &self,
        e_beam: Float,
        efficiency: Option<&RegistrationEfficiency>,
        x_max: Float,
    ) -> KaonffResult<Integral> {
        let s = 4.0 * e_beam * e_beam;
        // the Born cross section vanishes beyond this fraction
        let x_open = 1.0 - (self.threshold / e_beam).powi(2);
        let x_upper = x_max.min(x_open).min(1.0);
        if x_upper <= 0.0 {
            return Ok(Integral {
                value: 0.0,
                error: 0.0,
            });
        }
        let b = Self::beta(s);
        let soft = Self::soft_factor(s);
        let weight = |x: Float| {
            let eff = efficiency.map_or(1.0, |eff| eff.evaluate(e_beam * x * 1e-3));
            self.born(e_beam * (1.0 - x).sqrt()) * eff
        };
        let integrand = |u: Float| {
            let x = u.powf(1.0 / b);
            if x <= 0.0 {
                return soft * weight(0.0);
            }
            let jacobian = x / (b * u);
            soft * weight(x) + Self::hard_part(x, s) * jacobian * weight(x)
        };
        let result = integrate_with(integrand, 0.0, x_upper.powf(b), DEFAULT_ORDER, REL_TOL)?;
        debug!(
            e_beam,
            value = result.value,
            error = result.error,
            "radiative integral"
        );
        Ok(result)
    }

    /// The ratio of the visible to the Born cross section at `e_beam` (MeV), with its
    /// quadrature error.
    ///
    /// # Errors
    ///
    /// Returns an error if the Born cross section vanishes at `e_beam` or the integration fails.
    pub fn correction(
        &self,
        e_beam: Float,
        efficiency: Option<&RegistrationEfficiency>,
        x_max: Float,
    ) -> KaonffResult<Integral> {
        let born = self.born(e_beam);
        if born <= 0.0 {
            return Err(KaonffError::Custom(format!(
                "The Born cross section vanishes at {} MeV",
                e_beam
            )));
        }
        let integral = self.integral(e_beam, efficiency, x_max)?;
        Ok(Integral {
            value: integral.value / born,
            error: integral.error / born,
        })
    }

    /// Corrections at every tabulated beam energy.
    pub fn corrections(
        &self,
        efficiency: Option<&RegistrationEfficiency>,
        x_max: Float,
    ) -> KaonffResult<Vec<Integral>> {
        self.energies
            .iter()
            .map(|&e| self.correction(e, efficiency, x_max))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat_table() -> RadiativeCorrection {
        let energies: Vec<Float> = (0..40).map(|i| 500.0 + 5.0 * i as Float).collect();
        let cs = vec![10.0; energies.len()];
        RadiativeCorrection::new(&energies, &cs).unwrap()
    }

    #[test]
    fn test_born_interpolation() {
        let rc = RadiativeCorrection::new(&[520.0, 510.0, 400.0], &[30.0, 10.0, 99.0]).unwrap();
        assert_eq!(rc.born(497.6), 0.0);
        assert_eq!(rc.born(450.0), 0.0);
        assert_relative_eq!(rc.born(515.0), 20.0);
        assert_relative_eq!(rc.born(600.0), 30.0);
        assert_relative_eq!(rc.born(510.0), 10.0);
        assert!(rc.born(500.0) > 0.0 && rc.born(500.0) < 10.0);
        assert!(RadiativeCorrection::new(&[510.0], &[]).is_err());
        assert!(RadiativeCorrection::new(&[400.0], &[1.0]).is_err());
    }

    #[test]
    fn test_radiator_positive_soft_region() {
        let s = 4.0 * 510.0f64.powi(2);
        let b = RadiativeCorrection::beta(s);
        assert!(b > 0.06 && b < 0.09);
        assert!(RadiativeCorrection::radiator(1e-4, s) > RadiativeCorrection::radiator(1e-2, s));
        assert!(RadiativeCorrection::radiator(0.01, s) > 0.0);
    }

    #[test]
    fn test_flat_cross_section_correction() {
        // with a constant Born cross section the correction approaches the integral of the
        // radiator, which is close to one
        let rc = flat_table();
        let result = rc.correction(650.0, None, 0.2).unwrap();
        assert!(result.value > 0.8 && result.value < 1.2);
        assert!(result.error < 1e-3);
        let tighter = rc.correction(650.0, None, 0.1).unwrap();
        assert!(tighter.value < result.value);
    }

    #[test]
    fn test_efficiency_lowers_correction() {
        let rc = flat_table();
        let eff = RegistrationEfficiency::new(0.02, 0.004, 0.0, 1.0);
        let full = rc.correction(600.0, None, 1.0).unwrap();
        let with_eff = rc.correction(600.0, Some(&eff), 1.0).unwrap();
        assert!(with_eff.value < full.value);
        assert!(with_eff.value > 0.5);
    }

    #[test]
    fn test_correction_below_threshold() {
        let rc = flat_table();
        assert!(rc.correction(490.0, None, 1.0).is_err());
        assert_eq!(rc.integral(490.0, None, 1.0).unwrap().value, 0.0);
        assert_eq!(rc.corrections(None, 0.5).unwrap().len(), 40);
    }
}
