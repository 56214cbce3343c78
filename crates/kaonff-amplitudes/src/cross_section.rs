use kaonff_core::{
    Curve, Float, KaonChannel, KaonffError, KaonffResult, PhysicalConstants, CONSTANTS, PI,
};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    form_factor::{FormFactor, FormFactorParameters, PARAMETER_NAMES},
    phase_space::beta_factor,
};

/// The Born cross section of $`e^+e^-\to K\bar{K}`$ in nb,
///
/// ```math
/// \sigma(s) = \frac{\pi}{3}\frac{\alpha^2 C \beta^3(s)}{s}\left|F(s)\right|^2
/// ```
///
/// where $`\beta`$ is the kaon velocity and $`C`$ converts MeV$`^{-2}`$ to nb. Energies are given
/// as the center-of-mass energy $`x = \sqrt{s}`$ in GeV.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrossSectionModel {
    form_factor: FormFactor,
}

impl CrossSectionModel {
    /// The cross section of the given channel with the default [`CONSTANTS`].
    pub fn new(channel: KaonChannel) -> Self {
        Self::with_constants(channel, CONSTANTS)
    }
    /// The cross section of the given channel with custom constants.
    pub fn with_constants(channel: KaonChannel, constants: PhysicalConstants) -> Self {
        Self {
            form_factor: FormFactor::with_constants(channel, constants),
        }
    }
    /// $`e^+e^-\to K_SK_L`$
    pub fn neutral() -> Self {
        Self::new(KaonChannel::Neutral)
    }
    /// $`e^+e^-\to K^+K^-`$
    pub fn charged() -> Self {
        Self::new(KaonChannel::Charged)
    }
    /// The underlying form factor.
    pub fn form_factor(&self) -> &FormFactor {
        &self.form_factor
    }
    /// The kaon channel.
    pub fn channel(&self) -> KaonChannel {
        self.form_factor.channel()
    }
    /// The production threshold $`2m_K`$ (GeV).
    pub fn threshold(&self) -> Float {
        self.channel().threshold(self.form_factor.constants())
    }

    fn prefactor(&self, s: Float) -> Float {
        let c = self.form_factor.constants();
        let beta = beta_factor(s, self.channel().kaon_mass(c));
        (PI / 3.0) * c.alpha.powi(2) * c.conversion * beta.powi(3) / s
    }

    /// The cross section (nb) at center-of-mass energy `x` (GeV). Zero below threshold.
    pub fn cross_section(&self, x: Float, params: &FormFactorParameters) -> Float {
        if x < self.threshold() {
            return 0.0;
        }
        let s = (x * 1e3).powi(2);
        self.prefactor(s) * self.form_factor.evaluate_s(s, params).norm_sqr()
    }

    /// The squared form factor $`|F|^2`$ which reproduces the cross section `cs` (nb) at `x`
    /// (GeV). Zero where the cross section must vanish (at and below threshold).
    pub fn form_factor_from_cross_section(&self, x: Float, cs: Float) -> Float {
        if x < self.threshold() {
            return 0.0;
        }
        let prefactor = self.prefactor((x * 1e3).powi(2));
        if prefactor > 0.0 {
            cs / prefactor
        } else {
            0.0
        }
    }

    /// The cross section (nb) at each energy in `xs` (GeV).
    #[cfg(feature = "rayon")]
    pub fn cross_sections(&self, xs: &[Float], params: &FormFactorParameters) -> Vec<Float> {
        xs.par_iter()
            .map(|&x| self.cross_section(x, params))
            .collect()
    }

    /// The cross section (nb) at each energy in `xs` (GeV).
    #[cfg(not(feature = "rayon"))]
    pub fn cross_sections(&self, xs: &[Float], params: &FormFactorParameters) -> Vec<Float> {
        xs.iter().map(|&x| self.cross_section(x, params)).collect()
    }

    /// Convert measured cross sections `cs` (nb) at energies `xs` (GeV) into $`|F|^2`$.
    ///
    /// # Errors
    ///
    /// Returns an error if `xs` and `cs` have different lengths.
    pub fn form_factors_from_cross_sections(
        &self,
        xs: &[Float],
        cs: &[Float],
    ) -> KaonffResult<Vec<Float>> {
        if xs.len() != cs.len() {
            return Err(KaonffError::Custom(format!(
                "Energies and cross sections have different lengths ({} vs {})",
                xs.len(),
                cs.len()
            )));
        }
        Ok(xs
            .iter()
            .zip(cs)
            .map(|(&x, &cs)| self.form_factor_from_cross_section(x, cs))
            .collect())
    }
}

impl Curve for CrossSectionModel {
    fn parameters(&self) -> Vec<String> {
        PARAMETER_NAMES.iter().map(|name| name.to_string()).collect()
    }

    fn evaluate(&self, xs: &[Float], parameters: &[Float]) -> KaonffResult<Vec<Float>> {
        let params = FormFactorParameters::from_slice(parameters)?;
        Ok(self.cross_sections(xs, &params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_parameters() -> FormFactorParameters {
        let mut p = FormFactorParameters::default();
        p.isospin_factor = 0.98;
        p.c_rho = [1.12, -0.1, 0.05];
        p.c_phi = [1.01, -0.02];
        p.c_omega = [1.2, -0.1, 0.05, 0.0];
        p
    }

    #[test]
    fn test_threshold() {
        let p = test_parameters();
        for model in [CrossSectionModel::neutral(), CrossSectionModel::charged()] {
            let threshold = model.threshold();
            assert_eq!(model.cross_section(threshold * 0.999, &p), 0.0);
            assert!(model.cross_section(threshold, &p) < 1e-12);
            assert_eq!(model.cross_section(0.5, &p), 0.0);
            assert!(model.cross_section(1.02, &p) > 0.0);
        }
        assert!(CrossSectionModel::charged().threshold() < CrossSectionModel::neutral().threshold());
    }

    #[test]
    fn test_round_trip() {
        let p = test_parameters();
        for model in [CrossSectionModel::neutral(), CrossSectionModel::charged()] {
            for x in [1.0, 1.01, 1.0195, 1.03, 1.2, 1.6, 2.0] {
                let cs = model.cross_section(x, &p);
                let f2 = model.form_factor().evaluate(x, &p).norm_sqr();
                assert_relative_eq!(
                    model.form_factor_from_cross_section(x, cs),
                    f2,
                    max_relative = 1e-9
                );
            }
        }
    }

    #[test]
    fn test_phi_peak() {
        let p = test_parameters();
        let model = CrossSectionModel::neutral();
        let peak = model.cross_section(1.0195, &p);
        // O(1000) nb at the phi(1020) peak
        assert!(peak > 500.0 && peak < 5000.0);
        assert!(peak > model.cross_section(1.05, &p));
    }

    #[test]
    fn test_curve_interface() {
        let model = CrossSectionModel::charged();
        let p = test_parameters();
        assert_eq!(Curve::parameters(&model).len(), 24);
        let values = Curve::evaluate(&model, &[1.0, 1.02], &p.to_vec()).unwrap();
        assert_relative_eq!(values[1], model.cross_section(1.02, &p));
        assert!(Curve::evaluate(&model, &[1.0], &[1.0; 3]).is_err());
        assert!(model
            .form_factors_from_cross_sections(&[1.0, 1.02], &[1.0])
            .is_err());
    }
}
