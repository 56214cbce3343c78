use kaonff_core::{
    utils::quadrature::integrate, validate_domain, Density, Float, FitMode, KaonffError,
    KaonffResult,
};
use serde::{Deserialize, Serialize};

/// Names of the [`Cruijff`] shape parameters.
pub const CRUIJFF_PARAMETERS: [&str; 5] = ["m", "sL", "sR", "aL", "aR"];

/// An asymmetric Gaussian whose variance grows quadratically with the distance from the peak:
///
/// ```math
/// f(x) = \exp\left(-\frac{(x - m)^2}{2\left(\sigma_{L,R}^2 + \alpha_{L,R}(x - m)^2\right)}\right)
/// ```
///
/// with $`(\sigma_L, \alpha_L)`$ left of the peak and $`(\sigma_R, \alpha_R)`$ at and right of it.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cruijff {
    /// Peak position
    pub m: Float,
    /// Left width
    pub sigma_left: Float,
    /// Right width
    pub sigma_right: Float,
    /// Left tail parameter
    pub alpha_left: Float,
    /// Right tail parameter
    pub alpha_right: Float,
}

impl Cruijff {
    /// Construct a shape from `[m, sL, sR, aL, aR]`.
    pub fn from_slice(parameters: &[Float]) -> KaonffResult<Self> {
        match parameters {
            [m, sl, sr, al, ar] => Ok(Self {
                m: *m,
                sigma_left: *sl,
                sigma_right: *sr,
                alpha_left: *al,
                alpha_right: *ar,
            }),
            _ => Err(KaonffError::ParameterLengthError {
                expected: CRUIJFF_PARAMETERS.len(),
                got: parameters.len(),
            }),
        }
    }

    /// The unnormalized shape at `x`.
    pub fn evaluate(&self, x: Float) -> Float {
        let dx = x - self.m;
        let denom = if x < self.m {
            2.0 * (self.sigma_left.powi(2) + self.alpha_left * dx * dx)
        } else {
            2.0 * (self.sigma_right.powi(2) + self.alpha_right * dx * dx)
        };
        (-dx * dx / denom).exp()
    }

    /// The integral of the shape over `domain`.
    ///
    /// # Errors
    ///
    /// Returns [`KaonffError::QuadratureError`] if the integral is not finite and positive.
    pub fn integral(&self, domain: (Float, Float)) -> KaonffResult<Float> {
        let result = integrate(|x| self.evaluate(x), domain.0, domain.1)?;
        if result.value.is_finite() && result.value > 0.0 {
            Ok(result.value)
        } else {
            Err(KaonffError::QuadratureError {
                reason: format!(
                    "Cruijff normalization over ({}, {}) is {}",
                    domain.0, domain.1, result.value
                ),
            })
        }
    }

    /// The shape at each of `xs`, normalized to unit integral over `domain`.
    pub fn normalized(&self, xs: &[Float], domain: (Float, Float)) -> KaonffResult<Vec<Float>> {
        let norm = self.integral(domain)?;
        Ok(xs.iter().map(|&x| self.evaluate(x) / norm).collect())
    }
}

/// Background densities (in events per unit of $`x`$) over a domain $`[x_{\min}, x_{\max}]`$ of
/// width $`w`$.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Background {
    /// $`y_0 + \Delta y\,(x - x_{\min})/w`$ with parameters `y0` and `dy`
    Linear,
    /// $`\frac{n}{w}\left(1 + b P_1(t) + c P_2(t)\right)`$ with
    /// $`t = (2x - x_{\min} - x_{\max})/w`$ and parameters `n_bkg`, `b`, and `c`
    Quadratic,
    /// $`n/w`$ with parameter `n_bkg`
    Flat,
}

impl Background {
    /// The parameter names of this background.
    pub fn parameters(&self) -> Vec<String> {
        let names: &[&str] = match self {
            Background::Linear => &["y0", "dy"],
            Background::Quadratic => &["n_bkg", "b", "c"],
            Background::Flat => &["n_bkg"],
        };
        names.iter().map(|s| s.to_string()).collect()
    }

    fn check_length(&self, parameters: &[Float]) -> KaonffResult<()> {
        let expected = match self {
            Background::Linear => 2,
            Background::Quadratic => 3,
            Background::Flat => 1,
        };
        if parameters.len() == expected {
            Ok(())
        } else {
            Err(KaonffError::ParameterLengthError {
                expected,
                got: parameters.len(),
            })
        }
    }

    /// The density at `x`.
    ///
    /// # Errors
    ///
    /// Returns [`KaonffError::ParameterLengthError`] if `parameters` does not match
    /// [`Background::parameters`].
    pub fn density(
        &self,
        x: Float,
        parameters: &[Float],
        domain: (Float, Float),
    ) -> KaonffResult<Float> {
        self.check_length(parameters)?;
        let (xmin, xmax) = domain;
        let w = xmax - xmin;
        Ok(match self {
            Background::Linear => parameters[0] + parameters[1] * (x - xmin) / w,
            Background::Quadratic => {
                let t = (2.0 * x - xmin - xmax) / w;
                let p2 = 0.5 * (3.0 * t * t - 1.0);
                parameters[0] * (1.0 + parameters[1] * t + parameters[2] * p2) / w
            }
            Background::Flat => parameters[0] / w,
        })
    }

    /// The integral of the density over the domain.
    ///
    /// # Errors
    ///
    /// See [`Background::density`].
    pub fn expected(&self, parameters: &[Float], domain: (Float, Float)) -> KaonffResult<Float> {
        self.check_length(parameters)?;
        Ok(match self {
            Background::Linear => {
                (domain.1 - domain.0) * (2.0 * parameters[0] + parameters[1]) / 2.0
            }
            Background::Quadratic | Background::Flat => parameters[0],
        })
    }
}

/// A linear probability density with slope parameter `k`, normalized to one over `domain`:
///
/// ```math
/// f(x) = \frac{1}{w}\frac{k(x - x_{\min}) + 1}{k w/2 + 1}
/// ```
pub fn linear_norm(x: Float, k: Float, domain: (Float, Float)) -> Float {
    let (xmin, xmax) = domain;
    let w = xmax - xmin;
    (1.0 / w) * ((k * (x - xmin) + 1.0) / ((k * w) / 2.0 + 1.0))
}

/// A [`Cruijff`] signal with `n_sig` expected events plus an optional [`Background`], as an
/// extended density over a fixed domain.
///
/// The parameters are `n_sig, m, sL, sR, aL, aR` followed by the background parameters.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeakModel {
    background: Option<Background>,
    domain: (Float, Float),
}

impl PeakModel {
    /// Construct a peak model over `domain`.
    pub fn new(domain: (Float, Float), background: Option<Background>) -> KaonffResult<Self> {
        validate_domain(domain)?;
        Ok(Self { background, domain })
    }

    /// The signal-only model for [`FitMode::SignalOnly`] and a Cruijff plus linear background
    /// for [`FitMode::WithBackground`].
    pub fn from_mode(mode: FitMode, domain: (Float, Float)) -> KaonffResult<Self> {
        match mode {
            FitMode::WithBackground => Self::new(domain, Some(Background::Linear)),
            FitMode::SignalOnly => Self::new(domain, None),
        }
    }

    /// The background shape, if any.
    pub fn background(&self) -> Option<Background> {
        self.background
    }

    fn check_length(&self, parameters: &[Float]) -> KaonffResult<()> {
        let expected = 1
            + CRUIJFF_PARAMETERS.len()
            + self.background.map_or(0, |b| b.parameters().len());
        if parameters.len() == expected {
            Ok(())
        } else {
            Err(KaonffError::ParameterLengthError {
                expected,
                got: parameters.len(),
            })
        }
    }
}

impl Density for PeakModel {
    fn parameters(&self) -> Vec<String> {
        let mut names = vec!["n_sig".to_string()];
        names.extend(CRUIJFF_PARAMETERS.iter().map(|s| s.to_string()));
        if let Some(background) = self.background {
            names.extend(background.parameters());
        }
        names
    }

    fn domain(&self) -> (Float, Float) {
        self.domain
    }

    fn evaluate(&self, xs: &[Float], parameters: &[Float]) -> KaonffResult<(Float, Vec<Float>)> {
        self.check_length(parameters)?;
        let n_sig = parameters[0];
        let signal = Cruijff::from_slice(&parameters[1..6])?;
        let norm = signal.integral(self.domain)?;
        let background_parameters = &parameters[6..];
        let mut expected = n_sig;
        if let Some(background) = self.background {
            expected += background.expected(background_parameters, self.domain)?;
        }
        let densities = xs
            .iter()
            .map(|&x| {
                let f = n_sig * signal.evaluate(x) / norm;
                match self.background {
                    Some(background) => {
                        Ok(f + background.density(x, background_parameters, self.domain)?)
                    }
                    None => Ok(f),
                }
            })
            .collect::<KaonffResult<Vec<Float>>>()?;
        Ok((expected, densities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kaonff_core::utils::quadrature::integrate;

    fn peak() -> Cruijff {
        Cruijff::from_slice(&[497.6, 2.0, 2.2, 0.1, 0.1]).unwrap()
    }

    #[test]
    fn test_cruijff_shape() {
        let c = peak();
        assert_eq!(c.evaluate(497.6), 1.0);
        assert!(c.evaluate(495.0) < 1.0);
        // wider on the right
        assert!(c.evaluate(500.0) > c.evaluate(495.2));
        assert!(Cruijff::from_slice(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_cruijff_normalization() {
        let c = peak();
        let domain = (480.0, 515.0);
        let integral = integrate(
            |x| c.normalized(&[x], domain).map(|v| v[0]).unwrap_or(Float::NAN),
            domain.0,
            domain.1,
        )
        .unwrap();
        assert_relative_eq!(integral.value, 1.0, max_relative = 1e-4);
    }

    #[test]
    fn test_cruijff_bad_normalization() {
        let c = Cruijff::from_slice(&[497.6, 2.0, 2.0, -1.0, 0.1]).unwrap();
        assert!(matches!(
            c.integral((480.0, 515.0)),
            Err(KaonffError::QuadratureError { .. })
        ));
    }

    #[test]
    fn test_backgrounds_integrate_to_expected() {
        let domain = (480.0, 515.0);
        for (background, parameters) in [
            (Background::Linear, vec![10.0, -4.0]),
            (Background::Quadratic, vec![300.0, 0.2, -0.1]),
            (Background::Flat, vec![120.0]),
        ] {
            let integral = integrate(
                |x| background.density(x, &parameters, domain).unwrap(),
                domain.0,
                domain.1,
            )
            .unwrap();
            assert_relative_eq!(
                integral.value,
                background.expected(&parameters, domain).unwrap(),
                max_relative = 1e-10
            );
            assert!(matches!(
                background.density(490.0, &parameters[1..], domain),
                Err(KaonffError::ParameterLengthError { .. })
            ));
            assert!(background.expected(&[], domain).is_err());
        }
        let linear = integrate(|x| linear_norm(x, 0.03, domain), domain.0, domain.1).unwrap();
        assert_relative_eq!(linear.value, 1.0, max_relative = 1e-10);
    }

    #[test]
    fn test_peak_model() {
        let domain = (480.0, 515.0);
        let model = PeakModel::from_mode(FitMode::WithBackground, domain).unwrap();
        assert_eq!(
            model.parameters(),
            vec!["n_sig", "m", "sL", "sR", "aL", "aR", "y0", "dy"]
        );
        let p = [1000.0, 497.6, 2.0, 2.2, 0.1, 0.1, 10.0, 0.0];
        let (expected, densities) = model.evaluate(&[497.6, 480.0], &p).unwrap();
        assert_relative_eq!(expected, 1000.0 + 35.0 * 10.0);
        assert!(densities[0] > densities[1]);
        let integral = integrate(
            |x| model.evaluate(&[x], &p).map(|(_, f)| f[0]).unwrap_or(Float::NAN),
            domain.0,
            domain.1,
        )
        .unwrap();
        assert_relative_eq!(integral.value, expected, max_relative = 1e-6);

        let signal_only = PeakModel::from_mode(FitMode::SignalOnly, domain).unwrap();
        assert_eq!(signal_only.parameters().len(), 6);
        assert!(matches!(
            signal_only.evaluate(&[497.6], &p),
            Err(KaonffError::ParameterLengthError {
                expected: 6,
                got: 8
            })
        ));
        assert!(PeakModel::new((515.0, 480.0), None).is_err());
    }
}
