use serde::{Deserialize, Serialize};

use crate::{utils::histogram, Curve, Float, KaonffError, KaonffResult};

/// The result of a $`\chi^2`$ comparison between two histograms.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chi2 {
    /// The $`\chi^2`$ value
    pub chi2: Float,
    /// The number of degrees of freedom (used bins minus one)
    pub ndf: i64,
}

impl Chi2 {
    /// $`\chi^2/\text{ndf}`$, or `NaN` if there are no degrees of freedom.
    pub fn reduced(&self) -> Float {
        if self.ndf > 0 {
            self.chi2 / self.ndf as Float
        } else {
            Float::NAN
        }
    }
}

/// Compare a `data` sample with a (much larger) `reference` sample through a binned
/// $`\chi^2`$.
///
/// Both samples are histogrammed with `bins` evenly spaced bins over `range`, the data histogram
/// is cyclically shifted by `roll_bins` bins, and each bin contributes
/// $`(d_i - r_i)^2/d_i`$. Only the statistical uncertainty of the data is used, so bins in
/// which the data histogram is empty are skipped.
pub fn chi2_ndf(
    data: &[Float],
    reference: &[Float],
    range: (Float, Float),
    bins: usize,
    data_weights: Option<&[Float]>,
    reference_weights: Option<&[Float]>,
    roll_bins: isize,
) -> Chi2 {
    let mut data_hist = histogram(data, bins, range, data_weights).counts;
    let shift = roll_bins.rem_euclid(bins as isize) as usize;
    data_hist.rotate_right(shift);
    let reference_hist = histogram(reference, bins, range, reference_weights).counts;
    let (chi2, used) = data_hist
        .iter()
        .zip(&reference_hist)
        .filter(|(d, _)| d.sqrt() > 0.0)
        .fold((0.0, 0i64), |(chi2, used), (d, r)| {
            (chi2 + (d - r).powi(2) / d, used + 1)
        });
    Chi2 {
        chi2,
        ndf: used - 1,
    }
}

/// The Bayesian estimate $`(k+1)/(n+2)`$ of an efficiency from `k` passing out of `n` events.
pub fn efficiency(k: Float, n: Float) -> Float {
    (k + 1.0) / (n + 2.0)
}

/// The variance of the Bayesian efficiency estimate with a uniform prior,
/// $`\frac{(k+1)(k+2)}{(n+2)(n+3)} - \frac{(k+1)^2}{(n+2)^2}`$.
pub fn efficiency_variance(k: Float, n: Float) -> Float {
    (k + 1.0) * (k + 2.0) / (n + 2.0) / (n + 3.0) - (k + 1.0).powi(2) / (n + 2.0).powi(2)
}

/// The square root of [`efficiency_variance`].
pub fn efficiency_error(k: Float, n: Float) -> Float {
    efficiency_variance(k, n).max(0.0).sqrt()
}

/// Per-bin efficiencies and their uncertainties from histograms of passing and total counts.
pub fn binned_efficiency(
    passed: &[Float],
    total: &[Float],
) -> KaonffResult<(Vec<Float>, Vec<Float>)> {
    if passed.len() != total.len() {
        return Err(KaonffError::Custom(format!(
            "Passed and total histograms have different lengths ({} vs {})",
            passed.len(),
            total.len()
        )));
    }
    Ok(passed
        .iter()
        .zip(total)
        .map(|(&k, &n)| (efficiency(k, n), efficiency_error(k, n)))
        .unzip())
}

fn expit(x: Float) -> Float {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// The registration efficiency of events as a function of the energy $`x`$ carried away by a
/// radiated photon, modeled as a falling sigmoid on top of a constant floor:
///
/// ```math
/// \varepsilon(x) = N\left(1 - \sigma\left(\frac{x-\mu}{s}\right) + c\right)
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistrationEfficiency {
    /// Position of the sigmoid edge
    pub mu: Float,
    /// Width of the sigmoid edge
    pub s: Float,
    /// Constant floor relative to the plateau
    pub c: Float,
    /// Overall normalization
    pub n: Float,
}

impl Default for RegistrationEfficiency {
    fn default() -> Self {
        Self {
            mu: 0.02,
            s: 1.0 / 250.0,
            c: 0.004,
            n: 0.35,
        }
    }
}

impl RegistrationEfficiency {
    /// The parameter names used when this curve is fitted.
    pub const PARAMETER_NAMES: [&'static str; 4] = ["mu", "s", "c", "N"];

    /// Create a new efficiency curve.
    pub fn new(mu: Float, s: Float, c: Float, n: Float) -> Self {
        Self { mu, s, c, n }
    }

    /// Build a curve from parameters ordered as [`RegistrationEfficiency::PARAMETER_NAMES`].
    pub fn from_slice(parameters: &[Float]) -> KaonffResult<Self> {
        match parameters {
            [mu, s, c, n] => Ok(Self::new(*mu, *s, *c, *n)),
            _ => Err(KaonffError::ParameterLengthError {
                expected: 4,
                got: parameters.len(),
            }),
        }
    }

    /// Evaluate the efficiency at `x`.
    pub fn evaluate(&self, x: Float) -> Float {
        self.n * (1.0 - expit((x - self.mu) / self.s) + self.c)
    }
}

impl Curve for RegistrationEfficiency {
    fn parameters(&self) -> Vec<String> {
        Self::PARAMETER_NAMES.iter().map(|s| s.to_string()).collect()
    }

    fn evaluate(&self, xs: &[Float], parameters: &[Float]) -> KaonffResult<Vec<Float>> {
        let curve = Self::from_slice(parameters)?;
        Ok(xs.iter().map(|&x| curve.evaluate(x)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identical_histograms() {
        let data: Vec<Float> = (0..100).map(|i| i as Float / 10.0).collect();
        let result = chi2_ndf(&data, &data, (0.0, 10.0), 10, None, None, 0);
        assert_eq!(result.chi2, 0.0);
        assert_eq!(result.ndf, 9);
    }

    #[test]
    fn test_empty_bins_skipped() {
        let data = [0.5, 0.5, 0.5, 0.5, 2.5];
        let reference = [0.5, 0.5, 1.5, 2.5, 2.5, 2.5];
        let result = chi2_ndf(&data, &reference, (0.0, 3.0), 3, None, None, 0);
        // (4 - 2)^2 / 4 + (1 - 3)^2 / 1
        assert_relative_eq!(result.chi2, 5.0);
        assert_eq!(result.ndf, 1);
        assert_relative_eq!(result.reduced(), 5.0);
    }

    #[test]
    fn test_rolled_histogram() {
        let data = [0.5, 0.5];
        let reference = [1.5, 1.5];
        let result = chi2_ndf(&data, &reference, (0.0, 3.0), 3, None, None, 1);
        assert_eq!(result.chi2, 0.0);
        let result = chi2_ndf(&data, &reference, (0.0, 3.0), 3, None, None, -2);
        assert_eq!(result.chi2, 0.0);
    }

    #[test]
    fn test_efficiency() {
        assert_relative_eq!(efficiency(0.0, 0.0), 0.5);
        assert_relative_eq!(efficiency(8.0, 10.0), 0.75);
        // uniform prior on (0, 1) has variance 1/12
        assert_relative_eq!(efficiency_variance(0.0, 0.0), 1.0 / 12.0, epsilon = 1e-15);
        assert_relative_eq!(efficiency_error(0.0, 0.0), (1.0f64 / 12.0).sqrt());
        let (eff, err) = binned_efficiency(&[8.0, 0.0], &[10.0, 0.0]).unwrap();
        assert_relative_eq!(eff[0], 0.75);
        assert!(err[1] > err[0]);
        assert!(binned_efficiency(&[1.0], &[]).is_err());
    }

    #[test]
    fn test_registration_efficiency() {
        let eff = RegistrationEfficiency::new(0.02, 0.004, 0.01, 0.4);
        assert_relative_eq!(eff.evaluate(0.02), 0.4 * (0.5 + 0.01));
        assert!(eff.evaluate(0.0) > eff.evaluate(0.05));
        assert_relative_eq!(eff.evaluate(10.0), 0.4 * 0.01, epsilon = 1e-12);
        let values = Curve::evaluate(&eff, &[0.02], &[0.02, 0.004, 0.01, 0.4]).unwrap();
        assert_relative_eq!(values[0], eff.evaluate(0.02));
        assert!(matches!(
            RegistrationEfficiency::from_slice(&[1.0]),
            Err(KaonffError::ParameterLengthError { expected: 4, got: 1 })
        ));
    }
}
