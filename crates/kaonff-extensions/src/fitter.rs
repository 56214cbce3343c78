use ganesh::algorithms::NelderMead;
use indexmap::IndexMap;
use kaonff_core::{validate_domain, Curve, Density, Float, FitMode, KaonffError, KaonffResult};
use nalgebra::DMatrix;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    likelihoods::{
        ExtendedNLL, LeastSquares, LikelihoodEvaluator, LikelihoodExpression, LikelihoodManager,
        LikelihoodTerm, MinimizerOptions,
    },
    shapes::PeakModel,
};

/// Optional lower and upper limits on a parameter.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower limit
    pub lower: Option<Float>,
    /// Upper limit
    pub upper: Option<Float>,
}

impl Bounds {
    /// No limits on either side.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// The limits as a tuple with missing sides replaced by infinities.
    pub fn to_tuple(&self) -> (Float, Float) {
        (
            self.lower.unwrap_or(Float::NEG_INFINITY),
            self.upper.unwrap_or(Float::INFINITY),
        )
    }
}

impl From<(Option<Float>, Option<Float>)> for Bounds {
    fn from(value: (Option<Float>, Option<Float>)) -> Self {
        Self {
            lower: value.0,
            upper: value.1,
        }
    }
}

impl From<(Float, Float)> for Bounds {
    fn from(value: (Float, Float)) -> Self {
        Self {
            lower: Some(value.0),
            upper: Some(value.1),
        }
    }
}

/// The starting value and limits of a fit parameter.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Starting value
    pub initial: Float,
    /// Limits
    pub bounds: Bounds,
}

/// A Gaussian constraint on a fit parameter.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Center of the constraint
    pub center: Float,
    /// Width of the constraint
    pub sigma: Float,
}

/// Everything a [`Fitter`] needs besides the data and the model.
///
/// ```
/// use kaonff_extensions::fitter::FitConfiguration;
///
/// let config = FitConfiguration::new((480.0, 515.0))
///     .with_parameter("m", 497.6, (Some(490.0), Some(505.0)))
///     .with_free_parameter("dy", 0.0)
///     .with_constraint("m", 497.6, 1.0);
/// assert_eq!(config.parameters.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitConfiguration {
    /// The fit range `(xmin, xmax)`
    pub domain: (Float, Float),
    /// Whether the model includes a background
    pub mode: FitMode,
    /// Starting values and limits by parameter name
    pub parameters: IndexMap<String, ParameterSpec>,
    /// Gaussian constraints by parameter name
    pub constraints: IndexMap<String, Constraint>,
}

impl FitConfiguration {
    /// An empty configuration over `domain` in [`FitMode::WithBackground`].
    pub fn new(domain: (Float, Float)) -> Self {
        Self {
            domain,
            mode: FitMode::default(),
            parameters: IndexMap::new(),
            constraints: IndexMap::new(),
        }
    }

    /// Set the [`FitMode`].
    pub fn with_mode(self, mode: FitMode) -> Self {
        Self { mode, ..self }
    }

    /// Declare a parameter with a starting value and limits.
    pub fn with_parameter<B: Into<Bounds>>(
        mut self,
        name: &str,
        initial: Float,
        bounds: B,
    ) -> Self {
        self.parameters.insert(
            name.to_string(),
            ParameterSpec {
                initial,
                bounds: bounds.into(),
            },
        );
        self
    }

    /// Declare a parameter without limits.
    pub fn with_free_parameter(self, name: &str, initial: Float) -> Self {
        self.with_parameter(name, initial, Bounds::unbounded())
    }

    /// Constrain a parameter to `center` with width `sigma`.
    pub fn with_constraint(mut self, name: &str, center: Float, sigma: Float) -> Self {
        self.constraints
            .insert(name.to_string(), Constraint { center, sigma });
        self
    }
}

/// The outcome of [`Fitter::fit`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Parameter names
    pub names: Vec<String>,
    /// Best-fit values
    pub values: Vec<Float>,
    /// Symmetric uncertainties, `NaN` when the covariance is unavailable
    pub errors: Vec<Float>,
    /// Covariance matrix (row-major), `None` when the Hessian is not positive definite
    pub covariance: Option<Vec<Vec<Float>>>,
    /// Whether the minimization converged to a proper minimum
    pub valid: bool,
    /// The cost at the best-fit point
    pub fval: Float,
    /// The minimizer's final message
    pub message: String,
}

impl FitResult {
    fn index(&self, name: &str) -> KaonffResult<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| KaonffError::ParameterNotFound {
                name: name.to_string(),
            })
    }

    /// The best-fit value of `name`.
    pub fn value(&self, name: &str) -> KaonffResult<Float> {
        Ok(self.values[self.index(name)?])
    }

    /// The uncertainty of `name`.
    pub fn error(&self, name: &str) -> KaonffResult<Float> {
        Ok(self.errors[self.index(name)?])
    }
}

/// The state of a [`Fitter`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStatus {
    /// Built but never fitted
    #[default]
    Constructed,
    /// The last fit is valid
    Converged,
    /// The last fit is invalid
    Failed,
}

#[derive(Clone)]
enum FitModel {
    Density(Box<dyn Density>),
    Curve { curve: Box<dyn Curve>, x: Vec<Float> },
}

/// A fit of a [`Density`] to unbinned data or of a [`Curve`] to measured points, with optional
/// Gaussian constraints.
#[derive(Clone)]
pub struct Fitter {
    model: FitModel,
    evaluator: LikelihoodEvaluator,
    config: FitConfiguration,
    result: Option<FitResult>,
    status: FitStatus,
}

impl Fitter {
    /// Fit `density` to the values of `data` strictly inside the configured domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain is invalid or differs from the density's, if a parameter
    /// of the density is not configured, or if a constraint names an undeclared parameter.
    pub fn new(
        data: &[Float],
        density: Box<dyn Density>,
        config: FitConfiguration,
    ) -> KaonffResult<Self> {
        let (xmin, xmax) = config.domain;
        validate_domain(config.domain)?;
        if density.domain() != config.domain {
            return Err(KaonffError::Custom(format!(
                "The density is defined over {:?} but the fit range is {:?}",
                density.domain(),
                config.domain
            )));
        }
        let selected: Vec<Float> = data
            .iter()
            .copied()
            .filter(|&x| x > xmin && x < xmax)
            .collect();
        debug!(
            total = data.len(),
            selected = selected.len(),
            "selected events in fit range"
        );
        let nll = ExtendedNLL::new(&selected, density.clone());
        Self::build(FitModel::Density(density), Box::new(nll), config)
    }

    /// Fit `curve` to the points `(x, y ± yerr)` with `x` inside the configured domain
    /// (endpoints included).
    ///
    /// # Errors
    ///
    /// See [`Fitter::new`] and [`LeastSquares::new`].
    pub fn least_squares(
        x: &[Float],
        y: &[Float],
        yerr: &[Float],
        curve: Box<dyn Curve>,
        config: FitConfiguration,
    ) -> KaonffResult<Self> {
        let (xmin, xmax) = config.domain;
        validate_domain(config.domain)?;
        if x.len() != y.len() || x.len() != yerr.len() {
            return Err(KaonffError::Custom(format!(
                "Points have inconsistent lengths (x: {}, y: {}, yerr: {})",
                x.len(),
                y.len(),
                yerr.len()
            )));
        }
        let (mut xs, mut ys, mut errs) = (Vec::new(), Vec::new(), Vec::new());
        for ((&xi, &yi), &ei) in x.iter().zip(y).zip(yerr) {
            if xi >= xmin && xi <= xmax {
                xs.push(xi);
                ys.push(yi);
                errs.push(ei);
            }
        }
        let cost = LeastSquares::new(&xs, &ys, &errs, curve.clone())?;
        Self::build(FitModel::Curve { curve, x: xs }, Box::new(cost), config)
    }

    /// Fit a Cruijff peak (plus a linear background unless the configuration is
    /// [`FitMode::SignalOnly`]) to `data`.
    pub fn peak(data: &[Float], config: FitConfiguration) -> KaonffResult<Self> {
        let model = PeakModel::from_mode(config.mode, config.domain)?;
        Self::new(data, Box::new(model), config)
    }

    fn build(
        model: FitModel,
        cost: Box<dyn LikelihoodTerm>,
        config: FitConfiguration,
    ) -> KaonffResult<Self> {
        let declared = cost.parameters();
        if let Some(name) = declared
            .iter()
            .find(|name| !config.parameters.contains_key(*name))
        {
            return Err(KaonffError::ParameterNotFound { name: name.clone() });
        }
        let mut manager = LikelihoodManager::default();
        let mut expression: LikelihoodExpression = manager.register(cost).into();
        for (name, constraint) in &config.constraints {
            let id = manager.constrain(name, constraint.center, constraint.sigma)?;
            expression = &expression + &id;
        }
        Ok(Self {
            model,
            evaluator: manager.load(&expression),
            config,
            result: None,
            status: FitStatus::Constructed,
        })
    }

    /// The names of the fit parameters, in the model's order.
    pub fn parameters(&self) -> Vec<String> {
        self.evaluator.parameters()
    }

    /// The configuration this fitter was built with.
    pub fn configuration(&self) -> &FitConfiguration {
        &self.config
    }

    /// The total cost (on the $`-2\ln\mathcal{L}`$ scale) at `parameters`.
    pub fn cost(&self, parameters: &[Float]) -> KaonffResult<Float> {
        self.evaluator.cost(parameters)
    }

    /// The state of the fitter.
    pub fn status(&self) -> FitStatus {
        self.status
    }

    /// The result of the last fit.
    pub fn result(&self) -> Option<&FitResult> {
        self.result.as_ref()
    }

    fn fitted(&self) -> KaonffResult<&FitResult> {
        self.result.as_ref().ok_or(KaonffError::NotFitted)
    }

    /// Fit with the default [`MinimizerOptions`].
    pub fn fit(&mut self) -> KaonffResult<&FitResult> {
        self.fit_with(MinimizerOptions::default())
    }

    /// Run a Nelder-Mead pass (unless disabled) followed by the configured algorithm, then
    /// estimate the covariance from the Hessian at the minimum.
    ///
    /// An invalid fit is not an error: it is logged, the state becomes [`FitStatus::Failed`],
    /// and the result is still returned. Errors raised while evaluating the cost propagate.
    pub fn fit_with(&mut self, options: MinimizerOptions) -> KaonffResult<&FitResult> {
        let names = self.parameters();
        let mut p0 = Vec::with_capacity(names.len());
        let mut bounds = Vec::with_capacity(names.len());
        for name in &names {
            let spec = self
                .config
                .parameters
                .get(name)
                .ok_or_else(|| KaonffError::ParameterNotFound { name: name.clone() })?;
            p0.push(spec.initial);
            bounds.push(spec.bounds.to_tuple());
        }
        if options.simplex {
            let simplex = self.evaluator.minimize(
                &p0,
                Some(bounds.clone()),
                Some(
                    MinimizerOptions::default()
                        .with_algorithm(NelderMead::default())
                        .with_max_steps(options.max_steps),
                ),
            )?;
            debug!(
                pass = "simplex",
                fval = simplex.fx,
                converged = simplex.converged,
                "minimization pass"
            );
            p0 = simplex.x.iter().copied().collect();
        }
        let status = self
            .evaluator
            .minimize(&p0, Some(bounds.clone()), Some(options))?;
        debug!(
            pass = "gradient",
            fval = status.fx,
            converged = status.converged,
            "minimization pass"
        );
        let values: Vec<Float> = status.x.iter().copied().collect();
        let covariance = self.covariance(&values, &bounds)?;
        let errors = match &covariance {
            Some(cov) => cov.diagonal().iter().map(|v| v.sqrt()).collect(),
            None => vec![Float::NAN; values.len()],
        };
        let valid = status.converged && covariance.is_some() && status.fx.is_finite();
        if valid {
            self.status = FitStatus::Converged;
        } else {
            warn!(
                converged = status.converged,
                fval = status.fx,
                message = %status.message,
                "fit is not valid"
            );
            self.status = FitStatus::Failed;
        }
        let result: &FitResult = self.result.insert(FitResult {
            names,
            values,
            errors,
            covariance: covariance.map(|cov| {
                cov.row_iter()
                    .map(|row| row.iter().copied().collect())
                    .collect()
            }),
            valid,
            fval: status.fx,
            message: status.message.to_string(),
        });
        Ok(result)
    }

    /// Central finite-difference Hessian of the cost at `x` with per-parameter steps `h`.
    fn hessian(&self, x: &[Float], h: &[Float]) -> KaonffResult<DMatrix<Float>> {
        let n = x.len();
        let f0 = self.cost(x)?;
        let mut hess = DMatrix::zeros(n, n);
        let mut point = x.to_vec();
        for i in 0..n {
            point[i] = x[i] + h[i];
            let fp = self.cost(&point)?;
            point[i] = x[i] - h[i];
            let fm = self.cost(&point)?;
            point[i] = x[i];
            hess[(i, i)] = (fp - 2.0 * f0 + fm) / (h[i] * h[i]);
            for j in 0..i {
                let mut corner = |si: Float, sj: Float| -> KaonffResult<Float> {
                    point[i] = x[i] + si * h[i];
                    point[j] = x[j] + sj * h[j];
                    let f = self.cost(&point);
                    point[i] = x[i];
                    point[j] = x[j];
                    f
                };
                let fpp = corner(1.0, 1.0)?;
                let fpm = corner(1.0, -1.0)?;
                let fmp = corner(-1.0, 1.0)?;
                let fmm = corner(-1.0, -1.0)?;
                let hij = (fpp - fpm - fmp + fmm) / (4.0 * h[i] * h[j]);
                hess[(i, j)] = hij;
                hess[(j, i)] = hij;
            }
        }
        Ok(hess)
    }

    /// The covariance $`2H^{-1}`$ at `x`, or `None` if the Hessian is not positive definite or
    /// implies a variance which is not finite and positive.
    ///
    /// The Hessian is computed twice: first with steps relative to the parameter values, then
    /// with steps of a tenth of the uncertainties the first pass implies. Every evaluation stays
    /// within `bounds`.
    fn covariance(
        &self,
        x: &[Float],
        bounds: &[(Float, Float)],
    ) -> KaonffResult<Option<DMatrix<Float>>> {
        let coarse: Vec<Float> = x.iter().map(|v| 1e-4 * v.abs().max(1.0)).collect();
        let (center, steps) = stencil(x, &coarse, bounds);
        let hess = self.hessian(&center, &steps)?;
        if !positive_definite(&hess) {
            warn!("Hessian is not positive definite");
            return Ok(None);
        }
        let fine: Vec<Float> = hess
            .diagonal()
            .iter()
            .map(|&hii| 0.1 * (2.0 / hii).sqrt())
            .collect();
        let (center, steps) = stencil(x, &fine, bounds);
        let hess = self.hessian(&center, &steps)?;
        if !positive_definite(&hess) {
            warn!("Hessian is not positive definite");
            return Ok(None);
        }
        let Some(chol) = hess.cholesky() else {
            return Ok(None);
        };
        let cov = chol.inverse() * 2.0;
        if cov.diagonal().iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            warn!("covariance has non-positive variances");
            return Ok(None);
        }
        Ok(Some(cov))
    }

    /// The fitted uncertainties by name, leaving out `exclude` (default: `["n_sig"]`).
    pub fn sigmas(&self, exclude: Option<&[&str]>) -> KaonffResult<IndexMap<String, Float>> {
        let result = self.fitted()?;
        let exclude = exclude.unwrap_or(&["n_sig"]);
        Ok(result
            .names
            .iter()
            .zip(&result.errors)
            .filter(|(name, _)| !exclude.contains(&name.as_str()))
            .map(|(name, &error)| (name.clone(), error))
            .collect())
    }

    /// Limits for a follow-up fit: every configured limit, with the parameters in `include`
    /// narrowed to within `n_sigmas` uncertainties of their fitted values, and finally
    /// `overrides` taking precedence over both. Parameters without a finite uncertainty keep
    /// their configured limits.
    pub fn limits(
        &self,
        n_sigmas: Float,
        include: &[&str],
        overrides: &IndexMap<String, Bounds>,
    ) -> KaonffResult<IndexMap<String, Bounds>> {
        let result = self.fitted()?;
        let mut limits: IndexMap<String, Bounds> = self
            .config
            .parameters
            .iter()
            .map(|(name, spec)| (name.clone(), spec.bounds))
            .collect();
        for &name in include {
            let value = result.value(name)?;
            let sigma = result.error(name)?;
            if !sigma.is_finite() {
                continue;
            }
            let configured = limits.get(name).copied().unwrap_or_default();
            let low = value - n_sigmas * sigma;
            let high = value + n_sigmas * sigma;
            limits.insert(
                name.to_string(),
                Bounds {
                    lower: Some(configured.lower.unwrap_or(low).max(low)),
                    upper: Some(configured.upper.unwrap_or(high).min(high)),
                },
            );
        }
        for (name, bounds) in overrides {
            limits.insert(name.clone(), *bounds);
        }
        Ok(limits)
    }

    /// The model at the fitted parameters: the density (events per unit of $`x`$) at each of
    /// `xs`, or the curve at each of `xs` for least-squares fits.
    pub fn model_curve(&self, xs: &[Float]) -> KaonffResult<Vec<Float>> {
        let result = self.fitted()?;
        match &self.model {
            FitModel::Density(density) => Ok(density.evaluate(xs, &result.values)?.1),
            FitModel::Curve { curve, .. } => curve.evaluate(xs, &result.values),
        }
    }

    /// The abscissae of the fitted points of a least-squares fit.
    pub fn points(&self) -> Option<&[Float]> {
        match &self.model {
            FitModel::Density(_) => None,
            FitModel::Curve { x, .. } => Some(x),
        }
    }
}

/// Move each stencil `x ± h` inside `bounds`, shrinking `h` where the allowed interval is
/// narrower than `2h`. Returns the stencil centers and steps.
fn stencil(x: &[Float], h: &[Float], bounds: &[(Float, Float)]) -> (Vec<Float>, Vec<Float>) {
    x.iter()
        .zip(h)
        .zip(bounds)
        .map(|((&xi, &hi), &(lower, upper))| {
            let step = hi.min(0.5 * (upper - lower));
            (xi.max(lower + step).min(upper - step), step)
        })
        .unzip()
}

fn positive_definite(hess: &DMatrix<Float>) -> bool {
    hess.iter().all(|v| v.is_finite())
        && hess.diagonal().iter().all(|&v| v > 0.0)
        && hess.clone().cholesky().is_some()
}

/// Fit each of `fitters` with the default [`MinimizerOptions`].
#[cfg(feature = "rayon")]
pub fn fit_all(fitters: &mut [Fitter]) -> KaonffResult<Vec<FitResult>> {
    fitters
        .par_iter_mut()
        .map(|fitter| fitter.fit().cloned())
        .collect()
}

/// Fit each of `fitters` with the default [`MinimizerOptions`].
#[cfg(not(feature = "rayon"))]
pub fn fit_all(fitters: &mut [Fitter]) -> KaonffResult<Vec<FitResult>> {
    fitters
        .iter_mut()
        .map(|fitter| fitter.fit().cloned())
        .collect()
}
