use std::collections::HashMap;

#[cfg(not(feature = "rayon"))]
use accurate::{sum::Klein, traits::*};
use auto_ops::*;
use dyn_clone::DynClone;
use ganesh::{
    algorithms::LBFGSB, observers::DebugObserver, Algorithm, Function, Minimizer, Observer, Status,
};
use kaonff_core::{Curve, Density, Float, KaonffError, KaonffResult};
use tracing::info;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// A cost function on the $`-2\ln\mathcal{L}`$ scale with named parameters.
pub trait LikelihoodTerm: DynClone + Send + Sync {
    /// Evaluate the term with parameters ordered as [`LikelihoodTerm::parameters`].
    fn evaluate(&self, parameters: &[Float]) -> KaonffResult<Float>;
    /// The names of the parameters this term depends on.
    fn parameters(&self) -> Vec<String>;
}

dyn_clone::clone_trait_object!(LikelihoodTerm);

/// An extended, unbinned negative log-likelihood over a set of observed values.
#[derive(Clone)]
pub struct ExtendedNLL {
    data: Vec<Float>,
    density: Box<dyn Density>,
}

impl ExtendedNLL {
    /// Construct the likelihood of `data` under `density`.
    pub fn new(data: &[Float], density: Box<dyn Density>) -> Self {
        Self {
            data: data.to_vec(),
            density,
        }
    }

    #[cfg(feature = "rayon")]
    fn log_sum(densities: &[Float]) -> Float {
        densities
            .par_iter()
            .map(|&f| Float::ln(f.max(Float::MIN_POSITIVE)))
            .sum()
    }

    #[cfg(not(feature = "rayon"))]
    fn log_sum(densities: &[Float]) -> Float {
        densities
            .iter()
            .map(|&f| Float::ln(f.max(Float::MIN_POSITIVE)))
            .sum_with_accumulator::<Klein<Float>>()
    }
}

impl LikelihoodTerm for ExtendedNLL {
    fn parameters(&self) -> Vec<String> {
        self.density.parameters()
    }

    /// Evaluate the extended likelihood
    ///
    /// ```math
    /// NLL(\vec{p}) = 2 \left(\mu(\vec{p}) - \sum_{i} \ln f(x_i; \vec{p})\right)
    /// ```
    ///
    /// where $`\mu`$ is the expected number of events and $`f`$ the density in events per unit
    /// of $`x`$. Non-positive densities are clamped to the smallest positive float.
    fn evaluate(&self, parameters: &[Float]) -> KaonffResult<Float> {
        let (expected, densities) = self.density.evaluate(&self.data, parameters)?;
        Ok(2.0 * (expected - Self::log_sum(&densities)))
    }
}

/// A $`\chi^2`$ cost comparing a [`Curve`] with measured points.
#[derive(Clone)]
pub struct LeastSquares {
    x: Vec<Float>,
    y: Vec<Float>,
    yerr: Vec<Float>,
    curve: Box<dyn Curve>,
}

impl LeastSquares {
    /// Construct the cost of `curve` for the points `(x, y ± yerr)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slices have different lengths or any uncertainty is not
    /// positive.
    pub fn new(
        x: &[Float],
        y: &[Float],
        yerr: &[Float],
        curve: Box<dyn Curve>,
    ) -> KaonffResult<Self> {
        if x.len() != y.len() || x.len() != yerr.len() {
            return Err(KaonffError::Custom(format!(
                "Points have inconsistent lengths (x: {}, y: {}, yerr: {})",
                x.len(),
                y.len(),
                yerr.len()
            )));
        }
        if let Some(bad) = yerr.iter().find(|e| !(**e > 0.0)) {
            return Err(KaonffError::Custom(format!(
                "Uncertainties must be positive, got {}",
                bad
            )));
        }
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            yerr: yerr.to_vec(),
            curve,
        })
    }
}

impl LikelihoodTerm for LeastSquares {
    fn parameters(&self) -> Vec<String> {
        self.curve.parameters()
    }

    fn evaluate(&self, parameters: &[Float]) -> KaonffResult<Float> {
        let model = self.curve.evaluate(&self.x, parameters)?;
        Ok(model
            .iter()
            .zip(self.y.iter().zip(&self.yerr))
            .map(|(m, (y, e))| ((y - m) / e).powi(2))
            .sum())
    }
}

/// A Gaussian penalty $`((v - c)/\sigma)^2`$ on a single named parameter.
#[derive(Clone, Debug)]
pub struct NormalConstraint {
    name: String,
    center: Float,
    sigma: Float,
}

impl NormalConstraint {
    /// Constrain the parameter `name` to `center` with width `sigma`.
    pub fn new(name: &str, center: Float, sigma: Float) -> Self {
        Self {
            name: name.to_string(),
            center,
            sigma,
        }
    }
}

impl LikelihoodTerm for NormalConstraint {
    fn parameters(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn evaluate(&self, parameters: &[Float]) -> KaonffResult<Float> {
        Ok(((parameters[0] - self.center) / self.sigma).powi(2))
    }
}

/// A set of options that are used when minimizations are performed.
pub struct MinimizerOptions {
    pub(crate) algorithm: Box<dyn Algorithm<Float, (), KaonffError>>,
    pub(crate) observers: Vec<Box<dyn Observer<Float, ()>>>,
    pub(crate) max_steps: usize,
    pub(crate) simplex: bool,
}

impl Default for MinimizerOptions {
    fn default() -> Self {
        Self {
            algorithm: Box::new(LBFGSB::default()),
            observers: Default::default(),
            max_steps: 4000,
            simplex: true,
        }
    }
}

struct VerboseObserver {
    show_step: bool,
    show_x: bool,
    show_fx: bool,
}
impl Observer<Float, ()> for VerboseObserver {
    fn callback(&mut self, step: usize, status: &mut Status<Float>, _user_data: &mut ()) -> bool {
        if self.show_step {
            info!(step, "minimizer step");
        }
        if self.show_x {
            info!(x = %status.x.transpose(), "current best position");
        }
        if self.show_fx {
            info!(fx = status.fx, "current best value");
        }
        true
    }
}

impl MinimizerOptions {
    /// Adds the [`DebugObserver`] to the minimization.
    pub fn debug(self) -> Self {
        let mut observers = self.observers;
        observers.push(Box::new(DebugObserver));
        Self { observers, ..self }
    }
    /// Adds an observer which logs the step, position, and/or value at `info` level.
    pub fn verbose(self, show_step: bool, show_x: bool, show_fx: bool) -> Self {
        let mut observers = self.observers;
        observers.push(Box::new(VerboseObserver {
            show_step,
            show_x,
            show_fx,
        }));
        Self { observers, ..self }
    }
    /// Set the [`Algorithm`] to be used in the minimization (default: [`LBFGSB`] with default
    /// settings).
    pub fn with_algorithm<A: Algorithm<Float, (), KaonffError> + 'static>(
        self,
        algorithm: A,
    ) -> Self {
        Self {
            algorithm: Box::new(algorithm),
            ..self
        }
    }
    /// Add an [`Observer`] to the list of [`Observer`]s used in the minimization.
    pub fn with_observer<O: Observer<Float, ()> + 'static>(self, observer: O) -> Self {
        let mut observers = self.observers;
        observers.push(Box::new(observer));
        Self { observers, ..self }
    }
    /// Set the maximum number of [`Algorithm`] steps for the minimization (default: 4000).
    pub fn with_max_steps(self, max_steps: usize) -> Self {
        Self { max_steps, ..self }
    }
    /// Skip the Nelder-Mead pass which a [`Fitter`](crate::fitter::Fitter) runs before the main
    /// algorithm.
    pub fn without_simplex(self) -> Self {
        Self {
            simplex: false,
            ..self
        }
    }
}

/// An identifier of a term registered with a [`LikelihoodManager`].
#[derive(Clone, Debug)]
pub struct LikelihoodID(usize);

/// A collection of [`LikelihoodTerm`]s whose parameters are unified by name.
///
/// Each term sees its own parameters through a layout of indices into the unified list.
#[derive(Default, Clone)]
pub struct LikelihoodManager {
    terms: Vec<Box<dyn LikelihoodTerm>>,
    param_name_to_index: HashMap<String, usize>,
    param_names: Vec<String>,
    param_layouts: Vec<Vec<usize>>,
}

impl LikelihoodManager {
    /// Register a term. Parameters which share a name with a previously registered parameter
    /// refer to the same value.
    pub fn register(&mut self, term: Box<dyn LikelihoodTerm>) -> LikelihoodID {
        let term_idx = self.terms.len();
        let mut param_layout = Vec::new();
        for name in term.parameters() {
            let index = match self.param_name_to_index.get(&name) {
                Some(&index) => index,
                None => {
                    let index = self.param_names.len();
                    self.param_name_to_index.insert(name.clone(), index);
                    self.param_names.push(name);
                    index
                }
            };
            param_layout.push(index);
        }
        self.param_layouts.push(param_layout);
        self.terms.push(term);
        LikelihoodID(term_idx)
    }

    /// Register a [`NormalConstraint`] on a parameter of an already registered term.
    ///
    /// # Errors
    ///
    /// Returns [`KaonffError::ParameterNotFound`] if no registered term uses `name`.
    pub fn constrain(
        &mut self,
        name: &str,
        center: Float,
        sigma: Float,
    ) -> KaonffResult<LikelihoodID> {
        if !self.param_name_to_index.contains_key(name) {
            return Err(KaonffError::ParameterNotFound {
                name: name.to_string(),
            });
        }
        Ok(self.register(Box::new(NormalConstraint::new(name, center, sigma))))
    }

    /// The unified parameter names, in order of first registration.
    pub fn parameters(&self) -> Vec<String> {
        self.param_names.clone()
    }

    /// Combine the registered terms according to `likelihood_expression`.
    pub fn load(&self, likelihood_expression: &LikelihoodExpression) -> LikelihoodEvaluator {
        LikelihoodEvaluator {
            likelihood_manager: self.clone(),
            likelihood_expression: likelihood_expression.clone(),
        }
    }
}

/// A sum of registered [`LikelihoodTerm`]s.
#[derive(Clone, Debug)]
pub enum LikelihoodExpression {
    /// A registered [`LikelihoodTerm`] referenced by an [`LikelihoodID`].
    Term(LikelihoodID),
    /// The sum of two [`LikelihoodExpression`]s.
    Add(Box<LikelihoodExpression>, Box<LikelihoodExpression>),
}

impl From<LikelihoodID> for LikelihoodExpression {
    fn from(value: LikelihoodID) -> Self {
        Self::Term(value)
    }
}

impl LikelihoodExpression {
    fn evaluate(&self, term_values: &[Float]) -> Float {
        match self {
            LikelihoodExpression::Term(lid) => term_values[lid.0],
            LikelihoodExpression::Add(a, b) => a.evaluate(term_values) + b.evaluate(term_values),
        }
    }
}

impl_op_ex!(+ |a: &LikelihoodExpression, b: &LikelihoodExpression| -> LikelihoodExpression { LikelihoodExpression::Add(Box::new(a.clone()), Box::new(b.clone()))});
impl_op_ex_commutative!(+ |a: &LikelihoodID, b: &LikelihoodExpression| -> LikelihoodExpression { LikelihoodExpression::Add(Box::new(LikelihoodExpression::Term(a.clone())), Box::new(b.clone()))});
impl_op_ex!(+ |a: &LikelihoodID, b: &LikelihoodID| -> LikelihoodExpression { LikelihoodExpression::Add(Box::new(LikelihoodExpression::Term(a.clone())), Box::new(LikelihoodExpression::Term(b.clone())))});

/// A loaded [`LikelihoodExpression`] which can be evaluated and minimized over the unified
/// parameters of its [`LikelihoodManager`].
#[derive(Clone)]
pub struct LikelihoodEvaluator {
    likelihood_manager: LikelihoodManager,
    likelihood_expression: LikelihoodExpression,
}

impl Function<Float, (), KaonffError> for LikelihoodEvaluator {
    fn evaluate(&self, parameters: &[Float], _user_data: &mut ()) -> Result<Float, KaonffError> {
        self.cost(parameters)
    }
}

impl LikelihoodEvaluator {
    /// The unified parameter names.
    pub fn parameters(&self) -> Vec<String> {
        self.likelihood_manager.parameters()
    }

    /// Evaluate the expression with parameters ordered as
    /// [`LikelihoodEvaluator::parameters`].
    pub fn cost(&self, parameters: &[Float]) -> KaonffResult<Float> {
        let n_expected = self.likelihood_manager.param_names.len();
        if parameters.len() != n_expected {
            return Err(KaonffError::ParameterLengthError {
                expected: n_expected,
                got: parameters.len(),
            });
        }
        let values = self
            .likelihood_manager
            .terms
            .iter()
            .zip(&self.likelihood_manager.param_layouts)
            .map(|(term, layout)| {
                let buffer: Vec<Float> = layout.iter().map(|&i| parameters[i]).collect();
                term.evaluate(&buffer)
            })
            .collect::<KaonffResult<Vec<Float>>>()?;
        Ok(self.likelihood_expression.evaluate(&values))
    }

    /// Minimizes the expression starting at `p0` with the given bounds and options (by default,
    /// the L-BFGS-B algorithm, a limited-memory quasi-Newton minimizer which supports bounded
    /// optimization).
    pub fn minimize(
        &self,
        p0: &[Float],
        bounds: Option<Vec<(Float, Float)>>,
        options: Option<MinimizerOptions>,
    ) -> KaonffResult<Status<Float>> {
        let options = options.unwrap_or_default();
        let mut m = Minimizer::new_from_box(options.algorithm, self.parameters().len())
            .with_bounds(bounds)
            .with_observers(options.observers)
            .with_max_steps(options.max_steps);
        m.minimize(self, p0, &mut ())?;
        Ok(m.status)
    }
}
