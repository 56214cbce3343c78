use dyn_clone::DynClone;

use crate::{Float, KaonffResult};

/// A parametric function $`y(x; \vec{p})`$ which can be compared to measured points, for
/// instance a cross section evaluated at a set of center-of-mass energies.
///
/// The parameter names are declared explicitly and the values passed to
/// [`Curve::evaluate`] always follow the order of [`Curve::parameters`].
pub trait Curve: DynClone + Send + Sync {
    /// The names of the free parameters, in the order they are expected by
    /// [`Curve::evaluate`].
    fn parameters(&self) -> Vec<String>;
    /// Evaluate the curve at each value in `xs`.
    fn evaluate(&self, xs: &[Float], parameters: &[Float]) -> KaonffResult<Vec<Float>>;
}

dyn_clone::clone_trait_object!(Curve);

/// A density used in an extended unbinned likelihood.
///
/// [`Density::evaluate`] returns the expected number of events in the fit domain together with
/// the density (in events per unit of $`x`$) at each value in `xs`. The integral of the
/// density over [`Density::domain`] is expected to equal the expected number of events.
pub trait Density: DynClone + Send + Sync {
    /// The names of the free parameters, in the order they are expected by
    /// [`Density::evaluate`].
    fn parameters(&self) -> Vec<String>;
    /// The domain `(xmin, xmax)` over which the density is normalized.
    fn domain(&self) -> (Float, Float);
    /// Evaluate `(expected_count, densities)` for the given values of `x`.
    fn evaluate(&self, xs: &[Float], parameters: &[Float]) -> KaonffResult<(Float, Vec<Float>)>;
}

dyn_clone::clone_trait_object!(Density);
