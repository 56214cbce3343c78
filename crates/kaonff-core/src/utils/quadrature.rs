use serde::{Deserialize, Serialize};

use crate::{Float, KaonffError, KaonffResult, PI};

/// The number of Gauss-Legendre nodes per panel used by [`integrate`].
pub const DEFAULT_ORDER: usize = 16;
/// The default relative tolerance used by [`integrate`].
pub const DEFAULT_REL_TOL: Float = 1e-10;
const MAX_DEPTH: usize = 40;
const MAX_PANELS: usize = 10_000;

/// A Gauss-Legendre rule on $`[-1, 1]`$.
#[derive(Clone, Debug)]
pub struct GaussLegendre {
    nodes: Vec<Float>,
    weights: Vec<Float>,
}

impl GaussLegendre {
    /// Build the `order`-point rule. Roots of $`P_n`$ are found by Newton iteration from the
    /// Chebyshev guess, and only the positive half is computed.
    pub fn new(order: usize) -> Self {
        let n = order.max(1);
        let mut nodes = vec![0.0; n];
        let mut weights = vec![0.0; n];
        if n == 1 {
            weights[0] = 2.0;
            return Self { nodes, weights };
        }
        let nf = n as Float;
        for i in 0..n.div_ceil(2) {
            let mut x = (PI * (i as Float + 0.75) / (nf + 0.5)).cos();
            let mut dp = 1.0;
            for _ in 0..100 {
                let (pn, pn1) = legendre_pair(n, x);
                dp = nf * (x * pn - pn1) / (x * x - 1.0);
                let dx = pn / dp;
                x -= dx;
                if dx.abs() < 1e-15 {
                    let (pn, pn1) = legendre_pair(n, x);
                    dp = nf * (x * pn - pn1) / (x * x - 1.0);
                    break;
                }
            }
            let w = 2.0 / ((1.0 - x * x) * dp * dp);
            nodes[i] = -x;
            nodes[n - 1 - i] = x;
            weights[i] = w;
            weights[n - 1 - i] = w;
        }
        Self { nodes, weights }
    }

    /// The nodes on $`[-1, 1]`$.
    pub fn nodes(&self) -> &[Float] {
        &self.nodes
    }

    /// The weights on $`[-1, 1]`$ (they sum to 2).
    pub fn weights(&self) -> &[Float] {
        &self.weights
    }

    /// Nodes and weights mapped onto $`[a, b]`$.
    pub fn mapped(&self, a: Float, b: Float) -> (Vec<Float>, Vec<Float>) {
        let half_len = (b - a) / 2.0;
        let mid = (a + b) / 2.0;
        (
            self.nodes.iter().map(|&x| mid + half_len * x).collect(),
            self.weights.iter().map(|&w| w * half_len).collect(),
        )
    }

    /// Apply the rule once on $`[a, b]`$.
    pub fn integrate<F>(&self, f: &F, a: Float, b: Float) -> Float
    where
        F: Fn(Float) -> Float,
    {
        let half_len = (b - a) / 2.0;
        let mid = (a + b) / 2.0;
        self.nodes
            .iter()
            .zip(&self.weights)
            .map(|(&x, &w)| w * f(mid + half_len * x))
            .sum::<Float>()
            * half_len
    }
}

/// Returns $`(P_n(x), P_{n-1}(x))`$ from the three-term recurrence.
fn legendre_pair(n: usize, x: Float) -> (Float, Float) {
    let mut p0 = 1.0;
    let mut p1 = x;
    for j in 2..=n {
        let jf = j as Float;
        let p2 = ((2.0 * jf - 1.0) * x * p1 - (jf - 1.0) * p0) / jf;
        p0 = p1;
        p1 = p2;
    }
    (p1, p0)
}

/// The value of a definite integral together with an estimate of its absolute error.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Integral {
    /// The integral estimate
    pub value: Float,
    /// The summed difference between each accepted panel and its two halves
    pub error: Float,
}

/// Integrate `f` over $`[a, b]`$ with the default rule and tolerance.
///
/// See [`integrate_with`].
pub fn integrate<F>(f: F, a: Float, b: Float) -> KaonffResult<Integral>
where
    F: Fn(Float) -> Float,
{
    integrate_with(f, a, b, DEFAULT_ORDER, DEFAULT_REL_TOL)
}

/// Adaptive Gauss-Legendre integration of `f` over $`[a, b]`$.
///
/// Each panel is compared with the sum of its two halves, and panels whose difference exceeds
/// their share of `rel_tol` times the running estimate are bisected. Panels which reach the
/// maximum depth are accepted as they are and still contribute to the error estimate.
///
/// # Errors
///
/// Returns [`KaonffError::QuadratureError`] if the integrand produces a non-finite value or the
/// panel budget is exhausted.
pub fn integrate_with<F>(
    f: F,
    a: Float,
    b: Float,
    order: usize,
    rel_tol: Float,
) -> KaonffResult<Integral>
where
    F: Fn(Float) -> Float,
{
    if !(a.is_finite() && b.is_finite()) {
        return Err(KaonffError::QuadratureError {
            reason: format!("integration bounds ({}, {}) are not finite", a, b),
        });
    }
    if a == b {
        return Ok(Integral {
            value: 0.0,
            error: 0.0,
        });
    }
    if a > b {
        let reversed = integrate_with(f, b, a, order, rel_tol)?;
        return Ok(Integral {
            value: -reversed.value,
            error: reversed.error,
        });
    }
    let rule = GaussLegendre::new(order);
    let total_width = b - a;
    let first = rule.integrate(&f, a, b);
    check_finite(first, a, b)?;
    let mut estimate = first.abs();
    let mut stack = vec![(a, b, first, 0usize)];
    let mut value = 0.0;
    let mut error = 0.0;
    let mut panels = 0usize;
    while let Some((lo, hi, whole, depth)) = stack.pop() {
        panels += 1;
        if panels > MAX_PANELS {
            return Err(KaonffError::QuadratureError {
                reason: format!(
                    "panel budget exhausted on ({}, {}) with {} panels",
                    a, b, MAX_PANELS
                ),
            });
        }
        let mid = 0.5 * (lo + hi);
        let left = rule.integrate(&f, lo, mid);
        let right = rule.integrate(&f, mid, hi);
        check_finite(left + right, lo, hi)?;
        let refined = left + right;
        let diff = (refined - whole).abs();
        estimate = estimate.max(refined.abs());
        let tolerance = (rel_tol * estimate).max(Float::MIN_POSITIVE) * (hi - lo) / total_width;
        if diff <= tolerance || depth >= MAX_DEPTH {
            value += refined;
            error += diff;
        } else {
            stack.push((mid, hi, right, depth + 1));
            stack.push((lo, mid, left, depth + 1));
        }
    }
    Ok(Integral { value, error })
}

fn check_finite(value: Float, lo: Float, hi: Float) -> KaonffResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(KaonffError::QuadratureError {
            reason: format!("integrand is not finite on ({}, {})", lo, hi),
        })
    }
}
