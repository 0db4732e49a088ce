use crate::math::dot;
use anyhow::{ensure, Result};

/// Box-constrained QP (quadratic programming) problem with a single
/// linear equality constraint:
///
/// ```txt
///       min c'*x + 1/2 x'*H*x
///        x
/// ```
///
/// subject to
///
/// ```txt
///       A*x = b         (equality constraint)
///       l <= x <= u     (variable bounds)
/// ```
///
/// `h` is a dense row-major matrix (`h[i*n + j]`) of quadratic cost
/// coefficients and is assumed symmetric. Only the signs of the entries
/// of `a` enter the solver, so callers keep them unit-magnitude
/// (typically the ±1 labels of a classification task). The coefficient
/// arrays are written directly, index by index, after [`resize`](Problem::resize).
pub struct Problem {
    n: usize,

    /// Linear cost coefficients, length `n`.
    pub c: Vec<f64>,
    /// Quadratic cost coefficients, row-major, length `n*n`.
    pub h: Vec<f64>,
    /// Equality-constraint coefficients, length `n`, every entry nonzero.
    pub a: Vec<f64>,
    /// Equality-constraint right-hand side. Kept for the caller's
    /// bookkeeping; pivots preserve the constraint value of the starting
    /// iterate rather than re-deriving it from `b`.
    pub b: f64,
    /// Lower variable bounds, length `n`.
    pub l: Vec<f64>,
    /// Upper variable bounds, length `n`, `l[i] <= u[i]`.
    pub u: Vec<f64>,
    /// Optimization variables, length `n`. Zeroed on resize and updated
    /// in place by the solver.
    pub x: Vec<f64>,

    pub(crate) lambda_eq: f64,
}

impl Problem {
    /// Creates a problem of the given size with every coefficient zeroed.
    pub fn new(n: usize) -> Self {
        let mut prob = Self {
            n: 0,
            c: Vec::new(),
            h: Vec::new(),
            a: Vec::new(),
            b: 0.0,
            l: Vec::new(),
            u: Vec::new(),
            x: Vec::new(),
            lambda_eq: 0.0,
        };
        prob.resize(n);
        prob
    }

    /// Number of optimization variables.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Estimate of the Lagrange multiplier on the equality constraint,
    /// refreshed by the solver after every accepted pivot.
    pub fn lambda_eq(&self) -> f64 {
        self.lambda_eq
    }

    /// (Re)allocates the coefficient arrays for `n` variables and zeroes
    /// them, along with `b`, the iterate and the multiplier estimate.
    pub fn resize(&mut self, n: usize) {
        fn zeroed(v: &mut Vec<f64>, len: usize) {
            v.clear();
            v.resize(len, 0.0);
        }
        self.n = n;
        zeroed(&mut self.c, n);
        zeroed(&mut self.h, n * n);
        zeroed(&mut self.a, n);
        zeroed(&mut self.l, n);
        zeroed(&mut self.u, n);
        zeroed(&mut self.x, n);
        self.b = 0.0;
        self.lambda_eq = 0.0;
    }

    /// Checks the caller-populated arrays against the declared size and
    /// the bound contract. The solver runs this before touching any state.
    pub fn validate(&self) -> Result<()> {
        let n = self.n;
        ensure!(self.c.len() == n, "c has length {}, expected {}", self.c.len(), n);
        ensure!(
            self.h.len() == n * n,
            "h has length {}, expected {}",
            self.h.len(),
            n * n
        );
        ensure!(self.a.len() == n, "a has length {}, expected {}", self.a.len(), n);
        ensure!(self.l.len() == n, "l has length {}, expected {}", self.l.len(), n);
        ensure!(self.u.len() == n, "u has length {}, expected {}", self.u.len(), n);
        ensure!(self.x.len() == n, "x has length {}, expected {}", self.x.len(), n);
        for i in 0..n {
            ensure!(
                self.l[i] <= self.u[i],
                "bounds crossed at {}: l = {} > u = {}",
                i,
                self.l[i],
                self.u[i]
            );
            ensure!(
                self.l[i] <= self.x[i] && self.x[i] <= self.u[i],
                "iterate outside bounds at {}: x = {} not in [{}, {}]",
                i,
                self.x[i],
                self.l[i],
                self.u[i]
            );
            ensure!(self.a[i] != 0.0, "equality coefficient {} is zero", i);
        }
        Ok(())
    }

    /// Evaluates the objective function `c'x + x'Hx/2` at the current
    /// iterate in `O(n^2)`.
    pub fn objective(&self) -> f64 {
        let mut quad = 0.0;
        for i in 0..self.n {
            quad += self.x[i] * dot(self.row(i), &self.x);
        }
        dot(&self.c, &self.x) + 0.5 * quad
    }

    /// Row `k` of `h`.
    pub(crate) fn row(&self, k: usize) -> &[f64] {
        &self.h[k * self.n..(k + 1) * self.n]
    }
}
