use crate::common::{Options, Report, Status};
use crate::math::dot;
use crate::pair::{solve_pair, solve_single, Coord};
use crate::problem::Problem;
use crate::traits::ProgressMonitor;
use anyhow::{bail, Result};
use itertools::izip;
use log::{debug, trace};

fn sign(a: f64) -> f64 {
    if a > 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Where an iterate sits relative to its box, within `is_zero`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pin {
    Lower,
    Upper,
    Free,
}

/// Outcome of one KKT scan over every index.
struct Scan {
    /// Largest violation over every index, the termination measure.
    max_error: f64,
    /// Worst violator, excluding the previous iteration's pick.
    max_i: usize,
    /// Most satisfied index, excluding the previous iteration's pick.
    min_i: usize,
}

/// Selection state owned by a single solve call and threaded through the
/// outer loop, keeping the Problem itself reusable.
struct Workspace {
    /// Gradient cache `sum[k] = sum_j H[k,j]*x[j]`.
    sum: Vec<f64>,
    /// KKT violation per index, from the latest scan.
    err: Vec<f64>,
    /// Bound status per index, from the latest scan.
    pin: Vec<Pin>,
    /// Consecutive iterations in which no pair moved.
    stalls: usize,
    /// Accepted pivots.
    pivots: usize,
    old_max: Option<usize>,
    old_min: Option<usize>,
}

impl Workspace {
    /// O(n²) setup of the gradient cache from the current iterate.
    fn new(prob: &Problem) -> Self {
        let n = prob.n();
        let mut sum = vec![0.0; n];
        for k in 0..n {
            sum[k] = dot(prob.row(k), &prob.x);
        }
        Self {
            sum,
            err: vec![0.0; n],
            pin: vec![Pin::Free; n],
            stalls: 0,
            pivots: 0,
            old_max: None,
            old_min: None,
        }
    }

    /// Scores the KKT violation of every index in one pass. At a lower
    /// bound only a negative reduced gradient is a violation, at an upper
    /// bound only a positive one; an interior variable must carry no net
    /// force once `lambda_eq` is accounted for.
    fn scan(&mut self, prob: &Problem, opt: &Options) -> Scan {
        let lambda = prob.lambda_eq();
        let Workspace {
            sum,
            err,
            pin,
            old_max,
            old_min,
            ..
        } = self;

        let mut scan = Scan {
            max_error: 0.0,
            max_i: 0,
            min_i: 0,
        };
        let (mut max_val, mut min_val) = (f64::NEG_INFINITY, f64::INFINITY);

        for (i, (&c, &a, &l, &u, &x, &si, e, p)) in izip!(
            &prob.c,
            &prob.a,
            &prob.l,
            &prob.u,
            &prob.x,
            sum.iter(),
            err.iter_mut(),
            pin.iter_mut()
        )
        .enumerate()
        {
            let g = c + si + lambda * sign(a);
            *p = if (x - l).abs() <= opt.is_zero {
                Pin::Lower
            } else if (u - x).abs() <= opt.is_zero {
                Pin::Upper
            } else {
                Pin::Free
            };
            *e = match *p {
                Pin::Lower => -g,
                Pin::Upper => g,
                Pin::Free => g.abs(),
            };

            if *e > scan.max_error {
                scan.max_error = *e;
            }
            if *old_max != Some(i) && *e > max_val {
                max_val = *e;
                scan.max_i = i;
            }
            if *old_min != Some(i) && *e < min_val {
                min_val = *e;
                scan.min_i = i;
            }
        }
        scan
    }

    /// Second selection pass: among the indices free to move against `i`
    /// along the constraint, the one whose adjusted violation lies
    /// farthest from `i`'s promises the largest decrease.
    fn select_partner(&self, prob: &Problem, i: usize) -> Option<usize> {
        let lambda = prob.lambda_eq();
        let w = |k: usize| sign(prob.a[k]) * (prob.c[k] + self.sum[k]) + lambda;
        let w_i = w(i);
        // The pivot moves i's constraint contribution against w_i and the
        // partner's the opposite way; a partner pinned at the bound that
        // blocks that move is skipped.
        let partner_up = w_i > 0.0;

        let mut best: Option<(usize, f64)> = None;
        for j in 0..prob.n() {
            if j == i {
                continue;
            }
            let s_j = sign(prob.a[j]);
            let blocked = match self.pin[j] {
                Pin::Free => false,
                Pin::Upper => partner_up == (s_j > 0.0),
                Pin::Lower => partner_up != (s_j > 0.0),
            };
            if blocked {
                continue;
            }
            let d = (w(j) - w_i).abs();
            if best.map_or(true, |(_, bd)| d > bd) {
                best = Some((j, d));
            }
        }
        best.map(|(j, _)| j)
    }

    /// Runs the sub-solver on the pair. On movement the gradient cache
    /// gets the O(n) rank-2 update and `lambda_eq` is refreshed.
    fn pivot(&mut self, prob: &mut Problem, i: usize, j: usize, opt: &Options) -> bool {
        let n = prob.n();
        let h_ij = prob.h[i * n + j];
        let (xi, xj) = (prob.x[i], prob.x[j]);

        // Reduced linear terms: the gradient at the current point minus
        // the pair's own contribution.
        let pi = Coord {
            h: 0.5 * prob.h[i * n + i],
            c: prob.c[i] + self.sum[i] - prob.h[i * n + i] * xi - h_ij * xj,
            s: sign(prob.a[i]),
            x: xi,
            l: prob.l[i],
            u: prob.u[i],
        };
        let pj = Coord {
            h: 0.5 * prob.h[j * n + j],
            c: prob.c[j] + self.sum[j] - prob.h[j * n + j] * xj - h_ij * xi,
            s: sign(prob.a[j]),
            x: xj,
            l: prob.l[j],
            u: prob.u[j],
        };

        let (yi, yj) = solve_pair(pi, pj, h_ij, opt.is_zero);
        let (di, dj) = (yi - xi, yj - xj);
        if di.abs() < opt.is_zero && dj.abs() < opt.is_zero {
            return false;
        }

        prob.x[i] = yi;
        prob.x[j] = yj;
        // Rank-2 update; rows i and j stand in for columns of the
        // symmetric H.
        for (sk, &hik, &hjk) in izip!(self.sum.iter_mut(), prob.row(i), prob.row(j)) {
            *sk += hik * di + hjk * dj;
        }
        self.pivots += 1;
        self.calc_lambda_eq(prob, opt);
        true
    }

    /// Main pivot for the scan winner: try the refined partner first,
    /// then advance round-robin over the remaining indices until a pair
    /// moves.
    fn pivot_max(&mut self, prob: &mut Problem, i: usize, opt: &Options) -> bool {
        let n = prob.n();
        let start = match self.select_partner(prob, i) {
            Some(j) => j,
            None => (i + 1) % n,
        };
        for off in 0..n {
            let j = (start + off) % n;
            if j == i {
                continue;
            }
            if self.pivot(prob, i, j, opt) {
                return true;
            }
        }
        false
    }

    /// Corrective pass over bound-pinned variables left suboptimal by
    /// drift from other pivots: each is tried against the scan reference
    /// whose violation value is closer, then against the other. Skipping
    /// this pass risks non-termination.
    fn sweep(&mut self, prob: &mut Problem, scan: &Scan, opt: &Options) {
        for k in 0..prob.n() {
            if self.pin[k] == Pin::Free || self.err[k] <= opt.max_allowed_error {
                continue;
            }
            let e_k = self.err[k];
            let (first, second) =
                if (e_k - self.err[scan.min_i]).abs() < (e_k - self.err[scan.max_i]).abs() {
                    (scan.min_i, scan.max_i)
                } else {
                    (scan.max_i, scan.min_i)
                };
            if first != k && self.pivot(prob, k, first, opt) {
                continue;
            }
            if second != k && second != first {
                self.pivot(prob, k, second, opt);
            }
        }
    }

    /// Stationarity estimate of the equality multiplier: the mean
    /// adjusted negative gradient over interior variables. On a vertex,
    /// the midpoint (or the finite end) of the interval that the pinned
    /// KKT sign conditions leave feasible.
    fn calc_lambda_eq(&self, prob: &mut Problem, opt: &Options) {
        let mut acc = 0.0;
        let mut free = 0usize;
        let (mut lo, mut hi) = (f64::NEG_INFINITY, f64::INFINITY);

        for (&c, &a, &l, &u, &x, &si) in
            izip!(&prob.c, &prob.a, &prob.l, &prob.u, &prob.x, &self.sum)
        {
            let s = sign(a);
            let v = s * (c + si);
            if (x - l).abs() <= opt.is_zero {
                if s > 0.0 {
                    lo = lo.max(-v);
                } else {
                    hi = hi.min(-v);
                }
            } else if (u - x).abs() <= opt.is_zero {
                if s > 0.0 {
                    hi = hi.min(-v);
                } else {
                    lo = lo.max(-v);
                }
            } else {
                acc -= v;
                free += 1;
            }
        }

        prob.lambda_eq = if free > 0 {
            acc / free as f64
        } else if lo.is_finite() && hi.is_finite() {
            0.5 * (lo + hi)
        } else if lo.is_finite() {
            lo
        } else if hi.is_finite() {
            hi
        } else {
            0.0
        };
    }
}

/// Sizes without a working-set pair: `n == 0` is trivially optimal and
/// `n == 1` admits no equality-preserving exchange, so the constraint is
/// treated as vacuous, the multiplier estimate stays zero and the single
/// variable is minimized over its box directly.
fn solve_univariate(prob: &mut Problem, opt: &Options) -> Report {
    prob.lambda_eq = 0.0;
    let mut pivots = 0;
    let mut max_error = 0.0;

    if prob.n() == 1 {
        let grad = prob.c[0] + prob.h[0] * prob.x[0];
        let y = solve_single(
            0.5 * prob.h[0],
            grad,
            prob.x[0],
            prob.l[0],
            prob.u[0],
            opt.is_zero,
        );
        if (y - prob.x[0]).abs() >= opt.is_zero {
            prob.x[0] = y;
            pivots = 1;
        }

        // Residual first-order error at the final point.
        let g = prob.c[0] + prob.h[0] * prob.x[0];
        let at_l = (prob.x[0] - prob.l[0]).abs() <= opt.is_zero;
        let at_u = (prob.u[0] - prob.x[0]).abs() <= opt.is_zero;
        max_error = match (at_l, at_u) {
            (true, true) => 0.0,
            (true, false) => (-g).max(0.0),
            (false, true) => g.max(0.0),
            (false, false) => g.abs(),
        };
    }

    Report {
        status: Status::Converged,
        iterations: pivots,
        pivots,
        stalls: 0,
        max_error,
        objective: prob.objective(),
        lambda_eq: prob.lambda_eq(),
    }
}

/// Sequential minimal optimization for the box-constrained QP
///
/// ```txt
///       min c'*x + 1/2 x'*H*x
///        x
/// ```
///
/// subject to
///
/// ```txt
///       A*x = b         (single equality constraint)
///       l <= x <= u     (variable bounds)
/// ```
///
/// described by `prob`, whose iterate `x` is optimized in place. Every
/// pivot exchanges weight between two variables so that `A*x` keeps the
/// value it had on entry; the iterate stays feasible throughout and is
/// usable as an approximate solution whenever the run ends.
///
/// Returns a [`Report`] carrying the terminal [`Status`] and the solve
/// diagnostics. Non-convergence is reported through the status, never as
/// an `Err`; errors are reserved for caller contract violations.
pub fn smo(
    prob: &mut Problem,
    opt: &Options,
    progress: Option<&dyn ProgressMonitor>,
) -> Result<Report> {
    if !(opt.is_zero > 0.0 && opt.is_zero.is_finite()) {
        bail!("is_zero ({}) must be a positive tolerance", opt.is_zero);
    }
    if !(opt.max_allowed_error > 0.0 && opt.max_allowed_error.is_finite()) {
        bail!(
            "max_allowed_error ({}) must be a positive tolerance",
            opt.max_allowed_error
        );
    }
    prob.validate()?;

    let n = prob.n();
    debug!(
        "n = {}, max_allowed_error = {:e}, budget = {}",
        n, opt.max_allowed_error, opt.max_iteration
    );
    if n <= 1 {
        return Ok(solve_univariate(prob, opt));
    }

    let mut ws = Workspace::new(prob);
    ws.calc_lambda_eq(prob, opt);

    let mut status = Status::MaxIterations;
    let mut iterations = 0;
    let mut max_error = f64::INFINITY;

    for it in 0..opt.max_iteration {
        // Score every index, then check termination.
        let scan = ws.scan(prob, opt);
        max_error = scan.max_error;
        let obj = dot(&prob.c, &prob.x) + 0.5 * dot(&prob.x, &ws.sum);
        trace!(
            "it {}: max_error = {:e}, obj = {:e}, lambda_eq = {:e}, stalls = {}",
            it,
            scan.max_error,
            obj,
            prob.lambda_eq(),
            ws.stalls
        );

        if scan.max_error <= opt.max_allowed_error {
            status = Status::Converged;
            break;
        }
        if let Some(progress) = progress {
            if !progress.update(it, scan.max_error, obj, prob.lambda_eq(), ws.stalls) {
                status = Status::Cancelled;
                break;
            }
        }

        // A stuck iteration demotes the scan's pick to plain round-robin.
        let max_i = if ws.stalls >= 1 {
            match ws.old_max {
                Some(prev) => (prev + 1) % n,
                None => scan.max_i,
            }
        } else {
            scan.max_i
        };

        iterations = it + 1;
        if ws.pivot_max(prob, max_i, opt) {
            ws.stalls = 0;
        } else {
            ws.stalls += 1;
            if ws.stalls >= n {
                status = Status::Stalled { attempts: ws.stalls };
                break;
            }
        }

        ws.sweep(prob, &scan, opt);

        ws.old_max = Some(max_i);
        ws.old_min = Some(scan.min_i);
    }

    let report = Report {
        status,
        iterations,
        pivots: ws.pivots,
        stalls: ws.stalls,
        max_error,
        objective: dot(&prob.c, &prob.x) + 0.5 * dot(&prob.x, &ws.sum),
        lambda_eq: prob.lambda_eq(),
    };
    debug!(
        "{} after {} iterations and {} pivots",
        report.status, report.iterations, report.pivots
    );
    Ok(report)
}
