/// One coordinate of a working-set pair, extracted from the problem
/// arrays: half quadratic diagonal `h = H[k,k]/2`, reduced linear term
/// `c` (the gradient at the current point minus the pair's own
/// contribution), constraint sign `s`, current value and bounds.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Coord {
    pub h: f64,
    pub c: f64,
    pub s: f64,
    pub x: f64,
    pub l: f64,
    pub u: f64,
}

/// Minimizes the pair objective along the line `x_i + s_i*t`,
/// `x_j - s_j*t`, which keeps `s_i*x_i + s_j*x_j` constant, clipped to
/// both boxes. Returns the new pair values, snapped onto a bound when
/// within `is_zero` of it. The result is always feasible; when no step
/// can decrease the objective the inputs come back unchanged.
pub(crate) fn solve_pair(pi: Coord, pj: Coord, h_ij: f64, is_zero: f64) -> (f64, f64) {
    // Feasible step interval. Both boxes admit t = 0, so lo <= 0 <= up.
    let (lo_i, up_i) = if pi.s > 0.0 {
        (pi.l - pi.x, pi.u - pi.x)
    } else {
        (pi.x - pi.u, pi.x - pi.l)
    };
    let (lo_j, up_j) = if pj.s > 0.0 {
        (pj.x - pj.u, pj.x - pj.l)
    } else {
        (pj.l - pj.x, pj.u - pj.x)
    };
    let lo = lo_i.max(lo_j);
    let up = up_i.min(up_j);

    // Slope and curvature of the objective along the line.
    let g_i = 2.0 * pi.h * pi.x + h_ij * pj.x + pi.c;
    let g_j = 2.0 * pj.h * pj.x + h_ij * pi.x + pj.c;
    let slope = pi.s * g_i - pj.s * g_j;
    let curv = 2.0 * (pi.h + pj.h - pi.s * pj.s * h_ij);

    let t = if curv > is_zero {
        (-slope / curv).clamp(lo, up)
    } else if curv < -is_zero {
        // Concave along the line: a minimizer sits on an endpoint. Take
        // the one that decreases the objective, if either does.
        let f_lo = slope * lo + 0.5 * curv * lo * lo;
        let f_up = slope * up + 0.5 * curv * up * up;
        if f_lo.min(f_up) >= 0.0 {
            0.0
        } else if f_lo < f_up {
            lo
        } else {
            up
        }
    } else if slope > is_zero {
        lo
    } else if slope < -is_zero {
        up
    } else {
        0.0
    };

    (
        snap(pi.x + pi.s * t, pi.l, pi.u, is_zero),
        snap(pj.x - pj.s * t, pj.l, pj.u, is_zero),
    )
}

/// Univariate companion of [`solve_pair`] for problems with a single
/// variable, where no equality coupling exists: minimizes
/// `grad*t + h*t^2` over the step interval left by the box.
pub(crate) fn solve_single(h: f64, grad: f64, x: f64, l: f64, u: f64, is_zero: f64) -> f64 {
    let (lo, up) = (l - x, u - x);
    let curv = 2.0 * h;

    let t = if curv > is_zero {
        (-grad / curv).clamp(lo, up)
    } else if curv < -is_zero {
        let f_lo = grad * lo + 0.5 * curv * lo * lo;
        let f_up = grad * up + 0.5 * curv * up * up;
        if f_lo.min(f_up) >= 0.0 {
            0.0
        } else if f_lo < f_up {
            lo
        } else {
            up
        }
    } else if grad > is_zero {
        lo
    } else if grad < -is_zero {
        up
    } else {
        0.0
    };

    snap(x + t, l, u, is_zero)
}

fn snap(v: f64, l: f64, u: f64, is_zero: f64) -> f64 {
    if (v - l).abs() < is_zero {
        l
    } else if (u - v).abs() < is_zero {
        u
    } else {
        v
    }
}
