use float_cmp::assert_approx_eq;

use crate::{smo, Options, Problem, Status};

/// Unconstrained optimum of `x^2 - 4x` sits at 2, inside the box.
#[test]
pub fn interior_optimum() {
    let mut prob = Problem::new(1);
    prob.h[0] = 2.0;
    prob.c[0] = -4.0;
    prob.a[0] = 1.0;
    prob.u[0] = 10.0;

    let report = smo(&mut prob, &Options::default(), None).unwrap();

    assert_eq!(report.status, Status::Converged);
    assert_eq!(report.pivots, 1);
    assert_approx_eq!(f64, prob.x[0], 2.0, epsilon = 1e-12);
    assert_approx_eq!(f64, report.objective, -4.0, epsilon = 1e-12);
    assert_approx_eq!(f64, report.lambda_eq, 0.0, epsilon = 1e-12);
}

/// Same problem with the optimum cut off by the upper bound.
#[test]
pub fn bound_active() {
    let mut prob = Problem::new(1);
    prob.h[0] = 2.0;
    prob.c[0] = -4.0;
    prob.a[0] = 1.0;
    prob.u[0] = 1.0;

    let report = smo(&mut prob, &Options::default(), None).unwrap();

    assert_eq!(report.status, Status::Converged);
    assert_approx_eq!(f64, prob.x[0], 1.0, epsilon = 1e-12);
    assert_approx_eq!(f64, report.objective, -3.0, epsilon = 1e-12);
    assert_eq!(report.max_error, 0.0);
}

/// Zero quadratic term: the sign of `c` picks the bound.
#[test]
pub fn linear_descends_to_bound() {
    let mut prob = Problem::new(1);
    prob.c[0] = 3.0;
    prob.a[0] = 1.0;
    prob.l[0] = -2.0;
    prob.u[0] = 5.0;

    let report = smo(&mut prob, &Options::default(), None).unwrap();

    assert!(report.status.converged());
    assert_approx_eq!(f64, prob.x[0], -2.0, epsilon = 1e-12);
    assert_approx_eq!(f64, report.objective, -6.0, epsilon = 1e-12);
}

/// An empty problem converges without doing anything.
#[test]
fn empty_problem() {
    let mut prob = Problem::new(0);

    let report = smo(&mut prob, &Options::default(), None).unwrap();

    assert!(report.status.converged());
    assert_eq!(report.iterations, 0);
    assert_eq!(report.pivots, 0);
    assert_eq!(report.objective, 0.0);
    assert_eq!(report.lambda_eq, 0.0);
}

/// Contract violations surface as errors, not as a solve status.
#[test]
fn rejects_bad_options_and_arrays() {
    let mut prob = Problem::new(1);
    prob.a[0] = 1.0;
    prob.u[0] = 1.0;

    let mut opt = Options::default();
    opt.is_zero = 0.0;
    assert!(smo(&mut prob, &opt, None).is_err());

    let mut opt = Options::default();
    opt.max_allowed_error = -1.0;
    assert!(smo(&mut prob, &opt, None).is_err());

    let opt = Options::default();
    prob.a[0] = 0.0;
    assert!(smo(&mut prob, &opt, None).is_err());
}
