use std::cell::RefCell;

use crate::{smo, Options, Problem, ProgressMonitor, Status};

struct Recorder {
    rows: RefCell<Vec<(usize, f64, f64)>>,
    stop_after: Option<usize>,
}

impl Recorder {
    fn new(stop_after: Option<usize>) -> Self {
        Self {
            rows: RefCell::new(Vec::new()),
            stop_after,
        }
    }
}

impl ProgressMonitor for Recorder {
    fn update(&self, i: usize, max_error: f64, obj: f64, _lambda_eq: f64, _stalls: usize) -> bool {
        self.rows.borrow_mut().push((i, max_error, obj));
        match self.stop_after {
            Some(limit) => i < limit,
            None => true,
        }
    }
}

fn margin_problem() -> Problem {
    let points = [2.0, 1.0, -1.0, -2.0];
    let labels = [1.0, 1.0, -1.0, -1.0];
    let mut prob = Problem::new(4);
    for i in 0..4 {
        for j in 0..4 {
            prob.h[i * 4 + j] = labels[i] * labels[j] * points[i] * points[j];
        }
        prob.c[i] = -1.0;
        prob.a[i] = labels[i];
        prob.u[i] = 10.0;
    }
    prob
}

/// The objective handed to the monitor never increases: pivots that
/// cannot decrease it are rejected.
#[test]
pub fn objective_is_monotone() {
    let mut prob = margin_problem();
    let mut opt = Options::default();
    opt.max_allowed_error = 1e-6;
    let recorder = Recorder::new(None);

    let report = smo(&mut prob, &opt, Some(&recorder)).unwrap();

    assert!(report.status.converged());
    let rows = recorder.rows.borrow();
    assert!(!rows.is_empty());
    for w in rows.windows(2) {
        assert!(w[1].2 <= w[0].2 + 1e-9);
    }
}

/// Returning false from the monitor cancels the run before any pivot.
#[test]
pub fn cancel_before_first_pivot() {
    let mut prob = margin_problem();
    let recorder = Recorder::new(Some(0));

    let report = smo(&mut prob, &Options::default(), Some(&recorder)).unwrap();

    assert_eq!(report.status, Status::Cancelled);
    assert_eq!(report.iterations, 0);
    assert_eq!(report.pivots, 0);
    assert_eq!(prob.x, vec![0.0; 4]);
    assert_eq!(recorder.rows.borrow().len(), 1);
}

/// Cancelling mid-run keeps the partial iterate feasible.
#[test]
fn cancel_mid_run() {
    let mut prob = margin_problem();
    let mut opt = Options::default();
    opt.max_allowed_error = 1e-9;
    let recorder = Recorder::new(Some(1));

    let report = smo(&mut prob, &opt, Some(&recorder)).unwrap();

    assert_eq!(report.status, Status::Cancelled);
    assert!(report.pivots >= 1);
    for i in 0..4 {
        assert!(prob.x[i] >= -1e-9 && prob.x[i] <= 10.0 + 1e-9);
    }
}
