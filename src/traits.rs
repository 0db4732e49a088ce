/// Called on each iteration of the solver with the current
/// iteration number, largest KKT violation, objective function value,
/// equality-multiplier estimate and the stuck-iteration counter.
///
/// Returning `false` stops the solver before the next pivot; the run
/// then ends with [`Status::Cancelled`](crate::Status::Cancelled).
pub trait ProgressMonitor {
    fn update(&self, i: usize, max_error: f64, obj: f64, lambda_eq: f64, stalls: usize) -> bool;
}
