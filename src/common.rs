use std::fmt;

pub struct Options {
    /// Termination tolerance on the largest KKT violation.
    pub max_allowed_error: f64,
    /// Values closer to a bound than this are snapped onto it; curvatures
    /// and step lengths below it are treated as zero.
    pub is_zero: f64,

    /// Maximum number of outer iterations.
    pub max_iteration: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_allowed_error: 1e-3,
            is_zero: 1e-10,

            max_iteration: 100_000,
        }
    }
}

/// Terminal state of a solve run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Every KKT violation is within `max_allowed_error`.
    Converged,
    /// The iteration budget ran out; the iterate holds the best point found.
    MaxIterations,
    /// No working-set pair produced movement for `n` consecutive iterations.
    Stalled {
        /// Consecutive stuck iterations at the point of failure.
        attempts: usize,
    },
    /// A progress monitor asked for an early stop.
    Cancelled,
}

impl Status {
    /// Whether the run ended with the KKT conditions satisfied.
    pub fn converged(&self) -> bool {
        matches!(self, Status::Converged)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Converged => write!(f, "converged"),
            Status::MaxIterations => write!(f, "iteration budget exhausted"),
            Status::Stalled { attempts } => {
                write!(f, "stalled after {} stuck iterations", attempts)
            }
            Status::Cancelled => write!(f, "cancelled by monitor"),
        }
    }
}

/// Diagnostics from one solve run.
#[derive(Debug, Clone, Copy)]
pub struct Report {
    /// Terminal state of the run.
    pub status: Status,
    /// Outer iterations that reached the pivot phase.
    pub iterations: usize,
    /// Working-set pivots that moved the iterate.
    pub pivots: usize,
    /// Consecutive stuck iterations at exit.
    pub stalls: usize,
    /// Largest KKT violation at the last scan.
    pub max_error: f64,
    /// Objective value `c'x + x'Hx/2` at exit.
    pub objective: f64,
    /// Final estimate of the equality-constraint multiplier.
    pub lambda_eq: f64,
}
