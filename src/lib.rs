mod common;
mod math;
mod pair;
mod problem;
mod smo;
#[cfg(test)]
mod tests;
mod traits;

pub use common::*;
pub use problem::Problem;
pub use smo::smo;
pub use traits::*;
