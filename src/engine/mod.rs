//! The constraint-programming kernel: domain store, trailed state,
//! propagation queue and depth-first branch-and-bound search.

pub(crate) mod assignments;
pub(crate) mod objective;
pub(crate) mod propagation;
mod solver;
#[cfg(test)]
pub(crate) mod test_solver;
pub(crate) mod trailed;

pub use solver::ModelError;
pub use solver::OptimisationResult;
pub use solver::Solver;
pub use solver::SolverStatistics;
pub use solver::WcssBound;
