//! # mssc-solver
//!
//! An exact solver for cardinality-constrained Minimum Sum-of-Squares
//! Clustering (MSSC): assign each of `N` observations to one of `K` clusters
//! so that the total within-cluster sum of squares is minimal and each
//! cluster `c` ends up with exactly `target[c]` observations.
//!
//! The solver is a small constraint-programming kernel built around three
//! ingredients:
//! * cost-based filtering propagators which bound the objective from below
//!   and prune cluster values whose best completion cannot beat the
//!   incumbent ([`WcssBound`] selects between the general bound, the
//!   cardinality-aware bound and the strongest, minimum-cost-flow-based
//!   bound);
//! * value-precedence constraints which break the symmetry between cluster
//!   labels;
//! * a binary branching strategy with dedicated initial-solution and
//!   tie-breaking modes ([`SearchParameters`]).
//!
//! # Using the solver
//!
//! Build an [`Instance`] from a dissimilarity matrix or from observation
//! coordinates, attach the target cardinalities, and run [`Solver::minimize`]:
//!
//! ```
//! use mssc_solver::{Instance, OptimisationResult, SearchParameters, Solver, WcssBound};
//!
//! // Three tight points and two outliers on a line.
//! let instance = Instance::from_coordinates(
//!     vec![vec![0.0], vec![1.0], vec![2.0], vec![10.0], vec![11.0]],
//!     2,
//! )
//! .unwrap()
//! .with_target_cardinalities(vec![3, 2])
//! .unwrap();
//!
//! let mut solver = Solver::new(instance, WcssBound::Flow).unwrap();
//! let result = solver.minimize(SearchParameters::default()).unwrap();
//!
//! let OptimisationResult::Optimal(solution) = result else {
//!     unreachable!("every complete cardinality vector is satisfiable");
//! };
//! assert_eq!(solution.memberships(), &[0, 0, 0, 1, 1]);
//! assert!((solution.objective() - 2.5).abs() < 1e-6);
//! ```

mod basic_types;
mod branching;
mod containers;
mod engine;
mod flow;
mod instance;
mod propagators;

pub use basic_types::Solution;
pub use branching::InitialSolution;
pub use branching::MainSearch;
pub use branching::SearchParameters;
pub use branching::TieHandling;
pub use engine::ModelError;
pub use engine::OptimisationResult;
pub use engine::Solver;
pub use engine::SolverStatistics;
pub use engine::WcssBound;
pub use instance::Instance;
pub use instance::InstanceError;
