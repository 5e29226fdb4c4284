use std::collections::VecDeque;
use std::rc::Rc;

use log::debug;
use thiserror::Error;

use crate::basic_types::PropagationStatus;
use crate::basic_types::Solution;
use crate::branching::Brancher;
use crate::branching::Decision;
use crate::branching::InitialSolution;
use crate::branching::MsscBrancher;
use crate::branching::SearchParameters;
use crate::branching::SelectionContext;
use crate::branching::TieHandling;
use crate::containers::KeyedVec;
use crate::containers::StorageKey;
use crate::engine::assignments::Assignments;
use crate::engine::assignments::DomainId;
use crate::engine::objective::Objective;
use crate::engine::propagation::EnqueueDecision;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorId;
use crate::engine::propagation::PropagatorInitialisationContext;
use crate::engine::propagation::WatchListDomainEvents;
use crate::engine::trailed::TrailedValues;
use crate::instance::Instance;
use crate::propagators::wcss::WcssCardinalityPropagator;
use crate::propagators::wcss::WcssFlowPropagator;
use crate::propagators::wcss::WcssGeneralPropagator;
use crate::propagators::DistributePropagator;
use crate::propagators::ValuePrecedencePropagator;

/// Which WCSS lower-bound propagator drives the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WcssBound {
    /// The general bound; cardinalities, when present, are enforced by a
    /// separate distribute constraint.
    General,
    /// The bound with internal cardinality control.
    Cardinality,
    /// The bound computed through a minimum-cost flow.
    Flow,
}

/// A model cannot be built or searched with the given configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("the {0:?} bound requires target cardinalities on the instance")]
    MissingTargetCardinalities(WcssBound),
    #[error("the membership-guided initial solution requires initial memberships on the instance")]
    MissingMemberships,
    #[error("the {0:?} tie-breaking heuristic requires coordinates on the instance")]
    MissingCoordinates(TieHandling),
}

/// The outcome of a solve.
#[derive(Debug)]
pub enum OptimisationResult {
    /// The search space was exhausted; this is the minimal-WCSS assignment.
    Optimal(Solution),
    /// No assignment satisfies the model.
    Unsatisfiable,
}

/// Counters accumulated over a solve.
#[derive(Clone, Copy, Debug, Default)]
pub struct SolverStatistics {
    pub num_decisions: u64,
    pub num_conflicts: u64,
    pub num_solutions: u64,
    pub num_propagations: u64,
}

/// The exact solver: owns the variables, the propagators and the
/// depth-first branch-and-bound search.
///
/// ```
/// use mssc_solver::{Instance, OptimisationResult, SearchParameters, Solver, WcssBound};
///
/// let instance = Instance::from_coordinates(
///     vec![vec![0.0], vec![1.0], vec![10.0], vec![11.0]],
///     2,
/// )
/// .unwrap()
/// .with_target_cardinalities(vec![2, 2])
/// .unwrap();
///
/// let mut solver = Solver::new(instance, WcssBound::Flow).unwrap();
/// match solver.minimize(SearchParameters::default()).unwrap() {
///     OptimisationResult::Optimal(solution) => {
///         assert_eq!(solution.memberships(), &[0, 0, 1, 1]);
///     }
///     OptimisationResult::Unsatisfiable => unreachable!(),
/// }
/// ```
pub struct Solver {
    instance: Rc<Instance>,
    assignments: Assignments,
    trailed_values: TrailedValues,
    objective: Objective,
    watch_list: WatchListDomainEvents,
    propagators: KeyedVec<PropagatorId, Box<dyn Propagator>>,
    queue: VecDeque<PropagatorId>,
    enqueued: Vec<bool>,
    variables: Vec<DomainId>,
    best_solution: Option<Solution>,
    solution_callback: Box<dyn FnMut(&Solution)>,
    statistics: SolverStatistics,
}

impl Solver {
    /// Build the model: one assignment variable per observation, the chosen
    /// WCSS bound, cardinality enforcement, and the value-precedence
    /// symmetry-breaking chain.
    pub fn new(instance: Instance, bound: WcssBound) -> Result<Solver, ModelError> {
        if instance.target_cardinalities().is_none()
            && matches!(bound, WcssBound::Cardinality | WcssBound::Flow)
        {
            return Err(ModelError::MissingTargetCardinalities(bound));
        }

        let instance = Rc::new(instance);
        let mut trailed_values = TrailedValues::default();
        let objective = Objective::new(&mut trailed_values);
        let mut solver = Solver {
            instance: Rc::clone(&instance),
            assignments: Assignments::default(),
            trailed_values,
            objective,
            watch_list: WatchListDomainEvents::default(),
            propagators: KeyedVec::default(),
            queue: VecDeque::new(),
            enqueued: Vec::new(),
            variables: Vec::new(),
            best_solution: None,
            solution_callback: Box::new(|_| {}),
            statistics: SolverStatistics::default(),
        };

        let k = instance.num_clusters();
        for _ in 0..instance.num_observations() {
            solver.watch_list.grow();
            let variable = solver.assignments.grow(k);
            solver.variables.push(variable);
        }
        let variables = solver.variables.clone();

        match bound {
            WcssBound::General => {
                solver.post(WcssGeneralPropagator::new(
                    Rc::clone(&instance),
                    variables.clone(),
                ));
                if let Some(targets) = instance.target_cardinalities() {
                    solver.post(DistributePropagator::new(
                        variables.clone(),
                        targets.to_vec(),
                    ));
                }
            }
            WcssBound::Cardinality => {
                solver.post(WcssCardinalityPropagator::new(
                    Rc::clone(&instance),
                    variables.clone(),
                ));
            }
            WcssBound::Flow => {
                solver.post(WcssFlowPropagator::new(
                    Rc::clone(&instance),
                    variables.clone(),
                ));
            }
        }

        for c in 1..k {
            solver.post(ValuePrecedencePropagator::new(variables.clone(), c - 1, c));
        }

        Ok(solver)
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Register a callback invoked on every improving solution the search
    /// finds, before the final one is returned. Useful for reporting the
    /// incumbent sequence of a long-running solve.
    pub fn with_solution_callback(&mut self, callback: impl FnMut(&Solution) + 'static) {
        self.solution_callback = Box::new(callback);
    }

    pub fn statistics(&self) -> SolverStatistics {
        self.statistics
    }

    /// Run the branch-and-bound search to completion and return the optimal
    /// solution. A solver instance performs a single solve.
    pub fn minimize(
        &mut self,
        parameters: SearchParameters,
    ) -> Result<OptimisationResult, ModelError> {
        if parameters.initial_solution == InitialSolution::MembershipsAsIndicated
            && self.instance.memberships().is_none()
        {
            return Err(ModelError::MissingMemberships);
        }
        if matches!(
            parameters.tie_handling,
            TieHandling::FarthestPointFromBiggestCenter | TieHandling::MaxMinPointFromAllCenters
        ) && self.instance.coordinates().is_none()
        {
            return Err(ModelError::MissingCoordinates(parameters.tie_handling));
        }

        let mut brancher = MsscBrancher::new(
            Rc::clone(&self.instance),
            self.variables.clone(),
            parameters,
        );

        if self.propagate_root().is_ok() {
            debug!(
                "root propagation done, objective lower bound {}",
                self.objective.min(&self.trailed_values)
            );
            self.search(&mut brancher);
        }

        debug!(
            "search finished: {} decisions, {} conflicts, {} solutions, {} propagations",
            self.statistics.num_decisions,
            self.statistics.num_conflicts,
            self.statistics.num_solutions,
            self.statistics.num_propagations,
        );

        Ok(match self.best_solution.take() {
            Some(solution) => OptimisationResult::Optimal(solution),
            None => OptimisationResult::Unsatisfiable,
        })
    }

    fn post(&mut self, propagator: impl Propagator + 'static) {
        let id = self.propagators.push(Box::new(propagator));
        self.enqueued.push(false);
        self.propagators[id].initialise(&mut PropagatorInitialisationContext::new(
            &mut self.watch_list,
            &mut self.trailed_values,
            id,
        ));
    }

    fn propagate_root(&mut self) -> PropagationStatus {
        for id in self.propagators.keys() {
            self.enqueued[id.index()] = true;
        }
        let ids = self.propagators.keys().collect::<Vec<_>>();
        self.queue.extend(ids);
        self.propagate_to_fixed_point()
    }

    fn search(&mut self, brancher: &mut MsscBrancher) {
        let decision = brancher.next_decision(&SelectionContext::new(&self.assignments));
        let Some(Decision { variable, value }) = decision else {
            self.record_solution(brancher);
            return;
        };
        self.statistics.num_decisions += 1;

        self.increase_decision_level();
        if self.fix_and_propagate(variable, value).is_ok() {
            self.search(brancher);
        } else {
            self.statistics.num_conflicts += 1;
        }
        self.backtrack();

        self.increase_decision_level();
        if self.remove_and_propagate(variable, value).is_ok() {
            self.search(brancher);
        } else {
            self.statistics.num_conflicts += 1;
        }
        self.backtrack();
    }

    fn record_solution(&mut self, brancher: &mut MsscBrancher) {
        let memberships: Vec<usize> = self
            .variables
            .iter()
            .map(|&variable| self.assignments.value(variable))
            .collect();
        let objective_value = self.instance.wcss(&memberships);

        // The bounds guarantee lb < incumbent on every open node, but a leaf
        // can still evaluate no better than the incumbent; only improvements
        // are recorded.
        if objective_value < self.objective.max() {
            debug!(
                "improving solution {} found after {} decisions",
                objective_value, self.statistics.num_decisions
            );
            self.objective.tighten_upper_bound(objective_value);
            let solution = Solution::new(memberships, objective_value);
            (self.solution_callback)(&solution);
            self.best_solution = Some(solution);
            self.statistics.num_solutions += 1;
            brancher.on_solution();
        }
    }

    fn fix_and_propagate(&mut self, variable: DomainId, value: usize) -> PropagationStatus {
        self.assignments.fix(variable, value)?;
        self.propagate_to_fixed_point()
    }

    fn remove_and_propagate(&mut self, variable: DomainId, value: usize) -> PropagationStatus {
        self.assignments.remove(variable, value)?;
        self.propagate_to_fixed_point()
    }

    fn propagate_to_fixed_point(&mut self) -> PropagationStatus {
        loop {
            self.drain_events_into_queue();
            let Some(id) = self.queue.pop_front() else {
                return Ok(());
            };
            self.enqueued[id.index()] = false;
            self.statistics.num_propagations += 1;

            let mut context = PropagationContextMut::new(
                &mut self.assignments,
                &mut self.trailed_values,
                &mut self.objective,
            );
            if let Err(inconsistency) = self.propagators[id].propagate(&mut context) {
                self.queue.clear();
                self.enqueued.iter_mut().for_each(|flag| *flag = false);
                let _ = self.assignments.drain_events();
                return Err(inconsistency);
            }
        }
    }

    fn drain_events_into_queue(&mut self) {
        for (variable, event) in self.assignments.drain_events() {
            let watchers = self
                .watch_list
                .watchers_for(variable, event)
                .copied()
                .collect::<Vec<_>>();
            for watcher in watchers {
                if self.enqueued[watcher.propagator.index()] {
                    continue;
                }
                let context = PropagationContext::new(&self.assignments, &self.trailed_values);
                let decision =
                    self.propagators[watcher.propagator].notify(context, watcher.local_id, event);
                if decision == EnqueueDecision::Enqueue {
                    self.enqueued[watcher.propagator.index()] = true;
                    self.queue.push_back(watcher.propagator);
                }
            }
        }
    }

    fn increase_decision_level(&mut self) {
        self.assignments.increase_decision_level();
        self.trailed_values.increase_decision_level();
    }

    fn backtrack(&mut self) {
        let level = self.assignments.get_decision_level();
        self.assignments.synchronise(level - 1);
        self.trailed_values.synchronise(level - 1);
    }
}
