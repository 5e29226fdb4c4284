//! Helpers for testing propagators: set up domains, post a propagator, and
//! inspect the propagation fixed point.

use crate::basic_types::Inconsistency;
use crate::containers::KeyedVec;
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

/// A container for variables and propagators, used to exercise propagators in
/// isolation from the search.
pub(crate) struct TestSolver {
    pub(crate) assignments: Assignments,
    pub(crate) trailed_values: TrailedValues,
    pub(crate) objective: Objective,
    watch_list: WatchListDomainEvents,
    propagators: KeyedVec<PropagatorId, Box<dyn Propagator>>,
}

impl Default for TestSolver {
    fn default() -> Self {
        let mut trailed_values = TrailedValues::default();
        let objective = Objective::new(&mut trailed_values);
        TestSolver {
            assignments: Assignments::default(),
            trailed_values,
            objective,
            watch_list: WatchListDomainEvents::default(),
            propagators: KeyedVec::default(),
        }
    }
}

impl TestSolver {
    pub(crate) fn new_variable(&mut self, num_values: usize) -> DomainId {
        self.watch_list.grow();
        self.assignments.grow(num_values)
    }

    /// Post a propagator and propagate to a fixed point.
    pub(crate) fn new_propagator(
        &mut self,
        propagator: impl Propagator + 'static,
    ) -> Result<PropagatorId, Inconsistency> {
        let id = self.propagators.push(Box::new(propagator));
        self.propagators[id].initialise(&mut PropagatorInitialisationContext::new(
            &mut self.watch_list,
            &mut self.trailed_values,
            id,
        ));

        let mut context = PropagationContextMut::new(
            &mut self.assignments,
            &mut self.trailed_values,
            &mut self.objective,
        );
        self.propagators[id].propagate(&mut context)?;
        self.propagate_to_fixed_point()?;

        Ok(id)
    }

    /// Remove a value from a domain and propagate to a fixed point.
    pub(crate) fn remove(&mut self, variable: DomainId, value: usize) -> Result<(), Inconsistency> {
        self.assignments.remove(variable, value)?;
        self.propagate_to_fixed_point()
    }

    /// Fix a variable and propagate to a fixed point.
    pub(crate) fn fix(&mut self, variable: DomainId, value: usize) -> Result<(), Inconsistency> {
        self.assignments.fix(variable, value)?;
        self.propagate_to_fixed_point()
    }

    /// Set the incumbent objective value (the upper bound used by cost-based
    /// filtering) and propagate to a fixed point.
    pub(crate) fn tighten_objective_upper_bound(
        &mut self,
        value: f64,
    ) -> Result<(), Inconsistency> {
        self.objective.tighten_upper_bound(value);
        for id in self.propagators.keys().collect::<Vec<_>>() {
            let mut context = PropagationContextMut::new(
                &mut self.assignments,
                &mut self.trailed_values,
                &mut self.objective,
            );
            self.propagators[id].propagate(&mut context)?;
        }
        self.propagate_to_fixed_point()
    }

    pub(crate) fn objective_min(&self) -> f64 {
        self.objective.min(&self.trailed_values)
    }

    fn propagate_to_fixed_point(&mut self) -> Result<(), Inconsistency> {
        let mut queue: Vec<PropagatorId> = Vec::new();

        loop {
            for (variable, event) in self.assignments.drain_events() {
                for watcher in self.watch_list.watchers_for(variable, event) {
                    queue.push(watcher.propagator);
                }
            }

            // Re-run every woken propagator; notify filtering is exercised
            // through the dedicated unit tests.
            let Some(id) = queue.pop() else {
                return Ok(());
            };
            let mut context = PropagationContextMut::new(
                &mut self.assignments,
                &mut self.trailed_values,
                &mut self.objective,
            );
            self.propagators[id].propagate(&mut context)?;
        }
    }

    /// Deliver a notification by hand, returning the propagator's decision.
    pub(crate) fn notify(
        &mut self,
        id: PropagatorId,
        local_id: crate::engine::propagation::LocalId,
        event: crate::engine::propagation::DomainEvent,
    ) -> EnqueueDecision {
        let context = PropagationContext::new(&self.assignments, &self.trailed_values);
        self.propagators[id].notify(context, local_id, event)
    }

    pub(crate) fn propagate(&mut self, id: PropagatorId) -> Result<(), Inconsistency> {
        let mut context = PropagationContextMut::new(
            &mut self.assignments,
            &mut self.trailed_values,
            &mut self.objective,
        );
        self.propagators[id].propagate(&mut context)?;
        self.propagate_to_fixed_point()
    }

    pub(crate) fn assert_domain(&self, variable: DomainId, expected: &[usize]) {
        let actual = self.assignments.iter_domain(variable).collect::<Vec<_>>();
        assert_eq!(
            actual, expected,
            "domain of {variable} is {actual:?}, expected {expected:?}"
        );
    }

    pub(crate) fn assert_fixed(&self, variable: DomainId, value: usize) {
        assert!(
            self.assignments.is_fixed(variable),
            "{variable} is not fixed"
        );
        assert_eq!(self.assignments.value(variable), value);
    }
}
