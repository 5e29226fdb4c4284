use super::DomainEvents;
use super::LocalId;
use super::PropagatorId;
use super::WatchListDomainEvents;
use crate::basic_types::EmptyDomain;
use crate::basic_types::PropagationStatus;
use crate::engine::assignments::Assignments;
use crate::engine::assignments::DomainId;
use crate::engine::objective::Objective;
use crate::engine::trailed::TrailedBool;
use crate::engine::trailed::TrailedFloat;
use crate::engine::trailed::TrailedInt;
use crate::engine::trailed::TrailedValues;

/// Context handed to [`Propagator::initialise`]; allows registering watched
/// variables and allocating reversible scratch.
///
/// [`Propagator::initialise`]: super::Propagator::initialise
pub(crate) struct PropagatorInitialisationContext<'a> {
    watch_list: &'a mut WatchListDomainEvents,
    trailed_values: &'a mut TrailedValues,
    propagator_id: PropagatorId,
}

impl<'a> PropagatorInitialisationContext<'a> {
    pub(crate) fn new(
        watch_list: &'a mut WatchListDomainEvents,
        trailed_values: &'a mut TrailedValues,
        propagator_id: PropagatorId,
    ) -> Self {
        PropagatorInitialisationContext {
            watch_list,
            trailed_values,
            propagator_id,
        }
    }

    pub(crate) fn register(&mut self, variable: DomainId, events: DomainEvents, local_id: LocalId) {
        self.watch_list
            .watch(variable, events, self.propagator_id, local_id);
    }

    pub(crate) fn new_trailed_int(&mut self, initial_value: i64) -> TrailedInt {
        self.trailed_values.grow_int(initial_value)
    }

    pub(crate) fn new_trailed_float(&mut self, initial_value: f64) -> TrailedFloat {
        self.trailed_values.grow_float(initial_value)
    }

    pub(crate) fn new_trailed_bool(&mut self, initial_value: bool) -> TrailedBool {
        self.trailed_values.grow_bool(initial_value)
    }
}

/// Read-only view of the domains and the reversible scratch, handed to
/// [`Propagator::notify`].
///
/// [`Propagator::notify`]: super::Propagator::notify
#[derive(Clone, Copy)]
pub(crate) struct PropagationContext<'a> {
    assignments: &'a Assignments,
    trailed_values: &'a TrailedValues,
}

impl<'a> PropagationContext<'a> {
    pub(crate) fn new(assignments: &'a Assignments, trailed_values: &'a TrailedValues) -> Self {
        PropagationContext {
            assignments,
            trailed_values,
        }
    }

    pub(crate) fn value(&self, variable: DomainId) -> usize {
        self.assignments.value(variable)
    }

    pub(crate) fn contains(&self, variable: DomainId, value: usize) -> bool {
        self.assignments.contains(variable, value)
    }

    pub(crate) fn read_int(&self, key: TrailedInt) -> i64 {
        self.trailed_values.read_int(key)
    }
}

/// Mutable view of the solver state during a propagation.
///
/// All domain mutations and objective tightening go through this context so
/// that every change is trailed for backtracking.
pub(crate) struct PropagationContextMut<'a> {
    assignments: &'a mut Assignments,
    trailed_values: &'a mut TrailedValues,
    objective: &'a mut Objective,
}

impl<'a> PropagationContextMut<'a> {
    pub(crate) fn new(
        assignments: &'a mut Assignments,
        trailed_values: &'a mut TrailedValues,
        objective: &'a mut Objective,
    ) -> Self {
        PropagationContextMut {
            assignments,
            trailed_values,
            objective,
        }
    }

    pub(crate) fn is_fixed(&self, variable: DomainId) -> bool {
        self.assignments.is_fixed(variable)
    }

    pub(crate) fn value(&self, variable: DomainId) -> usize {
        self.assignments.value(variable)
    }

    pub(crate) fn contains(&self, variable: DomainId, value: usize) -> bool {
        self.assignments.contains(variable, value)
    }

    pub(crate) fn domain_size(&self, variable: DomainId) -> usize {
        self.assignments.size(variable)
    }

    pub(crate) fn remove(&mut self, variable: DomainId, value: usize) -> Result<(), EmptyDomain> {
        self.assignments.remove(variable, value)
    }

    pub(crate) fn fix(&mut self, variable: DomainId, value: usize) -> Result<(), EmptyDomain> {
        self.assignments.fix(variable, value)
    }

    /// The current upper bound of the objective variable (the incumbent).
    pub(crate) fn objective_max(&self) -> f64 {
        self.objective.max()
    }

    /// Tighten the objective lower bound; fails when it crosses the incumbent
    /// upper bound.
    pub(crate) fn set_objective_min(&mut self, value: f64) -> PropagationStatus {
        self.objective.set_min(self.trailed_values, value)
    }

    pub(crate) fn read_int(&self, key: TrailedInt) -> i64 {
        self.trailed_values.read_int(key)
    }

    pub(crate) fn assign_int(&mut self, key: TrailedInt, value: i64) {
        self.trailed_values.assign_int(key, value)
    }

    pub(crate) fn read_float(&self, key: TrailedFloat) -> f64 {
        self.trailed_values.read_float(key)
    }

    pub(crate) fn assign_float(&mut self, key: TrailedFloat, value: f64) {
        self.trailed_values.assign_float(key, value)
    }

    pub(crate) fn read_bool(&self, key: TrailedBool) -> bool {
        self.trailed_values.read_bool(key)
    }

    pub(crate) fn assign_bool(&mut self, key: TrailedBool, value: bool) {
        self.trailed_values.assign_bool(key, value)
    }
}
