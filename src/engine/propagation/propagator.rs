use super::DomainEvent;
use super::LocalId;
use super::PropagationContext;
use super::PropagationContextMut;
use super::PropagatorInitialisationContext;
use crate::basic_types::PropagationStatus;
use crate::containers::StorageKey;

/// Identifier of a propagator within the solver's propagator store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PropagatorId(pub(crate) u32);

impl StorageKey for PropagatorId {
    fn index(&self) -> usize {
        self.0 as usize
    }

    fn create_from_index(index: usize) -> Self {
        PropagatorId(index as u32)
    }
}

/// The interface between the engine and a constraint.
///
/// A propagator registers the variables it watches in
/// [`Propagator::initialise`], after which the engine invokes
/// [`Propagator::propagate`] whenever one of the watched events fired since
/// the previous invocation. Propagators are not required to reach a fixed
/// point in a single call; the engine re-invokes them until no further domain
/// changes happen.
pub(crate) trait Propagator {
    /// The name of the propagator, used in logging.
    fn name(&self) -> &str;

    /// Called once when the propagator is posted; registers watched variables
    /// through [`PropagatorInitialisationContext::register`].
    fn initialise(&mut self, context: &mut PropagatorInitialisationContext<'_>);

    /// Extend the current partial assignment with inferred domain changes, or
    /// report an [`Inconsistency`](crate::basic_types::Inconsistency).
    fn propagate(&mut self, context: &mut PropagationContextMut<'_>) -> PropagationStatus;

    /// Called when a watched event fires; decides whether the propagator is
    /// enqueued. Only cheap logic belongs here.
    fn notify(
        &mut self,
        _context: PropagationContext<'_>,
        _local_id: LocalId,
        _event: DomainEvent,
    ) -> EnqueueDecision {
        EnqueueDecision::Enqueue
    }
}

/// Indicator of what to do when a propagator is notified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EnqueueDecision {
    /// The propagator should be enqueued.
    Enqueue,
    /// The propagator should not be enqueued.
    Skip,
}
