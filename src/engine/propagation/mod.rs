//! The interface between the engine and the propagators it schedules.

mod contexts;
mod domain_events;
mod local_id;
mod propagator;
mod watch_list;

pub(crate) use contexts::PropagationContext;
pub(crate) use contexts::PropagationContextMut;
pub(crate) use contexts::PropagatorInitialisationContext;
pub(crate) use domain_events::DomainEvent;
pub(crate) use domain_events::DomainEvents;
pub(crate) use local_id::LocalId;
pub(crate) use propagator::EnqueueDecision;
pub(crate) use propagator::Propagator;
pub(crate) use propagator::PropagatorId;
pub(crate) use watch_list::WatchListDomainEvents;
