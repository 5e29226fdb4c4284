use super::DomainEvent;
use super::DomainEvents;
use super::LocalId;
use super::PropagatorId;
use crate::containers::KeyedVec;
use crate::engine::assignments::DomainId;

/// A subscription of one propagator to events on one variable.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Watcher {
    pub(crate) propagator: PropagatorId,
    pub(crate) local_id: LocalId,
    events: DomainEvents,
}

/// For each variable, the propagators interested in its domain events.
#[derive(Default, Debug)]
pub(crate) struct WatchListDomainEvents {
    watchers: KeyedVec<DomainId, Vec<Watcher>>,
}

impl WatchListDomainEvents {
    /// Make room for one more variable; must be kept in sync with the domain
    /// store.
    pub(crate) fn grow(&mut self) {
        let _ = self.watchers.push(Vec::new());
    }

    pub(crate) fn watch(
        &mut self,
        variable: DomainId,
        events: DomainEvents,
        propagator: PropagatorId,
        local_id: LocalId,
    ) {
        self.watchers[variable].push(Watcher {
            propagator,
            local_id,
            events,
        });
    }

    pub(crate) fn watchers_for(
        &self,
        variable: DomainId,
        event: DomainEvent,
    ) -> impl Iterator<Item = &'_ Watcher> {
        self.watchers[variable]
            .iter()
            .filter(move |watcher| watcher.events.contains(event))
    }
}
