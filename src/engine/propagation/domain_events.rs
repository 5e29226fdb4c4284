use enumset::enum_set;
use enumset::EnumSet;
use enumset::EnumSetType;

/// A change to the domain of an integer variable.
#[derive(EnumSetType, Debug)]
pub(crate) enum DomainEvent {
    /// A value was removed from the domain (the domain may still hold several
    /// values).
    Removal,
    /// The domain shrank to a single value.
    Assign,
}

/// The set of [`DomainEvent`]s a propagator subscribes a variable to.
#[derive(Debug, Copy, Clone)]
pub(crate) struct DomainEvents {
    events: EnumSet<DomainEvent>,
}

impl DomainEvents {
    /// Any change to the domain.
    pub(crate) const ANY: DomainEvents =
        DomainEvents::create(enum_set!(DomainEvent::Removal | DomainEvent::Assign));

    const fn create(events: EnumSet<DomainEvent>) -> DomainEvents {
        DomainEvents { events }
    }

    pub(crate) fn contains(&self, event: DomainEvent) -> bool {
        self.events.contains(event)
    }
}
