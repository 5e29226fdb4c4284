use crate::basic_types::EmptyDomain;
use crate::basic_types::Trail;
use crate::containers::KeyedVec;
use crate::containers::StorageKey;
use crate::engine::propagation::DomainEvent;

/// Identifier of an integer decision variable in the domain store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DomainId {
    id: u32,
}

impl StorageKey for DomainId {
    fn index(&self) -> usize {
        self.id as usize
    }

    fn create_from_index(index: usize) -> Self {
        DomainId { id: index as u32 }
    }
}

impl std::fmt::Display for DomainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.id)
    }
}

/// A finite domain over the values `0..num_values` it was created with.
#[derive(Debug, Clone)]
struct Domain {
    contains: Vec<bool>,
    size: usize,
}

/// Undo record: `value` was removed from `domain`.
#[derive(Debug, Clone, Copy)]
struct DomainChange {
    domain: DomainId,
    value: usize,
}

/// The store of all integer decision variables.
///
/// Domains are mutated exclusively through [`Assignments::remove`] and
/// [`Assignments::fix`]; every removal is trailed and restored on
/// [`Assignments::synchronise`]. Domain events are buffered until the engine
/// drains them between propagator invocations.
#[derive(Default, Debug)]
pub(crate) struct Assignments {
    trail: Trail<DomainChange>,
    domains: KeyedVec<DomainId, Domain>,
    events: Vec<(DomainId, DomainEvent)>,
}

impl Assignments {
    /// Create a new variable with domain `{0, .., num_values - 1}`.
    pub(crate) fn grow(&mut self, num_values: usize) -> DomainId {
        debug_assert!(num_values > 0);
        self.domains.push(Domain {
            contains: vec![true; num_values],
            size: num_values,
        })
    }

    pub(crate) fn is_fixed(&self, domain: DomainId) -> bool {
        self.domains[domain].size == 1
    }

    /// The value of a fixed variable.
    pub(crate) fn value(&self, domain: DomainId) -> usize {
        debug_assert!(self.is_fixed(domain));
        self.domains[domain]
            .contains
            .iter()
            .position(|&present| present)
            .expect("a fixed domain holds exactly one value")
    }

    pub(crate) fn contains(&self, domain: DomainId, value: usize) -> bool {
        let domain = &self.domains[domain];
        value < domain.contains.len() && domain.contains[value]
    }

    pub(crate) fn size(&self, domain: DomainId) -> usize {
        self.domains[domain].size
    }

    pub(crate) fn iter_domain(&self, domain: DomainId) -> impl Iterator<Item = usize> + '_ {
        self.domains[domain]
            .contains
            .iter()
            .enumerate()
            .filter_map(|(value, &present)| present.then_some(value))
    }

    /// Remove `value` from the domain. Removing a value which is already
    /// absent is a no-op; removing the last value reports [`EmptyDomain`].
    pub(crate) fn remove(&mut self, domain: DomainId, value: usize) -> Result<(), EmptyDomain> {
        if !self.contains(domain, value) {
            return Ok(());
        }

        let entry = &mut self.domains[domain];
        entry.contains[value] = false;
        entry.size -= 1;
        self.trail.record(DomainChange { domain, value });

        match entry.size {
            0 => Err(EmptyDomain),
            1 => {
                self.events.push((domain, DomainEvent::Removal));
                self.events.push((domain, DomainEvent::Assign));
                Ok(())
            }
            _ => {
                self.events.push((domain, DomainEvent::Removal));
                Ok(())
            }
        }
    }

    /// Bind the variable to `value` by removing every other value. Fails when
    /// `value` is not in the domain.
    pub(crate) fn fix(&mut self, domain: DomainId, value: usize) -> Result<(), EmptyDomain> {
        if !self.contains(domain, value) {
            return Err(EmptyDomain);
        }
        if self.is_fixed(domain) {
            return Ok(());
        }

        let num_values = self.domains[domain].contains.len();
        for other in 0..num_values {
            if other == value {
                continue;
            }
            if self.contains(domain, other) {
                let entry = &mut self.domains[domain];
                entry.contains[other] = false;
                entry.size -= 1;
                self.trail.record(DomainChange {
                    domain,
                    value: other,
                });
                self.events.push((domain, DomainEvent::Removal));
            }
        }
        self.events.push((domain, DomainEvent::Assign));
        Ok(())
    }

    /// Take the events buffered since the previous drain.
    pub(crate) fn drain_events(&mut self) -> Vec<(DomainId, DomainEvent)> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn increase_decision_level(&mut self) {
        self.trail.push_level()
    }

    pub(crate) fn get_decision_level(&self) -> usize {
        self.trail.decision_level()
    }

    /// Backtrack to `new_decision_level`, restoring removed values and
    /// discarding events raised by the abandoned subtree.
    pub(crate) fn synchronise(&mut self, new_decision_level: usize) {
        self.events.clear();
        let domains = &mut self.domains;
        self.trail.pop_levels(new_decision_level, |change| {
            let entry = &mut domains[change.domain];
            debug_assert!(!entry.contains[change.value]);
            entry.contains[change.value] = true;
            entry.size += 1;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removals_are_restored_on_synchronise() {
        let mut assignments = Assignments::default();
        let x = assignments.grow(3);

        assignments.increase_decision_level();
        assignments.remove(x, 1).expect("domain not empty");

        assert!(!assignments.contains(x, 1));
        assert_eq!(assignments.size(x), 2);

        assignments.synchronise(0);
        assert!(assignments.contains(x, 1));
        assert_eq!(assignments.size(x), 3);
    }

    #[test]
    fn removing_all_but_one_value_fixes_the_variable() {
        let mut assignments = Assignments::default();
        let x = assignments.grow(3);

        assignments.remove(x, 0).expect("domain not empty");
        assert!(!assignments.is_fixed(x));

        assignments.remove(x, 2).expect("domain not empty");
        assert!(assignments.is_fixed(x));
        assert_eq!(assignments.value(x), 1);

        let events = assignments.drain_events();
        assert!(events.contains(&(x, DomainEvent::Assign)));
    }

    #[test]
    fn removing_the_last_value_reports_an_empty_domain() {
        let mut assignments = Assignments::default();
        let x = assignments.grow(2);

        assignments.remove(x, 0).expect("domain not empty");
        assert_eq!(assignments.remove(x, 1), Err(EmptyDomain));
    }

    #[test]
    fn fixing_to_an_absent_value_fails() {
        let mut assignments = Assignments::default();
        let x = assignments.grow(2);

        assignments.remove(x, 1).expect("domain not empty");
        assert_eq!(assignments.fix(x, 1), Err(EmptyDomain));
    }

    #[test]
    fn fix_removes_every_other_value() {
        let mut assignments = Assignments::default();
        let x = assignments.grow(4);

        assignments.fix(x, 2).expect("value in domain");
        assert!(assignments.is_fixed(x));
        assert_eq!(assignments.value(x), 2);
        assert_eq!(assignments.iter_domain(x).collect::<Vec<_>>(), vec![2]);
    }
}
