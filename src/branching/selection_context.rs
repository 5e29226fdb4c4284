use crate::engine::assignments::Assignments;
use crate::engine::assignments::DomainId;

/// The read-only view of the domains offered to a [`Brancher`].
///
/// [`Brancher`]: super::Brancher
#[derive(Clone, Copy)]
pub(crate) struct SelectionContext<'a> {
    assignments: &'a Assignments,
}

impl<'a> SelectionContext<'a> {
    pub(crate) fn new(assignments: &'a Assignments) -> Self {
        SelectionContext { assignments }
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

    pub(crate) fn iter_domain(&self, variable: DomainId) -> impl Iterator<Item = usize> + 'a {
        self.assignments.iter_domain(variable)
    }
}
