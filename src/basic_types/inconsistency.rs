/// A domain was emptied by a removal or a binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct EmptyDomain;

/// The reason a propagation cannot extend the current partial assignment.
///
/// Either a domain operation emptied a domain, or the propagator detected the
/// state to be unsatisfiable through its own reasoning (e.g. an overfilled
/// cluster or an infeasible flow model).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Inconsistency {
    EmptyDomain,
    Conflict,
}

impl From<EmptyDomain> for Inconsistency {
    fn from(_: EmptyDomain) -> Self {
        Inconsistency::EmptyDomain
    }
}

/// The result of invoking a propagator; `Err` unwinds to the search which
/// backtracks.
pub(crate) type PropagationStatus = Result<(), Inconsistency>;
