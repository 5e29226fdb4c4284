/// A propagator-local identifier for a variable it watches.
///
/// When a propagator registers a variable it attaches a [`LocalId`]; the
/// engine hands the same id back in [`Propagator::notify`] so the propagator
/// knows which of its variables changed without a reverse lookup.
///
/// [`Propagator::notify`]: super::Propagator::notify
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LocalId(u32);

impl LocalId {
    pub(crate) const fn from(value: u32) -> Self {
        LocalId(value)
    }

    pub(crate) fn unpack(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for LocalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
