use super::TrailedBool;
use super::TrailedFloat;
use super::TrailedInt;

/// Undo record for a single write to a reversible scalar.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TrailedChange {
    Int {
        reference: TrailedInt,
        old_value: i64,
    },
    Float {
        reference: TrailedFloat,
        old_value: f64,
    },
    Bool {
        reference: TrailedBool,
        old_value: bool,
    },
}
