use super::TrailedChange;
use crate::basic_types::Trail;
use crate::containers::KeyedVec;
use crate::containers::StorageKey;

/// Key to a reversible integer slot in [`TrailedValues`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct TrailedInt {
    id: u32,
}

/// Key to a reversible float slot in [`TrailedValues`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct TrailedFloat {
    id: u32,
}

/// Key to a reversible boolean slot in [`TrailedValues`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct TrailedBool {
    id: u32,
}

macro_rules! storage_key_impl {
    ($name:ident) => {
        impl StorageKey for $name {
            fn index(&self) -> usize {
                self.id as usize
            }

            fn create_from_index(index: usize) -> Self {
                Self { id: index as u32 }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self { id: u32::MAX }
            }
        }
    };
}

storage_key_impl!(TrailedInt);
storage_key_impl!(TrailedFloat);
storage_key_impl!(TrailedBool);

/// Storage for reversible scalars registered by propagators.
///
/// Writes record the previous value on the trail; on backtrack the recorded
/// values are restored in reverse order. Reads are plain indexed loads.
#[derive(Default, Debug)]
pub(crate) struct TrailedValues {
    trail: Trail<TrailedChange>,
    ints: KeyedVec<TrailedInt, i64>,
    floats: KeyedVec<TrailedFloat, f64>,
    bools: KeyedVec<TrailedBool, bool>,
}

impl TrailedValues {
    pub(crate) fn grow_int(&mut self, initial_value: i64) -> TrailedInt {
        self.ints.push(initial_value)
    }

    pub(crate) fn grow_float(&mut self, initial_value: f64) -> TrailedFloat {
        self.floats.push(initial_value)
    }

    pub(crate) fn grow_bool(&mut self, initial_value: bool) -> TrailedBool {
        self.bools.push(initial_value)
    }

    pub(crate) fn read_int(&self, key: TrailedInt) -> i64 {
        self.ints[key]
    }

    pub(crate) fn read_float(&self, key: TrailedFloat) -> f64 {
        self.floats[key]
    }

    pub(crate) fn read_bool(&self, key: TrailedBool) -> bool {
        self.bools[key]
    }

    pub(crate) fn assign_int(&mut self, key: TrailedInt, value: i64) {
        let old_value = self.ints[key];
        if old_value == value {
            return;
        }
        self.trail.record(TrailedChange::Int {
            reference: key,
            old_value,
        });
        self.ints[key] = value;
    }

    pub(crate) fn assign_float(&mut self, key: TrailedFloat, value: f64) {
        let old_value = self.floats[key];
        if old_value == value {
            return;
        }
        self.trail.record(TrailedChange::Float {
            reference: key,
            old_value,
        });
        self.floats[key] = value;
    }

    pub(crate) fn assign_bool(&mut self, key: TrailedBool, value: bool) {
        let old_value = self.bools[key];
        if old_value == value {
            return;
        }
        self.trail.record(TrailedChange::Bool {
            reference: key,
            old_value,
        });
        self.bools[key] = value;
    }

    pub(crate) fn increase_decision_level(&mut self) {
        self.trail.push_level()
    }

    pub(crate) fn synchronise(&mut self, new_decision_level: usize) {
        let ints = &mut self.ints;
        let floats = &mut self.floats;
        let bools = &mut self.bools;
        self.trail
            .pop_levels(new_decision_level, |change| match change {
                TrailedChange::Int {
                    reference,
                    old_value,
                } => ints[reference] = old_value,
                TrailedChange::Float {
                    reference,
                    old_value,
                } => floats[reference] = old_value,
                TrailedChange::Bool {
                    reference,
                    old_value,
                } => bools[reference] = old_value,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_restored_on_synchronise() {
        let mut values = TrailedValues::default();
        let count = values.grow_int(0);
        let bound = values.grow_float(1.5);
        let seen = values.grow_bool(false);

        values.increase_decision_level();
        values.assign_int(count, 5);
        values.assign_float(bound, 2.25);
        values.assign_bool(seen, true);

        assert_eq!(values.read_int(count), 5);
        assert_eq!(values.read_float(bound), 2.25);
        assert!(values.read_bool(seen));

        values.increase_decision_level();
        values.assign_int(count, 7);

        values.synchronise(1);
        assert_eq!(values.read_int(count), 5);

        values.synchronise(0);
        assert_eq!(values.read_int(count), 0);
        assert_eq!(values.read_float(bound), 1.5);
        assert!(!values.read_bool(seen));
    }

    #[test]
    fn redundant_writes_leave_no_trail_entry() {
        let mut values = TrailedValues::default();
        let slot = values.grow_int(3);

        values.increase_decision_level();
        values.assign_int(slot, 3);
        values.assign_int(slot, 4);

        values.synchronise(0);
        assert_eq!(values.read_int(slot), 3);
    }
}
