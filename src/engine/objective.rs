use crate::basic_types::Inconsistency;
use crate::basic_types::PropagationStatus;
use crate::engine::trailed::TrailedFloat;
use crate::engine::trailed::TrailedValues;

/// The continuous objective variable over `[0, ∞)`.
///
/// The lower bound is tightened by the WCSS propagators and is trailed so
/// that backtracking restores it. The upper bound is owned by the search: it
/// is set to the incumbent objective value on every improving solution and is
/// deliberately not restored on backtrack (branch-and-bound).
#[derive(Debug)]
pub(crate) struct Objective {
    min: TrailedFloat,
    max: f64,
}

impl Objective {
    pub(crate) fn new(trailed_values: &mut TrailedValues) -> Self {
        Objective {
            min: trailed_values.grow_float(0.0),
            max: f64::INFINITY,
        }
    }

    pub(crate) fn min(&self, trailed_values: &TrailedValues) -> f64 {
        trailed_values.read_float(self.min)
    }

    pub(crate) fn max(&self) -> f64 {
        self.max
    }

    /// Raise the lower bound. Crossing the upper bound is an inconsistency:
    /// no completion of the current partial assignment can improve on the
    /// incumbent.
    pub(crate) fn set_min(
        &self,
        trailed_values: &mut TrailedValues,
        value: f64,
    ) -> PropagationStatus {
        if value > self.max {
            return Err(Inconsistency::Conflict);
        }
        if value > trailed_values.read_float(self.min) {
            trailed_values.assign_float(self.min, value);
        }
        Ok(())
    }

    /// Record an incumbent objective value as the new global upper bound.
    pub(crate) fn tighten_upper_bound(&mut self, value: f64) {
        self.max = self.max.min(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_bound_is_restored_on_backtrack_but_upper_bound_is_not() {
        let mut trailed_values = TrailedValues::default();
        let mut objective = Objective::new(&mut trailed_values);

        trailed_values.increase_decision_level();
        objective
            .set_min(&mut trailed_values, 3.5)
            .expect("below upper bound");
        objective.tighten_upper_bound(10.0);

        trailed_values.synchronise(0);
        assert_eq!(objective.min(&trailed_values), 0.0);
        assert_eq!(objective.max(), 10.0);
    }

    #[test]
    fn raising_the_lower_bound_past_the_incumbent_fails() {
        let mut trailed_values = TrailedValues::default();
        let mut objective = Objective::new(&mut trailed_values);

        objective.tighten_upper_bound(2.0);
        assert!(objective.set_min(&mut trailed_values, 1.5).is_ok());
        assert!(objective.set_min(&mut trailed_values, 2.5).is_err());
    }

    #[test]
    fn lower_bound_never_decreases() {
        let mut trailed_values = TrailedValues::default();
        let objective = Objective::new(&mut trailed_values);

        objective
            .set_min(&mut trailed_values, 4.0)
            .expect("no upper bound yet");
        objective
            .set_min(&mut trailed_values, 1.0)
            .expect("weaker bound is ignored");
        assert_eq!(objective.min(&trailed_values), 4.0);
    }
}
