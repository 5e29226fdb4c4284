use crate::basic_types::Inconsistency;
use crate::basic_types::PropagationStatus;
use crate::engine::assignments::DomainId;
use crate::engine::propagation::DomainEvents;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorInitialisationContext;

/// Ties the number of occurrences of each cluster value to its target
/// cardinality.
///
/// This is the cardinality side of the model when the posted WCSS bound does
/// not control cardinalities itself: exactly `target[c]` variables must take
/// value `c`. Filtering rules, per value:
/// - more variables fixed to `c` than `target[c]` is an inconsistency;
/// - once `target[c]` variables are fixed to `c`, the value leaves every
///   other domain;
/// - fewer candidates than `target[c]` is an inconsistency;
/// - exactly `target[c]` candidates means all of them are bound to `c`.
#[derive(Debug)]
pub(crate) struct DistributePropagator {
    variables: Vec<DomainId>,
    targets: Vec<usize>,
}

impl DistributePropagator {
    pub(crate) fn new(variables: Vec<DomainId>, targets: Vec<usize>) -> Self {
        DistributePropagator { variables, targets }
    }
}

impl Propagator for DistributePropagator {
    fn name(&self) -> &str {
        "Distribute"
    }

    fn initialise(&mut self, context: &mut PropagatorInitialisationContext<'_>) {
        for (i, &variable) in self.variables.iter().enumerate() {
            context.register(variable, DomainEvents::ANY, LocalId::from(i as u32));
        }
    }

    fn propagate(&mut self, context: &mut PropagationContextMut<'_>) -> PropagationStatus {
        for (c, &target) in self.targets.iter().enumerate() {
            let mut fixed_count = 0;
            let mut candidate_count = 0;
            for &variable in &self.variables {
                if context.contains(variable, c) {
                    candidate_count += 1;
                    if context.is_fixed(variable) {
                        fixed_count += 1;
                    }
                }
            }

            if fixed_count > target || candidate_count < target {
                return Err(Inconsistency::Conflict);
            }

            if fixed_count == target {
                for &variable in &self.variables {
                    if !context.is_fixed(variable) {
                        context.remove(variable, c)?;
                    }
                }
            } else if candidate_count == target {
                for &variable in &self.variables {
                    if context.contains(variable, c) {
                        context.fix(variable, c)?;
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_solver::TestSolver;

    #[test]
    fn a_saturated_value_leaves_the_open_domains() {
        let mut solver = TestSolver::default();
        let x = (0..4).map(|_| solver.new_variable(2)).collect::<Vec<_>>();

        let _ = solver
            .new_propagator(DistributePropagator::new(x.clone(), vec![2, 2]))
            .expect("no conflict");

        solver.fix(x[0], 0).expect("no conflict");
        solver.fix(x[1], 0).expect("no conflict");

        solver.assert_fixed(x[2], 1);
        solver.assert_fixed(x[3], 1);
    }

    #[test]
    fn scarce_candidates_are_all_bound_to_the_value() {
        let mut solver = TestSolver::default();
        let x = (0..4).map(|_| solver.new_variable(2)).collect::<Vec<_>>();

        let _ = solver
            .new_propagator(DistributePropagator::new(x.clone(), vec![2, 2]))
            .expect("no conflict");

        solver.remove(x[0], 0).expect("no conflict");
        solver.remove(x[1], 0).expect("no conflict");

        // Only x2 and x3 can still supply the two occurrences of value 0.
        solver.assert_fixed(x[2], 0);
        solver.assert_fixed(x[3], 0);
    }

    #[test]
    fn an_overfilled_value_is_inconsistent() {
        let mut solver = TestSolver::default();
        let x = (0..3).map(|_| solver.new_variable(2)).collect::<Vec<_>>();

        let id = solver
            .new_propagator(DistributePropagator::new(x.clone(), vec![1, 2]))
            .expect("no conflict");

        solver.assignments.fix(x[0], 0).expect("value in domain");
        solver.assignments.fix(x[1], 0).expect("value in domain");
        assert!(solver.propagate(id).is_err());
    }
}
