use std::rc::Rc;

use super::saturate_full_clusters;
use super::CardinalityPrelude;
use super::PartitionSums;
use crate::basic_types::PropagationStatus;
use crate::engine::assignments::DomainId;
use crate::engine::propagation::DomainEvents;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorInitialisationContext;
use crate::instance::Instance;

const EPSILON: f64 = 5e-5;

/// Lower bound on the total WCSS exploiting fixed target cardinalities.
///
/// Knowing each cluster must end up with exactly `target[c]` points makes two
/// schedules per cluster sufficient: completing the cluster
/// (`nb_add[c]` additional points) and completing it short of one point,
/// which is the configuration used when reasoning about routing a candidate
/// point into the cluster. No dynamic program is needed; the global bound is
/// the sum of the completed-cluster bounds.
///
/// Clusters which have reached their target are removed from every
/// unassigned domain before the bound is computed; an overfilled cluster
/// fails the propagation.
#[derive(Debug)]
pub(crate) struct WcssCardinalityPropagator {
    instance: Rc<Instance>,
    variables: Vec<DomainId>,
    targets: Vec<usize>,
    sums: PartitionSums,
    /// `lb_schedule[c][m]`: bound on the WCSS of cluster `c` completed to
    /// `target[c] - m` points, for m in {0, 1}.
    lb_schedule: Vec<[f64; 2]>,
    candidate_costs: Vec<f64>,
}

impl WcssCardinalityPropagator {
    pub(crate) fn new(instance: Rc<Instance>, variables: Vec<DomainId>) -> Self {
        let n = instance.num_observations();
        let k = instance.num_clusters();
        let targets = instance
            .target_cardinalities()
            .expect("the cardinality-aware bound requires target cardinalities")
            .to_vec();
        WcssCardinalityPropagator {
            variables,
            targets,
            sums: PartitionSums::new(n, k),
            lb_schedule: vec![[0.0; 2]; k],
            candidate_costs: Vec::with_capacity(n),
            instance,
        }
    }
}

impl Propagator for WcssCardinalityPropagator {
    fn name(&self) -> &str {
        "WcssCardinality"
    }

    fn initialise(&mut self, context: &mut PropagatorInitialisationContext<'_>) {
        for (i, &variable) in self.variables.iter().enumerate() {
            context.register(variable, DomainEvents::ANY, LocalId::from(i as u32));
        }
    }

    fn propagate(&mut self, context: &mut PropagationContextMut<'_>) -> PropagationStatus {
        let instance = Rc::clone(&self.instance);
        let k = instance.num_clusters();

        let (nb_add, max_completion) = match saturate_full_clusters(
            context,
            &self.variables,
            &self.targets,
            &mut self.sums,
        )? {
            CardinalityPrelude::AllUnassigned => return Ok(()),
            CardinalityPrelude::Ready {
                nb_add,
                max_completion,
            } => (nb_add, max_completion),
        };
        let q = self.sums.num_unassigned();

        self.sums.compute_intra_cluster_sums(&instance);
        {
            let variables = &self.variables;
            self.sums
                .compute_point_to_cluster_sums(&instance, |point, c| {
                    nb_add[c] > 0 && context.contains(variables[point], c)
                });
        }
        self.sums
            .compute_half_distance_prefixes(&instance, max_completion);

        // Two schedules per cluster: complete it, or complete it short of
        // one point.
        for c in 0..k {
            for m in 0..2 {
                let take = nb_add[c] as i64 - m as i64;
                let mut selected = 0.0;
                if take > 0 {
                    self.candidate_costs.clear();
                    for position in 0..q {
                        self.candidate_costs
                            .push(self.sums.s2[position][c] + self.sums.s3[position][nb_add[c] - 1]);
                    }
                    self.candidate_costs.sort_unstable_by(f64::total_cmp);
                    selected = self.candidate_costs[..take as usize].iter().sum();
                }

                let denominator = (nb_add[c] + self.sums.size_cluster[c]) as f64 - m as f64;
                self.lb_schedule[c][m] = (self.sums.s1[c] + selected) / denominator;
            }
        }

        // Cardinalities are fixed, so the global bound is a plain sum.
        let lb_global: f64 = self.lb_schedule.iter().map(|schedule| schedule[0]).sum();
        context.set_objective_min(lb_global - EPSILON)?;

        // Cost-based filtering: replace cluster c's contribution with the
        // bound for c holding the candidate point plus its completion.
        for c in 0..k {
            let lb_except = lb_global - self.lb_schedule[c][0];

            for position in 0..q {
                let point = self.sums.unassigned[position];
                if !context.contains(self.variables[point], c) {
                    continue;
                }

                let members = (nb_add[c] + self.sums.size_cluster[c]) as f64;
                let lb_prime = ((members - 1.0) * self.lb_schedule[c][1]
                    + self.sums.s2[position][c]
                    + self.sums.s3[position][nb_add[c] - 1])
                    / members;

                if lb_except + lb_prime >= context.objective_max() {
                    context.remove(self.variables[point], c)?;
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

    fn paired_instance() -> Rc<Instance> {
        Rc::new(
            Instance::new(
                vec![
                    vec![0.0, 1.0, 9.0, 9.0],
                    vec![1.0, 0.0, 9.0, 9.0],
                    vec![9.0, 9.0, 0.0, 1.0],
                    vec![9.0, 9.0, 1.0, 0.0],
                ],
                2,
            )
            .expect("valid instance")
            .with_target_cardinalities(vec![2, 2])
            .expect("valid targets"),
        )
    }

    #[test]
    fn posting_on_an_unassigned_model_binds_the_first_observation() {
        let mut solver = TestSolver::default();
        let instance = paired_instance();
        let x = (0..4).map(|_| solver.new_variable(2)).collect::<Vec<_>>();

        let _ = solver
            .new_propagator(WcssCardinalityPropagator::new(instance, x.clone()))
            .expect("no conflict");

        // Under value-precedence symmetry breaking the first observation
        // always lands in cluster 0.
        solver.assert_fixed(x[0], 0);
    }

    #[test]
    fn saturated_clusters_are_removed_from_the_remaining_domains() {
        let mut solver = TestSolver::default();
        let instance = paired_instance();
        let x = (0..4).map(|_| solver.new_variable(2)).collect::<Vec<_>>();

        let _ = solver
            .new_propagator(WcssCardinalityPropagator::new(instance, x.clone()))
            .expect("no conflict");
        solver.fix(x[1], 0).expect("no conflict");

        // Cluster 0 holds observations 0 and 1 and is full, which forces the
        // rest into cluster 1.
        solver.assert_fixed(x[2], 1);
        solver.assert_fixed(x[3], 1);
    }

    #[test]
    fn overfilling_a_cluster_is_inconsistent() {
        let mut solver = TestSolver::default();
        let instance = paired_instance();
        let x = (0..4).map(|_| solver.new_variable(2)).collect::<Vec<_>>();

        let id = solver
            .new_propagator(WcssCardinalityPropagator::new(instance, x.clone()))
            .expect("no conflict");

        // Three observations land in cluster 0 before the propagator gets to
        // run; its target of two is exceeded.
        solver.assignments.fix(x[1], 0).expect("value in domain");
        solver.assignments.fix(x[2], 0).expect("value in domain");
        assert!(solver.propagate(id).is_err());
    }

    #[test]
    fn bound_is_tight_on_the_paired_instance() {
        let mut solver = TestSolver::default();
        let instance = paired_instance();
        let x = (0..4).map(|_| solver.new_variable(2)).collect::<Vec<_>>();

        let _ = solver
            .new_propagator(WcssCardinalityPropagator::new(instance, x))
            .expect("no conflict");

        assert!((solver.objective_min() - (1.0 - EPSILON)).abs() < 1e-12);
    }

    #[test]
    fn cost_filtering_completes_the_solution_under_a_tight_incumbent() {
        let mut solver = TestSolver::default();
        let instance = paired_instance();
        let x = (0..4).map(|_| solver.new_variable(2)).collect::<Vec<_>>();

        let _ = solver
            .new_propagator(WcssCardinalityPropagator::new(instance, x.clone()))
            .expect("no conflict");
        solver
            .tighten_objective_upper_bound(1.5)
            .expect("no conflict");

        // Any assignment pairing observations across the two tight pairs
        // costs at least 9/2, so the incumbent forces the optimum.
        solver.assert_fixed(x[0], 0);
        solver.assert_fixed(x[1], 0);
        solver.assert_fixed(x[2], 1);
        solver.assert_fixed(x[3], 1);
    }
}
