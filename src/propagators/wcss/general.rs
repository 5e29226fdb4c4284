use std::rc::Rc;

use super::PartitionSums;
use crate::basic_types::PropagationStatus;
use crate::engine::assignments::DomainId;
use crate::engine::propagation::DomainEvents;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorInitialisationContext;
use crate::instance::Instance;

/// Guards the lower bound against rounding: the bound is reported slightly
/// below its computed value so a near-optimal incumbent is never rejected by
/// floating-point noise.
const EPSILON: f64 = 5e-5;

/// Lower bound on the total WCSS without cardinality knowledge
/// (Dao, Duong & Vrain 2015).
///
/// For every cluster `c` and every count `m` of additional points,
/// `lb_schedule[c][m]` bounds the WCSS of `c` from below; a dynamic program
/// over the clusters combines the schedules into a global bound on the
/// objective. Cost-based filtering then removes cluster `c` from an
/// unassigned point when the best completion placing the point in `c`
/// already reaches the incumbent.
#[derive(Debug)]
pub(crate) struct WcssGeneralPropagator {
    instance: Rc<Instance>,
    variables: Vec<DomainId>,
    sums: PartitionSums,
    /// `lb_schedule[c][m]`: bound on the WCSS of cluster `c` after adding `m`
    /// unassigned points to it.
    lb_schedule: Vec<Vec<f64>>,
    /// `lb_global[c][m]`: bound on the summed WCSS of clusters `0..=c` after
    /// distributing `m` unassigned points over them.
    lb_global: Vec<Vec<f64>>,
    /// `lb_except[m]`: bound on the remaining clusters when the active
    /// cluster absorbs `m` points.
    lb_except: Vec<f64>,
    /// `lb_prime[m]`: bound on the active cluster holding the active point
    /// plus `m` others.
    lb_prime: Vec<f64>,
    candidate_costs: Vec<f64>,
}

impl WcssGeneralPropagator {
    pub(crate) fn new(instance: Rc<Instance>, variables: Vec<DomainId>) -> Self {
        let n = instance.num_observations();
        let k = instance.num_clusters();
        WcssGeneralPropagator {
            variables,
            sums: PartitionSums::new(n, k),
            lb_schedule: vec![vec![0.0; n + 1]; k],
            lb_global: vec![vec![0.0; n + 1]; k],
            lb_except: vec![0.0; n],
            lb_prime: vec![0.0; n],
            candidate_costs: Vec::with_capacity(n),
            instance,
        }
    }
}

impl Propagator for WcssGeneralPropagator {
    fn name(&self) -> &str {
        "WcssGeneral"
    }

    fn initialise(&mut self, context: &mut PropagatorInitialisationContext<'_>) {
        for (i, &variable) in self.variables.iter().enumerate() {
            context.register(variable, DomainEvents::ANY, LocalId::from(i as u32));
        }
    }

    fn propagate(&mut self, context: &mut PropagationContextMut<'_>) -> PropagationStatus {
        let instance = Rc::clone(&self.instance);
        let k = instance.num_clusters();

        self.sums.rebuild_partition(context, &self.variables);
        let q = self.sums.num_unassigned();

        self.sums.compute_intra_cluster_sums(&instance);
        {
            let variables = &self.variables;
            self.sums
                .compute_point_to_cluster_sums(&instance, |point, c| {
                    context.contains(variables[point], c)
                });
        }
        self.sums.compute_half_distance_prefixes(&instance, q);

        // Per-cluster schedules: for each count m of added points, pick the m
        // cheapest candidate contributions.
        for c in 0..k {
            for m in 0..=q {
                let mut selected = 0.0;
                if m > 0 {
                    self.candidate_costs.clear();
                    for position in 0..q {
                        self.candidate_costs
                            .push(self.sums.s2[position][c] + self.sums.s3[position][m - 1]);
                    }
                    self.candidate_costs.sort_unstable_by(f64::total_cmp);
                    selected = self.candidate_costs[..m].iter().sum();
                }

                let denominator = self.sums.size_cluster[c] + m;
                self.lb_schedule[c][m] = if denominator > 0 {
                    (self.sums.s1[c] + selected) / denominator as f64
                } else {
                    0.0
                };
            }
        }

        // Dynamic program over the clusters: distribute m points over
        // clusters 0..=c at minimum summed bound.
        self.lb_global[0][..=q].copy_from_slice(&self.lb_schedule[0][..=q]);
        for c in 1..k {
            for m in 0..=q {
                let mut best = f64::INFINITY;
                for i in 0..=m {
                    let split = self.lb_global[c - 1][i] + self.lb_schedule[c][m - i];
                    if split < best {
                        best = split;
                    }
                }
                self.lb_global[c][m] = best;
            }
        }

        context.set_objective_min(self.lb_global[k - 1][q] - EPSILON)?;

        // Cost-based filtering: for each cluster and candidate point, bound
        // the best completion which routes the point into that cluster.
        for c in 0..k {
            for m in 0..q {
                self.lb_except[m] = 0.0;
                for j in m..=q {
                    let rest = self.lb_global[k - 1][j] - self.lb_schedule[c][j - m];
                    if rest > self.lb_except[m] {
                        self.lb_except[m] = rest;
                    }
                }
            }

            for position in 0..q {
                let point = self.sums.unassigned[position];
                if !context.contains(self.variables[point], c) {
                    continue;
                }

                for m in 0..q {
                    let members = (self.sums.size_cluster[c] + m) as f64;
                    self.lb_prime[m] = (members * self.lb_schedule[c][m]
                        + self.sums.s2[position][c]
                        + self.sums.s3[position][m])
                        / (members + 1.0);
                }

                let mut objective_with_point = f64::INFINITY;
                for m in 0..q {
                    let candidate = self.lb_except[q - 1 - m] + self.lb_prime[m];
                    if candidate < objective_with_point {
                        objective_with_point = candidate;
                    }
                }

                if objective_with_point >= context.objective_max() {
                    context.remove(self.variables[point], c)?;
                }
            }
        }

        Ok(())
    }
}
