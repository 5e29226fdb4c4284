use std::cell::Cell;
use std::rc::Rc;

use super::saturate_full_clusters;
use super::CardinalityPrelude;
use super::PartitionSums;
use crate::basic_types::Inconsistency;
use crate::basic_types::PropagationStatus;
use crate::engine::assignments::DomainId;
use crate::engine::propagation::DomainEvents;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorInitialisationContext;
use crate::engine::trailed::TrailedBool;
use crate::engine::trailed::TrailedFloat;
use crate::engine::trailed::TrailedInt;
use crate::flow::EdgeRef;
use crate::flow::MinCostFlow;
use crate::instance::Instance;

/// Larger than the epsilon of the other bounds: the flow objective
/// accumulates more floating-point error than the closed-form sums.
const EPSILON: f64 = 5e-3;

/// The strongest WCSS lower bound: the assignment of the remaining
/// observations is relaxed to a transportation problem and solved exactly.
///
/// Network layout: a source feeds one unit per unassigned observation, an
/// arc `(u, c)` with cost `(s2[u][c] + s3[u][nb_add[c] - 1]) / target[c]`
/// carries observation `u` into cluster `c`, and cluster `c` passes at most
/// `nb_add[c]` units to the sink. Dividing by `target[c]` on the arcs keeps
/// the objective linear in the flow.
///
/// The optimal flow serves double duty: its value tightens the objective
/// lower bound, and its residual network prices every unused arc. Rerouting
/// observation `u` from its matched cluster to `c` costs the direct
/// difference plus a shortest path in the residual network; when the priced
/// assignment cannot beat the incumbent, `c` is removed from `u`'s domain.
///
/// Solving the network is by far the most expensive step, so the previous
/// solution is reused whenever it is still valid for the current domains.
#[derive(Debug)]
pub(crate) struct WcssFlowPropagator {
    instance: Rc<Instance>,
    variables: Vec<DomainId>,
    targets: Vec<usize>,
    sums: PartitionSums,

    /// Cluster the last flow routed each observation to (`-1` before the
    /// first solve). Reversible.
    destination: Vec<TrailedInt>,
    /// Whether the observation was already bound at the end of the last
    /// propagation. Reversible.
    var_was_fixed: Vec<TrailedBool>,
    /// Whether the last flow used arc `(u, c)`; rows are positions in the
    /// unassigned sequence at the time of the solve. Reversible.
    has_flow: Vec<Vec<TrailedBool>>,
    /// The last flow objective minus [`EPSILON`]. Reversible.
    lb_global: TrailedFloat,

    /// Whether arc `(u, c)` exists in the current network; rebuilt every
    /// propagation.
    arc_admissible: Vec<Vec<bool>>,
    nb_add: Vec<usize>,

    num_network_solves: Rc<Cell<u64>>,
}

impl WcssFlowPropagator {
    pub(crate) fn new(instance: Rc<Instance>, variables: Vec<DomainId>) -> Self {
        let n = instance.num_observations();
        let k = instance.num_clusters();
        let targets = instance
            .target_cardinalities()
            .expect("the flow-based bound requires target cardinalities")
            .to_vec();
        WcssFlowPropagator {
            variables,
            targets,
            sums: PartitionSums::new(n, k),
            destination: Vec::new(),
            var_was_fixed: Vec::new(),
            has_flow: Vec::new(),
            lb_global: TrailedFloat::default(),
            arc_admissible: vec![vec![false; k]; n],
            nb_add: vec![0; k],
            num_network_solves: Rc::new(Cell::new(0)),
            instance,
        }
    }

    /// Handle to the count of network solves; used to observe that valid
    /// solutions are reused across propagations.
    #[cfg(test)]
    pub(crate) fn network_solve_counter(&self) -> Rc<Cell<u64>> {
        Rc::clone(&self.num_network_solves)
    }

    fn arc_weight(&self, position: usize, c: usize) -> f64 {
        (self.sums.s2[position][c] + self.sums.s3[position][self.nb_add[c] - 1])
            / self.targets[c] as f64
    }

    /// The minimum objective increase of rerouting one unit of flow from
    /// `origin_c` (where `position` is currently matched) to `targeted_c`:
    /// the direct cost difference for the observation itself plus a shortest
    /// path from `targeted_c` back to `origin_c` in the residual network.
    ///
    /// The residual network is bipartite: unused arcs go rightwards at their
    /// cost, used arcs go leftwards at the negated cost. Bellman-Ford with
    /// at most `|V| - 1` passes handles the negative left-going edges;
    /// negative cycles elsewhere in the network cannot touch the path of
    /// interest, since a negative-weight excursion from it would contradict
    /// the optimality of the flow. Returns `-1.0` when `origin_c` is
    /// unreachable, i.e. the reroute is infeasible.
    fn reroute_delta(
        &self,
        context: &PropagationContextMut<'_>,
        position: usize,
        origin_c: usize,
        targeted_c: usize,
    ) -> f64 {
        let q = self.sums.num_unassigned();
        let k = self.targets.len();

        let mut distance = vec![f64::INFINITY; q + k];
        distance[q + targeted_c] = 0.0;

        for _pass in 0..(q + k - 2) {
            let mut improved = false;

            for i in 0..q {
                if i == position {
                    continue;
                }
                for c in 0..k {
                    if !self.arc_admissible[i][c] {
                        continue;
                    }
                    let used = context.read_bool(self.has_flow[i][c]);
                    if !used && c != targeted_c {
                        // Never re-enter the node the excess flow starts at;
                        // a shorter path back would be a negative cycle.
                        let weight = self.arc_weight(i, c);
                        if distance[i] + weight < distance[q + c] {
                            distance[q + c] = distance[i] + weight;
                            improved = true;
                        }
                    } else if used && c != origin_c {
                        // Never leave the node the flow deficit sits at.
                        let weight = self.arc_weight(i, c);
                        if distance[q + c] - weight < distance[i] {
                            distance[i] = distance[q + c] - weight;
                            improved = true;
                        }
                    }
                }
            }

            if !improved {
                break;
            }
        }

        if !(distance[q + origin_c] < f64::INFINITY) {
            return -1.0;
        }

        self.arc_weight(position, targeted_c) - self.arc_weight(position, origin_c)
            + distance[q + origin_c]
    }
}

impl Propagator for WcssFlowPropagator {
    fn name(&self) -> &str {
        "WcssFlow"
    }

    fn initialise(&mut self, context: &mut PropagatorInitialisationContext<'_>) {
        let n = self.variables.len();
        let k = self.targets.len();

        self.destination = (0..n).map(|_| context.new_trailed_int(-1)).collect();
        self.var_was_fixed = (0..n).map(|_| context.new_trailed_bool(false)).collect();
        self.has_flow = (0..n)
            .map(|_| (0..k).map(|_| context.new_trailed_bool(false)).collect())
            .collect();
        self.lb_global = context.new_trailed_float(0.0);

        for (i, &variable) in self.variables.iter().enumerate() {
            context.register(variable, DomainEvents::ANY, LocalId::from(i as u32));
        }
    }

    fn propagate(&mut self, context: &mut PropagationContextMut<'_>) -> PropagationStatus {
        let instance = Rc::clone(&self.instance);
        let k = self.targets.len();

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
        self.nb_add = nb_add;
        let q = self.sums.num_unassigned();

        self.sums.compute_intra_cluster_sums(&instance);

        for position in 0..q {
            let point = self.sums.unassigned[position];
            for c in 0..k {
                self.arc_admissible[position][c] =
                    self.nb_add[c] > 0 && context.contains(self.variables[point], c);
            }
        }
        {
            let variables = &self.variables;
            let nb_add = &self.nb_add;
            self.sums
                .compute_point_to_cluster_sums(&instance, |point, c| {
                    nb_add[c] > 0 && context.contains(variables[point], c)
                });
        }
        self.sums
            .compute_half_distance_prefixes(&instance, max_completion);

        // A fresh solve is needed only if the recorded solution no longer
        // matches the current domains.
        let mut must_resolve = false;
        for (i, &variable) in self.variables.iter().enumerate() {
            let destination = context.read_int(self.destination[i]);
            if destination == -1 {
                must_resolve = true;
                break;
            }
            if context.is_fixed(variable) && context.value(variable) != destination as usize {
                must_resolve = true;
                break;
            }
            if !context.contains(variable, destination as usize) {
                must_resolve = true;
                break;
            }
        }
        for (i, &variable) in self.variables.iter().enumerate() {
            if context.is_fixed(variable) && !context.read_bool(self.var_was_fixed[i]) {
                must_resolve = true;
                context.assign_bool(self.var_was_fixed[i], true);
            }
        }
        if !must_resolve {
            for position in 0..q {
                let destination = context.read_int(self.destination[self.sums.unassigned[position]]);
                if destination < 0 || !self.arc_admissible[position][destination as usize] {
                    must_resolve = true;
                    break;
                }
            }
        }

        if must_resolve {
            let source = q + k;
            let sink = q + k + 1;
            let mut network = MinCostFlow::new(q + k + 2);
            let mut arc_refs: Vec<Vec<Option<EdgeRef>>> = vec![vec![None; k]; q];

            for position in 0..q {
                let _ = network.add_edge(source, position, 1, 0.0);
            }
            for c in 0..k {
                if self.nb_add[c] == 0 {
                    continue;
                }
                let mut has_candidate = false;
                for (position, refs) in arc_refs.iter_mut().enumerate() {
                    if self.arc_admissible[position][c] {
                        has_candidate = true;
                        let weight = self.arc_weight(position, c);
                        refs[c] = Some(network.add_edge(position, q + c, 1, weight));
                    }
                }
                // A cluster which must still receive observations but has no
                // candidates left makes the subtree infeasible.
                if !has_candidate {
                    return Err(Inconsistency::Conflict);
                }
                let _ = network.add_edge(q + c, sink, self.nb_add[c] as i64, 0.0);
            }

            let flow_cost = network
                .solve(source, sink, q as i64)
                .map_err(|_| Inconsistency::Conflict)?;
            self.num_network_solves
                .set(self.num_network_solves.get() + 1);

            let fixed_share: f64 = (0..k)
                .map(|c| self.sums.s1[c] / self.targets[c] as f64)
                .sum();
            context.assign_float(self.lb_global, fixed_share + flow_cost - EPSILON);

            for (position, refs) in arc_refs.iter().enumerate() {
                for (c, arc) in refs.iter().enumerate() {
                    if let Some(arc) = arc {
                        context.assign_bool(self.has_flow[position][c], network.flow(*arc) > 0);
                    }
                }
            }
        }

        context.set_objective_min(context.read_float(self.lb_global))?;

        if must_resolve {
            for position in 0..q {
                for c in 0..k {
                    if self.arc_admissible[position][c]
                        && context.read_bool(self.has_flow[position][c])
                    {
                        context.assign_int(
                            self.destination[self.sums.unassigned[position]],
                            c as i64,
                        );
                    }
                }
            }
            for (i, &variable) in self.variables.iter().enumerate() {
                if context.is_fixed(variable) {
                    context.assign_int(self.destination[i], context.value(variable) as i64);
                }
            }
        }

        // Residual cost-based filtering over the arcs the flow did not use.
        for c in 0..k {
            for position in 0..q {
                if !self.arc_admissible[position][c]
                    || context.read_bool(self.has_flow[position][c])
                {
                    continue;
                }

                let point = self.sums.unassigned[position];
                let origin_c = context.read_int(self.destination[point]) as usize;
                let delta = self.reroute_delta(context, position, origin_c, c);

                // A negative delta is the infeasibility sentinel; the small
                // slack shields genuine zero deltas from rounding.
                if delta < -0.1 || context.read_float(self.lb_global) + delta > context.objective_max()
                {
                    if context.domain_size(self.variables[point]) == 1 {
                        // The engine is about to see an empty domain; fail
                        // here so the flow state is not left half-updated.
                        return Err(Inconsistency::Conflict);
                    }
                    context.remove(self.variables[point], c)?;
                }
            }
        }

        Ok(())
    }
}
