//! Lower-bound propagators for the total within-cluster sum of squares.
//!
//! All three propagators share the same bookkeeping, rebuilt at the start of
//! every propagation:
//! - the partition of observations into assigned sets `P[c]` and the
//!   unassigned sequence `U`;
//! - `s1[c]`, the sum of dissimilarities between the points fixed to `c`;
//! - `s2[u][c]`, the sum of dissimilarities between unassigned point `u` and
//!   the points fixed to `c` (infinite when `u` cannot join `c`);
//! - `s3[u][m]`, the sum of the `m + 1` smallest half-dissimilarities from
//!   `u` to the other unassigned points. Each pair dissimilarity is counted
//!   once with each endpoint contributing half, so `s3[u][m - 1]` bounds the
//!   cost `u` brings along when it joins a cluster with `m - 1` other
//!   unassigned points.

mod cardinality;
mod flow;
mod general;

pub(crate) use cardinality::WcssCardinalityPropagator;
pub(crate) use flow::WcssFlowPropagator;
pub(crate) use general::WcssGeneralPropagator;

use crate::basic_types::Inconsistency;
use crate::engine::assignments::DomainId;
use crate::engine::propagation::PropagationContextMut;
use crate::instance::Instance;

/// Scratch shared by the WCSS propagators. Allocated once when the
/// propagator is posted and recomputed, never reallocated, on each
/// propagation.
#[derive(Debug)]
pub(crate) struct PartitionSums {
    /// Points fixed to each cluster.
    pub(crate) assigned: Vec<Vec<usize>>,
    /// Points not yet fixed, in increasing point order.
    pub(crate) unassigned: Vec<usize>,
    pub(crate) size_cluster: Vec<usize>,
    pub(crate) s1: Vec<f64>,
    /// Indexed by position in `unassigned`, then cluster.
    pub(crate) s2: Vec<Vec<f64>>,
    /// Indexed by position in `unassigned`; prefix sums of sorted
    /// half-dissimilarities.
    pub(crate) s3: Vec<Vec<f64>>,
}

impl PartitionSums {
    pub(crate) fn new(num_observations: usize, num_clusters: usize) -> Self {
        PartitionSums {
            assigned: vec![Vec::new(); num_clusters],
            unassigned: Vec::with_capacity(num_observations),
            size_cluster: vec![0; num_clusters],
            s1: vec![0.0; num_clusters],
            s2: vec![vec![0.0; num_clusters]; num_observations],
            s3: vec![Vec::with_capacity(num_observations); num_observations],
        }
    }

    pub(crate) fn num_unassigned(&self) -> usize {
        self.unassigned.len()
    }

    pub(crate) fn rebuild_partition(
        &mut self,
        context: &PropagationContextMut<'_>,
        variables: &[DomainId],
    ) {
        self.unassigned.clear();
        for set in self.assigned.iter_mut() {
            set.clear();
        }

        for (point, &variable) in variables.iter().enumerate() {
            if context.is_fixed(variable) {
                self.assigned[context.value(variable)].push(point);
            } else {
                self.unassigned.push(point);
            }
        }

        self.recompute_sizes();
    }

    pub(crate) fn recompute_sizes(&mut self) {
        for (size, set) in self.size_cluster.iter_mut().zip(self.assigned.iter()) {
            *size = set.len();
        }
    }

    /// `s1[c] = Σ_{i<j ∈ P[c]} D[i][j]`.
    pub(crate) fn compute_intra_cluster_sums(&mut self, instance: &Instance) {
        for (c, set) in self.assigned.iter().enumerate() {
            self.s1[c] = 0.0;
            for i in 0..set.len() {
                for j in (i + 1)..set.len() {
                    self.s1[c] += instance.dissimilarity(set[i], set[j]);
                }
            }
        }
    }

    /// `s2[u][c] = Σ_{j ∈ P[c]} D[u][j]` where `u` may join `c`, infinite
    /// otherwise.
    pub(crate) fn compute_point_to_cluster_sums(
        &mut self,
        instance: &Instance,
        admissible: impl Fn(usize, usize) -> bool,
    ) {
        for (position, &point) in self.unassigned.iter().enumerate() {
            for (c, set) in self.assigned.iter().enumerate() {
                self.s2[position][c] = if admissible(point, c) {
                    set.iter()
                        .map(|&member| instance.dissimilarity(point, member))
                        .sum()
                } else {
                    f64::INFINITY
                };
            }
        }
    }

    /// Sort the half-dissimilarities from each unassigned point to the others
    /// and accumulate prefix sums up to `prefix_len` entries.
    pub(crate) fn compute_half_distance_prefixes(
        &mut self,
        instance: &Instance,
        prefix_len: usize,
    ) {
        let unassigned = &self.unassigned;
        for (position, &point) in unassigned.iter().enumerate() {
            let row = &mut self.s3[position];
            row.clear();
            row.extend(
                unassigned
                    .iter()
                    .map(|&other| instance.dissimilarity(point, other) / 2.0),
            );

            // The first element is 0 because D[point][point] = 0.
            row.sort_unstable_by(f64::total_cmp);

            for j in 1..prefix_len {
                row[j] += row[j - 1];
            }
        }
    }
}

/// The outcome of the cluster-saturation step shared by the
/// cardinality-aware propagators.
pub(crate) enum CardinalityPrelude {
    /// No variable was fixed on entry; the first observation was bound to
    /// cluster 0 (the only choice under value-precedence symmetry breaking)
    /// and the propagation is done.
    AllUnassigned,
    Ready {
        /// `target[c] - |P[c]|` for every cluster.
        nb_add: Vec<usize>,
        /// `max_c nb_add[c]`.
        max_completion: usize,
    },
}

/// Rebuild the partition, then repeatedly remove saturated clusters from the
/// unassigned domains until a fixed point. Removals can bind variables, which
/// shrinks `U` and may saturate further clusters; an overfilled cluster is an
/// inconsistency.
pub(crate) fn saturate_full_clusters(
    context: &mut PropagationContextMut<'_>,
    variables: &[DomainId],
    targets: &[usize],
    sums: &mut PartitionSums,
) -> Result<CardinalityPrelude, Inconsistency> {
    sums.rebuild_partition(context, variables);

    let mut nb_add = vec![0; targets.len()];
    let mut max_completion = compute_completions(targets, &sums.size_cluster, &mut nb_add)?;

    loop {
        let mut fixed_some = false;

        for c in 0..targets.len() {
            if nb_add[c] > 0 {
                continue;
            }
            let mut position = 0;
            while position < sums.unassigned.len() {
                let point = sums.unassigned[position];
                if context.contains(variables[point], c) {
                    context.remove(variables[point], c)?;

                    if context.is_fixed(variables[point]) {
                        fixed_some = true;
                        let value = context.value(variables[point]);
                        sums.assigned[value].push(point);
                        let _ = sums.unassigned.remove(position);
                        continue;
                    }
                }
                position += 1;
            }
        }

        if !fixed_some {
            break;
        }
        sums.recompute_sizes();
        max_completion = compute_completions(targets, &sums.size_cluster, &mut nb_add)?;
    }

    if sums.num_unassigned() == variables.len() {
        context.fix(variables[0], 0)?;
        return Ok(CardinalityPrelude::AllUnassigned);
    }

    Ok(CardinalityPrelude::Ready {
        nb_add,
        max_completion,
    })
}

fn compute_completions(
    targets: &[usize],
    size_cluster: &[usize],
    nb_add: &mut [usize],
) -> Result<usize, Inconsistency> {
    let mut max_completion = 0;
    for c in 0..targets.len() {
        if size_cluster[c] > targets[c] {
            return Err(Inconsistency::Conflict);
        }
        nb_add[c] = targets[c] - size_cluster[c];
        max_completion = max_completion.max(nb_add[c]);
    }
    Ok(max_completion)
}
