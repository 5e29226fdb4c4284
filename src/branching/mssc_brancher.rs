use std::rc::Rc;

use super::Brancher;
use super::Decision;
use super::InitialSolution;
use super::MainSearch;
use super::SearchParameters;
use super::SelectionContext;
use super::TieHandling;
use crate::engine::assignments::DomainId;
use crate::instance::squared_distance;
use crate::instance::Instance;

/// Scaling applied to objective deltas so that tie detection compares exact
/// integers instead of floats.
const DELTA_SCALE: f64 = 1000.0;
const DISTANCE_SCALE: f64 = 1000.0;
const TOTAL_SS_SCALE: f64 = 100.0;

/// The binary branching strategy of the clustering search.
///
/// Until a first incumbent exists an optional initial-solution mode steers
/// the search towards a good complete assignment. The main mode picks, for
/// every unfixed observation, the cheapest cluster by objective delta, and
/// branches on the observation whose cheapest cluster is the most expensive.
/// When every delta is zero an empty cluster exists (this happens at the
/// start and after backtracking empties a cluster): a tie-breaking heuristic
/// chooses which observation opens the lowest empty cluster, keeping the
/// value-precedence order intact.
#[derive(Debug)]
pub(crate) struct MsscBrancher {
    instance: Rc<Instance>,
    variables: Vec<DomainId>,
    parameters: SearchParameters,
    solution_found: bool,
}

impl MsscBrancher {
    pub(crate) fn new(
        instance: Rc<Instance>,
        variables: Vec<DomainId>,
        parameters: SearchParameters,
    ) -> Self {
        MsscBrancher {
            instance,
            variables,
            parameters,
            solution_found: false,
        }
    }

    /// The scaled objective increase of assigning `point` to `cluster` under
    /// the current partial assignment. Assigning to an empty cluster is
    /// free.
    fn delta_objective(&self, context: &SelectionContext<'_>, point: usize, cluster: usize) -> i64 {
        let mut intra_sum = 0.0;
        let mut point_sum = 0.0;
        let mut cardinality = 0usize;

        for (i, &variable) in self.variables.iter().enumerate() {
            if context.is_fixed(variable) && context.value(variable) == cluster {
                cardinality += 1;
                for (j, &other) in self.variables.iter().enumerate().skip(i + 1) {
                    if context.is_fixed(other) && context.value(other) == cluster {
                        intra_sum += self.instance.dissimilarity(i, j);
                    }
                }
                point_sum += self.instance.dissimilarity(i, point);
            }
        }

        if cardinality == 0 {
            return 0;
        }

        (((intra_sum + point_sum) / (cardinality + 1) as f64 - intra_sum / cardinality as f64)
            * DELTA_SCALE) as i64
    }

    /// The scaled total dissimilarity between `point` and the unfixed
    /// observations.
    fn unbound_total_ss(&self, context: &SelectionContext<'_>, point: usize) -> i64 {
        let total: f64 = self
            .variables
            .iter()
            .enumerate()
            .filter(|&(_, &variable)| !context.is_fixed(variable))
            .map(|(i, _)| self.instance.dissimilarity(i, point))
            .sum();

        (total * TOTAL_SS_SCALE) as i64
    }

    fn scaled_distance(&self, i: usize, j: usize) -> i64 {
        (self.instance.dissimilarity(i, j) * DISTANCE_SCALE) as i64
    }

    fn cluster_cardinalities(&self, context: &SelectionContext<'_>) -> Vec<usize> {
        let mut cardinalities = vec![0; self.instance.num_clusters()];
        for &variable in &self.variables {
            if context.is_fixed(variable) {
                cardinalities[context.value(variable)] += 1;
            }
        }
        cardinalities
    }

    /// Centroid of the observations fixed to `cluster`; `cardinality` must
    /// be its nonzero member count.
    fn centroid(
        &self,
        context: &SelectionContext<'_>,
        cluster: usize,
        cardinality: usize,
    ) -> Vec<f64> {
        let coordinates = self
            .instance
            .coordinates()
            .expect("centroid tie-breakers require coordinates");
        let mut center = vec![0.0; coordinates[0].len()];

        for (i, &variable) in self.variables.iter().enumerate() {
            if context.is_fixed(variable) && context.value(variable) == cluster {
                for (component, coordinate) in center.iter_mut().zip(coordinates[i].iter()) {
                    *component += coordinate;
                }
            }
        }
        for component in center.iter_mut() {
            *component /= cardinality as f64;
        }
        center
    }

    fn initial_solution_decision(&self, context: &SelectionContext<'_>) -> Option<Decision> {
        match self.parameters.initial_solution {
            InitialSolution::None => unreachable!("checked by the caller"),
            InitialSolution::GreedyInit => {
                let minimum_domain_size = self
                    .variables
                    .iter()
                    .filter(|&&variable| !context.is_fixed(variable))
                    .map(|&variable| context.domain_size(variable))
                    .min()?;

                let mut best: Option<Decision> = None;
                let mut smallest_delta = i64::MAX;
                for (i, &variable) in self.variables.iter().enumerate() {
                    if context.is_fixed(variable)
                        || context.domain_size(variable) != minimum_domain_size
                    {
                        continue;
                    }
                    for value in context.iter_domain(variable) {
                        let delta = self.delta_objective(context, i, value);
                        if delta < smallest_delta {
                            smallest_delta = delta;
                            best = Some(Decision { variable, value });
                        }
                    }
                }
                best
            }
            InitialSolution::MembershipsAsIndicated => {
                let memberships = self
                    .instance
                    .memberships()
                    .expect("the membership-guided mode requires initial memberships");

                let (i, &variable) = self
                    .variables
                    .iter()
                    .enumerate()
                    .find(|&(_, &variable)| !context.is_fixed(variable))?;

                // Fall back to the smallest remaining value when filtering
                // has already discarded the indicated membership.
                let value = if context.contains(variable, memberships[i]) {
                    memberships[i]
                } else {
                    context
                        .iter_domain(variable)
                        .next()
                        .expect("unfixed domains are nonempty")
                };
                Some(Decision { variable, value })
            }
        }
    }

    /// The lowest empty cluster index consistent with value precedence, or
    /// `None` when every cluster is occupied.
    fn cluster_to_fill(&self, context: &SelectionContext<'_>) -> Option<usize> {
        // Because of symmetry breaking the occupied clusters of the fixed
        // prefix form an increasing run, except that backtracking can leave
        // a gap; the first gap is the cluster to open.
        let mut highest: i64 = -1;
        let mut jump_after: Option<i64> = None;

        for &variable in &self.variables {
            if !context.is_fixed(variable) {
                continue;
            }
            let value = context.value(variable) as i64;
            if value - highest >= 2 {
                if jump_after.is_none() {
                    jump_after = Some(highest);
                }
                highest = value;
            } else if value - highest == 1 {
                highest = value;
            }
        }

        if let Some(jump_after) = jump_after {
            return Some((jump_after + 1) as usize);
        }
        if highest <= self.instance.num_clusters() as i64 - 2 {
            return Some((highest + 1) as usize);
        }
        None
    }

    /// The observations fixed so far occupy these clusters, in increasing
    /// order.
    fn occupied_clusters(&self, context: &SelectionContext<'_>) -> Vec<usize> {
        let cardinalities = self.cluster_cardinalities(context);
        (0..self.instance.num_clusters())
            .filter(|&c| cardinalities[c] > 0)
            .collect()
    }

    fn tie_breaking_choice(
        &self,
        context: &SelectionContext<'_>,
        cluster_to_fill: usize,
    ) -> Option<usize> {
        let candidates = || {
            self.variables.iter().enumerate().filter(|&(_, &variable)| {
                !context.is_fixed(variable) && context.contains(variable, cluster_to_fill)
            })
        };

        match self.parameters.tie_handling {
            TieHandling::None => None,

            TieHandling::UnboundFarthestTotalSs => {
                let mut best = None;
                let mut max_distance = 0;
                for (i, _) in candidates() {
                    let distance = self.unbound_total_ss(context, i);
                    if distance > max_distance {
                        max_distance = distance;
                        best = Some(i);
                    }
                }
                best
            }

            TieHandling::FixedFarthestDist => {
                let mut best = None;
                let mut max_distance = 0;
                for (i, _) in candidates() {
                    for (j, &other) in self.variables.iter().enumerate() {
                        if context.is_fixed(other) && self.scaled_distance(i, j) > max_distance {
                            max_distance = self.scaled_distance(i, j);
                            best = Some(i);
                        }
                    }
                }
                best
            }

            TieHandling::FixedMaxMin => {
                let occupied = self.occupied_clusters(context);
                let mut best = None;
                let mut max_over_candidates = 0;
                for (i, _) in candidates() {
                    let mut min_over_clusters = i64::MAX;
                    for &cluster in &occupied {
                        let mut min_to_cluster = i64::MAX;
                        for (j, &other) in self.variables.iter().enumerate() {
                            if context.is_fixed(other)
                                && context.value(other) == cluster
                                && self.scaled_distance(i, j) < min_to_cluster
                            {
                                min_to_cluster = self.scaled_distance(i, j);
                            }
                        }
                        min_over_clusters = min_over_clusters.min(min_to_cluster);
                    }

                    if min_over_clusters > max_over_candidates {
                        max_over_candidates = min_over_clusters;
                        best = Some(i);
                    }
                }
                best
            }

            TieHandling::FarthestPointFromBiggestCenter => {
                let cardinalities = self.cluster_cardinalities(context);
                let (biggest_cluster, &biggest_cardinality) = cardinalities
                    .iter()
                    .enumerate()
                    .max_by_key(|&(c, &cardinality)| (cardinality, std::cmp::Reverse(c)))?;
                if biggest_cardinality == 0 {
                    return None;
                }

                let coordinates = self
                    .instance
                    .coordinates()
                    .expect("centroid tie-breakers require coordinates");
                let center = self.centroid(context, biggest_cluster, biggest_cardinality);

                let mut best = None;
                let mut max_distance = 0.0;
                for (i, _) in candidates() {
                    let distance = squared_distance(&center, &coordinates[i]);
                    if distance > max_distance {
                        max_distance = distance;
                        best = Some(i);
                    }
                }
                best
            }

            TieHandling::MaxMinPointFromAllCenters => {
                let cardinalities = self.cluster_cardinalities(context);
                let occupied = self.occupied_clusters(context);
                if occupied.is_empty() {
                    return None;
                }

                let coordinates = self
                    .instance
                    .coordinates()
                    .expect("centroid tie-breakers require coordinates");
                let centers: Vec<Vec<f64>> = occupied
                    .iter()
                    .map(|&cluster| self.centroid(context, cluster, cardinalities[cluster]))
                    .collect();

                let mut best = None;
                let mut max_distance = 0.0;
                for (i, _) in candidates() {
                    let nearest = centers
                        .iter()
                        .map(|center| squared_distance(center, &coordinates[i]))
                        .fold(f64::INFINITY, f64::min);
                    if nearest > max_distance {
                        max_distance = nearest;
                        best = Some(i);
                    }
                }
                best
            }
        }
    }
}

impl Brancher for MsscBrancher {
    fn next_decision(&mut self, context: &SelectionContext<'_>) -> Option<Decision> {
        if !self.solution_found && self.parameters.initial_solution != InitialSolution::None {
            return self.initial_solution_decision(context);
        }

        let MainSearch::MaxMinVar = self.parameters.main_search;

        let mut best: Option<Decision> = None;
        let mut max_min_delta: i64 = 0;
        for (i, &variable) in self.variables.iter().enumerate() {
            if context.is_fixed(variable) {
                continue;
            }

            let mut min_delta = i64::MAX;
            let mut cheapest_value = 0;
            for value in context.iter_domain(variable) {
                let delta = self.delta_objective(context, i, value);
                if delta < min_delta {
                    min_delta = delta;
                    cheapest_value = value;
                }
            }

            if min_delta >= max_min_delta || best.is_none() {
                max_min_delta = min_delta;
                best = Some(Decision {
                    variable,
                    value: cheapest_value,
                });
            }
        }
        let mut decision = best?;

        // Every candidate assignment being free means an empty cluster
        // exists; delegate the choice of who opens it.
        if max_min_delta == 0 {
            if let Some(cluster_to_fill) = self.cluster_to_fill(context) {
                if let Some(point) = self.tie_breaking_choice(context, cluster_to_fill) {
                    decision = Decision {
                        variable: self.variables[point],
                        value: cluster_to_fill,
                    };
                }
            }
        }

        Some(decision)
    }

    fn on_solution(&mut self) {
        self.solution_found = true;
    }
}
