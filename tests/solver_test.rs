//! End-to-end scenarios: known optima, agreement of the three bounds, and
//! randomized comparison against brute-force enumeration.

use mssc_solver::InitialSolution;
use mssc_solver::Instance;
use mssc_solver::OptimisationResult;
use mssc_solver::SearchParameters;
use mssc_solver::Solution;
use mssc_solver::Solver;
use mssc_solver::TieHandling;
use mssc_solver::WcssBound;

const BOUNDS: [WcssBound; 3] = [WcssBound::General, WcssBound::Cardinality, WcssBound::Flow];

fn solve(instance: Instance, bound: WcssBound, parameters: SearchParameters) -> Solution {
    let mut solver = Solver::new(instance, bound).expect("valid model");
    match solver.minimize(parameters).expect("valid parameters") {
        OptimisationResult::Optimal(solution) => solution,
        OptimisationResult::Unsatisfiable => {
            panic!("an instance with a complete cardinality vector is satisfiable")
        }
    }
}

/// Independent WCSS recomputation, written against the definition rather
/// than the solver's helper.
fn wcss_of(instance: &Instance, memberships: &[usize]) -> f64 {
    let k = instance.num_clusters();
    let n = instance.num_observations();
    let mut total = 0.0;
    for c in 0..k {
        let members: Vec<usize> = (0..n).filter(|&i| memberships[i] == c).collect();
        if members.is_empty() {
            continue;
        }
        let mut intra = 0.0;
        for (a, &i) in members.iter().enumerate() {
            for &j in members.iter().skip(a + 1) {
                intra += instance.dissimilarity(i, j);
            }
        }
        total += intra / members.len() as f64;
    }
    total
}

/// Minimal WCSS over every assignment matching the target cardinalities.
fn brute_force_optimum(instance: &Instance) -> f64 {
    let n = instance.num_observations();
    let k = instance.num_clusters();
    let targets = instance
        .target_cardinalities()
        .expect("brute force needs targets");

    let mut assignment = vec![0usize; n];
    let mut best = f64::INFINITY;
    loop {
        let mut cardinalities = vec![0usize; k];
        for &c in &assignment {
            cardinalities[c] += 1;
        }
        if cardinalities == targets {
            best = best.min(wcss_of(instance, &assignment));
        }

        // Odometer increment over the K^N assignments.
        let mut position = 0;
        while position < n {
            assignment[position] += 1;
            if assignment[position] == k {
                assignment[position] = 0;
                position += 1;
            } else {
                break;
            }
        }
        if position == n {
            return best;
        }
    }
}

#[test]
fn two_tight_pairs_are_separated() {
    let dissimilarities = vec![
        vec![0.0, 1.0, 9.0, 9.0],
        vec![1.0, 0.0, 9.0, 9.0],
        vec![9.0, 9.0, 0.0, 1.0],
        vec![9.0, 9.0, 1.0, 0.0],
    ];

    for bound in BOUNDS {
        let instance = Instance::new(dissimilarities.clone(), 2)
            .expect("valid instance")
            .with_target_cardinalities(vec![2, 2])
            .expect("valid targets");
        let solution = solve(instance, bound, SearchParameters::default());

        assert_eq!(solution.memberships(), &[0, 0, 1, 1], "bound {bound:?}");
        assert!(
            (solution.objective() - 1.0).abs() < 1e-6,
            "bound {bound:?} found {}",
            solution.objective()
        );
    }
}

#[test]
fn two_distant_equilateral_triangles_split_into_their_pairs() {
    let h = 3.0_f64.sqrt() / 2.0;
    let coordinates = vec![
        vec![0.0, 0.0],
        vec![1.0, 0.0],
        vec![0.5, h],
        vec![100.0, 0.0],
        vec![101.0, 0.0],
        vec![100.5, h],
    ];

    let instance = Instance::from_coordinates(coordinates, 3)
        .expect("valid instance")
        .with_target_cardinalities(vec![2, 2, 2])
        .expect("valid targets");
    let solution = solve(instance, WcssBound::Flow, SearchParameters::default());

    // Three within-triangle pairs at unit squared distance: V = 3 * 1/2.
    assert!((solution.objective() - 1.5).abs() < 1e-6);
}

#[test]
fn collinear_points_split_at_the_gap() {
    for bound in BOUNDS {
        let instance = Instance::from_coordinates(
            vec![vec![0.0], vec![1.0], vec![2.0], vec![10.0], vec![11.0]],
            2,
        )
        .expect("valid instance")
        .with_target_cardinalities(vec![3, 2])
        .expect("valid targets");
        let solution = solve(instance, bound, SearchParameters::default());

        assert_eq!(solution.memberships(), &[0, 0, 0, 1, 1], "bound {bound:?}");
        assert!((solution.objective() - 2.5).abs() < 1e-6, "bound {bound:?}");
    }
}

#[test]
fn reported_objective_matches_a_recomputation_from_the_memberships() {
    let instance = Instance::from_coordinates(
        vec![vec![0.0], vec![1.0], vec![2.0], vec![10.0], vec![11.0]],
        2,
    )
    .expect("valid instance")
    .with_target_cardinalities(vec![3, 2])
    .expect("valid targets");
    let reference = instance.clone();

    let solution = solve(instance, WcssBound::Flow, SearchParameters::default());
    let recomputed = wcss_of(&reference, solution.memberships());
    assert!((solution.objective() - recomputed).abs() < 1e-9);
}

#[test]
fn reseeding_with_the_optimum_finds_nothing_better() {
    let base = Instance::from_coordinates(
        vec![vec![0.0], vec![1.0], vec![2.0], vec![10.0], vec![11.0]],
        2,
    )
    .expect("valid instance")
    .with_target_cardinalities(vec![3, 2])
    .expect("valid targets");

    let first = solve(base.clone(), WcssBound::Flow, SearchParameters::default());

    let reseeded = base
        .with_memberships(first.memberships().to_vec())
        .expect("valid memberships");
    let parameters = SearchParameters {
        initial_solution: InitialSolution::MembershipsAsIndicated,
        ..SearchParameters::default()
    };
    let second = solve(reseeded, WcssBound::Flow, parameters);

    assert!((first.objective() - second.objective()).abs() < 1e-9);
}

#[test]
fn every_tie_breaking_heuristic_reaches_the_optimum() {
    let heuristics = [
        TieHandling::None,
        TieHandling::UnboundFarthestTotalSs,
        TieHandling::FixedFarthestDist,
        TieHandling::FixedMaxMin,
        TieHandling::FarthestPointFromBiggestCenter,
        TieHandling::MaxMinPointFromAllCenters,
    ];

    for tie_handling in heuristics {
        let instance = Instance::from_coordinates(
            vec![
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![10.0, 0.0],
                vec![11.0, 0.0],
                vec![10.0, 1.0],
            ],
            2,
        )
        .expect("valid instance")
        .with_target_cardinalities(vec![3, 3])
        .expect("valid targets");

        let parameters = SearchParameters {
            tie_handling,
            ..SearchParameters::default()
        };
        let solution = solve(instance, WcssBound::Cardinality, parameters);

        assert_eq!(
            solution.memberships(),
            &[0, 0, 0, 1, 1, 1],
            "tie handling {tie_handling:?}"
        );
    }
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }

    fn next_range(&mut self, max: u32) -> u32 {
        self.next_u32() % max
    }

    fn next_coordinate(&mut self) -> f64 {
        (self.next_u32() % 1000) as f64 / 100.0
    }
}

fn random_instance(rng: &mut Lcg) -> Instance {
    let n = 5 + rng.next_range(3) as usize;
    let k = 2 + rng.next_range(2) as usize;

    let coordinates: Vec<Vec<f64>> = (0..n)
        .map(|_| vec![rng.next_coordinate(), rng.next_coordinate()])
        .collect();

    // Random positive targets summing to n.
    let mut targets = vec![1usize; k];
    for _ in 0..(n - k) {
        let cluster = rng.next_range(k as u32) as usize;
        targets[cluster] += 1;
    }

    Instance::from_coordinates(coordinates, k)
        .expect("valid instance")
        .with_target_cardinalities(targets)
        .expect("valid targets")
}

#[test]
fn random_instances_match_brute_force_enumeration() {
    let mut rng = Lcg::new(42);

    for round in 0..10 {
        let instance = random_instance(&mut rng);
        let expected = brute_force_optimum(&instance);

        for bound in BOUNDS {
            let solution = solve(instance.clone(), bound, SearchParameters::default());
            assert!(
                (solution.objective() - expected).abs() < 1e-6,
                "round {round}, bound {bound:?}: solver found {}, brute force {expected}",
                solution.objective()
            );

            let cardinalities =
                solution.cardinalities(instance.num_clusters());
            assert_eq!(
                cardinalities.as_slice(),
                instance.target_cardinalities().expect("targets attached"),
                "round {round}, bound {bound:?}"
            );
        }
    }
}

#[test]
fn the_three_bounds_agree_on_the_optimum() {
    let mut rng = Lcg::new(7);

    for _ in 0..5 {
        let instance = random_instance(&mut rng);

        let objectives: Vec<f64> = BOUNDS
            .iter()
            .map(|&bound| {
                solve(instance.clone(), bound, SearchParameters::default()).objective()
            })
            .collect();

        assert!((objectives[0] - objectives[1]).abs() < 1e-6);
        assert!((objectives[1] - objectives[2]).abs() < 1e-6);
    }
}
