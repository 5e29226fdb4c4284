//! Command-line driver: read an instance file, run the solve, report the
//! optimal clustering.
//!
//! The instance format is whitespace-separated text:
//! - a header line `N S K`;
//! - `N` lines of `S` coordinates each;
//! - one line of `K` target cardinalities (summing to `N`);
//! - optionally one line of `N` initial memberships in `0..K`.
//!
//! Dissimilarities are the squared Euclidean distances between the
//! coordinate rows.

mod result;

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use clap::ValueEnum;
use log::info;
use log::LevelFilter;
use mssc_solver::InitialSolution;
use mssc_solver::Instance;
use mssc_solver::OptimisationResult;
use mssc_solver::SearchParameters;
use mssc_solver::Solver;
use mssc_solver::TieHandling;
use mssc_solver::WcssBound;
use result::CliError;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BoundArg {
    /// General WCSS bound plus a distribute constraint on the cardinalities.
    General,
    /// WCSS bound with internal cardinality control.
    Cardinality,
    /// WCSS bound through a minimum-cost flow.
    Flow,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum InitialSolutionArg {
    #[default]
    None,
    Greedy,
    Memberships,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum TieHandlingArg {
    #[default]
    None,
    UnboundFarthestTotalSs,
    FixedFarthestDist,
    FixedMaxMin,
    FarthestFromBiggestCenter,
    MaxMinFromAllCenters,
}

#[derive(Debug, Parser)]
#[command(version, about = "Exact cardinality-constrained minimum sum-of-squares clustering")]
struct Args {
    /// The instance file to solve.
    instance: PathBuf,

    /// Which WCSS lower bound to post.
    #[arg(long, value_enum, default_value_t = BoundArg::Flow)]
    bound: BoundArg,

    /// How to steer the search towards a first solution.
    #[arg(long, value_enum, default_value_t)]
    initial_solution: InitialSolutionArg,

    /// How to break ties when an empty cluster must be opened.
    #[arg(long, value_enum, default_value_t)]
    tie_handling: TieHandlingArg,

    /// Log improving solutions and search statistics.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::new()
        .format_target(false)
        .format_timestamp(None)
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    if let Err(error) = run(args) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let instance = parse_instance(&args.instance)?;
    info!(
        "{} observations, {} clusters",
        instance.num_observations(),
        instance.num_clusters()
    );

    let parameters = SearchParameters {
        initial_solution: match args.initial_solution {
            InitialSolutionArg::None => InitialSolution::None,
            InitialSolutionArg::Greedy => InitialSolution::GreedyInit,
            InitialSolutionArg::Memberships => InitialSolution::MembershipsAsIndicated,
        },
        tie_handling: match args.tie_handling {
            TieHandlingArg::None => TieHandling::None,
            TieHandlingArg::UnboundFarthestTotalSs => TieHandling::UnboundFarthestTotalSs,
            TieHandlingArg::FixedFarthestDist => TieHandling::FixedFarthestDist,
            TieHandlingArg::FixedMaxMin => TieHandling::FixedMaxMin,
            TieHandlingArg::FarthestFromBiggestCenter => {
                TieHandling::FarthestPointFromBiggestCenter
            }
            TieHandlingArg::MaxMinFromAllCenters => TieHandling::MaxMinPointFromAllCenters,
        },
        ..SearchParameters::default()
    };
    let bound = match args.bound {
        BoundArg::General => WcssBound::General,
        BoundArg::Cardinality => WcssBound::Cardinality,
        BoundArg::Flow => WcssBound::Flow,
    };

    let num_clusters = instance.num_clusters();
    let mut solver = Solver::new(instance, bound)?;

    // Report every improving solution as the search finds it; the final
    // summary below only restates the last one.
    solver.with_solution_callback(move |solution| {
        println!("V = {}", solution.objective());
        println!("  memberships:");
        for chunk in solution.memberships().chunks(24) {
            println!("    {}", format_row(chunk));
        }
        println!(
            "  cardinalities: {}",
            format_row(&solution.cardinalities(num_clusters))
        );
        println!();
    });

    let result = solver.minimize(parameters)?;
    match result {
        OptimisationResult::Optimal(solution) => {
            println!("done, optimal V = {}", solution.objective());
        }
        OptimisationResult::Unsatisfiable => println!("unsatisfiable"),
    }

    let statistics = solver.statistics();
    info!(
        "{} decisions, {} conflicts, {} propagations",
        statistics.num_decisions, statistics.num_conflicts, statistics.num_propagations
    );

    Ok(())
}

fn format_row(values: &[usize]) -> String {
    values
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn next_parsed<'a, T: std::str::FromStr>(
    tokens: &mut impl Iterator<Item = &'a str>,
    what: &'static str,
) -> Result<T, CliError> {
    let token = tokens.next().ok_or(CliError::UnexpectedEnd(what))?;
    token
        .parse()
        .map_err(|_| CliError::MalformedToken(what, token.to_string()))
}

fn parse_instance(path: &PathBuf) -> Result<Instance, CliError> {
    let content = fs::read_to_string(path)?;
    let mut tokens = content.split_whitespace();

    let n: usize = next_parsed(&mut tokens, "observation count")?;
    let s: usize = next_parsed(&mut tokens, "feature count")?;
    let k: usize = next_parsed(&mut tokens, "cluster count")?;

    let mut coordinates = Vec::with_capacity(n);
    for _ in 0..n {
        let mut row = Vec::with_capacity(s);
        for _ in 0..s {
            row.push(next_parsed(&mut tokens, "coordinate")?);
        }
        coordinates.push(row);
    }

    let mut targets = Vec::with_capacity(k);
    for _ in 0..k {
        targets.push(next_parsed(&mut tokens, "target cardinality")?);
    }

    let mut instance =
        Instance::from_coordinates(coordinates, k)?.with_target_cardinalities(targets)?;

    // The membership row is optional.
    let remaining: Vec<&str> = tokens.collect();
    if !remaining.is_empty() {
        if remaining.len() != n {
            return Err(CliError::MembershipRowLength {
                expected: n,
                found: remaining.len(),
            });
        }
        let mut memberships = Vec::with_capacity(n);
        for token in remaining {
            let value: usize = token
                .parse()
                .map_err(|_| CliError::MalformedToken("membership", token.to_string()))?;
            memberships.push(value);
        }
        instance = instance.with_memberships(memberships)?;
    }

    Ok(instance)
}
