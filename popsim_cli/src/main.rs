//! popsim - Entry point
//!
//! Runs an ensemble of stochastic simulations from a JSON description.
//!
//! CLI Usage:
//!   popsim model.json                     # Run with the settings in the file
//!   popsim model.json -s 42 -n 100        # Override the seed and the number of trials
//!   popsim model.json -o trajectories.json

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use log::info;
use popsim_core::io::json::{read_json, write_json};
use popsim_core::simulate::Trajectory;

const USAGE: &str = "\
Usage: popsim <description.json> [options]

Options:
  -o, --output FILE      Write the trajectories to FILE as JSON
  -s, --seed N           Base seed of the ensemble
  -n, --iterations N     Number of independent trials
  -h, --help             Print this message";

struct Args {
    description: PathBuf,
    output: Option<PathBuf>,
    seed: Option<u64>,
    iterations: Option<usize>,
}

/// Parse CLI arguments, `None` when help was requested
fn parse_args() -> Result<Option<Args>> {
    let args: Vec<String> = std::env::args().collect();
    let mut description = None;
    let mut output = None;
    let mut seed = None;
    let mut iterations = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => return Ok(None),
            "-o" | "--output" => {
                i += 1;
                let value = args.get(i).context("--output needs a file name")?;
                output = Some(PathBuf::from(value));
            }
            "-s" | "--seed" => {
                i += 1;
                let value = args.get(i).context("--seed needs a value")?;
                seed = Some(
                    value
                        .parse()
                        .with_context(|| format!("Invalid seed `{}`", value))?,
                );
            }
            "-n" | "--iterations" => {
                i += 1;
                let value = args.get(i).context("--iterations needs a value")?;
                let n: usize = value
                    .parse()
                    .with_context(|| format!("Invalid number of iterations `{}`", value))?;
                iterations = Some(n.max(1));
            }
            other if other.starts_with('-') => bail!("Unknown option `{}`\n\n{}", other, USAGE),
            other => {
                if description.is_some() {
                    bail!("Only one description file can be given\n\n{}", USAGE);
                }
                description = Some(PathBuf::from(other));
            }
        }
        i += 1;
    }

    match description {
        Some(description) => Ok(Some(Args {
            description,
            output,
            seed,
            iterations,
        })),
        None => bail!("Missing description file\n\n{}", USAGE),
    }
}

fn print_summary(trajectories: &[Trajectory], species: &[&str]) {
    println!("trial  events  final time  termination  final population");
    for (trial, trajectory) in trajectories.iter().enumerate() {
        let Some(last) = trajectory.last() else {
            continue;
        };
        let population = species
            .iter()
            .zip(&last.population)
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "{:5}  {:6}  {:10.4}  {:11}  {}",
            trial,
            trajectory.events(),
            last.time,
            format!("{:?}", trajectory.termination),
            population
        );
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let Some(args) = parse_args()? else {
        println!("{}", USAGE);
        return Ok(());
    };

    let mut simulation = read_json(&args.description)
        .with_context(|| format!("Unable to load {}", args.description.display()))?;
    if args.seed.is_some() || args.iterations.is_some() {
        let mut settings = simulation.settings().clone();
        if let Some(seed) = args.seed {
            settings.seed = Some(seed);
        }
        if let Some(iterations) = args.iterations {
            settings.iterations = iterations;
        }
        simulation = simulation.with_settings(settings)?;
    }
    info!(
        "Loaded {} species and {} reactions from {}",
        simulation.network().num_species(),
        simulation.network().num_reactions(),
        args.description.display()
    );

    let start_time = Instant::now();
    let trajectories = simulation.run()?;
    info!("Simulation finished in {:.2?}", start_time.elapsed());

    let species: Vec<&str> = simulation
        .network()
        .species()
        .keys()
        .map(String::as_str)
        .collect();
    print_summary(&trajectories, &species);

    if let Some(output) = args.output {
        write_json(&output, &trajectories)
            .with_context(|| format!("Unable to write {}", output.display()))?;
        println!("Wrote {} trajectories to {}", trajectories.len(), output.display());
    }

    Ok(())
}
