//! Exact stochastic simulation of a [`ReactionNetwork`]
//!
//! Two engines produce statistically equivalent trajectories:
//! - [`ssa::DirectMethod`], Gillespie's direct method, recomputing every propensity per event
//! - [`nrm::NextReactionMethod`], Gibson and Bruck's next reaction method, which keeps one
//!   putative firing time per reaction in an [`ipq::IndexedPriorityQueue`] and only refreshes
//!   the reactions a firing can influence
//!
//! [`ensemble::Simulation`] runs many independent trials of either engine in parallel.
pub mod ensemble;
pub mod ipq;
pub mod nrm;
pub mod ssa;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::configuration::default_uniform_floor;
use crate::network::model::ReactionNetwork;
use crate::network::NetworkError;

/// Errors raised while setting up or running a simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Input error: {0}")]
    Input(String),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("Unable to build thread pool: {0}")]
    ThreadPool(String),
}

// region Algorithm
/// Simulation algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// Gillespie's direct method
    Ssa,
    /// Gibson and Bruck's next reaction method
    Nrm,
}

/// Names of methods which are recognized, but which no engine implements
const UNIMPLEMENTED: [&str; 5] = [
    "fluid approximation",
    "fluid limit",
    "mean field",
    "ode",
    "tau-leaping",
];

impl FromStr for Algorithm {
    type Err = SimulationError;

    /// Parse an algorithm name, case insensitive
    ///
    /// # Examples
    /// ```rust
    /// use popsim_core::simulate::Algorithm;
    /// assert_eq!("Gillespie".parse::<Algorithm>().unwrap(), Algorithm::Ssa);
    /// assert_eq!("gibson-bruck".parse::<Algorithm>().unwrap(), Algorithm::Nrm);
    /// assert!("tau-leaping".parse::<Algorithm>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        match name.as_str() {
            "ssa" | "gillespie" | "direct" | "direct method" => Ok(Algorithm::Ssa),
            "nrm" | "next reaction method" | "gibson bruck" | "gibson-bruck" => Ok(Algorithm::Nrm),
            other if UNIMPLEMENTED.contains(&other) => Err(SimulationError::Input(format!(
                "The algorithm `{}` is not implemented",
                s.trim()
            ))),
            _ => Err(SimulationError::Input(format!(
                "Unknown algorithm `{}`, expected one of ssa, gillespie, nrm, next reaction method, gibson bruck",
                s.trim()
            ))),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Ssa => write!(f, "ssa"),
            Algorithm::Nrm => write!(f, "nrm"),
        }
    }
}
// endregion Algorithm

// region Trajectory
/// Population of every species at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub population: Vec<f64>,
}

/// Why a trial stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Termination {
    /// Time reached the horizon
    #[default]
    Horizon,
    /// No reaction can fire any more
    Absorbed,
}

/// Output of a single trial: the population after every event, starting with the initial
/// population at time 0
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trajectory {
    pub samples: Vec<Sample>,
    pub termination: Termination,
}

impl Trajectory {
    pub fn new() -> Self {
        Trajectory::default()
    }

    pub fn push(&mut self, time: f64, population: Vec<f64>) {
        self.samples.push(Sample { time, population });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Sample times in order
    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    /// Population of the species at `position` through time
    pub fn species(&self, position: usize) -> Vec<f64> {
        self.samples.iter().map(|s| s.population[position]).collect()
    }

    /// Number of reaction events recorded
    pub fn events(&self) -> usize {
        self.samples.len().saturating_sub(1)
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
// endregion Trajectory

/// Progress of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Built, no event drawn yet
    Ready,
    Running,
    Done(Termination),
}

/// Draw a uniform number from `[floor, 1)`
#[inline]
pub(crate) fn uniform<R: Rng>(rng: &mut R, floor: f64) -> f64 {
    rng.random::<f64>().max(floor)
}

/// Check an initial population and horizon against a network
pub(crate) fn validate_inputs(
    network: &ReactionNetwork,
    initial_population: &[f64],
    t_max: f64,
) -> Result<(), SimulationError> {
    if initial_population.len() != network.num_species() {
        return Err(SimulationError::Input(format!(
            "Initial population has {} entries but the network has {} species",
            initial_population.len(),
            network.num_species()
        )));
    }
    if !(t_max.is_finite() && t_max > 0.0) {
        return Err(SimulationError::Input(format!(
            "Maximum time must be a positive number, found {}",
            t_max
        )));
    }
    Ok(())
}

/// Run one trial without validating the inputs
pub(crate) fn run_trial<R: Rng>(
    network: &ReactionNetwork,
    initial_population: &[f64],
    t_max: f64,
    algorithm: Algorithm,
    uniform_floor: f64,
    rng: &mut R,
) -> Trajectory {
    match algorithm {
        Algorithm::Ssa => {
            ssa::DirectMethod::new(network, initial_population, t_max, uniform_floor).run(rng)
        }
        Algorithm::Nrm => {
            nrm::NextReactionMethod::new(network, initial_population, t_max, uniform_floor, rng)
                .run(rng)
        }
    }
}

/// Simulate a single trajectory of `network` from `initial_population` until `t_max`
///
/// # Parameters
/// - `network`: The compiled reaction network
/// - `initial_population`: Population of each species at time 0, in declaration order
/// - `t_max`: Simulation horizon, must be positive
/// - `algorithm`: Engine to use
/// - `rng`: Source of randomness
///
/// # Returns
/// The trajectory, or an input error if the population doesn't match the species, or the
/// horizon isn't positive
pub fn simulate<R: Rng>(
    network: &ReactionNetwork,
    initial_population: &[f64],
    t_max: f64,
    algorithm: Algorithm,
    rng: &mut R,
) -> Result<Trajectory, SimulationError> {
    validate_inputs(network, initial_population, t_max)?;
    Ok(run_trial(
        network,
        initial_population,
        t_max,
        algorithm,
        default_uniform_floor(),
        rng,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn decay() -> ReactionNetwork {
        ReactionNetwork::build(&["x_a"], &IndexMap::new(), &["x_a =>"], &["0.5 * x_a"]).unwrap()
    }

    #[test]
    fn parse_algorithm_names() {
        for name in ["ssa", "SSA", "gillespie", "direct", " Direct Method "] {
            assert_eq!(name.parse::<Algorithm>().unwrap(), Algorithm::Ssa);
        }
        for name in ["nrm", "next reaction method", "Gibson Bruck", "gibson-bruck"] {
            assert_eq!(name.parse::<Algorithm>().unwrap(), Algorithm::Nrm);
        }
        match "ode".parse::<Algorithm>() {
            Err(SimulationError::Input(msg)) => assert!(msg.contains("not implemented")),
            other => panic!("Expected an input error, found {:?}", other),
        }
        match "monte carlo".parse::<Algorithm>() {
            Err(SimulationError::Input(msg)) => assert!(msg.contains("Unknown algorithm")),
            other => panic!("Expected an input error, found {:?}", other),
        }
    }

    #[test]
    fn simulate_rejects_bad_inputs() {
        let network = decay();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            simulate(&network, &[1.0, 2.0], 1.0, Algorithm::Ssa, &mut rng),
            Err(SimulationError::Input(_))
        ));
        assert!(matches!(
            simulate(&network, &[1.0], 0.0, Algorithm::Nrm, &mut rng),
            Err(SimulationError::Input(_))
        ));
        assert!(matches!(
            simulate(&network, &[1.0], f64::NAN, Algorithm::Nrm, &mut rng),
            Err(SimulationError::Input(_))
        ));
    }

    #[test]
    fn decay_runs_to_absorption() {
        let network = decay();
        for algorithm in [Algorithm::Ssa, Algorithm::Nrm] {
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            let trajectory = simulate(&network, &[20.0], 1e6, algorithm, &mut rng).unwrap();
            assert_eq!(trajectory.termination, Termination::Absorbed);
            assert_eq!(trajectory.first().unwrap().time, 0.0);
            assert_eq!(trajectory.first().unwrap().population, vec![20.0]);
            assert_eq!(trajectory.last().unwrap().population, vec![0.0]);
            assert_eq!(trajectory.events(), 20);
            assert_eq!(trajectory.species(0)[..3], [20.0, 19.0, 18.0]);
        }
    }

    #[test]
    fn trajectory_serializes_as_records() {
        let mut trajectory = Trajectory::new();
        trajectory.push(0.0, vec![1.0, 2.0]);
        trajectory.push(0.5, vec![0.0, 3.0]);
        let json = serde_json::to_value(&trajectory).unwrap();
        assert_eq!(json["samples"][1]["time"], 0.5);
        assert_eq!(json["samples"][1]["population"][1], 3.0);
        assert_eq!(json["termination"], "Horizon");
        assert_eq!(trajectory.times(), vec![0.0, 0.5]);
        assert_eq!((&trajectory).into_iter().count(), 2);
    }
}
