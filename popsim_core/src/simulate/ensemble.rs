//! Ensembles of independent trials over one shared network
use std::sync::Arc;

use derive_builder::Builder;
use indexmap::IndexMap;
use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::configuration::{
    default_algorithm, default_iterations, default_processes, default_uniform_floor,
};
use crate::network::model::{NetworkDefinition, ReactionNetwork};
use crate::simulate::{run_trial, validate_inputs, Algorithm, SimulationError, Trajectory};

/// How an ensemble is run
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct SimulationSettings {
    /// Simulation horizon
    pub t_max: f64,
    #[builder(default = "default_algorithm()")]
    pub algorithm: Algorithm,
    /// Number of independent trials
    #[builder(default = "default_iterations()")]
    pub iterations: usize,
    /// Worker threads, 0 uses the rayon global pool
    #[builder(default = "default_processes()")]
    pub processes: usize,
    /// Base seed of the ensemble, drawn at random when not given
    #[builder(default = "None")]
    pub seed: Option<u64>,
    #[builder(default = "default_uniform_floor()")]
    pub uniform_floor: f64,
}

impl SimulationSettingsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(t_max) = self.t_max {
            if !(t_max.is_finite() && t_max > 0.0) {
                return Err(format!("t_max must be a positive number, found {}", t_max));
            }
        }
        if let Some(0) = self.iterations {
            return Err("iterations must be at least 1".to_string());
        }
        if let Some(floor) = self.uniform_floor {
            if !(floor > 0.0 && floor < 1.0) {
                return Err(format!("uniform_floor must lie in (0, 1), found {}", floor));
            }
        }
        Ok(())
    }
}

/// A compiled network, its initial population, and the settings to simulate it with
#[derive(Debug, Clone)]
pub struct Simulation {
    network: Arc<ReactionNetwork>,
    initial_population: Vec<f64>,
    settings: SimulationSettings,
}

impl Simulation {
    /// Compile `definition` and pair it with its initial conditions
    ///
    /// # Parameters
    /// - `definition`: The network description
    /// - `initial_conditions`: Map of species names to their population at time 0, every species
    ///   needs exactly one entry
    /// - `settings`: How to run the ensemble
    ///
    /// # Examples
    /// ```rust
    /// use indexmap::IndexMap;
    /// use popsim_core::network::model::NetworkDefinitionBuilder;
    /// use popsim_core::simulate::ensemble::{Simulation, SimulationSettingsBuilder};
    /// let definition = NetworkDefinitionBuilder::default()
    ///     .species(vec!["A".to_string(), "B".to_string()])
    ///     .reactions(vec!["A => B".to_string()])
    ///     .rate_functions(vec!["A".to_string()])
    ///     .build()
    ///     .unwrap();
    /// let initial = IndexMap::from([("A".to_string(), 10.0), ("B".to_string(), 0.0)]);
    /// let settings = SimulationSettingsBuilder::default()
    ///     .t_max(5.0)
    ///     .iterations(3usize)
    ///     .seed(Some(1))
    ///     .build()
    ///     .unwrap();
    /// let trajectories = Simulation::new(&definition, &initial, settings)
    ///     .unwrap()
    ///     .run()
    ///     .unwrap();
    /// assert_eq!(trajectories.len(), 3);
    /// ```
    pub fn new(
        definition: &NetworkDefinition,
        initial_conditions: &IndexMap<String, f64>,
        settings: SimulationSettings,
    ) -> Result<Simulation, SimulationError> {
        let network = Arc::new(definition.compile()?);
        Simulation::from_network(network, initial_conditions, settings)
    }

    /// Pair an already compiled network with its initial conditions
    pub fn from_network(
        network: Arc<ReactionNetwork>,
        initial_conditions: &IndexMap<String, f64>,
        settings: SimulationSettings,
    ) -> Result<Simulation, SimulationError> {
        if initial_conditions.len() != network.num_species() {
            return Err(SimulationError::Input(format!(
                "There must be exactly one initial condition per species, found {} for {} species",
                initial_conditions.len(),
                network.num_species()
            )));
        }
        let mut initial_population = vec![0f64; network.num_species()];
        for (name, value) in initial_conditions {
            match network.species_position(name) {
                Some(position) => initial_population[position] = *value,
                None => {
                    return Err(SimulationError::Input(format!(
                        "Initial condition given for `{}`, which is not a species",
                        name
                    )))
                }
            }
        }
        validate_inputs(&network, &initial_population, settings.t_max)?;
        validate_settings(&settings)?;
        Ok(Simulation {
            network,
            initial_population,
            settings,
        })
    }

    /// Replace the settings, keeping the network and initial population
    pub fn with_settings(self, settings: SimulationSettings) -> Result<Simulation, SimulationError> {
        validate_inputs(&self.network, &self.initial_population, settings.t_max)?;
        validate_settings(&settings)?;
        Ok(Simulation { settings, ..self })
    }

    pub fn network(&self) -> &Arc<ReactionNetwork> {
        &self.network
    }

    /// Population at time 0, in species order
    pub fn initial_population(&self) -> &[f64] {
        &self.initial_population
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Run a single trial with the given random number generator
    pub fn run_trial<R: Rng>(&self, rng: &mut R) -> Trajectory {
        run_trial(
            &self.network,
            &self.initial_population,
            self.settings.t_max,
            self.settings.algorithm,
            self.settings.uniform_floor,
            rng,
        )
    }

    /// Run every trial of the ensemble in parallel
    ///
    /// Trial `i` draws from a [`ChaCha8Rng`] seeded with [`derive_seed`]`(seed, i)`, so a fixed
    /// seed reproduces the same trajectories whatever the thread count.
    pub fn run(&self) -> Result<Vec<Trajectory>, SimulationError> {
        let seed = self.settings.seed.unwrap_or_else(rand::random);
        info!(
            "Running {} trial(s) of {} to t = {} with seed {}",
            self.settings.iterations, self.settings.algorithm, self.settings.t_max, seed
        );
        let trial = |index: usize| {
            let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(seed, index as u64));
            self.run_trial(&mut rng)
        };
        let run_all = || {
            (0..self.settings.iterations)
                .into_par_iter()
                .map(trial)
                .collect::<Vec<_>>()
        };
        let trajectories = match self.settings.processes {
            0 => run_all(),
            threads => ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|err| SimulationError::ThreadPool(err.to_string()))?
                .install(run_all),
        };
        info!(
            "Finished {} trial(s), {} events in total",
            trajectories.len(),
            trajectories.iter().map(Trajectory::events).sum::<usize>()
        );
        Ok(trajectories)
    }
}

fn validate_settings(settings: &SimulationSettings) -> Result<(), SimulationError> {
    if settings.iterations == 0 {
        return Err(SimulationError::Input(
            "iterations must be at least 1".to_string(),
        ));
    }
    if !(settings.uniform_floor > 0.0 && settings.uniform_floor < 1.0) {
        return Err(SimulationError::Input(format!(
            "uniform_floor must lie in (0, 1), found {}",
            settings.uniform_floor
        )));
    }
    Ok(())
}

/// Seed of trial `index` in an ensemble seeded with `base` (SplitMix64 finalizer)
pub fn derive_seed(base: u64, index: u64) -> u64 {
    let mut z = base.wrapping_add(index.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::model::NetworkDefinitionBuilder;

    fn conversion() -> NetworkDefinition {
        NetworkDefinitionBuilder::default()
            .species(vec!["A".to_string(), "B".to_string()])
            .parameters(IndexMap::from([("k".to_string(), 1.0)]))
            .reactions(vec!["A => B".to_string()])
            .rate_functions(vec!["k * A".to_string()])
            .build()
            .unwrap()
    }

    fn initial() -> IndexMap<String, f64> {
        IndexMap::from([("B".to_string(), 0.0), ("A".to_string(), 10.0)])
    }

    fn settings(algorithm: Algorithm, processes: usize) -> SimulationSettings {
        SimulationSettingsBuilder::default()
            .t_max(5.0)
            .algorithm(algorithm)
            .iterations(8usize)
            .processes(processes)
            .seed(Some(99))
            .build()
            .unwrap()
    }

    #[test]
    fn settings_defaults_and_validation() {
        let settings = SimulationSettingsBuilder::default().t_max(1.0).build().unwrap();
        assert_eq!(settings.algorithm, Algorithm::Ssa);
        assert_eq!(settings.iterations, 1);
        assert_eq!(settings.processes, 0);
        assert_eq!(settings.seed, None);
        assert_eq!(settings.uniform_floor, 1e-12);

        assert!(SimulationSettingsBuilder::default().build().is_err());
        assert!(SimulationSettingsBuilder::default().t_max(-1.0).build().is_err());
        assert!(SimulationSettingsBuilder::default()
            .t_max(1.0)
            .iterations(0usize)
            .build()
            .is_err());
    }

    #[test]
    fn initial_conditions_are_reordered() {
        let simulation =
            Simulation::new(&conversion(), &initial(), settings(Algorithm::Ssa, 0)).unwrap();
        assert_eq!(simulation.initial_population(), &[10.0, 0.0]);
        assert_eq!(simulation.network().num_reactions(), 1);
    }

    #[test]
    fn initial_conditions_are_validated() {
        let missing = IndexMap::from([("A".to_string(), 10.0)]);
        match Simulation::new(&conversion(), &missing, settings(Algorithm::Ssa, 0)) {
            Err(SimulationError::Input(msg)) => assert!(msg.contains("one initial condition")),
            _ => panic!("Missing initial condition should fail"),
        }
        let unknown = IndexMap::from([("A".to_string(), 10.0), ("C".to_string(), 0.0)]);
        match Simulation::new(&conversion(), &unknown, settings(Algorithm::Ssa, 0)) {
            Err(SimulationError::Input(msg)) => assert!(msg.contains("`C`")),
            _ => panic!("Unknown species should fail"),
        }
    }

    #[test]
    fn network_errors_propagate() {
        let mut definition = conversion();
        definition.rate_functions = vec![];
        assert!(matches!(
            Simulation::new(&definition, &initial(), settings(Algorithm::Ssa, 0)),
            Err(SimulationError::Network(_))
        ));
    }

    #[test]
    fn seeded_ensembles_are_reproducible() {
        for algorithm in [Algorithm::Ssa, Algorithm::Nrm] {
            let global = Simulation::new(&conversion(), &initial(), settings(algorithm, 0))
                .unwrap()
                .run()
                .unwrap();
            let pooled = Simulation::new(&conversion(), &initial(), settings(algorithm, 2))
                .unwrap()
                .run()
                .unwrap();
            assert_eq!(global.len(), 8);
            assert_eq!(global, pooled);
            // Trials draw from different streams
            assert_ne!(global[0], global[1]);
            for trajectory in &global {
                assert_eq!(trajectory.first().unwrap().population, vec![10.0, 0.0]);
                assert!(trajectory
                    .iter()
                    .all(|s| s.population[0] + s.population[1] == 10.0));
            }
        }
    }

    #[test]
    fn replace_settings() {
        let simulation =
            Simulation::new(&conversion(), &initial(), settings(Algorithm::Ssa, 0)).unwrap();
        let mut changed = simulation.settings().clone();
        changed.iterations = 2;
        changed.algorithm = Algorithm::Nrm;
        let simulation = simulation.with_settings(changed).unwrap();
        assert_eq!(simulation.settings().algorithm, Algorithm::Nrm);
        assert_eq!(simulation.run().unwrap().len(), 2);

        let mut invalid = simulation.settings().clone();
        invalid.iterations = 0;
        assert!(matches!(
            simulation.with_settings(invalid),
            Err(SimulationError::Input(_))
        ));
    }

    #[test]
    fn derived_seeds_differ() {
        assert_ne!(derive_seed(0, 0), derive_seed(0, 1));
        assert_ne!(derive_seed(1, 0), derive_seed(0, 0));
        assert_eq!(derive_seed(5, 3), derive_seed(5, 3));
    }
}
