//! Process-wide defaults used when a simulation doesn't set a value explicitly
use std::sync::{LazyLock, RwLock};

use crate::simulate::Algorithm;

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

pub struct Configuration {
    /// Algorithm used when none is named
    pub algorithm: Algorithm,
    /// Number of independent trials in an ensemble
    pub iterations: usize,
    /// Worker threads for an ensemble, 0 uses the rayon global pool
    pub processes: usize,
    /// Lower clamp of the uniform draws, keeps `ln(u)` and `1/u` finite
    pub uniform_floor: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            algorithm: Algorithm::Ssa,
            iterations: 1,
            processes: 0,
            uniform_floor: 1e-12,
        }
    }
}

// A poisoned lock still holds valid defaults
pub(crate) fn default_algorithm() -> Algorithm {
    match CONFIGURATION.read() {
        Ok(config) => config.algorithm,
        Err(poisoned) => poisoned.into_inner().algorithm,
    }
}

pub(crate) fn default_iterations() -> usize {
    match CONFIGURATION.read() {
        Ok(config) => config.iterations,
        Err(poisoned) => poisoned.into_inner().iterations,
    }
}

pub(crate) fn default_processes() -> usize {
    match CONFIGURATION.read() {
        Ok(config) => config.processes,
        Err(poisoned) => poisoned.into_inner().processes,
    }
}

pub(crate) fn default_uniform_floor() -> f64 {
    match CONFIGURATION.read() {
        Ok(config) => config.uniform_floor,
        Err(poisoned) => poisoned.into_inner().uniform_floor,
    }
}
