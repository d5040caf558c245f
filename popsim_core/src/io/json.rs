//! Module providing JSON IO for simulation descriptions and trajectories
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::network::model::NetworkDefinition;
use crate::simulate::ensemble::{Simulation, SimulationSettingsBuilder};
use crate::simulate::{Algorithm, SimulationError, Trajectory};

// region JSON Description
/// Represents a JSON simulation description, a model plus the settings to run it with
#[derive(Serialize, Deserialize, Debug)]
struct JsonDescription {
    model: JsonModel,
    simulation: JsonSimulation,
}

#[derive(Serialize, Deserialize, Debug)]
struct JsonModel {
    species: Vec<String>,
    #[serde(default)]
    parameters: IndexMap<String, f64>,
    /// Single named parameter scaling the rates, e.g. `{"N": 100}`
    system_size: Option<IndexMap<String, f64>>,
    reactions: Vec<String>,
    rate_functions: Vec<String>,
    initial_conditions: IndexMap<String, f64>,
}

#[derive(Serialize, Deserialize, Debug)]
struct JsonSimulation {
    /// Kept as a raw value so a non-numeric horizon is reported as such
    t_max: Value,
    algorithm: Option<String>,
    iterations: Option<i64>,
    processes: Option<i64>,
    seed: Option<u64>,
}
// endregion JSON Description

// region Conversions
impl JsonModel {
    fn into_definition(self) -> Result<(NetworkDefinition, IndexMap<String, f64>), SimulationError> {
        let mut parameters = self.parameters;
        if let Some(system_size) = self.system_size {
            if system_size.len() != 1 {
                return Err(SimulationError::Input(format!(
                    "System size must hold exactly one entry, found {}",
                    system_size.len()
                )));
            }
            for (name, value) in system_size {
                if parameters.contains_key(&name) {
                    return Err(SimulationError::Input(format!(
                        "System size `{}` is also declared as a parameter",
                        name
                    )));
                }
                parameters.insert(name, value);
            }
        }
        let definition = NetworkDefinition {
            species: self.species,
            parameters,
            reactions: self.reactions,
            rate_functions: self.rate_functions,
        };
        Ok((definition, self.initial_conditions))
    }
}

impl JsonSimulation {
    fn settings_builder(&self) -> Result<SimulationSettingsBuilder, SimulationError> {
        let t_max = match self.t_max.as_f64() {
            Some(t_max) if t_max > 0.0 => t_max,
            Some(t_max) => {
                return Err(SimulationError::Input(format!(
                    "Maximum simulation time must be positive, found {}",
                    t_max
                )))
            }
            None => {
                return Err(SimulationError::Input(format!(
                    "Maximum simulation time must be a number, found {}",
                    self.t_max
                )))
            }
        };
        let mut builder = SimulationSettingsBuilder::default();
        builder.t_max(t_max).seed(self.seed);
        if let Some(name) = &self.algorithm {
            builder.algorithm(name.parse::<Algorithm>()?);
        }
        // Fewer than one iteration means one, fewer than one process means the default pool
        if let Some(iterations) = self.iterations {
            builder.iterations(iterations.max(1) as usize);
        }
        if let Some(processes) = self.processes {
            builder.processes(processes.max(0) as usize);
        }
        Ok(builder)
    }
}
// endregion Conversions

/// Read a simulation description from a JSON file
///
/// # Parameters
/// - `path`: Path to the JSON description
///
/// # Returns
/// The [`Simulation`], with its network compiled and its inputs validated
pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Simulation, JsonError> {
    let description = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) => return Err(JsonError::UnableToRead(format!("{:?}", err))),
    };
    from_json_str(&description)
}

/// Build a simulation from a JSON description held in a string
pub fn from_json_str(description: &str) -> Result<Simulation, JsonError> {
    let json = match serde_json::from_str::<JsonDescription>(description) {
        Ok(json) => json,
        Err(err) => return Err(JsonError::UnableToParse(format!("{}", err))),
    };
    let settings = json
        .simulation
        .settings_builder()?
        .build()
        .map_err(|err| SimulationError::Input(err.to_string()))?;
    let (definition, initial_conditions) = json.model.into_definition()?;
    Ok(Simulation::new(&definition, &initial_conditions, settings)?)
}

/// Write the trajectories of an ensemble to a JSON file, as a list with one entry per trial
pub fn write_json<P: AsRef<Path>>(path: P, trajectories: &[Trajectory]) -> Result<(), JsonError> {
    let data = serde_json::to_string(trajectories)?;
    fs::write(path, data)?;
    Ok(())
}

#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Unable to read file due to {0}")]
    UnableToRead(String),
    #[error("Unable to parse json due to {0}")]
    UnableToParse(String),
    #[error("Invalid simulation description: {0}")]
    Simulation(#[from] SimulationError),
    #[error("Serde json error")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Unable to write to file")]
    UnableToWrite(#[from] std::io::Error),
}
