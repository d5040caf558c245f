use indexmap::IndexMap;
use popsim_core::network::model::NetworkDefinition;
use popsim_core::simulate::ensemble::{Simulation, SimulationSettingsBuilder};
use popsim_core::simulate::{Algorithm, SimulationError};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

fn to_py_err(err: SimulationError) -> PyErr {
    match err {
        SimulationError::ThreadPool(msg) => PyRuntimeError::new_err(msg),
        other => PyValueError::new_err(other.to_string()),
    }
}

/// Simulate a reaction network, returning one `(times, populations)` pair per trial
///
/// `populations[k]` is the population of every species, in the order of `species`, at
/// `times[k]`.
#[pyfunction]
#[pyo3(signature = (
    species,
    parameters,
    reactions,
    rate_functions,
    initial_conditions,
    t_max,
    algorithm = "ssa",
    iterations = 1,
    seed = None,
))]
#[allow(clippy::too_many_arguments)]
fn simulate(
    py: Python<'_>,
    species: Vec<String>,
    parameters: IndexMap<String, f64>,
    reactions: Vec<String>,
    rate_functions: Vec<String>,
    initial_conditions: IndexMap<String, f64>,
    t_max: f64,
    algorithm: &str,
    iterations: usize,
    seed: Option<u64>,
) -> PyResult<Vec<(Vec<f64>, Vec<Vec<f64>>)>> {
    let algorithm = algorithm.parse::<Algorithm>().map_err(to_py_err)?;
    let settings = SimulationSettingsBuilder::default()
        .t_max(t_max)
        .algorithm(algorithm)
        .iterations(iterations.max(1))
        .seed(seed)
        .build()
        .map_err(|err| PyValueError::new_err(err.to_string()))?;
    let definition = NetworkDefinition {
        species,
        parameters,
        reactions,
        rate_functions,
    };
    let simulation =
        Simulation::new(&definition, &initial_conditions, settings).map_err(to_py_err)?;
    let trajectories = py
        .allow_threads(|| simulation.run())
        .map_err(to_py_err)?;
    Ok(trajectories
        .into_iter()
        .map(|trajectory| {
            trajectory
                .samples
                .into_iter()
                .map(|sample| (sample.time, sample.population))
                .unzip()
        })
        .collect())
}

/// A Python module implemented in Rust. The name of this function must match
/// the `lib.name` setting in the `Cargo.toml`, else Python will not be able to
/// import the module.
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(simulate, m)?)?;
    Ok(())
}
