//! This module provides the ReactionNetwork struct, the compiled and immutable model consumed
//! by the simulation engines
use derive_builder::Builder;
use indexmap::IndexMap;
use log::info;
use nalgebra::DMatrix;

use crate::expression::ast::{SymbolTable, SymbolValue};
use crate::network::dependency_graph::DependencyGraph;
use crate::network::rate_function::RateFunction;
use crate::network::reaction::Reaction;
use crate::network::species::{Parameter, Species};
use crate::network::NetworkError;

/// Represents a compiled reaction network
#[derive(Debug)]
pub struct ReactionNetwork {
    /// Map of species names to Species, in population-vector order
    species: IndexMap<String, Species>,
    /// Map of parameter names to Parameters
    parameters: IndexMap<String, Parameter>,
    /// Reactions, in the same index space as `rate_functions`
    reactions: Vec<Reaction>,
    /// One rate function per reaction
    rate_functions: Vec<RateFunction>,
    /// #reactions × #species stoichiometry matrix, row `r` is the update vector of reaction `r`
    update_matrix: DMatrix<f64>,
    dependency_graph: DependencyGraph,
}

/// Plain description of a reaction network, before compilation
#[derive(Builder, Debug, Clone, Default)]
#[builder(setter(into))]
pub struct NetworkDefinition {
    /// Species names, their order fixes the population vector layout
    pub species: Vec<String>,
    /// Map of parameter names to values
    #[builder(default = "IndexMap::new()")]
    pub parameters: IndexMap<String, f64>,
    /// Reaction strings
    #[builder(default = "Vec::new()")]
    pub reactions: Vec<String>,
    /// Rate function strings, one per reaction
    #[builder(default = "Vec::new()")]
    pub rate_functions: Vec<String>,
}

impl NetworkDefinition {
    /// Compile the definition into a [`ReactionNetwork`]
    ///
    /// # Examples
    /// ```rust
    /// use popsim_core::network::model::NetworkDefinitionBuilder;
    /// let network = NetworkDefinitionBuilder::default()
    ///     .species(vec!["A".to_string(), "B".to_string()])
    ///     .reactions(vec!["A => B".to_string()])
    ///     .rate_functions(vec!["A".to_string()])
    ///     .build()
    ///     .unwrap()
    ///     .compile()
    ///     .unwrap();
    /// assert_eq!(network.num_reactions(), 1);
    /// ```
    pub fn compile(&self) -> Result<ReactionNetwork, NetworkError> {
        ReactionNetwork::build(
            &self.species,
            &self.parameters,
            &self.reactions,
            &self.rate_functions,
        )
    }
}

/// Symbol lookup over the species and parameter tables of a network under construction
struct Symbols<'a> {
    species: &'a IndexMap<String, Species>,
    parameters: &'a IndexMap<String, Parameter>,
}

impl SymbolTable for Symbols<'_> {
    fn lookup(&self, name: &str) -> Option<SymbolValue> {
        if let Some(species) = self.species.get(name) {
            return Some(SymbolValue::Species(species.position));
        }
        self.parameters
            .get(name)
            .map(|parameter| SymbolValue::Constant(parameter.value))
    }
}

impl ReactionNetwork {
    /// Build a reaction network
    ///
    /// # Parameters
    /// - `species_names`: unique species names, in population-vector order
    /// - `parameters`: map of parameter names to values
    /// - `reactions`: reaction strings (`reagents => products`)
    /// - `rate_functions`: one rate function string per reaction
    ///
    /// # Returns
    /// - `Ok`: the compiled network
    /// - `Err`: [`NetworkError::Input`] on count mismatches, duplicate species, or names declared
    ///     both as species and parameter; [`NetworkError::UnresolvedSymbol`] or
    ///     [`NetworkError::Expression`] when a reaction or rate function can't be compiled
    pub fn build<S: AsRef<str>>(
        species_names: &[S],
        parameters: &IndexMap<String, f64>,
        reactions: &[S],
        rate_functions: &[S],
    ) -> Result<Self, NetworkError> {
        if reactions.len() != rate_functions.len() {
            return Err(NetworkError::Input(format!(
                "The number of reactions ({}) is different from the number of rate functions ({})",
                reactions.len(),
                rate_functions.len()
            )));
        }

        let mut species: IndexMap<String, Species> = IndexMap::with_capacity(species_names.len());
        for (position, name) in species_names.iter().enumerate() {
            let name = name.as_ref();
            if species.contains_key(name) {
                return Err(NetworkError::Input(format!(
                    "Species '{}' is declared more than once",
                    name
                )));
            }
            species.insert(name.to_string(), Species::new(name, position));
        }

        let mut parameter_table: IndexMap<String, Parameter> = IndexMap::with_capacity(parameters.len());
        for (name, value) in parameters {
            if species.contains_key(name) {
                return Err(NetworkError::Input(format!(
                    "'{}' is declared both as a species and as a parameter",
                    name
                )));
            }
            parameter_table.insert(name.clone(), Parameter::new(name, *value));
        }

        let reactions = reactions
            .iter()
            .map(|reaction| Reaction::new(reaction.as_ref(), &species))
            .collect::<Result<Vec<_>, _>>()?;

        let symbols = Symbols {
            species: &species,
            parameters: &parameter_table,
        };
        let rate_functions = rate_functions
            .iter()
            .map(|rate_function| RateFunction::new(rate_function.as_ref(), &symbols))
            .collect::<Result<Vec<_>, _>>()?;

        let update_matrix = DMatrix::from_fn(reactions.len(), species.len(), |r, s| {
            reactions[r].update_vector[s]
        });

        let affects: Vec<Vec<usize>> = reactions.iter().map(|r| r.affects.clone()).collect();
        let reads: Vec<Vec<usize>> = reactions
            .iter()
            .zip(&rate_functions)
            .map(|(reaction, rate_function)| propensity_inputs(reaction, rate_function))
            .collect();
        let dependency_graph = DependencyGraph::build(&affects, &reads);

        info!(
            "Built reaction network: {} species, {} parameters, {} reactions",
            species.len(),
            parameter_table.len(),
            reactions.len()
        );

        Ok(ReactionNetwork {
            species,
            parameters: parameter_table,
            reactions,
            rate_functions,
            update_matrix,
            dependency_graph,
        })
    }

    // region Accessors
    pub fn num_species(&self) -> usize {
        self.species.len()
    }

    pub fn num_reactions(&self) -> usize {
        self.reactions.len()
    }

    pub fn species(&self) -> &IndexMap<String, Species> {
        &self.species
    }

    pub fn parameters(&self) -> &IndexMap<String, Parameter> {
        &self.parameters
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn rate_functions(&self) -> &[RateFunction] {
        &self.rate_functions
    }

    pub fn update_matrix(&self) -> &DMatrix<f64> {
        &self.update_matrix
    }

    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.dependency_graph
    }

    /// Position of a species in the population vector
    pub fn species_position(&self, name: &str) -> Option<usize> {
        self.species.get(name).map(|s| s.position)
    }
    // endregion Accessors

    // region Evaluation
    /// Propensity of a single reaction
    #[inline]
    pub fn propensity(&self, reaction: usize, population: &[f64]) -> f64 {
        self.rate_functions[reaction].evaluate(population)
    }

    /// Evaluate every propensity into `out`
    pub fn propensities_into(&self, population: &[f64], out: &mut [f64]) {
        for (value, rate_function) in out.iter_mut().zip(&self.rate_functions) {
            *value = rate_function.evaluate(population);
        }
    }

    /// Evaluate every propensity
    pub fn propensities(&self, population: &[f64]) -> Vec<f64> {
        let mut out = vec![0f64; self.rate_functions.len()];
        self.propensities_into(population, &mut out);
        out
    }

    /// Apply one firing of `reaction` to `population`
    #[inline]
    pub fn fire(&self, reaction: usize, population: &mut [f64]) {
        self.reactions[reaction].fire(population)
    }
    // endregion Evaluation
}

/// Species a propensity reads: the reagents, plus anything else its rate function references
fn propensity_inputs(reaction: &Reaction, rate_function: &RateFunction) -> Vec<usize> {
    let mut inputs = reaction.depends_on.clone();
    for position in &rate_function.inputs {
        if !inputs.contains(position) {
            inputs.push(*position);
        }
    }
    inputs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sir() -> ReactionNetwork {
        let mut parameters = IndexMap::new();
        parameters.insert("k_i".to_string(), 2.0);
        parameters.insert("k_r".to_string(), 0.5);
        parameters.insert("k_s".to_string(), 0.1);
        parameters.insert("N".to_string(), 100.0);
        ReactionNetwork::build(
            &["x_s", "x_i", "x_r"],
            &parameters,
            &["x_s + x_i => x_i + x_i", "x_i => x_r", "x_r => x_s"],
            &["k_i*x_i*x_s/N", "k_r*x_i", "k_s*x_r"],
        )
        .unwrap()
    }

    #[test]
    fn build_sir() {
        let network = sir();
        assert_eq!(network.num_species(), 3);
        assert_eq!(network.num_reactions(), 3);
        assert_eq!(network.species_position("x_r"), Some(2));
        assert_eq!(network.parameters()["N"].value, 100.0);

        let matrix = network.update_matrix();
        assert_eq!(matrix.nrows(), 3);
        assert_eq!(matrix.ncols(), 3);
        for (r, reaction) in network.reactions().iter().enumerate() {
            let row: Vec<f64> = matrix.row(r).iter().copied().collect();
            assert_eq!(row, reaction.update_vector);
            // Each reaction conserves the total population
            assert_eq!(row.iter().sum::<f64>(), 0.0);
        }
    }

    #[test]
    fn propensities() {
        let network = sir();
        let population = [80.0, 20.0, 5.0];
        let rates = network.propensities(&population);
        assert!((rates[0] - 32.0).abs() < 1e-12);
        assert!((rates[1] - 10.0).abs() < 1e-12);
        assert!((rates[2] - 0.5).abs() < 1e-12);
        assert_eq!(network.propensity(1, &population), rates[1]);
    }

    #[test]
    fn affects_is_nonzero_support() {
        let network = sir();
        for reaction in network.reactions() {
            let support: Vec<usize> = reaction
                .update_vector
                .iter()
                .enumerate()
                .filter(|(_, d)| **d != 0.0)
                .map(|(i, _)| i)
                .collect();
            assert_eq!(reaction.affects, support);
            for position in &reaction.depends_on {
                let name = network.species().get_index(*position).unwrap().0;
                assert!(reaction.reagents.iter().any(|t| &t.species == name));
            }
        }
    }

    #[test]
    fn rate_function_inputs_extend_dependencies() {
        // The degradation of B is inhibited by A, which is not a reagent of it
        let network = ReactionNetwork::build(
            &["A", "B"],
            &IndexMap::new(),
            &["=> A", "B =>"],
            &["1", "B / (1 + A)"],
        )
        .unwrap();
        assert!(network.reactions()[1].depends_on == vec![1]);
        assert!(network.dependency_graph().dependents(0).contains(&1));
    }

    #[test]
    fn input_errors() {
        let empty = IndexMap::new();
        assert!(matches!(
            ReactionNetwork::build(&["A"], &empty, &["A =>"], &[]),
            Err(NetworkError::Input(_))
        ));
        assert!(matches!(
            ReactionNetwork::build(&["A", "A"], &empty, &["A =>"], &["1"]),
            Err(NetworkError::Input(_))
        ));
        let mut clash = IndexMap::new();
        clash.insert("A".to_string(), 1.0);
        assert!(matches!(
            ReactionNetwork::build(&["A"], &clash, &["A =>"], &["A"]),
            Err(NetworkError::Input(_))
        ));
    }

    #[test]
    fn unresolved_symbols() {
        let empty = IndexMap::new();
        match ReactionNetwork::build(&["A"], &empty, &["A =>"], &["k * A"]) {
            Err(NetworkError::UnresolvedSymbol { symbol, expression }) => {
                assert_eq!(symbol, "k");
                assert_eq!(expression, "k * A");
            }
            other => panic!("Unexpected result {:?}", other.err()),
        }
        match ReactionNetwork::build(&["A"], &empty, &["A => B"], &["A"]) {
            Err(NetworkError::UnresolvedSymbol { symbol, .. }) => assert_eq!(symbol, "B"),
            other => panic!("Unexpected result {:?}", other.err()),
        }
        assert!(matches!(
            ReactionNetwork::build(&["A"], &empty, &["A =>"], &["(A"]),
            Err(NetworkError::Expression { .. })
        ));
    }

    #[test]
    fn definition_builder() {
        let definition = NetworkDefinitionBuilder::default()
            .species(vec!["A".to_string(), "B".to_string()])
            .reactions(vec!["A => B".to_string()])
            .rate_functions(vec!["k * A".to_string()])
            .parameters(IndexMap::from([("k".to_string(), 3.0)]))
            .build()
            .unwrap();
        let network = definition.compile().unwrap();
        assert_eq!(network.propensity(0, &[2.0, 0.0]), 6.0);
    }
}
