//! This module provides a struct for representing reactions
use indexmap::IndexMap;

use crate::expression::parse_reaction;
use crate::expression::parser::Term;
use crate::network::species::Species;
use crate::network::NetworkError;

/// Represents a reaction of the network, and the population change it causes when it fires
#[derive(Debug, Clone)]
pub struct Reaction {
    /// The reaction as it was written
    pub source: String,
    /// Consumed species and their quantities
    pub reagents: Vec<Term>,
    /// Produced species and their quantities
    pub products: Vec<Term>,
    /// Net change of every species when the reaction fires (products add, reagents subtract)
    pub update_vector: Vec<f64>,
    /// Positions of the reagent species, without repetitions, in order of appearance
    pub depends_on: Vec<usize>,
    /// Positions where `update_vector` is nonzero, ascending
    pub affects: Vec<usize>,
}

impl Reaction {
    /// Parse a reaction string against the species of the network
    ///
    /// # Parameters
    /// - `source`: reaction of the form `2 A + B => C`
    /// - `species`: map of species names to [`Species`]
    ///
    /// # Returns
    /// - `Ok`: the reaction with its update vector, depends-on and affects sets
    /// - `Err`: [`NetworkError::Expression`] if the string is malformed,
    ///     [`NetworkError::UnresolvedSymbol`] if a term names an undeclared species
    pub fn new(source: &str, species: &IndexMap<String, Species>) -> Result<Reaction, NetworkError> {
        let parsed = parse_reaction(source).map_err(|err| NetworkError::from_expression(source, err))?;

        let lookup = |term: &Term| -> Result<usize, NetworkError> {
            match species.get(&term.species) {
                Some(s) => Ok(s.position),
                None => Err(NetworkError::UnresolvedSymbol {
                    symbol: term.species.clone(),
                    expression: source.to_string(),
                }),
            }
        };

        let mut update_vector = vec![0f64; species.len()];
        let mut depends_on: Vec<usize> = Vec::with_capacity(parsed.reagents.len());
        for term in &parsed.reagents {
            let position = lookup(term)?;
            update_vector[position] -= term.quantity;
            if !depends_on.contains(&position) {
                depends_on.push(position);
            }
        }
        for term in &parsed.products {
            let position = lookup(term)?;
            update_vector[position] += term.quantity;
        }
        let affects = update_vector
            .iter()
            .enumerate()
            .filter_map(|(position, delta)| (*delta != 0f64).then_some(position))
            .collect();

        Ok(Reaction {
            source: source.to_string(),
            reagents: parsed.reagents,
            products: parsed.products,
            update_vector,
            depends_on,
            affects,
        })
    }

    /// Apply one firing of the reaction to `population`
    pub fn fire(&self, population: &mut [f64]) {
        for &position in &self.affects {
            population[position] += self.update_vector[position];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn species(names: &[&str]) -> IndexMap<String, Species> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), Species::new(name, i)))
            .collect()
    }

    #[test]
    fn update_vector_and_sets() {
        let species = species(&["x_s", "x_i", "x_r"]);
        let infection = Reaction::new("x_s + x_i => x_i + x_i", &species).unwrap();
        assert_eq!(infection.update_vector, vec![-1.0, 1.0, 0.0]);
        assert_eq!(infection.depends_on, vec![0, 1]);
        assert_eq!(infection.affects, vec![0, 1]);

        let recovery = Reaction::new("x_i => x_r", &species).unwrap();
        assert_eq!(recovery.update_vector, vec![0.0, -1.0, 1.0]);
        assert_eq!(recovery.depends_on, vec![1]);
        assert_eq!(recovery.affects, vec![1, 2]);
    }

    #[test]
    fn catalyst_is_not_affected() {
        let species = species(&["E", "S", "P"]);
        let reaction = Reaction::new("E + 2 S => E + P", &species).unwrap();
        assert_eq!(reaction.update_vector, vec![0.0, -2.0, 1.0]);
        assert_eq!(reaction.depends_on, vec![0, 1]);
        assert_eq!(reaction.affects, vec![1, 2]);
    }

    #[test]
    fn repeated_reagents_accumulate() {
        let species = species(&["A", "B"]);
        let reaction = Reaction::new("A + A => B", &species).unwrap();
        assert_eq!(reaction.update_vector, vec![-2.0, 1.0]);
        assert_eq!(reaction.depends_on, vec![0]);
    }

    #[test]
    fn production_and_decay() {
        let species = species(&["A"]);
        let production = Reaction::new("=> A", &species).unwrap();
        assert!(production.depends_on.is_empty());
        assert_eq!(production.affects, vec![0]);
        let decay = Reaction::new("A =>", &species).unwrap();
        assert_eq!(decay.update_vector, vec![-1.0]);
    }

    #[test]
    fn fire_applies_update() {
        let species = species(&["A", "B"]);
        let reaction = Reaction::new("2 A => B", &species).unwrap();
        let mut population = vec![10.0, 0.0];
        reaction.fire(&mut population);
        assert_eq!(population, vec![8.0, 1.0]);
    }

    #[test]
    fn unknown_species() {
        let species = species(&["A", "B"]);
        match Reaction::new("A + C => B", &species) {
            Err(NetworkError::UnresolvedSymbol { symbol, .. }) => assert_eq!(symbol, "C"),
            _ => panic!("Should have failed on C"),
        }
        assert!(matches!(
            Reaction::new("A + => B", &species),
            Err(NetworkError::Expression { .. })
        ));
    }
}
