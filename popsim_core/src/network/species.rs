//! This module provides the species and parameter structs

use std::fmt::{Display, Formatter};

/// A Species is a set of individuals in the population, stored at a fixed position of the
/// population vector
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Species {
    /// Used to identify the species (must be unique)
    pub name: String,
    /// Position in the population vector
    pub position: usize,
}

impl Species {
    pub fn new(name: &str, position: usize) -> Self {
        Species {
            name: name.to_string(),
            position,
        }
    }
}

impl Display for Species {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Species({:?})", self.name)
    }
}

/// A Parameter is a named constant, substituted into rate functions when they are compiled
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
}

impl Parameter {
    pub fn new(name: &str, value: f64) -> Self {
        Parameter {
            name: name.to_string(),
            value,
        }
    }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parameter({:?} = {})", self.name, self.value)
    }
}
