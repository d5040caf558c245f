//! This module provides compiled rate (propensity) functions
use std::fmt::{Debug, Formatter};

use crate::expression::ast::{CompiledFn, Expr, SymbolTable};
use crate::expression::compile_rate_function;
use crate::network::NetworkError;

/// A rate function depends on the species and on the parameters, the latter already replaced
/// by their values
pub struct RateFunction {
    /// The rate function as it was written
    pub source: String,
    /// Folded expression tree
    pub tree: Expr,
    /// Species positions read by the function, ascending
    pub inputs: Vec<usize>,
    function: CompiledFn,
}

impl RateFunction {
    pub fn new<T: SymbolTable + ?Sized>(source: &str, symbols: &T) -> Result<Self, NetworkError> {
        let compiled = compile_rate_function(source, symbols)
            .map_err(|err| NetworkError::from_expression(source, err))?;
        Ok(RateFunction {
            source: source.to_string(),
            inputs: compiled.tree.inputs().into_iter().collect(),
            tree: compiled.tree,
            function: compiled.function,
        })
    }

    /// Evaluate the propensity on a population vector
    #[inline]
    pub fn evaluate(&self, population: &[f64]) -> f64 {
        (self.function)(population)
    }
}

impl Debug for RateFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateFunction")
            .field("source", &self.source)
            .field("tree", &format_args!("{}", self.tree))
            .field("inputs", &self.inputs)
            .finish()
    }
}
