//! Module providing the reaction network model: species, parameters, reactions, rate
//! functions, and the dependency graph derived from them.

pub mod dependency_graph;
pub mod model;
pub mod rate_function;
pub mod reaction;
pub mod species;

use thiserror::Error;

use crate::expression::ExpressionError;

/// Errors raised while building a reaction network
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NetworkError {
    /// Invalid input, such as mismatched counts or duplicated names
    #[error("Input error: {0}")]
    Input(String),
    /// A name used in a reaction or rate function is not a declared species or parameter
    #[error("Unresolved symbol `{symbol}` in `{expression}`")]
    UnresolvedSymbol { symbol: String, expression: String },
    /// A reaction or rate function is malformed
    #[error("Unable to compile `{expression}`: {source}")]
    Expression {
        expression: String,
        #[source]
        source: ExpressionError,
    },
}

impl NetworkError {
    /// Attach the offending expression to a compilation error
    pub(crate) fn from_expression(expression: &str, err: ExpressionError) -> Self {
        match err {
            ExpressionError::UnresolvedSymbol(symbol) => NetworkError::UnresolvedSymbol {
                symbol,
                expression: expression.to_string(),
            },
            source => NetworkError::Expression {
                expression: expression.to_string(),
                source,
            },
        }
    }
}
