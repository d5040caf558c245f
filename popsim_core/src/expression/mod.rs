//! Module for compiling rate function strings into closures, and for parsing reaction strings

use crate::expression::ast::{CompiledFn, Expr, SymbolTable};
use crate::expression::parser::{ParsedReaction, ReactionParser};
use log::debug;
use thiserror::Error;

pub mod ast;
pub mod functions;
mod lexer;
pub mod parser;
pub mod shunting_yard;
mod token;

pub use lexer::LexerError;
pub use parser::ParseError;

/// A rate function compiled against a symbol table
pub struct CompiledExpression {
    /// Resolved and constant-folded expression tree
    pub tree: Expr,
    /// Closure evaluating `tree` on a population vector
    pub function: CompiledFn,
}

/// Parse a rate function string into an (unresolved) expression tree
///
/// Tokens are converted to RPN with the Shunting-Yard algorithm, then the RPN sequence is
/// turned back into a tree by a stack machine.
///
/// # Examples
/// ```rust
/// use popsim_core::expression::parse_rate_function;
/// let tree = parse_rate_function("k * max(x, 1)").unwrap();
/// assert_eq!(tree.to_string(), "(k * max(x, 1))");
/// ```
pub fn parse_rate_function(input: &str) -> Result<Expr, ExpressionError> {
    let tokens = lexer::Lexer::new(input).lex()?;
    let rpn = shunting_yard::to_rpn(&tokens)?;
    debug!(
        "Converted '{}' to RPN sequence: '{}'",
        input,
        rpn.iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    );
    Ok(shunting_yard::rpn_to_expr(rpn)?)
}

/// Compile a rate function string into a closure over the population vector
///
/// # Parameters
/// - `input`: the rate function, e.g. `"k_i*x_i*x_s/N"`
/// - `symbols`: lookup of species positions and parameter values
///
/// # Returns
/// - `Ok`: the folded tree and its compiled closure. Parameters are replaced by their values,
///     so the only free variables are species positions.
/// - `Err`: lexing/parsing errors for malformed input, or
///     [`ExpressionError::UnresolvedSymbol`] for names that are neither species nor parameters.
pub fn compile_rate_function<T: SymbolTable + ?Sized>(
    input: &str,
    symbols: &T,
) -> Result<CompiledExpression, ExpressionError> {
    let tree = parse_rate_function(input)?.resolve(symbols)?.fold();
    debug!("Compiled '{}' into: '{}'", input, tree);
    let function = tree.compile()?;
    Ok(CompiledExpression { tree, function })
}

/// Parse a reaction string (`reagents => products`)
///
/// # Examples
/// ```rust
/// use popsim_core::expression::parse_reaction;
/// let reaction = parse_reaction("x_s + x_i => 2 x_i").unwrap();
/// assert_eq!(reaction.reagents.len(), 2);
/// assert_eq!(reaction.products[0].quantity, 2.0);
/// ```
pub fn parse_reaction(input: &str) -> Result<ParsedReaction, ExpressionError> {
    let tokens = lexer::Lexer::new(input).lex()?;
    let reaction = ReactionParser::new(tokens).parse()?;
    debug!("Parsed string '{}' to reaction: {:?}", input, reaction);
    Ok(reaction)
}

/// Enum representing possible compilation errors
#[derive(Debug, Error, PartialEq, Clone)]
pub enum ExpressionError {
    /// Lexing Error
    #[error("Error occurred during lexing: {0}")]
    Lexing(#[from] LexerError),
    /// Parsing Error (malformed expression)
    #[error("Error occurred during parsing: {0}")]
    Parsing(#[from] ParseError),
    /// Identifier that is neither a species nor a parameter
    #[error("Unresolved symbol `{0}`, not a declared species or parameter")]
    UnresolvedSymbol(String),
}
