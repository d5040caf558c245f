//! Module providing Token enum for lexing rate functions and reactions

use std::fmt::{Display, Formatter};

/// Represents Tokens in rate functions and reactions
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    /// Numeric literal, always non-negative (signs are separate tokens)
    Number(f64),
    /// Species, parameter or function name
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    LeftParen,
    RightParen,
    Comma,
    /// Reaction arrow `=>`
    Arrow,
    Eof,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Identifier(id) => write!(f, "{}", id),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Arrow => write!(f, "=>"),
            Token::Eof => write!(f, "<eof>"),
        }
    }
}
