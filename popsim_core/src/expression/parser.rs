use crate::expression::token::Token;

use thiserror::Error;
/*
Reaction Grammar:
reaction -> side "=>" side ;
side -> ( term ( "+" term )* )? ;
term -> NUMBER? SPECIES ;

e.g. 2 x_s + x_i => 3 x_i
 */

/// One side entry of a reaction: a species and how many units of it take part
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    /// Stoichiometric quantity, 1 when omitted
    pub quantity: f64,
    /// Species identifier
    pub species: String,
}

/// A reaction split into reagents and products
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedReaction {
    pub reagents: Vec<Term>,
    pub products: Vec<Term>,
}

/// Reaction Parser
pub struct ReactionParser {
    /// Vector of tokens from the reaction string
    tokens: Vec<Token>,
    /// Current token being processed
    current: usize,
}

impl ReactionParser {
    /// Create a new ReactionParser
    pub fn new(tokens: Vec<Token>) -> ReactionParser {
        ReactionParser { tokens, current: 0 }
    }

    // region Parsing Functions

    /// Parse the token vector into reagent and product lists
    pub fn parse(&mut self) -> Result<ParsedReaction, ParseError> {
        let reagents = self.side()?;
        self.consume(Token::Arrow, "Expect '=>' between reagents and products.")?;
        let products = self.side()?;
        if !self.is_at_end() {
            // If entire reaction has not been parsed, an error has occurred
            return Err(ParseError::EarlyTermination);
        }
        Ok(ParsedReaction { reagents, products })
    }

    fn side(&mut self) -> Result<Vec<Term>, ParseError> {
        let mut terms = Vec::new();
        if self.check(Token::Arrow) || self.is_at_end() {
            // Empty side (pure production or pure consumption)
            return Ok(terms);
        }
        terms.push(self.term()?);
        while self.match_token(vec![Token::Plus]) {
            terms.push(self.term()?);
        }
        Ok(terms)
    }

    fn term(&mut self) -> Result<Term, ParseError> {
        if self.check(Token::Minus) {
            self.advance();
            return Err(ParseError::NegativeQuantity(self.peek().to_string()));
        }
        let quantity = self.match_number().unwrap_or(1.0);
        if let Some(species) = self.match_identifier() {
            return Ok(Term { quantity, species });
        }
        Err(ParseError::ExpectedSpecies(self.peek().to_string()))
    }

    // endregion Parsing Functions

    // region parsing helper functions

    /// Check whether the token at the current position matches one of the provided `tokens`,
    /// if it does advance [`self.current`] and return true, otherwise return false
    fn match_token(&mut self, tokens: Vec<Token>) -> bool {
        for t in tokens {
            if self.check(t) {
                self.advance();
                return true;
            }
        }
        false
    }

    /// Similar to [`match_token`], but for matching an identifier token. If the current
    /// token is an identifier return `Some(species)`, otherwise return None
    fn match_identifier(&mut self) -> Option<String> {
        if let Token::Identifier(id) = self.peek() {
            self.advance();
            return Some(id);
        }
        None
    }

    /// Same as [`match_identifier`] for a numeric quantity
    fn match_number(&mut self) -> Option<f64> {
        if let Token::Number(value) = self.peek() {
            self.advance();
            return Some(value);
        }
        None
    }

    /// Check whether the current token matches the provided `token`
    fn check(&self, token: Token) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.peek() == token
    }

    /// Advance `self.current` one position unless at end of the token Vec, then return the
    /// previous token.
    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    /// Check whether the parser is at the end of the source Vec
    fn is_at_end(&self) -> bool {
        self.peek() == Token::Eof
    }

    /// Get a copy of the current token
    fn peek(&self) -> Token {
        self.tokens.get(self.current).cloned().unwrap_or(Token::Eof)
    }

    /// Get a copy of the previous token
    fn previous(&self) -> Token {
        self.tokens[self.current - 1].clone()
    }

    /// Check whether the current token matches an input token, if it matches advance to the
    /// next token, and if it doesn't return an error.
    fn consume(&mut self, token: Token, msg: &str) -> Result<Token, ParseError> {
        if self.check(token) {
            return Ok(self.advance());
        }

        Err(ParseError::MissingToken(msg.to_string()))
    }

    // endregion parsing helper functions
}

/// Enum representing possible parse errors, for both rate functions and reactions
#[derive(Debug, Error, PartialEq, Clone)]
pub enum ParseError {
    /// Parentheses do not pair up
    #[error("Unbalanced parentheses")]
    UnbalancedParentheses,
    /// Token found where it can't appear
    #[error("Unexpected token `{0}`")]
    UnexpectedToken(String),
    /// Operator or function without enough operands
    #[error("Missing operand for an operator or function")]
    MissingOperand,
    /// Name followed by `(` that isn't a known function
    #[error("Unknown function `{0}`")]
    UnknownFunction(String),
    /// Function called with a number of arguments different from its arity
    #[error("Function `{function}` expects {expected} argument(s), found {found}")]
    WrongArgumentCount {
        function: String,
        expected: usize,
        found: usize,
    },
    /// Missing expected token (e.g. the reaction arrow)
    #[error("Missing expected token: {0}")]
    MissingToken(String),
    /// A reaction term without a species name
    #[error("Expected a species name, found `{0}`")]
    ExpectedSpecies(String),
    /// A reaction term with a negative quantity
    #[error("Reaction quantities must be non-negative, found `-{0}`")]
    NegativeQuantity(String),
    /// No expression found when one was expected
    #[error("No expression found, check that the string is not empty")]
    ExpectedExpression,
    /// Expression was not completed when parsing terminated
    #[error("Parsing terminated early, leftover tokens or operands")]
    EarlyTermination,
}
