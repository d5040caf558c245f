//! Lex a rate function or reaction string into a series of tokens for later parsing

use thiserror::Error;

use crate::expression::token::Token;

pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
        }
    }

    /// Convert the source string into a token vector, terminated by [`Token::Eof`]
    pub fn lex(mut self) -> Result<Vec<Token>, LexerError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }

        self.tokens.push(Token::Eof);
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> Result<(), LexerError> {
        let c: char = self.advance();
        match c {
            // Single Character Tokens
            '(' => self.add_token(Token::LeftParen),
            ')' => self.add_token(Token::RightParen),
            ',' => self.add_token(Token::Comma),
            '+' => self.add_token(Token::Plus),
            '-' => self.add_token(Token::Minus),
            '*' => self.add_token(Token::Star),
            '/' => self.add_token(Token::Slash),
            '=' => {
                if self.peek() == '>' {
                    self.advance();
                    self.add_token(Token::Arrow)
                } else {
                    return Err(LexerError::InvalidToken {
                        found: c,
                        position: self.start,
                    });
                }
            }
            // Literals and identifiers
            '0'..='9' | '.' => self.read_number()?,
            'a'..='z' | 'A'..='Z' | '_' => self.read_identifier(),
            // Whitespace
            ' ' | '\r' | '\n' | '\t' => {}
            _ => {
                return Err(LexerError::InvalidToken {
                    found: c,
                    position: self.start,
                })
            }
        };
        Ok(())
    }

    fn advance(&mut self) -> char {
        let char_at_current = self.source[self.current];
        self.current += 1;
        char_at_current
    }

    fn read_identifier(&mut self) {
        while Lexer::is_alphanumeric(self.peek()) {
            self.advance();
        }
        let text: String = self.source[self.start..self.current].iter().collect();
        self.add_token(Token::Identifier(text))
    }

    /// Read `digits [. digits] [e [+-] digits]`, or `. digits [...]`
    fn read_number(&mut self) -> Result<(), LexerError> {
        while Lexer::is_digit(self.peek()) {
            self.advance();
        }
        if self.source[self.start] != '.' && self.peek() == '.' {
            self.advance();
        }
        while Lexer::is_digit(self.peek()) {
            self.advance();
        }
        // Only consume an exponent when digits follow, so `2e` stays `2` then identifier `e`
        if matches!(self.peek(), 'e' | 'E') {
            let after = self.peek_at(1);
            let signed = matches!(after, '+' | '-') && Lexer::is_digit(self.peek_at(2));
            if Lexer::is_digit(after) || signed {
                self.advance();
                if signed {
                    self.advance();
                }
                while Lexer::is_digit(self.peek()) {
                    self.advance();
                }
            }
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        match text.parse::<f64>() {
            Ok(value) => {
                self.add_token(Token::Number(value));
                Ok(())
            }
            Err(_) => Err(LexerError::InvalidNumber(text)),
        }
    }

    fn is_digit(c: char) -> bool {
        c.is_ascii_digit()
    }

    fn is_alpha(c: char) -> bool {
        matches!(c, 'a'..='z' | 'A'..='Z' | '_')
    }

    fn is_alphanumeric(c: char) -> bool {
        Lexer::is_alpha(c) || Lexer::is_digit(c)
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> char {
        match self.source.get(self.current + offset) {
            Some(c) => *c,
            None => '\0',
        }
    }

    fn add_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

/// Enum representing possible lexing errors
#[derive(Debug, Error, PartialEq, Clone)]
pub enum LexerError {
    /// Character that can't start any token
    #[error("Invalid character `{found}` at position {position}")]
    InvalidToken { found: char, position: usize },
    /// Numeric literal that could not be converted to a float (e.g. a lone `.`)
    #[error("Invalid numeric literal `{0}`")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use crate::expression::lexer::{Lexer, LexerError};
    use crate::expression::token::Token;

    #[test]
    fn test_single_identifier() {
        let tokens = match Lexer::new("x_s").lex() {
            Ok(t) => t,
            Err(_) => panic!("Failed to lex during test"),
        };
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Token::Identifier(String::from("x_s")));
        assert_eq!(tokens[1], Token::Eof);
    }

    #[test]
    fn test_arithmetic() {
        let tokens = Lexer::new("k_i*x_i*(x_s - 1)/N").lex().unwrap();
        let expected = vec![
            Token::Identifier("k_i".to_string()),
            Token::Star,
            Token::Identifier("x_i".to_string()),
            Token::Star,
            Token::LeftParen,
            Token::Identifier("x_s".to_string()),
            Token::Minus,
            Token::Number(1.0),
            Token::RightParen,
            Token::Slash,
            Token::Identifier("N".to_string()),
            Token::Eof,
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("3 2.5 .25 1e-3 4E2 7.").lex().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Number(3.0),
                Token::Number(2.5),
                Token::Number(0.25),
                Token::Number(1e-3),
                Token::Number(400.0),
                Token::Number(7.0),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_quantity_prefixed_species() {
        // `2e` without exponent digits keeps `e` as a species name
        let tokens = Lexer::new("2x + 2e => y").lex().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Number(2.0),
                Token::Identifier("x".to_string()),
                Token::Plus,
                Token::Number(2.0),
                Token::Identifier("e".to_string()),
                Token::Arrow,
                Token::Identifier("y".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_function_call() {
        let tokens = Lexer::new("max(a, 2)").lex().unwrap();
        assert_eq!(tokens.len(), 7);
        assert_eq!(tokens[3], Token::Comma);
    }

    #[test]
    fn test_invalid_character() {
        match Lexer::new("x ^ 2").lex() {
            Err(LexerError::InvalidToken { found, position }) => {
                assert_eq!(found, '^');
                assert_eq!(position, 2);
            }
            _ => panic!("Should have failed on `^`"),
        }
        assert!(Lexer::new("a = b").lex().is_err());
        assert_eq!(
            Lexer::new(".").lex(),
            Err(LexerError::InvalidNumber(".".to_string()))
        );
    }
}
