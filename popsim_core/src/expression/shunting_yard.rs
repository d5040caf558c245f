//! Conversion of rate function tokens to Reverse Polish Notation (Shunting-Yard), and of RPN
//! to an expression tree (stack machine)
use std::fmt::{Display, Formatter};

use crate::expression::ast::{BinaryOp, Expr, UnaryOp};
use crate::expression::functions::{Arity, Function};
use crate::expression::parser::ParseError;
use crate::expression::token::Token;

/// Operators handled by the Shunting-Yard algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Binary(BinaryOp),
    /// Unary minus
    Negate,
}

impl Operator {
    fn precedence(&self) -> u8 {
        match self {
            Operator::Binary(BinaryOp::Add) | Operator::Binary(BinaryOp::Sub) => 1,
            Operator::Binary(BinaryOp::Mul) | Operator::Binary(BinaryOp::Div) => 2,
            Operator::Negate => 3,
        }
    }

    fn is_left_associative(&self) -> bool {
        !matches!(self, Operator::Negate)
    }
}

/// Tokens of the RPN sequence
#[derive(Debug, Clone, PartialEq)]
pub enum RpnToken {
    Number(f64),
    Symbol(String),
    Operator(Operator),
    Function(Function),
    /// Marks where the arguments of a variadic function begin
    ArgSeparator,
}

impl Display for RpnToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RpnToken::Number(n) => write!(f, "{}", n),
            RpnToken::Symbol(s) => write!(f, "{}", s),
            RpnToken::Operator(Operator::Negate) => write!(f, "neg"),
            RpnToken::Operator(Operator::Binary(op)) => write!(f, "{}", match op {
                BinaryOp::Add => "+",
                BinaryOp::Sub => "-",
                BinaryOp::Mul => "*",
                BinaryOp::Div => "/",
            }),
            RpnToken::Function(function) => write!(f, "{}", function),
            RpnToken::ArgSeparator => write!(f, "|"),
        }
    }
}

/// Items waiting on the operator stack
enum Pending {
    Operator(Operator),
    Function(Function),
    /// `call` is true when the parenthesis opens a function's argument list
    LeftParen { call: bool },
}

/// Check that parentheses are balanced before any conversion happens
pub fn check_parentheses(tokens: &[Token]) -> Result<(), ParseError> {
    let mut depth: usize = 0;
    for token in tokens {
        match token {
            Token::LeftParen => depth += 1,
            Token::RightParen => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(ParseError::UnbalancedParentheses)?;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ParseError::UnbalancedParentheses);
    }
    Ok(())
}

/// Convert infix tokens into RPN
///
/// e.g. `3 + 4 * 2 / (1 - 5)` becomes `3 4 2 * 1 5 - / +`, and `max(a, b + c)` becomes
/// `| a b c + max`.
pub fn to_rpn(tokens: &[Token]) -> Result<Vec<RpnToken>, ParseError> {
    check_parentheses(tokens)?;

    let mut output: Vec<RpnToken> = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Pending> = Vec::new();
    // One counter per open function call
    let mut arg_counts: Vec<usize> = Vec::new();
    let mut expect_operand = true;

    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::Number(value) => {
                if !expect_operand {
                    return Err(ParseError::UnexpectedToken(token.to_string()));
                }
                output.push(RpnToken::Number(*value));
                expect_operand = false;
            }
            Token::Identifier(name) => {
                if !expect_operand {
                    return Err(ParseError::UnexpectedToken(token.to_string()));
                }
                if tokens.get(index + 1) == Some(&Token::LeftParen) {
                    let function = Function::from_name(name)
                        .ok_or_else(|| ParseError::UnknownFunction(name.clone()))?;
                    if function.arity() == Arity::Variadic {
                        output.push(RpnToken::ArgSeparator);
                    }
                    stack.push(Pending::Function(function));
                } else {
                    output.push(RpnToken::Symbol(name.clone()));
                    expect_operand = false;
                }
            }
            Token::Plus | Token::Minus if expect_operand => {
                // Unary sign, a leading plus is a no-op
                if *token == Token::Minus {
                    stack.push(Pending::Operator(Operator::Negate));
                }
            }
            Token::Plus | Token::Minus | Token::Star | Token::Slash => {
                if expect_operand {
                    return Err(ParseError::MissingOperand);
                }
                let operator = Operator::Binary(match token {
                    Token::Plus => BinaryOp::Add,
                    Token::Minus => BinaryOp::Sub,
                    Token::Star => BinaryOp::Mul,
                    _ => BinaryOp::Div,
                });
                while let Some(Pending::Operator(top)) = stack.last() {
                    let top = *top;
                    if top.precedence() > operator.precedence()
                        || (top.precedence() == operator.precedence()
                            && operator.is_left_associative())
                    {
                        output.push(RpnToken::Operator(top));
                        stack.pop();
                    } else {
                        break;
                    }
                }
                stack.push(Pending::Operator(operator));
                expect_operand = true;
            }
            Token::LeftParen => {
                if !expect_operand {
                    return Err(ParseError::UnexpectedToken(token.to_string()));
                }
                let call = matches!(stack.last(), Some(Pending::Function(_)))
                    && index > 0
                    && matches!(tokens[index - 1], Token::Identifier(_));
                if call {
                    arg_counts.push(1);
                }
                stack.push(Pending::LeftParen { call });
            }
            Token::Comma => {
                if expect_operand {
                    return Err(ParseError::MissingOperand);
                }
                loop {
                    match stack.last() {
                        Some(Pending::Operator(op)) => {
                            output.push(RpnToken::Operator(*op));
                            stack.pop();
                        }
                        Some(Pending::LeftParen { call: true }) => break,
                        _ => return Err(ParseError::UnexpectedToken(token.to_string())),
                    }
                }
                if let Some(count) = arg_counts.last_mut() {
                    *count += 1;
                }
                expect_operand = true;
            }
            Token::RightParen => {
                let empty_call = index > 0
                    && tokens[index - 1] == Token::LeftParen
                    && matches!(stack.last(), Some(Pending::LeftParen { call: true }));
                if expect_operand && !empty_call {
                    return Err(ParseError::MissingOperand);
                }
                let call = loop {
                    match stack.pop() {
                        Some(Pending::Operator(op)) => output.push(RpnToken::Operator(op)),
                        Some(Pending::LeftParen { call }) => break call,
                        _ => return Err(ParseError::UnbalancedParentheses),
                    }
                };
                if call {
                    let found = if empty_call {
                        arg_counts.pop();
                        0
                    } else {
                        arg_counts.pop().unwrap_or(0)
                    };
                    let function = match stack.pop() {
                        Some(Pending::Function(function)) => function,
                        _ => return Err(ParseError::UnbalancedParentheses),
                    };
                    check_arity(function, found)?;
                    output.push(RpnToken::Function(function));
                }
                expect_operand = false;
            }
            Token::Arrow => return Err(ParseError::UnexpectedToken(token.to_string())),
            Token::Eof => break,
        }
    }

    if output.is_empty() && stack.is_empty() {
        return Err(ParseError::ExpectedExpression);
    }
    if expect_operand {
        return Err(ParseError::MissingOperand);
    }
    while let Some(pending) = stack.pop() {
        match pending {
            Pending::Operator(op) => output.push(RpnToken::Operator(op)),
            // Balanced parentheses leave no parenthesis or function on the stack
            _ => return Err(ParseError::UnbalancedParentheses),
        }
    }
    Ok(output)
}

fn check_arity(function: Function, found: usize) -> Result<(), ParseError> {
    let expected = match function.arity() {
        Arity::Fixed(n) => n,
        Arity::Variadic => found.max(1),
    };
    if found != expected {
        return Err(ParseError::WrongArgumentCount {
            function: function.name().to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

/// Entries of the RPN evaluation stack
enum Slot {
    Expr(Expr),
    Separator,
}

fn pop_operand(stack: &mut Vec<Slot>) -> Result<Expr, ParseError> {
    match stack.pop() {
        Some(Slot::Expr(expr)) => Ok(expr),
        _ => Err(ParseError::MissingOperand),
    }
}

/// Build an expression tree from an RPN sequence
pub fn rpn_to_expr(rpn: Vec<RpnToken>) -> Result<Expr, ParseError> {
    let mut stack: Vec<Slot> = Vec::new();

    for token in rpn {
        match token {
            RpnToken::Number(value) => stack.push(Slot::Expr(Expr::Constant(value))),
            RpnToken::Symbol(name) => stack.push(Slot::Expr(Expr::Symbol(name))),
            RpnToken::ArgSeparator => stack.push(Slot::Separator),
            RpnToken::Operator(Operator::Negate) => {
                let operand = pop_operand(&mut stack)?;
                stack.push(Slot::Expr(Expr::Unary(UnaryOp::Neg, Box::new(operand))));
            }
            RpnToken::Operator(Operator::Binary(op)) => {
                let right = pop_operand(&mut stack)?;
                let left = pop_operand(&mut stack)?;
                stack.push(Slot::Expr(Expr::Binary(op, Box::new(left), Box::new(right))));
            }
            RpnToken::Function(function) => {
                let mut args = Vec::new();
                match function.arity() {
                    Arity::Fixed(n) => {
                        for _ in 0..n {
                            args.push(pop_operand(&mut stack)?);
                        }
                    }
                    Arity::Variadic => loop {
                        match stack.pop() {
                            Some(Slot::Expr(expr)) => args.push(expr),
                            Some(Slot::Separator) => break,
                            None => return Err(ParseError::MissingOperand),
                        }
                    },
                }
                args.reverse();
                stack.push(Slot::Expr(Expr::Call(function, args)));
            }
        }
    }

    let result = pop_operand(&mut stack)?;
    if !stack.is_empty() {
        return Err(ParseError::EarlyTermination);
    }
    Ok(result)
}
