//! Expression tree produced from RPN, resolved against a symbol table, folded, and compiled
//! into a closure over the population vector
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use crate::expression::functions::{Arity, Function};
use crate::expression::ExpressionError;

/// Compiled rate function, only reads population positions
pub type CompiledFn = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// What an identifier in an expression refers to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SymbolValue {
    /// Position of a species in the population vector
    Species(usize),
    /// Constant value of a parameter
    Constant(f64),
}

/// Lookup of identifier names during symbol resolution
pub trait SymbolTable {
    fn lookup(&self, name: &str) -> Option<SymbolValue>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn apply(&self, left: f64, right: f64) -> f64 {
        match self {
            BinaryOp::Add => left + right,
            BinaryOp::Sub => left - right,
            BinaryOp::Mul => left * right,
            BinaryOp::Div => left / right,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

/// Representation of a rate function as an AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(f64),
    /// Unresolved identifier, only present before [`Expr::resolve`]
    Symbol(String),
    /// Species position in the population vector
    Variable(usize),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

impl Expr {
    /// Replace every [`Expr::Symbol`] with a species reference or a parameter constant
    ///
    /// # Returns
    /// - `Ok`: the resolved tree, free of symbols
    /// - `Err`: [`ExpressionError::UnresolvedSymbol`] naming the first unknown identifier
    pub fn resolve<T: SymbolTable + ?Sized>(self, table: &T) -> Result<Expr, ExpressionError> {
        Ok(match self {
            Expr::Symbol(name) => match table.lookup(&name) {
                Some(SymbolValue::Species(pos)) => Expr::Variable(pos),
                Some(SymbolValue::Constant(value)) => Expr::Constant(value),
                None => return Err(ExpressionError::UnresolvedSymbol(name)),
            },
            Expr::Unary(op, operand) => Expr::Unary(op, Box::new(operand.resolve(table)?)),
            Expr::Binary(op, left, right) => Expr::Binary(
                op,
                Box::new(left.resolve(table)?),
                Box::new(right.resolve(table)?),
            ),
            Expr::Call(function, args) => Expr::Call(
                function,
                args.into_iter()
                    .map(|arg| arg.resolve(table))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            leaf => leaf,
        })
    }

    /// Collapse every sub-tree that does not read a species into a single constant
    pub fn fold(self) -> Expr {
        match self {
            Expr::Unary(op, operand) => match (op, operand.fold()) {
                (UnaryOp::Neg, Expr::Constant(value)) => Expr::Constant(-value),
                (op, operand) => Expr::Unary(op, Box::new(operand)),
            },
            Expr::Binary(op, left, right) => match (left.fold(), right.fold()) {
                (Expr::Constant(l), Expr::Constant(r)) => Expr::Constant(op.apply(l, r)),
                (left, right) => Expr::Binary(op, Box::new(left), Box::new(right)),
            },
            Expr::Call(function, args) => {
                let args: Vec<Expr> = args.into_iter().map(Expr::fold).collect();
                let constants: Option<Vec<f64>> = args
                    .iter()
                    .map(|arg| match arg {
                        Expr::Constant(value) => Some(*value),
                        _ => None,
                    })
                    .collect();
                match constants {
                    Some(values) => Expr::Constant(function.apply(&values)),
                    None => Expr::Call(function, args),
                }
            }
            leaf => leaf,
        }
    }

    /// Species positions read by this expression
    pub fn inputs(&self) -> BTreeSet<usize> {
        let mut inputs = BTreeSet::new();
        self.collect_inputs(&mut inputs);
        inputs
    }

    fn collect_inputs(&self, inputs: &mut BTreeSet<usize>) {
        match self {
            Expr::Variable(pos) => {
                inputs.insert(*pos);
            }
            Expr::Unary(_, operand) => operand.collect_inputs(inputs),
            Expr::Binary(_, left, right) => {
                left.collect_inputs(inputs);
                right.collect_inputs(inputs);
            }
            Expr::Call(_, args) => args.iter().for_each(|arg| arg.collect_inputs(inputs)),
            Expr::Constant(_) | Expr::Symbol(_) => {}
        }
    }

    /// Directly interpret the tree on a population vector
    pub fn eval(&self, population: &[f64]) -> Result<f64, ExpressionError> {
        Ok(match self {
            Expr::Constant(value) => *value,
            Expr::Variable(pos) => population[*pos],
            Expr::Symbol(name) => return Err(ExpressionError::UnresolvedSymbol(name.clone())),
            Expr::Unary(UnaryOp::Neg, operand) => -operand.eval(population)?,
            Expr::Binary(op, left, right) => op.apply(left.eval(population)?, right.eval(population)?),
            Expr::Call(function, args) => {
                let values = args
                    .iter()
                    .map(|arg| arg.eval(population))
                    .collect::<Result<Vec<_>, _>>()?;
                function.apply(&values)
            }
        })
    }

    /// Compile the (resolved) tree into a closure
    pub fn compile(&self) -> Result<CompiledFn, ExpressionError> {
        let function: CompiledFn = match self {
            Expr::Constant(value) => {
                let value = *value;
                Box::new(move |_| value)
            }
            Expr::Variable(pos) => {
                let pos = *pos;
                Box::new(move |x| x[pos])
            }
            Expr::Symbol(name) => return Err(ExpressionError::UnresolvedSymbol(name.clone())),
            Expr::Unary(UnaryOp::Neg, operand) => {
                let operand = operand.compile()?;
                Box::new(move |x| -operand(x))
            }
            Expr::Binary(op, left, right) => {
                // Constant factors are common in mass-action rates (k * x)
                if let (BinaryOp::Mul, Expr::Constant(c)) = (op, left.as_ref()) {
                    let c = *c;
                    let right = right.compile()?;
                    let scaled: CompiledFn = Box::new(move |x| c * right(x));
                    return Ok(scaled);
                }
                let l = left.compile()?;
                let r = right.compile()?;
                match op {
                    BinaryOp::Add => Box::new(move |x| l(x) + r(x)),
                    BinaryOp::Sub => Box::new(move |x| l(x) - r(x)),
                    BinaryOp::Mul => Box::new(move |x| l(x) * r(x)),
                    BinaryOp::Div => Box::new(move |x| l(x) / r(x)),
                }
            }
            Expr::Call(function, args) => {
                let function = *function;
                let mut compiled = args
                    .iter()
                    .map(Expr::compile)
                    .collect::<Result<Vec<_>, _>>()?;
                match (function.arity(), compiled.len()) {
                    (Arity::Fixed(1), 1) => {
                        let a = compiled.remove(0);
                        Box::new(move |x| function.apply(&[a(x)]))
                    }
                    (Arity::Fixed(2), 2) => {
                        let b = compiled.remove(1);
                        let a = compiled.remove(0);
                        Box::new(move |x| function.apply(&[a(x), b(x)]))
                    }
                    _ => match function {
                        Function::Sum => Box::new(move |x| compiled.iter().map(|a| a(x)).sum()),
                        Function::Max => Box::new(move |x| {
                            compiled.iter().map(|a| a(x)).fold(f64::NEG_INFINITY, f64::max)
                        }),
                        Function::Min => Box::new(move |x| {
                            compiled.iter().map(|a| a(x)).fold(f64::INFINITY, f64::min)
                        }),
                        _ => Box::new(move |x| {
                            let values: Vec<f64> = compiled.iter().map(|a| a(x)).collect();
                            function.apply(&values)
                        }),
                    },
                }
            }
        };
        Ok(function)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Constant(value) => write!(f, "{}", value),
            Expr::Symbol(name) => write!(f, "{}", name),
            Expr::Variable(pos) => write!(f, "x[{}]", pos),
            Expr::Unary(UnaryOp::Neg, operand) => write!(f, "(-{})", operand),
            Expr::Binary(op, left, right) => write!(f, "({} {} {})", left, op.symbol(), right),
            Expr::Call(function, args) => {
                write!(f, "{}(", function)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
