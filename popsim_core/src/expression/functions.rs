//! Built-in functions usable inside rate functions

use std::fmt::{Display, Formatter};

/// Number of arguments a function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// Any number of arguments (at least one)
    Variadic,
}

/// Functions that can be called from a rate function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Abs,
    Acos,
    Acosh,
    Asin,
    Asinh,
    Atan,
    Atan2,
    Atanh,
    Ceil,
    Cos,
    Cosh,
    Exp,
    Floor,
    Fmod,
    Log,
    Log10,
    Max,
    Min,
    Pow,
    Round,
    Sin,
    Sinh,
    Sqrt,
    Sum,
    Tan,
    Tanh,
}

impl Function {
    /// Look up a function by the name used in rate function strings
    pub fn from_name(name: &str) -> Option<Function> {
        let function = match name {
            "abs" => Function::Abs,
            "acos" => Function::Acos,
            "acosh" => Function::Acosh,
            "asin" => Function::Asin,
            "asinh" => Function::Asinh,
            "atan" => Function::Atan,
            "atan2" => Function::Atan2,
            "atanh" => Function::Atanh,
            "ceil" => Function::Ceil,
            "cos" => Function::Cos,
            "cosh" => Function::Cosh,
            "exp" => Function::Exp,
            "floor" => Function::Floor,
            "fmod" => Function::Fmod,
            "log" => Function::Log,
            "log10" => Function::Log10,
            "max" => Function::Max,
            "min" => Function::Min,
            "pow" => Function::Pow,
            "round" => Function::Round,
            "sin" => Function::Sin,
            "sinh" => Function::Sinh,
            "sqrt" => Function::Sqrt,
            "sum" => Function::Sum,
            "tan" => Function::Tan,
            "tanh" => Function::Tanh,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Abs => "abs",
            Function::Acos => "acos",
            Function::Acosh => "acosh",
            Function::Asin => "asin",
            Function::Asinh => "asinh",
            Function::Atan => "atan",
            Function::Atan2 => "atan2",
            Function::Atanh => "atanh",
            Function::Ceil => "ceil",
            Function::Cos => "cos",
            Function::Cosh => "cosh",
            Function::Exp => "exp",
            Function::Floor => "floor",
            Function::Fmod => "fmod",
            Function::Log => "log",
            Function::Log10 => "log10",
            Function::Max => "max",
            Function::Min => "min",
            Function::Pow => "pow",
            Function::Round => "round",
            Function::Sin => "sin",
            Function::Sinh => "sinh",
            Function::Sqrt => "sqrt",
            Function::Sum => "sum",
            Function::Tan => "tan",
            Function::Tanh => "tanh",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Function::Max | Function::Min | Function::Sum => Arity::Variadic,
            Function::Atan2 | Function::Fmod | Function::Pow => Arity::Fixed(2),
            _ => Arity::Fixed(1),
        }
    }

    /// Apply the function to already evaluated arguments
    ///
    /// The argument count has been checked at parse time.
    pub fn apply(&self, args: &[f64]) -> f64 {
        match self {
            Function::Abs => args[0].abs(),
            Function::Acos => args[0].acos(),
            Function::Acosh => args[0].acosh(),
            Function::Asin => args[0].asin(),
            Function::Asinh => args[0].asinh(),
            Function::Atan => args[0].atan(),
            Function::Atan2 => args[0].atan2(args[1]),
            Function::Atanh => args[0].atanh(),
            Function::Ceil => args[0].ceil(),
            Function::Cos => args[0].cos(),
            Function::Cosh => args[0].cosh(),
            Function::Exp => args[0].exp(),
            Function::Floor => args[0].floor(),
            Function::Fmod => args[0] % args[1],
            Function::Log => args[0].ln(),
            Function::Log10 => args[0].log10(),
            Function::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Function::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
            Function::Pow => args[0].powf(args[1]),
            Function::Round => args[0].round(),
            Function::Sin => args[0].sin(),
            Function::Sinh => args[0].sinh(),
            Function::Sqrt => args[0].sqrt(),
            Function::Sum => args.iter().sum(),
            Function::Tan => args[0].tan(),
            Function::Tanh => args[0].tanh(),
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for name in ["abs", "log10", "max", "pow", "tanh", "fmod"] {
            let function = Function::from_name(name).unwrap();
            assert_eq!(function.name(), name);
        }
        assert!(Function::from_name("gamma").is_none());
    }

    #[test]
    fn arities() {
        assert_eq!(Function::Max.arity(), Arity::Variadic);
        assert_eq!(Function::Pow.arity(), Arity::Fixed(2));
        assert_eq!(Function::Sqrt.arity(), Arity::Fixed(1));
    }

    #[test]
    fn apply_values() {
        assert_eq!(Function::Max.apply(&[1.0, 5.0, 3.0]), 5.0);
        assert_eq!(Function::Min.apply(&[1.0, 5.0, -3.0]), -3.0);
        assert_eq!(Function::Sum.apply(&[1.0, 5.0, 3.0]), 9.0);
        assert_eq!(Function::Pow.apply(&[2.0, 10.0]), 1024.0);
        assert_eq!(Function::Fmod.apply(&[7.0, 3.0]), 1.0);
        assert_eq!(Function::Round.apply(&[2.4]), 2.0);
        assert!((Function::Log10.apply(&[1000.0]) - 3.0).abs() < 1e-12);
    }
}
