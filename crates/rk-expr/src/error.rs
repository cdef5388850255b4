//! Error types for expression parsing and evaluation.

use crate::parser::ParseError;

/// Errors raised while parsing or evaluating dice expressions and predicates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    /// The text is not a valid expression.
    #[error("cannot parse `{text}`: {}", summary(.errors))]
    Parse {
        /// The text that failed to parse.
        text: String,
        /// Every lexer and parser error, in source order.
        errors: Vec<ParseError>,
    },

    /// A division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A term rolls more dice than allowed.
    #[error("too many dice: {count} (max {max})")]
    TooManyDice {
        /// Dice requested.
        count: u32,
        /// The cap.
        max: u32,
    },

    /// A die with zero or too many sides.
    #[error("invalid die: d{sides}")]
    InvalidDie {
        /// Sides requested.
        sides: u32,
    },

    /// An operator was applied to the wrong kind of value.
    #[error("type mismatch: {op} expects {expected}")]
    TypeMismatch {
        /// The operator.
        op: &'static str,
        /// The operand kind it needs.
        expected: &'static str,
    },

    /// A predicate names a variable that does not exist.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    /// Integer overflow during evaluation.
    #[error("arithmetic overflow")]
    Overflow,
}

fn summary(errors: &[ParseError]) -> String {
    match errors.first() {
        Some(first) if errors.len() > 1 => format!("{} (+{} more)", first.message, errors.len() - 1),
        Some(first) => first.message.clone(),
        None => "unknown error".to_string(),
    }
}

/// Convenience result type for expression operations.
pub type ExprResult<T> = Result<T, ExprError>;
