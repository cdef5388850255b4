//! Error types for the mechanics engine.

use rk_expr::ExprError;

/// Errors that can occur while deciding, resolving or rewriting.
#[derive(Debug, thiserror::Error)]
pub enum MechError {
    /// Template or rewrite recursion went past the depth guard.
    #[error("resolution exceeded depth {depth}; check for self-referencing abilities or alias rules")]
    ResolutionTooDeep {
        /// The depth at which resolution gave up.
        depth: usize,
    },

    /// A resolved expression could not be parsed or rolled.
    #[error("unparseable expression: {0}")]
    UnparseableExpression(#[from] ExprError),

    /// A tier predicate failed to compile or evaluate.
    #[error("predicate for tier '{tier}' failed: {cause}")]
    PredicateEvaluationFailed {
        /// Name of the tier whose predicate failed.
        tier: String,
        /// The underlying expression error.
        cause: ExprError,
    },

    /// An alias rule could not be compiled.
    #[error("invalid alias rule: {0}")]
    InvalidRule(String),
}

/// Convenience result type for mechanics operations.
pub type MechResult<T> = Result<T, MechError>;
