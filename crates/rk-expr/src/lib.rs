//! The expression languages of Rollkeeper.
//!
//! Two small languages share one [`logos`] lexer and are parsed with
//! [`chumsky`]:
//!
//! - dice expressions (`3d6+2`, `4d6kh3`, `(1d10+2)*2`), rolled with a
//!   caller-supplied seeded RNG;
//! - predicates over a roll (`roll <= baseValue / 2`), compiled once into an
//!   arena and evaluated many times.
//!
//! [`scan`] covers the template syntax around expressions (`$name`,
//! `[[...]]`) without interpreting it.

pub mod diagnostics;
pub mod dice;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod predicate;
pub mod scan;

pub use diagnostics::{Diagnostic, Severity, render_diagnostics};
pub use dice::{DiceExpr, DiceRoll, DiceTerm, MAX_DICE, MAX_SIDES};
pub use error::{ExprError, ExprResult};
pub use parser::ParseError;
pub use predicate::{Predicate, PredicateContext, Value};
pub use scan::{Reference, split_expression};
