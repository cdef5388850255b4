//! Dice expressions: terms, parsing, rolling, and bounds.
//!
//! Supports `NdM`, `d%` (percentile), `NdF` (fudge), keep-highest/lowest
//! suffixes (`k`, `kh`, `kl`), integer constants, unary minus, `+ - * /`
//! with floor division, and parentheses.

pub mod pool;

pub use pool::TermRoll;

use std::fmt;

use rand::rngs::StdRng;

use crate::error::{ExprError, ExprResult};
use crate::parser;

/// Largest number of dice a single term may roll.
pub const MAX_DICE: u32 = 1000;
/// Largest die size.
pub const MAX_SIDES: u32 = 100_000;

/// The faces of a die.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sides {
    /// A numbered die, 1 through N.
    Number(u32),
    /// A fudge die: -1, 0 or +1.
    Fudge,
}

/// Which dice of a term count toward its total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keep {
    /// Keep the N highest.
    Highest(u32),
    /// Keep the N lowest.
    Lowest(u32),
}

/// A single dice term such as `3d6` or `4d6kh3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceTerm {
    /// Number of dice rolled.
    pub count: u32,
    /// Die faces.
    pub sides: Sides,
    /// Keep rule, if any.
    pub keep: Option<Keep>,
}

impl DiceTerm {
    /// Parse a term from its source text. Case-insensitive apart from `F`.
    pub fn parse(text: &str) -> Option<Self> {
        let d = text.find(['d', 'D'])?;
        let count = match &text[..d] {
            "" => 1,
            digits => digits.parse().ok()?,
        };
        let rest = &text[d + 1..];
        let (sides_text, keep_text) = match rest.find(['k', 'K']) {
            Some(k) => (&rest[..k], Some(&rest[k + 1..])),
            None => (rest, None),
        };
        let sides = match sides_text {
            "%" => Sides::Number(100),
            "F" => Sides::Fudge,
            digits => Sides::Number(digits.parse().ok()?),
        };
        let keep = match keep_text {
            None => None,
            Some(k) => {
                let (lowest, digits) = match k.chars().next() {
                    Some('l' | 'L') => (true, &k[1..]),
                    Some('h' | 'H') => (false, &k[1..]),
                    _ => (false, k),
                };
                let n = if digits.is_empty() { 1 } else { digits.parse().ok()? };
                Some(if lowest { Keep::Lowest(n) } else { Keep::Highest(n) })
            }
        };
        Some(Self { count, sides, keep })
    }

    /// Reject terms outside the dice and side caps.
    pub fn validate(&self) -> ExprResult<()> {
        if self.count > MAX_DICE {
            return Err(ExprError::TooManyDice {
                count: self.count,
                max: MAX_DICE,
            });
        }
        if let Sides::Number(n) = self.sides
            && !(1..=MAX_SIDES).contains(&n)
        {
            return Err(ExprError::InvalidDie { sides: n });
        }
        Ok(())
    }

    /// Number of dice that count toward the total.
    pub fn kept(&self) -> u32 {
        match self.keep {
            Some(Keep::Highest(n) | Keep::Lowest(n)) => n.min(self.count),
            None => self.count,
        }
    }

    fn bounds(&self) -> (i64, i64) {
        let kept = i64::from(self.kept());
        match self.sides {
            Sides::Number(n) => (kept, kept * i64::from(n)),
            Sides::Fudge => (-kept, kept),
        }
    }
}

impl fmt::Display for DiceTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count != 1 {
            write!(f, "{}", self.count)?;
        }
        match self.sides {
            Sides::Number(n) => write!(f, "d{n}")?,
            Sides::Fudge => write!(f, "dF")?,
        }
        match self.keep {
            Some(Keep::Highest(n)) => write!(f, "kh{n}"),
            Some(Keep::Lowest(n)) => write!(f, "kl{n}"),
            None => Ok(()),
        }
    }
}

/// A binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`, floored.
    Div,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "+"),
            Self::Sub => write!(f, "-"),
            Self::Mul => write!(f, "*"),
            Self::Div => write!(f, "/"),
        }
    }
}

/// Parsed dice expression.
#[derive(Debug, Clone, PartialEq)]
pub enum DiceExpr {
    /// Integer constant.
    Int(i64),
    /// Dice term.
    Dice(DiceTerm),
    /// Unary minus.
    Neg(Box<DiceExpr>),
    /// Binary operation.
    Binary(Box<DiceExpr>, BinOp, Box<DiceExpr>),
    /// Parenthesized sub-expression.
    Group(Box<DiceExpr>),
}

/// The outcome of rolling an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceRoll {
    /// The expression as parsed, in canonical form.
    pub expression: String,
    /// The expression with every die replaced by its result.
    pub detail: String,
    /// The final value.
    pub total: i64,
    /// Every term rolled, in order.
    pub terms: Vec<TermRoll>,
}

impl DiceRoll {
    /// Number of dice rolled across every term.
    pub fn dice_count(&self) -> usize {
        self.terms.iter().map(|t| t.values.len()).sum()
    }

    /// The detail without the expression, e.g. `[4+2]+3=9`.
    pub fn short(&self) -> String {
        if self.detail == self.total.to_string() {
            self.detail.clone()
        } else {
            format!("{}={}", self.detail, self.total)
        }
    }
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total.to_string();
        if self.detail == self.expression || self.detail == total {
            write!(f, "{}={}", self.expression, total)
        } else {
            write!(f, "{}={}={}", self.expression, self.detail, total)
        }
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Dice(term) => write!(f, "{term}"),
            Self::Neg(inner) => write!(f, "-{inner}"),
            Self::Binary(lhs, op, rhs) => write!(f, "{lhs}{op}{rhs}"),
            Self::Group(inner) => write!(f, "({inner})"),
        }
    }
}

impl DiceExpr {
    /// Parse an expression and check every term against the caps.
    pub fn parse(text: &str) -> ExprResult<Self> {
        let expr = parser::parse_dice(text)?;
        expr.validate()?;
        Ok(expr)
    }

    fn validate(&self) -> ExprResult<()> {
        match self {
            Self::Int(_) => Ok(()),
            Self::Dice(term) => term.validate(),
            Self::Neg(inner) | Self::Group(inner) => inner.validate(),
            Self::Binary(lhs, _, rhs) => {
                lhs.validate()?;
                rhs.validate()
            }
        }
    }

    /// Roll every term and evaluate.
    pub fn roll(&self, rng: &mut StdRng) -> ExprResult<DiceRoll> {
        let mut terms = Vec::new();
        let mut detail = String::new();
        let total = self.eval(rng, &mut terms, &mut detail)?;
        Ok(DiceRoll {
            expression: self.to_string(),
            detail,
            total,
            terms,
        })
    }

    fn eval(&self, rng: &mut StdRng, terms: &mut Vec<TermRoll>, out: &mut String) -> ExprResult<i64> {
        match self {
            Self::Int(n) => {
                out.push_str(&n.to_string());
                Ok(*n)
            }
            Self::Dice(term) => {
                let roll = pool::roll_term(term, rng);
                out.push_str(&roll.to_string());
                let total = roll.total();
                terms.push(roll);
                Ok(total)
            }
            Self::Neg(inner) => {
                out.push('-');
                inner.eval(rng, terms, out)?.checked_neg().ok_or(ExprError::Overflow)
            }
            Self::Group(inner) => {
                out.push('(');
                let v = inner.eval(rng, terms, out)?;
                out.push(')');
                Ok(v)
            }
            Self::Binary(lhs, op, rhs) => {
                let a = lhs.eval(rng, terms, out)?;
                out.push_str(&op.to_string());
                let b = rhs.eval(rng, terms, out)?;
                apply(*op, a, b)
            }
        }
    }

    /// The largest value the expression can produce.
    pub fn maximum(&self) -> ExprResult<i64> {
        Ok(self.bounds()?.1)
    }

    /// The smallest value the expression can produce.
    pub fn minimum(&self) -> ExprResult<i64> {
        Ok(self.bounds()?.0)
    }

    fn bounds(&self) -> ExprResult<(i64, i64)> {
        match self {
            Self::Int(n) => Ok((*n, *n)),
            Self::Dice(term) => Ok(term.bounds()),
            Self::Group(inner) => inner.bounds(),
            Self::Neg(inner) => {
                let (lo, hi) = inner.bounds()?;
                let neg = |v: i64| v.checked_neg().ok_or(ExprError::Overflow);
                Ok((neg(hi)?, neg(lo)?))
            }
            Self::Binary(lhs, op, rhs) => {
                let (a_lo, a_hi) = lhs.bounds()?;
                let (b_lo, b_hi) = rhs.bounds()?;
                match op {
                    BinOp::Add => Ok((apply(*op, a_lo, b_lo)?, apply(*op, a_hi, b_hi)?)),
                    BinOp::Sub => Ok((apply(*op, a_lo, b_hi)?, apply(*op, a_hi, b_lo)?)),
                    BinOp::Mul | BinOp::Div => {
                        let corners = [
                            apply(*op, a_lo, b_lo)?,
                            apply(*op, a_lo, b_hi)?,
                            apply(*op, a_hi, b_lo)?,
                            apply(*op, a_hi, b_hi)?,
                        ];
                        let lo = corners.iter().copied().min().unwrap_or(0);
                        let hi = corners.iter().copied().max().unwrap_or(0);
                        Ok((lo, hi))
                    }
                }
            }
        }
    }
}

fn apply(op: BinOp, a: i64, b: i64) -> ExprResult<i64> {
    match op {
        BinOp::Add => a.checked_add(b).ok_or(ExprError::Overflow),
        BinOp::Sub => a.checked_sub(b).ok_or(ExprError::Overflow),
        BinOp::Mul => a.checked_mul(b).ok_or(ExprError::Overflow),
        BinOp::Div => floor_div(a, b),
    }
}

/// Integer division rounding toward negative infinity.
pub(crate) fn floor_div(a: i64, b: i64) -> ExprResult<i64> {
    if b == 0 {
        return Err(ExprError::DivisionByZero);
    }
    let q = a.checked_div(b).ok_or(ExprError::Overflow)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

/// Parse and roll in one step.
pub fn roll(text: &str, rng: &mut StdRng) -> ExprResult<DiceRoll> {
    DiceExpr::parse(text)?.roll(rng)
}

/// The largest value an expression can produce, without rolling.
pub fn maximum(text: &str) -> ExprResult<i64> {
    DiceExpr::parse(text)?.maximum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn term_parse_forms() {
        assert_eq!(
            DiceTerm::parse("d20"),
            Some(DiceTerm { count: 1, sides: Sides::Number(20), keep: None })
        );
        assert_eq!(
            DiceTerm::parse("3d100kl1"),
            Some(DiceTerm { count: 3, sides: Sides::Number(100), keep: Some(Keep::Lowest(1)) })
        );
        assert_eq!(DiceTerm::parse("4d6k").map(|t| t.keep), Some(Some(Keep::Highest(1))));
        assert_eq!(DiceTerm::parse("d%").map(|t| t.sides), Some(Sides::Number(100)));
    }

    #[test]
    fn term_display_is_canonical() {
        assert_eq!(DiceTerm::parse("1D6K2").unwrap().to_string(), "d6kh2");
    }

    #[test]
    fn constant_expression() {
        let r = roll("10+2*3", &mut rng()).unwrap();
        assert_eq!(r.total, 16);
        assert_eq!(r.to_string(), "10+2*3=16");
    }

    #[test]
    fn floor_division() {
        assert_eq!(roll("7/2", &mut rng()).unwrap().total, 3);
        assert_eq!(roll("-7/2", &mut rng()).unwrap().total, -4);
        assert_eq!(roll("(0-7)/2", &mut rng()).unwrap().total, -4);
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(roll("1/0", &mut rng()), Err(ExprError::DivisionByZero));
    }

    #[test]
    fn dice_stay_in_range() {
        let mut rng = rng();
        for _ in 0..200 {
            let r = roll("2d6+1", &mut rng).unwrap();
            assert!((3..=13).contains(&r.total));
            assert_eq!(r.dice_count(), 2);
        }
    }

    #[test]
    fn keep_lowest_takes_minimum() {
        let mut rng = rng();
        for _ in 0..100 {
            let r = roll("3d100kl1", &mut rng).unwrap();
            let term = &r.terms[0];
            assert_eq!(r.total, *term.values.iter().min().unwrap());
        }
    }

    #[test]
    fn fudge_dice_range() {
        let mut rng = rng();
        for _ in 0..100 {
            let r = roll("4dF", &mut rng).unwrap();
            assert!((-4..=4).contains(&r.total));
        }
    }

    #[test]
    fn seeded_rolls_repeat() {
        let a = roll("3d6", &mut StdRng::seed_from_u64(99)).unwrap();
        let b = roll("3d6", &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn caps_are_enforced() {
        assert_eq!(
            DiceExpr::parse("1001d6"),
            Err(ExprError::TooManyDice { count: 1001, max: MAX_DICE })
        );
        assert_eq!(DiceExpr::parse("d0"), Err(ExprError::InvalidDie { sides: 0 }));
        assert!(DiceExpr::parse("d100001").is_err());
        assert!(DiceExpr::parse("1000d100000").is_ok());
    }

    #[test]
    fn maximum_and_minimum() {
        assert_eq!(maximum("1d6+1").unwrap(), 7);
        assert_eq!(maximum("2d10").unwrap(), 20);
        assert_eq!(maximum("4d6kh3").unwrap(), 18);
        assert_eq!(maximum("-1d6").unwrap(), -1);
        assert_eq!(DiceExpr::parse("10-1d4").unwrap().minimum().unwrap(), 6);
    }

    #[test]
    fn detail_shows_rolled_values() {
        let r = roll("2d6+3", &mut rng()).unwrap();
        assert!(r.detail.starts_with('['));
        assert!(r.detail.ends_with("+3"));
        assert_eq!(r.expression, "2d6+3");
    }

    #[test]
    fn unparseable_input() {
        assert!(matches!(DiceExpr::parse("d20+"), Err(ExprError::Parse { .. })));
        assert!(matches!(DiceExpr::parse(""), Err(ExprError::Parse { .. })));
        assert!(matches!(DiceExpr::parse("侦察"), Err(ExprError::Parse { .. })));
    }
}
