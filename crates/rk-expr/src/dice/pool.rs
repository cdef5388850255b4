//! Rolling a single dice term.

use std::fmt;

use rand::Rng;
use rand::rngs::StdRng;

use super::{DiceTerm, Keep, Sides};

/// The result of rolling one term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRoll {
    /// The term that was rolled.
    pub term: DiceTerm,
    /// Face values in roll order.
    pub values: Vec<i64>,
    /// Parallel to `values`: true when the die counts toward the total.
    pub kept: Vec<bool>,
}

impl TermRoll {
    /// Sum of the kept dice.
    pub fn total(&self) -> i64 {
        self.values
            .iter()
            .zip(&self.kept)
            .filter(|&(_, &k)| k)
            .map(|(v, _)| v)
            .sum()
    }
}

/// Kept dice joined with `+` in brackets, dropped dice in parentheses after.
/// A lone die renders as its bare value.
impl fmt::Display for TermRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.values.len() == 1 && self.term.keep.is_none() {
            return write!(f, "{}", self.values[0]);
        }
        let kept: Vec<String> = self
            .values
            .iter()
            .zip(&self.kept)
            .filter(|&(_, &k)| k)
            .map(|(v, _)| v.to_string())
            .collect();
        let dropped: Vec<String> = self
            .values
            .iter()
            .zip(&self.kept)
            .filter(|&(_, &k)| !k)
            .map(|(v, _)| v.to_string())
            .collect();
        write!(f, "[{}]", kept.join("+"))?;
        if !dropped.is_empty() {
            write!(f, "({})", dropped.join(","))?;
        }
        Ok(())
    }
}

/// Roll every die of a term, then apply its keep rule.
pub fn roll_term(term: &DiceTerm, rng: &mut StdRng) -> TermRoll {
    let values: Vec<i64> = (0..term.count)
        .map(|_| match term.sides {
            Sides::Number(n) => i64::from(rng.random_range(1..=n)),
            Sides::Fudge => rng.random_range(-1..=1),
        })
        .collect();
    let kept = keep_mask(&values, term.keep);
    TermRoll {
        term: *term,
        values,
        kept,
    }
}

fn keep_mask(values: &[i64], keep: Option<Keep>) -> Vec<bool> {
    let Some(keep) = keep else {
        return vec![true; values.len()];
    };
    let mut order: Vec<usize> = (0..values.len()).collect();
    let n = match keep {
        Keep::Highest(n) => {
            order.sort_by(|&a, &b| values[b].cmp(&values[a]));
            n
        }
        Keep::Lowest(n) => {
            order.sort_by(|&a, &b| values[a].cmp(&values[b]));
            n
        }
    };
    let mut mask = vec![false; values.len()];
    for &idx in order.iter().take(n as usize) {
        mask[idx] = true;
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn term(text: &str) -> DiceTerm {
        DiceTerm::parse(text).unwrap()
    }

    #[test]
    fn roll_produces_valid_values() {
        let mut rng = StdRng::seed_from_u64(42);
        let result = roll_term(&term("10d6"), &mut rng);
        assert_eq!(result.values.len(), 10);
        for v in &result.values {
            assert!((1..=6).contains(v));
        }
    }

    #[test]
    fn keep_highest_mask() {
        assert_eq!(
            keep_mask(&[3, 6, 1, 5], Some(Keep::Highest(2))),
            vec![false, true, false, true]
        );
    }

    #[test]
    fn keep_more_than_rolled_keeps_all() {
        assert_eq!(keep_mask(&[3, 1], Some(Keep::Lowest(5))), vec![true, true]);
    }

    #[test]
    fn display_marks_dropped_dice() {
        let roll = TermRoll {
            term: term("4d6kh3"),
            values: vec![6, 1, 5, 3],
            kept: vec![true, false, true, true],
        };
        assert_eq!(roll.to_string(), "[6+5+3](1)");
        assert_eq!(roll.total(), 14);
    }

    #[test]
    fn single_die_is_bare() {
        let roll = TermRoll {
            term: term("d20"),
            values: vec![17],
            kept: vec![true],
        };
        assert_eq!(roll.to_string(), "17");
    }

    #[test]
    fn zero_dice_total_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = roll_term(&term("0d6"), &mut rng);
        assert_eq!(result.total(), 0);
        assert_eq!(result.to_string(), "[]");
    }
}
