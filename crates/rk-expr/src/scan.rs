//! Hand-written scanners for the template syntax that surrounds dice
//! expressions: `$` references, `[[...]]` inline rolls, and the boundary
//! between a leading expression and free text.

/// A `$` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'a> {
    /// `$name` or `${name}`.
    Named(&'a str),
    /// `$N`: the Nth inline roll at the current level, 1-based.
    Back(usize),
}

/// Parse a reference at the start of `text`. Returns its byte length.
pub fn reference_at(text: &str) -> Option<(usize, Reference<'_>)> {
    let rest = text.strip_prefix('$')?;
    if let Some(inner) = rest.strip_prefix('{') {
        let close = inner.find(['}', '{'])?;
        if !inner[close..].starts_with('}') {
            return None;
        }
        let name = inner[..close].trim();
        if name.is_empty() {
            return None;
        }
        return Some((close + 3, Reference::Named(name)));
    }
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        let n = rest[..digits].parse().ok()?;
        return Some((digits + 1, Reference::Back(n)));
    }
    let len: usize = rest
        .chars()
        .take_while(|&c| c.is_alphanumeric() || c == '_')
        .map(char::len_utf8)
        .sum();
    if len == 0 {
        return None;
    }
    Some((len + 1, Reference::Named(&rest[..len])))
}

/// Byte length of a balanced `[[...]]` span at the start of `text`.
pub fn inline_at(text: &str) -> Option<usize> {
    if !text.starts_with("[[") {
        return None;
    }
    let mut depth = 0usize;
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        if rest.starts_with("[[") {
            depth += 1;
            i += 2;
        } else if rest.starts_with("]]") {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return Some(i);
            }
        } else {
            i += rest.chars().next().map_or(1, char::len_utf8);
        }
    }
    None
}

/// The innermost `[[...]]` span: the byte range of the whole span including
/// brackets.
///
/// A `]]` with no `[[` before it is skipped.
pub fn innermost_inline(text: &str) -> Option<std::ops::Range<usize>> {
    text.match_indices("]]")
        .find_map(|(close, _)| text[..close].rfind("[[").map(|open| open..close + 2))
}

/// Byte length of a dice term at the start of `text`, optionally with a
/// leading count.
fn dice_at(text: &str, allow_count: bool) -> Option<usize> {
    let b = text.as_bytes();
    let digits = |from: usize| from + b[from..].iter().take_while(|c| c.is_ascii_digit()).count();
    let mut i = if allow_count { digits(0) } else { 0 };
    if !matches!(b.get(i), Some(b'd' | b'D')) {
        return None;
    }
    i += 1;
    match b.get(i) {
        Some(b'%' | b'F') => i += 1,
        Some(c) if c.is_ascii_digit() => i = digits(i),
        _ => return None,
    }
    if matches!(b.get(i), Some(b'k' | b'K')) {
        i += 1;
        if matches!(b.get(i), Some(b'h' | b'H' | b'l' | b'L')) {
            i += 1;
        }
        i = digits(i);
    }
    Some(i)
}

/// Split `text` into its longest leading roll expression and the rest.
///
/// The expression may hold numbers, dice terms, `+ - * /`, parentheses,
/// references and balanced inline rolls. It ends at the last point where it
/// is complete, so a dangling operator or open parenthesis stays in the rest.
/// A dice suffix glued to an operand (`[[d4]]d6`, `$1d6`) extends it.
pub fn split_expression(text: &str) -> (&str, &str) {
    let mut pos = 0;
    let mut depth = 0usize;
    let mut expect_operand = true;
    let mut operand_end = usize::MAX;
    let mut complete = 0;

    loop {
        let glued = pos == operand_end;
        let ws: usize = text[pos..]
            .chars()
            .take_while(|c| c.is_whitespace())
            .map(char::len_utf8)
            .sum();
        pos += ws;
        let rest = &text[pos..];
        let Some(c) = rest.chars().next() else {
            break;
        };

        if expect_operand {
            let len = match c {
                '(' => {
                    depth += 1;
                    pos += 1;
                    continue;
                }
                '+' | '-' => {
                    pos += 1;
                    continue;
                }
                '$' => reference_at(rest).map(|(len, _)| len),
                '[' => inline_at(rest),
                _ => dice_at(rest, true).or_else(|| {
                    let n = rest.bytes().take_while(u8::is_ascii_digit).count();
                    (n > 0).then_some(n)
                }),
            };
            let Some(len) = len else {
                break;
            };
            pos += len;
            operand_end = pos;
            expect_operand = false;
        } else {
            if ws == 0
                && glued
                && let Some(len) = dice_at(rest, false)
            {
                pos += len;
                operand_end = pos;
            } else {
                match c {
                    '+' | '-' | '*' | '/' => {
                        pos += 1;
                        expect_operand = true;
                        continue;
                    }
                    ')' if depth > 0 => {
                        depth -= 1;
                        pos += 1;
                        operand_end = pos;
                    }
                    _ => break,
                }
            }
        }
        if depth == 0 {
            complete = pos;
        }
    }

    (text[..complete].trim_end(), text[complete..].trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references() {
        assert_eq!(reference_at("$力量+1"), Some((7, Reference::Named("力量"))));
        assert_eq!(reference_at("${spot hidden}x"), Some((14, Reference::Named("spot hidden"))));
        assert_eq!(reference_at("$12d6"), Some((3, Reference::Back(12))));
        assert_eq!(reference_at("$ x"), None);
        assert_eq!(reference_at("${open"), None);
    }

    #[test]
    fn inline_spans_balance() {
        assert_eq!(inline_at("[[d6]]+1"), Some(6));
        assert_eq!(inline_at("[[ [[d4]]d6 ]]x"), Some(14));
        assert_eq!(inline_at("[[d6"), None);
        assert_eq!(innermost_inline("[[ [[d4]]d6 ]]"), Some(3..9));
        assert_eq!(innermost_inline("a]] [[d6]]"), Some(4..10));
        assert_eq!(innermost_inline("a]] b"), None);
    }

    #[test]
    fn split_roll_and_description() {
        assert_eq!(split_expression("d100 侦察"), ("d100", "侦察"));
        assert_eq!(split_expression("3d6+2力量"), ("3d6+2", "力量"));
        assert_eq!(split_expression("侦察50"), ("", "侦察50"));
    }

    #[test]
    fn split_stops_before_second_operand() {
        assert_eq!(split_expression("d100 50"), ("d100", "50"));
    }

    #[test]
    fn split_leaves_dangling_operator() {
        assert_eq!(split_expression("d20+ 攻击"), ("d20", "+ 攻击"));
        assert_eq!(split_expression("(d20+5 攻击"), ("", "(d20+5 攻击"));
    }

    #[test]
    fn split_keeps_references_and_inline_rolls() {
        assert_eq!(split_expression("1d8+$strmod 长剑"), ("1d8+$strmod", "长剑"));
        assert_eq!(
            split_expression("[[d10]]d10+[[$1+1]]d6 混合"),
            ("[[d10]]d10+[[$1+1]]d6", "混合")
        );
    }

    #[test]
    fn split_does_not_read_words_as_dice() {
        assert_eq!(split_expression("dex"), ("", "dex"));
        assert_eq!(split_expression("d20hide"), ("d20", "hide"));
    }

    #[test]
    fn split_parenthesized() {
        assert_eq!(split_expression("(1d6+2)*2 伤害"), ("(1d6+2)*2", "伤害"));
    }
}
