use logos::Logos;
use std::fmt;

use crate::dice::DiceTerm;

/// Token type shared by dice expressions and predicates.
///
/// The lexer does not know which language it is reading. Identifiers are only
/// meaningful to the predicate parser and dice terms only to the dice parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer literal.
    Int(i64),
    /// A dice term such as `2d6`, `d%`, `4dF` or `4d6kh3`.
    Dice(DiceTerm),
    /// Bare identifier (variable or keyword).
    Ident(String),
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `==`
    EqEq,
    /// `===`
    EqEqEq,
    /// `!=`
    NotEq,
    /// `!==`
    NotEqEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(n) => write!(f, "{n}"),
            Token::Dice(d) => write!(f, "{d}"),
            Token::Ident(w) => write!(f, "{w}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::EqEq => write!(f, "=="),
            Token::EqEqEq => write!(f, "==="),
            Token::NotEq => write!(f, "!="),
            Token::NotEqEq => write!(f, "!=="),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Bang => write!(f, "!"),
        }
    }
}

/// Internal logos token. Converted to owned `Token` after lexing.
#[derive(Logos, Debug)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("==")]
    EqEq,

    #[token("===")]
    EqEqEq,

    #[token("!=")]
    NotEq,

    #[token("!==")]
    NotEqEq,

    #[token("<")]
    Lt,

    #[token("<=")]
    Le,

    #[token(">")]
    Gt,

    #[token(">=")]
    Ge,

    #[token("&&")]
    AndAnd,

    #[token("||")]
    OrOr,

    #[token("!")]
    Bang,

    #[regex(r"[0-9]*[dD]([0-9]+|%|F)([kK][hHlL]?[0-9]*)?", priority = 5)]
    Dice,

    #[regex(r"[0-9]+")]
    Int,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

/// A lexer error with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    /// Byte range of the erroneous input in the source.
    pub span: std::ops::Range<usize>,
    /// Human-readable description of the lexer error.
    pub message: String,
}

/// Lex source text into a sequence of `(Token, Span)` pairs.
///
/// Lexing continues past errors so every problem can be reported at once.
pub fn lex(source: &str) -> (Vec<(Token, std::ops::Range<usize>)>, Vec<LexError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let token = match result {
            Ok(RawToken::Plus) => Token::Plus,
            Ok(RawToken::Minus) => Token::Minus,
            Ok(RawToken::Star) => Token::Star,
            Ok(RawToken::Slash) => Token::Slash,
            Ok(RawToken::Percent) => Token::Percent,
            Ok(RawToken::LParen) => Token::LParen,
            Ok(RawToken::RParen) => Token::RParen,
            Ok(RawToken::EqEq) => Token::EqEq,
            Ok(RawToken::EqEqEq) => Token::EqEqEq,
            Ok(RawToken::NotEq) => Token::NotEq,
            Ok(RawToken::NotEqEq) => Token::NotEqEq,
            Ok(RawToken::Lt) => Token::Lt,
            Ok(RawToken::Le) => Token::Le,
            Ok(RawToken::Gt) => Token::Gt,
            Ok(RawToken::Ge) => Token::Ge,
            Ok(RawToken::AndAnd) => Token::AndAnd,
            Ok(RawToken::OrOr) => Token::OrOr,
            Ok(RawToken::Bang) => Token::Bang,
            Ok(RawToken::Dice) => match DiceTerm::parse(lexer.slice()) {
                Some(term) => Token::Dice(term),
                None => {
                    errors.push(LexError {
                        span: span.clone(),
                        message: format!("invalid dice term: {}", lexer.slice()),
                    });
                    continue;
                }
            },
            Ok(RawToken::Int) => match lexer.slice().parse::<i64>() {
                Ok(n) => Token::Int(n),
                Err(_) => {
                    errors.push(LexError {
                        span: span.clone(),
                        message: format!("integer out of range: {}", lexer.slice()),
                    });
                    continue;
                }
            },
            Ok(RawToken::Ident) => Token::Ident(lexer.slice().to_string()),
            Err(()) => {
                errors.push(LexError {
                    span: span.clone(),
                    message: format!("unexpected character: {:?}", &source[span.clone()]),
                });
                continue;
            }
        };
        tokens.push((token, span));
    }

    (tokens, errors)
}
