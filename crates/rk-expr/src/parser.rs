use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::dice::{BinOp, DiceExpr};
use crate::error::{ExprError, ExprResult};
use crate::lexer::{self, Token};
use crate::predicate::{Ast, BinaryOp, UnaryOp};

type Span = SimpleSpan;
type Extra<'a> = extra::Err<Rich<'a, Token>>;

/// Parse error with source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Byte range of the offending input.
    pub span: std::ops::Range<usize>,
    /// Human-readable description.
    pub message: String,
}

/// Dice grammar: sums of products of optionally negated atoms.
fn dice_parser<'a, I>() -> impl Parser<'a, I, DiceExpr, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = Span>,
{
    recursive(|expr| {
        let atom = choice((
            select! {
                Token::Int(n) => DiceExpr::Int(n),
                Token::Dice(d) => DiceExpr::Dice(d),
            },
            expr.delimited_by(just(Token::LParen), just(Token::RParen))
                .map(|e| DiceExpr::Group(Box::new(e))),
        ))
        .labelled("number or dice");

        let unary = choice((just(Token::Minus).to(true), just(Token::Plus).to(false)))
            .repeated()
            .foldr(atom, |neg, rhs| {
                if neg {
                    DiceExpr::Neg(Box::new(rhs))
                } else {
                    rhs
                }
            });

        let product = unary.clone().foldl(
            choice((
                just(Token::Star).to(BinOp::Mul),
                just(Token::Slash).to(BinOp::Div),
            ))
            .then(unary)
            .repeated(),
            |lhs, (op, rhs)| DiceExpr::Binary(Box::new(lhs), op, Box::new(rhs)),
        );

        product.clone().foldl(
            choice((
                just(Token::Plus).to(BinOp::Add),
                just(Token::Minus).to(BinOp::Sub),
            ))
            .then(product)
            .repeated(),
            |lhs, (op, rhs)| DiceExpr::Binary(Box::new(lhs), op, Box::new(rhs)),
        )
    })
    .then_ignore(end())
}

/// One left-associative precedence level.
fn level<'a, I, P, O>(operand: P, ops: O) -> impl Parser<'a, I, Ast, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = Span>,
    P: Parser<'a, I, Ast, Extra<'a>> + Clone,
    O: Parser<'a, I, BinaryOp, Extra<'a>> + Clone,
{
    operand.clone().foldl(ops.then(operand).repeated(), |lhs, (op, rhs)| {
        Ast::Binary(op, Box::new(lhs), Box::new(rhs))
    })
}

/// Predicate grammar, loosest to tightest: `||`, `&&`, equality,
/// comparison, `+ -`, `* / %`, unary `! -`.
fn predicate_parser<'a, I>() -> impl Parser<'a, I, Ast, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = Span>,
{
    recursive(|expr| {
        let atom = choice((
            select! {
                Token::Int(n) => Ast::Num(n),
                Token::Ident(w) => Ast::Ident(w),
            },
            expr.delimited_by(just(Token::LParen), just(Token::RParen)),
        ))
        .labelled("value");

        let unary = choice((
            just(Token::Minus).to(UnaryOp::Neg),
            just(Token::Bang).to(UnaryOp::Not),
        ))
        .repeated()
        .foldr(atom, |op, rhs| Ast::Unary(op, Box::new(rhs)));

        let product = level(
            unary,
            choice((
                just(Token::Star).to(BinaryOp::Mul),
                just(Token::Slash).to(BinaryOp::Div),
                just(Token::Percent).to(BinaryOp::Rem),
            )),
        );
        let sum = level(
            product,
            choice((
                just(Token::Plus).to(BinaryOp::Add),
                just(Token::Minus).to(BinaryOp::Sub),
            )),
        );
        let compare = level(
            sum,
            choice((
                just(Token::Le).to(BinaryOp::Le),
                just(Token::Lt).to(BinaryOp::Lt),
                just(Token::Ge).to(BinaryOp::Ge),
                just(Token::Gt).to(BinaryOp::Gt),
            )),
        );
        let equality = level(
            compare,
            choice((
                just(Token::EqEqEq).to(BinaryOp::StrictEq),
                just(Token::NotEqEq).to(BinaryOp::StrictNe),
                just(Token::EqEq).to(BinaryOp::Eq),
                just(Token::NotEq).to(BinaryOp::Ne),
            )),
        );
        let and = level(equality, just(Token::AndAnd).to(BinaryOp::And));
        level(and, just(Token::OrOr).to(BinaryOp::Or))
    })
    .then_ignore(end())
}

/// Lex `text`, turning any lexer error into a parse failure.
fn lex_checked(text: &str) -> ExprResult<Vec<(Token, std::ops::Range<usize>)>> {
    let (tokens, lex_errors) = lexer::lex(text);
    if lex_errors.is_empty() {
        return Ok(tokens);
    }
    Err(ExprError::Parse {
        text: text.to_string(),
        errors: lex_errors
            .into_iter()
            .map(|e| ParseError {
                span: e.span,
                message: e.message,
            })
            .collect(),
    })
}

fn finish<T>(text: &str, output: Option<T>, errors: Vec<Rich<'_, Token>>) -> ExprResult<T> {
    if let Some(out) = output
        && errors.is_empty()
    {
        return Ok(out);
    }
    Err(ExprError::Parse {
        text: text.to_string(),
        errors: errors
            .into_iter()
            .map(|e| {
                let span = e.span();
                ParseError {
                    span: span.into_range(),
                    message: e.to_string(),
                }
            })
            .collect(),
    })
}

/// Parse a dice expression.
pub fn parse_dice(text: &str) -> ExprResult<DiceExpr> {
    let tokens = lex_checked(text)?;
    let token_iter = tokens
        .iter()
        .map(|(tok, span)| (tok.clone(), Span::from(span.clone())));

    let eoi: Span = (text.len()..text.len()).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let (output, errors) = dice_parser().parse(stream).into_output_errors();
    finish(text, output, errors)
}

/// Parse a predicate into its syntax tree.
pub(crate) fn parse_predicate(text: &str) -> ExprResult<Ast> {
    let tokens = lex_checked(text)?;
    let token_iter = tokens
        .iter()
        .map(|(tok, span)| (tok.clone(), Span::from(span.clone())));

    let eoi: Span = (text.len()..text.len()).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let (output, errors) = predicate_parser().parse(stream).into_output_errors();
    finish(text, output, errors)
}
