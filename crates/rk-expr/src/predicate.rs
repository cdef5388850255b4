//! Boolean predicates over a roll.
//!
//! A predicate is compiled once into a flat arena of nodes and evaluated
//! against a [`PredicateContext`] as many times as needed. Evaluation never
//! executes anything but the arena walk.
//!
//! Values are integers or booleans. Arithmetic and ordering need integers;
//! `&&`, `||` and `!` accept either and treat non-zero integers as true.
//! `==` compares across kinds by treating `true` as 1, while `===` requires
//! both sides to be the same kind.

use std::fmt;

use crate::dice::floor_div;
use crate::error::{ExprError, ExprResult};
use crate::parser;

/// The inputs a predicate can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PredicateContext {
    /// The tested value before any difficulty modifier.
    pub base_value: i64,
    /// The value the roll must beat, after difficulty.
    pub target_value: i64,
    /// The rolled total.
    pub roll: i64,
}

/// A predicate variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Var {
    /// `baseValue`
    BaseValue,
    /// `targetValue`
    TargetValue,
    /// `roll`
    Roll,
}

impl Var {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "basevalue" => Some(Self::BaseValue),
            "targetvalue" => Some(Self::TargetValue),
            "roll" => Some(Self::Roll),
            _ => None,
        }
    }

    fn read(self, ctx: &PredicateContext) -> i64 {
        match self {
            Self::BaseValue => ctx.base_value,
            Self::TargetValue => ctx.target_value,
            Self::Roll => ctx.roll,
        }
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-`
    Neg,
    /// `!`
    Not,
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`, floored.
    Div,
    /// `%`, sign follows the divisor.
    Rem,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNe,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::StrictEq => "===",
            Self::StrictNe => "!==",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

/// Syntax tree produced by the parser, before lowering into the arena.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Ast {
    Num(i64),
    Ident(String),
    Unary(UnaryOp, Box<Ast>),
    Binary(BinaryOp, Box<Ast>, Box<Ast>),
}

/// Index of a node in a predicate's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(u32);

/// One arena node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Integer literal.
    Num(i64),
    /// Boolean literal.
    Bool(bool),
    /// Variable read.
    Var(Var),
    /// Prefix operation.
    Unary(UnaryOp, NodeId),
    /// Infix operation.
    Binary(BinaryOp, NodeId, NodeId),
}

/// A predicate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// Integer.
    Num(i64),
    /// Boolean.
    Bool(bool),
}

impl Value {
    /// Truthiness: non-zero integers and `true`.
    pub fn truthy(self) -> bool {
        match self {
            Self::Num(n) => n != 0,
            Self::Bool(b) => b,
        }
    }

    fn loose(self) -> i64 {
        match self {
            Self::Num(n) => n,
            Self::Bool(b) => i64::from(b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A compiled predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    source: String,
    nodes: Vec<Node>,
    root: NodeId,
}

impl Predicate {
    /// Parse and lower `source`. Unknown identifiers are rejected here rather
    /// than at evaluation time.
    pub fn compile(source: &str) -> ExprResult<Self> {
        let ast = parser::parse_predicate(source)?;
        let mut nodes = Vec::new();
        let root = lower(&ast, &mut nodes)?;
        Ok(Self {
            source: source.to_string(),
            nodes,
            root,
        })
    }

    /// The source text this predicate was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The arena, in post-order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Evaluate to a value.
    pub fn eval(&self, ctx: &PredicateContext) -> ExprResult<Value> {
        self.eval_node(self.root, ctx)
    }

    /// Evaluate and take the truthiness of the result.
    pub fn test(&self, ctx: &PredicateContext) -> ExprResult<bool> {
        Ok(self.eval(ctx)?.truthy())
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    fn eval_node(&self, id: NodeId, ctx: &PredicateContext) -> ExprResult<Value> {
        match *self.node(id) {
            Node::Num(n) => Ok(Value::Num(n)),
            Node::Bool(b) => Ok(Value::Bool(b)),
            Node::Var(v) => Ok(Value::Num(v.read(ctx))),
            Node::Unary(UnaryOp::Not, operand) => Ok(Value::Bool(!self.eval_node(operand, ctx)?.truthy())),
            Node::Unary(UnaryOp::Neg, operand) => {
                let n = number(self.eval_node(operand, ctx)?, "-")?;
                Ok(Value::Num(n.checked_neg().ok_or(ExprError::Overflow)?))
            }
            Node::Binary(BinaryOp::And, lhs, rhs) => {
                let l = self.eval_node(lhs, ctx)?.truthy();
                Ok(Value::Bool(l && self.eval_node(rhs, ctx)?.truthy()))
            }
            Node::Binary(BinaryOp::Or, lhs, rhs) => {
                let l = self.eval_node(lhs, ctx)?.truthy();
                Ok(Value::Bool(l || self.eval_node(rhs, ctx)?.truthy()))
            }
            Node::Binary(op, lhs, rhs) => {
                let l = self.eval_node(lhs, ctx)?;
                let r = self.eval_node(rhs, ctx)?;
                binary(op, l, r)
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn lower(ast: &Ast, nodes: &mut Vec<Node>) -> ExprResult<NodeId> {
    let node = match ast {
        Ast::Num(n) => Node::Num(*n),
        Ast::Ident(name) => match name.as_str() {
            "true" => Node::Bool(true),
            "false" => Node::Bool(false),
            _ => Node::Var(Var::from_name(name).ok_or_else(|| ExprError::UnknownVariable(name.clone()))?),
        },
        Ast::Unary(op, operand) => Node::Unary(*op, lower(operand, nodes)?),
        Ast::Binary(op, lhs, rhs) => {
            let l = lower(lhs, nodes)?;
            let r = lower(rhs, nodes)?;
            Node::Binary(*op, l, r)
        }
    };
    let id = u32::try_from(nodes.len()).map_err(|_| ExprError::Overflow)?;
    nodes.push(node);
    Ok(NodeId(id))
}

fn number(v: Value, op: &'static str) -> ExprResult<i64> {
    match v {
        Value::Num(n) => Ok(n),
        Value::Bool(_) => Err(ExprError::TypeMismatch {
            op,
            expected: "numbers",
        }),
    }
}

fn binary(op: BinaryOp, l: Value, r: Value) -> ExprResult<Value> {
    let sym = op.symbol();
    let nums = || Ok::<_, ExprError>((number(l, sym)?, number(r, sym)?));
    let v = match op {
        BinaryOp::Eq => Value::Bool(l.loose() == r.loose()),
        BinaryOp::Ne => Value::Bool(l.loose() != r.loose()),
        BinaryOp::StrictEq => Value::Bool(l == r),
        BinaryOp::StrictNe => Value::Bool(l != r),
        BinaryOp::And => Value::Bool(l.truthy() && r.truthy()),
        BinaryOp::Or => Value::Bool(l.truthy() || r.truthy()),
        BinaryOp::Add => {
            let (a, b) = nums()?;
            Value::Num(a.checked_add(b).ok_or(ExprError::Overflow)?)
        }
        BinaryOp::Sub => {
            let (a, b) = nums()?;
            Value::Num(a.checked_sub(b).ok_or(ExprError::Overflow)?)
        }
        BinaryOp::Mul => {
            let (a, b) = nums()?;
            Value::Num(a.checked_mul(b).ok_or(ExprError::Overflow)?)
        }
        BinaryOp::Div => {
            let (a, b) = nums()?;
            Value::Num(floor_div(a, b)?)
        }
        BinaryOp::Rem => {
            let (a, b) = nums()?;
            let q = floor_div(a, b)?;
            Value::Num(a - q * b)
        }
        BinaryOp::Lt => {
            let (a, b) = nums()?;
            Value::Bool(a < b)
        }
        BinaryOp::Le => {
            let (a, b) = nums()?;
            Value::Bool(a <= b)
        }
        BinaryOp::Gt => {
            let (a, b) = nums()?;
            Value::Bool(a > b)
        }
        BinaryOp::Ge => {
            let (a, b) = nums()?;
            Value::Bool(a >= b)
        }
    };
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ctx(base: i64, target: i64, roll: i64) -> PredicateContext {
        PredicateContext {
            base_value: base,
            target_value: target,
            roll,
        }
    }

    fn test(src: &str, c: PredicateContext) -> bool {
        Predicate::compile(src).unwrap().test(&c).unwrap()
    }

    #[test]
    fn coc_fumble_rule() {
        let src = "roll == 100 || (baseValue < 50 && roll > 95)";
        assert!(test(src, ctx(40, 40, 96)));
        assert!(!test(src, ctx(60, 60, 96)));
        assert!(test(src, ctx(60, 60, 100)));
    }

    #[test]
    fn hard_success_rule() {
        assert!(test("roll <= baseValue / 2", ctx(45, 45, 22)));
        assert!(!test("roll <= baseValue / 2", ctx(45, 45, 23)));
    }

    #[test]
    fn arena_is_post_order() {
        let p = Predicate::compile("roll < 5").unwrap();
        assert_eq!(p.nodes().len(), 3);
        assert_eq!(p.nodes()[0], Node::Var(Var::Roll));
        assert!(matches!(p.nodes()[2], Node::Binary(BinaryOp::Lt, NodeId(0), NodeId(1))));
    }

    #[test]
    fn unknown_variable_rejected_at_compile() {
        assert_eq!(
            Predicate::compile("luck > 3"),
            Err(ExprError::UnknownVariable("luck".to_string()))
        );
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let p = Predicate::compile("roll / 0 > 1").unwrap();
        assert_eq!(p.test(&ctx(0, 0, 5)), Err(ExprError::DivisionByZero));
    }

    #[test]
    fn bool_arithmetic_is_type_mismatch() {
        let p = Predicate::compile("true + 1").unwrap();
        assert!(matches!(p.eval(&ctx(0, 0, 0)), Err(ExprError::TypeMismatch { op: "+", .. })));
    }

    #[test]
    fn strict_and_loose_equality() {
        assert!(test("(roll == 1) == 1", ctx(0, 0, 1)));
        assert!(!test("(roll == 1) === 1", ctx(0, 0, 1)));
        assert!(test("(roll == 1) === true", ctx(0, 0, 1)));
    }

    #[test]
    fn short_circuit_skips_errors() {
        assert!(test("true || 1 / 0", ctx(0, 0, 0)));
        assert!(!test("false && 1 / 0", ctx(0, 0, 0)));
    }

    #[test]
    fn numbers_are_truthy() {
        assert!(test("roll", ctx(0, 0, 3)));
        assert!(!test("roll - 3", ctx(0, 0, 3)));
        assert!(test("!0", ctx(0, 0, 0)));
    }

    #[test]
    fn remainder_follows_divisor_sign() {
        let p = Predicate::compile("roll % 10").unwrap();
        assert_eq!(p.eval(&ctx(0, 0, -3)).unwrap(), Value::Num(7));
    }

    #[test]
    fn variables_are_case_insensitive() {
        assert!(test("BaseValue == 5", ctx(5, 0, 0)));
    }

    proptest! {
        #[test]
        fn arithmetic_matches_integers(a in -1000i64..1000, b in 1i64..1000) {
            let sum = Predicate::compile("roll + baseValue").unwrap();
            prop_assert_eq!(sum.eval(&ctx(b, 0, a)).unwrap(), Value::Num(a + b));
            let quot = Predicate::compile("roll / baseValue").unwrap();
            prop_assert_eq!(quot.eval(&ctx(b, 0, a)).unwrap(), Value::Num(a.div_euclid(b)));
            let cmp = Predicate::compile("roll <= baseValue").unwrap();
            prop_assert_eq!(cmp.test(&ctx(b, 0, a)).unwrap(), a <= b);
        }
    }
}
