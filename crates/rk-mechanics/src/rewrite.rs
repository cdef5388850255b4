//! Alias rules: user-defined rewrites applied to commands and roll
//! expressions before anything else reads them.
//!
//! Rules are rewritten to a fixpoint. Each pass tries the rules in order and
//! applies the first one that matches, then starts over on the new text.
//! Rewriting stops when a pass matches nothing, or fails once the number of
//! rewrites passes [`MAX_DEPTH`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::{MechError, MechResult};
use crate::template::MAX_DEPTH;

/// Which text a rule rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleScope {
    /// The roll expression at the front of a command's arguments.
    Expression,
    /// The whole command line.
    Command,
}

/// How a rule recognizes its input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// Literal text at the start.
    Prefix(String),
    /// Literal text with `{{name}}` / `{{name=default}}` number captures,
    /// anchored at the start.
    Pattern(String),
    /// A regular expression. Anchored at the start for expression rules,
    /// first match anywhere for command rules.
    Regex(String),
}

/// A rule as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Identifier used in logs.
    pub id: String,
    /// What the rule rewrites.
    pub scope: RuleScope,
    /// What the rule matches.
    pub trigger: Trigger,
    /// Replacement template; `{{name}}` inserts a capture.
    pub replacement: String,
}

/// Function form of a replacement, for rules built in code.
pub type ReplaceFn = Arc<dyn Fn(&Captures<'_>) -> String + Send + Sync>;

/// What a match is replaced with.
#[derive(Clone)]
pub enum Replacement {
    /// Text with `{{name}}` placeholders filled from the captures.
    Template(String),
    /// Arbitrary function of the captures.
    Function(ReplaceFn),
}

impl fmt::Debug for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template(t) => f.debug_tuple("Template").field(t).finish(),
            Self::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// A compiled alias rule.
#[derive(Debug, Clone)]
pub struct AliasRule {
    id: String,
    scope: RuleScope,
    matcher: Regex,
    defaults: HashMap<String, String>,
    replacement: Replacement,
}

impl AliasRule {
    /// Compile a configured rule.
    pub fn compile(spec: &RuleSpec) -> MechResult<Self> {
        let (source, defaults) = match &spec.trigger {
            Trigger::Prefix(p) => (format!("^{}", regex::escape(p)), HashMap::new()),
            Trigger::Pattern(p) => compile_pattern(&spec.id, p)?,
            Trigger::Regex(r) => match spec.scope {
                RuleScope::Expression => (format!("^(?:{r})"), HashMap::new()),
                RuleScope::Command => (r.clone(), HashMap::new()),
            },
        };
        Self::build(
            &spec.id,
            spec.scope,
            &source,
            defaults,
            Replacement::Template(spec.replacement.clone()),
        )
    }

    /// A rule whose replacement is computed from the regex captures.
    pub fn function(
        id: &str,
        scope: RuleScope,
        regex: &str,
        replace: impl Fn(&Captures<'_>) -> String + Send + Sync + 'static,
    ) -> MechResult<Self> {
        Self::build(id, scope, regex, HashMap::new(), Replacement::Function(Arc::new(replace)))
    }

    fn build(
        id: &str,
        scope: RuleScope,
        source: &str,
        defaults: HashMap<String, String>,
        replacement: Replacement,
    ) -> MechResult<Self> {
        let matcher = Regex::new(source).map_err(|e| MechError::InvalidRule(format!("{id}: {e}")))?;
        if matcher.is_match("") {
            return Err(MechError::InvalidRule(format!("{id}: matches empty input")));
        }
        Ok(Self {
            id: id.to_string(),
            scope,
            matcher,
            defaults,
            replacement,
        })
    }

    /// The rule's identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// What the rule rewrites.
    pub fn scope(&self) -> RuleScope {
        self.scope
    }

    /// Rewrite `text` once, or `None` if the rule does not match.
    pub fn apply(&self, text: &str) -> Option<String> {
        let caps = self.matcher.captures(text)?;
        let whole = caps.get(0)?;
        let replaced = match &self.replacement {
            Replacement::Template(t) => render(t, &caps, &self.defaults),
            Replacement::Function(f) => f(&caps),
        };
        Some(format!("{}{}{}", &text[..whole.start()], replaced, &text[whole.end()..]))
    }
}

/// Turn a `{{name}}` pattern into an anchored regex source plus the
/// defaults of its optional captures.
fn compile_pattern(id: &str, pattern: &str) -> MechResult<(String, HashMap<String, String>)> {
    let mut source = String::from("^");
    let mut defaults = HashMap::new();
    let mut rest = pattern;
    while let Some(open) = rest.find("{{") {
        source.push_str(&regex::escape(&rest[..open]));
        let after = &rest[open + 2..];
        let close = after
            .find("}}")
            .ok_or_else(|| MechError::InvalidRule(format!("{id}: unclosed placeholder")))?;
        let placeholder = &after[..close];
        let (name, default) = match placeholder.split_once('=') {
            Some((n, d)) => (n.trim(), Some(d.trim())),
            None => (placeholder.trim(), None),
        };
        if !valid_group_name(name) {
            return Err(MechError::InvalidRule(format!("{id}: bad placeholder '{placeholder}'")));
        }
        match default {
            Some(d) => {
                source.push_str(&format!("(?P<{name}>\\d+)?"));
                defaults.insert(name.to_string(), d.to_string());
            }
            None => source.push_str(&format!("(?P<{name}>\\d+)")),
        }
        rest = &after[close + 2..];
    }
    source.push_str(&regex::escape(rest));
    Ok((source, defaults))
}

fn valid_group_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Fill `{{name}}` placeholders. Captures are inserted as-is.
fn render(template: &str, caps: &Captures<'_>, defaults: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            break;
        };
        out.push_str(&rest[..open]);
        let name = after[..close].trim();
        if let Some(m) = caps.name(name) {
            out.push_str(m.as_str());
        } else if let Some(d) = defaults.get(name) {
            out.push_str(d);
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

/// An ordered set of alias rules, split by scope.
#[derive(Debug, Clone, Default)]
pub struct Rewriter {
    command: Vec<AliasRule>,
    expression: Vec<AliasRule>,
}

impl Rewriter {
    /// Group `rules` by scope, keeping their relative order.
    pub fn new(rules: impl IntoIterator<Item = AliasRule>) -> Self {
        let mut rewriter = Self::default();
        for rule in rules {
            rewriter.push(rule);
        }
        rewriter
    }

    /// Append a rule at the lowest priority of its scope.
    pub fn push(&mut self, rule: AliasRule) {
        match rule.scope {
            RuleScope::Command => self.command.push(rule),
            RuleScope::Expression => self.expression.push(rule),
        }
    }

    /// Number of rules across both scopes.
    pub fn len(&self) -> usize {
        self.command.len() + self.expression.len()
    }

    /// Returns true if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrite a whole command line.
    pub fn rewrite_command(&self, text: &str) -> MechResult<String> {
        fixpoint(&self.command, text)
    }

    /// Rewrite the front of a roll expression.
    pub fn rewrite_expression(&self, text: &str) -> MechResult<String> {
        fixpoint(&self.expression, text)
    }
}

fn fixpoint(rules: &[AliasRule], text: &str) -> MechResult<String> {
    let mut current = text.to_string();
    let mut rewrites = 0;
    loop {
        let Some((id, next)) = rules.iter().find_map(|r| r.apply(&current).map(|t| (r.id(), t))) else {
            return Ok(current);
        };
        rewrites += 1;
        if rewrites > MAX_DEPTH {
            return Err(MechError::ResolutionTooDeep { depth: rewrites });
        }
        tracing::debug!(rule = id, from = %current, to = %next, "alias rewrite");
        current = next;
    }
}

/// Call of Cthulhu bonus and penalty dice: `b[N]` keeps the lowest of N+1
/// d100, `p[N]` the highest.
pub fn coc_rules() -> MechResult<Vec<AliasRule>> {
    Ok(vec![
        AliasRule::function(
            "coc.bonus",
            RuleScope::Expression,
            r"^b(?P<n>\d*)(?P<tail>[^a-z]|$)",
            |caps| extra_dice(caps, "kl1"),
        )?,
        AliasRule::function(
            "coc.penalty",
            RuleScope::Expression,
            r"^p(?P<n>\d*)(?P<tail>[^a-z]|$)",
            |caps| extra_dice(caps, "kh1"),
        )?,
    ])
}

fn extra_dice(caps: &Captures<'_>, keep: &str) -> String {
    let n: u32 = caps
        .name("n")
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(1);
    let tail = caps.name("tail").map_or("", |m| m.as_str());
    format!("{}d100{keep}{tail}", n.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(scope: RuleScope, trigger: Trigger, replacement: &str) -> RuleSpec {
        RuleSpec {
            id: "test".into(),
            scope,
            trigger,
            replacement: replacement.into(),
        }
    }

    #[test]
    fn prefix_rule() {
        let rule = AliasRule::compile(&spec(
            RuleScope::Command,
            Trigger::Prefix("ra".into()),
            "r",
        ))
        .unwrap();
        assert_eq!(rule.apply("ra 侦察").as_deref(), Some("r 侦察"));
        assert_eq!(rule.apply("x ra"), None);
    }

    #[test]
    fn pattern_with_default() {
        let rule = AliasRule::compile(&spec(
            RuleScope::Expression,
            Trigger::Pattern("adv{{n=1}}".into()),
            "{{n}}d20kh1",
        ))
        .unwrap();
        assert_eq!(rule.apply("adv+3").as_deref(), Some("1d20kh1+3"));
        assert_eq!(rule.apply("adv2").as_deref(), Some("2d20kh1"));
    }

    #[test]
    fn pattern_escapes_literals() {
        let rule = AliasRule::compile(&spec(
            RuleScope::Expression,
            Trigger::Pattern("a.b{{n}}".into()),
            "{{n}}",
        ))
        .unwrap();
        assert_eq!(rule.apply("axb3"), None);
        assert_eq!(rule.apply("a.b3").as_deref(), Some("3"));
    }

    #[test]
    fn command_regex_matches_anywhere_without_escaping() {
        let rule = AliasRule::compile(&spec(
            RuleScope::Command,
            Trigger::Regex(r"攻击(?P<w>\S+)".into()),
            "r $${{w}}",
        ))
        .unwrap();
        assert_eq!(rule.apply("先攻击长剑").as_deref(), Some("先r $$长剑"));
    }

    #[test]
    fn expression_regex_is_anchored() {
        let rule = AliasRule::compile(&spec(
            RuleScope::Expression,
            Trigger::Regex("x+".into()),
            "1",
        ))
        .unwrap();
        assert_eq!(rule.apply("axx"), None);
        assert_eq!(rule.apply("xx+2").as_deref(), Some("1+2"));
    }

    #[test]
    fn empty_matchers_are_rejected() {
        let err = AliasRule::compile(&spec(RuleScope::Command, Trigger::Prefix(String::new()), "x")).unwrap_err();
        assert!(matches!(err, MechError::InvalidRule(_)));
        let err = AliasRule::compile(&spec(RuleScope::Command, Trigger::Regex("a*".into()), "x")).unwrap_err();
        assert!(matches!(err, MechError::InvalidRule(_)));
    }

    #[test]
    fn invalid_regex_and_placeholder_are_rejected() {
        assert!(AliasRule::compile(&spec(RuleScope::Command, Trigger::Regex("(".into()), "")).is_err());
        assert!(AliasRule::compile(&spec(RuleScope::Expression, Trigger::Pattern("a{{1x}}".into()), "")).is_err());
        assert!(AliasRule::compile(&spec(RuleScope::Expression, Trigger::Pattern("a{{n".into()), "")).is_err());
    }

    #[test]
    fn fixpoint_chains_rules() {
        let rules = vec![
            AliasRule::compile(&spec(RuleScope::Command, Trigger::Prefix("rx".into()), "ry")).unwrap(),
            AliasRule::compile(&spec(RuleScope::Command, Trigger::Prefix("ry".into()), "rz")).unwrap(),
        ];
        let rw = Rewriter::new(rules);
        assert_eq!(rw.rewrite_command("rx 1").unwrap(), "rz 1");
        assert_eq!(rw.rewrite_expression("rx").unwrap(), "rx");
    }

    #[test]
    fn self_matching_rule_is_too_deep() {
        let rule = AliasRule::compile(&spec(RuleScope::Command, Trigger::Prefix("a".into()), "aa")).unwrap();
        let err = Rewriter::new([rule]).rewrite_command("a").unwrap_err();
        assert!(matches!(err, MechError::ResolutionTooDeep { .. }));
    }

    #[test]
    fn bonus_and_penalty_dice() {
        let rw = Rewriter::new(coc_rules().unwrap());
        assert_eq!(rw.rewrite_expression("b").unwrap(), "2d100kl1");
        assert_eq!(rw.rewrite_expression("b2 侦察").unwrap(), "3d100kl1 侦察");
        assert_eq!(rw.rewrite_expression("p侦察").unwrap(), "2d100kh1侦察");
        assert_eq!(rw.rewrite_expression("bat").unwrap(), "bat");
    }

    proptest::proptest! {
        #[test]
        fn prefix_rules_terminate(text in "[a-c ]{0,12}") {
            let rules = vec![
                AliasRule::compile(&spec(RuleScope::Command, Trigger::Prefix("a".into()), "b")).unwrap(),
                AliasRule::compile(&spec(RuleScope::Command, Trigger::Prefix("b".into()), "c")).unwrap(),
            ];
            let out = Rewriter::new(rules).rewrite_command(&text).unwrap();
            proptest::prop_assert!(!out.starts_with('a') && !out.starts_with('b'));
        }
    }
}
