use ariadne::{Color, Label, Report, ReportKind, Source};
use std::fmt;

use crate::error::ExprError;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The input is rejected.
    Error,
    /// The input is accepted but part of it is ignored.
    Warning,
}

/// A diagnostic message with source location.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// How serious the problem is.
    pub severity: Severity,
    /// Byte range in the source text.
    pub span: std::ops::Range<usize>,
    /// Headline message.
    pub message: String,
    /// Optional text attached to the highlighted span.
    pub label: Option<String>,
}

impl Diagnostic {
    /// An error diagnostic.
    pub fn error(span: std::ops::Range<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            span,
            message: message.into(),
            label: None,
        }
    }

    /// A warning diagnostic.
    pub fn warning(span: std::ops::Range<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            span,
            message: message.into(),
            label: None,
        }
    }

    /// Attach a label to the highlighted span.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Diagnostics for an expression error. Parse errors keep their spans;
    /// evaluation errors cover the whole source.
    pub fn from_error(source: &str, err: &ExprError) -> Vec<Self> {
        match err {
            ExprError::Parse { errors, .. } => errors
                .iter()
                .map(|e| Self::error(e.span.clone(), "cannot parse expression").with_label(&e.message))
                .collect(),
            other => vec![Self::error(0..source.len(), other.to_string())],
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{prefix}: {}", self.message)
    }
}

/// Render diagnostics using ariadne for pretty terminal output.
pub fn render_diagnostics(source: &str, name: &str, diagnostics: &[Diagnostic]) -> String {
    let mut output = Vec::new();

    for diag in diagnostics {
        let kind = match diag.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };
        let color = match diag.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let span = (name, diag.span.clone());
        let label_text = diag.label.as_deref().unwrap_or(&diag.message);
        Report::build(kind, span)
            .with_message(&diag.message)
            .with_label(
                Label::new((name, diag.span.clone()))
                    .with_message(label_text)
                    .with_color(color),
            )
            .finish()
            .write((name, Source::from(source)), &mut output)
            .ok();
    }

    String::from_utf8(output).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::DiceExpr;

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic::warning(0..5, "rule dropped");
        assert_eq!(d.to_string(), "warning: rule dropped");
    }

    #[test]
    fn parse_errors_keep_spans() {
        let err = DiceExpr::parse("2d6 + * 3").unwrap_err();
        let diags = Diagnostic::from_error("2d6 + * 3", &err);
        assert!(!diags.is_empty());
        assert_eq!(diags[0].span, 6..7);
    }

    #[test]
    fn render_produces_output() {
        let source = "roll <= baseValue /";
        let diags = vec![Diagnostic::error(18..19, "dangling operator").with_label("needs a right operand")];
        let output = render_diagnostics(source, "tiers[0]", &diags);
        assert!(output.contains("dangling operator"));
    }
}
