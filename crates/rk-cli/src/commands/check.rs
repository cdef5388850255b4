use std::path::Path;

use rk_bot::{BotError, ConfigProblem};
use rk_expr::{Diagnostic, ExprError, render_diagnostics};
use rk_mechanics::MechError;

pub fn run(path: &Path) -> Result<(), String> {
    let config = super::load_config(Some(path))?;
    let problems = config.problems();

    if problems.is_empty() {
        let dispatcher = config.compile();
        println!("  Configuration OK: {}", path.display());
        println!(
            "  system {}, {} alias rule{}",
            config.system,
            dispatcher.rewriter().len(),
            if dispatcher.rewriter().len() == 1 { "" } else { "s" },
        );
        return Ok(());
    }

    for problem in &problems {
        report(problem);
    }
    Err(format!(
        "{} problem{} in {}",
        problems.len(),
        if problems.len() == 1 { "" } else { "s" },
        path.display()
    ))
}

/// The expression error behind a problem, if it has one.
fn expression_error(error: &BotError) -> Option<&ExprError> {
    match error {
        BotError::Mechanics(MechError::PredicateEvaluationFailed { cause, .. }) => Some(cause),
        BotError::Mechanics(MechError::UnparseableExpression(e)) => Some(e),
        _ => None,
    }
}

/// Print a problem to stderr, with source spans for expression errors.
fn report(problem: &ConfigProblem) {
    match expression_error(&problem.error) {
        Some(err) => {
            let diagnostics = Diagnostic::from_error(&problem.text, err);
            eprint!("{}", render_diagnostics(&problem.text, &problem.location, &diagnostics));
        }
        None => eprintln!("  {}: {}", problem.location, problem.error),
    }
}
