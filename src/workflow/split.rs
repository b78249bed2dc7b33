//! Workflow plan and split steps.
//!
//! `plan` is `split --dry-run` under another name; both print the same report.
use super::SplitContext;
use crate::cli::{PlanArgs, SplitArgs, SplitInputs};
use anyhow::{anyhow, Result};
use medsplit::report::write_report;
use medsplit::SplitReport;

/// Run validation and planning without touching the destination.
pub(crate) fn run_plan(args: &PlanArgs) -> Result<()> {
    let ctx = SplitContext::load(&args.inputs, None, true)?;
    execute(&ctx, &args.inputs)
}

/// Run validation and materialize the split tree.
pub(crate) fn run_split(args: &SplitArgs) -> Result<()> {
    let ctx = SplitContext::load(&args.inputs, args.mode, args.dry_run)?;
    execute(&ctx, &args.inputs)
}

fn execute(ctx: &SplitContext, inputs: &SplitInputs) -> Result<()> {
    tracing::debug!(config = ?ctx.config, "resolved split config");
    let report = medsplit::run(&ctx.request)?;
    emit(&report, inputs)?;
    if report.has_errors() {
        return Err(anyhow!(
            "split finished with {} conflict(s), {} ambiguous id(s), and {} failure(s)",
            report.conflicts.len(),
            report.ambiguous.len(),
            report.failures.len()
        ));
    }
    Ok(())
}

fn emit(report: &SplitReport, inputs: &SplitInputs) -> Result<()> {
    if let Some(path) = inputs.report.as_deref() {
        write_report(path, report)?;
        tracing::info!(path = %path.display(), "wrote report");
    }
    if inputs.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}
