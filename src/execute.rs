//! Plan executor.
//!
//! Applies a `SplitPlan` case by case. A failing case is recorded in the report
//! and the run moves on to the next one.
use crate::error::CaseError;
use crate::plan::{CaseAction, PlannedCase, SplitPlan};
use crate::report::{
    now_epoch_ms, CaseIssue, SplitReport, TransferMode, REPORT_SCHEMA_VERSION,
};
use crate::tree::{copy_tree_staged, move_tree, CompareMode, TreeSnapshot};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    pub mode: TransferMode,
    pub compare: CompareMode,
    pub dry_run: bool,
}

/// What happened to a case that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseOutcome {
    Materialized,
    /// Destination already holds an identical subtree.
    Identical,
    /// Dry run: would be materialized.
    Pending,
}

/// Apply `plan` and summarize every row.
pub fn execute_plan(plan: &SplitPlan, manifest_path: &Path, options: ExecuteOptions) -> SplitReport {
    let mut report = SplitReport {
        schema_version: REPORT_SCHEMA_VERSION,
        generated_at_epoch_ms: now_epoch_ms(),
        mode: options.mode,
        compare: options.compare,
        dry_run: options.dry_run,
        manifest_path: manifest_path.to_path_buf(),
        case_root: plan.case_root.clone(),
        destination_root: plan.destination_root.clone(),
        counts: BTreeMap::new(),
        missing: Vec::new(),
        already_placed: Vec::new(),
        orphans: plan.orphans.clone(),
        ambiguous: Vec::new(),
        conflicts: Vec::new(),
        failures: Vec::new(),
        blank_rows: plan.blank_rows,
    };

    for case in &plan.cases {
        let counts = report.counts.entry(case.split).or_default();
        counts.planned += 1;
        match &case.action {
            CaseAction::Materialize {
                source,
                destination,
            } => match materialize_case(source, destination, options) {
                Ok(CaseOutcome::Materialized) => {
                    counts.materialized += 1;
                    tracing::info!(
                        case = %case.case_id,
                        split = %case.split,
                        mode = options.mode.as_str(),
                        "materialized"
                    );
                }
                Ok(CaseOutcome::Identical) => {
                    counts.skipped += 1;
                    tracing::debug!(case = %case.case_id, split = %case.split, "identical, skipped");
                }
                Ok(CaseOutcome::Pending) => counts.pending += 1,
                Err(err) => {
                    tracing::warn!(case = %case.case_id, split = %case.split, error = %err, "case failed");
                    if err.is_conflict() {
                        counts.conflicts += 1;
                        report.conflicts.push(issue(case, err.to_string()));
                    } else {
                        counts.failed += 1;
                        report.failures.push(issue(case, err.to_string()));
                    }
                }
            },
            CaseAction::AlreadyPlaced { destination } => {
                counts.skipped += 1;
                tracing::info!(
                    case = %case.case_id,
                    destination = %destination.display(),
                    "source gone, already placed"
                );
                report.already_placed.push(issue(
                    case,
                    format!(
                        "no directory under {}; already at {}",
                        plan.case_root.display(),
                        destination.display()
                    ),
                ));
            }
            CaseAction::Missing => {
                counts.missing += 1;
                tracing::warn!(case = %case.case_id, line = case.line, "case directory missing");
                report.missing.push(issue(
                    case,
                    format!("no directory under {}", plan.case_root.display()),
                ));
            }
            CaseAction::Ambiguous { candidates } => {
                counts.conflicts += 1;
                report.ambiguous.push(issue(
                    case,
                    format!("matches several directories: {}", candidates.join(", ")),
                ));
            }
            CaseAction::WrongSplit { existing } => {
                counts.conflicts += 1;
                for path in existing {
                    let err = CaseError::WrongSplit {
                        existing: path.clone(),
                    };
                    report.conflicts.push(issue(case, err.to_string()));
                }
            }
        }
    }

    for orphan in &report.orphans {
        tracing::debug!(case = %orphan, "not in manifest, left untouched");
    }
    report
}

/// Copy or move one case, honoring idempotence and conflict rules.
pub fn materialize_case(
    source: &Path,
    destination: &Path,
    options: ExecuteOptions,
) -> Result<CaseOutcome, CaseError> {
    if destination.exists() {
        let src = TreeSnapshot::capture(source, options.compare)
            .map_err(|err| CaseError::io("scan", source, err))?;
        let dst = TreeSnapshot::capture(destination, options.compare)
            .map_err(|err| CaseError::io("scan", destination, err))?;
        let differences = src.differences(&dst);
        if differences.is_empty() {
            return Ok(CaseOutcome::Identical);
        }
        return Err(CaseError::Conflict {
            destination: destination.to_path_buf(),
            differences,
        });
    }
    if options.dry_run {
        return Ok(CaseOutcome::Pending);
    }
    match options.mode {
        TransferMode::Copy => copy_tree_staged(source, destination)
            .map_err(|err| CaseError::io("copy", destination, err))?,
        TransferMode::Move => {
            move_tree(source, destination).map_err(|err| CaseError::io("move", destination, err))?
        }
    }
    Ok(CaseOutcome::Materialized)
}

fn issue(case: &PlannedCase, detail: String) -> CaseIssue {
    CaseIssue {
        case_id: case.case_id.clone(),
        split: case.split,
        line: case.line,
        detail,
    }
}
