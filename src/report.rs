//! Split summary report.
//!
//! The report is the only output of a run besides the split tree itself. It is
//! printed for humans or written as pretty JSON for tooling.
use crate::manifest::Split;
use crate::tree::CompareMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current schema version for split reports.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Whether cases are copied or moved into the split tree.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    #[default]
    Copy,
    Move,
}

impl TransferMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferMode::Copy => "copy",
            TransferMode::Move => "move",
        }
    }
}

/// Per-split tallies.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SplitCounts {
    /// Manifest rows assigned to the split.
    pub planned: usize,
    pub materialized: usize,
    /// Already present and identical, or already moved by an earlier run.
    pub skipped: usize,
    /// Would be materialized; only set by dry runs.
    pub pending: usize,
    pub missing: usize,
    pub conflicts: usize,
    pub failed: usize,
}

/// A manifest row that could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseIssue {
    pub case_id: String,
    pub split: Split,
    pub line: u64,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SplitReport {
    pub schema_version: u32,
    pub generated_at_epoch_ms: u128,
    pub mode: TransferMode,
    pub compare: CompareMode,
    pub dry_run: bool,
    pub manifest_path: PathBuf,
    pub case_root: PathBuf,
    pub destination_root: PathBuf,
    pub counts: BTreeMap<Split, SplitCounts>,
    pub missing: Vec<CaseIssue>,
    /// Move reruns: source already gone, destination already in its split.
    pub already_placed: Vec<CaseIssue>,
    pub orphans: Vec<String>,
    pub ambiguous: Vec<CaseIssue>,
    pub conflicts: Vec<CaseIssue>,
    pub failures: Vec<CaseIssue>,
    pub blank_rows: usize,
}

impl SplitReport {
    /// Conflicts or I/O failures were recorded.
    pub fn has_errors(&self) -> bool {
        !self.conflicts.is_empty() || !self.failures.is_empty() || !self.ambiguous.is_empty()
    }

    /// Nothing to warn about at all.
    pub fn is_clean(&self) -> bool {
        !self.has_errors() && self.missing.is_empty() && self.orphans.is_empty()
    }

    pub fn counts_for(&self, split: Split) -> SplitCounts {
        self.counts.get(&split).cloned().unwrap_or_default()
    }

    /// Plain-text summary for terminal output.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let verb = if self.dry_run { "plan" } else { self.mode.as_str() };
        let _ = writeln!(
            out,
            "{verb}: {} -> {}",
            self.case_root.display(),
            self.destination_root.display()
        );
        for split in Split::ALL {
            let counts = self.counts_for(split);
            let _ = write!(
                out,
                "  {:<10} planned {:>4}  done {:>4}  skipped {:>4}",
                split.as_str(),
                counts.planned,
                counts.materialized,
                counts.skipped
            );
            if self.dry_run {
                let _ = write!(out, "  pending {:>4}", counts.pending);
            }
            let _ = writeln!(
                out,
                "  missing {:>4}  conflicts {:>4}  failed {:>4}",
                counts.missing, counts.conflicts, counts.failed
            );
        }
        push_issues(&mut out, "missing cases", &self.missing);
        push_issues(&mut out, "already placed by an earlier move", &self.already_placed);
        push_issues(&mut out, "ambiguous ids", &self.ambiguous);
        push_issues(&mut out, "conflicts", &self.conflicts);
        push_issues(&mut out, "failures", &self.failures);
        if !self.orphans.is_empty() {
            let _ = writeln!(
                out,
                "orphans (not in manifest, left untouched): {}",
                self.orphans.join(", ")
            );
        }
        if self.blank_rows > 0 {
            let _ = writeln!(out, "blank manifest rows skipped: {}", self.blank_rows);
        }
        out
    }
}

fn push_issues(out: &mut String, label: &str, issues: &[CaseIssue]) {
    if issues.is_empty() {
        return;
    }
    let _ = writeln!(out, "{label} ({}):", issues.len());
    for issue in issues {
        let _ = writeln!(
            out,
            "  {} [{}] line {}: {}",
            issue.case_id, issue.split, issue.line, issue.detail
        );
    }
}

/// Persist a report as pretty JSON.
pub fn write_report<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(report).context("serialize report")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Current epoch time in milliseconds for report timestamps.
pub fn now_epoch_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or(0)
}
