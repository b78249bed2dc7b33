//! Split planning.
//!
//! `plan_split` is a pure function of the manifest and the scanned indexes:
//! it decides what should happen to every row without touching the disk.
use crate::cases::{CaseIndex, CaseLookup, DestinationIndex};
use crate::manifest::{Manifest, Split};
use crate::report::TransferMode;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Decision for a single manifest row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CaseAction {
    /// Copy or move `source` into `destination`.
    Materialize {
        source: PathBuf,
        destination: PathBuf,
    },
    /// Move mode only: source is gone but the destination for this split
    /// already exists, as after an earlier move run.
    AlreadyPlaced { destination: PathBuf },
    /// No case directory under the root.
    Missing,
    /// Loose matching resolved to several directories.
    Ambiguous { candidates: Vec<String> },
    /// Case already exists under a different split in the destination.
    WrongSplit { existing: Vec<PathBuf> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCase {
    pub case_id: String,
    pub split: Split,
    pub line: u64,
    #[serde(flatten)]
    pub action: CaseAction,
}

/// Full plan for one run.
#[derive(Debug, Clone, Serialize)]
pub struct SplitPlan {
    pub case_root: PathBuf,
    pub destination_root: PathBuf,
    pub cases: Vec<PlannedCase>,
    /// Root directories the manifest never names. Never touched.
    pub orphans: Vec<String>,
    pub blank_rows: usize,
}

impl SplitPlan {
    pub fn materialize_count(&self) -> usize {
        self.cases
            .iter()
            .filter(|case| matches!(case.action, CaseAction::Materialize { .. }))
            .count()
    }

    pub fn missing(&self) -> impl Iterator<Item = &PlannedCase> {
        self.cases
            .iter()
            .filter(|case| matches!(case.action, CaseAction::Missing))
    }
}

/// Destination directory for a case.
pub fn destination_for(destination_root: &Path, split: Split, case_id: &str) -> PathBuf {
    destination_root.join(split.as_str()).join(case_id)
}

/// Decide the action for every manifest row.
///
/// Cases land under the manifest id, not the matched directory name, so loose
/// matching still yields the ids the manifest uses. Copy mode never empties
/// the root, so there a vanished source is always `Missing`.
pub fn plan_split(
    manifest: &Manifest,
    cases: &CaseIndex,
    placed: &DestinationIndex,
    mode: TransferMode,
) -> SplitPlan {
    let match_mode = manifest.match_mode;
    let destination_root = placed.root();
    let mut claimed = BTreeSet::new();
    let mut planned = Vec::with_capacity(manifest.rows.len());

    for row in &manifest.rows {
        let destination = destination_for(destination_root, row.split, &row.case_id);
        let elsewhere = placed.other_splits(row.split, &row.case_id);
        let lookup = cases.lookup(&row.case_id, match_mode);
        match &lookup {
            CaseLookup::Found { dir_name, .. } => {
                claimed.insert(dir_name.clone());
            }
            CaseLookup::Ambiguous(candidates) => claimed.extend(candidates.iter().cloned()),
            CaseLookup::Missing => {}
        }
        let action = if !elsewhere.is_empty() {
            CaseAction::WrongSplit {
                existing: elsewhere
                    .into_iter()
                    .map(|split| destination_for(destination_root, split, &row.case_id))
                    .collect(),
            }
        } else {
            match lookup {
                CaseLookup::Found { path, .. } => CaseAction::Materialize {
                    source: path,
                    destination,
                },
                CaseLookup::Ambiguous(candidates) => CaseAction::Ambiguous { candidates },
                CaseLookup::Missing
                    if mode == TransferMode::Move
                        && placed.contains(row.split, &row.case_id) =>
                {
                    CaseAction::AlreadyPlaced { destination }
                }
                CaseLookup::Missing => CaseAction::Missing,
            }
        };
        planned.push(PlannedCase {
            case_id: row.case_id.clone(),
            split: row.split,
            line: row.line,
            action,
        });
    }

    let orphans = cases
        .names()
        .filter(|name| !claimed.contains(*name))
        .map(str::to_string)
        .collect();

    SplitPlan {
        case_root: cases.root().to_path_buf(),
        destination_root: destination_root.to_path_buf(),
        cases: planned,
        orphans,
        blank_rows: manifest.blank_rows,
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
