//! Batch renamer for volume files.
//!
//! Rules rewrite the file stem in place: replacements first, then a
//! character-range deletion, then an insertion. The extension is kept unless
//! a new one is given. Planning never touches the disk; execution renames
//! within the same directory and never overwrites an existing file.
use crate::util::split_with_exts;
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Remove `len` characters starting at character `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteRule {
    pub start: usize,
    pub len: usize,
}

/// Insert `token` at a character position; negative positions count from
/// the end of the stem. Out-of-range positions are clamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertRule {
    pub position: isize,
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameRules {
    pub replacements: Vec<(String, String)>,
    pub delete: Option<DeleteRule>,
    pub insert: Option<InsertRule>,
    /// Replacement extension, normalized to start with a dot.
    pub new_ext: Option<String>,
}

impl RenameRules {
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
            && self.delete.is_none()
            && self.insert.is_none()
            && self.new_ext.is_none()
    }

    /// New file name for `file_name`. `exts` decides where the stem ends.
    pub fn apply(&self, file_name: &str, exts: &[String]) -> String {
        let (stem, ext) = self.rewrite(file_name, exts);
        format!("{stem}{ext}")
    }

    fn rewrite<'a>(&'a self, file_name: &'a str, exts: &[String]) -> (String, &'a str) {
        let (stem, ext) = split_with_exts(file_name, exts);
        let mut stem = stem.to_string();
        for (old, new) in &self.replacements {
            stem = stem.replace(old.as_str(), new);
        }
        if let Some(rule) = self.delete {
            let end = rule.start.saturating_add(rule.len);
            stem = stem
                .chars()
                .enumerate()
                .filter(|(idx, _)| *idx < rule.start || *idx >= end)
                .map(|(_, ch)| ch)
                .collect();
        }
        if let Some(rule) = &self.insert {
            let len = stem.chars().count();
            let at = if rule.position < 0 {
                len.saturating_sub(rule.position.unsigned_abs())
            } else {
                rule.position.unsigned_abs().min(len)
            };
            let head = stem.chars().take(at).collect::<String>();
            let tail = stem.chars().skip(at).collect::<String>();
            stem = format!("{head}{}{tail}", rule.token);
        }
        (stem, self.new_ext.as_deref().unwrap_or(ext))
    }
}

/// Normalize a user extension to a leading-dot form.
pub fn normalize_new_ext(text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() || text == "." {
        return Err(anyhow!("new extension must be non-empty"));
    }
    if text.contains(['/', '\\']) {
        return Err(anyhow!("new extension {text:?} contains a path separator"));
    }
    Ok(if text.starts_with('.') {
        text.to_string()
    } else {
        format!(".{text}")
    })
}

/// Which scanned files the rules apply to.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub keywords: Vec<String>,
    /// Keep only files whose name equals one of the keywords.
    pub exact: bool,
}

impl FileFilter {
    /// Without keywords every file matches. Otherwise, in the default mode
    /// every keyword must appear (case-insensitively) in the full path.
    pub fn matches(&self, path: &Path) -> bool {
        let keywords = self
            .keywords
            .iter()
            .map(|keyword| keyword.trim())
            .filter(|keyword| !keyword.is_empty())
            .collect::<Vec<_>>();
        if keywords.is_empty() {
            return true;
        }
        if self.exact {
            let name = path.file_name().and_then(|name| name.to_str());
            return name.is_some_and(|name| keywords.contains(&name));
        }
        let haystack = path.to_string_lossy().to_lowercase();
        keywords
            .iter()
            .all(|keyword| haystack.contains(&keyword.to_lowercase()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameEntry {
    pub source: PathBuf,
    pub target: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameConflict {
    pub source: PathBuf,
    pub target: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RenamePlan {
    pub renames: Vec<RenameEntry>,
    /// Files whose name the rules leave as is.
    pub unchanged: Vec<PathBuf>,
    pub conflicts: Vec<RenameConflict>,
}

/// Decide every rename up front.
///
/// A target claimed by more than one source, or one already present in
/// `existing`, is a conflict for every source involved; those files are
/// left alone.
pub fn plan_renames(
    files: &[PathBuf],
    rules: &RenameRules,
    exts: &[String],
    existing: &BTreeSet<PathBuf>,
) -> RenamePlan {
    let mut plan = RenamePlan::default();
    let mut by_target: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for source in files {
        let Some(name) = source.file_name().and_then(|name| name.to_str()) else {
            plan.conflicts.push(RenameConflict {
                source: source.clone(),
                target: source.clone(),
                reason: "file name is not UTF-8".to_string(),
            });
            continue;
        };
        let (stem, ext) = rules.rewrite(name, exts);
        let renamed = format!("{stem}{ext}");
        if renamed == name {
            plan.unchanged.push(source.clone());
            continue;
        }
        let target = source.with_file_name(&renamed);
        let reason = if stem.is_empty() {
            Some("rules leave an empty name")
        } else if renamed.contains(['/', '\\']) {
            Some("new name contains a path separator")
        } else {
            None
        };
        if let Some(reason) = reason {
            plan.conflicts.push(RenameConflict {
                source: source.clone(),
                target,
                reason: reason.to_string(),
            });
            continue;
        }
        by_target.entry(target).or_default().push(source.clone());
    }

    for (target, sources) in by_target {
        if sources.len() > 1 {
            let reason = format!("{} files map to the same name", sources.len());
            for source in sources {
                plan.conflicts.push(RenameConflict {
                    source,
                    target: target.clone(),
                    reason: reason.clone(),
                });
            }
            continue;
        }
        for source in sources {
            if existing.contains(&target) {
                plan.conflicts.push(RenameConflict {
                    source,
                    target: target.clone(),
                    reason: "target already exists".to_string(),
                });
            } else {
                plan.renames.push(RenameEntry {
                    source,
                    target: target.clone(),
                });
            }
        }
    }
    plan.renames.sort_by(|a, b| a.source.cmp(&b.source));
    plan.conflicts.sort_by(|a, b| a.source.cmp(&b.source));
    plan
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameFailure {
    pub source: PathBuf,
    pub target: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameReport {
    pub dry_run: bool,
    pub renamed: Vec<RenameEntry>,
    pub unchanged: usize,
    pub conflicts: Vec<RenameConflict>,
    pub failures: Vec<RenameFailure>,
}

impl RenameReport {
    pub fn has_errors(&self) -> bool {
        !self.conflicts.is_empty() || !self.failures.is_empty()
    }
}

/// Apply a plan. Per-file failures are collected; the run continues.
pub fn execute_renames(plan: &RenamePlan, dry_run: bool) -> RenameReport {
    let mut report = RenameReport {
        dry_run,
        renamed: Vec::new(),
        unchanged: plan.unchanged.len(),
        conflicts: plan.conflicts.clone(),
        failures: Vec::new(),
    };
    for entry in &plan.renames {
        if dry_run {
            report.renamed.push(entry.clone());
            continue;
        }
        match rename_file(&entry.source, &entry.target) {
            Ok(()) => {
                tracing::debug!(
                    source = %entry.source.display(),
                    target = %entry.target.display(),
                    "renamed"
                );
                report.renamed.push(entry.clone());
            }
            Err(err) => {
                tracing::warn!(source = %entry.source.display(), error = %err, "rename failed");
                report.failures.push(RenameFailure {
                    source: entry.source.clone(),
                    target: entry.target.clone(),
                    error: err,
                });
            }
        }
    }
    report
}

fn rename_file(source: &Path, target: &Path) -> std::result::Result<(), String> {
    if fs::symlink_metadata(target).is_ok() {
        return Err(format!("{} appeared since planning", target.display()));
    }
    fs::rename(source, target).map_err(|err| err.to_string())
}

#[cfg(test)]
#[path = "rename_tests.rs"]
mod tests;
