//! Case-ID reorganizer.
//!
//! Collects loose volume files from a source tree and groups them into
//! `dest/<case_id>/<file>`, deriving the case id from each file name. The
//! result is the case root layout the splitter consumes.
use crate::tree::copy_file_staged;
use crate::util::{matching_ext, split_compound_ext, split_with_exts};
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// How a case id is cut out of a file stem.
#[derive(Debug, Clone)]
pub enum IdRule {
    /// Characters `[start, end)` of the stem; `end` is clamped to its length.
    Slice { start: usize, end: usize },
    /// First capture group, or the whole match when the pattern has none.
    Regex(Regex),
}

impl IdRule {
    pub fn slice(start: usize, end: usize) -> Result<Self> {
        if end <= start {
            return Err(anyhow!("slice end ({end}) must be greater than start ({start})"));
        }
        Ok(IdRule::Slice { start, end })
    }

    /// Locate `snippet` inside the stem of `example` and slice at that spot.
    pub fn from_snippet(example: &str, snippet: &str) -> Result<Self> {
        if snippet.is_empty() {
            return Err(anyhow!("snippet must be non-empty"));
        }
        let (stem, _) = split_compound_ext(example);
        let byte_at = stem
            .find(snippet)
            .ok_or_else(|| anyhow!("snippet {snippet:?} not found in {stem:?}"))?;
        let start = stem[..byte_at].chars().count();
        let end = start + snippet.chars().count();
        IdRule::slice(start, end)
    }

    pub fn regex(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).with_context(|| format!("compile id regex {pattern:?}"))?;
        Ok(IdRule::Regex(regex))
    }

    /// Extract an id from a stem, or `None` when the rule does not apply.
    pub fn extract(&self, stem: &str) -> Option<String> {
        let id = match self {
            IdRule::Slice { start, end } => {
                let len = stem.chars().count();
                if *start >= len {
                    return None;
                }
                let end = (*end).min(len);
                stem.chars().skip(*start).take(end - start).collect::<String>()
            }
            IdRule::Regex(regex) => {
                let caps = regex.captures(stem)?;
                caps.get(1).or_else(|| caps.get(0))?.as_str().to_string()
            }
        };
        let id = id.trim().to_string();
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return None;
        }
        Some(id)
    }
}

/// A volume file found under the source root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeFile {
    pub path: PathBuf,
    /// Not directly inside the source root.
    pub deep: bool,
}

/// Recursively collect files whose names end in one of `exts`.
pub fn scan_volumes(source: &Path, exts: &[String]) -> Result<Vec<VolumeFile>> {
    if !source.is_dir() {
        return Err(anyhow!("source {} is not a directory", source.display()));
    }
    let files = crate::tree::collect_files_recursive(source)
        .with_context(|| format!("scan {}", source.display()))?;
    let volumes = files
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| matching_ext(name, exts).is_some())
        })
        .map(|path| {
            let deep = path.parent() != Some(source);
            VolumeFile { path, deep }
        })
        .collect::<Vec<_>>();
    tracing::debug!(source = %source.display(), volumes = volumes.len(), "scanned volumes");
    Ok(volumes)
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Files grouped by extracted case id.
#[derive(Debug, Clone, Serialize)]
pub struct GroupPlan {
    pub groups: BTreeMap<String, Vec<PathBuf>>,
    pub rejected: Vec<RejectedFile>,
    pub deep_files: usize,
}

impl GroupPlan {
    pub fn file_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Group scanned volumes by id. Pure: no filesystem access.
pub fn plan_groups(volumes: &[VolumeFile], rule: &IdRule, exts: &[String]) -> GroupPlan {
    let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    let mut rejected = Vec::new();
    for volume in volumes {
        let Some(name) = volume.path.file_name().and_then(|name| name.to_str()) else {
            rejected.push(RejectedFile {
                path: volume.path.clone(),
                reason: "file name is not UTF-8".to_string(),
            });
            continue;
        };
        let (stem, _) = split_with_exts(name, exts);
        match rule.extract(stem) {
            Some(id) => groups.entry(id).or_default().push(volume.path.clone()),
            None => rejected.push(RejectedFile {
                path: volume.path.clone(),
                reason: format!("no case id in {stem:?}"),
            }),
        }
    }
    for files in groups.values_mut() {
        files.sort();
    }
    GroupPlan {
        groups,
        rejected,
        deep_files: volumes.iter().filter(|volume| volume.deep).count(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GroupOptions {
    pub overwrite: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CopiedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Destination name differs from the source name to avoid a collision.
    pub renamed: bool,
    pub overwritten: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupFailure {
    pub source: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub destination_root: PathBuf,
    pub dry_run: bool,
    pub groups: usize,
    pub copied: Vec<CopiedFile>,
    pub rejected: Vec<RejectedFile>,
    pub failures: Vec<GroupFailure>,
    pub deep_files: usize,
}

impl GroupReport {
    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Copy every grouped file into `dest/<case_id>/`.
///
/// Per-file failures are collected; the run continues.
pub fn execute_groups(plan: &GroupPlan, dest_root: &Path, options: GroupOptions) -> GroupReport {
    let mut report = GroupReport {
        destination_root: dest_root.to_path_buf(),
        dry_run: options.dry_run,
        groups: plan.groups.len(),
        copied: Vec::new(),
        rejected: plan.rejected.clone(),
        failures: Vec::new(),
        deep_files: plan.deep_files,
    };
    let mut claimed = BTreeSet::new();
    for (case_id, files) in &plan.groups {
        for source in files {
            match copy_into_group(source, &dest_root.join(case_id), options, &mut claimed) {
                Ok(copied) => {
                    tracing::debug!(
                        case = %case_id,
                        destination = %copied.destination.display(),
                        "grouped"
                    );
                    report.copied.push(copied);
                }
                Err(err) => {
                    tracing::warn!(source = %source.display(), error = %err, "group copy failed");
                    report.failures.push(GroupFailure {
                        source: source.clone(),
                        error: format!("{err:#}"),
                    });
                }
            }
        }
    }
    report
}

fn copy_into_group(
    source: &Path,
    case_dir: &Path,
    options: GroupOptions,
    claimed: &mut BTreeSet<PathBuf>,
) -> Result<CopiedFile> {
    let name = source
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("file name is not UTF-8"))?;
    let target = case_dir.join(name);
    let exists = target.exists();
    // A name written earlier in this run is never overwritten.
    let (destination, renamed) = if claimed.contains(&target) || (exists && !options.overwrite) {
        let free = unique_path_with(case_dir, name, |path| {
            path.exists() || claimed.contains(path)
        });
        (free, true)
    } else {
        (target, false)
    };
    if !options.dry_run {
        fs::create_dir_all(case_dir).with_context(|| format!("create {}", case_dir.display()))?;
        copy_file_staged(source, &destination)
            .with_context(|| format!("copy {} -> {}", source.display(), destination.display()))?;
    }
    claimed.insert(destination.clone());
    Ok(CopiedFile {
        source: source.to_path_buf(),
        overwritten: !renamed && exists,
        destination,
        renamed,
    })
}

/// First free `stem_N.ext` in `dir`, keeping compound extensions intact.
pub fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    unique_path_with(dir, file_name, Path::exists)
}

fn unique_path_with(dir: &Path, file_name: &str, taken: impl Fn(&Path) -> bool) -> PathBuf {
    let (stem, ext) = split_compound_ext(file_name);
    let mut n = 1usize;
    loop {
        let candidate = dir.join(format!("{stem}_{n}{ext}"));
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;
