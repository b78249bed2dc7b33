//! Case root and destination tree scanning.
//!
//! Scanning happens once, up front, so planning can stay a pure function of
//! the manifest and these snapshots.
use crate::error::{SplitError, SplitResult};
use crate::manifest::{MatchMode, Split};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Case directories directly under a root, keyed by directory name.
#[derive(Debug, Clone, Default)]
pub struct CaseIndex {
    root: PathBuf,
    cases: BTreeMap<String, PathBuf>,
}

/// Result of resolving a manifest id against the case index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseLookup {
    Found { dir_name: String, path: PathBuf },
    Missing,
    /// Loose matching mapped the id to more than one directory.
    Ambiguous(Vec<String>),
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseDirSummary {
    pub case_id: String,
    pub file_count: usize,
}

impl CaseIndex {
    /// Scan the first level of `root` for case directories.
    pub fn scan(root: &Path) -> SplitResult<Self> {
        if !root.is_dir() {
            return Err(SplitError::InvalidRoot {
                label: "case root",
                path: root.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }
        let cases = list_subdirs(root)?;
        tracing::debug!(root = %root.display(), cases = cases.len(), "scanned case root");
        Ok(Self {
            root: root.to_path_buf(),
            cases,
        })
    }

    /// Build an index from known entries without touching the filesystem.
    pub fn from_entries<I, S>(root: &Path, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cases = names
            .into_iter()
            .map(|name| {
                let name = name.into();
                let path = root.join(&name);
                (name, path)
            })
            .collect();
        Self {
            root: root.to_path_buf(),
            cases,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Directory names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cases.keys().map(String::as_str)
    }

    /// Resolve a manifest id under the given match mode.
    pub fn lookup(&self, case_id: &str, mode: MatchMode) -> CaseLookup {
        match mode {
            MatchMode::Strict => match self.cases.get(case_id) {
                Some(path) => CaseLookup::Found {
                    dir_name: case_id.to_string(),
                    path: path.clone(),
                },
                None => CaseLookup::Missing,
            },
            MatchMode::Loose => {
                let key = mode.key(case_id);
                let matches = self
                    .cases
                    .iter()
                    .filter(|(name, _)| mode.key(name) == key)
                    .collect::<Vec<_>>();
                match matches.as_slice() {
                    [] => CaseLookup::Missing,
                    [(name, path)] => CaseLookup::Found {
                        dir_name: (*name).clone(),
                        path: (*path).clone(),
                    },
                    many => CaseLookup::Ambiguous(
                        many.iter().map(|(name, _)| (*name).clone()).collect(),
                    ),
                }
            }
        }
    }

    /// Per-case file counts for `scan` output.
    pub fn summarize(&self) -> SplitResult<Vec<CaseDirSummary>> {
        let mut out = Vec::with_capacity(self.cases.len());
        for (case_id, path) in &self.cases {
            let file_count = crate::tree::collect_files_recursive(path)
                .map_err(|source| SplitError::Io {
                    path: path.clone(),
                    source,
                })?
                .len();
            out.push(CaseDirSummary {
                case_id: case_id.clone(),
                file_count,
            });
        }
        Ok(out)
    }
}

/// Case directories that already exist under each split of a destination.
#[derive(Debug, Clone, Default)]
pub struct DestinationIndex {
    root: PathBuf,
    placed: BTreeMap<Split, BTreeSet<String>>,
}

impl DestinationIndex {
    /// Scan `dest/<split>/` for existing case directories.
    ///
    /// A missing destination root is an empty index.
    pub fn scan(dest_root: &Path) -> SplitResult<Self> {
        if dest_root.exists() && !dest_root.is_dir() {
            return Err(SplitError::InvalidRoot {
                label: "destination",
                path: dest_root.to_path_buf(),
                reason: "exists but is not a directory".to_string(),
            });
        }
        let mut placed = BTreeMap::new();
        for split in Split::ALL {
            let split_dir = dest_root.join(split.as_str());
            if !split_dir.is_dir() {
                continue;
            }
            let names = list_subdirs(&split_dir)?
                .into_keys()
                .filter(|name| !crate::tree::is_staging_name(name))
                .collect::<BTreeSet<_>>();
            placed.insert(split, names);
        }
        Ok(Self {
            root: dest_root.to_path_buf(),
            placed,
        })
    }

    pub fn from_entries<'a, I>(dest_root: &Path, entries: I) -> Self
    where
        I: IntoIterator<Item = (Split, &'a str)>,
    {
        let mut placed: BTreeMap<Split, BTreeSet<String>> = BTreeMap::new();
        for (split, name) in entries {
            placed.entry(split).or_default().insert(name.to_string());
        }
        Self {
            root: dest_root.to_path_buf(),
            placed,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, split: Split, case_id: &str) -> bool {
        self.placed
            .get(&split)
            .is_some_and(|names| names.contains(case_id))
    }

    /// Splits other than `split` that already hold `case_id`.
    pub fn other_splits(&self, split: Split, case_id: &str) -> Vec<Split> {
        Split::ALL
            .into_iter()
            .filter(|candidate| *candidate != split && self.contains(*candidate, case_id))
            .collect()
    }
}

fn list_subdirs(dir: &Path) -> SplitResult<BTreeMap<String, PathBuf>> {
    let io_err = |source| SplitError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut out = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            tracing::warn!(path = %path.display(), "skipping non UTF-8 directory name");
            continue;
        };
        out.insert(name, path);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_lists_only_first_level_directories() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::create_dir_all(root.join("A/series1")).expect("mkdir");
        fs::create_dir_all(root.join("B")).expect("mkdir");
        fs::write(root.join("notes.txt"), b"loose").expect("write");
        fs::write(root.join("A/series1/img.nii.gz"), b"x").expect("write");

        let index = CaseIndex::scan(root).expect("scan");
        assert_eq!(index.names().collect::<Vec<_>>(), vec!["A", "B"]);
        let summary = index.summarize().expect("summarize");
        assert_eq!(summary[0].file_count, 1);
        assert_eq!(summary[1].file_count, 0);
    }

    #[test]
    fn scan_rejects_missing_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = CaseIndex::scan(&temp.path().join("nope")).expect_err("missing root");
        assert!(matches!(err, SplitError::InvalidRoot { .. }));
    }

    #[test]
    fn loose_lookup_reports_ambiguity() {
        let index = CaseIndex::from_entries(Path::new("/data"), ["Case 1", "case  1", "Other"]);
        assert_eq!(
            index.lookup("CASE 1", MatchMode::Loose),
            CaseLookup::Ambiguous(vec!["Case 1".to_string(), "case  1".to_string()])
        );
        assert_eq!(
            index.lookup("other", MatchMode::Loose),
            CaseLookup::Found {
                dir_name: "Other".to_string(),
                path: PathBuf::from("/data/Other"),
            }
        );
        assert_eq!(index.lookup("other", MatchMode::Strict), CaseLookup::Missing);
    }

    #[test]
    fn destination_index_tracks_each_split() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("train/A")).expect("mkdir");
        fs::create_dir_all(temp.path().join("test/B")).expect("mkdir");
        let index = DestinationIndex::scan(temp.path()).expect("scan dest");
        assert!(index.contains(Split::Train, "A"));
        assert!(!index.contains(Split::Validation, "A"));
        assert_eq!(index.other_splits(Split::Validation, "B"), vec![Split::Test]);

        let empty = DestinationIndex::scan(&temp.path().join("fresh")).expect("missing dest");
        assert!(!empty.contains(Split::Train, "A"));
    }
}
