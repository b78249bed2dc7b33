//! Error taxonomy for split validation and per-case materialization.
//!
//! `SplitError` aborts a run before any mutation. `CaseError` is scoped to a
//! single case and ends up as an entry in the report instead.
use std::path::PathBuf;
use thiserror::Error;

/// A manifest row whose identifier was already claimed by an earlier row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateEntry {
    pub case_id: String,
    pub lines: Vec<u64>,
}

/// Fatal errors raised during the validation phase.
#[derive(Debug, Error)]
pub enum SplitError {
    /// Required columns absent, unknown split label, or an undecodable row.
    #[error("malformed manifest {}{}: {reason}", path.display(), line_suffix(*line))]
    ManifestFormat {
        path: PathBuf,
        line: Option<u64>,
        reason: String,
    },

    /// One or more case identifiers appear on more than one row.
    #[error("duplicate case ids in manifest: {}", format_duplicates(duplicates))]
    DuplicateCase { duplicates: Vec<DuplicateEntry> },

    /// Case root or destination root is unusable.
    #[error("invalid {label} directory {}: {reason}", path.display())]
    InvalidRoot {
        label: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors scoped to a single case during materialization.
#[derive(Debug, Error)]
pub enum CaseError {
    /// Destination exists and does not match the source subtree.
    #[error("destination {} already exists and differs ({})", destination.display(), differences.join(", "))]
    Conflict {
        destination: PathBuf,
        differences: Vec<String>,
    },

    /// Case is already materialized under another split.
    #[error("case already present under {}", existing.display())]
    WrongSplit { existing: PathBuf },

    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CaseError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CaseError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Conflicts are reported apart from I/O failures.
    pub fn is_conflict(&self) -> bool {
        matches!(self, CaseError::Conflict { .. } | CaseError::WrongSplit { .. })
    }
}

pub type SplitResult<T> = std::result::Result<T, SplitError>;

fn line_suffix(line: Option<u64>) -> String {
    match line {
        Some(line) => format!(" (line {line})"),
        None => String::new(),
    }
}

fn format_duplicates(duplicates: &[DuplicateEntry]) -> String {
    duplicates
        .iter()
        .map(|entry| {
            let lines = entry
                .lines
                .iter()
                .map(|line| line.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("{:?} (lines {lines})", entry.case_id)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_format_display_includes_line() {
        let err = SplitError::ManifestFormat {
            path: PathBuf::from("cases.csv"),
            line: Some(4),
            reason: "unknown split \"holdout\"".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("cases.csv (line 4)"), "{text}");
        assert!(text.contains("holdout"), "{text}");
    }

    #[test]
    fn duplicate_display_lists_every_line() {
        let err = SplitError::DuplicateCase {
            duplicates: vec![DuplicateEntry {
                case_id: "A".to_string(),
                lines: vec![2, 5],
            }],
        };
        assert_eq!(
            err.to_string(),
            "duplicate case ids in manifest: \"A\" (lines 2, 5)"
        );
    }

    #[test]
    fn wrong_split_counts_as_conflict() {
        let err = CaseError::WrongSplit {
            existing: PathBuf::from("out/train/A"),
        };
        assert!(err.is_conflict());
        let err = CaseError::io(
            "copy",
            "out/test/B",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(!err.is_conflict());
    }
}
