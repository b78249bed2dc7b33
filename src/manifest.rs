//! Manifest parsing and integrity validation.
//!
//! A manifest is a CSV/TSV table or a spreadsheet with a header row. Only the
//! id and split columns are read; everything else is ignored.
use crate::error::{DuplicateEntry, SplitError, SplitResult};
use calamine::{open_workbook_auto, Reader};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_ID_COLUMN: &str = "case_id";
pub const DEFAULT_SPLIT_COLUMN: &str = "split";

/// Dataset split a case is assigned to.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Test,
    Validation,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Test, Split::Validation];

    /// Directory name under the destination root.
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
            Split::Validation => "validation",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "train" => Ok(Split::Train),
            "test" => Ok(Split::Test),
            "validation" => Ok(Split::Validation),
            _ => Err(format!(
                "unknown split {value:?} (expected train, test, or validation)"
            )),
        }
    }
}

/// How manifest ids are compared to case directory names.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Byte-for-byte equality.
    #[default]
    Strict,
    /// Trimmed, whitespace-collapsed, lowercase equality.
    Loose,
}

impl MatchMode {
    /// Key used for duplicate detection and lookups under this mode.
    pub fn key(&self, id: &str) -> String {
        match self {
            MatchMode::Strict => id.to_string(),
            MatchMode::Loose => normalize_id(id),
        }
    }
}

/// Trim, collapse internal whitespace runs, and lowercase an identifier.
pub fn normalize_id(id: &str) -> String {
    id.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Column names and matching rules used when reading a manifest.
#[derive(Debug, Clone)]
pub struct ManifestOptions {
    pub id_column: String,
    pub split_column: String,
    pub match_mode: MatchMode,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            id_column: DEFAULT_ID_COLUMN.to_string(),
            split_column: DEFAULT_SPLIT_COLUMN.to_string(),
            match_mode: MatchMode::Strict,
        }
    }
}

/// One validated manifest row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestRow {
    pub case_id: String,
    pub split: Split,
    /// 1-based line in the manifest file (header is line 1).
    pub line: u64,
}

/// Validated manifest: unique ids, known splits, file order preserved.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub path: PathBuf,
    pub rows: Vec<ManifestRow>,
    pub blank_rows: usize,
    pub match_mode: MatchMode,
}

impl Manifest {
    /// Number of rows assigned to each split.
    pub fn split_counts(&self) -> BTreeMap<Split, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.split).or_insert(0) += 1;
        }
        counts
    }
}

/// Read and validate a manifest from disk.
///
/// `.tsv`/`.tab` files are tab separated and `.xlsx`/`.xlsm`/`.xlsb`/`.xls`/
/// `.ods` workbooks are read from their first sheet; everything else is
/// parsed as CSV.
pub fn load_manifest(path: &Path, options: &ManifestOptions) -> SplitResult<Manifest> {
    match source_kind(path) {
        SourceKind::Workbook => load_workbook(path, options),
        SourceKind::Delimited(delimiter) => {
            let file = std::fs::File::open(path).map_err(|source| SplitError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            parse_manifest(file, delimiter, path, options)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Delimited(u8),
    Workbook,
}

fn source_kind(path: &Path) -> SourceKind {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("tsv") | Some("tab") => SourceKind::Delimited(b'\t'),
        Some("xlsx") | Some("xlsm") | Some("xlsb") | Some("xls") | Some("ods") => {
            SourceKind::Workbook
        }
        _ => SourceKind::Delimited(b','),
    }
}

/// Parse and validate manifest rows from any reader.
///
/// `path` is only used for diagnostics.
pub fn parse_manifest<R: Read>(
    reader: R,
    delimiter: u8,
    path: &Path,
    options: &ManifestOptions,
) -> SplitResult<Manifest> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|err| csv_error(path, err, Some(1)))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let records = reader.into_records().map(|record| -> SplitResult<(u64, Vec<String>)> {
        let record = record.map_err(|err| csv_error(path, err, None))?;
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        Ok((line, record.iter().map(str::to_string).collect()))
    });
    validate_rows(path, options, &headers, records)
}

/// Read the first sheet of a workbook. Line numbers are sheet row numbers,
/// so a header in row 1 lines up with the CSV numbering.
fn load_workbook(path: &Path, options: &ManifestOptions) -> SplitResult<Manifest> {
    std::fs::metadata(path).map_err(|source| SplitError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut workbook = open_workbook_auto(path).map_err(|err| workbook_error(path, err))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| format_error(path, None, "workbook has no sheets".to_string()))?
        .map_err(|err| workbook_error(path, err))?;
    let first_row = range.start().map(|(row, _)| u64::from(row)).unwrap_or(0);
    let mut rows = range.rows().enumerate().map(|(idx, cells)| {
        let line = first_row + idx as u64 + 1;
        let cells = cells.iter().map(|cell| cell.to_string()).collect::<Vec<_>>();
        (line, cells)
    });
    let Some((_, headers)) = rows.next() else {
        return Err(format_error(path, Some(1), "first sheet is empty".to_string()));
    };
    let headers = headers
        .iter()
        .map(|header| header.trim().to_string())
        .collect::<Vec<_>>();
    validate_rows(path, options, &headers, rows.map(Ok))
}

/// Shared row validation for every manifest source.
fn validate_rows<I>(
    path: &Path,
    options: &ManifestOptions,
    headers: &[String],
    records: I,
) -> SplitResult<Manifest>
where
    I: Iterator<Item = SplitResult<(u64, Vec<String>)>>,
{
    let id_index = column_index(headers, &options.id_column, path)?;
    let split_index = column_index(headers, &options.split_column, path)?;

    let mut rows = Vec::new();
    let mut blank_rows = 0;
    let mut seen: BTreeMap<String, Vec<u64>> = BTreeMap::new();
    for record in records {
        let (line, cells) = record?;
        let raw_id = cells.get(id_index).map(String::as_str).unwrap_or("");
        if raw_id.trim().is_empty() {
            blank_rows += 1;
            continue;
        }
        let raw_split = cells.get(split_index).map(String::as_str).unwrap_or("");
        if raw_split.trim().is_empty() {
            return Err(format_error(
                path,
                Some(line),
                format!("case {raw_id:?} has an empty split"),
            ));
        }
        let split = raw_split
            .parse::<Split>()
            .map_err(|reason| format_error(path, Some(line), reason))?;
        let case_id = match options.match_mode {
            MatchMode::Strict => raw_id.to_string(),
            MatchMode::Loose => raw_id.trim().to_string(),
        };
        seen.entry(options.match_mode.key(&case_id))
            .or_default()
            .push(line);
        rows.push(ManifestRow {
            case_id,
            split,
            line,
        });
    }

    let duplicates = seen
        .into_iter()
        .filter(|(_, lines)| lines.len() > 1)
        .map(|(case_id, lines)| DuplicateEntry { case_id, lines })
        .collect::<Vec<_>>();
    if !duplicates.is_empty() {
        return Err(SplitError::DuplicateCase { duplicates });
    }

    tracing::debug!(
        path = %path.display(),
        rows = rows.len(),
        blank_rows,
        "loaded manifest"
    );
    Ok(Manifest {
        path: path.to_path_buf(),
        rows,
        blank_rows,
        match_mode: options.match_mode,
    })
}

fn column_index(headers: &[String], name: &str, path: &Path) -> SplitResult<usize> {
    headers
        .iter()
        .position(|header| header == name.trim())
        .ok_or_else(|| {
            format_error(
                path,
                Some(1),
                format!(
                    "missing required column {name:?} (found: {})",
                    headers.join(", ")
                ),
            )
        })
}

fn format_error(path: &Path, line: Option<u64>, reason: String) -> SplitError {
    SplitError::ManifestFormat {
        path: path.to_path_buf(),
        line,
        reason,
    }
}

/// Read failures stay I/O errors; undecodable or malformed rows are format
/// errors at the offending line.
fn csv_error(path: &Path, err: csv::Error, fallback_line: Option<u64>) -> SplitError {
    let line = err.position().map(|pos| pos.line()).or(fallback_line);
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => SplitError::Io {
            path: path.to_path_buf(),
            source,
        },
        _ => format_error(path, line, reason),
    }
}

fn workbook_error(path: &Path, err: calamine::Error) -> SplitError {
    match err {
        calamine::Error::Io(source) => SplitError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => format_error(path, None, format!("unreadable workbook: {other}")),
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
