//! CLI argument parsing for the split workflow.
//!
//! The CLI stays thin: it resolves flags and config into library requests and
//! leaves every decision to the core modules.
use clap::{Args, Parser, Subcommand};
use medsplit::{CompareMode, MatchMode, TransferMode};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "medsplit",
    version,
    about = "Manifest-driven train/test/validation splitter for imaging case trees",
    after_help = "Commands:\n  scan --root <dir>                                List case directories under a root\n  plan --root <dir> --manifest <csv> --dest <dir>  Validate and preview a split\n  split --root <dir> --manifest <csv> --dest <dir> Validate and materialize a split\n  group --source <dir> --dest <dir> --slice 0:8    Group loose volumes into case directories\n  rename --root <dir> --replace OLD=NEW            Batch-rename volume files in place\n\nExamples:\n  medsplit scan --root /data/cases\n  medsplit plan --root /data/cases --manifest cohort.csv --dest /data/split\n  medsplit split --root /data/cases --manifest cohort.csv --dest /data/split --mode move\n  medsplit group --source /data/raw --dest /data/cases --id-regex '^(P\\d+)_'\n  medsplit rename --root /data/raw --keyword liver --replace _T1=_t1w --dry-run",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Emit debug logging (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Scan(ScanArgs),
    Plan(PlanArgs),
    Split(SplitArgs),
    Group(GroupArgs),
    Rename(RenameArgs),
}

#[derive(Parser, Debug)]
#[command(about = "List case directories under a root")]
pub struct ScanArgs {
    /// Directory whose first-level subdirectories are cases
    #[arg(long, value_name = "DIR")]
    pub root: PathBuf,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Inputs shared by `plan` and `split`.
#[derive(Args, Debug, Clone)]
pub struct SplitInputs {
    /// Directory whose first-level subdirectories are cases
    #[arg(long, value_name = "DIR")]
    pub root: PathBuf,

    /// CSV or TSV manifest with case id and split columns
    #[arg(long, value_name = "FILE")]
    pub manifest: PathBuf,

    /// Destination root receiving train/, test/, and validation/
    #[arg(long, value_name = "DIR")]
    pub dest: PathBuf,

    /// JSON config with column names and modes; flags take precedence
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Manifest column holding case ids [default: case_id]
    #[arg(long, value_name = "NAME")]
    pub id_column: Option<String>,

    /// Manifest column holding split labels [default: split]
    #[arg(long, value_name = "NAME")]
    pub split_column: Option<String>,

    /// How manifest ids are matched to directory names [default: strict]
    #[arg(long = "match", value_enum, value_name = "MODE")]
    pub match_mode: Option<MatchMode>,

    /// How existing destinations are compared [default: files]
    #[arg(long, value_enum, value_name = "MODE")]
    pub compare: Option<CompareMode>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Also write the JSON report to this path
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Validate a manifest and preview the split without writing")]
pub struct PlanArgs {
    #[command(flatten)]
    pub inputs: SplitInputs,
}

#[derive(Parser, Debug)]
#[command(about = "Validate a manifest and materialize the split")]
pub struct SplitArgs {
    #[command(flatten)]
    pub inputs: SplitInputs,

    /// Copy (root untouched) or move cases [default: copy]
    #[arg(long, value_enum, value_name = "MODE")]
    pub mode: Option<TransferMode>,

    /// Validate and plan only
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Group loose volume files into per-case directories")]
pub struct GroupArgs {
    /// Directory scanned recursively for volume files
    #[arg(long, value_name = "DIR")]
    pub source: PathBuf,

    /// Destination receiving <case_id>/<file>
    #[arg(long, value_name = "DIR")]
    pub dest: PathBuf,

    /// Character range START:END of the file stem holding the case id
    #[arg(long, value_name = "START:END", conflicts_with_all = ["snippet", "id_regex"])]
    pub slice: Option<String>,

    /// Case id as it appears in --example; its position defines the slice
    #[arg(long, value_name = "TEXT", requires = "example", conflicts_with = "id_regex")]
    pub snippet: Option<String>,

    /// Example file name used to locate --snippet
    #[arg(long, value_name = "NAME", requires = "snippet")]
    pub example: Option<String>,

    /// Regex applied to the file stem; first capture group is the case id
    #[arg(long, value_name = "RE")]
    pub id_regex: Option<String>,

    /// Extensions to collect, comma or semicolon separated [default: .nii.gz,.nii,.mha,.nrrd]
    #[arg(long, value_name = "LIST")]
    pub ext: Option<String>,

    /// Overwrite existing files instead of adding a _N suffix
    #[arg(long)]
    pub overwrite: bool,

    /// Plan only
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Batch-rename volume files in place, previewing conflicts first")]
pub struct RenameArgs {
    /// Directory scanned recursively for volume files
    #[arg(long, value_name = "DIR")]
    pub root: PathBuf,

    /// Extensions to rename, comma or semicolon separated [default: .nii.gz,.nii,.mha,.nrrd]
    #[arg(long, value_name = "LIST")]
    pub ext: Option<String>,

    /// Only rename files whose path contains this text (repeatable; all must match)
    #[arg(long = "keyword", value_name = "TEXT")]
    pub keywords: Vec<String>,

    /// Treat --keyword values as exact file names
    #[arg(long, requires = "keywords")]
    pub exact: bool,

    /// Replace OLD with NEW in the file stem (repeatable, applied in order)
    #[arg(long = "replace", value_name = "OLD=NEW")]
    pub replacements: Vec<String>,

    /// Delete LEN characters of the stem starting at START
    #[arg(long, value_name = "START:LEN")]
    pub delete: Option<String>,

    /// Insert TOKEN at character POS of the stem; negative POS counts from the end
    #[arg(long, value_name = "POS:TOKEN", allow_hyphen_values = true)]
    pub insert: Option<String>,

    /// Replace the extension, e.g. .nii
    #[arg(long, value_name = "EXT")]
    pub new_ext: Option<String>,

    /// Preview only
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}
