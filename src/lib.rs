//! Manifest-driven dataset splitting for medical imaging case trees.
//!
//! The decision logic (`manifest`, `cases`, `plan`) never mutates the disk;
//! `execute`, `group`, and `rename` apply decisions and aggregate per-item
//! outcomes into reports that a CLI, GUI, or test harness can display.
pub mod cases;
pub mod config;
pub mod error;
pub mod execute;
pub mod group;
pub mod manifest;
pub mod plan;
pub mod rename;
pub mod report;
pub mod splitter;
pub mod tree;
pub mod util;

pub use error::{CaseError, SplitError, SplitResult};
pub use execute::ExecuteOptions;
pub use manifest::{ManifestOptions, MatchMode, Split};
pub use report::{SplitReport, TransferMode};
pub use splitter::{prepare, run, SplitRequest};
pub use tree::CompareMode;
