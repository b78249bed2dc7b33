//! Workflow steps behind each CLI command.
//!
//! Each step resolves arguments, calls into the library, and prints the
//! resulting report.
mod context;
mod group;
mod rename;
mod scan;
mod split;

pub(crate) use context::SplitContext;
pub(crate) use group::run_group;
pub(crate) use rename::run_rename;
pub(crate) use scan::run_scan;
pub(crate) use split::{run_plan, run_split};
