//! Dataset splitter entry points.
//!
//! `prepare` runs the whole validation phase and returns a plan without
//! mutating anything. `run` adds the materialization pass.
use crate::cases::{CaseIndex, DestinationIndex};
use crate::error::{SplitError, SplitResult};
use crate::execute::{execute_plan, ExecuteOptions};
use crate::manifest::{load_manifest, Manifest, ManifestOptions};
use crate::plan::{plan_split, SplitPlan};
use crate::report::SplitReport;
use crate::util::is_within;
use std::path::{Path, PathBuf};

/// Inputs for one split run.
#[derive(Debug, Clone)]
pub struct SplitRequest {
    pub case_root: PathBuf,
    pub manifest_path: PathBuf,
    pub destination_root: PathBuf,
    pub manifest: ManifestOptions,
    pub execute: ExecuteOptions,
}

/// Validated manifest plus the plan derived from it.
#[derive(Debug, Clone)]
pub struct PreparedSplit {
    pub manifest: Manifest,
    pub plan: SplitPlan,
}

/// Validation phase: parse the manifest, scan both trees, and plan.
pub fn prepare(request: &SplitRequest) -> SplitResult<PreparedSplit> {
    let manifest = load_manifest(&request.manifest_path, &request.manifest)?;
    let cases = CaseIndex::scan(&request.case_root)?;
    ensure_disjoint_roots(&request.case_root, &request.destination_root)?;
    let placed = DestinationIndex::scan(&request.destination_root)?;
    let plan = plan_split(&manifest, &cases, &placed, request.execute.mode);
    tracing::info!(
        rows = manifest.rows.len(),
        cases = cases.len(),
        planned = plan.materialize_count(),
        missing = plan.missing().count(),
        orphans = plan.orphans.len(),
        "validated manifest"
    );
    Ok(PreparedSplit { manifest, plan })
}

/// Validate, plan, and materialize.
pub fn run(request: &SplitRequest) -> SplitResult<SplitReport> {
    let prepared = prepare(request)?;
    Ok(execute_plan(
        &prepared.plan,
        &prepared.manifest.path,
        request.execute,
    ))
}

/// The destination may not live inside the case root (or be the same path).
fn ensure_disjoint_roots(case_root: &Path, destination_root: &Path) -> SplitResult<()> {
    if is_within(destination_root, case_root) {
        return Err(SplitError::InvalidRoot {
            label: "destination",
            path: destination_root.to_path_buf(),
            reason: format!("must not be inside the case root {}", case_root.display()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn destination_inside_case_root_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("cases");
        fs::create_dir_all(&root).expect("mkdir");
        let err = ensure_disjoint_roots(&root, &root.join("out/split")).expect_err("nested");
        assert!(matches!(err, SplitError::InvalidRoot { .. }), "{err}");
        ensure_disjoint_roots(&root, &temp.path().join("out")).expect("sibling is fine");
    }

    #[test]
    fn duplicate_manifest_stops_before_scanning_destination() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("cases");
        fs::create_dir_all(root.join("A")).expect("mkdir");
        let manifest_path = temp.path().join("cases.csv");
        fs::write(&manifest_path, "case_id,split\nA,train\nA,test\n").expect("write");

        let request = SplitRequest {
            case_root: root,
            manifest_path,
            destination_root: temp.path().join("out"),
            manifest: ManifestOptions::default(),
            execute: ExecuteOptions::default(),
        };
        let err = run(&request).expect_err("duplicate ids");
        assert!(matches!(err, SplitError::DuplicateCase { .. }), "{err}");
        assert!(!temp.path().join("out").exists());
    }
}
