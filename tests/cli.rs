mod common;

use common::{write_file, SplitFixture};
use serde_json::Value;
use std::process::{Command, Output};

fn medsplit(args: &[&str], fx: &SplitFixture) -> Output {
    Command::new(env!("CARGO_BIN_EXE_medsplit"))
        .args(args)
        .arg("--root")
        .arg(&fx.root)
        .arg("--manifest")
        .arg(&fx.manifest)
        .arg("--dest")
        .arg(&fx.dest)
        .env("RUST_LOG", "warn")
        .output()
        .expect("run medsplit")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn split_json_reports_counts_per_split() {
    let fx = SplitFixture::new();
    fx.add_case("A");
    fx.add_case("B");
    fx.add_case("C");
    fx.write_manifest(&[("A", "train"), ("B", "test"), ("C", "validation")]);

    let output = medsplit(&["split", "--json"], &fx);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report = stdout_json(&output);
    assert_eq!(report["schema_version"], 1);
    assert_eq!(report["mode"], "copy");
    assert_eq!(report["counts"]["train"]["materialized"], 1);
    assert_eq!(report["counts"]["validation"]["materialized"], 1);
    assert!(fx.placed("test", "B").join("image.nii.gz").is_file());
}

#[test]
fn plan_previews_without_writing_and_saves_report() {
    let fx = SplitFixture::new();
    fx.add_case("A");
    fx.write_manifest(&[("A", "train"), ("Z", "test")]);
    let report_path = fx.root.parent().expect("temp root").join("reports/plan.json");

    let output = Command::new(env!("CARGO_BIN_EXE_medsplit"))
        .arg("plan")
        .arg("--root")
        .arg(&fx.root)
        .arg("--manifest")
        .arg(&fx.manifest)
        .arg("--dest")
        .arg(&fx.dest)
        .arg("--report")
        .arg(&report_path)
        .output()
        .expect("run plan");

    assert!(output.status.success(), "missing cases are warnings");
    assert!(!fx.dest.exists());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("missing cases (1)"), "{stdout}");
    let saved: Value =
        serde_json::from_slice(&std::fs::read(&report_path).expect("read report")).expect("json");
    assert_eq!(saved["dry_run"], true);
    assert_eq!(saved["missing"][0]["case_id"], "Z");
    assert_eq!(saved["counts"]["train"]["pending"], 1);
}

#[test]
fn duplicate_manifest_exits_non_zero() {
    let fx = SplitFixture::new();
    fx.add_case("A");
    fx.write_manifest(&[("A", "train"), ("A", "test")]);

    let output = medsplit(&["split"], &fx);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("duplicate case ids"), "{stderr}");
    assert!(!fx.dest.exists());
}

#[test]
fn conflict_exits_non_zero_after_printing_report() {
    let fx = SplitFixture::new();
    fx.add_case("A");
    fx.write_manifest(&[("A", "train")]);
    write_file(&fx.placed("train", "A").join("other.nii.gz"), b"x");

    let output = medsplit(&["split", "--json"], &fx);

    assert!(!output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["conflicts"][0]["case_id"], "A");
}

#[test]
fn config_file_supplies_column_names() {
    let fx = SplitFixture::new();
    fx.add_case("P01");
    std::fs::write(&fx.manifest, "patient,fold\nP01,Validation\n").expect("write manifest");
    let config = fx.root.parent().expect("temp root").join("split.json");
    std::fs::write(
        &config,
        r#"{"schema_version": 1, "id_column": "patient", "split_column": "fold"}"#,
    )
    .expect("write config");

    let output = Command::new(env!("CARGO_BIN_EXE_medsplit"))
        .arg("split")
        .arg("--root")
        .arg(&fx.root)
        .arg("--manifest")
        .arg(&fx.manifest)
        .arg("--dest")
        .arg(&fx.dest)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("run split");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(fx.placed("validation", "P01").is_dir());
}

#[test]
fn group_collects_volumes_by_id_slice() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("raw");
    let dest = temp.path().join("cases");
    write_file(&source.join("P001_ct.nii.gz"), b"ct");
    write_file(&source.join("P001_seg.nii.gz"), b"seg");
    write_file(&source.join("P002_ct.nii.gz"), b"ct2");
    write_file(&source.join("notes.txt"), b"skip");

    let output = Command::new(env!("CARGO_BIN_EXE_medsplit"))
        .arg("group")
        .arg("--source")
        .arg(&source)
        .arg("--dest")
        .arg(&dest)
        .arg("--slice")
        .arg("0:4")
        .arg("--json")
        .output()
        .expect("run group");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(dest.join("P001/P001_ct.nii.gz").is_file());
    assert!(dest.join("P001/P001_seg.nii.gz").is_file());
    assert!(dest.join("P002/P002_ct.nii.gz").is_file());
    let report: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["groups"], 2);
}

#[test]
fn rename_previews_then_applies_and_refuses_collisions() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("raw");
    write_file(&root.join("liver/P1_T1.nii.gz"), b"p1");
    write_file(&root.join("liver/P2_T1.nii.gz"), b"p2");
    write_file(&root.join("liver/P2_t1w.nii.gz"), b"taken");
    write_file(&root.join("brain/P3_T1.nii.gz"), b"p3");
    let rename = |extra: &[&str]| {
        Command::new(env!("CARGO_BIN_EXE_medsplit"))
            .arg("rename")
            .arg("--root")
            .arg(&root)
            .args(["--keyword", "liver", "--replace", "_T1=_t1w", "--json"])
            .args(extra)
            .env("RUST_LOG", "warn")
            .output()
            .expect("run rename")
    };

    let preview = rename(&["--dry-run"]);
    assert!(!preview.status.success(), "conflicts fail the preview too");
    let report = stdout_json(&preview);
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["renamed"].as_array().expect("renamed").len(), 1);
    assert_eq!(report["conflicts"][0]["reason"], "target already exists");
    assert!(root.join("liver/P1_T1.nii.gz").is_file());

    let applied = rename(&[]);
    assert!(!applied.status.success());
    assert!(root.join("liver/P1_t1w.nii.gz").is_file());
    assert!(!root.join("liver/P1_T1.nii.gz").exists());
    assert_eq!(
        std::fs::read(root.join("liver/P2_t1w.nii.gz")).expect("kept"),
        b"taken"
    );
    assert!(root.join("liver/P2_T1.nii.gz").is_file());
    assert!(root.join("brain/P3_T1.nii.gz").is_file(), "keyword filter");
}
