//! Shared test infrastructure for integration tests.

#![allow(dead_code)]

use medsplit::{ExecuteOptions, ManifestOptions, SplitRequest};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway case root, manifest, and destination under one temp dir.
pub struct SplitFixture {
    _temp: TempDir,
    pub root: PathBuf,
    pub dest: PathBuf,
    pub manifest: PathBuf,
}

impl SplitFixture {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("create temp dir");
        let root = temp.path().join("cases");
        let dest = temp.path().join("split");
        let manifest = temp.path().join("manifest.csv");
        fs::create_dir_all(&root).expect("create case root");
        Self {
            _temp: temp,
            root,
            dest,
            manifest,
        }
    }

    /// Create `root/<case_id>/` holding a volume and a nested segmentation.
    pub fn add_case(&self, case_id: &str) -> PathBuf {
        let dir = self.root.join(case_id);
        write_file(&dir.join("image.nii.gz"), format!("volume {case_id}").as_bytes());
        write_file(&dir.join("seg/label.nii.gz"), format!("label {case_id}").as_bytes());
        dir
    }

    pub fn write_manifest(&self, rows: &[(&str, &str)]) {
        let mut text = String::from("case_id,split\n");
        for (case_id, split) in rows {
            text.push_str(&format!("{case_id},{split}\n"));
        }
        fs::write(&self.manifest, text).expect("write manifest");
    }

    pub fn request(&self, execute: ExecuteOptions) -> SplitRequest {
        SplitRequest {
            case_root: self.root.clone(),
            manifest_path: self.manifest.clone(),
            destination_root: self.dest.clone(),
            manifest: ManifestOptions::default(),
            execute,
        }
    }

    pub fn placed(&self, split: &str, case_id: &str) -> PathBuf {
        self.dest.join(split).join(case_id)
    }

    /// Sorted relative file listing used to compare trees.
    pub fn listing(dir: &Path) -> Vec<String> {
        let mut files = Vec::new();
        collect(dir, dir, &mut files);
        files.sort();
        files
    }
}

pub fn write_file(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, contents).expect("write file");
}

fn collect(base: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let entry = entry.expect("read dir entry");
        let path = entry.path();
        // Links are listed, never followed.
        if entry.file_type().expect("file type").is_dir() {
            collect(base, &path, out);
        } else {
            let rel = path.strip_prefix(base).expect("strip base");
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}
