//! Subtree snapshots, comparison, and staged copy/move primitives.
//!
//! Copies land in a hidden staging directory next to the destination and are
//! renamed into place, so a failed case never leaves a partial directory.
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const STAGING_PREFIX: &str = ".medsplit-";

/// How two case subtrees are compared for idempotence.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CompareMode {
    /// Same relative file set with matching byte lengths.
    #[default]
    Files,
    /// Same relative file set with matching SHA-256 digests.
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FileEntry {
    File { len: u64, sha256: Option<String> },
    /// Symbolic links are compared by target, never followed.
    Link { target: PathBuf },
}

/// Relative file listing of a subtree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeSnapshot {
    files: BTreeMap<PathBuf, FileEntry>,
}

impl TreeSnapshot {
    /// Snapshot every regular file and symlink below `root`.
    pub fn capture(root: &Path, mode: CompareMode) -> io::Result<Self> {
        let mut files = BTreeMap::new();
        for entry in walk_tree(root)? {
            let rel = entry
                .path
                .strip_prefix(root)
                .map_err(|err| io::Error::other(err.to_string()))?
                .to_path_buf();
            let snapshot = match entry.kind {
                EntryKind::File => FileEntry::File {
                    len: fs::metadata(&entry.path)?.len(),
                    sha256: match mode {
                        CompareMode::Files => None,
                        CompareMode::Content => Some(sha256_file(&entry.path)?),
                    },
                },
                EntryKind::Symlink => FileEntry::Link {
                    target: fs::read_link(&entry.path)?,
                },
            };
            files.insert(rel, snapshot);
        }
        Ok(Self { files })
    }

    /// Regular files and symlinks in the snapshot.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files
            .values()
            .map(|entry| match entry {
                FileEntry::File { len, .. } => *len,
                FileEntry::Link { .. } => 0,
            })
            .sum()
    }

    /// Human-readable differences between `self` (source) and `other`.
    ///
    /// Empty when the trees match.
    pub fn differences(&self, other: &TreeSnapshot) -> Vec<String> {
        let mut diffs = Vec::new();
        for (rel, entry) in &self.files {
            let Some(theirs) = other.files.get(rel) else {
                diffs.push(format!("missing {}", rel.display()));
                continue;
            };
            match (entry, theirs) {
                (
                    FileEntry::File { len, sha256 },
                    FileEntry::File {
                        len: their_len,
                        sha256: their_sha,
                    },
                ) => {
                    if len != their_len {
                        diffs.push(format!(
                            "size {} ({len} vs {their_len} bytes)",
                            rel.display()
                        ));
                    } else if sha256 != their_sha {
                        diffs.push(format!("content {}", rel.display()));
                    }
                }
                (FileEntry::Link { target }, FileEntry::Link { target: their_target }) => {
                    if target != their_target {
                        diffs.push(format!(
                            "link {} ({} vs {})",
                            rel.display(),
                            target.display(),
                            their_target.display()
                        ));
                    }
                }
                _ => diffs.push(format!("type {}", rel.display())),
            }
        }
        for rel in other.files.keys() {
            if !self.files.contains_key(rel) {
                diffs.push(format!("extra {}", rel.display()));
            }
        }
        diffs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Symlink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Every regular file and symlink below `root`, sorted.
///
/// Symlinks are listed, not followed. Sockets, FIFOs, and devices are an
/// error, as is any entry whose type cannot be read.
pub fn walk_tree(root: &Path) -> io::Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    if !root.exists() {
        return Ok(entries);
    }
    walk_into(root, &mut entries)?;
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

fn walk_into(dir: &Path, out: &mut Vec<TreeEntry>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            out.push(TreeEntry {
                path,
                kind: EntryKind::Symlink,
            });
        } else if file_type.is_dir() {
            walk_into(&path, out)?;
        } else if file_type.is_file() {
            out.push(TreeEntry {
                path,
                kind: EntryKind::File,
            });
        } else {
            return Err(unsupported(&path));
        }
    }
    Ok(())
}

/// All regular files and symlinks below `root`, sorted.
pub fn collect_files_recursive(root: &Path) -> io::Result<Vec<PathBuf>> {
    Ok(walk_tree(root)?
        .into_iter()
        .map(|entry| entry.path)
        .collect())
}

pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut file = fs::File::open(path)?;
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// True for the hidden staging directories this module creates.
pub fn is_staging_name(name: &str) -> bool {
    name.starts_with(STAGING_PREFIX)
}

/// Copy `source` to `dest` through a staging directory in `dest`'s parent.
///
/// `dest` must not exist. On error the staging directory is removed.
pub fn copy_tree_staged(source: &Path, dest: &Path) -> io::Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| io::Error::other(format!("{} has no parent", dest.display())))?;
    fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(parent)?;
    copy_dir_contents(source, staging.path())?;
    // Staging dirs are created 0700; carry the source mode over.
    fs::set_permissions(staging.path(), fs::metadata(source)?.permissions())?;
    fs::rename(staging.path(), dest)?;
    // The staging path no longer exists; dropping the guard is a no-op.
    drop(staging);
    Ok(())
}

/// Move `source` to `dest`, falling back to copy + delete across devices.
pub fn move_tree(source: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::debug!(
                source = %source.display(),
                error = %err,
                "rename failed, falling back to copy"
            );
            copy_tree_staged(source, dest)?;
            fs::remove_dir_all(source)
        }
    }
}

/// Copy a single file through a temporary sibling, then rename into place.
pub fn copy_file_staged(source: &Path, dest: &Path) -> io::Result<()> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let file_name = dest
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("staged");
    let tmp_path = parent.join(format!("{STAGING_PREFIX}{file_name}.tmp"));
    if let Err(err) = copy_file_preserving(source, &tmp_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    fs::rename(&tmp_path, dest)
}

fn copy_dir_contents(source: &Path, dest: &Path) -> io::Result<()> {
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let target = dest.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            copy_symlink(&path, &target)?;
        } else if file_type.is_dir() {
            fs::create_dir(&target)?;
            copy_dir_contents(&path, &target)?;
            fs::set_permissions(&target, fs::metadata(&path)?.permissions())?;
        } else if file_type.is_file() {
            copy_file_preserving(&path, &target)?;
        } else {
            return Err(unsupported(&path));
        }
    }
    Ok(())
}

/// Copy bytes, then carry over the modification time and permissions.
fn copy_file_preserving(source: &Path, dest: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    let mut reader = fs::File::open(source)?;
    let mut writer = fs::File::create(dest)?;
    io::copy(&mut reader, &mut writer)?;
    writer.set_modified(metadata.modified()?)?;
    writer.set_permissions(metadata.permissions())?;
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(source)?, dest)
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, _dest: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot recreate symlink {}", source.display()),
    ))
}

fn unsupported(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("unsupported file type at {}", path.display()),
    )
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;
