use super::{
    collect_files_recursive, copy_file_staged, copy_tree_staged, is_staging_name, move_tree,
    CompareMode, TreeSnapshot,
};
use std::fs;
use std::path::Path;

fn write_file(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(path, contents).expect("write file");
}

fn sample_case(root: &Path) {
    write_file(&root.join("ct.nii.gz"), b"volume-bytes");
    write_file(&root.join("seg/liver.nii.gz"), b"mask");
}

#[test]
fn copy_tree_staged_mirrors_source_and_leaves_no_staging() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("root/A");
    sample_case(&source);
    let dest = temp.path().join("out/train/A");

    copy_tree_staged(&source, &dest).expect("copy case");

    let src = TreeSnapshot::capture(&source, CompareMode::Content).expect("snapshot src");
    let dst = TreeSnapshot::capture(&dest, CompareMode::Content).expect("snapshot dst");
    assert!(src.differences(&dst).is_empty());
    assert_eq!(src.file_count(), 2);
    assert_eq!(src.total_bytes(), 16);

    let leftovers = fs::read_dir(temp.path().join("out/train"))
        .expect("read split dir")
        .filter_map(|entry| entry.ok())
        .filter(|entry| is_staging_name(&entry.file_name().to_string_lossy()))
        .count();
    assert_eq!(leftovers, 0);
    assert!(source.join("ct.nii.gz").is_file(), "copy keeps the source");
}

#[test]
fn copy_tree_staged_cleans_up_on_failure() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dest = temp.path().join("out/train/A");

    let err = copy_tree_staged(&temp.path().join("missing"), &dest);
    assert!(err.is_err());
    assert!(!dest.exists());
    let entries = fs::read_dir(temp.path().join("out/train"))
        .expect("split dir exists")
        .count();
    assert_eq!(entries, 0);
}

#[test]
fn differences_describe_missing_extra_and_resized_files() {
    let temp = tempfile::tempdir().expect("tempdir");
    let left = temp.path().join("left");
    let right = temp.path().join("right");
    write_file(&left.join("a.nii"), b"aaaa");
    write_file(&left.join("b.nii"), b"bb");
    write_file(&right.join("a.nii"), b"aa");
    write_file(&right.join("c.nii"), b"cc");

    let l = TreeSnapshot::capture(&left, CompareMode::Files).expect("snapshot left");
    let r = TreeSnapshot::capture(&right, CompareMode::Files).expect("snapshot right");
    let diffs = l.differences(&r);
    assert_eq!(
        diffs,
        vec![
            "size a.nii (4 vs 2 bytes)".to_string(),
            "missing b.nii".to_string(),
            "extra c.nii".to_string(),
        ]
    );
}

#[test]
fn content_mode_catches_same_size_edits() {
    let temp = tempfile::tempdir().expect("tempdir");
    let left = temp.path().join("left");
    let right = temp.path().join("right");
    write_file(&left.join("a.nii"), b"abcd");
    write_file(&right.join("a.nii"), b"abce");

    let files_l = TreeSnapshot::capture(&left, CompareMode::Files).expect("snapshot");
    let files_r = TreeSnapshot::capture(&right, CompareMode::Files).expect("snapshot");
    assert!(files_l.differences(&files_r).is_empty());

    let content_l = TreeSnapshot::capture(&left, CompareMode::Content).expect("snapshot");
    let content_r = TreeSnapshot::capture(&right, CompareMode::Content).expect("snapshot");
    assert_eq!(content_l.differences(&content_r), vec!["content a.nii".to_string()]);
}

#[test]
fn move_tree_relocates_case() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("root/B");
    sample_case(&source);
    let dest = temp.path().join("out/test/B");

    move_tree(&source, &dest).expect("move case");
    assert!(!source.exists());
    assert_eq!(collect_files_recursive(&dest).expect("list").len(), 2);
}

#[test]
fn copy_file_staged_replaces_target() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("in.nii");
    let dest = temp.path().join("group/in.nii");
    write_file(&source, b"new");
    write_file(&dest, b"old-contents");

    copy_file_staged(&source, &dest).expect("copy file");
    assert_eq!(fs::read(&dest).expect("read"), b"new");
    assert_eq!(
        fs::read_dir(temp.path().join("group"))
            .expect("read dir")
            .count(),
        1
    );
}

#[cfg(unix)]
#[test]
fn copy_tree_staged_recreates_links_without_following_them() {
    use std::os::unix::fs::symlink;

    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("root/A");
    sample_case(&source);
    symlink(".", source.join("loop")).expect("loop link");
    symlink("/nonexistent/volume.nii.gz", source.join("dangling.nii.gz")).expect("dangling link");
    let dest = temp.path().join("out/train/A");

    copy_tree_staged(&source, &dest).expect("copy case");

    assert_eq!(fs::read_link(dest.join("loop")).expect("loop kept"), Path::new("."));
    assert_eq!(
        fs::read_link(dest.join("dangling.nii.gz")).expect("dangling kept"),
        Path::new("/nonexistent/volume.nii.gz")
    );
    let src = TreeSnapshot::capture(&source, CompareMode::Content).expect("snapshot src");
    let dst = TreeSnapshot::capture(&dest, CompareMode::Content).expect("snapshot dst");
    assert_eq!(dst.file_count(), 4);
    assert!(src.differences(&dst).is_empty());
}

#[cfg(unix)]
#[test]
fn snapshot_flags_retargeted_links() {
    use std::os::unix::fs::symlink;

    let temp = tempfile::tempdir().expect("tempdir");
    let left = temp.path().join("left");
    let right = temp.path().join("right");
    fs::create_dir_all(&left).expect("mkdir");
    fs::create_dir_all(&right).expect("mkdir");
    symlink("a.nii", left.join("latest.nii")).expect("link");
    symlink("b.nii", right.join("latest.nii")).expect("link");
    write_file(&left.join("seg.nii"), b"x");
    symlink("seg.nii.bak", right.join("seg.nii")).expect("link");

    let l = TreeSnapshot::capture(&left, CompareMode::Files).expect("snapshot left");
    let r = TreeSnapshot::capture(&right, CompareMode::Files).expect("snapshot right");
    assert_eq!(
        l.differences(&r),
        vec![
            "link latest.nii (a.nii vs b.nii)".to_string(),
            "type seg.nii".to_string(),
        ]
    );
}

#[cfg(unix)]
#[test]
fn unsupported_entries_fail_the_copy_and_leave_nothing() {
    use std::os::unix::net::UnixListener;

    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("root/A");
    sample_case(&source);
    let _socket = UnixListener::bind(source.join("daemon.sock")).expect("bind socket");
    let dest = temp.path().join("out/train/A");

    let err = copy_tree_staged(&source, &dest).expect_err("sockets are not copied");
    assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
    assert!(!dest.exists());
    assert!(TreeSnapshot::capture(&source, CompareMode::Files).is_err());
}

#[test]
fn copies_keep_modification_times() {
    let temp = tempfile::tempdir().expect("tempdir");
    let source = temp.path().join("root/A");
    sample_case(&source);
    let stamp = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_600_000_000);
    fs::File::options()
        .write(true)
        .open(source.join("ct.nii.gz"))
        .expect("open volume")
        .set_modified(stamp)
        .expect("set mtime");
    let dest = temp.path().join("out/train/A");

    copy_tree_staged(&source, &dest).expect("copy case");

    let copied = fs::metadata(dest.join("ct.nii.gz"))
        .expect("stat copy")
        .modified()
        .expect("mtime");
    assert_eq!(copied, stamp);
}
