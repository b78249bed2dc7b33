use std::path::{Component, Path, PathBuf};

/// Volume extensions recognized by default, compound ones first.
pub const DEFAULT_VOLUME_EXTS: [&str; 4] = [".nii.gz", ".nii", ".mha", ".nrrd"];

pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    if let Some(base) = base {
        if let Ok(relative) = path.strip_prefix(base) {
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}

/// Split a file name into `(stem, ext)` keeping `.nii.gz` whole.
///
/// `ext` keeps its leading dot and original case; it is empty when the name
/// has no extension.
pub fn split_compound_ext(file_name: &str) -> (&str, &str) {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".nii.gz") && file_name.len() > ".nii.gz".len() {
        let at = file_name.len() - ".nii.gz".len();
        return (&file_name[..at], &file_name[at..]);
    }
    match file_name.rfind('.') {
        Some(0) | None => (file_name, ""),
        Some(at) => (&file_name[..at], &file_name[at..]),
    }
}

/// Parse a user extension list such as `nii.gz, .mha;nrrd`.
///
/// Entries are lowercased and given a leading dot; longer entries sort first
/// so compound extensions win over their suffixes.
pub fn parse_ext_list(text: &str) -> Vec<String> {
    let mut exts = text
        .split([',', ';', ' ', '\t'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let item = item.to_ascii_lowercase();
            if item.starts_with('.') {
                item
            } else {
                format!(".{item}")
            }
        })
        .collect::<Vec<_>>();
    exts.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    exts.dedup();
    exts
}

/// Matching extension from `exts` for `file_name`, case-insensitively.
pub fn matching_ext<'a>(file_name: &str, exts: &'a [String]) -> Option<&'a str> {
    let lower = file_name.to_ascii_lowercase();
    exts.iter()
        .map(String::as_str)
        .find(|ext| lower.ends_with(ext) && lower.len() > ext.len())
}

/// Split `file_name` at the first extension of `exts` it ends with, falling
/// back to [`split_compound_ext`].
pub fn split_with_exts<'a>(file_name: &'a str, exts: &[String]) -> (&'a str, &'a str) {
    match matching_ext(file_name, exts) {
        Some(ext) => file_name.split_at(file_name.len() - ext.len()),
        None => split_compound_ext(file_name),
    }
}

/// True when `path` is `base` or lies below it, after resolving symlinks
/// on whatever prefix of each path exists.
pub fn is_within(path: &Path, base: &Path) -> bool {
    resolve_lexically(path).starts_with(resolve_lexically(base))
}

/// Canonicalize the longest existing prefix and append the rest.
fn resolve_lexically(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut resolved = canonical;
            for component in rest.iter().rev() {
                resolved.push(component);
            }
            return resolved;
        }
        let parent = existing.parent().map(|parent| {
            if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            }
        });
        match (existing.file_name().map(|name| name.to_os_string()), parent) {
            (Some(name), Some(parent)) => {
                rest.push(name);
                existing = parent.to_path_buf();
            }
            _ => break,
        }
    }
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}
