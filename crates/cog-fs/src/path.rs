//! Lexical path helpers for link computation
//!
//! Link targets are compared lexically after the roots involved have been
//! canonicalized once. Only [`canonicalize_lenient`] touches the filesystem.

use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components without consulting the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = match out.components().next_back() {
                    Some(Component::Normal(_)) => out.pop(),
                    _ => false,
                };
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Compute the relative path that leads from directory `from_dir` to `to`.
///
/// Both paths are expected to be absolute; they are normalized lexically
/// before the common prefix is stripped.
pub fn relative_path(from_dir: &Path, to: &Path) -> PathBuf {
    let from = normalize_lexically(from_dir);
    let to = normalize_lexically(to);

    let from_parts: Vec<_> = from.components().collect();
    let to_parts: Vec<_> = to.components().collect();

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..from_parts.len() {
        relative.push("..");
    }
    for part in &to_parts[common..] {
        relative.push(part.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    relative
}

/// Whether `path` lies inside (or is) `root`, compared lexically.
pub fn is_within(root: &Path, path: &Path) -> bool {
    normalize_lexically(path).starts_with(normalize_lexically(root))
}

/// Canonicalize the longest existing prefix of `path` and append the rest.
///
/// Lets link paths be computed in canonical form before the directories that
/// will hold them exist (dry runs, first projection).
pub fn canonicalize_lenient(path: &Path) -> PathBuf {
    let path = normalize_lexically(path);
    let mut existing = path.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = dunce::canonicalize(existing) {
            return rest
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return path.clone(),
        }
    }
}

/// Validate that a name is safe to use as a single path component.
///
/// Rejects empty names, separators, `..`, leading dots, and NUL bytes.
/// Returns a human-readable reason on failure.
pub fn validate_identifier(name: &str, label: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err(format!("{label} must not be empty"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(format!("{label} '{name}' must not contain path separators"));
    }
    if name.starts_with('.') {
        return Err(format!("{label} '{name}' must not start with '.'"));
    }
    if name.contains('\0') {
        return Err(format!("{label} '{name}' must not contain NUL bytes"));
    }
    Ok(())
}
