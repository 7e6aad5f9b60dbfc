//! Symlink and copy primitives used to project assets into provider trees
//!
//! Everything here operates on a single directory entry. Policy (what is
//! engine-owned, when to replace) lives in the projector; this module only
//! knows how to inspect, create and remove entries.

use crate::{Error, Result, normalize_lexically};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// How an asset is materialized in a provider directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMethod {
    /// Relative symbolic link to the canonical directory
    #[default]
    Symlink,
    /// Recursive copy of the canonical directory
    Copy,
}

impl std::fmt::Display for LinkMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkMethod::Symlink => write!(f, "symlink"),
            LinkMethod::Copy => write!(f, "copy"),
        }
    }
}

impl std::str::FromStr for LinkMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "symlink" | "link" => Ok(LinkMethod::Symlink),
            "copy" => Ok(LinkMethod::Copy),
            other => Err(format!("unknown link method '{other}'")),
        }
    }
}

/// What currently occupies a path, inspected without following symlinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// Nothing at the path
    Missing,
    /// A symlink; `target` is the absolute, lexically normalized destination
    Symlink { target: PathBuf },
    /// A real directory
    Directory,
    /// A regular file or anything else
    File,
}

/// Inspect the entry at `path` without following a final symlink.
pub fn inspect_entry(path: &Path) -> Result<EntryKind> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(EntryKind::Missing),
        Err(e) => return Err(Error::io(path, e)),
    };

    let file_type = metadata.file_type();
    if file_type.is_symlink() {
        let raw = fs::read_link(path).map_err(|e| Error::io(path, e))?;
        Ok(EntryKind::Symlink {
            target: resolve_link_target(path, &raw),
        })
    } else if file_type.is_dir() {
        Ok(EntryKind::Directory)
    } else {
        Ok(EntryKind::File)
    }
}

/// Turn a raw `read_link` result into an absolute, normalized path.
pub fn resolve_link_target(link: &Path, raw_target: &Path) -> PathBuf {
    if raw_target.is_absolute() {
        normalize_lexically(raw_target)
    } else {
        let parent = link.parent().unwrap_or_else(|| Path::new(""));
        normalize_lexically(&parent.join(raw_target))
    }
}

/// Create a directory symlink at `link` whose stored target is `target`.
///
/// `target` is written verbatim, so callers pass a relative path to keep
/// projected trees relocatable.
pub fn create_dir_symlink(target: &Path, link: &Path) -> Result<()> {
    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    #[cfg(unix)]
    let created = std::os::unix::fs::symlink(target, link);
    #[cfg(windows)]
    let created = std::os::windows::fs::symlink_dir(target, link);

    created.map_err(|e| Error::LinkFailed {
        link: link.to_path_buf(),
        target: target.to_path_buf(),
        message: e.to_string(),
    })
}

/// Recursively copy `source` to `dest`. Symlinks inside the source tree are
/// copied as the files they point to.
///
/// Returns the number of bytes copied.
pub fn copy_dir(source: &Path, dest: &Path) -> Result<u64> {
    let mut copied = 0u64;
    fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))?;

    for entry in WalkDir::new(source).follow_links(true).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| source.to_path_buf());
            Error::io(path, std::io::Error::other(e))
        })?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let destination = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination).map_err(|e| Error::io(&destination, e))?;
        } else {
            copied += fs::copy(entry.path(), &destination).map_err(|e| Error::io(&destination, e))?;
        }
    }

    Ok(copied)
}

/// Remove whatever occupies `path`. Symlinks are unlinked, never followed.
pub fn remove_entry(path: &Path) -> Result<()> {
    match inspect_entry(path)? {
        EntryKind::Missing => Ok(()),
        EntryKind::Directory => fs::remove_dir_all(path).map_err(|e| Error::io(path, e)),
        EntryKind::Symlink { .. } | EntryKind::File => remove_link_or_file(path),
    }
}

fn remove_link_or_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        // Directory symlinks on Windows must be removed as directories
        Err(_) if cfg!(windows) => fs::remove_dir(path).map_err(|e| Error::io(path, e)),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Size in bytes of the entry at `path`. Symlinks count as zero; directories
/// are summed recursively.
pub fn entry_size(path: &Path) -> u64 {
    match fs::symlink_metadata(path) {
        Ok(m) if m.file_type().is_symlink() => 0,
        Ok(m) if m.is_dir() => WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum(),
        Ok(m) => m.len(),
        Err(_) => 0,
    }
}

/// Probe whether directory symlinks can be created inside `scratch_dir`.
///
/// Creates and removes a throwaway link; any failure means "unsupported".
pub fn symlinks_supported(scratch_dir: &Path) -> bool {
    if fs::create_dir_all(scratch_dir).is_err() {
        return false;
    }
    let probe_target = scratch_dir.join(format!(".link-probe-target-{}", std::process::id()));
    let probe_link = scratch_dir.join(format!(".link-probe-{}", std::process::id()));

    let _ = remove_entry(&probe_link);
    if fs::create_dir_all(&probe_target).is_err() {
        return false;
    }

    let relative_target = Path::new(probe_target.file_name().unwrap_or_default());
    let supported =
        create_dir_symlink(relative_target, &probe_link).is_ok() && probe_link.join(".").exists();

    let _ = remove_entry(&probe_link);
    let _ = fs::remove_dir_all(&probe_target);

    tracing::debug!(supported, dir = %scratch_dir.display(), "Symlink capability probe");
    supported
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn canonical_asset(root: &Path) -> PathBuf {
        let dir = root.join("store/skills/general/code-reviewer");
        fs::create_dir_all(dir.join("assets")).unwrap();
        fs::write(dir.join("SKILL.md"), "---\nversion: 1.0.0\n---\nReview code").unwrap();
        fs::write(dir.join("assets/checklist.txt"), "- naming").unwrap();
        dir
    }

    #[test]
    fn inspect_missing_entry() {
        let temp = TempDir::new().unwrap();
        assert_eq!(
            inspect_entry(&temp.path().join("nope")).unwrap(),
            EntryKind::Missing
        );
    }

    #[cfg(unix)]
    #[test]
    fn relative_symlink_resolves_to_canonical_dir() {
        let temp = TempDir::new().unwrap();
        let source = canonical_asset(temp.path());
        let link = temp.path().join(".claude/skills/code-reviewer");

        let rel = crate::relative_path(link.parent().unwrap(), &source);
        create_dir_symlink(&rel, &link).unwrap();

        assert_eq!(
            inspect_entry(&link).unwrap(),
            EntryKind::Symlink {
                target: normalize_lexically(&source)
            }
        );
        assert!(link.join("SKILL.md").exists());
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_still_inspected() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("skills/ghost");
        create_dir_symlink(Path::new("../store/skills/general/ghost"), &link).unwrap();

        match inspect_entry(&link).unwrap() {
            EntryKind::Symlink { target } => {
                assert_eq!(target, temp.path().join("store/skills/general/ghost"));
                assert!(!target.exists());
            }
            other => panic!("expected symlink, got {other:?}"),
        }

        remove_entry(&link).unwrap();
        assert_eq!(inspect_entry(&link).unwrap(), EntryKind::Missing);
    }

    #[test]
    fn copy_dir_copies_nested_files() {
        let temp = TempDir::new().unwrap();
        let source = canonical_asset(temp.path());
        let dest = temp.path().join(".cursor/skills/code-reviewer");

        let bytes = copy_dir(&source, &dest).unwrap();

        assert!(bytes > 0);
        assert_eq!(
            fs::read_to_string(dest.join("assets/checklist.txt")).unwrap(),
            "- naming"
        );
        assert_eq!(inspect_entry(&dest).unwrap(), EntryKind::Directory);
        assert_eq!(
            crate::checksum::compute_dir_checksum(&source).unwrap(),
            crate::checksum::compute_dir_checksum(&dest).unwrap()
        );
    }

    #[test]
    fn entry_size_sums_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("cache");
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("a.bin"), vec![0u8; 10]).unwrap();
        fs::write(dir.join("sub/b.bin"), vec![0u8; 5]).unwrap();

        assert_eq!(entry_size(&dir), 15);
        assert_eq!(entry_size(&temp.path().join("missing")), 0);
    }

    #[cfg(unix)]
    #[test]
    fn probe_reports_support_and_cleans_up() {
        let temp = TempDir::new().unwrap();
        assert!(symlinks_supported(temp.path()));
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn link_method_parses_and_displays() {
        assert_eq!("copy".parse::<LinkMethod>().unwrap(), LinkMethod::Copy);
        assert_eq!("Symlink".parse::<LinkMethod>().unwrap(), LinkMethod::Symlink);
        assert!("hardlink".parse::<LinkMethod>().is_err());
        assert_eq!(LinkMethod::Copy.to_string(), "copy");
    }
}
