//! [`TestProject`] builder for cog test scenarios.
//!
//! Writes the `.cog` layout directly instead of going through `cog-core`, so
//! the fixture stays usable from `cog-core`'s own tests.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TYPE_DIRS: [&str; 5] = ["skills", "agents", "prompts", "workflows", "tools"];

/// A temporary project directory with helpers for setup and assertion.
///
/// The root is canonicalized so paths compare equal to the ones the engine
/// computes.
///
/// # Example
///
/// ```rust,no_run
/// use cog_test_utils::TestProject;
///
/// let project = TestProject::new().init(&["claude"]);
/// project.add_asset("agents", "review", "code-reviewer", "AGENT.md", "# Reviewer");
/// project.assert_file_exists(".cog/store/agents/review/code-reviewer/AGENT.md");
/// ```
pub struct TestProject {
    temp_dir: TempDir,
    root: PathBuf,
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProject {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = dunce::canonicalize(temp_dir.path()).unwrap();
        Self { temp_dir, root }
    }

    /// Return the canonical root path of the project.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The underlying temp dir, kept alive for the fixture's lifetime.
    pub fn temp_dir(&self) -> &TempDir {
        &self.temp_dir
    }

    /// Absolute path of `relative` inside the project.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Create `.cog/` with a store, cache, tmp and a YAML config enabling
    /// `providers`.
    pub fn init(self, providers: &[&str]) -> Self {
        for dir in TYPE_DIRS {
            fs::create_dir_all(self.path(".cog/store").join(dir)).unwrap();
        }
        fs::create_dir_all(self.path(".cog/cache")).unwrap();
        fs::create_dir_all(self.path(".cog/tmp")).unwrap();

        let mut config = String::from("version: 1\n");
        if providers.is_empty() {
            config.push_str("providers: {}\n");
        } else {
            config.push_str("providers:\n");
            for provider in providers {
                config.push_str(&format!("  {provider}:\n    enabled: true\n"));
            }
        }
        self.write_file(".cog/config.yaml", &config);
        self
    }

    /// Replace `.cog/config.yaml` verbatim.
    pub fn write_config(&self, yaml: &str) {
        self.write_file(".cog/config.yaml", yaml);
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Add an asset to the canonical store and return its directory.
    ///
    /// `type_dir` is the plural directory name (`skills`, `agents`, ...).
    pub fn add_asset(
        &self,
        type_dir: &str,
        category: &str,
        name: &str,
        file_name: &str,
        content: &str,
    ) -> PathBuf {
        let dir = self.asset_dir(type_dir, category, name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(file_name), content).unwrap();
        dir
    }

    /// Add a skill with a front-matter description and version.
    pub fn add_skill(&self, category: &str, name: &str, version: &str) -> PathBuf {
        self.add_asset("skills", category, name, "SKILL.md", &front_matter(name, version))
    }

    /// Add an agent with a front-matter description and version.
    pub fn add_agent(&self, category: &str, name: &str, version: &str) -> PathBuf {
        self.add_asset("agents", category, name, "AGENT.md", &front_matter(name, version))
    }

    /// Canonical directory of an asset in the default store.
    pub fn asset_dir(&self, type_dir: &str, category: &str, name: &str) -> PathBuf {
        self.path(".cog/store")
            .join(type_dir)
            .join(category)
            .join(name)
    }

    /// Whether `relative` is a symlink (without following it).
    pub fn is_symlink(&self, relative: &str) -> bool {
        fs::symlink_metadata(self.path(relative))
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    /// Assert that `path` (relative to the root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.path(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that nothing, not even a dangling symlink, is at `path`.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, path: &str) {
        let full_path = self.path(path);
        assert!(
            fs::symlink_metadata(&full_path).is_err(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the file at `path` (relative to root) contains `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or does not contain `content`.
    pub fn assert_file_contains(&self, path: &str, content: &str) {
        let full_path = self.path(path);
        let file_content = fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()));
        assert!(
            file_content.contains(content),
            "File {} does not contain expected content.\nExpected: {}\nActual: {}",
            full_path.display(),
            content,
            file_content
        );
    }

    /// Assert that `link` is a symlink resolving to the directory `target`.
    ///
    /// # Panics
    /// Panics if `link` is not a symlink or resolves elsewhere.
    pub fn assert_links_to(&self, link: &str, target: &Path) {
        assert!(self.is_symlink(link), "Expected a symlink at {}", link);
        let resolved = dunce::canonicalize(self.path(link))
            .unwrap_or_else(|_| panic!("Dangling symlink: {}", link));
        assert_eq!(resolved, dunce::canonicalize(target).unwrap());
    }
}

/// Markdown content with a front-matter header.
pub fn front_matter(name: &str, version: &str) -> String {
    format!("---\nname: {name}\ndescription: {name} asset\nversion: {version}\n---\n# {name}\n")
}
