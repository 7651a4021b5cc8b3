//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures, helper functions, and a mock
//! version control backend to reduce duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config(configs::EMPTY);
//!     fixture.command().assert().success();
//! }
//! ```

#![allow(dead_code)]

use assert_fs::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use grabpack::repository::VcsOperations;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    #[allow(unused_imports)]
    pub use super::{FixtureVcs, TestFixture};
}

/// Configuration file name used by the fixtures.
pub const CONFIG_NAME: &str = "grabpack.yml";

/// Common configuration YAML snippets for testing.
pub mod configs {
    /// Empty configuration (comments only).
    pub const EMPTY: &str = "# grabpack configuration\n";

    /// Configuration with empty sections.
    pub const EMPTY_SECTIONS: &str = "export: {}\npackage: {}\n";

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "export: [unclosed";
}

/// A test fixture that provides a temporary directory with optional config.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new()
///     .with_config(configs::EMPTY)
///     .with_file("source/a.txt", "hello world");
///
/// fixture.command_with_config().assert().success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a `grabpack.yml` configuration file with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child(CONFIG_NAME)
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join(CONFIG_NAME)
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("grabpack");
        cmd.current_dir(self.path())
            .env_remove("GRABPACK_CONFIG")
            .env("NO_COLOR", "1");
        cmd
    }

    /// Create a command with the config file path argument.
    pub fn command_with_config(&self) -> assert_cmd::Command {
        let mut cmd = self.command();
        cmd.arg("--config").arg(self.config_path());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock version control backend.
///
/// Each remote URL maps to a fixture directory and a revision. Checking out
/// copies the fixture tree into the working copy and drops a `.svn` marker;
/// updating copies it again. Every call is recorded.
#[derive(Clone, Default)]
pub struct FixtureVcs {
    remotes: Arc<Mutex<HashMap<String, (PathBuf, String)>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FixtureVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `tree` at `url` with revision `revision`.
    pub fn serve(&self, url: &str, tree: &Path, revision: &str) {
        self.remotes
            .lock()
            .unwrap()
            .insert(url.to_string(), (tree.to_path_buf(), revision.to_string()));
    }

    /// Calls recorded so far, e.g. `checkout <url> <local>`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn remote_of(&self, local: &Path) -> Option<String> {
        std::fs::read_to_string(local.join(".svn/url")).ok()
    }

    fn materialize(&self, url: &str, local: &Path) -> grabpack::Result<()> {
        let (tree, _) = self
            .remotes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| grabpack::Error::ExportFailed {
                url: url.to_string(),
                message: "no such remote".to_string(),
            })?;
        grabpack::copy::copy(&tree, local, &grabpack::copy::CopyOptions::default())?;
        std::fs::create_dir_all(local.join(".svn"))?;
        std::fs::write(local.join(".svn/url"), url)?;
        Ok(())
    }
}

impl VcsOperations for FixtureVcs {
    fn validate(&self, url: &str, local: &Path) -> grabpack::Result<()> {
        match self.remote_of(local) {
            Some(remote) if remote != url => Err(grabpack::Error::InvalidRepository {
                name: url.to_string(),
                message: format!("working copy points at {}", remote),
            }),
            _ => Ok(()),
        }
    }

    fn ping(&self, url: &str) -> bool {
        self.record(format!("ping {}", url));
        self.remotes.lock().unwrap().contains_key(url)
    }

    fn is_working_copy(&self, local: &Path) -> bool {
        local.join(".svn").is_dir()
    }

    fn checkout(&self, url: &str, local: &Path) -> grabpack::Result<()> {
        self.record(format!("checkout {} {}", url, local.display()));
        self.materialize(url, local)
    }

    fn update(&self, local: &Path) -> grabpack::Result<()> {
        self.record(format!("update {}", local.display()));
        let url = self
            .remote_of(local)
            .ok_or_else(|| grabpack::Error::ExportFailed {
                url: local.display().to_string(),
                message: "not a working copy".to_string(),
            })?;
        self.materialize(&url, local)
    }

    fn revision(&self, local: &Path) -> grabpack::Result<String> {
        self.remote_of(local)
            .and_then(|url| self.remotes.lock().unwrap().get(&url).cloned())
            .map(|(_, revision)| revision)
            .ok_or_else(|| grabpack::Error::UnknownRevision {
                path: local.display().to_string(),
                message: "not a working copy".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_config() {
        let fixture = TestFixture::new().with_config(configs::EMPTY);
        assert!(fixture.config_path().exists());
    }

    #[test]
    fn test_configs_parse_as_expected() {
        assert!(grabpack::config::parse(configs::EMPTY).is_ok());
        assert!(grabpack::config::parse(configs::EMPTY_SECTIONS).is_ok());
        assert!(grabpack::config::parse(configs::INVALID_YAML).is_err());
    }
}
