//! # Repository Handles
//!
//! This module provides the `RepositoryManager`, which turns export entries of
//! the configuration into [`Repository`] handles. A handle knows where its
//! repository lives (the URL), where its working copy lives (the local path),
//! and how to bring that working copy up to date.
//!
//! ## Design
//!
//! All version control work goes through the [`VcsOperations`] trait. The
//! manager owns one implementation and lends it to every handle it opens. In
//! the application this is [`SvnOperations`], which drives the `svn` command
//! line client. Tests substitute a mock that records calls and materializes
//! working copies without touching a real repository.
//!
//! The fetch mode of a handle is never stored. It is derived on every call
//! from whether a working copy already exists at the local path: an existing
//! working copy is updated, anything else is checked out.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ExportConfig;
use crate::error::{Error, Result};

/// Trait for version control operations - allows mocking in tests
pub trait VcsOperations: Send + Sync {
    /// Checks that `local` can hold a working copy of `url`.
    ///
    /// Fails with [`Error::InvalidRepository`] when the client is missing,
    /// `local` belongs to another VCS, or an existing working copy points at a
    /// different remote.
    fn validate(&self, url: &str, local: &Path) -> Result<()>;

    /// Whether the repository at `url` answers.
    fn ping(&self, url: &str) -> bool;

    /// Whether a working copy exists at `local`.
    fn is_working_copy(&self, local: &Path) -> bool;

    /// Creates a working copy of `url` at `local`.
    fn checkout(&self, url: &str, local: &Path) -> Result<()>;

    /// Brings the working copy at `local` up to date.
    fn update(&self, local: &Path) -> Result<()>;

    /// Revision identifier of the working copy at `local`.
    fn revision(&self, local: &Path) -> Result<String>;
}

/// The default implementation of `VcsOperations`, which uses the system's
/// `svn` command.
pub struct SvnOperations;

impl VcsOperations for SvnOperations {
    fn validate(&self, url: &str, local: &Path) -> Result<()> {
        crate::svn::validate(url, local)
    }

    fn ping(&self, url: &str) -> bool {
        crate::svn::ping(url)
    }

    fn is_working_copy(&self, local: &Path) -> bool {
        crate::svn::is_working_copy(local)
    }

    fn checkout(&self, url: &str, local: &Path) -> Result<()> {
        crate::svn::checkout(url, local)
    }

    fn update(&self, local: &Path) -> Result<()> {
        crate::svn::update(local)
    }

    fn revision(&self, local: &Path) -> Result<String> {
        crate::svn::revision(local)
    }
}

/// How a working copy is brought up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Checkout,
    Update,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FetchMode::Checkout => "checkout",
            FetchMode::Update => "update",
        })
    }
}

/// Opens [`Repository`] handles over a shared [`VcsOperations`].
pub struct RepositoryManager {
    ops: Box<dyn VcsOperations>,
}

impl Default for RepositoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryManager {
    /// Creates a manager backed by the `svn` client.
    pub fn new() -> Self {
        Self {
            ops: Box::new(SvnOperations),
        }
    }

    /// Creates a manager with a custom `VcsOperations` implementation.
    ///
    /// This is primarily used by tests to inject mock operations.
    pub fn with_operations(ops: Box<dyn VcsOperations>) -> Self {
        Self { ops }
    }

    /// Opens a handle for the export entry `name`.
    ///
    /// `entry` must already have its variables substituted.
    pub fn open(&self, name: &str, entry: &ExportConfig) -> Result<Repository<'_>> {
        let url = entry.url();
        let local = entry.working_copy();

        if let Err(e) = url::Url::parse(&url) {
            return Err(Error::InvalidRepository {
                name: name.to_string(),
                message: format!("{}: {}", url, e),
            });
        }
        self.ops.validate(&url, &local).map_err(|e| match e {
            Error::InvalidRepository { message, .. } => Error::InvalidRepository {
                name: name.to_string(),
                message,
            },
            other => other,
        })?;

        Ok(Repository {
            name: name.to_string(),
            url,
            local,
            ops: self.ops.as_ref(),
        })
    }
}

/// A repository bound to its local working copy.
pub struct Repository<'a> {
    name: String,
    url: String,
    local: PathBuf,
    ops: &'a dyn VcsOperations,
}

impl fmt::Debug for Repository<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("local", &self.local)
            .finish_non_exhaustive()
    }
}

impl Repository<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Path of the working copy.
    pub fn local_path(&self) -> &Path {
        &self.local
    }

    pub fn ping(&self) -> bool {
        self.ops.ping(&self.url)
    }

    /// Fails with [`Error::ConnectionFailed`] when the remote does not answer.
    pub fn ensure_reachable(&self) -> Result<()> {
        if self.ping() {
            Ok(())
        } else {
            Err(Error::ConnectionFailed {
                url: self.url.clone(),
            })
        }
    }

    pub fn fetch_mode(&self) -> FetchMode {
        if self.ops.is_working_copy(&self.local) {
            FetchMode::Update
        } else {
            FetchMode::Checkout
        }
    }

    /// Checks out or updates the working copy and returns the mode used.
    pub fn fetch(&self) -> Result<FetchMode> {
        let mode = self.fetch_mode();
        log::debug!("{} {} into {}", mode, self.url, self.local.display());
        let result = match mode {
            FetchMode::Checkout => self.ops.checkout(&self.url, &self.local),
            FetchMode::Update => self.ops.update(&self.local),
        };
        result.map_err(|e| match e {
            Error::ExportFailed { message, .. } => Error::ExportFailed {
                url: self.url.clone(),
                message,
            },
            other => Error::ExportFailed {
                url: self.url.clone(),
                message: other.to_string(),
            },
        })?;
        Ok(mode)
    }

    /// Revision of the working copy.
    pub fn revision(&self) -> Result<String> {
        self.ops.revision(&self.local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// Mock VCS operations for testing
    #[derive(Default)]
    struct MockVcsOperations {
        calls: Arc<Mutex<Vec<String>>>,
        working_copies: Arc<Mutex<HashSet<PathBuf>>>,
        unreachable: bool,
        fail_fetch: bool,
        invalid: Option<String>,
    }

    impl MockVcsOperations {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl VcsOperations for MockVcsOperations {
        fn validate(&self, url: &str, _local: &Path) -> Result<()> {
            match &self.invalid {
                Some(message) => Err(Error::InvalidRepository {
                    name: url.to_string(),
                    message: message.clone(),
                }),
                None => Ok(()),
            }
        }

        fn ping(&self, url: &str) -> bool {
            self.record(format!("ping {}", url));
            !self.unreachable
        }

        fn is_working_copy(&self, local: &Path) -> bool {
            self.working_copies.lock().unwrap().contains(local)
        }

        fn checkout(&self, url: &str, local: &Path) -> Result<()> {
            self.record(format!("checkout {} {}", url, local.display()));
            if self.fail_fetch {
                return Err(Error::Io(std::io::Error::other("disk full")));
            }
            self.working_copies
                .lock()
                .unwrap()
                .insert(local.to_path_buf());
            Ok(())
        }

        fn update(&self, local: &Path) -> Result<()> {
            self.record(format!("update {}", local.display()));
            Ok(())
        }

        fn revision(&self, _local: &Path) -> Result<String> {
            Ok("7".to_string())
        }
    }

    fn entry() -> ExportConfig {
        ExportConfig {
            repo: "https://host/svn/lib/".to_string(),
            path: "/trunk".to_string(),
            local: "wc".to_string(),
            last: String::new(),
        }
    }

    #[test]
    fn test_open_resolves_url_and_local_path() {
        let manager = RepositoryManager::with_operations(Box::new(MockVcsOperations::default()));
        let repo = manager.open("Lib", &entry()).unwrap();
        assert_eq!(repo.name(), "Lib");
        assert_eq!(repo.url(), "https://host/svn/lib/trunk");
        assert_eq!(repo.local_path(), Path::new("wc/trunk"));
    }

    #[test]
    fn test_open_rejects_unparseable_url() {
        let manager = RepositoryManager::with_operations(Box::new(MockVcsOperations::default()));
        let mut bad = entry();
        bad.repo = "not a url".to_string();
        let err = manager.open("Lib", &bad).unwrap_err();
        assert!(matches!(err, Error::InvalidRepository { ref name, .. } if name == "Lib"));
        assert_eq!(err.exit_code(), crate::exit_codes::INVALID_REPOSITORY);
    }

    #[test]
    fn test_open_reports_validation_failure_under_entry_name() {
        let ops = MockVcsOperations {
            invalid: Some("wrong remote".to_string()),
            ..Default::default()
        };
        let manager = RepositoryManager::with_operations(Box::new(ops));
        let err = manager.open("Lib", &entry()).unwrap_err();
        match err {
            Error::InvalidRepository { name, message } => {
                assert_eq!(name, "Lib");
                assert_eq!(message, "wrong remote");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_fetch_mode_is_derived_from_working_copy() {
        let ops = MockVcsOperations::default();
        let calls = Arc::clone(&ops.calls);
        let manager = RepositoryManager::with_operations(Box::new(ops));
        let repo = manager.open("Lib", &entry()).unwrap();

        assert_eq!(repo.fetch_mode(), FetchMode::Checkout);
        assert_eq!(repo.fetch().unwrap(), FetchMode::Checkout);
        assert_eq!(repo.fetch_mode(), FetchMode::Update);
        assert_eq!(repo.fetch().unwrap(), FetchMode::Update);

        let calls = calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                "checkout https://host/svn/lib/trunk wc/trunk".to_string(),
                "update wc/trunk".to_string(),
            ]
        );
    }

    #[test]
    fn test_unreachable_repository() {
        let ops = MockVcsOperations {
            unreachable: true,
            ..Default::default()
        };
        let manager = RepositoryManager::with_operations(Box::new(ops));
        let repo = manager.open("Lib", &entry()).unwrap();
        let err = repo.ensure_reachable().unwrap_err();
        assert!(matches!(err, Error::ConnectionFailed { url } if url == "https://host/svn/lib/trunk"));
    }

    #[test]
    fn test_fetch_failure_is_export_failed() {
        let ops = MockVcsOperations {
            fail_fetch: true,
            ..Default::default()
        };
        let manager = RepositoryManager::with_operations(Box::new(ops));
        let repo = manager.open("Lib", &entry()).unwrap();
        let err = repo.fetch().unwrap_err();
        assert!(matches!(err, Error::ExportFailed { ref message, .. } if message.contains("disk full")));
        assert_eq!(repo.fetch_mode(), FetchMode::Checkout);
    }

    #[test]
    fn test_fetch_mode_display() {
        assert_eq!(FetchMode::Checkout.to_string(), "checkout");
        assert_eq!(FetchMode::Update.to_string(), "update");
    }
}
