//! Subversion client operations.
//!
//! These functions shell out to the system `svn` command, so authentication
//! and proxy settings come from the user's Subversion configuration
//! (`~/.subversion`). Every invocation passes `--non-interactive` so a missing
//! credential fails instead of blocking on a prompt.

use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};

/// Metadata directories of other version control systems.
const FOREIGN_VCS_DIRS: &[(&str, &str)] = &[
    (".git", "git"),
    (".hg", "mercurial"),
    (".bzr", "bazaar"),
];

/// Runs `svn --non-interactive <args>` and returns its trimmed stdout.
///
/// On failure the error is the command's stderr, or the spawn error when
/// `svn` could not be started at all.
fn run(args: &[&str], path: Option<&Path>) -> std::result::Result<String, String> {
    let mut command = Command::new("svn");
    command.arg("--non-interactive").args(args);
    if let Some(path) = path {
        command.arg(path);
    }
    log::trace!("running {:?}", command);

    let output = command.output().map_err(|e| e.to_string())?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(if stderr.is_empty() {
            format!("svn exited with {}", output.status)
        } else {
            stderr
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Whether an `svn` client can be started.
pub fn client_available() -> bool {
    run(&["--version", "--quiet"], None).is_ok()
}

/// Whether `local` is the root of a Subversion working copy.
pub fn is_working_copy(local: &Path) -> bool {
    local.join(".svn").is_dir()
}

/// Name of another VCS that owns `local`, if any.
pub fn foreign_vcs(local: &Path) -> Option<&'static str> {
    FOREIGN_VCS_DIRS
        .iter()
        .find(|(dir, _)| local.join(dir).exists())
        .map(|(_, name)| *name)
}

/// Checks that `local` can hold a working copy of `url`.
///
/// The `svn` client must be installed, `local` must not belong to another
/// VCS, and an existing working copy must point at `url`.
pub fn validate(url: &str, local: &Path) -> Result<()> {
    let invalid = |message: String| Error::InvalidRepository {
        name: url.to_string(),
        message,
    };

    if !client_available() {
        return Err(invalid("svn client is not available".to_string()));
    }
    if let Some(vcs) = foreign_vcs(local) {
        return Err(invalid(format!(
            "{} is a {} repository",
            local.display(),
            vcs
        )));
    }
    if is_working_copy(local) {
        let remote = remote_url(local).map_err(invalid)?;
        if remote.trim_end_matches('/') != url.trim_end_matches('/') {
            return Err(invalid(format!(
                "working copy {} points at {}",
                local.display(),
                remote
            )));
        }
    }
    Ok(())
}

/// Repository URL the working copy at `local` was checked out from.
pub fn remote_url(local: &Path) -> std::result::Result<String, String> {
    run(&["info", "--show-item", "url"], Some(local))
}

/// Whether the repository at `url` answers.
pub fn ping(url: &str) -> bool {
    match run(&["info", url], None) {
        Ok(_) => true,
        Err(message) => {
            log::debug!("ping {} failed: {}", url, message);
            false
        }
    }
}

/// Checks out `url` into `local`, creating parent directories.
pub fn checkout(url: &str, local: &Path) -> Result<()> {
    let failed = |message: String| Error::ExportFailed {
        url: url.to_string(),
        message,
    };
    if let Some(parent) = local.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
        }
    }
    run(&["checkout", url], Some(local)).map_err(failed)?;
    Ok(())
}

/// Updates the working copy at `local` to the head revision.
pub fn update(local: &Path) -> Result<()> {
    run(&["update"], Some(local)).map_err(|message| Error::ExportFailed {
        url: local.display().to_string(),
        message,
    })?;
    Ok(())
}

/// Last changed revision of the working copy at `local`.
pub fn revision(local: &Path) -> Result<String> {
    let unknown = |message: String| Error::UnknownRevision {
        path: local.display().to_string(),
        message,
    };
    let revision = run(&["info", "--show-item", "last-changed-revision"], Some(local))
        .map_err(unknown)?;
    if revision.is_empty() || !revision.chars().all(|c| c.is_ascii_digit()) {
        return Err(unknown(format!("unexpected revision {:?}", revision)));
    }
    Ok(revision)
}
