//! Phase 1: Export
//!
//! Brings every working copy named in the `export` section up to date, in
//! sorted entry order. For each entry:
//!
//! 1.  **Substitute**: the entry name and its `repo`, `path` and `local` fields
//!     have their variables replaced.
//! 2.  **Record**: the remote URL and local path are written to the entry's
//!     shell environment section, together with empty revision placeholders.
//! 3.  **Open**: a [`Repository`] handle is opened and its remote is pinged.
//! 4.  **Fetch**: the working copy is checked out or updated.
//! 5.  **Revision**: the new revision is recorded next to the previous one, and
//!     stored as the entry's `last` value in the configuration.
//!
//! The first failure aborts the phase. Entries processed before it keep their
//! updated `last` value in memory, but the configuration is only saved by the
//! orchestrator after the whole phase succeeded.

use std::collections::BTreeMap;

use super::{ExportOutcome, ExportReport};
use crate::config::{Config, ExportConfig};
use crate::error::Result;
use crate::output::Narrator;
use crate::repository::{Repository, RepositoryManager};
use crate::shell_env::ShellEnv;
use crate::variables::Variables;

/// Shell environment key for `field` of entry `name`.
pub fn env_key(name: &str, field: &str) -> String {
    format!("REPO_{}_{}", name, field)
}

/// Execute Phase 1: export every entry of `config`.
pub fn execute<'a>(
    config: &mut Config,
    vars: &Variables,
    manager: &'a RepositoryManager,
    env: &mut ShellEnv,
    narrator: &mut Narrator,
) -> Result<ExportOutcome<'a>> {
    let mut outcome = ExportOutcome {
        repositories: BTreeMap::new(),
        reports: Vec::new(),
        dirty: false,
    };

    let keys: Vec<String> = config.export.keys().cloned().collect();
    for key in keys {
        let Some(stored) = config.export.get(&key).cloned() else {
            continue;
        };
        let name = vars.substitute(&key);
        let entry = substitute_entry(&stored, vars);

        let (repository, report) = export_entry(&name, &entry, manager, env, narrator)?;

        if report.changed() {
            outcome.dirty = true;
        }
        if let Some(stored) = config.export.get_mut(&key) {
            stored.last = report.current.clone();
        }
        outcome.repositories.insert(name, repository);
        outcome.reports.push(report);
    }

    log::debug!(
        "exported {} repositories, dirty: {}",
        outcome.reports.len(),
        outcome.dirty
    );
    Ok(outcome)
}

/// Copy of `entry` with variables replaced in every field except `last`.
fn substitute_entry(entry: &ExportConfig, vars: &Variables) -> ExportConfig {
    ExportConfig {
        repo: vars.substitute(&entry.repo),
        path: vars.substitute(&entry.path),
        local: vars.substitute(&entry.local),
        last: entry.last.clone(),
    }
}

fn export_entry<'a>(
    name: &str,
    entry: &ExportConfig,
    manager: &'a RepositoryManager,
    env: &mut ShellEnv,
    narrator: &mut Narrator,
) -> Result<(Repository<'a>, ExportReport)> {
    env.append(name, &env_key(name, "URL"), &entry.url());
    env.append(name, &env_key(name, "LOCAL"), &entry.local);
    env.append(name, &env_key(name, "PREVREV"), "");
    env.append(name, &env_key(name, "CURRREV"), "");

    narrator.start("repo", format!("initializing repository: {}", name));
    let repository = manager
        .open(name, entry)
        .inspect_err(|e| narrator.fail("repo", e))?;
    narrator.done("ok");

    narrator.start("ping", format!("checking repository status: {}", name));
    repository
        .ensure_reachable()
        .inspect_err(|e| narrator.fail("ping", e))?;
    narrator.done("online");

    let class = repository.fetch_mode().to_string();
    narrator.start(
        &class,
        format!(
            "{} -> {}",
            repository.url(),
            repository.local_path().display()
        ),
    );
    let fetched = repository
        .fetch()
        .and_then(|mode| repository.revision().map(|revision| (mode, revision)));
    let (mode, current) = fetched.inspect_err(|e| narrator.fail(&class, e))?;
    narrator.done(&current);

    env.append(name, &env_key(name, "PREVREV"), &entry.last);
    env.append(name, &env_key(name, "CURRREV"), &current);

    let report = ExportReport {
        name: name.to_string(),
        url: repository.url().to_string(),
        local: repository.local_path().to_path_buf(),
        mode,
        previous: entry.last.clone(),
        current,
    };
    Ok((repository, report))
}
