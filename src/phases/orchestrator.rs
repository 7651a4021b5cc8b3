//! Orchestrator for a complete run
//!
//! This module sequences the phases of one run: load the configuration,
//! export every repository, commit the shell environment, persist the new
//! revisions, and assemble the packages.

use std::path::Path;

use super::{export, package, ExportReport, PackageReport};
use crate::config::{self, Config};
use crate::error::{Error, Result};
use crate::output::Narrator;
use crate::repository::RepositoryManager;
use crate::shell_env::ShellEnv;
use crate::variables::Variables;

/// Section of the shell environment that lists user variables.
pub const INPUT_VARIABLES_SECTION: &str = "input variables";

/// Caller choices for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Stop with [`Error::UpToDate`] before packaging when no working copy
    /// changed revision.
    pub only_if_changed: bool,
}

/// What a completed run did.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub exports: Vec<ExportReport>,
    pub packages: Vec<PackageReport>,
}

/// Loads the configuration at `config_path` and runs it.
pub fn execute(
    config_path: &Path,
    vars: &Variables,
    manager: &RepositoryManager,
    env: &mut ShellEnv,
    narrator: &mut Narrator,
    options: RunOptions,
) -> Result<RunSummary> {
    for (ident, value) in vars.user_bindings() {
        env.append(INPUT_VARIABLES_SECTION, &format!("VAR_{}", ident), value);
    }

    narrator.start(
        "conf",
        format!("parsing configuration file: {}", config_path.display()),
    );
    let mut config = config::load(config_path).inspect_err(|e| narrator.fail("conf", e))?;
    narrator.done("ok");

    run(&mut config, vars, manager, env, narrator, options)
}

/// Runs an already loaded configuration.
///
/// Revisions are written back with [`Config::save`], so `config` must have
/// been loaded from a file.
pub fn run(
    config: &mut Config,
    vars: &Variables,
    manager: &RepositoryManager,
    env: &mut ShellEnv,
    narrator: &mut Narrator,
    options: RunOptions,
) -> Result<RunSummary> {
    // Phase 1: Export
    let outcome = export::execute(config, vars, manager, env, narrator)?;

    // Phase 2: Recording
    narrator.start(
        "envi",
        format!("generating shell environment: {}", env.name()),
    );
    let written = env.commit().inspect_err(|e| narrator.fail("envi", e))?;
    narrator.done("ok");
    log::debug!("wrote {} bytes of shell environment to {}", written, env.name());

    narrator.start(
        "conf",
        format!("writing repository revisions: {}", config.path().display()),
    );
    config.save().inspect_err(|e| narrator.fail("conf", e))?;
    narrator.done("ok");

    if options.only_if_changed && !outcome.dirty {
        let up_to_date = Error::UpToDate;
        narrator.fail("conf", &up_to_date);
        return Err(up_to_date);
    }

    // Phase 3: Packaging
    let packages = package::execute(&config.package, vars, &outcome.repositories, narrator)?;

    Ok(RunSummary {
        exports: outcome.reports,
        packages,
    })
}
