//! CLI argument parsing and run dispatch

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use grabpack::defaults;
use grabpack::output::{Narrator, OutputConfig};
use grabpack::phases::orchestrator::{self, RunOptions};
use grabpack::repository::RepositoryManager;
use grabpack::shell_env::ShellEnv;
use grabpack::variables::{self, Variables};

const VARIABLES_HELP: &str = "\
Variables:
  Arguments of the form VAR=VAL bind the token $VAR to VAL. Every occurrence
  of a bound token is replaced in export names and their repo, path and local
  fields, in package destinations, include sources, copy paths, ignore
  patterns and compress outputs. Replacement happens once; values are never
  scanned again.

  Builtin variables (overridden by arguments of the same name):
    $DATETIME    local date and time of the run, as YYYYMMDD-hhmmss

  Every argument binding is also written to the \"input variables\" section of
  the shell environment as VAR_<NAME>.

Exit status:
  0 success, 2 nothing changed (with --update-only), 10-13 configuration file
  errors, 20-23 repository errors, 100-103 packaging errors, 99 anything else.";

/// grabpack - Export Subversion working copies and assemble packages from them
#[derive(Parser, Debug)]
#[command(name = "grabpack")]
#[command(version, about, long_about = None, after_long_help = VARIABLES_HELP)]
pub struct Cli {
    /// Configuration file (defaults to <executable name>.yml in the current directory)
    #[arg(short = 'f', long, value_name = "PATH", env = "GRABPACK_CONFIG")]
    config: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// Exit with status 2, without packaging, when no working copy changed
    #[arg(short, long)]
    update_only: bool,

    /// Write the shell environment to PATH ("-" for stdout, "+" for stderr)
    #[arg(short = 'x', long, value_name = "PATH", allow_hyphen_values = true)]
    export_env: Option<String>,

    /// Colorize output (always, never, auto)
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set diagnostic log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Variable bindings
    #[arg(value_name = "VAR=VAL")]
    bindings: Vec<String>,
}

impl Cli {
    /// Execute the run described by the arguments
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let mut narrator = if self.quiet {
            Narrator::quiet()
        } else {
            Narrator::stdout(OutputConfig::from_env_and_flag(&self.color))
        };
        let vars = self.variables();

        let explicit_config = self.config.is_some();
        let config_path = self
            .config
            .unwrap_or_else(defaults::default_config_path);

        let mut env = ShellEnv::from_target(self.export_env.as_deref()).with_context(|| {
            format!(
                "cannot open shell environment output: {}",
                self.export_env.as_deref().unwrap_or_default()
            )
        })?;

        let result = orchestrator::execute(
            &config_path,
            &vars,
            &RepositoryManager::new(),
            &mut env,
            &mut narrator,
            RunOptions {
                only_if_changed: self.update_only,
            },
        );

        match result {
            Ok(summary) => {
                log::debug!(
                    "exported {} repositories, assembled {} packages",
                    summary.exports.len(),
                    summary.packages.len()
                );
                Ok(())
            }
            Err(e @ grabpack::Error::ConfigFileNotFound { .. }) if !explicit_config => {
                narrator.info(
                    "conf",
                    format!(
                        "create {} or pass --config <PATH>",
                        config_path.display()
                    ),
                );
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Builtin variables overridden by the `VAR=VAL` arguments.
    fn variables(&self) -> Variables {
        let mut vars = Variables::new();
        for arg in &self.bindings {
            match variables::parse_binding(arg) {
                Some((ident, value)) => vars.define(ident, value),
                None => log::warn!("ignoring argument without '=': {}", arg),
            }
        }
        vars
    }
}

/// Sets up `env_logger` at `level`; `RUST_LOG` takes precedence.
fn init_logging(level: &str) {
    let filter = level.parse::<log::LevelFilter>().unwrap_or_else(|_| {
        eprintln!("warning: unknown log level '{}', using 'warn'", level);
        log::LevelFilter::Warn
    });
    let _ = env_logger::Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}
