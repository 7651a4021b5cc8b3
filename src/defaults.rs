//! Default values for grabpack configuration.
//!
//! This module provides centralized default values used by the command line
//! front end.

use std::path::PathBuf;

/// File name used when the executable name cannot be determined.
const FALLBACK_CONFIG_NAME: &str = "grabpack.yml";

/// Returns the default configuration file path.
///
/// The file is named after the running executable with a `.yml` extension
/// (a binary installed as `fetch-deps` reads `fetch-deps.yml`) and is looked
/// up in the current working directory. This can be overridden by the
/// `--config` CLI flag or the `GRABPACK_CONFIG` environment variable.
pub fn default_config_path() -> PathBuf {
    let name = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .filter(|stem| !stem.is_empty())
        .map(|stem| format!("{}.yml", stem))
        .unwrap_or_else(|| FALLBACK_CONFIG_NAME.to_string());

    match std::env::current_dir() {
        Ok(dir) => dir.join(name),
        Err(_) => PathBuf::from(name),
    }
}
