//! # Error Handling
//!
//! This module defines the centralized error type for `grabpack`. It uses the
//! `thiserror` library to build a single `Error` enum whose variants mirror
//! the phase in which a run can fail:
//!
//! - **Configuration errors**: the configuration file or its directory is
//!   missing, is the wrong kind of filesystem object, or does not parse.
//! - **Repository errors**: a repository locator is malformed, the remote is
//!   unreachable, the fetch fails, or the working copy cannot report its
//!   revision.
//! - **Pipeline errors**: an ignore pattern does not compile, a compression
//!   method is unknown, or a copy/archive operation fails.
//!
//! One variant, [`Error::UpToDate`], is not a fault at all. It is returned when
//! the caller asked to stop early if no working copy changed, so that a host
//! process can branch on it like any other outcome.
//!
//! Every variant carries the offending identifier (path, URL, pattern, method)
//! as data, and [`Error::exit_code`] maps each one to the process exit codes
//! defined in [`crate::exit_codes`].

use thiserror::Error;

use crate::exit_codes;

/// Main error type for grabpack operations
#[derive(Error, Debug)]
pub enum Error {
    /// The directory that should contain the configuration file does not exist.
    #[error("directory not found: {path}")]
    ConfigDirectoryNotFound { path: String },

    /// The configuration file does not exist.
    #[error("configuration file not found: {path}")]
    ConfigFileNotFound { path: String },

    /// The configuration file's parent path exists but is not a directory.
    #[error("invalid file path: {path}")]
    InvalidConfigPath { path: String },

    /// The configuration path exists but is not a regular file.
    #[error("not a regular file: {path}")]
    NotRegularFile { path: String },

    /// The configuration parsed as YAML but is semantically unusable.
    ///
    /// Includes an optional hint about how to fix it.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A repository handle could not be constructed from an export entry.
    #[error("invalid repository: {name}: {message}")]
    InvalidRepository { name: String, message: String },

    /// The remote repository could not be reached.
    #[error("failed to connect to repository: {url}")]
    ConnectionFailed { url: String },

    /// Checkout or update of a working copy failed.
    #[error("failed to export repository: {url}: {message}")]
    ExportFailed { url: String, message: String },

    /// The working copy could not report a revision after a successful fetch.
    #[error("cannot determine revision of repository: {path}: {message}")]
    UnknownRevision { path: String, message: String },

    /// An ignore pattern is not a valid regular expression.
    #[error("invalid ignore pattern: {pattern}: {message}")]
    InvalidIgnorePattern { pattern: String, message: String },

    /// A package declared a compression method that is not supported.
    #[error("invalid compress method: '{method}'")]
    InvalidCompressMethod { method: String },

    /// A recursive copy failed.
    #[error("copy failed: {src} -> {dst}: {message}")]
    Copy {
        src: String,
        dst: String,
        message: String,
    },

    /// Writing a compressed archive failed.
    #[error("archive failed: {output}: {message}")]
    Archive { output: String, message: String },

    /// No working copy changed and the caller asked to stop in that case.
    #[error("all working copies up-to-date")]
    UpToDate,

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::ConfigDirectoryNotFound { .. } => exit_codes::CONFIG_DIRECTORY_NOT_FOUND,
            Error::ConfigFileNotFound { .. } => exit_codes::CONFIG_FILE_NOT_FOUND,
            Error::InvalidConfigPath { .. } => exit_codes::INVALID_CONFIG_PATH,
            Error::NotRegularFile { .. } => exit_codes::NOT_REGULAR_FILE,
            Error::InvalidRepository { .. } => exit_codes::INVALID_REPOSITORY,
            Error::ConnectionFailed { .. } => exit_codes::CONNECTION_FAILED,
            Error::ExportFailed { .. } => exit_codes::EXPORT_FAILED,
            Error::UnknownRevision { .. } => exit_codes::UNKNOWN_REVISION,
            Error::InvalidIgnorePattern { .. } => exit_codes::INVALID_IGNORE_PATTERN,
            Error::InvalidCompressMethod { .. } => exit_codes::INVALID_COMPRESS_METHOD,
            Error::Copy { .. } => exit_codes::COPY_FAILED,
            Error::Archive { .. } => exit_codes::ARCHIVE_FAILED,
            Error::UpToDate => exit_codes::UP_TO_DATE,
            Error::ConfigParse { .. } | Error::Io(_) | Error::Yaml(_) => exit_codes::FAILURE,
        }
    }

    /// Whether this is the controlled "nothing changed" termination rather
    /// than a fault.
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, Error::UpToDate)
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
