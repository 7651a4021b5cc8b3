//! Process exit codes.
//!
//! Scripting callers branch on these instead of parsing error text. Codes are
//! grouped by the phase that produced them: 1x configuration, 2x repository,
//! 10x package pipeline.

/// The run completed.
pub const SUCCESS: u8 = 0;

/// Only-if-changed mode was requested and no working copy changed.
pub const UP_TO_DATE: u8 = 2;

pub const CONFIG_DIRECTORY_NOT_FOUND: u8 = 10;
pub const CONFIG_FILE_NOT_FOUND: u8 = 11;
pub const INVALID_CONFIG_PATH: u8 = 12;
pub const NOT_REGULAR_FILE: u8 = 13;

pub const INVALID_REPOSITORY: u8 = 20;
pub const CONNECTION_FAILED: u8 = 21;
pub const EXPORT_FAILED: u8 = 22;
pub const UNKNOWN_REVISION: u8 = 23;

/// Catch-all for failures without a dedicated code (YAML syntax, I/O).
pub const FAILURE: u8 = 99;

pub const INVALID_IGNORE_PATTERN: u8 = 100;
pub const INVALID_COMPRESS_METHOD: u8 = 101;
pub const COPY_FAILED: u8 = 102;
pub const ARCHIVE_FAILED: u8 = 103;
