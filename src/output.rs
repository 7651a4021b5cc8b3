//! # Operator Output
//!
//! This module controls what an operator sees while `grabpack` runs: whether
//! colors are used, and the line-oriented progress narration.
//!
//! ## Respecting User Preferences
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! ## Narration
//!
//! A [`Narrator`] writes one line per step. A step starts with a level symbol,
//! a class in brackets and a message, and is left open until it completes:
//!
//! ```text
//!    [checkout] https://host/svn/lib/trunk -> wc/trunk ... (42)
//!    [copy] wc/trunk/src -> pkg/src ... (ok)
//!  ! [copy] invalid ignore pattern: (: unclosed group
//! ```

use std::env;
use std::fmt::Display;
use std::io::{self, Write};

/// Output configuration for controlling colors.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// # Arguments
    /// * `color_flag` - The value of the --color CLI flag: "always", "never", or "auto"
    ///
    /// In auto mode, colors are disabled if:
    /// - `NO_COLOR` environment variable is set (any value, including empty)
    /// - `CLICOLOR=0` is set
    /// - `TERM=dumb` is set
    /// - stdout is not a TTY (unless `CLICOLOR_FORCE=1`)
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    /// Detect whether color output is supported based on environment.
    fn detect_color_support() -> bool {
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    /// Create a configuration with colors always enabled.
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// Create a configuration with colors always disabled.
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Severity of a narration line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

impl Level {
    pub fn symbol(self) -> char {
        match self {
            Level::Info => ' ',
            Level::Error => '!',
        }
    }
}

/// Line-oriented progress narration.
///
/// Write failures are ignored; narration never aborts a run.
pub struct Narrator {
    sink: Box<dyn Write>,
    config: OutputConfig,
    /// A started step is waiting for its result.
    open: bool,
}

impl std::fmt::Debug for Narrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Narrator")
            .field("config", &self.config)
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

impl Narrator {
    pub fn new(sink: Box<dyn Write>, config: OutputConfig) -> Self {
        Self {
            sink,
            config,
            open: false,
        }
    }

    /// Narration to standard output.
    pub fn stdout(config: OutputConfig) -> Self {
        Self::new(Box::new(io::stdout()), config)
    }

    /// Narration that is discarded.
    pub fn quiet() -> Self {
        Self::new(Box::new(io::sink()), OutputConfig::without_color())
    }

    fn prefix(&self, level: Level, class: &str) -> String {
        let symbol = console::style(level.symbol())
            .red()
            .bold()
            .force_styling(self.config.use_color);
        let class = console::style(class)
            .cyan()
            .force_styling(self.config.use_color);
        format!(" {} [{}] ", symbol, class)
    }

    fn close(&mut self) {
        if self.open {
            let _ = writeln!(self.sink);
            self.open = false;
        }
    }

    /// Starts a step. The line stays open until [`Narrator::done`] or
    /// [`Narrator::fail`].
    pub fn start(&mut self, class: &str, message: impl Display) {
        self.close();
        let prefix = self.prefix(Level::Info, class);
        let _ = write!(self.sink, "{}{} ... ", prefix, message);
        let _ = self.sink.flush();
        self.open = true;
    }

    /// Completes the open step with `result`.
    pub fn done(&mut self, result: impl Display) {
        let result = console::style(format!("({})", result))
            .green()
            .force_styling(self.config.use_color);
        let _ = write!(self.sink, "{}", result);
        self.open = true;
        self.close();
        let _ = self.sink.flush();
    }

    /// Ends the open step, if any, and reports `error` on its own line.
    pub fn fail(&mut self, class: &str, error: impl Display) {
        self.close();
        self.line(Level::Error, class, error);
    }

    /// Writes a complete line.
    pub fn info(&mut self, class: &str, message: impl Display) {
        self.close();
        self.line(Level::Info, class, message);
    }

    fn line(&mut self, level: Level, class: &str, message: impl Display) {
        let prefix = self.prefix(level, class);
        let _ = writeln!(self.sink, "{}{}", prefix, message);
        let _ = self.sink.flush();
    }
}

impl Drop for Narrator {
    fn drop(&mut self) {
        self.close();
        let _ = self.sink.flush();
    }
}
