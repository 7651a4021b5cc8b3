//! # Shell Environment Record
//!
//! Facts discovered while a run progresses (repository URLs, local paths,
//! previous and current revisions, user variables) are collected into named
//! sections of `KEY="VALUE"` pairs and written out once as a script that can
//! be sourced by a POSIX shell:
//!
//! ```text
//! #
//! # Lib
//! #
//! REPO_LIB_URL="https://host/svn/lib/trunk"
//! REPO_LIB_LOCAL="./wc"
//! ```
//!
//! Sections keep the order in which they were first appended to, and keys keep
//! the order in which they were first set. Setting a key again overwrites its
//! value in place.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::error::Result;

/// Sanitizes `key` into an uppercase shell identifier.
///
/// ASCII letters are uppercased and every character outside `[A-Z0-9_]` is
/// dropped, so `my-lib` becomes `MYLIB`. Repeated underscores then collapse
/// and leading/trailing underscores are removed. The result is empty only
/// when the input has no letters or digits.
pub fn sanitize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for ch in key.chars().map(|ch| ch.to_ascii_uppercase()) {
        if !(ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_') {
            continue;
        }
        if ch == '_' && out.ends_with('_') {
            continue;
        }
        out.push(ch);
    }
    out.trim_matches('_').to_string()
}

#[derive(Debug, Clone, Default)]
struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    fn set(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }
}

/// Sectioned key/value record with a sink it is committed to.
pub struct ShellEnv {
    name: String,
    sink: Box<dyn Write>,
    sections: Vec<Section>,
}

impl std::fmt::Debug for ShellEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellEnv")
            .field("name", &self.name)
            .field("sections", &self.sections)
            .finish_non_exhaustive()
    }
}

impl ShellEnv {
    /// Creates an empty record writing to `sink`. `name` identifies the sink
    /// in log output.
    pub fn new(name: impl Into<String>, sink: Box<dyn Write>) -> Self {
        Self {
            name: name.into(),
            sink,
            sections: Vec::new(),
        }
    }

    /// A record whose output is thrown away.
    pub fn discard() -> Self {
        Self::new("<bitbucket>", Box::new(io::sink()))
    }

    pub fn stdout() -> Self {
        Self::new("<stdout>", Box::new(io::stdout()))
    }

    pub fn stderr() -> Self {
        Self::new("<stderr>", Box::new(io::stderr()))
    }

    /// A record written to the file at `path`, creating parent directories and
    /// truncating any existing file.
    pub fn file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = fs::File::create(path)?;
        Ok(Self::new(path.display().to_string(), Box::new(file)))
    }

    /// Resolves a command-line target: `None` discards, `-` is stdout, `+` is
    /// stderr, anything else is a file path.
    pub fn from_target(target: Option<&str>) -> Result<Self> {
        match target {
            None | Some("") => Ok(Self::discard()),
            Some("-") => Ok(Self::stdout()),
            Some("+") => Ok(Self::stderr()),
            Some(path) => Self::file(Path::new(path)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets `key` (sanitized) to `value` in `section`.
    pub fn append(&mut self, section: &str, key: &str, value: &str) {
        let key = sanitize_key(key);
        let index = match self.sections.iter().position(|s| s.name == section) {
            Some(index) => index,
            None => {
                self.sections.push(Section {
                    name: section.to_string(),
                    entries: Vec::new(),
                });
                self.sections.len() - 1
            }
        };
        self.sections[index].set(key, value.to_string());
    }

    /// Returns the current value of `key` (sanitized) in `section`.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let key = sanitize_key(key);
        self.sections
            .iter()
            .find(|s| s.name == section)?
            .entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Section names in insertion order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    /// Renders every section as shell script text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (n, section) in self.sections.iter().enumerate() {
            if n > 0 {
                out.push('\n');
            }
            out.push_str("# \n");
            out.push_str(&format!("# {}\n", section.name));
            out.push_str("# \n");
            for (key, value) in &section.entries {
                out.push_str(&format!("{}=\"{}\"\n", key, value));
            }
        }
        out
    }

    /// Writes the rendered record to the sink and flushes it. Returns the
    /// number of bytes written.
    pub fn commit(&mut self) -> Result<usize> {
        let text = self.render();
        self.sink.write_all(text.as_bytes())?;
        self.sink.flush()?;
        Ok(text.len())
    }
}
