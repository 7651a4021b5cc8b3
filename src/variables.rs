//! # Variable Substitution
//!
//! Free-text configuration fields (export names, URLs, paths, ignore patterns,
//! archive outputs) may reference variables as `$NAME`. A [`Variables`] table
//! maps each token, including its `$` prefix, to a replacement string.
//!
//! The table starts with builtin values computed when it is created:
//!
//! - `$DATETIME`: local date-time formatted as `YYYYMMDD-hhmmss`
//!
//! Bindings supplied on the command line overwrite builtins.
//!
//! Substitution is a single left-to-right scan. Where several tokens start at
//! the same position, the longest one wins, so `$DATETIME` is never split into
//! a shorter `$DATE` binding. Replacement values are copied verbatim and never
//! scanned again. Tokens are plain substrings with no delimiter or escape
//! syntax, which means `$LIB` also matches the front of `$LIBRARY` when only
//! the former is bound.

use std::collections::BTreeMap;

/// Prefix that turns an identifier into a token.
pub const TOKEN_PREFIX: char = '$';

/// Token bound to the current local date-time.
pub const DATETIME: &str = "$DATETIME";

/// `chrono` format used for [`DATETIME`].
const DATETIME_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Run-scoped table of substitution tokens.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: BTreeMap<String, String>,
    /// Identifiers (without prefix) bound through [`Variables::define`].
    user: BTreeMap<String, String>,
}

impl Variables {
    /// Creates a table seeded with the builtin variables.
    pub fn new() -> Self {
        let mut vars = Self::empty();
        vars.set(
            DATETIME,
            chrono::Local::now().format(DATETIME_FORMAT).to_string(),
        );
        vars
    }

    /// Creates a table with no bindings at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Binds `token` literally, overwriting any previous value.
    pub fn set(&mut self, token: impl Into<String>, value: impl Into<String>) {
        self.values.insert(token.into(), value.into());
    }

    /// Binds `$ident` to `value` as a user-supplied variable.
    pub fn define(&mut self, ident: &str, value: &str) {
        self.set(format!("{}{}", TOKEN_PREFIX, ident), value);
        self.user.insert(ident.to_string(), value.to_string());
    }

    /// Returns the value bound to `token`.
    pub fn get(&self, token: &str) -> Option<&str> {
        self.values.get(token).map(String::as_str)
    }

    /// User-supplied bindings as `(ident, value)`, sorted by identifier.
    pub fn user_bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.user.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replaces every occurrence of every known token in `text`.
    pub fn substitute(&self, text: &str) -> String {
        if self.values.is_empty() || text.is_empty() {
            return text.to_string();
        }

        // Longest first, so the first hit at a position is the longest match.
        let mut tokens: Vec<(&str, &str)> = self
            .values
            .iter()
            .filter(|(token, _)| !token.is_empty())
            .map(|(token, value)| (token.as_str(), value.as_str()))
            .collect();
        tokens.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

        let mut result = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(ch) = rest.chars().next() {
            match tokens.iter().find(|(token, _)| rest.starts_with(token)) {
                Some((token, value)) => {
                    result.push_str(value);
                    rest = &rest[token.len()..];
                }
                None => {
                    result.push(ch);
                    rest = &rest[ch.len_utf8()..];
                }
            }
        }
        result
    }

    /// Substitutes each string of `items` in place.
    pub fn substitute_all(&self, items: &mut [String]) {
        for item in items.iter_mut() {
            *item = self.substitute(item);
        }
    }
}

/// Splits a `VAR=VAL` argument into its identifier and value.
///
/// Returns `None` when the argument has no `=`. The value may be empty and may
/// itself contain `=`.
pub fn parse_binding(arg: &str) -> Option<(&str, &str)> {
    arg.split_once('=')
}
