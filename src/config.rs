//! # Configuration Schema and Parsing
//!
//! This module defines the data structures that represent a `grabpack`
//! configuration file and the logic for loading and saving it.
//!
//! ## Layout
//!
//! ```yaml
//! export:
//!   Lib:                           # export entry name
//!     repo: https://host/svn/lib   # remote locator
//!     path: trunk                  # sub-path inside the repository
//!     local: ./wc                  # local working-copy root
//!     last: "1234"                 # last exported revision (maintained by grabpack)
//! package:
//!   ./pkg:                         # package destination
//!     include:
//!       - Lib:                     # export name, or a literal source path
//!           - copy:
//!               repo: src          # path relative to the source
//!               package: src       # path relative to the package destination
//!               conflict: merge    # merge | replace | untouchable
//!               symlinks: skip     # deep | shallow | skip
//!               ignore: ['\.svn$'] # regular expressions
//!     compress:
//!       output: ./dist/pkg.zip
//!       overwrite: true
//!       method: zip                # zip | tar.gz | tar.bz2 (and aliases)
//!       level: 9
//! ```
//!
//! Every map is a `BTreeMap`, so export entries and packages are processed in
//! sorted key order and a saved file is stable across runs.
//!
//! Scalar fields are decoded leniently: a missing or `null` value becomes the
//! field's default, and numbers or booleans given for string fields are kept as
//! their text (`last: 1234` reads as `"1234"`).
//!
//! Policy strings (`conflict`, `symlinks`, `method`) are parsed once, here, into
//! the closed types [`ConflictPolicy`], [`SymlinkPolicy`] and [`CompressMethod`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};

use crate::archive::CompressMethod;
use crate::copy::{ConflictPolicy, SymlinkPolicy};
use crate::error::{Error, Result};

/// Decodes `null` or a missing value as `T::default()`.
fn null_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decodes any YAML scalar as its string form.
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;
    use serde_yaml::Value;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(D::Error::custom(format!(
            "expected a scalar value, found {:?}",
            other
        ))),
    }
}

fn scalar_strings<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Scalar(#[serde(deserialize_with = "scalar_string")] String);

    let items: Option<Vec<Scalar>> = Option::deserialize(deserializer)?;
    Ok(items
        .unwrap_or_default()
        .into_iter()
        .map(|Scalar(s)| s)
        .collect())
}

/// One repository to export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Remote repository locator.
    #[serde(default, deserialize_with = "scalar_string")]
    pub repo: String,
    /// Sub-path within the repository.
    #[serde(default, deserialize_with = "scalar_string")]
    pub path: String,
    /// Local working-copy root.
    #[serde(default, deserialize_with = "scalar_string")]
    pub local: String,
    /// Revision recorded by the previous successful run.
    #[serde(default, deserialize_with = "scalar_string")]
    pub last: String,
}

impl ExportConfig {
    /// Remote URL of the exported sub-path.
    ///
    /// The scheme prefix (`https://`) is kept intact; the remainder is joined
    /// with [`ExportConfig::path`] and cleaned of duplicate separators and `.`
    /// segments.
    pub fn url(&self) -> String {
        match split_scheme(&self.repo) {
            Some((scheme, rest)) => format!("{}{}", scheme, join_clean(rest, &self.path)),
            None => join_clean(&self.repo, &self.path),
        }
    }

    /// Local working-copy path of the exported sub-path.
    pub fn working_copy(&self) -> PathBuf {
        let sub = self.path.trim_start_matches(['/', '\\']);
        if sub.is_empty() {
            PathBuf::from(&self.local)
        } else {
            Path::new(&self.local).join(sub)
        }
    }

    /// Whether a previous revision has been recorded.
    pub fn has_last(&self) -> bool {
        !self.last.is_empty()
    }
}

/// Splits a leading `scheme://` (surrounding whitespace allowed) from `locator`.
fn split_scheme(locator: &str) -> Option<(&str, &str)> {
    let index = locator.find("://")?;
    let scheme = locator[..index].trim_start();
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(locator.split_at(index + 3))
}

/// Joins two `/`-separated paths, dropping empty and `.` segments and
/// resolving `..` lexically.
fn join_clean(base: &str, sub: &str) -> String {
    let rooted = base.starts_with('/') || (base.is_empty() && sub.starts_with('/'));
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(sub.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            _ => segments.push(segment),
        }
    }
    let joined = segments.join("/");
    if rooted {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// A single copy from an include source into a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyOp {
    /// Source path, relative to the include source unless absolute.
    #[serde(default, deserialize_with = "scalar_string")]
    pub repo: String,
    /// Destination path, relative to the package destination unless absolute.
    #[serde(default, deserialize_with = "scalar_string")]
    pub package: String,
    /// What to do when a destination directory already exists.
    #[serde(default)]
    pub conflict: ConflictPolicy,
    /// What to do with symbolic links in the source.
    #[serde(default)]
    pub symlinks: SymlinkPolicy,
    /// Regular expressions; matching source paths are not copied.
    #[serde(default, deserialize_with = "scalar_strings")]
    pub ignore: Vec<String>,
}

impl CopyOp {
    /// A copy needs both ends; incomplete entries are skipped.
    pub fn is_complete(&self) -> bool {
        !self.repo.is_empty() && !self.package.is_empty()
    }
}

/// One operation of an include group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeOp {
    #[serde(default, deserialize_with = "null_default")]
    pub copy: CopyOp,
}

/// Maps one include source (export name or literal path) to its operations.
///
/// Written as a single-key map in YAML.
pub type IncludeGroup = BTreeMap<String, Vec<IncludeOp>>;

/// Archive settings for a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressConfig {
    /// Archive path; empty disables compression.
    #[serde(default, deserialize_with = "scalar_string")]
    pub output: String,
    /// Replace an existing archive at `output`.
    #[serde(default, deserialize_with = "null_default")]
    pub overwrite: bool,
    #[serde(default)]
    pub method: CompressMethod,
    /// Compression level, 1 (fastest) to 9 (smallest); other values use the
    /// codec default.
    #[serde(default, deserialize_with = "null_default")]
    pub level: i32,
}

impl CompressConfig {
    pub fn is_enabled(&self) -> bool {
        !self.output.is_empty()
    }
}

/// How one package is assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Carried through load and save; no behavior is attached to it.
    #[serde(default, deserialize_with = "null_default")]
    pub roster: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub include: Vec<IncludeGroup>,
    #[serde(default, deserialize_with = "null_default")]
    pub compress: CompressConfig,
}

/// A parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// File the configuration was loaded from and is saved back to.
    #[serde(skip)]
    path: PathBuf,
    /// Document as read, so a save rewrites only the revisions.
    #[serde(skip)]
    document: Value,
    #[serde(default, deserialize_with = "null_default")]
    pub export: BTreeMap<String, ExportConfig>,
    #[serde(default, deserialize_with = "null_default")]
    pub package: BTreeMap<String, PackageConfig>,
}

impl Config {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sets the file [`Config::save`] writes to.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
    }

    /// Checks structural rules serde cannot express.
    fn validate(&self) -> Result<()> {
        for (destination, package) in &self.package {
            for (index, group) in package.include.iter().enumerate() {
                if group.len() != 1 {
                    return Err(Error::ConfigParse {
                        message: format!(
                            "package '{}': include item {} names {} sources, expected exactly 1",
                            destination,
                            index + 1,
                            group.len()
                        ),
                        hint: Some(
                            "Start a new '- <source>:' list item for each source".to_string(),
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Writes the configuration back to the file it was loaded from,
    /// keeping that file's permissions.
    ///
    /// When the configuration came from a document, only each export's
    /// `last` field is replaced in it. Everything else keeps the spelling the
    /// user wrote (`conflict: skip` is not rewritten to `untouchable`).
    pub fn save(&self) -> Result<()> {
        let data = match &self.document {
            Value::Mapping(document) => {
                let mut document = document.clone();
                self.merge_revisions(&mut document);
                serde_yaml::to_string(&document)?
            }
            _ => serde_yaml::to_string(self)?,
        };
        let permissions = fs::metadata(&self.path)?.permissions();
        fs::write(&self.path, data)?;
        fs::set_permissions(&self.path, permissions)?;
        Ok(())
    }

    fn merge_revisions(&self, document: &mut Mapping) {
        if self.export.is_empty() {
            return;
        }
        ensure_mapping(document, "export");
        let Some(Value::Mapping(exports)) = document.get_mut("export") else {
            return;
        };
        for (name, entry) in &self.export {
            ensure_mapping(exports, name);
            if let Some(Value::Mapping(fields)) = exports.get_mut(name.as_str()) {
                fields.insert(Value::from("last"), Value::from(entry.last.as_str()));
            }
        }
    }
}

/// Replaces a missing or non-mapping value under `key` with an empty mapping.
fn ensure_mapping(parent: &mut Mapping, key: &str) {
    if !parent.get(key).is_some_and(Value::is_mapping) {
        parent.insert(Value::from(key), Value::Mapping(Mapping::new()));
    }
}

/// Parses configuration YAML.
///
/// An empty document (or one holding only comments) is an empty configuration.
pub fn parse(yaml_content: &str) -> Result<Config> {
    let value: Value = serde_yaml::from_str(yaml_content)?;
    let mut config = if value.is_null() {
        Config::default()
    } else {
        serde_yaml::from_value::<Config>(value.clone())?
    };
    config.document = value;
    config.validate()?;
    Ok(config)
}

/// Loads the configuration file at `path`.
///
/// The containing directory must exist and be a directory, and `path` itself
/// must be a regular file; each violation has its own error.
pub fn load(path: &Path) -> Result<Config> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match fs::metadata(dir) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::ConfigDirectoryNotFound {
                path: dir.display().to_string(),
            });
        }
        Err(e) => return Err(e.into()),
        Ok(meta) if !meta.is_dir() => {
            return Err(Error::InvalidConfigPath {
                path: dir.display().to_string(),
            });
        }
        Ok(_) => {}
    }

    match fs::metadata(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::ConfigFileNotFound {
                path: path.display().to_string(),
            });
        }
        Err(e) => return Err(e.into()),
        Ok(meta) if !meta.is_file() => {
            return Err(Error::NotRegularFile {
                path: path.display().to_string(),
            });
        }
        Ok(_) => {}
    }

    let content = fs::read_to_string(path)?;
    let mut config = parse(&content)?;
    config.path = path.to_path_buf();
    Ok(config)
}
