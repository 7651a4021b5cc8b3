//! # Package Compression
//!
//! Writes an assembled package directory into a single archive file. Three
//! formats are supported, selected by [`CompressMethod`]:
//!
//! | method | accepted names | canonical extension |
//! |--------|----------------|---------------------|
//! | zip    | `zip`          | `.zip`              |
//! | tar + gzip  | `gz`, `tgz`, `targz`, `tar.gz`        | `.tar.gz` |
//! | tar + bzip2 | `bz2`, `tbz`, `tbz2`, `tarbz2`, `tar.bz2` | `.tar.bz2` |
//!
//! Names may carry a leading dot and are matched case-insensitively. A
//! package that sets an output must name its method; an empty or missing
//! method is rejected like any unknown name.
//!
//! Each source directory is stored under its own base name, so archiving
//! `out/pkg` yields entries `pkg/...`. Zip output stores files that are
//! already compressed (by extension) without recompressing them.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Archive format of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressMethod {
    Zip,
    TarGz,
    TarBz2,
    /// A name no format answers to, possibly empty; rejected when
    /// compression runs.
    Unrecognized(String),
}

/// No method named.
impl Default for CompressMethod {
    fn default() -> Self {
        CompressMethod::Unrecognized(String::new())
    }
}

impl CompressMethod {
    pub fn parse(name: &str) -> Self {
        let trimmed = name.trim();
        match trimmed.to_lowercase().trim_start_matches('.') {
            "zip" => CompressMethod::Zip,
            "gz" | "tgz" | "targz" | "tar.gz" => CompressMethod::TarGz,
            "bz2" | "tbz" | "tbz2" | "tarbz2" | "tar.bz2" => CompressMethod::TarBz2,
            _ => CompressMethod::Unrecognized(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CompressMethod::Zip => "zip",
            CompressMethod::TarGz => "tar.gz",
            CompressMethod::TarBz2 => "tar.bz2",
            CompressMethod::Unrecognized(name) => name,
        }
    }

    /// Fails with [`Error::InvalidCompressMethod`] for unrecognized names.
    pub fn ensure_supported(&self) -> Result<()> {
        match self {
            CompressMethod::Unrecognized(name) => Err(Error::InvalidCompressMethod {
                method: name.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// The extension appended by [`CompressMethod::normalize_output`].
    pub fn extension(&self) -> &'static str {
        match self {
            CompressMethod::Zip => ".zip",
            CompressMethod::TarGz => ".tar.gz",
            CompressMethod::TarBz2 => ".tar.bz2",
            CompressMethod::Unrecognized(_) => "",
        }
    }

    fn accepted_extensions(&self) -> &'static [&'static str] {
        match self {
            CompressMethod::Zip => &[".zip"],
            CompressMethod::TarGz => &[".tar.gz", ".tgz"],
            CompressMethod::TarBz2 => &[".tar.bz2", ".tbz2"],
            CompressMethod::Unrecognized(_) => &[],
        }
    }

    /// Whether `output` already ends in an extension this format accepts.
    pub fn check_extension(&self, output: &str) -> bool {
        let lower = output.to_lowercase();
        self.accepted_extensions()
            .iter()
            .any(|ext| lower.ends_with(ext))
    }

    /// Returns `output` with an extension this format accepts.
    ///
    /// An output that already has one is returned unchanged. Otherwise its last
    /// extension, if any, is replaced by the canonical one.
    pub fn normalize_output(&self, output: &str) -> String {
        if self.check_extension(output) {
            return output.to_string();
        }
        let stem = match last_extension_start(output) {
            Some(index) => &output[..index],
            None => output,
        };
        format!("{}{}", stem, self.extension())
    }
}

/// Byte index of the final `.ext` in the last path component of `path`.
fn last_extension_start(path: &str) -> Option<usize> {
    let name_start = path.rfind(['/', '\\']).map_or(0, |i| i + 1);
    path[name_start..].rfind('.').map(|i| name_start + i)
}

impl fmt::Display for CompressMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CompressMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CompressMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name: Option<String> = Option::deserialize(deserializer)?;
        Ok(Self::parse(name.as_deref().unwrap_or_default()))
    }
}

/// Options for [`archive`].
#[derive(Debug, Clone, Default)]
pub struct ArchiveOptions {
    pub method: CompressMethod,
    /// 1 (fastest) to 9 (smallest); anything else selects the codec default.
    pub level: i32,
    /// Replace an existing file at the output path.
    pub overwrite: bool,
}

impl ArchiveOptions {
    fn level(&self) -> Option<u32> {
        match self.level {
            1..=9 => Some(self.level as u32),
            _ => None,
        }
    }
}

/// Extensions of files whose content is already compressed.
const COMPRESSED_EXTENSIONS: &[&str] = &[
    "7z", "bz2", "gz", "jar", "jpeg", "jpg", "lz", "lzma", "mp3", "mp4", "png", "rar", "tbz2",
    "tgz", "xz", "zip", "zst",
];

fn is_compressed(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| COMPRESSED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Archives `sources` into `output`.
///
/// Parent directories of `output` are created. An existing `output` is an
/// error unless [`ArchiveOptions::overwrite`] is set. The output file is never
/// archived into itself when it lies inside a source tree.
pub fn archive(sources: &[PathBuf], output: &Path, options: &ArchiveOptions) -> Result<()> {
    options.method.ensure_supported()?;
    let wrap = |e: io::Error| Error::Archive {
        output: output.display().to_string(),
        message: e.to_string(),
    };

    if !options.overwrite && output.exists() {
        return Err(Error::Archive {
            output: output.display().to_string(),
            message: "file already exists".to_string(),
        });
    }
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(wrap)?;
        }
    }

    let partial = partial_path(output);
    let excluded = [
        std::path::absolute(output).map_err(wrap)?,
        std::path::absolute(&partial).map_err(wrap)?,
    ];
    let entries = collect_entries(sources, &excluded).map_err(wrap)?;
    log::debug!("archiving {} entries into {}", entries.len(), output.display());

    let result = fs::File::create(&partial).and_then(|file| match options.method {
        CompressMethod::Zip => write_zip(&entries, file, options),
        CompressMethod::TarGz => {
            let level = options
                .level()
                .map_or_else(flate2::Compression::default, flate2::Compression::new);
            let encoder = flate2::write::GzEncoder::new(file, level);
            write_tar(&entries, encoder)?.finish().map(drop)
        }
        CompressMethod::TarBz2 => {
            let level = options
                .level()
                .map_or_else(bzip2::Compression::default, bzip2::Compression::new);
            let encoder = bzip2::write::BzEncoder::new(file, level);
            write_tar(&entries, encoder)?.finish().map(drop)
        }
        CompressMethod::Unrecognized(_) => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "unrecognized compress method",
        )),
    });

    match result {
        Ok(()) => fs::rename(&partial, output).map_err(wrap),
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(wrap(e))
        }
    }
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    output.with_file_name(name)
}

/// Base name a source is stored under.
fn root_name(source: &Path) -> io::Result<String> {
    let absolute = std::path::absolute(source)?;
    absolute
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot archive {}: no base name", source.display()),
            )
        })
}

/// A filesystem object and the slash-separated name it is stored under.
struct Entry {
    path: PathBuf,
    name: String,
    file_type: fs::FileType,
}

fn collect_entries(sources: &[PathBuf], excluded: &[PathBuf]) -> io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for source in sources {
        let root = root_name(source)?;
        for entry in WalkDir::new(source).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if excluded.contains(&std::path::absolute(entry.path())?) {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let mut name = root.clone();
            for component in relative.components() {
                name.push('/');
                name.push_str(&component.as_os_str().to_string_lossy());
            }
            entries.push(Entry {
                path: entry.path().to_path_buf(),
                name,
                file_type: entry.file_type(),
            });
        }
    }
    Ok(entries)
}

fn write_tar<W: Write>(entries: &[Entry], writer: W) -> io::Result<W> {
    let mut builder = tar::Builder::new(writer);
    builder.follow_symlinks(false);
    for entry in entries {
        if entry.file_type.is_dir() {
            builder.append_dir(&entry.name, &entry.path)?;
        } else {
            builder.append_path_with_name(&entry.path, &entry.name)?;
        }
    }
    builder.into_inner()
}

fn write_zip(entries: &[Entry], file: fs::File, options: &ArchiveOptions) -> io::Result<()> {
    let mut zip = zip::ZipWriter::new(file);
    let deflated = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .compression_level(options.level().map(i64::from));
    let stored =
        zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    for entry in entries {
        let mode = unix_mode(&entry.path.symlink_metadata()?);
        let name = entry.name.clone();
        if entry.file_type.is_dir() {
            zip.add_directory(name, with_mode(deflated, mode))?;
        } else if entry.file_type.is_symlink() {
            let target = fs::read_link(&entry.path)?;
            zip.add_symlink(name, target.to_string_lossy(), with_mode(stored, mode))?;
        } else {
            let options = if is_compressed(&entry.path) {
                stored
            } else {
                deflated
            };
            zip.start_file(name, with_mode(options, mode))?;
            let mut reader = fs::File::open(&entry.path)?;
            io::copy(&mut reader, &mut zip)?;
        }
    }
    zip.finish()?;
    Ok(())
}

fn with_mode(
    options: zip::write::SimpleFileOptions,
    mode: Option<u32>,
) -> zip::write::SimpleFileOptions {
    match mode {
        Some(mode) => options.unix_permissions(mode),
        None => options,
    }
}

#[cfg(unix)]
fn unix_mode(meta: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(meta.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn unix_mode(_meta: &fs::Metadata) -> Option<u32> {
    None
}
