//! # Recursive Copy
//!
//! Copies a file or directory tree from a source path to a destination path
//! under three policies:
//!
//! - [`SymlinkPolicy`]: follow links and copy what they point at (`deep`),
//!   recreate the link itself (`shallow`), or leave it out (`skip`).
//! - [`ConflictPolicy`]: when a destination directory already exists, copy
//!   into it (`merge`), delete it first (`replace`), or leave it alone
//!   (`untouchable`).
//! - A skip predicate, consulted for every source path including the root.
//!
//! Both paths are cleaned lexically first (see [`clean_path`]), so `pkg/.`
//! names the same directory as `pkg` even before it exists.
//!
//! Regular files always overwrite their destination counterpart, including
//! destinations left read-only by an earlier copy. With
//! [`CopyOptions::sync`] each written file is flushed to stable storage before
//! the copy moves on; with [`CopyOptions::preserve_times`] access and
//! modification times are carried over to files and directories. Permissions
//! are always carried over; a directory gets its permissions only after its
//! contents were written.
//!
//! Policy names are matched case-insensitively. Unknown or empty names resolve
//! to the policy's default instead of failing.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use filetime::FileTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Treatment of symbolic links found in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymlinkPolicy {
    /// Copy the link target's content.
    Deep,
    /// Recreate the link.
    Shallow,
    /// Leave the link out.
    #[default]
    Skip,
}

impl SymlinkPolicy {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "deep" => SymlinkPolicy::Deep,
            "shallow" => SymlinkPolicy::Shallow,
            "skip" => SymlinkPolicy::Skip,
            _ => SymlinkPolicy::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SymlinkPolicy::Deep => "deep",
            SymlinkPolicy::Shallow => "shallow",
            SymlinkPolicy::Skip => "skip",
        }
    }
}

/// Treatment of a destination directory that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Copy into the existing directory.
    #[default]
    Merge,
    /// Remove the existing directory, then copy.
    Replace,
    /// Keep the existing directory and copy nothing into it.
    Untouchable,
}

impl ConflictPolicy {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "merge" => ConflictPolicy::Merge,
            "replace" => ConflictPolicy::Replace,
            "untouchable" | "skip" | "ignore" => ConflictPolicy::Untouchable,
            _ => ConflictPolicy::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::Merge => "merge",
            ConflictPolicy::Replace => "replace",
            ConflictPolicy::Untouchable => "untouchable",
        }
    }
}

macro_rules! policy_serde {
    ($policy:ty) => {
        impl fmt::Display for $policy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $policy {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $policy {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let name: Option<String> = Option::deserialize(deserializer)?;
                Ok(Self::parse(name.as_deref().unwrap_or_default()))
            }
        }
    };
}

policy_serde!(SymlinkPolicy);
policy_serde!(ConflictPolicy);

/// Options for [`copy`].
pub struct CopyOptions<'a> {
    pub on_symlink: SymlinkPolicy,
    pub on_dir_conflict: ConflictPolicy,
    /// Source paths for which this returns `true` are not copied.
    pub skip: Box<dyn Fn(&Path) -> bool + 'a>,
    /// Flush each written file to stable storage.
    pub sync: bool,
    /// Carry access and modification times over.
    pub preserve_times: bool,
}

impl Default for CopyOptions<'_> {
    fn default() -> Self {
        Self {
            on_symlink: SymlinkPolicy::default(),
            on_dir_conflict: ConflictPolicy::default(),
            skip: Box::new(|_: &Path| false),
            sync: true,
            preserve_times: true,
        }
    }
}

impl fmt::Debug for CopyOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyOptions")
            .field("on_symlink", &self.on_symlink)
            .field("on_dir_conflict", &self.on_dir_conflict)
            .field("sync", &self.sync)
            .field("preserve_times", &self.preserve_times)
            .finish_non_exhaustive()
    }
}

/// Removes `.` components and resolves `..` against preceding normal
/// components, without touching the filesystem.
///
/// A `..` that would climb above a root is dropped; leading `..` of a
/// relative path are kept. An empty result is `.`.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match cleaned.last() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => cleaned.push(component),
            },
            _ => cleaned.push(component),
        }
    }
    if cleaned.is_empty() {
        return PathBuf::from(".");
    }
    cleaned.iter().collect()
}

/// Copies `src` to `dst` recursively.
///
/// A missing `src` is an error. Any I/O failure aborts the copy; whatever was
/// already written stays in place.
pub fn copy(src: &Path, dst: &Path, options: &CopyOptions<'_>) -> Result<()> {
    let src = clean_path(src);
    let dst = clean_path(dst);
    copy_entry(&src, &dst, options).map_err(|e| Error::Copy {
        src: src.display().to_string(),
        dst: dst.display().to_string(),
        message: e.to_string(),
    })
}

fn copy_entry(src: &Path, dst: &Path, options: &CopyOptions<'_>) -> io::Result<()> {
    if (options.skip)(src) {
        log::trace!("skip {}", src.display());
        return Ok(());
    }

    let meta = fs::symlink_metadata(src)?;
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        copy_symlink(src, dst, options)
    } else if file_type.is_dir() {
        copy_dir(src, dst, &meta, options)
    } else {
        copy_file(src, dst, &meta, options)
    }
}

fn copy_symlink(src: &Path, dst: &Path, options: &CopyOptions<'_>) -> io::Result<()> {
    match options.on_symlink {
        SymlinkPolicy::Skip => Ok(()),
        SymlinkPolicy::Shallow => {
            let target = fs::read_link(src)?;
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            if fs::symlink_metadata(dst).is_ok() {
                remove_any(dst)?;
            }
            make_symlink(&target, src, dst)
        }
        SymlinkPolicy::Deep => {
            let target = fs::read_link(src)?;
            let resolved = match src.parent() {
                Some(parent) if target.is_relative() => parent.join(&target),
                _ => target,
            };
            let meta = fs::metadata(&resolved)?;
            if meta.is_dir() {
                copy_dir(&resolved, dst, &meta, options)
            } else {
                copy_file(&resolved, dst, &meta, options)
            }
        }
    }
}

fn copy_dir(src: &Path, dst: &Path, meta: &fs::Metadata, options: &CopyOptions<'_>) -> io::Result<()> {
    if fs::symlink_metadata(dst).is_ok() {
        match options.on_dir_conflict {
            ConflictPolicy::Merge => ensure_writable(dst)?,
            ConflictPolicy::Replace => remove_any(dst)?,
            ConflictPolicy::Untouchable => {
                log::debug!("leaving existing {} untouched", dst.display());
                return Ok(());
            }
        }
    }

    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        copy_entry(&entry.path(), &dst.join(entry.file_name()), options)?;
    }

    fs::set_permissions(dst, meta.permissions())?;
    if options.preserve_times {
        set_times(dst, meta)?;
    }
    Ok(())
}

fn copy_file(src: &Path, dst: &Path, meta: &fs::Metadata, options: &CopyOptions<'_>) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::symlink_metadata(dst) {
        Ok(existing) if existing.file_type().is_symlink() => fs::remove_file(dst)?,
        Ok(_) => ensure_writable(dst)?,
        Err(_) => {}
    }

    let mut reader = fs::File::open(src)?;
    let mut writer = fs::File::create(dst)?;
    io::copy(&mut reader, &mut writer)?;
    if options.sync {
        writer.sync_all()?;
    }
    drop(writer);

    fs::set_permissions(dst, meta.permissions())?;
    if options.preserve_times {
        set_times(dst, meta)?;
    }
    Ok(())
}

fn set_times(path: &Path, meta: &fs::Metadata) -> io::Result<()> {
    filetime::set_file_times(
        path,
        FileTime::from_last_access_time(meta),
        FileTime::from_last_modification_time(meta),
    )
}

/// Removes a file, link or directory tree. Read-only directories inside the
/// tree are made writable first so their entries can be unlinked.
fn remove_any(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        for entry in WalkDir::new(path) {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_dir() {
                ensure_writable(entry.path())?;
            }
        }
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Grants the owner write access to `path` if it lacks it.
fn ensure_writable(path: &Path) -> io::Result<()> {
    let mut permissions = fs::symlink_metadata(path)?.permissions();
    if owner_writable(&permissions) {
        return Ok(());
    }
    log::debug!("making {} writable", path.display());
    grant_owner_write(&mut permissions);
    fs::set_permissions(path, permissions)
}

#[cfg(unix)]
fn owner_writable(permissions: &fs::Permissions) -> bool {
    use std::os::unix::fs::PermissionsExt;
    permissions.mode() & 0o200 != 0
}

#[cfg(unix)]
fn grant_owner_write(permissions: &mut fs::Permissions) {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(permissions.mode() | 0o200);
}

#[cfg(not(unix))]
fn owner_writable(permissions: &fs::Permissions) -> bool {
    !permissions.readonly()
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn grant_owner_write(permissions: &mut fs::Permissions) {
    permissions.set_readonly(false);
}

#[cfg(unix)]
fn make_symlink(target: &Path, _src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(windows)]
fn make_symlink(target: &Path, src: &Path, dst: &Path) -> io::Result<()> {
    if fs::metadata(src).is_ok_and(|m| m.is_dir()) {
        std::os::windows::fs::symlink_dir(target, dst)
    } else {
        std::os::windows::fs::symlink_file(target, dst)
    }
}
