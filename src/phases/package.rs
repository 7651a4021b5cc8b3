//! Phase 3: Packaging
//!
//! Assembles every package of the `package` section, in sorted order. A
//! package is a directory (the section key) filled by copy operations and
//! optionally compressed into an archive.
//!
//! ## Process
//!
//! 1.  **Resolve sources**: each include group names either an exported
//!     repository, whose working copy becomes the source root, or a literal
//!     path. Copy operations get their paths joined to the source root and
//!     package directory, and their ignore patterns compiled. Nothing is copied
//!     until every pattern of the package compiled.
//!
//! 2.  **Copy**: each copy operation runs with its conflict and symlink policy.
//!
//! 3.  **Compress**: if an output is configured, the package directory is
//!     archived. The output path gets the extension of the chosen method.
//!
//! The first failure aborts the whole phase. Packages already assembled stay
//! on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;

use super::{PackageReport, PackageStage};
use crate::archive::{self, ArchiveOptions};
use crate::config::{CopyOp, PackageConfig};
use crate::copy::{self, ConflictPolicy, CopyOptions, SymlinkPolicy};
use crate::error::{Error, Result};
use crate::output::Narrator;
use crate::repository::Repository;
use crate::variables::Variables;

/// A copy operation with its paths resolved.
#[derive(Debug)]
pub struct CopyJob {
    pub src: PathBuf,
    pub dst: PathBuf,
    pub conflict: ConflictPolicy,
    pub symlinks: SymlinkPolicy,
    pub ignore: Vec<Regex>,
}

impl CopyJob {
    fn run(&self) -> Result<()> {
        let options = CopyOptions {
            on_symlink: self.symlinks,
            on_dir_conflict: self.conflict,
            skip: Box::new(|path: &Path| {
                let text = path.to_string_lossy();
                self.ignore.iter().any(|re| re.is_match(&text))
            }),
            ..Default::default()
        };
        copy::copy(&self.src, &self.dst, &options)
    }
}

/// Compiles ignore patterns, failing on the first invalid one.
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|e| Error::InvalidIgnorePattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Joins `path` onto `base` unless `path` is absolute, then cleans the
/// result lexically.
fn resolve(base: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        copy::clean_path(path)
    } else {
        copy::clean_path(&base.join(path))
    }
}

/// Resolves one copy operation against its source root and package directory.
pub fn resolve_copy(
    op: &CopyOp,
    source_root: &Path,
    destination: &Path,
    vars: &Variables,
) -> Result<CopyJob> {
    let mut ignore = op.ignore.clone();
    vars.substitute_all(&mut ignore);
    Ok(CopyJob {
        src: resolve(source_root, &vars.substitute(&op.repo)),
        dst: resolve(destination, &vars.substitute(&op.package)),
        conflict: op.conflict,
        symlinks: op.symlinks,
        ignore: compile_patterns(&ignore)?,
    })
}

/// Resolves every copy operation of `package`.
///
/// Operations with an empty `repo` or `package` are skipped.
pub fn resolve_sources(
    package: &PackageConfig,
    destination: &Path,
    vars: &Variables,
    repositories: &BTreeMap<String, Repository<'_>>,
) -> Result<Vec<CopyJob>> {
    let mut jobs = Vec::new();
    for group in &package.include {
        for (key, ops) in group {
            let source = vars.substitute(key);
            let source_root = match repositories.get(&source) {
                Some(repository) => repository.local_path().to_path_buf(),
                None => PathBuf::from(&source),
            };
            for include in ops {
                if !include.copy.is_complete() {
                    log::debug!("skipping incomplete copy from {}", source);
                    continue;
                }
                jobs.push(resolve_copy(&include.copy, &source_root, destination, vars)?);
            }
        }
    }
    Ok(jobs)
}

/// Execute Phase 3: assemble every package of `packages`.
pub fn execute(
    packages: &BTreeMap<String, PackageConfig>,
    vars: &Variables,
    repositories: &BTreeMap<String, Repository<'_>>,
    narrator: &mut Narrator,
) -> Result<Vec<PackageReport>> {
    let mut reports = Vec::new();
    for (key, package) in packages {
        let mut report = PackageReport::new(PathBuf::from(vars.substitute(key)));
        if let Err(e) = assemble(package, vars, repositories, narrator, &mut report) {
            log::warn!(
                "package {} failed after stage '{}': {}",
                report.destination.display(),
                report.stage,
                e
            );
            report.stage = PackageStage::Failed;
            return Err(e);
        }
        reports.push(report);
    }
    Ok(reports)
}

fn assemble(
    package: &PackageConfig,
    vars: &Variables,
    repositories: &BTreeMap<String, Repository<'_>>,
    narrator: &mut Narrator,
    report: &mut PackageReport,
) -> Result<()> {
    let destination = report.destination.clone();

    let jobs = resolve_sources(package, &destination, vars, repositories)
        .inspect_err(|e| narrator.fail("copy", e))?;
    report.stage = PackageStage::SourcesResolved;

    for job in &jobs {
        narrator.start(
            "copy",
            format!("{} -> {}", job.src.display(), job.dst.display()),
        );
        job.run().inspect_err(|e| narrator.fail("copy", e))?;
        narrator.done("ok");
        report.copies += 1;
    }
    report.stage = PackageStage::Copied;

    let output = vars.substitute(&package.compress.output);
    if !output.is_empty() {
        let method = &package.compress.method;
        method
            .ensure_supported()
            .inspect_err(|e| narrator.fail("pack", e))?;
        let output = PathBuf::from(method.normalize_output(&output));
        narrator.start(
            "pack",
            format!("{} -> {}", destination.display(), output.display()),
        );
        let options = ArchiveOptions {
            method: method.clone(),
            level: package.compress.level,
            overwrite: package.compress.overwrite,
        };
        archive::archive(std::slice::from_ref(&destination), &output, &options)
            .inspect_err(|e| narrator.fail("pack", e))?;
        narrator.done("ok");
        report.archive = Some(output);
        report.stage = PackageStage::Compressed;
    }

    report.stage = PackageStage::Done;
    Ok(())
}
