//! Implementation of the phases of a grabpack run.
//!
//! ## Overview
//!
//! A run follows three phases:
//! 1. Export - Check out or update every working copy and record revisions
//! 2. Recording - Commit the shell environment and persist the revisions
//! 3. Packaging - Copy working-copy subtrees into packages and compress them
//!
//! The [`orchestrator`] sequences them. Between phases 2 and 3 a run may stop
//! early with [`crate::error::Error::UpToDate`] when the caller only wants
//! packages built from changed working copies.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::repository::{FetchMode, Repository};

// Phase modules
pub mod export;
pub mod orchestrator;
pub mod package;

/// Result of exporting one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    /// Entry name after substitution
    pub name: String,
    pub url: String,
    pub local: PathBuf,
    pub mode: FetchMode,
    /// Revision stored by the previous run, empty if none
    pub previous: String,
    pub current: String,
}

impl ExportReport {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Result of the export phase.
#[derive(Debug)]
pub struct ExportOutcome<'a> {
    /// Live handles keyed by substituted entry name
    pub repositories: BTreeMap<String, Repository<'a>>,
    pub reports: Vec<ExportReport>,
    /// Any working copy changed revision
    pub dirty: bool,
}

/// How far assembly of a package got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageStage {
    Pending,
    SourcesResolved,
    Copied,
    Compressed,
    Done,
    Failed,
}

impl fmt::Display for PackageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PackageStage::Pending => "pending",
            PackageStage::SourcesResolved => "sources resolved",
            PackageStage::Copied => "copied",
            PackageStage::Compressed => "compressed",
            PackageStage::Done => "done",
            PackageStage::Failed => "failed",
        })
    }
}

/// Result of assembling one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
    /// Package directory after substitution
    pub destination: PathBuf,
    pub stage: PackageStage,
    /// Number of copy operations performed
    pub copies: usize,
    /// Archive written, if compression was requested
    pub archive: Option<PathBuf>,
}

impl PackageReport {
    pub fn new(destination: PathBuf) -> Self {
        Self {
            destination,
            stage: PackageStage::Pending,
            copies: 0,
            archive: None,
        }
    }
}
