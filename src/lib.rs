//! # grabpack
//!
//! This library exports content from Subversion repositories and reassembles
//! selected subtrees into packages, optionally compressed, driven by a YAML
//! configuration file. It is designed to be used by the `grabpack`
//! command-line tool but can also be embedded, for example to drive a run
//! with a custom [`repository::VcsOperations`] implementation.
//!
//! ## Quick Example
//!
//! ```
//! use grabpack::config;
//! use grabpack::variables::Variables;
//!
//! let config = config::parse(r#"
//! export:
//!   Lib:
//!     repo: https://host/svn/lib
//!     path: trunk
//!     local: ./wc
//! "#).unwrap();
//! assert_eq!(config.export["Lib"].url(), "https://host/svn/lib/trunk");
//!
//! let mut vars = Variables::empty();
//! vars.define("VERSION", "1.2");
//! assert_eq!(vars.substitute("./dist/lib-$VERSION"), "./dist/lib-1.2");
//! ```
//!
//! ## Core Concepts
//!
//! - **Variables (`variables`)**: `$NAME` tokens replaced in free-text
//!   configuration fields, including the builtin `$DATETIME`.
//! - **Configuration (`config`)**: export entries (repositories to check out)
//!   and package rules (what to copy where, and how to compress it).
//! - **Repositories (`repository`, `svn`)**: handles over a mockable
//!   version control interface, backed by the `svn` client.
//! - **Copying and archiving (`copy`, `archive`)**: recursive copy under
//!   conflict, symlink and ignore policies; zip, tar.gz and tar.bz2 output.
//! - **Shell environment (`shell_env`)**: facts discovered during a run,
//!   written as a sourceable `KEY="VALUE"` script.
//!
//! ## Execution Flow
//!
//! The main entry point is [`phases::orchestrator::execute`]:
//!
//! 1.  **Load**: parse the configuration file.
//! 2.  **Export**: check out or update every repository, in sorted order, and
//!     record the previous and current revision.
//! 3.  **Record**: commit the shell environment and save the new revisions
//!     back into the configuration file.
//! 4.  **Package**: copy working-copy subtrees into each package directory and
//!     compress it. With "only if changed" set, a run where no revision moved
//!     stops before this step with [`error::Error::UpToDate`].

pub mod archive;
pub mod config;
pub mod copy;
pub mod defaults;
pub mod error;
pub mod exit_codes;
pub mod output;
pub mod phases;
pub mod repository;
pub mod shell_env;
pub mod svn;
pub mod variables;

pub use error::{Error, Result};

#[cfg(test)]
mod substitution_proptest;
