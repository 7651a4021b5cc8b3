//! End-to-end tests for CLI exit codes.
//!
//! These tests verify that the CLI returns the exit codes documented in
//! [`grabpack::exit_codes`]. None of them needs a Subversion client: the
//! configurations either have no exports or fail before any repository is
//! contacted.

mod common;
use common::prelude::*;

use grabpack::exit_codes;

/// Exit code 0 is returned for --help, which documents variables.
#[test]
fn test_exit_code_help() {
    let mut cmd = cargo_bin_cmd!("grabpack");

    cmd.arg("--help")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("$DATETIME"))
        .stdout(predicate::str::contains("VAR=VAL"));
}

/// Exit code 0 is returned for --version.
#[test]
fn test_exit_code_version() {
    let mut cmd = cargo_bin_cmd!("grabpack");

    cmd.arg("--version").assert().code(0);
}

/// Exit code 0 is returned for an empty configuration.
#[test]
fn test_exit_code_success_empty_config() {
    let fixture = TestFixture::new().with_config(configs::EMPTY);

    fixture
        .command_with_config()
        .assert()
        .code(exit_codes::SUCCESS as i32)
        .stdout(predicate::str::contains("[conf]"));
}

/// The default configuration is `<executable name>.yml` in the working directory.
#[test]
fn test_default_config_path_is_used() {
    let fixture = TestFixture::new().with_config(configs::EMPTY_SECTIONS);

    fixture.command().assert().code(exit_codes::SUCCESS as i32);
}

/// A missing default configuration is explained.
#[test]
fn test_missing_default_config_prints_hint() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .assert()
        .code(exit_codes::CONFIG_FILE_NOT_FOUND as i32)
        .stdout(predicate::str::contains("--config"))
        .stderr(predicate::str::contains("configuration file not found"));
}

/// Exit code 11 is returned when the configuration file does not exist.
#[test]
fn test_exit_code_config_file_not_found() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .arg("-f")
        .arg("nonexistent.yml")
        .assert()
        .code(exit_codes::CONFIG_FILE_NOT_FOUND as i32);
}

/// Exit code 10 is returned when the configuration directory does not exist.
#[test]
fn test_exit_code_config_directory_not_found() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .arg("-f")
        .arg(fixture.path().join("missing/grabpack.yml"))
        .assert()
        .code(exit_codes::CONFIG_DIRECTORY_NOT_FOUND as i32)
        .stderr(predicate::str::contains("directory not found"));
}

/// Exit code 12 is returned when the configuration's parent is not a directory.
#[test]
fn test_exit_code_invalid_config_path() {
    let fixture = TestFixture::new().with_file("plain.txt", "x");

    fixture
        .command()
        .arg("-f")
        .arg(fixture.path().join("plain.txt/grabpack.yml"))
        .assert()
        .code(exit_codes::INVALID_CONFIG_PATH as i32);
}

/// Exit code 13 is returned when the configuration path is a directory.
#[test]
fn test_exit_code_not_regular_file() {
    let fixture = TestFixture::new();
    fixture.child("conf.yml").create_dir_all().unwrap();

    fixture
        .command()
        .arg("-f")
        .arg(fixture.path().join("conf.yml"))
        .assert()
        .code(exit_codes::NOT_REGULAR_FILE as i32);
}

/// Exit code 99 is returned for invalid YAML syntax.
#[test]
fn test_exit_code_invalid_yaml() {
    let fixture = TestFixture::new().with_config(configs::INVALID_YAML);

    fixture
        .command_with_config()
        .assert()
        .code(exit_codes::FAILURE as i32)
        .stderr(predicate::str::contains("YAML"));
}

/// Exit code 2 is returned with --update-only when nothing changed.
#[test]
fn test_exit_code_up_to_date() {
    let fixture = TestFixture::new().with_config(configs::EMPTY_SECTIONS);

    fixture
        .command_with_config()
        .arg("-u")
        .assert()
        .code(exit_codes::UP_TO_DATE as i32)
        .stderr(predicate::str::is_empty());
}

/// A package built from a literal source path is copied and reported.
#[test]
fn test_literal_source_package() {
    let fixture = TestFixture::new()
        .with_file("source/lib/a.c", "int a;")
        .with_file("source/lib/a.o", "obj")
        .with_config(
            r#"
package:
  ./out/pkg-$VERSION:
    include:
      - ./source:
          - copy:
              repo: lib
              package: src
              ignore: ['\.o$']
"#,
        );

    fixture
        .command_with_config()
        .arg("VERSION=1.0")
        .assert()
        .code(exit_codes::SUCCESS as i32)
        .stdout(predicate::str::contains("[copy]"));

    fixture
        .child("out/pkg-1.0/src/a.c")
        .assert(predicate::path::is_file());
    fixture
        .child("out/pkg-1.0/src/a.o")
        .assert(predicate::path::missing());
}

/// Exit code 100 is returned for an ignore pattern that does not compile.
#[test]
fn test_exit_code_invalid_ignore_pattern() {
    let fixture = TestFixture::new()
        .with_file("source/a.txt", "a")
        .with_config(
            r#"
package:
  ./pkg:
    include:
      - ./source:
          - copy:
              repo: .
              package: .
              ignore: ['(']
"#,
        );

    fixture
        .command_with_config()
        .assert()
        .code(exit_codes::INVALID_IGNORE_PATTERN as i32)
        .stdout(predicate::str::contains(" ! [copy]"));

    fixture.child("pkg").assert(predicate::path::missing());
}

/// Exit code 101 is returned for an unknown compress method.
#[test]
fn test_exit_code_invalid_compress_method() {
    let fixture = TestFixture::new()
        .with_file("source/a.txt", "a")
        .with_config(
            r#"
package:
  ./pkg:
    include:
      - ./source:
          - copy:
              repo: .
              package: .
    compress:
      output: ./dist/pkg
      method: rar
"#,
        );

    fixture
        .command_with_config()
        .assert()
        .code(exit_codes::INVALID_COMPRESS_METHOD as i32)
        .stderr(predicate::str::contains("rar"));
}

/// Exit code 103 is returned when the archive exists and may not be overwritten.
#[test]
fn test_exit_code_archive_exists() {
    let fixture = TestFixture::new()
        .with_file("source/a.txt", "a")
        .with_file("dist/pkg.zip", "old")
        .with_config(
            r#"
package:
  ./pkg:
    include:
      - ./source:
          - copy:
              repo: .
              package: .
    compress:
      output: ./dist/pkg
      method: zip
      overwrite: false
"#,
        );

    fixture
        .command_with_config()
        .assert()
        .code(exit_codes::ARCHIVE_FAILED as i32);
}

/// Compressed packages get the method's extension.
#[test]
fn test_compressed_package() {
    let fixture = TestFixture::new()
        .with_file("source/a.txt", "a")
        .with_config(
            r#"
package:
  ./pkg:
    include:
      - ./source:
          - copy:
              repo: .
              package: .
    compress:
      output: ./dist/pkg
      method: .TGZ
"#,
        );

    fixture
        .command_with_config()
        .arg("-q")
        .assert()
        .code(exit_codes::SUCCESS as i32)
        .stdout(predicate::str::is_empty());

    fixture
        .child("dist/pkg.tar.gz")
        .assert(predicate::path::is_file());
}

/// `-x -` writes the shell environment, including input variables, to stdout.
#[test]
fn test_export_env_to_stdout() {
    let fixture = TestFixture::new().with_config(configs::EMPTY);

    fixture
        .command_with_config()
        .args(["-q", "-x", "-", "FOO=bar", "not-a-binding"])
        .assert()
        .code(exit_codes::SUCCESS as i32)
        .stdout(predicate::str::contains("# input variables"))
        .stdout(predicate::str::contains("VAR_FOO=\"bar\""));
}

/// `-x <PATH>` writes the shell environment to a file, creating directories.
#[test]
fn test_export_env_to_file() {
    let fixture = TestFixture::new().with_config(configs::EMPTY);

    fixture
        .command_with_config()
        .args(["-q", "-x", "env/grab.sh", "V=1"])
        .assert()
        .code(exit_codes::SUCCESS as i32);

    fixture
        .child("env/grab.sh")
        .assert(predicate::str::contains("VAR_V=\"1\""));
}
