//! Test utilities for pushrules integration tests

#![allow(dead_code)]

use pushrules::types::RepoRef;
use pushrules::{ProjectSnapshot, PushContext};
use std::fs;
use std::path::{Path, PathBuf};

/// Result type alias for tests
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Extract Ok value or panic with context
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("assertion failed: expected Ok, got Err({:?})", e),
        }
    };
    ($expr:expr, $msg:literal) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Extract Some value or panic with context
#[macro_export]
macro_rules! assert_some {
    ($expr:expr) => {
        match $expr {
            Some(v) => v,
            None => panic!("assertion failed: expected Some, got None"),
        }
    };
    ($expr:expr, $msg:literal) => {
        match $expr {
            Some(v) => v,
            None => panic!("{}: got None", $msg),
        }
    };
}

/// A push to `master` of `acme/<name>` whose project holds `files`
pub fn push_with_files(name: &str, files: &[&str]) -> PushContext {
    PushContext::new(RepoRef::new("acme", name), "master")
        .with_project(ProjectSnapshot::new().with_files(files.iter().copied()))
}

/// Writes a push document into `dir` and returns its path
pub fn write_push(dir: &Path, file_name: &str, json: &str) -> PathBuf {
    let path = dir.join(file_name);
    fs::write(&path, json).unwrap();
    path
}

/// Writes machine.toml into `dir` and returns its path
pub fn write_config(dir: &Path, toml: &str) -> PathBuf {
    let path = dir.join("machine.toml");
    fs::write(&path, toml).unwrap();
    path
}
