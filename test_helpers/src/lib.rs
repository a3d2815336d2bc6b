//! Test helpers for the visibility workspace
//!
//! This crate provides common utilities for the FITS round-trip tests. The
//! FITS writers refuse to overwrite an existing file, so artifact paths are
//! handed out already cleared.

use once_cell::sync::Lazy;
use std::env;
use std::path::{Path, PathBuf};

/// Error type for test helper operations
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    #[error("Failed to find project root: {0}")]
    ProjectRootNotFound(String),
}

/// Returns the path to the project root directory.
///
/// Starts from the current directory and moves up until it finds the
/// Cargo.toml that declares the workspace.
///
/// # Returns
/// * Ok(PathBuf) - The path to the project root
/// * Err(TestHelperError) - If the project root could not be found
pub fn find_project_root() -> Result<PathBuf, TestHelperError> {
    let mut current_dir = env::current_dir().map_err(|e| {
        TestHelperError::ProjectRootNotFound(format!("Failed to get current directory: {}", e))
    })?;

    loop {
        let cargo_toml = current_dir.join("Cargo.toml");
        if cargo_toml.exists() {
            let content = std::fs::read_to_string(&cargo_toml).map_err(|e| {
                TestHelperError::ProjectRootNotFound(format!("Failed to read Cargo.toml: {}", e))
            })?;

            if content.contains("[workspace]") {
                return Ok(current_dir);
            }
        }

        if !current_dir.pop() {
            break;
        }
    }

    Err(TestHelperError::ProjectRootNotFound(
        "Workspace root not found".to_string(),
    ))
}

/// Lazily initialized project root path
static PROJECT_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_project_root().expect("Failed to find project root directory"));

/// Returns the path to the output directory for test artifacts.
///
/// Written FITS files stay here after a run so they can be opened in a
/// viewer. The directory is created on first use.
///
/// # Returns
/// * PathBuf - The path to the output directory
pub fn get_output_dir() -> PathBuf {
    let output_dir = PROJECT_ROOT.join("test_output");

    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir).expect("Failed to create output directory");
    }

    output_dir
}

/// Returns a path within the output directory.
///
/// # Arguments
/// * `path` - The relative path within the output directory
pub fn output_path<P: AsRef<Path>>(path: P) -> PathBuf {
    get_output_dir().join(path)
}

/// Returns a free path for a FITS artifact under `test_output/fits/`.
///
/// A file left over from a previous run under the same name is deleted, so
/// the no-clobber writers can create it again. Distinct test names keep
/// parallel tests from racing on one file.
///
/// # Arguments
/// * `test_name` - File stem, usually the calling test's name
///
/// # Returns
/// * PathBuf - `<root>/test_output/fits/<test_name>.fits`, not present on disk
pub fn fresh_fits_path(test_name: &str) -> PathBuf {
    let dir = output_path("fits");
    std::fs::create_dir_all(&dir).expect("Failed to create FITS output directory");

    let path = dir.join(format!("{test_name}.fits"));
    if path.exists() {
        std::fs::remove_file(&path).expect("Failed to remove stale FITS artifact");
    }
    path
}
