//! Analysis of many files at once.
//!
//! Each file runs its own read → parse → resolve pipeline on the rayon pool.
//! Pipelines share nothing; results are collected after all of them finish,
//! in input order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::analysis::JavaAnalysis;
use crate::tree::ParseError;

/// Directory names never searched for sources.
const EXCLUDED_DIRS: &[&str] = &["build", "target", "out", "node_modules"];

// ============================================================================
// Error Types
// ============================================================================

/// Why one file of a batch could not be analyzed.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },
}

/// The outcome for one file.
#[derive(Debug)]
pub struct FileAnalysis {
    pub path: PathBuf,
    pub result: Result<JavaAnalysis, BatchError>,
}

// ============================================================================
// File Discovery
// ============================================================================

/// All `.java` files under `root`, sorted by path.
///
/// Hidden directories and build output directories are skipped.
pub fn find_java_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_excluded_dir(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "java"))
        .collect();
    files.sort();
    files
}

fn is_excluded_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || EXCLUDED_DIRS.contains(&name.as_ref())
}

// ============================================================================
// Fork-Join Analysis
// ============================================================================

/// Analyze one file from disk.
pub fn analyze_path(path: &Path) -> Result<JavaAnalysis, BatchError> {
    let display = path.to_string_lossy().into_owned();
    let source = fs::read_to_string(path).map_err(|source| BatchError::Io {
        path: display.clone(),
        source,
    })?;
    JavaAnalysis::analyze(display.clone(), source).map_err(|source| BatchError::Parse {
        path: display,
        source,
    })
}

/// Analyze files in parallel. The output follows the input order.
pub fn analyze_files(paths: &[PathBuf]) -> Vec<FileAnalysis> {
    let results: Vec<FileAnalysis> = paths
        .par_iter()
        .map(|path| FileAnalysis {
            path: path.clone(),
            result: analyze_path(path),
        })
        .collect();

    debug!(
        files = results.len(),
        failed = results.iter().filter(|r| r.result.is_err()).count(),
        "batch analysis complete"
    );
    results
}
