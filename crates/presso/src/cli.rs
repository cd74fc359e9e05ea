//! Command implementations behind the `presso` binary.
//!
//! Each function reads what it needs from disk, runs one engine operation and
//! returns the response to print. Argument parsing and output live in
//! `main.rs`.
//!
//! ## Error Handling
//!
//! All functions return `Result<T, PressoError>`. Engine errors convert via
//! the `From` bridges in `presso-java`, so `?` is enough in most places.
//!
//! ## Writes
//!
//! Files are only written after the new text has been reparsed and found to
//! have no more syntax error regions than the original. Writes go through a
//! temporary file in the target directory that is persisted over the
//! destination, so a failed command never leaves a half-written file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use presso_core::error::PressoError;
use presso_core::output::{
    ApplyResponse, CheckResponse, CreateFileResponse, DeclarationResponse, FileCheck,
    MainClassResponse, ReferencesResponse, RenameResponse, Summary, SymbolResponse, Warning,
    SCHEMA_VERSION,
};
use presso_core::patch::{self, ApplyError, EditPlan};
use presso_java::batch::{analyze_files, analyze_path, find_java_files, FileAnalysis};
use presso_java::project::{self, JavaFileTemplate, SourceDirectoryType};
use presso_java::{parse, DeclarationKind, JavaAnalysis};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Error Types
// ============================================================================

/// Failure to write a file atomically.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot determine the directory of {path}")]
    NoParent { path: String },

    #[error("cannot write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl From<WriteError> for PressoError {
    fn from(err: WriteError) -> Self {
        let file = match &err {
            WriteError::NoParent { path } | WriteError::Io { path, .. } => path.clone(),
        };
        PressoError::apply_failed(err.to_string(), file)
    }
}

// ============================================================================
// Queries
// ============================================================================

/// `locate`: the symbol at a position.
pub fn locate(file: &Path, line: u32, col: u32) -> Result<SymbolResponse, PressoError> {
    let analysis = load(file)?;
    let symbol = analysis.locate_symbol(line, col)?;
    Ok(SymbolResponse::new(
        analysis.symbol_info(symbol),
        analysis.occurrence_count(symbol),
        analysis.symbol_warnings(symbol),
    ))
}

/// `references`: every occurrence of the symbol at a position.
pub fn references(file: &Path, line: u32, col: u32) -> Result<ReferencesResponse, PressoError> {
    let analysis = load(file)?;
    let symbol = analysis.locate_symbol(line, col)?;
    Ok(ReferencesResponse::new(
        analysis.symbol_info(symbol),
        analysis.list_references(symbol),
        analysis.symbol_warnings(symbol),
    ))
}

/// `enclosing`: the nearest declaration of `kind` around a position.
pub fn enclosing(
    file: &Path,
    line: u32,
    col: u32,
    kind: DeclarationKind,
) -> Result<DeclarationResponse, PressoError> {
    let analysis = load(file)?;
    let declaration = analysis.enclosing_declaration(line, col, kind)?;
    Ok(DeclarationResponse::new(declaration))
}

// ============================================================================
// Rename and Apply
// ============================================================================

/// Options for [`rename`].
#[derive(Debug, Clone, Default)]
pub struct RenameOptions {
    /// Write the renamed text back to the file.
    pub apply: bool,
    /// Also write the plan as JSON, for a later `apply-plan`.
    pub plan_out: Option<PathBuf>,
}

/// `rename`: plan renaming the symbol at a position, and optionally apply it.
pub fn rename(
    file: &Path,
    line: u32,
    col: u32,
    new_name: &str,
    options: &RenameOptions,
) -> Result<RenameResponse, PressoError> {
    let analysis = load(file)?;
    let symbol = analysis.locate_symbol(line, col)?;
    let planned = analysis.plan_rename(symbol, new_name)?;

    let mut warnings = analysis.symbol_warnings(symbol);
    warnings.extend(
        analysis
            .file_warnings()
            .into_iter()
            .filter(|w| w.code == "syntax_error"),
    );

    if let Some(plan_out) = &options.plan_out {
        let json = serde_json::to_string_pretty(&planned.plan)?;
        write_atomic(plan_out, &format!("{}\n", json))?;
        debug!(path = %plan_out.display(), "wrote edit plan");
    }

    let applied = options.apply && planned.plan.has_edits();
    if applied {
        let new_text = patch::apply(analysis.source(), &planned.plan)
            .map_err(|e| apply_error(e, analysis.path()))?;
        verify_reparse(analysis.path(), analysis.tree().error_regions().len(), &new_text)?;
        write_atomic(file, &new_text)?;
        info!(
            file = %analysis.path(),
            old = %planned.old_name,
            new = %planned.new_name,
            edits = planned.plan.edit_count(),
            "rename applied"
        );
    }

    Ok(RenameResponse {
        status: "ok".to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        symbol: analysis.symbol_info(symbol),
        new_name: planned.new_name.clone(),
        patch: planned.plan.materialize(analysis.source(), analysis.path()),
        summary: Summary::from_plan(&planned.plan),
        file_rename: analysis.file_rename(symbol, new_name),
        plan: planned.plan,
        applied,
        warnings,
    })
}

/// `apply-plan`: apply a plan written by `rename --plan-out`.
///
/// With `dry_run`, the new text is returned instead of written.
pub fn apply_plan(file: &Path, plan_path: &Path, dry_run: bool) -> Result<ApplyResponse, PressoError> {
    let file_display = file.to_string_lossy().into_owned();
    let source = read_file(file)?;
    let plan_json = read_file(plan_path)?;
    let plan: EditPlan = serde_json::from_str(&plan_json).map_err(|e| {
        PressoError::invalid_args(format!(
            "invalid plan file {}: {}",
            plan_path.display(),
            e
        ))
    })?;

    let new_text = patch::apply(&source, &plan).map_err(|e| apply_error(e, &file_display))?;
    let before = parse(source.as_str())?.error_regions().len();
    verify_reparse(&file_display, before, &new_text)?;

    let mut response = ApplyResponse::new(file_display.clone(), Summary::from_plan(&plan));
    if dry_run {
        response.new_text = Some(new_text);
    } else {
        write_atomic(file, &new_text)?;
        response.applied = true;
        info!(file = %file_display, edits = plan.edit_count(), "plan applied");
    }
    Ok(response)
}

// ============================================================================
// Batch and Project Commands
// ============================================================================

/// What `check` looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckTarget {
    File(PathBuf),
    Directory(PathBuf),
}

/// `check`: parse and resolve files, reporting diagnostics per file.
pub fn check(target: &CheckTarget) -> Result<CheckResponse, PressoError> {
    let files = match target {
        CheckTarget::File(path) => {
            if !path.is_file() {
                return Err(PressoError::file_not_found(path.to_string_lossy()));
            }
            vec![path.clone()]
        }
        CheckTarget::Directory(dir) => {
            if !dir.is_dir() {
                return Err(PressoError::file_not_found(dir.to_string_lossy()));
            }
            find_java_files(dir)
        }
    };

    let checks: Vec<FileCheck> = analyze_files(&files).into_iter().map(file_check).collect();
    let response = CheckResponse::new(checks);
    debug!(
        files = response.files.len(),
        with_errors = response.files_with_errors,
        warnings = response.warnings_count,
        "check complete"
    );
    Ok(response)
}

fn file_check(file: FileAnalysis) -> FileCheck {
    let name = file.path.to_string_lossy().into_owned();
    match file.result {
        Ok(analysis) => FileCheck {
            file: name,
            analyzed: true,
            error_regions: analysis.tree().error_regions().len() as u32,
            symbols: analysis.scopes().symbols().len() as u32,
            package: analysis.package_name(),
            warnings: analysis.file_warnings(),
        },
        Err(err) => {
            warn!(file = %name, error = %err, "file not analyzed");
            FileCheck {
                file: name,
                analyzed: false,
                error_regions: 0,
                symbols: 0,
                package: None,
                warnings: vec![Warning::new("not_analyzed", err.to_string())],
            }
        }
    }
}

/// `get-main-class`: the file declaring `main` and its package.
pub fn get_main_class(cwd: &Path) -> Result<MainClassResponse, PressoError> {
    let found = project::find_main_class(cwd)?;
    Ok(MainClassResponse::new(
        found.file.to_string_lossy(),
        found.package,
    ))
}

/// `create-new-file`: render a type template into its package directory.
pub fn create_new_file(
    cwd: &Path,
    package: &str,
    file_name: &str,
    template: JavaFileTemplate,
    dir_type: SourceDirectoryType,
) -> Result<CreateFileResponse, PressoError> {
    let new_file = project::new_java_file(cwd, package, file_name, template, dir_type)?;
    if new_file.path.exists() {
        return Err(PressoError::invalid_args(format!(
            "{} already exists",
            new_file.path.display()
        )));
    }
    write_atomic(&new_file.path, &new_file.contents)?;
    info!(path = %new_file.path.display(), "created file");
    Ok(CreateFileResponse::new(new_file.path.to_string_lossy()))
}

// ============================================================================
// Helpers
// ============================================================================

/// Write `contents` to `path` through a temporary file in the same directory.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), WriteError> {
    let display = path.to_string_lossy().into_owned();
    let dir = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => return Err(WriteError::NoParent { path: display }),
    };

    let io_err = |source: io::Error| WriteError::Io {
        path: display.clone(),
        source,
    };
    let mut temp = NamedTempFile::new_in(dir).map_err(io_err)?;
    temp.write_all(contents.as_bytes()).map_err(io_err)?;
    temp.flush().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

fn load(file: &Path) -> Result<JavaAnalysis, PressoError> {
    Ok(analyze_path(file)?)
}

fn read_file(path: &Path) -> Result<String, PressoError> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => PressoError::file_not_found(path.to_string_lossy()),
        _ => PressoError::internal(format!("cannot read {}: {}", path.display(), e)),
    })
}

fn apply_error(err: ApplyError, file: &str) -> PressoError {
    match err {
        ApplyError::EditOutOfBounds { span, len } => PressoError::EditOutOfBounds { span, len },
        other => PressoError::apply_failed(other.to_string(), file),
    }
}

/// Refuse new text that parses worse than the text it replaces.
fn verify_reparse(file: &str, before: usize, new_text: &str) -> Result<(), PressoError> {
    let after = parse(new_text)?.error_regions().len();
    if after > before {
        return Err(PressoError::VerificationFailed {
            file: file.to_string(),
            before,
            after,
        });
    }
    Ok(())
}
