//! Binary entry point for the presso CLI.
//!
//! Every command prints exactly one JSON document on stdout, success or
//! failure. Logs go to stderr.
//!
//! ## Usage
//!
//! ```bash
//! # What is at line 12, column 9?
//! presso locate --file src/main/java/app/Foo.java --line 12 --col 9
//!
//! # Preview a rename as a unified diff
//! presso --format text rename --file Foo.java --line 12 --col 9 --to total
//!
//! # Rename and write the file
//! presso rename --file Foo.java --line 12 --col 9 --to total --apply
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use presso::cli::{self, CheckTarget, RenameOptions};
use presso_core::error::{OutputErrorCode, PressoError};
use presso_core::output::{emit_response, ErrorResponse};
use presso_java::project::{JavaFileTemplate, SourceDirectoryType};
use presso_java::DeclarationKind;

// ============================================================================
// CLI Structure
// ============================================================================

/// Structural analysis and refactoring for Java sources.
///
/// All output is JSON on stdout, for editor and build-tool integrations.
#[derive(Parser, Debug)]
#[command(name = "presso", version, about = "Structural analysis and refactoring for Java")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output (overridden by RUST_LOG).
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Output format. `text` prints a unified diff for commands that edit.
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: OutputFormat,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Full JSON response (default).
    #[default]
    Json,
    /// Unified diff or a short summary.
    Text,
}

/// A position in a source file.
#[derive(Args, Debug, Clone)]
struct PositionArgs {
    /// Source file.
    #[arg(long)]
    file: PathBuf,
    /// 1-indexed line.
    #[arg(long)]
    line: u32,
    /// 1-indexed column, in characters.
    #[arg(long)]
    col: u32,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Show the symbol at a position.
    Locate {
        #[command(flatten)]
        at: PositionArgs,
    },
    /// List every occurrence of the symbol at a position.
    References {
        #[command(flatten)]
        at: PositionArgs,
    },
    /// Rename the symbol at a position (preview unless --apply).
    Rename {
        #[command(flatten)]
        at: PositionArgs,
        /// New name for the symbol.
        #[arg(long)]
        to: String,
        /// Write the change to the file.
        #[arg(long)]
        apply: bool,
        /// Write the edit plan as JSON to this path.
        #[arg(long)]
        plan_out: Option<PathBuf>,
    },
    /// Apply an edit plan written by `rename --plan-out`.
    ApplyPlan {
        /// File the plan was computed against.
        #[arg(long)]
        file: PathBuf,
        /// Plan JSON file.
        #[arg(long)]
        plan: PathBuf,
        /// Return the new text instead of writing it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the nearest enclosing declaration of a kind.
    Enclosing {
        #[command(flatten)]
        at: PositionArgs,
        /// Declaration kind to look for.
        #[arg(long, value_enum)]
        kind: KindArg,
    },
    /// Parse and resolve files, reporting diagnostics.
    Check {
        /// Check a single file.
        #[arg(long, conflicts_with = "cwd", required_unless_present = "cwd")]
        file: Option<PathBuf>,
        /// Check every Java file under a directory.
        #[arg(long)]
        cwd: Option<PathBuf>,
    },
    /// Find the class declaring `main` and its package.
    GetMainClass {
        /// Project root.
        #[arg(long)]
        cwd: PathBuf,
    },
    /// Create a new source file from a template.
    CreateNewFile {
        /// Project root.
        #[arg(long)]
        cwd: PathBuf,
        /// Package of the new type (e.g. `com.example.app`).
        #[arg(long)]
        package_name: String,
        /// Name of the new type; a `.java` suffix is accepted.
        #[arg(long)]
        file_name: String,
        /// Kind of type to declare.
        #[arg(long, value_enum)]
        file_type: FileTypeArg,
        /// Source tree to place the file in.
        #[arg(long, value_enum, default_value = "main")]
        source_directory_type: SourceDirArg,
    },
}

/// Declaration kinds for `enclosing`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Type,
    Method,
    Constructor,
    Field,
    LocalVariable,
    Parameter,
    Lambda,
}

impl From<KindArg> for DeclarationKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Type => DeclarationKind::Type,
            KindArg::Method => DeclarationKind::Method,
            KindArg::Constructor => DeclarationKind::Constructor,
            KindArg::Field => DeclarationKind::Field,
            KindArg::LocalVariable => DeclarationKind::LocalVariable,
            KindArg::Parameter => DeclarationKind::Parameter,
            KindArg::Lambda => DeclarationKind::Lambda,
        }
    }
}

/// Templates for `create-new-file`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FileTypeArg {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

impl From<FileTypeArg> for JavaFileTemplate {
    fn from(file_type: FileTypeArg) -> Self {
        match file_type {
            FileTypeArg::Class => JavaFileTemplate::Class,
            FileTypeArg::Interface => JavaFileTemplate::Interface,
            FileTypeArg::Enum => JavaFileTemplate::Enum,
            FileTypeArg::Record => JavaFileTemplate::Record,
            FileTypeArg::Annotation => JavaFileTemplate::Annotation,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SourceDirArg {
    Main,
    Test,
}

impl From<SourceDirArg> for SourceDirectoryType {
    fn from(dir: SourceDirArg) -> Self {
        match dir {
            SourceDirArg::Main => SourceDirectoryType::Main,
            SourceDirArg::Test => SourceDirectoryType::Test,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON too; callers parse one document either way.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), PressoError> {
    let format = cli.global.format;
    match cli.command {
        Command::Locate { at } => emit(&cli::locate(&at.file, at.line, at.col)?),
        Command::References { at } => emit(&cli::references(&at.file, at.line, at.col)?),
        Command::Rename {
            at,
            to,
            apply,
            plan_out,
        } => {
            let options = RenameOptions { apply, plan_out };
            let response = cli::rename(&at.file, at.line, at.col, &to, &options)?;
            match format {
                OutputFormat::Json => emit(&response),
                OutputFormat::Text => print_text(&response.patch.unified_diff),
            }
        }
        Command::ApplyPlan {
            file,
            plan,
            dry_run,
        } => {
            let response = cli::apply_plan(&file, &plan, dry_run)?;
            match (format, &response.new_text) {
                (OutputFormat::Text, Some(new_text)) => print_text(new_text),
                (OutputFormat::Text, None) => print_text(&format!(
                    "applied {} edit(s) to {}\n",
                    response.summary.edits_count, response.file
                )),
                (OutputFormat::Json, _) => emit(&response),
            }
        }
        Command::Enclosing { at, kind } => {
            emit(&cli::enclosing(&at.file, at.line, at.col, kind.into())?)
        }
        Command::Check { file, cwd } => {
            let target = match (file, cwd) {
                (Some(file), _) => CheckTarget::File(file),
                (None, Some(dir)) => CheckTarget::Directory(dir),
                (None, None) => return Err(PressoError::invalid_args("--file or --cwd is required")),
            };
            emit(&cli::check(&target)?)
        }
        Command::GetMainClass { cwd } => emit(&cli::get_main_class(&cwd)?),
        Command::CreateNewFile {
            cwd,
            package_name,
            file_name,
            file_type,
            source_directory_type,
        } => emit(&cli::create_new_file(
            &cwd,
            &package_name,
            &file_name,
            file_type.into(),
            source_directory_type.into(),
        )?),
    }
}

// ============================================================================
// Output
// ============================================================================

fn emit<T: Serialize>(response: &T) -> Result<(), PressoError> {
    emit_response(response, &mut io::stdout()).map_err(|e| PressoError::internal(e.to_string()))?;
    let _ = io::stdout().flush();
    Ok(())
}

fn print_text(text: &str) -> Result<(), PressoError> {
    let mut stdout = io::stdout();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
