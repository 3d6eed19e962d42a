//! CLI module for modsig
//!
//! This module provides the command-line interface for the checker.
//!
//! ## Commands
//!
//! - `check <file>` - Run the declared conformance checks and validate qualified accesses
//! - `link <file>` - Check, then write the linked source
//! - `<file>` - Shorthand for `check <file>`
//!
//! ## Exit codes
//!
//! - `0` - No diagnostics
//! - `1` - At least one diagnostic
//! - `2` - The input could not be read or is not a well-formed translation unit
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::CheckOptions;
use crate::version::MODSIG_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    /// Unreadable or malformed input.
    pub const INPUT: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Create an input error (exit code 2).
    pub fn input(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::INPUT)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Conformance checker and linker for shader module signatures
#[derive(Parser, Debug)]
#[command(name = "modsig")]
#[command(version = MODSIG_VERSION)]
#[command(about = "Conformance checker and linker for shader module signatures", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Translation unit to check (default action when no subcommand given)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub check: CheckArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the declared conformance checks and validate qualified accesses
    Check {
        /// JSON translation unit
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[command(flatten)]
        check: CheckArgs,
    },

    /// Check, then write the linked source
    Link {
        /// JSON translation unit
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Output file (default: stdout)
        #[arg(short = 'o', long = "output", value_name = "OUT")]
        output: Option<PathBuf>,
        /// Spaces per indentation level in the linked source
        #[arg(long, value_name = "N", default_value_t = 4)]
        indent: usize,
        #[command(flatten)]
        check: CheckArgs,
    },
}

/// Options shared by every command that runs the checker.
#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    /// Stop starting new conformance checks after N diagnostics
    #[arg(long, value_name = "N")]
    pub max_diagnostics: Option<usize>,

    /// Diagnostic output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl CheckArgs {
    pub fn options(&self) -> CheckOptions {
        CheckOptions {
            max_diagnostics: self.max_diagnostics,
            ..CheckOptions::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One `<path>: <reason>` line per diagnostic
    #[default]
    Text,
    /// A JSON array of diagnostics
    Json,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code != ExitCode::SUCCESS {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Some(Command::Check { file, check }) => commands::check_file(&file, &check),
        Some(Command::Link {
            file,
            output,
            indent,
            check,
        }) => commands::link_file(&file, output.as_deref(), indent, &check),
        None => match cli.file {
            Some(file) => commands::check_file(&file, &cli.check),
            None => Err(CliError::failure(
                "Error: no input file (run `modsig --help` for usage)",
            )),
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
