//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::config::CheckOptions;
use crate::frontend::load;
use crate::frontend::session::{Report, Session};

use super::{CheckArgs, CliError, CliResult, ExitCode, OutputFormat};

/// Maximum input file size (100 MB)
const MAX_SOURCE_SIZE: u64 = 100 * 1024 * 1024;

// ============================================================================
// Input
// ============================================================================

/// Read an input file.
///
/// ## Errors
///
/// Returns an input error if:
/// - The file cannot be read (I/O error)
/// - The file exceeds `MAX_SOURCE_SIZE` (100 MB)
pub fn read_source(path: &Path) -> CliResult<String> {
    let metadata = fs::metadata(path)
        .map_err(|e| CliError::input(format!("Cannot access file '{}': {}", path.display(), e)))?;

    if metadata.len() > MAX_SOURCE_SIZE {
        return Err(CliError::input(format!(
            "Input file '{}' is too large ({} bytes, max {} bytes)",
            path.display(),
            metadata.len(),
            MAX_SOURCE_SIZE
        )));
    }

    fs::read_to_string(path).map_err(|e| CliError::input(format!("Error reading file '{}': {}", path.display(), e)))
}

/// Load a translation unit and run every phase over it.
///
/// Malformed input is reported through miette with the offending location and exits with code 2.
pub fn load_and_run(path: &Path, options: &CheckOptions) -> CliResult<Report> {
    let text = read_source(path)?;
    let unit = load::from_json_str(&path.display().to_string(), &text)
        .map_err(|err| CliError::input(format!("{:?}", miette::Report::new(err))))?;
    let session = Session::new(&unit);
    Ok(session.run(options))
}

// ============================================================================
// Output
// ============================================================================

/// Exit code for a finished run: 1 if anything was diagnosed.
pub fn exit_code_for(report: &Report) -> ExitCode {
    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Write the report's diagnostics in `format`.
///
/// Text output is one `<path>: <reason>` line per diagnostic, nested failures flattened, and nothing for a clean run.
/// JSON output is always an array of the diagnostics as reported: a `nested_conformance_failure` keeps its `nested`
/// list.
pub fn write_diagnostics(out: &mut impl Write, report: &Report, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Text => {
            for line in report.lines() {
                writeln!(out, "{line}")?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &report.diagnostics().collect::<Vec<_>>())?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn emit_diagnostics(out: &mut impl Write, report: &Report, format: OutputFormat) -> CliResult<()> {
    write_diagnostics(out, report, format)
        .map_err(|e| CliError::failure(format!("Error writing diagnostics: {}", e)))?;
    if report.truncated {
        eprintln!("note: diagnostic limit reached; remaining conformance checks were skipped");
    }
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

/// Check a translation unit; diagnostics go to stdout.
pub fn check_file(path: &Path, args: &CheckArgs) -> CliResult<ExitCode> {
    let report = load_and_run(path, &args.options())?;
    emit_diagnostics(&mut io::stdout().lock(), &report, args.format)?;
    Ok(exit_code_for(&report))
}

/// Check and link a translation unit.
///
/// The linked source is written even when diagnostics were found. Diagnostics go to stdout when the linked source goes
/// to a file, and to stderr when it goes to stdout.
pub fn link_file(path: &Path, output: Option<&Path>, indent: usize, args: &CheckArgs) -> CliResult<ExitCode> {
    let options = args.options().with_indent_width(indent);
    let report = load_and_run(path, &options)?;

    match output {
        Some(out_path) => {
            emit_diagnostics(&mut io::stdout().lock(), &report, args.format)?;
            fs::write(out_path, &report.output)
                .map_err(|e| CliError::failure(format!("Error writing '{}': {}", out_path.display(), e)))?;
            tracing::info!(output = %out_path.display(), "linked source written");
        }
        None => {
            emit_diagnostics(&mut io::stderr().lock(), &report, args.format)?;
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(report.output.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|e| CliError::failure(format!("Error writing linked source: {}", e)))?;
        }
    }

    Ok(exit_code_for(&report))
}
