//! Loading translation units from their JSON form.
//!
//! Loader failures are input errors, reported through `miette` with the offending location highlighted. They are
//! distinct from checker diagnostics, which describe a well-formed program that does not conform.

use std::fs;
use std::path::Path;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::ast::TranslationUnit;

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("cannot read `{path}`")]
    #[diagnostic(code(modsig::load::io))]
    Io {
        path: String,
        #[source]
        error: std::io::Error,
    },

    #[error("malformed translation unit: {message}")]
    #[diagnostic(
        code(modsig::load::json),
        help("the input must be a JSON-serialized translation unit (an object with a `declarations` array)")
    )]
    Json {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        at: SourceSpan,
    },
}

/// Parse a translation unit from JSON text. `name` labels the source in diagnostics.
pub fn from_json_str(name: &str, text: &str) -> Result<TranslationUnit, LoadError> {
    match serde_json::from_str::<TranslationUnit>(text) {
        Ok(unit) => {
            tracing::debug!(source = name, declarations = unit.declarations.len(), "loaded translation unit");
            Ok(unit)
        }
        Err(err) => {
            let offset = byte_offset(text, err.line(), err.column());
            Err(LoadError::Json {
                message: err.to_string(),
                src: NamedSource::new(name, text.to_string()),
                at: (offset, 0).into(),
            })
        }
    }
}

/// Read and parse a translation unit from a file.
pub fn from_path(path: &Path) -> Result<TranslationUnit, LoadError> {
    let display = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|error| LoadError::Io {
        path: display.clone(),
        error,
    })?;
    from_json_str(&display, &text)
}

/// Serialize a translation unit back to pretty JSON.
pub fn to_json_string(unit: &TranslationUnit) -> String {
    // Serializing an in-memory AST cannot fail: every key is a string and there are no non-finite floats.
    serde_json::to_string_pretty(unit).unwrap_or_default()
}

/// Convert serde_json's one-based line/column into a byte offset, clamped to the text.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(text.len())
}
