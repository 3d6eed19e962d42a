//! Diagnostics produced by the checker and the linker.
//!
//! Diagnostics are values, never `Err`s: every phase collects them into a `Vec<Diagnostic>` and keeps going, so one run
//! reports every violation. Each diagnostic names a dotted member path (`Math.Float.PI`) and a [`DiagnosticKind`]
//! whose `Display` is the human-readable reason.
//!
//! ## Notes
//! - The one-line rendering is `<dotted member path>: <reason>` (see [`Diagnostic::line`]).
//! - Nested conformance failures keep their inner diagnostics; [`Diagnostic::leaves`] flattens them for line output.
//! - `DiagnosticKind` also implements `miette::Diagnostic` with a stable code per kind.

use std::fmt;

use miette::Diagnostic as MietteDiagnostic;
use modsig_core::lang::members::MemberKind;
use modsig_core::lang::paths;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::frontend::ast::{Ident, Span};

/// Dotted path to the member a diagnostic is about. The empty path is the package root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MemberPath(Vec<Ident>);

impl MemberPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(segments: Vec<Ident>) -> Self {
        Self(segments)
    }

    pub fn from_name(name: &str) -> Self {
        Self(vec![name.to_string()])
    }

    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }

    /// `prefix` followed by this path.
    pub fn prefixed(&self, prefix: &MemberPath) -> Self {
        let mut segments = prefix.0.clone();
        segments.extend(self.0.iter().cloned());
        Self(segments)
    }

    pub fn segments(&self) -> &[Ident] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("package")
        } else {
            f.write_str(&self.0.join(paths::DIAGNOSTIC_SEPARATOR))
        }
    }
}

impl Serialize for MemberPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Why a qualified access was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    /// The segment names a member the module's signature set does not expose.
    NotExposed,
    /// The segment names nothing in the module.
    NotFound,
    /// A further segment follows something that is not a module.
    NotAModule,
    /// `super` used at the package root.
    SuperAtRoot,
}

impl fmt::Display for AccessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AccessReason::NotExposed => "not exposed",
            AccessReason::NotFound => "not found",
            AccessReason::NotAModule => "not a module",
            AccessReason::SuperAtRoot => "super at package root",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DiagnosticKind {
    #[error("missing required {kind}")]
    #[diagnostic(code(modsig::missing_member))]
    MissingMember {
        #[serde(serialize_with = "display")]
        kind: MemberKind,
    },

    #[error("kind mismatch: expected {expected}, found {found}")]
    #[diagnostic(code(modsig::kind_mismatch))]
    KindMismatch {
        #[serde(serialize_with = "display")]
        expected: MemberKind,
        found: String,
    },

    #[error("{what} mismatch: expected `{expected}`, found `{found}`")]
    #[diagnostic(code(modsig::type_mismatch))]
    TypeMismatch { what: String, expected: String, found: String },

    #[error("{what} attributes differ: expected {expected}, found {found}")]
    #[diagnostic(code(modsig::attribute_mismatch))]
    AttributeMismatch { what: String, expected: String, found: String },

    #[error("conflicting definitions of `{member_name}` in signature composition: {}", .conflicting_defs.join("; "))]
    #[diagnostic(
        code(modsig::conflicting_signature_composition),
        help("composed signatures may only share a member name when both declare it identically")
    )]
    ConflictingSignatureComposition {
        member_name: Ident,
        conflicting_defs: Vec<String>,
    },

    #[error("alias cycle: {}", .chain.join(" -> "))]
    #[diagnostic(code(modsig::alias_cycle))]
    AliasCycle { chain: Vec<String> },

    #[error("nested module does not conform ({} problem(s))", .nested.len())]
    #[diagnostic(code(modsig::nested_conformance_failure))]
    NestedConformanceFailure { nested: Vec<Diagnostic> },

    #[error("access to `{access}` rejected at `{segment}`: {reason}")]
    #[diagnostic(
        code(modsig::checked_access_violation),
        help("only members named by a module's signature set are visible outside it")
    )]
    CheckedAccessViolation {
        access: String,
        segment: String,
        reason: AccessReason,
    },

    #[error("unknown signature `{name}`")]
    #[diagnostic(code(modsig::unknown_signature))]
    UnknownSignature { name: String },

    #[error("duplicate definition of `{name}`")]
    #[diagnostic(code(modsig::duplicate_member), help("the first definition is kept"))]
    DuplicateMember { name: Ident },
}

fn display<T: fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// A diagnostic anchored at a member path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: MemberPath,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Span::is_empty")]
    pub span: Span,
}

impl Diagnostic {
    pub fn new(path: MemberPath, kind: DiagnosticKind) -> Self {
        Self {
            path,
            kind,
            span: Span::default(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Prefix this diagnostic's path, and the paths of any nested diagnostics, with `prefix`.
    pub fn prefixed(&self, prefix: &MemberPath) -> Self {
        let kind = match &self.kind {
            DiagnosticKind::NestedConformanceFailure { nested } => DiagnosticKind::NestedConformanceFailure {
                nested: nested.iter().map(|d| d.prefixed(prefix)).collect(),
            },
            other => other.clone(),
        };
        Self {
            path: self.path.prefixed(prefix),
            kind,
            span: self.span,
        }
    }

    /// The diagnostics a user acts on: nested failures are replaced by their innermost diagnostics.
    pub fn leaves(&self) -> Vec<&Diagnostic> {
        match &self.kind {
            DiagnosticKind::NestedConformanceFailure { nested } if !nested.is_empty() => {
                nested.iter().flat_map(Diagnostic::leaves).collect()
            }
            _ => vec![self],
        }
    }

    /// `<dotted member path>: <reason>`
    pub fn line(&self) -> String {
        format!("{}: {}", self.path, self.kind)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.kind)
    }
}

/// Count the leaf diagnostics in `diagnostics`.
pub fn leaf_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().map(|d| d.leaves().len()).sum()
}
