//! Path vocabulary: separators and anchors.
//!
//! ## Examples
//! ```rust
//! use modsig_core::lang::paths::{self, PathAnchor};
//!
//! assert_eq!(paths::anchor_from_str("package"), Some(PathAnchor::Package));
//! assert_eq!(paths::anchor_from_str("Math"), None);
//! ```

/// Separator between segments of a source-level qualified path (`Math::Float::PI`).
pub const SOURCE_SEPARATOR: &str = "::";

/// Separator between segments of a member path in diagnostics (`Math.Float.PI`).
pub const DIAGNOSTIC_SEPARATOR: &str = ".";

/// Leading path segment that anchors resolution somewhere other than the current scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathAnchor {
    /// `package::` resolves from the package root.
    Package,
    /// `super::` resolves from the enclosing module.
    Super,
}

pub fn anchor_from_str(segment: &str) -> Option<PathAnchor> {
    match segment {
        "package" => Some(PathAnchor::Package),
        "super" => Some(PathAnchor::Super),
        _ => None,
    }
}

pub fn anchor_as_str(anchor: PathAnchor) -> &'static str {
    match anchor {
        PathAnchor::Package => "package",
        PathAnchor::Super => "super",
    }
}
