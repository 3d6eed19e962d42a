//! Syntax layer for modsig: the declaration AST, its JSON loader and a source printer.
//!
//! Parsing source text is not part of this crate. A translation unit arrives as JSON (see [`load`]) and leaves as
//! source text (see [`printer`]).
//!
//! ## Notes
//! - This crate is syntax-only: no name resolution, no conformance checking.
//! - Vocabulary (path anchors, separators) comes from `modsig_core::lang`.
//!
//! ## Examples
//! ```rust
//! use modsig_syntax::{load, printer};
//!
//! let unit = load::from_json_str(
//!     "pi.json",
//!     r#"{"declarations": [{"kind": "module_sig", "name": "Pi", "members": [
//!         {"kind": "const", "name": "PI", "ty": "f32"}
//!     ]}]}"#,
//! )
//! .unwrap();
//! assert_eq!(printer::print_unit(&unit), "mod sig Pi {\n    const PI: f32;\n}\n");
//! ```

pub mod ast;
pub mod load;
pub mod printer;
