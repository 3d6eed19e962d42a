#![forbid(unsafe_code)]
//! modsig: structural conformance checking and visibility linking for shader module signatures
//!
//! A module signature (`mod sig`) names the members a module must provide. modsig checks modules against the
//! signature sets they declare, then links the program: signature declarations disappear and every constrained module
//! shows only what its signatures name. Qualified paths that reach past a signature are rejected.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! ## Examples
//! ```rust
//! use modsig::{CheckOptions, Session, frontend::load};
//!
//! let unit = load::from_json_str(
//!     "pi.json",
//!     r#"{"declarations": [
//!         {"kind": "module_sig", "name": "Pi", "members": [{"kind": "const", "name": "PI", "ty": "f32"}]},
//!         {"kind": "module", "name": "Consts", "signatures": ["Pi"], "declarations": [
//!             {"kind": "const", "name": "PI", "ty": "f32", "value": {"kind": "literal", "value": "3.14f"}},
//!             {"kind": "const", "name": "SECRET", "value": {"kind": "literal", "value": "42"}}
//!         ]}
//!     ]}"#,
//! )
//! .unwrap();
//! let report = Session::new(&unit).run(&CheckOptions::default());
//! assert!(report.is_success());
//! assert_eq!(report.output, "mod Consts {\n    const PI: f32 = 3.14f;\n}\n");
//! ```

pub mod cli;
pub mod config;
pub mod frontend;
pub mod version;

pub use config::CheckOptions;
pub use frontend::ast;
pub use frontend::diagnostics;
pub use frontend::printer::PrintConfig;
pub use frontend::session::{Report, Session};
