//! modsig frontend
//!
//! This module contains every phase of a run:
//! - `tree`: the module tree of a translation unit
//! - `canonical`: alias resolution and canonical types (the frozen type cache)
//! - `registry`: signature registration and composition
//! - `conformance`: structural checks of modules against signature sets
//! - `link`: visibility resolution, access validation and the linked surface
//! - `diagnostics`: the diagnostic values every phase produces
//! - `session`: the pipeline tying the phases together

// Syntax components are provided by the shared modsig_syntax crate.
pub use modsig_syntax::{ast, load, printer};

pub mod canonical;
pub mod conformance;
pub mod diagnostics;
pub mod link;
pub mod registry;
pub mod session;
pub mod tree;
