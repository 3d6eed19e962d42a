//! Provide shared, pure vocabulary for the modsig signature checker and linker.
//!
//! This crate is intentionally small and dependency-free. It answers questions like "is `vec3f` a predeclared
//! type?", "is `read_write` an access mode?" or "what scalar type does `1.5h` have?" so the syntax crate and the
//! checker never scatter string comparisons of their own.
//!
//! ## Notes
//!
//! - This is a "vocabulary core" crate: **no IO**, no global state, and no AST types.
//! - Lookups are case-sensitive; the shading language is.
//!
//! ## Examples
//! ```rust
//! use modsig_core::lang::types::{self, PredeclaredType, ScalarTypeId};
//! use modsig_core::literals;
//!
//! assert_eq!(types::classify("f32"), Some(PredeclaredType::Scalar(ScalarTypeId::F32)));
//! assert_eq!(literals::classify("4u").map(|l| l.scalar), Some(ScalarTypeId::U32));
//! ```

pub mod lang;
pub mod literals;
