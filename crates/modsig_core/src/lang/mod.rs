//! Shading-language vocabulary registries.
//!
//! Callers work with stable IDs (e.g. [`types::ScalarTypeId`], [`members::MemberKind`]) and look up spellings via
//! registry tables instead of comparing raw strings.
//!
//! ## Notes
//! - Registries are intentionally **pure**: no AST types, no IO, no side effects.
//!
//! ## Examples
//! ```rust
//! use modsig_core::lang::enumerants::{self, AddressSpaceId};
//!
//! assert_eq!(enumerants::address_space_from_str("storage"), Some(AddressSpaceId::Storage));
//! assert_eq!(enumerants::address_space_as_str(AddressSpaceId::Storage), "storage");
//! ```

pub mod enumerants;
pub mod members;
pub mod paths;
pub mod types;
