//! Predeclared type vocabulary.
//!
//! This registry covers every type name a shader module can use without declaring it: scalars, the abstract numeric
//! types, sampler/depth-texture handles, templated type generators (`vec3`, `array`, `ptr`, ...) and the predeclared
//! vector/matrix aliases (`vec3f`, `mat4x4h`, ...).
//!
//! ## Notes
//! - Lookup is **case-sensitive**.
//! - This module is vocabulary only (spellings + metadata), not type-system semantics.
//!
//! ## Examples
//! ```rust
//! use modsig_core::lang::types::{self, PredeclaredType, ScalarTypeId};
//!
//! assert_eq!(types::scalar_from_str("u32"), Some(ScalarTypeId::U32));
//! assert_eq!(types::scalar_as_str(ScalarTypeId::F16), "f16");
//! assert!(matches!(types::classify("vec3f"), Some(PredeclaredType::Alias(_))));
//! ```

/// Stable identifier for scalar types (including the abstract numeric types of const-expressions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarTypeId {
    Bool,
    I32,
    U32,
    F32,
    F16,
    AbstractInt,
    AbstractFloat,
}

/// Metadata for a scalar type.
#[derive(Debug, Clone, Copy)]
pub struct ScalarTypeInfo {
    pub id: ScalarTypeId,
    pub canonical: &'static str,
    /// Abstract types only exist during const evaluation and cannot be spelled in source.
    pub spellable: bool,
    pub description: &'static str,
}

/// Registry of scalar types.
pub const SCALAR_TYPES: &[ScalarTypeInfo] = &[
    scalar(ScalarTypeId::Bool, "bool", true, "Boolean scalar."),
    scalar(ScalarTypeId::I32, "i32", true, "32-bit signed integer."),
    scalar(ScalarTypeId::U32, "u32", true, "32-bit unsigned integer."),
    scalar(ScalarTypeId::F32, "f32", true, "32-bit IEEE-754 float."),
    scalar(ScalarTypeId::F16, "f16", true, "16-bit IEEE-754 float (requires `enable f16`)."),
    scalar(ScalarTypeId::AbstractInt, "AbstractInt", false, "Type of an unsuffixed integer literal."),
    scalar(ScalarTypeId::AbstractFloat, "AbstractFloat", false, "Type of an unsuffixed float literal."),
];

/// Predeclared types that take no template arguments and are not scalars.
pub const HANDLE_TYPES: &[&str] = &[
    "sampler",
    "sampler_comparison",
    "texture_depth_2d",
    "texture_depth_2d_array",
    "texture_depth_cube",
    "texture_depth_cube_array",
    "texture_depth_multisampled_2d",
    "texture_external",
];

/// Predeclared type generators: names that are only complete types once given template arguments.
pub const TYPE_GENERATORS: &[&str] = &[
    "vec2",
    "vec3",
    "vec4",
    "mat2x2",
    "mat2x3",
    "mat2x4",
    "mat3x2",
    "mat3x3",
    "mat3x4",
    "mat4x2",
    "mat4x3",
    "mat4x4",
    "array",
    "ptr",
    "atomic",
    "texture_1d",
    "texture_2d",
    "texture_2d_array",
    "texture_3d",
    "texture_cube",
    "texture_cube_array",
    "texture_multisampled_2d",
    "texture_storage_1d",
    "texture_storage_2d",
    "texture_storage_2d_array",
    "texture_storage_3d",
];

/// A predeclared alias such as `vec3f`, which stands for `vec3<f32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredeclaredAlias {
    pub name: &'static str,
    pub generator: &'static str,
    pub component: ScalarTypeId,
}

/// Registry of predeclared vector and matrix aliases.
pub const PREDECLARED_ALIASES: &[PredeclaredAlias] = &[
    alias("vec2i", "vec2", ScalarTypeId::I32),
    alias("vec3i", "vec3", ScalarTypeId::I32),
    alias("vec4i", "vec4", ScalarTypeId::I32),
    alias("vec2u", "vec2", ScalarTypeId::U32),
    alias("vec3u", "vec3", ScalarTypeId::U32),
    alias("vec4u", "vec4", ScalarTypeId::U32),
    alias("vec2f", "vec2", ScalarTypeId::F32),
    alias("vec3f", "vec3", ScalarTypeId::F32),
    alias("vec4f", "vec4", ScalarTypeId::F32),
    alias("vec2h", "vec2", ScalarTypeId::F16),
    alias("vec3h", "vec3", ScalarTypeId::F16),
    alias("vec4h", "vec4", ScalarTypeId::F16),
    alias("mat2x2f", "mat2x2", ScalarTypeId::F32),
    alias("mat2x3f", "mat2x3", ScalarTypeId::F32),
    alias("mat2x4f", "mat2x4", ScalarTypeId::F32),
    alias("mat3x2f", "mat3x2", ScalarTypeId::F32),
    alias("mat3x3f", "mat3x3", ScalarTypeId::F32),
    alias("mat3x4f", "mat3x4", ScalarTypeId::F32),
    alias("mat4x2f", "mat4x2", ScalarTypeId::F32),
    alias("mat4x3f", "mat4x3", ScalarTypeId::F32),
    alias("mat4x4f", "mat4x4", ScalarTypeId::F32),
    alias("mat2x2h", "mat2x2", ScalarTypeId::F16),
    alias("mat2x3h", "mat2x3", ScalarTypeId::F16),
    alias("mat2x4h", "mat2x4", ScalarTypeId::F16),
    alias("mat3x2h", "mat3x2", ScalarTypeId::F16),
    alias("mat3x3h", "mat3x3", ScalarTypeId::F16),
    alias("mat3x4h", "mat3x4", ScalarTypeId::F16),
    alias("mat4x2h", "mat4x2", ScalarTypeId::F16),
    alias("mat4x3h", "mat4x3", ScalarTypeId::F16),
    alias("mat4x4h", "mat4x4", ScalarTypeId::F16),
];

/// Classification of a predeclared type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredeclaredType {
    Scalar(ScalarTypeId),
    Handle(&'static str),
    Generator(&'static str),
    Alias(&'static PredeclaredAlias),
}

/// Resolve a type name to a [`ScalarTypeId`].
///
/// ## Returns
/// - `Some(ScalarTypeId)` for spellable scalars (`bool`, `i32`, `u32`, `f32`, `f16`).
/// - `None` otherwise. Abstract types are never resolved from source spellings.
pub fn scalar_from_str(name: &str) -> Option<ScalarTypeId> {
    SCALAR_TYPES
        .iter()
        .find(|t| t.spellable && t.canonical == name)
        .map(|t| t.id)
}

/// Return the canonical spelling for a scalar type.
pub fn scalar_as_str(id: ScalarTypeId) -> &'static str {
    match id {
        ScalarTypeId::Bool => "bool",
        ScalarTypeId::I32 => "i32",
        ScalarTypeId::U32 => "u32",
        ScalarTypeId::F32 => "f32",
        ScalarTypeId::F16 => "f16",
        ScalarTypeId::AbstractInt => "AbstractInt",
        ScalarTypeId::AbstractFloat => "AbstractFloat",
    }
}

/// Look up a predeclared alias (`vec3f`, `mat4x4h`, ...).
pub fn predeclared_alias(name: &str) -> Option<&'static PredeclaredAlias> {
    PREDECLARED_ALIASES.iter().find(|a| a.name == name)
}

/// Check whether `name` is a templated type generator.
pub fn is_generator(name: &str) -> bool {
    TYPE_GENERATORS.contains(&name)
}

/// Classify a name as a predeclared type.
///
/// ## Returns
/// - `Some(PredeclaredType)` if `name` is any predeclared type spelling.
/// - `None` for user-declared or unknown names.
pub fn classify(name: &str) -> Option<PredeclaredType> {
    if let Some(id) = scalar_from_str(name) {
        return Some(PredeclaredType::Scalar(id));
    }
    if let Some(handle) = HANDLE_TYPES.iter().copied().find(|h| *h == name) {
        return Some(PredeclaredType::Handle(handle));
    }
    if let Some(generator) = TYPE_GENERATORS.iter().copied().find(|g| *g == name) {
        return Some(PredeclaredType::Generator(generator));
    }
    predeclared_alias(name).map(PredeclaredType::Alias)
}

const fn scalar(id: ScalarTypeId, canonical: &'static str, spellable: bool, description: &'static str) -> ScalarTypeInfo {
    ScalarTypeInfo {
        id,
        canonical,
        spellable,
        description,
    }
}

const fn alias(name: &'static str, generator: &'static str, component: ScalarTypeId) -> PredeclaredAlias {
    PredeclaredAlias {
        name,
        generator,
        component,
    }
}
