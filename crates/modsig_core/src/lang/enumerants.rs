//! Predeclared enumerants: address spaces, access modes and texel formats.
//!
//! Enumerants appear as template arguments (`ptr<function, f32>`, `texture_storage_2d<rgba8unorm, write>`) and in
//! `var<...>` declarations. They are values, not types, so the canonicalizer keeps them as normalized spellings.

/// Stable identifier for address spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressSpaceId {
    Function,
    Private,
    Workgroup,
    Uniform,
    Storage,
    Handle,
}

/// Stable identifier for access modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccessModeId {
    Read,
    Write,
    ReadWrite,
}

const ADDRESS_SPACES: &[(AddressSpaceId, &str)] = &[
    (AddressSpaceId::Function, "function"),
    (AddressSpaceId::Private, "private"),
    (AddressSpaceId::Workgroup, "workgroup"),
    (AddressSpaceId::Uniform, "uniform"),
    (AddressSpaceId::Storage, "storage"),
    (AddressSpaceId::Handle, "handle"),
];

const ACCESS_MODES: &[(AccessModeId, &str)] = &[
    (AccessModeId::Read, "read"),
    (AccessModeId::Write, "write"),
    (AccessModeId::ReadWrite, "read_write"),
];

/// Texel formats usable with storage textures.
pub const TEXEL_FORMATS: &[&str] = &[
    "rgba8unorm",
    "rgba8snorm",
    "rgba8uint",
    "rgba8sint",
    "rgba16uint",
    "rgba16sint",
    "rgba16float",
    "r32uint",
    "r32sint",
    "r32float",
    "rg32uint",
    "rg32sint",
    "rg32float",
    "rgba32uint",
    "rgba32sint",
    "rgba32float",
    "bgra8unorm",
];

pub fn address_space_from_str(name: &str) -> Option<AddressSpaceId> {
    ADDRESS_SPACES.iter().find(|(_, s)| *s == name).map(|(id, _)| *id)
}

pub fn address_space_as_str(id: AddressSpaceId) -> &'static str {
    match id {
        AddressSpaceId::Function => "function",
        AddressSpaceId::Private => "private",
        AddressSpaceId::Workgroup => "workgroup",
        AddressSpaceId::Uniform => "uniform",
        AddressSpaceId::Storage => "storage",
        AddressSpaceId::Handle => "handle",
    }
}

pub fn access_mode_from_str(name: &str) -> Option<AccessModeId> {
    ACCESS_MODES.iter().find(|(_, s)| *s == name).map(|(id, _)| *id)
}

pub fn access_mode_as_str(id: AccessModeId) -> &'static str {
    match id {
        AccessModeId::Read => "read",
        AccessModeId::Write => "write",
        AccessModeId::ReadWrite => "read_write",
    }
}

/// Check whether `name` is any predeclared enumerant.
pub fn is_enumerant(name: &str) -> bool {
    address_space_from_str(name).is_some() || access_mode_from_str(name).is_some() || TEXEL_FORMATS.contains(&name)
}
