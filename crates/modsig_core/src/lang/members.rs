//! Member kinds shared by module declarations and signature members.

use std::fmt;

/// The kind of a module member (or of a signature requirement).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemberKind {
    Function,
    Const,
    Override,
    Var,
    Type,
    Module,
}

/// Registry of member kinds, in declaration-keyword order.
pub const MEMBER_KINDS: &[MemberKind] = &[
    MemberKind::Function,
    MemberKind::Const,
    MemberKind::Override,
    MemberKind::Var,
    MemberKind::Type,
    MemberKind::Module,
];

impl MemberKind {
    /// The source keyword introducing this kind of member (`fn`, `const`, `mod`, ...).
    pub fn keyword(self) -> &'static str {
        match self {
            MemberKind::Function => "fn",
            MemberKind::Const => "const",
            MemberKind::Override => "override",
            MemberKind::Var => "var",
            MemberKind::Type => "type",
            MemberKind::Module => "mod",
        }
    }

    /// Human-readable noun used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            MemberKind::Function => "function",
            MemberKind::Const => "constant",
            MemberKind::Override => "override",
            MemberKind::Var => "variable",
            MemberKind::Type => "type",
            MemberKind::Module => "module",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<MemberKind> {
        MEMBER_KINDS.iter().copied().find(|k| k.keyword() == keyword)
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}
