//! Declaration-level AST for modsig translation units.
//!
//! The tree covers everything the signature checker and linker need: module signatures, modules, signature-annotated
//! aliases and the ordinary shader declarations (structs, functions, constants, overrides, variables) that populate
//! modules. Function bodies are kept as statement trees so the linker can find every qualified path they reference
//! and print them back out.
//!
//! ## Notes
//! - Every node is `serde`-serializable. The JSON form is the input contract of the `modsig` binary: a parser produces
//!   it, the checker consumes it.
//! - Paths and type specifiers accept a string shorthand (`"Math::Float"`, `"f32"`) in addition to their structured
//!   form, which keeps hand-written fixtures readable.
//! - Spans default to `0..0` when absent from the input.

use std::fmt;

use modsig_core::lang::paths::{self, PathAnchor};
use serde::{Deserialize, Serialize};

/// Source location span (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A node with source location
///
/// The node's fields are flattened into the same JSON object as `span`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    #[serde(flatten)]
    pub node: T,
    #[serde(default, skip_serializing_if = "Span::is_empty")]
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    /// Wrap a node that has no meaningful source location (synthesized or test-built nodes).
    pub fn unspanned(node: T) -> Self {
        Self {
            node,
            span: Span::default(),
        }
    }
}

pub type Ident = String;

/// A whole translation unit: the root module's declarations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TranslationUnit {
    #[serde(default)]
    pub declarations: Vec<Spanned<Declaration>>,
}

// ============================================================================
// Paths and types
// ============================================================================

/// A `::`-separated path, optionally anchored at `package` or `super`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "PathRepr", into = "PathRepr")]
pub struct QualifiedPath {
    pub segments: Vec<Ident>,
    pub span: Span,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PathRepr {
    Text(String),
    Full {
        segments: Vec<Ident>,
        #[serde(default)]
        span: Span,
    },
}

impl From<PathRepr> for QualifiedPath {
    fn from(repr: PathRepr) -> Self {
        match repr {
            PathRepr::Text(text) => QualifiedPath::parse(&text),
            PathRepr::Full { segments, span } => QualifiedPath { segments, span },
        }
    }
}

impl From<QualifiedPath> for PathRepr {
    fn from(path: QualifiedPath) -> Self {
        if path.span.is_empty() {
            PathRepr::Text(path.to_string())
        } else {
            PathRepr::Full {
                segments: path.segments,
                span: path.span,
            }
        }
    }
}

impl QualifiedPath {
    pub fn new(segments: Vec<Ident>) -> Self {
        Self {
            segments,
            span: Span::default(),
        }
    }

    /// Split `text` on `::`, dropping empty segments.
    pub fn parse(text: &str) -> Self {
        let segments = text
            .split(paths::SOURCE_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(segments)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn anchor(&self) -> Option<PathAnchor> {
        self.first().and_then(paths::anchor_from_str)
    }

    /// A path is qualified when it names something through a module: two or more segments, or any anchored path.
    pub fn is_qualified(&self) -> bool {
        self.segments.len() > 1 || self.anchor().is_some()
    }

    /// The single identifier of an unqualified path.
    pub fn as_ident(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [only] if paths::anchor_from_str(only).is_none() => Some(only),
            _ => None,
        }
    }
}

impl fmt::Display for QualifiedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join(paths::SOURCE_SEPARATOR))
    }
}

/// A type as written: a path plus optional template arguments (`array<f32, 4>`, `Math::Float::Quat`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TypeRepr", into = "TypeRepr")]
pub struct TypeSpecifier {
    pub path: QualifiedPath,
    pub args: Vec<TemplateArg>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TypeRepr {
    Name(String),
    Full {
        path: QualifiedPath,
        #[serde(default)]
        args: Vec<TemplateArg>,
    },
}

impl From<TypeRepr> for TypeSpecifier {
    fn from(repr: TypeRepr) -> Self {
        match repr {
            TypeRepr::Name(text) => TypeSpecifier::named(&text),
            TypeRepr::Full { path, args } => TypeSpecifier { path, args },
        }
    }
}

impl From<TypeSpecifier> for TypeRepr {
    fn from(ty: TypeSpecifier) -> Self {
        if ty.args.is_empty() && ty.path.span.is_empty() {
            TypeRepr::Name(ty.path.to_string())
        } else {
            TypeRepr::Full {
                path: ty.path,
                args: ty.args,
            }
        }
    }
}

impl TypeSpecifier {
    pub fn named(path: &str) -> Self {
        Self {
            path: QualifiedPath::parse(path),
            args: Vec::new(),
        }
    }

    pub fn generic(path: &str, args: Vec<TemplateArg>) -> Self {
        Self {
            path: QualifiedPath::parse(path),
            args,
        }
    }
}

/// A template argument is either a type or a value expression (array lengths, enumerants, texel formats).
///
/// Bare identifiers always deserialize as types; the canonicalizer reinterprets enumerant spellings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateArg {
    Type(TypeSpecifier),
    Expr(Expr),
}

impl From<TypeSpecifier> for TemplateArg {
    fn from(ty: TypeSpecifier) -> Self {
        TemplateArg::Type(ty)
    }
}

impl From<Expr> for TemplateArg {
    fn from(expr: Expr) -> Self {
        TemplateArg::Expr(expr)
    }
}

/// `@name(args...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: Ident,
    #[serde(default)]
    pub args: Vec<Expr>,
}

impl Attribute {
    pub fn new(name: &str, args: Vec<Expr>) -> Self {
        Self {
            name: name.to_string(),
            args,
        }
    }
}

// ============================================================================
// Expressions and statements
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    /// Numeric or boolean literal, kept as source text.
    Literal { value: String },
    Path { path: QualifiedPath },
    /// Function call or value constructor (`vec3<f32>(0.0)`, `Math::Float::quat_from_euler(v)`).
    Call {
        callee: TypeSpecifier,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Member { base: Box<Expr>, member: Ident },
    Index { base: Box<Expr>, index: Box<Expr> },
    Paren { inner: Box<Expr> },
}

impl Expr {
    pub fn literal(value: &str) -> Self {
        Expr::Literal {
            value: value.to_string(),
        }
    }

    pub fn path(path: &str) -> Self {
        Expr::Path {
            path: QualifiedPath::parse(path),
        }
    }

    pub fn call(callee: &str, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: TypeSpecifier::named(callee),
            args,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Rem,
    #[serde(rename = "&")]
    BitAnd,
    #[serde(rename = "|")]
    BitOr,
    #[serde(rename = "^")]
    BitXor,
    #[serde(rename = "<<")]
    Shl,
    #[serde(rename = ">>")]
    Shr,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    GtEq,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
        }
    }

    /// Comparison and logical operators always produce `bool`.
    pub fn yields_bool(self) -> bool {
        matches!(
            self,
            BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "-")]
    Neg,
    #[serde(rename = "!")]
    Not,
    #[serde(rename = "~")]
    BitNot,
    #[serde(rename = "&")]
    AddrOf,
    #[serde(rename = "*")]
    Deref,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::AddrOf => "&",
            UnaryOp::Deref => "*",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    Let {
        name: Ident,
        #[serde(default)]
        ty: Option<TypeSpecifier>,
        value: Expr,
    },
    Var {
        name: Ident,
        #[serde(default)]
        ty: Option<TypeSpecifier>,
        #[serde(default)]
        value: Option<Expr>,
    },
    Const {
        name: Ident,
        #[serde(default)]
        ty: Option<TypeSpecifier>,
        value: Expr,
    },
    /// `target = value` or a compound assignment when `op` is set.
    Assign {
        target: Expr,
        #[serde(default)]
        op: Option<BinaryOp>,
        value: Expr,
    },
    Return {
        #[serde(default)]
        value: Option<Expr>,
    },
    Expr { expr: Expr },
    If {
        condition: Expr,
        #[serde(default)]
        then_branch: Vec<Statement>,
        #[serde(default)]
        else_branch: Vec<Statement>,
    },
    While {
        condition: Expr,
        #[serde(default)]
        body: Vec<Statement>,
    },
    Loop {
        #[serde(default)]
        body: Vec<Statement>,
    },
    Block {
        #[serde(default)]
        body: Vec<Statement>,
    },
    Break,
    Continue,
    Discard,
}

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    /// `mod sig Name { ... }`
    ModuleSig(ModuleSigDecl),
    /// `mod Name -> Sig + Sig { ... }`
    Module(ModuleDecl),
    /// `alias Name : Sig + Sig = Target;` (signatures optional)
    Alias(TypeAliasDecl),
    Struct(StructDecl),
    Function(FunctionDecl),
    Const(ConstDecl),
    Override(OverrideDecl),
    Var(VarDecl),
    ConstAssert(ConstAssertDecl),
}

impl Declaration {
    /// The name this declaration binds in its module, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Declaration::ModuleSig(d) => Some(&d.name),
            Declaration::Module(d) => Some(&d.name),
            Declaration::Alias(d) => Some(&d.name),
            Declaration::Struct(d) => Some(&d.name),
            Declaration::Function(d) => Some(&d.name),
            Declaration::Const(d) => Some(&d.name),
            Declaration::Override(d) => Some(&d.name),
            Declaration::Var(d) => Some(&d.name),
            Declaration::ConstAssert(_) => None,
        }
    }
}

/// `mod sig Name { members }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSigDecl {
    pub name: Ident,
    #[serde(default)]
    pub members: Vec<Spanned<SigMember>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDecl {
    pub name: Ident,
    /// Signatures after `->`; empty means the module is unconstrained.
    #[serde(default)]
    pub signatures: Vec<TypeSpecifier>,
    #[serde(default)]
    pub declarations: Vec<Spanned<Declaration>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAliasDecl {
    pub name: Ident,
    /// Signatures after `:`; non-empty only for module aliases.
    #[serde(default)]
    pub signatures: Vec<TypeSpecifier>,
    pub target: TypeSpecifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub name: Ident,
    #[serde(default)]
    pub members: Vec<StructMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructMember {
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub name: Ident,
    pub ty: TypeSpecifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub name: Ident,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub return_type: Option<TypeSpecifier>,
    #[serde(default)]
    pub return_attributes: Vec<Attribute>,
    #[serde(default)]
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub name: Ident,
    pub ty: TypeSpecifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstDecl {
    pub name: Ident,
    #[serde(default)]
    pub ty: Option<TypeSpecifier>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideDecl {
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub name: Ident,
    #[serde(default)]
    pub ty: Option<TypeSpecifier>,
    #[serde(default)]
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub address_space: Option<Ident>,
    #[serde(default)]
    pub access_mode: Option<Ident>,
    pub name: Ident,
    #[serde(default)]
    pub ty: Option<TypeSpecifier>,
    #[serde(default)]
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstAssertDecl {
    pub expr: Expr,
}

// ============================================================================
// Signature members
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SigMember {
    /// `fn name(params) -> ret;`
    Function(FunctionSig),
    /// `const NAME: T;`
    Const(ConstSig),
    /// `override NAME: T;`
    Override(OverrideSig),
    /// `var<space, mode> NAME: T;`
    Var(VarSig),
    /// `type Name;` or `type Name: T;`
    Type(TypeSig),
    /// `mod Name: Sig + Sig;`
    Module(ModuleRequirement),
}

impl SigMember {
    pub fn name(&self) -> &str {
        match self {
            SigMember::Function(m) => &m.name,
            SigMember::Const(m) => &m.name,
            SigMember::Override(m) => &m.name,
            SigMember::Var(m) => &m.name,
            SigMember::Type(m) => &m.name,
            SigMember::Module(m) => &m.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSig {
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub name: Ident,
    #[serde(default)]
    pub params: Vec<SigParam>,
    #[serde(default)]
    pub return_type: Option<TypeSpecifier>,
    #[serde(default)]
    pub return_attributes: Vec<Attribute>,
}

/// A signature parameter; the name is optional and never compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigParam {
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub name: Option<Ident>,
    pub ty: TypeSpecifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstSig {
    pub name: Ident,
    pub ty: TypeSpecifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideSig {
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub name: Ident,
    pub ty: TypeSpecifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarSig {
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub address_space: Option<Ident>,
    #[serde(default)]
    pub access_mode: Option<Ident>,
    pub name: Ident,
    pub ty: TypeSpecifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSig {
    pub name: Ident,
    #[serde(default)]
    pub constraint: Option<TypeSpecifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRequirement {
    pub name: Ident,
    #[serde(default)]
    pub signatures: Vec<TypeSpecifier>,
}
