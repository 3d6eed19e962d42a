//! Canonical types and the alias-resolution pass.
//!
//! Every type specifier is reduced to a [`CanonicalType`]: a structural descriptor with value equality. Aliases are
//! followed to their terminal definition, predeclared aliases (`vec3f`) expand to their templated form, and literal
//! template arguments are normalized, so two spellings of the same type compare equal.
//!
//! The pass runs in two phases:
//! 1. [`canonicalize_all`] resolves every alias in the tree, memoized, with an explicit in-progress stack for cycle
//!    detection. It returns a frozen [`TypeCache`].
//! 2. [`Resolver`] answers type and path queries against the frozen cache. It never mutates anything and is `Copy`,
//!    so checks can share it freely.
//!
//! ## Notes
//! - A cycle is fatal only for the aliases in it (or leading into it): they resolve to [`AliasTarget::Cycle`] and
//!   every type built from them becomes [`CanonicalType::Unknown`], which compares equal to anything.
//! - Paths whose first segment resolves nowhere in the tree are ordinary imports; types spelled through them are
//!   [`CanonicalType::External`] and compare by written path.
//!
//! ## See also
//! - [`registry`](super::registry) for how signature members are canonicalized.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use modsig_core::lang::enumerants;
use modsig_core::lang::types::{self, PredeclaredType, ScalarTypeId};
use modsig_core::literals;

use crate::frontend::ast::{Attribute, Declaration, Expr, FunctionDecl, Ident, TemplateArg, TypeSpecifier, UnaryOp};
use crate::frontend::diagnostics::{AccessReason, Diagnostic, DiagnosticKind};
use crate::frontend::printer;
use crate::frontend::tree::{Anchored, DeclId, ModuleId, ModuleTree};

/// How far const references are followed when inferring a type or a template value.
const MAX_INFERENCE_DEPTH: usize = 16;

// ============================================================================
// Canonical forms
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalType {
    /// Predeclared non-templated type (`f32`, `sampler`, `AbstractInt`).
    Primitive(String),
    /// Templated type generator applied to canonical arguments (`vec3<f32>`, `array<u32, 4>`).
    Composite { name: String, args: Vec<CanonicalArg> },
    /// A struct, identified by its qualified declaration path.
    Struct(Vec<Ident>),
    /// A signature's associated type, bound when a check runs.
    Associated(Ident),
    /// A path that does not resolve inside the tree.
    External(Vec<Ident>),
    /// Error recovery. Compatible with everything.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalArg {
    Type(CanonicalType),
    /// A normalized value: array length, enumerant, texel format.
    Value(String),
}

impl CanonicalType {
    pub fn primitive(name: &str) -> Self {
        CanonicalType::Primitive(name.to_string())
    }

    pub fn scalar(id: ScalarTypeId) -> Self {
        CanonicalType::Primitive(types::scalar_as_str(id).to_string())
    }

    pub fn composite(name: &str, args: Vec<CanonicalArg>) -> Self {
        CanonicalType::Composite {
            name: name.to_string(),
            args,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, CanonicalType::Unknown)
    }

    /// Whether error recovery replaced this type or any type argument of it.
    pub fn contains_unknown(&self) -> bool {
        match self {
            CanonicalType::Unknown => true,
            CanonicalType::Composite { args, .. } => args
                .iter()
                .any(|arg| matches!(arg, CanonicalArg::Type(t) if t.contains_unknown())),
            _ => false,
        }
    }

    /// Add every associated type name this type mentions to `names`.
    pub fn collect_associated(&self, names: &mut BTreeSet<Ident>) {
        match self {
            CanonicalType::Associated(name) => {
                names.insert(name.clone());
            }
            CanonicalType::Composite { args, .. } => {
                for arg in args {
                    if let CanonicalArg::Type(t) = arg {
                        t.collect_associated(names);
                    }
                }
            }
            _ => {}
        }
    }

    /// Structural comparison in which `Unknown` matches anything.
    pub fn matches(&self, other: &CanonicalType) -> bool {
        match (self, other) {
            (CanonicalType::Unknown, _) | (_, CanonicalType::Unknown) => true,
            (
                CanonicalType::Composite { name: a, args: x },
                CanonicalType::Composite { name: b, args: y },
            ) => a == b && x.len() == y.len() && x.iter().zip(y).all(|(p, q)| p.matches(q)),
            _ => self == other,
        }
    }

    /// Replace associated types using `bind`; names `bind` declines are left symbolic.
    pub fn substitute(&self, bind: &mut impl FnMut(&str) -> Option<CanonicalType>) -> CanonicalType {
        match self {
            CanonicalType::Associated(name) => bind(name).unwrap_or_else(|| self.clone()),
            CanonicalType::Composite { name, args } => CanonicalType::Composite {
                name: name.clone(),
                args: args
                    .iter()
                    .map(|arg| match arg {
                        CanonicalArg::Type(t) => CanonicalArg::Type(t.substitute(bind)),
                        CanonicalArg::Value(v) => CanonicalArg::Value(v.clone()),
                    })
                    .collect(),
            },
            other => other.clone(),
        }
    }
}

impl CanonicalArg {
    pub fn matches(&self, other: &CanonicalArg) -> bool {
        match (self, other) {
            (CanonicalArg::Type(a), CanonicalArg::Type(b)) => a.matches(b),
            (CanonicalArg::Value(a), CanonicalArg::Value(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalType::Primitive(name) => f.write_str(name),
            CanonicalType::Composite { name, args } => {
                write!(f, "{name}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
            CanonicalType::Struct(path) | CanonicalType::External(path) => f.write_str(&path.join("::")),
            CanonicalType::Associated(name) => f.write_str(name),
            CanonicalType::Unknown => f.write_str("{unknown}"),
        }
    }
}

impl fmt::Display for CanonicalArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalArg::Type(t) => write!(f, "{t}"),
            CanonicalArg::Value(v) => f.write_str(v),
        }
    }
}

/// An attribute with canonicalized arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalAttribute {
    pub name: String,
    pub args: Vec<String>,
}

impl fmt::Display for CanonicalAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "@{}", self.name)
        } else {
            write!(f, "@{}({})", self.name, self.args.join(", "))
        }
    }
}

/// Attributes compare as sets of `(name, args)` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AttributeSet(BTreeSet<CanonicalAttribute>);

impl AttributeSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalAttribute> {
        self.0.iter()
    }
}

impl FromIterator<CanonicalAttribute> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = CanonicalAttribute>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(none)");
        }
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(" "))
    }
}

// ============================================================================
// Resolution results
// ============================================================================

/// What an alias declaration stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasTarget {
    Type(CanonicalType),
    /// A module alias.
    Module(ModuleId),
    /// The alias is part of, or leads into, an alias cycle.
    Cycle,
}

/// The result of resolving a type specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Type(CanonicalType),
    Module(ModuleId),
    /// Resolution went through an alias cycle, which was already reported.
    Poisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathTarget {
    Module(ModuleId),
    Decl(DeclId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathResolution {
    Found(PathTarget),
    /// The first segment names nothing in scope: an ordinary import.
    External,
    /// Segment `segment` (0-based) is where resolution stopped: the missing name, or the non-module a further segment
    /// was looked up in.
    Failed { segment: usize, reason: AccessReason },
    Poisoned,
}

/// Where type names are looked up.
#[derive(Debug, Clone, Copy)]
pub enum TypeScope<'s> {
    Module(ModuleId),
    /// Inside a `mod sig`: its own `type` members are associated types, and unresolvable single names are free
    /// associated types supplied by another signature.
    Signature {
        module: ModuleId,
        associated: &'s BTreeSet<Ident>,
    },
}

impl TypeScope<'_> {
    pub fn module(&self) -> ModuleId {
        match self {
            TypeScope::Module(module) => *module,
            TypeScope::Signature { module, .. } => *module,
        }
    }

    fn is_associated(&self, name: &str) -> bool {
        matches!(self, TypeScope::Signature { associated, .. } if associated.contains(name))
    }
}

// ============================================================================
// Phase 1: canonicalize all aliases
// ============================================================================

/// Alias targets for every alias declaration in the tree. Immutable once built.
#[derive(Debug, Default)]
pub struct TypeCache {
    aliases: BTreeMap<DeclId, AliasTarget>,
}

impl TypeCache {
    pub fn alias(&self, id: DeclId) -> Option<&AliasTarget> {
        self.aliases.get(&id)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Source of alias targets for the resolution functions below.
trait AliasLookup<'ast> {
    fn alias_target(&mut self, tree: &ModuleTree<'ast>, id: DeclId) -> AliasTarget;
}

impl<'ast> AliasLookup<'ast> for &TypeCache {
    fn alias_target(&mut self, _tree: &ModuleTree<'ast>, id: DeclId) -> AliasTarget {
        // Every member alias is in the cache; anything else is not reachable through lookup.
        self.aliases.get(&id).cloned().unwrap_or(AliasTarget::Cycle)
    }
}

#[derive(Default)]
struct AliasPass {
    resolved: BTreeMap<DeclId, AliasTarget>,
    in_progress: Vec<DeclId>,
    reported: BTreeSet<Vec<DeclId>>,
    diagnostics: Vec<Diagnostic>,
}

impl AliasPass {
    fn report_cycle(&mut self, tree: &ModuleTree<'_>, mut cycle: Vec<DeclId>) {
        // Rotate so the same cycle is recognized whichever alias we entered it from.
        if let Some(min_pos) = cycle.iter().enumerate().min_by_key(|(_, d)| **d).map(|(i, _)| i) {
            cycle.rotate_left(min_pos);
        }
        let Some(&first) = cycle.first() else {
            return;
        };
        if !self.reported.insert(cycle.clone()) {
            return;
        }
        let mut chain: Vec<String> = cycle.iter().map(|d| tree.decl_path(*d).to_string()).collect();
        chain.push(tree.decl_path(first).to_string());
        tracing::debug!(chain = %chain.join(" -> "), "alias cycle");
        self.diagnostics.push(
            Diagnostic::new(tree.decl_path(first), DiagnosticKind::AliasCycle { chain })
                .with_span(tree.decl(first).span),
        );
    }
}

impl<'ast> AliasLookup<'ast> for AliasPass {
    fn alias_target(&mut self, tree: &ModuleTree<'ast>, id: DeclId) -> AliasTarget {
        if let Some(target) = self.resolved.get(&id) {
            return target.clone();
        }
        if let Some(pos) = self.in_progress.iter().position(|d| *d == id) {
            let cycle = self.in_progress[pos..].to_vec();
            self.report_cycle(tree, cycle);
            return AliasTarget::Cycle;
        }
        let Declaration::Alias(alias) = &tree.decl(id).node else {
            return AliasTarget::Type(CanonicalType::Unknown);
        };

        self.in_progress.push(id);
        let target = match resolve_type(tree, self, &TypeScope::Module(id.module), &alias.target) {
            Resolved::Type(t) => AliasTarget::Type(t),
            Resolved::Module(m) => AliasTarget::Module(m),
            Resolved::Poisoned => AliasTarget::Cycle,
        };
        self.in_progress.pop();

        tracing::trace!(alias = %tree.decl_path(id), ?target, "resolved alias");
        self.resolved.insert(id, target.clone());
        target
    }
}

/// Resolve every alias in the tree and freeze the results.
///
/// ## Returns
/// The frozen cache and one `AliasCycle` diagnostic per distinct cycle.
#[tracing::instrument(skip_all, fields(modules = tree.len()))]
pub fn canonicalize_all(tree: &ModuleTree<'_>) -> (TypeCache, Vec<Diagnostic>) {
    let mut pass = AliasPass::default();
    for node in tree.modules() {
        for (index, decl) in node.declarations.iter().enumerate() {
            if matches!(decl.node, Declaration::Alias(_)) && node.is_member(index) {
                pass.alias_target(tree, DeclId { module: node.id, index });
            }
        }
    }
    tracing::debug!(aliases = pass.resolved.len(), cycles = pass.diagnostics.len(), "canonicalized aliases");
    (TypeCache { aliases: pass.resolved }, pass.diagnostics)
}

// ============================================================================
// Resolution
// ============================================================================

fn resolve_type<'ast, A: AliasLookup<'ast>>(
    tree: &ModuleTree<'ast>,
    aliases: &mut A,
    scope: &TypeScope<'_>,
    ty: &TypeSpecifier,
) -> Resolved {
    if let Some(name) = ty.path.as_ident() {
        if scope.is_associated(name) {
            return Resolved::Type(CanonicalType::Associated(name.to_string()));
        }
        if let Some(decl) = tree.lookup_lexical(scope.module(), name) {
            return decl_as_type(tree, aliases, decl);
        }
        if let Some(predeclared) = types::classify(name) {
            return predeclared_type(tree, aliases, scope, predeclared, &ty.args);
        }
        return Resolved::Type(match scope {
            TypeScope::Signature { .. } => CanonicalType::Associated(name.to_string()),
            TypeScope::Module(_) => CanonicalType::External(vec![name.to_string()]),
        });
    }

    match resolve_path(tree, aliases, scope.module(), &ty.path.segments) {
        PathResolution::Found(PathTarget::Module(m)) => Resolved::Module(m),
        PathResolution::Found(PathTarget::Decl(decl)) => decl_as_type(tree, aliases, decl),
        PathResolution::External => Resolved::Type(CanonicalType::External(ty.path.segments.clone())),
        PathResolution::Failed { .. } => Resolved::Type(CanonicalType::Unknown),
        PathResolution::Poisoned => Resolved::Poisoned,
    }
}

fn decl_as_type<'ast, A: AliasLookup<'ast>>(tree: &ModuleTree<'ast>, aliases: &mut A, decl: DeclId) -> Resolved {
    match &tree.decl(decl).node {
        Declaration::Struct(_) => Resolved::Type(CanonicalType::Struct(tree.decl_path(decl).segments().to_vec())),
        Declaration::Alias(_) => match aliases.alias_target(tree, decl) {
            AliasTarget::Type(t) => Resolved::Type(t),
            AliasTarget::Module(m) => Resolved::Module(m),
            AliasTarget::Cycle => Resolved::Poisoned,
        },
        Declaration::Module(_) => match tree.module_of(decl) {
            Some(m) => Resolved::Module(m),
            None => Resolved::Type(CanonicalType::Unknown),
        },
        _ => Resolved::Type(CanonicalType::Unknown),
    }
}

fn predeclared_type<'ast, A: AliasLookup<'ast>>(
    tree: &ModuleTree<'ast>,
    aliases: &mut A,
    scope: &TypeScope<'_>,
    predeclared: PredeclaredType,
    args: &[TemplateArg],
) -> Resolved {
    match predeclared {
        PredeclaredType::Scalar(id) => Resolved::Type(CanonicalType::scalar(id)),
        PredeclaredType::Handle(name) => Resolved::Type(CanonicalType::primitive(name)),
        PredeclaredType::Alias(alias) => Resolved::Type(CanonicalType::composite(
            alias.generator,
            vec![CanonicalArg::Type(CanonicalType::scalar(alias.component))],
        )),
        PredeclaredType::Generator(name) => {
            let mut canonical = Vec::with_capacity(args.len());
            for arg in args {
                match canonical_arg(tree, aliases, scope, arg) {
                    Some(arg) => canonical.push(arg),
                    None => return Resolved::Poisoned,
                }
            }
            Resolved::Type(CanonicalType::composite(name, canonical))
        }
    }
}

/// Canonicalize one template argument; `None` when it went through an alias cycle.
fn canonical_arg<'ast, A: AliasLookup<'ast>>(
    tree: &ModuleTree<'ast>,
    aliases: &mut A,
    scope: &TypeScope<'_>,
    arg: &TemplateArg,
) -> Option<CanonicalArg> {
    match arg {
        TemplateArg::Type(ty) => {
            if let Some(name) = ty.path.as_ident().filter(|_| ty.args.is_empty()) {
                if !scope.is_associated(name) {
                    if enumerants::is_enumerant(name) {
                        return Some(CanonicalArg::Value(name.to_string()));
                    }
                    if let Some(literal) = literals::classify(name) {
                        return Some(CanonicalArg::Value(literal.normalized));
                    }
                    let constant = tree
                        .lookup_lexical(scope.module(), name)
                        .filter(|decl| matches!(tree.decl(*decl).node, Declaration::Const(_) | Declaration::Override(_)));
                    if let Some(decl) = constant {
                        return Some(CanonicalArg::Value(const_text(tree, decl, name, 0)));
                    }
                }
            }
            match resolve_type(tree, aliases, scope, ty) {
                Resolved::Type(t) => Some(CanonicalArg::Type(t)),
                Resolved::Module(_) => Some(CanonicalArg::Type(CanonicalType::Unknown)),
                Resolved::Poisoned => None,
            }
        }
        TemplateArg::Expr(expr) => Some(CanonicalArg::Value(value_text(tree, scope.module(), expr, 0))),
    }
}

/// Normalized spelling of a constant expression: literals normalize, const references follow their value.
fn value_text(tree: &ModuleTree<'_>, module: ModuleId, expr: &Expr, depth: usize) -> String {
    match expr {
        Expr::Literal { value } => literals::normalize(value),
        Expr::Path { path } => match path.as_ident().and_then(|name| tree.lookup_lexical(module, name)) {
            Some(decl) => const_text(tree, decl, &path.to_string(), depth),
            None => path.to_string(),
        },
        other => printer::expr_to_string(other),
    }
}

fn const_text(tree: &ModuleTree<'_>, decl: DeclId, written: &str, depth: usize) -> String {
    if depth >= MAX_INFERENCE_DEPTH {
        return written.to_string();
    }
    match &tree.decl(decl).node {
        Declaration::Const(c) => value_text(tree, decl.module, &c.value, depth + 1),
        _ => written.to_string(),
    }
}

fn resolve_path<'ast, A: AliasLookup<'ast>>(
    tree: &ModuleTree<'ast>,
    aliases: &mut A,
    from: ModuleId,
    segments: &[String],
) -> PathResolution {
    let (mut current, start) = match tree.resolve_anchor(from, segments) {
        Anchored::PastRoot => {
            return PathResolution::Failed {
                segment: 0,
                reason: AccessReason::SuperAtRoot,
            };
        }
        Anchored::At { module, consumed } => (PathTarget::Module(module), consumed),
        Anchored::Unanchored => {
            let Some(first) = segments.first() else {
                return PathResolution::Failed {
                    segment: 0,
                    reason: AccessReason::NotFound,
                };
            };
            match tree.lookup_lexical(from, first) {
                Some(decl) => (enter(tree, decl), 1),
                None => return PathResolution::External,
            }
        }
    };

    // `index >= 1` whenever `current` is a declaration: it was entered through an earlier segment.
    for (offset, segment) in segments[start..].iter().enumerate() {
        let index = start + offset;
        let module = match current {
            PathTarget::Module(m) => m,
            PathTarget::Decl(decl) => match &tree.decl(decl).node {
                Declaration::Alias(_) => match aliases.alias_target(tree, decl) {
                    AliasTarget::Module(m) => m,
                    AliasTarget::Cycle => return PathResolution::Poisoned,
                    AliasTarget::Type(_) => {
                        return PathResolution::Failed {
                            segment: index - 1,
                            reason: AccessReason::NotAModule,
                        };
                    }
                },
                _ => {
                    return PathResolution::Failed {
                        segment: index - 1,
                        reason: AccessReason::NotAModule,
                    };
                }
            },
        };
        match tree.member(module, segment) {
            Some(decl) => current = enter(tree, decl),
            None => {
                return PathResolution::Failed {
                    segment: index,
                    reason: AccessReason::NotFound,
                };
            }
        }
    }
    PathResolution::Found(current)
}

fn enter(tree: &ModuleTree<'_>, decl: DeclId) -> PathTarget {
    match tree.module_of(decl) {
        Some(m) => PathTarget::Module(m),
        None => PathTarget::Decl(decl),
    }
}

// ============================================================================
// Phase 2: read-only queries
// ============================================================================

/// Read-only type and path queries over a frozen [`TypeCache`].
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a, 'ast> {
    tree: &'a ModuleTree<'ast>,
    cache: &'a TypeCache,
}

impl<'a, 'ast> Resolver<'a, 'ast> {
    pub fn new(tree: &'a ModuleTree<'ast>, cache: &'a TypeCache) -> Self {
        Self { tree, cache }
    }

    pub fn tree(&self) -> &'a ModuleTree<'ast> {
        self.tree
    }

    pub fn alias_target(&self, id: DeclId) -> AliasTarget {
        let mut lookup = self.cache;
        lookup.alias_target(self.tree, id)
    }

    pub fn resolve_type(&self, scope: &TypeScope<'_>, ty: &TypeSpecifier) -> Resolved {
        let mut lookup = self.cache;
        resolve_type(self.tree, &mut lookup, scope, ty)
    }

    /// Resolve a type where only a type makes sense: modules become `Unknown`, cycles too.
    pub fn type_of(&self, scope: &TypeScope<'_>, ty: &TypeSpecifier) -> CanonicalType {
        match self.resolve_type(scope, ty) {
            Resolved::Type(t) => t,
            Resolved::Module(_) | Resolved::Poisoned => CanonicalType::Unknown,
        }
    }

    pub fn resolve_path(&self, from: ModuleId, segments: &[String]) -> PathResolution {
        let mut lookup = self.cache;
        resolve_path(self.tree, &mut lookup, from, segments)
    }

    /// The module a declaration stands for: a `module` declaration, or an alias of one.
    pub fn module_behind(&self, decl: DeclId) -> Option<ModuleId> {
        match &self.tree.decl(decl).node {
            Declaration::Module(_) => self.tree.module_of(decl),
            Declaration::Alias(_) => match self.alias_target(decl) {
                AliasTarget::Module(m) => Some(m),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn attributes(&self, module: ModuleId, attributes: &[Attribute]) -> AttributeSet {
        attributes
            .iter()
            .map(|attr| CanonicalAttribute {
                name: attr.name.clone(),
                args: attr
                    .args
                    .iter()
                    .map(|arg| value_text(self.tree, module, arg, 0))
                    .collect(),
            })
            .collect()
    }

    /// The type of a `const`, `override` or `var` declaration: its annotation, or a minimal inference from its
    /// initializer. `None` when neither yields a type.
    pub fn value_type(&self, decl: DeclId) -> Option<CanonicalType> {
        self.value_type_at(decl, 0)
    }

    fn value_type_at(&self, decl: DeclId, depth: usize) -> Option<CanonicalType> {
        if depth >= MAX_INFERENCE_DEPTH {
            return None;
        }
        let (ty, value) = match &self.tree.decl(decl).node {
            Declaration::Const(c) => (c.ty.as_ref(), Some(&c.value)),
            Declaration::Override(o) => (o.ty.as_ref(), o.value.as_ref()),
            Declaration::Var(v) => (v.ty.as_ref(), v.value.as_ref()),
            _ => return None,
        };
        if let Some(ty) = ty {
            return Some(self.type_of(&TypeScope::Module(decl.module), ty));
        }
        self.infer(decl.module, value?, depth)
    }

    fn infer(&self, module: ModuleId, expr: &Expr, depth: usize) -> Option<CanonicalType> {
        match expr {
            Expr::Literal { value } => literals::classify(value).map(|lit| CanonicalType::scalar(lit.scalar)),
            Expr::Paren { inner } => self.infer(module, inner, depth),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => self.infer(module, operand, depth),
            Expr::Unary { op: UnaryOp::Not, .. } => Some(CanonicalType::scalar(ScalarTypeId::Bool)),
            Expr::Binary { op, .. } if op.yields_bool() => Some(CanonicalType::scalar(ScalarTypeId::Bool)),
            Expr::Path { path } => match self.resolve_path(module, &path.segments) {
                PathResolution::Found(PathTarget::Decl(decl)) => self.value_type_at(decl, depth + 1),
                _ => None,
            },
            Expr::Call { callee, .. } => {
                if let Some((decl, function)) = self.called_function(module, callee) {
                    return function
                        .return_type
                        .as_ref()
                        .map(|ret| self.type_of(&TypeScope::Module(decl.module), ret));
                }
                match self.resolve_type(&TypeScope::Module(module), callee) {
                    // A bare generator (`vec3(...)`) takes its arguments from the values; not inferred here.
                    Resolved::Type(CanonicalType::Composite { args, .. }) if args.is_empty() => None,
                    Resolved::Type(CanonicalType::External(_)) => None,
                    Resolved::Type(t) => Some(t),
                    Resolved::Module(_) | Resolved::Poisoned => None,
                }
            }
            _ => None,
        }
    }

    fn called_function(&self, module: ModuleId, callee: &TypeSpecifier) -> Option<(DeclId, &'ast FunctionDecl)> {
        if !callee.args.is_empty() {
            return None;
        }
        let PathResolution::Found(PathTarget::Decl(decl)) = self.resolve_path(module, &callee.path.segments) else {
            return None;
        };
        match &self.tree.decl(decl).node {
            Declaration::Function(function) => Some((decl, function)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests;
