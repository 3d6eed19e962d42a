//! The signature registry.
//!
//! Every `mod sig` in the tree is registered once, under its qualified name, with its members in canonical form.
//! The registry also records the signature set each module or alias declares (`mod M -> A + B`, `alias F: A = M`).
//! It is built after the type cache is frozen and never changes afterwards.
//!
//! ## Notes
//! - A [`SignatureSet`] is an ordered set of names, so composition (`+`) is set union and is commutative and
//!   associative by construction.
//! - [`SignatureRegistry::resolve`] merges members in name order; a name declared differently by two signatures of
//!   the set is a [`CompositionConflict`], whatever order the set was written in.
//! - Unknown signature references are reported once here and dropped; a declared set missing one of its references
//!   is marked incomplete so later passes do not pile further diagnostics on it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use modsig_core::lang::members::MemberKind;
use modsig_core::lang::paths;

use crate::frontend::ast::{Declaration, FunctionDecl, FunctionSig, Ident, SigMember, Span, TypeSpecifier};
use crate::frontend::canonical::{AttributeSet, CanonicalType, PathResolution, PathTarget, Resolver, TypeScope};
use crate::frontend::diagnostics::{Diagnostic, DiagnosticKind, MemberPath};
use crate::frontend::tree::{DeclId, ModuleId};

// ============================================================================
// Names and sets
// ============================================================================

/// Qualified signature name (`Math::MathImpl`, or `MathImpl` at the package root).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignatureName(String);

impl SignatureName {
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn qualified(module_path: &[&str], name: &str) -> Self {
        let mut segments: Vec<&str> = module_path.to_vec();
        segments.push(name);
        Self(segments.join(paths::SOURCE_SEPARATOR))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A composition of signatures: `A + B + C`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SignatureSet(BTreeSet<SignatureName>);

impl SignatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(name: SignatureName) -> Self {
        Self(BTreeSet::from([name]))
    }

    pub fn insert(&mut self, name: SignatureName) {
        self.0.insert(name);
    }

    /// `self + other`.
    pub fn compose(&self, other: &SignatureSet) -> SignatureSet {
        Self(self.0.union(&other.0).cloned().collect())
    }

    pub fn contains(&self, name: &SignatureName) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignatureName> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<SignatureName> for SignatureSet {
    fn from_iter<I: IntoIterator<Item = SignatureName>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for SignatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(empty)");
        }
        let names: Vec<&str> = self.0.iter().map(SignatureName::as_str).collect();
        f.write_str(&names.join(" + "))
    }
}

// ============================================================================
// Members
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamShape {
    pub ty: CanonicalType,
    pub attributes: AttributeSet,
}

/// The comparable shape of a function: parameter names are never part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionShape {
    pub params: Vec<ParamShape>,
    pub return_type: Option<CanonicalType>,
    pub attributes: AttributeSet,
    pub return_attributes: AttributeSet,
}

impl FunctionShape {
    pub fn of_decl(resolver: Resolver<'_, '_>, module: ModuleId, function: &FunctionDecl) -> Self {
        let scope = TypeScope::Module(module);
        Self {
            params: function
                .params
                .iter()
                .map(|p| ParamShape {
                    ty: resolver.type_of(&scope, &p.ty),
                    attributes: resolver.attributes(module, &p.attributes),
                })
                .collect(),
            return_type: function.return_type.as_ref().map(|ty| resolver.type_of(&scope, ty)),
            attributes: resolver.attributes(module, &function.attributes),
            return_attributes: resolver.attributes(module, &function.return_attributes),
        }
    }

    fn of_sig(resolver: Resolver<'_, '_>, scope: &TypeScope<'_>, function: &FunctionSig) -> Self {
        let module = scope.module();
        Self {
            params: function
                .params
                .iter()
                .map(|p| ParamShape {
                    ty: resolver.type_of(scope, &p.ty),
                    attributes: resolver.attributes(module, &p.attributes),
                })
                .collect(),
            return_type: function.return_type.as_ref().map(|ty| resolver.type_of(scope, ty)),
            attributes: resolver.attributes(module, &function.attributes),
            return_attributes: resolver.attributes(module, &function.return_attributes),
        }
    }
}

impl fmt::Display for FunctionShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_attributes(f, &param.attributes)?;
            write!(f, "{}", param.ty)?;
        }
        f.write_str(")")?;
        if let Some(ret) = &self.return_type {
            f.write_str(" -> ")?;
            write_attributes(f, &self.return_attributes)?;
            write!(f, "{ret}")?;
        }
        Ok(())
    }
}

fn write_attributes(f: &mut fmt::Formatter<'_>, attributes: &AttributeSet) -> fmt::Result {
    for attr in attributes.iter() {
        write!(f, "{attr} ")?;
    }
    Ok(())
}

/// A signature member in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureMember {
    Function(FunctionShape),
    Const {
        ty: CanonicalType,
    },
    Override {
        ty: CanonicalType,
        attributes: AttributeSet,
    },
    Var {
        address_space: Option<Ident>,
        access_mode: Option<Ident>,
        ty: CanonicalType,
        attributes: AttributeSet,
    },
    /// `None` is an opaque type.
    Type {
        constraint: Option<CanonicalType>,
    },
    NestedMod {
        required: SignatureSet,
    },
}

impl SignatureMember {
    pub fn kind(&self) -> MemberKind {
        match self {
            SignatureMember::Function(_) => MemberKind::Function,
            SignatureMember::Const { .. } => MemberKind::Const,
            SignatureMember::Override { .. } => MemberKind::Override,
            SignatureMember::Var { .. } => MemberKind::Var,
            SignatureMember::Type { .. } => MemberKind::Type,
            SignatureMember::NestedMod { .. } => MemberKind::Module,
        }
    }

    /// Add the associated type names this member's types mention. Nested requirements are not entered.
    pub fn collect_associated(&self, names: &mut BTreeSet<Ident>) {
        match self {
            SignatureMember::Function(shape) => {
                for param in &shape.params {
                    param.ty.collect_associated(names);
                }
                if let Some(ret) = &shape.return_type {
                    ret.collect_associated(names);
                }
            }
            SignatureMember::Const { ty } | SignatureMember::Override { ty, .. } | SignatureMember::Var { ty, .. } => {
                ty.collect_associated(names);
            }
            SignatureMember::Type { constraint } => {
                if let Some(constraint) = constraint {
                    constraint.collect_associated(names);
                }
            }
            SignatureMember::NestedMod { .. } => {}
        }
    }
}

impl fmt::Display for SignatureMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureMember::Function(shape) => {
                write_attributes(f, &shape.attributes)?;
                write!(f, "fn{shape}")
            }
            SignatureMember::Const { ty } => write!(f, "const: {ty}"),
            SignatureMember::Override { ty, attributes } => {
                write_attributes(f, attributes)?;
                write!(f, "override: {ty}")
            }
            SignatureMember::Var {
                address_space,
                access_mode,
                ty,
                attributes,
            } => {
                write_attributes(f, attributes)?;
                f.write_str("var")?;
                let qualifiers: Vec<&str> = address_space.iter().chain(access_mode).map(String::as_str).collect();
                if !qualifiers.is_empty() {
                    write!(f, "<{}>", qualifiers.join(", "))?;
                }
                write!(f, ": {ty}")
            }
            SignatureMember::Type { constraint: None } => f.write_str("type"),
            SignatureMember::Type {
                constraint: Some(ty),
            } => write!(f, "type = {ty}"),
            SignatureMember::NestedMod { required } => write!(f, "mod: {required}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSignature {
    pub name: SignatureName,
    /// The module the signature is declared in.
    pub module: ModuleId,
    pub members: BTreeMap<Ident, SignatureMember>,
}

// ============================================================================
// Composition
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveMember {
    pub member: SignatureMember,
    /// The signatures of the set that declare this member.
    pub origins: Vec<SignatureName>,
}

/// The merged member set of a [`SignatureSet`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EffectiveMembers {
    members: BTreeMap<Ident, EffectiveMember>,
}

impl EffectiveMembers {
    pub fn get(&self, name: &str) -> Option<&EffectiveMember> {
        self.members.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    /// Members in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EffectiveMember)> {
        self.members.iter().map(|(name, member)| (name.as_str(), member))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Type names the members use that no member of the set declares, like `T` in `fn f(x: vec3<T>)` composed
    /// without a `type T`.
    pub fn undeclared_type_names(&self) -> BTreeSet<Ident> {
        let mut names = BTreeSet::new();
        for member in self.members.values() {
            member.member.collect_associated(&mut names);
        }
        names.retain(|name| !self.members.contains_key(name));
        names
    }
}

/// Two signatures of one set declare the same member differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionConflict {
    pub member_name: Ident,
    /// `"<signature>: <member>"` for every declaration of the member.
    pub conflicting_defs: Vec<String>,
}

impl From<CompositionConflict> for DiagnosticKind {
    fn from(conflict: CompositionConflict) -> Self {
        DiagnosticKind::ConflictingSignatureComposition {
            member_name: conflict.member_name,
            conflicting_defs: conflict.conflicting_defs,
        }
    }
}

/// The signature set a module or alias declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredSet {
    pub set: SignatureSet,
    /// `false` when a reference did not resolve and was dropped.
    pub complete: bool,
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Debug, Default)]
pub struct SignatureRegistry {
    signatures: BTreeMap<SignatureName, ModuleSignature>,
    declared: BTreeMap<DeclId, DeclaredSet>,
    diagnostics: Vec<Diagnostic>,
}

impl SignatureRegistry {
    /// Register every signature of the tree and resolve every declared signature set.
    #[tracing::instrument(skip_all)]
    pub fn build(resolver: Resolver<'_, '_>) -> Self {
        let tree = resolver.tree();
        let mut registry = Self::default();

        for node in tree.modules() {
            for (name, sig) in node.signatures() {
                let sig_path = node.member_path().child(name);
                let associated: BTreeSet<Ident> = sig
                    .members
                    .iter()
                    .filter(|m| matches!(m.node, SigMember::Type(_)))
                    .map(|m| m.node.name().to_string())
                    .collect();
                let scope = TypeScope::Signature {
                    module: node.id,
                    associated: &associated,
                };

                let mut members = BTreeMap::new();
                for member in &sig.members {
                    let member_name = member.node.name();
                    if members.contains_key(member_name) {
                        registry.diagnostics.push(
                            Diagnostic::new(
                                sig_path.child(member_name),
                                DiagnosticKind::DuplicateMember {
                                    name: member_name.to_string(),
                                },
                            )
                            .with_span(member.span),
                        );
                        continue;
                    }
                    let canonical =
                        registry.canonical_member(resolver, &scope, &sig_path.child(member_name), &member.node, member.span);
                    members.insert(member_name.to_string(), canonical);
                }

                let qualified = SignatureName::qualified(&node.path, name);
                tracing::trace!(signature = %qualified, members = members.len(), "registered signature");
                registry.signatures.insert(
                    qualified.clone(),
                    ModuleSignature {
                        name: qualified,
                        module: node.id,
                        members,
                    },
                );
            }
        }

        for node in tree.modules() {
            for (index, decl) in node.declarations.iter().enumerate() {
                if !node.is_member(index) {
                    continue;
                }
                let signatures = match &decl.node {
                    Declaration::Module(module) => &module.signatures,
                    Declaration::Alias(alias) => &alias.signatures,
                    _ => continue,
                };
                if signatures.is_empty() {
                    continue;
                }
                let id = DeclId { module: node.id, index };
                let declared = registry.resolve_references(resolver, node.id, signatures, &tree.decl_path(id), decl.span);
                registry.declared.insert(id, declared);
            }
        }

        tracing::debug!(
            signatures = registry.signatures.len(),
            declared = registry.declared.len(),
            "built signature registry"
        );
        registry
    }

    fn canonical_member(
        &mut self,
        resolver: Resolver<'_, '_>,
        scope: &TypeScope<'_>,
        path: &MemberPath,
        member: &SigMember,
        span: Span,
    ) -> SignatureMember {
        let module = scope.module();
        match member {
            SigMember::Function(f) => SignatureMember::Function(FunctionShape::of_sig(resolver, scope, f)),
            SigMember::Const(c) => SignatureMember::Const {
                ty: resolver.type_of(scope, &c.ty),
            },
            SigMember::Override(o) => SignatureMember::Override {
                ty: resolver.type_of(scope, &o.ty),
                attributes: resolver.attributes(module, &o.attributes),
            },
            SigMember::Var(v) => SignatureMember::Var {
                address_space: v.address_space.clone(),
                access_mode: v.access_mode.clone(),
                ty: resolver.type_of(scope, &v.ty),
                attributes: resolver.attributes(module, &v.attributes),
            },
            SigMember::Type(t) => SignatureMember::Type {
                constraint: t.constraint.as_ref().map(|ty| resolver.type_of(scope, ty)),
            },
            SigMember::Module(m) => SignatureMember::NestedMod {
                required: self.resolve_references(resolver, module, &m.signatures, path, span).set,
            },
        }
    }

    fn resolve_references(
        &mut self,
        resolver: Resolver<'_, '_>,
        from: ModuleId,
        references: &[TypeSpecifier],
        path: &MemberPath,
        span: Span,
    ) -> DeclaredSet {
        let mut set = SignatureSet::new();
        let mut complete = true;
        for reference in references {
            match self.lookup(resolver, from, reference) {
                Some(name) => set.insert(name),
                None => {
                    complete = false;
                    let at = if reference.path.span.is_empty() { span } else { reference.path.span };
                    self.diagnostics.push(
                        Diagnostic::new(
                            path.clone(),
                            DiagnosticKind::UnknownSignature {
                                name: reference.path.to_string(),
                            },
                        )
                        .with_span(at),
                    );
                }
            }
        }
        DeclaredSet { set, complete }
    }

    /// Resolve a signature reference written in module `from`.
    pub fn lookup(&self, resolver: Resolver<'_, '_>, from: ModuleId, reference: &TypeSpecifier) -> Option<SignatureName> {
        let tree = resolver.tree();
        let segments = &reference.path.segments;
        let module = if let Some(name) = reference.path.as_ident() {
            tree.scope_chain(from)
                .into_iter()
                .find(|scope| tree.signature(*scope, name).is_some())?
        } else {
            let (_, prefix) = segments.split_last()?;
            match resolver.resolve_path(from, prefix) {
                PathResolution::Found(PathTarget::Module(m)) => m,
                PathResolution::Found(PathTarget::Decl(decl)) => resolver.module_behind(decl)?,
                _ => return None,
            }
        };
        let name = segments.last()?;
        tree.signature(module, name)?;
        Some(SignatureName::qualified(&tree.node(module).path, name))
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn signature(&self, name: &SignatureName) -> Option<&ModuleSignature> {
        self.signatures.get(name)
    }

    pub fn signatures(&self) -> impl Iterator<Item = &ModuleSignature> {
        self.signatures.values()
    }

    /// The signature set declared by a `module` or `alias` declaration.
    pub fn declared(&self, decl: DeclId) -> Option<&DeclaredSet> {
        self.declared.get(&decl)
    }

    /// Merge the members of every signature in `set`.
    ///
    /// ## Errors
    /// [`CompositionConflict`] for the first member name (in name order) that two signatures declare differently.
    pub fn resolve(&self, set: &SignatureSet) -> Result<EffectiveMembers, CompositionConflict> {
        let mut by_name: BTreeMap<&str, Vec<(&SignatureName, &SignatureMember)>> = BTreeMap::new();
        for sig in set.iter().filter_map(|name| self.signatures.get(name)) {
            for (member_name, member) in &sig.members {
                by_name.entry(member_name.as_str()).or_default().push((&sig.name, member));
            }
        }

        let mut members = BTreeMap::new();
        for (member_name, defs) in by_name {
            let Some(&(_, first)) = defs.first() else {
                continue;
            };
            if defs.iter().any(|(_, member)| *member != first) {
                return Err(CompositionConflict {
                    member_name: member_name.to_string(),
                    conflicting_defs: defs.iter().map(|(sig, member)| format!("{sig}: {member}")).collect(),
                });
            }
            members.insert(
                member_name.to_string(),
                EffectiveMember {
                    member: first.clone(),
                    origins: defs.iter().map(|(sig, _)| (*sig).clone()).collect(),
                },
            );
        }
        Ok(EffectiveMembers { members })
    }
}
