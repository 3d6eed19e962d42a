//! Structural conformance of modules to signature sets.
//!
//! [`check`] decides whether a module implements every member of a composed signature set. It is a pure function of
//! the frozen [`Resolver`] and [`SignatureRegistry`], so independent checks can run in any order or in parallel.
//!
//! ## Notes
//! - Diagnostics are collected, never fail-fast: every required member of every nesting level is examined.
//! - Member paths in the result are relative to the checked module; callers prefix them with the module's own path.
//! - Associated types (`type Quat;` in a signature) are bound against the source being checked before comparing, so
//!   `fn f() -> Quat` matches an implementation returning the module's own `Quat`.
//! - A type name a signature set uses without declaring it (`vec3<T>` with no `type T`) must be a type of the checked
//!   module. When it is not, that is reported once under the name and comparisons mentioning it skip the name.
//! - A nested module is compared through its exposed surface: the signature set it declares, if any, otherwise its
//!   implementation. A signature-less module alias shows what its target path reaches. Supplying more than a
//!   requirement asks for never fails a nested check.
//!
//! ## See also
//! - [`link`](super::link) for what a conforming module exposes.

use modsig_core::lang::members::MemberKind;

use crate::frontend::ast::{Declaration, Ident};
use crate::frontend::canonical::{AliasTarget, AttributeSet, CanonicalType, Resolver};
use crate::frontend::diagnostics::{Diagnostic, DiagnosticKind, MemberPath};
use crate::frontend::link::{Linker, View};
use crate::frontend::registry::{EffectiveMembers, FunctionShape, SignatureMember, SignatureRegistry, SignatureSet};
use crate::frontend::tree::{DeclId, ModuleId};

/// Found-side placeholder for a value whose type could not be inferred.
const UNINFERRED: &str = "{uninferred}";
/// Found-side placeholder for a type a declared view keeps opaque.
const OPAQUE: &str = "{opaque}";

/// Everything a check reads. Immutable and shareable across threads.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a, 'ast> {
    pub resolver: Resolver<'a, 'ast>,
    pub registry: &'a SignatureRegistry,
}

impl<'a, 'ast> Context<'a, 'ast> {
    pub fn new(resolver: Resolver<'a, 'ast>, registry: &'a SignatureRegistry) -> Self {
        Self { resolver, registry }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConformanceResult {
    Conforms,
    Fails(Vec<Diagnostic>),
}

impl ConformanceResult {
    fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        if diagnostics.is_empty() {
            ConformanceResult::Conforms
        } else {
            ConformanceResult::Fails(diagnostics)
        }
    }

    pub fn conforms(&self) -> bool {
        matches!(self, ConformanceResult::Conforms)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            ConformanceResult::Conforms => &[],
            ConformanceResult::Fails(diagnostics) => diagnostics,
        }
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        match self {
            ConformanceResult::Conforms => Vec::new(),
            ConformanceResult::Fails(diagnostics) => diagnostics,
        }
    }
}

/// Check `module` against the composed signature set `required`.
#[tracing::instrument(skip_all, fields(module = %ctx.resolver.tree().node(module).member_path(), required = %required))]
pub fn check(ctx: Context<'_, '_>, module: ModuleId, required: &SignatureSet) -> ConformanceResult {
    check_against(ctx, &Source::Module(module), required)
}

fn check_against(ctx: Context<'_, '_>, source: &Source, required: &SignatureSet) -> ConformanceResult {
    let effective = match ctx.registry.resolve(required) {
        Ok(effective) => effective,
        Err(conflict) => {
            return ConformanceResult::Fails(vec![Diagnostic::new(MemberPath::root(), conflict.into())]);
        }
    };
    let diagnostics = check_source(ctx, source, required, &effective, None);
    tracing::debug!(members = effective.len(), problems = diagnostics.len(), "checked module");
    ConformanceResult::from_diagnostics(diagnostics)
}

/// Check a `module` or `alias` declaration against the signature set it declares.
///
/// A module alias is checked against what its target path reaches, so `alias G: S = Math::Float` only conforms when
/// `Math::Float` shows everything `S` asks for.
///
/// ## Returns
/// `None` when the declaration declares no signature set.
pub fn check_declaration(ctx: Context<'_, '_>, decl: DeclId) -> Option<ConformanceResult> {
    let declared = ctx.registry.declared(decl)?;
    let tree = ctx.resolver.tree();
    let source = match &tree.decl(decl).node {
        Declaration::Module(_) => Source::Module(tree.module_of(decl)?),
        Declaration::Alias(_) => match ctx.resolver.alias_target(decl) {
            AliasTarget::Module(_) => match Source::of_view(Linker::new(ctx).alias_view(decl)) {
                Some(source) => source,
                // The target path was already rejected where it is written.
                None => return Some(ConformanceResult::Conforms),
            },
            // Already reported as an alias cycle.
            AliasTarget::Cycle => return Some(ConformanceResult::Conforms),
            AliasTarget::Type(ty) => {
                return Some(ConformanceResult::Fails(vec![Diagnostic::new(
                    MemberPath::root(),
                    DiagnosticKind::KindMismatch {
                        expected: MemberKind::Module,
                        found: format!("type `{ty}`"),
                    },
                )]));
            }
        },
        _ => return None,
    };
    Some(check_against(ctx, &source, &declared.set))
}

// ============================================================================
// Sources and candidates
// ============================================================================

/// What a check compares against: a module's implementation, or the surface a declared signature set exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Module(ModuleId),
    Declared { set: SignatureSet, effective: EffectiveMembers },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SourceKey {
    Module(ModuleId),
    Declared(SignatureSet),
}

impl Source {
    /// What a linker view compares as. `None` for a view that depends on an earlier error.
    fn of_view(view: View) -> Option<Self> {
        match view {
            View::Full(module) => Some(Source::Module(module)),
            View::Filtered { set, exposed, .. } => Some(Source::Declared {
                set,
                effective: exposed,
            }),
            View::Poisoned => None,
        }
    }

    fn key(&self) -> SourceKey {
        match self {
            Source::Module(module) => SourceKey::Module(*module),
            Source::Declared { set, .. } => SourceKey::Declared(set.clone()),
        }
    }
}

/// The recursion path of nested checks. A pair already on it is assumed to conform.
struct Frame<'p> {
    key: SourceKey,
    required: &'p SignatureSet,
    parent: Option<&'p Frame<'p>>,
}

impl Frame<'_> {
    fn contains(&self, key: &SourceKey, required: &SignatureSet) -> bool {
        let mut frame = Some(self);
        while let Some(current) = frame {
            if current.key == *key && current.required == required {
                return true;
            }
            frame = current.parent;
        }
        false
    }
}

/// What a source provides under a required member's name.
enum Candidate {
    Function(FunctionShape),
    Value {
        kind: MemberKind,
        /// `None` when the declaration has no annotation and its initializer could not be inferred.
        ty: Option<CanonicalType>,
        attributes: AttributeSet,
        address_space: Option<Ident>,
        access_mode: Option<Ident>,
    },
    /// `None` is a type the source keeps opaque.
    Type { definition: Option<CanonicalType> },
    Module(Source),
    /// Depends on something already reported (an alias cycle, an unknown or conflicting signature set).
    Poisoned,
}

impl Candidate {
    fn value(kind: MemberKind, ty: Option<CanonicalType>, attributes: AttributeSet) -> Self {
        Candidate::Value {
            kind,
            ty,
            attributes,
            address_space: None,
            access_mode: None,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Candidate::Function(_) => MemberKind::Function.describe(),
            Candidate::Value { kind, .. } => kind.describe(),
            Candidate::Type { .. } => MemberKind::Type.describe(),
            Candidate::Module(_) => MemberKind::Module.describe(),
            Candidate::Poisoned => "an invalid declaration",
        }
    }
}

fn module_candidate(ctx: Context<'_, '_>, decl: DeclId) -> Candidate {
    let resolver = ctx.resolver;
    let tree = resolver.tree();
    let module = decl.module;
    match &tree.decl(decl).node {
        Declaration::Function(function) => Candidate::Function(FunctionShape::of_decl(resolver, module, function)),
        Declaration::Const(_) => Candidate::value(MemberKind::Const, resolver.value_type(decl), AttributeSet::default()),
        Declaration::Override(o) => Candidate::value(
            MemberKind::Override,
            resolver.value_type(decl),
            resolver.attributes(module, &o.attributes),
        ),
        Declaration::Var(v) => Candidate::Value {
            kind: MemberKind::Var,
            ty: resolver.value_type(decl),
            attributes: resolver.attributes(module, &v.attributes),
            address_space: v.address_space.clone(),
            access_mode: v.access_mode.clone(),
        },
        Declaration::Struct(_) => Candidate::Type {
            definition: Some(CanonicalType::Struct(tree.decl_path(decl).segments().to_vec())),
        },
        Declaration::Alias(_) => match resolver.alias_target(decl) {
            AliasTarget::Type(ty) => Candidate::Type { definition: Some(ty) },
            AliasTarget::Module(_) => exposed_surface(ctx, decl),
            AliasTarget::Cycle => Candidate::Poisoned,
        },
        Declaration::Module(_) => exposed_surface(ctx, decl),
        Declaration::ModuleSig(_) | Declaration::ConstAssert(_) => Candidate::Poisoned,
    }
}

/// The surface a nested `module` or module `alias` declaration shows to its parent's signature.
fn exposed_surface(ctx: Context<'_, '_>, decl: DeclId) -> Candidate {
    let tree = ctx.resolver.tree();
    if let Some(declared) = ctx.registry.declared(decl) {
        if !declared.complete {
            return Candidate::Poisoned;
        }
        return match ctx.registry.resolve(&declared.set) {
            Ok(effective) => Candidate::Module(Source::Declared {
                set: declared.set.clone(),
                effective,
            }),
            Err(_) => Candidate::Poisoned,
        };
    }
    match &tree.decl(decl).node {
        Declaration::Module(_) => match tree.module_of(decl) {
            Some(module) => Candidate::Module(Source::Module(module)),
            None => Candidate::Poisoned,
        },
        Declaration::Alias(_) => match ctx.resolver.alias_target(decl) {
            AliasTarget::Module(_) => match Source::of_view(Linker::new(ctx).alias_view(decl)) {
                Some(source) => Candidate::Module(source),
                None => Candidate::Poisoned,
            },
            AliasTarget::Type(ty) => Candidate::Type { definition: Some(ty) },
            AliasTarget::Cycle => Candidate::Poisoned,
        },
        _ => Candidate::Poisoned,
    }
}

fn declared_candidate(ctx: Context<'_, '_>, member: &SignatureMember) -> Candidate {
    match member {
        SignatureMember::Function(shape) => Candidate::Function(shape.clone()),
        SignatureMember::Const { ty } => Candidate::value(MemberKind::Const, Some(ty.clone()), AttributeSet::default()),
        SignatureMember::Override { ty, attributes } => {
            Candidate::value(MemberKind::Override, Some(ty.clone()), attributes.clone())
        }
        SignatureMember::Var {
            address_space,
            access_mode,
            ty,
            attributes,
        } => Candidate::Value {
            kind: MemberKind::Var,
            ty: Some(ty.clone()),
            attributes: attributes.clone(),
            address_space: address_space.clone(),
            access_mode: access_mode.clone(),
        },
        SignatureMember::Type { constraint } => Candidate::Type {
            definition: constraint.clone(),
        },
        SignatureMember::NestedMod { required } => match ctx.registry.resolve(required) {
            Ok(effective) => Candidate::Module(Source::Declared {
                set: required.clone(),
                effective,
            }),
            Err(_) => Candidate::Poisoned,
        },
    }
}

// ============================================================================
// Checking
// ============================================================================

fn check_source(
    ctx: Context<'_, '_>,
    source: &Source,
    required: &SignatureSet,
    effective: &EffectiveMembers,
    parent: Option<&Frame<'_>>,
) -> Vec<Diagnostic> {
    let key = source.key();
    if parent.is_some_and(|frame| frame.contains(&key, required)) {
        tracing::trace!(?key, %required, "already on the check path; assumed to conform");
        return Vec::new();
    }
    let frame = Frame { key, required, parent };
    let mut checker = Checker {
        ctx,
        source,
        frame: &frame,
        diagnostics: Vec::new(),
    };
    checker.undeclared_types(effective);
    for (name, member) in effective.iter() {
        checker.member(name, &member.member);
    }
    checker.diagnostics
}

struct Checker<'c, 'a, 'ast> {
    ctx: Context<'a, 'ast>,
    source: &'c Source,
    frame: &'c Frame<'c>,
    diagnostics: Vec<Diagnostic>,
}

impl Checker<'_, '_, '_> {
    fn member(&mut self, name: &str, required: &SignatureMember) {
        let path = MemberPath::from_name(name);
        let Some(candidate) = self.candidate(name) else {
            tracing::trace!(member = name, "missing");
            self.report(&path, DiagnosticKind::MissingMember { kind: required.kind() });
            return;
        };

        match (required, candidate) {
            (_, Candidate::Poisoned) => {}
            (SignatureMember::Function(expected), Candidate::Function(found)) => {
                self.function(&path, expected, &found);
            }
            (
                SignatureMember::Const { ty },
                Candidate::Value {
                    kind: MemberKind::Const,
                    ty: found,
                    ..
                },
            ) => self.value_type(&path, ty, found.as_ref()),
            (
                SignatureMember::Override { ty, attributes },
                Candidate::Value {
                    kind: MemberKind::Override,
                    ty: found,
                    attributes: found_attributes,
                    ..
                },
            ) => {
                self.value_type(&path, ty, found.as_ref());
                self.attributes(&path, "declaration", attributes, &found_attributes);
            }
            (
                SignatureMember::Var {
                    address_space,
                    access_mode,
                    ty,
                    attributes,
                },
                Candidate::Value {
                    kind: MemberKind::Var,
                    ty: found,
                    attributes: found_attributes,
                    address_space: found_space,
                    access_mode: found_mode,
                },
            ) => {
                self.value_type(&path, ty, found.as_ref());
                self.qualifier(&path, "address space", address_space.as_deref(), found_space.as_deref());
                self.qualifier(&path, "access mode", access_mode.as_deref(), found_mode.as_deref());
                self.attributes(&path, "declaration", attributes, &found_attributes);
            }
            (SignatureMember::Type { constraint }, Candidate::Type { definition }) => {
                self.type_member(&path, constraint.as_ref(), definition.as_ref());
            }
            (SignatureMember::NestedMod { required }, Candidate::Module(source)) => {
                self.nested(&path, required, &source);
            }
            (required, candidate) => {
                self.report(
                    &path,
                    DiagnosticKind::KindMismatch {
                        expected: required.kind(),
                        found: candidate.describe().to_string(),
                    },
                );
            }
        }
    }

    /// Type names the set uses without declaring must be types of the checked module.
    ///
    /// A declared surface leaves them symbolic: both sides of a comparison come from signatures, so the same name is
    /// the same type.
    fn undeclared_types(&mut self, effective: &EffectiveMembers) {
        let Source::Module(module) = self.source else {
            return;
        };
        let tree = self.ctx.resolver.tree();
        for name in effective.undeclared_type_names() {
            let path = MemberPath::from_name(&name);
            let Some(decl) = tree.member(*module, &name) else {
                tracing::trace!(member = %name, "undeclared associated type missing");
                self.report(&path, DiagnosticKind::MissingMember { kind: MemberKind::Type });
                continue;
            };
            match module_candidate(self.ctx, decl) {
                Candidate::Type { .. } | Candidate::Poisoned => {}
                other => self.report(
                    &path,
                    DiagnosticKind::KindMismatch {
                        expected: MemberKind::Type,
                        found: other.describe().to_string(),
                    },
                ),
            }
        }
    }

    fn candidate(&self, name: &str) -> Option<Candidate> {
        match self.source {
            Source::Module(module) => {
                let decl = self.ctx.resolver.tree().member(*module, name)?;
                Some(module_candidate(self.ctx, decl))
            }
            Source::Declared { effective, .. } => {
                let member = effective.get(name)?;
                Some(declared_candidate(self.ctx, &member.member))
            }
        }
    }

    /// What an associated type name stands for in this source. `None` leaves the name symbolic.
    fn binding(&self, name: &str) -> Option<CanonicalType> {
        match self.source {
            Source::Module(module) => {
                let tree = self.ctx.resolver.tree();
                let decl = tree.member(*module, name)?;
                match &tree.decl(decl).node {
                    Declaration::Struct(_) => Some(CanonicalType::Struct(tree.decl_path(decl).segments().to_vec())),
                    Declaration::Alias(_) => match self.ctx.resolver.alias_target(decl) {
                        AliasTarget::Type(ty) => Some(ty),
                        _ => None,
                    },
                    _ => None,
                }
            }
            Source::Declared { effective, .. } => match effective.get(name).map(|m| &m.member) {
                Some(SignatureMember::Type { constraint: Some(ty) }) => Some(ty.clone()),
                _ => None,
            },
        }
    }

    fn bound(&self, ty: &CanonicalType) -> CanonicalType {
        ty.substitute(&mut |name| self.binding(name))
    }

    /// The form of a bound type that is compared. A name a module leaves unbound was already reported, so it matches
    /// anything there.
    fn comparable(&self, ty: &CanonicalType) -> CanonicalType {
        match self.source {
            Source::Module(_) => ty.substitute(&mut |_| Some(CanonicalType::Unknown)),
            Source::Declared { .. } => ty.clone(),
        }
    }

    fn report(&mut self, path: &MemberPath, kind: DiagnosticKind) {
        let mut diagnostic = Diagnostic::new(path.clone(), kind);
        if let Source::Module(module) = self.source {
            let tree = self.ctx.resolver.tree();
            if let Some(decl) = path.segments().first().and_then(|name| tree.member(*module, name)) {
                diagnostic = diagnostic.with_span(tree.decl(decl).span);
            }
        }
        self.diagnostics.push(diagnostic);
    }

    fn compare_types(&mut self, path: &MemberPath, what: &str, expected: &CanonicalType, found: &CanonicalType) {
        let expected = self.bound(expected);
        let found = self.bound(found);
        // An unknown part stands for an error reported elsewhere.
        if expected.contains_unknown() || found.contains_unknown() {
            return;
        }
        if !self.comparable(&expected).matches(&self.comparable(&found)) {
            self.report(
                path,
                DiagnosticKind::TypeMismatch {
                    what: what.to_string(),
                    expected: expected.to_string(),
                    found: found.to_string(),
                },
            );
        }
    }

    fn value_type(&mut self, path: &MemberPath, expected: &CanonicalType, found: Option<&CanonicalType>) {
        match found {
            Some(found) => self.compare_types(path, "type", expected, found),
            None => {
                let expected = self.bound(expected);
                if expected.contains_unknown() {
                    return;
                }
                self.report(
                    path,
                    DiagnosticKind::TypeMismatch {
                        what: "type".to_string(),
                        expected: expected.to_string(),
                        found: UNINFERRED.to_string(),
                    },
                );
            }
        }
    }

    fn attributes(&mut self, path: &MemberPath, what: &str, expected: &AttributeSet, found: &AttributeSet) {
        if expected != found {
            self.report(
                path,
                DiagnosticKind::AttributeMismatch {
                    what: what.to_string(),
                    expected: expected.to_string(),
                    found: found.to_string(),
                },
            );
        }
    }

    /// Address space or access mode: compared only when the signature names one.
    fn qualifier(&mut self, path: &MemberPath, what: &str, expected: Option<&str>, found: Option<&str>) {
        let Some(expected) = expected else {
            return;
        };
        if found != Some(expected) {
            self.report(
                path,
                DiagnosticKind::TypeMismatch {
                    what: what.to_string(),
                    expected: expected.to_string(),
                    found: found.unwrap_or("none").to_string(),
                },
            );
        }
    }

    fn function(&mut self, path: &MemberPath, expected: &FunctionShape, found: &FunctionShape) {
        if expected.params.len() != found.params.len() {
            self.report(
                path,
                DiagnosticKind::TypeMismatch {
                    what: "parameter count".to_string(),
                    expected: expected.params.len().to_string(),
                    found: found.params.len().to_string(),
                },
            );
        } else {
            for (index, (e, f)) in expected.params.iter().zip(&found.params).enumerate() {
                let position = index + 1;
                self.compare_types(path, &format!("parameter {position} type"), &e.ty, &f.ty);
                self.attributes(path, &format!("parameter {position}"), &e.attributes, &f.attributes);
            }
        }

        match (&expected.return_type, &found.return_type) {
            (Some(e), Some(f)) => self.compare_types(path, "return type", e, f),
            (None, None) => {}
            (e, f) => {
                let e = e.as_ref().map(|ty| self.bound(ty));
                let f = f.as_ref().map(|ty| self.bound(ty));
                if e.iter().chain(&f).any(CanonicalType::contains_unknown) {
                    return;
                }
                let show = |ty: Option<CanonicalType>| ty.map_or_else(|| "nothing".to_string(), |ty| ty.to_string());
                let kind = DiagnosticKind::TypeMismatch {
                    what: "return type".to_string(),
                    expected: show(e),
                    found: show(f),
                };
                self.report(path, kind);
            }
        }

        self.attributes(path, "function", &expected.attributes, &found.attributes);
        self.attributes(path, "return value", &expected.return_attributes, &found.return_attributes);
    }

    fn type_member(&mut self, path: &MemberPath, constraint: Option<&CanonicalType>, definition: Option<&CanonicalType>) {
        // Opaque requirements only need the type to exist.
        let Some(constraint) = constraint else {
            return;
        };
        match definition {
            Some(definition) => self.compare_types(path, "type", constraint, definition),
            None => {
                let expected = self.bound(constraint);
                if expected.contains_unknown() {
                    return;
                }
                self.report(
                    path,
                    DiagnosticKind::TypeMismatch {
                        what: "type".to_string(),
                        expected: expected.to_string(),
                        found: OPAQUE.to_string(),
                    },
                );
            }
        }
    }

    fn nested(&mut self, path: &MemberPath, required: &SignatureSet, source: &Source) {
        let effective = match self.ctx.registry.resolve(required) {
            Ok(effective) => effective,
            Err(conflict) => {
                self.report(path, conflict.into());
                return;
            }
        };
        let nested = check_source(self.ctx, source, required, &effective, Some(self.frame));
        if !nested.is_empty() {
            tracing::trace!(member = %path, problems = nested.len(), "nested module does not conform");
            self.report(
                path,
                DiagnosticKind::NestedConformanceFailure {
                    nested: nested.iter().map(|d| d.prefixed(path)).collect(),
                },
            );
        }
    }
}

#[cfg(test)]
mod tests;
