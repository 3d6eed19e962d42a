//! Visibility resolution and linking.
//!
//! The linker decides what each module shows to the rest of the program and produces the linked surface: every
//! `mod sig` removed, every signature-constrained module reduced to the members its signature set names. It also
//! re-resolves every qualified path of the program against those reduced surfaces, rejecting paths that reach past
//! what a signature exposes.
//!
//! ## Notes
//! - Visibility is lexical. A module on the accessing scope's own chain is always seen in full, so a module can use
//!   its private helpers; everyone else sees it through its declared signature set, if it has one.
//! - An alias that declares a signature set is always seen through that set. A signature-less alias is seen through
//!   the view its target path reaches, walked from the alias's own module: `alias G = Math::Float` shows what
//!   `Math::Float` shows, not everything of the module behind it.
//! - Through a filtered view, a `mod` requirement narrows the nested module to the requirement's own signature set.
//! - A linked block shows only the members every filter on its way exposes: the `mod` requirement it stands under, its
//!   own declared set, and the view its target path reaches when it is an alias.
//! - Anything that depends on an earlier error (an alias cycle, an unknown or conflicting signature set) is
//!   [`View::Poisoned`]: further segments are accepted silently.
//!
//! ## See also
//! - [`conformance`](super::conformance) for the checks that make a filtered surface trustworthy.

mod emit;
mod refs;

#[cfg(test)]
mod tests;

pub use emit::render;

use crate::frontend::ast::{Declaration, Ident};
use crate::frontend::canonical::AliasTarget;
use crate::frontend::conformance::Context;
use crate::frontend::diagnostics::{AccessReason, Diagnostic, DiagnosticKind};
use crate::frontend::registry::{DeclaredSet, EffectiveMembers, SignatureMember, SignatureSet};
use crate::frontend::tree::{Anchored, DeclId, ModuleId};

use refs::PathCollector;

/// What an accessor sees of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Every direct member.
    Full(ModuleId),
    /// Exactly the members of a composed signature set, implemented by `implementation`.
    Filtered {
        implementation: ModuleId,
        /// The set `exposed` is composed from.
        set: SignatureSet,
        exposed: EffectiveMembers,
    },
    Poisoned,
}

/// Where and why a qualified path was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessFailure {
    /// Index of the offending segment.
    pub segment: usize,
    pub reason: AccessReason,
}

impl AccessFailure {
    fn new(segment: usize, reason: AccessReason) -> Self {
        Self { segment, reason }
    }
}

// ============================================================================
// Linked output
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LinkedUnit<'ast> {
    pub root: LinkedModule<'ast>,
}

/// A module block of the linked output. The root has an empty name.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedModule<'ast> {
    pub name: Ident,
    pub members: Vec<LinkedMember<'ast>>,
}

impl<'ast> LinkedModule<'ast> {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: Vec::new(),
        }
    }

    /// Find a direct member by name (declarations, opaque types and module blocks alike).
    pub fn member(&self, name: &str) -> Option<&LinkedMember<'ast>> {
        self.members.iter().find(|member| member.name() == Some(name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkedMember<'ast> {
    /// A declaration emitted as written (signature annotations are dropped when printing).
    Declaration(&'ast Declaration),
    /// A type a signature keeps opaque: only its name survives.
    OpaqueType(Ident),
    Module(LinkedModule<'ast>),
}

impl LinkedMember<'_> {
    pub fn name(&self) -> Option<&str> {
        match self {
            LinkedMember::Declaration(decl) => decl.name(),
            LinkedMember::OpaqueType(name) => Some(name),
            LinkedMember::Module(module) => Some(&module.name),
        }
    }
}

/// The linked surface together with every rejected qualified access.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkOutcome<'ast> {
    pub linked: LinkedUnit<'ast>,
    pub violations: Vec<Diagnostic>,
}

// ============================================================================
// Linker
// ============================================================================

/// Read-only visibility queries and the linking pass over a checked program.
#[derive(Debug, Clone, Copy)]
pub struct Linker<'a, 'ast> {
    ctx: Context<'a, 'ast>,
}

/// Modules on the current filtered-emission path, with the sets they are filtered by.
type EmitGuard = Vec<(ModuleId, Vec<SignatureSet>)>;

impl<'a, 'ast> Linker<'a, 'ast> {
    pub fn new(ctx: Context<'a, 'ast>) -> Self {
        Self { ctx }
    }

    /// Validate every access and build the linked surface.
    pub fn run(&self) -> LinkOutcome<'ast> {
        LinkOutcome {
            violations: self.validate_accesses(),
            linked: self.link(),
        }
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// The view `from` has of `module`.
    pub fn view_of_module(&self, from: ModuleId, module: ModuleId) -> View {
        let tree = self.ctx.resolver.tree();
        if tree.encloses(module, from) {
            return View::Full(module);
        }
        match tree.node(module).decl_id.and_then(|decl| self.ctx.registry.declared(decl)) {
            Some(declared) => self.declared_view(module, declared),
            None => View::Full(module),
        }
    }

    /// The view `from` has through a member declaration. `None` when the declaration is not module-like.
    pub fn view_of_decl(&self, from: ModuleId, decl: DeclId) -> Option<View> {
        let tree = self.ctx.resolver.tree();
        match &tree.decl(decl).node {
            Declaration::Module(_) => tree.module_of(decl).map(|module| self.view_of_module(from, module)),
            Declaration::Alias(_) => match self.ctx.resolver.alias_target(decl) {
                AliasTarget::Module(target) => Some(match self.ctx.registry.declared(decl) {
                    Some(declared) => self.declared_view(target, declared),
                    None => self.alias_view(decl),
                }),
                AliasTarget::Cycle => Some(View::Poisoned),
                AliasTarget::Type(_) => None,
            },
            _ => None,
        }
    }

    /// The view the target path of a module alias reaches, walked from the module the alias is declared in.
    pub fn alias_view(&self, decl: DeclId) -> View {
        let tree = self.ctx.resolver.tree();
        let Declaration::Alias(alias) = &tree.decl(decl).node else {
            return View::Poisoned;
        };
        match self.walk(decl.module, &alias.target.path.segments) {
            Ok(Some(view)) => view,
            // A rejected target is reported where the alias is written.
            Ok(None) | Err(_) => View::Poisoned,
        }
    }

    fn declared_view(&self, module: ModuleId, declared: &DeclaredSet) -> View {
        if !declared.complete {
            return View::Poisoned;
        }
        self.filtered(module, &declared.set)
    }

    fn filtered(&self, module: ModuleId, set: &SignatureSet) -> View {
        match self.ctx.registry.resolve(set) {
            Ok(exposed) => View::Filtered {
                implementation: module,
                set: set.clone(),
                exposed,
            },
            Err(_) => View::Poisoned,
        }
    }

    /// The member `name` of `module`, narrowed to a `mod` requirement's set.
    fn nested_view(&self, module: ModuleId, name: &str, required: &SignatureSet) -> View {
        let tree = self.ctx.resolver.tree();
        match tree
            .member(module, name)
            .and_then(|decl| self.ctx.resolver.module_behind(decl))
        {
            Some(nested) => self.filtered(nested, required),
            None => View::Poisoned,
        }
    }

    // ========================================================================
    // Access validation
    // ========================================================================

    /// Re-resolve a path written in `from` segment by segment against the views it passes through.
    ///
    /// ## Returns
    /// `None` when the path is allowed, refers to something outside the tree, or depends on an earlier error.
    pub fn check_access(&self, from: ModuleId, segments: &[String]) -> Option<AccessFailure> {
        self.walk(from, segments).err()
    }

    /// Follow `segments` from `from` through the views they pass.
    ///
    /// ## Returns
    /// The view the last segment reaches, or `None` when it is not module-like or lies outside the tree.
    fn walk(&self, from: ModuleId, segments: &[String]) -> Result<Option<View>, AccessFailure> {
        let tree = self.ctx.resolver.tree();
        let (mut view, start) = match tree.resolve_anchor(from, segments) {
            Anchored::PastRoot => return Err(AccessFailure::new(0, AccessReason::SuperAtRoot)),
            Anchored::At { module, consumed } => (self.view_of_module(from, module), consumed),
            Anchored::Unanchored => {
                // An unresolved first segment is an ordinary import.
                let Some(decl) = segments.first().and_then(|first| tree.lookup_lexical(from, first)) else {
                    return Ok(None);
                };
                match self.view_of_decl(from, decl) {
                    Some(view) => (view, 1),
                    None if segments.len() == 1 => return Ok(None),
                    None => return Err(AccessFailure::new(0, AccessReason::NotAModule)),
                }
            }
        };

        for (offset, segment) in segments[start..].iter().enumerate() {
            let index = start + offset;
            let next = match &view {
                View::Poisoned => break,
                View::Full(module) => {
                    let Some(decl) = tree.member(*module, segment) else {
                        return Err(AccessFailure::new(index, AccessReason::NotFound));
                    };
                    self.view_of_decl(from, decl)
                }
                View::Filtered {
                    implementation,
                    exposed,
                    ..
                } => {
                    let Some(member) = exposed.get(segment) else {
                        return Err(AccessFailure::new(index, AccessReason::NotExposed));
                    };
                    match &member.member {
                        SignatureMember::NestedMod { required } => {
                            Some(self.nested_view(*implementation, segment, required))
                        }
                        _ => None,
                    }
                }
            };
            match next {
                Some(next) => view = next,
                None if index + 1 == segments.len() => return Ok(None),
                None => return Err(AccessFailure::new(index, AccessReason::NotAModule)),
            }
        }
        Ok(Some(view))
    }

    /// Check every qualified path written anywhere in the program.
    #[tracing::instrument(skip_all)]
    pub fn validate_accesses(&self) -> Vec<Diagnostic> {
        let tree = self.ctx.resolver.tree();
        let mut diagnostics = Vec::new();
        let mut checked = 0usize;
        for node in tree.modules() {
            for (index, spanned) in node.declarations.iter().enumerate() {
                let owner = DeclId { module: node.id, index };
                let mut collector = PathCollector::default();
                collector.declaration(&spanned.node);
                for path in collector.paths.into_iter().filter(|path| path.is_qualified()) {
                    checked += 1;
                    let Some(failure) = self.check_access(node.id, &path.segments) else {
                        continue;
                    };
                    tracing::trace!(access = %path, reason = %failure.reason, "rejected access");
                    let span = if path.span.is_empty() { spanned.span } else { path.span };
                    diagnostics.push(
                        Diagnostic::new(
                            tree.decl_path(owner),
                            DiagnosticKind::CheckedAccessViolation {
                                access: path.to_string(),
                                segment: path.segments.get(failure.segment).cloned().unwrap_or_default(),
                                reason: failure.reason,
                            },
                        )
                        .with_span(span),
                    );
                }
            }
        }
        tracing::debug!(checked, violations = diagnostics.len(), "validated qualified accesses");
        diagnostics
    }

    // ========================================================================
    // Linking
    // ========================================================================

    /// Build the linked surface: the root in full, signature-constrained modules filtered, `mod sig` removed.
    #[tracing::instrument(skip_all)]
    pub fn link(&self) -> LinkedUnit<'ast> {
        let mut guard = EmitGuard::new();
        let root = LinkedModule {
            name: String::new(),
            members: self.full_members(ModuleId::ROOT, &mut guard),
        };
        tracing::debug!(members = root.members.len(), "linked package root");
        LinkedUnit { root }
    }

    fn full_members(&self, module: ModuleId, guard: &mut EmitGuard) -> Vec<LinkedMember<'ast>> {
        let tree = self.ctx.resolver.tree();
        let node = tree.node(module);
        let declarations = node.declarations;
        let mut members = Vec::new();
        for (index, spanned) in declarations.iter().enumerate() {
            let decl = DeclId { module, index };
            let declared = self.ctx.registry.declared(decl).is_some();
            match &spanned.node {
                Declaration::ModuleSig(_) => {}
                Declaration::ConstAssert(_) => members.push(LinkedMember::Declaration(&spanned.node)),
                _ if !node.is_member(index) => {}
                Declaration::Module(m) => {
                    let Some(child) = tree.module_of(decl) else {
                        continue;
                    };
                    let linked = if declared {
                        self.declared_block(&m.name, decl, guard)
                    } else {
                        LinkedModule {
                            name: m.name.clone(),
                            members: self.full_members(child, guard),
                        }
                    };
                    members.push(LinkedMember::Module(linked));
                }
                Declaration::Alias(alias)
                    if declared && matches!(self.ctx.resolver.alias_target(decl), AliasTarget::Module(_)) =>
                {
                    members.push(LinkedMember::Module(self.declared_block(&alias.name, decl, guard)));
                }
                other => members.push(LinkedMember::Declaration(other)),
            }
        }
        members
    }

    /// A `module` or module `alias` declaration with a declared signature set, emitted through its own view.
    fn declared_block(&self, name: &str, decl: DeclId, guard: &mut EmitGuard) -> LinkedModule<'ast> {
        match self.surface_of(decl) {
            Some((module, filters)) => self.filtered_by_sets(name, module, &filters, guard),
            None => LinkedModule::empty(name),
        }
    }

    /// The module behind a member declaration and the sets its own view filters it by.
    ///
    /// ## Returns
    /// `None` when the declaration is not module-like or its view depends on an earlier error.
    fn surface_of(&self, decl: DeclId) -> Option<(ModuleId, Vec<SignatureSet>)> {
        let tree = self.ctx.resolver.tree();
        let (module, mut filters) = match &tree.decl(decl).node {
            Declaration::Module(_) => (tree.module_of(decl)?, Vec::new()),
            Declaration::Alias(_) => match self.ctx.resolver.alias_target(decl) {
                AliasTarget::Module(_) => match self.alias_view(decl) {
                    View::Full(module) => (module, Vec::new()),
                    View::Filtered { implementation, set, .. } => (implementation, vec![set]),
                    View::Poisoned => return None,
                },
                AliasTarget::Type(_) | AliasTarget::Cycle => return None,
            },
            _ => return None,
        };
        if let Some(declared) = self.ctx.registry.declared(decl) {
            if !declared.complete {
                return None;
            }
            filters.push(declared.set.clone());
        }
        Some((module, filters))
    }

    /// Emit the members of `module` that every set of `filters` exposes, in source order.
    ///
    /// Exposed functions keep their bodies as written, calls to filtered-out members included. Filtering decides which
    /// names other modules reach and never rewrites an exposed body.
    fn filtered_by_sets(
        &self,
        name: &str,
        module: ModuleId,
        filters: &[SignatureSet],
        guard: &mut EmitGuard,
    ) -> LinkedModule<'ast> {
        let mut linked = LinkedModule::empty(name);
        let key = (module, filters.to_vec());
        if guard.contains(&key) {
            return linked;
        }
        let Ok(exposed) = filters
            .iter()
            .map(|set| self.ctx.registry.resolve(set))
            .collect::<Result<Vec<_>, _>>()
        else {
            return linked;
        };
        guard.push(key);

        let tree = self.ctx.resolver.tree();
        let node = tree.node(module);
        let declarations = node.declarations;
        for (index, spanned) in declarations.iter().enumerate() {
            if !node.is_member(index) {
                continue;
            }
            let Some(member_name) = spanned.node.name() else {
                continue;
            };
            let Some(required) = exposed
                .iter()
                .map(|members| members.get(member_name).map(|m| &m.member))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };

            if required
                .iter()
                .any(|member| matches!(member, SignatureMember::Type { constraint: None }))
            {
                linked.members.push(LinkedMember::OpaqueType(member_name.to_string()));
            } else if required
                .iter()
                .all(|member| matches!(member, SignatureMember::NestedMod { .. }))
            {
                let Some((target, own)) = self.surface_of(DeclId { module, index }) else {
                    continue;
                };
                let mut nested: Vec<SignatureSet> = required
                    .iter()
                    .filter_map(|member| match member {
                        SignatureMember::NestedMod { required } => Some(required.clone()),
                        _ => None,
                    })
                    .collect();
                for set in own {
                    if !nested.contains(&set) {
                        nested.push(set);
                    }
                }
                let block = self.filtered_by_sets(member_name, target, &nested, guard);
                linked.members.push(LinkedMember::Module(block));
            } else {
                // A module standing where a non-module is required was already reported.
                match &spanned.node {
                    Declaration::Module(_) => {}
                    other => linked.members.push(LinkedMember::Declaration(other)),
                }
            }
        }

        guard.pop();
        linked
    }
}
