//! The module tree of a translation unit.
//!
//! Modules are stored in an arena and indexed by child name under each parent. There are no parent back-references:
//! the enclosing scopes of a module are recovered by walking its path down from the root.
//!
//! ## Notes
//! - Arena order is pre-order (a parent always precedes its children), and iteration follows it.
//! - Every declaration except `mod sig` and `const_assert` is a *member* of its module. Signatures live in their own
//!   table.
//! - Duplicate names keep the first declaration and report a `DuplicateMember` diagnostic for each later one.

use std::collections::BTreeMap;

use modsig_core::lang::paths::{self, PathAnchor};

use crate::frontend::ast::{Declaration, ModuleDecl, ModuleSigDecl, Span, Spanned, TranslationUnit};
use crate::frontend::diagnostics::{Diagnostic, DiagnosticKind, MemberPath};

/// Arena index of a module. The package root is always `ModuleId::ROOT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub usize);

impl ModuleId {
    pub const ROOT: ModuleId = ModuleId(0);
}

/// Where an anchored path starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchored {
    Unanchored,
    /// Resolution continues in `module` after `consumed` anchor segments.
    At { module: ModuleId, consumed: usize },
    /// `super` walked past the package root.
    PastRoot,
}

/// A declaration, identified by its module and its index in that module's declaration list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId {
    pub module: ModuleId,
    pub index: usize,
}

#[derive(Debug)]
pub struct ModuleNode<'ast> {
    pub id: ModuleId,
    /// Segments from the root; empty for the root.
    pub path: Vec<&'ast str>,
    /// The declaration that introduced this module (`None` for the root).
    pub decl_id: Option<DeclId>,
    pub decl: Option<&'ast ModuleDecl>,
    pub declarations: &'ast [Spanned<Declaration>],
    members: BTreeMap<&'ast str, usize>,
    signatures: BTreeMap<&'ast str, usize>,
    children: BTreeMap<&'ast str, ModuleId>,
}

impl<'ast> ModuleNode<'ast> {
    pub fn name(&self) -> &'ast str {
        self.path.last().copied().unwrap_or("")
    }

    /// Signatures declared after `->`, if any.
    pub fn declared_signatures(&self) -> bool {
        self.decl.is_some_and(|d| !d.signatures.is_empty())
    }

    pub fn member_path(&self) -> MemberPath {
        MemberPath::new(self.path.iter().map(|s| s.to_string()).collect())
    }

    /// Member names with their declaration index, in name order.
    pub fn members(&self) -> impl Iterator<Item = (&'ast str, usize)> + '_ {
        self.members.iter().map(|(name, index)| (*name, *index))
    }

    pub fn signatures(&self) -> impl Iterator<Item = (&'ast str, &'ast ModuleSigDecl)> + '_ {
        self.signatures.iter().filter_map(|(name, index)| match &self.declarations[*index].node {
            Declaration::ModuleSig(sig) => Some((*name, sig)),
            _ => None,
        })
    }

    /// Whether `index` is the declaration that owns its name (not a later duplicate).
    pub fn is_member(&self, index: usize) -> bool {
        self.declarations[index]
            .node
            .name()
            .is_some_and(|name| self.members.get(name) == Some(&index))
    }
}

#[derive(Debug)]
pub struct ModuleTree<'ast> {
    nodes: Vec<ModuleNode<'ast>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'ast> ModuleTree<'ast> {
    #[tracing::instrument(skip_all)]
    pub fn build(unit: &'ast TranslationUnit) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            diagnostics: Vec::new(),
        };
        tree.add_module(Vec::new(), None, None, &unit.declarations);
        tracing::debug!(modules = tree.nodes.len(), "built module tree");
        tree
    }

    fn add_module(
        &mut self,
        path: Vec<&'ast str>,
        decl_id: Option<DeclId>,
        decl: Option<&'ast ModuleDecl>,
        declarations: &'ast [Spanned<Declaration>],
    ) -> ModuleId {
        let id = ModuleId(self.nodes.len());
        let mut members = BTreeMap::new();
        let mut signatures = BTreeMap::new();

        for (index, spanned) in declarations.iter().enumerate() {
            let table = match &spanned.node {
                Declaration::ModuleSig(_) => &mut signatures,
                Declaration::ConstAssert(_) => continue,
                _ => &mut members,
            };
            let Some(name) = spanned.node.name() else {
                continue;
            };
            if table.contains_key(name) {
                self.diagnostics.push(duplicate(&path, name, spanned.span));
            } else {
                table.insert(name, index);
            }
        }

        self.nodes.push(ModuleNode {
            id,
            path: path.clone(),
            decl_id,
            decl,
            declarations,
            members,
            signatures,
            children: BTreeMap::new(),
        });

        // Children are added after the parent so arena order stays pre-order.
        for (index, spanned) in declarations.iter().enumerate() {
            let Declaration::Module(module) = &spanned.node else {
                continue;
            };
            if !self.nodes[id.0].is_member(index) {
                continue;
            }
            let mut child_path = path.clone();
            child_path.push(module.name.as_str());
            let child = self.add_module(
                child_path,
                Some(DeclId { module: id, index }),
                Some(module),
                &module.declarations,
            );
            self.nodes[id.0].children.insert(module.name.as_str(), child);
        }
        id
    }

    /// Diagnostics produced while building the tree (duplicate names).
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn root(&self) -> &ModuleNode<'ast> {
        &self.nodes[ModuleId::ROOT.0]
    }

    pub fn node(&self, id: ModuleId) -> &ModuleNode<'ast> {
        &self.nodes[id.0]
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleNode<'ast>> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn decl(&self, id: DeclId) -> &'ast Spanned<Declaration> {
        &self.nodes[id.module.0].declarations[id.index]
    }

    pub fn member(&self, module: ModuleId, name: &str) -> Option<DeclId> {
        self.nodes[module.0]
            .members
            .get(name)
            .map(|index| DeclId { module, index: *index })
    }

    pub fn signature(&self, module: ModuleId, name: &str) -> Option<&'ast ModuleSigDecl> {
        let node = &self.nodes[module.0];
        let index = node.signatures.get(name)?;
        match &node.declarations[*index].node {
            Declaration::ModuleSig(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn child(&self, module: ModuleId, name: &str) -> Option<ModuleId> {
        self.nodes[module.0].children.get(name).copied()
    }

    /// The module introduced by a `module` declaration.
    pub fn module_of(&self, decl: DeclId) -> Option<ModuleId> {
        match &self.decl(decl).node {
            Declaration::Module(module) if self.node(decl.module).is_member(decl.index) => {
                self.child(decl.module, &module.name)
            }
            _ => None,
        }
    }

    /// Enclosing modules of `module`, innermost first, ending at the root.
    pub fn scope_chain(&self, module: ModuleId) -> Vec<ModuleId> {
        let mut chain = vec![ModuleId::ROOT];
        let mut current = ModuleId::ROOT;
        for segment in &self.nodes[module.0].path {
            match self.child(current, segment) {
                Some(next) => {
                    chain.push(next);
                    current = next;
                }
                None => break,
            }
        }
        chain.reverse();
        chain
    }

    pub fn parent(&self, module: ModuleId) -> Option<ModuleId> {
        self.scope_chain(module).get(1).copied()
    }

    /// Whether `ancestor` is `module` itself or one of its enclosing modules.
    pub fn encloses(&self, ancestor: ModuleId, module: ModuleId) -> bool {
        let outer = &self.nodes[ancestor.0].path;
        let inner = &self.nodes[module.0].path;
        inner.len() >= outer.len() && inner[..outer.len()] == outer[..]
    }

    /// Look `name` up from `module` outward to the root.
    pub fn lookup_lexical(&self, module: ModuleId, name: &str) -> Option<DeclId> {
        self.scope_chain(module)
            .into_iter()
            .find_map(|scope| self.member(scope, name))
    }

    /// Resolve the anchor of a path: `package` → root, each leading `super` → one level up.
    pub fn resolve_anchor(&self, from: ModuleId, segments: &[String]) -> Anchored {
        match segments.first().and_then(|s| paths::anchor_from_str(s)) {
            Some(PathAnchor::Package) => Anchored::At {
                module: ModuleId::ROOT,
                consumed: 1,
            },
            Some(PathAnchor::Super) => {
                let mut current = from;
                let mut consumed = 0;
                while segments.get(consumed).map(String::as_str) == Some(paths::anchor_as_str(PathAnchor::Super)) {
                    match self.parent(current) {
                        Some(parent) => current = parent,
                        None => return Anchored::PastRoot,
                    }
                    consumed += 1;
                }
                Anchored::At {
                    module: current,
                    consumed,
                }
            }
            None => Anchored::Unanchored,
        }
    }

    /// Dotted path of a declaration: its module path plus its name.
    pub fn decl_path(&self, decl: DeclId) -> MemberPath {
        let module = self.node(decl.module).member_path();
        match self.decl(decl).node.name() {
            Some(name) => module.child(name),
            None => module,
        }
    }
}

fn duplicate(path: &[&str], name: &str, span: Span) -> Diagnostic {
    let mut segments: Vec<String> = path.iter().map(|s| s.to_string()).collect();
    segments.push(name.to_string());
    Diagnostic::new(
        MemberPath::new(segments),
        DiagnosticKind::DuplicateMember { name: name.to_string() },
    )
    .with_span(span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::*;

    fn module(name: &str, declarations: Vec<Declaration>) -> Declaration {
        Declaration::Module(ModuleDecl {
            name: name.to_string(),
            signatures: vec![],
            declarations: declarations.into_iter().map(Spanned::unspanned).collect(),
        })
    }

    fn constant(name: &str) -> Declaration {
        Declaration::Const(ConstDecl {
            name: name.to_string(),
            ty: None,
            value: Expr::literal("1"),
        })
    }

    fn unit(declarations: Vec<Declaration>) -> TranslationUnit {
        TranslationUnit {
            declarations: declarations.into_iter().map(Spanned::unspanned).collect(),
        }
    }

    #[test]
    fn test_pre_order_arena() {
        let unit = unit(vec![
            module("A", vec![module("Inner", vec![])]),
            module("B", vec![]),
        ]);
        let tree = ModuleTree::build(&unit);
        let paths: Vec<Vec<&str>> = tree.modules().map(|m| m.path.clone()).collect();
        assert_eq!(paths, vec![vec![], vec!["A"], vec!["A", "Inner"], vec!["B"]]);
    }

    #[test]
    fn test_scope_chain_innermost_first() {
        let unit = unit(vec![module("A", vec![module("Inner", vec![])])]);
        let tree = ModuleTree::build(&unit);
        let a = tree.child(ModuleId::ROOT, "A").unwrap();
        let inner = tree.child(a, "Inner").unwrap();
        assert_eq!(tree.scope_chain(inner), vec![inner, a, ModuleId::ROOT]);
        assert_eq!(tree.parent(inner), Some(a));
        assert_eq!(tree.parent(ModuleId::ROOT), None);
        assert!(tree.encloses(a, inner));
        assert!(!tree.encloses(inner, a));
    }

    #[test]
    fn test_lexical_lookup_prefers_inner_scope() {
        let unit = unit(vec![constant("X"), module("A", vec![constant("X"), constant("Y")])]);
        let tree = ModuleTree::build(&unit);
        let a = tree.child(ModuleId::ROOT, "A").unwrap();
        assert_eq!(tree.lookup_lexical(a, "X"), Some(DeclId { module: a, index: 0 }));
        assert_eq!(tree.lookup_lexical(ModuleId::ROOT, "Y"), None);
        assert_eq!(tree.lookup_lexical(a, "A"), Some(DeclId { module: ModuleId::ROOT, index: 1 }));
    }

    #[test]
    fn test_duplicates_keep_first() {
        let unit = unit(vec![constant("X"), module("X", vec![constant("Z")])]);
        let tree = ModuleTree::build(&unit);
        assert_eq!(tree.member(ModuleId::ROOT, "X"), Some(DeclId { module: ModuleId::ROOT, index: 0 }));
        assert_eq!(tree.child(ModuleId::ROOT, "X"), None);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.diagnostics().len(), 1);
        assert_eq!(tree.diagnostics()[0].line(), "X: duplicate definition of `X`");
    }

    #[test]
    fn test_anchors() {
        let unit = unit(vec![module("A", vec![module("B", vec![])])]);
        let tree = ModuleTree::build(&unit);
        let a = tree.child(ModuleId::ROOT, "A").unwrap();
        let b = tree.child(a, "B").unwrap();
        let segs = |s: &str| QualifiedPath::parse(s).segments;

        assert_eq!(
            tree.resolve_anchor(b, &segs("package::A")),
            Anchored::At { module: ModuleId::ROOT, consumed: 1 }
        );
        assert_eq!(tree.resolve_anchor(b, &segs("super::X")), Anchored::At { module: a, consumed: 1 });
        assert_eq!(
            tree.resolve_anchor(b, &segs("super::super::X")),
            Anchored::At { module: ModuleId::ROOT, consumed: 2 }
        );
        assert_eq!(tree.resolve_anchor(ModuleId::ROOT, &segs("super::X")), Anchored::PastRoot);
        assert_eq!(tree.resolve_anchor(b, &segs("A::X")), Anchored::Unanchored);
    }

    #[test]
    fn test_signatures_are_not_members() {
        let unit = unit(vec![Declaration::ModuleSig(ModuleSigDecl {
            name: "Pi".to_string(),
            members: vec![],
        })]);
        let tree = ModuleTree::build(&unit);
        assert!(tree.member(ModuleId::ROOT, "Pi").is_none());
        assert!(tree.signature(ModuleId::ROOT, "Pi").is_some());
    }
}
