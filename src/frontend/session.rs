//! The checking pipeline for one translation unit.
//!
//! A [`Session`] runs in two phases. Construction builds everything that is shared: the module tree, the frozen alias
//! cache and the signature registry. After that nothing is mutated, and the declared conformance checks and the
//! linking pass only read.
//!
//! ## Notes
//! - Setup diagnostics (duplicate names, alias cycles, unknown signatures) are kept and reported with the rest.
//! - Conformance diagnostics are prefixed with the dotted path of the declaring `module` or `alias`.
//! - The diagnostic budget only stops new conformance checks from starting. Diagnostics already collected are kept.

use crate::config::CheckOptions;
use crate::frontend::ast::TranslationUnit;
use crate::frontend::canonical::{Resolver, TypeCache, canonicalize_all};
use crate::frontend::conformance::{self, Context};
use crate::frontend::diagnostics::{Diagnostic, leaf_count};
use crate::frontend::link::{LinkOutcome, Linker, render};
use crate::frontend::registry::SignatureRegistry;
use crate::frontend::tree::{DeclId, ModuleTree};

/// The result of running every declared conformance check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckOutcome {
    pub diagnostics: Vec<Diagnostic>,
    /// Number of checks that ran.
    pub checked: usize,
    /// Whether the budget stopped checks from running.
    pub truncated: bool,
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct Report {
    pub setup: Vec<Diagnostic>,
    pub conformance: Vec<Diagnostic>,
    pub access: Vec<Diagnostic>,
    /// The linked source text.
    pub output: String,
    pub truncated: bool,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.setup.is_empty() && self.conformance.is_empty() && self.access.is_empty()
    }

    /// Every diagnostic in report order: setup, conformance, access.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.setup.iter().chain(&self.conformance).chain(&self.access)
    }

    /// The diagnostics a user acts on, with nested failures flattened.
    pub fn leaves(&self) -> Vec<&Diagnostic> {
        self.diagnostics().flat_map(Diagnostic::leaves).collect()
    }

    /// One `<dotted member path>: <reason>` line per leaf diagnostic.
    pub fn lines(&self) -> Vec<String> {
        self.leaves().into_iter().map(Diagnostic::line).collect()
    }
}

pub struct Session<'ast> {
    tree: ModuleTree<'ast>,
    cache: TypeCache,
    registry: SignatureRegistry,
    setup: Vec<Diagnostic>,
}

impl<'ast> Session<'ast> {
    /// Build the module tree, canonicalize every alias and register every signature.
    #[tracing::instrument(skip_all)]
    pub fn new(unit: &'ast TranslationUnit) -> Self {
        let tree = ModuleTree::build(unit);
        let (cache, cycles) = canonicalize_all(&tree);
        let registry = SignatureRegistry::build(Resolver::new(&tree, &cache));

        let mut setup = tree.diagnostics().to_vec();
        setup.extend(cycles);
        setup.extend(registry.diagnostics().iter().cloned());
        tracing::debug!(
            modules = tree.len(),
            aliases = cache.len(),
            setup = setup.len(),
            "session ready"
        );

        Self {
            tree,
            cache,
            registry,
            setup,
        }
    }

    pub fn tree(&self) -> &ModuleTree<'ast> {
        &self.tree
    }

    pub fn registry(&self) -> &SignatureRegistry {
        &self.registry
    }

    pub fn setup_diagnostics(&self) -> &[Diagnostic] {
        &self.setup
    }

    pub fn resolver(&self) -> Resolver<'_, 'ast> {
        Resolver::new(&self.tree, &self.cache)
    }

    pub fn context(&self) -> Context<'_, 'ast> {
        Context::new(self.resolver(), &self.registry)
    }

    /// Check every `module` and `alias` that declares a signature set, in tree order.
    #[tracing::instrument(skip_all)]
    pub fn check_declared(&self, options: &CheckOptions) -> CheckOutcome {
        let ctx = self.context();
        let mut outcome = CheckOutcome::default();

        'modules: for node in self.tree.modules() {
            for (index, spanned) in node.declarations.iter().enumerate() {
                let decl = DeclId { module: node.id, index };
                if self.registry.declared(decl).is_none() {
                    continue;
                }
                let collected = leaf_count(&outcome.diagnostics);
                if options.budget_exhausted(collected) {
                    tracing::warn!(collected, "diagnostic budget exhausted; skipping remaining checks");
                    outcome.truncated = true;
                    break 'modules;
                }
                let Some(result) = conformance::check_declaration(ctx, decl) else {
                    continue;
                };
                outcome.checked += 1;
                let prefix = self.tree.decl_path(decl);
                outcome
                    .diagnostics
                    .extend(result.into_diagnostics().into_iter().map(|diagnostic| {
                        let mut diagnostic = diagnostic.prefixed(&prefix);
                        if diagnostic.span.is_empty() {
                            diagnostic.span = spanned.span;
                        }
                        diagnostic
                    }));
            }
        }

        tracing::debug!(
            checked = outcome.checked,
            diagnostics = outcome.diagnostics.len(),
            "declared checks done"
        );
        outcome
    }

    /// Validate every qualified access and build the linked surface.
    pub fn link(&self) -> LinkOutcome<'ast> {
        Linker::new(self.context()).run()
    }

    /// Setup, conformance and linking in one go.
    #[tracing::instrument(skip_all)]
    pub fn run(&self, options: &CheckOptions) -> Report {
        let checks = self.check_declared(options);
        let link = self.link();
        let report = Report {
            setup: self.setup.clone(),
            conformance: checks.diagnostics,
            access: link.violations,
            output: render(&link.linked, options.print.clone()),
            truncated: checks.truncated,
        };
        tracing::debug!(
            problems = report.leaves().len(),
            truncated = report.truncated,
            "run finished"
        );
        report
    }
}
