//! Configuration for a checking run.

use modsig_syntax::printer::PrintConfig;

/// Options for [`Session::run`](crate::frontend::session::Session::run)
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Stop starting new conformance checks once this many diagnostics were collected
    pub max_diagnostics: Option<usize>,
    /// Layout of the linked output
    pub print: PrintConfig,
}

impl CheckOptions {
    /// Create options with no diagnostic budget and the default print layout
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the diagnostic budget
    pub fn with_max_diagnostics(mut self, max: usize) -> Self {
        self.max_diagnostics = Some(max);
        self
    }

    /// Set the indentation width of the linked output
    pub fn with_indent_width(mut self, width: usize) -> Self {
        self.print = self.print.with_indent_width(width);
        self
    }

    /// Whether `collected` diagnostics use up the budget.
    pub fn budget_exhausted(&self, collected: usize) -> bool {
        self.max_diagnostics.is_some_and(|max| collected >= max)
    }
}
