//! Source printer for the declaration AST.
//!
//! Walks the AST and emits source text. The linker uses the same printer to write out the externally visible surface
//! of a program, so the building blocks (`open_module`, `print_declaration`, `print_opaque_type`, ...) are public.
//!
//! ## Notes
//! - Expressions print exactly as structured: no parentheses are inserted, `Paren` nodes carry them.
//! - Output always ends with a newline when anything was printed.

use crate::ast::*;

/// Printing configuration
#[derive(Debug, Clone)]
pub struct PrintConfig {
    /// Number of spaces per indentation level
    pub indent_width: usize,
    /// Number of blank lines between sibling declarations
    pub blank_lines_between: usize,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            indent_width: 4,
            blank_lines_between: 1,
        }
    }
}

impl PrintConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }

    pub fn with_blank_lines_between(mut self, count: usize) -> Self {
        self.blank_lines_between = count;
        self
    }
}

/// Writer that tracks indentation and builds the output
pub struct SourceWriter {
    output: String,
    indent_level: usize,
    config: PrintConfig,
    at_line_start: bool,
}

impl SourceWriter {
    pub fn new(config: PrintConfig) -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            config,
            at_line_start: true,
        }
    }

    pub fn finish(self) -> String {
        self.output
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    fn write_indent(&mut self) {
        if self.at_line_start {
            let indent = " ".repeat(self.indent_level * self.config.indent_width);
            self.output.push_str(&indent);
            self.at_line_start = false;
        }
    }

    /// Write a string (with auto-indent)
    pub fn write(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        self.write_indent();
        self.output.push_str(s);
    }

    pub fn writeln(&mut self, s: &str) {
        self.write(s);
        self.newline();
    }

    pub fn newline(&mut self) {
        self.output.push('\n');
        self.at_line_start = true;
    }

    pub fn blank_lines(&mut self, count: usize) {
        for _ in 0..count {
            self.newline();
        }
    }

    pub fn current_indent(&self) -> usize {
        self.indent_level
    }

    pub fn config(&self) -> &PrintConfig {
        &self.config
    }
}

/// Prints declarations back to source text.
pub struct Printer {
    writer: SourceWriter,
}

impl Printer {
    pub fn new(config: PrintConfig) -> Self {
        Self {
            writer: SourceWriter::new(config),
        }
    }

    /// Print a whole translation unit, module signatures included.
    pub fn print_unit(mut self, unit: &TranslationUnit) -> String {
        self.print_sequence(&unit.declarations);
        self.finish()
    }

    pub fn finish(self) -> String {
        self.writer.finish()
    }

    /// Emit the configured gap between two sibling declarations.
    pub fn separate(&mut self) {
        let count = self.writer.config().blank_lines_between;
        self.writer.blank_lines(count);
    }

    /// `mod Name {` followed by an indent. Signatures are printed after `->` when given.
    pub fn open_module(&mut self, name: &str, signatures: &[TypeSpecifier]) {
        if signatures.is_empty() {
            self.writer.writeln(&format!("mod {name} {{"));
        } else {
            self.writer
                .writeln(&format!("mod {name} -> {} {{", signature_list(signatures)));
        }
        self.writer.indent();
    }

    pub fn close_block(&mut self) {
        self.writer.dedent();
        self.writer.writeln("}");
    }

    /// `type Name;`, the externally visible form of a type whose definition is hidden.
    pub fn print_opaque_type(&mut self, name: &str) {
        self.writer.writeln(&format!("type {name};"));
    }

    fn print_sequence(&mut self, declarations: &[Spanned<Declaration>]) {
        for (i, decl) in declarations.iter().enumerate() {
            if i > 0 {
                self.separate();
            }
            self.print_declaration(&decl.node);
        }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    pub fn print_declaration(&mut self, decl: &Declaration) {
        match decl {
            Declaration::ModuleSig(sig) => self.print_module_sig(sig),
            Declaration::Module(module) => {
                self.open_module(&module.name, &module.signatures);
                self.print_sequence(&module.declarations);
                self.close_block();
            }
            Declaration::Alias(alias) => {
                let sigs = if alias.signatures.is_empty() {
                    String::new()
                } else {
                    format!(": {}", signature_list(&alias.signatures))
                };
                self.writer.writeln(&format!(
                    "alias {}{} = {};",
                    alias.name,
                    sigs,
                    type_to_string(&alias.target)
                ));
            }
            Declaration::Struct(s) => self.print_struct(s),
            Declaration::Function(f) => self.print_function(f),
            Declaration::Const(c) => {
                self.writer.writeln(&format!(
                    "const {}{} = {};",
                    c.name,
                    type_annotation(c.ty.as_ref()),
                    expr_to_string(&c.value)
                ));
            }
            Declaration::Override(o) => {
                let init = o
                    .value
                    .as_ref()
                    .map(|v| format!(" = {}", expr_to_string(v)))
                    .unwrap_or_default();
                self.writer.writeln(&format!(
                    "{}override {}{}{};",
                    attribute_prefix(&o.attributes),
                    o.name,
                    type_annotation(o.ty.as_ref()),
                    init
                ));
            }
            Declaration::Var(v) => {
                let init = v
                    .value
                    .as_ref()
                    .map(|e| format!(" = {}", expr_to_string(e)))
                    .unwrap_or_default();
                self.writer.writeln(&format!(
                    "{}var{} {}{}{};",
                    attribute_prefix(&v.attributes),
                    var_template(v.address_space.as_deref(), v.access_mode.as_deref()),
                    v.name,
                    type_annotation(v.ty.as_ref()),
                    init
                ));
            }
            Declaration::ConstAssert(a) => {
                self.writer.writeln(&format!("const_assert {};", expr_to_string(&a.expr)));
            }
        }
    }

    fn print_module_sig(&mut self, sig: &ModuleSigDecl) {
        self.writer.writeln(&format!("mod sig {} {{", sig.name));
        self.writer.indent();
        for member in &sig.members {
            self.print_sig_member(&member.node);
        }
        self.close_block();
    }

    pub fn print_sig_member(&mut self, member: &SigMember) {
        let line = match member {
            SigMember::Function(f) => {
                let params: Vec<String> = f
                    .params
                    .iter()
                    .map(|p| match &p.name {
                        Some(name) => format!("{}{}: {}", attribute_prefix(&p.attributes), name, type_to_string(&p.ty)),
                        None => format!("{}{}", attribute_prefix(&p.attributes), type_to_string(&p.ty)),
                    })
                    .collect();
                format!(
                    "{}fn {}({}){};",
                    attribute_prefix(&f.attributes),
                    f.name,
                    params.join(", "),
                    return_clause(f.return_type.as_ref(), &f.return_attributes)
                )
            }
            SigMember::Const(c) => format!("const {}: {};", c.name, type_to_string(&c.ty)),
            SigMember::Override(o) => format!(
                "{}override {}: {};",
                attribute_prefix(&o.attributes),
                o.name,
                type_to_string(&o.ty)
            ),
            SigMember::Var(v) => format!(
                "{}var{} {}: {};",
                attribute_prefix(&v.attributes),
                var_template(v.address_space.as_deref(), v.access_mode.as_deref()),
                v.name,
                type_to_string(&v.ty)
            ),
            SigMember::Type(t) => match &t.constraint {
                Some(ty) => format!("type {}: {};", t.name, type_to_string(ty)),
                None => format!("type {};", t.name),
            },
            SigMember::Module(m) => {
                if m.signatures.is_empty() {
                    format!("mod {};", m.name)
                } else {
                    format!("mod {}: {};", m.name, signature_list(&m.signatures))
                }
            }
        };
        self.writer.writeln(&line);
    }

    fn print_struct(&mut self, s: &StructDecl) {
        self.writer
            .writeln(&format!("{}struct {} {{", attribute_prefix(&s.attributes), s.name));
        self.writer.indent();
        for member in &s.members {
            self.writer.writeln(&format!(
                "{}{}: {},",
                attribute_prefix(&member.attributes),
                member.name,
                type_to_string(&member.ty)
            ));
        }
        self.close_block();
    }

    fn print_function(&mut self, f: &FunctionDecl) {
        let params: Vec<String> = f
            .params
            .iter()
            .map(|p| format!("{}{}: {}", attribute_prefix(&p.attributes), p.name, type_to_string(&p.ty)))
            .collect();
        self.writer.writeln(&format!(
            "{}fn {}({}){} {{",
            attribute_prefix(&f.attributes),
            f.name,
            params.join(", "),
            return_clause(f.return_type.as_ref(), &f.return_attributes)
        ));
        self.writer.indent();
        self.print_statements(&f.body);
        self.close_block();
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn print_statements(&mut self, body: &[Statement]) {
        for stmt in body {
            self.print_statement(stmt);
        }
    }

    fn print_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Let { name, ty, value } => {
                self.writer.writeln(&format!(
                    "let {}{} = {};",
                    name,
                    type_annotation(ty.as_ref()),
                    expr_to_string(value)
                ));
            }
            Statement::Var { name, ty, value } => {
                let init = value
                    .as_ref()
                    .map(|v| format!(" = {}", expr_to_string(v)))
                    .unwrap_or_default();
                self.writer
                    .writeln(&format!("var {}{}{};", name, type_annotation(ty.as_ref()), init));
            }
            Statement::Const { name, ty, value } => {
                self.writer.writeln(&format!(
                    "const {}{} = {};",
                    name,
                    type_annotation(ty.as_ref()),
                    expr_to_string(value)
                ));
            }
            Statement::Assign { target, op, value } => {
                let op = op.map(BinaryOp::as_str).unwrap_or("");
                self.writer.writeln(&format!(
                    "{} {}= {};",
                    expr_to_string(target),
                    op,
                    expr_to_string(value)
                ));
            }
            Statement::Return { value } => match value {
                Some(v) => self.writer.writeln(&format!("return {};", expr_to_string(v))),
                None => self.writer.writeln("return;"),
            },
            Statement::Expr { expr } => self.writer.writeln(&format!("{};", expr_to_string(expr))),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.writer.writeln(&format!("if {} {{", expr_to_string(condition)));
                self.writer.indent();
                self.print_statements(then_branch);
                self.writer.dedent();
                if else_branch.is_empty() {
                    self.writer.writeln("}");
                } else {
                    self.writer.writeln("} else {");
                    self.writer.indent();
                    self.print_statements(else_branch);
                    self.close_block();
                }
            }
            Statement::While { condition, body } => {
                self.writer.writeln(&format!("while {} {{", expr_to_string(condition)));
                self.writer.indent();
                self.print_statements(body);
                self.close_block();
            }
            Statement::Loop { body } => {
                self.writer.writeln("loop {");
                self.writer.indent();
                self.print_statements(body);
                self.close_block();
            }
            Statement::Block { body } => {
                self.writer.writeln("{");
                self.writer.indent();
                self.print_statements(body);
                self.close_block();
            }
            Statement::Break => self.writer.writeln("break;"),
            Statement::Continue => self.writer.writeln("continue;"),
            Statement::Discard => self.writer.writeln("discard;"),
        }
    }
}

// ============================================================================
// Inline fragments
// ============================================================================

/// Print a type specifier: `f32`, `vec3<f32>`, `Math::Float::Quat`.
pub fn type_to_string(ty: &TypeSpecifier) -> String {
    if ty.args.is_empty() {
        return ty.path.to_string();
    }
    let args: Vec<String> = ty.args.iter().map(template_arg_to_string).collect();
    format!("{}<{}>", ty.path, args.join(", "))
}

pub fn template_arg_to_string(arg: &TemplateArg) -> String {
    match arg {
        TemplateArg::Type(ty) => type_to_string(ty),
        TemplateArg::Expr(expr) => expr_to_string(expr),
    }
}

pub fn expr_to_string(expr: &Expr) -> String {
    match expr {
        Expr::Literal { value } => value.clone(),
        Expr::Path { path } => path.to_string(),
        Expr::Call { callee, args } => {
            let args: Vec<String> = args.iter().map(expr_to_string).collect();
            format!("{}({})", type_to_string(callee), args.join(", "))
        }
        Expr::Binary { op, lhs, rhs } => {
            format!("{} {} {}", expr_to_string(lhs), op.as_str(), expr_to_string(rhs))
        }
        Expr::Unary { op, operand } => format!("{}{}", op.as_str(), expr_to_string(operand)),
        Expr::Member { base, member } => format!("{}.{}", expr_to_string(base), member),
        Expr::Index { base, index } => format!("{}[{}]", expr_to_string(base), expr_to_string(index)),
        Expr::Paren { inner } => format!("({})", expr_to_string(inner)),
    }
}

/// `@a @b(1) ` (with a trailing space), or an empty string.
pub fn attribute_prefix(attributes: &[Attribute]) -> String {
    attributes
        .iter()
        .map(|attr| {
            if attr.args.is_empty() {
                format!("@{} ", attr.name)
            } else {
                let args: Vec<String> = attr.args.iter().map(expr_to_string).collect();
                format!("@{}({}) ", attr.name, args.join(", "))
            }
        })
        .collect()
}

fn signature_list(signatures: &[TypeSpecifier]) -> String {
    signatures.iter().map(type_to_string).collect::<Vec<_>>().join(" + ")
}

fn type_annotation(ty: Option<&TypeSpecifier>) -> String {
    ty.map(|t| format!(": {}", type_to_string(t))).unwrap_or_default()
}

fn return_clause(ty: Option<&TypeSpecifier>, attributes: &[Attribute]) -> String {
    match ty {
        Some(ty) => format!(" -> {}{}", attribute_prefix(attributes), type_to_string(ty)),
        None => String::new(),
    }
}

fn var_template(address_space: Option<&str>, access_mode: Option<&str>) -> String {
    match (address_space, access_mode) {
        (Some(space), Some(mode)) => format!("<{space}, {mode}>"),
        (Some(space), None) => format!("<{space}>"),
        _ => String::new(),
    }
}

/// Print a translation unit with the default configuration.
pub fn print_unit(unit: &TranslationUnit) -> String {
    Printer::new(PrintConfig::default()).print_unit(unit)
}
