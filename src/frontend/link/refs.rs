//! Collects every path written inside a declaration.
//!
//! Nested `module` bodies are not entered: each module of the tree is visited on its own, so a path is always
//! attributed to the declaration it is written in. Signature references (`-> A + B`, `: A + B`, `mod X: A;`) are
//! not collected; the registry resolves those.

use crate::frontend::ast::{Attribute, Declaration, Expr, QualifiedPath, SigMember, Statement, TemplateArg, TypeSpecifier};

#[derive(Default)]
pub(super) struct PathCollector<'ast> {
    pub(super) paths: Vec<&'ast QualifiedPath>,
}

impl<'ast> PathCollector<'ast> {
    pub(super) fn declaration(&mut self, decl: &'ast Declaration) {
        match decl {
            Declaration::ModuleSig(sig) => {
                for member in &sig.members {
                    self.sig_member(&member.node);
                }
            }
            Declaration::Module(_) => {}
            Declaration::Alias(alias) => self.ty(&alias.target),
            Declaration::Struct(s) => {
                self.attributes(&s.attributes);
                for member in &s.members {
                    self.attributes(&member.attributes);
                    self.ty(&member.ty);
                }
            }
            Declaration::Function(f) => {
                self.attributes(&f.attributes);
                for param in &f.params {
                    self.attributes(&param.attributes);
                    self.ty(&param.ty);
                }
                self.attributes(&f.return_attributes);
                if let Some(ret) = &f.return_type {
                    self.ty(ret);
                }
                self.statements(&f.body);
            }
            Declaration::Const(c) => {
                self.opt_ty(c.ty.as_ref());
                self.expr(&c.value);
            }
            Declaration::Override(o) => {
                self.attributes(&o.attributes);
                self.opt_ty(o.ty.as_ref());
                if let Some(value) = &o.value {
                    self.expr(value);
                }
            }
            Declaration::Var(v) => {
                self.attributes(&v.attributes);
                self.opt_ty(v.ty.as_ref());
                if let Some(value) = &v.value {
                    self.expr(value);
                }
            }
            Declaration::ConstAssert(a) => self.expr(&a.expr),
        }
    }

    fn sig_member(&mut self, member: &'ast SigMember) {
        match member {
            SigMember::Function(f) => {
                self.attributes(&f.attributes);
                for param in &f.params {
                    self.attributes(&param.attributes);
                    self.ty(&param.ty);
                }
                self.attributes(&f.return_attributes);
                if let Some(ret) = &f.return_type {
                    self.ty(ret);
                }
            }
            SigMember::Const(c) => self.ty(&c.ty),
            SigMember::Override(o) => {
                self.attributes(&o.attributes);
                self.ty(&o.ty);
            }
            SigMember::Var(v) => {
                self.attributes(&v.attributes);
                self.ty(&v.ty);
            }
            SigMember::Type(t) => self.opt_ty(t.constraint.as_ref()),
            SigMember::Module(_) => {}
        }
    }

    fn attributes(&mut self, attributes: &'ast [Attribute]) {
        for attr in attributes {
            for arg in &attr.args {
                self.expr(arg);
            }
        }
    }

    fn opt_ty(&mut self, ty: Option<&'ast TypeSpecifier>) {
        if let Some(ty) = ty {
            self.ty(ty);
        }
    }

    fn ty(&mut self, ty: &'ast TypeSpecifier) {
        self.paths.push(&ty.path);
        for arg in &ty.args {
            match arg {
                TemplateArg::Type(t) => self.ty(t),
                TemplateArg::Expr(e) => self.expr(e),
            }
        }
    }

    fn expr(&mut self, expr: &'ast Expr) {
        match expr {
            Expr::Literal { .. } => {}
            Expr::Path { path } => self.paths.push(path),
            Expr::Call { callee, args } => {
                self.ty(callee);
                for arg in args {
                    self.expr(arg);
                }
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            Expr::Unary { operand, .. } => self.expr(operand),
            Expr::Member { base, .. } => self.expr(base),
            Expr::Index { base, index } => {
                self.expr(base);
                self.expr(index);
            }
            Expr::Paren { inner } => self.expr(inner),
        }
    }

    fn statements(&mut self, body: &'ast [Statement]) {
        for stmt in body {
            self.statement(stmt);
        }
    }

    fn statement(&mut self, stmt: &'ast Statement) {
        match stmt {
            Statement::Let { ty, value, .. } | Statement::Const { ty, value, .. } => {
                self.opt_ty(ty.as_ref());
                self.expr(value);
            }
            Statement::Var { ty, value, .. } => {
                self.opt_ty(ty.as_ref());
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            Statement::Assign { target, value, .. } => {
                self.expr(target);
                self.expr(value);
            }
            Statement::Return { value } => {
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            Statement::Expr { expr } => self.expr(expr),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition);
                self.statements(then_branch);
                self.statements(else_branch);
            }
            Statement::While { condition, body } => {
                self.expr(condition);
                self.statements(body);
            }
            Statement::Loop { body } | Statement::Block { body } => self.statements(body),
            Statement::Break | Statement::Continue | Statement::Discard => {}
        }
    }
}
