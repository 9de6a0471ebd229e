//! Constraint generation: one walk per function, sub-expressions before their parents.

mod scope;

use ahash::{AHashMap, AHashSet};
use tip_ast::ast::{Expr, ExprId, ExprKind, Function, Program, Stmt, StmtKind};
use tip_ast::span::Span;

use crate::constraint::{CallSite, Constraint, ConstraintSet, Node, Origin};
use crate::debug::SharedDebug;
use crate::types::{Term, TvGen, Type};

use scope::{assigned_vars, calls_itself, Scope};

/// Walks a program and produces its `ConstraintSet`.
///
/// All run state (constraints, expression terms, the type-variable generator) is owned
/// here and cleared by `reset`, which `collect` calls first.
pub struct ConstraintCollector {
    tv: TvGen,
    constraints: Vec<Constraint>,
    terms: AHashMap<ExprId, Term>,
    functions: AHashSet<String>,
    debug: Option<SharedDebug>,
    depth: usize,
}

impl Default for ConstraintCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintCollector {
    pub fn new() -> Self {
        Self {
            tv: TvGen::new(),
            constraints: Vec::new(),
            terms: AHashMap::new(),
            functions: AHashSet::new(),
            debug: None,
            depth: 0,
        }
    }

    pub fn with_debug(mut self, debug: Option<SharedDebug>) -> Self {
        self.debug = debug;
        self
    }

    pub fn reset(&mut self) {
        self.tv.reset();
        self.constraints.clear();
        self.terms.clear();
        self.functions.clear();
        self.depth = 0;
    }

    pub fn collect(&mut self, program: &Program) -> ConstraintSet {
        self.reset();
        self.functions = program.functions.iter().map(|f| f.name.clone()).collect();
        for func in &program.functions {
            self.collect_function(func);
        }
        ConstraintSet {
            constraints: std::mem::take(&mut self.constraints),
            terms: std::mem::take(&mut self.terms),
        }
    }

    fn emit(&mut self, scope: &Scope<'_>, span: Span, node: Node, left: Type, right: Type) {
        let origin = Origin { function: scope.name().to_string(), span, node };
        let c = Constraint::new(origin, left, right);
        if let Some(dbg) = &self.debug {
            dbg.borrow_mut().constraint(self.depth, c.to_string());
        }
        self.constraints.push(c);
    }

    fn collect_function(&mut self, func: &Function) {
        let scope = Scope::new(func);
        let name = func.name.as_str();
        let params: Vec<Type> =
            func.params.iter().map(|p| Type::deferred(Term::var(name, p))).collect();
        let mut fn_ty = Type::function(params, Type::deferred(Term::Result(name.to_string())));
        if calls_itself(&scope) {
            fn_ty = Type::Recursive { bound: self.tv.fresh_id(), body: Box::new(fn_ty) };
        }
        self.emit(
            &scope,
            func.span,
            Node::Function(name.to_string()),
            Type::deferred(Term::Fun(name.to_string())),
            fn_ty,
        );

        self.depth += 1;
        for stmt in &func.body {
            self.collect_stmt(&scope, stmt);
        }
        let ret = self.collect_expr(&scope, &func.ret);
        self.emit(
            &scope,
            func.ret.span,
            Node::Return(func.ret.id),
            Type::deferred(Term::Result(name.to_string())),
            Type::deferred(ret),
        );

        let assigned = assigned_vars(func);
        for local in func.locals.iter().filter(|l| !assigned.contains(l.as_str())) {
            let null = Type::Pointer(Some(Box::new(self.tv.fresh())));
            self.emit(
                &scope,
                func.span,
                Node::Uninitialized(local.clone()),
                Type::deferred(Term::var(name, local)),
                null,
            );
        }
        self.depth -= 1;
    }

    fn collect_block(&mut self, scope: &Scope<'_>, stmts: &[Stmt]) {
        self.depth += 1;
        for s in stmts {
            self.collect_stmt(scope, s);
        }
        self.depth -= 1;
    }

    fn collect_stmt(&mut self, scope: &Scope<'_>, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Assign { target, value } => {
                let v = self.collect_expr(scope, value);
                self.emit(
                    scope,
                    stmt.span,
                    Node::Assign { target: target.clone(), value: value.id },
                    Type::deferred(Term::var(scope.name(), target)),
                    Type::deferred(v),
                );
            }
            StmtKind::Store { pointer, value } => {
                let p = self.collect_expr(scope, pointer);
                let v = self.collect_expr(scope, value);
                self.emit(
                    scope,
                    stmt.span,
                    Node::Store { pointer: pointer.id, value: value.id },
                    Type::deferred(Term::deref(p)),
                    Type::deferred(v),
                );
            }
            StmtKind::Output(e) => {
                let t = self.collect_expr(scope, e);
                self.emit(scope, stmt.span, Node::Output(e.id), Type::deferred(t), Type::Int);
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                self.condition(scope, cond);
                self.collect_block(scope, then_branch);
                if let Some(els) = else_branch {
                    self.collect_block(scope, els);
                }
            }
            StmtKind::While { cond, body } => {
                self.condition(scope, cond);
                self.collect_block(scope, body);
            }
        }
    }

    fn condition(&mut self, scope: &Scope<'_>, cond: &Expr) {
        let t = self.collect_expr(scope, cond);
        self.emit(scope, cond.span, Node::Condition(cond.id), Type::deferred(t), Type::Int);
    }

    /// Constrain `e` and its sub-expressions; returns (and records) the term of `e`.
    fn collect_expr(&mut self, scope: &Scope<'_>, e: &Expr) -> Term {
        let own = Type::deferred(Term::Expr(e.id));
        let term = match &e.kind {
            ExprKind::Number(_) => {
                self.emit(scope, e.span, Node::Number(e.id), own, Type::Int);
                Term::Expr(e.id)
            }
            ExprKind::Input => {
                self.emit(scope, e.span, Node::Input(e.id), own, Type::Int);
                Term::Expr(e.id)
            }
            ExprKind::Null => {
                let target = self.tv.fresh();
                self.emit(scope, e.span, Node::Null(e.id), own, Type::pointer(target));
                Term::Expr(e.id)
            }
            ExprKind::Ident(name) => scope.resolve(name, &self.functions),
            ExprKind::Binary { op, left, right } => {
                self.collect_expr(scope, left);
                self.collect_expr(scope, right);
                let node = Node::Binary { expr: e.id, op: *op, left: left.id, right: right.id };
                self.emit(scope, e.span, node, own, Type::Int);
                Term::Expr(e.id)
            }
            ExprKind::Alloc(inner) => {
                let t = self.collect_expr(scope, inner);
                let node = Node::Alloc { expr: e.id, arg: inner.id };
                self.emit(scope, e.span, node, own, Type::pointer(Type::deferred(t)));
                Term::Expr(e.id)
            }
            ExprKind::AddressOf(name) => {
                let target = Type::deferred(Term::var(scope.name(), name));
                let node = Node::AddressOf { expr: e.id, var: name.clone() };
                self.emit(scope, e.span, node, own, Type::pointer(target));
                Term::Expr(e.id)
            }
            ExprKind::Deref(inner) => Term::deref(self.collect_expr(scope, inner)),
            ExprKind::Call { callee, args } => self.collect_call(scope, e, callee, args),
            ExprKind::Record(fields) => {
                let mut tys = std::collections::BTreeMap::new();
                let mut ids = Vec::new();
                for (k, v) in fields {
                    let t = self.collect_expr(scope, v);
                    tys.insert(k.clone(), Type::deferred(t));
                    ids.push((k.clone(), v.id));
                }
                let node = Node::Record { expr: e.id, fields: ids };
                self.emit(scope, e.span, node, own, Type::Record(tys));
                Term::Expr(e.id)
            }
            ExprKind::Field { record, field } => {
                let r = self.collect_expr(scope, record);
                let access = Term::field(r, field);
                let node =
                    Node::FieldAccess { expr: e.id, record: record.id, field: field.clone() };
                let placeholder = self.tv.fresh();
                self.emit(scope, e.span, node, Type::deferred(access.clone()), placeholder);
                access
            }
        };
        self.terms.insert(e.id, term.clone());
        term
    }

    fn collect_call(&mut self, scope: &Scope<'_>, e: &Expr, callee: &Expr, args: &[Expr]) -> Term {
        let callee_term = self.collect_expr(scope, callee);
        let arg_terms: Vec<Term> = args.iter().map(|a| self.collect_expr(scope, a)).collect();
        let direct = match &callee_term {
            Term::Fun(name) => Some(name.clone()),
            _ => None,
        };
        let site = CallSite {
            call: e.id,
            callee_expr: callee.id,
            callee: direct.clone(),
            args: args.iter().map(|a| a.id).collect(),
        };
        let own = Type::deferred(Term::Expr(e.id));
        match direct {
            Some(name) if name == scope.name() => {
                self.emit(scope, e.span, Node::Call(site), own, Type::deferred(Term::Result(name)));
            }
            Some(_) => {
                let placeholder = self.tv.fresh();
                self.emit(scope, e.span, Node::Call(site), own, placeholder);
            }
            None => {
                let params = arg_terms.into_iter().map(Type::deferred).collect();
                let expected = Type::function(params, own);
                self.emit(scope, e.span, Node::Call(site), Type::deferred(callee_term), expected);
            }
        }
        Term::Expr(e.id)
    }
}
