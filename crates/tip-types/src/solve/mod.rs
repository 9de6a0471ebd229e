//! Constraint solving.
//!
//! Phase A registers every operand, unifies constraint pairs in collection order and runs
//! the linking passes (`link`). Phase B runs the structural checks (`validate`) that plain
//! unification cannot express. Every step runs regardless of earlier failures.

mod link;
mod validate;

use ahash::AHashMap;
use tip_ast::ast::{Expr, ExprId, Program};
use tip_ast::pretty::print_expr;
use tip_ast::span::Span;
use tip_ast::visit::walk_function_exprs;

use crate::constraint::{ConstraintSet, Origin};
use crate::debug::SharedDebug;
use crate::display::render_type;
use crate::error::TypeError;
use crate::types::{Key, Term, Type};
use crate::union_find::UnionFind;
use crate::CheckOptions;

pub struct Solver<'p> {
    program: &'p Program,
    set: &'p ConstraintSet,
    exprs: AHashMap<ExprId, &'p Expr>,
    // expression ids in program order
    order: Vec<ExprId>,
    store: UnionFind,
    errors: Vec<TypeError>,
    report_arity: bool,
    resolve_remaining: bool,
    debug: Option<SharedDebug>,
}

impl<'p> Solver<'p> {
    pub fn new(
        program: &'p Program,
        set: &'p ConstraintSet,
        options: &CheckOptions,
        debug: Option<SharedDebug>,
    ) -> Self {
        let mut exprs = AHashMap::new();
        let mut order = Vec::new();
        for func in &program.functions {
            walk_function_exprs(func, &mut |e| {
                exprs.insert(e.id, e);
                order.push(e.id);
            });
        }
        Self {
            program,
            set,
            exprs,
            order,
            store: UnionFind::new(),
            errors: Vec::new(),
            report_arity: options.report_arity,
            resolve_remaining: options.resolve_remaining,
            debug,
        }
    }

    pub fn solve(mut self) -> (UnionFind, Vec<TypeError>) {
        self.register();
        self.unify_constraints();

        self.link_calls();
        self.link_derefs();
        self.link_fields();
        if self.resolve_remaining {
            self.resolve_remaining_fields();
        }

        self.check_derefs();
        self.check_pointer_stores();
        self.check_allocs();
        self.check_binary_operands();
        self.check_calls();
        self.check_variable_consistency();

        self.log(1, format!("solved: {} classes, {} errors", self.store.len(), self.errors.len()));
        (self.store, self.errors)
    }

    fn register(&mut self) {
        for c in &self.set.constraints {
            for t in c.operands() {
                self.store.register(&Key::of(t));
            }
        }
    }

    fn unify_constraints(&mut self) {
        let set = self.set;
        for c in &set.constraints {
            for (l, r) in c.pairs() {
                self.unify_reporting(&c.origin, &Key::of(l), &Key::of(r));
            }
        }
    }

    // ---------- unification wrappers ----------

    fn try_unify(&mut self, a: &Key, b: &Key) -> bool {
        if let Some(dbg) = &self.debug {
            dbg.borrow_mut().unify(1, format!("TRY {a} ~ {b}"));
        }
        let ok = self.store.union(a, b);
        if let Some(dbg) = &self.debug {
            let verdict = if ok { "OK" } else { "ERR" };
            dbg.borrow_mut().unify(1, format!("{verdict} {a} ~ {b}"));
        }
        ok
    }

    /// Unify and turn every failure (top-level or propagated) into a conflict at `origin`.
    fn unify_reporting(&mut self, origin: &Origin, a: &Key, b: &Key) -> bool {
        let ok = self.try_unify(a, b);
        if !ok {
            let e = self.conflict(origin, a, b);
            self.report(e);
        }
        for (x, y) in self.store.take_nested_conflicts() {
            let e = self.conflict(origin, &x, &y);
            self.report(e);
        }
        ok
    }

    /// Unify where a failure is diagnosed by a later check instead.
    fn unify_quiet(&mut self, a: &Key, b: &Key) -> bool {
        let ok = self.try_unify(a, b);
        let nested = self.store.take_nested_conflicts();
        if !ok || !nested.is_empty() {
            self.log(2, format!("deferred failure {a} ~ {b} ({} nested)", nested.len()));
        }
        ok
    }

    fn conflict(&self, origin: &Origin, a: &Key, b: &Key) -> TypeError {
        TypeError::UnificationConflict {
            origin: origin.node.kind_name().to_string(),
            function: origin.function.clone(),
            left: self.describe_key(a),
            left_type: self.class_type(a),
            right: self.describe_key(b),
            right_type: self.class_type(b),
            span_offset: origin.span.offset,
            span_len: origin.span.len,
        }
    }

    // ---------- lookups ----------

    fn expr(&self, id: ExprId) -> Option<&'p Expr> {
        self.exprs.get(&id).copied()
    }

    fn source(&self, id: ExprId) -> String {
        self.expr(id).map(print_expr).unwrap_or_else(|| id.to_string())
    }

    fn span(&self, id: ExprId) -> Span {
        self.expr(id).map(|e| e.span).unwrap_or_default()
    }

    fn term(&self, id: ExprId) -> Term {
        self.set.term(id)
    }

    /// Best known type of expression `id`.
    fn type_of(&self, id: ExprId) -> Option<Type> {
        self.store.type_of_term(&self.term(id))
    }

    /// `t` with a top-level deferred reference resolved.
    fn resolve_type(&self, t: &Type) -> Option<Type> {
        match t {
            Type::Deferred(term) => self.store.type_of_term(term),
            t => Some(t.clone()),
        }
    }

    fn render(&self, t: &Type) -> String {
        render_type(&self.store, t)
    }

    fn class_type(&self, key: &Key) -> String {
        match key {
            Key::Term(t) => {
                self.store.type_of_term(t).map_or_else(|| "_".into(), |t| self.render(&t))
            }
            Key::Literal(t) => match self.store.get_type(key) {
                Some(p) => self.render(p),
                None => self.render(t),
            },
        }
    }

    fn describe_term(&self, term: &Term) -> String {
        match term {
            Term::Var { name, .. } | Term::Fun(name) => name.clone(),
            Term::Result(f) => format!("result of {f}"),
            Term::Deref(inner) => format!("*{}", self.describe_term(inner)),
            Term::Field(inner, field) => format!("{}.{field}", self.describe_term(inner)),
            Term::Expr(id) => self.source(*id),
        }
    }

    fn describe_key(&self, key: &Key) -> String {
        match key {
            Key::Term(t) => self.describe_term(t),
            Key::Literal(t) => self.render(t),
        }
    }

    fn report(&mut self, e: TypeError) {
        self.log(1, format!("{}: {e}", e.kind()));
        self.errors.push(e);
    }

    fn log(&self, lvl: usize, msg: impl Into<String>) {
        if let Some(dbg) = &self.debug {
            dbg.borrow_mut().log(1, lvl, msg);
        }
    }

    fn log_link(&self, msg: impl Into<String>) {
        if let Some(dbg) = &self.debug {
            dbg.borrow_mut().link(1, msg);
        }
    }
}
