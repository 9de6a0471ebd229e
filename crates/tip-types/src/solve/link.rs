//! Linking passes run after the main unification loop.
//!
//! - call sites to the callee's result and return expression
//! - arguments to parameters (plus the arity check)
//! - dereferences to the pointee of their operand
//! - field accesses to the field types of the accessed record
//! - leftover field-access variables to resolved field types

use ahash::{AHashMap, AHashSet};
use tip_ast::ast::{ExprId, ExprKind};

use super::Solver;
use crate::constraint::Node;
use crate::error::TypeError;
use crate::types::{Key, Term, Type};

impl Solver<'_> {
    pub(super) fn link_calls(&mut self) {
        let set = self.set;
        let program = self.program;
        for c in &set.constraints {
            let Node::Call(site) = &c.origin.node else { continue };
            let Some(name) = &site.callee else { continue };
            let Some(func) = program.function(name) else { continue };

            let call = Key::Term(Term::Expr(site.call));
            let result = Key::Term(Term::Result(name.clone()));
            self.log_link(format!("call {} ~ {}", call, result));
            self.unify_reporting(&c.origin, &call, &result);
            let ret = Key::Term(self.term(func.ret.id));
            self.log_link(format!("call {} ~ return {}", call, ret));
            self.unify_reporting(&c.origin, &call, &ret);

            // mismatches here are reported by the call check with both types at hand
            for (param, arg) in func.params.iter().zip(&site.args) {
                let p = Key::Term(Term::var(name, param));
                let a = Key::Term(self.term(*arg));
                self.log_link(format!("argument {} ~ {}", p, a));
                self.unify_quiet(&p, &a);
            }
            if self.report_arity && func.params.len() != site.args.len() {
                let span = self.span(site.call);
                self.report(TypeError::ArityMismatch {
                    callee: name.clone(),
                    expected: func.params.len(),
                    found: site.args.len(),
                    span_offset: span.offset,
                    span_len: span.len,
                });
            }
        }
    }

    /// Unify every `*e` with the target of `e`'s pointer type, innermost first.
    pub(super) fn link_derefs(&mut self) {
        let mut seen = AHashSet::new();
        let mut derefs: Vec<Term> = Vec::new();
        let from_constraints = self.set.constraints.iter().flat_map(|c| c.operands()).filter_map(
            |t| match t {
                Type::Deferred(d @ Term::Deref(_)) => Some(d.clone()),
                _ => None,
            },
        );
        let from_exprs =
            self.order.iter().map(|id| self.term(*id)).filter(|t| matches!(t, Term::Deref(_)));
        for d in from_constraints.chain(from_exprs) {
            if seen.insert(d.clone()) {
                derefs.push(d);
            }
        }
        derefs.sort_by_key(Term::depth);

        for d in derefs {
            let Term::Deref(inner) = &d else { continue };
            let Some(Type::Pointer(Some(target))) = self.store.type_of_term(inner) else {
                continue;
            };
            let cell = Key::Term(d.clone());
            let pointee = Key::of(&target);
            self.log_link(format!("dereference {} ~ {}", cell, pointee));
            self.unify_quiet(&cell, &pointee);
        }
    }

    pub(super) fn link_fields(&mut self) {
        let set = self.set;
        // record literals bound to a variable by a direct assignment
        let mut bound: AHashMap<(&str, &str), Vec<Vec<(String, ExprId)>>> = AHashMap::new();
        for c in &set.constraints {
            let Node::Assign { target, value } = &c.origin.node else { continue };
            let Some(ExprKind::Record(fields)) = self.expr(*value).map(|e| &e.kind) else {
                continue;
            };
            let fields = fields.iter().map(|(k, v)| (k.clone(), v.id)).collect();
            bound.entry((c.origin.function.as_str(), target.as_str())).or_default().push(fields);
        }

        for c in &set.constraints {
            let Node::FieldAccess { expr, record, field } = &c.origin.node else { continue };
            let access = Key::Term(self.term(*expr));
            let var = self.expr(*record).and_then(|e| e.as_ident());
            let literals = var.and_then(|v| bound.get(&(c.origin.function.as_str(), v)));

            if let Some(literals) = literals {
                let mut found = false;
                for value in literals.iter().flat_map(|l| l.iter()).filter(|(k, _)| k == field) {
                    found = true;
                    let v = Key::Term(self.term(value.1));
                    self.log_link(format!("field {} ~ {}", access, v));
                    self.unify_reporting(&c.origin, &access, &v);
                    self.default_numeric_field(value.1);
                }
                if !found {
                    let e = self.missing_field(*record, field);
                    self.report(e);
                }
                continue;
            }

            match self.type_of(*record) {
                Some(Type::Record(fields)) => match fields.get(field) {
                    Some(ft) => {
                        let f = Key::of(ft);
                        self.log_link(format!("field {} ~ {}", access, f));
                        self.unify_reporting(&c.origin, &access, &f);
                    }
                    None => {
                        let e = self.missing_field(*record, field);
                        self.report(e);
                    }
                },
                Some(t) if t.is_concrete() => {
                    let e = self.missing_field(*record, field);
                    self.report(e);
                }
                _ => self.log(2, format!("field access {} on an unresolved value", access)),
            }
        }
    }

    /// Field accesses still without a concrete type take the resolved field type.
    pub(super) fn resolve_remaining_fields(&mut self) {
        let set = self.set;
        for c in &set.constraints {
            let Node::FieldAccess { expr, record, field } = &c.origin.node else { continue };
            let access = Key::Term(self.term(*expr));
            let known = self
                .store
                .get_type(&access)
                .and_then(|t| self.store.resolve(t))
                .is_some_and(Type::is_concrete);
            if known {
                continue;
            }
            let Some(Type::Record(fields)) = self.type_of(*record) else { continue };
            let Some(ft) = fields.get(field) else { continue };
            let resolved = match self.resolve_type(ft).filter(Type::is_concrete) {
                Some(t) => t,
                None if self.is_number_literal(ft) => Type::Int,
                None => continue,
            };
            self.log_link(format!("resolve {} := {}", access, resolved));
            self.store.refine(&access, resolved.clone());
            for r in c.right.iter().filter(|r| matches!(r, Type::Var(_))) {
                self.store.refine(&Key::of(r), resolved.clone());
            }
        }
    }

    fn default_numeric_field(&mut self, value: ExprId) {
        let key = Key::Term(self.term(value));
        let known = self.store.get_type(&key).is_some_and(Type::is_concrete);
        if !known && matches!(self.expr(value).map(|e| &e.kind), Some(ExprKind::Number(_))) {
            self.store.refine(&key, Type::Int);
        }
    }

    fn is_number_literal(&self, t: &Type) -> bool {
        match t {
            Type::Deferred(Term::Expr(id)) => {
                matches!(self.expr(*id).map(|e| &e.kind), Some(ExprKind::Number(_)))
            }
            _ => false,
        }
    }

    fn missing_field(&self, record: ExprId, field: &str) -> TypeError {
        let span = self.span(record);
        TypeError::MissingField {
            record: self.source(record),
            record_type: self.type_of(record).map_or_else(|| "record".into(), |t| self.render(&t)),
            field: field.to_string(),
            span_offset: span.offset,
            span_len: span.len,
        }
    }
}
