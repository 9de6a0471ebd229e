//! Structural checks over the solved store. Each check scans the constraint list once.

use ahash::{AHashMap, AHashSet};
use tip_ast::ast::{ExprId, ExprKind};
use tip_ast::span::Span;
use tip_ast::visit::walk_expr;

use super::Solver;
use crate::constraint::Node;
use crate::error::TypeError;
use crate::types::{Term, Type, TypeTag};

impl Solver<'_> {
    /// `*e` needs `e` to be a pointer, at every nesting level.
    pub(super) fn check_derefs(&mut self) {
        let set = self.set;
        let mut reported = AHashSet::new();
        for c in &set.constraints {
            let (roots, target) = match &c.origin.node {
                Node::Assign { value, .. } => (vec![*value], None),
                Node::Store { pointer, value } => (vec![*pointer, *value], Some(*pointer)),
                Node::Return(e) | Node::Output(e) | Node::Condition(e) => (vec![*e], None),
                _ => continue,
            };
            let mut operands = Vec::new();
            for root in roots {
                let Some(e) = self.expr(root) else { continue };
                walk_expr(e, &mut |sub| {
                    if let ExprKind::Deref(inner) = &sub.kind {
                        operands.push(inner.id);
                    }
                });
            }
            operands.extend(target);
            for id in operands {
                if !reported.insert(id) {
                    continue;
                }
                let Some(found) = self.type_of(id).filter(Type::is_concrete) else { continue };
                if !matches!(found, Type::Pointer(_)) {
                    let span = self.span(id);
                    self.report(TypeError::DereferenceOfNonPointer {
                        expr: self.source(id),
                        found: self.render(&found),
                        span_offset: span.offset,
                        span_len: span.len,
                    });
                }
            }
        }
    }

    /// `*p = v`: the tag of `p`'s target must match the tag of `v`.
    pub(super) fn check_pointer_stores(&mut self) {
        let set = self.set;
        for c in &set.constraints {
            let Node::Store { pointer, value } = &c.origin.node else { continue };
            let Some(Type::Pointer(Some(target))) = self.type_of(*pointer) else { continue };
            let Some(expected) = self.resolve_type(&target).filter(Type::is_concrete) else {
                continue;
            };
            let Some(found) = self.type_of(*value).filter(Type::is_concrete) else { continue };
            if expected.tag().normalized() != found.tag().normalized() {
                self.report(TypeError::PointerStoreMismatch {
                    pointer: self.source(*pointer),
                    value: self.source(*value),
                    expected: self.render(&expected),
                    found: self.render(&found),
                    span_offset: c.origin.span.offset,
                    span_len: c.origin.span.len,
                });
            }
        }
    }

    pub(super) fn check_allocs(&mut self) {
        let set = self.set;
        for c in &set.constraints {
            let Node::Alloc { arg, .. } = &c.origin.node else { continue };
            let Some(found) = self.type_of(*arg).filter(Type::is_concrete) else { continue };
            if found != Type::Int {
                let span = self.span(*arg);
                self.report(TypeError::InvalidAllocArgument {
                    expr: self.source(*arg),
                    found: self.render(&found),
                    span_offset: span.offset,
                    span_len: span.len,
                });
            }
        }
    }

    pub(super) fn check_binary_operands(&mut self) {
        let set = self.set;
        for c in &set.constraints {
            let Node::Binary { op, left, right, .. } = &c.origin.node else { continue };
            for operand in [*left, *right] {
                let Some(found) = self.operand_type(operand) else { continue };
                if found != Type::Int {
                    let span = self.span(operand);
                    self.report(TypeError::NonIntegerOperand {
                        op: op.symbol().to_string(),
                        operand: self.source(operand),
                        found: self.render(&found),
                        span_offset: span.offset,
                        span_len: span.len,
                    });
                }
            }
        }
    }

    /// Concrete type of a binary operand; a direct call is typed by the callee's result.
    fn operand_type(&self, id: ExprId) -> Option<Type> {
        if let Some(ExprKind::Call { callee, .. }) = self.expr(id).map(|e| &e.kind) {
            if let Term::Fun(name) = self.term(callee.id) {
                let result = self.store.type_of_term(&Term::Result(name));
                if let Some(t) = result.filter(Type::is_concrete) {
                    return Some(t);
                }
            }
        }
        self.type_of(id).filter(Type::is_concrete)
    }

    /// The callee must be a function, and each argument must fit its parameter.
    pub(super) fn check_calls(&mut self) {
        let set = self.set;
        for c in &set.constraints {
            let Node::Call(site) = &c.origin.node else { continue };
            let Some(callee_ty) = self.type_of(site.callee_expr).filter(Type::is_concrete) else {
                continue;
            };
            let callee = site.callee.clone().unwrap_or_else(|| self.source(site.callee_expr));
            let Type::Function { params, .. } = callee_ty.unwrap_recursive() else {
                let span = self.span(site.callee_expr);
                self.report(TypeError::NotCallable {
                    callee,
                    found: self.render(&callee_ty),
                    span_offset: span.offset,
                    span_len: span.len,
                });
                continue;
            };
            for (i, (param, arg)) in params.iter().zip(&site.args).enumerate() {
                let Some(expected) = self.resolve_type(param).filter(Type::is_concrete) else {
                    continue;
                };
                let Some(found) = self.type_of(*arg).filter(Type::is_concrete) else { continue };
                if !self.store.is_compatible(&expected, &found) {
                    let span = self.span(*arg);
                    self.report(TypeError::ArgumentTypeMismatch {
                        callee: callee.clone(),
                        index: i + 1,
                        arg: self.source(*arg),
                        expected: self.render(&expected),
                        found: self.render(&found),
                        span_offset: span.offset,
                        span_len: span.len,
                    });
                }
            }
        }
    }

    /// All direct assignments to one variable must agree on the kind of value.
    pub(super) fn check_variable_consistency(&mut self) {
        let set = self.set;
        let mut order: Vec<(&str, &str)> = Vec::new();
        let mut seen: AHashMap<(&str, &str), (Vec<TypeTag>, Option<Span>)> = AHashMap::new();
        for c in &set.constraints {
            let Node::Assign { target, value } = &c.origin.node else { continue };
            let Some(tag) = self.value_tag(*value) else { continue };
            let key = (c.origin.function.as_str(), target.as_str());
            let entry = seen.entry(key).or_insert_with(|| {
                order.push(key);
                (Vec::new(), None)
            });
            if !entry.0.contains(&tag) {
                if !entry.0.is_empty() && entry.1.is_none() {
                    entry.1 = Some(c.origin.span);
                }
                entry.0.push(tag);
            }
        }
        for key in order {
            let Some((tags, Some(span))) = seen.get(&key) else { continue };
            self.report(TypeError::InconsistentVariableType {
                function: key.0.to_string(),
                var: key.1.to_string(),
                kinds: tags.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", "),
                span_offset: span.offset,
                span_len: span.len,
            });
        }
    }

    /// Kind of an assigned value: syntactic where the expression decides it, else resolved.
    fn value_tag(&self, id: ExprId) -> Option<TypeTag> {
        match self.expr(id).map(|e| &e.kind) {
            Some(ExprKind::AddressOf(_) | ExprKind::Alloc(_) | ExprKind::Null) => {
                Some(TypeTag::Pointer)
            }
            Some(ExprKind::Binary { .. } | ExprKind::Number(_) | ExprKind::Input) => {
                Some(TypeTag::Int)
            }
            Some(ExprKind::Record(_)) => Some(TypeTag::Record),
            _ => self.type_of(id).filter(Type::is_concrete).map(|t| t.tag().normalized()),
        }
    }
}
