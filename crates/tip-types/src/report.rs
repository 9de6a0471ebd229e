//! Query surface over a finished type-check run.

use ahash::AHashMap;
use serde::Serialize;
use tip_ast::ast::ExprId;

use crate::constraint::Constraint;
use crate::display::{render_key, render_type};
use crate::error::TypeError;
use crate::types::{Key, Term, Type};
use crate::union_find::UnionFind;

/// Everything a run produces: constraints, the populated store and the error list.
#[derive(Debug, Clone)]
pub struct TypeCheck {
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) store: UnionFind,
    pub(crate) errors: Vec<TypeError>,
    pub(crate) terms: AHashMap<ExprId, Term>,
    pub(crate) functions: Vec<String>,
    pub(crate) logs: Vec<String>,
}

/// One rendered equivalence class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub members: Vec<String>,
    pub ty: Option<String>,
}

impl TypeCheck {
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn store(&self) -> &UnionFind {
        &self.store
    }

    pub fn errors(&self) -> &[TypeError] {
        &self.errors
    }

    pub fn is_well_typed(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn debug_logs(&self) -> &[String] {
        &self.logs
    }

    /// Names of the checked functions, in declaration order.
    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    pub fn term_of(&self, id: ExprId) -> Term {
        self.terms.get(&id).cloned().unwrap_or(Term::Expr(id))
    }

    pub fn type_of_term(&self, term: &Term) -> Option<Type> {
        self.store.type_of_term(term)
    }

    pub fn type_of_expr(&self, id: ExprId) -> Option<Type> {
        self.type_of_term(&self.term_of(id))
    }

    pub fn type_of_var(&self, func: &str, name: &str) -> Option<Type> {
        self.type_of_term(&Term::var(func, name))
    }

    pub fn type_of_function(&self, name: &str) -> Option<Type> {
        self.type_of_term(&Term::Fun(name.to_string()))
    }

    pub fn render(&self, ty: &Type) -> String {
        render_type(&self.store, ty)
    }

    /// `render(type_of_var(..))`, with `_` for unknown.
    pub fn render_var(&self, func: &str, name: &str) -> String {
        self.type_of_var(func, name).map_or_else(|| "_".into(), |t| self.render(&t))
    }

    pub fn render_expr(&self, id: ExprId) -> String {
        self.type_of_expr(id).map_or_else(|| "_".into(), |t| self.render(&t))
    }

    /// Rendered equivalence classes, in first-registration order.
    pub fn groups(&self) -> Vec<Group> {
        self.store
            .groups()
            .into_iter()
            .map(|(ty, members)| Group {
                members: members.into_iter().map(|k| render_key(&self.store, k)).collect(),
                ty: ty.map(|t| self.render(t)),
            })
            .collect()
    }

    /// Whether two terms ended up in the same class.
    pub fn same_class(&self, a: &Term, b: &Term) -> bool {
        self.store.same_class(&Key::Term(a.clone()), &Key::Term(b.clone()))
    }
}
