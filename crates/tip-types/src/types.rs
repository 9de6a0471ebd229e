//! Core type representations for the TIP type checker.
//!
//! - `TvId` / `TvGen`: type variables and their Greek-letter names
//! - `Type`: the closed set of type shapes carried by equivalence classes
//! - `Term`: identity of "the type of this program position" (variables, results, expressions)
//! - `Key`: what the Union-Find store is keyed by (a term, or a literal type)

use serde::Serialize;
use std::collections::BTreeMap;
use tip_ast::ast::ExprId;

const GREEK: [char; 24] = [
    'α', 'β', 'γ', 'δ', 'ε', 'ζ', 'η', 'θ', 'ι', 'κ', 'λ', 'μ', 'ν', 'ξ', 'ο', 'π', 'ρ', 'σ',
    'τ', 'υ', 'φ', 'χ', 'ψ', 'ω',
];

/// Type variable identifier. Displays as `α`, `β`, ... then `α1`, `β1`, ... after wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TvId(pub u32);

impl std::fmt::Display for TvId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self.0 as usize;
        let letter = GREEK[n % GREEK.len()];
        match n / GREEK.len() {
            0 => write!(f, "{letter}"),
            round => write!(f, "{letter}{round}"),
        }
    }
}

/// True when `name` follows the type-variable naming convention (leading Greek letter).
pub fn is_type_variable_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| GREEK.contains(&c))
}

/// Type variable generator; one per type-check run.
#[derive(Debug, Default)]
pub struct TvGen {
    next: u32,
}

impl TvGen {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn fresh_id(&mut self) -> TvId {
        let id = TvId(self.next);
        self.next += 1;
        id
    }

    pub fn fresh(&mut self) -> Type {
        Type::Var(self.fresh_id())
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// Identity of a typed program position.
///
/// Identifiers resolve to `Var` (per-function flat scope) or `Fun` (declared function name).
/// Dereferences and field accesses are structural so that every `*p` in a function denotes
/// the same cell; every other expression is its own occurrence, keyed by `ExprId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Term {
    Var { func: String, name: String },
    Fun(String),
    /// Return value of the named function.
    Result(String),
    Deref(Box<Term>),
    Field(Box<Term>, String),
    Expr(ExprId),
}

impl Term {
    pub fn var(func: &str, name: &str) -> Term {
        Term::Var { func: func.to_string(), name: name.to_string() }
    }

    pub fn deref(inner: Term) -> Term {
        Term::Deref(Box::new(inner))
    }

    pub fn field(record: Term, field: &str) -> Term {
        Term::Field(Box::new(record), field.to_string())
    }

    /// Number of structural layers (`*`, `.f`) above the base term.
    pub fn depth(&self) -> usize {
        match self {
            Term::Deref(inner) | Term::Field(inner, _) => 1 + inner.depth(),
            _ => 0,
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Var { name, .. } => write!(f, "{name}"),
            Term::Fun(name) => write!(f, "{name}"),
            Term::Result(name) => write!(f, "result({name})"),
            Term::Deref(inner) => write!(f, "*{inner}"),
            Term::Field(inner, field) => write!(f, "{inner}.{field}"),
            Term::Expr(id) => write!(f, "{id}"),
        }
    }
}

/// Type shapes. Every consumer matches exhaustively over this closed set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Type {
    Int,
    /// `None` target: points to an unconstrained type.
    Pointer(Option<Box<Type>>),
    Function { params: Vec<Type>, ret: Option<Box<Type>> },
    Record(BTreeMap<String, Type>),
    Var(TvId),
    /// `μα.body`, used for self-recursive functions.
    Recursive { bound: TvId, body: Box<Type> },
    /// The type eventually assigned to `Term`; resolved through the store.
    Deferred(Term),
}

/// Top-level variant tag, used by the shallow checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TypeTag {
    Int,
    Pointer,
    Function,
    Record,
    Var,
    Recursive,
    Deferred,
}

impl TypeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Int => "int",
            TypeTag::Pointer => "pointer",
            TypeTag::Function => "function",
            TypeTag::Record => "record",
            TypeTag::Var => "type variable",
            TypeTag::Recursive => "recursive function",
            TypeTag::Deferred => "deferred",
        }
    }

    /// Recursive types are functions for every shallow comparison.
    pub fn normalized(self) -> TypeTag {
        match self {
            TypeTag::Recursive => TypeTag::Function,
            t => t,
        }
    }
}

impl Type {
    pub fn pointer(target: Type) -> Type {
        Type::Pointer(Some(Box::new(target)))
    }

    pub fn function(params: Vec<Type>, ret: Type) -> Type {
        Type::Function { params, ret: Some(Box::new(ret)) }
    }

    pub fn deferred(term: Term) -> Type {
        Type::Deferred(term)
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            Type::Int => TypeTag::Int,
            Type::Pointer(_) => TypeTag::Pointer,
            Type::Function { .. } => TypeTag::Function,
            Type::Record(_) => TypeTag::Record,
            Type::Var(_) => TypeTag::Var,
            Type::Recursive { .. } => TypeTag::Recursive,
            Type::Deferred(_) => TypeTag::Deferred,
        }
    }

    /// Concrete means neither a bare type variable nor an unresolved reference.
    pub fn is_concrete(&self) -> bool {
        !matches!(self, Type::Var(_) | Type::Deferred(_))
    }

    pub fn is_function_like(&self) -> bool {
        matches!(self, Type::Function { .. } | Type::Recursive { .. })
    }

    /// The `Function` inside a `Recursive` wrapper, or `self`.
    pub fn unwrap_recursive(&self) -> &Type {
        match self {
            Type::Recursive { body, .. } => body.unwrap_recursive(),
            t => t,
        }
    }
}

/// Union-Find key: either a program term, or a literal type appearing in a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Key {
    Term(Term),
    Literal(Type),
}

impl Key {
    /// `Deferred(t)` operands are keyed by their term; every other type is its own literal.
    pub fn of(ty: &Type) -> Key {
        match ty {
            Type::Deferred(t) => Key::Term(t.clone()),
            t => Key::Literal(t.clone()),
        }
    }

    /// Payload a fresh set for this key starts with.
    pub fn initial_payload(&self) -> Option<Type> {
        match self {
            Key::Term(_) => None,
            Key::Literal(t) => Some(t.clone()),
        }
    }

    pub fn as_term(&self) -> Option<&Term> {
        match self {
            Key::Term(t) => Some(t),
            Key::Literal(_) => None,
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Term(t) => write!(f, "{t}"),
            Key::Literal(t) => write!(f, "{t}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greek_names_wrap_with_suffix() {
        assert_eq!(TvId(0).to_string(), "α");
        assert_eq!(TvId(23).to_string(), "ω");
        assert_eq!(TvId(24).to_string(), "α1");
        assert!(is_type_variable_name("β3"));
        assert!(!is_type_variable_name("beta"));
    }

    #[test]
    fn deferred_operands_key_by_term() {
        let t = Term::var("main", "x");
        assert_eq!(Key::of(&Type::deferred(t.clone())), Key::Term(t));
        assert_eq!(Key::of(&Type::Int), Key::Literal(Type::Int));
        assert_eq!(Key::Literal(Type::Int).initial_payload(), Some(Type::Int));
    }

    #[test]
    fn reset_restarts_naming() {
        let mut g = TvGen::new();
        g.fresh();
        g.fresh();
        g.reset();
        assert_eq!(g.fresh(), Type::Var(TvId(0)));
    }
}
