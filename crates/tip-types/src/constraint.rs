//! Typing constraints and the collected constraint set.

use ahash::AHashMap;
use serde::Serialize;
use tip_ast::ast::{BinOp, ExprId};
use tip_ast::span::Span;

use crate::types::{Term, Type};

/// A call expression as the linking passes and checks need to see it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallSite {
    pub call: ExprId,
    pub callee_expr: ExprId,
    /// Set when the callee is a bare reference to a declared function.
    pub callee: Option<String>,
    pub args: Vec<ExprId>,
}

/// The AST construct a constraint was generated for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    Number(ExprId),
    Input(ExprId),
    Null(ExprId),
    Binary { expr: ExprId, op: BinOp, left: ExprId, right: ExprId },
    Alloc { expr: ExprId, arg: ExprId },
    AddressOf { expr: ExprId, var: String },
    Record { expr: ExprId, fields: Vec<(String, ExprId)> },
    FieldAccess { expr: ExprId, record: ExprId, field: String },
    Call(CallSite),
    Assign { target: String, value: ExprId },
    Store { pointer: ExprId, value: ExprId },
    Output(ExprId),
    Condition(ExprId),
    Return(ExprId),
    Function(String),
    Uninitialized(String),
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Number(_) => "number",
            Node::Input(_) => "input",
            Node::Null(_) => "null",
            Node::Binary { .. } => "binary expression",
            Node::Alloc { .. } => "alloc",
            Node::AddressOf { .. } => "address-of",
            Node::Record { .. } => "record",
            Node::FieldAccess { .. } => "field access",
            Node::Call(_) => "call",
            Node::Assign { .. } => "assignment",
            Node::Store { .. } => "pointer store",
            Node::Output(_) => "output",
            Node::Condition(_) => "condition",
            Node::Return(_) => "return",
            Node::Function(_) => "function declaration",
            Node::Uninitialized(_) => "uninitialized local",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Origin {
    pub function: String,
    pub span: Span,
    pub node: Node,
}

/// `left[i]` must unify with `right[i % right.len()]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constraint {
    pub origin: Origin,
    pub left: Vec<Type>,
    pub right: Vec<Type>,
}

impl Constraint {
    pub fn new(origin: Origin, left: Type, right: Type) -> Self {
        Self { origin, left: vec![left], right: vec![right] }
    }

    /// Positional operand pairs, cycling the shorter right side.
    pub fn pairs(&self) -> impl Iterator<Item = (&Type, &Type)> + '_ {
        let n = self.right.len();
        self.left
            .iter()
            .enumerate()
            .filter(move |_| n > 0)
            .map(move |(i, l)| (l, &self.right[i % n]))
    }

    pub fn operands(&self) -> impl Iterator<Item = &Type> + '_ {
        self.left.iter().chain(self.right.iter())
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let side = |ts: &[Type]| ts.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ");
        write!(
            f,
            "[{} in {}] {} ~ {}",
            self.origin.node.kind_name(),
            self.origin.function,
            side(&self.left),
            side(&self.right)
        )
    }
}

/// Collector output: constraints in collection order plus the term of every expression.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    pub constraints: Vec<Constraint>,
    pub terms: AHashMap<ExprId, Term>,
}

impl ConstraintSet {
    pub fn term(&self, id: ExprId) -> Term {
        self.terms.get(&id).cloned().unwrap_or(Term::Expr(id))
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorter_right_side_cycles() {
        let origin = Origin {
            function: "main".into(),
            span: Span::default(),
            node: Node::Function("main".into()),
        };
        let c = Constraint {
            origin,
            left: vec![Type::Int, Type::Pointer(None), Type::Int],
            right: vec![Type::Int, Type::Pointer(None)],
        };
        let pairs: Vec<_> = c.pairs().map(|(_, r)| r.clone()).collect();
        assert_eq!(pairs, vec![Type::Int, Type::Pointer(None), Type::Int]);
    }
}
