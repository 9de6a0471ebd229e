//! Store-aware type rendering.
//!
//! Deferred references are replaced by the type their class resolves to. Classes currently
//! being rendered are tracked, so a self-referential type prints `@term` at the point where
//! it loops back instead of recursing.

use crate::types::{Key, Type};
use crate::union_find::UnionFind;

pub fn render_type(store: &UnionFind, ty: &Type) -> String {
    Renderer { store, visiting: Vec::new() }.ty(ty)
}

/// A class key as it appears in group listings.
pub fn render_key(store: &UnionFind, key: &Key) -> String {
    match key {
        Key::Term(t) => t.to_string(),
        Key::Literal(t) => render_type(store, t),
    }
}

struct Renderer<'s> {
    store: &'s UnionFind,
    visiting: Vec<usize>,
}

impl Renderer<'_> {
    fn ty(&mut self, t: &Type) -> String {
        match t {
            Type::Int => "int".into(),
            Type::Pointer(None) => "↑_".into(),
            Type::Pointer(Some(target)) => {
                if self.is_function_like(target) {
                    format!("↑({})", self.ty(target))
                } else {
                    format!("↑{}", self.ty(target))
                }
            }
            Type::Function { params, ret } => {
                let ps = params.iter().map(|p| self.ty(p)).collect::<Vec<_>>().join(", ");
                let r = match ret {
                    Some(r) => self.ty(r),
                    None => "_".into(),
                };
                format!("({ps}) -> {r}")
            }
            Type::Record(fields) => {
                let fs = fields
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", self.ty(v)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{fs}}}")
            }
            Type::Var(tv) => tv.to_string(),
            Type::Recursive { bound, body } => format!("μ{bound}.{}", self.ty(body)),
            Type::Deferred(term) => {
                let Some(root) = self.store.root(&Key::Term(term.clone())) else {
                    return "_".into();
                };
                if self.visiting.contains(&root) {
                    return format!("@{term}");
                }
                let Some(resolved) = self.store.type_of_term(term) else {
                    return "_".into();
                };
                self.visiting.push(root);
                let out = self.ty(&resolved);
                self.visiting.pop();
                out
            }
        }
    }

    fn is_function_like(&self, t: &Type) -> bool {
        match t {
            Type::Deferred(term) => {
                self.store.type_of_term(term).is_some_and(|t| t.is_function_like())
            }
            t => t.is_function_like(),
        }
    }
}
