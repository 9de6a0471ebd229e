//! Class merging for the Union-Find store.
//!
//! - `union`: compatibility check, union by rank, payload substitution, component propagation
//! - `is_compatible`: the structural compatibility predicate (records by field subset)
//! - `contains_tv`: "is anything in here still unknown", used for pointer-target leniency
//!
//! `Deferred` operands are looked up through the store. A class that is already being
//! compared (or scanned) counts as compatible (or variable-free) when it is reached again.

use std::collections::BTreeMap;

use crate::types::{is_type_variable_name, Key, Term, Type};
use crate::union_find::UnionFind;

/// Outcome of merging two payloads: the surviving payload and component pairs still to unify.
struct Merge {
    payload: Option<Type>,
    pairs: Vec<(Key, Key)>,
}

impl Merge {
    fn keep(payload: Option<Type>) -> Self {
        Self { payload, pairs: Vec::new() }
    }
}

impl UnionFind {
    /// Merge the classes of `a` and `b`.
    ///
    /// Returns `false` (leaving both classes untouched) when both carry payloads that are
    /// not compatible. After a merge, corresponding components of the two payloads are
    /// unified as well; failures there are kept for `take_nested_conflicts`.
    pub fn union(&mut self, a: &Key, b: &Key) -> bool {
        let ia = self.register(a);
        let ib = self.register(b);
        let ra = self.find_idx(ia);
        let rb = self.find_idx(ib);
        if ra == rb {
            return true;
        }
        let ta = self.nodes[ra].ty.clone();
        let tb = self.nodes[rb].ty.clone();
        if let (Some(x), Some(y)) = (&ta, &tb) {
            if !self.is_compatible(x, y) {
                return false;
            }
        }
        let merge = self.merge_payloads(ta, tb);
        let (root, child) =
            if self.nodes[ra].rank < self.nodes[rb].rank { (rb, ra) } else { (ra, rb) };
        if self.nodes[ra].rank == self.nodes[rb].rank {
            self.nodes[root].rank += 1;
        }
        self.nodes[child].parent = root;
        self.nodes[root].ty = merge.payload;
        for (x, y) in merge.pairs {
            if !self.union(&x, &y) {
                self.nested.push((x, y));
            }
        }
        true
    }

    fn merge_payloads(&self, a: Option<Type>, b: Option<Type>) -> Merge {
        match (a, b) {
            (None, t) | (t, None) => Merge::keep(t),
            (Some(Type::Var(_)), t) | (t, Some(Type::Var(_))) => Merge::keep(t),
            (Some(x), Some(y)) => self.merge_concrete(x, y),
        }
    }

    fn merge_concrete(&self, x: Type, y: Type) -> Merge {
        match (x, y) {
            (r @ Type::Recursive { .. }, f @ Type::Function { .. })
            | (f @ Type::Function { .. }, r @ Type::Recursive { .. }) => {
                let pairs = component_pairs(r.unwrap_recursive(), &f);
                Merge { payload: Some(r), pairs }
            }
            (Type::Pointer(pa), Type::Pointer(pb)) => match (pa, pb) {
                (None, p) | (p, None) => Merge::keep(Some(Type::Pointer(p))),
                (Some(a), Some(b)) => {
                    let pairs = vec![(Key::of(&a), Key::of(&b))];
                    let target = if self.contains_tv(&a) && !self.contains_tv(&b) { b } else { a };
                    Merge { payload: Some(Type::Pointer(Some(target))), pairs }
                }
            },
            (Type::Record(fa), Type::Record(fb)) => {
                let pairs = component_pairs(&Type::Record(fa.clone()), &Type::Record(fb.clone()));
                let mut fields: BTreeMap<String, Type> = fb;
                fields.extend(fa);
                Merge { payload: Some(Type::Record(fields)), pairs }
            }
            (x, y) => {
                let pairs = component_pairs(&x, &y);
                Merge { payload: Some(x), pairs }
            }
        }
    }

    /// Structural compatibility of two types; never mutates the store.
    pub fn is_compatible(&self, a: &Type, b: &Type) -> bool {
        self.compat(a, b, &mut Vec::new())
    }

    fn compat(&self, a: &Type, b: &Type, seen: &mut Vec<usize>) -> bool {
        if let Type::Deferred(t) = a {
            return self.compat_deferred(t, b, seen);
        }
        if let Type::Deferred(t) = b {
            return self.compat_deferred(t, a, seen);
        }
        match (a, b) {
            (Type::Var(_), _) | (_, Type::Var(_)) => true,
            (Type::Pointer(_), Type::Int) | (Type::Int, Type::Pointer(_)) => false,
            (Type::Recursive { body, .. }, f @ Type::Function { .. })
            | (f @ Type::Function { .. }, Type::Recursive { body, .. }) => {
                self.compat(body, f, seen)
            }
            (Type::Int, Type::Int) => true,
            (Type::Pointer(x), Type::Pointer(y)) => match (x, y) {
                (Some(x), Some(y)) => {
                    self.contains_tv(x) || self.contains_tv(y) || self.compat(x, y, seen)
                }
                _ => true,
            },
            (
                Type::Function { params: p1, ret: r1 },
                Type::Function { params: p2, ret: r2 },
            ) => {
                p1.len() == p2.len()
                    && p1.iter().zip(p2).all(|(x, y)| self.compat(x, y, seen))
                    && match (r1, r2) {
                        (Some(x), Some(y)) => self.compat(x, y, seen),
                        _ => true,
                    }
            }
            (
                Type::Recursive { bound: b1, body: x },
                Type::Recursive { bound: b2, body: y },
            ) => b1 == b2 && self.compat(x, y, seen),
            (Type::Record(f1), Type::Record(f2)) => {
                let subset = f1.keys().all(|k| f2.contains_key(k))
                    || f2.keys().all(|k| f1.contains_key(k));
                subset
                    && f1
                        .iter()
                        .all(|(k, t)| f2.get(k).map_or(true, |u| self.compat(t, u, seen)))
            }
            _ => false,
        }
    }

    fn compat_deferred(&self, term: &Term, other: &Type, seen: &mut Vec<usize>) -> bool {
        let Some(root) = self.root(&Key::Term(term.clone())) else { return true };
        if seen.contains(&root) {
            return true;
        }
        let Some(ty) = self.payload_at(root) else { return true };
        seen.push(root);
        let ok = self.compat(ty, other, seen);
        seen.pop();
        ok
    }

    /// Whether `t` still contains an unresolved type variable anywhere.
    pub fn contains_tv(&self, t: &Type) -> bool {
        self.contains_tv_in(t, &mut Vec::new())
    }

    fn contains_tv_in(&self, t: &Type, seen: &mut Vec<usize>) -> bool {
        match t {
            Type::Var(_) => true,
            Type::Int | Type::Pointer(None) => false,
            Type::Pointer(Some(target)) => self.contains_tv_in(target, seen),
            Type::Function { params, ret } => {
                params.iter().any(|p| self.contains_tv_in(p, seen))
                    || ret.as_deref().is_some_and(|r| self.contains_tv_in(r, seen))
            }
            Type::Record(fields) => fields.values().any(|f| self.contains_tv_in(f, seen)),
            Type::Recursive { body, .. } => self.contains_tv_in(body, seen),
            Type::Deferred(term) => {
                if let Term::Var { name, .. } = term {
                    if is_type_variable_name(name) {
                        return true;
                    }
                }
                let Some(root) = self.root(&Key::Term(term.clone())) else { return true };
                if seen.contains(&root) {
                    return false;
                }
                let Some(ty) = self.payload_at(root) else { return true };
                seen.push(root);
                let found = self.contains_tv_in(ty, seen);
                seen.pop();
                found
            }
        }
    }
}

/// Corresponding sub-types of two compatible payloads.
fn component_pairs(x: &Type, y: &Type) -> Vec<(Key, Key)> {
    let mut out = Vec::new();
    match (x, y) {
        (Type::Pointer(Some(a)), Type::Pointer(Some(b))) => out.push((Key::of(a), Key::of(b))),
        (Type::Function { params: p1, ret: r1 }, Type::Function { params: p2, ret: r2 }) => {
            out.extend(p1.iter().zip(p2).map(|(a, b)| (Key::of(a), Key::of(b))));
            if let (Some(a), Some(b)) = (r1, r2) {
                out.push((Key::of(a), Key::of(b)));
            }
        }
        (Type::Recursive { body: a, .. }, Type::Recursive { body: b, .. }) => {
            out.extend(component_pairs(a, b));
        }
        (Type::Record(fa), Type::Record(fb)) => {
            for (k, a) in fa {
                if let Some(b) = fb.get(k) {
                    out.push((Key::of(a), Key::of(b)));
                }
            }
        }
        _ => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TvId;

    fn var(name: &str) -> Key {
        Key::Term(Term::var("main", name))
    }

    #[test]
    fn variable_payload_is_substituted() {
        let mut uf = UnionFind::new();
        uf.make_set(var("x"), Some(Type::Var(TvId(0))));
        assert!(uf.union(&var("x"), &Key::Literal(Type::Int)));
        assert_eq!(uf.get_type(&var("x")), Some(&Type::Int));
    }

    #[test]
    fn failed_union_leaves_classes_apart() {
        let mut uf = UnionFind::new();
        assert!(uf.union(&var("x"), &Key::Literal(Type::Int)));
        assert!(!uf.union(&var("x"), &Key::Literal(Type::Pointer(None))));
        assert!(!uf.same_class(&var("x"), &Key::Literal(Type::Pointer(None))));
        assert_eq!(uf.get_type(&var("x")), Some(&Type::Int));
    }

    #[test]
    fn pointer_merge_propagates_to_targets() {
        let mut uf = UnionFind::new();
        let to_a = Type::pointer(Type::deferred(Term::var("main", "a")));
        let to_b = Type::pointer(Type::deferred(Term::var("main", "b")));
        uf.union(&var("a"), &Key::Literal(Type::Int));
        assert!(uf.union(&Key::of(&to_a), &Key::of(&to_b)));
        assert!(uf.same_class(&var("a"), &var("b")));
        assert_eq!(uf.get_type(&var("b")), Some(&Type::Int));
    }

    #[test]
    fn recursive_wrapper_survives_function_merge() {
        let mut uf = UnionFind::new();
        let f = Type::function(vec![Type::Int], Type::Int);
        let rec = Type::Recursive { bound: TvId(0), body: Box::new(f.clone()) };
        assert!(uf.union(&Key::Literal(f), &Key::Literal(rec.clone())));
        assert_eq!(uf.get_type(&Key::Literal(rec.clone())), Some(&rec));
    }

    #[test]
    fn record_merge_widens_fields() {
        let mut uf = UnionFind::new();
        let narrow = Type::Record([("x".to_string(), Type::Int)].into());
        let wide = Type::Record(
            [("x".to_string(), Type::Int), ("y".to_string(), Type::Pointer(None))].into(),
        );
        assert!(uf.union(&Key::Literal(narrow.clone()), &Key::Literal(wide.clone())));
        assert_eq!(uf.get_type(&Key::Literal(narrow)), Some(&wide));
    }
}
