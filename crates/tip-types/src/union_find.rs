//! Disjoint-set store over `Key`s with an optional type payload per class.
//!
//! Registration, `find` with path compression, payload access and the reporting helpers
//! live here; merging and the compatibility predicate are in `unification`.

use ahash::AHashMap;

use crate::types::{Key, Term, Type};

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) key: Key,
    pub(crate) parent: usize,
    pub(crate) rank: u32,
    pub(crate) ty: Option<Type>,
}

/// Union-Find store, created fresh for every type-check run.
#[derive(Debug, Clone, Default)]
pub struct UnionFind {
    pub(crate) nodes: Vec<Node>,
    pub(crate) index: AHashMap<Key, usize>,
    // component pairs that failed while propagating a successful merge
    pub(crate) nested: Vec<(Key, Key)>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Register `key` with payload `ty`. Re-registering an existing key overwrites the
    /// payload of its class root.
    pub fn make_set(&mut self, key: Key, ty: Option<Type>) -> usize {
        if let Some(&idx) = self.index.get(&key) {
            let root = self.find_idx(idx);
            self.nodes[root].ty = ty;
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(Node { key: key.clone(), parent: idx, rank: 0, ty });
        self.index.insert(key, idx);
        idx
    }

    /// Register `key` unless present. Literal keys start out carrying their own type.
    pub fn register(&mut self, key: &Key) -> usize {
        match self.index.get(key) {
            Some(&idx) => idx,
            None => self.make_set(key.clone(), key.initial_payload()),
        }
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.index.contains_key(key)
    }

    /// Root of `key`'s class. Unseen keys become untyped singletons.
    pub fn find(&mut self, key: &Key) -> usize {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => self.make_set(key.clone(), None),
        };
        self.find_idx(idx)
    }

    pub(crate) fn find_idx(&mut self, idx: usize) -> usize {
        let mut root = idx;
        while self.nodes[root].parent != root {
            root = self.nodes[root].parent;
        }
        let mut cur = idx;
        while self.nodes[cur].parent != root && cur != root {
            let next = self.nodes[cur].parent;
            self.nodes[cur].parent = root;
            cur = next;
        }
        root
    }

    /// Read-only root lookup (no compression, no auto-creation).
    pub fn root(&self, key: &Key) -> Option<usize> {
        let mut cur = *self.index.get(key)?;
        while self.nodes[cur].parent != cur {
            cur = self.nodes[cur].parent;
        }
        Some(cur)
    }

    /// Parent links between `key` and its root; 0 or 1 right after a `find`.
    pub fn path_len(&self, key: &Key) -> Option<usize> {
        let mut cur = *self.index.get(key)?;
        let mut hops = 0;
        while self.nodes[cur].parent != cur {
            cur = self.nodes[cur].parent;
            hops += 1;
        }
        Some(hops)
    }

    pub fn same_class(&self, a: &Key, b: &Key) -> bool {
        match (self.root(a), self.root(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    pub fn key_at(&self, idx: usize) -> &Key {
        &self.nodes[idx].key
    }

    pub fn get_type(&self, key: &Key) -> Option<&Type> {
        let root = self.root(key)?;
        self.nodes[root].ty.as_ref()
    }

    pub(crate) fn payload_at(&self, root: usize) -> Option<&Type> {
        self.nodes[root].ty.as_ref()
    }

    /// Overwrite the payload of `key`'s class.
    pub fn refine(&mut self, key: &Key, ty: Type) {
        let root = self.find(key);
        self.nodes[root].ty = Some(ty);
    }

    /// Failed component unifications collected since the last call.
    pub fn take_nested_conflicts(&mut self) -> Vec<(Key, Key)> {
        std::mem::take(&mut self.nested)
    }

    /// Full partition, one entry per class in first-registration order.
    pub fn groups(&self) -> Vec<(Option<&Type>, Vec<&Key>)> {
        let mut order: Vec<usize> = Vec::new();
        let mut members: AHashMap<usize, Vec<&Key>> = AHashMap::new();
        for node in &self.nodes {
            let Some(root) = self.root(&node.key) else { continue };
            let entry = members.entry(root).or_default();
            if entry.is_empty() {
                order.push(root);
            }
            entry.push(&node.key);
        }
        order
            .into_iter()
            .map(|root| (self.nodes[root].ty.as_ref(), members.remove(&root).unwrap_or_default()))
            .collect()
    }

    /// Members of `key`'s class (empty when the key is unknown).
    pub fn group_of(&self, key: &Key) -> Vec<&Key> {
        let Some(root) = self.root(key) else { return Vec::new() };
        self.nodes
            .iter()
            .filter(|n| self.root(&n.key) == Some(root))
            .map(|n| &n.key)
            .collect()
    }

    /// Keys matching `pred`; a reporting helper with no effect on checking.
    pub fn find_members(&self, pred: impl Fn(&Key) -> bool) -> Vec<&Key> {
        self.nodes.iter().map(|n| &n.key).filter(|k| pred(k)).collect()
    }

    /// Follow `Deferred` references until a payload that is not itself deferred.
    pub fn resolve<'a>(&'a self, ty: &'a Type) -> Option<&'a Type> {
        let mut cur = ty;
        let mut hops = 0;
        while let Type::Deferred(t) = cur {
            hops += 1;
            if hops > self.nodes.len() + 1 {
                return None;
            }
            cur = self.get_type(&Key::Term(t.clone()))?;
        }
        Some(cur)
    }

    /// Best known type of `term`.
    ///
    /// When the class payload is missing or a bare variable, a concrete type is looked for
    /// in structurally related classes (the pointee for a dereference, the field type for a
    /// field access on a record) and then among literal members of the class itself.
    pub fn type_of_term(&self, term: &Term) -> Option<Type> {
        let own = self.get_type(&Key::Term(term.clone())).and_then(|t| self.resolve(t)).cloned();
        if own.as_ref().is_some_and(Type::is_concrete) {
            return own;
        }
        let derived = match term {
            Term::Deref(inner) => match self.type_of_term(inner) {
                Some(Type::Pointer(Some(target))) => self.resolve(&target).cloned(),
                _ => None,
            },
            Term::Field(inner, field) => match self.type_of_term(inner) {
                Some(Type::Record(fields)) => {
                    fields.get(field).and_then(|t| self.resolve(t)).cloned()
                }
                _ => None,
            },
            _ => None,
        };
        if let Some(t) = derived.filter(Type::is_concrete) {
            return Some(t);
        }
        // a literal member of the class still names a concrete shape
        let sibling = self
            .group_of(&Key::Term(term.clone()))
            .into_iter()
            .find_map(|k| match k {
                Key::Literal(t) if t.is_concrete() => Some(t.clone()),
                _ => None,
            });
        sibling.or(own)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Term;

    fn var(name: &str) -> Key {
        Key::Term(Term::var("main", name))
    }

    #[test]
    fn find_auto_creates_untyped_singleton() {
        let mut uf = UnionFind::new();
        let r = uf.find(&var("x"));
        assert_eq!(uf.key_at(r), &var("x"));
        assert_eq!(uf.get_type(&var("x")), None);
    }

    #[test]
    fn make_set_overwrites_payload() {
        let mut uf = UnionFind::new();
        uf.make_set(var("x"), Some(Type::Int));
        uf.make_set(var("x"), Some(Type::Pointer(None)));
        assert_eq!(uf.get_type(&var("x")), Some(&Type::Pointer(None)));
        assert_eq!(uf.len(), 1);
    }

    #[test]
    fn dereference_falls_back_to_pointee() {
        let mut uf = UnionFind::new();
        uf.make_set(var("x"), Some(Type::Int));
        uf.make_set(var("p"), Some(Type::pointer(Type::deferred(Term::var("main", "x")))));
        let deref = Term::deref(Term::var("main", "p"));
        assert_eq!(uf.type_of_term(&deref), Some(Type::Int));
    }

    #[test]
    fn find_members_filters_by_key() {
        let mut uf = UnionFind::new();
        uf.register(&var("x"));
        uf.register(&Key::Literal(Type::Int));
        uf.register(&Key::Term(Term::Result("main".into())));
        let vars = uf.find_members(|k| matches!(k.as_term(), Some(Term::Var { .. })));
        assert_eq!(vars, vec![&var("x")]);
        assert_eq!(uf.find_members(|k| k.as_term().is_none()).len(), 1);
    }
}
