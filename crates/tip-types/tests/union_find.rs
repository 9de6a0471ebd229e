use pretty_assertions::assert_eq;
use std::collections::{BTreeMap, BTreeSet};
use tip_types::{Key, Term, TvId, Type, UnionFind};

fn var(name: &str) -> Key {
    Key::Term(Term::var("main", name))
}

fn record(fields: &[(&str, Type)]) -> Type {
    Type::Record(fields.iter().map(|(k, t)| (k.to_string(), t.clone())).collect::<BTreeMap<_, _>>())
}

fn partition(uf: &UnionFind) -> BTreeSet<BTreeSet<String>> {
    uf.groups()
        .into_iter()
        .map(|(_, members)| members.into_iter().map(|k| k.to_string()).collect())
        .collect()
}

#[test]
fn find_is_idempotent_and_compresses() {
    let mut uf = UnionFind::new();
    assert!(uf.union(&var("a"), &var("b")));
    assert!(uf.union(&var("c"), &var("d")));
    assert!(uf.union(&var("a"), &var("c")));
    assert_eq!(uf.path_len(&var("d")), Some(2));

    let first = uf.find(&var("d"));
    assert_eq!(uf.path_len(&var("d")), Some(1));
    let second = uf.find(&var("d"));
    assert_eq!(first, second);
    assert_eq!(uf.path_len(&var("d")), Some(1));
}

#[test]
fn union_is_symmetric_in_partition() {
    let ops = [("a", "b"), ("c", "a"), ("d", "e"), ("e", "c")];
    let mut left = UnionFind::new();
    let mut right = UnionFind::new();
    for (x, y) in ops {
        left.union(&var(x), &var(y));
        right.union(&var(y), &var(x));
    }
    assert_eq!(partition(&left), partition(&right));
    assert_eq!(partition(&left).len(), 1);
}

#[test]
fn record_compatibility_is_by_shared_fields() {
    let uf = UnionFind::new();
    let x = record(&[("x", Type::Int)]);
    let xy = record(&[("x", Type::Int), ("y", Type::Int)]);
    let xp = record(&[("x", Type::Int), ("y", Type::pointer(Type::Int))]);
    assert!(uf.is_compatible(&x, &xy));
    assert!(uf.is_compatible(&x, &xp));
    assert!(!uf.is_compatible(&xy, &xp));

    let mut uf = UnionFind::new();
    assert!(!uf.union(&Key::Literal(xy.clone()), &Key::Literal(xp.clone())));
    assert!(!uf.same_class(&Key::Literal(xy), &Key::Literal(xp)));
}

#[test]
fn disjoint_records_are_incompatible() {
    let uf = UnionFind::new();
    let a = record(&[("a", Type::Int)]);
    let b = record(&[("b", Type::Int)]);
    assert!(!uf.is_compatible(&a, &b));
}

#[test]
fn pointers_never_match_int() {
    let uf = UnionFind::new();
    let targets = [
        Type::Int,
        Type::Var(TvId(0)),
        Type::Pointer(None),
        Type::pointer(Type::pointer(Type::Int)),
        Type::function(vec![Type::Int], Type::Int),
        record(&[("x", Type::Int)]),
        Type::Recursive {
            bound: TvId(1),
            body: Box::new(Type::function(vec![], Type::Int)),
        },
        Type::deferred(Term::var("main", "unknown")),
    ];
    for t in targets {
        let p = Type::pointer(t);
        assert!(!uf.is_compatible(&p, &Type::Int), "{p} ~ int");
        assert!(!uf.is_compatible(&Type::Int, &p), "int ~ {p}");
    }
    assert!(!uf.is_compatible(&Type::Pointer(None), &Type::Int));
}

#[test]
fn unknown_pointer_targets_are_lenient() {
    let uf = UnionFind::new();
    let to_var = Type::pointer(Type::Var(TvId(0)));
    let to_ptr = Type::pointer(Type::pointer(Type::Int));
    assert!(uf.is_compatible(&to_var, &to_ptr));
    assert!(uf.is_compatible(&Type::Pointer(None), &to_ptr));
    assert!(!uf.is_compatible(&Type::pointer(Type::Int), &to_ptr));
}

#[test]
fn functions_compare_arity_and_components() {
    let uf = UnionFind::new();
    let f1 = Type::function(vec![Type::Int], Type::Int);
    let f2 = Type::function(vec![Type::Int, Type::Int], Type::Int);
    let f3 = Type::function(vec![Type::Pointer(None)], Type::Int);
    let no_ret = Type::Function { params: vec![Type::Int], ret: None };
    assert!(!uf.is_compatible(&f1, &f2));
    assert!(!uf.is_compatible(&f1, &f3));
    assert!(uf.is_compatible(&f1, &no_ret));

    let rec = Type::Recursive { bound: TvId(0), body: Box::new(f1.clone()) };
    let other = Type::Recursive { bound: TvId(1), body: Box::new(f1.clone()) };
    assert!(uf.is_compatible(&rec, &f1));
    assert!(!uf.is_compatible(&rec, &other));
}

#[test]
fn cyclic_payloads_terminate() {
    let mut uf = UnionFind::new();
    let p = Term::var("main", "p");
    let q = Term::var("main", "q");
    uf.make_set(Key::Term(p.clone()), Some(Type::pointer(Type::deferred(p.clone()))));
    uf.make_set(Key::Term(q.clone()), Some(Type::pointer(Type::deferred(q.clone()))));
    assert!(uf.is_compatible(&Type::deferred(p.clone()), &Type::deferred(q.clone())));
    assert!(uf.union(&Key::Term(p.clone()), &Key::Term(q.clone())));
    assert!(uf.same_class(&Key::Term(p), &Key::Term(q)));
}
