use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use tip_types::api::{check_source, infer_program};
use tip_types::{CheckOptions, ErrorKind, Term, TypeCheck, Type};

fn check(src: &str) -> TypeCheck {
    check_source(src, &CheckOptions::default()).expect("program should parse")
}

fn kinds(tc: &TypeCheck) -> Vec<ErrorKind> {
    tc.errors().iter().map(|e| e.kind()).collect()
}

fn read_golden(name: &str) -> String {
    let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.pop(); // crates/tip-types -> crates
    p.pop(); // crates -> workspace root
    p.push("goldens");
    p.push(name);
    fs::read_to_string(p).expect("read golden")
}

#[test]
fn pointer_program_is_well_typed() {
    let tc = check("main() { var x,y,z; x = 1; y = alloc x; *y = 2; z = *y; output z; return z; }");
    assert!(tc.is_well_typed(), "unexpected errors: {:?}", tc.errors());
    assert_eq!(tc.type_of_var("main", "x"), Some(Type::Int));
    assert_eq!(tc.type_of_var("main", "z"), Some(Type::Int));
    assert!(matches!(tc.type_of_var("main", "y"), Some(Type::Pointer(Some(_)))));
    assert_eq!(tc.render_var("main", "y"), "↑int");
}

#[test]
fn pointer_assigned_over_int_is_rejected() {
    let tc = check("main() { var x; x = 1; x = &x; return x; }");
    let ks = kinds(&tc);
    assert!(
        ks.contains(&ErrorKind::InconsistentVariableType)
            || ks.contains(&ErrorKind::UnificationConflict),
        "got {:?}",
        tc.errors()
    );
    assert!(tc.errors().iter().any(|e| e.subject() == "x" || e.to_string().contains("&x")));
}

#[test]
fn dereferencing_an_int_is_reported_once() {
    let tc = check("main() { var x,y; x = 1; y = *x; return y; }");
    assert_eq!(kinds(&tc), vec![ErrorKind::DereferenceOfNonPointer]);
    assert_eq!(tc.errors()[0].subject(), "x");
}

#[test]
fn record_field_access_is_int() {
    let src = "getX() { var p; p = {x: 1, y: 2}; return p.x; }";
    let prog = tip_parser::parse_program(src).unwrap();
    let tc = tip_types::api::check_program(&prog, &CheckOptions::default());
    assert!(tc.is_well_typed(), "unexpected errors: {:?}", tc.errors());
    assert_eq!(tc.type_of_expr(prog.functions[0].ret.id), Some(Type::Int));
    assert_eq!(tc.render_var("getX", "p"), "{x: int, y: int}");
}

#[test]
fn pointer_operand_of_addition_is_reported() {
    let tc = check("main() { var x,y; x = alloc 1; y = x + 1; return y; }");
    assert_eq!(kinds(&tc), vec![ErrorKind::NonIntegerOperand]);
    assert_eq!(tc.errors()[0].subject(), "x");
}

#[test]
fn null_literals_do_not_alias() {
    let tc = check("main() { var x, y; x = null; y = null; return 0; }");
    assert!(tc.is_well_typed(), "unexpected errors: {:?}", tc.errors());
    assert!(!tc.same_class(&Term::var("main", "x"), &Term::var("main", "y")));

    let joined = check("main() { var x, y; x = null; y = null; x = y; return 0; }");
    assert!(joined.same_class(&Term::var("main", "x"), &Term::var("main", "y")));
}

#[test]
fn recursive_function_is_tagged_and_accepted() {
    let src = "fact(n) { var r; if (n > 0) { r = n * fact(n - 1); } else { r = 1; } return r; }
main() { return fact(5); }";
    let tc = check(src);
    assert!(tc.is_well_typed(), "unexpected errors: {:?}", tc.errors());
    assert!(matches!(tc.type_of_function("fact"), Some(Type::Recursive { .. })));
    assert!(!kinds(&tc).contains(&ErrorKind::UnificationConflict));

    let out = infer_program(src).expect("well typed");
    assert_eq!(out, read_golden("infer_fact.golden").trim());
}

#[test]
fn missing_field_is_reported() {
    let tc = check("main() { var p; p = {x: 1}; return p.y; }");
    assert_eq!(kinds(&tc), vec![ErrorKind::MissingField]);
    assert!(tc.errors()[0].to_string().contains("'y'"));
}

#[test]
fn calling_an_int_is_not_callable() {
    let tc = check("main() { var f; f = 3; return f(1); }");
    assert!(kinds(&tc).contains(&ErrorKind::NotCallable), "got {:?}", tc.errors());
}

#[test]
fn wrong_argument_count_is_reported() {
    let tc = check("id(a) { return a; } main() { return id(1, 2); }");
    assert_eq!(kinds(&tc), vec![ErrorKind::ArityMismatch]);

    let quiet = check_source(
        "id(a) { return a; } main() { return id(1, 2); }",
        &CheckOptions { report_arity: false, ..Default::default() },
    )
    .unwrap();
    assert!(quiet.is_well_typed(), "unexpected errors: {:?}", quiet.errors());
}

#[test]
fn pointer_argument_for_int_parameter() {
    let src = "inc(a) { output a; return a + 1; } main() { var x; x = 1; return inc(&x); }";
    let tc = check(src);
    assert!(kinds(&tc).contains(&ErrorKind::ArgumentTypeMismatch), "got {:?}", tc.errors());
}

#[test]
fn storing_a_pointer_into_an_int_cell() {
    let tc = check("main() { var p, q; p = alloc 1; q = alloc 2; *p = q; return 0; }");
    assert!(kinds(&tc).contains(&ErrorKind::PointerStoreMismatch), "got {:?}", tc.errors());
}

#[test]
fn alloc_of_a_pointer_is_rejected() {
    let tc = check("main() { var p, q; p = alloc 1; q = alloc p; return 0; }");
    assert_eq!(kinds(&tc), vec![ErrorKind::InvalidAllocArgument]);
}

#[test]
fn double_dereference_needs_pointer_to_pointer() {
    let ok = check("main() { var x, p, q, y; x = 1; p = &x; q = &p; y = **q; return y; }");
    assert!(ok.is_well_typed(), "unexpected errors: {:?}", ok.errors());
    assert_eq!(ok.type_of_var("main", "y"), Some(Type::Int));
    assert_eq!(ok.render_var("main", "q"), "↑↑int");

    let bad = check("main() { var x, p, y; x = 1; p = &x; y = **p; return y; }");
    assert_eq!(kinds(&bad), vec![ErrorKind::DereferenceOfNonPointer]);
    assert_eq!(bad.errors()[0].subject(), "*p");
}

#[test]
fn uninitialized_local_is_a_null_pointer() {
    let tc = check("main() { var p; return 0; }");
    assert!(tc.is_well_typed());
    assert!(matches!(tc.type_of_var("main", "p"), Some(Type::Pointer(_))));
}

#[test]
fn function_values_flow_through_variables() {
    let src = "inc(a) { return a + 1; } main() { var f; f = inc; return f(2); }";
    let tc = check(src);
    assert!(tc.is_well_typed(), "unexpected errors: {:?}", tc.errors());
    assert_eq!(tc.render_var("main", "f"), "(int) -> int");
}

#[test]
fn every_check_runs_after_a_conflict() {
    let src = "main() { var x, y; x = 1; x = &y; y = *x; output alloc x; return x + null; }";
    let tc = check(src);
    let ks = kinds(&tc);
    assert!(ks.contains(&ErrorKind::UnificationConflict), "got {:?}", tc.errors());
    assert!(ks.contains(&ErrorKind::NonIntegerOperand), "got {:?}", tc.errors());
}

#[test]
fn field_access_on_an_int_is_reported() {
    let tc = check("main() { var x; x = 1; return x.y; }");
    assert_eq!(kinds(&tc), vec![ErrorKind::MissingField]);
    assert_eq!(tc.errors()[0].subject(), "x");
    assert!(tc.errors()[0].to_string().contains(": int has no field 'y'"));
}

#[test]
fn field_access_on_an_unresolved_parameter_is_accepted() {
    let tc = check("first(r) { return r.x; } main() { return 0; }");
    assert!(tc.is_well_typed(), "unexpected errors: {:?}", tc.errors());
}

#[test]
fn remaining_field_types_are_resolved() {
    let src = "g(r) { return r.y; } main() { var s; s = {x: {y: 1}}; return g(s.x); }";
    let render_g = |tc: &TypeCheck| tc.type_of_function("g").map(|t| tc.render(&t));

    let tc = check(src);
    assert!(tc.is_well_typed(), "unexpected errors: {:?}", tc.errors());
    assert_eq!(render_g(&tc).as_deref(), Some("({y: int}) -> int"));

    let options = CheckOptions { resolve_remaining: false, ..Default::default() };
    let raw = check_source(src, &options).unwrap();
    let g = render_g(&raw).expect("g has a type");
    assert!(g.starts_with("({y: int}) -> "), "got {g}");
    assert!(!g.ends_with("-> int"), "got {g}");
}

#[test]
fn int_then_pointer_is_an_inconsistent_variable() {
    let tc = check("main() { var x; x = 1; x = &x; return x; }");
    let inconsistent: Vec<_> = tc
        .errors()
        .iter()
        .filter(|e| e.kind() == ErrorKind::InconsistentVariableType)
        .collect();
    assert_eq!(inconsistent.len(), 1, "got {:?}", tc.errors());
    assert_eq!(inconsistent[0].subject(), "x");
}

#[test]
fn null_then_alloc_is_consistent() {
    let tc = check("main() { var x; x = null; x = alloc 1; return 0; }");
    assert!(
        !kinds(&tc).contains(&ErrorKind::InconsistentVariableType),
        "got {:?}",
        tc.errors()
    );
    assert!(tc.is_well_typed(), "unexpected errors: {:?}", tc.errors());
}

#[test]
fn parameter_named_like_its_function_is_not_recursion() {
    let tc = check("f(f) { return f(1); } main() { return 0; }");
    assert!(matches!(tc.type_of_function("f"), Some(Type::Function { .. })));
}
