//! Per-function symbol table and the AST scans the collector needs.

use ahash::AHashSet;
use tip_ast::ast::{ExprKind, Function, StmtKind};
use tip_ast::visit::{walk_function_exprs, walk_stmts};

use crate::types::Term;

/// Flat scope of one function: parameters and locals, no nesting.
pub(crate) struct Scope<'a> {
    pub(crate) func: &'a Function,
    vars: AHashSet<&'a str>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(func: &'a Function) -> Self {
        let vars = func.params.iter().chain(&func.locals).map(String::as_str).collect();
        Self { func, vars }
    }

    pub(crate) fn name(&self) -> &'a str {
        &self.func.name
    }

    pub(crate) fn has_var(&self, name: &str) -> bool {
        self.vars.contains(name)
    }

    /// Term an identifier denotes here. Variables shadow function names.
    pub(crate) fn resolve(&self, name: &str, functions: &AHashSet<String>) -> Term {
        if !self.has_var(name) && functions.contains(name) {
            Term::Fun(name.to_string())
        } else {
            Term::var(self.name(), name)
        }
    }
}

/// Whether the function calls itself anywhere in its body or return expression.
///
/// The callee is resolved in `scope`, so a parameter or local named after the function
/// shadows it.
pub(crate) fn calls_itself(scope: &Scope<'_>) -> bool {
    let func = scope.func;
    let mut found = false;
    walk_function_exprs(func, &mut |e| {
        if let ExprKind::Call { callee, .. } = &e.kind {
            let name = callee.as_ident();
            if name == Some(func.name.as_str()) && !name.is_some_and(|n| scope.has_var(n)) {
                found = true;
            }
        }
    });
    found
}

/// Names that are the target of a plain assignment, in any branch or loop body.
pub(crate) fn assigned_vars(func: &Function) -> AHashSet<&str> {
    let mut out = AHashSet::new();
    walk_stmts(&func.body, &mut |s| {
        if let StmtKind::Assign { target, .. } = &s.kind {
            out.insert(target.as_str());
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tip_parser::parse_program;

    #[test]
    fn recursion_found_inside_nested_blocks() {
        let prog = parse_program(
            "f(n) { var r; r = 1; while (n > 0) { if (n > 5) { r = f(n - 1); } } return r; }
             g(n) { return f(n); }",
        )
        .unwrap();
        assert!(calls_itself(&Scope::new(&prog.functions[0])));
        assert!(!calls_itself(&Scope::new(&prog.functions[1])));
    }

    #[test]
    fn shadowed_name_is_not_a_self_call() {
        let prog = parse_program(
            "f(f) { return f(1); } g() { var g; g = h; return g(2); } h(n) { return n; }",
        )
        .unwrap();
        assert!(!calls_itself(&Scope::new(&prog.functions[0])));
        assert!(!calls_itself(&Scope::new(&prog.functions[1])));
    }

    #[test]
    fn assignments_in_both_branches_count() {
        let prog = parse_program(
            "main() { var a, b, c; if (input) { a = 1; } else { b = 2; } *c = 3; return 0; }",
        )
        .unwrap();
        let assigned = assigned_vars(&prog.functions[0]);
        assert!(assigned.contains("a") && assigned.contains("b"));
        assert!(!assigned.contains("c"));
    }

    #[test]
    fn locals_shadow_function_names() {
        let prog = parse_program("f(g) { return g; } g() { return 1; }").unwrap();
        let functions: AHashSet<String> = ["f".to_string(), "g".to_string()].into_iter().collect();
        let scope = Scope::new(&prog.functions[0]);
        assert_eq!(scope.resolve("g", &functions), Term::var("f", "g"));
        assert_eq!(scope.resolve("f", &functions), Term::Fun("f".into()));
    }
}
