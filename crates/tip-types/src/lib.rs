//! tip-types: constraint-based type inference for TIP.
//!
//! A run collects constraints from the AST (`collect`), solves them over a Union-Find store
//! (`union_find`, `unification`), links call sites, dereferences and field accesses, and
//! then validates what unification alone cannot express (`solve`). The result is a
//! `TypeCheck` holding the store, the constraints and every `TypeError` found.

pub mod collect;
pub mod constraint;
pub mod debug;
pub mod display;
pub mod error;
pub mod report;
pub mod solve;
pub mod types;
pub mod union_find;
mod unification;

pub use collect::ConstraintCollector;
pub use constraint::{CallSite, Constraint, ConstraintSet, Node, Origin};
pub use debug::DebugConfig;
pub use error::{ErrorKind, TypeError};
pub use report::{Group, TypeCheck};
pub use solve::Solver;
pub use types::{is_type_variable_name, Key, Term, TvGen, TvId, Type, TypeTag};
pub use union_find::UnionFind;

/// Knobs for one type-check run.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Report calls whose argument count differs from the callee's parameter count.
    pub report_arity: bool,
    /// Assign resolved field types to field accesses left without one.
    pub resolve_remaining: bool,
    pub debug: Option<DebugConfig>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self { report_arity: true, resolve_remaining: true, debug: None }
    }
}

pub mod api {
    use tip_ast::ast::Program;
    use tip_parser::{parse_program, ParseError};

    use crate::collect::ConstraintCollector;
    use crate::report::TypeCheck;
    use crate::solve::Solver;
    use crate::CheckOptions;

    /// Collect, solve and validate `program`.
    pub fn check_program(program: &Program, options: &CheckOptions) -> TypeCheck {
        let debug = options.debug.clone().map(|d| d.into_shared());
        let set = ConstraintCollector::new().with_debug(debug.clone()).collect(program);
        let (store, errors) = Solver::new(program, &set, options, debug.clone()).solve();
        let logs = debug.map(|d| std::mem::take(&mut d.borrow_mut().logs)).unwrap_or_default();
        TypeCheck {
            constraints: set.constraints,
            store,
            errors,
            terms: set.terms,
            functions: program.functions.iter().map(|f| f.name.clone()).collect(),
            logs,
        }
    }

    pub fn check_source(src: &str, options: &CheckOptions) -> Result<TypeCheck, ParseError> {
        let program = parse_program(src)?;
        Ok(check_program(&program, options))
    }

    /// One `name: type` line per function, or the error messages joined by newlines.
    pub fn infer_program(src: &str) -> Result<String, String> {
        let tc = check_source(src, &CheckOptions::default()).map_err(|e| e.to_string())?;
        if !tc.is_well_typed() {
            let msgs: Vec<String> = tc.errors().iter().map(|e| e.to_string()).collect();
            return Err(msgs.join("\n"));
        }
        let lines: Vec<String> = tc
            .functions()
            .iter()
            .map(|f| {
                let ty = tc.type_of_function(f).map_or_else(|| "_".into(), |t| tc.render(&t));
                format!("{f}: {ty}")
            })
            .collect();
        Ok(lines.join("\n"))
    }
}
