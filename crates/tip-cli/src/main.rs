use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tip_ast::ast::Program;
use tip_parser::parse_program;
use tip_types::api::check_program;
use tip_types::{CheckOptions, DebugConfig, Group, TypeCheck};

#[derive(Parser, Debug)]
#[command(name = "tipc", version, about = "Type checker for TIP programs")]
struct Opt {
    /// Source file to check
    file: Option<PathBuf>,

    /// One-line program
    #[arg(short = 'e', long = "eval", conflicts_with = "file")]
    eval: Option<String>,

    /// Output format: text|json
    #[arg(long = "format", default_value = "text")]
    format: String,

    /// Print the type of every function, parameter and local
    #[arg(long = "types", default_value_t = false)]
    types: bool,

    /// Print the collected constraints
    #[arg(long = "dump-constraints", default_value_t = false)]
    dump_constraints: bool,

    /// Print the equivalence classes of the solved store
    #[arg(long = "dump-groups", default_value_t = false)]
    dump_groups: bool,

    /// Do not report calls with the wrong number of arguments
    #[arg(long = "no-arity", default_value_t = false)]
    no_arity: bool,

    /// Enable the checker trace (printed to stderr)
    #[arg(long = "debug", default_value_t = false)]
    debug: bool,

    /// Trace verbosity (implies --debug)
    #[arg(long = "debug-level")]
    debug_level: Option<usize>,

    /// Trace every unification attempt (implies --debug)
    #[arg(long = "log-unify", default_value_t = false)]
    log_unify: bool,

    /// Trace the linking passes (implies --debug)
    #[arg(long = "log-links", default_value_t = false)]
    log_links: bool,
}

impl Opt {
    fn check_options(&self) -> CheckOptions {
        let tracing = self.debug || self.debug_level.is_some() || self.log_unify || self.log_links;
        let debug = tracing.then(|| {
            let mut cfg = DebugConfig {
                log_unify: self.log_unify,
                log_links: self.log_links,
                ..Default::default()
            };
            if let Some(level) = self.debug_level {
                cfg.level = level;
            } else if self.log_unify || self.log_links {
                cfg.level = 2;
            }
            cfg
        });
        CheckOptions { report_arity: !self.no_arity, debug, ..Default::default() }
    }
}

#[derive(Serialize)]
struct ErrorOut {
    kind: &'static str,
    code: String,
    message: String,
    offset: usize,
    len: usize,
    hints: Vec<String>,
}

#[derive(Serialize)]
struct TypeOut {
    name: String,
    ty: String,
}

#[derive(Serialize)]
struct CheckOut {
    well_typed: bool,
    errors: Vec<ErrorOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    types: Option<Vec<TypeOut>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    constraints: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    groups: Option<Vec<Group>>,
}

fn collect_types(prog: &Program, tc: &TypeCheck) -> Vec<TypeOut> {
    let mut out = Vec::new();
    for f in &prog.functions {
        let ty = tc.type_of_function(&f.name).map_or_else(|| "_".into(), |t| tc.render(&t));
        out.push(TypeOut { name: f.name.clone(), ty });
        for v in f.params.iter().chain(&f.locals) {
            out.push(TypeOut { name: format!("{}.{}", f.name, v), ty: tc.render_var(&f.name, v) });
        }
    }
    out
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::parse();
    let src = match (&opt.eval, &opt.file) {
        (Some(code), _) => code.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?,
        (None, None) => {
            eprintln!("no input; try `tipc FILE` or -e '...'");
            return Ok(());
        }
    };
    let prog = parse_program(&src).map_err(|e| format!("parse error: {e}"))?;
    let tc = check_program(&prog, &opt.check_options());

    for line in tc.debug_logs() {
        eprintln!("{line}");
    }

    if opt.format == "json" {
        let out = CheckOut {
            well_typed: tc.is_well_typed(),
            errors: tc
                .errors()
                .iter()
                .map(|e| {
                    let span = e.primary_span();
                    ErrorOut {
                        kind: e.kind().as_str(),
                        code: e.kind().code(),
                        message: e.to_string(),
                        offset: span.offset,
                        len: span.len,
                        hints: e.fix_hints(),
                    }
                })
                .collect(),
            types: opt.types.then(|| collect_types(&prog, &tc)),
            constraints: opt
                .dump_constraints
                .then(|| tc.constraints().iter().map(|c| c.to_string()).collect()),
            groups: opt.dump_groups.then(|| tc.groups()),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        if opt.dump_constraints {
            for c in tc.constraints() {
                println!("{c}");
            }
        }
        if opt.dump_groups {
            for g in tc.groups() {
                println!("{{{}}}: {}", g.members.join(", "), g.ty.as_deref().unwrap_or("_"));
            }
        }
        if opt.types {
            for t in collect_types(&prog, &tc) {
                println!("{}: {}", t.name, t.ty);
            }
        }
        for e in tc.errors() {
            eprintln!("error[{}] {}: {}", e.kind().code(), e.kind(), e);
            for h in e.fix_hints() {
                eprintln!("  hint: {h}");
            }
        }
        if tc.is_well_typed() {
            eprintln!("ok");
        } else {
            eprintln!("{} type error(s)", tc.errors().len());
        }
    }

    if !tc.is_well_typed() {
        std::process::exit(1);
    }
    Ok(())
}
