pub mod span {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
    pub struct Span {
        pub offset: usize,
        pub len: usize,
    }
    impl Span {
        pub fn new(offset: usize, len: usize) -> Self {
            Self { offset, len }
        }

        /// Smallest span covering both `self` and `other`.
        pub fn to(self, other: Span) -> Span {
            let start = self.offset.min(other.offset);
            let end = (self.offset + self.len).max(other.offset + other.len);
            Span::new(start, end - start)
        }
    }
}

pub mod ast {
    use crate::span::Span;
    use serde::{Deserialize, Serialize};

    /// Identity of one expression node, unique within a program.
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct ExprId(pub u32);

    impl std::fmt::Display for ExprId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "e{}", self.0)
        }
    }

    /// Hands out `ExprId`s in allocation order. The parser owns one per program.
    #[derive(Debug, Default)]
    pub struct ExprIdGen {
        next: u32,
    }

    impl ExprIdGen {
        pub fn new() -> Self {
            Self { next: 0 }
        }

        pub fn fresh(&mut self) -> ExprId {
            let id = ExprId(self.next);
            self.next += 1;
            id
        }

        /// Build an expression with a fresh id and a dummy span (handy for hand-built ASTs).
        pub fn expr(&mut self, kind: ExprKind) -> Expr {
            Expr::new(self.fresh(), kind, Span::default())
        }
    }

    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
    pub enum BinOp {
        Add,
        Sub,
        Mul,
        Div,
        Gt,
        Eq,
    }

    impl BinOp {
        pub fn symbol(self) -> &'static str {
            match self {
                BinOp::Add => "+",
                BinOp::Sub => "-",
                BinOp::Mul => "*",
                BinOp::Div => "/",
                BinOp::Gt => ">",
                BinOp::Eq => "==",
            }
        }

        /// Binding power used by both the parser and the pretty printer.
        pub fn precedence(self) -> u8 {
            match self {
                BinOp::Eq => 4,
                BinOp::Gt => 5,
                BinOp::Add | BinOp::Sub => 10,
                BinOp::Mul | BinOp::Div => 20,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub enum ExprKind {
        Number(i64),
        Input,
        Null,
        Ident(String),
        Binary {
            op: BinOp,
            left: Box<Expr>,
            right: Box<Expr>,
        },
        Alloc(Box<Expr>),
        AddressOf(String),
        Deref(Box<Expr>),
        Call {
            callee: Box<Expr>,
            args: Vec<Expr>,
        },
        // { k: e, ... }
        Record(Vec<(String, Expr)>),
        Field {
            record: Box<Expr>,
            field: String,
        },
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Expr {
        pub id: ExprId,
        pub kind: ExprKind,
        pub span: Span,
    }
    impl Expr {
        pub fn new(id: ExprId, kind: ExprKind, span: Span) -> Self {
            Self { id, kind, span }
        }

        /// Name of the variable when this expression is a bare identifier.
        pub fn as_ident(&self) -> Option<&str> {
            match &self.kind {
                ExprKind::Ident(name) => Some(name),
                _ => None,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub enum StmtKind {
        // x = e;
        Assign { target: String, value: Expr },
        // *p = e;
        Store { pointer: Expr, value: Expr },
        Output(Expr),
        If {
            cond: Expr,
            then_branch: Vec<Stmt>,
            else_branch: Option<Vec<Stmt>>,
        },
        While { cond: Expr, body: Vec<Stmt> },
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Stmt {
        pub kind: StmtKind,
        pub span: Span,
    }
    impl Stmt {
        pub fn new(kind: StmtKind, span: Span) -> Self {
            Self { kind, span }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Function {
        pub name: String,
        pub params: Vec<String>,
        pub locals: Vec<String>,
        pub body: Vec<Stmt>,
        pub ret: Expr,
        pub span: Span,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
    pub struct Program {
        pub functions: Vec<Function>,
    }

    impl Program {
        pub fn function(&self, name: &str) -> Option<&Function> {
            self.functions.iter().find(|f| f.name == name)
        }
    }
}

/// Traversals over the closed AST variant set.
pub mod visit {
    use crate::ast::*;

    /// Pre-order walk over `e` and every sub-expression.
    pub fn walk_expr<'a>(e: &'a Expr, f: &mut impl FnMut(&'a Expr)) {
        f(e);
        match &e.kind {
            ExprKind::Number(_)
            | ExprKind::Input
            | ExprKind::Null
            | ExprKind::Ident(_)
            | ExprKind::AddressOf(_) => {}
            ExprKind::Binary { left, right, .. } => {
                walk_expr(left, f);
                walk_expr(right, f);
            }
            ExprKind::Alloc(inner) | ExprKind::Deref(inner) => walk_expr(inner, f),
            ExprKind::Call { callee, args } => {
                walk_expr(callee, f);
                for a in args {
                    walk_expr(a, f);
                }
            }
            ExprKind::Record(fields) => {
                for (_, v) in fields {
                    walk_expr(v, f);
                }
            }
            ExprKind::Field { record, .. } => walk_expr(record, f),
        }
    }

    /// Walk statements (both `if` branches and `while` bodies) calling `on_stmt`
    /// for each statement before descending into nested blocks.
    pub fn walk_stmts<'a>(stmts: &'a [Stmt], on_stmt: &mut impl FnMut(&'a Stmt)) {
        for s in stmts {
            on_stmt(s);
            match &s.kind {
                StmtKind::If { then_branch, else_branch, .. } => {
                    walk_stmts(then_branch, on_stmt);
                    if let Some(els) = else_branch {
                        walk_stmts(els, on_stmt);
                    }
                }
                StmtKind::While { body, .. } => walk_stmts(body, on_stmt),
                StmtKind::Assign { .. } | StmtKind::Store { .. } | StmtKind::Output(_) => {}
            }
        }
    }

    /// Expressions directly owned by a statement (not those of nested blocks).
    pub fn stmt_exprs(s: &Stmt) -> Vec<&Expr> {
        match &s.kind {
            StmtKind::Assign { value, .. } => vec![value],
            StmtKind::Store { pointer, value } => vec![pointer, value],
            StmtKind::Output(e) => vec![e],
            StmtKind::If { cond, .. } | StmtKind::While { cond, .. } => vec![cond],
        }
    }

    /// Every expression of a function: statements first, then the return expression.
    pub fn walk_function_exprs<'a>(func: &'a Function, f: &mut impl FnMut(&'a Expr)) {
        walk_stmts(&func.body, &mut |s| {
            for e in stmt_exprs(s) {
                walk_expr(e, f);
            }
        });
        walk_expr(&func.ret, f);
    }
}

pub mod pretty {
    use crate::ast::*;

    pub fn print_expr(e: &Expr) -> String {
        print_expr_prec(e, 0)
    }

    fn print_expr_prec(e: &Expr, min: u8) -> String {
        match &e.kind {
            ExprKind::Number(n) => format!("{n}"),
            ExprKind::Input => "input".into(),
            ExprKind::Null => "null".into(),
            ExprKind::Ident(n) => n.clone(),
            ExprKind::Binary { op, left, right } => {
                let p = op.precedence();
                let s = format!(
                    "{} {} {}",
                    print_expr_prec(left, p),
                    op.symbol(),
                    print_expr_prec(right, p + 1)
                );
                if p < min {
                    format!("({s})")
                } else {
                    s
                }
            }
            ExprKind::Alloc(inner) => format!("alloc {}", print_unary_operand(inner)),
            ExprKind::AddressOf(n) => format!("&{n}"),
            ExprKind::Deref(inner) => format!("*{}", print_unary_operand(inner)),
            ExprKind::Call { callee, args } => format!(
                "{}({})",
                print_postfix_operand(callee),
                args.iter().map(print_expr).collect::<Vec<_>>().join(", ")
            ),
            ExprKind::Record(fields) => {
                let inner = fields
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, print_expr(v)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{}}}", inner)
            }
            ExprKind::Field { record, field } => {
                format!("{}.{}", print_postfix_operand(record), field)
            }
        }
    }

    fn print_unary_operand(e: &Expr) -> String {
        match &e.kind {
            ExprKind::Binary { .. } => format!("({})", print_expr(e)),
            _ => print_expr(e),
        }
    }

    fn print_postfix_operand(e: &Expr) -> String {
        match &e.kind {
            ExprKind::Binary { .. } | ExprKind::Alloc(_) | ExprKind::Deref(_) => {
                format!("({})", print_expr(e))
            }
            _ => print_expr(e),
        }
    }

    pub fn print_stmt(s: &Stmt, indent: usize) -> String {
        let pad = "  ".repeat(indent);
        match &s.kind {
            StmtKind::Assign { target, value } => format!("{pad}{target} = {};", print_expr(value)),
            StmtKind::Store { pointer, value } => format!(
                "{pad}*{} = {};",
                print_unary_operand(pointer),
                print_expr(value)
            ),
            StmtKind::Output(e) => format!("{pad}output {};", print_expr(e)),
            StmtKind::If { cond, then_branch, else_branch } => {
                let mut out = format!("{pad}if ({}) {{\n", print_expr(cond));
                out.push_str(&print_block(then_branch, indent + 1));
                out.push_str(&format!("{pad}}}"));
                if let Some(els) = else_branch {
                    out.push_str(" else {\n");
                    out.push_str(&print_block(els, indent + 1));
                    out.push_str(&format!("{pad}}}"));
                }
                out
            }
            StmtKind::While { cond, body } => {
                let mut out = format!("{pad}while ({}) {{\n", print_expr(cond));
                out.push_str(&print_block(body, indent + 1));
                out.push_str(&format!("{pad}}}"));
                out
            }
        }
    }

    fn print_block(stmts: &[Stmt], indent: usize) -> String {
        stmts.iter().map(|s| format!("{}\n", print_stmt(s, indent))).collect()
    }

    pub fn print_function(f: &Function) -> String {
        let mut out = format!("{}({}) {{\n", f.name, f.params.join(", "));
        if !f.locals.is_empty() {
            out.push_str(&format!("  var {};\n", f.locals.join(", ")));
        }
        out.push_str(&print_block(&f.body, 1));
        out.push_str(&format!("  return {};\n}}", print_expr(&f.ret)));
        out
    }

    pub fn print_program(p: &Program) -> String {
        p.functions.iter().map(print_function).collect::<Vec<_>>().join("\n\n")
    }
}
