use tip_ast::{ast::*, span::Span};
use tip_lexer::{lex_skip_comments, LexError, Lexed, Tok};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: expected {expected}, found {found} at ({offset},{len})")]
    Unexpected { expected: String, found: String, offset: usize, len: usize },
    #[error("parse error: expected {expected}, found end of input")]
    UnexpectedEof { expected: String },
}

/// Parse a whole program (a sequence of function declarations).
pub fn parse_program(src: &str) -> Result<Program, ParseError> {
    let toks = lex_skip_comments(src)?;
    let mut p = Parser::new(&toks);
    let mut functions = Vec::new();
    while !p.at_end() {
        functions.push(p.function()?);
    }
    Ok(Program { functions })
}

/// Parse a single expression; ids start at zero.
pub fn parse_expr(src: &str) -> Result<Expr, ParseError> {
    let toks = lex_skip_comments(src)?;
    let mut p = Parser::new(&toks);
    let e = p.expr(0)?;
    if let Some(t) = p.peek() {
        return Err(p.unexpected("end of input", t));
    }
    Ok(e)
}

struct Parser<'t, 'a> {
    toks: &'t [Lexed<'a>],
    pos: usize,
    ids: ExprIdGen,
}

impl<'t, 'a> Parser<'t, 'a> {
    fn new(toks: &'t [Lexed<'a>]) -> Self {
        Self { toks, pos: 0, ids: ExprIdGen::new() }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.toks.len()
    }

    fn peek(&self) -> Option<&'t Lexed<'a>> {
        self.toks.get(self.pos)
    }

    fn peek_tok(&self) -> Option<&'t Tok> {
        self.peek().map(|t| &t.tok)
    }

    fn peek_nth_tok(&self, n: usize) -> Option<&'t Tok> {
        self.toks.get(self.pos + n).map(|t| &t.tok)
    }

    fn bump(&mut self, expected: &str) -> Result<&'t Lexed<'a>, ParseError> {
        let t = self
            .toks
            .get(self.pos)
            .ok_or_else(|| ParseError::UnexpectedEof { expected: expected.to_string() })?;
        self.pos += 1;
        Ok(t)
    }

    fn unexpected(&self, expected: &str, found: &Lexed<'_>) -> ParseError {
        ParseError::Unexpected {
            expected: expected.to_string(),
            found: format!("{} '{}'", found.tok.describe(), found.text),
            offset: found.span.offset,
            len: found.span.len,
        }
    }

    fn expect(&mut self, tok: Tok) -> Result<&'t Lexed<'a>, ParseError> {
        let expected = tok.describe();
        let t = self.bump(expected)?;
        if t.tok != tok {
            return Err(self.unexpected(expected, t));
        }
        Ok(t)
    }

    fn ident(&mut self) -> Result<(String, Span), ParseError> {
        let t = self.bump("identifier")?;
        match t.tok {
            Tok::Ident => Ok((t.text.to_string(), t.span)),
            _ => Err(self.unexpected("identifier", t)),
        }
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek_tok() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn mk(&mut self, kind: ExprKind, span: Span) -> Expr {
        Expr::new(self.ids.fresh(), kind, span)
    }

    fn ident_list(&mut self, close: Tok) -> Result<Vec<String>, ParseError> {
        let mut names = Vec::new();
        if self.peek_tok() == Some(&close) {
            return Ok(names);
        }
        loop {
            names.push(self.ident()?.0);
            if !self.eat(&Tok::Comma) {
                break;
            }
        }
        Ok(names)
    }

    fn function(&mut self) -> Result<Function, ParseError> {
        let (name, start) = self.ident()?;
        self.expect(Tok::LParen)?;
        let params = self.ident_list(Tok::RParen)?;
        self.expect(Tok::RParen)?;
        self.expect(Tok::LBrace)?;
        let mut locals = Vec::new();
        while self.eat(&Tok::Var) {
            locals.extend(self.ident_list(Tok::Semicolon)?);
            self.expect(Tok::Semicolon)?;
        }
        let mut body = Vec::new();
        while self.peek_tok() != Some(&Tok::Return) {
            if self.at_end() {
                return Err(ParseError::UnexpectedEof { expected: "'return'".into() });
            }
            body.push(self.stmt()?);
        }
        self.expect(Tok::Return)?;
        let ret = self.expr(0)?;
        self.expect(Tok::Semicolon)?;
        let end = self.expect(Tok::RBrace)?;
        Ok(Function { name, params, locals, body, ret, span: start.to(end.span) })
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if !self.eat(&Tok::LBrace) {
            return Ok(vec![self.stmt()?]);
        }
        let mut stmts = Vec::new();
        while !self.eat(&Tok::RBrace) {
            if self.at_end() {
                return Err(ParseError::UnexpectedEof { expected: "'}'".into() });
            }
            stmts.push(self.stmt()?);
        }
        Ok(stmts)
    }

    fn stmt(&mut self) -> Result<Stmt, ParseError> {
        let first = self.bump("statement")?;
        let start = first.span;
        match first.tok {
            Tok::Ident => {
                let target = first.text.to_string();
                self.expect(Tok::Eq)?;
                let value = self.expr(0)?;
                let end = self.expect(Tok::Semicolon)?;
                Ok(Stmt::new(StmtKind::Assign { target, value }, start.to(end.span)))
            }
            Tok::Star => {
                let pointer = self.unary()?;
                self.expect(Tok::Eq)?;
                let value = self.expr(0)?;
                let end = self.expect(Tok::Semicolon)?;
                Ok(Stmt::new(StmtKind::Store { pointer, value }, start.to(end.span)))
            }
            Tok::Output => {
                let e = self.expr(0)?;
                let end = self.expect(Tok::Semicolon)?;
                Ok(Stmt::new(StmtKind::Output(e), start.to(end.span)))
            }
            Tok::If => {
                self.expect(Tok::LParen)?;
                let cond = self.expr(0)?;
                self.expect(Tok::RParen)?;
                let then_branch = self.block()?;
                let else_branch = if self.eat(&Tok::Else) { Some(self.block()?) } else { None };
                let end = self.toks[self.pos - 1].span;
                Ok(Stmt::new(StmtKind::If { cond, then_branch, else_branch }, start.to(end)))
            }
            Tok::While => {
                self.expect(Tok::LParen)?;
                let cond = self.expr(0)?;
                self.expect(Tok::RParen)?;
                let body = self.block()?;
                let end = self.toks[self.pos - 1].span;
                Ok(Stmt::new(StmtKind::While { cond, body }, start.to(end)))
            }
            _ => Err(self.unexpected("statement", first)),
        }
    }

    // Pratt loop over the binary operators
    fn expr(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek_tok() {
                Some(Tok::EqEq) => BinOp::Eq,
                Some(Tok::Greater) => BinOp::Gt,
                Some(Tok::Plus) => BinOp::Add,
                Some(Tok::Minus) => BinOp::Sub,
                Some(Tok::Star) => BinOp::Mul,
                Some(Tok::Slash) => BinOp::Div,
                _ => break,
            };
            let bp = op.precedence();
            if bp < min_bp {
                break;
            }
            self.pos += 1;
            let rhs = self.expr(bp + 1)?;
            let span = lhs.span.to(rhs.span);
            lhs = self.mk(ExprKind::Binary { op, left: Box::new(lhs), right: Box::new(rhs) }, span);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let Some(t) = self.peek() else {
            return Err(ParseError::UnexpectedEof { expected: "expression".into() });
        };
        match t.tok {
            Tok::Star => {
                self.pos += 1;
                let inner = self.unary()?;
                let span = t.span.to(inner.span);
                Ok(self.mk(ExprKind::Deref(Box::new(inner)), span))
            }
            Tok::Alloc => {
                self.pos += 1;
                let inner = self.unary()?;
                let span = t.span.to(inner.span);
                Ok(self.mk(ExprKind::Alloc(Box::new(inner)), span))
            }
            Tok::Amp => {
                self.pos += 1;
                let (name, sp) = self.ident()?;
                Ok(self.mk(ExprKind::AddressOf(name), t.span.to(sp)))
            }
            Tok::Minus if matches!(self.peek_nth_tok(1), Some(Tok::Int(_))) => {
                self.pos += 1;
                let lit = self.bump("integer")?;
                let Tok::Int(n) = lit.tok else {
                    return Err(self.unexpected("integer", lit));
                };
                Ok(self.mk(ExprKind::Number(-n), t.span.to(lit.span)))
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut e = self.primary()?;
        loop {
            if self.eat(&Tok::LParen) {
                let mut args = Vec::new();
                if self.peek_tok() != Some(&Tok::RParen) {
                    loop {
                        args.push(self.expr(0)?);
                        if !self.eat(&Tok::Comma) {
                            break;
                        }
                    }
                }
                let end = self.expect(Tok::RParen)?;
                let span = e.span.to(end.span);
                e = self.mk(ExprKind::Call { callee: Box::new(e), args }, span);
            } else if self.eat(&Tok::Dot) {
                let (field, sp) = self.ident()?;
                let span = e.span.to(sp);
                e = self.mk(ExprKind::Field { record: Box::new(e), field }, span);
            } else {
                break;
            }
        }
        Ok(e)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let t = self.bump("expression")?;
        match &t.tok {
            Tok::Int(n) => Ok(self.mk(ExprKind::Number(*n), t.span)),
            Tok::Input => Ok(self.mk(ExprKind::Input, t.span)),
            Tok::Null => Ok(self.mk(ExprKind::Null, t.span)),
            Tok::Ident => Ok(self.mk(ExprKind::Ident(t.text.to_string()), t.span)),
            Tok::LParen => {
                let mut inner = self.expr(0)?;
                let end = self.expect(Tok::RParen)?;
                inner.span = t.span.to(end.span);
                Ok(inner)
            }
            Tok::LBrace => {
                let mut fields: Vec<(String, Expr)> = Vec::new();
                if self.peek_tok() != Some(&Tok::RBrace) {
                    loop {
                        let (key, _) = self.ident()?;
                        self.expect(Tok::Colon)?;
                        let value = self.expr(0)?;
                        fields.push((key, value));
                        if !self.eat(&Tok::Comma) {
                            break;
                        }
                    }
                }
                let end = self.expect(Tok::RBrace)?;
                Ok(self.mk(ExprKind::Record(fields), t.span.to(end.span)))
            }
            _ => Err(self.unexpected("expression", t)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tip_ast::pretty::{print_expr, print_program};

    #[test]
    fn parses_precedence_and_postfix() {
        let e = parse_expr("a + b * f(1, *p).x == 3").unwrap();
        assert_eq!(print_expr(&e), "a + b * f(1, *p).x == 3");
        let ExprKind::Binary { op, .. } = &e.kind else { panic!("expected binary") };
        assert_eq!(*op, BinOp::Eq);
    }

    #[test]
    fn expression_ids_are_unique() {
        let prog = parse_program("main() { var x; x = 1 + 2; return x; }").unwrap();
        let mut ids = Vec::new();
        tip_ast::visit::walk_function_exprs(&prog.functions[0], &mut |e| ids.push(e.id));
        let n = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), n);
    }

    #[test]
    fn parses_statements_and_round_trips() {
        let src = "main(n) {
  var x, y;
  var p;
  x = alloc n;
  *x = 2;
  p = {a: 1, b: &y};
  if (n > 0) {
    output *x;
  } else {
    y = null;
  }
  while (n > 0) {
    n = n - 1;
  }
  return p.a;
}";
        let prog = parse_program(src).unwrap();
        let f = &prog.functions[0];
        assert_eq!(f.params, vec!["n".to_string()]);
        assert_eq!(f.locals, vec!["x".to_string(), "y".to_string(), "p".to_string()]);
        assert_eq!(f.body.len(), 5);
        let printed = print_program(&prog);
        let again = parse_program(&printed).unwrap();
        assert_eq!(print_program(&again), printed);
    }

    #[test]
    fn store_through_double_pointer() {
        let prog = parse_program("f(p) { **p = 1; return 0; }").unwrap();
        let StmtKind::Store { pointer, .. } = &prog.functions[0].body[0].kind else {
            panic!("expected store")
        };
        assert_eq!(print_expr(pointer), "*p");
    }

    #[test]
    fn missing_return_is_reported() {
        let err = parse_program("main() { var x; x = 1; }").unwrap_err();
        assert!(matches!(err, ParseError::Unexpected { .. }), "got {err:?}");
    }
}
