use logos::{Lexer, Logos};
use tip_ast::span::Span;

#[derive(Debug, Logos, PartialEq, Clone)]
pub enum Tok {
    // Whitespace is skipped
    #[regex(r"[ \t\r\n]+", logos::skip)]
    _Whitespace,

    // Comments are preserved in token stream
    #[regex(r"//[^\n]*")]
    CommentLine,
    #[regex(r"/\*", parse_block_comment)]
    CommentBlock,

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("&")]
    Amp,
    // '==' is matched before '=' (longest match)
    #[token("==")]
    EqEq,
    #[token("=")]
    Eq,
    #[token(">")]
    Greater,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    // Keywords win over Ident for equal-length matches
    #[token("var")]
    Var,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("output")]
    Output,
    #[token("input")]
    Input,
    #[token("alloc")]
    Alloc,
    #[token("null")]
    Null,

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

impl Tok {
    /// Short human-readable token name used in parse errors.
    pub fn describe(&self) -> &'static str {
        match self {
            Tok::_Whitespace => "whitespace",
            Tok::CommentLine | Tok::CommentBlock => "comment",
            Tok::LBrace => "'{'",
            Tok::RBrace => "'}'",
            Tok::LParen => "'('",
            Tok::RParen => "')'",
            Tok::Comma => "','",
            Tok::Semicolon => "';'",
            Tok::Colon => "':'",
            Tok::Dot => "'.'",
            Tok::Amp => "'&'",
            Tok::EqEq => "'=='",
            Tok::Eq => "'='",
            Tok::Greater => "'>'",
            Tok::Plus => "'+'",
            Tok::Minus => "'-'",
            Tok::Star => "'*'",
            Tok::Slash => "'/'",
            Tok::Var => "'var'",
            Tok::Return => "'return'",
            Tok::If => "'if'",
            Tok::Else => "'else'",
            Tok::While => "'while'",
            Tok::Output => "'output'",
            Tok::Input => "'input'",
            Tok::Alloc => "'alloc'",
            Tok::Null => "'null'",
            Tok::Int(_) => "integer",
            Tok::Ident => "identifier",
        }
    }
}

fn parse_block_comment(lex: &mut Lexer<Tok>) -> Option<()> {
    // We have just matched "/*"; consume until the first "*/" (no nesting, as in C)
    let s = lex.remainder();
    match s.find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            Some(())
        }
        // Unterminated: report as a lexing error
        None => None,
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unexpected input '{text}' at ({offset},{len})")]
pub struct LexError {
    pub text: String,
    pub offset: usize,
    pub len: usize,
}

#[derive(Debug, Clone)]
pub struct Lexed<'a> {
    pub tok: Tok,
    pub span: Span,
    pub text: &'a str,
}

pub fn lex(input: &str) -> Result<Vec<Lexed<'_>>, LexError> {
    let mut out = Vec::new();
    let mut l = Tok::lexer(input);
    while let Some(res) = l.next() {
        let range = l.span();
        match res {
            Ok(tok) => out.push(Lexed {
                tok,
                span: Span::new(range.start, range.len()),
                text: &input[range.clone()],
            }),
            Err(()) => {
                return Err(LexError {
                    text: input[range.clone()].to_string(),
                    offset: range.start,
                    len: range.len(),
                })
            }
        }
    }
    Ok(out)
}

// Convenience: lex while skipping comments (useful for parser)
pub fn lex_skip_comments(input: &str) -> Result<Vec<Lexed<'_>>, LexError> {
    Ok(lex(input)?
        .into_iter()
        .filter(|lx| !matches!(lx.tok, Tok::CommentLine | Tok::CommentBlock))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_not_identifiers() {
        let toks = lex_skip_comments("var variable alloc allocx").unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.tok.clone()).collect();
        assert_eq!(kinds, vec![Tok::Var, Tok::Ident, Tok::Alloc, Tok::Ident]);
    }

    #[test]
    fn unknown_character_is_an_error() {
        let err = lex("x = 1 @ 2;").unwrap_err();
        assert_eq!(err.text, "@");
        assert_eq!(err.offset, 6);
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        assert!(lex("x /* never closed").is_err());
    }
}
