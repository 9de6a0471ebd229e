use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use tip_lexer::{lex_skip_comments, Tok};

fn format_tokens(src: &str) -> String {
    let toks = lex_skip_comments(src).expect("lexes");
    let mut out = String::new();
    for t in toks {
        let k = match t.tok {
            Tok::LBrace => "LBrace",
            Tok::RBrace => "RBrace",
            Tok::LParen => "LParen",
            Tok::RParen => "RParen",
            Tok::Comma => "Comma",
            Tok::Semicolon => "Semicolon",
            Tok::Colon => "Colon",
            Tok::Dot => "Dot",
            Tok::Amp => "Amp",
            Tok::EqEq => "EqEq",
            Tok::Eq => "Eq",
            Tok::Greater => "Greater",
            Tok::Plus => "Plus",
            Tok::Minus => "Minus",
            Tok::Star => "Star",
            Tok::Slash => "Slash",
            Tok::Var => "Var",
            Tok::Return => "Return",
            Tok::If => "If",
            Tok::Else => "Else",
            Tok::While => "While",
            Tok::Output => "Output",
            Tok::Input => "Input",
            Tok::Alloc => "Alloc",
            Tok::Null => "Null",
            Tok::Int(_) => "Int",
            Tok::Ident => "Ident",
            Tok::CommentLine | Tok::CommentBlock | Tok::_Whitespace => unreachable!(),
        };
        out.push_str(&format!("{}:{}\n", k, t.text));
    }
    out
}

fn read_golden(name: &str) -> String {
    let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.pop(); // tip-lexer
    p.pop(); // crates
    p.push("goldens");
    p.push(format!("{}.golden", name));
    fs::read_to_string(p).expect("read golden")
}

#[test]
fn golden_pointer_statements() {
    let input = "y = alloc x; *y = 2; z = &x; p = null;";
    let got = format_tokens(input);
    let want = read_golden("pointer_statements");
    assert_eq!(got.trim(), want.trim());
}

#[test]
fn golden_records_and_comments() {
    let input = "p = {x: 1, y: 2}; // line\n/* block */ return p.x == 10 > input;";
    let got = format_tokens(input);
    let want = read_golden("records_and_comments");
    assert_eq!(got.trim(), want.trim());
}
