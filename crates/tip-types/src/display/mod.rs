//! Type display.
//!
//! - `Display for Type`: the raw shape, with deferred references shown as `⟦term⟧`
//! - `pretty`: store-aware rendering that resolves deferred references

mod pretty;

pub use pretty::{render_key, render_type};

use crate::types::Type;

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Pointer(None) => write!(f, "↑_"),
            Type::Pointer(Some(t)) => match t.as_ref() {
                Type::Function { .. } | Type::Recursive { .. } => write!(f, "↑({t})"),
                t => write!(f, "↑{t}"),
            },
            Type::Function { params, ret } => {
                let ps = params.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ");
                match ret {
                    Some(r) => write!(f, "({ps}) -> {r}"),
                    None => write!(f, "({ps}) -> _"),
                }
            }
            Type::Record(fields) => {
                let fs = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect::<Vec<_>>();
                write!(f, "{{{}}}", fs.join(", "))
            }
            Type::Var(tv) => write!(f, "{tv}"),
            Type::Recursive { bound, body } => write!(f, "μ{bound}.{body}"),
            Type::Deferred(term) => write!(f, "⟦{term}⟧"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{Term, TvId, Type};

    #[test]
    fn raw_shapes() {
        let f = Type::function(vec![Type::Int, Type::Pointer(None)], Type::Var(TvId(1)));
        assert_eq!(f.to_string(), "(int, ↑_) -> β");
        assert_eq!(Type::pointer(f).to_string(), "↑((int, ↑_) -> β)");
        let r = Type::Record([("x".to_string(), Type::deferred(Term::var("main", "a")))].into());
        assert_eq!(r.to_string(), "{x: ⟦a⟧}");
    }
}
