//! Type error definitions.
//!
//! Every variant carries the offending construct as source text, the rendered types
//! involved, and the span of the AST node it was found at. All checks are cumulative:
//! the solver returns every error it finds.

use serde::Serialize;
use tip_ast::span::Span;

/// Diagnostics produced by the solver.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeError {
    #[error("cannot unify {left} : {left_type} with {right} : {right_type} in {origin} of '{function}' at ({span_offset},{span_len})")]
    UnificationConflict {
        origin: String,
        function: String,
        left: String,
        left_type: String,
        right: String,
        right_type: String,
        span_offset: usize,
        span_len: usize,
    },
    #[error("cannot dereference {expr}: expected a pointer, found {found} at ({span_offset},{span_len})")]
    DereferenceOfNonPointer { expr: String, found: String, span_offset: usize, span_len: usize },
    #[error("cannot store {value} : {found} through {pointer} : ↑{expected} at ({span_offset},{span_len})")]
    PointerStoreMismatch {
        pointer: String,
        value: String,
        expected: String,
        found: String,
        span_offset: usize,
        span_len: usize,
    },
    #[error("alloc expects an int, found {found} for {expr} at ({span_offset},{span_len})")]
    InvalidAllocArgument { expr: String, found: String, span_offset: usize, span_len: usize },
    #[error("operand {operand} of '{op}' must be an int, found {found} at ({span_offset},{span_len})")]
    NonIntegerOperand {
        op: String,
        operand: String,
        found: String,
        span_offset: usize,
        span_len: usize,
    },
    #[error("cannot call {callee}: it is {found}, not a function at ({span_offset},{span_len})")]
    NotCallable { callee: String, found: String, span_offset: usize, span_len: usize },
    #[error("argument {index} of {callee} ({arg}) has type {found}, expected {expected} at ({span_offset},{span_len})")]
    ArgumentTypeMismatch {
        callee: String,
        index: usize,
        arg: String,
        expected: String,
        found: String,
        span_offset: usize,
        span_len: usize,
    },
    #[error("variable '{var}' in '{function}' is assigned values of different kinds: {kinds} at ({span_offset},{span_len})")]
    InconsistentVariableType {
        function: String,
        var: String,
        kinds: String,
        span_offset: usize,
        span_len: usize,
    },
    #[error("record {record} : {record_type} has no field '{field}' at ({span_offset},{span_len})")]
    MissingField {
        record: String,
        record_type: String,
        field: String,
        span_offset: usize,
        span_len: usize,
    },
    #[error("{callee} expects {expected} argument(s) but is called with {found} at ({span_offset},{span_len})")]
    ArityMismatch {
        callee: String,
        expected: usize,
        found: usize,
        span_offset: usize,
        span_len: usize,
    },
}

/// The closed error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ErrorKind {
    UnificationConflict,
    DereferenceOfNonPointer,
    PointerStoreMismatch,
    InvalidAllocArgument,
    NonIntegerOperand,
    NotCallable,
    ArgumentTypeMismatch,
    InconsistentVariableType,
    MissingField,
    ArityMismatch,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 10] = [
        ErrorKind::UnificationConflict,
        ErrorKind::DereferenceOfNonPointer,
        ErrorKind::PointerStoreMismatch,
        ErrorKind::InvalidAllocArgument,
        ErrorKind::NonIntegerOperand,
        ErrorKind::NotCallable,
        ErrorKind::ArgumentTypeMismatch,
        ErrorKind::InconsistentVariableType,
        ErrorKind::MissingField,
        ErrorKind::ArityMismatch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnificationConflict => "UnificationConflict",
            ErrorKind::DereferenceOfNonPointer => "DereferenceOfNonPointer",
            ErrorKind::PointerStoreMismatch => "PointerStoreMismatch",
            ErrorKind::InvalidAllocArgument => "InvalidAllocArgument",
            ErrorKind::NonIntegerOperand => "NonIntegerOperand",
            ErrorKind::NotCallable => "NotCallable",
            ErrorKind::ArgumentTypeMismatch => "ArgumentTypeMismatch",
            ErrorKind::InconsistentVariableType => "InconsistentVariableType",
            ErrorKind::MissingField => "MissingField",
            ErrorKind::ArityMismatch => "ArityMismatch",
        }
    }

    /// Stable short code, `T001`..`T010` in taxonomy order.
    pub fn code(self) -> String {
        let n = ErrorKind::ALL.iter().position(|k| *k == self).map_or(0, |i| i + 1);
        format!("T{n:03}")
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TypeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TypeError::UnificationConflict { .. } => ErrorKind::UnificationConflict,
            TypeError::DereferenceOfNonPointer { .. } => ErrorKind::DereferenceOfNonPointer,
            TypeError::PointerStoreMismatch { .. } => ErrorKind::PointerStoreMismatch,
            TypeError::InvalidAllocArgument { .. } => ErrorKind::InvalidAllocArgument,
            TypeError::NonIntegerOperand { .. } => ErrorKind::NonIntegerOperand,
            TypeError::NotCallable { .. } => ErrorKind::NotCallable,
            TypeError::ArgumentTypeMismatch { .. } => ErrorKind::ArgumentTypeMismatch,
            TypeError::InconsistentVariableType { .. } => ErrorKind::InconsistentVariableType,
            TypeError::MissingField { .. } => ErrorKind::MissingField,
            TypeError::ArityMismatch { .. } => ErrorKind::ArityMismatch,
        }
    }

    /// Span of the AST node the error is reported at.
    pub fn primary_span(&self) -> Span {
        match self {
            TypeError::UnificationConflict { span_offset, span_len, .. }
            | TypeError::DereferenceOfNonPointer { span_offset, span_len, .. }
            | TypeError::PointerStoreMismatch { span_offset, span_len, .. }
            | TypeError::InvalidAllocArgument { span_offset, span_len, .. }
            | TypeError::NonIntegerOperand { span_offset, span_len, .. }
            | TypeError::NotCallable { span_offset, span_len, .. }
            | TypeError::ArgumentTypeMismatch { span_offset, span_len, .. }
            | TypeError::InconsistentVariableType { span_offset, span_len, .. }
            | TypeError::MissingField { span_offset, span_len, .. }
            | TypeError::ArityMismatch { span_offset, span_len, .. } => {
                Span::new(*span_offset, *span_len)
            }
        }
    }

    /// The construct the error is about, as source text.
    pub fn subject(&self) -> &str {
        match self {
            TypeError::UnificationConflict { left, .. } => left,
            TypeError::DereferenceOfNonPointer { expr, .. }
            | TypeError::InvalidAllocArgument { expr, .. } => expr,
            TypeError::PointerStoreMismatch { pointer, .. } => pointer,
            TypeError::NonIntegerOperand { operand, .. } => operand,
            TypeError::NotCallable { callee, .. }
            | TypeError::ArgumentTypeMismatch { callee, .. }
            | TypeError::ArityMismatch { callee, .. } => callee,
            TypeError::InconsistentVariableType { var, .. } => var,
            TypeError::MissingField { record, .. } => record,
        }
    }

    /// Get fix-it hints for this error.
    pub fn fix_hints(&self) -> Vec<String> {
        match self {
            TypeError::DereferenceOfNonPointer { expr, found, .. } => vec![
                format!("{expr} holds {found}; only pointers can be dereferenced"),
                "Initialize it with alloc, &x or null before using *".to_string(),
            ],
            TypeError::PointerStoreMismatch { expected, found, .. } => {
                vec![format!("The pointer targets {expected}; store a value of that type, not {found}")]
            }
            TypeError::InvalidAllocArgument { .. } => {
                vec!["alloc takes the initial integer value of the new cell".to_string()]
            }
            TypeError::NonIntegerOperand { found, .. } if found.starts_with('↑') => vec![
                "Pointer arithmetic and pointer comparison are not supported".to_string(),
                "Dereference the pointer with * to use the value it points to".to_string(),
            ],
            TypeError::NonIntegerOperand { .. } => {
                vec!["Arithmetic and comparison operators work on ints only".to_string()]
            }
            TypeError::NotCallable { callee, .. } => {
                vec![format!("Check that {callee} is a function or holds one")]
            }
            TypeError::ArityMismatch { callee, expected, .. } => {
                vec![format!("Call {callee} with exactly {expected} argument(s)")]
            }
            TypeError::InconsistentVariableType { var, .. } => vec![
                format!("Use separate variables for the different kinds of value assigned to {var}"),
            ],
            TypeError::MissingField { field, record_type, .. } if record_type.starts_with('{') => {
                vec![format!("Available fields: {record_type}; '{field}' is not one of them")]
            }
            TypeError::MissingField { record, .. } => {
                vec![format!("Only records have fields; {record} is not a record")]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn codes_follow_taxonomy_order() {
        assert_eq!(ErrorKind::UnificationConflict.code(), "T001");
        assert_eq!(ErrorKind::ArityMismatch.code(), "T010");
    }

    #[test]
    fn message_cites_construct_and_span() {
        let e = TypeError::DereferenceOfNonPointer {
            expr: "x".into(),
            found: "int".into(),
            span_offset: 30,
            span_len: 2,
        };
        assert_eq!(e.to_string(), "cannot dereference x: expected a pointer, found int at (30,2)");
        assert_eq!(e.kind(), ErrorKind::DereferenceOfNonPointer);
        assert_eq!(e.primary_span(), Span::new(30, 2));
    }
}
