//! Script front end.
//!
//! Learner block programs arrive as a small JavaScript-like script. This
//! module turns that text into a [`Program`] the evaluator can walk:
//!
//! - [`lexer`] — `nom`-based tokenizer with line/column spans.
//! - [`parser`] — recursive-descent parser with JS operator precedence.
//! - [`ast`] — the syntax tree.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use lexer::{Span, Token};
pub use parser::parse_function_body;

/// Syntax error with the position it was detected at.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (line {}, column {})", span.line, span.column)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}
