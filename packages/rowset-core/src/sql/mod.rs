//! Statement dialect understood by the embedded store.
//!
//! Text is tokenized by the [`lexer`], turned into an [`ast::Statement`] by
//! the [`parser`], and handed to the executor. Every syntax error surfaces as
//! [`DbError::ExecutionError`].

pub mod ast;
pub mod lexer;
pub mod parser;

pub use parser::Parser;

use crate::error::DbError;

/// Builds the error returned for malformed statement text.
pub(crate) fn parse_error(message: impl std::fmt::Display) -> DbError {
    DbError::ExecutionError(format!("parse error: {}", message))
}
