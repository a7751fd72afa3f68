//! Syntax tree and parsing primitives for the Corten refactoring engine.
//!
//! This crate lexes and parses a practical subset of Rust into an immutable,
//! arena-indexed syntax tree: nodes are indices into a fixed table built once
//! per parse, parent lookup is index-chasing, and the flat token stream
//! (trivia included) is kept alongside so consumers can strip trivia for
//! structural comparisons and map offsets back to tokens.
//!
//! Parsing is error-tolerant: [`parse`] always yields a tree, collecting
//! [`ParseError`]s and wrapping unexpected tokens in `Error` nodes.

mod lexer;
mod parser;
mod syntax_kind;
mod tree;


pub use lexer::{lex, Token};
pub use parser::{parse, ParseResult};
pub use syntax_kind::SyntaxKind;
pub use text_size::{TextRange, TextSize};
pub use tree::{Checkpoint, Descendants, NodeId, SyntaxTree, TreeBuilder};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A recoverable syntax error tied to the token where it was detected.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message} at {range:?}")]
pub struct ParseError {
    pub message: String,
    pub range: TextRange,
}
