//! A two-stage frontend pipeline for the Gularen lightweight markup language:
//! a context-sensitive lexer and a recursive-descent parser that together
//! turn source text into a typed document tree.
//!
//! The common entry point is [`Document`], which owns a parsed tree plus the
//! diagnostics collected while building it. Lower-level pieces ([`lexer`],
//! [`parser`]) are exposed for callers that want tokens or a tree without the
//! file-handling convenience layer.

pub mod ast;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod include;
pub mod json;
pub mod lexer;
pub mod parser;
pub mod position;
pub mod token;

pub use ast::{Node, NodeKind};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, Severity, StderrSink};
pub use document::{Config, Document};
pub use error::{IncludeError, IncludeResult};
pub use include::{FsIncludeResolver, IncludeResolver};
pub use position::{Position, Range};
pub use token::{Token, TokenKind};
