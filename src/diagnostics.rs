//! Parser diagnostics: reported to a pluggable sink rather than printed
//! directly, with a standard-error sink as the default.

use crate::position::Range;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One parser diagnostic, handed to a sink as a plain value rather than a
/// formatted string so callers can render it however they like.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub range: Range,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, range: Range) -> Self {
        Self {
            severity,
            message: message.into(),
            range,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.range)
    }
}

/// The sink collaborator parsers report diagnostics through. Implement this
/// to route diagnostics into a logger, an LSP client, or a test harness.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Default sink: logs through `tracing` at `warn` level, matching how the
/// rest of the ambient stack surfaces non-fatal problems.
#[derive(Debug, Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => tracing::warn!(%diagnostic, "parser diagnostic"),
            Severity::Error => tracing::error!(%diagnostic, "parser diagnostic"),
        }
    }
}

/// In-memory sink used internally by [`crate::Document`] so diagnostics
/// remain inspectable after parsing without capturing stderr.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
