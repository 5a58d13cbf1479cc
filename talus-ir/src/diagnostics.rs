//! Compiler diagnostics and fatal errors.

use talus_ast::SourceRange;
use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Severity {
    Warning,
    Error,
}

/// A non-fatal diagnostic, attached to a source range, collected during
/// IR-gen or a pass run.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub range: SourceRange,
    pub message: String,
}

impl Diagnostic {
    pub fn error(range: SourceRange, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            range,
            message: message.into(),
        }
    }

    pub fn warning(range: SourceRange, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            range,
            message: message.into(),
        }
    }
}

/// A fatal condition that aborts compilation outright, as opposed to a
/// `Diagnostic` that's merely collected and reported alongside others.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("malformed IR: {0}")]
    Malformed(String),

    #[error("unresolved identifier `{0}`")]
    UnresolvedIdentifier(String),

    #[error("{0} fatal diagnostic(s) reported")]
    DiagnosticsReported(usize),
}
