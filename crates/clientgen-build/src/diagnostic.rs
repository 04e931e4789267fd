//! Host-facing diagnostics.
//!
//! Everything the engine wants the host to see flows through a
//! [`DiagnosticSink`]. [`Reporter`] mirrors each diagnostic to `tracing`
//! before forwarding it, so a host without a sink still gets logs.

use derive_more::Display;
use serde::Serialize;
use std::{cell::RefCell, path::PathBuf};

///
/// Severity
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

///
/// Span
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Span {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

///
/// Diagnostic
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            subcategory: None,
            help: None,
            file: None,
            span: None,
        }
    }

    #[must_use]
    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    #[must_use]
    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    #[must_use]
    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    #[must_use]
    pub const fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

///
/// DiagnosticSink
///

pub trait DiagnosticSink {
    fn report(&self, diagnostic: Diagnostic);
}

///
/// DiagnosticBuffer
/// Collecting sink for hosts that render diagnostics after the run.
///

#[derive(Debug, Default)]
pub struct DiagnosticBuffer {
    entries: RefCell<Vec<Diagnostic>>,
}

impl DiagnosticBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    #[must_use]
    pub fn with_severity(&self, severity: Severity) -> Vec<Diagnostic> {
        self.entries
            .borrow()
            .iter()
            .filter(|d| d.severity == severity)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    /// Drain everything collected so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        self.entries.take()
    }
}

impl DiagnosticSink for DiagnosticBuffer {
    fn report(&self, diagnostic: Diagnostic) {
        self.entries.borrow_mut().push(diagnostic);
    }
}

///
/// NullSink
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&self, _: Diagnostic) {}
}

///
/// Reporter
///

#[derive(Clone, Copy)]
pub struct Reporter<'a> {
    sink: &'a dyn DiagnosticSink,
}

impl<'a> Reporter<'a> {
    #[must_use]
    pub const fn new(sink: &'a dyn DiagnosticSink) -> Self {
        Self { sink }
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        let code = diagnostic.code.as_str();
        let message = diagnostic.message.as_str();
        match diagnostic.severity {
            Severity::Info => tracing::info!(code, "{message}"),
            Severity::Warning => tracing::warn!(code, "{message}"),
            Severity::Error => tracing::error!(code, "{message}"),
        }

        self.sink.report(diagnostic);
    }

    pub fn info(&self, code: &str, message: impl Into<String>) {
        self.report(Diagnostic::info(code, message));
    }

    pub fn warning(&self, code: &str, message: impl Into<String>) {
        self.report(Diagnostic::warning(code, message));
    }

    pub fn error(&self, code: &str, message: impl Into<String>) {
        self.report(Diagnostic::error(code, message));
    }
}
