//! Diagnostics and refinement outcomes shared between daemon and clients.
//!
//! A refinement either succeeds with a value (possibly annotated with
//! reports) or fails with at least one diagnostic explaining why. Both
//! shapes cross the process boundary whole, so everything here serializes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How serious a diagnostic is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Position in a script (1-indexed line and column).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Place in a named script a diagnostic points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Name of the script unit, as carried in its source handle.
    pub script: String,
    pub position: SourcePosition,
}

/// A single structured message produced while refining a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            location: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if let Some(location) = &self.location {
            write!(
                f,
                " ({}:{}:{})",
                location.script, location.position.line, location.position.column
            )?;
        }
        Ok(())
    }
}

/// Outcome of an operation that reports diagnostics alongside its result.
///
/// Reports are ordered first-to-last as produced. A `Failure` always
/// carries at least one diagnostic; the constructors maintain this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ResultWithDiagnostics<T> {
    Success {
        value: T,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        reports: Vec<Diagnostic>,
    },
    Failure {
        reports: Vec<Diagnostic>,
    },
}

impl<T> ResultWithDiagnostics<T> {
    pub const fn success(value: T) -> Self {
        Self::Success {
            value,
            reports: Vec::new(),
        }
    }

    pub const fn success_with(value: T, reports: Vec<Diagnostic>) -> Self {
        Self::Success { value, reports }
    }

    pub fn failure(report: Diagnostic) -> Self {
        Self::Failure {
            reports: vec![report],
        }
    }

    /// Build a failure from collected reports, keeping the nonempty invariant.
    pub fn failure_all(mut reports: Vec<Diagnostic>) -> Self {
        if reports.is_empty() {
            reports.push(Diagnostic::error("operation failed without reporting a diagnostic"));
        }
        Self::Failure { reports }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Success { value, .. } => Some(value),
            Self::Failure { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Success { value, .. } => Some(value),
            Self::Failure { .. } => None,
        }
    }

    pub fn reports(&self) -> &[Diagnostic] {
        match self {
            Self::Success { reports, .. } | Self::Failure { reports } => reports,
        }
    }

    /// Transform the success value; failures pass through unchanged.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResultWithDiagnostics<U> {
        match self {
            Self::Success { value, reports } => ResultWithDiagnostics::Success {
                value: f(value),
                reports,
            },
            Self::Failure { reports } => ResultWithDiagnostics::Failure { reports },
        }
    }
}
