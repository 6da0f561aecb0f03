//! Severity-levelled diagnostics, emitted through `tracing`

use std::fmt;

/// How serious a diagnostic is. `Error` and `Critical` end the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl Severity {
    pub fn is_fatal(self) -> bool {
        self >= Severity::Error
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }

    /// Line printed to the terminal when a fatal diagnostic ends the run
    pub fn exit_notice(self) -> Option<&'static str> {
        match self {
            Severity::Error => Some("Error, exiting, see log for more info"),
            Severity::Critical => Some("Critical error, exiting, see log for more info"),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message at a given severity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Severity::Warn, message)
    }

    /// Send the diagnostic to the installed `tracing` subscriber.
    /// `tracing` has no critical level; those go out as errors tagged `severity = "critical"`.
    pub fn emit(&self) {
        match self.severity {
            Severity::Debug => tracing::debug!("{}", self.message),
            Severity::Info => tracing::info!("{}", self.message),
            Severity::Warn => tracing::warn!("{}", self.message),
            Severity::Error => tracing::error!(severity = "error", "{}", self.message),
            Severity::Critical => tracing::error!(severity = "critical", "{}", self.message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

impl From<&crate::ResolveError> for Diagnostic {
    fn from(err: &crate::ResolveError) -> Self {
        Self::new(err.severity(), err.to_string())
    }
}
