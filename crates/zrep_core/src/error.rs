use serde::{Deserialize, Serialize};
use std::fmt;

/// Single structured error shape shared by the engine and its adapters.
///
/// `code` is stable and machine-matchable (`PERIOD_*`, `SOURCE_*`, `REPORT_*`, `ZBX_*`);
/// `details` accumulates human context such as host scope, time range or row index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Append caller context to `details`, keeping the original code and retry flag intact.
    pub fn with_context(mut self, context: impl AsRef<str>) -> Self {
        let context = context.as_ref();
        self.details = Some(match self.details.take() {
            Some(existing) if !existing.is_empty() => format!("{context}; {existing}"),
            _ => context.to_string(),
        });
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
