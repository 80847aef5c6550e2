use thiserror::Error;

use crate::history::AgentHistory;
use crate::validate::ValidationError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("Scenario source error: {0}")]
    ScenarioSource(#[from] csv::Error),

    #[error("Backend {provider} failed: {message}")]
    Backend { provider: String, message: String },

    #[error("All language-model backends failed; last error: {0}")]
    BackendsExhausted(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Browser launch failed: {0}")]
    LaunchError(String),

    #[error("Navigation failed: {0}")]
    NavigationError(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("JavaScript error: {0}")]
    JsError(String),

    #[error("CDP error: {0}")]
    CdpError(#[from] chromiumoxide::error::CdpError),

    #[error("Agent execution failed: {0}")]
    Execution(String),

    /// The agent run stopped on `source`; `history` holds the steps recorded up to it.
    #[error("Agent run aborted after {} steps: {source}", .history.history.len())]
    RunAborted {
        history: Box<AgentHistory>,
        source: Box<Error>,
    },

    #[error("Agent output is not a valid result record: {0}")]
    UnparseableResult(String),

    #[error("Login precondition failed for scenario '{scenario}': {reason}")]
    LoginFailed { scenario: String, reason: String },

    #[error("Browser session is closed")]
    SessionClosed,

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Coarse failure category, so callers can decide between retrying and giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Backend,
    Execution,
    Validation,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::RunAborted { source, .. } => source.kind(),
            Error::Config(_) | Error::UnknownScenario(_) | Error::ScenarioSource(_) => {
                ErrorKind::Configuration
            }
            Error::Backend { .. } | Error::BackendsExhausted(_) | Error::Http(_) => {
                ErrorKind::Backend
            }
            Error::LaunchError(_)
            | Error::NavigationError(_)
            | Error::ElementNotFound(_)
            | Error::Timeout(_)
            | Error::JsError(_)
            | Error::CdpError(_)
            | Error::Execution(_)
            | Error::UnparseableResult(_)
            | Error::LoginFailed { .. }
            | Error::SessionClosed => ErrorKind::Execution,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Json(_) | Error::IoError(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
