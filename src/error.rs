//! Errors raised inside one polling iteration.
//!
//! Every [`PollError`] is recoverable: the loop driver logs it, reports it to
//! the chat (once per distinct text) and carries on. A [`MessageError`] is
//! only logged. Startup failures live in [`crate::config::ConfigError`].
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("unexpected API response: {0}")]
    Schema(#[from] SchemaError),
    #[error("undocumented homework status: {}", .0.as_deref().unwrap_or("<absent>"))]
    UnknownStatus(Option<String>),
}

/// A chat notification could not be delivered.
#[derive(Debug, Error)]
#[error("failed to send message: {0}")]
pub struct MessageError(pub String);

/// The status API could not be reached or answered with something other
/// than HTTP 200.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("status API responded with HTTP {0}")]
    Status(u16),
    #[error("status API request failed: {0}")]
    Request(#[source] reqwest::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // The URL carries `from_date`; dropping it keeps repeated failures
        // textually identical.
        TransportError::Request(err.without_url())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("not a mapping")]
    NotAMapping,
    #[error("missing homeworks key")]
    MissingHomeworks,
    #[error("homeworks is not a list")]
    HomeworksNotAList,
    #[error("empty homeworks list")]
    EmptyHomeworks,
    #[error("homework is not a mapping")]
    HomeworkNotAMapping,
    #[error("missing homework_name key")]
    MissingHomeworkName,
}

impl PollError {
    /// Short label for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            PollError::Transport(_) => "transport",
            PollError::Schema(_) => "schema",
            PollError::UnknownStatus(_) => "unknown_status",
        }
    }
}
