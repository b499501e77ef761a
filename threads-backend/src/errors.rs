use thiserror::Error;

/// Errors surfaced by the Threads adapters, the completion adapter and the
/// flows built on top of them.
#[derive(Debug, Error)]
pub enum BotError {
    /// A required credential is not configured. Fatal at startup.
    #[error("{0} is not configured")]
    AuthMissing(&'static str),

    /// Non-success HTTP status or transport failure from an upstream service.
    #[error("{service} request failed{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    UpstreamUnavailable {
        service: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// The caller's own account id could not be resolved.
    #[error("account not found")]
    AccountNotFound,

    /// Inbound webhook body did not match a known shape.
    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),

    /// The completion endpoint failed or returned nothing usable.
    #[error("reply generation failed: {0}")]
    Generation(String),

    /// A container was created but never became a live post.
    #[error("container {container_id} was not published: {reason}")]
    PublishIncomplete { container_id: String, reason: String },

    #[error("run cancelled")]
    Cancelled,
}

impl BotError {
    pub fn upstream(service: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        BotError::UpstreamUnavailable {
            service,
            status,
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BotError::Cancelled)
    }
}

pub type BotResult<T> = Result<T, BotError>;
