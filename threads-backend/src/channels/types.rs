use serde::{Deserialize, Serialize};

/// Notification normalized from either webhook payload shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Text of the reply or mention that triggered the notification
    pub message_text: String,
    /// Platform id of that reply/mention; the bot replies to this id
    pub source_id: String,
    pub author_username: Option<String>,
    pub author_id: Option<String>,
    pub timestamp: Option<String>,
}

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Replied { source_id: String, reply_id: String },
    Skipped { source_id: String, reason: String },
    Failed { source_id: String, error: String },
}

impl DeliveryOutcome {
    pub fn source_id(&self) -> &str {
        match self {
            DeliveryOutcome::Replied { source_id, .. }
            | DeliveryOutcome::Skipped { source_id, .. }
            | DeliveryOutcome::Failed { source_id, .. } => source_id,
        }
    }
}
