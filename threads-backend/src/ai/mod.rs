pub mod openai;
pub mod persona;

pub use openai::OpenAIClient;
pub use persona::{persona_prompt, sample_replies, SampleReply, SAMPLE_MESSAGES};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::BotResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Turns an incoming message into the persona's reply text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn generate_reply(&self, message: &str) -> BotResult<String>;
}
