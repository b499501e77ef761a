use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use super::persona::persona_prompt;
use super::{CompletionProvider, Message, MessageRole};
use crate::config::OpenAiConfig;
use crate::errors::{BotError, BotResult};

/// Sampling temperature for persona replies
const TEMPERATURE: f32 = 0.8;

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    auth_headers: header::HeaderMap,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OpenAICompletionRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct OpenAIMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAICompletionResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}

impl OpenAIClient {
    pub fn new(config: &OpenAiConfig) -> BotResult<Self> {
        Self::with_client(crate::http::shared_client().clone(), config)
    }

    pub fn with_client(client: Client, config: &OpenAiConfig) -> BotResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(BotError::AuthMissing(crate::config::env_vars::OPENAI_API_KEY));
        }

        let mut auth_headers = header::HeaderMap::new();
        auth_headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let auth_value = header::HeaderValue::from_str(&format!("Bearer {}", config.api_key.trim()))
            .map_err(|e| BotError::Generation(format!("Invalid API key format: {}", e)))?;
        auth_headers.insert(header::AUTHORIZATION, auth_value);

        Ok(Self {
            client,
            auth_headers,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
        })
    }

    /// Single completion call; no retries.
    pub async fn generate_text(&self, messages: Vec<Message>) -> BotResult<String> {
        let request = OpenAICompletionRequest {
            model: &self.model,
            messages: messages
                .into_iter()
                .map(|m| OpenAIMessage {
                    role: m.role.to_string(),
                    content: Some(m.content),
                })
                .collect(),
            temperature: TEMPERATURE,
        };

        log::info!("[OPENAI] Sending request to {} with model {}", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.auth_headers.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| BotError::Generation(format!("OpenAI API request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BotError::Generation(format!("Failed to read OpenAI response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<OpenAIErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            log::error!("[OPENAI] API returned {}: {}", status.as_u16(), message);
            return Err(BotError::Generation(format!(
                "OpenAI API error ({}): {}",
                status.as_u16(),
                message
            )));
        }

        let parsed: OpenAICompletionResponse = serde_json::from_str(&body)
            .map_err(|e| BotError::Generation(format!("Failed to parse OpenAI response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(BotError::Generation("OpenAI returned an empty completion".to_string()));
        }

        log::debug!("[OPENAI] Completion: {}", content);
        Ok(content)
    }
}

#[async_trait]
impl CompletionProvider for OpenAIClient {
    async fn generate_reply(&self, message: &str) -> BotResult<String> {
        self.generate_text(vec![Message {
            role: MessageRole::User,
            content: persona_prompt(message),
        }])
        .await
    }
}
