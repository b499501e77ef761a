pub mod ai;
pub mod auto_reply;
pub mod channels;
pub mod config;
pub mod controllers;
pub mod errors;
pub mod http;
pub mod pacing;
pub mod threads;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use ai::{CompletionProvider, OpenAIClient};
use channels::WebhookDispatcher;
use config::Config;
use errors::BotResult;
use pacing::Pacer;
use threads::{ThreadsClient, TwoStepPublisher};

/// Shared state handed to every route
pub struct AppState {
    pub verify_token: String,
    pub threads: Arc<ThreadsClient>,
    pub completion: Arc<dyn CompletionProvider>,
    pub publisher: TwoStepPublisher,
    pub dispatcher: Arc<WebhookDispatcher>,
}

impl AppState {
    /// Wire the real adapters. Fails when the completion key is missing.
    pub fn from_config(config: &Config) -> BotResult<Self> {
        let threads = Arc::new(ThreadsClient::new(&config.threads));
        let completion: Arc<dyn CompletionProvider> = Arc::new(OpenAIClient::new(&config.openai)?);
        let publisher = TwoStepPublisher::new(
            threads.clone(),
            config.threads.readiness,
            Pacer::wall_clock(),
        );
        let dispatcher = Arc::new(WebhookDispatcher::new(
            threads.clone(),
            completion.clone(),
            publisher.clone(),
        ));

        Ok(Self {
            verify_token: config.verify_token.clone(),
            threads,
            completion,
            publisher,
            dispatcher,
        })
    }
}
