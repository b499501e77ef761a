pub mod health;
pub mod threads;
pub mod webhook;

use actix_web::HttpResponse;

use crate::errors::BotError;

/// `{"error": ..}` body with a status derived from the error kind.
pub fn error_response(err: &BotError) -> HttpResponse {
    let body = serde_json::json!({ "error": err.to_string() });
    match err {
        BotError::AuthMissing(_) => HttpResponse::InternalServerError().json(body),
        BotError::AccountNotFound => HttpResponse::NotFound().json(body),
        BotError::MalformedPayload(_) => HttpResponse::BadRequest().json(body),
        BotError::UpstreamUnavailable { status: Some(404), .. } => HttpResponse::NotFound().json(body),
        BotError::UpstreamUnavailable { .. }
        | BotError::Generation(_)
        | BotError::PublishIncomplete { .. } => HttpResponse::BadGateway().json(body),
        BotError::Cancelled => HttpResponse::ServiceUnavailable().json(body),
    }
}

pub fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message.into() }))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::ai::CompletionProvider;
    use crate::channels::WebhookDispatcher;
    use crate::config::ThreadsConfig;
    use crate::pacing::{Pacer, RecordingClock};
    use crate::threads::{ReadinessWait, ThreadsClient, ThreadsPublisher, ThreadsReader, TwoStepPublisher};
    use crate::AppState;

    pub const VERIFY_TOKEN: &str = "verify-me";

    pub fn threads_config(api_base: &str) -> ThreadsConfig {
        ThreadsConfig {
            access_token: "test-token".to_string(),
            api_base: api_base.to_string(),
            replies_page_size: 50,
            readiness: ReadinessWait::FixedDelay(Duration::ZERO),
        }
    }

    /// State whose dispatcher and publisher run on `platform`, with
    /// `threads` serving the proxy routes.
    pub fn state<P>(threads: ThreadsClient, platform: Arc<P>, completion: Arc<dyn CompletionProvider>) -> AppState
    where
        P: ThreadsReader + ThreadsPublisher + 'static,
    {
        let pacer = Pacer::new(Arc::new(RecordingClock::default()), Default::default());
        let publisher = TwoStepPublisher::new(platform.clone(), ReadinessWait::FixedDelay(Duration::ZERO), pacer);
        let dispatcher = Arc::new(WebhookDispatcher::new(platform, completion.clone(), publisher.clone()));
        AppState {
            verify_token: VERIFY_TOKEN.to_string(),
            threads: Arc::new(threads),
            completion,
            publisher,
            dispatcher,
        }
    }
}
