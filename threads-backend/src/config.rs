use std::env;
use std::time::Duration;

use crate::errors::{BotError, BotResult};
use crate::threads::publish::ReadinessWait;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const THREADS_ACCESS_TOKEN: &str = "THREADS_ACCESS_TOKEN";
    pub const THREADS_API_BASE: &str = "THREADS_API_BASE";
    pub const THREADS_REPLIES_PAGE_SIZE: &str = "THREADS_REPLIES_PAGE_SIZE";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const OPENAI_ENDPOINT: &str = "OPENAI_ENDPOINT";
    pub const OPENAI_MODEL: &str = "OPENAI_MODEL";
    pub const VERIFY_TOKEN: &str = "VERIFY_TOKEN";
    pub const PORT: &str = "PORT";
    pub const HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";
    // Container readiness between create and publish
    pub const PUBLISH_WAIT_MODE: &str = "PUBLISH_WAIT_MODE";
    pub const PUBLISH_POLL_INTERVAL_MS: &str = "PUBLISH_POLL_INTERVAL_MS";
    pub const PUBLISH_READY_TIMEOUT_SECS: &str = "PUBLISH_READY_TIMEOUT_SECS";
    pub const PUBLISH_FIXED_DELAY_SECS: &str = "PUBLISH_FIXED_DELAY_SECS";
}

/// Default values
pub mod defaults {
    pub const THREADS_API_BASE: &str = "https://graph.threads.net/v1.0";
    pub const THREADS_REPLIES_PAGE_SIZE: u32 = 50;
    pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
    pub const OPENAI_MODEL: &str = "gpt-4o-mini";
    pub const PORT: u16 = 8000;
    pub const HTTP_TIMEOUT_SECS: u64 = 60;
    pub const PUBLISH_POLL_INTERVAL_MS: u64 = 1000;
    pub const PUBLISH_READY_TIMEOUT_SECS: u64 = 30;
    pub const PUBLISH_FIXED_DELAY_SECS: u64 = 5;
    /// Pause between two replies of the batch run
    pub const REPLY_PACING_SECS: u64 = 10;
    /// Pause between two posts of the batch run
    pub const POST_PACING_SECS: u64 = 15;
}

/// Read a required variable; empty values count as missing.
fn required(name: &'static str) -> BotResult<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(BotError::AuthMissing(name))
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Get the request timeout for outbound HTTP calls
pub fn http_timeout() -> Duration {
    Duration::from_secs(parsed_or(env_vars::HTTP_TIMEOUT_SECS, defaults::HTTP_TIMEOUT_SECS).max(1))
}

/// Threads Graph API settings
#[derive(Clone, Debug)]
pub struct ThreadsConfig {
    pub access_token: String,
    pub api_base: String,
    pub replies_page_size: u32,
    pub readiness: ReadinessWait,
}

impl ThreadsConfig {
    pub fn from_env() -> BotResult<Self> {
        Ok(Self {
            access_token: required(env_vars::THREADS_ACCESS_TOKEN)?,
            api_base: env::var(env_vars::THREADS_API_BASE)
                .unwrap_or_else(|_| defaults::THREADS_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            replies_page_size: parsed_or(
                env_vars::THREADS_REPLIES_PAGE_SIZE,
                defaults::THREADS_REPLIES_PAGE_SIZE,
            )
            .max(1),
            readiness: readiness_from_env(),
        })
    }
}

fn readiness_from_env() -> ReadinessWait {
    let mode = env::var(env_vars::PUBLISH_WAIT_MODE).unwrap_or_default();
    if mode.trim().eq_ignore_ascii_case("fixed") {
        ReadinessWait::FixedDelay(Duration::from_secs(parsed_or(
            env_vars::PUBLISH_FIXED_DELAY_SECS,
            defaults::PUBLISH_FIXED_DELAY_SECS,
        )))
    } else {
        ReadinessWait::Poll {
            interval: Duration::from_millis(
                parsed_or(
                    env_vars::PUBLISH_POLL_INTERVAL_MS,
                    defaults::PUBLISH_POLL_INTERVAL_MS,
                )
                .max(100),
            ),
            timeout: Duration::from_secs(parsed_or(
                env_vars::PUBLISH_READY_TIMEOUT_SECS,
                defaults::PUBLISH_READY_TIMEOUT_SECS,
            )),
        }
    }
}

/// Chat-completion endpoint settings
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
}

impl OpenAiConfig {
    pub fn from_env() -> BotResult<Self> {
        Ok(Self {
            api_key: required(env_vars::OPENAI_API_KEY)?,
            endpoint: env::var(env_vars::OPENAI_ENDPOINT)
                .unwrap_or_else(|_| defaults::OPENAI_ENDPOINT.to_string()),
            model: env::var(env_vars::OPENAI_MODEL)
                .ok()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| defaults::OPENAI_MODEL.to_string()),
        })
    }
}

/// Everything the webhook server needs. Loading fails fast on the first
/// missing credential so no request is ever served half-configured.
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub verify_token: String,
    pub threads: ThreadsConfig,
    pub openai: OpenAiConfig,
}

impl Config {
    pub fn from_env() -> BotResult<Self> {
        Ok(Self {
            port: parsed_or(env_vars::PORT, defaults::PORT),
            verify_token: required(env_vars::VERIFY_TOKEN)?,
            threads: ThreadsConfig::from_env()?,
            openai: OpenAiConfig::from_env()?,
        })
    }
}
