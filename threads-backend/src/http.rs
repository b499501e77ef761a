//! Process-wide HTTP client shared by the Threads and completion adapters.

use once_cell::sync::Lazy;
use reqwest::Client;

static SHARED_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(crate::config::http_timeout())
        .user_agent(concat!("threads-backend/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("Failed to build configured HTTP client, using defaults: {}", e);
            Client::new()
        })
});

/// Connection pool reused by every adapter; clone is cheap.
pub fn shared_client() -> &'static Client {
    &SHARED_CLIENT
}
