pub mod types;
pub mod webhook;

pub use types::{DeliveryOutcome, InboundMessage};
pub use webhook::{WebhookDispatcher, WebhookPayload};
