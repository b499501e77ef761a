//! Threads webhook notifications: payload normalization and the dispatcher
//! that turns each notification into a persona reply.
//!
//! Two payload shapes have been observed over time and both are accepted, in
//! this order:
//!   1. `{"entry": [{"changes": [{"value": {"text", "id", ...}}]}]}`
//!   2. `{"values": {"value": {"text", "id", "username", "timestamp"}}}`

use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use super::types::{DeliveryOutcome, InboundMessage};
use crate::ai::CompletionProvider;
use crate::errors::{BotError, BotResult};
use crate::threads::{Author, ThreadsReader, TwoStepPublisher};

/// How many recent source ids are remembered to drop redeliveries
const SEEN_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NotificationValue {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub from: Option<Author>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: NotificationValue,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValuesEnvelope {
    pub value: NotificationValue,
}

/// Recognized webhook body
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookPayload {
    /// `entry[].changes[].value`
    Entries(Vec<Entry>),
    /// `values.value`
    Values(ValuesEnvelope),
}

impl WebhookPayload {
    pub fn parse(body: &Value) -> BotResult<Self> {
        if let Some(entry) = body.get("entry") {
            let entries: Vec<Entry> = serde_json::from_value(entry.clone())
                .map_err(|e| BotError::MalformedPayload(format!("bad entry list: {}", e)))?;
            return Ok(WebhookPayload::Entries(entries));
        }

        if let Some(values) = body.get("values").filter(|v| v.get("value").is_some()) {
            let envelope: ValuesEnvelope = serde_json::from_value(values.clone())
                .map_err(|e| BotError::MalformedPayload(format!("bad values.value: {}", e)))?;
            return Ok(WebhookPayload::Values(envelope));
        }

        Err(BotError::MalformedPayload(
            "expected an `entry` list or a `values.value` object".to_string(),
        ))
    }

    /// Messages worth answering; values without text or id are dropped.
    pub fn normalize(&self) -> Vec<InboundMessage> {
        match self {
            WebhookPayload::Entries(entries) => entries
                .iter()
                .flat_map(|entry| entry.changes.iter())
                .filter_map(|change| normalize_value(&change.value))
                .collect(),
            WebhookPayload::Values(envelope) => normalize_value(&envelope.value).into_iter().collect(),
        }
    }
}

fn normalize_value(value: &NotificationValue) -> Option<InboundMessage> {
    let text = value.text.as_deref().filter(|t| !t.trim().is_empty())?;
    let id = value.id.as_deref().map(str::trim).filter(|i| !i.is_empty())?;
    let from = value.from.as_ref();

    Some(InboundMessage {
        message_text: text.to_string(),
        source_id: id.to_string(),
        author_username: value
            .username
            .clone()
            .or_else(|| from.and_then(|f| f.username.clone())),
        author_id: from.and_then(|f| f.id.clone()),
        timestamp: value.timestamp.clone(),
    })
}

/// Bounded FIFO of recently handled source ids
#[derive(Debug, Default)]
struct SeenIds {
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl SeenIds {
    /// Returns false when the id was already claimed.
    fn claim(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        if self.order.len() >= SEEN_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        self.order.push_back(id.to_string());
        self.ids.insert(id.to_string());
        true
    }

    fn release(&mut self, id: &str) {
        if self.ids.remove(id) {
            self.order.retain(|s| s != id);
        }
    }
}

/// Answers webhook notifications: completion, then a two-step reply.
pub struct WebhookDispatcher {
    reader: Arc<dyn ThreadsReader>,
    completion: Arc<dyn CompletionProvider>,
    publisher: TwoStepPublisher,
    seen: Mutex<SeenIds>,
}

impl WebhookDispatcher {
    pub fn new(
        reader: Arc<dyn ThreadsReader>,
        completion: Arc<dyn CompletionProvider>,
        publisher: TwoStepPublisher,
    ) -> Self {
        Self {
            reader,
            completion,
            publisher,
            seen: Mutex::new(SeenIds::default()),
        }
    }

    /// Handle one delivery. Only an unrecognized body is an error; per-message
    /// failures are reported in the outcomes.
    pub async fn handle(&self, body: &Value) -> BotResult<Vec<DeliveryOutcome>> {
        let payload = WebhookPayload::parse(body)?;
        let messages = payload.normalize();
        if messages.is_empty() {
            log::debug!("[WEBHOOK] Delivery carried no message with both text and id");
            return Ok(Vec::new());
        }

        let self_id = match self.reader.get_self_id().await {
            Ok(id) => id,
            Err(e) => {
                log::error!("[WEBHOOK] Cannot reply without own account id: {}", e);
                return Ok(messages
                    .into_iter()
                    .map(|m| DeliveryOutcome::Failed {
                        source_id: m.source_id,
                        error: e.to_string(),
                    })
                    .collect());
            }
        };

        let mut outcomes = Vec::with_capacity(messages.len());
        for message in messages {
            outcomes.push(self.dispatch(&self_id, message).await);
        }
        Ok(outcomes)
    }

    pub async fn dispatch(&self, self_id: &str, message: InboundMessage) -> DeliveryOutcome {
        let source_id = message.source_id.clone();

        log::info!(
            "[WEBHOOK] Message from @{} at {}: {}",
            message.author_username.as_deref().unwrap_or("unknown"),
            message.timestamp.as_deref().unwrap_or("unknown time"),
            message.message_text
        );

        if message.author_id.as_deref() == Some(self_id) {
            return DeliveryOutcome::Skipped {
                source_id,
                reason: "own message".to_string(),
            };
        }

        if !self.claim(&source_id) {
            log::info!("[WEBHOOK] Ignoring redelivered notification {}", source_id);
            return DeliveryOutcome::Skipped {
                source_id,
                reason: "already handled".to_string(),
            };
        }

        let result = match self.completion.generate_reply(&message.message_text).await {
            Ok(reply_text) => {
                self.publisher
                    .reply_two_step(self_id, &source_id, &reply_text)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(published) => {
                log::info!("[WEBHOOK] Replied to {} with {}", source_id, published.id);
                DeliveryOutcome::Replied {
                    source_id,
                    reply_id: published.id,
                }
            }
            Err(e) => {
                log::error!("[WEBHOOK] Reply to {} failed: {}", source_id, e);
                self.release(&source_id);
                DeliveryOutcome::Failed {
                    source_id,
                    error: e.to_string(),
                }
            }
        }
    }

    fn claim(&self, id: &str) -> bool {
        self.seen.lock().map(|mut seen| seen.claim(id)).unwrap_or(true)
    }

    fn release(&self, id: &str) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.release(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::{Pacer, RecordingClock};
    use crate::testing::{FakeCompletion, FakeThreads};
    use crate::threads::ReadinessWait;
    use serde_json::json;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn shape_a(text: &str, id: &str) -> Value {
        json!({
            "object": "threads",
            "entry": [{
                "id": "E1",
                "time": 1700000000,
                "changes": [{"field": "replies", "value": {"text": text, "id": id}}]
            }]
        })
    }

    fn shape_b(text: &str, id: &str) -> Value {
        json!({
            "app_id": "A1",
            "topic": "moderate",
            "values": {
                "value": {"text": text, "id": id, "username": "alex", "timestamp": "2025-03-01T08:15:00+0000"},
                "field": "replies"
            }
        })
    }

    struct Harness {
        threads: Arc<FakeThreads>,
        completion: Arc<FakeCompletion>,
        dispatcher: WebhookDispatcher,
    }

    fn harness(threads: FakeThreads, completion: FakeCompletion) -> Harness {
        let threads = Arc::new(threads);
        let completion = Arc::new(completion);
        let pacer = Pacer::new(Arc::new(RecordingClock::default()), CancellationToken::new());
        let publisher = TwoStepPublisher::new(
            threads.clone(),
            ReadinessWait::FixedDelay(Duration::from_secs(5)),
            pacer,
        );
        let dispatcher = WebhookDispatcher::new(threads.clone(), completion.clone(), publisher);
        Harness {
            threads,
            completion,
            dispatcher,
        }
    }

    #[test]
    fn both_shapes_normalize_to_the_same_message_core() {
        let a = WebhookPayload::parse(&shape_a("hello", "R9")).unwrap().normalize();
        let b = WebhookPayload::parse(&shape_b("hello", "R9")).unwrap().normalize();
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(a[0].message_text, b[0].message_text);
        assert_eq!(a[0].source_id, b[0].source_id);
        assert_eq!(b[0].author_username.as_deref(), Some("alex"));
    }

    #[test]
    fn message_text_is_forwarded_untouched() {
        let messages = WebhookPayload::parse(&shape_b("  晨安，諸君 \n", "R4")).unwrap().normalize();
        assert_eq!(messages[0].message_text, "  晨安，諸君 \n");

        let blank = WebhookPayload::parse(&shape_b("   ", "R5")).unwrap().normalize();
        assert!(blank.is_empty());
    }

    #[test]
    fn entry_shape_wins_when_both_are_present() {
        let mut body = shape_a("from entry", "R1");
        body["values"] = json!({"value": {"text": "from values", "id": "R2"}});
        let payload = WebhookPayload::parse(&body).unwrap();
        assert!(matches!(payload, WebhookPayload::Entries(_)));
        assert_eq!(payload.normalize()[0].source_id, "R1");
    }

    #[test]
    fn unknown_shape_is_malformed() {
        let err = WebhookPayload::parse(&json!({"object": "page"})).unwrap_err();
        assert!(matches!(err, BotError::MalformedPayload(_)));
        let err = WebhookPayload::parse(&json!({"values": {"other": 1}})).unwrap_err();
        assert!(matches!(err, BotError::MalformedPayload(_)));
        let err = WebhookPayload::parse(&json!({"entry": "nope"})).unwrap_err();
        assert!(matches!(err, BotError::MalformedPayload(_)));
    }

    #[test]
    fn values_without_text_or_id_are_dropped() {
        let body = json!({
            "entry": [
                {"changes": [
                    {"value": {"text": "", "id": "R1"}},
                    {"value": {"text": "hi"}},
                    {"value": {"text": "keep", "id": "R3", "from": {"id": "U3", "username": "sam"}}}
                ]},
                {"changes": []}
            ]
        });
        let messages = WebhookPayload::parse(&body).unwrap().normalize();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].source_id, "R3");
        assert_eq!(messages[0].author_id.as_deref(), Some("U3"));
        assert_eq!(messages[0].author_username.as_deref(), Some("sam"));
    }

    #[tokio::test]
    async fn both_shapes_drive_identical_downstream_calls() {
        let a = harness(FakeThreads::as_account("U1"), FakeCompletion::default());
        let b = harness(FakeThreads::as_account("U1"), FakeCompletion::default());

        let out_a = a.dispatcher.handle(&shape_a("good day", "R9")).await.unwrap();
        let out_b = b.dispatcher.handle(&shape_b("good day", "R9")).await.unwrap();

        assert_eq!(out_a, out_b);
        assert_eq!(a.completion.calls(), vec!["good day".to_string()]);
        assert_eq!(a.completion.calls(), b.completion.calls());
        assert_eq!(a.threads.created(), b.threads.created());
        assert_eq!(a.threads.published(), b.threads.published());

        let created = a.threads.created();
        assert_eq!(created[0].0, "U1");
        assert_eq!(created[0].1.reply_to_id.as_deref(), Some("R9"));
        assert_eq!(created[0].1.text, "reply to: good day");
    }

    #[tokio::test]
    async fn redelivery_is_answered_once() {
        let h = harness(FakeThreads::as_account("U1"), FakeCompletion::default());
        let body = shape_b("again?", "R5");

        let first = h.dispatcher.handle(&body).await.unwrap();
        let second = h.dispatcher.handle(&body).await.unwrap();

        assert!(matches!(first[0], DeliveryOutcome::Replied { .. }));
        assert!(matches!(second[0], DeliveryOutcome::Skipped { .. }));
        assert_eq!(h.completion.calls().len(), 1);
        assert_eq!(h.threads.published().len(), 1);
    }

    #[tokio::test]
    async fn failed_delivery_can_be_retried() {
        let h = harness(
            FakeThreads::as_account("U1"),
            FakeCompletion {
                failing_messages: HashSet::from(["flaky".to_string()]),
                ..FakeCompletion::default()
            },
        );
        let body = shape_a("flaky", "R6");

        let first = h.dispatcher.handle(&body).await.unwrap();
        assert!(matches!(first[0], DeliveryOutcome::Failed { .. }));
        assert_eq!(h.threads.create_count(), 0);

        let second = h.dispatcher.handle(&body).await.unwrap();
        assert!(matches!(second[0], DeliveryOutcome::Failed { .. }));
        assert_eq!(h.completion.calls().len(), 2);
    }

    #[tokio::test]
    async fn own_messages_are_not_answered() {
        let h = harness(FakeThreads::as_account("U1"), FakeCompletion::default());
        let body = json!({"entry": [{"changes": [{"value": {
            "text": "my own reply", "id": "R7", "from": {"id": "U1"}
        }}]}]});

        let outcomes = h.dispatcher.handle(&body).await.unwrap();
        assert!(matches!(outcomes[0], DeliveryOutcome::Skipped { .. }));
        assert!(h.completion.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_self_id_fails_without_generating() {
        let h = harness(FakeThreads::default(), FakeCompletion::default());
        let outcomes = h.dispatcher.handle(&shape_a("hello", "R1")).await.unwrap();
        assert!(matches!(outcomes[0], DeliveryOutcome::Failed { .. }));
        assert_eq!(outcomes[0].source_id(), "R1");
        assert!(h.completion.calls().is_empty());
        assert_eq!(h.threads.create_count(), 0);
    }

    #[tokio::test]
    async fn malformed_body_touches_nothing() {
        let h = harness(FakeThreads::as_account("U1"), FakeCompletion::default());
        let err = h.dispatcher.handle(&json!({"hello": "world"})).await.unwrap_err();
        assert!(matches!(err, BotError::MalformedPayload(_)));
        assert!(h.threads.reads().is_empty());
    }

    #[test]
    fn seen_ids_forget_the_oldest_entry_past_capacity() {
        let mut seen = SeenIds::default();
        for i in 0..SEEN_CAPACITY {
            assert!(seen.claim(&format!("R{}", i)));
        }
        assert!(!seen.claim("R0"));
        assert!(seen.claim("R-new"));
        assert!(seen.claim("R0"));
        assert_eq!(seen.order.len(), SEEN_CAPACITY);
    }
}
