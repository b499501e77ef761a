//! Two-step publish protocol: create a media container, wait until the
//! platform has processed it, then publish it.

use std::sync::Arc;
use std::time::Duration;

use super::types::{ContainerRequest, ContainerState, PublishResult};
use super::ThreadsPublisher;
use crate::config::defaults;
use crate::errors::{BotError, BotResult};
use crate::pacing::Pacer;

/// How to wait between the create and publish calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessWait {
    /// Sleep a fixed amount and publish without checking
    FixedDelay(Duration),
    /// Poll the container status until it is `FINISHED` or the timeout passes
    Poll { interval: Duration, timeout: Duration },
}

impl Default for ReadinessWait {
    fn default() -> Self {
        ReadinessWait::Poll {
            interval: Duration::from_millis(defaults::PUBLISH_POLL_INTERVAL_MS),
            timeout: Duration::from_secs(defaults::PUBLISH_READY_TIMEOUT_SECS),
        }
    }
}

/// Runs create → wait → publish as one sequential operation per target.
#[derive(Clone)]
pub struct TwoStepPublisher {
    publisher: Arc<dyn ThreadsPublisher>,
    readiness: ReadinessWait,
    pacer: Pacer,
}

impl TwoStepPublisher {
    pub fn new(publisher: Arc<dyn ThreadsPublisher>, readiness: ReadinessWait, pacer: Pacer) -> Self {
        Self {
            publisher,
            readiness,
            pacer,
        }
    }

    pub fn readiness(&self) -> ReadinessWait {
        self.readiness
    }

    /// Reply to `target_id` with a text container.
    pub async fn reply_two_step(&self, owner_id: &str, target_id: &str, text: &str) -> BotResult<PublishResult> {
        self.create_and_publish(owner_id, &ContainerRequest::reply(target_id, text))
            .await
    }

    /// Publish a new top-level post.
    pub async fn post_two_step(&self, owner_id: &str, request: &ContainerRequest) -> BotResult<PublishResult> {
        let mut request = request.clone();
        request.reply_to_id = None;
        self.create_and_publish(owner_id, &request).await
    }

    /// Publish is never attempted when the draft step fails.
    pub async fn create_and_publish(&self, owner_id: &str, request: &ContainerRequest) -> BotResult<PublishResult> {
        let container_id = self.publisher.create_container(owner_id, request).await?;
        log::info!(
            "[THREADS] Created {} container {}{}",
            request.media_type,
            container_id,
            request
                .reply_to_id
                .as_deref()
                .map(|t| format!(" replying to {}", t))
                .unwrap_or_default()
        );

        self.wait_until_ready(&container_id).await?;

        match self.publisher.publish_container(owner_id, &container_id).await {
            Ok(result) => {
                log::info!("[THREADS] Published container {} as {}", container_id, result.id);
                Ok(result)
            }
            Err(e) => Err(BotError::PublishIncomplete {
                container_id,
                reason: e.to_string(),
            }),
        }
    }

    async fn wait_until_ready(&self, container_id: &str) -> BotResult<()> {
        match self.readiness {
            ReadinessWait::FixedDelay(delay) => self.pacer.pause(delay).await,
            ReadinessWait::Poll { interval, timeout } => {
                let deadline = self.pacer.now()
                    + chrono::Duration::from_std(timeout).unwrap_or_else(|_| chrono::Duration::zero());
                let incomplete = |reason: String| BotError::PublishIncomplete {
                    container_id: container_id.to_string(),
                    reason,
                };

                loop {
                    match self.publisher.container_status(container_id).await {
                        Ok(status) => match status.status {
                            ContainerState::Finished => return Ok(()),
                            ContainerState::InProgress => {}
                            ContainerState::Error => {
                                return Err(incomplete(format!(
                                    "container processing failed: {}",
                                    status.error_message.as_deref().unwrap_or("no details")
                                )))
                            }
                            other => {
                                return Err(incomplete(format!("container is {}", other)));
                            }
                        },
                        Err(e) => {
                            log::warn!(
                                "[THREADS] Status check for container {} failed, still waiting: {}",
                                container_id,
                                e
                            );
                        }
                    }

                    if self.pacer.now() >= deadline {
                        return Err(incomplete(format!(
                            "container not ready after {}s",
                            timeout.as_secs()
                        )));
                    }
                    self.pacer.pause(interval).await?;
                }
            }
        }
    }
}
