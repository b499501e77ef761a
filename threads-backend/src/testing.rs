//! In-memory fakes for the platform and completion adapters.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use crate::ai::CompletionProvider;
use crate::errors::{BotError, BotResult};
use crate::threads::{
    ContainerRequest, ContainerState, ContainerStatus, Page, Post, PublishResult, Reply,
    ThreadsPublisher, ThreadsReader,
};

/// Scriptable stand-in for the Threads API that records every call.
#[derive(Default)]
pub struct FakeThreads {
    pub self_id: Option<String>,
    pub posts: Vec<Post>,
    pub replies: HashMap<String, Vec<Reply>>,
    pub failing_reply_lists: HashSet<String>,
    pub fail_create: bool,
    pub fail_publish: bool,
    /// Popped per status call; `FINISHED` once exhausted
    pub statuses: Mutex<VecDeque<ContainerState>>,
    pub reads: Mutex<Vec<String>>,
    pub creates: Mutex<Vec<(String, ContainerRequest)>>,
    pub status_checks: Mutex<Vec<String>>,
    pub publishes: Mutex<Vec<(String, String)>>,
}

impl FakeThreads {
    pub fn with_statuses(statuses: Vec<ContainerState>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            ..Self::default()
        }
    }

    pub fn as_account(self_id: &str) -> Self {
        Self {
            self_id: Some(self_id.to_string()),
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<(String, ContainerRequest)> {
        self.creates.lock().unwrap().clone()
    }

    pub fn create_count(&self) -> usize {
        self.creates.lock().unwrap().len()
    }

    pub fn status_count(&self) -> usize {
        self.status_checks.lock().unwrap().len()
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.publishes.lock().unwrap().clone()
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }

    fn record_read(&self, call: String) {
        self.reads.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ThreadsReader for FakeThreads {
    async fn get_self_id(&self) -> BotResult<String> {
        self.record_read("me".to_string());
        self.self_id
            .clone()
            .ok_or_else(|| BotError::upstream("threads", Some(400), "Invalid OAuth access token"))
    }

    async fn list_recent_posts(&self, limit: u32) -> BotResult<Page<Post>> {
        self.get_self_id().await.map_err(|_| BotError::AccountNotFound)?;
        self.record_read(format!("posts:{}", limit));
        Ok(Page {
            data: self.posts.iter().take(limit as usize).cloned().collect(),
        })
    }

    async fn get_post_details(&self, post_id: &str) -> BotResult<Post> {
        self.record_read(format!("post:{}", post_id));
        self.posts
            .iter()
            .find(|p| p.id == post_id)
            .cloned()
            .ok_or_else(|| BotError::upstream("threads", Some(404), "Object does not exist"))
    }

    async fn list_replies(&self, post_id: &str, limit: u32) -> BotResult<Page<Reply>> {
        self.record_read(format!("replies:{}", post_id));
        if self.failing_reply_lists.contains(post_id) {
            return Err(BotError::upstream("threads", Some(500), "Service temporarily unavailable"));
        }
        Ok(Page {
            data: self
                .replies
                .get(post_id)
                .map(|r| r.iter().take(limit as usize).cloned().collect())
                .unwrap_or_default(),
        })
    }
}

#[async_trait]
impl ThreadsPublisher for FakeThreads {
    async fn create_container(&self, owner_id: &str, request: &ContainerRequest) -> BotResult<String> {
        let mut creates = self.creates.lock().unwrap();
        creates.push((owner_id.to_string(), request.clone()));
        if self.fail_create {
            return Err(BotError::upstream("threads", Some(400), "Param text is required"));
        }
        Ok(format!("C{}", creates.len()))
    }

    async fn container_status(&self, container_id: &str) -> BotResult<ContainerStatus> {
        self.status_checks.lock().unwrap().push(container_id.to_string());
        let status = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ContainerState::Finished);
        Ok(ContainerStatus {
            status,
            error_message: None,
        })
    }

    async fn publish_container(&self, owner_id: &str, container_id: &str) -> BotResult<PublishResult> {
        if self.fail_publish {
            return Err(BotError::upstream("threads", Some(400), "Media not ready"));
        }
        self.publishes
            .lock()
            .unwrap()
            .push((owner_id.to_string(), container_id.to_string()));
        Ok(PublishResult {
            id: format!("POSTED-{}", container_id),
        })
    }
}

/// Completion stand-in: echoes the source text and records each call.
#[derive(Default)]
pub struct FakeCompletion {
    pub failing_messages: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeCompletion {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for FakeCompletion {
    async fn generate_reply(&self, message: &str) -> BotResult<String> {
        self.calls.lock().unwrap().push(message.to_string());
        if self.failing_messages.contains(message) {
            return Err(BotError::Generation("insufficient_quota".to_string()));
        }
        Ok(format!("reply to: {}", message))
    }
}

pub fn reply(id: &str, author_id: &str, text: &str, timestamp: &str) -> Reply {
    Reply {
        id: id.to_string(),
        text: Some(text.to_string()),
        timestamp: Some(timestamp.to_string()),
        author: Some(crate::threads::Author {
            id: Some(author_id.to_string()),
            username: Some(format!("user_{}", author_id.to_lowercase())),
            name: None,
        }),
        replied_to: None,
    }
}
