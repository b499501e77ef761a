//! Threads Graph API adapters: reads, the two-step publish protocol, and the
//! traits the dispatcher and scanner are written against.

pub mod client;
pub mod publish;
pub mod types;

pub use client::ThreadsClient;
pub use publish::{ReadinessWait, TwoStepPublisher};
pub use types::{
    Author, ContainerRequest, ContainerState, ContainerStatus, MediaType, Page, Post,
    PublishResult, Reply,
};

use async_trait::async_trait;

use crate::errors::BotResult;

/// Replies fetched per post when the caller does not ask for a limit
pub const DEFAULT_REPLIES_LIMIT: u32 = 50;

/// Read side of the platform
#[async_trait]
pub trait ThreadsReader: Send + Sync {
    /// Account id of the access token's owner.
    async fn get_self_id(&self) -> BotResult<String>;

    /// Most recent posts of the caller. Resolves the caller's id first and
    /// reports `AccountNotFound` when that fails.
    async fn list_recent_posts(&self, limit: u32) -> BotResult<Page<Post>>;

    async fn get_post_details(&self, post_id: &str) -> BotResult<Post>;

    /// First page of replies, capped to the adapter's page size.
    async fn list_replies(&self, post_id: &str, limit: u32) -> BotResult<Page<Reply>>;
}

/// Write side of the platform: the container lifecycle
#[async_trait]
pub trait ThreadsPublisher: Send + Sync {
    /// Draft step. Returns the container id.
    async fn create_container(&self, owner_id: &str, request: &ContainerRequest) -> BotResult<String>;

    async fn container_status(&self, container_id: &str) -> BotResult<ContainerStatus>;

    /// Publish step. Only valid for a container created by `create_container`.
    async fn publish_container(&self, owner_id: &str, container_id: &str) -> BotResult<PublishResult>;
}
