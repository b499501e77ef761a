//! reqwest-backed Threads Graph API client.
//!
//! The access token travels as the `access_token` query parameter on reads and
//! as a form field on writes. Non-success responses are logged with the
//! Graph error message and returned as `UpstreamUnavailable`.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::types::{ContainerRequest, ContainerStatus, Page, Post, PublishResult, Reply};
use super::{ThreadsPublisher, ThreadsReader};
use crate::config::ThreadsConfig;
use crate::errors::{BotError, BotResult};

const SERVICE: &str = "threads";

const POST_FIELDS: &str = "id,text,timestamp,media_type,permalink";
const REPLY_FIELDS: &str = "id,text,timestamp,from{id,username,name},replied_to";
const PROFILE_FIELDS: &str = "id,username,name,threads_profile_picture_url,threads_biography";

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorResponse {
    error: GraphError,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}

#[derive(Clone)]
pub struct ThreadsClient {
    client: Client,
    api_base: String,
    access_token: String,
    replies_page_size: u32,
}

impl ThreadsClient {
    pub fn new(config: &ThreadsConfig) -> Self {
        Self::with_client(crate::http::shared_client().clone(), config)
    }

    pub fn with_client(client: Client, config: &ThreadsConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            replies_page_size: config.replies_page_size.max(1),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> BotResult<T> {
        log::debug!("[THREADS] GET /{}", path);
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .query(&[("access_token", self.access_token.as_str())])
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response, path).await
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, mut form: Vec<(&str, String)>) -> BotResult<T> {
        log::debug!("[THREADS] POST /{}", path);
        form.push(("access_token", self.access_token.clone()));
        let response = self
            .client
            .post(self.url(path))
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response, path).await
    }

    /// `GET /me` with profile fields
    pub async fn get_profile(&self) -> BotResult<Value> {
        self.get_json("me", &[("fields", PROFILE_FIELDS.to_string())]).await
    }

    /// Publishing quota of the caller
    pub async fn get_publishing_limit(&self) -> BotResult<Value> {
        let uid = self.get_self_id().await?;
        self.get_json(
            &format!("{}/threads_publishing_limit", uid),
            &[("fields", "quota_usage,config".to_string())],
        )
        .await
    }

    pub async fn list_mentions(&self) -> BotResult<Value> {
        let uid = self.get_self_id().await?;
        self.get_json(&format!("{}/mentions", uid), &[]).await
    }

    /// Replies authored by the caller across all threads
    pub async fn list_account_replies(&self) -> BotResult<Value> {
        let uid = self.get_self_id().await?;
        self.get_json(&format!("{}/replies", uid), &[]).await
    }
}

fn transport_error(e: reqwest::Error) -> BotError {
    let e = e.without_url();
    log::error!("[THREADS] Request failed: {}", e);
    BotError::upstream(SERVICE, None, e.to_string())
}

async fn read_json<T: DeserializeOwned>(response: Response, path: &str) -> BotResult<T> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        let message = serde_json::from_str::<GraphErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        log::warn!("[THREADS] /{} returned {}: {}", path, status.as_u16(), message);
        return Err(BotError::upstream(SERVICE, Some(status.as_u16()), message));
    }

    serde_json::from_str(&body).map_err(|e| {
        log::warn!("[THREADS] /{} returned an unexpected body: {}", path, e);
        BotError::upstream(SERVICE, Some(status.as_u16()), format!("unexpected response: {}", e))
    })
}

fn require_id(response: IdResponse, what: &str) -> BotResult<String> {
    response
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| BotError::upstream(SERVICE, None, format!("{} response carried no id", what)))
}

#[async_trait]
impl ThreadsReader for ThreadsClient {
    async fn get_self_id(&self) -> BotResult<String> {
        let response: IdResponse = self.get_json("me", &[("fields", "id".to_string())]).await?;
        require_id(response, "me")
    }

    async fn list_recent_posts(&self, limit: u32) -> BotResult<Page<Post>> {
        let uid = self.get_self_id().await.map_err(|e| {
            log::warn!("[THREADS] Cannot list posts without an account id: {}", e);
            BotError::AccountNotFound
        })?;
        self.get_json(
            &format!("{}/threads", uid),
            &[
                ("limit", limit.to_string()),
                ("fields", POST_FIELDS.to_string()),
            ],
        )
        .await
    }

    async fn get_post_details(&self, post_id: &str) -> BotResult<Post> {
        self.get_json(post_id, &[("fields", POST_FIELDS.to_string())]).await
    }

    async fn list_replies(&self, post_id: &str, limit: u32) -> BotResult<Page<Reply>> {
        let limit = limit.clamp(1, self.replies_page_size);
        self.get_json(
            &format!("{}/replies", post_id),
            &[
                ("limit", limit.to_string()),
                ("fields", REPLY_FIELDS.to_string()),
            ],
        )
        .await
    }
}

#[async_trait]
impl ThreadsPublisher for ThreadsClient {
    async fn create_container(&self, owner_id: &str, request: &ContainerRequest) -> BotResult<String> {
        let response: IdResponse = self
            .post_form(&format!("{}/threads", owner_id), request.form_fields())
            .await
            .map_err(|e| {
                log::error!("[THREADS] Media container creation failed: {}", e);
                e
            })?;
        require_id(response, "container")
    }

    async fn container_status(&self, container_id: &str) -> BotResult<ContainerStatus> {
        self.get_json(container_id, &[("fields", "status,error_message".to_string())])
            .await
    }

    async fn publish_container(&self, owner_id: &str, container_id: &str) -> BotResult<PublishResult> {
        let response: IdResponse = self
            .post_form(
                &format!("{}/threads_publish", owner_id),
                vec![("creation_id", container_id.to_string())],
            )
            .await
            .map_err(|e| {
                log::error!("[THREADS] Container {} publish failed: {}", container_id, e);
                e
            })?;
        Ok(PublishResult {
            id: require_id(response, "publish")?,
        })
    }
}
