//! Thin proxy routes over the Threads adapters plus a completion probe.

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use super::{bad_request, error_response};
use crate::errors::BotError;
use crate::threads::{ContainerRequest, MediaType, ThreadsPublisher, ThreadsReader};
use crate::AppState;

const DEFAULT_POSTS_LIMIT: u32 = 10;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/threads-user-id").route(web::get().to(get_user_id)))
        .service(web::resource("/api/threads-user-info").route(web::get().to(get_user_info)))
        .service(web::resource("/api/threads-post-limit").route(web::get().to(get_post_limit)))
        .service(web::resource("/api/threads-mentions").route(web::get().to(get_mentions)))
        .service(web::resource("/api/threads-replies").route(web::get().to(get_account_replies)))
        .service(web::resource("/api/threads-posts").route(web::get().to(list_posts)))
        .service(web::resource("/api/threads-post/{post_id}").route(web::get().to(get_post)))
        .service(web::resource("/api/threads").route(web::post().to(create_container)))
        .service(web::resource("/api/threads-publish").route(web::post().to(publish_container)))
        .service(web::resource("/api/create-post").route(web::post().to(create_post)))
        .service(web::resource("/api/create-reply").route(web::post().to(create_reply)))
        .service(web::resource("/api/test-openai").route(web::post().to(test_openai)));
}

fn json_or_error<T: serde::Serialize>(result: Result<T, BotError>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(&e),
    }
}

async fn get_user_id(state: web::Data<AppState>) -> impl Responder {
    json_or_error(state.threads.get_self_id().await)
}

async fn get_user_info(state: web::Data<AppState>) -> impl Responder {
    json_or_error(state.threads.get_profile().await)
}

async fn get_post_limit(state: web::Data<AppState>) -> impl Responder {
    json_or_error(state.threads.get_publishing_limit().await)
}

async fn get_mentions(state: web::Data<AppState>) -> impl Responder {
    json_or_error(state.threads.list_mentions().await)
}

async fn get_account_replies(state: web::Data<AppState>) -> impl Responder {
    json_or_error(state.threads.list_account_replies().await)
}

#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    pub limit: Option<u32>,
}

async fn list_posts(state: web::Data<AppState>, query: web::Query<PostsQuery>) -> impl Responder {
    let limit = query.limit.unwrap_or(DEFAULT_POSTS_LIMIT);
    json_or_error(state.threads.list_recent_posts(limit).await)
}

async fn get_post(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    json_or_error(state.threads.get_post_details(&path.into_inner()).await)
}

/// Draft step only: validates media fields, returns `{"id": container}`.
async fn create_container(state: web::Data<AppState>, body: web::Json<ContainerRequest>) -> impl Responder {
    let request = body.into_inner();
    if let Err(reason) = request.validate() {
        return bad_request(reason);
    }

    let owner = match state.threads.get_self_id().await {
        Ok(id) => id,
        Err(_) => return error_response(&BotError::AccountNotFound),
    };
    match state.threads.create_container(&owner, &request).await {
        Ok(id) => HttpResponse::Ok().json(serde_json::json!({ "id": id })),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct PublishBody {
    #[serde(default)]
    pub creation_id: String,
}

async fn publish_container(state: web::Data<AppState>, body: web::Json<PublishBody>) -> impl Responder {
    if body.creation_id.trim().is_empty() {
        return bad_request("creation_id is required");
    }
    let owner = match state.threads.get_self_id().await {
        Ok(id) => id,
        Err(_) => return error_response(&BotError::AccountNotFound),
    };
    json_or_error(state.threads.publish_container(&owner, &body.creation_id).await)
}

/// Full two-step post
async fn create_post(state: web::Data<AppState>, body: web::Json<ContainerRequest>) -> impl Responder {
    let request = body.into_inner();
    if request.text.trim().is_empty() {
        return bad_request("text is required");
    }
    if let Err(reason) = request.validate() {
        return bad_request(reason);
    }

    let owner = match state.threads.get_self_id().await {
        Ok(id) => id,
        Err(_) => return error_response(&BotError::AccountNotFound),
    };
    json_or_error(state.publisher.post_two_step(&owner, &request).await)
}

#[derive(Debug, Deserialize)]
pub struct ReplyBody {
    #[serde(default)]
    pub reply_to_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub media_type: MediaType,
}

/// Full two-step reply
async fn create_reply(state: web::Data<AppState>, body: web::Json<ReplyBody>) -> impl Responder {
    if body.reply_to_id.trim().is_empty() {
        return bad_request("reply_to_id is required");
    }
    if body.text.trim().is_empty() {
        return bad_request("text is required");
    }

    let owner = match state.threads.get_self_id().await {
        Ok(id) => id,
        Err(_) => return error_response(&BotError::AccountNotFound),
    };
    let request = ContainerRequest {
        media_type: body.media_type,
        ..ContainerRequest::reply(body.reply_to_id.clone(), body.text.clone())
    };
    json_or_error(state.publisher.create_and_publish(&owner, &request).await)
}

#[derive(Debug, Deserialize)]
pub struct TestOpenAiBody {
    #[serde(default)]
    pub message: String,
}

/// Runs the persona completion without publishing anything.
async fn test_openai(state: web::Data<AppState>, body: web::Json<TestOpenAiBody>) -> impl Responder {
    if body.message.trim().is_empty() {
        return bad_request("message is required");
    }
    match state.completion.generate_reply(&body.message).await {
        Ok(reply) => HttpResponse::Ok().json(serde_json::json!({
            "original": body.message,
            "reply": reply,
            "success": true
        })),
        Err(e) => {
            log::error!("[OPENAI] Test generation failed: {}", e);
            HttpResponse::BadGateway().json(serde_json::json!({
                "error": e.to_string(),
                "success": false
            }))
        }
    }
}
