use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::Value;

use crate::channels::DeliveryOutcome;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/webhook")
            .route(web::get().to(verify))
            .route(web::post().to(receive)),
    );
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Subscription handshake: echo the challenge when the token matches.
async fn verify(state: web::Data<AppState>, query: web::Query<VerifyQuery>) -> impl Responder {
    if query.verify_token.as_deref() == Some(state.verify_token.as_str()) {
        log::info!("[WEBHOOK] Subscription verified");
        HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body(query.challenge.clone().unwrap_or_default())
    } else {
        log::warn!("[WEBHOOK] Verification attempt with a wrong token");
        HttpResponse::Forbidden()
            .content_type("text/plain; charset=utf-8")
            .body("Invalid token")
    }
}

/// Event delivery. Always acknowledged so the platform does not retry.
async fn receive(state: web::Data<AppState>, body: web::Bytes) -> impl Responder {
    let ok = HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }));

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("[WEBHOOK] Body is not JSON: {}", e);
            return ok;
        }
    };

    match state.dispatcher.handle(&payload).await {
        Ok(outcomes) => {
            for outcome in &outcomes {
                match outcome {
                    DeliveryOutcome::Replied { .. } => {}
                    DeliveryOutcome::Skipped { source_id, reason } => {
                        log::debug!("[WEBHOOK] Skipped {}: {}", source_id, reason)
                    }
                    DeliveryOutcome::Failed { source_id, error } => {
                        log::warn!("[WEBHOOK] Gave up on {}: {}", source_id, error)
                    }
                }
            }
        }
        Err(e) => log::warn!("[WEBHOOK] Ignoring delivery: {}", e),
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_support::{state, threads_config, VERIFY_TOKEN};
    use crate::testing::{FakeCompletion, FakeThreads};
    use crate::threads::ThreadsClient;
    use actix_web::{http::StatusCode, test, App};
    use std::sync::Arc;

    fn app_state(platform: Arc<FakeThreads>, completion: Arc<FakeCompletion>) -> web::Data<AppState> {
        let threads = ThreadsClient::with_client(reqwest::Client::new(), &threads_config("http://127.0.0.1:9"));
        web::Data::new(state(threads, platform, completion))
    }

    #[actix_web::test]
    async fn verify_echoes_challenge_for_matching_token() {
        let data = app_state(Arc::new(FakeThreads::default()), Arc::new(FakeCompletion::default()));
        let app = test::init_service(App::new().app_data(data).configure(config)).await;

        let req = test::TestRequest::get()
            .uri(&format!(
                "/api/webhook?hub.mode=subscribe&hub.verify_token={}&hub.challenge=1158201444",
                VERIFY_TOKEN
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, "1158201444");
    }

    #[actix_web::test]
    async fn verify_rejects_wrong_or_missing_token() {
        let data = app_state(Arc::new(FakeThreads::default()), Arc::new(FakeCompletion::default()));
        let app = test::init_service(App::new().app_data(data).configure(config)).await;

        for uri in [
            "/api/webhook?hub.verify_token=nope&hub.challenge=1",
            "/api/webhook?hub.challenge=1",
        ] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN);
            assert_eq!(test::read_body(resp).await, "Invalid token");
        }
    }

    #[actix_web::test]
    async fn event_is_answered_and_acknowledged() {
        let platform = Arc::new(FakeThreads::as_account("U1"));
        let completion = Arc::new(FakeCompletion::default());
        let data = app_state(platform.clone(), completion.clone());
        let app = test::init_service(App::new().app_data(data).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/webhook")
            .set_json(serde_json::json!({
                "values": { "value": { "text": "好久不見", "id": "R77", "username": "guest" } }
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body, serde_json::json!({ "status": "ok" }));
        assert_eq!(completion.calls(), vec!["好久不見".to_string()]);
        assert_eq!(platform.created()[0].1.reply_to_id.as_deref(), Some("R77"));
        assert_eq!(platform.published().len(), 1);
    }

    #[actix_web::test]
    async fn unrecognized_or_non_json_bodies_still_get_ok() {
        let platform = Arc::new(FakeThreads::as_account("U1"));
        let data = app_state(platform.clone(), Arc::new(FakeCompletion::default()));
        let app = test::init_service(App::new().app_data(data).configure(config)).await;

        for body in ["{\"object\":\"page\"}", "not json at all"] {
            let req = test::TestRequest::post()
                .uri("/api/webhook")
                .insert_header(("content-type", "application/json"))
                .set_payload(body)
                .to_request();
            let resp: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(resp["status"], "ok");
        }
        assert!(platform.reads().is_empty());
    }
}
