use actix_web::{web, HttpResponse, Responder};

use crate::threads::ReadinessWait;
use crate::AppState;

pub const SERVICE: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/health").route(web::get().to(health_check)));
    cfg.service(web::resource("/api/version").route(web::get().to(get_version)));
    cfg.service(web::resource("/api/health/config").route(web::get().to(get_config_status)));
}

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": SERVICE,
        "version": VERSION
    }))
}

async fn get_version() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "version": VERSION
    }))
}

/// What the running server was wired with. Never echoes credentials.
async fn get_config_status(state: web::Data<AppState>) -> impl Responder {
    let publish_wait = match state.publisher.readiness() {
        ReadinessWait::FixedDelay(delay) => serde_json::json!({
            "mode": "fixed",
            "delay_secs": delay.as_secs()
        }),
        ReadinessWait::Poll { interval, timeout } => serde_json::json!({
            "mode": "poll",
            "interval_ms": interval.as_millis() as u64,
            "timeout_secs": timeout.as_secs()
        }),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "threads_configured": true,
        "webhook_verification_configured": !state.verify_token.trim().is_empty(),
        "threads_api_base": state.threads.api_base(),
        "publish_wait": publish_wait
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_support::{state, threads_config};
    use crate::testing::{FakeCompletion, FakeThreads};
    use crate::threads::ThreadsClient;
    use actix_web::{test, App};
    use std::sync::Arc;

    #[actix_web::test]
    async fn health_reports_ok_and_version() {
        let app = test::init_service(App::new().configure(config)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], VERSION);
        assert_eq!(body["service"], "threads-backend");
    }

    #[actix_web::test]
    async fn config_status_reports_wiring_without_secrets() {
        let threads = ThreadsClient::with_client(reqwest::Client::new(), &threads_config("http://graph.test/v1.0"));
        let data = web::Data::new(state(
            threads,
            Arc::new(FakeThreads::default()),
            Arc::new(FakeCompletion::default()),
        ));
        let app = test::init_service(App::new().app_data(data).configure(config)).await;

        let req = test::TestRequest::get().uri("/api/health/config").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["threads_configured"], true);
        assert_eq!(body["webhook_verification_configured"], true);
        assert_eq!(body["threads_api_base"], "http://graph.test/v1.0");
        assert_eq!(body["publish_wait"]["mode"], "fixed");
        assert_eq!(body["publish_wait"]["delay_secs"], 0);
        assert!(!body.to_string().contains("test-token"));
    }
}
