use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;

use threads_backend::config::Config;
use threads_backend::{controllers, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    let port = config.port;

    let state = match AppState::from_config(&config) {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to initialize adapters: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("Starting Threads reply server on port {}", port);
    log::info!("Webhook endpoint: /api/webhook");
    log::info!("Post listing: GET /api/threads-posts?limit=10, GET /api/threads-post/{{post_id}}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(controllers::health::config)
            .configure(controllers::webhook::config)
            .configure(controllers::threads::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
