mod handlers;

use axum::{
    http::HeaderValue,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::db::Database;

/// Router with permissive CORS and no static files.
pub fn create_router(db: Database) -> Router {
    create_router_with_config(db, &ServerConfig::default())
}

pub fn create_router_with_config(db: Database, config: &ServerConfig) -> Router {
    let api = Router::new()
        // Categories
        .route("/categories", get(handlers::list_categories))
        .route("/categories", post(handlers::create_category))
        .route("/categories/{id}", put(handlers::update_category))
        .route("/categories/{id}", delete(handlers::delete_category))
        // Goals
        .route("/goals", get(handlers::list_goals))
        .route("/goals", post(handlers::create_goal))
        .route("/goals/reorder", put(handlers::reorder_goals))
        .route("/goals/{id}", get(handlers::get_goal))
        .route("/goals/{id}", put(handlers::update_goal))
        .route("/goals/{id}", delete(handlers::delete_goal))
        // Board
        .route("/summary", get(handlers::summary))
        .route("/owners", get(handlers::owners))
        // Health
        .route("/health", get(handlers::health));

    let mut app = Router::new().nest("/api", api);

    if let Some(dir) = &config.static_dir {
        tracing::info!("Serving board UI from {}", dir.display());
        let index = ServeFile::new(dir.join("index.html"));
        app = app.fallback_service(ServeDir::new(dir).not_found_service(index));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins))
        .with_state(db)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
