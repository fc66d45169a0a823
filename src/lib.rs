use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod listing;
pub mod middleware;
pub mod models;
pub mod relations;
pub mod store;
pub mod validation;
pub mod views;

use store::AppState;

/// Full application router. The auth gate runs first on every request;
/// everything else sees a classified, identity-resolved request.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/users", post(handlers::users::register))
        .route("/api/users/login", post(handlers::users::login))
        .route(
            "/api/user",
            get(handlers::users::current_user).put(handlers::users::update_user),
        )
        .route("/api/profiles/:username", get(handlers::profiles::get_profile))
        .route(
            "/api/profiles/:username/follow",
            post(handlers::profiles::follow).delete(handlers::profiles::unfollow),
        )
        .route(
            "/api/articles",
            get(handlers::articles::list).post(handlers::articles::create),
        )
        .route("/api/articles/feed", get(handlers::articles::feed))
        .route(
            "/api/articles/:slug",
            get(handlers::articles::get)
                .put(handlers::articles::update)
                .delete(handlers::articles::delete),
        )
        .route(
            "/api/articles/:slug/favorite",
            post(handlers::favorites::favorite).delete(handlers::favorites::unfavorite),
        )
        .route(
            "/api/articles/:slug/comments",
            get(handlers::comments::list).post(handlers::comments::add),
        )
        .route(
            "/api/articles/:slug/comments/:id",
            delete(handlers::comments::delete),
        )
        .route("/api/tags", get(handlers::tags::list))
        .layer(from_fn_with_state(state.clone(), middleware::auth_gate))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> axum::response::Json<Value> {
    axum::response::Json(json!({
        "name": "conduit-api",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "users": "POST /api/users, POST /api/users/login (public), GET|PUT /api/user",
            "profiles": "GET /api/profiles/:username (public), POST|DELETE /api/profiles/:username/follow",
            "articles": "GET /api/articles (public), GET /api/articles/feed, POST /api/articles, GET|PUT|DELETE /api/articles/:slug",
            "favorites": "POST|DELETE /api/articles/:slug/favorite",
            "comments": "GET|POST /api/articles/:slug/comments, DELETE /api/articles/:slug/comments/:id",
            "tags": "GET /api/tags (public)",
        }
    }))
}

async fn health() -> axum::response::Json<Value> {
    axum::response::Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
    }))
}
