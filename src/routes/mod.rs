//! Route modules for the media server

pub mod files;
pub mod health;
pub mod images;
pub mod videos;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let images_root = state.storage().images_root().to_path_buf();
    let body_limit = state.config().media.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/server-image", images::router())
        .nest("/server-video", videos::router())
        .nest_service("/images", ServeDir::new(images_root))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            HeaderName::from_static("x-access-token"),
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
}
