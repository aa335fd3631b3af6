//! Health check endpoint
//!
//! Reports whether both media roots can be provisioned. Uploads cannot
//! succeed while either is unavailable, so that case answers 503.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StorageHealth {
    pub images: bool,
    pub videos: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub storage: StorageHealth,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let storage = state.storage();

    let images = match storage.images_dir().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Images directory unavailable: {}", e);
            false
        }
    };
    let videos = match storage.videos_dir().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Videos directory unavailable: {}", e);
            false
        }
    };

    let (code, status) = if images && videos {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            storage: StorageHealth { images, videos },
        }),
    )
}
