//! Video routes
//!
//! Endpoints:
//! - POST /server-video/ajouter-video - Upload a video (multipart `video`)
//! - GET /server-video/video/:nom - Fetch a video by the link handed out
//! - GET /server-video/video/:user_id/:nom - Fetch a video
//! - PUT /server-video/update-video/:user_id/:nom - Replace and transcode a video
//! - DELETE /server-video/delete-video/:user_id/:nom - Delete a video
//!
//! Videos share one directory, so `user_id` only namespaces the route.

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};

use super::files::serve_file;
use super::images::{LinkResponse, MessageResponse, UpdateRequest};
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::upload;

/// Create the video router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ajouter-video", post(upload_video))
        .route("/video/:nom", get(get_video_by_link))
        .route("/video/:user_id/:nom", get(get_video))
        .route("/update-video/:user_id/:nom", put(update_video))
        .route("/delete-video/:user_id/:nom", delete(delete_video))
}

/// POST /server-video/ajouter-video
async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<LinkResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?
    {
        if field.name() != Some("video") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::InvalidRequest("video field has no file name".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidRequest(e.to_string()))?;

        let link = upload::store_new_video(&state, &filename, &data).await?;
        return Ok(Json(LinkResponse { link }));
    }

    Err(AppError::InvalidRequest("missing video field".to_string()))
}

/// GET /server-video/video/:nom
async fn get_video_by_link(
    State(state): State<AppState>,
    Path(nom): Path<String>,
) -> Result<Response> {
    let path = upload::video_path(&state, &nom)?;
    serve_file(&path, "Video").await
}

/// GET /server-video/video/:user_id/:nom
async fn get_video(
    State(state): State<AppState>,
    Path((_user_id, nom)): Path<(String, String)>,
) -> Result<Response> {
    let path = upload::video_path(&state, &nom)?;
    serve_file(&path, "Video").await
}

/// PUT /server-video/update-video/:user_id/:nom
async fn update_video(
    State(state): State<AppState>,
    Path((_user_id, nom)): Path<(String, String)>,
    payload: std::result::Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<LinkResponse>> {
    let Json(request) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let data = STANDARD.decode(request.base64.as_bytes())?;

    let link = upload::replace_video(&state, &nom, &data).await?;
    Ok(Json(LinkResponse { link }))
}

/// DELETE /server-video/delete-video/:user_id/:nom
async fn delete_video(
    State(state): State<AppState>,
    Path((_user_id, nom)): Path<(String, String)>,
) -> Result<Json<MessageResponse>> {
    upload::delete_video(&state, &nom).await?;
    Ok(Json(MessageResponse {
        message: "Video deleted successfully".to_string(),
    }))
}
