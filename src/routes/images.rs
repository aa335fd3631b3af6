//! Image routes
//!
//! Endpoints:
//! - POST /server-image/ajouter-image - Upload one image (multipart)
//! - POST /server-image/ajouter-images - Upload a batch of base64 images
//! - GET /server-image/image/:user_id/:nom - Fetch an image
//! - GET /server-image/all-images/:user_id - List a user's images
//! - PUT /server-image/update-image/:user_id/:nom - Replace an image
//! - DELETE /server-image/delete-image/:user_id/:nom - Delete an image

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use super::files::serve_file;
use crate::error::{AppError, ErrorResponse, Result};
use crate::state::AppState;
use crate::storage::StoredImage;
use crate::upload;

// ============================================================================
// Request / Response Types
// ============================================================================

/// One image of a batch upload
#[derive(Debug, Deserialize)]
pub struct BatchImage {
    #[serde(default)]
    pub nom: String,
    #[serde(default)]
    pub base64: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchUploadRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub images: Vec<BatchImage>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub base64: String,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub link: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Outcome of one batch item
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchResult {
    Stored {
        link: String,
        name: String,
    },
    Failed {
        error: String,
        code: &'static str,
        name: String,
    },
}

#[derive(Debug, Serialize)]
pub struct BatchUploadResponse {
    pub results: Vec<BatchResult>,
}

// ============================================================================
// Router
// ============================================================================

/// Create the image router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ajouter-image", post(upload_image))
        .route("/ajouter-images", post(upload_images))
        .route("/image/:user_id/:nom", get(get_image))
        .route("/all-images/:user_id", get(list_images))
        .route("/update-image/:user_id/:nom", put(update_image))
        .route("/delete-image/:user_id/:nom", delete(delete_image))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /server-image/ajouter-image
///
/// Form fields: `user_id`, `name` and the `file` itself. When `name` is
/// missing the uploaded file name is used.
async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<LinkResponse>> {
    tracing::debug!("Received request to add image");

    let mut user_id = String::new();
    let mut name = String::new();
    let mut file: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "user_id" => {
                user_id = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
            }
            "name" => {
                name = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
            }
            "file" => {
                let filename = field.file_name().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
                file = Some((filename, data.to_vec()));
            }
            other => tracing::debug!(field = %other, "Ignoring multipart field"),
        }
    }

    let (filename, data) =
        file.ok_or_else(|| AppError::InvalidRequest("missing file field".to_string()))?;
    tracing::debug!(user_id = %user_id, name = %name, bytes = data.len(), "Parsed form data");

    let user_id = upload::require_user_id(&user_id)?;
    if name.is_empty() {
        name = filename.unwrap_or_default();
    }

    state
        .storage()
        .user_dir(user_id)
        .await
        .map_err(AppError::user_directory)?;
    upload::ensure_capacity(&state, user_id).await?;

    let link = upload::store_new_image(&state, user_id, &name, &data).await?;
    Ok(Json(LinkResponse { link }))
}

/// POST /server-image/ajouter-images
///
/// Items are processed in order until the user's limit is reached. A failed
/// item does not stop the batch.
async fn upload_images(
    State(state): State<AppState>,
    payload: std::result::Result<Json<BatchUploadRequest>, JsonRejection>,
) -> Result<Json<BatchUploadResponse>> {
    let Json(request) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    tracing::debug!(
        user_id = %request.user_id,
        count = request.images.len(),
        "Received request to add multiple images"
    );

    let user_id = upload::require_user_id(&request.user_id)?;
    let mut count = upload::ensure_capacity(&state, user_id).await?;
    let max = state.config().media.max_images_per_user;

    let mut results = Vec::with_capacity(request.images.len());
    for image in &request.images {
        if count >= max {
            tracing::info!(user_id = %user_id, "Image limit reached, skipping rest of batch");
            break;
        }

        let stored = match STANDARD.decode(image.base64.as_bytes()) {
            Ok(data) => upload::store_new_image(&state, user_id, &image.nom, &data).await,
            Err(e) => Err(AppError::from(e)),
        };

        match stored {
            Ok(link) => {
                count += 1;
                results.push(BatchResult::Stored {
                    link,
                    name: image.nom.clone(),
                });
            }
            Err(e) => {
                tracing::warn!(name = %image.nom, code = e.code(), "Error processing image: {}", e);
                let ErrorResponse { error, code } = ErrorResponse::from(&e);
                results.push(BatchResult::Failed {
                    error,
                    code,
                    name: image.nom.clone(),
                });
            }
        }
    }

    Ok(Json(BatchUploadResponse { results }))
}

/// GET /server-image/image/:user_id/:nom
async fn get_image(
    State(state): State<AppState>,
    Path((user_id, nom)): Path<(String, String)>,
) -> Result<Response> {
    let path = upload::image_path(&state, &user_id, &nom)?;
    serve_file(&path, "Image").await
}

/// GET /server-image/all-images/:user_id
async fn list_images(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<StoredImage>>> {
    let user_id = upload::require_user_id(&user_id)?;
    let images = state
        .storage()
        .list_images(user_id)
        .await
        .map_err(AppError::counting_images)?;
    Ok(Json(images))
}

/// PUT /server-image/update-image/:user_id/:nom
async fn update_image(
    State(state): State<AppState>,
    Path((user_id, nom)): Path<(String, String)>,
    payload: std::result::Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<LinkResponse>> {
    let Json(request) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let user_id = upload::require_user_id(&user_id)?;
    let data = STANDARD.decode(request.base64.as_bytes())?;

    let link = upload::replace_image(&state, user_id, &nom, &data).await?;
    Ok(Json(LinkResponse { link }))
}

/// DELETE /server-image/delete-image/:user_id/:nom
async fn delete_image(
    State(state): State<AppState>,
    Path((user_id, nom)): Path<(String, String)>,
) -> Result<Json<MessageResponse>> {
    let user_id = upload::require_user_id(&user_id)?;
    upload::delete_image(&state, user_id, &nom).await?;
    Ok(Json(MessageResponse {
        message: "Image deleted successfully".to_string(),
    }))
}
