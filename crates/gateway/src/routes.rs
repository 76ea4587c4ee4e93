use crate::{
    error::ApiError,
    response::DetectionResponse,
    state::AppState,
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    routing::post,
};
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Multipart field carrying the uploaded image.
pub const FILE_FIELD: &str = "file";

pub fn router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/detect", post(detect))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// `POST /detect`: find logos in one uploaded image.
pub async fn detect(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectionResponse>, ApiError> {
    let start = Instant::now();

    let result = run_detection(&state, multipart).await;
    let elapsed = start.elapsed().as_secs_f64();

    match &result {
        Ok(response) => {
            state.metrics.record_success(elapsed, response.detections.len());
            tracing::info!(
                detections = response.detections.len(),
                elapsed_ms = elapsed * 1000.0,
                "Detection request served"
            );
        }
        Err(e) => state.metrics.record_failure(elapsed, e.kind()),
    }

    result.map(Json)
}

async fn run_detection(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<DetectionResponse, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::MissingFile(e.body_text()))?;

    let (content_type, bytes) = read_file_field(&mut multipart).await?;

    if !is_image_content_type(content_type.as_deref()) {
        return Err(ApiError::UnsupportedFormat { content_type });
    }

    tracing::debug!(
        content_type = ?content_type,
        bytes = bytes.len(),
        "Received image upload"
    );

    let detector = state.detector.clone();
    let detections = tokio::task::spawn_blocking(move || {
        let image = image::load_from_memory(&bytes)
            .map_err(|e| ApiError::ImageDecode(e.to_string()))?
            .to_rgb8();

        detector
            .detect(&image)
            .map_err(|e| ApiError::Inference(format!("{:#}", e)))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Inference task failed: {}", e)))??;

    Ok(DetectionResponse::from(detections.as_slice()))
}

/// Returns the declared content type and payload of the `file` part.
async fn read_file_field(
    multipart: &mut Multipart,
) -> Result<(Option<String>, Bytes), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok((content_type, bytes));
    }

    Err(ApiError::MissingFile(format!(
        "Expected a multipart field named `{}`",
        FILE_FIELD
    )))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::MissingFile(e.body_text())
    }
}

/// `image/*` with any subtype; parameters after `;` are ignored.
pub fn is_image_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}
