use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::AppState;
use crate::pipeline::load_urls;
use crate::progress::{BatchJob, ItemResult, ProgressTracker};

/// Error answered as `{"error": message}`
pub struct ApiError(pub String, pub StatusCode);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (message, status) = (self.0, self.1);
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Serialize)]
pub struct BatchResponse {
    pub status: &'static str,
    pub job_id: Uuid,
    pub results: Vec<ItemResult>,
}

/// Fields read from an upload form
#[derive(Default)]
struct Upload {
    file: Option<Vec<u8>>,
    model: Option<String>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut upload = Upload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError(e.to_string(), StatusCode::BAD_REQUEST))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError(e.to_string(), StatusCode::BAD_REQUEST))?;
                upload.file = Some(bytes.to_vec());
            }
            Some("aiModel") => {
                let model = field
                    .text()
                    .await
                    .map_err(|e| ApiError(e.to_string(), StatusCode::BAD_REQUEST))?;
                upload.model = Some(model.trim().to_string()).filter(|m| !m.is_empty());
            }
            _ => {}
        }
    }

    Ok(upload)
}

/// Parse the URL list and claim a tracker for the batch
async fn prepare_batch(state: &AppState, upload: &Upload) -> Result<(Vec<String>, ProgressTracker), ApiError> {
    let file = upload
        .file
        .as_deref()
        .ok_or_else(|| ApiError("No file uploaded".to_string(), StatusCode::BAD_REQUEST))?;

    let urls = load_urls(file).map_err(|e| ApiError(e.to_string(), StatusCode::BAD_REQUEST))?;

    let tracker = state
        .jobs
        .start()
        .await
        .ok_or_else(|| ApiError("A batch is already running".to_string(), StatusCode::CONFLICT))?;

    tracing::info!("Starting batch {} with {} URLs", tracker.id(), urls.len());
    Ok((urls, tracker))
}

/// Wait for a batch task. A batch that died is still marked completed so the
/// next upload is not refused.
async fn join_batch(
    handle: JoinHandle<Vec<ItemResult>>,
    tracker: &ProgressTracker,
) -> Result<Vec<ItemResult>, ApiError> {
    match handle.await {
        Ok(results) => Ok(results),
        Err(e) => {
            tracing::error!("Batch {} failed: {}", tracker.id(), e);
            tracker.mark_completed().await;
            Err(ApiError(format!("Batch task failed: {}", e), StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

pub async fn home() -> &'static str {
    "Backend is running! Post a CSV to /transcripts or /process and poll /progress."
}

pub async fn latest_progress(State(state): State<AppState>) -> Json<BatchJob> {
    Json(state.jobs.latest_snapshot().await)
}

pub async fn job_progress(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<BatchJob>, ApiError> {
    let tracker = state
        .jobs
        .get(job_id)
        .await
        .ok_or_else(|| ApiError(format!("Unknown job {}", job_id), StatusCode::NOT_FOUND))?;

    Ok(Json(tracker.snapshot().await))
}

/// Transcripts-only batch.
///
/// The batch runs on its own task so it finishes even if the client goes away.
pub async fn transcripts(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<BatchResponse>, ApiError> {
    let upload = read_upload(multipart).await?;
    let (urls, tracker) = prepare_batch(&state, &upload).await?;

    let pipeline = state.pipeline.clone();
    let job = tracker.clone();
    let handle = tokio::spawn(async move { pipeline.run_transcripts(&urls, &job).await });
    let results = join_batch(handle, &tracker).await?;

    Ok(Json(BatchResponse {
        status: "ok",
        job_id: tracker.id(),
        results,
    }))
}

/// Transcripts followed by summaries
pub async fn process(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<BatchResponse>, ApiError> {
    let upload = read_upload(multipart).await?;
    let (urls, tracker) = prepare_batch(&state, &upload).await?;
    let model = upload.model.unwrap_or_else(|| state.default_model.clone());

    let pipeline = state.pipeline.clone();
    let job = tracker.clone();
    let handle = tokio::spawn(async move { pipeline.run_with_summaries(&urls, &model, &job).await });
    let results = join_batch(handle, &tracker).await?;

    Ok(Json(BatchResponse {
        status: "completed",
        job_id: tracker.id(),
        results,
    }))
}
