use crate::shell::{on_submit, SubmissionOutcome};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use contentcheck_core::{ContentType, PredictionRequest};

// ============================================================================
// Health endpoints
// ============================================================================

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "models_loaded": state.registry().len(),
    }))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed").into_response(),
    }
}

// ============================================================================
// Classification endpoints
// ============================================================================

pub async fn list_content_types(State(state): State<AppState>) -> impl IntoResponse {
    let content_types: Vec<serde_json::Value> = state
        .registry()
        .content_types()
        .into_iter()
        .filter_map(|content_type| {
            let binding = state.registry().get(content_type)?;
            Some(serde_json::json!({
                "id": content_type,
                "display_name": content_type.display_name(),
                "labels": binding.label_map.labels(),
                "model": binding.model_name,
            }))
        })
        .collect();

    Json(serde_json::json!({ "content_types": content_types }))
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "status": "error",
                    "message": rejection.body_text(),
                })),
            )
                .into_response();
        }
    };

    let content_type: ContentType = request.content_type;
    let pipeline = state.pipeline.clone();

    // Inference is CPU-bound; keep it off the async workers
    let outcome = tokio::task::spawn_blocking(move || {
        on_submit(&pipeline, request.content_type, &request.raw_text)
    })
    .await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("{} prediction task failed: {}", content_type, e);
            SubmissionOutcome::Failed {
                message: format!("❌ {} prediction failed", content_type),
            }
        }
    };

    let status = match &outcome {
        SubmissionOutcome::Success { .. } => StatusCode::OK,
        SubmissionOutcome::Warning { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SubmissionOutcome::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(outcome)).into_response()
}
