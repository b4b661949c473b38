use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;

use crate::extractors::AppJson;
use crate::middlewares::auth::JwtClaims;
use crate::models::completion::RecordCompletionRequest;
use crate::models::ContentType;
use crate::services::{completion_service::CompletionService, AppState};

/// GET /api/v1/completions
///
/// The user's completion rows, newest first ("recent activity").
pub async fn list_completions(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<Response, (StatusCode, String)> {
    let service = CompletionService::new(state.mongo.clone());

    match service.list_completions(&claims.sub).await {
        Ok(completions) => Ok((StatusCode::OK, Json(completions)).into_response()),
        Err(e) => {
            tracing::error!("Failed to list completions for {}: {}", claims.sub, e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// POST /api/v1/completions
///
/// Records a lab or project completion with an explicit success flag. This
/// is the non-graded path; puzzles are only completed through grading.
pub async fn record_completion(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<RecordCompletionRequest>,
) -> Result<Response, (StatusCode, String)> {
    if req.content_type == ContentType::Puzzle {
        return Err((
            StatusCode::BAD_REQUEST,
            "Puzzles are completed through grading, not recorded directly".to_string(),
        ));
    }

    let service = CompletionService::new(state.mongo.clone());

    match service
        .record_completion(
            &claims.sub,
            &req.content_slug,
            req.content_type,
            Some(req.success.unwrap_or(true)),
        )
        .await
    {
        Ok(record) => Ok((StatusCode::CREATED, Json(record)).into_response()),
        Err(e) => {
            tracing::error!(
                "Failed to record completion: user={}, slug={}: {}",
                claims.sub,
                req.content_slug,
                e
            );
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
