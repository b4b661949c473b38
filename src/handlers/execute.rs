use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::extractors::AppJson;
use crate::middlewares::auth::JwtClaims;
use crate::models::submission::{GradingResponse, SubmitCodeRequest};
use crate::models::ContentType;
use crate::services::{
    completion_service::CompletionService,
    grading_service::{GradingOutcome, GradingService},
    AppState,
};

/// POST /api/v1/execute
///
/// Grades the submitted source against the supplied test cases, or bare-runs
/// it when none are supplied. On a full pass with a known content slug the
/// completion is recorded; a failed record is reported next to the verdict,
/// never instead of it.
pub async fn execute_code(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<SubmitCodeRequest>,
) -> Result<Response, (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid submission: {}", e)))?;

    tracing::info!(
        "Grading submission: user={}, slug={:?}, language={:?}, tests={}",
        claims.sub,
        req.content_slug,
        req.language,
        req.test_cases.len()
    );

    let grading = GradingService::new(state.sandbox.clone());

    match grading.grade(&req).await {
        GradingOutcome::BareRun(output) => {
            Ok((StatusCode::OK, Json(GradingResponse::bare(output))).into_response())
        }
        GradingOutcome::RunnerUnavailable(message) => Ok((
            StatusCode::OK,
            Json(GradingResponse::runner_unavailable(message)),
        )
            .into_response()),
        GradingOutcome::Graded {
            verdict,
            stderr,
            compile_output,
        } => {
            let all_passed = verdict.all_passed;
            let mut response = GradingResponse::graded(verdict, stderr, compile_output);

            if all_passed {
                if let (Some(slug), Some(content_type)) =
                    (req.content_slug.as_deref(), req.content_type)
                {
                    // Labs/projects carry a success flag; puzzles do not
                    let success = match content_type {
                        ContentType::Puzzle => None,
                        ContentType::Lab | ContentType::Project => Some(true),
                    };

                    let recorder = CompletionService::new(state.mongo.clone());
                    match recorder
                        .record_completion(&claims.sub, slug, content_type, success)
                        .await
                    {
                        Ok(_) => response.completion_recorded = Some(true),
                        Err(e) => {
                            tracing::error!(
                                "Failed to record completion: user={}, slug={}: {:#}",
                                claims.sub,
                                slug,
                                e
                            );
                            response.completion_recorded = Some(false);
                            response.completion_error = Some(
                                "Your solution passed, but saving the completion failed. It will not affect your verdict."
                                    .to_string(),
                            );
                        }
                    }
                }
            }

            Ok((StatusCode::OK, Json(response)).into_response())
        }
    }
}
