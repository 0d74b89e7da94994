//! Batch creation handlers

use super::handles::{outcome_response, preconditions, require_json, CreateParams};
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use handle_engine::{decode_batch, BatchRequest, MutationOutcome, TupleResult};
use serde::Serialize;

/// Result of one tuple in a multi-handle batch
#[derive(Debug, Serialize)]
pub struct TupleStatus {
    pub handle: Option<String>,
    /// `created`, `updated`, or `failed`
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl From<TupleResult> for TupleStatus {
    fn from(result: TupleResult) -> Self {
        let handle = result.handle.map(|h| h.to_string());
        match result.outcome {
            Ok(outcome) => Self {
                handle,
                status: match outcome {
                    MutationOutcome::Created => "created",
                    MutationOutcome::Updated => "updated",
                },
                error: None,
                code: None,
            },
            Err(err) => {
                let err = ApiError::from(err);
                let (_, code) = err.status_and_code();
                Self {
                    handle,
                    status: "failed",
                    error: Some(err.to_string()),
                    code: Some(code),
                }
            }
        }
    }
}

/// Create fully named handles outside any prefix
pub async fn create_handles(
    State(state): State<AppState>,
    Query(params): Query<CreateParams>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    require_json(&headers)?;
    run_batch(&state, None, params.generator, &headers, &body).await
}

/// Decode and run a batch.
///
/// A single tuple answers like a PUT: 201 with `Location` or 204, or the
/// tuple's error. Several tuples answer 200 with one status per tuple.
pub(super) async fn run_batch(
    state: &AppState,
    prefix: Option<String>,
    generator: Option<String>,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResult<Response> {
    let tuples = decode_batch(body)?;
    let request = BatchRequest {
        prefix,
        tuples,
        generator,
        preconditions: preconditions(headers),
    };

    let mut results = state.engine.create_batch(request).await?;

    if results.len() == 1 {
        let TupleResult { handle, outcome } = results.remove(0);
        let outcome = outcome?;
        return Ok(match handle {
            Some(handle) => outcome_response(&handle, outcome),
            None => StatusCode::NO_CONTENT.into_response(),
        });
    }

    let statuses: Vec<TupleStatus> = results.into_iter().map(TupleStatus::from).collect();
    Ok((StatusCode::OK, Json(statuses)).into_response())
}
