//! Single-handle handlers: resolve, replace, merge, delete

use super::batch::run_batch;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use handle_engine::{
    decode_value_set, encode_value_set, EngineError, MutationOutcome, Preconditions, WireValue,
};
use handle_types::{HandleName, Reference};
use serde::Deserialize;

/// Query parameters of creation requests
#[derive(Debug, Default, Deserialize)]
pub struct CreateParams {
    /// Name generator for tuples without a handle name
    pub generator: Option<String>,
}

/// Resolve a handle, optionally restricted to one index
pub async fn get_handle(
    State(state): State<AppState>,
    Path(segment): Path<String>,
) -> ApiResult<Json<Vec<WireValue>>> {
    let reference = parse_proper(&segment, true)?;
    let values = state.engine.resolve(&reference).await?;
    Ok(Json(encode_value_set(&values)))
}

/// Create or fully replace a handle
pub async fn put_handle(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    require_json(&headers)?;
    let reference = parse_proper(&segment, false)?;
    let values = decode_value_set(&body)?;

    let outcome = state
        .engine
        .replace(reference.handle(), values, preconditions(&headers))
        .await?;
    Ok(outcome_response(reference.handle(), outcome))
}

/// Merge into a handle, or create handles under a prefix
pub async fn post_handle(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Query(params): Query<CreateParams>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    require_json(&headers)?;
    let reference = Reference::parse(&segment, false)?;
    let handle = reference.handle();

    if handle.is_proper() {
        let values = decode_value_set(&body)?;
        state.engine.merge(handle, values).await?;
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    // `prefix` or `prefix/`
    let prefix = handle.as_str().trim_end_matches('/').to_string();
    run_batch(&state, Some(prefix), params.generator, &headers, &body).await
}

/// Delete a handle, or only the index the reference names
pub async fn delete_handle(
    State(state): State<AppState>,
    Path(segment): Path<String>,
) -> ApiResult<StatusCode> {
    let reference = parse_proper(&segment, true)?;
    state.engine.delete(&reference).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_proper(segment: &str, allow_indexes: bool) -> ApiResult<Reference> {
    let reference = Reference::parse(segment, allow_indexes)?;
    if !reference.handle().is_proper() {
        return Err(EngineError::MalformedReference(format!(
            "{} is not a complete handle name",
            reference.handle()
        ))
        .into());
    }
    Ok(reference)
}

/// Accept `application/json`, with or without parameters
pub(super) fn require_json(headers: &HeaderMap) -> ApiResult<()> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let essence = content_type.split(';').next().unwrap_or_default().trim();
    if essence.eq_ignore_ascii_case("application/json") {
        Ok(())
    } else if content_type.is_empty() {
        Err(ApiError::UnsupportedMediaType(
            "missing Content-Type, expected application/json".to_string(),
        ))
    } else {
        Err(ApiError::UnsupportedMediaType(format!(
            "{}, expected application/json",
            content_type
        )))
    }
}

pub(super) fn preconditions(headers: &HeaderMap) -> Preconditions {
    let header_str = |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok());
    Preconditions::from_headers(header_str(header::IF_MATCH), header_str(header::IF_NONE_MATCH))
}

pub(super) fn outcome_response(handle: &HandleName, outcome: MutationOutcome) -> Response {
    match outcome {
        MutationOutcome::Created => (
            StatusCode::CREATED,
            [(header::LOCATION, format!("/handles/{}", handle))],
        )
            .into_response(),
        MutationOutcome::Updated => StatusCode::NO_CONTENT.into_response(),
    }
}
