// SPDX-License-Identifier: Apache-2.0

use crate::{map_image_error, AppState};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::{info, warn};
use vitrine_api::{
    status_for, ApiEnvelope, ApiError, BatchUploadReport, BatchUploadRequest, UploadOutcome,
    ValidateData,
};
use vitrine_images::{ImageError, IngestRequest};
use vitrine_model::{ImageSlot, ProductId};

fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

fn propagated_request_id(headers: &HeaderMap, state: &AppState) -> String {
    if let Some(raw) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    make_request_id(state)
}

fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

fn ok_response<T: serde::Serialize>(data: T, request_id: &str) -> Response {
    let resp = Json(ApiEnvelope::ok(data)).into_response();
    with_request_id(resp, request_id)
}

fn fail_response(error: ApiError, request_id: &str) -> Response {
    let status =
        StatusCode::from_u16(status_for(error.code)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let resp = (status, Json(ApiEnvelope::<()>::fail(error))).into_response();
    with_request_id(resp, request_id)
}

fn engine_failure(err: &ImageError, request_id: &str) -> Response {
    fail_response(map_image_error(err), request_id)
}

fn deadline_exceeded(operation: &str) -> ApiError {
    ApiError::new(
        vitrine_api::ApiErrorCode::Timeout,
        format!("{operation} exceeded the request deadline"),
    )
}

fn parse_product_id(raw: &str) -> Result<ProductId, ApiError> {
    ProductId::parse(raw).map_err(|_| ApiError::invalid_param("id", raw))
}

fn parse_slot(raw: &str) -> Result<ImageSlot, ApiError> {
    ImageSlot::parse(raw).map_err(|_| ApiError::invalid_param("slot", raw))
}

pub(crate) async fn healthz_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    with_request_id((StatusCode::OK, "ok").into_response(), &request_id)
}

pub(crate) async fn readyz_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    if state.ready.load(Ordering::Relaxed) {
        with_request_id((StatusCode::OK, "ready").into_response(), &request_id)
    } else {
        with_request_id(
            (StatusCode::SERVICE_UNAVAILABLE, "not-ready").into_response(),
            &request_id,
        )
    }
}

pub(crate) async fn list_images_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let request_id = propagated_request_id(&headers, &state);
    let product_id = match parse_product_id(&id) {
        Ok(pid) => pid,
        Err(err) => return fail_response(err, &request_id),
    };
    match state.images.list_images(&product_id).await {
        Ok(images) => ok_response(images, &request_id),
        Err(err) => engine_failure(&err, &request_id),
    }
}

pub(crate) async fn slot_detail_handler(
    State(state): State<AppState>,
    Path((id, slot)): Path<(String, String)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let request_id = propagated_request_id(&headers, &state);
    let (product_id, slot) = match (parse_product_id(&id), parse_slot(&slot)) {
        (Ok(pid), Ok(slot)) => (pid, slot),
        (Err(err), _) | (_, Err(err)) => return fail_response(err, &request_id),
    };
    match state.images.slot_detail(&product_id, slot).await {
        Ok(detail) => ok_response(detail, &request_id),
        Err(err) => engine_failure(&err, &request_id),
    }
}

pub(crate) async fn validate_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let request_id = propagated_request_id(&headers, &state);
    let product_id = match parse_product_id(&id) {
        Ok(pid) => pid,
        Err(err) => return fail_response(err, &request_id),
    };
    match state.images.check(&product_id).await {
        Ok(checks) => ok_response(ValidateData::from_checks(checks), &request_id),
        Err(err) => engine_failure(&err, &request_id),
    }
}

pub(crate) async fn repair_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let request_id = propagated_request_id(&headers, &state);
    let product_id = match parse_product_id(&id) {
        Ok(pid) => pid,
        Err(err) => return fail_response(err, &request_id),
    };
    info!(request_id = %request_id, product_id = %product_id, "repair requested");
    match tokio::time::timeout(state.api.request_timeout, state.images.repair(&product_id)).await {
        Ok(Ok(result)) => ok_response(result, &request_id),
        Ok(Err(err)) => engine_failure(&err, &request_id),
        Err(_) => fail_response(deadline_exceeded("repair"), &request_id),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadQuery {
    filename: Option<String>,
    mime_type: Option<String>,
}

pub(crate) async fn upload_handler(
    State(state): State<AppState>,
    Path((id, slot)): Path<(String, String)>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let request_id = propagated_request_id(&headers, &state);
    let (product_id, slot) = match (parse_product_id(&id), parse_slot(&slot)) {
        (Ok(pid), Ok(slot)) => (pid, slot),
        (Err(err), _) | (_, Err(err)) => return fail_response(err, &request_id),
    };
    let Some(filename) = query.filename.filter(|f| !f.trim().is_empty()) else {
        return fail_response(ApiError::invalid_param("filename", ""), &request_id);
    };
    let mime_type = query.mime_type.or_else(|| {
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("image/"))
            .map(str::to_string)
    });

    info!(
        request_id = %request_id,
        product_id = %product_id,
        slot = %slot,
        bytes = body.len(),
        "upload received"
    );
    let request = IngestRequest {
        product_id,
        slot,
        bytes: body.to_vec(),
        original_name: filename,
        mime_type,
    };
    match state.images.ingest(request).await {
        Ok(asset) => ok_response(asset, &request_id),
        Err(err) => engine_failure(&err, &request_id),
    }
}

pub(crate) async fn batch_upload_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<BatchUploadRequest>,
) -> impl IntoResponse {
    let request_id = propagated_request_id(&headers, &state);
    let product_id = match parse_product_id(&id) {
        Ok(pid) => pid,
        Err(err) => return fail_response(err, &request_id),
    };

    let mut report = BatchUploadReport::default();
    for item in request.images {
        let bytes = match base64::engine::general_purpose::STANDARD.decode(&item.content_base64) {
            Ok(bytes) => bytes,
            Err(err) => {
                report.failed += 1;
                report.outcomes.push(UploadOutcome {
                    slot: item.slot,
                    success: false,
                    asset_id: None,
                    error: Some(format!("invalid base64 content: {err}")),
                });
                continue;
            }
        };
        let ingest = IngestRequest {
            product_id: product_id.clone(),
            slot: item.slot,
            bytes,
            original_name: item.file_name,
            mime_type: item.mime_type,
        };
        match state.images.ingest(ingest).await {
            Ok(asset) => {
                report.uploaded += 1;
                report.outcomes.push(UploadOutcome {
                    slot: item.slot,
                    success: true,
                    asset_id: Some(asset.asset_id),
                    error: None,
                });
            }
            Err(err) => {
                warn!(
                    request_id = %request_id,
                    product_id = %product_id,
                    slot = %item.slot,
                    error = %err,
                    "batch upload slot failed"
                );
                report.failed += 1;
                report.outcomes.push(UploadOutcome {
                    slot: item.slot,
                    success: false,
                    asset_id: None,
                    error: Some(err.to_string()),
                });
            }
        }
    }
    ok_response(report, &request_id)
}

pub(crate) async fn delete_handler(
    State(state): State<AppState>,
    Path((id, slot)): Path<(String, String)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let request_id = propagated_request_id(&headers, &state);
    let (product_id, slot) = match (parse_product_id(&id), parse_slot(&slot)) {
        (Ok(pid), Ok(slot)) => (pid, slot),
        (Err(err), _) | (_, Err(err)) => return fail_response(err, &request_id),
    };
    match state.images.delete_image(&product_id, slot).await {
        Ok(deleted) => ok_response(json!({ "deleted": deleted }), &request_id),
        Err(err) => engine_failure(&err, &request_id),
    }
}

pub(crate) async fn sweep_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let request_id = propagated_request_id(&headers, &state);
    if !state.api.enable_admin_sweep {
        return fail_response(ApiError::not_found("sweep endpoint disabled"), &request_id);
    }
    info!(request_id = %request_id, "admin sweep requested");
    match tokio::time::timeout(state.api.request_timeout, state.images.sweep()).await {
        Ok(Ok(result)) => ok_response(result, &request_id),
        Ok(Err(err)) => engine_failure(&err, &request_id),
        Err(_) => fail_response(deadline_exceeded("sweep"), &request_id),
    }
}
