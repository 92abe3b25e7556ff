// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod api_config;
mod handlers;

pub const CRATE_NAME: &str = "vitrine-server";

pub use api_config::{ApiConfig, CONFIG_SCHEMA_VERSION};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use vitrine_api::{ApiError, ApiErrorCode};
use vitrine_images::{ImageError, ImageErrorCode, ImageService};

#[derive(Clone)]
pub struct AppState {
    pub images: Arc<ImageService>,
    pub api: ApiConfig,
    pub ready: Arc<AtomicBool>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(images: Arc<ImageService>) -> Self {
        Self::with_config(images, ApiConfig::default())
    }

    #[must_use]
    pub fn with_config(images: Arc<ImageService>, api: ApiConfig) -> Self {
        Self {
            images,
            api,
            ready: Arc::new(AtomicBool::new(true)),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz_handler))
        .route("/readyz", get(handlers::readyz_handler))
        .route(
            "/products/:id/images",
            get(handlers::list_images_handler).post(handlers::batch_upload_handler),
        )
        .route(
            "/products/:id/images/validate",
            get(handlers::validate_handler),
        )
        .route("/products/:id/images/repair", post(handlers::repair_handler))
        .route(
            "/products/:id/images/:slot",
            get(handlers::slot_detail_handler)
                .post(handlers::upload_handler)
                .delete(handlers::delete_handler),
        )
        .route("/admin/sweep", post(handlers::sweep_handler))
        .layer(DefaultBodyLimit::max(state.api.max_body_bytes))
        .with_state(state)
}

/// Engine errors onto the wire taxonomy. Drift never reaches this point;
/// what arrives here is a caller mistake or an infrastructure outage.
#[must_use]
pub fn map_image_error(err: &ImageError) -> ApiError {
    let code = match err.code {
        ImageErrorCode::Validation => ApiErrorCode::ValidationFailed,
        ImageErrorCode::NotFound => ApiErrorCode::NotFound,
        ImageErrorCode::Storage => ApiErrorCode::StorageUnavailable,
        ImageErrorCode::Origin => ApiErrorCode::OriginUnavailable,
        ImageErrorCode::Repository | ImageErrorCode::Internal | _ => ApiErrorCode::Internal,
    };
    ApiError::new(code, err.message.clone())
}
