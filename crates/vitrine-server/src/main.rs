// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vitrine_images::{HttpOriginClient, ImageService, SqliteCatalog};
use vitrine_server::{build_router, ApiConfig, AppState};
use vitrine_store::{LocalFsStore, RetryPolicy};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("VITRINE_LOG_JSON", true) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => return,
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(_) => return,
        };
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let bind_addr = env::var("VITRINE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let store_root = PathBuf::from(
        env::var("VITRINE_STORE_ROOT").unwrap_or_else(|_| "artifacts/image-store".to_string()),
    );
    let public_base = env::var("VITRINE_PUBLIC_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:8080/objects".to_string());
    let db_path = PathBuf::from(
        env::var("VITRINE_DB_PATH").unwrap_or_else(|_| "artifacts/vitrine.db".to_string()),
    );
    let bucket = env::var("VITRINE_BUCKET").unwrap_or_else(|_| "catalog".to_string());

    let api_cfg = ApiConfig {
        max_body_bytes: env_usize("VITRINE_MAX_BODY_BYTES", 16 * 1024 * 1024),
        request_timeout: env_duration_ms("VITRINE_REQUEST_TIMEOUT_MS", 30_000),
        enable_admin_sweep: env_bool("VITRINE_ENABLE_ADMIN_SWEEP", false),
    };
    let retry = RetryPolicy {
        max_attempts: env_u64("VITRINE_ORIGIN_RETRY_ATTEMPTS", 3) as u32,
        base_delay: env_duration_ms("VITRINE_ORIGIN_RETRY_BASE_MS", 150),
    };

    let store = Arc::new(LocalFsStore::new(store_root, public_base));
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("create db dir failed: {e}"))?;
    }
    let catalog = Arc::new(
        SqliteCatalog::open(&db_path).map_err(|e| format!("open catalog db failed: {e}"))?,
    );
    let origin = Arc::new(HttpOriginClient::new(
        env::var("VITRINE_ORIGIN_BASE_URL")
            .unwrap_or_else(|_| "https://open.feishu.cn".to_string()),
        env::var("VITRINE_ORIGIN_APP_ID").unwrap_or_default(),
        env::var("VITRINE_ORIGIN_APP_SECRET").unwrap_or_default(),
        retry,
    ));
    let images = Arc::new(ImageService::new(
        store,
        catalog.clone(),
        catalog,
        origin,
        bucket,
    ));

    let state = AppState::with_config(images, api_cfg);
    state.ready.store(true, Ordering::Relaxed);
    let app = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("bind {bind_addr} failed: {e}"))?;
    info!("vitrine-server listening on {bind_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .map_err(|e| format!("server failed: {e}"))
}
