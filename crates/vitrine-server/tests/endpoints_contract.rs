// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use base64::Engine;
use serde_json::{json, Value};
use vitrine_images::{FakeOrigin, ImageService, MemoryCatalog, ProductRepository};
use vitrine_model::{Product, ProductId, SlotRef};
use vitrine_server::{build_router, ApiConfig, AppState};
use vitrine_store::{AssetStore, LocalFsStore, MemoryStore};

struct TestServer {
    base: String,
    catalog: Arc<MemoryCatalog>,
    client: reqwest::Client,
}

async fn spawn_server(api: ApiConfig) -> TestServer {
    spawn_server_on(Arc::new(MemoryStore::new()), api).await
}

async fn spawn_server_on(store: Arc<dyn AssetStore>, api: ApiConfig) -> TestServer {
    let catalog = Arc::new(MemoryCatalog::new());
    let origin = Arc::new(FakeOrigin::new());
    let images = Arc::new(ImageService::new(
        store,
        catalog.clone(),
        catalog.clone(),
        origin,
        "catalog",
    ));
    let state = AppState::with_config(images, api);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve app");
    });

    TestServer {
        base: format!("http://{addr}"),
        catalog,
        client: reqwest::Client::new(),
    }
}

async fn seed_product(server: &TestServer, raw: &str) {
    let id = ProductId::parse(raw).expect("product id");
    server
        .catalog
        .put(&Product::new(id, "test product"))
        .await
        .expect("seed product");
}

#[tokio::test]
async fn health_and_readiness_respond() {
    let server = spawn_server(ApiConfig::default()).await;
    let resp = server
        .client
        .get(format!("{}/healthz", server.base))
        .send()
        .await
        .expect("healthz");
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().contains_key("x-request-id"));
    assert_eq!(resp.text().await.expect("body"), "ok");

    let resp = server
        .client
        .get(format!("{}/readyz", server.base))
        .send()
        .await
        .expect("readyz");
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.expect("body"), "ready");
}

#[tokio::test]
async fn upload_list_detail_delete_round_trip() {
    let server = spawn_server(ApiConfig::default()).await;
    seed_product(&server, "p-1").await;

    let resp = server
        .client
        .post(format!(
            "{}/products/p-1/images/front?filename=front.jpg",
            server.base
        ))
        .header("content-type", "image/jpeg")
        .body(b"front-bytes".to_vec())
        .send()
        .await
        .expect("upload");
    assert_eq!(resp.status(), 200);
    let envelope: Value = resp.json().await.expect("json");
    assert_eq!(envelope["success"], true);
    let asset_id = envelope["data"]["assetId"].as_str().expect("asset id");
    assert!(asset_id.starts_with("img-"));
    assert_eq!(envelope["data"]["syncStatus"], "synced");

    let resp = server
        .client
        .get(format!("{}/products/p-1/images", server.base))
        .send()
        .await
        .expect("list");
    assert_eq!(resp.status(), 200);
    let envelope: Value = resp.json().await.expect("json");
    let images = envelope["data"].as_array().expect("images array");
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["slot"], "front");
    assert_eq!(images[0]["asset"]["assetId"], asset_id);

    let resp = server
        .client
        .get(format!("{}/products/p-1/images/front", server.base))
        .send()
        .await
        .expect("detail");
    assert_eq!(resp.status(), 200);

    // unknown slot name is a caller mistake
    let resp = server
        .client
        .get(format!("{}/products/p-1/images/side", server.base))
        .send()
        .await
        .expect("bad slot");
    assert_eq!(resp.status(), 400);
    let envelope: Value = resp.json().await.expect("json");
    assert_eq!(envelope["success"], false);
    assert_eq!(envelope["error"]["code"], "invalid_parameter");

    // empty slot is a 404
    let resp = server
        .client
        .get(format!("{}/products/p-1/images/back", server.base))
        .send()
        .await
        .expect("empty slot");
    assert_eq!(resp.status(), 404);

    let resp = server
        .client
        .delete(format!("{}/products/p-1/images/front", server.base))
        .send()
        .await
        .expect("delete");
    assert_eq!(resp.status(), 200);
    let envelope: Value = resp.json().await.expect("json");
    assert_eq!(envelope["data"]["deleted"], true);

    let resp = server
        .client
        .delete(format!("{}/products/p-1/images/front", server.base))
        .send()
        .await
        .expect("re-delete");
    let envelope: Value = resp.json().await.expect("json");
    assert_eq!(envelope["data"]["deleted"], false);
}

#[tokio::test]
async fn upload_lands_on_disk_behind_the_fs_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(LocalFsStore::new(
        dir.path().to_path_buf(),
        "https://cdn.example",
    ));
    let server = spawn_server_on(store, ApiConfig::default()).await;
    seed_product(&server, "p-1").await;

    let resp = server
        .client
        .post(format!(
            "{}/products/p-1/images/front?filename=front.jpg",
            server.base
        ))
        .header("content-type", "image/jpeg")
        .body(b"front-bytes".to_vec())
        .send()
        .await
        .expect("upload");
    assert_eq!(resp.status(), 200);
    let envelope: Value = resp.json().await.expect("json");
    let object_key = envelope["data"]["objectKey"].as_str().expect("object key");
    let on_disk = dir.path().join("catalog").join(object_key);
    assert_eq!(
        std::fs::read(&on_disk).expect("object on disk"),
        b"front-bytes"
    );

    let resp = server
        .client
        .delete(format!("{}/products/p-1/images/front", server.base))
        .send()
        .await
        .expect("delete");
    let envelope: Value = resp.json().await.expect("json");
    assert_eq!(envelope["data"]["deleted"], true);
    assert!(!on_disk.exists());
}

#[tokio::test]
async fn upload_rejections_surface_as_400() {
    let server = spawn_server(ApiConfig::default()).await;
    seed_product(&server, "p-1").await;

    // missing filename
    let resp = server
        .client
        .post(format!("{}/products/p-1/images/front", server.base))
        .header("content-type", "image/jpeg")
        .body(b"bytes".to_vec())
        .send()
        .await
        .expect("upload");
    assert_eq!(resp.status(), 400);

    // disallowed content type
    let resp = server
        .client
        .post(format!(
            "{}/products/p-1/images/front?filename=anim.gif",
            server.base
        ))
        .header("content-type", "image/gif")
        .body(b"bytes".to_vec())
        .send()
        .await
        .expect("upload");
    assert_eq!(resp.status(), 400);
    let envelope: Value = resp.json().await.expect("json");
    assert_eq!(envelope["error"]["code"], "validation_failed");
}

#[tokio::test]
async fn validate_then_repair_resolves_legacy_drift() {
    let server = spawn_server(ApiConfig::default()).await;
    seed_product(&server, "p-1").await;
    let id = ProductId::parse("p-1").expect("product id");
    server
        .catalog
        .set_slot(
            &id,
            vitrine_model::ImageSlot::Label,
            SlotRef::Legacy("memory://catalog/products/p-1/label/old.jpg".to_string()),
        )
        .await
        .expect("seed legacy slot");

    let resp = server
        .client
        .get(format!("{}/products/p-1/images/validate", server.base))
        .send()
        .await
        .expect("validate");
    assert_eq!(resp.status(), 200);
    let envelope: Value = resp.json().await.expect("json");
    assert_eq!(envelope["data"]["summary"]["total"], 1);
    assert_eq!(envelope["data"]["summary"]["high"], 1);
    assert_eq!(
        envelope["data"]["checks"][0]["issues"]["imageRecordMissing"],
        true
    );

    let resp = server
        .client
        .post(format!("{}/products/p-1/images/repair", server.base))
        .send()
        .await
        .expect("repair");
    assert_eq!(resp.status(), 200);
    let envelope: Value = resp.json().await.expect("json");
    assert_eq!(envelope["data"]["repaired"], 1);
    assert_eq!(envelope["data"]["failed"], 0);

    let resp = server
        .client
        .get(format!("{}/products/p-1/images/validate", server.base))
        .send()
        .await
        .expect("re-validate");
    let envelope: Value = resp.json().await.expect("json");
    assert_eq!(envelope["data"]["summary"]["high"], 0);
}

#[tokio::test]
async fn batch_upload_reports_per_slot_outcomes() {
    let server = spawn_server(ApiConfig::default()).await;
    seed_product(&server, "p-1").await;

    let good = base64::engine::general_purpose::STANDARD.encode(b"front-bytes");
    let body = json!({
        "images": [
            {"slot": "front", "fileName": "front.jpg", "contentBase64": good},
            {"slot": "back", "fileName": "back.jpg", "contentBase64": "not base64!!"}
        ]
    });
    let resp = server
        .client
        .post(format!("{}/products/p-1/images", server.base))
        .json(&body)
        .send()
        .await
        .expect("batch upload");
    assert_eq!(resp.status(), 200);
    let envelope: Value = resp.json().await.expect("json");
    assert_eq!(envelope["data"]["uploaded"], 1);
    assert_eq!(envelope["data"]["failed"], 1);
    let outcomes = envelope["data"]["outcomes"].as_array().expect("outcomes");
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0]["success"], true);
    assert_eq!(outcomes[1]["success"], false);
}

#[tokio::test]
async fn sweep_endpoint_is_gated_by_config() {
    let server = spawn_server(ApiConfig::default()).await;
    let resp = server
        .client
        .post(format!("{}/admin/sweep", server.base))
        .send()
        .await
        .expect("sweep disabled");
    assert_eq!(resp.status(), 404);

    let server = spawn_server(ApiConfig {
        enable_admin_sweep: true,
        ..ApiConfig::default()
    })
    .await;
    let resp = server
        .client
        .post(format!("{}/admin/sweep", server.base))
        .send()
        .await
        .expect("sweep enabled");
    assert_eq!(resp.status(), 200);
    let envelope: Value = resp.json().await.expect("json");
    assert_eq!(envelope["data"]["orphanedImages"], 0);
    assert_eq!(envelope["data"]["interrupted"], false);
}

#[tokio::test]
async fn request_id_is_propagated_from_header() {
    let server = spawn_server(ApiConfig::default()).await;
    seed_product(&server, "p-1").await;
    let resp = server
        .client
        .get(format!("{}/products/p-1/images", server.base))
        .header("x-request-id", "req-abc123")
        .send()
        .await
        .expect("list");
    assert_eq!(
        resp.headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-abc123")
    );
}
