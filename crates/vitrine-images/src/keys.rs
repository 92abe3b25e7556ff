use vitrine_core::short_digest;
use vitrine_model::{ImageSlot, ProductId};

/// Every object the image service writes lives under this key prefix; the
/// orphan sweeper only ever scans (and deletes) inside it.
pub const PRODUCTS_KEY_PREFIX: &str = "products/";

#[must_use]
fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

/// Deterministic object key for a new ingest:
/// `products/{product}/{slot}/{digest}.{ext}`. The digest covers the content
/// hash plus a timestamp so re-uploads of changed bytes get fresh keys while
/// the layout stays predictable.
#[must_use]
pub fn derive_object_key(
    product_id: &ProductId,
    slot: ImageSlot,
    content_hash: &str,
    now_millis: u64,
    mime_type: &str,
) -> String {
    let uniq = short_digest(&format!("{product_id}/{slot}/{content_hash}/{now_millis}"));
    format!(
        "{PRODUCTS_KEY_PREFIX}{product_id}/{slot}/{uniq}.{}",
        extension_for_mime(mime_type)
    )
}

/// Recovers an object key from a legacy slot URL. The URL path is taken as
/// the key, minus a leading slash and minus the bucket segment when the URL
/// was minted by this service's own store.
#[must_use]
pub fn object_key_from_url(url: &str, bucket: &str) -> Option<String> {
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = after_scheme.split_once('/').map(|(_, p)| p)?;
    let path = path.split(['?', '#']).next().unwrap_or(path);
    if path.is_empty() {
        return None;
    }
    let key = path
        .strip_prefix(&format!("{bucket}/"))
        .unwrap_or(path)
        .to_string();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}
