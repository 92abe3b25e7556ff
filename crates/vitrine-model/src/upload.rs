use crate::ValidationError;

pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Hard cap on a single image upload: 10 MiB.
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Gate applied before any I/O on the ingestion path.
pub fn validate_upload(mime_type: &str, file_size: u64) -> Result<(), ValidationError> {
    if !ALLOWED_MIME_TYPES.contains(&mime_type) {
        return Err(ValidationError(format!(
            "unsupported mime type '{mime_type}' (allowed: image/jpeg, image/png, image/webp)"
        )));
    }
    if file_size == 0 {
        return Err(ValidationError("empty upload".to_string()));
    }
    if file_size > MAX_IMAGE_BYTES {
        return Err(ValidationError(format!(
            "file size {file_size} exceeds cap of {MAX_IMAGE_BYTES} bytes"
        )));
    }
    Ok(())
}

/// Best-effort mime inference for origin downloads that carry no content
/// type. Unknown extensions fall back to jpeg, the dominant catalog format.
#[must_use]
pub fn infer_mime_from_name(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

/// Reduces an original file name to a safe charset for use inside object
/// keys. Path separators and control characters never survive.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(|c| c == '.' || c == '_').is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_before_any_io() {
        assert!(validate_upload("image/gif", 10).is_err());
        assert!(validate_upload("image/jpeg", 0).is_err());
        assert!(validate_upload("image/jpeg", MAX_IMAGE_BYTES + 1).is_err());
        assert!(validate_upload("image/webp", MAX_IMAGE_BYTES).is_ok());
    }

    #[test]
    fn mime_inference_covers_allowed_set() {
        assert_eq!(infer_mime_from_name("a.PNG"), "image/png");
        assert_eq!(infer_mime_from_name("b.webp"), "image/webp");
        assert_eq!(infer_mime_from_name("c.jpg"), "image/jpeg");
        assert_eq!(infer_mime_from_name("noext"), "image/jpeg");
    }

    #[test]
    fn sanitize_strips_separators_and_never_returns_empty() {
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("front photo.jpg"), "front_photo.jpg");
        assert_eq!(sanitize_filename("   "), "unnamed");
        assert_eq!(sanitize_filename("ok-name_1.jpeg"), "ok-name_1.jpeg");
    }
}
