use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Runtime knobs for the HTTP surface. Raw uploads are capped at the model
/// limit plus headroom for multipart/base64 framing.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    pub enable_admin_sweep: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 16 * 1024 * 1024,
            request_timeout: Duration::from_secs(30),
            enable_admin_sweep: false,
        }
    }
}
