use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use vitrine_store::{BackoffPolicy, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginError(pub String);

impl Display for OriginError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for OriginError {}

/// Download side of the external content source. Only the by-token fetch is
/// consumed here; listing and auth handshakes stay inside the client.
#[async_trait]
pub trait OriginDownloader: Send + Sync + 'static {
    async fn download(&self, token: &str) -> Result<Vec<u8>, OriginError>;
}

/// Renew the tenant token this long before the origin says it expires.
const TOKEN_SAFETY_MARGIN: Duration = Duration::from_secs(300);

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    tenant_access_token: String,
    #[serde(default)]
    expire: u64,
}

/// HTTP client for the content origin. Authenticates with an app id/secret
/// exchanged for a tenant token, cached until shortly before expiry.
pub struct HttpOriginClient {
    base_url: String,
    app_id: String,
    app_secret: String,
    http: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
    retry: RetryPolicy,
}

impl HttpOriginClient {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            http: reqwest::Client::new(),
            token: Mutex::new(None),
            retry,
        }
    }

    async fn tenant_token(&self) -> Result<String, OriginError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let url = format!(
            "{}/open-apis/auth/v3/tenant_access_token/internal",
            self.base_url
        );
        let mut body = HashMap::new();
        body.insert("app_id", self.app_id.as_str());
        body.insert("app_secret", self.app_secret.as_str());
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| OriginError(format!("token request failed: {e}")))?;
        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| OriginError(format!("token response malformed: {e}")))?;
        if parsed.code != 0 {
            return Err(OriginError(format!(
                "token exchange rejected (code {}): {}",
                parsed.code, parsed.msg
            )));
        }
        let lifetime = Duration::from_secs(parsed.expire)
            .saturating_sub(TOKEN_SAFETY_MARGIN);
        *cached = Some(CachedToken {
            value: parsed.tenant_access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        debug!(expire_secs = parsed.expire, "origin tenant token refreshed");
        Ok(parsed.tenant_access_token)
    }

    async fn download_once(&self, token: &str) -> Result<Vec<u8>, OriginError> {
        let bearer = self.tenant_token().await?;
        let url = format!("{}/open-apis/drive/v1/medias/{token}/download", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| OriginError(format!("download request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(OriginError(format!(
                "download of token {token} failed with status {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| OriginError(format!("download body read failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl OriginDownloader for HttpOriginClient {
    async fn download(&self, token: &str) -> Result<Vec<u8>, OriginError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.download_once(token).await {
                Ok(bytes) => return Ok(bytes),
                Err(err) => match self.retry.next_delay(attempt) {
                    Some(delay) => {
                        warn!(token, attempt, error = %err, "origin download retry");
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(err),
                },
            }
        }
    }
}

/// Origin fake holding token → bytes, with failure injection.
#[derive(Default)]
pub struct FakeOrigin {
    files: Mutex<HashMap<String, Vec<u8>>>,
    pub fail: AtomicBool,
    pub download_calls: AtomicU64,
}

impl FakeOrigin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, token: &str, bytes: &[u8]) {
        self.files
            .lock()
            .await
            .insert(token.to_string(), bytes.to_vec());
    }
}

#[async_trait]
impl OriginDownloader for FakeOrigin {
    async fn download(&self, token: &str) -> Result<Vec<u8>, OriginError> {
        self.download_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail.load(Ordering::Relaxed) {
            return Err(OriginError("injected origin failure".to_string()));
        }
        self.files
            .lock()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| OriginError(format!("unknown origin token {token}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_origin_serves_seeded_tokens() {
        let origin = FakeOrigin::new();
        origin.seed("tok-1", b"bytes").await;
        assert_eq!(origin.download("tok-1").await.unwrap(), b"bytes");
        assert!(origin.download("tok-2").await.is_err());
        assert_eq!(origin.download_calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn fake_origin_failure_injection() {
        let origin = FakeOrigin::new();
        origin.seed("tok-1", b"bytes").await;
        origin.fail.store(true, Ordering::Relaxed);
        assert!(origin.download("tok-1").await.is_err());
    }
}
