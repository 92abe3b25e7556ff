// SPDX-License-Identifier: Apache-2.0

use crate::ApiError;
use serde::{Deserialize, Serialize};

/// Every endpoint answers `{success, data?, error?}`; exactly one of `data`
/// and `error` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiEnvelope<T> {
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    #[must_use]
    pub fn fail(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ApiErrorCode;

    #[test]
    fn ok_envelope_omits_error() {
        let wire = serde_json::to_value(ApiEnvelope::ok(42)).unwrap();
        assert_eq!(wire["success"], true);
        assert_eq!(wire["data"], 42);
        assert!(wire.get("error").is_none());
    }

    #[test]
    fn fail_envelope_omits_data() {
        let env: ApiEnvelope<()> =
            ApiEnvelope::fail(ApiError::new(ApiErrorCode::NotFound, "nope"));
        let wire = serde_json::to_value(env).unwrap();
        assert_eq!(wire["success"], false);
        assert!(wire.get("data").is_none());
        assert_eq!(wire["error"]["message"], "nope");
    }
}
