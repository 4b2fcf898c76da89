use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("invalid base url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        detail: Option<String>,
        body: String,
    },
    #[error("could not decode {endpoint} response: {message}")]
    Decode { endpoint: String, message: String },
}

impl ClientError {
    /// A rejection carrying a `detail` message, as the source sends for
    /// invalid requests.
    pub fn rejected(endpoint: impl Into<String>, status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        ClientError::Status {
            endpoint: endpoint.into(),
            status,
            body: serde_json::json!({ "detail": detail }).to_string(),
            detail: Some(detail),
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Message suitable for a toast: the source's `detail` when present,
    /// otherwise a generic description of the failure class.
    pub fn user_message(&self) -> String {
        if let Some(detail) = self.detail() {
            return detail.to_string();
        }
        match self {
            ClientError::InvalidUrl { url, .. } => format!("invalid server address {url}"),
            ClientError::Transport { .. } => "simulation server unreachable".to_string(),
            ClientError::Status { status, .. } => format!("request failed ({status})"),
            ClientError::Decode { .. } => "unexpected response from simulation server".to_string(),
        }
    }
}

/// Pulls the `detail` field out of an error body. FastAPI-style validation
/// errors carry a list of `{msg}` objects; the first message is used.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) => {
            let trimmed = detail.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Array(items) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_from_string_body() {
        let body = r#"{"detail": "Selected node is not a valid delivery point"}"#;
        assert_eq!(
            extract_detail(body).as_deref(),
            Some("Selected node is not a valid delivery point")
        );
    }

    #[test]
    fn detail_from_validation_array() {
        let body = r#"{"detail": [{"loc": ["body", "restaurant_id"], "msg": "field required", "type": "missing"}]}"#;
        assert_eq!(extract_detail(body).as_deref(), Some("field required"));
    }

    #[test]
    fn detail_absent_for_plain_text() {
        assert_eq!(extract_detail("Internal Server Error"), None);
        assert_eq!(extract_detail(r#"{"detail": "  "}"#), None);
        assert_eq!(extract_detail(r#"{"error": "nope"}"#), None);
    }

    #[test]
    fn user_message_prefers_detail() {
        let rejected = ClientError::rejected("orders", 429, "please wait");
        assert_eq!(rejected.user_message(), "please wait");
        assert_eq!(rejected.detail(), Some("please wait"));

        let bare = ClientError::Status {
            endpoint: "simulation/start".to_string(),
            status: 503,
            detail: None,
            body: "maintenance".to_string(),
        };
        assert_eq!(bare.user_message(), "request failed (503)");
        assert!(bare.to_string().contains("maintenance"));

        let offline = ClientError::Transport {
            endpoint: "grid".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(offline.user_message(), "simulation server unreachable");
    }
}
