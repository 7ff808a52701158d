//! Error types for the HTTP boundary.

use thiserror::Error;

/// Fallback message when neither the body nor the transport says anything.
pub const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received (connect failure, timeout, broken transport).
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response carrying a body.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// HTTP 400: the caller sent bad input and handles it in context.
    #[error("invalid request ({status}): {message}")]
    Validation { status: u16, message: String },

    /// Identity provider rejected the request or no session exists.
    #[error("auth error: {0}")]
    Auth(String),

    /// 2xx body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Build the error for a non-2xx response.
    pub fn from_status(status: u16, body: &str, transport: &str) -> Self {
        let message = extract_error_message(body, transport);
        if status == 400 {
            Self::Validation { status, message }
        } else {
            Self::Server { status, message }
        }
    }

    /// Whether a generic failure notification should be shown.
    ///
    /// Input errors are left to the caller.
    pub fn should_notify(&self) -> bool {
        !matches!(self, Self::Validation { .. })
    }

    /// Transport failures and 5xx responses are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Message without the variant prefix, for user-facing output.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(msg) | Self::Auth(msg) | Self::Decode(msg) => msg.clone(),
            Self::Server { message, .. } | Self::Validation { message, .. } => message.clone(),
            Self::Io(e) => e.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Pick the most specific message from an error response.
///
/// Priority: JSON `message`, JSON `detail`, the raw body, the transport
/// message, then [`UNKNOWN_ERROR`].
pub fn extract_error_message(body: &str, transport: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "detail"] {
            match map.get(key) {
                Some(serde_json::Value::String(s)) if !s.is_empty() => return s.clone(),
                Some(serde_json::Value::Null) | None => {}
                Some(serde_json::Value::String(_)) => {}
                Some(other) => return other.to_string(),
            }
        }
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    if !transport.is_empty() {
        return transport.to_string();
    }
    UNKNOWN_ERROR.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_field_wins() {
        let body = r#"{"message":"token expired","detail":"jwt exp"}"#;
        assert_eq!(extract_error_message(body, "HTTP 401"), "token expired");
    }

    #[test]
    fn detail_when_no_message() {
        let body = r#"{"detail":"group not found"}"#;
        assert_eq!(extract_error_message(body, "HTTP 404"), "group not found");
    }

    #[test]
    fn structured_detail_is_stringified() {
        let body = r#"{"detail":[{"loc":["limit"],"msg":"bad"}]}"#;
        let msg = extract_error_message(body, "");
        assert!(msg.contains("limit"));
    }

    #[test]
    fn empty_message_falls_through_to_detail() {
        let body = r#"{"message":"","detail":"rate limited"}"#;
        assert_eq!(extract_error_message(body, ""), "rate limited");
    }

    #[test]
    fn raw_body_when_not_structured() {
        assert_eq!(
            extract_error_message("Bad Gateway\n", "HTTP 502"),
            "Bad Gateway"
        );
        // JSON without either key is still a raw body
        assert_eq!(extract_error_message(r#"{"error":"x"}"#, ""), r#"{"error":"x"}"#);
    }

    #[test]
    fn transport_then_unknown() {
        assert_eq!(extract_error_message("", "connection reset"), "connection reset");
        assert_eq!(extract_error_message("  ", ""), UNKNOWN_ERROR);
    }

    #[test]
    fn bad_request_is_validation_and_not_notified() {
        let err = ApiError::from_status(400, r#"{"message":"min_price > max_price"}"#, "");
        assert!(matches!(err, ApiError::Validation { status: 400, .. }));
        assert!(!err.should_notify());
        assert_eq!(err.user_message(), "min_price > max_price");
    }

    #[test]
    fn other_statuses_are_server_errors() {
        for status in [401, 403, 404, 422, 500, 503] {
            let err = ApiError::from_status(status, "", "boom");
            assert!(matches!(err, ApiError::Server { .. }), "status {status}");
            assert!(err.should_notify());
        }
    }

    #[test]
    fn retryable_classification() {
        assert!(ApiError::Network("reset".into()).is_retryable());
        assert!(ApiError::from_status(502, "", "").is_retryable());
        assert!(!ApiError::from_status(404, "", "").is_retryable());
        assert!(!ApiError::Auth("no session".into()).is_retryable());
    }
}
