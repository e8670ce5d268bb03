use serde::Deserialize;
use thiserror::Error;

/// All the ways a backend call can go wrong
///
/// Three families matter to callers: an authentication failure (the session
/// is dead, handled globally by the transport), a validation failure (the
/// server rejected the input and said why), and everything else (network or
/// server trouble, shown as a generic retry prompt).
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("authentication required")]
    AuthenticationFailed,

    #[error("{0}")]
    Validation(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected response (status {status}): {body}")]
    RequestFailed { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// FastAPI-style error body: {"detail": "..."}
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    /// Classify a non-success response from a protected endpoint.
    ///
    /// 401 means the credential is invalid or expired. Any other 4xx that
    /// carries a structured detail message is a validation failure whose
    /// message must reach the user verbatim.
    pub fn classify(status: reqwest::StatusCode, body: &str) -> Self {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return ApiError::AuthenticationFailed;
        }
        if status.is_client_error() {
            if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
                return ApiError::Validation(parsed.detail);
            }
        }
        ApiError::RequestFailed {
            status: status.as_u16(),
            body: body.to_string(),
        }
    }

    /// Classify a non-success response from login/register.
    ///
    /// These requests carry no bearer token, so a 401 here means bad
    /// credentials (a validation failure), not an expired session.
    pub fn classify_unauthenticated(status: reqwest::StatusCode, body: &str) -> Self {
        if status.is_client_error() {
            if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
                return ApiError::Validation(parsed.detail);
            }
        }
        ApiError::RequestFailed {
            status: status.as_u16(),
            body: body.to_string(),
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::AuthenticationFailed)
    }

    /// Whether retrying could plausibly help.
    ///
    /// Retry on network errors and on 5xx / 429 / 408. Never retry auth or
    /// validation failures: the answer will not change.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(e) => !e.is_builder() && !e.is_decode(),
            ApiError::RequestFailed { status, .. } => {
                *status >= 500 || *status == 429 || *status == 408
            }
            _ => false,
        }
    }

    /// Message suitable for direct display.
    ///
    /// Validation messages come from the server and are shown verbatim;
    /// everything else falls back to the caller's generic prompt.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::AuthenticationFailed => "Please log in.".to_string(),
            ApiError::Validation(detail) => detail.clone(),
            _ => fallback.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_unauthorized_is_auth_failure() {
        let err = ApiError::classify(StatusCode::UNAUTHORIZED, "{\"detail\": \"Not authenticated\"}");
        assert!(err.is_auth_failure());
    }

    #[test]
    fn test_client_error_with_detail_is_validation() {
        let err = ApiError::classify(StatusCode::BAD_REQUEST, "{\"detail\": \"您已关注该公司\"}");
        match err {
            ApiError::Validation(msg) => assert_eq!(msg, "您已关注该公司"),
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_client_error_without_detail_is_request_failed() {
        let err = ApiError::classify(StatusCode::BAD_REQUEST, "<html>nope</html>");
        match err {
            ApiError::RequestFailed { status, .. } => assert_eq!(status, 400),
            other => panic!("expected RequestFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_server_error_is_request_failed() {
        let err = ApiError::classify(StatusCode::INTERNAL_SERVER_ERROR, "");
        match err {
            ApiError::RequestFailed { status, .. } => assert_eq!(status, 500),
            other => panic!("expected RequestFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_login_401_is_validation_not_session_death() {
        let err = ApiError::classify_unauthenticated(
            StatusCode::UNAUTHORIZED,
            "{\"detail\": \"邮箱或密码错误\"}",
        );
        match err {
            ApiError::Validation(msg) => assert_eq!(msg, "邮箱或密码错误"),
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ApiError::RequestFailed { status: 502, body: String::new() }.is_retryable());
        assert!(ApiError::RequestFailed { status: 429, body: String::new() }.is_retryable());
        assert!(ApiError::RequestFailed { status: 408, body: String::new() }.is_retryable());
        assert!(!ApiError::RequestFailed { status: 404, body: String::new() }.is_retryable());
        assert!(!ApiError::AuthenticationFailed.is_retryable());
        assert!(!ApiError::Validation("dup".into()).is_retryable());
    }

    #[test]
    fn test_user_message_verbatim_for_validation() {
        let err = ApiError::Validation("该邮箱已被注册".into());
        assert_eq!(err.user_message("generic"), "该邮箱已被注册");

        let err = ApiError::RequestFailed { status: 503, body: String::new() };
        assert_eq!(err.user_message("Try again later."), "Try again later.");
    }
}
