use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - credentials or token rejected")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            400..=499 => ApiError::BadRequest(truncated),
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Response body captured with the error, if the variant carries one.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            ApiError::BadRequest(body)
            | ApiError::AccessDenied(body)
            | ApiError::NotFound(body)
            | ApiError::ServerError(body) => Some(body),
            _ => None,
        }
    }

    /// Whether the server understood the request and refused it, as opposed
    /// to the request never completing or the server failing. A missing
    /// route is a deployment fault, not a refusal.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ApiError::BadRequest(_) | ApiError::AccessDenied(_) | ApiError::Unauthorized
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_classifies_rejections() {
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_rejection());
        assert!(ApiError::from_status(StatusCode::FORBIDDEN, "no").is_rejection());
        assert!(ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "bad").is_rejection());
        assert!(!ApiError::from_status(StatusCode::NOT_FOUND, "").is_rejection());
        assert!(!ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, "").is_rejection());
        assert!(!ApiError::from_status(StatusCode::BAD_GATEWAY, "down").is_rejection());
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "é".repeat(400);
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body);
        let message = err.to_string();
        assert!(message.contains("truncated, 800 total bytes"));
    }
}
