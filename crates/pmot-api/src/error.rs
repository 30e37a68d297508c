use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    extract::multipart::MultipartRejection,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Every failure a handler can report. Serialized as
/// `{"error": <code>, "message": <text>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, or owned by someone else. The two are never told apart.
    #[error("not found")]
    NotFound,

    #[error("not authenticated")]
    Unauthorized,

    #[error("incorrect username or password")]
    InvalidCredentials,

    #[error("the free plan is limited to {0} stories, upgrade to premium to add more")]
    QuotaExceeded(u32),

    #[error("{0}")]
    Conflict(String),

    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error("payment verification failed")]
    VerificationFailed,

    #[error("{0}")]
    BadRequest(String),

    #[error("payload too large")]
    PayloadTooLarge,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::QuotaExceeded(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Gateway(_) | ApiError::VerificationFailed | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound => "not_found",
            ApiError::Unauthorized => "unauthorized",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::QuotaExceeded(_) => "quota_exceeded",
            ApiError::Conflict(_) => "conflict",
            ApiError::Gateway(_) => "gateway_error",
            ApiError::VerificationFailed => "verification_failed",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::PayloadTooLarge => "payload_too_large",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

// Extractor rejections keep the JSON error shape.

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": self.error_code(),
            "message": message,
        }));

        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_is_forbidden() {
        let err = ApiError::QuotaExceeded(3);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.error_code(), "quota_exceeded");
    }

    #[test]
    fn unauthorized_carries_challenge() {
        let resp = ApiError::Unauthorized.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[tokio::test]
    async fn rejected_json_body_keeps_error_shape() {
        use axum::body::{Body, to_bytes};
        use axum::extract::FromRequest;
        use axum::http::Request;

        let req = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"title\": 5"))
            .unwrap();
        let rejection = Json::<serde_json::Value>::from_request(req, &()).await.unwrap_err();

        let resp = ApiError::from(rejection).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value =
            serde_json::from_slice(&to_bytes(resp.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["error"], "bad_request");
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    #[test]
    fn internal_detail_is_not_leaked() {
        let err = ApiError::Internal(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
