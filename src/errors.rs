use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

const RETRY_LATER: &str = "Service temporarily unavailable, please retry later";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound(what) => AppError::NotFound(what),
            DomainError::InvalidInput(msg) => AppError::BadRequest(msg),
            DomainError::Unauthorized(msg) => AppError::Unauthorized(msg),
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            DomainError::Unavailable(msg) => AppError::Unavailable(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Internal(detail) => {
                log::error!("request failed: {}", detail);
                RETRY_LATER.to_string()
            }
            AppError::Unavailable(detail) => {
                log::warn!("dependency unavailable: {}", detail);
                RETRY_LATER.to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;

    #[test]
    fn not_found_returns_404() {
        let resp = AppError::NotFound("Order".to_string()).error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_error_returns_500() {
        let err = AppError::Internal("something went wrong".to_string());
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_display() {
        assert_eq!(
            AppError::NotFound("Order".to_string()).to_string(),
            "Order not found"
        );
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::order_not_found(), StatusCode::NOT_FOUND),
            (
                DomainError::InvalidInput("cart is empty".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                DomainError::Unauthorized("nope".to_string()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                DomainError::Conflict("raced".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                DomainError::Unavailable("no gateway".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                DomainError::Internal("oops".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (domain, status) in cases {
            let app_err: AppError = domain.into();
            assert_eq!(app_err.status_code(), status);
        }
    }

    #[actix_web::test]
    async fn internal_details_are_not_leaked() {
        let resp = AppError::Internal("connection refused on 10.0.0.5".to_string()).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let body = std::str::from_utf8(&body).unwrap();
        assert!(body.contains("retry later"));
        assert!(!body.contains("10.0.0.5"));
    }

    #[actix_web::test]
    async fn validation_messages_are_surfaced() {
        let resp = AppError::BadRequest("cart is empty".to_string()).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        assert!(std::str::from_utf8(&body).unwrap().contains("cart is empty"));
    }
}
