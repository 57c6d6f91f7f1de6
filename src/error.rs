use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::error;

use crate::summary::SummaryError;

/// Handler error rendered as `{"message": "..."}` with a matching status.
/// Server errors also carry the underlying cause under `"error"`.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn internal(msg: impl Into<String>, cause: &anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
            detail: Some(format!("{cause:#}")),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(
                status = %self.status,
                detail = self.detail.as_deref().unwrap_or_default(),
                "{}",
                self.message
            );
        }

        let body = match self.detail {
            Some(detail) => json!({ "message": self.message, "error": detail }),
            None => json!({ "message": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<SummaryError> for AppError {
    fn from(e: SummaryError) -> Self {
        match e {
            SummaryError::NoData(_) => AppError::not_found(e.to_string()),
        }
    }
}

/// Attaches a user-facing message to data access failures so handlers can
/// use `?` and still answer with the route's own wording.
pub trait ResultExt<T> {
    fn or_internal(self, msg: &str) -> Result<T, AppError>;
}

impl<T> ResultExt<T> for anyhow::Result<T> {
    fn or_internal(self, msg: &str) -> Result<T, AppError> {
        self.map_err(|e| AppError::internal(msg, &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_maps_to_not_found() {
        let err: AppError = SummaryError::NoData("marks").into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "No marks data found for this student.");
        assert!(err.detail.is_none());
    }

    #[test]
    fn data_access_failures_map_to_server_error() {
        let failed: anyhow::Result<()> = Err(anyhow::anyhow!("connection refused"));
        let err = failed.or_internal("Error fetching fees data.").unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Error fetching fees data.");
        assert_eq!(err.detail.as_deref(), Some("connection refused"));
    }

    #[test]
    fn response_carries_status() {
        let response =
            AppError::unauthorized("Invalid Hall Ticket Number or Password.").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AppError::bad_request("All fields are required.").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
