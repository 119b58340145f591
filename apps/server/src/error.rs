use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ApiResponse;
use crate::validate::ValidationError;

/// Request-level failures, each mapped to one `{ok, error}` body.
///
/// Validation carries the failing field's message. Persistence keeps the sqlx
/// detail for the logs and shows only the operation's generic retry text; the
/// store layer does not distinguish not-found from transient failure.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{message}")]
    Persistence {
        message: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("未登入或登入已過期。")]
    Unauthorized,
    #[error("找不到該筆預約。")]
    NotFound,
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(ValidationError(msg.into()))
    }

    /// `map_err` adapter attaching an operation-specific user message.
    pub fn persistence(message: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Persistence { message, source }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(source: sqlx::Error) -> Self {
        Self::Persistence {
            message: "發生無法預期的錯誤，請稍後再試或聯絡管理員。",
            source,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Persistence { source, .. } = &self {
            tracing::error!("persistence error: {}", source);
        }
        (
            self.status(),
            Json(ApiResponse::<()>::error(self.to_string())),
        )
            .into_response()
    }
}
