use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use services::services::daily_tasks::DailyTaskError;
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    DailyTask(#[from] DailyTaskError),
    #[error("invalid date key: {0}")]
    InvalidDateKey(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidDateKey(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::DailyTask(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            ResponseJson(ApiResponse::<()>::error(self.to_string())),
        )
            .into_response()
    }
}
