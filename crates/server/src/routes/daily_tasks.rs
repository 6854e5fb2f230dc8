//! Routes for daily task sets and the generation pipeline.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use chrono::{DateTime, NaiveDate, Utc};
use db::models::{
    daily_task_set::{DailyTask, DailyTaskSet},
    generation_run::GenerationRun,
};
use serde::{Deserialize, Serialize};
use services::services::daily_tasks::{DailyTaskService, today_date_key};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// A stored task set with its tasks deserialized for the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyTaskSetResponse {
    pub date_key: String,
    pub tasks: Vec<DailyTask>,
    pub created_at: DateTime<Utc>,
}

impl From<DailyTaskSet> for DailyTaskSetResponse {
    fn from(set: DailyTaskSet) -> Self {
        let tasks = set.parsed_tasks().unwrap_or_default();
        Self {
            date_key: set.date_key,
            tasks,
            created_at: set.created_at,
        }
    }
}

/// GET /api/daily-tasks/today
pub async fn get_today(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Option<DailyTaskSetResponse>>>, ApiError> {
    let set = DailyTaskSet::find_by_date_key(&state.db.pool, &today_date_key()).await?;
    Ok(ResponseJson(ApiResponse::success(set.map(Into::into))))
}

/// GET /api/daily-tasks/{date_key}
pub async fn get_by_date(
    State(state): State<AppState>,
    Path(date_key): Path<String>,
) -> Result<ResponseJson<ApiResponse<Option<DailyTaskSetResponse>>>, ApiError> {
    if NaiveDate::parse_from_str(&date_key, "%Y-%m-%d").is_err() {
        return Err(ApiError::InvalidDateKey(date_key));
    }

    let set = DailyTaskSet::find_by_date_key(&state.db.pool, &date_key).await?;
    Ok(ResponseJson(ApiResponse::success(set.map(Into::into))))
}

/// POST /api/daily-tasks/generate
/// Manually trigger the Check → Generate → Persist pipeline for today
pub async fn trigger_generation(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<GenerationRun>>, ApiError> {
    let run = DailyTaskService::trigger(&state.db.pool, &state.gemini).await?;
    Ok(ResponseJson(ApiResponse::success(run)))
}

/// GET /api/daily-tasks/status
/// Most recent generation run
pub async fn get_status(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Option<GenerationRun>>>, ApiError> {
    let latest = GenerationRun::find_latest(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(latest)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/daily-tasks",
        Router::new()
            .route("/today", get(get_today))
            .route("/status", get(get_status))
            .route("/generate", post(trigger_generation))
            .route("/{date_key}", get(get_by_date)),
    )
}
