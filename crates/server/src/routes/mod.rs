pub mod daily_tasks;
pub mod health;

use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(daily_tasks::router())
        .merge(health::router())
}
