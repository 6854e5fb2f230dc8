use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Outcome of one generation invocation.
#[derive(Debug, Clone, Type, Serialize, Deserialize, PartialEq, EnumString, Display)]
#[sqlx(type_name = "generation_outcome", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenerationOutcome {
    Created,
    AlreadyExists,
    Failed,
}

/// Audit log entry for a generation run.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GenerationRun {
    pub id: Uuid,
    pub date_key: String,
    pub outcome: GenerationOutcome,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GenerationRun {
    pub async fn create(
        pool: &SqlitePool,
        date_key: &str,
        outcome: GenerationOutcome,
        detail: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, Self>(
            r#"INSERT INTO generation_runs (id, date_key, outcome, detail)
               VALUES ($1, $2, $3, $4)
               RETURNING id, date_key, outcome, detail, created_at"#,
        )
        .bind(id)
        .bind(date_key)
        .bind(outcome)
        .bind(detail)
        .fetch_one(pool)
        .await
    }

    pub async fn find_latest(pool: &SqlitePool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"SELECT id, date_key, outcome, detail, created_at
               FROM generation_runs
               ORDER BY created_at DESC, rowid DESC
               LIMIT 1"#,
        )
        .fetch_optional(pool)
        .await
    }

    pub async fn find_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"SELECT id, date_key, outcome, detail, created_at
               FROM generation_runs
               ORDER BY created_at DESC, rowid DESC
               LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    #[tokio::test]
    async fn create_and_find_latest() {
        let db = DBService::new_in_memory().await.unwrap();

        GenerationRun::create(&db.pool, "2025-07-11", GenerationOutcome::Created, None)
            .await
            .unwrap();
        let latest = GenerationRun::create(
            &db.pool,
            "2025-07-12",
            GenerationOutcome::Failed,
            Some("network error".to_string()),
        )
        .await
        .unwrap();

        let found = GenerationRun::find_latest(&db.pool).await.unwrap().unwrap();
        assert_eq!(found.id, latest.id);
        assert_eq!(found.outcome, GenerationOutcome::Failed);
        assert_eq!(found.detail.as_deref(), Some("network error"));

        let recent = GenerationRun::find_recent(&db.pool, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
    }
}
