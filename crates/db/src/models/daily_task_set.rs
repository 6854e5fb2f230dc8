use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

/// Points awarded for completing a daily task.
pub const TASK_POINTS: i64 = 100;

/// How long a task stays open after creation.
const TASK_TTL_HOURS: i64 = 24;

/// A single finalized daily task. Serialized as JSON into the owning set's
/// `tasks` column, so field names follow the client document schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTask {
    pub id: Uuid,
    pub title: String,
    pub total_count: i64,
    pub completed_count: i64,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub points: i64,
}

impl DailyTask {
    pub fn new(title: String, total_count: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            total_count,
            completed_count: 0,
            is_completed: false,
            created_at,
            expires_at: created_at + Duration::hours(TASK_TTL_HOURS),
            points: TASK_POINTS,
        }
    }
}

/// The task set persisted for one calendar day, keyed by `date_key`
/// (`YYYY-MM-DD`). `created_at` is assigned by the database on insert and is
/// distinct from the task timestamps computed at generation time.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DailyTaskSet {
    pub date_key: String,
    pub tasks: String, // JSON-serialized Vec<DailyTask>
    pub created_at: DateTime<Utc>,
}

impl DailyTaskSet {
    /// Parse the `tasks` JSON column into task values.
    pub fn parsed_tasks(&self) -> Option<Vec<DailyTask>> {
        serde_json::from_str(&self.tasks).ok()
    }

    pub async fn exists(pool: &SqlitePool, date_key: &str) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM daily_task_sets WHERE date_key = $1",
        )
        .bind(date_key)
        .fetch_one(pool)
        .await?;

        Ok(count > 0)
    }

    pub async fn find_by_date_key(
        pool: &SqlitePool,
        date_key: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"SELECT date_key, tasks, created_at
               FROM daily_task_sets
               WHERE date_key = $1"#,
        )
        .bind(date_key)
        .fetch_optional(pool)
        .await
    }

    /// Conditional create: a single atomic insert that is a no-op when a set
    /// already exists for `date_key`. Returns whether a row was written, so a
    /// caller that raced another writer can tell it lost.
    pub async fn create_if_absent(
        pool: &SqlitePool,
        date_key: &str,
        tasks: &[DailyTask],
    ) -> Result<bool, sqlx::Error> {
        let json = serde_json::to_string(tasks).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

        let result = sqlx::query(
            r#"INSERT INTO daily_task_sets (date_key, tasks)
               VALUES ($1, $2)
               ON CONFLICT(date_key) DO NOTHING"#,
        )
        .bind(date_key)
        .bind(json)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    fn sample_tasks(now: DateTime<Utc>) -> Vec<DailyTask> {
        vec![
            DailyTask::new("Capture a sunset".to_string(), 1, now),
            DailyTask::new("Photograph your lunch".to_string(), 1, now),
            DailyTask::new("Take three photos of doors".to_string(), 3, now),
        ]
    }

    #[test]
    fn new_task_defaults() {
        let now = Utc::now();
        let task = DailyTask::new("Capture a sunset".to_string(), 2, now);

        assert_eq!(task.total_count, 2);
        assert_eq!(task.completed_count, 0);
        assert!(!task.is_completed);
        assert_eq!(task.points, TASK_POINTS);
        assert_eq!(task.expires_at, now + Duration::hours(24));
    }

    #[tokio::test]
    async fn create_find_roundtrip() {
        let db = DBService::new_in_memory().await.unwrap();
        let now = Utc::now();
        let tasks = sample_tasks(now);

        let created = DailyTaskSet::create_if_absent(&db.pool, "2025-07-12", &tasks)
            .await
            .unwrap();
        assert!(created);

        let set = DailyTaskSet::find_by_date_key(&db.pool, "2025-07-12")
            .await
            .unwrap()
            .expect("set should exist");
        assert_eq!(set.date_key, "2025-07-12");
        assert_eq!(set.parsed_tasks().unwrap(), tasks);
    }

    #[tokio::test]
    async fn create_if_absent_is_idempotent() {
        let db = DBService::new_in_memory().await.unwrap();
        let now = Utc::now();
        let first = sample_tasks(now);

        assert!(
            DailyTaskSet::create_if_absent(&db.pool, "2025-07-12", &first)
                .await
                .unwrap()
        );

        // Second writer loses: no row written, stored tasks unchanged.
        let second = vec![DailyTask::new("Different".to_string(), 1, now)];
        let created = DailyTaskSet::create_if_absent(&db.pool, "2025-07-12", &second)
            .await
            .unwrap();
        assert!(!created);

        let set = DailyTaskSet::find_by_date_key(&db.pool, "2025-07-12")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(set.parsed_tasks().unwrap(), first);
    }

    #[tokio::test]
    async fn exists_reflects_inserts() {
        let db = DBService::new_in_memory().await.unwrap();

        assert!(!DailyTaskSet::exists(&db.pool, "2025-07-12").await.unwrap());

        DailyTaskSet::create_if_absent(&db.pool, "2025-07-12", &sample_tasks(Utc::now()))
            .await
            .unwrap();

        assert!(DailyTaskSet::exists(&db.pool, "2025-07-12").await.unwrap());
        assert!(!DailyTaskSet::exists(&db.pool, "2025-07-13").await.unwrap());
    }
}
