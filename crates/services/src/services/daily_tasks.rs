//! Background service that generates the daily task set once per calendar day.
//!
//! Every invocation runs the same Check → Generate → Persist sequence: skip
//! if today's set exists, otherwise ask the generation endpoint for
//! candidates, normalize them, and write the set under today's date key. The
//! write is a conditional create, so two racing invocations cannot overwrite
//! each other: the loser observes the conflict and reports success.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use db::{
    DBService,
    models::{
        daily_task_set::{DailyTask, DailyTaskSet},
        generation_run::{GenerationOutcome, GenerationRun},
    },
};
use rand::Rng;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::gemini_api::{GeminiApiClient, GeminiApiError};
use super::task_generator;

const NOMINAL_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
const FLEX_WINDOW: Duration = Duration::from_secs(6 * 60 * 60);
const INITIAL_DELAY: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum DailyTaskError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("gemini api error: {0}")]
    GeminiApi(#[from] GeminiApiError),
    #[error("generation produced no candidates")]
    NoCandidates,
}

impl DailyTaskError {
    /// Returns true if the error is transient and the run should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Database(_) | Self::NoCandidates => true,
            Self::GeminiApi(e) => e.should_retry(),
        }
    }
}

/// Today's calendar date, the idempotency key for generation.
pub fn today_date_key() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Background service that keeps one task set per calendar day.
pub struct DailyTaskService {
    db: DBService,
    gemini: GeminiApiClient,
    nominal_interval: Duration,
    flex_window: Duration,
    initial_delay: Duration,
}

impl DailyTaskService {
    /// Spawn the background daily task service
    pub async fn spawn(db: DBService, gemini: GeminiApiClient) -> tokio::task::JoinHandle<()> {
        let service = Self {
            db,
            gemini,
            nominal_interval: NOMINAL_INTERVAL,
            flex_window: FLEX_WINDOW,
            initial_delay: INITIAL_DELAY,
        };
        tokio::spawn(async move {
            service.start().await;
        })
    }

    async fn start(&self) {
        info!(
            "Starting daily task service with nominal interval {:?} (flex ±{:?}), initial delay {:?}",
            self.nominal_interval, self.flex_window, self.initial_delay
        );

        if std::env::var("GEMINI_API_KEY").is_err() {
            warn!("GEMINI_API_KEY not set - daily task generation will fail");
        }

        // One-shot startup trigger; converges with the periodic schedule
        // because an already-generated day no-ops in the check step.
        self.run_scheduled().await;

        sleep(self.initial_delay).await;
        loop {
            self.run_scheduled().await;
            sleep(self.next_interval()).await;
        }
    }

    /// Nominal interval shifted by a uniform offset inside the flex window.
    fn next_interval(&self) -> Duration {
        let flex = self.flex_window.as_secs() as i64;
        let offset = rand::thread_rng().gen_range(-flex..=flex);
        let secs = (self.nominal_interval.as_secs() as i64 + offset).max(0) as u64;
        Duration::from_secs(secs)
    }

    /// One scheduled run: retry transient failures with exponential backoff,
    /// then record the outcome in the run log.
    async fn run_scheduled(&self) {
        let date_key = today_date_key();

        let result =
            (|| async { Self::check_and_generate(&self.db.pool, &self.gemini, &date_key).await })
                .retry(
                    &ExponentialBuilder::default()
                        .with_min_delay(Duration::from_secs(30))
                        .with_max_delay(Duration::from_secs(30 * 60))
                        .with_max_times(5)
                        .with_jitter(),
                )
                .when(|e: &DailyTaskError| e.should_retry())
                .notify(|e, dur| {
                    warn!(
                        "Daily task generation failed, retrying after {:.0}s: {}",
                        dur.as_secs_f64(),
                        e
                    )
                })
                .await;

        match result {
            Ok(outcome) => {
                info!(date_key = %date_key, outcome = %outcome, "daily task run complete");
                if let Err(e) =
                    GenerationRun::create(&self.db.pool, &date_key, outcome, None).await
                {
                    warn!(error = %e, "failed to record generation run");
                }
            }
            Err(e) => {
                error!(date_key = %date_key, error = %e, "daily task run failed after retries");
                if let Err(log_err) = GenerationRun::create(
                    &self.db.pool,
                    &date_key,
                    GenerationOutcome::Failed,
                    Some(e.to_string()),
                )
                .await
                {
                    warn!(error = %log_err, "failed to record generation run");
                }
            }
        }
    }

    /// Manual one-shot trigger (no retry); records the run and returns it.
    pub async fn trigger(
        pool: &SqlitePool,
        gemini: &GeminiApiClient,
    ) -> Result<GenerationRun, DailyTaskError> {
        let date_key = today_date_key();
        match Self::check_and_generate(pool, gemini, &date_key).await {
            Ok(outcome) => Ok(GenerationRun::create(pool, &date_key, outcome, None).await?),
            Err(e) => {
                if let Err(log_err) = GenerationRun::create(
                    pool,
                    &date_key,
                    GenerationOutcome::Failed,
                    Some(e.to_string()),
                )
                .await
                {
                    warn!(error = %log_err, "failed to record generation run");
                }
                Err(e)
            }
        }
    }

    /// Check → Generate → Persist for one date key.
    ///
    /// The existence check keeps an already-generated day from touching the
    /// generation endpoint at all; the conditional create closes the window
    /// between check and write.
    pub async fn check_and_generate(
        pool: &SqlitePool,
        gemini: &GeminiApiClient,
        date_key: &str,
    ) -> Result<GenerationOutcome, DailyTaskError> {
        if DailyTaskSet::exists(pool, date_key).await? {
            debug!(date_key = %date_key, "task set already exists, skipping generation");
            return Ok(GenerationOutcome::AlreadyExists);
        }

        let response_text = gemini.generate(&task_generator::build_prompt()).await?;
        let candidates = task_generator::parse_candidates(&response_text);
        if candidates.is_empty() {
            return Err(DailyTaskError::NoCandidates);
        }

        let now = Utc::now();
        let tasks: Vec<DailyTask> = candidates
            .into_iter()
            .map(|c| DailyTask::new(c.title, c.total_count, now))
            .collect();

        if DailyTaskSet::create_if_absent(pool, date_key, &tasks).await? {
            info!(date_key = %date_key, task_count = tasks.len(), "created daily task set");
            Ok(GenerationOutcome::Created)
        } else {
            warn!(date_key = %date_key, "lost creation race, another writer persisted this day");
            Ok(GenerationOutcome::AlreadyExists)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> GeminiApiClient {
        // Unroutable address: any request against it errors out, so a passing
        // test proves no request was attempted (or that errors are surfaced).
        GeminiApiClient::new("test-key".to_string(), None)
            .unwrap()
            .with_base_url("http://127.0.0.1:9".to_string())
    }

    #[tokio::test]
    async fn existing_set_short_circuits_without_endpoint_call() {
        let db = DBService::new_in_memory().await.unwrap();
        let date_key = "2025-07-12";
        let tasks = vec![DailyTask::new("Seeded".to_string(), 1, Utc::now())];
        assert!(
            DailyTaskSet::create_if_absent(&db.pool, date_key, &tasks)
                .await
                .unwrap()
        );

        let outcome = DailyTaskService::check_and_generate(&db.pool, &offline_client(), date_key)
            .await
            .unwrap();

        assert_eq!(outcome, GenerationOutcome::AlreadyExists);
        let stored = DailyTaskSet::find_by_date_key(&db.pool, date_key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.parsed_tasks().unwrap(), tasks);
    }

    #[tokio::test]
    async fn trigger_records_failed_run_on_endpoint_error() {
        let db = DBService::new_in_memory().await.unwrap();

        let result = DailyTaskService::trigger(&db.pool, &offline_client()).await;
        assert!(result.is_err());

        let latest = GenerationRun::find_latest(&db.pool).await.unwrap().unwrap();
        assert_eq!(latest.outcome, GenerationOutcome::Failed);
        assert_eq!(latest.date_key, today_date_key());
    }
}
