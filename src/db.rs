use crate::error::StoreError;
use crate::models::{ContentType, LearnerKey, ProgressItem};
use crate::store::ProgressStore;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous},
    ConnectOptions, Pool, Row, Sqlite,
};
use std::str::FromStr;

impl<'r> sqlx::FromRow<'r, SqliteRow> for ProgressItem {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let content_type: String = row.try_get("content_type")?;
        let content_type = ContentType::from_str(&content_type).map_err(|e| sqlx::Error::ColumnDecode {
            index: "content_type".to_string(),
            source: Box::new(e),
        })?;

        let mastery_level: i64 = row.try_get("mastery_level")?;
        let repetitions: i64 = row.try_get("repetitions")?;
        let review_count: i64 = row.try_get("review_count")?;
        let last_reviewed: Option<DateTime<Utc>> = row.try_get("last_reviewed")?;
        let next_review: Option<DateTime<Utc>> = row.try_get("next_review")?;

        Ok(ProgressItem {
            content_type,
            content_id: row.try_get("content_id")?,
            mastery_level: mastery_level.clamp(0, 5) as u8,
            ease_factor: row.try_get("ease_factor")?,
            interval: row.try_get("interval")?,
            repetitions: repetitions.max(0) as u32,
            last_reviewed,
            next_review,
            review_count: review_count.max(0) as u64,
        })
    }
}

/// SQLite-backed [`ProgressStore`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .log_statements(log::LevelFilter::Trace);

        // A single connection keeps `sqlite::memory:` databases shared.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = SqliteStore { pool };
        store.migrate().await?;
        log::info!("progress database ready at {}", url);
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_progress (
                learner TEXT NOT NULL,
                content_type TEXT NOT NULL,
                content_id TEXT NOT NULL,
                mastery_level INTEGER NOT NULL DEFAULT 0,
                ease_factor REAL NOT NULL DEFAULT 2.5,
                interval INTEGER NOT NULL DEFAULT 1,
                repetitions INTEGER NOT NULL DEFAULT 0,
                last_reviewed DATETIME,
                next_review DATETIME,
                review_count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (learner, content_type, content_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_user_progress_next_review ON user_progress (learner, next_review)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

impl ProgressStore for SqliteStore {
    async fn get(
        &self,
        learner: &LearnerKey,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<Option<ProgressItem>, StoreError> {
        let item = sqlx::query_as::<_, ProgressItem>(
            "SELECT * FROM user_progress WHERE learner = ? AND content_type = ? AND content_id = ?",
        )
        .bind(learner.to_string())
        .bind(content_type.as_str())
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn upsert(&self, learner: &LearnerKey, item: &ProgressItem) -> Result<(), StoreError> {
        log::debug!("sqlite upsert {} {}:{}", learner, item.content_type, item.content_id);
        sqlx::query(
            r#"
            INSERT INTO user_progress (
                learner, content_type, content_id, mastery_level, ease_factor,
                interval, repetitions, last_reviewed, next_review, review_count
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (learner, content_type, content_id) DO UPDATE SET
                mastery_level = excluded.mastery_level,
                ease_factor = excluded.ease_factor,
                interval = excluded.interval,
                repetitions = excluded.repetitions,
                last_reviewed = excluded.last_reviewed,
                next_review = excluded.next_review,
                review_count = excluded.review_count
            "#,
        )
        .bind(learner.to_string())
        .bind(item.content_type.as_str())
        .bind(&item.content_id)
        .bind(item.mastery_level as i64)
        .bind(item.ease_factor)
        .bind(item.interval)
        .bind(item.repetitions as i64)
        .bind(item.last_reviewed)
        .bind(item.next_review)
        .bind(item.review_count as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(
        &self,
        learner: &LearnerKey,
        content_type: Option<ContentType>,
    ) -> Result<Vec<ProgressItem>, StoreError> {
        let items = match content_type {
            Some(content_type) => {
                sqlx::query_as::<_, ProgressItem>(
                    "SELECT * FROM user_progress WHERE learner = ? AND content_type = ? ORDER BY content_id",
                )
                .bind(learner.to_string())
                .bind(content_type.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ProgressItem>(
                    "SELECT * FROM user_progress WHERE learner = ? ORDER BY content_type, content_id",
                )
                .bind(learner.to_string())
                .fetch_all(&self.pool)
                .await?
            }
        };
        log::debug!("sqlite list {} -> {} rows", learner, items.len());
        Ok(items)
    }

    async fn remove(
        &self,
        learner: &LearnerKey,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM user_progress WHERE learner = ? AND content_type = ? AND content_id = ?",
        )
        .bind(learner.to_string())
        .bind(content_type.as_str())
        .bind(content_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
