//! SQLite database for tracked channel records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shoutout_core::StreamRecord;
use shoutout_engine::{RecordStore, StoreError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Database connection for tracked channels.
#[derive(Clone)]
pub struct StreamDb {
    pool: SqlitePool,
}

/// Row shape of `stream_records`. Timestamps are RFC 3339 text, tag ids a
/// JSON array.
type RecordRow = (
    String,
    String,
    bool,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn row_to_record(row: RecordRow) -> StreamRecord {
    let (channel_id, channel_name, is_live, last_shoutout_at, offline_since, title, game_id, tags) =
        row;
    StreamRecord {
        channel_id: channel_id.into(),
        channel_name: channel_name.into(),
        is_live,
        last_shoutout_at: parse_timestamp(last_shoutout_at),
        offline_since: parse_timestamp(offline_since),
        title,
        game_id: game_id.map(Into::into),
        tag_ids: serde_json::from_str(&tags).unwrap_or_default(),
    }
}

const RECORD_COLUMNS: &str =
    "channel_id, channel_name, is_live, last_shoutout_at, offline_since, title, game_id, tag_ids";

impl StreamDb {
    /// Connect to the SQLite database at the given path.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stream_records (
                channel_id TEXT PRIMARY KEY,
                channel_name TEXT NOT NULL,
                is_live INTEGER NOT NULL DEFAULT 0,
                last_shoutout_at TEXT,
                offline_since TEXT,
                title TEXT,
                game_id TEXT,
                tag_ids TEXT NOT NULL DEFAULT '[]',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_live_channels
            ON stream_records(is_live)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch one record by channel id.
    pub async fn get_record(&self, channel_id: &str) -> Result<Option<StreamRecord>, DbError> {
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM stream_records WHERE channel_id = ?"
        ))
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_record))
    }

    /// Fetch all tracked records.
    pub async fn get_all_records(&self) -> Result<Vec<StreamRecord>, DbError> {
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM stream_records"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    /// Fetch records currently persisted as live.
    pub async fn get_live_records(&self) -> Result<Vec<StreamRecord>, DbError> {
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM stream_records WHERE is_live = 1"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    /// Insert a newly tracked channel.
    pub async fn insert_record(&self, record: &StreamRecord) -> Result<(), DbError> {
        let tags_json = serde_json::to_string(&record.tag_ids).unwrap_or_default();

        sqlx::query(
            r#"
            INSERT INTO stream_records
                (channel_id, channel_name, is_live, last_shoutout_at, offline_since, title, game_id, tag_ids)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.channel_id.as_str())
        .bind(record.channel_name.as_str())
        .bind(record.is_live)
        .bind(record.last_shoutout_at.map(|at| at.to_rfc3339()))
        .bind(record.offline_since.map(|at| at.to_rfc3339()))
        .bind(&record.title)
        .bind(record.game_id.as_ref().map(|id| id.as_str()))
        .bind(&tags_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Rewrite an existing record, keyed by channel id.
    pub async fn update_record(&self, record: &StreamRecord) -> Result<(), DbError> {
        let tags_json = serde_json::to_string(&record.tag_ids).unwrap_or_default();

        sqlx::query(
            r#"
            UPDATE stream_records
            SET channel_name = ?, is_live = ?, last_shoutout_at = ?, offline_since = ?,
                title = ?, game_id = ?, tag_ids = ?
            WHERE channel_id = ?
            "#,
        )
        .bind(record.channel_name.as_str())
        .bind(record.is_live)
        .bind(record.last_shoutout_at.map(|at| at.to_rfc3339()))
        .bind(record.offline_since.map(|at| at.to_rfc3339()))
        .bind(&record.title)
        .bind(record.game_id.as_ref().map(|id| id.as_str()))
        .bind(&tags_json)
        .bind(record.channel_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl RecordStore for StreamDb {
    async fn get(&self, channel_id: &str) -> Result<Option<StreamRecord>, StoreError> {
        self.get_record(channel_id)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn get_all(&self) -> Result<Vec<StreamRecord>, StoreError> {
        self.get_all_records()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn get_live(&self) -> Result<Vec<StreamRecord>, StoreError> {
        self.get_live_records()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn insert(&self, record: &StreamRecord) -> Result<(), StoreError> {
        self.insert_record(record)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn update(&self, record: &StreamRecord) -> Result<(), StoreError> {
        self.update_record(record)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}
