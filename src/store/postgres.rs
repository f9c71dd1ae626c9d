use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use super::{MessageStore, StoreError};
use crate::config::DatabaseConfig;
use crate::message::{Message, MessageMetadata, MessageType, Priority};

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    content: String,
    sender_id: String,
    created_at: DateTime<Utc>,
    read_status: bool,
    message_type: String,
    priority: String,
    tags: Vec<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let message_type = row
            .message_type
            .parse::<MessageType>()
            .map_err(|e: String| StoreError::Corrupt(format!("message {}: {}", row.id, e)))?;
        let priority = row
            .priority
            .parse::<Priority>()
            .map_err(|e: String| StoreError::Corrupt(format!("message {}: {}", row.id, e)))?;

        Ok(Message {
            id: row.id,
            content: row.content,
            sender_id: row.sender_id,
            timestamp: row.created_at,
            metadata: MessageMetadata {
                read_status: row.read_status,
                message_type,
                priority,
                tags: row.tags,
                ip_address: row.ip_address,
                user_agent: row.user_agent,
            },
        })
    }
}

/// PostgreSQL implementation of MessageStore
pub struct PostgresMessageStore {
    pool: PgPool,
    table: String,
}

impl PostgresMessageStore {
    /// `table` must already be a validated SQL identifier.
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .context("DATABASE_URL is required for the Postgres store")?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(url)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool, config.table.clone()))
    }

    /// Create the table and its indexes if they do not exist yet
    pub async fn ensure_schema(&self) -> Result<()> {
        let t = &self.table;
        let statements = [
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {t} (
                    id           UUID PRIMARY KEY,
                    content      TEXT NOT NULL CHECK (char_length(content) BETWEEN 1 AND 2000),
                    sender_id    TEXT NOT NULL,
                    created_at   TIMESTAMPTZ NOT NULL,
                    read_status  BOOLEAN NOT NULL DEFAULT FALSE,
                    message_type TEXT NOT NULL CHECK (message_type IN ('text', 'image', 'file')),
                    priority     TEXT NOT NULL DEFAULT 'normal' CHECK (priority IN ('low', 'normal', 'high')),
                    tags         TEXT[] NOT NULL DEFAULT '{{}}',
                    ip_address   TEXT,
                    user_agent   TEXT
                )
                "#
            ),
            format!("CREATE INDEX IF NOT EXISTS {t}_created_at_idx ON {t} (created_at DESC, id)"),
            format!("CREATE INDEX IF NOT EXISTS {t}_sender_id_idx ON {t} (sender_id)"),
            format!("CREATE INDEX IF NOT EXISTS {t}_message_type_idx ON {t} (message_type)"),
        ];

        for statement in &statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to prepare table '{}'", t))?;
        }

        tracing::info!(table = %t, "Message table ready");
        Ok(())
    }
}

const COLUMNS: &str = "id, content, sender_id, created_at, read_status, message_type, priority, tags, ip_address, user_agent";

#[async_trait::async_trait]
impl MessageStore for PostgresMessageStore {
    async fn insert(&self, message: &Message) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            self.table, COLUMNS
        );
        sqlx::query(&sql)
            .bind(message.id)
            .bind(&message.content)
            .bind(&message.sender_id)
            .bind(message.timestamp)
            .bind(message.metadata.read_status)
            .bind(message.metadata.message_type.as_str())
            .bind(message.metadata.priority.as_str())
            .bind(&message.metadata.tags)
            .bind(&message.metadata.ip_address)
            .bind(&message.metadata.user_agent)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Message>, StoreError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", COLUMNS, self.table);
        let row = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Message::try_from).transpose()
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<Message>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
            COLUMNS, self.table
        );
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Message::try_from).collect()
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
