// ============================================================================
// Message Store
// ============================================================================
//
// Abstract keyed collection of messages. Two backends:
// - postgres.rs: sqlx / PostgreSQL
// - memory.rs: process-local, used when no DATABASE_URL is configured and in tests
//
// Each operation is atomic on its own; nothing here spans operations.
// ============================================================================

mod memory;
mod postgres;

pub use memory::InMemoryMessageStore;
pub use postgres::PostgresMessageStore;

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::message::Message;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("message not found")]
    NotFound,

    #[error("invalid message id: {0}")]
    InvalidId(String),

    /// The operation's deadline passed and the in-flight call was dropped
    #[error("store operation cancelled after {0:?}")]
    Cancelled(Duration),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Parse a message identifier under the store's identifier scheme (UUID)
pub fn parse_id(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw.trim()).map_err(|_| StoreError::InvalidId(raw.to_string()))
}

/// Storage interface for messages
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message
    async fn insert(&self, message: &Message) -> Result<(), StoreError>;

    /// Find a message by identifier
    async fn find(&self, id: Uuid) -> Result<Option<Message>, StoreError>;

    /// Page of messages, most recent first
    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<Message>, StoreError>;

    /// Number of stored messages
    async fn count(&self) -> Result<u64, StoreError>;

    /// Delete a message. Returns false if nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Check the backend is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert!(matches!(parse_id("507f1f77bcf86cd799439011"), Err(StoreError::InvalidId(_))));
        assert!(matches!(parse_id(""), Err(StoreError::InvalidId(_))));
    }
}
