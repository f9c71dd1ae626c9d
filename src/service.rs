// ============================================================================
// Message Service
// ============================================================================
//
// Operations the HTTP handlers call:
// - create: validate, assign id/timestamp, persist
// - get / delete: parse id, NotFound when absent
// - list: coerce page/limit, newest first, independent total
// - anomaly_check: score a stored message
//
// Every store call runs under the configured deadline. When it passes, the
// in-flight future is dropped (which aborts the underlying I/O) and the
// caller receives StoreError::Cancelled. Nothing is retried here.
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::anomaly::AnomalyScore;
use crate::config::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::error::AppResult;
use crate::message::{CreateMessageRequest, Message, MessagePage, RequestProvenance};
use crate::store::{parse_id, MessageStore, StoreError};

pub struct MessageService {
    store: Arc<dyn MessageStore>,
    operation_timeout: Duration,
}

/// Clamp raw pagination input: page below 1 becomes 1, a limit outside
/// [1, MAX_PAGE_LIMIT] (or missing) becomes the default.
pub fn normalize_pagination(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.filter(|p| *p >= 1).unwrap_or(1);
    let limit = limit
        .filter(|l| (1..=MAX_PAGE_LIMIT).contains(l))
        .unwrap_or(DEFAULT_PAGE_LIMIT);
    (page, limit)
}

impl MessageService {
    pub fn new(store: Arc<dyn MessageStore>, operation_timeout: Duration) -> Self {
        Self {
            store,
            operation_timeout,
        }
    }

    async fn with_deadline<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation = operation,
                    timeout_ms = self.operation_timeout.as_millis() as u64,
                    "Store operation timed out"
                );
                Err(StoreError::Cancelled(self.operation_timeout))
            }
        }
    }

    pub async fn create(
        &self,
        request: CreateMessageRequest,
        provenance: RequestProvenance,
    ) -> AppResult<Message> {
        let validated = request.validate()?;
        let message = Message::new(validated, provenance);

        self.with_deadline("insert", self.store.insert(&message))
            .await?;

        tracing::info!(
            message_id = %message.id,
            message_type = %message.metadata.message_type,
            priority = %message.metadata.priority,
            "Message created"
        );
        Ok(message)
    }

    pub async fn get(&self, id: &str) -> AppResult<Message> {
        let id = parse_id(id)?;
        self.with_deadline("find", self.store.find(id))
            .await?
            .ok_or_else(|| StoreError::NotFound.into())
    }

    /// `page` and `limit` are coerced, never rejected.
    pub async fn list(&self, page: Option<i64>, limit: Option<i64>) -> AppResult<MessagePage> {
        let (page, limit) = normalize_pagination(page, limit);
        let offset = (page as u64 - 1).saturating_mul(limit as u64);

        // Counted separately from the slice; may briefly disagree under concurrent writes
        let total = self.with_deadline("count", self.store.count()).await?;
        let messages = self
            .with_deadline("list", self.store.list(offset, limit as u64))
            .await?;

        Ok(MessagePage {
            messages,
            total,
            page,
            limit,
        })
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let id = parse_id(id)?;
        let deleted = self.with_deadline("delete", self.store.delete(id)).await?;
        if !deleted {
            return Err(StoreError::NotFound.into());
        }

        tracing::info!(message_id = %id, "Message deleted");
        Ok(())
    }

    pub async fn anomaly_check(&self, id: &str) -> AppResult<AnomalyScore> {
        let message = self.get(id).await?;
        let score = AnomalyScore::for_message(&message);

        tracing::debug!(
            message_id = %message.id,
            score = score.score,
            is_spam = score.is_spam,
            "Anomaly score computed"
        );
        Ok(score)
    }

    /// Readiness check for the backing store
    pub async fn ping(&self) -> AppResult<()> {
        self.with_deadline("ping", self.store.ping()).await?;
        Ok(())
    }
}
