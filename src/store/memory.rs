use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MessageStore, StoreError};
use crate::message::Message;

/// Recency index key: newest first, ties by descending id (same as the SQL ORDER BY)
type OrderKey = (Reverse<DateTime<Utc>>, Reverse<Uuid>);

#[derive(Default)]
struct Inner {
    by_id: HashMap<Uuid, Message>,
    order: BTreeSet<OrderKey>,
}

/// In-process message store.
///
/// Every mutation happens under a single write-lock acquisition, so a caller
/// dropped while waiting for the lock leaves no trace.
#[derive(Default)]
pub struct InMemoryMessageStore {
    inner: RwLock<Inner>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn insert(&self, message: &Message) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(previous) = inner.by_id.insert(message.id, message.clone()) {
            inner.order.remove(&(Reverse(previous.timestamp), Reverse(previous.id)));
        }
        inner.order.insert((Reverse(message.timestamp), Reverse(message.id)));
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Message>, StoreError> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<Message>, StoreError> {
        let inner = self.inner.read().await;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        Ok(inner
            .order
            .iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(_, Reverse(id))| inner.by_id.get(id).cloned())
            .collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.inner.read().await.by_id.len() as u64)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.by_id.remove(&id) {
            Some(message) => {
                inner.order.remove(&(Reverse(message.timestamp), Reverse(message.id)));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
