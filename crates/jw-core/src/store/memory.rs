use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    domain::{ChatId, Partition, PartitionKey, SubscriptionRecord, UserId},
    store::{StoreDocument, SubscriptionStore},
    Result,
};

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: Mutex<StoreDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn get_watermark(&self, partition: &Partition) -> DateTime<Utc> {
        self.doc
            .lock()
            .await
            .watermark(&partition.key())
            .unwrap_or_else(Utc::now)
    }

    async fn set_watermark(&self, partition: &Partition, at: DateTime<Utc>) -> Result<()> {
        self.doc.lock().await.set_watermark(partition, at);
        Ok(())
    }

    async fn subscribe(
        &self,
        partition: &Partition,
        user_id: UserId,
        chat_id: ChatId,
        display_name: &str,
    ) -> Result<bool> {
        Ok(self
            .doc
            .lock()
            .await
            .subscribe(partition, user_id, chat_id, display_name, Utc::now()))
    }

    async fn unsubscribe(&self, category_name: &str, user_id: UserId) -> Result<bool> {
        Ok(self.doc.lock().await.unsubscribe(category_name, user_id))
    }

    async fn get_subscription(&self, user_id: UserId) -> Result<SubscriptionRecord> {
        self.doc.lock().await.subscription(user_id)
    }

    async fn list_subscribers(&self, key: &PartitionKey) -> Result<Vec<SubscriptionRecord>> {
        Ok(self.doc.lock().await.subscribers(key))
    }
}
