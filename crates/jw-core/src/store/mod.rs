//! Subscription store port and its implementations.
//!
//! Watermarks and subscriber records share one document model; the backends
//! only differ in where that document lives.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    catalog::filter_id_for_db,
    domain::{ChatId, Partition, PartitionKey, SubscriptionEntry, SubscriptionRecord, UserId},
    errors::Error,
    Result,
};

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Last-checked instant of a partition. Absent (or unreadable) means "now".
    async fn get_watermark(&self, partition: &Partition) -> DateTime<Utc>;

    async fn set_watermark(&self, partition: &Partition, at: DateTime<Utc>) -> Result<()>;

    /// Returns `false` when the subscriber already holds this partition.
    async fn subscribe(
        &self,
        partition: &Partition,
        user_id: UserId,
        chat_id: ChatId,
        display_name: &str,
    ) -> Result<bool>;

    /// Remove the subscriber's entry for the category with this display name.
    /// Returns `false` when no such entry exists.
    async fn unsubscribe(&self, category_name: &str, user_id: UserId) -> Result<bool>;

    /// `Error::NotFound` when the subscriber has never subscribed.
    async fn get_subscription(&self, user_id: UserId) -> Result<SubscriptionRecord>;

    async fn list_subscribers(&self, key: &PartitionKey) -> Result<Vec<SubscriptionRecord>>;
}

/// Serde adapter persisting filter ids in their stored form ("all" for any).
pub(crate) mod db_filter_id {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::catalog::{filter_id_for_db, filter_id_for_display};

    pub fn serialize<S: Serializer>(id: &str, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&filter_id_for_db(id))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(filter_id_for_display(&raw))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatermarkDoc {
    id_category: String,
    name_category: String,
    experience: String,
    last_time_checked: DateTime<Utc>,
}

/// Whole persisted state.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct StoreDocument {
    #[serde(default)]
    categories: Vec<WatermarkDoc>,
    #[serde(default)]
    subscriptions: Vec<SubscriptionRecord>,
}

impl StoreDocument {
    fn watermark_matches(doc: &WatermarkDoc, key: &PartitionKey) -> bool {
        doc.id_category == key.category_id && doc.experience == filter_id_for_db(&key.filter_id)
    }

    pub(crate) fn watermark(&self, key: &PartitionKey) -> Option<DateTime<Utc>> {
        self.categories
            .iter()
            .find(|d| Self::watermark_matches(d, key))
            .map(|d| d.last_time_checked)
    }

    pub(crate) fn clear_watermark(&mut self, key: &PartitionKey) {
        self.categories.retain(|d| !Self::watermark_matches(d, key));
    }

    pub(crate) fn set_watermark(&mut self, partition: &Partition, at: DateTime<Utc>) {
        let key = partition.key();
        match self
            .categories
            .iter_mut()
            .find(|d| Self::watermark_matches(d, &key))
        {
            Some(doc) => {
                doc.name_category = partition.category.name.clone();
                doc.last_time_checked = at;
            }
            None => self.categories.push(WatermarkDoc {
                id_category: key.category_id.clone(),
                name_category: partition.category.name.clone(),
                experience: filter_id_for_db(&key.filter_id),
                last_time_checked: at,
            }),
        }
    }

    pub(crate) fn subscribe(
        &mut self,
        partition: &Partition,
        user_id: UserId,
        chat_id: ChatId,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let entry = SubscriptionEntry {
            category_id: partition.category.id.clone(),
            category_name: partition.category.name.clone(),
            filter_id: partition.filter.id.to_string(),
            subscribed_at: now,
        };

        let Some(record) = self.subscriptions.iter_mut().find(|r| r.user_id == user_id) else {
            self.subscriptions.push(SubscriptionRecord {
                user_id,
                chat_id,
                display_name: display_name.to_string(),
                created_at: now,
                subscriptions: vec![entry],
            });
            return true;
        };

        record.chat_id = chat_id;
        record.display_name = display_name.to_string();
        if record.holds(&partition.key()) {
            return false;
        }
        record.subscriptions.push(entry);
        true
    }

    pub(crate) fn unsubscribe(&mut self, category_name: &str, user_id: UserId) -> bool {
        let Some(record) = self.subscriptions.iter_mut().find(|r| r.user_id == user_id) else {
            return false;
        };
        let Some(idx) = record
            .subscriptions
            .iter()
            .position(|s| s.category_name == category_name)
        else {
            return false;
        };
        record.subscriptions.remove(idx);
        true
    }

    pub(crate) fn subscription(&self, user_id: UserId) -> Result<SubscriptionRecord> {
        self.subscriptions
            .iter()
            .find(|r| r.user_id == user_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("subscriber {}", user_id.0)))
    }

    pub(crate) fn subscribers(&self, key: &PartitionKey) -> Vec<SubscriptionRecord> {
        self.subscriptions
            .iter()
            .filter(|r| r.holds(key))
            .cloned()
            .collect()
    }
}
