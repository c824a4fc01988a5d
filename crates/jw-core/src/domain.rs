use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// A selectable category from the source's category index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// Experience filter. `id` is the query parameter value; the empty id is the
/// "any experience" sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExperienceFilter {
    pub id: &'static str,
    pub label: &'static str,
}

impl ExperienceFilter {
    pub fn is_any(&self) -> bool {
        self.id.is_empty()
    }
}

/// Identity of a partition: (category id, filter id in display form).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey {
    pub category_id: String,
    pub filter_id: String,
}

impl PartitionKey {
    pub fn new(category_id: impl Into<String>, filter_id: impl Into<String>) -> Self {
        Self {
            category_id: category_id.into(),
            filter_id: filter_id.into(),
        }
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let filter = if self.filter_id.is_empty() {
            "any"
        } else {
            self.filter_id.as_str()
        };
        write!(f, "{}[{}]", self.category_id, filter)
    }
}

/// One independently polled unit of the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    pub category: Category,
    pub filter: ExperienceFilter,
    pub url: String,
}

impl Partition {
    pub fn key(&self) -> PartitionKey {
        PartitionKey::new(self.category.id.clone(), self.filter.id)
    }
}

/// An item as returned by the feed, publish time still unparsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub published: String,
}

/// A novel item travelling from the detector to the dispatcher.
///
/// Carries a denormalized copy of its partition so consumers need no catalog lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewItem {
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub category_id: String,
    pub category_name: String,
    pub filter_id: String,
    pub filter_label: String,
}

impl NewItem {
    pub fn partition_key(&self) -> PartitionKey {
        PartitionKey::new(self.category_id.clone(), self.filter_id.clone())
    }
}

/// A subscriber's opt-in to one partition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEntry {
    pub category_id: String,
    pub category_name: String,
    /// Display form (empty = any experience); persisted as "all".
    #[serde(rename = "experience", with = "crate::store::db_filter_id")]
    pub filter_id: String,
    pub subscribed_at: DateTime<Utc>,
}

impl SubscriptionEntry {
    pub fn partition_key(&self) -> PartitionKey {
        PartitionKey::new(self.category_id.clone(), self.filter_id.clone())
    }
}

/// Everything known about one subscriber.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionEntry>,
}

impl SubscriptionRecord {
    pub fn holds(&self, key: &PartitionKey) -> bool {
        self.subscriptions.iter().any(|s| &s.partition_key() == key)
    }
}
