//! Fakes and fixtures shared by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::{
    catalog::PartitionCatalog,
    config::Config,
    context::AppContext,
    detector::WatermarkPolicy,
    domain::{Category, ChatId, MessageId, MessageRef, Partition, RawItem, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ChatAction, InboundMessage, ReplyMenu},
    },
    ports::FeedFetcher,
    store::MemoryStore,
    Result,
};

pub const FEED_URL: &str = "https://jobs.dou.ua/vacancies/feeds/";

pub fn catalog(names: &[&str]) -> PartitionCatalog {
    let categories = names
        .iter()
        .map(|n| Category {
            id: n.to_string(),
            name: n.to_string(),
        })
        .collect();
    PartitionCatalog::from_categories(categories, FEED_URL).unwrap()
}

pub fn partition(category: &str, filter_idx: usize) -> Partition {
    let cat = catalog(&[category]);
    cat.partitions()[filter_idx].clone()
}

/// RFC 1123 with numeric zone, as the feed writes `pubDate`.
pub fn rfc2822(t: DateTime<Utc>) -> String {
    t.to_rfc2822()
}

/// A whole-second instant, so it survives a trip through `rfc2822`.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap()
}

pub fn test_config() -> Config {
    Config {
        telegram_bot_token: "test-token".to_string(),
        store_path: PathBuf::from("/tmp/jobwatch-test.json"),
        categories_url: "https://jobs.dou.ua/vacancies/".to_string(),
        feed_url: FEED_URL.to_string(),
        user_agent: "jobwatch-test".to_string(),
        fetch_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_secs(600),
        partition_pacing: Duration::from_secs(5),
        watermark_policy: WatermarkPolicy::BeforeFetch,
        event_channel_capacity: 1,
        delivery_pacing: Duration::from_millis(100),
        delivery_session_ttl: Duration::from_secs(10),
        session_ttl: Duration::from_secs(600),
        flood_window: 3,
        flood_min_gap: Duration::from_millis(700),
    }
}

/// Context over a fresh in-memory store and the given categories.
pub fn context(categories: &[&str], messenger: Arc<FakeMessenger>) -> AppContext {
    AppContext {
        cfg: Arc::new(test_config()),
        catalog: Arc::new(catalog(categories)),
        store: Arc::new(MemoryStore::new()),
        messenger,
    }
}

/// Text message from user `chat` in their private chat.
pub fn inbound(chat: i64, message_id: i32, text: &str) -> InboundMessage {
    InboundMessage {
        chat_id: ChatId(chat),
        user_id: UserId(chat),
        username: Some(format!("u{chat}")),
        message_id: MessageId(message_id),
        text: text.to_string(),
        received_at: tokio::time::Instant::now(),
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    categories: Mutex<Vec<Category>>,
    items: Mutex<HashMap<String, Vec<RawItem>>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn set_categories(&self, categories: Vec<Category>) {
        *self.categories.lock().unwrap() = categories;
    }

    pub fn set_items(&self, url: &str, items: Vec<RawItem>) {
        self.items.lock().unwrap().insert(url.to_string(), items);
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    /// URLs fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedFetcher for FakeFetcher {
    async fn fetch_categories(&self, index_url: &str) -> Result<Vec<Category>> {
        if self.failing.lock().unwrap().contains(index_url) {
            return Err(Error::Fetch(format!("{index_url}: connection refused")));
        }
        Ok(self.categories.lock().unwrap().clone())
    }

    async fn fetch_items(&self, url: &str) -> Result<Vec<RawItem>> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.failing.lock().unwrap().contains(url) {
            return Err(Error::Fetch(format!("{url}: connection refused")));
        }
        Ok(self.items.lock().unwrap().get(url).cloned().unwrap_or_default())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Ok,
    NotFound,
    Fail,
}

#[derive(Clone, Debug)]
pub struct Sent {
    pub chat_id: ChatId,
    pub html: String,
    pub menu: Option<ReplyMenu>,
}

/// Records outbound traffic. Sent messages get ids from 1000 up so they never
/// collide with the inbound ids tests use.
#[derive(Default)]
pub struct FakeMessenger {
    next_id: Mutex<i32>,
    sent: Mutex<Vec<Sent>>,
    failing_chats: Mutex<HashSet<i64>>,
    delete_outcomes: Mutex<HashMap<i32, DeleteOutcome>>,
    deleted: Mutex<Vec<MessageId>>,
    actions: Mutex<Vec<(ChatId, ChatAction)>>,
}

impl FakeMessenger {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_html(&self) -> Vec<String> {
        self.sent().into_iter().map(|s| s.html).collect()
    }

    pub fn sent_to(&self, chat_id: ChatId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|s| s.chat_id == chat_id)
            .map(|s| s.html)
            .collect()
    }

    pub fn fail_sends_to(&self, chat_id: ChatId) {
        self.failing_chats.lock().unwrap().insert(chat_id.0);
    }

    pub fn on_delete(&self, id: MessageId, outcome: DeleteOutcome) {
        self.delete_outcomes.lock().unwrap().insert(id.0, outcome);
    }

    /// Successfully deleted ids, in order.
    pub fn deleted(&self) -> Vec<MessageId> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<(ChatId, ChatAction)> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_html(
        &self,
        chat_id: ChatId,
        html: &str,
        menu: Option<ReplyMenu>,
    ) -> Result<MessageRef> {
        if self.failing_chats.lock().unwrap().contains(&chat_id.0) {
            return Err(Error::External(format!("chat {} blocked the bot", chat_id.0)));
        }
        self.sent.lock().unwrap().push(Sent {
            chat_id,
            html: html.to_string(),
            menu,
        });
        let mut next = self.next_id.lock().unwrap();
        let id = 1000 + *next;
        *next += 1;
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(id),
        })
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        let outcome = self
            .delete_outcomes
            .lock()
            .unwrap()
            .get(&msg.message_id.0)
            .copied()
            .unwrap_or(DeleteOutcome::Ok);
        match outcome {
            DeleteOutcome::Ok => {
                self.deleted.lock().unwrap().push(msg.message_id);
                Ok(())
            }
            DeleteOutcome::NotFound => Err(Error::NotFound(format!(
                "message {}",
                msg.message_id.0
            ))),
            DeleteOutcome::Fail => Err(Error::External("telegram unavailable".to_string())),
        }
    }

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()> {
        self.actions.lock().unwrap().push((chat_id, action));
        Ok(())
    }
}

