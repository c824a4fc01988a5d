//! Watermark-based change detection for one partition.

use std::{str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
    domain::{NewItem, Partition, RawItem},
    errors::Error,
    events::ItemSender,
    ports::FeedFetcher,
    store::SubscriptionStore,
    Result,
};

const TRACKING_SUFFIX: &str = "?utm_source=jobsrss";

/// When the fresh watermark is written relative to the fetch.
///
/// `BeforeFetch` loses items published during a crash window but never
/// re-delivers; `AfterFetch` never loses them but may deliver twice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WatermarkPolicy {
    #[default]
    BeforeFetch,
    AfterFetch,
}

impl FromStr for WatermarkPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "before-fetch" | "before" => Ok(Self::BeforeFetch),
            "after-fetch" | "after" => Ok(Self::AfterFetch),
            other => Err(Error::Config(format!("unknown watermark policy: {other}"))),
        }
    }
}

/// Parse a feed publish timestamp (RFC 2822, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`).
pub fn parse_published(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("bad publish time {raw:?}: {e}")))
}

pub fn clean_link(link: &str) -> String {
    link.trim().replace(TRACKING_SUFFIX, "")
}

/// Items strictly newer than `watermark`, in fetch order.
///
/// Items whose publish time cannot be parsed are skipped individually.
pub fn detect(partition: &Partition, watermark: DateTime<Utc>, items: Vec<RawItem>) -> Vec<NewItem> {
    let mut fresh = Vec::new();
    for raw in items {
        let published_at = match parse_published(&raw.published) {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping item {:?} in {}: {e}", raw.title, partition.key());
                continue;
            }
        };

        if published_at - watermark <= chrono::Duration::zero() {
            continue;
        }

        fresh.push(NewItem {
            title: raw.title.trim().to_string(),
            link: clean_link(&raw.link),
            published_at,
            category_id: partition.category.id.clone(),
            category_name: partition.category.name.clone(),
            filter_id: partition.filter.id.to_string(),
            filter_label: partition.filter.label.to_string(),
        });
    }
    fresh
}

/// Polls single partitions: advances the watermark, fetches, and emits novel items.
#[derive(Clone)]
pub struct ChangeDetector {
    store: Arc<dyn SubscriptionStore>,
    fetcher: Arc<dyn FeedFetcher>,
    events: ItemSender,
    policy: WatermarkPolicy,
}

impl ChangeDetector {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        fetcher: Arc<dyn FeedFetcher>,
        events: ItemSender,
        policy: WatermarkPolicy,
    ) -> Self {
        Self {
            store,
            fetcher,
            events,
            policy,
        }
    }

    /// Poll one partition against `watermark`. Returns the number of items emitted.
    pub async fn poll(&self, partition: &Partition, watermark: DateTime<Utc>) -> Result<usize> {
        let now = Utc::now();

        if self.policy == WatermarkPolicy::BeforeFetch {
            self.advance_watermark(partition, now).await;
        }

        info!("Visiting category {} ({})", partition.category.name, partition.key());
        let items = self.fetcher.fetch_items(&partition.url).await?;

        if self.policy == WatermarkPolicy::AfterFetch {
            self.advance_watermark(partition, now).await;
        }

        let fetched = items.len();
        let fresh = detect(partition, watermark, items);
        let emitted = fresh.len();
        for item in fresh {
            info!("Detected new vacancy in {}: {}", partition.key(), item.link);
            self.events.send(item).await?;
        }

        debug!("Partition {}: {fetched} fetched, {emitted} new", partition.key());
        Ok(emitted)
    }

    async fn advance_watermark(&self, partition: &Partition, now: DateTime<Utc>) {
        // A failed write only widens the next poll's window.
        if let Err(e) = self.store.set_watermark(partition, now).await {
            warn!("Watermark update failed for {}: {e}", partition.key());
        }
    }
}
