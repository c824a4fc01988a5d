use async_trait::async_trait;

use crate::{
    domain::{Category, RawItem},
    Result,
};

/// Port for the listings source.
///
/// The HTML/XML detail lives in the adapter crate; the core only sees the
/// category index and per-partition item sequences in source order.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Enumerate every selectable category from the source's category index.
    async fn fetch_categories(&self, index_url: &str) -> Result<Vec<Category>>;

    /// Fetch the items currently listed at `url`, in feed order.
    async fn fetch_items(&self, url: &str) -> Result<Vec<RawItem>>;
}
