//! HTTP adapter for the DOU jobs board.
//!
//! Implements `FeedFetcher`: the category index is scraped from the vacancies
//! page and each partition is read from its RSS feed.

mod parse;

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use jw_core::{
    domain::{Category, RawItem},
    errors::Error,
    ports::FeedFetcher,
    Result,
};

pub use parse::{parse_categories, parse_items};

#[derive(Clone, Debug)]
pub struct DouFetcher {
    http: reqwest::Client,
}

impl DouFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("http client build error: {e}")))?;
        Ok(Self { http })
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {url}");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("{url}: request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(Error::Fetch(format!("{url}: HTTP {status}")));
        }

        resp.text()
            .await
            .map_err(|e| Error::Fetch(format!("{url}: body error: {e}")))
    }
}

#[async_trait]
impl FeedFetcher for DouFetcher {
    async fn fetch_categories(&self, index_url: &str) -> Result<Vec<Category>> {
        let html = self.get_text(index_url).await?;
        let categories = parse_categories(&html);
        if categories.is_empty() {
            return Err(Error::Parse(format!(
                "{index_url}: no category selector found"
            )));
        }
        debug!("Found {} category options", categories.len());
        Ok(categories)
    }

    async fn fetch_items(&self, url: &str) -> Result<Vec<RawItem>> {
        let xml = self.get_text(url).await?;
        let items = parse_items(&xml)?;
        debug!("{} items at {url}", items.len());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_configured_agent() {
        assert!(DouFetcher::new("jobwatch-test", Duration::from_secs(5)).is_ok());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_fetch_error() {
        let fetcher = DouFetcher::new("jobwatch-test", Duration::from_millis(500)).unwrap();
        let err = fetcher
            .fetch_items("http://127.0.0.1:9/vacancies/feeds/?category=Rust")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }
}
