//! Partition catalog: every (category, experience filter) pair the watcher polls.
//!
//! Built once at startup and immutable afterwards.

use std::collections::HashSet;

use tracing::info;
use url::Url;

use crate::{
    domain::{Category, ExperienceFilter, Partition, PartitionKey},
    errors::Error,
    ports::FeedFetcher,
    Result,
};

/// Stored form of the "any experience" sentinel.
pub const ANY_FILTER_DB_ID: &str = "all";

/// Fixed experience filters, in menu order. The first one is the "any" sentinel.
pub const EXPERIENCE_FILTERS: [ExperienceFilter; 5] = [
    ExperienceFilter {
        id: "",
        label: "Будь-який досвід",
    },
    ExperienceFilter {
        id: "0-1",
        label: "Без досвіду",
    },
    ExperienceFilter {
        id: "1-3",
        label: "1-3 роки",
    },
    ExperienceFilter {
        id: "3-5",
        label: "3-5 років",
    },
    ExperienceFilter {
        id: "5plus",
        label: "5+ років",
    },
];

/// Map a filter id to the form persisted in the store.
pub fn filter_id_for_db(id: &str) -> String {
    if id.is_empty() {
        ANY_FILTER_DB_ID.to_string()
    } else {
        id.to_string()
    }
}

/// Inverse of [`filter_id_for_db`].
pub fn filter_id_for_display(db_id: &str) -> String {
    if db_id == ANY_FILTER_DB_ID {
        String::new()
    } else {
        db_id.to_string()
    }
}

pub fn find_filter_by_label(label: &str) -> Option<ExperienceFilter> {
    EXPERIENCE_FILTERS.iter().copied().find(|f| f.label == label)
}

pub fn find_filter_by_id(id: &str) -> Option<ExperienceFilter> {
    EXPERIENCE_FILTERS.iter().copied().find(|f| f.id == id)
}

/// Display label for a filter id, falling back to the raw id for unknown values.
pub fn filter_label(id: &str) -> String {
    find_filter_by_id(id)
        .map(|f| f.label.to_string())
        .unwrap_or_else(|| id.to_string())
}

#[derive(Clone, Debug)]
pub struct PartitionCatalog {
    categories: Vec<Category>,
    partitions: Vec<Partition>,
}

impl PartitionCatalog {
    /// Enumerate categories through the fetcher and expand them with every filter.
    ///
    /// Any failure is fatal: a partial catalog is never returned.
    pub async fn discover(
        fetcher: &dyn FeedFetcher,
        categories_url: &str,
        feed_url: &str,
    ) -> Result<Self> {
        info!("Visiting category index {categories_url}");
        let categories = fetcher.fetch_categories(categories_url).await?;
        let catalog = Self::from_categories(categories, feed_url)?;
        info!(
            "Catalog loaded: {} categories, {} partitions",
            catalog.categories.len(),
            catalog.partitions.len()
        );
        Ok(catalog)
    }

    pub fn from_categories(categories: Vec<Category>, feed_url: &str) -> Result<Self> {
        let mut seen = HashSet::new();
        let categories: Vec<Category> = categories
            .into_iter()
            .map(|c| Category {
                id: c.id.trim().to_string(),
                name: c.name.trim().to_string(),
            })
            .filter(|c| !c.id.is_empty() && !c.name.is_empty())
            .filter(|c| seen.insert(c.id.clone()))
            .collect();

        if categories.is_empty() {
            return Err(Error::Parse(
                "category index contained no selectable categories".to_string(),
            ));
        }

        let mut partitions = Vec::with_capacity(categories.len() * EXPERIENCE_FILTERS.len());
        for category in &categories {
            for filter in EXPERIENCE_FILTERS {
                partitions.push(Partition {
                    category: category.clone(),
                    filter,
                    url: partition_url(feed_url, &category.id, &filter)?,
                });
            }
        }

        Ok(Self {
            categories,
            partitions,
        })
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn find_category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn partition(&self, key: &PartitionKey) -> Option<&Partition> {
        self.partitions.iter().find(|p| {
            p.category.id == key.category_id && p.filter.id == key.filter_id
        })
    }
}

fn partition_url(feed_url: &str, category_id: &str, filter: &ExperienceFilter) -> Result<String> {
    let mut url = Url::parse(feed_url)
        .map_err(|e| Error::Config(format!("invalid feed url {feed_url}: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("category", category_id);
        if !filter.is_any() {
            query.append_pair("exp", filter.id);
        }
    }
    Ok(url.to_string())
}
