use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    domain::{ChatId, Partition, PartitionKey, SubscriptionRecord, UserId},
    errors::Error,
    store::{StoreDocument, SubscriptionStore},
    Result,
};

/// Store persisted as a single JSON document.
///
/// Subscription changes are applied to a copy, written to `<path>.tmp` and
/// renamed over the store file; the in-memory state only changes once the write
/// succeeded. Watermarks are patched in place and undone if the write fails.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    doc: Mutex<StoreDocument>,
}

impl JsonFileStore {
    /// Open (or create) the store at `path`. A corrupt file is a fatal error.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = match tokio::fs::read_to_string(&path).await {
            Ok(txt) if txt.trim().is_empty() => StoreDocument::default(),
            Ok(txt) => serde_json::from_str::<StoreDocument>(&txt)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Store {} does not exist yet, starting empty", path.display());
                StoreDocument::default()
            }
            Err(e) => return Err(Error::Io(e)),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    async fn mutate<R>(&self, f: impl FnOnce(&mut StoreDocument) -> R) -> Result<R> {
        let mut guard = self.doc.lock().await;
        let mut next = guard.clone();
        let out = f(&mut next);
        persist(&self.path, &next).await?;
        *guard = next;
        Ok(out)
    }
}

async fn persist(path: &Path, doc: &StoreDocument) -> Result<()> {
    let body = serde_json::to_vec(doc)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, body)
        .await
        .map_err(|e| Error::Store(format!("{}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| Error::Store(format!("{}: {e}", path.display())))?;
    Ok(())
}

#[async_trait]
impl SubscriptionStore for JsonFileStore {
    async fn get_watermark(&self, partition: &Partition) -> DateTime<Utc> {
        match self.doc.lock().await.watermark(&partition.key()) {
            Some(at) => at,
            None => {
                info!(
                    "Partition {} has no watermark yet, using current time",
                    partition.key()
                );
                Utc::now()
            }
        }
    }

    async fn set_watermark(&self, partition: &Partition, at: DateTime<Utc>) -> Result<()> {
        let key = partition.key();
        let mut doc = self.doc.lock().await;
        let previous = doc.watermark(&key);
        if previous == Some(at) {
            return Ok(());
        }

        doc.set_watermark(partition, at);
        if let Err(e) = persist(&self.path, &doc).await {
            match previous {
                Some(prev) => doc.set_watermark(partition, prev),
                None => doc.clear_watermark(&key),
            }
            warn!("Failed to store watermark for {key}: {e}");
            return Err(e);
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        partition: &Partition,
        user_id: UserId,
        chat_id: ChatId,
        display_name: &str,
    ) -> Result<bool> {
        let now = Utc::now();
        self.mutate(|doc| doc.subscribe(partition, user_id, chat_id, display_name, now))
            .await
    }

    async fn unsubscribe(&self, category_name: &str, user_id: UserId) -> Result<bool> {
        self.mutate(|doc| doc.unsubscribe(category_name, user_id))
            .await
    }

    async fn get_subscription(&self, user_id: UserId) -> Result<SubscriptionRecord> {
        self.doc.lock().await.subscription(user_id)
    }

    async fn list_subscribers(&self, key: &PartitionKey) -> Result<Vec<SubscriptionRecord>> {
        Ok(self.doc.lock().await.subscribers(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EXPERIENCE_FILTERS;
    use crate::domain::Category;

    fn temp_store_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("jw-store-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir.join("store.json")
    }

    fn backend_any() -> Partition {
        Partition {
            category: Category {
                id: "Backend".to_string(),
                name: "Backend".to_string(),
            },
            filter: EXPERIENCE_FILTERS[0],
            url: "https://example.com/?category=Backend".to_string(),
        }
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let path = temp_store_path("reopen");
        let at = Utc::now() - chrono::Duration::minutes(3);
        {
            let store = JsonFileStore::open(&path).await.unwrap();
            assert!(store
                .subscribe(&backend_any(), UserId(1), ChatId(10), "bob")
                .await
                .unwrap());
            store.set_watermark(&backend_any(), at).await.unwrap();
        }

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.get_watermark(&backend_any()).await, at);
        let rec = store.get_subscription(UserId(1)).await.unwrap();
        assert_eq!(rec.chat_id, ChatId(10));
        assert_eq!(rec.subscriptions.len(), 1);
        assert_eq!(
            store
                .list_subscribers(&backend_any().key())
                .await
                .unwrap()
                .len(),
            1
        );

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn corrupt_file_fails_to_open() {
        let path = temp_store_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn unchanged_watermark_is_not_rewritten() {
        let path = temp_store_path("unchanged");
        let store = JsonFileStore::open(&path).await.unwrap();
        let at = Utc::now();
        store.set_watermark(&backend_any(), at).await.unwrap();
        assert!(path.exists());

        std::fs::remove_file(&path).unwrap();
        store.set_watermark(&backend_any(), at).await.unwrap();
        assert!(!path.exists(), "same value must not touch the disk");

        store
            .set_watermark(&backend_any(), at + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn failed_watermark_write_keeps_previous_value() {
        let path = temp_store_path("failed-write");
        let store = JsonFileStore::open(&path).await.unwrap();
        let at = Utc::now() - chrono::Duration::minutes(1);
        store.set_watermark(&backend_any(), at).await.unwrap();

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
        assert!(store
            .set_watermark(&backend_any(), at + chrono::Duration::minutes(1))
            .await
            .is_err());
        assert_eq!(store.get_watermark(&backend_any()).await, at);
    }

    #[tokio::test]
    async fn absent_watermark_reads_as_now() {
        let path = temp_store_path("absent");
        let store = JsonFileStore::open(&path).await.unwrap();
        let before = Utc::now();
        let wm = store.get_watermark(&backend_any()).await;
        assert!(wm >= before);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
