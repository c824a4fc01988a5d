//! Fixed-interval driver visiting every catalog partition once per cycle.

use std::{sync::Arc, time::Duration};

use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{catalog::PartitionCatalog, detector::ChangeDetector, store::SubscriptionStore};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub visited: usize,
    pub failed: usize,
    pub emitted: usize,
}

pub struct Poller {
    catalog: Arc<PartitionCatalog>,
    store: Arc<dyn SubscriptionStore>,
    detector: ChangeDetector,
    poll_interval: Duration,
    pacing: Duration,
}

impl Poller {
    pub fn new(
        catalog: Arc<PartitionCatalog>,
        store: Arc<dyn SubscriptionStore>,
        detector: ChangeDetector,
        poll_interval: Duration,
        pacing: Duration,
    ) -> Self {
        Self {
            catalog,
            store,
            detector,
            poll_interval,
            pacing,
        }
    }

    /// Run cycles until `cancel` fires. The first cycle starts immediately.
    pub async fn run(self, cancel: CancellationToken) {
        let mut tick = interval(self.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Poller started: {} partitions every {:?}",
            self.catalog.partitions().len(),
            self.poll_interval
        );
        loop {
            tokio::select! {
              _ = cancel.cancelled() => break,
              _ = tick.tick() => {
                let report = self.run_cycle(&cancel).await;
                info!(
                    "Poll cycle done: {} visited, {} failed, {} new",
                    report.visited, report.failed, report.emitted
                );
              }
            }
        }
        info!("Poller stopped");
    }

    /// Visit every partition once, in catalog order.
    ///
    /// A failed partition is logged and skipped without pacing; it is retried on
    /// the next cycle.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleReport {
        let mut report = CycleReport::default();

        for partition in self.catalog.partitions() {
            if cancel.is_cancelled() {
                break;
            }

            let watermark = self.store.get_watermark(partition).await;
            report.visited += 1;

            let outcome = tokio::select! {
              _ = cancel.cancelled() => break,
              res = self.detector.poll(partition, watermark) => res,
            };

            match outcome {
                Ok(n) => {
                    report.emitted += n;
                    tokio::select! {
                      _ = cancel.cancelled() => break,
                      _ = sleep(self.pacing) => {}
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    warn!("Poll of {} failed: {e}", partition.key());
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        detector::WatermarkPolicy,
        events,
        store::MemoryStore,
        test_support::{catalog, rfc2822, FakeFetcher},
    };
    use chrono::{Duration as ChronoDuration, Utc};

    fn poller(
        fetcher: Arc<FakeFetcher>,
        store: Arc<MemoryStore>,
        capacity: usize,
    ) -> (Poller, events::ItemReceiver, Arc<PartitionCatalog>) {
        let catalog = Arc::new(catalog(&["Backend", "Frontend"]));
        let (tx, rx) = events::channel(capacity);
        let det = ChangeDetector::new(store.clone(), fetcher, tx, WatermarkPolicy::BeforeFetch);
        (
            Poller::new(
                catalog.clone(),
                store,
                det,
                Duration::from_secs(600),
                Duration::from_secs(5),
            ),
            rx,
            catalog,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn failed_partition_does_not_stop_the_cycle() {
        let fetcher = Arc::new(FakeFetcher::default());
        let store = Arc::new(MemoryStore::new());
        let (poller, _rx, catalog) = poller(fetcher.clone(), store, 8);
        let first = &catalog.partitions()[0];
        fetcher.fail(&first.url);

        let report = poller.run_cycle(&CancellationToken::new()).await;
        assert_eq!(report.visited, catalog.partitions().len());
        assert_eq!(report.failed, 1);
        assert_eq!(
            fetcher.calls().len(),
            catalog.partitions().len(),
            "every partition is visited exactly once"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn successful_partitions_are_paced() {
        let fetcher = Arc::new(FakeFetcher::default());
        let store = Arc::new(MemoryStore::new());
        let (poller, _rx, catalog) = poller(fetcher, store, 8);

        let started = tokio::time::Instant::now();
        poller.run_cycle(&CancellationToken::new()).await;
        let expected = Duration::from_secs(5) * catalog.partitions().len() as u32;
        assert!(started.elapsed() >= expected);
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_emits_novel_items_and_cancel_stops_run() {
        let fetcher = Arc::new(FakeFetcher::default());
        let store = Arc::new(MemoryStore::new());
        let (poller, mut rx, catalog) = poller(fetcher.clone(), store.clone(), 8);

        let p = &catalog.partitions()[0];
        let wm = Utc::now() - ChronoDuration::hours(1);
        store.set_watermark(p, wm).await.unwrap();
        fetcher.set_items(
            &p.url,
            vec![crate::domain::RawItem {
                title: "Rust dev".to_string(),
                link: "https://jobs.dou.ua/v/1/".to_string(),
                published: rfc2822(wm + ChronoDuration::minutes(30)),
            }],
        );

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poller.run(cancel.clone()));

        let item = rx.recv().await.unwrap();
        assert_eq!(item.title, "Rust dev");

        cancel.cancel();
        handle.await.unwrap();
    }
}
