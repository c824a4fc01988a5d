//! Fan-out of novel items to the subscribers of their partition.

use std::{sync::Arc, time::Duration};

use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    domain::{ChatId, NewItem},
    errors::Error,
    events::ItemReceiver,
    formatting::format_notification,
    messaging::port::MessagingPort,
    store::SubscriptionStore,
    Result,
};

/// Outbound-only session that pushes a single notification to one chat.
///
/// Unlike chat sessions it keeps no state and no janitor: it lives for one send,
/// bounded by `ttl`.
struct DeliverySession<'a> {
    chat_id: ChatId,
    ttl: Duration,
    messenger: &'a dyn MessagingPort,
}

impl DeliverySession<'_> {
    async fn push(self, html: &str) -> Result<()> {
        match timeout(self.ttl, self.messenger.send_html(self.chat_id, html, None)).await {
            Ok(sent) => sent.map(|_| ()),
            Err(_) => Err(Error::External(format!(
                "delivery to chat {} timed out after {:?}",
                self.chat_id.0, self.ttl
            ))),
        }
    }
}

/// Per-item counters, mostly for logs and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub subscribers: usize,
    pub delivered: usize,
}

pub struct DeliveryDispatcher {
    store: Arc<dyn SubscriptionStore>,
    messenger: Arc<dyn MessagingPort>,
    pacing: Duration,
    session_ttl: Duration,
}

impl DeliveryDispatcher {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        messenger: Arc<dyn MessagingPort>,
        pacing: Duration,
        session_ttl: Duration,
    ) -> Self {
        Self {
            store,
            messenger,
            pacing,
            session_ttl,
        }
    }

    /// Drain `events` in arrival order until cancelled or the channel closes.
    pub async fn run(self, mut events: ItemReceiver, cancel: CancellationToken) {
        info!("Delivery dispatcher started");
        loop {
            let item = tokio::select! {
              _ = cancel.cancelled() => break,
              next = events.recv() => match next {
                  Some(item) => item,
                  None => break,
              },
            };

            let report = self.deliver(&item, &cancel).await;
            info!(
                "Delivered \"{}\" ({}) to {}/{} subscribers",
                item.title,
                item.partition_key(),
                report.delivered,
                report.subscribers
            );
        }
        info!("Delivery dispatcher stopped");
    }

    /// Send `item` to every subscriber of its partition, one at a time.
    ///
    /// A failure for one subscriber is logged and the rest still get the item.
    /// Cancellation stops the fan-out between or during sends.
    pub async fn deliver(&self, item: &NewItem, cancel: &CancellationToken) -> DeliveryReport {
        let key = item.partition_key();
        let subscribers = match self.store.list_subscribers(&key).await {
            Ok(subs) => subs,
            Err(e) => {
                warn!("Could not resolve subscribers of {key}: {e}");
                return DeliveryReport::default();
            }
        };

        let mut report = DeliveryReport {
            subscribers: subscribers.len(),
            delivered: 0,
        };
        if subscribers.is_empty() {
            debug!("No subscribers for {key}");
            return report;
        }

        let html = format_notification(item);
        for sub in &subscribers {
            let session = DeliverySession {
                chat_id: sub.chat_id,
                ttl: self.session_ttl,
                messenger: self.messenger.as_ref(),
            };
            let pushed = tokio::select! {
              biased;
              _ = cancel.cancelled() => break,
              pushed = session.push(&html) => pushed,
            };
            match pushed {
                Ok(()) => report.delivered += 1,
                Err(e) => warn!(
                    "Failed to notify {} (chat {}): {e}",
                    sub.display_name, sub.chat_id.0
                ),
            }
            tokio::select! {
              biased;
              _ = cancel.cancelled() => break,
              _ = sleep(self.pacing) => {}
            }
        }

        if cancel.is_cancelled() && report.delivered < report.subscribers {
            info!(
                "Delivery of {key} interrupted after {}/{} subscribers",
                report.delivered, report.subscribers
            );
        }
        report
    }
}
