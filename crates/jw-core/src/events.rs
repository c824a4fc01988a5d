//! In-process handoff of novel items from the detector to the dispatcher.
//!
//! The channel is bounded (capacity 1 by default) and this bound is the only
//! flow control between the two loops: when the dispatcher falls behind, the
//! poller blocks on `send` until the next item is taken.

use tokio::sync::mpsc;

use crate::{domain::NewItem, errors::Error, Result};

pub fn channel(capacity: usize) -> (ItemSender, ItemReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ItemSender { tx }, ItemReceiver { rx })
}

#[derive(Clone, Debug)]
pub struct ItemSender {
    tx: mpsc::Sender<NewItem>,
}

impl ItemSender {
    /// Waits for capacity. Fails only when the receiving side is gone.
    pub async fn send(&self, item: NewItem) -> Result<()> {
        self.tx
            .send(item)
            .await
            .map_err(|_| Error::External("event channel closed".to_string()))
    }
}

#[derive(Debug)]
pub struct ItemReceiver {
    rx: mpsc::Receiver<NewItem>,
}

impl ItemReceiver {
    pub async fn recv(&mut self) -> Option<NewItem> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<NewItem> {
        self.rx.try_recv().ok()
    }
}
