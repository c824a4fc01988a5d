use tracing::{debug, warn};

use crate::{domain::MessageRef, messaging::port::MessagingPort};

/// Tracks messages of a session that should disappear once the next reply is sent.
#[derive(Debug, Default)]
pub struct MessageJanitor {
    pending: Vec<MessageRef>,
}

impl MessageJanitor {
    pub fn track(&mut self, msg: MessageRef) {
        self.pending.push(msg);
    }

    pub fn pending(&self) -> &[MessageRef] {
        &self.pending
    }

    /// Delete every tracked message. Deleted and already-gone messages are
    /// forgotten; other failures stay queued for the next flush.
    pub async fn flush(&mut self, messenger: &dyn MessagingPort) -> usize {
        let mut keep = Vec::new();
        let mut deleted = 0usize;

        for msg in self.pending.drain(..) {
            match messenger.delete_message(msg).await {
                Ok(()) => deleted += 1,
                Err(e) if e.is_not_found() => {
                    debug!("Message {:?} already gone", msg.message_id);
                }
                Err(e) => {
                    warn!("Failed to delete message {:?}: {e}", msg.message_id);
                    keep.push(msg);
                }
            }
        }

        self.pending = keep;
        deleted
    }
}
