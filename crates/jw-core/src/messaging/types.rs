use tokio::time::Instant;

use crate::domain::{ChatId, MessageId, UserId};

/// Inbound text message routed to a chat session.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub message_id: MessageId,
    pub text: String,
    /// Stamped by the transport on receipt, before the message queues for its session.
    pub received_at: Instant,
}

impl InboundMessage {
    /// Name stored with subscriptions.
    pub fn display_name(&self) -> String {
        self.username
            .clone()
            .unwrap_or_else(|| format!("user{}", self.user_id.0))
    }
}

/// Outgoing "chat action" (typing indicator).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
}

/// One-time reply keyboard shown under a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyMenu {
    pub rows: Vec<Vec<String>>,
}

impl ReplyMenu {
    /// Lay labels out `per_row` buttons per row, in order.
    pub fn grid<I, S>(labels: I, per_row: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let per_row = per_row.max(1);
        let mut rows: Vec<Vec<String>> = Vec::new();
        for (idx, label) in labels.into_iter().enumerate() {
            if idx % per_row == 0 {
                rows.push(Vec::new());
            }
            if let Some(row) = rows.last_mut() {
                row.push(label.into());
            }
        }
        Self { rows }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(String::as_str)
    }
}
