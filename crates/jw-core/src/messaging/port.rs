use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{ChatAction, ReplyMenu},
    Result,
};

/// Outbound side of the messaging transport.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Send an HTML message, optionally with a reply-keyboard menu.
    async fn send_html(
        &self,
        chat_id: ChatId,
        html: &str,
        menu: Option<ReplyMenu>,
    ) -> Result<MessageRef>;

    /// Delete a message. Returns `Error::NotFound` when it is already gone.
    async fn delete_message(&self, msg: MessageRef) -> Result<()>;

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()>;
}
