use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    config::Config,
    context::AppContext,
    domain::{ChatId, MessageRef, PartitionKey},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ChatAction, InboundMessage},
    },
    session::{
        flood::FloodGuard,
        janitor::MessageJanitor,
        machine::{self, Action, ConversationState, Reply},
        replies,
    },
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handled {
    Done,
    /// The session was torn down while the message waited for the lock.
    Closed,
}

#[derive(Debug)]
struct SessionState {
    conversation: ConversationState,
    flood: FloodGuard,
    janitor: MessageJanitor,
    closed: bool,
}

/// Conversational session of one chat.
///
/// All mutable state sits behind one lock that is held for the whole
/// read-modify-send of an inbound message, and by teardown.
#[derive(Debug)]
pub struct ChatSession {
    chat_id: ChatId,
    state: Mutex<SessionState>,
}

impl ChatSession {
    pub fn new(chat_id: ChatId, cfg: &Config) -> Self {
        Self {
            chat_id,
            state: Mutex::new(SessionState {
                conversation: ConversationState::Idle,
                flood: FloodGuard::new(cfg.flood_window, cfg.flood_min_gap),
                janitor: MessageJanitor::default(),
                closed: false,
            }),
        }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub async fn conversation(&self) -> ConversationState {
        self.state.lock().await.conversation.clone()
    }

    pub async fn pending_cleanup(&self) -> Vec<MessageRef> {
        self.state.lock().await.janitor.pending().to_vec()
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    pub async fn handle(&self, ctx: &AppContext, msg: &InboundMessage) -> Handled {
        let mut st = self.state.lock().await;
        if st.closed {
            return Handled::Closed;
        }

        if let Err(e) = ctx
            .messenger
            .send_chat_action(self.chat_id, ChatAction::Typing)
            .await
        {
            debug!("Typing action failed for chat {}: {e}", self.chat_id.0);
        }

        let inbound = MessageRef {
            chat_id: self.chat_id,
            message_id: msg.message_id,
        };

        if st.flood.check(msg.received_at) {
            debug!("Flood suppressed in chat {}", self.chat_id.0);
            self.say(ctx.messenger.as_ref(), &mut st, &Reply::Flood).await;
            st.janitor.track(inbound);
            return Handled::Done;
        }

        let (next, reply) = self.step(ctx, &st.conversation, msg).await;
        st.conversation = next;
        self.say(ctx.messenger.as_ref(), &mut st, &reply).await;
        st.janitor.track(inbound);
        Handled::Done
    }

    async fn step(
        &self,
        ctx: &AppContext,
        current: &ConversationState,
        msg: &InboundMessage,
    ) -> (ConversationState, Reply) {
        let (next, action) = machine::transition(current, &msg.text, &ctx.catalog);
        match action {
            Action::Reply(reply) => (next, reply),
            Action::PrepareUnsubscribe => {
                let outcome = ctx.store.get_subscription(msg.user_id).await;
                log_store_error("load subscriptions", &outcome);
                machine::on_unsubscribe_prepared(&outcome)
            }
            Action::ListSubscriptions => {
                let outcome = ctx.store.get_subscription(msg.user_id).await;
                log_store_error("load subscriptions", &outcome);
                machine::on_subscriptions_listed(&outcome)
            }
            Action::Subscribe { category, filter } => {
                let outcome = match ctx
                    .catalog
                    .partition(&PartitionKey::new(category.id.clone(), filter.id))
                {
                    Some(partition) => {
                        ctx.store
                            .subscribe(partition, msg.user_id, msg.chat_id, &msg.display_name())
                            .await
                    }
                    None => Err(Error::NotFound(format!(
                        "partition {}[{}]",
                        category.id, filter.id
                    ))),
                };
                log_store_error("subscribe", &outcome);
                machine::on_subscribe(&category, &filter, &outcome)
            }
            Action::Unsubscribe { category_name } => {
                let outcome = ctx.store.unsubscribe(&category_name, msg.user_id).await;
                log_store_error("unsubscribe", &outcome);
                machine::on_unsubscribe(&category_name, &outcome)
            }
        }
    }

    /// Flush earlier messages, then send `reply` and remember it for the next flush.
    async fn say(&self, messenger: &dyn MessagingPort, st: &mut SessionState, reply: &Reply) {
        st.janitor.flush(messenger).await;
        let (html, menu) = replies::render(reply);
        match messenger.send_html(self.chat_id, &html, menu).await {
            Ok(sent) => st.janitor.track(sent),
            Err(e) => warn!("Failed to reply in chat {}: {e}", self.chat_id.0),
        }
    }

    /// Tear the session down: waits for an in-flight message, deletes pending
    /// messages and marks the session closed. Returns `false` if already closed.
    pub async fn close(&self, messenger: &dyn MessagingPort) -> bool {
        let mut st = self.state.lock().await;
        if st.closed {
            return false;
        }
        st.janitor.flush(messenger).await;
        st.closed = true;
        true
    }
}

fn log_store_error<T>(what: &str, outcome: &Result<T>) {
    if let Err(e) = outcome {
        if !e.is_not_found() {
            warn!("Store failed to {what}: {e}");
        }
    }
}
