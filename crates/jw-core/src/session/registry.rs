use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    context::AppContext,
    domain::ChatId,
    messaging::types::InboundMessage,
    session::chat::{ChatSession, Handled},
};

/// Live chat sessions keyed by chat id.
///
/// A session is created by the first inbound message of a chat and destroyed a
/// fixed time after creation (activity does not extend it), on explicit
/// request, or when the shutdown token fires.
pub struct SessionRegistry {
    ctx: AppContext,
    ttl: Duration,
    cancel: CancellationToken,
    sessions: Mutex<HashMap<i64, Arc<ChatSession>>>,
}

impl SessionRegistry {
    pub fn new(ctx: AppContext, cancel: CancellationToken) -> Arc<Self> {
        let ttl = ctx.cfg.session_ttl;
        Arc::new(Self {
            ctx,
            ttl,
            cancel,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    /// Deliver an inbound message to its chat's session, creating one if needed.
    pub async fn route(self: &Arc<Self>, msg: InboundMessage) {
        loop {
            let session = self.get_or_create(msg.chat_id).await;
            match session.handle(&self.ctx, &msg).await {
                Handled::Done => return,
                Handled::Closed => {
                    // Lost the race against teardown; make sure the slot is free and retry.
                    self.release(&session).await;
                }
            }
        }
    }

    pub async fn get(&self, chat_id: ChatId) -> Option<Arc<ChatSession>> {
        self.sessions.lock().await.get(&chat_id.0).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn get_or_create(self: &Arc<Self>, chat_id: ChatId) -> Arc<ChatSession> {
        let mut map = self.sessions.lock().await;
        if let Some(existing) = map.get(&chat_id.0) {
            return existing.clone();
        }

        let session = Arc::new(ChatSession::new(chat_id, &self.ctx.cfg));
        map.insert(chat_id.0, session.clone());
        drop(map);

        debug!("Session opened for chat {}", chat_id.0);
        self.spawn_expiry(session.clone());
        session
    }

    fn spawn_expiry(self: &Arc<Self>, session: Arc<ChatSession>) {
        let registry = self.clone();
        let ttl = self.ttl;
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
              _ = cancel.cancelled() => {}
              _ = sleep(ttl) => {}
            }
            registry.destroy(&session).await;
        });
    }

    /// Tear a session down and free its slot. Idempotent: returns `false` if the
    /// session had already been destroyed.
    pub async fn destroy(&self, session: &Arc<ChatSession>) -> bool {
        let closed = session.close(self.ctx.messenger.as_ref()).await;
        self.release(session).await;
        if closed {
            debug!("Session closed for chat {}", session.chat_id().0);
        }
        closed
    }

    pub async fn destroy_chat(&self, chat_id: ChatId) -> bool {
        match self.get(chat_id).await {
            Some(session) => self.destroy(&session).await,
            None => false,
        }
    }

    /// Destroy every live session (flushing their messages).
    pub async fn shutdown(&self) {
        let sessions: Vec<Arc<ChatSession>> = {
            let mut map = self.sessions.lock().await;
            map.drain().map(|(_, s)| s).collect()
        };
        info!("Closing {} chat sessions", sessions.len());
        for session in sessions {
            session.close(self.ctx.messenger.as_ref()).await;
        }
    }

    /// Remove the slot only if it still holds this exact session.
    async fn release(&self, session: &Arc<ChatSession>) {
        let mut map = self.sessions.lock().await;
        let chat = session.chat_id().0;
        if map.get(&chat).is_some_and(|s| Arc::ptr_eq(s, session)) {
            map.remove(&chat);
        }
    }
}
