use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use jw_core::{
    domain::{ChatId, MessageId, UserId},
    messaging::types::InboundMessage,
    session::SessionRegistry,
};

/// Long-poll Telegram and route every text message to its chat session until
/// `cancel` fires.
pub async fn run_polling(
    bot: Bot,
    registry: Arc<SessionRegistry>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    match bot.get_me().await {
        Ok(me) => info!("jobwatch bot started: @{}", me.username()),
        Err(e) => warn!("getMe failed: {e}"),
    }

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    // Updates are handled concurrently so each one is stamped on receipt; the
    // session lock serialises them per chat.
    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![registry])
        .default_handler(|_| async {})
        .distribution_function(|_| None::<std::convert::Infallible>)
        .build();

    let shutdown = dispatcher.shutdown_token();
    tokio::spawn(async move {
        cancel.cancelled().await;
        match shutdown.shutdown() {
            Ok(done) => done.await,
            Err(e) => debug!("Telegram dispatcher was not running: {e}"),
        }
    });

    dispatcher.dispatch().await;
    info!("Telegram polling stopped");
    Ok(())
}

async fn handle_message(msg: Message, registry: Arc<SessionRegistry>) -> ResponseResult<()> {
    let received_at = Instant::now();
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(inbound) = to_inbound(
        msg.chat.id.0,
        user.id.0,
        user.username.clone(),
        msg.id.0,
        msg.text(),
        received_at,
    ) else {
        return Ok(());
    };

    registry.route(inbound).await;
    Ok(())
}

/// Only non-empty text messages reach the session.
fn to_inbound(
    chat_id: i64,
    user_id: u64,
    username: Option<String>,
    message_id: i32,
    text: Option<&str>,
    received_at: Instant,
) -> Option<InboundMessage> {
    let text = text?.trim();
    if text.is_empty() {
        return None;
    }
    Some(InboundMessage {
        chat_id: ChatId(chat_id),
        user_id: UserId(user_id as i64),
        username,
        message_id: MessageId(message_id),
        text: text.to_string(),
        received_at,
    })
}
