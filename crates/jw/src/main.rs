use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use jw_core::{
    catalog::PartitionCatalog,
    config::Config,
    context::AppContext,
    detector::ChangeDetector,
    dispatcher::DeliveryDispatcher,
    events,
    poller::Poller,
    session::SessionRegistry,
    store::{JsonFileStore, SubscriptionStore},
};
use jw_feed::DouFetcher;
use teloxide::Bot;

#[tokio::main]
async fn main() -> Result<(), jw_core::Error> {
    jw_core::logging::init("jobwatch")?;

    let cfg = Arc::new(Config::load()?);

    let store: Arc<dyn SubscriptionStore> = Arc::new(JsonFileStore::open(&cfg.store_path).await?);
    info!("Store: {}", cfg.store_path.display());

    let fetcher = Arc::new(DouFetcher::new(&cfg.user_agent, cfg.fetch_timeout)?);

    // Without a catalog there is nothing to watch or subscribe to.
    let catalog = Arc::new(
        PartitionCatalog::discover(fetcher.as_ref(), &cfg.categories_url, &cfg.feed_url).await?,
    );

    let bot = Bot::new(cfg.telegram_bot_token.clone());
    let messenger = jw_telegram::throttled_messenger(bot.clone());

    let ctx = AppContext {
        cfg: cfg.clone(),
        catalog: catalog.clone(),
        store: store.clone(),
        messenger: messenger.clone(),
    };

    let cancel = CancellationToken::new();
    let (tx, rx) = events::channel(cfg.event_channel_capacity);

    let detector = ChangeDetector::new(store.clone(), fetcher, tx, cfg.watermark_policy);
    let poller = Poller::new(
        catalog,
        store.clone(),
        detector,
        cfg.poll_interval,
        cfg.partition_pacing,
    );
    let dispatcher = DeliveryDispatcher::new(
        store,
        messenger,
        cfg.delivery_pacing,
        cfg.delivery_session_ttl,
    );

    let poller_task = tokio::spawn(poller.run(cancel.clone()));
    let dispatcher_task = tokio::spawn(dispatcher.run(rx, cancel.clone()));

    let registry = SessionRegistry::new(ctx, cancel.clone());

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
            }
            cancel.cancel();
        });
    }

    if let Err(e) = jw_telegram::router::run_polling(bot, registry.clone(), cancel.clone()).await {
        error!("Telegram polling failed: {e}");
    }

    cancel.cancel();
    registry.shutdown().await;
    join_logged("Poller", poller_task).await;
    join_logged("Delivery dispatcher", dispatcher_task).await;
    info!("Bye");

    Ok(())
}

/// Wait for a background loop; a panic or abort is reported rather than dropped.
async fn join_logged(name: &str, task: JoinHandle<()>) -> bool {
    match task.await {
        Ok(()) => true,
        Err(e) => {
            error!("{name} task failed: {e}");
            false
        }
    }
}
