use std::sync::Arc;

use crate::{
    catalog::PartitionCatalog, config::Config, messaging::port::MessagingPort,
    store::SubscriptionStore,
};

/// Shared collaborators, built once in `main` and handed to every component.
#[derive(Clone)]
pub struct AppContext {
    pub cfg: Arc<Config>,
    pub catalog: Arc<PartitionCatalog>,
    pub store: Arc<dyn SubscriptionStore>,
    pub messenger: Arc<dyn MessagingPort>,
}
