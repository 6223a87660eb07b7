use std::sync::Arc;
use std::time::Duration;

use itemkit_db::store::ItemStore;

use crate::config::ServerConfig;
use crate::services::ItemService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Item use cases.
    pub items: Arc<ItemService>,
    /// Storage backend, used directly by the health check.
    pub store: Arc<dyn ItemStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire the service layer over `store`. `tx_timeout` bounds every write
    /// transaction.
    pub fn new(store: Arc<dyn ItemStore>, config: ServerConfig, tx_timeout: Duration) -> Self {
        let items = Arc::new(ItemService::new(Arc::clone(&store), tx_timeout));
        Self {
            items,
            store,
            config: Arc::new(config),
        }
    }
}
