//! Application state.

use std::sync::Arc;

use kurspay_store::RocksStore;

use crate::config::ServiceConfig;
use crate::mailer::Mailer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Transactional-email client (optional).
    pub mailer: Option<Arc<Mailer>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        let mailer = config
            .mailer_api_url
            .as_ref()
            .zip(config.mailer_api_key.as_ref())
            .map(|(url, key)| {
                tracing::info!(mailer_url = %url, "Mail notifications enabled");
                Arc::new(Mailer::new(url, key))
            });

        if mailer.is_none() {
            tracing::warn!("Mailer not configured - payment notifications will not be sent");
        }

        Self {
            store,
            config,
            mailer,
        }
    }

    /// Check if the mailer is configured.
    #[must_use]
    pub fn has_mailer(&self) -> bool {
        self.mailer.is_some()
    }
}
