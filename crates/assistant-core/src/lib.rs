use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use provider_client::ProviderClients;
use time::OffsetDateTime;
use tracing::{debug, info};

pub mod classify;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod services;
pub mod state;
pub mod transport;

use classify::{IntentClassifier, KeywordClassifier, RemoteClassifier};
use dispatch::Dispatcher;
use state::AppContext;

/// Which classifier the dispatcher consults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClassifierConfig {
    /// Deterministic keyword scoring over the registry; needs no network.
    #[default]
    Keyword,
    /// External language-model service.
    Remote { endpoint: String, model: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    Http,
    Headless,
}

/// Configuration inputs required to bootstrap the assistant core.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub classifier: ClassifierConfig,
    /// Timestamp captured during process initialization for diagnostics.
    pub boot_timestamp: OffsetDateTime,
    pub mode: ServerMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            classifier: ClassifierConfig::default(),
            boot_timestamp: OffsetDateTime::now_utc(),
            mode: ServerMode::Http,
        }
    }
}

#[derive(Clone)]
pub struct CoreRuntime {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl CoreRuntime {
    #[must_use]
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub async fn serve(&self) -> Result<()> {
        match self.config.mode {
            ServerMode::Http => {
                transport::serve(self.config.bind_addr, self.dispatcher.clone()).await?;
            }
            ServerMode::Headless => {
                debug!(target: "assistant_core", "headless mode: skipping transport loop");
            }
        }
        Ok(())
    }
}

/// Construct the clients, registry, and dispatcher once; callers pass the
/// runtime around explicitly instead of reaching for globals.
pub async fn bootstrap(config: ServerConfig) -> Result<CoreRuntime> {
    let context = Arc::new(AppContext::new(ProviderClients::new()));
    let registry = Arc::new(handlers::register_handlers());

    let classifier: Arc<dyn IntentClassifier> = match &config.classifier {
        ClassifierConfig::Keyword => Arc::new(KeywordClassifier),
        ClassifierConfig::Remote { endpoint, model } => {
            Arc::new(RemoteClassifier::new(endpoint.clone(), model.clone()))
        }
    };

    info!(
        target: "assistant_core",
        bind_addr = %config.bind_addr,
        classifier = ?config.classifier,
        boot_timestamp = %config.boot_timestamp,
        mode = ?config.mode,
        handlers = registry.entries().len(),
        "core runtime starting"
    );

    let dispatcher = Arc::new(Dispatcher::builder(context, registry, classifier).build());
    Ok(CoreRuntime { config, dispatcher })
}

pub async fn run(config: ServerConfig) -> Result<()> {
    bootstrap(config).await?.serve().await
}
