use anyhow::Result;
use assistant_core::{run, ClassifierConfig, ServerConfig, ServerMode};
use tracing::info;

pub use assistant_core::{bootstrap, CoreRuntime};

/// Start the assistant backend with configuration taken from the
/// environment. `ASSISTANT_BIND` overrides the listen address and
/// `ASSISTANT_CLASSIFIER_ENDPOINT` (plus optional `ASSISTANT_CLASSIFIER_MODEL`)
/// switches classification to the remote service.
pub async fn run_server() -> Result<()> {
    let mut config = ServerConfig::default();
    config.mode = ServerMode::Http;

    if let Ok(bind) = std::env::var("ASSISTANT_BIND") {
        config.bind_addr = bind.parse()?;
    }
    if let Ok(endpoint) = std::env::var("ASSISTANT_CLASSIFIER_ENDPOINT") {
        let model = std::env::var("ASSISTANT_CLASSIFIER_MODEL")
            .unwrap_or_else(|_| "gpt-4o-mini".to_string());
        config.classifier = ClassifierConfig::Remote { endpoint, model };
    }

    info!(target: "assistant_server", bind_addr = %config.bind_addr, "starting server");
    run(config).await
}

/// Start the assistant backend with an already-assembled configuration.
pub async fn serve_with(config: ServerConfig) -> Result<()> {
    info!(target: "assistant_server", bind_addr = %config.bind_addr, "starting server");
    run(config).await
}
