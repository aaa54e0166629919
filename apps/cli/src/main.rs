use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use assistant_core::services::interpreter::SearchQuery;
use assistant_core::state::DomainRequest;
use assistant_core::{bootstrap, ClassifierConfig, ServerConfig, ServerMode};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use indicatif::ProgressBar;
use provider_client::geocode::GeocodeClient;
use provider_client::types::GeoPoint;
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "assistant",
    version,
    about = "Run and poke the personal-assistant backend from the shell."
)]
struct Cli {
    /// Path to a settings file (TOML); env vars with the ASSISTANT_ prefix
    /// override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Suppress non-critical CLI output.
    #[arg(long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, Clone)]
enum Command {
    /// Run the HTTP API server.
    Serve {
        /// Override the configured bind address (host:port).
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Send one message through the dispatcher and print the reply.
    Chat {
        message: String,
        /// Bearer token forwarded to credentialed handlers.
        #[arg(long)]
        token: Option<String>,
        #[arg(long, requires = "longitude")]
        latitude: Option<f64>,
        #[arg(long, requires = "latitude")]
        longitude: Option<f64>,
        #[arg(long)]
        user: Option<String>,
    },
    /// Dump the handler registry.
    Agents,
    /// Run a food search directly against the merchant fallback chain.
    Food {
        query: String,
        #[arg(long, requires = "longitude")]
        latitude: Option<f64>,
        #[arg(long, requires = "latitude")]
        longitude: Option<f64>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Search one named delivery platform instead of the default.
        #[arg(long)]
        provider: Option<String>,
    },
    /// Resolve a free-text address to coordinates.
    Geocode {
        address: String,
        #[arg(long, requires = "bias_longitude")]
        bias_latitude: Option<f64>,
        #[arg(long, requires = "bias_latitude")]
        bias_longitude: Option<f64>,
    },
    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Deserialize)]
struct Settings {
    api_host: String,
    api_port: u16,
    #[serde(default)]
    classifier_endpoint: Option<String>,
    classifier_model: String,
}

impl Settings {
    fn load(path: Option<&PathBuf>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("api_host", "0.0.0.0")?
            .set_default("api_port", 8000)?
            .set_default("classifier_model", "gpt-4o-mini")?;
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.clone()));
        } else {
            builder = builder.add_source(config::File::with_name("assistant").required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("ASSISTANT"));
        builder
            .build()
            .context("failed to load settings")?
            .try_deserialize()
            .context("invalid settings")
    }

    fn server_config(&self, bind_override: Option<SocketAddr>) -> Result<ServerConfig> {
        let mut config = ServerConfig::default();
        config.bind_addr = match bind_override {
            Some(addr) => addr,
            None => format!("{}:{}", self.api_host, self.api_port)
                .parse()
                .context("invalid api_host/api_port")?,
        };
        if let Some(endpoint) = &self.classifier_endpoint {
            config.classifier = ClassifierConfig::Remote {
                endpoint: endpoint.clone(),
                model: self.classifier_model.clone(),
            };
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;
    let settings = Settings::load(cli.config.as_ref())?;
    tracing::debug!(target: "assistant_cli", command = ?cli.command, "settings loaded");

    match &cli.command {
        Command::Serve { bind } => {
            let config = settings.server_config(*bind)?;
            assistant_server::serve_with(config).await
        }
        Command::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(*shell, &mut command, "assistant", &mut std::io::stdout());
            Ok(())
        }
        Command::Chat {
            message,
            token,
            latitude,
            longitude,
            user,
        } => {
            let mut config = settings.server_config(None)?;
            config.mode = ServerMode::Headless;
            let runtime = bootstrap(config).await?;

            let spinner = spinner(&cli, "thinking...");
            let routed = runtime
                .dispatcher()
                .route(DomainRequest {
                    text: message.clone(),
                    user_id: user.clone(),
                    location: point_from(*latitude, *longitude),
                    auth_token: token.clone(),
                })
                .await;
            spinner.finish_and_clear();

            println!("[{}] {}", routed.agent_used, routed.result.message);
            if let Some(data) = &routed.result.structured_data {
                println!("{}", serde_json::to_string_pretty(data)?);
            }
            if let Some(detail) = &routed.result.error_detail {
                eprintln!("detail: {detail}");
            }
            Ok(())
        }
        Command::Agents => {
            let mut config = settings.server_config(None)?;
            config.mode = ServerMode::Headless;
            let runtime = bootstrap(config).await?;
            let agents = runtime.dispatcher().describe_registry();
            println!("{}", serde_json::to_string_pretty(&agents)?);
            Ok(())
        }
        Command::Food {
            query,
            latitude,
            longitude,
            limit,
            provider,
        } => {
            let mut config = settings.server_config(None)?;
            config.mode = ServerMode::Headless;
            let runtime = bootstrap(config).await?;
            let context = runtime.dispatcher().context();

            if let Some(provider) = provider {
                let mut request = DomainRequest::from_text(query.clone());
                request.location = point_from(*latitude, *longitude);
                let spinner = spinner(&cli, &format!("searching on {provider}..."));
                let result =
                    assistant_core::handlers::food::search_by_provider(&context, provider, &request)
                        .await;
                spinner.finish_and_clear();

                println!("{}", result.message);
                if let Some(data) = &result.structured_data {
                    println!("{}", serde_json::to_string_pretty(data)?);
                }
                if let Some(detail) = &result.error_detail {
                    eprintln!("detail: {detail}");
                }
                return Ok(());
            }

            let search = SearchQuery::derive(query, point_from(*latitude, *longitude), *limit);
            let spinner = spinner(
                &cli,
                &format!("searching {} near {}", search.food_type, search.location),
            );
            let outcome = context
                .providers
                .merchant
                .search(&search.food_type, search.location, search.limit)
                .await;
            spinner.finish_and_clear();

            println!("{}", outcome.message);
            for restaurant in &outcome.restaurants {
                println!(
                    "• {} — {} | {} | {}",
                    restaurant.name,
                    restaurant.distance_label,
                    restaurant.delivery_fee_label,
                    restaurant.delivery_time_label
                );
            }
            if let Some(error) = &outcome.error {
                eprintln!("detail: {error}");
            }
            Ok(())
        }
        Command::Geocode {
            address,
            bias_latitude,
            bias_longitude,
        } => {
            let spinner = spinner(&cli, "resolving address...");
            let geocoder = GeocodeClient::new();
            let result = geocoder
                .geocode(address, point_from(*bias_latitude, *bias_longitude))
                .await;
            spinner.finish_and_clear();

            match result {
                Ok(resolved) => {
                    println!("{}", resolved.formatted_address);
                    println!("{}", resolved.point);
                    Ok(())
                }
                Err(error) => Err(error.into()),
            }
        }
    }
}

fn point_from(latitude: Option<f64>, longitude: Option<f64>) -> Option<GeoPoint> {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
        _ => None,
    }
}

fn spinner(cli: &Cli, message: &str) -> ProgressBar {
    if cli.quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let default_directive = if cli.quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
