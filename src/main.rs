use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use storyfill_server::bus::EventBus;
use storyfill_server::config::{self, Config};
use storyfill_server::http::{self, AppState};
use storyfill_server::moderation;
use storyfill_server::narration::NarrationService;
use storyfill_server::rate_limit::RateLimiter;
use storyfill_server::logging;
use storyfill_server::rooms::RoomStore;

/// StoryFill multiplayer room server.
#[derive(Debug, Parser)]
struct Cli {
    /// Load configuration, validate it, print any errors, and exit.
    #[arg(long)]
    validate_config: bool,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load();

    if cli.validate_config {
        config::validate_config(&config)?;
        println!("configuration is valid");
        return Ok(());
    }

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    config::validate_config(&config)?;
    logging::init();

    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    let port = config.port;
    let event_buffer_size = config.event_buffer_size;
    let config = Arc::new(config);

    let store = Arc::new(RoomStore::new((*config).clone()));
    let bus = Arc::new(EventBus::new(event_buffer_size));
    let narration = Arc::new(NarrationService::new(store.clone(), bus.clone()));
    let rate_limiter = Arc::new(RateLimiter::new());

    {
        let store = store.clone();
        let bus = bus.clone();
        tokio::spawn(async move {
            store.run_sweeper(bus).await;
        });
    }
    rate_limiter
        .clone()
        .start_cleanup_task(Duration::from_secs(60), Duration::from_secs(600));

    let state = AppState {
        store,
        bus,
        narration,
        filter: moderation::default_filter(),
        rate_limiter,
        config: config.clone(),
    };

    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind to port {port}"))?;

    tracing::info!(port, "storyfill-server listening");
    axum::serve(listener, app)
        .await
        .context("server error")?;

    Ok(())
}
