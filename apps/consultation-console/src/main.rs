use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod consultation;

use shared_config::CallConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,call_session_cell=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting consultation console");

    // Load configuration
    let mut config = CallConfig::from_env();
    if !config.is_configured() {
        config = config.for_identity("doctor-console");
        info!("CALL_LOCAL_IDENTITY not set, using {}", config.local_identity);
    }

    consultation::run(config).await
}
