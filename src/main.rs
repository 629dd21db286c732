//! Gatehouse - authenticated relay between internal HTTP services

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatehouse::{
    auth::SignatureScheme,
    config::{Args, LogFormat},
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("gatehouse={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    match args.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Gatehouse - inter-service relay");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Services: {}", args.service_list().join(", "));
    info!("Internal gateway: {}", args.internal_gateway);
    info!("Dispatch backend: {}", args.websocket_server_url);
    info!(
        "Signatures: {}",
        match SignatureScheme::from_max_age(args.signature_max_age_secs) {
            SignatureScheme::BodyOnly => "body only".to_string(),
            SignatureScheme::Timestamped { max_age } =>
                format!("timestamped (max age {}s)", max_age.as_secs()),
        }
    );
    info!("Relay timeout: {}ms", args.relay_timeout_ms);
    info!(
        "Mail: {}",
        args.mail_api_url.as_deref().unwrap_or("log only")
    );
    info!("======================================");

    let state = match AppState::new(args) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    server::run(state).await?;
    info!("Gatehouse stopped");
    Ok(())
}
