//! picdrop - image upload API with stub token authentication.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use picdrop::{
    config::{Cli, Command, ServeConfig, TokenConfig, TokenOutputFormat},
    ingest::{FieldSelector, IngestService, UploadStorage},
    server::{auth::TokenAuth, create_router, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Token(config) => run_token(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose, config.log_json);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let policy = config.upload_policy();
    let fields = FieldSelector::default();
    let public_path = config.upload_public_path();

    info!("picdrop v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  API prefix: {}", config.api_prefix());
    info!("  Upload dir: {}", config.upload_dir.display());
    info!("  Upload path: {}", public_path);
    info!("  Max upload size: {} bytes", policy.max_bytes());
    info!("  Allowed types: {}", policy.allowed_types().join(", "));
    info!("  File fields: {}", fields.accepted().join(", "));
    info!("  Token TTL: {}s", config.token_ttl);
    match config.cors_origins {
        Some(ref origins) => info!("  CORS origins: {}", origins.join(", ")),
        None => info!("  CORS origins: any"),
    }

    // Storage directory is created once, here
    let storage = match UploadStorage::open(&config.upload_dir) {
        Ok(storage) => storage,
        Err(e) => {
            error!(
                "Failed to prepare upload directory {}: {}",
                config.upload_dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    let ingest = IngestService::new(storage, policy, fields);
    let router = create_router(ingest, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl -X POST http://{}{}/auth/login", addr, config.api_prefix());
    info!(
        "    curl -F file=@photo.png http://{}{}",
        addr, public_path
    );
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool, json: bool) {
    let env_filter = if verbose {
        "picdrop=debug,tower_http=debug"
    } else {
        "picdrop=info,tower_http=info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new(config.token_secret_or_empty())
        .with_api_version(config.api_version.clone())
        .with_upload_public_path(config.upload_public_path())
        .with_token_ttl(config.token_ttl());

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Token Command
// =============================================================================

fn run_token(config: TokenConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let auth = TokenAuth::new(&config.secret);
    let ttl = std::time::Duration::from_secs(config.ttl);
    let (token, expiry) = auth.issue(config.user_id, &config.role, ttl);

    match config.format {
        TokenOutputFormat::Token => {
            println!("{}", token);
        }
        TokenOutputFormat::Json => {
            let json = serde_json::json!({
                "token": token,
                "id": config.user_id,
                "role": config.role,
                "expiry": expiry,
                "ttl": config.ttl,
            });
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}
