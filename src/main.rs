use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use settlement_core::adapters::PostgresLedgerStore;
use settlement_core::cli::{self, Cli, Commands, DbCommands, TxCommands};
use settlement_core::config::{Config, LogFormat};
use settlement_core::gateway::{GatewayCredentials, MobileMoneyClient};
use settlement_core::services::SignatureVerifier;
use settlement_core::{cors_layer, create_app, db, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    init_tracing(config.log_format);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Db(DbCommands::Migrate) => cli::handle_db_migrate(&config).await,
        Commands::Tx(TxCommands::Status { reference }) => {
            let pool = db::create_pool(&config).await?;
            cli::handle_tx_status(&PostgresLedgerStore::new(pool), &reference).await
        }
        Commands::Config => cli::handle_config_validate(&config),
    }
}

fn init_tracing(format: LogFormat) {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    );

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    // Database pool
    let pool = db::create_pool(&config).await?;
    db::run_migrations(&pool, db::MIGRATIONS_DIR).await?;

    let gateway = MobileMoneyClient::new(
        config.gateway_base_url.clone(),
        GatewayCredentials {
            client_id: config.gateway_client_id.clone(),
            client_secret: config.gateway_client_secret.clone(),
        },
        config.runtime_mode,
        config.gateway_timeout,
    );
    tracing::info!(
        gateway_url = %config.gateway_base_url,
        mode = %config.runtime_mode,
        timeout_secs = config.gateway_timeout.as_secs(),
        "Mobile-money gateway client initialized"
    );

    let app_state = AppState {
        ledger: Arc::new(PostgresLedgerStore::new(pool)),
        gateway: Arc::new(gateway),
        verifier: SignatureVerifier::new(&config.webhook_secret),
    };

    let app = create_app(app_state).layer(cors_layer(&config.allowed_origins));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
