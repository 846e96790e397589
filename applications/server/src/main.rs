/// Refrain Server - per-user music queue service
use clap::{Parser, Subcommand};
use refrain_core::EventProducer;
use refrain_messaging::{BrokerConfig, HttpProducer, LoggingProducer};
use refrain_server::{config::ServerConfig, create_router, state::AppState};
use sqlx::SqlitePool;
use std::{net::SocketAddr, path::Path, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "refrain-server")]
#[command(about = "Refrain per-user music queue service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server and ingress workers
    Serve,
    /// Create a new user and their queue
    AddUser {
        /// Username
        #[arg(short, long)]
        username: String,
        /// Identity in the upstream auth system
        #[arg(short, long)]
        external_id: Option<String>,
    },
    /// List all users
    ListUsers,
    /// Purge songs that never received a url
    Cleanup,
    /// Mint an access token for a user
    IssueToken {
        /// Username
        #[arg(short, long)]
        username: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "refrain_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => serve().await?,
        Commands::AddUser {
            username,
            external_id,
        } => add_user(&username, external_id.as_deref()).await?,
        Commands::ListUsers => list_users().await?,
        Commands::Cleanup => cleanup().await?,
        Commands::IssueToken { username } => issue_token(&username).await?,
    }

    Ok(())
}

async fn serve() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;
    config.validate()?;

    tracing::info!("Starting Refrain Server");
    tracing::info!("Host: {}", config.server.host);
    tracing::info!("Port: {}", config.server.port);

    let pool = open_database(&config).await?;
    tracing::info!("Database connected");

    let producer = build_producer(&config)?;
    let app_state = AppState::new(pool, producer, &config);

    let report = app_state.reconciler().run().await?;
    tracing::info!(
        created_default_user = report.created_default_user,
        purged = report.purged_songs,
        failed = report.failed_songs,
        "Startup reconciliation complete"
    );

    app_state.ingress_queue.start();
    tracing::info!(
        "Ingress queue started with {} workers",
        config.ingress.workers
    );

    let app = create_router(app_state);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// HTTP producer when a broker is configured, otherwise log-only
fn build_producer(config: &ServerConfig) -> anyhow::Result<Arc<dyn EventProducer>> {
    let messaging = &config.messaging;

    match messaging.broker_url.as_deref() {
        Some(url) => {
            let broker = BrokerConfig::new(url)
                .with_topics(messaging.topics.clone())
                .with_timeout(messaging.request_timeout());
            let producer = HttpProducer::new(broker)?;
            tracing::info!("Publishing to broker at {}", producer.url());
            Ok(Arc::new(producer))
        }
        None => {
            tracing::warn!("No broker configured, outbound messages will only be logged");
            Ok(Arc::new(LoggingProducer::new(messaging.topics.clone())))
        }
    }
}

async fn open_database(config: &ServerConfig) -> anyhow::Result<SqlitePool> {
    let database_url = &config.storage.database_url;

    if let Some(parent) = database_url
        .strip_prefix("sqlite://")
        .and_then(|path| Path::new(path).parent())
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let pool = refrain_storage::create_pool(database_url).await?;
    refrain_storage::run_migrations(&pool).await?;
    Ok(pool)
}

/// State for one-shot commands; nothing is published from them
async fn offline_state() -> anyhow::Result<(ServerConfig, AppState)> {
    let config = ServerConfig::load()?;
    let pool = open_database(&config).await?;
    let producer: Arc<dyn EventProducer> =
        Arc::new(LoggingProducer::new(config.messaging.topics.clone()));
    let state = AppState::new(pool, producer, &config);
    Ok((config, state))
}

async fn add_user(username: &str, external_id: Option<&str>) -> anyhow::Result<()> {
    let (_, state) = offline_state().await?;

    let user = state.directory.create_user(username, external_id).await?;
    println!("Created user {} ({})", user.username, user.id);

    Ok(())
}

async fn list_users() -> anyhow::Result<()> {
    let (_, state) = offline_state().await?;

    let users = state.directory.list_users().await?;

    println!("Users:");
    for user in users {
        match user.external_id {
            Some(external_id) => println!("  {} - {} [{}]", user.id, user.username, external_id),
            None => println!("  {} - {}", user.id, user.username),
        }
    }

    Ok(())
}

async fn cleanup() -> anyhow::Result<()> {
    let (_, state) = offline_state().await?;

    let report = state.reconciler().purge_invalid_songs().await?;
    println!(
        "Purged {} invalid songs ({} failed)",
        report.purged_songs, report.failed_songs
    );

    Ok(())
}

async fn issue_token(username: &str) -> anyhow::Result<()> {
    let (config, state) = offline_state().await?;
    config.validate()?;

    let user = state.directory.get_by_username(username).await?;
    let token = state.auth_service.create_access_token(&user.username)?;
    println!("{token}");

    Ok(())
}
