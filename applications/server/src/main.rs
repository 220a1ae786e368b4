/// Segment Server - user segment membership service
use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use segment_core::{MembershipEngine, Percentage, UserId};
use segment_server::{config::ServerConfig, create_router, shutdown::shutdown_signal, AppState};
use segment_storage::{memberships, segments, users, LocalMembershipEngine};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "segment-server")]
#[command(about = "User segment membership service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Configuration file path
        #[arg(short, long, env = "SEGMENTS_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Apply database migrations and exit
    Migrate {
        /// Configuration file path
        #[arg(short, long, env = "SEGMENTS_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Create a segment from the command line
    AddSegment {
        /// Segment slug
        #[arg(short, long)]
        slug: String,
        /// Percentage of existing users to enroll (0-100)
        #[arg(short, long, default_value_t = 0)]
        percentage: u32,
        /// Configuration file path
        #[arg(short, long, env = "SEGMENTS_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Print a user's registration and every ledger row
    ShowUser {
        /// User id
        #[arg(short, long)]
        user_id: u64,
        /// Configuration file path
        #[arg(short, long, env = "SEGMENTS_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Print the live segment with a slug
    ShowSegment {
        /// Segment slug
        #[arg(short, long)]
        slug: String,
        /// Configuration file path
        #[arg(short, long, env = "SEGMENTS_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "segment_server=info,segment_storage=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            serve(config.as_deref()).await?;
        }
        Commands::Migrate { config } => {
            migrate(config.as_deref()).await?;
        }
        Commands::AddSegment {
            slug,
            percentage,
            config,
        } => {
            add_segment(config.as_deref(), &slug, percentage).await?;
        }
        Commands::ShowUser { user_id, config } => {
            show_user(config.as_deref(), user_id).await?;
        }
        Commands::ShowSegment { slug, config } => {
            show_segment(config.as_deref(), &slug).await?;
        }
    }

    Ok(())
}

async fn serve(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    tracing::info!("Starting Segment Server");
    tracing::info!("Host: {}", config.server.host);
    tracing::info!("Port: {}", config.server.port);

    let engine = open_engine(&config).await?;
    tracing::info!("Database connected");

    let app_state = AppState::new(Arc::new(engine));
    let app = create_router(app_state);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .with_context(|| format!("invalid host {}", config.server.host))?,
        config.server.port,
    ));

    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");

    Ok(())
}

async fn migrate(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    open_engine(&config).await?;

    println!("Migrations applied to {}", config.storage.database_url);

    Ok(())
}

async fn add_segment(config_path: Option<&Path>, slug: &str, percentage: u32) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let engine = open_engine(&config).await?;

    let slug = slug.trim();
    anyhow::ensure!(!slug.is_empty(), "slug must not be empty");
    let percentage = Percentage::new(percentage)?;

    let enrollment = engine.create_segment(slug, percentage).await?;

    println!(
        "Segment {} created ({} users enrolled)",
        enrollment.segment.slug, enrollment.enrolled
    );

    Ok(())
}

async fn show_user(config_path: Option<&Path>, user_id: u64) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let engine = open_engine(&config).await?;
    let user_id = UserId::try_from(user_id)?;

    let mut conn = engine.pool().acquire().await?;
    let user = users::get_by_id(&mut conn, user_id)
        .await?
        .with_context(|| format!("user {user_id} not found"))?;
    let ledger = memberships::list_for_user(&mut conn, user_id).await?;

    println!("User {} registered at {}", user.id, user.created_at.to_rfc3339());

    let now = Utc::now();
    for membership in ledger {
        let state = if membership.is_active_at(now) {
            "active"
        } else {
            "closed"
        };
        let deleted_at = membership
            .deleted_at
            .map_or_else(|| "-".to_string(), |at| at.to_rfc3339());
        println!(
            "  segment {:<6} {:<6} since {} until {}",
            membership.segment_id,
            state,
            membership.created_at.to_rfc3339(),
            deleted_at
        );
    }

    Ok(())
}

async fn show_segment(config_path: Option<&Path>, slug: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let engine = open_engine(&config).await?;

    let mut conn = engine.pool().acquire().await?;
    let segment = segments::get_by_slug(&mut conn, slug.trim())
        .await?
        .with_context(|| format!("segment {slug} not found"))?;

    println!(
        "Segment {} (id {}) created at {}",
        segment.slug,
        segment.id,
        segment.created_at.to_rfc3339()
    );

    Ok(())
}

fn load_config(config_path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    let config = ServerConfig::load(config_path)?;
    config.validate()?;
    Ok(config)
}

async fn open_engine(config: &ServerConfig) -> anyhow::Result<LocalMembershipEngine> {
    ensure_database_dir(&config.storage.database_url)?;

    let database_url = &config.storage.database_url;
    let engine = LocalMembershipEngine::connect(database_url, &config.storage.pool_settings())
        .await
        .with_context(|| format!("failed to open {database_url}"))?;

    Ok(engine)
}

/// `SQLite` creates the file but not its parent directory
fn ensure_database_dir(database_url: &str) -> anyhow::Result<()> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);

    if path.is_empty() || path.contains(":memory:") {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    Ok(())
}
