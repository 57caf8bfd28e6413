use elobot::history::{
    GameHistoryRepository, InMemoryGameHistoryRepository, PostgresGameHistoryRepository,
};
use elobot::player::{InMemoryPlayerRepository, PlayerRepository, PostgresPlayerRepository};
use elobot::roster::{InMemoryMemberDirectory, MemberDirectory};
use elobot::session::start_cleanup_task;
use elobot::{build_router, build_state, AppConfig};
use std::error::Error;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Stores = (
    Arc<dyn PlayerRepository + Send + Sync>,
    Arc<dyn GameHistoryRepository + Send + Sync>,
);

async fn open_stores(config: &AppConfig) -> Result<Stores, Box<dyn Error>> {
    let Some(database_url) = config.database_url.as_deref() else {
        warn!("DATABASE_URL not set, ratings and history will not survive a restart");
        return Ok((
            Arc::new(InMemoryPlayerRepository::new()),
            Arc::new(InMemoryGameHistoryRepository::new()),
        ));
    };

    let pool = sqlx::PgPool::connect(database_url).await?;
    let players = PostgresPlayerRepository::new(pool.clone());
    players.ensure_schema().await?;
    let history = PostgresGameHistoryRepository::new(pool);
    history.ensure_schema().await?;
    info!("Connected to PostgreSQL");

    Ok((Arc::new(players), Arc::new(history)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "elobot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Elo matchmaking bot");

    let config = AppConfig::from_env()?;
    let (players, history) = open_stores(&config).await?;
    let directory: Arc<dyn MemberDirectory + Send + Sync> = Arc::new(InMemoryMemberDirectory::new());

    let app_state = build_state(&config, players, history, directory);

    if let Some(cleanup) = config.cleanup.clone() {
        tokio::spawn(start_cleanup_task(
            Arc::clone(app_state.command_router.sessions()),
            cleanup,
        ));
    }

    let added = app_state.command_router.roster().sync_all().await?;
    info!(added, "Startup roster sync finished");

    let app = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
