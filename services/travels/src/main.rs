use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use common::database::{DatabaseConfig, init_pool, run_migrations};
use travels::{
    config::TravelsConfig,
    lifecycle::TravelLifecycle,
    matching::MatchingEngine,
    notifier::{MailerNotifier, Notifier},
    routes,
    state::AppState,
    store::{Registry, RequestTravelStore, TravelStore, postgres::PgStore},
    sweeper::ExpirySweeper,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_max_level(Level::INFO)
        .init();

    info!("Starting travels service");

    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool, &MIGRATOR).await?;
    info!("Database migrations applied");

    let config = TravelsConfig::from_env();

    let store = Arc::new(PgStore::new(pool));
    let requests: Arc<dyn RequestTravelStore> = store.clone();
    let travels_store: Arc<dyn TravelStore> = store.clone();
    let registry: Arc<dyn Registry> = store;

    let notifier: Arc<dyn Notifier> = Arc::new(MailerNotifier::spawn(config.mailer_url.clone()));

    let matching = MatchingEngine::new(registry.clone(), travels_store.clone(), notifier.clone());
    let lifecycle = TravelLifecycle::new(registry.clone(), travels_store.clone(), notifier);

    let sweeper = ExpirySweeper::new(requests.clone());
    sweeper.start_schedule(&config.sweep_schedule).await?;

    let state = AppState {
        requests,
        travels: travels_store,
        registry,
        matching,
        lifecycle,
        config: config.clone(),
    };

    let app = routes::create_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Travels service listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
