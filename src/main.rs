use anyhow::Context;
use gym_portal::api::routes::create_routes;
use gym_portal::config::{database::run_migrations, AppConfig, DatabaseConfig, DatabaseSeeder};
use gym_portal::services::BackgroundJobService;
use gym_portal::telemetry::init_tracing;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.log_level);

    let database = DatabaseConfig::from_env()?;
    let db = database
        .create_pool()
        .await
        .context("Failed to connect to the database")?;

    if config.run_migrations {
        run_migrations(&db).await.context("Failed to run migrations")?;
        info!("Database migrations applied");
    }

    if config.seed_demo_data {
        DatabaseSeeder::new(db.clone()).seed_all().await?;
    }

    let jobs = BackgroundJobService::new(db.clone()).await?;
    jobs.start().await?;

    let app = create_routes(db, &config)?;

    let address = config.server_address();
    let listener = TcpListener::bind(&address).await?;
    info!(environment = %config.environment, "Gym portal listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = jobs.stop().await {
        warn!(error = %e, "Background jobs did not stop cleanly");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
