mod errors;
mod routes;
mod services;
mod setup;
mod utils;

use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use setup::{setup_api_router, setup_database, setup_email_service, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;

    let database_layer = setup_database(&config).await?;
    info!(
        namespace = %database_layer.namespace,
        database = %database_layer.database,
        "database ready"
    );

    let email_layer = setup_email_service(&config);

    let (app, listener) = setup_api_router(config, database_layer, email_layer).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
