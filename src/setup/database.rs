use crate::services::database::DatabaseLayer;
use crate::setup::Config;

pub async fn setup_database(config: &Config) -> surrealdb::Result<DatabaseLayer> {
    let database_layer = DatabaseLayer::new(
        config.surreal_username.clone(),
        config.surreal_password.clone(),
        config.surreal_url.clone(),
        config.surreal_namespace.clone(),
        config.surreal_database.clone(),
    )
    .await?;

    database_layer.initialize_schemas().await?;

    Ok(database_layer)
}
