use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{Extension, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::routes;
use crate::services::auth::{AuthEngine, EngineOptions};
use crate::services::database::DatabaseLayer;
use crate::services::email::EmailLayer;
use crate::services::objects::FsObjectStore;
use crate::setup::Config;
use crate::utils::token::TokenCodec;

pub async fn setup_api_router(
    config: Config,
    database_layer: DatabaseLayer,
    email_layer: EmailLayer,
) -> std::io::Result<(Router, TcpListener)> {
    let codec = TokenCodec::new(
        config.access_token_secret.clone(),
        config.refresh_token_secret.clone(),
    );

    let objects = FsObjectStore::new(
        PathBuf::from(&config.avatar_dir),
        config.avatar_base_url.clone(),
    );

    let engine = AuthEngine::new(
        Arc::new(database_layer),
        Arc::new(email_layer),
        Arc::new(objects),
        codec,
        EngineOptions {
            hash_secret: config.hashing_secret.clone(),
            otp_ttl_minutes: config.otp_exp_minutes,
            otp_daily_cap: config.max_otp_requests_per_day,
            access_ttl_minutes: config.access_token_exp_minutes,
            refresh_ttl_days: config.refresh_token_exp_days,
            admin_emails: config.admin_emails.clone(),
        },
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let app = routes::main_router()
        .layer(Extension(Arc::new(engine)))
        .layer(Extension(Arc::new(config)))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(addr).await?;

    Ok((app, listener))
}
