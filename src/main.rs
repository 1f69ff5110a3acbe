mod auth;
mod config;
mod db;
mod entities;
mod error;
mod membership;
mod models;
mod notify;
mod registry;
mod reviews;
mod routes;
mod schedule;
mod sweep;
#[cfg(test)]
mod testing;
mod tmdb;
mod users;
mod validation;

use std::{sync::Arc, time::Duration};

use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::Config,
    notify::{LogNotifier, Notifier, WebhookNotifier},
    sweep::ReminderSweep,
    tmdb::TmdbClient,
};

pub struct AppState {
    pub db: DatabaseConnection,
    pub tmdb: Arc<TmdbClient>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,mediadex=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let http = reqwest::Client::builder()
        .user_agent("mediadex/0.1")
        .timeout(Duration::from_secs(config.tmdb_timeout_secs))
        .build()?;

    let db = db::connect_and_migrate(&config.database_url).await?;

    if let Some(token) = &config.bootstrap_admin_token {
        users::ensure_admin(&db, token).await?;
    }

    let tmdb = TmdbClient::new(
        http.clone(),
        config.tmdb_access_token.clone(),
        config.tmdb_base_url.clone(),
        config.tmdb_language.clone(),
        config.tmdb_rps,
    );

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(http.clone(), url.clone())),
        None => Arc::new(LogNotifier),
    };
    Arc::new(ReminderSweep::new(db.clone(), notifier))
        .spawn(Duration::from_secs(config.reminder_interval_secs.max(1)));

    let state = Arc::new(AppState { db, tmdb: Arc::new(tmdb) });

    let app = routes::router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
