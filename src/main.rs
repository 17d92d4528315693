// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Instagram-Feed API Server
//!
//! Serves cached Instagram feeds and handles the OAuth redirect that
//! connects a profile to an Instagram account.

use instagram_feed::{
    config::Config,
    db::{FirestoreDb, MemoryStore},
    services::LogNotifier,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        ignore_video = config.ignore_video,
        feed_limit = config.feed_limit,
        "Starting Instagram-Feed API"
    );
    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN is not set; admin and task routes are disabled");
    }

    let notifier = Arc::new(LogNotifier);
    let state = match &config.gcp_project_id {
        Some(project_id) => {
            let db = Arc::new(FirestoreDb::new(project_id).await?);
            AppState::new(config.clone(), db.clone(), db.clone(), db, notifier)?
        }
        None => {
            tracing::warn!("GCP_PROJECT_ID is not set; using in-memory storage");
            let store = Arc::new(MemoryStore::new());
            AppState::new(config.clone(), store.clone(), store.clone(), store, notifier)?
        }
    };

    tracing::info!(callback = %config.callback_url(), "OAuth redirect URI");

    let app = instagram_feed::routes::create_router(Arc::new(state));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("instagram_feed=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
