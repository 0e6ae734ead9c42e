// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::exit;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use journal_server::api::router;
use journal_server::auth::TokenService;
use journal_server::config::Config;
use journal_server::providers::{AdviceClient, UploadClient};
use journal_server::state::AppState;
use journal_server::storage::Database;

const DB_FILE_NAME: &str = "journal.redb";

#[tokio::main]
async fn main() {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration error");
            exit(1);
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        error!(error = %e, path = %config.data_dir.display(), "cannot create data directory");
        exit(1);
    }

    let db_path = config.data_dir.join(DB_FILE_NAME);
    let db = match Database::open(&db_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!(error = %e, path = %db_path.display(), "cannot open database");
            exit(1);
        }
    };
    info!(path = %db_path.display(), "Database open");

    let tokens = TokenService::new(
        &config.access_secret,
        &config.refresh_secret,
        config.access_ttl_secs,
        config.refresh_ttl_secs,
    );

    let mut state = AppState::new(db, tokens);

    // Providers are optional; an unset credential disables the feature
    if AdviceClient::is_configured() {
        match AdviceClient::from_env() {
            Ok(client) => {
                info!("AI advice enabled (Gemini)");
                state = state.with_advice(client);
            }
            Err(e) => warn!(error = %e, "AI advice disabled"),
        }
    } else {
        info!("GEMINI_API_KEY not set; AI advice disabled");
    }

    if UploadClient::is_configured() {
        match UploadClient::from_env() {
            Ok(client) => {
                info!("File uploads enabled (Uploadcare)");
                state = state.with_uploads(client);
            }
            Err(e) => warn!(error = %e, "file uploads disabled"),
        }
    } else {
        info!("UPLOADCARE_PUBLIC_KEY not set; file uploads disabled");
    }

    let app = router(state);

    let addr = config.bind_addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, address = %addr, "cannot bind listener");
            exit(1);
        }
    };
    info!(address = %addr, "Journal server listening (docs at /docs)");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error");
        exit(1);
    }
    info!("Shutdown complete");
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("pretty") => tracing_subscriber::fmt().with_env_filter(filter).init(),
        _ => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT");
        }
    }
}
