use std::{net::TcpListener, sync::Arc};

use anyhow::Context;
use conduit::{
    cleanup::CleanupJob, config::AppConfig, init_db, make_router, run_app, seed_demo_data_in_db,
    AppState,
};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    if let Err(err) = bootstrap().await {
        tracing::error!(error = %err, "fatal error");
        eprintln!("fatal error: {err:#}");
        std::process::exit(1);
    }
}

async fn bootstrap() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let pool = init_db(config.database_url()).await?;

    if config.seed_demo_data() {
        seed_demo_data_in_db(&pool, config.demo_password()).await?;
    }

    let cleanup = if config.cleanup().enabled {
        let job = CleanupJob::new(pool.clone(), config.demo_password());
        Some(job.spawn(config.cleanup()))
    } else {
        None
    };

    let listener = TcpListener::bind(config.listen_addr())
        .with_context(|| format!("could not bind {}", config.listen_addr()))?;
    let state = Arc::new(AppState {
        pool: pool.clone(),
        config,
    });
    let served = run_app(make_router(), listener, state, shutdown_signal()).await;

    if let Some(handle) = cleanup {
        handle.shutdown().await;
    }
    pool.close().await;
    tracing::info!("database pool closed");
    served
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .ok()
        .unwrap_or_else(|| "info,tower_http=info,sqlx=warn".to_string());

    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(env_filter))
        .with(tracing_subscriber::fmt::layer());

    if subscriber.try_init().is_err() {
        tracing::warn!("tracing subscriber already initialised");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
