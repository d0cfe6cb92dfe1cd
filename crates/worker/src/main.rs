//! Background worker: runs the reconciliation scans against the
//! prediction provider until interrupted.

mod config;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidpipe_pipeline::{PgRecordStore, ReconciliationScheduler, SchedulerOptions};
use vidpipe_providers::client::PredictionClient;
use vidpipe_providers::upscaler::UpscalerProClient;
use vidpipe_providers::wan26::Wan26Client;

use crate::config::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidpipe_worker=debug,vidpipe_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env()?;
    tracing::info!("Worker starting");

    let pool = vidpipe_db::connect(&config.database_url).await?;
    let store = Arc::new(PgRecordStore::new(pool));

    let http = reqwest::Client::new();
    let generator = Arc::new(Wan26Client::new(PredictionClient::with_client(
        http.clone(),
        &config.provider_url,
        &config.provider_key,
    )));
    let upscaler = Arc::new(UpscalerProClient::new(PredictionClient::with_client(
        http,
        &config.provider_url,
        &config.provider_key,
    )));

    let scheduler = Arc::new(ReconciliationScheduler::new(
        store,
        generator,
        upscaler,
        SchedulerOptions {
            submitted_interval: config.submitted_interval,
            upscaling_interval: config.upscaling_interval,
            batch_size: config.batch_size,
        },
    ));

    let cancel = CancellationToken::new();
    let submitted = tokio::spawn(Arc::clone(&scheduler).run_submitted_loop(cancel.clone()));
    let upscaling = tokio::spawn(Arc::clone(&scheduler).run_upscaling_loop(cancel.clone()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    cancel.cancel();

    let _ = submitted.await;
    let _ = upscaling.await;
    tracing::info!("Worker stopped");
    Ok(())
}
