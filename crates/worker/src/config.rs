use std::time::Duration;

use anyhow::Context;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Postgres connection string. Required.
    pub database_url: String,
    /// Prediction API base URL (default: `https://api.wavespeed.ai/api/v3`).
    pub provider_url: String,
    /// Prediction API key. Required.
    pub provider_key: String,
    /// Stage-1 scan interval (default: 30s).
    pub submitted_interval: Duration,
    /// Stage-2 scan interval (default: 30s).
    pub upscaling_interval: Duration,
    /// Records pulled per scan tick (default: 20).
    pub batch_size: i64,
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let provider_url = std::env::var("WAVESPEED_URL")
            .unwrap_or_else(|_| "https://api.wavespeed.ai/api/v3".into());
        let provider_key = std::env::var("WAVESPEED_KEY").context("WAVESPEED_KEY must be set")?;

        let submitted_interval = secs_var("SUBMITTED_SCAN_SECS", 30)?;
        let upscaling_interval = secs_var("UPSCALING_SCAN_SECS", 30)?;
        let batch_size = std::env::var("SCAN_BATCH_SIZE")
            .unwrap_or_else(|_| "20".into())
            .parse()
            .context("SCAN_BATCH_SIZE must be an integer")?;

        Ok(Self {
            database_url,
            provider_url,
            provider_key,
            submitted_interval,
            upscaling_interval,
            batch_size,
        })
    }
}

fn secs_var(name: &str, default: u64) -> anyhow::Result<Duration> {
    let secs: u64 = std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("{name} must be a number of seconds"))?;
    Ok(Duration::from_secs(secs))
}
