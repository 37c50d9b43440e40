use anyhow::{Context, Result};
use std::path::Path;
use time::macros::format_description;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

pub const LOG_FILE: &str = "trades.log";

/// Console plus `<log_dir>/trades.log`. `RUST_LOG` wins over the configured level.
pub fn init(cfg: &Config) -> Result<()> {
    std::fs::create_dir_all(&cfg.log_dir)
        .with_context(|| format!("Failed to create log dir {}", cfg.log_dir))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
            cfg.log_level.to_lowercase()
        ))
    });

    let console_layer = fmt::layer()
        .with_target(false)
        .with_timer(UtcTime::rfc_3339());

    let file_appender = tracing_appender::rolling::never(&cfg.log_dir, LOG_FILE);
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_target(false)
        .with_ansi(false)
        .with_timer(UtcTime::new(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        )));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        "Logging to {}",
        Path::new(&cfg.log_dir).join(LOG_FILE).display()
    );
    Ok(())
}
