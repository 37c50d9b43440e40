use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::core::retest::RetestConfig;
use crate::models::{Timeframe, TradingMode};

pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.json";

/// Documented stop-loss band (0.3% to 0.5%).
const STOP_LOSS_BAND: (f64, f64) = (0.003, 0.005);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub channel_username: String,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.channel_username.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Exchange
    #[serde(rename = "API_KEY", default)]
    pub api_key: String,
    #[serde(rename = "API_SECRET", default)]
    pub api_secret: String,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_timeframe")]
    pub timeframe: Timeframe,
    #[serde(default)]
    pub mode: TradingMode,
    #[serde(default = "default_quantity")]
    pub quantity: f64,

    // Strategy
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    pub retest_tolerance: f64,
    pub max_wait_candles: usize,
    #[serde(default = "default_stop_loss_percent")]
    pub stop_loss_percent: f64,
    #[serde(default)]
    pub allow_shorts: bool,

    // Driver
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default)]
    pub telegram: TelegramConfig,

    // Logging
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_timeframe() -> Timeframe {
    Timeframe::H1
}

fn default_quantity() -> f64 {
    0.001
}

fn default_lookback() -> usize {
    20
}

fn default_stop_loss_percent() -> f64 {
    0.003
}

fn default_history_limit() -> usize {
    300
}

fn default_poll_interval() -> u64 {
    60
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// `SETTINGS_PATH` if set, otherwise `config/settings.json`.
    pub fn settings_path() -> PathBuf {
        std::env::var("SETTINGS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SETTINGS_PATH))
    }

    /// Read the settings file, layer `.env` / environment overrides on top, validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let mut cfg = Self::from_json(&content)
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse settings JSON")
    }

    fn apply_env(&mut self) {
        let env = |key: &str| -> Option<String> {
            std::env::var(key).ok().filter(|v| !v.trim().is_empty())
        };

        if let Some(v) = env("BINANCE_API_KEY") {
            self.api_key = v;
        }
        if let Some(v) = env("BINANCE_API_SECRET") {
            self.api_secret = v;
        }
        if let Some(v) = env("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Some(v) = env("TELEGRAM_CHANNEL") {
            self.telegram.channel_username = v;
        }
        if let Some(v) = env("LOG_LEVEL") {
            self.log_level = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            bail!("symbol must not be empty");
        }
        if !(self.quantity.is_finite() && self.quantity > 0.0) {
            bail!("quantity must be positive, got {}", self.quantity);
        }
        if self.lookback == 0 {
            bail!("lookback must be at least 1");
        }
        if self.history_limit <= self.lookback {
            bail!(
                "history_limit ({}) must exceed lookback ({})",
                self.history_limit,
                self.lookback
            );
        }
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be at least 1");
        }
        self.retest_config()
            .validate()
            .context("Invalid strategy settings")?;
        Ok(())
    }

    /// Settings that are valid but unusual. Logged by the caller once
    /// tracing is installed, since `load` runs before that.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        let (lo, hi) = STOP_LOSS_BAND;
        if self.stop_loss_percent < lo || self.stop_loss_percent > hi {
            out.push(format!(
                "stop_loss_percent {:.4} is outside the usual {:.1}%-{:.1}% band",
                self.stop_loss_percent,
                lo * 100.0,
                hi * 100.0
            ));
        }
        out
    }

    /// Emit `warnings()` through tracing.
    pub fn log_warnings(&self) {
        for w in self.warnings() {
            warn!("{}", w);
        }
    }

    pub fn retest_config(&self) -> RetestConfig {
        RetestConfig {
            retest_tolerance: self.retest_tolerance,
            max_wait_candles: self.max_wait_candles,
            stop_loss_percent: self.stop_loss_percent,
            allow_shorts: self.allow_shorts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{ "retest_tolerance": 0.003, "max_wait_candles": 6 }"#;

    #[test]
    fn minimal_settings_take_defaults() {
        let cfg = Config::from_json(MINIMAL).unwrap();
        assert_eq!(cfg.symbol, "BTCUSDT");
        assert_eq!(cfg.timeframe, Timeframe::H1);
        assert_eq!(cfg.mode, TradingMode::Demo);
        assert_eq!(cfg.lookback, 20);
        assert!((cfg.stop_loss_percent - 0.003).abs() < 1e-12);
        assert!((cfg.quantity - 0.001).abs() < 1e-12);
        assert!(!cfg.allow_shorts);
        assert!(!cfg.telegram.is_configured());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn full_settings_parse() {
        let json = r#"{
            "API_KEY": "key",
            "API_SECRET": "secret",
            "symbol": "ETHUSDT",
            "timeframe": "15m",
            "mode": "testnet",
            "quantity": 0.05,
            "stop_loss_percent": 0.004,
            "lookback": 30,
            "retest_tolerance": 0.002,
            "max_wait_candles": 8,
            "allow_shorts": true,
            "telegram": { "bot_token": "123:abc", "channel_username": "https://t.me/signals" }
        }"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.api_key, "key");
        assert_eq!(cfg.timeframe, Timeframe::M15);
        assert_eq!(cfg.mode, TradingMode::Testnet);
        assert!(cfg.telegram.is_configured());

        let rc = cfg.retest_config();
        assert_eq!(rc.max_wait_candles, 8);
        assert!((rc.retest_tolerance - 0.002).abs() < 1e-12);
        assert!(rc.allow_shorts);
    }

    #[test]
    fn tolerance_and_timeout_are_required() {
        assert!(Config::from_json(r#"{ "max_wait_candles": 6 }"#).is_err());
        assert!(Config::from_json(r#"{ "retest_tolerance": 0.003 }"#).is_err());
    }

    #[test]
    fn unsupported_timeframe_rejected() {
        let json = r#"{ "timeframe": "1w", "retest_tolerance": 0.003, "max_wait_candles": 6 }"#;
        assert!(Config::from_json(json).is_err());
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut cfg = Config::from_json(MINIMAL).unwrap();
        cfg.max_wait_candles = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::from_json(MINIMAL).unwrap();
        cfg.stop_loss_percent = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::from_json(MINIMAL).unwrap();
        cfg.quantity = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::from_json(MINIMAL).unwrap();
        cfg.history_limit = 10;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::from_json(MINIMAL).unwrap();
        cfg.stop_loss_percent = 0.6;
        assert!(cfg.validate().is_ok());
        cfg.allow_shorts = true;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn stop_loss_outside_band_is_warned_not_rejected() {
        let mut cfg = Config::from_json(MINIMAL).unwrap();
        assert!(cfg.warnings().is_empty());

        cfg.stop_loss_percent = 0.01;
        assert!(cfg.validate().is_ok());
        let warnings = cfg.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("stop_loss_percent"));
    }
}
