use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::de::IgnoredAny;
use serde::Deserialize;
use sha2::Sha256;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::config::Config;
use crate::exchange::{Exchange, OrderAck, OrderRequest};
use crate::models::{Candle, CandleSeries, Timeframe, TradingMode};

const MAINNET_URL: &str = "https://api.binance.com";
const TESTNET_URL: &str = "https://testnet.binance.vision";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);
const RECV_WINDOW_MS: u64 = 5000;
const MAX_KLINES: usize = 1000;

type HmacSha256 = Hmac<Sha256>;

/// One kline row: open time and OHLCV as strings. Close time onwards is ignored.
#[derive(Debug, Deserialize)]
struct RawKline(
    i64,
    String,
    String,
    String,
    String,
    String,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
    IgnoredAny,
);

impl RawKline {
    fn into_candle(self) -> Option<Candle> {
        Some(Candle {
            timestamp: DateTime::from_timestamp_millis(self.0)?,
            open: self.1.parse().ok()?,
            high: self.2.parse().ok()?,
            low: self.3.parse().ok()?,
            close: self.4.parse().ok()?,
            volume: self.5.parse().ok()?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: Option<u64>,
    status: Option<String>,
}

/// HMAC-SHA256 of the query string, hex encoded.
pub fn sign_query(query: &str, secret: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow!("Invalid API secret: {}", e))?;
    mac.update(query.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn parse_klines(body: &str) -> Result<CandleSeries> {
    let rows: Vec<RawKline> = serde_json::from_str(body).context("Failed to parse klines")?;
    let mut candles: Vec<Candle> = rows.into_iter().filter_map(RawKline::into_candle).collect();
    candles.sort_by_key(|c| c.timestamp);
    Ok(CandleSeries::new(candles))
}

/// Binance spot REST client.
///
/// `Demo` reads production data and sends orders to the test endpoint, so
/// nothing fills. `Testnet` does everything against the sandbox.
pub struct BinanceClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    symbol: String,
    mode: TradingMode,
    last_request: Option<Instant>,
}

impl BinanceClient {
    pub fn new(cfg: &Config) -> Self {
        let base_url = match cfg.mode {
            TradingMode::Demo => MAINNET_URL,
            TradingMode::Testnet => TESTNET_URL,
        };
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
            api_key: cfg.api_key.clone(),
            api_secret: cfg.api_secret.clone(),
            symbol: cfg.symbol.clone(),
            mode: cfg.mode,
            last_request: None,
        }
    }

    pub fn mode(&self) -> TradingMode {
        self.mode
    }

    async fn rate_limit(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }

    pub async fn fetch_ohlcv(&mut self, timeframe: Timeframe, limit: usize) -> Result<CandleSeries> {
        self.rate_limit().await;

        let limit = limit.clamp(1, MAX_KLINES);
        let resp = self
            .client
            .get(format!("{}/api/v3/klines", self.base_url))
            .query(&[
                ("symbol", self.symbol.clone()),
                ("interval", timeframe.binance_interval().to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .context("Failed to fetch klines")?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("Binance klines error {}: {}", status, body);
        }

        let series = parse_klines(&body)?;
        debug!("Fetched {} {} candles for {}", series.len(), timeframe, self.symbol);
        Ok(series)
    }

    pub async fn submit_order(&mut self, order: &OrderRequest) -> Result<OrderAck> {
        if self.api_key.is_empty() || self.api_secret.is_empty() {
            anyhow::bail!("Binance API credentials are not configured");
        }
        self.rate_limit().await;

        let test = self.mode == TradingMode::Demo;
        let path = if test {
            "/api/v3/order/test"
        } else {
            "/api/v3/order"
        };

        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
        let query = format!(
            "symbol={}&side={}&type=MARKET&quantity={}&recvWindow={}&timestamp={}",
            order.symbol, order.side, order.quantity, RECV_WINDOW_MS, timestamp
        );
        let signature = sign_query(&query, &self.api_secret)?;

        let resp = self
            .client
            .post(format!(
                "{}{}?{}&signature={}",
                self.base_url, path, query, signature
            ))
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .context("Failed to submit order")?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("Binance order error {}: {}", status, body);
        }

        // The test endpoint answers with `{}`.
        let parsed: OrderResponse =
            serde_json::from_str(&body).context("Failed to parse order response")?;

        Ok(OrderAck {
            order_id: parsed.order_id,
            status: parsed
                .status
                .unwrap_or_else(|| if test { "TEST_OK" } else { "UNKNOWN" }.to_string()),
            test,
        })
    }
}

#[async_trait]
impl Exchange for BinanceClient {
    async fn fetch_ohlcv(&mut self, tf: Timeframe, limit: usize) -> Result<CandleSeries> {
        self.fetch_ohlcv(tf, limit).await
    }

    async fn submit_order(&mut self, order: &OrderRequest) -> Result<OrderAck> {
        self.submit_order(order).await
    }
}
