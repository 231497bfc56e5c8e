//! Price history retrieval from a Yahoo-compatible chart endpoint.
//!
//! The provider answers a single-symbol query with a nested column layout
//! (parallel arrays per field under `indicators.quote`). The fetcher's
//! contract is to flatten that into one row per trading day keyed by
//! calendar date before anything downstream sees it.

use crate::config::{HttpConfig, MarketDataConfig};
use crate::http::HttpClient;
use crate::models::{Fetched, Period, PriceRow, PriceTable};
use anyhow::Result;
use chrono::DateTime;
use serde::Deserialize;
use tracing::{debug, warn};

// ── Provider response shape ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    pub timestamp: Option<Vec<i64>>,
    pub indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
pub struct ChartIndicators {
    pub quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
pub struct ChartQuote {
    pub open: Option<Vec<Option<f64>>>,
    pub high: Option<Vec<Option<f64>>>,
    pub low: Option<Vec<Option<f64>>>,
    pub close: Option<Vec<Option<f64>>>,
    pub volume: Option<Vec<Option<i64>>>,
}

// ── Flattening ────────────────────────────────────────────────────────────────

/// Collapse the provider's per-field arrays into flat date-keyed rows.
/// Rows without a usable close (halted days, pre-listing padding) are dropped.
pub fn flatten_chart(symbol: &str, result: ChartResult) -> Vec<PriceRow> {
    let Some(timestamps) = result.timestamp else {
        return vec![];
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return vec![];
    };

    let opens = quote.open.unwrap_or_default();
    let highs = quote.high.unwrap_or_default();
    let lows = quote.low.unwrap_or_default();
    let closes = quote.close.unwrap_or_default();
    let volumes = quote.volume.unwrap_or_default();

    let mut rows = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(close) = closes.get(i).copied().flatten() else {
            continue;
        };
        if close <= 0.0 {
            continue;
        }
        let Some(date) = DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()) else {
            warn!("{}: unrepresentable timestamp {}", symbol, ts);
            continue;
        };

        rows.push(PriceRow {
            date,
            open: opens.get(i).copied().flatten(),
            high: highs.get(i).copied().flatten(),
            low: lows.get(i).copied().flatten(),
            close,
            volume: volumes.get(i).copied().flatten(),
            ma20: None,
            daily_change: None,
        });
    }
    rows
}

/// Turn a decoded provider response into the tagged result callers consume.
pub fn table_from_response(symbol: &str, resp: ChartResponse) -> Fetched<PriceTable> {
    if let Some(err) = resp.chart.error {
        return Fetched::Failed(format!("{}: {}", err.code, err.description));
    }

    let Some(result) = resp.chart.result.and_then(|r| r.into_iter().next()) else {
        return Fetched::Empty;
    };

    let rows = flatten_chart(symbol, result);
    if rows.is_empty() {
        Fetched::Empty
    } else {
        Fetched::Data(PriceTable::new(symbol, rows))
    }
}

// ── Fetcher ───────────────────────────────────────────────────────────────────

pub struct PriceHistoryFetcher {
    client: HttpClient,
    config: MarketDataConfig,
}

impl PriceHistoryFetcher {
    pub fn new(http: &HttpConfig, config: &MarketDataConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(http)?,
            config: config.clone(),
        })
    }

    fn chart_url(&self, ticker: &str, period: Period) -> String {
        format!(
            "{}/{}?range={}&interval={}&includePrePost=false",
            self.config.base_url.trim_end_matches('/'),
            ticker,
            period.as_str(),
            self.config.interval,
        )
    }

    /// Fetch price history for one symbol. A provider that answers with no
    /// rows yields `Empty`; transport and provider errors yield `Failed`.
    pub async fn fetch_stock_data(&self, ticker: &str, period: Period) -> Fetched<PriceTable> {
        let url = self.chart_url(ticker, period);
        debug!("Fetching chart: {}", url);

        match self.client.get_json::<ChartResponse>(&url).await {
            Ok(resp) => {
                let fetched = table_from_response(ticker, resp);
                if let Fetched::Failed(msg) = &fetched {
                    warn!("{}: chart provider error: {}", ticker, msg);
                }
                fetched
            }
            Err(e) => {
                warn!("{}: chart fetch failed: {:#}", ticker, e);
                Fetched::Failed(format!("{:#}", e))
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
