//! Ticker universe loading.
//!
//! Four listing categories are merged into one flat selector catalog:
//! US equities, US ETFs, KRX equities, KRX ETFs — in that order. Each
//! category is fetched independently and degrades on its own: a failed
//! domestic fetch contributes nothing, a failed US fetch contributes a
//! small well-known fallback list, so the selector is never empty and
//! the loader itself never fails.

use crate::config::{HttpConfig, ListingsConfig};
use crate::http::HttpClient;
use crate::models::SymbolEntry;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{info, warn};

// ── Provider row shapes ───────────────────────────────────────────────────────

/// KRX equity listing row: Code / Name / Market (KOSPI or KOSDAQ).
#[derive(Debug, Clone, Deserialize)]
pub struct DomesticEquityRow {
    #[serde(alias = "Code")]
    pub code: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Market")]
    pub market: String,
}

/// Fund and foreign-equity listings share a Symbol / Name shape.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolNameRow {
    #[serde(alias = "Symbol")]
    pub symbol: String,
    #[serde(alias = "Name")]
    pub name: String,
}

// ── Row → entry mapping ───────────────────────────────────────────────────────

/// Market-board suffix expected by the price provider.
/// KOSPI listings trade under ".KS", everything else under ".KQ".
pub fn domestic_market_suffix(market: &str) -> &'static str {
    if market.trim().eq_ignore_ascii_case("KOSPI") {
        ".KS"
    } else {
        ".KQ"
    }
}

pub fn domestic_equity_entry(row: &DomesticEquityRow) -> SymbolEntry {
    let suffix = domestic_market_suffix(&row.market);
    SymbolEntry::new(format!("{}{}", row.code.trim(), suffix), row.name.trim())
}

/// Domestic ETFs all list on the main board.
pub fn domestic_fund_entry(row: &SymbolNameRow) -> SymbolEntry {
    SymbolEntry::new(format!("{}.KS", row.symbol.trim()), row.name.trim())
}

pub fn foreign_entry(row: &SymbolNameRow) -> SymbolEntry {
    SymbolEntry::new(row.symbol.trim(), row.name.trim())
}

// ── Fallbacks ─────────────────────────────────────────────────────────────────

fn us_equity_fallback() -> Vec<SymbolEntry> {
    [
        ("AAPL", "Apple"),
        ("TSLA", "Tesla"),
        ("NVDA", "NVIDIA"),
        ("MSFT", "Microsoft"),
        ("GOOGL", "Google"),
        ("AMZN", "Amazon"),
    ]
    .into_iter()
    .map(|(c, n)| SymbolEntry::new(c, n))
    .collect()
}

fn us_fund_fallback() -> Vec<SymbolEntry> {
    [
        ("SPY", "SPDR S&P 500 ETF Trust"),
        ("QQQ", "Invesco QQQ Trust"),
    ]
    .into_iter()
    .map(|(c, n)| SymbolEntry::new(c, n))
    .collect()
}

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable listing source abstraction.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Full selector catalog, foreign listings first. Never fails.
    async fn load_all_tickers(&self) -> Vec<SymbolEntry>;
}

// ── HTTP listing providers ────────────────────────────────────────────────────

pub struct ListingProviders {
    client: HttpClient,
    config: ListingsConfig,
}

impl ListingProviders {
    pub fn new(http: &HttpConfig, config: &ListingsConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(http)?,
            config: config.clone(),
        })
    }

    async fn fetch_domestic_equities(&self) -> Vec<SymbolEntry> {
        info!("Fetching KRX equity listing");
        match self
            .client
            .get_json::<Vec<DomesticEquityRow>>(&self.config.krx_stocks_url)
            .await
        {
            Ok(rows) => rows.iter().map(domestic_equity_entry).collect(),
            Err(e) => {
                warn!("KRX equity listing failed: {:#}", e);
                vec![]
            }
        }
    }

    async fn fetch_domestic_funds(&self) -> Vec<SymbolEntry> {
        info!("Fetching KRX ETF listing");
        match self
            .client
            .get_json::<Vec<SymbolNameRow>>(&self.config.krx_etfs_url)
            .await
        {
            Ok(rows) => rows.iter().map(domestic_fund_entry).collect(),
            Err(e) => {
                warn!("KRX ETF listing failed: {:#}", e);
                vec![]
            }
        }
    }

    async fn fetch_foreign_equities(&self) -> Vec<SymbolEntry> {
        info!("Fetching US equity listing");
        match self
            .client
            .get_json::<Vec<SymbolNameRow>>(&self.config.us_stocks_url)
            .await
        {
            Ok(rows) => rows.iter().map(foreign_entry).collect(),
            Err(e) => {
                warn!("US equity listing failed, using fallback: {:#}", e);
                us_equity_fallback()
            }
        }
    }

    async fn fetch_foreign_funds(&self) -> Vec<SymbolEntry> {
        info!("Fetching US ETF listing");
        match self
            .client
            .get_json::<Vec<SymbolNameRow>>(&self.config.us_etfs_url)
            .await
        {
            Ok(rows) => rows.iter().map(foreign_entry).collect(),
            Err(e) => {
                warn!("US ETF listing failed, using fallback: {:#}", e);
                us_fund_fallback()
            }
        }
    }
}

/// Concatenate category results in selector order.
pub fn merge_universe(
    foreign_equities: Vec<SymbolEntry>,
    foreign_funds: Vec<SymbolEntry>,
    domestic_equities: Vec<SymbolEntry>,
    domestic_funds: Vec<SymbolEntry>,
) -> Vec<SymbolEntry> {
    let mut all = foreign_equities;
    all.extend(foreign_funds);
    all.extend(domestic_equities);
    all.extend(domestic_funds);
    all
}

#[async_trait]
impl ListingSource for ListingProviders {
    async fn load_all_tickers(&self) -> Vec<SymbolEntry> {
        let foreign_equities = self.fetch_foreign_equities().await;
        let foreign_funds = self.fetch_foreign_funds().await;
        let domestic_equities = self.fetch_domestic_equities().await;
        let domestic_funds = self.fetch_domestic_funds().await;

        let all = merge_universe(
            foreign_equities,
            foreign_funds,
            domestic_equities,
            domestic_funds,
        );
        info!("Ticker universe loaded: {} entries", all.len());
        all
    }
}

// ── Process-lifetime cache ────────────────────────────────────────────────────

/// Lazily-populated, never-invalidated catalog cache. Injected explicitly so
/// tests can hand each scenario its own instance instead of sharing a global.
#[derive(Default)]
pub struct UniverseCache {
    cell: OnceCell<Vec<SymbolEntry>>,
}

impl UniverseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// First caller pays for the load; everyone after reads the cached list.
    pub async fn get_or_load(&self, source: &dyn ListingSource) -> &[SymbolEntry] {
        self.cell
            .get_or_init(|| source.load_all_tickers())
            .await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_domestic_equity_suffix_by_market() {
        let kospi = DomesticEquityRow {
            code: "005930".into(),
            name: "Samsung Electronics".into(),
            market: "KOSPI".into(),
        };
        let entry = domestic_equity_entry(&kospi);
        assert_eq!(entry.code, "005930.KS");
        assert_eq!(entry.display_name(), "005930.KS - Samsung Electronics");

        let kosdaq = DomesticEquityRow {
            code: "035720".into(),
            name: "Kakao".into(),
            market: "KOSDAQ".into(),
        };
        assert_eq!(domestic_equity_entry(&kosdaq).code, "035720.KQ");
    }

    #[test]
    fn test_foreign_equity_mapping() {
        let row = SymbolNameRow {
            symbol: "AAPL".into(),
            name: "Apple Inc.".into(),
        };
        let entry = foreign_entry(&row);
        assert_eq!(entry.code, "AAPL");
        assert_eq!(entry.display_name(), "AAPL - Apple Inc.");
    }

    #[test]
    fn test_domestic_fund_gets_main_board_suffix() {
        let row = SymbolNameRow {
            symbol: "069500".into(),
            name: "KODEX 200".into(),
        };
        assert_eq!(domestic_fund_entry(&row).code, "069500.KS");
    }

    #[test]
    fn test_merge_order_foreign_first() {
        let merged = merge_universe(
            vec![SymbolEntry::new("AAPL", "Apple")],
            vec![SymbolEntry::new("SPY", "SPDR S&P 500 ETF Trust")],
            vec![SymbolEntry::new("005930.KS", "Samsung Electronics")],
            vec![SymbolEntry::new("069500.KS", "KODEX 200")],
        );
        let codes: Vec<&str> = merged.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, ["AAPL", "SPY", "005930.KS", "069500.KS"]);
    }

    #[test]
    fn test_merge_survives_partial_failure() {
        // Domestic categories failed (empty), foreign fell back.
        let merged = merge_universe(us_equity_fallback(), us_fund_fallback(), vec![], vec![]);
        assert_eq!(merged.len(), 8);
        assert_eq!(merged[0].code, "AAPL");
        assert_eq!(merged[6].code, "SPY");
    }

    fn test_http_config() -> crate::config::HttpConfig {
        crate::config::HttpConfig {
            timeout_secs: 2,
            request_delay_ms: 0,
            jitter_ms: 0,
            max_retries: 0,
            user_agent: "test".into(),
        }
    }

    /// Minimal HTTP responder serving a fixed JSON body on a loopback port.
    async fn serve_json(body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    break;
                };
                let mut buf = [0u8; 2048];
                let _ = sock.read(&mut buf).await;
                let resp = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = sock.write_all(resp.as_bytes()).await;
            }
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_failed_categories_degrade_but_keep_the_rest() {
        tokio_test::block_on(async {
            // KRX equities answer; every other provider refuses connections.
            let krx_url = serve_json(
                r#"[{"Code":"005930","Name":"Samsung Electronics","Market":"KOSPI"}]"#,
            )
            .await;
            let config = ListingsConfig {
                krx_stocks_url: krx_url,
                krx_etfs_url: "http://127.0.0.1:1/krx_etfs".into(),
                us_stocks_url: "http://127.0.0.1:1/us_stocks".into(),
                us_etfs_url: "http://127.0.0.1:1/us_etfs".into(),
            };
            let providers = ListingProviders::new(&test_http_config(), &config).unwrap();

            let all = providers.load_all_tickers().await;

            // US categories fall back (6 + 2), KRX ETFs contribute nothing,
            // KRX equities survive — foreign entries still lead.
            assert_eq!(all.len(), 9);
            assert_eq!(all[0].code, "AAPL");
            assert_eq!(all[6].code, "SPY");
            assert_eq!(all[8].code, "005930.KS");
            assert_eq!(all[8].display_name(), "005930.KS - Samsung Electronics");
        });
    }

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ListingSource for CountingSource {
        async fn load_all_tickers(&self) -> Vec<SymbolEntry> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            vec![SymbolEntry::new("AAPL", "Apple")]
        }
    }

    #[test]
    fn test_cache_loads_once() {
        tokio_test::block_on(async {
            let source = CountingSource {
                calls: AtomicUsize::new(0),
            };
            let cache = UniverseCache::new();

            let first = cache.get_or_load(&source).await.to_vec();
            let second = cache.get_or_load(&source).await.to_vec();

            assert_eq!(first, second);
            assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        });
    }
}
