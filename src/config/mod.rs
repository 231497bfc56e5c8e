use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub listings: ListingsConfig,
    pub market_data: MarketDataConfig,
    pub news: NewsConfig,
    pub report: ReportConfig,
}

/// Shared HTTP client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Listing provider endpoints, one per universe category
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListingsConfig {
    #[serde(default = "default_krx_stocks_url")]
    pub krx_stocks_url: String,

    #[serde(default = "default_krx_etfs_url")]
    pub krx_etfs_url: String,

    #[serde(default = "default_us_stocks_url")]
    pub us_stocks_url: String,

    #[serde(default = "default_us_etfs_url")]
    pub us_etfs_url: String,
}

/// Price history provider (Yahoo-compatible chart API)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketDataConfig {
    #[serde(default = "default_chart_base_url")]
    pub base_url: String,

    #[serde(default = "default_interval")]
    pub interval: String,
}

/// News search scraping
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewsConfig {
    #[serde(default = "default_news_search_url")]
    pub search_url: String,

    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

/// Generative report provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Read from GEMINI_API_KEY (or ADVISOR__REPORT__API_KEY) at load time.
    #[serde(default)]
    pub api_key: String,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    250
}
fn default_jitter_ms() -> u64 {
    200
}
fn default_max_retries() -> u32 {
    3
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}
fn default_krx_stocks_url() -> String {
    "https://finance-listings.dev/v1/krx/stocks.json".to_string()
}
fn default_krx_etfs_url() -> String {
    "https://finance-listings.dev/v1/krx/etfs.json".to_string()
}
fn default_us_stocks_url() -> String {
    "https://finance-listings.dev/v1/us/stocks.json".to_string()
}
fn default_us_etfs_url() -> String {
    "https://finance-listings.dev/v1/us/etfs.json".to_string()
}
fn default_chart_base_url() -> String {
    "https://query1.finance.yahoo.com/v8/finance/chart".to_string()
}
fn default_interval() -> String {
    "1d".to_string()
}
fn default_news_search_url() -> String {
    "https://search.naver.com/search.naver".to_string()
}
fn default_max_items() -> usize {
    10
}
fn default_report_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("ADVISOR").separator("__"))
            .build()?;

        let mut app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|_| AppConfig::default());

        // GEMINI_API_KEY wins over anything the file layer set.
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.is_empty() {
                app_cfg.report.api_key = key;
            }
        }

        Ok(app_cfg)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig {
                timeout_secs: default_timeout_secs(),
                request_delay_ms: default_request_delay_ms(),
                jitter_ms: default_jitter_ms(),
                max_retries: default_max_retries(),
                user_agent: default_user_agent(),
            },
            listings: ListingsConfig {
                krx_stocks_url: default_krx_stocks_url(),
                krx_etfs_url: default_krx_etfs_url(),
                us_stocks_url: default_us_stocks_url(),
                us_etfs_url: default_us_etfs_url(),
            },
            market_data: MarketDataConfig {
                base_url: default_chart_base_url(),
                interval: default_interval(),
            },
            news: NewsConfig {
                search_url: default_news_search_url(),
                max_items: default_max_items(),
            },
            report: ReportConfig {
                base_url: default_report_base_url(),
                model: default_model(),
                api_key: String::new(),
            },
        }
    }
}
