//! Headline lookup via a search-engine results page.
//!
//! There is no stable contract on the upstream markup; the structural
//! selector lives in its own adapter so a layout change is a one-line swap
//! rather than a rewrite of the lookup.

use crate::config::{HttpConfig, NewsConfig};
use crate::http::HttpClient;
use crate::models::NewsItem;
use anyhow::Result;
use scraper::{Html, Selector};
use tracing::{info, warn};
use url::Url;

// ── Selector adapter ──────────────────────────────────────────────────────────

/// The search page's title anchors carry a heatmap-target attribute that has
/// outlived several class-name reshuffles, so we key on that instead of
/// `.news_tit`.
pub const DEFAULT_HEADLINE_SELECTOR: &str = r#"a[data-heatmap-target=".tit"]"#;

/// Structural extractor for headline/link pairs.
pub struct HeadlineSelector {
    anchors: Selector,
}

impl HeadlineSelector {
    pub fn new(css: &str) -> Result<Self> {
        let anchors = Selector::parse(css)
            .map_err(|e| anyhow::anyhow!("headline selector '{}': {:?}", css, e))?;
        Ok(Self { anchors })
    }

    pub fn default_layout() -> Result<Self> {
        Self::new(DEFAULT_HEADLINE_SELECTOR)
    }

    /// Pull up to `max` headline/link pairs out of a results page.
    pub fn extract(&self, html: &str, max: usize) -> Vec<NewsItem> {
        let doc = Html::parse_document(html);
        let mut items = Vec::new();

        for anchor in doc.select(&self.anchors) {
            let title = anchor.text().collect::<String>().trim().to_string();
            let Some(link) = anchor.value().attr("href") else {
                continue;
            };
            if title.is_empty() || link.is_empty() {
                continue;
            }
            items.push(NewsItem {
                title,
                link: link.to_string(),
            });
            if items.len() >= max {
                break;
            }
        }
        items
    }
}

// ── Lookup ────────────────────────────────────────────────────────────────────

pub struct NewsLookup {
    client: HttpClient,
    config: NewsConfig,
    selector: HeadlineSelector,
}

impl NewsLookup {
    pub fn new(http: &HttpConfig, config: &NewsConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(http)?,
            config: config.clone(),
            selector: HeadlineSelector::default_layout()?,
        })
    }

    /// Search URL for a query, most-recent-first.
    pub fn search_url(&self, query: &str) -> Result<String> {
        let mut url = Url::parse(&self.config.search_url)?;
        url.query_pairs_mut()
            .append_pair("where", "news")
            .append_pair("query", query)
            .append_pair("sort", "1");
        Ok(url.into())
    }

    /// Most recent headlines for a query. Degrades to an empty list on any
    /// network or parse failure.
    pub async fn get_stock_news(&self, query: &str) -> Vec<NewsItem> {
        let url = match self.search_url(query) {
            Ok(u) => u,
            Err(e) => {
                warn!("Bad news search URL for '{}': {:#}", query, e);
                return vec![];
            }
        };

        info!("Searching news for '{}'", query);
        match self.client.get_text(&url).await {
            Ok(html) => {
                let items = self.selector.extract(&html, self.config.max_items);
                info!("'{}': {} headlines", query, items.len());
                items
            }
            Err(e) => {
                warn!("News search failed for '{}': {:#}", query, e);
                vec![]
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HttpConfig, NewsConfig};

    fn test_http_config() -> HttpConfig {
        HttpConfig {
            timeout_secs: 2,
            request_delay_ms: 0,
            jitter_ms: 0,
            max_retries: 0,
            user_agent: "test".into(),
        }
    }

    fn results_page(n: usize) -> String {
        let mut html = String::from("<html><body><div class='group_news'>");
        for i in 0..n {
            html.push_str(&format!(
                r#"<a href="https://news.example.com/{i}" data-heatmap-target=".tit">
                     Headline {i}
                   </a>"#,
            ));
        }
        html.push_str("</div></body></html>");
        html
    }

    #[test]
    fn test_extract_title_and_link() {
        let selector = HeadlineSelector::default_layout().unwrap();
        let items = selector.extract(&results_page(3), 10);

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].title, "Headline 0");
        assert_eq!(items[0].link, "https://news.example.com/0");
    }

    #[test]
    fn test_extract_caps_at_max() {
        let selector = HeadlineSelector::default_layout().unwrap();
        assert_eq!(selector.extract(&results_page(25), 10).len(), 10);
    }

    #[test]
    fn test_extract_skips_anchors_without_href() {
        let selector = HeadlineSelector::default_layout().unwrap();
        let html = r#"<a data-heatmap-target=".tit">No link</a>
                      <a href="" data-heatmap-target=".tit">Blank link</a>
                      <a href="https://x.test/1" data-heatmap-target=".tit">Kept</a>"#;
        let items = selector.extract(html, 10);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Kept");
    }

    #[test]
    fn test_unrelated_markup_yields_nothing() {
        let selector = HeadlineSelector::default_layout().unwrap();
        let html = "<html><body><a href='/x' class='news_tit'>old layout</a></body></html>";
        assert!(selector.extract(html, 10).is_empty());
    }

    #[test]
    fn test_swappable_layout() {
        // Layout change: retarget without touching extraction.
        let selector = HeadlineSelector::new("a.news_tit").unwrap();
        let html = "<a href='/x' class='news_tit'>new story</a>";
        let items = selector.extract(html, 10);
        assert_eq!(items[0].title, "new story");
    }

    #[test]
    fn test_search_url_sorts_most_recent_first() {
        let lookup = NewsLookup::new(
            &test_http_config(),
            &NewsConfig {
                search_url: "https://search.naver.com/search.naver".into(),
                max_items: 10,
            },
        )
        .unwrap();

        let url = lookup.search_url("Samsung Electronics").unwrap();
        assert!(url.contains("where=news"));
        assert!(url.contains("sort=1"));
        assert!(url.contains("query=Samsung+Electronics"));
    }

    #[test]
    fn test_unreachable_search_yields_empty_list() {
        tokio_test::block_on(async {
            // Port 1 refuses connections; the lookup must swallow the
            // failure and hand back an empty list, not an error.
            let lookup = NewsLookup::new(
                &test_http_config(),
                &NewsConfig {
                    search_url: "http://127.0.0.1:1/search.naver".into(),
                    max_items: 10,
                },
            )
            .unwrap();

            let items = lookup.get_stock_news("Samsung Electronics").await;
            assert!(items.is_empty());
        });
    }
}
