//! Narrative report generation via a hosted generative-language model.
//!
//! The engine composes one prompt from the annotated price table and the
//! headline list, posts it to a `generateContent` endpoint, and always hands
//! the caller a display string: quota exhaustion and provider failures are
//! rendered into user-facing text here, never raised.

use crate::config::{HttpConfig, ReportConfig};
use crate::http::HttpClient;
use crate::models::{NewsItem, PriceTable};
use crate::utils::fmt_price;
use anyhow::Result;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

// ── Error taxonomy ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("provider quota exhausted")]
    RateLimited,

    #[error("need at least 2 price records, got {0}")]
    InsufficientHistory(usize),

    #[error("{0}")]
    Provider(String),
}

impl ReportError {
    /// Render into the string shown in the report pane.
    pub fn user_message(&self) -> String {
        match self {
            ReportError::RateLimited => {
                "The AI provider is rate limiting requests. Please try again in a moment."
                    .to_string()
            }
            ReportError::InsufficientHistory(n) => format!(
                "Not enough price history to analyse ({} record(s)); pick a longer period.",
                n
            ),
            ReportError::Provider(msg) => format!("Report generation failed: {}", msg),
        }
    }
}

/// Quota errors surface as HTTP 429 or a RESOURCE_EXHAUSTED status string.
pub fn classify_provider_error(detail: &str) -> ReportError {
    if detail.contains("429") || detail.contains("RESOURCE_EXHAUSTED") {
        ReportError::RateLimited
    } else {
        ReportError::Provider(detail.to_string())
    }
}

// ── Prompt ────────────────────────────────────────────────────────────────────

/// Compose the analyst prompt. Requires two records so the day-over-day move
/// can be computed; shorter tables are rejected up front instead of indexed.
pub fn build_prompt(
    name: &str,
    table: &PriceTable,
    news: &[NewsItem],
) -> Result<String, ReportError> {
    if table.len() < 2 {
        return Err(ReportError::InsufficientHistory(table.len()));
    }

    let current = &table.rows[table.len() - 1];
    let previous = &table.rows[table.len() - 2];
    let change_pct = (current.close - previous.close) / previous.close * 100.0;
    let ma20 = current
        .ma20
        .map(fmt_price)
        .unwrap_or_else(|| "n/a".to_string());

    let news_text = if news.is_empty() {
        "No recent headlines found.".to_string()
    } else {
        news.iter()
            .map(|n| format!("- {}", n.title))
            .collect::<Vec<_>>()
            .join("\n")
    };

    Ok(format!(
        "You are a professional financial analyst. Write an investment \
         analysis report for '{name}' from the price data and headlines below.\n\
         \n\
         [Price indicators]\n\
         - Last close: {close}\n\
         - Day-over-day change: {change:+.2}%\n\
         - 20-day moving average (MA20): {ma20}\n\
         \n\
         [Recent headlines]\n\
         {news_text}\n\
         \n\
         [Instructions]\n\
         1. Assess the current price trend (rising / falling / sideways) technically.\n\
         2. Analyse how the headlines are likely to affect the price.\n\
         3. Close with exactly three sentences covering risks and outlook.\n\
         4. Keep the tone professional and measured.",
        name = name,
        close = fmt_price(current.close),
        change = change_pct,
    ))
}

// ── Provider response shape ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn extract_text(body: &str) -> Result<String, ReportError> {
    let resp: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| ReportError::Provider(format!("unreadable response: {}", e)))?;

    let text = resp
        .candidates
        .unwrap_or_default()
        .into_iter()
        .flat_map(|c| c.content.parts)
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() {
        Err(ReportError::Provider("empty response from model".to_string()))
    } else {
        Ok(text)
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

pub struct ReportEngine {
    client: HttpClient,
    config: ReportConfig,
}

impl ReportEngine {
    pub fn new(http: &HttpConfig, config: &ReportConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(http)?,
            config: config.clone(),
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            self.config.api_key,
        )
    }

    async fn try_generate(&self, prompt: &str) -> Result<String, ReportError> {
        if self.config.api_key.is_empty() {
            return Err(ReportError::Provider(
                "no API key configured (set GEMINI_API_KEY)".to_string(),
            ));
        }

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let (status, text) = self
            .client
            .post_json(&self.generate_url(), &body)
            .await
            .map_err(|e| ReportError::Provider(format!("{:#}", e)))?;

        if status == 429 {
            return Err(ReportError::RateLimited);
        }
        if !(200..300).contains(&status) {
            return Err(classify_provider_error(&format!("HTTP {}: {}", status, text)));
        }

        extract_text(&text)
    }

    /// Generate the narrative report. Always returns a display string.
    pub async fn generate_financial_report(
        &self,
        name: &str,
        table: &PriceTable,
        news: &[NewsItem],
    ) -> String {
        let prompt = match build_prompt(name, table, news) {
            Ok(p) => p,
            Err(e) => return e.user_message(),
        };

        info!("Generating report for '{}'", name);
        match self.try_generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Report generation for '{}' failed: {}", name, e);
                e.user_message()
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceRow;
    use chrono::NaiveDate;

    fn two_row_table() -> PriceTable {
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let mut r1 = PriceRow::new(d1, 70_000.0);
        let mut r2 = PriceRow::new(d2, 71_400.0);
        r1.ma20 = Some(69_500.0);
        r2.ma20 = Some(69_800.0);
        PriceTable::new("005930.KS", vec![r1, r2])
    }

    #[test]
    fn test_prompt_embeds_indicators_and_headlines() {
        let news = vec![
            NewsItem {
                title: "Record earnings announcement imminent".into(),
                link: "https://news.example.com/1".into(),
            },
            NewsItem {
                title: "Chip demand recovery firming up".into(),
                link: "https://news.example.com/2".into(),
            },
        ];
        let prompt = build_prompt("Samsung Electronics", &two_row_table(), &news).unwrap();

        assert!(prompt.contains("Samsung Electronics"));
        assert!(prompt.contains("71,400.00"));
        assert!(prompt.contains("+2.00%"));
        assert!(prompt.contains("69,800.00"));
        assert!(prompt.contains("- Record earnings announcement imminent"));
        assert!(prompt.contains("- Chip demand recovery firming up"));
    }

    #[test]
    fn test_prompt_without_news_says_so() {
        let prompt = build_prompt("Samsung Electronics", &two_row_table(), &[]).unwrap();
        assert!(prompt.contains("No recent headlines found."));
    }

    #[test]
    fn test_prompt_handles_undefined_ma20() {
        let mut table = two_row_table();
        table.rows[1].ma20 = None;
        let prompt = build_prompt("X", &table, &[]).unwrap();
        assert!(prompt.contains("MA20): n/a"));
    }

    #[test]
    fn test_short_table_rejected_explicitly() {
        let mut table = two_row_table();
        table.rows.truncate(1);

        let err = build_prompt("X", &table, &[]).unwrap_err();
        assert!(matches!(err, ReportError::InsufficientHistory(1)));
        assert!(err.user_message().contains("price history"));
    }

    #[test]
    fn test_rate_limit_classification_and_marker() {
        let err = classify_provider_error("HTTP 429: quota exceeded for quota metric");
        assert!(matches!(err, ReportError::RateLimited));
        assert!(err.user_message().contains("rate limit"));

        let err = classify_provider_error("status RESOURCE_EXHAUSTED");
        assert!(matches!(err, ReportError::RateLimited));
    }

    #[test]
    fn test_other_errors_embed_description() {
        let err = classify_provider_error("HTTP 500: internal");
        let msg = err.user_message();
        assert!(msg.contains("HTTP 500: internal"));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body = r#"{"candidates": [{"content": {"parts": [
            {"text": "Outlook: "}, {"text": "constructive."}
        ]}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Outlook: constructive.");
    }

    #[test]
    fn test_extract_text_empty_candidates() {
        let err = extract_text(r#"{"candidates": []}"#).unwrap_err();
        assert!(matches!(err, ReportError::Provider(_)));
    }
}
