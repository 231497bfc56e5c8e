mod config;
mod history;
mod http;
mod indicators;
mod models;
mod news;
mod report;
mod session;
mod universe;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::AppConfig;
use crate::history::PriceHistoryFetcher;
use crate::indicators::add_technical_indicators;
use crate::models::{Fetched, NewsItem, Period, PriceTable, SymbolEntry};
use crate::news::NewsLookup;
use crate::report::ReportEngine;
use crate::session::SessionState;
use crate::universe::{ListingProviders, UniverseCache};

#[derive(Parser)]
#[command(name = "stock-advisor", about = "AI financial report dashboard", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// List the full ticker universe (US equities/ETFs first, then KRX)
    Tickers,

    /// Print recent price history with MA20 and daily change
    Chart {
        /// Price provider symbol, e.g. AAPL or 005930.KS
        symbol: String,

        #[arg(short, long, default_value = "3mo", env = "ADVISOR_PERIOD")]
        period: Period,
    },

    /// Latest headlines for a search query
    News {
        query: String,
    },

    /// One-shot report: fetch history + news, then ask the model
    Report {
        /// "CODE - Name" selector label, or a bare symbol from the universe
        selection: String,

        #[arg(short, long, default_value = "3mo", env = "ADVISOR_PERIOD")]
        period: Period,
    },

    /// Interactive session (select / period / report / show / quit)
    Dashboard,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "stock_advisor=info,warn",
        1 => "stock_advisor=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;
    let app = App::new(config)?;

    match cli.command {
        Command::Tickers => app.cmd_tickers().await?,
        Command::Chart { symbol, period } => app.cmd_chart(&symbol, period).await,
        Command::News { query } => app.cmd_news(&query).await,
        Command::Report { selection, period } => app.cmd_report(&selection, period).await,
        Command::Dashboard => app.cmd_dashboard().await?,
    }

    Ok(())
}

/// Wires the fetchers together; one instance per process, like one browser tab.
struct App {
    listings: ListingProviders,
    cache: UniverseCache,
    fetcher: PriceHistoryFetcher,
    news: NewsLookup,
    engine: ReportEngine,
}

impl App {
    fn new(config: AppConfig) -> Result<Self> {
        Ok(Self {
            listings: ListingProviders::new(&config.http, &config.listings)?,
            cache: UniverseCache::new(),
            fetcher: PriceHistoryFetcher::new(&config.http, &config.market_data)?,
            news: NewsLookup::new(&config.http, &config.news)?,
            engine: ReportEngine::new(&config.http, &config.report)?,
        })
    }

    async fn universe(&self) -> &[SymbolEntry] {
        self.cache.get_or_load(&self.listings).await
    }

    /// Match user input against the universe: exact display label first, then
    /// bare code. Falls back to parsing a "CODE - Name" label directly so the
    /// dashboard still works when every listing provider is down.
    async fn resolve(&self, input: &str) -> Option<SymbolEntry> {
        let input = input.trim();
        let universe = self.universe().await;

        if let Some(hit) = universe.iter().find(|e| e.display_name() == input) {
            return Some(hit.clone());
        }
        if let Some(hit) = universe
            .iter()
            .find(|e| e.code.eq_ignore_ascii_case(input))
        {
            return Some(hit.clone());
        }
        SymbolEntry::parse_display(input)
    }

    async fn cmd_tickers(&self) -> Result<()> {
        let _t = utils::Timer::start("Ticker universe");
        let universe = self.universe().await;
        for entry in universe {
            println!("{}", entry.display_name());
        }
        info!("{} entries", universe.len());
        Ok(())
    }

    async fn fetch_annotated(&self, symbol: &str, period: Period) -> Fetched<PriceTable> {
        let fetched = self.fetcher.fetch_stock_data(symbol, period).await;
        add_technical_indicators(fetched)
    }

    async fn cmd_chart(&self, symbol: &str, period: Period) {
        let _t = utils::Timer::start(format!("Chart {} ({})", symbol, period));
        match self.fetch_annotated(symbol, period).await {
            Fetched::Data(table) => print_chart_tail(&table, 10),
            Fetched::Empty => println!("No data for {} — check the ticker.", symbol),
            Fetched::Failed(msg) => println!("Could not fetch {}: {}", symbol, msg),
        }
    }

    async fn cmd_news(&self, query: &str) {
        let items = self.news.get_stock_news(query).await;
        print_news(&items);
    }

    async fn cmd_report(&self, selection: &str, period: Period) {
        let Some(entry) = self.resolve(selection).await else {
            println!("Unknown selection '{}'. Try `stock-advisor tickers`.", selection);
            return;
        };

        let _t = utils::Timer::start(format!("Report {}", entry.code));
        let Fetched::Data(table) = self.fetch_annotated(&entry.code, period).await else {
            println!("No price data for {} — cannot generate a report.", entry.code);
            return;
        };

        let news_items = self.news.get_stock_news(&entry.name).await;
        let report = self
            .engine
            .generate_financial_report(&entry.name, &table, &news_items)
            .await;

        println!("═══ {} ═══", entry.display_name());
        println!("{}", report);
    }

    async fn cmd_dashboard(&self) -> Result<()> {
        let mut session = SessionState::new();
        println!("Commands: select <ticker> | period <1mo|3mo|6mo|1y|max> | report | show | quit");

        let stdin = std::io::stdin();
        loop {
            print!("advisor> ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }
            let line = line.trim();
            let (cmd, arg) = match line.split_once(' ') {
                Some((c, a)) => (c, a.trim()),
                None => (line, ""),
            };

            match cmd {
                "" => {}
                "quit" | "exit" => break,
                "period" => match arg.parse::<Period>() {
                    Ok(p) => {
                        session.set_period(p);
                        println!("Period set to {}.", p);
                    }
                    Err(e) => println!("{}", e),
                },
                "select" => {
                    let Some(entry) = self.resolve(arg).await else {
                        println!("Unknown ticker '{}'.", arg);
                        continue;
                    };
                    println!("Selected {}.", entry.display_name());
                    session.select(entry.clone());
                    self.render_selection(&entry, session.period()).await;
                }
                "report" => {
                    let Some(entry) = session.selection().cloned() else {
                        println!("Select a ticker first.");
                        continue;
                    };
                    let Fetched::Data(table) =
                        self.fetch_annotated(&entry.code, session.period()).await
                    else {
                        println!("No price data for {}.", entry.code);
                        continue;
                    };
                    let news_items = self.news.get_stock_news(&entry.name).await;
                    let report = self
                        .engine
                        .generate_financial_report(&entry.name, &table, &news_items)
                        .await;
                    session.store_report(report);
                    // Fresh report is guaranteed current; show it right away.
                    println!("{}", session.current_report().unwrap_or_default());
                }
                "show" => match session.current_report() {
                    Some(text) => println!("{}", text),
                    None => println!("No report for the current selection — run `report`."),
                },
                other => println!("Unknown command '{}'.", other),
            }
        }

        Ok(())
    }

    /// Selection changed: render the chart tail and headlines, as the page
    /// would on a selector change.
    async fn render_selection(&self, entry: &SymbolEntry, period: Period) {
        match self.fetch_annotated(&entry.code, period).await {
            Fetched::Data(table) => print_chart_tail(&table, 10),
            Fetched::Empty => println!("No data for {}.", entry.code),
            Fetched::Failed(msg) => println!("Could not fetch {}: {}", entry.code, msg),
        }
        let items = self.news.get_stock_news(&entry.name).await;
        print_news(&items);
    }
}

// ── Rendering ────────────────────────────────────────────────────────────────

fn print_chart_tail(table: &PriceTable, n: usize) {
    println!("─────────────────────────────────────────────────────────");
    println!("  {} — {} rows", table.symbol, table.len());
    println!("  {:<12} {:>12} {:>12} {:>10}", "Date", "Close", "MA20", "Change");
    println!("─────────────────────────────────────────────────────────");
    for row in table.rows.iter().rev().take(n).rev() {
        println!(
            "  {:<12} {:>12} {:>12} {:>10}",
            row.date.to_string(),
            utils::fmt_price(row.close),
            row.ma20.map(utils::fmt_price).unwrap_or_else(|| "—".into()),
            row.daily_change
                .map(|c| format!("{:+.2}", c))
                .unwrap_or_else(|| "—".into()),
        );
    }
    println!("─────────────────────────────────────────────────────────");
}

fn print_news(items: &[NewsItem]) {
    if items.is_empty() {
        println!("No related news found.");
        return;
    }
    println!("Latest news:");
    for (i, item) in items.iter().enumerate() {
        println!("  {}. {}", i + 1, item.title);
        println!("     {}", item.link);
    }
}
