// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

// Searches arXiv's advanced-search page by author, topic or keyword,
// and walks researcher rosters day by day or week by week.

use anyhow::{bail, Result};
use arxiv_scraper::batch::{BatchCoordinator, BatchReport, EntityKind};
use arxiv_scraper::config::{BatchSettings, EngineSettings, FetchConfig, SourceConfig};
use arxiv_scraper::engine::SearchEngine;
use arxiv_scraper::fetcher::HttpFetcher;
use arxiv_scraper::model::{SearchFilters, SearchIntent, SearchQuery, SearchResult, SortOrder};
use arxiv_scraper::roster::load_roster;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::fs;
use tokio::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Author,
    Topic,
    Keyword,
    Hybrid,
    /// Every roster entity, today only
    Daily,
    /// Every roster entity, last seven days
    Weekly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Sort {
    Relevance,
    DateDesc,
    DateAsc,
    Score,
}

impl From<Sort> for SortOrder {
    fn from(sort: Sort) -> Self {
        match sort {
            Sort::Relevance => SortOrder::Relevance,
            Sort::DateDesc => SortOrder::DateDesc,
            Sort::DateAsc => SortOrder::DateAsc,
            Sort::Score => SortOrder::Score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Entity {
    Author,
    Topic,
}

// CL arguments for config
#[derive(Parser, Debug)]
#[command(author, version, about = "arXiv paper discovery over the advanced-search page", long_about = None)]
struct Args {
    #[arg(value_enum, default_value = "topic")]
    mode: Mode,

    #[arg(short, long, value_delimiter = ',')]
    authors: Vec<String>,

    #[arg(short, long, value_delimiter = ',')]
    topics: Vec<String>,

    #[arg(short, long, value_delimiter = ',')]
    keywords: Vec<String>,

    #[arg(long, default_value = "")]
    text: String,

    #[arg(long, value_delimiter = ',')]
    categories: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    exclude_categories: Vec<String>,

    /// Keep papers with an author containing one of these
    #[arg(long, value_delimiter = ',')]
    include_authors: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    exclude_authors: Vec<String>,

    /// YYYY-MM-DD
    #[arg(long)]
    date_from: Option<NaiveDate>,

    /// YYYY-MM-DD
    #[arg(long)]
    date_to: Option<NaiveDate>,

    #[arg(long)]
    days_back: Option<u32>,

    #[arg(long)]
    min_score: Option<f64>,

    #[arg(short, long, default_value = "50")]
    max_results: usize,

    #[arg(long, value_enum, default_value = "date-desc")]
    sort: Sort,

    /// TSV roster (path or URL) for daily/weekly runs
    #[arg(short, long)]
    roster: Option<String>,

    #[arg(long, value_enum, default_value = "author")]
    entity: Entity,

    #[arg(long, default_value = "3000")]
    delay_ms: u64,

    #[arg(long, default_value = "30")]
    timeout: u64,

    #[arg(long, default_value = "https://arxiv.org/search/advanced")]
    endpoint: String,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Args {
    fn filters(&self) -> SearchFilters {
        SearchFilters {
            date_from: self.date_from,
            date_to: self.date_to,
            days_back: self.days_back,
            categories: self.categories.clone(),
            exclude_categories: self.exclude_categories.clone(),
            authors: self.include_authors.clone(),
            exclude_authors: self.exclude_authors.clone(),
            min_score: self.min_score,
            max_results: self.max_results,
        }
    }

    fn query(&self, intent: SearchIntent) -> SearchQuery {
        let mut query = match intent {
            SearchIntent::Author => SearchQuery::by_authors(self.authors.clone()),
            SearchIntent::Topic => SearchQuery::by_topics(self.topics.clone()),
            SearchIntent::Keyword => SearchQuery::by_keywords(self.keywords.clone()),
            SearchIntent::Hybrid => {
                let mut q = SearchQuery::new(SearchIntent::Hybrid);
                q.authors = self.authors.clone();
                q.topics = self.topics.clone();
                q.keywords = self.keywords.clone();
                q
            }
        };
        if !self.text.trim().is_empty() {
            query = query.with_text(&self.text);
        }
        query.with_filters(self.filters()).with_sort(self.sort.into())
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn emit<T: Serialize>(value: &T, output: Option<&str>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            info!(path, "saved");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_search_summary(result: &SearchResult) {
    eprintln!("\n{}", "=".repeat(64));
    eprintln!("Results");
    eprintln!("{}", "=".repeat(64));
    eprintln!("Intent: {}", result.query.intent);
    eprintln!("Returned: {} of {} found", result.metrics.total_returned, result.metrics.total_found);
    if let Some(strategy) = &result.strategy_used {
        eprintln!("Window: {strategy}");
    }
    eprintln!("Time: {:.0} ms\n", result.metrics.search_time_ms);
}

fn print_batch_summary(report: &BatchReport, busy_threshold: usize) {
    eprintln!("\n{}", "=".repeat(64));
    eprintln!("Batch results");
    eprintln!("{}", "=".repeat(64));
    eprintln!("Entities searched: {}", report.outcomes.len());
    eprintln!("With papers: {}", report.papers_by_entity().len());
    eprintln!("Failed: {}", report.failed().len());
    eprintln!("Skipped: {}", report.skipped.len());
    eprintln!("Total papers: {}", report.total_papers());
    for (name, count) in report.busy_entities(busy_threshold) {
        eprintln!("   {name}: {count} papers");
    }
    eprintln!();
}

// Parse CL arguments, run one search or one batch
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let source = SourceConfig::default().with_endpoint(&args.endpoint);
    let settings = EngineSettings::default();
    let fetcher = HttpFetcher::open(&FetchConfig::default().with_timeout(args.timeout))?;
    let engine = SearchEngine::new(fetcher, source, settings);

    let outcome = run(&args, &engine).await;
    engine.into_fetcher().close();
    outcome
}

async fn run(args: &Args, engine: &SearchEngine<HttpFetcher>) -> Result<()> {
    let intent = match args.mode {
        Mode::Author => Some(SearchIntent::Author),
        Mode::Topic => Some(SearchIntent::Topic),
        Mode::Keyword => Some(SearchIntent::Keyword),
        Mode::Hybrid => Some(SearchIntent::Hybrid),
        Mode::Daily | Mode::Weekly => None,
    };

    if let Some(intent) = intent {
        let query = args.query(intent);
        info!(query_id = %query.query_id, %intent, "searching");
        let result = engine.search(&query).await;
        print_search_summary(&result);
        emit(&result, args.output.as_deref())?;
        if !result.success {
            bail!("search failed: {}", result.error.as_deref().unwrap_or("unknown error"));
        }
        return Ok(());
    }

    let (kind, listed) = match args.entity {
        Entity::Author => (EntityKind::Author, args.authors.clone()),
        Entity::Topic => (EntityKind::Topic, args.topics.clone()),
    };
    let entities = match &args.roster {
        Some(roster) => load_roster(roster.as_str(), engine.fetcher()).await?,
        None if listed.is_empty() && kind == EntityKind::Topic => engine.settings().default_topics.clone(),
        None => listed,
    };
    if entities.is_empty() {
        bail!("nothing to search: pass --roster, --authors or --topics");
    }

    let batch_settings = BatchSettings::default().with_delay(Duration::from_millis(args.delay_ms));
    let coordinator = BatchCoordinator::new(engine, batch_settings);
    let report = if args.mode == Mode::Daily {
        coordinator.daily(kind, &entities).await
    } else {
        coordinator.weekly(kind, &entities).await
    };
    print_batch_summary(&report, engine.settings().many_results_threshold);
    emit(&report, args.output.as_deref())
}
