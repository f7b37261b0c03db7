// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! One entry point for every kind of search.
//!
//! [`SearchEngine::search`] always hands back a [`SearchResult`]. Transport failures and
//! invalid queries come back as a result with `success == false`, so callers can tell
//! "nothing published" apart from "couldn't ask".

use crate::config::{EngineSettings, SourceConfig};
use crate::enrich::{enrich_scores, Scorer};
use crate::error::{QueryError, SearchError, TransportError};
use crate::fallback::FallbackPlanner;
use crate::fetcher::Fetch;
use crate::model::{
    DateWindow, PaperRecord, SearchFilters, SearchIntent, SearchMetrics, SearchQuery, SearchResult,
    SortOrder, StrategyAttempt,
};
use crate::parser::{ParsedPage, ResultParser, ARXIV_RULES};
use crate::query::{
    build_author_query, build_hybrid_query, build_keyword_query, build_topic_query, SearchRequest,
};
use chrono::{Local, NaiveDate};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What a dispatch path produced, before filtering.
struct Dispatched {
    papers: Vec<PaperRecord>,
    total_found: u64,
    strategy_used: Option<String>,
    /// Earliest submission date the source was asked for, re-checked locally.
    lower_bound: Option<NaiveDate>,
}

pub struct SearchEngine<F: Fetch> {
    fetcher: F,
    parser: ResultParser,
    planner: FallbackPlanner,
    source: SourceConfig,
    settings: EngineSettings,
    scorer: Option<Arc<dyn Scorer>>,
}

impl<F: Fetch> SearchEngine<F> {
    pub fn new(fetcher: F, source: SourceConfig, settings: EngineSettings) -> Self {
        let parser = ResultParser::new(&ARXIV_RULES, source.no_results_marker.as_str());
        Self {
            fetcher,
            parser,
            planner: FallbackPlanner::default(),
            source,
            settings,
            scorer: None,
        }
    }

    #[must_use]
    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    #[must_use]
    pub fn with_planner(mut self, planner: FallbackPlanner) -> Self {
        self.planner = planner;
        self
    }

    #[must_use]
    pub fn with_parser(mut self, parser: ResultParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Gives the fetcher back so its owner can close it.
    pub fn into_fetcher(self) -> F {
        self.fetcher
    }

    pub async fn search(&self, query: &SearchQuery) -> SearchResult {
        self.search_on(query, Local::now().date_naive()).await
    }

    /// Same as [`search`](Self::search) with `today` pinned, for `days_back` and batch windows.
    pub async fn search_on(&self, query: &SearchQuery, today: NaiveDate) -> SearchResult {
        let started = Instant::now();
        let mut attempts = Vec::new();

        let dispatched = match query.validate() {
            Ok(()) => self.dispatch(query, today, &mut attempts).await,
            Err(e) => Err(SearchError::from(e)),
        };

        match dispatched {
            Ok(found) => self.finish(query, found, attempts, started).await,
            Err(e) => {
                warn!(query_id = %query.query_id, intent = %query.intent, error = %e, "search failed");
                let mut result = SearchResult::failed(query.clone(), e.to_string());
                result.attempts = attempts;
                result.metrics.search_time_ms = elapsed_ms(started);
                result
            }
        }
    }

    /// Topic search over the last `days_back` days.
    pub async fn search_recent(&self, days_back: u32, topics: Vec<String>) -> SearchResult {
        let query = SearchQuery::by_topics(topics).with_filters(SearchFilters {
            days_back: Some(days_back),
            ..SearchFilters::default()
        });
        self.search(&query).await
    }

    pub async fn search_authors(&self, names: Vec<String>, days_back: Option<u32>) -> SearchResult {
        let query = SearchQuery::by_authors(names).with_filters(SearchFilters {
            days_back,
            ..SearchFilters::default()
        });
        self.search(&query).await
    }

    /// Papers sitting in all of `topics` at once.
    pub async fn search_cross_domain(&self, topics: Vec<String>, days_back: u32) -> SearchResult {
        let mut query = SearchQuery::new(SearchIntent::Hybrid)
            .with_text(format!("Cross-domain: {}", topics.join(" + ")))
            .with_filters(SearchFilters {
                days_back: Some(days_back),
                ..SearchFilters::default()
            });
        query.topics = topics;
        self.search(&query).await
    }

    async fn dispatch(
        &self,
        query: &SearchQuery,
        today: NaiveDate,
        attempts: &mut Vec<StrategyAttempt>,
    ) -> Result<Dispatched, SearchError> {
        let mut window = query.filters.window(today);
        // a lone lower bound means "from then until now"
        if window.from.is_some() && window.to.is_none() {
            window.to = Some(today);
        }
        debug!(query_id = %query.query_id, intent = %query.intent, ?window, "dispatching");

        match query.intent {
            SearchIntent::Author => self.by_author(query, window, attempts).await,
            SearchIntent::Topic => self.by_topic(query, window, attempts).await,
            SearchIntent::Keyword => self.by_keyword(query, window, attempts).await,
            SearchIntent::Hybrid => self.by_hybrid(query, window, attempts).await,
        }
    }

    async fn fetch_page(&self, request: &SearchRequest) -> Result<ParsedPage, TransportError> {
        let body = self.fetcher.fetch(request).await?;
        Ok(self.parser.parse(&body))
    }

    async fn by_author(
        &self,
        query: &SearchQuery,
        window: DateWindow,
        attempts: &mut Vec<StrategyAttempt>,
    ) -> Result<Dispatched, SearchError> {
        let mut names: Vec<&str> = non_blank(&query.authors);
        if names.is_empty() && !query.text.trim().is_empty() {
            names.push(query.text.trim());
        }
        if names.is_empty() {
            return Err(QueryError::NoSearchTerms(SearchIntent::Author).into());
        }

        let (from, to) = (window.start(), window.end());
        let mut papers = Vec::new();
        let mut total_found = 0;
        let mut last_error = None;

        for name in &names {
            let request = build_author_query(&self.source, name, from.as_deref(), to.as_deref());
            let outcome = self.fetch_page(&request).await;
            attempts.push(attempt(format!("author {name}"), &request, &outcome));
            match outcome {
                Ok(page) => {
                    info!(author = name, papers = page.records.len(), "author lookup done");
                    total_found += page.total;
                    papers.extend(page.records.iter().map(|p| p.with_queried_author(name)));
                }
                Err(e) => {
                    warn!(author = name, error = %e, "author lookup failed, skipping");
                    last_error = Some(e);
                }
            }
        }

        // only give up when no name could be looked up at all
        if let Some(e) = last_error {
            if attempts.iter().all(|a| a.error.is_some()) {
                return Err(e.into());
            }
        }

        Ok(Dispatched { papers, total_found, strategy_used: None, lower_bound: window.from })
    }

    /// Topics plus category filters, de-duplicated in order, minus exclusions.
    fn categories(&self, query: &SearchQuery) -> Vec<String> {
        let excluded: Vec<String> = query
            .filters
            .exclude_categories
            .iter()
            .map(|c| c.trim().to_ascii_lowercase())
            .collect();
        let mut merged: Vec<String> = Vec::new();
        for category in query.topics.iter().chain(&query.filters.categories) {
            let category = category.trim();
            if category.is_empty()
                || excluded.contains(&category.to_ascii_lowercase())
                || merged.iter().any(|m| m.eq_ignore_ascii_case(category))
            {
                continue;
            }
            merged.push(category.to_string());
        }
        merged
    }

    async fn by_topic(
        &self,
        query: &SearchQuery,
        window: DateWindow,
        attempts: &mut Vec<StrategyAttempt>,
    ) -> Result<Dispatched, SearchError> {
        let mut topics = self.categories(query);
        if topics.is_empty() {
            topics = self.settings.default_topics.clone();
        }
        if topics.is_empty() {
            return Err(QueryError::NoSearchTerms(SearchIntent::Topic).into());
        }

        let plan = self.planner.plan(window.start().as_deref(), window.end().as_deref());
        let mut last_error = None;

        for strategy in &plan {
            let request = build_topic_query(
                &self.source,
                &topics,
                strategy.date_from.as_deref(),
                strategy.date_to.as_deref(),
                &self.settings.classification,
                &self.source.values.all_field,
                self.source.page_size,
            );
            info!(strategy = %strategy.label, topics = ?topics, "trying date window");
            let outcome = self.fetch_page(&request).await;
            attempts.push(attempt(strategy.label.clone(), &request, &outcome));

            match outcome {
                Ok(page) if !page.records.is_empty() => {
                    info!(strategy = %strategy.label, papers = page.records.len(), "found papers");
                    let lower_bound = strategy
                        .date_from
                        .as_deref()
                        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
                    return Ok(Dispatched {
                        papers: page.records,
                        total_found: page.total,
                        strategy_used: Some(strategy.label.clone()),
                        lower_bound,
                    });
                }
                Ok(_) => info!(strategy = %strategy.label, "no papers, widening"),
                Err(e) => {
                    warn!(strategy = %strategy.label, error = %e, "window failed, widening");
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error {
            if attempts.iter().all(|a| a.error.is_some()) {
                return Err(e.into());
            }
        }
        Ok(Dispatched { papers: Vec::new(), total_found: 0, strategy_used: None, lower_bound: None })
    }

    async fn by_keyword(
        &self,
        query: &SearchQuery,
        window: DateWindow,
        attempts: &mut Vec<StrategyAttempt>,
    ) -> Result<Dispatched, SearchError> {
        let mut terms: Vec<String> = Vec::new();
        let text = query.text.trim();
        if !text.is_empty() {
            terms.push(text.to_string());
        }
        for keyword in non_blank(&query.keywords) {
            if !terms.iter().any(|t| t.eq_ignore_ascii_case(keyword)) {
                terms.push(keyword.to_string());
            }
        }
        if terms.is_empty() {
            return Err(QueryError::NoSearchTerms(SearchIntent::Keyword).into());
        }

        let request = build_keyword_query(
            &self.source,
            &terms,
            &self.categories(query),
            self.source.page_size,
            query.sort_order,
        );
        // the keyword form has no date fields, so bounds only apply locally
        self.single(request, "keyword", window.from, attempts).await
    }

    async fn by_hybrid(
        &self,
        query: &SearchQuery,
        window: DateWindow,
        attempts: &mut Vec<StrategyAttempt>,
    ) -> Result<Dispatched, SearchError> {
        let mut topics = self.categories(query);
        for keyword in non_blank(&query.keywords) {
            if !topics.iter().any(|t| t.eq_ignore_ascii_case(keyword)) {
                topics.push(keyword.to_string());
            }
        }
        let authors: Vec<String> = non_blank(&query.authors).into_iter().map(String::from).collect();
        if topics.is_empty() && authors.is_empty() && !query.text.trim().is_empty() {
            topics.push(query.text.trim().to_string());
        }
        if topics.is_empty() && authors.is_empty() {
            return Err(QueryError::NoSearchTerms(SearchIntent::Hybrid).into());
        }

        let request = build_hybrid_query(
            &self.source,
            &topics,
            &authors,
            &query.filters.exclude_categories,
            window.start().as_deref(),
            self.source.page_size,
            query.sort_order,
        );
        self.single(request, "hybrid", window.from, attempts).await
    }

    /// One fetch, one parse, no ladder.
    async fn single(
        &self,
        request: SearchRequest,
        label: &str,
        lower_bound: Option<NaiveDate>,
        attempts: &mut Vec<StrategyAttempt>,
    ) -> Result<Dispatched, SearchError> {
        let outcome = self.fetch_page(&request).await;
        attempts.push(attempt(label, &request, &outcome));
        let page = outcome?;
        info!(kind = label, papers = page.records.len(), total = page.total, "search done");
        Ok(Dispatched { papers: page.records, total_found: page.total, strategy_used: None, lower_bound })
    }

    async fn finish(
        &self,
        query: &SearchQuery,
        found: Dispatched,
        attempts: Vec<StrategyAttempt>,
        started: Instant,
    ) -> SearchResult {
        let mut papers = found.papers;
        if let Some(scorer) = &self.scorer {
            papers = enrich_scores(papers, Arc::clone(scorer), self.settings.enrich_concurrency).await;
        }

        let mut papers = apply_post_filters(papers, &query.filters, found.lower_bound);
        sort_papers(&mut papers, query.sort_order);
        papers.truncate(query.filters.max_results);

        let mut metrics = SearchMetrics::compute(
            &papers,
            self.settings.high_quality_threshold,
            self.settings.author_distribution_cap,
        );
        metrics.total_found = found.total_found;
        metrics.search_time_ms = elapsed_ms(started);

        info!(
            query_id = %query.query_id,
            returned = papers.len(),
            total = found.total_found,
            "search finished"
        );

        SearchResult {
            query: query.clone(),
            papers,
            metrics,
            success: true,
            error: None,
            strategy_used: found.strategy_used,
            attempts,
            executed_at: Local::now(),
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn non_blank(items: &[String]) -> Vec<&str> {
    items.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect()
}

fn attempt(
    label: impl Into<String>,
    request: &SearchRequest,
    outcome: &Result<ParsedPage, TransportError>,
) -> StrategyAttempt {
    let (papers_found, total_available, error) = match outcome {
        Ok(page) => (page.records.len(), page.total, None),
        Err(e) => (0, 0, Some(e.to_string())),
    };
    StrategyAttempt {
        label: label.into(),
        url: request.url(),
        papers_found,
        total_available,
        error,
    }
}

fn matches_any(paper: &PaperRecord, needles: &[String]) -> bool {
    paper.authors().iter().any(|author| {
        let author = author.to_lowercase();
        needles
            .iter()
            .map(|n| n.trim().to_lowercase())
            .any(|n| !n.is_empty() && author.contains(&n))
    })
}

/// Minimum score, author include, author exclude, then the date re-check, in that order.
/// Unscored papers count as 0; papers without a readable date are kept.
pub fn apply_post_filters(
    papers: Vec<PaperRecord>,
    filters: &SearchFilters,
    lower_bound: Option<NaiveDate>,
) -> Vec<PaperRecord> {
    let before = papers.len();
    let kept: Vec<PaperRecord> = papers
        .into_iter()
        .filter(|p| filters.min_score.map_or(true, |min| p.score().unwrap_or(0.0) >= min))
        .filter(|p| filters.authors.is_empty() || matches_any(p, &filters.authors))
        .filter(|p| !matches_any(p, &filters.exclude_authors))
        .filter(|p| match (lower_bound, p.submitted_on()) {
            (Some(bound), Some(day)) => day >= bound,
            _ => true,
        })
        .collect();
    if kept.len() < before {
        debug!(dropped = before - kept.len(), "post-filters removed papers");
    }
    kept
}

fn newest_first(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    // undated papers sink to the bottom either way
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable; relevance keeps the source's order.
pub fn sort_papers(papers: &mut [PaperRecord], order: SortOrder) {
    match order {
        SortOrder::Relevance => {}
        SortOrder::DateDesc => papers.sort_by(|a, b| newest_first(a.submitted_on(), b.submitted_on())),
        SortOrder::DateAsc => papers.sort_by(|a, b| match (a.submitted_on(), b.submitted_on()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (a, b) => newest_first(a, b),
        }),
        SortOrder::Score => papers.sort_by(|a, b| match (a.score(), b.score()) {
            (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PaperDraft;
    use pretty_assertions::assert_eq;

    fn paper(id: &str, authors: &[&str], submitted: Option<&str>) -> PaperRecord {
        PaperDraft {
            arxiv_id: Some(id.to_string()),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            submitted_date: submitted.map(String::from),
            ..PaperDraft::default()
        }
        .finish(0)
        .unwrap()
    }

    fn ids(papers: &[PaperRecord]) -> Vec<&str> {
        papers.iter().filter_map(PaperRecord::arxiv_id).collect()
    }

    #[test]
    fn min_score_keeps_relative_order() {
        let papers = vec![
            paper("2501.00001", &[], None).with_score(5.0),
            paper("2501.00002", &[], None).with_score(8.0),
            paper("2501.00003", &[], None).with_score(9.0),
            paper("2501.00004", &[], None),
        ];
        let filters = SearchFilters { min_score: Some(7.0), ..SearchFilters::default() };
        let kept = apply_post_filters(papers, &filters, None);
        let scores: Vec<Option<f64>> = kept.iter().map(PaperRecord::score).collect();
        assert_eq!(scores, vec![Some(8.0), Some(9.0)]);
    }

    #[test]
    fn author_filters_match_substrings_without_case() {
        let papers = vec![
            paper("2501.00001", &["Jane Doe", "Bob Stone"], None),
            paper("2501.00002", &["Richard Roe"], None),
            paper("2501.00003", &["JANE DOE", "Mallory"], None),
        ];
        let filters = SearchFilters {
            authors: vec!["jane".into()],
            exclude_authors: vec!["mallory".into()],
            ..SearchFilters::default()
        };
        assert_eq!(ids(&apply_post_filters(papers, &filters, None)), vec!["2501.00001"]);
    }

    #[test]
    fn date_recheck_keeps_undated_papers() {
        let papers = vec![
            paper("2501.00001", &[], Some("15 January, 2025")),
            paper("2501.00002", &[], Some("2 December, 2024")),
            paper("2501.00003", &[], Some("sometime")),
            paper("2501.00004", &[], None),
        ];
        let bound = NaiveDate::from_ymd_opt(2025, 1, 1);
        let kept = apply_post_filters(papers, &SearchFilters::default(), bound);
        assert_eq!(ids(&kept), vec!["2501.00001", "2501.00003", "2501.00004"]);
    }

    #[test]
    fn sorting() {
        let mut papers = vec![
            paper("a", &[], Some("2 December, 2024")).with_score(3.0),
            paper("b", &[], None).with_score(9.0),
            paper("c", &[], Some("15 January, 2025")),
        ];
        let id_of = |p: &PaperRecord| p.arxiv_id().unwrap_or_default().to_string();

        sort_papers(&mut papers, SortOrder::DateDesc);
        assert_eq!(papers.iter().map(id_of).collect::<Vec<_>>(), vec!["c", "a", "b"]);

        sort_papers(&mut papers, SortOrder::DateAsc);
        assert_eq!(papers.iter().map(id_of).collect::<Vec<_>>(), vec!["a", "c", "b"]);

        sort_papers(&mut papers, SortOrder::Score);
        assert_eq!(papers.iter().map(id_of).collect::<Vec<_>>(), vec!["b", "a", "c"]);

        let before: Vec<String> = papers.iter().map(id_of).collect();
        sort_papers(&mut papers, SortOrder::Relevance);
        assert_eq!(papers.iter().map(id_of).collect::<Vec<_>>(), before);
    }
}
