// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Query, paper and result types shared by every stage.

use crate::error::QueryError;
use chrono::{DateTime, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const ABS_BASE: &str = "https://arxiv.org/abs/";
pub const PDF_BASE: &str = "https://arxiv.org/pdf/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchIntent {
    Author,
    Topic,
    Keyword,
    Hybrid,
}

impl SearchIntent {
    /// Reads an intent name. Anything unrecognised becomes a hybrid search.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "author" | "authors" | "researcher" => Self::Author,
            "topic" | "topics" | "category" => Self::Topic,
            "keyword" | "keywords" => Self::Keyword,
            _ => Self::Hybrid,
        }
    }
}

impl fmt::Display for SearchIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Author => "author",
            Self::Topic => "topic",
            Self::Keyword => "keyword",
            Self::Hybrid => "hybrid",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Relevance,
    #[default]
    DateDesc,
    DateAsc,
    Score,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub days_back: Option<u32>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub exclude_categories: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub exclude_authors: Vec<String>,
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    50
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            date_from: None,
            date_to: None,
            days_back: None,
            categories: Vec::new(),
            exclude_categories: Vec::new(),
            authors: Vec::new(),
            exclude_authors: Vec::new(),
            min_score: None,
            max_results: default_max_results(),
        }
    }
}

/// Date bounds a query asks for, after `days_back` has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateWindow {
    pub fn is_open(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn start(&self) -> Option<String> {
        self.from.map(format_date)
    }

    pub fn end(&self) -> Option<String> {
        self.to.map(format_date)
    }
}

/// `days` before `today`, stopping at the earliest date chrono can represent.
pub fn days_before(today: NaiveDate, days: u32) -> NaiveDate {
    today.checked_sub_days(Days::new(u64::from(days))).unwrap_or(NaiveDate::MIN)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl SearchFilters {
    /// Explicit bounds win; otherwise `days_back` counts back from `today`.
    pub fn window(&self, today: NaiveDate) -> DateWindow {
        if self.date_from.is_some() || self.date_to.is_some() {
            return DateWindow { from: self.date_from, to: self.date_to };
        }
        match self.days_back {
            Some(days) => DateWindow { from: Some(days_before(today, days)), to: Some(today) },
            None => DateWindow::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query_id: String,
    pub intent: SearchIntent,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default)]
    pub sort_order: SortOrder,
}

/// `search_<timestamp>_<8 hex>`.
pub fn new_query_id() -> String {
    format!(
        "search_{}_{:08x}",
        Local::now().format("%Y%m%d_%H%M%S"),
        fastrand::u32(..)
    )
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl SearchQuery {
    pub fn new(intent: SearchIntent) -> Self {
        Self {
            query_id: new_query_id(),
            intent,
            text: String::new(),
            authors: Vec::new(),
            topics: Vec::new(),
            keywords: Vec::new(),
            filters: SearchFilters::default(),
            sort_order: SortOrder::default(),
        }
    }

    pub fn by_authors(names: Vec<String>) -> Self {
        let mut q = Self::new(SearchIntent::Author);
        q.text = format!("Papers by: {}", names.join(", "));
        q.authors = clean_list(names);
        q
    }

    pub fn by_topics(topics: Vec<String>) -> Self {
        let mut q = Self::new(SearchIntent::Topic);
        q.text = topics.join(" AND ");
        q.topics = clean_list(topics);
        q
    }

    pub fn by_keywords(keywords: Vec<String>) -> Self {
        let mut q = Self::new(SearchIntent::Keyword);
        q.keywords = clean_list(keywords);
        q
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into().trim().to_string();
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub fn with_sort(mut self, order: SortOrder) -> Self {
        self.sort_order = order;
        self
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        let nothing = self.authors.iter().all(|s| s.trim().is_empty())
            && self.topics.iter().all(|s| s.trim().is_empty())
            && self.keywords.iter().all(|s| s.trim().is_empty())
            && self.text.trim().is_empty();
        if nothing {
            return Err(QueryError::Empty);
        }
        if let (Some(from), Some(to)) = (self.filters.date_from, self.filters.date_to) {
            if to < from {
                return Err(QueryError::InvertedDates {
                    from: format_date(from),
                    to: format_date(to),
                });
            }
        }
        Ok(())
    }
}

/// Mutable scratch space the parser fills one field at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaperDraft {
    pub arxiv_id: Option<String>,
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub abstract_text: Option<String>,
    pub subjects: Vec<String>,
    pub submitted_date: Option<String>,
    pub comments: Option<String>,
}

impl PaperDraft {
    /// Freezes the draft. Drafts with neither a title nor an id are worthless and yield `None`.
    pub fn finish(self, total_results: u64) -> Option<PaperRecord> {
        if self.title.is_none() && self.arxiv_id.is_none() {
            return None;
        }
        let url = self.arxiv_id.as_ref().map(|id| format!("{ABS_BASE}{id}"));
        let pdf_url = self.arxiv_id.as_ref().map(|id| format!("{PDF_BASE}{id}"));
        Some(PaperRecord {
            arxiv_id: self.arxiv_id,
            title: self.title,
            authors: self.authors,
            abstract_text: self.abstract_text,
            subjects: self.subjects,
            submitted_date: self.submitted_date,
            comments: self.comments,
            url,
            pdf_url,
            total_results,
            queried_author: None,
            score: None,
        })
    }
}

/// One parsed search hit. Read-only; the `with_*` methods hand back modified copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    arxiv_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    authors: Vec<String>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    subjects: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    submitted_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pdf_url: Option<String>,
    total_results: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    queried_author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
}

impl PaperRecord {
    pub fn arxiv_id(&self) -> Option<&str> {
        self.arxiv_id.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn abstract_text(&self) -> Option<&str> {
        self.abstract_text.as_deref()
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn submitted_date(&self) -> Option<&str> {
        self.submitted_date.as_deref()
    }

    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn pdf_url(&self) -> Option<&str> {
        self.pdf_url.as_deref()
    }

    pub fn total_results(&self) -> u64 {
        self.total_results
    }

    pub fn queried_author(&self) -> Option<&str> {
        self.queried_author.as_deref()
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    #[must_use]
    pub fn with_queried_author(&self, author: &str) -> Self {
        Self { queried_author: Some(author.to_string()), ..self.clone() }
    }

    #[must_use]
    pub fn with_score(&self, score: f64) -> Self {
        Self { score: Some(score), ..self.clone() }
    }

    /// Best-effort read of the free-text submission date ("15 January, 2025" and friends).
    pub fn submitted_on(&self) -> Option<NaiveDate> {
        let raw = self.submitted_date.as_deref()?.trim().trim_end_matches('.');
        ["%d %B, %Y", "%d %B %Y", "%B %d, %Y", "%Y-%m-%d", "%d %b %Y"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorCount {
    pub author: String,
    pub papers: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMetrics {
    pub total_found: u64,
    pub total_returned: usize,
    pub search_time_ms: f64,
    pub category_distribution: BTreeMap<String, usize>,
    pub author_distribution: Vec<AuthorCount>,
    pub high_quality_count: usize,
    pub avg_score: Option<f64>,
}

impl SearchMetrics {
    pub fn compute(papers: &[PaperRecord], high_quality: f64, author_cap: usize) -> Self {
        let mut category_distribution = BTreeMap::new();
        for subject in papers.iter().flat_map(|p| p.subjects.iter()) {
            *category_distribution.entry(subject.clone()).or_insert(0) += 1;
        }

        let mut authors: Vec<AuthorCount> = Vec::new();
        for name in papers.iter().flat_map(|p| p.authors.iter()) {
            match authors.iter_mut().find(|a| &a.author == name) {
                Some(entry) => entry.papers += 1,
                None => authors.push(AuthorCount { author: name.clone(), papers: 1 }),
            }
        }
        // stable: ties keep first-seen order
        authors.sort_by(|a, b| b.papers.cmp(&a.papers));
        authors.truncate(author_cap);

        let high_quality_count = papers
            .iter()
            .filter(|p| p.score.unwrap_or(0.0) >= high_quality)
            .count();

        let scores: Vec<f64> = papers.iter().filter_map(|p| p.score).collect();
        let avg_score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };

        Self {
            total_found: papers.first().map_or(0, |p| p.total_results),
            total_returned: papers.len(),
            search_time_ms: 0.0,
            category_distribution,
            author_distribution: authors,
            high_quality_count,
            avg_score,
        }
    }
}

/// How one fallback strategy (or one author lookup) went.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub label: String,
    pub url: String,
    pub papers_found: usize,
    pub total_available: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: SearchQuery,
    pub papers: Vec<PaperRecord>,
    pub metrics: SearchMetrics,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_used: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<StrategyAttempt>,
    pub executed_at: DateTime<Local>,
}

impl SearchResult {
    pub fn failed(query: SearchQuery, error: impl Into<String>) -> Self {
        Self {
            query,
            papers: Vec::new(),
            metrics: SearchMetrics::default(),
            success: false,
            error: Some(error.into()),
            strategy_used: None,
            attempts: Vec::new(),
            executed_at: Local::now(),
        }
    }

    pub fn has_results(&self) -> bool {
        !self.papers.is_empty()
    }

    pub fn arxiv_ids(&self) -> Vec<&str> {
        self.papers.iter().filter_map(PaperRecord::arxiv_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(id: Option<&str>, title: Option<&str>) -> PaperDraft {
        PaperDraft {
            arxiv_id: id.map(String::from),
            title: title.map(String::from),
            ..PaperDraft::default()
        }
    }

    #[test]
    fn draft_without_title_or_id_is_dropped() {
        assert!(draft(None, None).finish(3).is_none());
        assert!(draft(None, Some("Only a title")).finish(3).is_some());
    }

    #[test]
    fn urls_follow_the_id() {
        let record = draft(Some("2501.12345v2"), None).finish(0).unwrap();
        assert_eq!(record.url(), Some("https://arxiv.org/abs/2501.12345v2"));
        assert_eq!(record.pdf_url(), Some("https://arxiv.org/pdf/2501.12345v2"));
        let untitled = draft(None, Some("t")).finish(0).unwrap();
        assert_eq!(untitled.url(), None);
    }

    #[test]
    fn enrichment_copies() {
        let record = draft(Some("2501.00001"), Some("A")).finish(0).unwrap();
        let scored = record.with_score(8.5);
        assert_eq!(record.score(), None);
        assert_eq!(scored.score(), Some(8.5));
        assert_eq!(scored.arxiv_id(), record.arxiv_id());
    }

    #[test]
    fn submitted_date_formats() {
        let mut d = draft(Some("2501.00001"), None);
        d.submitted_date = Some("15 January, 2025".into());
        let record = d.finish(0).unwrap();
        assert_eq!(record.submitted_on(), NaiveDate::from_ymd_opt(2025, 1, 15));

        let mut d = draft(Some("2501.00001"), None);
        d.submitted_date = Some("sometime soon".into());
        assert_eq!(d.finish(0).unwrap().submitted_on(), None);
    }

    #[test]
    fn lenient_intent() {
        assert_eq!(SearchIntent::parse_lenient("Researcher"), SearchIntent::Author);
        assert_eq!(SearchIntent::parse_lenient("topic"), SearchIntent::Topic);
        assert_eq!(SearchIntent::parse_lenient("whatever"), SearchIntent::Hybrid);
    }

    #[test]
    fn validation() {
        let empty = SearchQuery::new(SearchIntent::Keyword);
        assert_eq!(empty.validate(), Err(QueryError::Empty));

        let mut q = SearchQuery::by_topics(vec!["cs.AI".into()]);
        q.filters.date_from = NaiveDate::from_ymd_opt(2025, 2, 1);
        q.filters.date_to = NaiveDate::from_ymd_opt(2025, 1, 1);
        assert!(matches!(q.validate(), Err(QueryError::InvertedDates { .. })));

        q.filters.date_to = q.filters.date_from;
        assert!(q.validate().is_ok());
    }

    #[test]
    fn days_back_resolves_against_today() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let filters = SearchFilters { days_back: Some(3), ..SearchFilters::default() };
        let window = filters.window(today);
        assert_eq!(window.from, NaiveDate::from_ymd_opt(2025, 3, 7));
        assert_eq!(window.to, Some(today));
        assert!(SearchFilters::default().window(today).is_open());
    }

    #[test]
    fn huge_days_back_stops_at_the_earliest_date() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let filters = SearchFilters { days_back: Some(u32::MAX), ..SearchFilters::default() };
        assert_eq!(filters.window(today).from, Some(NaiveDate::MIN));
    }

    #[test]
    fn metrics_cap_authors_and_count_quality() {
        let papers: Vec<PaperRecord> = (0..12)
            .map(|i| {
                let mut d = draft(Some(&format!("2501.{:05}", i)), Some("t"));
                d.authors = vec![format!("Author {i}"), "Shared".to_string()];
                d.subjects = vec!["cs.AI".to_string()];
                d.finish(120).unwrap().with_score(i as f64)
            })
            .collect();
        let m = SearchMetrics::compute(&papers, 7.0, 10);
        assert_eq!(m.total_found, 120);
        assert_eq!(m.total_returned, 12);
        assert_eq!(m.author_distribution.len(), 10);
        assert_eq!(m.author_distribution[0], AuthorCount { author: "Shared".into(), papers: 12 });
        assert_eq!(m.author_distribution[1].author, "Author 0");
        assert_eq!(m.category_distribution.get("cs.AI"), Some(&12));
        assert_eq!(m.high_quality_count, 5); // 7..=11
        assert_eq!(m.avg_score, Some(5.5));
    }
}
