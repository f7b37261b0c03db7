// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Running the engine over a list of authors or topics, one at a time.

use crate::config::BatchSettings;
use crate::engine::SearchEngine;
use crate::fetcher::Fetch;
use crate::model::{days_before, format_date, PaperRecord, SearchFilters, SearchQuery, SearchResult};
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::time::sleep;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Author,
    Topic,
}

/// Date window shared by every entity of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchWindow {
    /// Today only.
    Daily,
    /// The last seven days.
    Weekly,
    Days(u32),
    AllDates,
}

impl BatchWindow {
    pub fn bounds(self, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        let back = |days: u32| Some(days_before(today, days));
        match self {
            Self::Daily => (Some(today), Some(today)),
            Self::Weekly => (back(7), Some(today)),
            Self::Days(days) => (back(days), Some(today)),
            Self::AllDates => (None, None),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityOutcome {
    Found(Box<SearchResult>),
    /// Searched fine, nothing published in the window.
    Empty,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub kind: EntityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    /// Every attempted entity, found or not.
    pub outcomes: BTreeMap<String, EntityOutcome>,
    /// Placeholder and repeated names that were never searched.
    pub skipped: Vec<String>,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl BatchReport {
    /// Entities that turned up at least one paper.
    pub fn papers_by_entity(&self) -> BTreeMap<&str, &[PaperRecord]> {
        self.outcomes
            .iter()
            .filter_map(|(name, outcome)| match outcome {
                EntityOutcome::Found(result) => Some((name.as_str(), result.papers.as_slice())),
                _ => None,
            })
            .collect()
    }

    /// Entities with at least `threshold` papers, busiest first.
    pub fn busy_entities(&self, threshold: usize) -> Vec<(&str, usize)> {
        let mut busy: Vec<(&str, usize)> = self
            .papers_by_entity()
            .into_iter()
            .map(|(name, papers)| (name, papers.len()))
            .filter(|(_, count)| *count >= threshold)
            .collect();
        busy.sort_by(|a, b| b.1.cmp(&a.1));
        busy
    }

    pub fn total_papers(&self) -> usize {
        self.papers_by_entity().values().map(|p| p.len()).sum()
    }

    pub fn failed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, EntityOutcome::Failed { .. }))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

pub struct BatchCoordinator<'a, F: Fetch> {
    engine: &'a SearchEngine<F>,
    settings: BatchSettings,
}

impl<'a, F: Fetch> BatchCoordinator<'a, F> {
    pub fn new(engine: &'a SearchEngine<F>, settings: BatchSettings) -> Self {
        Self { engine, settings }
    }

    pub async fn daily(&self, kind: EntityKind, entities: &[String]) -> BatchReport {
        self.run(kind, entities, BatchWindow::Daily).await
    }

    pub async fn weekly(&self, kind: EntityKind, entities: &[String]) -> BatchReport {
        self.run(kind, entities, BatchWindow::Weekly).await
    }

    pub async fn run(&self, kind: EntityKind, entities: &[String], window: BatchWindow) -> BatchReport {
        self.run_on(kind, entities, window, Local::now().date_naive()).await
    }

    /// Searches each entity in turn, pausing between calls. A failing entity is recorded
    /// and the run moves on.
    pub async fn run_on(
        &self,
        kind: EntityKind,
        entities: &[String],
        window: BatchWindow,
        today: NaiveDate,
    ) -> BatchReport {
        let started_at = Local::now();
        let (from, to) = window.bounds(today);

        let mut queue: Vec<&str> = Vec::new();
        let mut skipped = Vec::new();
        for name in entities.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            if self.settings.is_ignored(name) || queue.iter().any(|q| q.eq_ignore_ascii_case(name)) {
                info!(entity = name, "skipping");
                skipped.push(name.to_string());
            } else {
                queue.push(name);
            }
        }
        info!(?kind, entities = queue.len(), skipped = skipped.len(), "starting batch");

        let mut outcomes = BTreeMap::new();
        for (i, name) in queue.iter().enumerate() {
            info!("[{}/{}] {}", i + 1, queue.len(), name);
            let query = entity_query(kind, name, from, to);
            let result = self.engine.search_on(&query, today).await;

            let outcome = if !result.success {
                let error = result.error.unwrap_or_else(|| "unknown error".to_string());
                warn!(entity = name, %error, "search failed, continuing");
                EntityOutcome::Failed { error }
            } else if result.papers.is_empty() {
                info!(entity = name, "no papers");
                EntityOutcome::Empty
            } else {
                info!(entity = name, papers = result.papers.len(), "found papers");
                EntityOutcome::Found(Box::new(result))
            };
            outcomes.insert(name.to_string(), outcome);

            if i < queue.len() - 1 {
                sleep(self.settings.delay()).await;
            }
        }

        BatchReport {
            kind,
            date_from: from.map(format_date),
            date_to: to.map(format_date),
            outcomes,
            skipped,
            started_at,
            finished_at: Local::now(),
        }
    }
}

fn entity_query(
    kind: EntityKind,
    name: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> SearchQuery {
    let filters = SearchFilters { date_from: from, date_to: to, ..SearchFilters::default() };
    let query = match kind {
        EntityKind::Author => SearchQuery::by_authors(vec![name.to_string()]),
        EntityKind::Topic => SearchQuery::by_topics(vec![name.to_string()]),
    };
    query.with_filters(filters)
}
