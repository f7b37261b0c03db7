// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

mod common;

use arxiv_scraper::batch::{BatchCoordinator, BatchWindow, EntityKind, EntityOutcome};
use arxiv_scraper::config::{BatchSettings, EngineSettings, SourceConfig};
use arxiv_scraper::engine::SearchEngine;
use arxiv_scraper::roster::load_roster;
use chrono::NaiveDate;
use common::{page, timeout, ScriptedFetch, NO_RESULTS};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn no_delay() -> BatchSettings {
    BatchSettings::default().with_delay(Duration::ZERO)
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn every_attempted_author_is_recorded() {
    let fetch = ScriptedFetch::new(vec![
        Ok(page(1, &[("2503.00001", "Jane's Paper", None)])),
        Ok(NO_RESULTS.to_string()),
        Err(timeout()),
    ]);
    let engine = SearchEngine::new(fetch, SourceConfig::default(), EngineSettings::default());
    let coordinator = BatchCoordinator::new(&engine, no_delay());

    let entities = names(&["Jane Doe", "aaa", "TEST", "", "Richard Roe", "Failing Author", "jane doe"]);
    let report = coordinator.run_on(EntityKind::Author, &entities, BatchWindow::Daily, today()).await;

    assert_eq!(report.skipped, names(&["aaa", "TEST", "jane doe"]));
    assert_eq!(report.outcomes.len(), 3);
    assert!(matches!(report.outcomes["Richard Roe"], EntityOutcome::Empty));
    assert!(matches!(report.outcomes["Failing Author"], EntityOutcome::Failed { .. }));
    match &report.outcomes["Jane Doe"] {
        EntityOutcome::Found(result) => {
            assert_eq!(result.papers.len(), 1);
            assert_eq!(result.papers[0].queried_author(), Some("Jane Doe"));
        }
        other => panic!("expected papers for Jane Doe, got {other:?}"),
    }
    assert_eq!(report.papers_by_entity().len(), 1);
    assert_eq!(report.date_from.as_deref(), Some("2025-03-10"));

    let requests = engine.fetcher().requests();
    assert_eq!(requests.len(), 3);
    // a single day is widened by the author builder
    assert_eq!(requests[0].param("date-from_date"), Some("2025-03-10"));
    assert_eq!(requests[0].param("date-to_date"), Some("2025-03-11"));
}

#[tokio::test]
async fn placeholder_names_are_never_searched() {
    let engine = SearchEngine::new(ScriptedFetch::default(), SourceConfig::default(), EngineSettings::default());
    let coordinator = BatchCoordinator::new(&engine, no_delay());

    let report = coordinator
        .run_on(EntityKind::Author, &names(&["aaa", "Test", " AAA "]), BatchWindow::Weekly, today())
        .await;

    assert!(report.outcomes.is_empty());
    assert_eq!(report.skipped.len(), 3);
    assert!(engine.fetcher().requests().is_empty());
}

#[tokio::test]
async fn weekly_topic_batch_reports_the_window_used() {
    let fetch = ScriptedFetch::new(vec![Ok(page(1, &[("2503.00002", "New", Some("9 March, 2025"))]))]);
    let engine = SearchEngine::new(fetch, SourceConfig::default(), EngineSettings::default());
    let coordinator = BatchCoordinator::new(&engine, no_delay());

    let report = coordinator
        .run_on(EntityKind::Topic, &names(&["cs.CR"]), BatchWindow::Weekly, today())
        .await;

    match &report.outcomes["cs.CR"] {
        EntityOutcome::Found(result) => {
            assert_eq!(result.strategy_used.as_deref(), Some("exact range (2025-03-03 to 2025-03-10)"));
        }
        other => panic!("expected papers for cs.CR, got {other:?}"),
    }
    assert_eq!(report.busy_entities(1), vec![("cs.CR", 1)]);
}

#[tokio::test]
async fn roster_comes_through_the_fetcher() {
    let fetch = ScriptedFetch::new(vec![Ok("Name\tGroup\nJane Doe\tA\naaa\tB\n".to_string())]);
    let roster = load_roster("https://example.org/roster.tsv", &fetch).await.unwrap();

    assert_eq!(roster, names(&["Jane Doe", "aaa"]));
    assert_eq!(fetch.urls(), names(&["https://example.org/roster.tsv"]));
}

#[tokio::test]
async fn roster_from_a_local_file() {
    let path = std::env::temp_dir().join(format!("roster-{}.tsv", std::process::id()));
    std::fs::write(&path, "Richard Roe\n\nAda\tLovelace\n").unwrap();

    let roster = load_roster(path.to_str().unwrap(), &ScriptedFetch::default()).await.unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(roster, names(&["Richard Roe", "Ada Lovelace"]));
}

#[tokio::test]
async fn missing_roster_file_is_an_error() {
    let err = load_roster("/definitely/not/here.tsv", &ScriptedFetch::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("reading roster file"));
}
