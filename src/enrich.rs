// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use crate::model::PaperRecord;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Anything that can put a number on a paper (an LLM judge, a citation lookup, a heuristic).
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, paper: &PaperRecord) -> anyhow::Result<f64>;
}

/// Scores every record with at most `concurrency` calls in flight. Output order matches
/// input order; a record whose scoring fails is returned unscored.
pub async fn enrich_scores(
    papers: Vec<PaperRecord>,
    scorer: Arc<dyn Scorer>,
    concurrency: usize,
) -> Vec<PaperRecord> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let total = papers.len();

    let tasks = papers.into_iter().map(|paper| {
        let semaphore = Arc::clone(&semaphore);
        let scorer = Arc::clone(&scorer);
        async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return paper;
            };
            match scorer.score(&paper).await {
                Ok(score) => paper.with_score(score),
                Err(e) => {
                    warn!(id = paper.arxiv_id().unwrap_or("-"), error = %e, "scoring failed");
                    paper
                }
            }
        }
    });

    let scored = join_all(tasks).await;
    debug!(
        total,
        scored = scored.iter().filter(|p| p.score().is_some()).count(),
        "enrichment done"
    );
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PaperDraft;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn paper(id: &str) -> PaperRecord {
        PaperDraft { arxiv_id: Some(id.to_string()), ..PaperDraft::default() }
            .finish(0)
            .unwrap()
    }

    /// Scores by the last digit of the id, fails on ids ending in 0, and tracks peak concurrency.
    struct DigitScorer {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Scorer for DigitScorer {
        async fn score(&self, paper: &PaperRecord) -> anyhow::Result<f64> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let digit = paper
                .arxiv_id()
                .and_then(|id| id.chars().last())
                .and_then(|c| c.to_digit(10))
                .unwrap_or(0);
            anyhow::ensure!(digit != 0, "no score for {:?}", paper.arxiv_id());
            Ok(f64::from(digit))
        }
    }

    #[tokio::test]
    async fn keeps_order_and_survives_failures() {
        let scorer = Arc::new(DigitScorer { in_flight: AtomicUsize::new(0), peak: AtomicUsize::new(0) });
        let papers: Vec<PaperRecord> = ["2501.00005", "2501.00010", "2501.00008", "2501.00001", "2501.00009"]
            .into_iter()
            .map(paper)
            .collect();

        let out = enrich_scores(papers, scorer.clone(), 2).await;

        let ids: Vec<&str> = out.iter().filter_map(PaperRecord::arxiv_id).collect();
        assert_eq!(ids, vec!["2501.00005", "2501.00010", "2501.00008", "2501.00001", "2501.00009"]);
        let scores: Vec<Option<f64>> = out.iter().map(PaperRecord::score).collect();
        assert_eq!(scores, vec![Some(5.0), None, Some(8.0), Some(1.0), Some(9.0)]);
        assert!(scorer.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn zero_concurrency_still_runs() {
        let scorer = Arc::new(DigitScorer { in_flight: AtomicUsize::new(0), peak: AtomicUsize::new(0) });
        let out = enrich_scores(vec![paper("2501.00003")], scorer, 0).await;
        assert_eq!(out[0].score(), Some(3.0));
    }
}
