// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Paper discovery over arXiv's advanced-search page.
//!
//! There's no API behind the page, only HTML. Requests are built from
//! configuration ([`query`]), fetched once ([`fetcher`]), and parsed field by field with
//! ordered fallbacks ([`parser`]). [`engine::SearchEngine`] ties it together per search
//! intent and [`batch::BatchCoordinator`] walks rosters of authors or topics.

pub mod batch;
pub mod config;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod fallback;
pub mod fetcher;
pub mod model;
pub mod parser;
pub mod query;
pub mod roster;

pub use batch::{BatchCoordinator, BatchReport, BatchWindow, EntityKind, EntityOutcome};
pub use config::{BatchSettings, EngineSettings, FetchConfig, SourceConfig};
pub use engine::SearchEngine;
pub use enrich::{enrich_scores, Scorer};
pub use error::{QueryError, SearchError, TransportError};
pub use fallback::{FallbackPlanner, FallbackStrategy};
pub use fetcher::{Fetch, HttpFetcher};
pub use model::{
    PaperRecord, SearchFilters, SearchIntent, SearchMetrics, SearchQuery, SearchResult, SortOrder,
};
pub use parser::{ParsedPage, ResultParser};
