// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

#![allow(dead_code)]

use arxiv_scraper::error::TransportError;
use arxiv_scraper::fetcher::Fetch;
use arxiv_scraper::query::SearchRequest;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub const NO_RESULTS: &str =
    "<html><body><p class=\"is-size-4\">Sorry, your query returned no results</p></body></html>";

pub fn fixture() -> String {
    std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/search_results.html"))
        .unwrap()
}

/// A results page with one entry per `(id, title, submitted)`.
pub fn page(total: u64, entries: &[(&str, &str, Option<&str>)]) -> String {
    let mut html = format!("<h1 class=\"title\">Showing 1&ndash;{} of {total} results</h1><ol>", entries.len());
    for (id, title, submitted) in entries {
        html.push_str(&format!(
            "<li class=\"arxiv-result\">\
               <p class=\"list-title\"><a href=\"https://arxiv.org/abs/{id}\">arXiv:{id}</a></p>\
               <p class=\"title is-5 mathjax\">{title}</p>\
               <p class=\"authors\"><span>Authors:</span> <a href=\"/a\">Jane Doe</a>, <a href=\"/b\">Richard Roe</a></p>"
        ));
        if let Some(date) = submitted {
            html.push_str(&format!("<p class=\"is-size-7\"><span>Submitted</span> {date}; </p>"));
        }
        html.push_str("</li>");
    }
    html.push_str("</ol>");
    html
}

pub fn timeout() -> TransportError {
    TransportError::Timeout { url: "https://arxiv.org/search/advanced".into(), seconds: 30 }
}

/// Serves canned responses in order and remembers every request. Runs out into
/// "no results" pages.
#[derive(Default)]
pub struct ScriptedFetch {
    responses: Mutex<VecDeque<Result<String, TransportError>>>,
    seen: Mutex<Vec<SearchRequest>>,
    urls: Mutex<Vec<String>>,
}

impl ScriptedFetch {
    pub fn new(responses: Vec<Result<String, TransportError>>) -> Self {
        Self { responses: Mutex::new(responses.into()), ..Self::default() }
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    fn next(&self) -> Result<String, TransportError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(NO_RESULTS.to_string()))
    }
}

#[async_trait]
impl Fetch for ScriptedFetch {
    async fn fetch(&self, request: &SearchRequest) -> Result<String, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        self.next()
    }

    async fn fetch_url(&self, url: &str) -> Result<String, TransportError> {
        self.urls.lock().unwrap().push(url.to_string());
        self.next()
    }
}
