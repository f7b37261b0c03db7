// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use crate::model::SearchIntent;
use thiserror::Error;

/// Anything that goes wrong between sending a request and holding the page body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("could not reach {url}: {message}")]
    Connect { url: String, message: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("http client error: {0}")]
    Client(String),
}

impl TransportError {
    pub(crate) fn from_reqwest(url: &str, seconds: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { url: url.to_string(), seconds }
        } else if let Some(status) = err.status() {
            Self::Status { url: url.to_string(), status: status.as_u16() }
        } else if err.is_body() || err.is_decode() {
            Self::Body { url: url.to_string(), message: err.to_string() }
        } else {
            Self::Connect { url: url.to_string(), message: err.to_string() }
        }
    }
}

/// A query that can never be sent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("query has no authors, topics, keywords or text")]
    Empty,

    #[error("date_to ({to}) is earlier than date_from ({from})")]
    InvertedDates { from: String, to: String },

    #[error("{0} search has nothing to search for")]
    NoSearchTerms(SearchIntent),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Query(#[from] QueryError),
}
