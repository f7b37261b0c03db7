// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Researcher rosters kept as tab-separated sheets.

use crate::fetcher::Fetch;
use anyhow::{Context, Result};
use tracing::info;

/// A first row containing any of these cells is a header.
const HEADER_WORDS: [&str; 6] = ["name", "author", "researcher", "姓名", "作者", "研究者"];
const NAME_COLUMNS: [&str; 2] = ["name", "姓名"];

/// Names in a TSV sheet. With a header row the `name` column is used (or the first non-empty
/// cell when there is none); without one each row's cells are joined into a name.
pub fn parse_roster(tsv: &str) -> Vec<String> {
    let rows: Vec<Vec<&str>> = tsv
        .trim_start_matches('\u{feff}')
        .lines()
        .map(|line| line.split('\t').map(str::trim).collect::<Vec<_>>())
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .collect();

    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let is_header = first
        .iter()
        .any(|cell| HEADER_WORDS.contains(&cell.to_lowercase().as_str()));

    if !is_header {
        return rows
            .iter()
            .map(|row| row.iter().filter(|c| !c.is_empty()).copied().collect::<Vec<_>>().join(" "))
            .collect();
    }

    let name_column = first
        .iter()
        .position(|cell| NAME_COLUMNS.contains(&cell.to_lowercase().as_str()));
    rows[1..]
        .iter()
        .filter_map(|row| match name_column {
            Some(i) => row.get(i).copied().filter(|c| !c.is_empty()),
            None => row.iter().copied().find(|c| !c.is_empty()),
        })
        .map(String::from)
        .collect()
}

/// Loads a roster from an http(s) URL through `fetcher`, or from a local file.
pub async fn load_roster<F: Fetch + ?Sized>(source: &str, fetcher: &F) -> Result<Vec<String>> {
    let body = if source.starts_with("http://") || source.starts_with("https://") {
        fetcher
            .fetch_url(source)
            .await
            .with_context(|| format!("downloading roster from {source}"))?
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("reading roster file {source}"))?
    };
    let names = parse_roster(&body);
    info!(source, names = names.len(), "loaded roster");
    Ok(names)
}
