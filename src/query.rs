// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Turns search intents into advanced-search requests. No I/O happens here.

use crate::config::SourceConfig;
use crate::model::SortOrder;
use chrono::NaiveDate;
use serde::Serialize;

/// A ready-to-send GET: endpoint plus ordered query pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    pub endpoint: String,
    pub params: Vec<(String, String)>,
}

impl SearchRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Full URL, for logs and reports.
    pub fn url(&self) -> String {
        match reqwest::Url::parse_with_params(&self.endpoint, &self.params) {
            Ok(url) => url.to_string(),
            Err(_) => self.endpoint.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
        }
    }
}

/// One row of the advanced-search form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub operator: Operator,
    pub value: String,
    pub field: String,
}

impl Term {
    pub fn new(operator: Operator, value: impl Into<String>, field: impl Into<String>) -> Self {
        Self { operator, value: value.into(), field: field.into() }
    }
}

/// Which dates the request restricts to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DateClause {
    AllDates,
    Range { from: String, to: String },
}

struct RequestParts<'a> {
    terms: Vec<Term>,
    classifications: &'a [&'a str],
    dates: DateClause,
    size: usize,
    order: SortOrder,
}

fn order_value(cfg: &SourceConfig, order: SortOrder) -> &str {
    match order {
        SortOrder::DateDesc | SortOrder::Score => &cfg.values.order_date_desc,
        SortOrder::DateAsc => &cfg.values.order_date_asc,
        SortOrder::Relevance => &cfg.values.order_relevance,
    }
}

fn assemble(cfg: &SourceConfig, parts: RequestParts<'_>) -> SearchRequest {
    let names = &cfg.params;
    let values = &cfg.values;
    let mut params: Vec<(String, String)> = vec![(names.advanced.clone(), String::new())];

    for (i, term) in parts.terms.iter().enumerate() {
        params.push((names.term_operator(i), term.operator.as_str().to_string()));
        params.push((names.term_value(i), term.value.clone()));
        params.push((names.term_field(i), term.field.clone()));
    }

    for (name, value) in parts.classifications.iter().filter_map(|c| cfg.classification_flag(c)) {
        params.push((name.clone(), value.clone()));
    }
    params.push((names.include_cross_list.clone(), values.include_cross_list.clone()));

    match parts.dates {
        DateClause::AllDates => {
            params.push((names.date_filter_by.clone(), values.all_dates.clone()));
        }
        DateClause::Range { from, to } => {
            params.push((names.date_filter_by.clone(), values.date_range.clone()));
            params.push((names.date_from.clone(), from));
            params.push((names.date_to.clone(), to));
            params.push((names.date_type.clone(), values.submitted_date.clone()));
        }
    }
    params.push((names.date_year.clone(), String::new()));
    params.push((names.abstracts.clone(), values.show_abstracts.clone()));
    params.push((names.size.clone(), parts.size.to_string()));
    params.push((names.order.clone(), order_value(cfg, parts.order).to_string()));

    SearchRequest { endpoint: cfg.endpoint.clone(), params }
}

/// The source refuses a range whose ends are equal, so `to` moves one day forward.
/// Dates that don't parse are passed through and left for the source to reject.
fn widen_equal_bounds(from: &str, to: &str) -> String {
    if from != to {
        return to.to_string();
    }
    match NaiveDate::parse_from_str(from, "%Y-%m-%d") {
        Ok(day) => day
            .succ_opt()
            .map_or_else(|| to.to_string(), |next| next.format("%Y-%m-%d").to_string()),
        Err(_) => to.to_string(),
    }
}

fn date_clause(from: Option<&str>, to: Option<&str>) -> DateClause {
    match (from, to) {
        (Some(from), Some(to)) => DateClause::Range { from: from.to_string(), to: to.to_string() },
        _ => DateClause::AllDates,
    }
}

/// Papers by one author, exact-name match, optionally inside `[date_from, date_to]`.
pub fn build_author_query(
    cfg: &SourceConfig,
    name: &str,
    date_from: Option<&str>,
    date_to: Option<&str>,
) -> SearchRequest {
    let dates = match (date_from, date_to) {
        (Some(from), Some(to)) => DateClause::Range {
            from: from.to_string(),
            to: widen_equal_bounds(from, to),
        },
        _ => DateClause::AllDates,
    };
    // author lookups cover the physics archives as well
    assemble(
        cfg,
        RequestParts {
            terms: vec![Term::new(
                Operator::And,
                format!("\"{}\"", name.trim()),
                cfg.values.author_field.clone(),
            )],
            classifications: &["computer_science", "physics"],
            dates,
            size: cfg.page_size,
            order: SortOrder::DateDesc,
        },
    )
}

/// Papers carrying every topic. Without both dates the request covers all dates.
pub fn build_topic_query(
    cfg: &SourceConfig,
    topics: &[String],
    date_from: Option<&str>,
    date_to: Option<&str>,
    classification: &str,
    field: &str,
    size: usize,
) -> SearchRequest {
    let terms = topics
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| Term::new(Operator::And, t, field))
        .collect();
    assemble(
        cfg,
        RequestParts {
            terms,
            classifications: &[classification],
            dates: date_clause(date_from, date_to),
            size,
            order: SortOrder::DateDesc,
        },
    )
}

fn quote_phrase(term: &str) -> String {
    let term = term.trim().replace('"', "");
    if term.contains(char::is_whitespace) {
        format!("\"{term}\"")
    } else {
        term
    }
}

/// Any of `keywords`, optionally restricted to any of `categories`.
pub fn build_keyword_query(
    cfg: &SourceConfig,
    keywords: &[String],
    categories: &[String],
    size: usize,
    order: SortOrder,
) -> SearchRequest {
    let mut terms: Vec<Term> = keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .enumerate()
        .map(|(i, k)| {
            let op = if i == 0 { Operator::And } else { Operator::Or };
            Term::new(op, quote_phrase(k), cfg.values.all_field.clone())
        })
        .collect();

    let cats: Vec<&str> = categories.iter().map(|c| c.trim()).filter(|c| !c.is_empty()).collect();
    if !cats.is_empty() {
        terms.push(Term::new(Operator::And, cats.join(" OR "), cfg.category_field.clone()));
    }

    assemble(
        cfg,
        RequestParts {
            terms,
            classifications: &[],
            dates: DateClause::AllDates,
            size,
            order,
        },
    )
}

/// Everything at once: all topics, any author, none of the excluded categories,
/// nothing submitted before `date_from`.
pub fn build_hybrid_query(
    cfg: &SourceConfig,
    topics: &[String],
    authors: &[String],
    exclude_categories: &[String],
    date_from: Option<&str>,
    size: usize,
    order: SortOrder,
) -> SearchRequest {
    let mut terms: Vec<Term> = topics
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| Term::new(Operator::And, t.trim(), cfg.values.all_field.clone()))
        .collect();

    let authors: Vec<&String> = authors.iter().filter(|a| !a.trim().is_empty()).collect();
    for (i, author) in authors.iter().enumerate() {
        // first author joins the topics, the rest widen it
        let op = if i == 0 { Operator::And } else { Operator::Or };
        terms.push(Term::new(op, format!("\"{}\"", author.trim()), cfg.values.author_field.clone()));
    }

    for cat in exclude_categories.iter().filter(|c| !c.trim().is_empty()) {
        terms.push(Term::new(Operator::Not, cat.trim(), cfg.category_field.clone()));
    }

    let dates = match date_from {
        Some(from) => DateClause::Range { from: from.to_string(), to: String::new() },
        None => DateClause::AllDates,
    };

    assemble(
        cfg,
        RequestParts {
            terms,
            classifications: &[],
            dates,
            size,
            order,
        },
    )
}
