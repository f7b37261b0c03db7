// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Pulls paper records out of an advanced-search results page.
//!
//! The page is UI markup and drifts. Every field has an ordered list of places to look
//! ([`ParseRules`]); the first one that yields a usable value wins and a field nobody finds
//! stays empty. Teaching the parser a new layout means adding a locator, not code.

use crate::model::{PaperDraft, PaperRecord};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Where to look for one field inside an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// Text of the element(s) matching a CSS selector.
    Css(&'static str),
    /// First capture group of a regex over the entry's markup.
    Markup(&'static str),
    /// First capture group of a regex over the entry's visible text.
    Text(&'static str),
}

/// How to cut a page into per-entry fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segmenter {
    /// Each matching element is one entry.
    Css(&'static str),
    /// Each regex match starts a new entry that runs to the next match.
    Anchor(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct ParseRules {
    /// Regexes whose first group is the server's total hit count.
    pub total: &'static [&'static str],
    /// Tried in order until one produces fragments.
    pub segments: &'static [Segmenter],
    /// Shape of an identifier; whatever a locator returns is cut down to this.
    pub id_shape: &'static str,
    pub arxiv_id: &'static [Locator],
    pub title: &'static [Locator],
    pub authors: &'static [Locator],
    pub subjects: &'static [Locator],
    /// Complete abstracts, kept as they are apart from toggle text.
    pub abstract_full: &'static [Locator],
    /// Tried when no complete abstract is found; cut at the truncation ellipsis.
    pub abstract_text: &'static [Locator],
    pub submitted_date: &'static [Locator],
    pub comments: &'static [Locator],
}

/// Layouts seen on arxiv.org search and listing pages.
pub const ARXIV_RULES: ParseRules = ParseRules {
    total: &[
        r"Showing\s+[\d,]+\s*(?:–|-|&ndash;)\s*[\d,]+\s+of\s+([\d,]+)\s+results",
        r"of\s+([\d,]+)\s+results",
    ],
    segments: &[
        Segmenter::Css("li.arxiv-result"),
        Segmenter::Anchor(r"arXiv:\d{4}\.\d{4,5}"),
    ],
    id_shape: r"\d{4}\.\d{4,5}(?:v\d+)?",
    arxiv_id: &[
        Locator::Markup(r#"href="https?://arxiv\.org/abs/(\d{4}\.\d{4,5}(?:v\d+)?)""#),
        Locator::Css("p.list-title a"),
        Locator::Text(r"arXiv:\s*(\d{4}\.\d{4,5}(?:v\d+)?)"),
    ],
    title: &[
        Locator::Css("p.title"),
        Locator::Css("div.list-title"),
        Locator::Text(r"(?m)^\s*Title:\s*(.+)$"),
    ],
    authors: &[Locator::Css("p.authors a"), Locator::Css("div.list-authors a")],
    subjects: &[Locator::Css("div.tags span.tag"), Locator::Css("span.tag")],
    abstract_full: &[Locator::Css("span.abstract-full")],
    abstract_text: &[
        Locator::Css("span.abstract-short"),
        Locator::Css("p.abstract"),
        Locator::Css("div.meta > p.mathjax"),
        Locator::Text(r"Abstract:\s*(.+)"),
    ],
    submitted_date: &[
        Locator::Text(r"Submitted\s+([^;]+);"),
        Locator::Text(r"originally announced\s+([A-Za-z]+\s+\d{4})"),
    ],
    comments: &[Locator::Css("p.comments"), Locator::Css("div.list-comments")],
};

pub const MIN_ABSTRACT_CHARS: usize = 20;

/// What one page yielded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    pub total: u64,
    pub records: Vec<PaperRecord>,
}

enum Matcher {
    Css(Selector),
    Markup(Regex),
    Text(Regex),
}

enum Splitter {
    Css(Selector),
    Anchor(Regex),
}

#[derive(Clone, Copy)]
enum Field {
    Id,
    Title,
    Author,
    Subject,
    FullAbstract,
    Abstract,
    Submitted,
    Comments,
}

struct Fields {
    arxiv_id: Vec<Matcher>,
    title: Vec<Matcher>,
    authors: Vec<Matcher>,
    subjects: Vec<Matcher>,
    abstract_full: Vec<Matcher>,
    abstract_text: Vec<Matcher>,
    submitted_date: Vec<Matcher>,
    comments: Vec<Matcher>,
}

/// One entry's markup, parsed once and shared by every locator.
struct Fragment {
    markup: String,
    html: Html,
    text: String,
}

impl Fragment {
    fn new(markup: String) -> Self {
        let html = Html::parse_fragment(&markup);
        let text = html.root_element().text().collect();
        Self { markup, html, text }
    }
}

pub struct ResultParser {
    no_results_marker: String,
    total: Vec<Regex>,
    segments: Vec<Splitter>,
    fields: Fields,
    id_shape: Option<Regex>,
}

fn compile_regex(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern, error = %e, "skipping invalid pattern");
            None
        }
    }
}

fn compile_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!(selector, error = ?e, "skipping invalid selector");
            None
        }
    }
}

fn compile_locators(locators: &[Locator]) -> Vec<Matcher> {
    locators
        .iter()
        .filter_map(|loc| match *loc {
            Locator::Css(s) => compile_selector(s).map(Matcher::Css),
            Locator::Markup(p) => compile_regex(p).map(Matcher::Markup),
            Locator::Text(p) => compile_regex(p).map(Matcher::Text),
        })
        .collect()
}

/// Text under `el`, leaving out anything inside a link when `skip_links` is set.
fn visible_text(el: ElementRef<'_>, skip_links: bool) -> String {
    if !skip_links {
        return el.text().collect();
    }
    let mut out = String::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let in_link = node
            .ancestors()
            .take_while(|a| a.id() != el.id())
            .any(|a| a.value().as_element().is_some_and(|e| e.name() == "a"));
        if !in_link {
            out.push_str(text);
        }
    }
    out
}

fn markup_text(markup: &str, skip_links: bool) -> String {
    let html = Html::parse_fragment(markup);
    visible_text(html.root_element(), skip_links)
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops a trailing "▽ More" / "△ Less" toggle left outside a link.
fn strip_toggle(text: &str) -> &str {
    let mut text = text;
    for toggle in ["More", "Less"] {
        if let Some(head) = text.strip_suffix(toggle).map(str::trim_end) {
            if let Some(head) = head.strip_suffix(['▽', '△']) {
                text = head.trim_end();
            }
        }
    }
    text
}

fn strip_label<'a>(text: &'a str, label: &str) -> &'a str {
    match text.get(..label.len()) {
        Some(head) if head.eq_ignore_ascii_case(label) => text[label.len()..].trim_start(),
        _ => text,
    }
}

impl Default for ResultParser {
    fn default() -> Self {
        Self::new(&ARXIV_RULES, "Sorry, your query returned no results")
    }
}

impl ResultParser {
    pub fn new(rules: &ParseRules, no_results_marker: impl Into<String>) -> Self {
        let segments = rules
            .segments
            .iter()
            .filter_map(|seg| match *seg {
                Segmenter::Css(s) => compile_selector(s).map(Splitter::Css),
                Segmenter::Anchor(p) => compile_regex(p).map(Splitter::Anchor),
            })
            .collect();

        Self {
            no_results_marker: no_results_marker.into(),
            total: rules.total.iter().filter_map(|p| compile_regex(p)).collect(),
            segments,
            fields: Fields {
                arxiv_id: compile_locators(rules.arxiv_id),
                title: compile_locators(rules.title),
                authors: compile_locators(rules.authors),
                subjects: compile_locators(rules.subjects),
                abstract_full: compile_locators(rules.abstract_full),
                abstract_text: compile_locators(rules.abstract_text),
                submitted_date: compile_locators(rules.submitted_date),
                comments: compile_locators(rules.comments),
            },
            id_shape: compile_regex(rules.id_shape),
        }
    }

    /// Never fails: a page the parser can't make sense of just yields nothing.
    pub fn parse(&self, payload: &str) -> ParsedPage {
        if payload.contains(&self.no_results_marker) {
            return ParsedPage::default();
        }

        let total = self.total_count(payload);
        let fragments = self.segment(payload);
        let seen = fragments.len();

        let records: Vec<PaperRecord> = fragments
            .into_iter()
            .filter_map(|markup| self.draft(&Fragment::new(markup)).finish(total))
            .collect();

        if records.len() < seen {
            debug!(dropped = seen - records.len(), "entries without title or id");
        }
        ParsedPage { total, records }
    }

    fn total_count(&self, payload: &str) -> u64 {
        self.total
            .iter()
            .find_map(|re| re.captures(payload))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().replace(',', "").parse().ok())
            .unwrap_or(0)
    }

    fn segment(&self, payload: &str) -> Vec<String> {
        for splitter in &self.segments {
            let fragments = match splitter {
                Splitter::Css(sel) => {
                    let doc = Html::parse_document(payload);
                    doc.select(sel).map(|el| el.html()).collect::<Vec<_>>()
                }
                Splitter::Anchor(re) => {
                    let starts: Vec<usize> = re.find_iter(payload).map(|m| m.start()).collect();
                    starts
                        .iter()
                        .enumerate()
                        .map(|(i, &start)| {
                            let end = starts.get(i + 1).copied().unwrap_or(payload.len());
                            payload[start..end].to_string()
                        })
                        .collect()
                }
            };
            if !fragments.is_empty() {
                return fragments;
            }
        }
        Vec::new()
    }

    fn draft(&self, frag: &Fragment) -> PaperDraft {
        let f = &self.fields;
        PaperDraft {
            arxiv_id: self.first(&f.arxiv_id, frag, Field::Id),
            title: self.first(&f.title, frag, Field::Title),
            authors: self.all(&f.authors, frag, Field::Author),
            abstract_text: self
                .first(&f.abstract_full, frag, Field::FullAbstract)
                .or_else(|| self.first(&f.abstract_text, frag, Field::Abstract)),
            subjects: self.all(&f.subjects, frag, Field::Subject),
            submitted_date: self.first(&f.submitted_date, frag, Field::Submitted),
            comments: self.first(&f.comments, frag, Field::Comments),
        }
    }

    /// First locator that yields a usable value.
    fn first(&self, matchers: &[Matcher], frag: &Fragment, field: Field) -> Option<String> {
        let skip_links = matches!(field, Field::Abstract | Field::FullAbstract);
        matchers.iter().find_map(|m| {
            let raw = match m {
                Matcher::Css(sel) => frag
                    .html
                    .select(sel)
                    .next()
                    .map(|el| visible_text(el, skip_links)),
                Matcher::Markup(re) => re
                    .captures(&frag.markup)
                    .and_then(|c| c.get(1))
                    .map(|m| markup_text(m.as_str(), skip_links)),
                Matcher::Text(re) => re
                    .captures(&frag.text)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string()),
            };
            raw.and_then(|r| self.clean(field, &r))
        })
    }

    /// First locator that yields a non-empty list.
    fn all(&self, matchers: &[Matcher], frag: &Fragment, field: Field) -> Vec<String> {
        for m in matchers {
            let raw: Vec<String> = match m {
                Matcher::Css(sel) => frag.html.select(sel).map(|el| visible_text(el, false)).collect(),
                Matcher::Markup(re) => re
                    .captures_iter(&frag.markup)
                    .filter_map(|c| c.get(1))
                    .map(|m| markup_text(m.as_str(), false))
                    .collect(),
                Matcher::Text(re) => re
                    .captures_iter(&frag.text)
                    .filter_map(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
                    .collect(),
            };
            let values: Vec<String> = raw.iter().filter_map(|r| self.clean(field, r)).collect();
            if !values.is_empty() {
                return values;
            }
        }
        Vec::new()
    }

    fn clean(&self, field: Field, raw: &str) -> Option<String> {
        let value = match field {
            Field::Id => match &self.id_shape {
                Some(shape) => shape.find(raw).map(|m| m.as_str().to_string()),
                None => Some(collapse(raw)),
            },
            Field::Title => Some(strip_label(&collapse(raw), "Title:").to_string()),
            Field::Author => Some(collapse(raw).trim_matches(',').trim().to_string()),
            Field::Subject | Field::Submitted => Some(collapse(raw)),
            Field::Comments => Some(strip_label(&collapse(raw), "Comments:").to_string()),
            Field::FullAbstract => self.clean_abstract(raw, false),
            Field::Abstract => self.clean_abstract(raw, true),
        };
        value.filter(|v| !v.is_empty())
    }

    fn clean_abstract(&self, raw: &str, truncated: bool) -> Option<String> {
        let mut text = raw;
        if truncated {
            for marker in ["…", "&hellip;"] {
                if let Some(at) = text.find(marker) {
                    text = &text[..at];
                }
            }
        }
        let text = collapse(text);
        let text = strip_toggle(&text);
        let text = strip_label(text, "Abstract:");
        (text.chars().count() >= MIN_ABSTRACT_CHARS).then(|| text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = include_str!("../tests/fixtures/search_results.html");

    fn parser() -> ResultParser {
        ResultParser::default()
    }

    #[test]
    fn no_results_marker_short_circuits() {
        let html = r#"<html><body><h1>Showing 1&ndash;50 of 99 results</h1>
            <p class="is-size-4">Sorry, your query returned no results</p>
            <li class="arxiv-result"><p class="title">Ghost</p></li></body></html>"#;
        assert_eq!(parser().parse(html), ParsedPage { total: 0, records: vec![] });
    }

    #[test]
    fn reads_total_with_thousands_separator() {
        let page = parser().parse(PAGE);
        assert_eq!(page.total, 1234);
        assert!(page.records.iter().all(|r| r.total_results() == 1234));
    }

    #[test]
    fn full_entry() {
        let page = parser().parse(PAGE);
        let first = &page.records[0];
        assert_eq!(first.arxiv_id(), Some("2501.12345"));
        assert_eq!(first.url(), Some("https://arxiv.org/abs/2501.12345"));
        assert_eq!(first.title(), Some("Guarding Agents Against Prompt Injection"));
        assert_eq!(first.authors(), ["Jane Doe".to_string(), "Richard Roe".to_string()]);
        assert_eq!(first.subjects(), ["cs.CR".to_string(), "cs.AI".to_string()]);
        assert_eq!(
            first.abstract_text(),
            Some("Large language model agents read untrusted content and act on it. We show how injected instructions hijack them and propose a guard.")
        );
        assert_eq!(first.submitted_date(), Some("15 January, 2025"));
        assert_eq!(first.comments(), Some("12 pages, 4 figures"));
    }

    #[test]
    fn short_abstract_is_cut_at_the_ellipsis() {
        let page = parser().parse(PAGE);
        let second = &page.records[1];
        assert_eq!(second.arxiv_id(), Some("2501.06789"));
        assert_eq!(
            second.abstract_text(),
            Some("Short abstract only, which is long enough to keep around")
        );
        assert_eq!(second.comments(), None);
    }

    #[test]
    fn entries_without_title_or_id_are_dropped() {
        let page = parser().parse(PAGE);
        // five <li> entries in the fixture, one has neither title nor id
        assert_eq!(page.records.len(), 4);
        let ids: Vec<Option<&str>> = page.records.iter().map(|r| r.arxiv_id()).collect();
        assert_eq!(
            ids,
            vec![Some("2501.12345"), Some("2501.06789"), Some("2412.00042v3"), None]
        );
    }

    #[test]
    fn tiny_abstract_is_discarded() {
        let page = parser().parse(PAGE);
        let third = &page.records[2];
        assert_eq!(third.title(), None);
        assert_eq!(third.abstract_text(), None);
    }

    #[test]
    fn id_and_title_only() {
        let html = r#"<ol><li class="arxiv-result">
            <p class="list-title"><a href="https://arxiv.org/abs/2501.12345">arXiv:2501.12345</a></p>
            <p class="title is-5 mathjax">Foo Bar</p>
        </li></ol>"#;
        let page = parser().parse(html);
        assert_eq!(page.records.len(), 1);
        let r = &page.records[0];
        assert_eq!(r.arxiv_id(), Some("2501.12345"));
        assert_eq!(r.url(), Some("https://arxiv.org/abs/2501.12345"));
        assert_eq!(r.title(), Some("Foo Bar"));
        assert!(r.authors().is_empty());
        assert_eq!(r.abstract_text(), None);

        let json = serde_json::to_value(r).unwrap();
        assert!(json.get("authors").is_none());
        assert!(json.get("abstract").is_none());
    }

    #[test]
    fn abstract_drops_link_text_and_trailing_junk() {
        let html = r#"<li class="arxiv-result"><p class="title">T</p>
            <span class="abstract-short">Lorem ipsum dolor sit amet consectetur <a>More</a>…rest of junk</span></li>"#;
        let page = parser().parse(html);
        let text = page.records[0].abstract_text().unwrap();
        assert_eq!(text, "Lorem ipsum dolor sit amet consectetur");
        assert!(!text.contains("More"));
        assert!(!text.contains("junk"));
    }

    #[test]
    fn ellipsis_inside_a_full_abstract_is_kept() {
        let html = r#"<li class="arxiv-result"><p class="title">Maxima</p>
            <span class="abstract-short">We study sequences x1, &hellip; <a>&#9661; More</a></span>
            <span class="abstract-full">We study sequences x1, &hellip;, xn of random variables and prove sharp bounds on their maxima. <a>&#9651; Less</a></span></li>"#;
        let page = parser().parse(html);
        assert_eq!(
            page.records[0].abstract_text(),
            Some("We study sequences x1, …, xn of random variables and prove sharp bounds on their maxima.")
        );
    }

    #[test]
    fn falls_back_to_loose_segmentation() {
        let html = r#"<dl>
            <dt><a href="/abs/2502.00001">arXiv:2502.00001</a> [pdf]</dt>
            <dd><div class="meta"><div class="list-title mathjax"><span class="descriptor">Title:</span> First Listing Paper</div>
            <div class="list-authors"><a href="/a/x">Ada Lovelace</a></div></div></dd>
            <dt><a href="/abs/2502.00002">arXiv:2502.00002</a> [pdf]</dt>
            <dd><div class="meta"><div class="list-title mathjax"><span class="descriptor">Title:</span> Second Listing Paper</div></div></dd>
        </dl>"#;
        let page = parser().parse(html);
        assert_eq!(page.total, 0);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].arxiv_id(), Some("2502.00001"));
        assert_eq!(page.records[0].title(), Some("First Listing Paper"));
        assert_eq!(page.records[0].authors(), ["Ada Lovelace".to_string()]);
        assert_eq!(page.records[1].title(), Some("Second Listing Paper"));
    }

    #[test]
    fn garbage_yields_nothing() {
        for junk in ["", "<<<>>>", "plain text", "<li class=\"arxiv-result\"></li>"] {
            assert!(parser().parse(junk).records.is_empty());
        }
    }

    #[test]
    fn parsing_is_repeatable() {
        let p = parser();
        assert_eq!(p.parse(PAGE), p.parse(PAGE));
    }

    #[test]
    fn custom_rules_change_behaviour_without_code() {
        const RULES: ParseRules = ParseRules {
            segments: &[Segmenter::Css("article.paper")],
            title: &[Locator::Css("h3")],
            ..ARXIV_RULES
        };
        let html = r#"<article class="paper"><h3>Data Driven</h3></article>"#;
        let page = ResultParser::new(&RULES, "nothing here").parse(html);
        assert_eq!(page.records[0].title(), Some("Data Driven"));
    }
}
