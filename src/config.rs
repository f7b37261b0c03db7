// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Tunables for talking to the advanced-search page and for the engine around it.
//!
//! Parameter names and values are part of the source's form, not ours, so they live here
//! as data. When arXiv renames a field the fix is a config change.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Names and fixed values of the advanced-search form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub params: ParamNames,
    #[serde(default)]
    pub values: ParamValues,
    /// Classification key -> (parameter, value) switched on for it.
    #[serde(default = "default_classifications")]
    pub classifications: BTreeMap<String, (String, String)>,
    /// Field used for the category clause of keyword searches.
    #[serde(default = "default_category_field")]
    pub category_field: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_no_results_marker")]
    pub no_results_marker: String,
}

/// Parameter names. `{i}` in a term template is replaced by the term index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamNames {
    pub advanced: String,
    pub term_operator: String,
    pub term_value: String,
    pub term_field: String,
    pub include_cross_list: String,
    pub date_filter_by: String,
    pub date_from: String,
    pub date_to: String,
    pub date_type: String,
    pub date_year: String,
    pub abstracts: String,
    pub size: String,
    pub order: String,
}

impl Default for ParamNames {
    fn default() -> Self {
        Self {
            advanced: "advanced".to_string(),
            term_operator: "terms-{i}-operator".to_string(),
            term_value: "terms-{i}-term".to_string(),
            term_field: "terms-{i}-field".to_string(),
            include_cross_list: "classification-include_cross_list".to_string(),
            date_filter_by: "date-filter_by".to_string(),
            date_from: "date-from_date".to_string(),
            date_to: "date-to_date".to_string(),
            date_type: "date-date_type".to_string(),
            date_year: "date-year".to_string(),
            abstracts: "abstracts".to_string(),
            size: "size".to_string(),
            order: "order".to_string(),
        }
    }
}

impl ParamNames {
    pub fn term_operator(&self, i: usize) -> String {
        self.term_operator.replace("{i}", &i.to_string())
    }

    pub fn term_value(&self, i: usize) -> String {
        self.term_value.replace("{i}", &i.to_string())
    }

    pub fn term_field(&self, i: usize) -> String {
        self.term_field.replace("{i}", &i.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamValues {
    pub date_range: String,
    pub all_dates: String,
    pub submitted_date: String,
    pub show_abstracts: String,
    pub include_cross_list: String,
    pub order_date_desc: String,
    pub order_date_asc: String,
    pub order_relevance: String,
    pub author_field: String,
    pub all_field: String,
}

impl Default for ParamValues {
    fn default() -> Self {
        Self {
            date_range: "date_range".to_string(),
            all_dates: "all_dates".to_string(),
            submitted_date: "submitted_date".to_string(),
            show_abstracts: "show".to_string(),
            include_cross_list: "include".to_string(),
            order_date_desc: "-announced_date_first".to_string(),
            order_date_asc: "announced_date_first".to_string(),
            order_relevance: String::new(),
            author_field: "author".to_string(),
            all_field: "all".to_string(),
        }
    }
}

fn default_endpoint() -> String {
    "https://arxiv.org/search/advanced".to_string()
}

fn default_classifications() -> BTreeMap<String, (String, String)> {
    let mut map = BTreeMap::new();
    map.insert(
        "computer_science".to_string(),
        ("classification-computer_science".to_string(), "y".to_string()),
    );
    map.insert(
        "physics".to_string(),
        ("classification-physics_archives".to_string(), "all".to_string()),
    );
    map
}

fn default_category_field() -> String {
    "cross_list_category".to_string()
}

fn default_page_size() -> usize {
    50
}

fn default_no_results_marker() -> String {
    "Sorry, your query returned no results".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            params: ParamNames::default(),
            values: ParamValues::default(),
            classifications: default_classifications(),
            category_field: default_category_field(),
            page_size: default_page_size(),
            no_results_marker: default_no_results_marker(),
        }
    }
}

impl SourceConfig {
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Flag parameter for a classification, if the source knows it.
    pub fn classification_flag(&self, classification: &str) -> Option<&(String, String)> {
        self.classifications.get(classification)
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// One of these is picked at random when the client is opened.
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

fn default_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
        "Mozilla/5.0 (X11; Ubuntu; Linux x86_64) AppleWebKit/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36",
        "Mozilla/5.0 (X11; Fedora; Linux x86_64) AppleWebKit/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 12_5_1) AppleWebKit/537.36",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_redirects: default_max_redirects(),
            user_agents: default_user_agents(),
        }
    }
}

impl FetchConfig {
    #[must_use]
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn pick_user_agent(&self) -> Option<&str> {
        if self.user_agents.is_empty() {
            return None;
        }
        Some(self.user_agents[fastrand::usize(..self.user_agents.len())].as_str())
    }
}

/// Knobs of the search engine itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Score at or above which a paper counts as high quality.
    #[serde(default = "default_high_quality")]
    pub high_quality_threshold: f64,
    /// Paper count at or above which an entity counts as busy.
    #[serde(default = "default_many_results")]
    pub many_results_threshold: usize,
    #[serde(default = "default_author_cap")]
    pub author_distribution_cap: usize,
    #[serde(default = "default_topics")]
    pub default_topics: Vec<String>,
    #[serde(default = "default_classification")]
    pub classification: String,
    /// Concurrent scorer calls.
    #[serde(default = "default_enrich_concurrency")]
    pub enrich_concurrency: usize,
}

fn default_high_quality() -> f64 {
    7.0
}

fn default_many_results() -> usize {
    10
}

fn default_author_cap() -> usize {
    10
}

fn default_topics() -> Vec<String> {
    vec!["cs.AI".to_string(), "cs.CR".to_string()]
}

fn default_classification() -> String {
    "computer_science".to_string()
}

fn default_enrich_concurrency() -> usize {
    3
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            high_quality_threshold: default_high_quality(),
            many_results_threshold: default_many_results(),
            author_distribution_cap: default_author_cap(),
            default_topics: default_topics(),
            classification: default_classification(),
            enrich_concurrency: default_enrich_concurrency(),
        }
    }
}

impl EngineSettings {
    #[must_use]
    pub fn with_high_quality_threshold(mut self, threshold: f64) -> Self {
        self.high_quality_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_default_topics(mut self, topics: Vec<String>) -> Self {
        self.default_topics = topics;
        self
    }
}

/// Settings for batch runs over many entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSettings {
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Placeholder rows that show up in hand-maintained rosters.
    #[serde(default = "default_ignored")]
    pub ignored_names: Vec<String>,
}

fn default_delay_ms() -> u64 {
    3000
}

fn default_ignored() -> Vec<String> {
    vec!["aaa".to_string(), "test".to_string()]
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            ignored_names: default_ignored(),
        }
    }
}

impl BatchSettings {
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        let name = name.trim();
        self.ignored_names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_templates_take_the_index() {
        let names = ParamNames::default();
        assert_eq!(names.term_operator(0), "terms-0-operator");
        assert_eq!(names.term_value(3), "terms-3-term");
        assert_eq!(names.term_field(12), "terms-12-field");
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let cfg: SourceConfig = serde_json::from_str(r#"{"page_size": 25}"#).unwrap();
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.endpoint, "https://arxiv.org/search/advanced");
        assert!(cfg.classification_flag("computer_science").is_some());
        assert!(cfg.classification_flag("biology").is_none());
    }

    #[test]
    fn ignored_names_match_without_case() {
        let batch = BatchSettings::default();
        assert!(batch.is_ignored("AAA"));
        assert!(batch.is_ignored(" Test "));
        assert!(!batch.is_ignored("Testa"));
    }

    #[test]
    fn user_agent_comes_from_the_pool() {
        let fetch = FetchConfig::default();
        let ua = fetch.pick_user_agent().unwrap();
        assert!(fetch.user_agents.iter().any(|u| u == ua));
        let empty = FetchConfig { user_agents: vec![], ..FetchConfig::default() };
        assert!(empty.pick_user_agent().is_none());
    }
}
