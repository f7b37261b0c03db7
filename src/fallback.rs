// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Widening date windows for topic searches.
//!
//! The planner only lists windows. Running them, and stopping at the first one that finds
//! anything, is the engine's job.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const ALL_DATES_LABEL: &str = "all dates";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackStrategy {
    pub label: String,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl FallbackStrategy {
    fn unconstrained() -> Self {
        Self { label: ALL_DATES_LABEL.to_string(), date_from: None, date_to: None }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.date_from.is_none() && self.date_to.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPlanner {
    /// Trailing window sizes tried after the exact range, narrowest first.
    pub widen_days: Vec<i64>,
}

impl Default for FallbackPlanner {
    fn default() -> Self {
        Self { widen_days: vec![7, 30] }
    }
}

impl FallbackPlanner {
    pub fn new(widen_days: Vec<i64>) -> Self {
        Self { widen_days }
    }

    /// Exact window (when both ends are given), then each trailing window ending at `to`
    /// (when `to` is a `YYYY-MM-DD` date), then all dates. Never empty.
    pub fn plan(&self, from: Option<&str>, to: Option<&str>) -> Vec<FallbackStrategy> {
        let mut plan = Vec::with_capacity(self.widen_days.len() + 2);

        if let (Some(from), Some(to)) = (from, to) {
            plan.push(FallbackStrategy {
                label: format!("exact range ({from} to {to})"),
                date_from: Some(from.to_string()),
                date_to: Some(to.to_string()),
            });
        }

        let end = to.and_then(|t| {
            NaiveDate::parse_from_str(t, "%Y-%m-%d")
                .ok()
                .map(|day| (t, day))
        });
        if let Some((to, end)) = end {
            for days in &self.widen_days {
                let Some(start) = end.checked_sub_signed(chrono::Duration::days(*days)) else {
                    continue;
                };
                let start = start.format("%Y-%m-%d").to_string();
                plan.push(FallbackStrategy {
                    label: format!("last {days} days ({start} to {to})"),
                    date_from: Some(start),
                    date_to: Some(to.to_string()),
                });
            }
        }

        plan.push(FallbackStrategy::unconstrained());
        plan
    }
}
