/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

/// Number of calendar days a tracker count is retained for, counting today
/// (spec: "today - 6 inclusive, seven timestamps total").
pub const RETENTION_DAYS: i64 = 7;

/// The start-of-day (UTC) timestamp a pack and its persisted rows are keyed
/// by. A plain calendar date already *is* "start of day": there's no
/// separate time component to normalize away.
pub type Day = NaiveDate;

/// `today - (RETENTION_DAYS - 1)`, the oldest day still inside the retention
/// window.
pub fn retention_cutoff(today: Day) -> Day {
    today - chrono::Duration::days(RETENTION_DAYS - 1)
}

/// The start-of-day bucket for a wall-clock instant.
pub fn start_of_day(now: DateTime<Utc>) -> Day {
    now.date_naive()
}

/// In-memory summary of blocked-tracker counts for one calendar day (spec
/// §3). Owned exclusively by the aggregator actor; never accessed from any
/// other task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedTrackersPack {
    pub timestamp: Day,
    pub trackers: HashMap<String, i64>,
}

impl BlockedTrackersPack {
    pub fn empty(day: Day) -> Self {
        Self {
            timestamp: day,
            trackers: HashMap::new(),
        }
    }

    /// Increments the counter for `company`, creating it at 1 if this is its
    /// first appearance today.
    pub fn record(&mut self, company: &str) {
        *self.trackers.entry(company.to_string()).or_insert(0) += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}
