/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::collections::HashMap;
use std::sync::Mutex;

use crate::pack::Day;

/// The persistence collaborator (spec §6): one row per `(timestamp,
/// company_name)` with a `count` column, mirroring the
/// `DailyBlockedTrackersEntity` schema. Accessed only from the aggregator's
/// database executor task, never from the actor holding the in-memory pack
/// (spec §5).
#[async_trait::async_trait]
pub trait BlockedTrackersStore: Send + Sync {
    /// Replaces (not adds to) the row for `(day, company)` with `count`.
    async fn upsert(&self, day: Day, company: &str, count: i64) -> Result<(), StoreError>;

    /// Deletes all rows with `timestamp < cutoff`.
    async fn purge_older_than(&self, cutoff: Day) -> Result<(), StoreError>;

    /// Sums counts per company across all rows with `timestamp >= cutoff`,
    /// excluding companies whose total is zero.
    async fn sum_since(&self, cutoff: Day) -> Result<HashMap<String, i64>, StoreError>;

    /// Counts per company for exactly `day`.
    async fn counts_for_day(&self, day: Day) -> Result<HashMap<String, i64>, StoreError>;

    /// Deletes every persisted row.
    async fn clear_all(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("blocked-trackers store operation failed: {0}")]
pub struct StoreError(pub String);

/// An in-memory `BlockedTrackersStore`, used by unit tests in place of a real
/// key/value table (spec §4.8).
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<(Day, String), i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: snapshot all rows, for asserting on persisted state.
    pub fn snapshot(&self) -> HashMap<(Day, String), i64> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl BlockedTrackersStore for MemoryStore {
    async fn upsert(&self, day: Day, company: &str, count: i64) -> Result<(), StoreError> {
        self.rows
            .lock()
            .unwrap()
            .insert((day, company.to_string()), count);
        Ok(())
    }

    async fn purge_older_than(&self, cutoff: Day) -> Result<(), StoreError> {
        self.rows.lock().unwrap().retain(|(day, _), _| *day >= cutoff);
        Ok(())
    }

    async fn sum_since(&self, cutoff: Day) -> Result<HashMap<String, i64>, StoreError> {
        let mut totals: HashMap<String, i64> = HashMap::new();
        for ((day, company), count) in self.rows.lock().unwrap().iter() {
            if *day >= cutoff {
                *totals.entry(company.clone()).or_insert(0) += count;
            }
        }
        totals.retain(|_, count| *count != 0);
        Ok(totals)
    }

    async fn counts_for_day(&self, day: Day) -> Result<HashMap<String, i64>, StoreError> {
        let totals: HashMap<String, i64> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|((d, _), _)| *d == day)
            .map(|((_, company), count)| (company.clone(), *count))
            .collect();
        Ok(totals)
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        self.rows.lock().unwrap().clear();
        Ok(())
    }
}
