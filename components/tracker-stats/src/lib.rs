/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Daily blocked-tracker stats aggregator: a single-writer in-memory pack,
//! debounced commits to a persistent key/value table, day-boundary
//! rollover, and 7-day retention.

mod aggregator;
mod clock;
mod error;
mod pack;
mod store;

pub use aggregator::{TrackerAggregator, DEFAULT_DEBOUNCE};
pub use clock::{Clock, SystemClock};
pub use error::TrackerStatsError;
pub use pack::{retention_cutoff, start_of_day, BlockedTrackersPack, Day, RETENTION_DAYS};
pub use store::{BlockedTrackersStore, MemoryStore, StoreError};
