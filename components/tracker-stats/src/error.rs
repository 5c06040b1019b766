/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use error_support::{ErrorHandling, GetErrorHandling};

use crate::store::StoreError;

/// Errors internal to this crate. Never returned to the application; see
/// `TrackerStatsError` for the public surface.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("failed to commit pending tracker counts: {0}")]
    Store(StoreError),
    #[error("failed to fetch 7-day tracker summary: {0}")]
    FetchSummary(StoreError),
    #[error("failed to load current-day tracker counts: {0}")]
    LoadCurrent(StoreError),
    #[error("failed to clear tracker stats: {0}")]
    Clear(StoreError),
    #[error("the aggregator actor has shut down")]
    ActorGone,
}

/// The error type returned to callers of the public aggregator API (spec
/// §7). None of these are fatal: the in-memory pack stays authoritative and
/// a later `record` call will retry the commit.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrackerStatsError {
    #[error("failed to store tracker counts")]
    FailedToStore,
    #[error("failed to fetch tracker summary")]
    FailedToFetchSummary,
    #[error("failed to load current-day tracker counts")]
    FailedToLoadCurrent,
    #[error("failed to clear tracker stats")]
    FailedToClear,
}

impl GetErrorHandling for Error {
    type ExternalError = TrackerStatsError;

    fn get_error_handling(&self) -> ErrorHandling<Self::ExternalError> {
        match self {
            Self::Store(_) => {
                ErrorHandling::log(TrackerStatsError::FailedToStore, log::Level::Warn)
            }
            Self::FetchSummary(_) => {
                ErrorHandling::log(TrackerStatsError::FailedToFetchSummary, log::Level::Warn)
            }
            Self::LoadCurrent(_) => {
                ErrorHandling::log(TrackerStatsError::FailedToLoadCurrent, log::Level::Warn)
            }
            Self::Clear(_) => {
                ErrorHandling::log(TrackerStatsError::FailedToClear, log::Level::Warn)
            }
            // The actor task only stops on process teardown; if a caller
            // still holds a handle at that point something above us is
            // shutting down out of order. Treat it like a store failure for
            // whichever operation was in flight.
            Self::ActorGone => {
                ErrorHandling::log(TrackerStatsError::FailedToStore, log::Level::Error)
            }
        }
    }
}
