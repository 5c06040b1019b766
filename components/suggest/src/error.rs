/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use error_support::{ErrorHandling, GetErrorHandling};

use crate::remote::RemoteError;

/// Errors internal to this crate. Never returned to the application; see
/// `SuggestionError` for the public surface.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no data source was supplied")]
    NoDataSource,
    #[error("remote autocomplete fetch failed: {0}")]
    Remote(#[from] RemoteError),
    #[error("the query was cancelled before it completed")]
    Cancelled(#[from] interrupt_support::Interrupted),
    #[error("the processor produced no result for a non-empty query")]
    FailedToProcess,
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

/// The error type returned to callers of `SuggestionLoader::get_suggestions`
/// (spec §6). `#[non_exhaustive]` so new internal failure modes can be
/// folded into `Other` without a breaking change.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SuggestionError {
    #[error("no data source")]
    NoDataSource,
    #[error("parsing failed")]
    ParsingFailed,
    #[error("failed to process data")]
    FailedToProcessData,
    #[error("query was cancelled")]
    Cancelled,
}

impl GetErrorHandling for Error {
    type ExternalError = SuggestionError;

    fn get_error_handling(&self) -> ErrorHandling<Self::ExternalError> {
        match self {
            // Cancellation is a normal outcome of the caller tearing down an
            // in-flight query, not something worth logging as a problem.
            Self::Cancelled(_) => ErrorHandling::passthrough(SuggestionError::Cancelled),
            Self::NoDataSource => {
                ErrorHandling::log(SuggestionError::NoDataSource, log::Level::Error)
            }
            // Remote fetch failures are expected in practice (flaky
            // networks); local results still flow, so this is a warning,
            // not an error.
            Self::Remote(_) => {
                ErrorHandling::log(SuggestionError::ParsingFailed, log::Level::Warn)
            }
            Self::FailedToProcess => {
                ErrorHandling::unexpected(SuggestionError::FailedToProcessData, None)
            }
        }
    }
}
