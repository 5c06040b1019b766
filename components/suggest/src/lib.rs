/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Address-bar suggestion engine: merges local browsing data (history,
//! bookmarks, open tabs, internal pages) with the remote autocomplete
//! service into the three ranked buckets an address bar displays.

mod candidate;
mod error;
mod loader;
mod processor;
mod query;
mod remote;
mod scorer;

pub use candidate::{Candidate, NakedUrl, Platform};
pub use error::SuggestionError;
pub use loader::{DataSource, SuggestionHandle, SuggestionLoader, SuggestionObserver};
pub use processor::{
    BookmarkSuggestion, HistorySuggestion, InternalPageSuggestion, OpenTabSuggestion,
    SuggestionResult, MAXIMUM_TOP_HITS, MAXIMUM_TOTAL, MINIMUM_IN_GROUP,
};
pub use query::Query;
pub use remote::{default_url_factory, RemoteClient, UrlFactory};
