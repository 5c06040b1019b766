/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::sync::Arc;

use error_support::convert_log_report_error;
use interrupt_support::{CancellationToken, Interruptable, Interruptee};

use crate::candidate::Platform;
use crate::error::{Error, Result, SuggestionError};
use crate::processor::{
    self, BookmarkSuggestion, HistorySuggestion, InternalPageSuggestion, OpenTabSuggestion,
    SuggestionResult,
};
use crate::query::Query;
use crate::remote::{RemoteClient, UrlFactory};

/// The embedder-supplied view over local browsing data. One query is served
/// by fetching all four lists concurrently; each method is handed the
/// already-lowercased query text so the data source can push filtering down
/// to its own storage layer (spec §4.7).
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    async fn history(&self, query: &str) -> Vec<HistorySuggestion>;
    async fn bookmarks(&self, query: &str) -> Vec<BookmarkSuggestion>;
    async fn internal_pages(&self, query: &str) -> Vec<InternalPageSuggestion>;
    async fn open_tabs(&self, query: &str) -> Vec<OpenTabSuggestion>;
    fn platform(&self) -> Platform;
}

/// Receives the result of exactly one `get_suggestions` call. Called exactly
/// once per call, whether it completes, fails, or is cancelled (spec §5,
/// §6): embedders that drive this crate over an FFI boundary can't simply
/// `await` a Rust future, so completion is delivered by callback instead.
///
/// `result` and `error` are independent: at most one is populated, *except*
/// when a remote-autocomplete failure occurs after local collection already
/// succeeded, in which case both are populated at once — a valid (local-only)
/// result alongside the degraded remote error (spec §4.3/§6/§7).
pub trait SuggestionObserver: Send + Sync {
    fn on_completion(&self, result: Option<SuggestionResult>, error: Option<SuggestionError>);
}

/// A cancellation handle for one in-flight `get_suggestions` call. Dropping
/// this without calling `cancel` lets the query run to completion.
#[derive(Clone)]
pub struct SuggestionHandle {
    token: CancellationToken,
}

impl SuggestionHandle {
    /// Requests cancellation. The observer still receives exactly one
    /// `on_completion` call, with `SuggestionError::Cancelled`, once the
    /// in-flight work notices.
    pub fn cancel(&self) {
        self.token.interrupt();
    }
}

pub struct SuggestionLoader {
    data_source: Option<Arc<dyn DataSource>>,
    remote: RemoteClient,
    url_factory: UrlFactory,
}

impl SuggestionLoader {
    pub fn new(data_source: Option<Arc<dyn DataSource>>, remote: RemoteClient) -> Self {
        Self {
            data_source,
            remote,
            url_factory: crate::remote::default_url_factory,
        }
    }

    /// Overrides the URL factory used to validate remote `isNav` items and
    /// to detect bare-navigational queries. Exposed for tests.
    pub fn with_url_factory(mut self, url_factory: UrlFactory) -> Self {
        self.url_factory = url_factory;
        self
    }

    /// Starts one suggestion query. Returns a handle the caller can use to
    /// cancel it; `observer` is called exactly once with the outcome.
    pub fn get_suggestions(
        self: &Arc<Self>,
        text: &str,
        observer: Arc<dyn SuggestionObserver>,
    ) -> SuggestionHandle {
        let token = CancellationToken::default();
        let handle = SuggestionHandle {
            token: token.clone(),
        };

        let Some(query) = Query::new(text) else {
            // Empty query: no remote call, no data-source work, immediate
            // empty result (spec §4.4, empty-query edge case).
            observer.on_completion(Some(SuggestionResult::empty()), None);
            return handle;
        };

        let loader = Arc::clone(self);
        tokio::spawn(async move {
            match loader.run(&query, &token).await {
                Ok((result, remote_error)) => {
                    observer.on_completion(Some(result), remote_error)
                }
                Err(err) => observer.on_completion(None, Some(convert_log_report_error(err))),
            }
        });

        handle
    }

    /// Runs one query to completion. On success, the second element of the
    /// tuple carries a non-fatal remote-autocomplete error if the remote
    /// call failed after local collection otherwise succeeded (spec §4.3).
    async fn run(
        &self,
        query: &Query,
        token: &CancellationToken,
    ) -> Result<(SuggestionResult, Option<SuggestionError>)> {
        let data_source = self.data_source.as_ref().ok_or(Error::NoDataSource)?;

        token.err_if_interrupted()?;

        let (history, bookmarks, internal_pages, open_tabs, remote) = tokio::join!(
            data_source.history(query.as_str()),
            data_source.bookmarks(query.as_str()),
            data_source.internal_pages(query.as_str()),
            data_source.open_tabs(query.as_str()),
            self.remote.fetch(query.as_str(), self.url_factory),
        );

        token.err_if_interrupted()?;

        let (remote, remote_error) = match remote {
            Ok(items) => (Some(items), None),
            Err(err) => {
                // A failed remote call degrades the result (no
                // `duckduckgo_suggestions`), it never fails the whole query —
                // but the caller still needs to see it, alongside whatever
                // local result comes out below (spec §6/§7).
                let public_error: SuggestionError = convert_log_report_error(Error::from(err));
                (None, Some(public_error))
            }
        };

        let platform = data_source.platform();
        let result = processor::process(
            query,
            &history,
            &bookmarks,
            &internal_pages,
            &open_tabs,
            remote.as_deref(),
            platform,
        )
        .ok_or(Error::FailedToProcess)?;

        Ok((result, remote_error))
    }
}
