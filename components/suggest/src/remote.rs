/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::candidate::Candidate;

/// The embedder's default timeout for the remote autocomplete call (spec
/// §5). The retry policy, if any, lives outside this crate.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A recoverable failure talking to the remote autocomplete service.
/// Never fatal to a query: the loader treats this as "no remote
/// suggestions" and still returns local results (spec §4.3, §7).
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("network error contacting remote autocomplete service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote autocomplete service returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to decode remote autocomplete response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    phrase: Option<String>,
    #[serde(default, rename = "isNav")]
    is_nav: bool,
}

/// Parses a user-typed string as an http/https URL, used both to decide
/// whether to skip the remote call (the user looks like they typed a bare
/// navigational URL) and to validate `isNav` items in the response. Kept as
/// a function pointer parameter (rather than baked into this module) so
/// callers and tests can swap in their own URL-parsing/fixup behavior, as
/// spec §4.3/§6 require.
pub type UrlFactory = fn(&str) -> Option<Url>;

/// The default URL factory: a plain `Url::parse` restricted to http/https.
pub fn default_url_factory(candidate: &str) -> Option<Url> {
    let url = Url::parse(candidate).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Returns true when the query parses (via `url_factory`) to a bare
/// navigational http/https URL (empty or `/` path), in which case the
/// remote autocomplete call is skipped entirely (spec §4.3).
pub fn looks_like_bare_navigation(query: &str, url_factory: UrlFactory) -> bool {
    match url_factory(query) {
        Some(url) => matches!(url.path(), "" | "/"),
        None => false,
    }
}

/// Client for the remote autocomplete endpoint (`https://duckduckgo.com/ac/`
/// by default; overridable for tests).
pub struct RemoteClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl RemoteClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    pub fn default_endpoint() -> Url {
        Url::parse("https://duckduckgo.com/ac/").expect("static URL is valid")
    }

    /// Fetches and decodes remote suggestions for `query`. Returns an empty
    /// list without making a request when `query` looks like a bare
    /// navigational URL.
    pub async fn fetch(
        &self,
        query: &str,
        url_factory: UrlFactory,
    ) -> Result<Vec<Candidate>, RemoteError> {
        if looks_like_bare_navigation(query, url_factory) {
            return Ok(Vec::new());
        }

        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[("q", query), ("is_nav", "1")])
            .timeout(DEFAULT_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status()));
        }

        let body = response.text().await?;
        let items: Vec<RawItem> = serde_json::from_str(&body)?;

        Ok(items
            .into_iter()
            .filter_map(|item| decode_item(item, url_factory))
            .collect())
    }
}

/// Maps one decoded wire item to a candidate, per spec §4.3: items without a
/// phrase are dropped; `isNav` items that fail to parse as an http/https URL
/// are dropped (not emitted as `Unknown`).
fn decode_item(item: RawItem, url_factory: UrlFactory) -> Option<Candidate> {
    let phrase = item.phrase?;
    if item.is_nav {
        url_factory(&phrase).map(|url| Candidate::Website { url })
    } else {
        Some(Candidate::Phrase { phrase })
    }
}
