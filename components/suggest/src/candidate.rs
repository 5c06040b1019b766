/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use url::Url;

/// The canonical form of a URL, used only for cross-source equality: no
/// scheme, no leading `www.`, no trailing slash. The original URL is kept
/// separately on the candidate for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NakedUrl(String);

impl NakedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A URL is "root" when it carries no path beyond `/` and no query.
    pub fn is_root(url: &Url) -> bool {
        matches!(url.path(), "" | "/") && url.query().is_none()
    }
}

impl From<&Url> for NakedUrl {
    fn from(url: &Url) -> Self {
        let host = url.host_str().unwrap_or("");
        let host = host.strip_prefix("www.").unwrap_or(host);
        let mut rest = String::new();
        rest.push_str(url.path());
        if let Some(query) = url.query() {
            rest.push('?');
            rest.push_str(query);
        }
        while rest.ends_with('/') {
            rest.pop();
        }
        NakedUrl(format!("{host}{rest}"))
    }
}

/// The platform a suggestion engine instance is running on. Controls the
/// top-hits eligibility rule for bookmarks (spec-ref: desktop favorites-only
/// vs. mobile always-allowed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Desktop,
    Mobile,
}

/// A single ranked candidate. The set of variants is closed and exhaustive:
/// the processor depends on matching all of them, so this is a plain enum
/// rather than an open trait object (see DESIGN.md, "closed variants").
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// A search term with no associated URL.
    Phrase { phrase: String },
    /// A URL suggested by the remote autocomplete service that isn't known
    /// locally.
    Website { url: Url },
    Bookmark {
        title: Option<String>,
        url: Url,
        is_favorite: bool,
        allowed_in_top_hits: bool,
    },
    HistoryEntry {
        title: Option<String>,
        url: Url,
        allowed_in_top_hits: bool,
    },
    /// A browser-internal page (settings, etc). Never eligible for top hits.
    InternalPage { title: String, url: Url },
    /// A currently open tab. Always eligible for top hits.
    OpenTab { title: Option<String>, url: Url },
    /// Forward-compatibility placeholder for remote response shapes this
    /// version doesn't understand. Must never reach the caller.
    Unknown { value: String },
}

impl Candidate {
    pub fn url(&self) -> Option<&Url> {
        match self {
            Candidate::Phrase { .. } | Candidate::Unknown { .. } => None,
            Candidate::Website { url }
            | Candidate::Bookmark { url, .. }
            | Candidate::HistoryEntry { url, .. }
            | Candidate::InternalPage { url, .. }
            | Candidate::OpenTab { url, .. } => Some(url),
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Candidate::Phrase { phrase } => Some(phrase.as_str()),
            Candidate::Website { .. } | Candidate::Unknown { .. } => None,
            Candidate::Bookmark { title, .. } | Candidate::HistoryEntry { title, .. } => {
                title.as_deref()
            }
            Candidate::InternalPage { title, .. } => Some(title.as_str()),
            Candidate::OpenTab { title, .. } => title.as_deref(),
        }
    }

    pub fn naked_url(&self) -> Option<NakedUrl> {
        self.url().map(NakedUrl::from)
    }

    /// Whether this candidate is eligible to appear in the `top_hits`
    /// bucket. Derived, never user-settable.
    pub fn allowed_in_top_hits(&self) -> bool {
        match self {
            Candidate::Website { .. } | Candidate::OpenTab { .. } => true,
            Candidate::Bookmark {
                allowed_in_top_hits,
                ..
            }
            | Candidate::HistoryEntry {
                allowed_in_top_hits,
                ..
            } => *allowed_in_top_hits,
            Candidate::InternalPage { .. } | Candidate::Phrase { .. } | Candidate::Unknown { .. } => {
                false
            }
        }
    }

    pub fn is_open_tab(&self) -> bool {
        matches!(self, Candidate::OpenTab { .. })
    }

    pub fn is_history(&self) -> bool {
        matches!(self, Candidate::HistoryEntry { .. })
    }

    pub fn is_bookmark(&self) -> bool {
        matches!(self, Candidate::Bookmark { .. })
    }
}

/// Computes whether a bookmark should be eligible for `top_hits`.
///
/// Desktop only allows favorited bookmarks through; mobile allows all of
/// them (spec §4.2).
pub fn bookmark_allowed_in_top_hits(is_favorite: bool, platform: Platform) -> bool {
    match platform {
        Platform::Desktop => is_favorite,
        Platform::Mobile => true,
    }
}

/// Computes whether a history entry should be eligible for `top_hits`.
///
/// `allowed = !(failed_to_load || (low_visits && !url_is_root))` where
/// `low_visits` means fewer than 4 visits (spec §4.2).
pub fn history_allowed_in_top_hits(
    number_of_visits: i64,
    failed_to_load: bool,
    url_is_root: bool,
) -> bool {
    let low_visits = number_of_visits < 4;
    !(failed_to_load || (low_visits && !url_is_root))
}
