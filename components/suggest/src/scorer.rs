/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use url::Url;

use crate::candidate::NakedUrl;
use crate::query::Query;

/// Root-URL matches get this much added to their base category score,
/// before the ×1000 scale-up (spec §4.1, "Root boost").
const ROOT_BOOST: u32 = 2000;

/// Inputs to the pure scoring function. No I/O, no locale dependence: the
/// same inputs always produce the same score.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub title: Option<&'a str>,
    pub url: &'a Url,
    pub visit_count: i64,
    pub query: &'a Query,
}

/// Scores a single candidate against a query. Returns 0 when the candidate
/// should be discarded.
///
/// Categories are tried in order and the first one that matches wins; only
/// the multi-token path considers every query token. See spec §4.1 for the
/// exact table this implements.
pub fn score(input: ScoreInput<'_>) -> u32 {
    let title_lower = input.title.map(|t| t.to_lowercase()).unwrap_or_default();
    let naked = NakedUrl::from(input.url);
    let naked_str = naked.as_str();
    let host = input.url.host_str().unwrap_or("");
    let host = host.strip_prefix("www.").unwrap_or(host);
    let is_root = NakedUrl::is_root(input.url);
    let query_str = input.query.as_str();
    let query_len = query_str.chars().count();

    let base = if naked_str.starts_with(query_str) {
        300 + if is_root { ROOT_BOOST } else { 0 }
    } else if title_lower.starts_with(query_str) {
        200 + if is_root { ROOT_BOOST } else { 0 }
    } else if query_len > 2 && host.contains(query_str) {
        150
    } else if query_len > 2 && title_lower.contains(&format!(" {query_str}")) {
        100
    } else {
        multi_token_score(&title_lower, naked_str, input.query)
    };

    if base == 0 {
        0
    } else {
        base.saturating_mul(1000) + input.visit_count.max(0) as u32
    }
}

/// The multi-token fallback: only tried when none of the single-match
/// categories fired. Requires every token to match somewhere (title prefix,
/// title word-boundary, or URL prefix); otherwise the whole candidate scores
/// zero. The first-token URL/title boost is intentionally scoped to this
/// branch only (spec §9, open question).
fn multi_token_score(title_lower: &str, naked_str: &str, query: &Query) -> u32 {
    let tokens = query.tokens();
    if tokens.len() < 2 {
        return 0;
    }

    let token_matches = |token: &str| -> bool {
        title_lower.starts_with(token)
            || title_lower.contains(&format!(" {token}"))
            || naked_str.starts_with(token)
    };

    if !tokens.iter().all(|token| token_matches(token)) {
        return 0;
    }

    let mut base = 10;
    let first = &tokens[0];
    if naked_str.starts_with(first.as_str()) {
        base += 70;
    } else if title_lower.starts_with(first.as_str()) {
        base += 50;
    }
    base
}
