/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::collections::{HashMap, HashSet};

use url::Url;

use crate::candidate::{
    bookmark_allowed_in_top_hits, history_allowed_in_top_hits, Candidate, NakedUrl, Platform,
};
use crate::query::Query;
use crate::scorer::{score, ScoreInput};

/// Total candidates across all three buckets (spec §4.4.2).
pub const MAXIMUM_TOTAL: usize = 12;
/// Top-hits bucket size (spec §4.4.2).
pub const MAXIMUM_TOP_HITS: usize = 2;
/// Reserved headroom subtracted from the total cap before the navigational
/// pool is deduped (spec §4.4.2).
pub const MINIMUM_IN_GROUP: usize = 5;

/// An abstract history record, as supplied by the data source (spec §3).
#[derive(Debug, Clone)]
pub struct HistorySuggestion {
    pub title: Option<String>,
    pub url: Url,
    pub number_of_visits: i64,
    pub failed_to_load: bool,
}

/// An abstract bookmark record, as supplied by the data source (spec §3).
#[derive(Debug, Clone)]
pub struct BookmarkSuggestion {
    pub title: Option<String>,
    pub url: Url,
    pub is_favorite: bool,
}

/// An abstract internal-page record (spec §3).
#[derive(Debug, Clone)]
pub struct InternalPageSuggestion {
    pub title: String,
    pub url: Url,
}

/// An abstract open-tab record (spec §3).
#[derive(Debug, Clone)]
pub struct OpenTabSuggestion {
    pub title: Option<String>,
    pub url: Url,
}

/// The three ordered output buckets for one query cycle (spec §3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionResult {
    pub top_hits: Vec<Candidate>,
    pub duckduckgo_suggestions: Vec<Candidate>,
    pub local_suggestions: Vec<Candidate>,
}

impl SuggestionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn total_len(&self) -> usize {
        self.top_hits.len() + self.duckduckgo_suggestions.len() + self.local_suggestions.len()
    }
}

/// Runs the full scoring/dedup/grouping pipeline (spec §4.4, Stages A-K).
///
/// `remote` is the (already-decoded) set of items the remote autocomplete
/// service returned for this query, if the call was made and succeeded.
pub fn process(
    query: &Query,
    history: &[HistorySuggestion],
    bookmarks: &[BookmarkSuggestion],
    internal_pages: &[InternalPageSuggestion],
    open_tabs: &[OpenTabSuggestion],
    remote: Option<&[Candidate]>,
    platform: Platform,
) -> Option<SuggestionResult> {
    // Stage A: score and filter local candidates, then stable-sort with
    // open tabs first, descending score.
    let mut scored: Vec<(Candidate, u32)> = Vec::new();

    for h in history {
        let is_root = NakedUrl::is_root(&h.url);
        let candidate = Candidate::HistoryEntry {
            title: h.title.clone(),
            url: h.url.clone(),
            allowed_in_top_hits: history_allowed_in_top_hits(
                h.number_of_visits,
                h.failed_to_load,
                is_root,
            ),
        };
        let s = score(ScoreInput {
            title: h.title.as_deref(),
            url: &h.url,
            visit_count: h.number_of_visits,
            query,
        });
        if s > 0 {
            scored.push((candidate, s));
        }
    }

    for b in bookmarks {
        let candidate = Candidate::Bookmark {
            title: b.title.clone(),
            url: b.url.clone(),
            is_favorite: b.is_favorite,
            allowed_in_top_hits: bookmark_allowed_in_top_hits(b.is_favorite, platform),
        };
        let s = score(ScoreInput {
            title: b.title.as_deref(),
            url: &b.url,
            visit_count: 0,
            query,
        });
        if s > 0 {
            scored.push((candidate, s));
        }
    }

    for p in internal_pages {
        let candidate = Candidate::InternalPage {
            title: p.title.clone(),
            url: p.url.clone(),
        };
        let s = score(ScoreInput {
            title: Some(p.title.as_str()),
            url: &p.url,
            visit_count: 0,
            query,
        });
        if s > 0 {
            scored.push((candidate, s));
        }
    }

    for t in open_tabs {
        let candidate = Candidate::OpenTab {
            title: t.title.clone(),
            url: t.url.clone(),
        };
        let s = score(ScoreInput {
            title: t.title.as_deref(),
            url: &t.url,
            visit_count: 0,
            query,
        });
        if s > 0 {
            scored.push((candidate, s));
        }
    }

    scored.sort_by(|(a, a_score), (b, b_score)| {
        let a_key = (!a.is_open_tab(), std::cmp::Reverse(*a_score));
        let b_key = (!b.is_open_tab(), std::cmp::Reverse(*b_score));
        a_key.cmp(&b_key)
    });

    let local_sorted: Vec<Candidate> = scored.into_iter().map(|(c, _)| c).collect();

    // Stage B: navigational remote candidates (the `isNav` ones, already
    // decoded as `Website`).
    let remote_items: &[Candidate] = remote.unwrap_or(&[]);
    let remote_navigationals: Vec<Candidate> = remote_items
        .iter()
        .filter(|c| matches!(c, Candidate::Website { .. }))
        .cloned()
        .collect();

    // Stage C: concatenate into the navigational pool.
    let mut pool: Vec<Candidate> = local_sorted
        .into_iter()
        .chain(remote_navigationals)
        .collect();

    // Snapshot each original history entry's allowed-in-top-hits flag by
    // naked URL, before Stage D may overwrite its slot in the pool.
    let history_allowed: HashMap<NakedUrl, bool> = pool
        .iter()
        .filter_map(|c| match c {
            Candidate::HistoryEntry {
                url,
                allowed_in_top_hits,
                ..
            } => Some((NakedUrl::from(url), *allowed_in_top_hits)),
            _ => None,
        })
        .collect();

    // Stage D: history -> open-tab / bookmark promotion.
    for i in 0..pool.len() {
        let Candidate::HistoryEntry { url, .. } = &pool[i] else {
            continue;
        };
        let naked = NakedUrl::from(url);

        let open_tab_match = pool.iter().enumerate().find_map(|(j, c)| {
            if j != i && matches!(c, Candidate::OpenTab { .. }) && c.naked_url().as_ref() == Some(&naked) {
                Some(c.clone())
            } else {
                None
            }
        });

        if let Some(tab) = open_tab_match {
            pool[i] = tab;
            continue;
        }

        let bookmark_match = pool.iter().enumerate().find_map(|(j, c)| {
            if j != i && c.naked_url().as_ref() == Some(&naked) {
                match c {
                    Candidate::Bookmark {
                        title,
                        url,
                        is_favorite,
                        ..
                    } => Some((title.clone(), url.clone(), *is_favorite)),
                    _ => None,
                }
            } else {
                None
            }
        });

        if let Some((title, bookmark_url, is_favorite)) = bookmark_match {
            let allowed = match platform {
                Platform::Desktop => *history_allowed.get(&naked).unwrap_or(&false),
                Platform::Mobile => true,
            };
            pool[i] = Candidate::Bookmark {
                title,
                url: bookmark_url,
                is_favorite,
                allowed_in_top_hits: allowed,
            };
        }
    }

    // Stage E: bookmark <-> history merge (upgrade-only; never downgrades).
    for i in 0..pool.len() {
        if let Candidate::Bookmark {
            url,
            allowed_in_top_hits,
            ..
        } = &pool[i]
        {
            let naked = NakedUrl::from(url);
            let should_upgrade = match platform {
                Platform::Desktop => history_allowed.get(&naked).copied().unwrap_or(false),
                Platform::Mobile => true,
            };
            if should_upgrade && !*allowed_in_top_hits {
                if let Candidate::Bookmark {
                    allowed_in_top_hits,
                    ..
                } = &mut pool[i]
                {
                    *allowed_in_top_hits = true;
                }
            }
        }
    }

    // Stage F: title backfill for history entries with no title.
    for i in 0..pool.len() {
        let needs_title = matches!(&pool[i], Candidate::HistoryEntry { title: None, .. });
        if !needs_title {
            continue;
        }
        let Some(naked) = pool[i].naked_url() else {
            continue;
        };
        let found_title = pool.iter().enumerate().find_map(|(j, c)| {
            if j != i && c.naked_url().as_ref() == Some(&naked) {
                c.title().map(|t| t.to_string())
            } else {
                None
            }
        });
        if let Some(title) = found_title {
            if let Candidate::HistoryEntry { title: slot, .. } = &mut pool[i] {
                *slot = Some(title);
            }
        }
    }

    // Stage G: dedup by naked URL, capped.
    let cap = (MAXIMUM_TOTAL - MINIMUM_IN_GROUP).min(query.char_count() + 1);
    let mut seen: HashSet<NakedUrl> = HashSet::new();
    let mut deduped: Vec<Candidate> = Vec::new();
    for candidate in pool {
        if deduped.len() >= cap {
            break;
        }
        let Some(naked) = candidate.naked_url() else {
            continue;
        };
        if seen.insert(naked) {
            deduped.push(candidate);
        }
    }

    // Stage H: top-hits extraction; stop at (don't skip) the first
    // disallowed candidate.
    let mut top_hits: Vec<Candidate> = Vec::new();
    for candidate in &deduped {
        if top_hits.len() >= MAXIMUM_TOP_HITS || !candidate.allowed_in_top_hits() {
            break;
        }
        top_hits.push(candidate.clone());
    }

    // Stage I: local-suggestions bucket, from after the top-hits prefix.
    let local_suggestions_all: Vec<Candidate> = deduped[top_hits.len()..]
        .iter()
        .filter(|c| {
            matches!(
                c,
                Candidate::Bookmark { .. }
                    | Candidate::HistoryEntry { .. }
                    | Candidate::InternalPage { .. }
                    | Candidate::OpenTab { .. }
            )
        })
        .cloned()
        .collect();

    // Stage J: remote bucket, excluding anything that duplicates a top hit.
    let top_hit_urls: HashSet<NakedUrl> = top_hits.iter().filter_map(Candidate::naked_url).collect();
    let remote_bucket_all: Vec<Candidate> = remote_items
        .iter()
        .filter(|c| match c.naked_url() {
            Some(naked) => !top_hit_urls.contains(&naked),
            None => true,
        })
        .cloned()
        .collect();

    // Stage K: apply the remaining budget.
    let top_hits_count = top_hits.len();
    let local_cap = MAXIMUM_TOTAL
        .saturating_sub(top_hits_count)
        .saturating_sub(MINIMUM_IN_GROUP);
    let local_suggestions: Vec<Candidate> =
        local_suggestions_all.into_iter().take(local_cap).collect();
    let local_count = local_suggestions.len();
    let remote_cap = MAXIMUM_TOTAL
        .saturating_sub(top_hits_count)
        .saturating_sub(local_count);
    let duckduckgo_suggestions: Vec<Candidate> =
        remote_bucket_all.into_iter().take(remote_cap).collect();

    Some(SuggestionResult {
        top_hits,
        duckduckgo_suggestions,
        local_suggestions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn q(s: &str) -> Query {
        Query::new(s).unwrap()
    }

    #[test]
    fn scenario_root_history_beats_remote_nav_duplicate() {
        let query = q("d");
        let history = vec![HistorySuggestion {
            title: Some("DuckDuckGo".into()),
            url: url("https://duckduckgo.com/"),
            number_of_visits: 12,
            failed_to_load: false,
        }];
        let remote = vec![
            Candidate::Phrase {
                phrase: "duck".into(),
            },
            Candidate::Website {
                url: url("https://duckduckgo.com/"),
            },
        ];
        let result = process(
            &query,
            &history,
            &[],
            &[],
            &[],
            Some(&remote),
            Platform::Desktop,
        )
        .unwrap();

        assert_eq!(result.top_hits.len(), 1);
        assert!(matches!(&result.top_hits[0], Candidate::HistoryEntry { title: Some(t), .. } if t == "DuckDuckGo"));
        assert_eq!(result.duckduckgo_suggestions.len(), 1);
        assert!(matches!(&result.duckduckgo_suggestions[0], Candidate::Phrase { phrase } if phrase == "duck"));
        assert!(result.local_suggestions.is_empty());
    }

    #[test]
    fn scenario_favorite_bookmark_tops_low_visit_history() {
        let query = q("example");
        let bookmarks = vec![BookmarkSuggestion {
            title: Some("Example".into()),
            url: url("https://example.com/"),
            is_favorite: true,
        }];
        let history = vec![HistorySuggestion {
            title: None,
            url: url("https://example.com/about"),
            number_of_visits: 2,
            failed_to_load: false,
        }];
        let result = process(
            &query,
            &history,
            &bookmarks,
            &[],
            &[],
            None,
            Platform::Desktop,
        )
        .unwrap();

        assert_eq!(result.top_hits.len(), 1);
        assert!(matches!(&result.top_hits[0], Candidate::Bookmark { title: Some(t), .. } if t == "Example"));
        assert_eq!(result.local_suggestions.len(), 1);
        assert!(matches!(&result.local_suggestions[0], Candidate::HistoryEntry { .. }));
    }

    #[test]
    fn scenario_favorite_bookmark_on_mobile_still_local_history() {
        let query = q("example");
        let bookmarks = vec![BookmarkSuggestion {
            title: Some("Example".into()),
            url: url("https://example.com/"),
            is_favorite: false,
        }];
        let history = vec![HistorySuggestion {
            title: None,
            url: url("https://example.com/about"),
            number_of_visits: 2,
            failed_to_load: false,
        }];
        let result = process(
            &query,
            &history,
            &bookmarks,
            &[],
            &[],
            None,
            Platform::Mobile,
        )
        .unwrap();

        assert_eq!(result.top_hits.len(), 1);
        assert!(matches!(&result.top_hits[0], Candidate::Bookmark { .. }));
    }

    #[test]
    fn scenario_open_tab_replaces_history_entry() {
        let query = q("news");
        let open_tabs = vec![OpenTabSuggestion {
            title: Some("BBC News".into()),
            url: url("https://bbc.com/"),
        }];
        let history = vec![HistorySuggestion {
            title: Some("BBC News Archive".into()),
            url: url("https://bbc.com/"),
            number_of_visits: 50,
            failed_to_load: false,
        }];
        let result = process(
            &query,
            &history,
            &[],
            &[],
            &open_tabs,
            None,
            Platform::Desktop,
        )
        .unwrap();

        let total: Vec<&Candidate> = result
            .top_hits
            .iter()
            .chain(result.local_suggestions.iter())
            .chain(result.duckduckgo_suggestions.iter())
            .collect();
        assert_eq!(total.len(), 1);
        assert!(matches!(total[0], Candidate::OpenTab { .. }));
    }

    #[test]
    fn empty_inputs_produce_empty_result() {
        let query = q("anything");
        let result = process(&query, &[], &[], &[], &[], None, Platform::Desktop).unwrap();
        assert_eq!(result, SuggestionResult::empty());
    }

    #[test]
    fn stage_g_cap_reads_query_character_length_not_token_count() {
        // "ab" is one token but two characters: a token-based cap caps Stage
        // G's dedup at 2 survivors, a character-based cap at 3.
        let query = q("ab");
        let history: Vec<HistorySuggestion> = (0..4)
            .map(|i| HistorySuggestion {
                title: Some(format!("Site {i}")),
                url: url(&format!("https://site{i}.example/")),
                number_of_visits: 10,
                failed_to_load: false,
            })
            .collect();
        let result = process(&query, &history, &[], &[], &[], None, Platform::Desktop).unwrap();
        assert_eq!(result.total_len(), 3);
    }

    #[test]
    fn total_cap_property_holds() {
        let query = q("e");
        let history: Vec<HistorySuggestion> = (0..30)
            .map(|i| HistorySuggestion {
                title: Some(format!("Entry {i}")),
                url: url(&format!("https://example{i}.com/e")),
                number_of_visits: i as i64,
                failed_to_load: false,
            })
            .collect();
        let result = process(&query, &history, &[], &[], &[], None, Platform::Desktop).unwrap();
        assert!(result.total_len() <= MAXIMUM_TOTAL);
        assert!(result.top_hits.len() <= MAXIMUM_TOP_HITS);
    }

    #[test]
    fn top_hits_truncates_at_first_disallowed_candidate() {
        let query = q("e");
        let bookmarks = vec![
            BookmarkSuggestion {
                title: Some("Example One".into()),
                url: url("https://example1.com/"),
                is_favorite: true,
            },
            BookmarkSuggestion {
                title: Some("Example Two".into()),
                url: url("https://example2.com/"),
                is_favorite: false,
            },
            BookmarkSuggestion {
                title: Some("Example Three".into()),
                url: url("https://example3.com/"),
                is_favorite: true,
            },
        ];
        let result = process(
            &query,
            &[],
            &bookmarks,
            &[],
            &[],
            None,
            Platform::Desktop,
        )
        .unwrap();
        // Scores tie (all root URL-prefix matches); stable sort preserves
        // input order, so the non-favorite bookmark is second and should
        // stop the top-hits prefix rather than being skipped over.
        assert_eq!(result.top_hits.len(), 1);
        assert!(result
            .top_hits
            .iter()
            .all(Candidate::allowed_in_top_hits));
    }

    #[test]
    fn uniqueness_across_buckets() {
        let query = q("e");
        let bookmarks = vec![BookmarkSuggestion {
            title: Some("Example".into()),
            url: url("https://example.com/"),
            is_favorite: true,
        }];
        let history = vec![HistorySuggestion {
            title: Some("Example".into()),
            url: url("https://example.com/"),
            number_of_visits: 10,
            failed_to_load: false,
        }];
        let remote = vec![Candidate::Website {
            url: url("https://example.com/"),
        }];
        let result = process(
            &query,
            &history,
            &bookmarks,
            &[],
            &[],
            Some(&remote),
            Platform::Desktop,
        )
        .unwrap();
        let mut all_urls: Vec<NakedUrl> = result
            .top_hits
            .iter()
            .chain(result.local_suggestions.iter())
            .chain(result.duckduckgo_suggestions.iter())
            .filter_map(Candidate::naked_url)
            .collect();
        let before = all_urls.len();
        all_urls.sort();
        all_urls.dedup();
        assert_eq!(all_urls.len(), before);
    }
}
