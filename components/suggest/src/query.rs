/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

/// A non-empty, lowercased query string, with its whitespace-split tokens
/// precomputed once (the processor scores every local candidate against the
/// same token list, so this is done once per query rather than once per
/// candidate).
#[derive(Debug, Clone)]
pub struct Query {
    text: String,
    tokens: Vec<String>,
}

impl Query {
    /// Returns `None` for an empty (or all-whitespace) string, matching the
    /// "empty query" edge case, which short-circuits before the rest of the
    /// pipeline ever runs.
    pub fn new(raw: &str) -> Option<Self> {
        let text = raw.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }
        let tokens: Vec<String> = text
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Some(Self { text, tokens })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Character length of the trimmed, lowercased query text (not the token
    /// count: "ab" is one token but two characters).
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_is_none() {
        assert!(Query::new("").is_none());
        assert!(Query::new("   ").is_none());
    }

    #[test]
    fn tokenizes_on_unicode_whitespace_and_lowercases() {
        let q = Query::new("  Foo\u{00A0}BAR baz ").unwrap();
        assert_eq!(q.as_str(), "foo bar baz");
        assert_eq!(q.tokens(), &["foo", "bar", "baz"]);
    }

    #[test]
    fn char_count_counts_characters_not_tokens() {
        let q = Query::new("ab").unwrap();
        assert_eq!(q.token_count(), 1);
        assert_eq!(q.char_count(), 2);
    }

    #[test]
    fn repeated_token_is_not_deduplicated() {
        // "foo foo" behaves like "foo" only through AND semantics in the
        // scorer, not because the token list itself is deduplicated.
        let q = Query::new("foo foo").unwrap();
        assert_eq!(q.tokens(), &["foo", "foo"]);
    }
}
