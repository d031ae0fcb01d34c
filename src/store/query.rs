//! Ranked text-query construction.
//!
//! A [`TextQuery`] blends three strategies, combined disjunctively so that a
//! document matching any clause is a hit and its score is the sum of the
//! boosts of the clauses it matched:
//!
//! 1. Exact-phrase match of the whole query (title boosted highest).
//! 2. Per-term match (partial multi-word matches).
//! 3. Per-term fuzzy match within edit distance 1, only for terms longer
//!    than 3 bytes, weighted lowest so exact matches always outrank typos.
//!
//! When the caller wants non-archived results the archived-flag clause is
//! conjoined with the content clauses inside the index query rather than
//! applied as a post-filter.

use crate::store::models::SearchFilters;

/// Boost for an exact-phrase match in the title.
pub const BOOST_PHRASE_TITLE: f64 = 10.0;
/// Boost for an exact-phrase match in the description.
pub const BOOST_PHRASE_DESCRIPTION: f64 = 2.0;
/// Boost for a single term matching a title token.
pub const BOOST_TERM_TITLE: f64 = 3.0;
/// Boost for a single term matching a description token.
pub const BOOST_TERM_DESCRIPTION: f64 = 1.0;
/// Boost for a fuzzy term match in the title.
pub const BOOST_FUZZY_TITLE: f64 = 0.5;
/// Boost for a fuzzy term match in the description.
pub const BOOST_FUZZY_DESCRIPTION: f64 = 0.3;

/// Terms shorter than or equal to this many bytes are never fuzzy-matched.
pub const FUZZY_MIN_TERM_LENGTH: usize = 3;

/// A tokenized, ranked text query against the index.
#[derive(Debug, Clone, PartialEq)]
pub struct TextQuery {
    /// Query terms in order; doubles as the exact phrase.
    pub terms: Vec<String>,
    /// Conjoin an `archived == false` clause with the content clauses.
    pub require_unarchived: bool,
}

impl TextQuery {
    /// Build a query from search filters.
    ///
    /// Returns `None` when the text is blank or whitespace-only; that case
    /// is served by the structural fast path and never touches the index.
    #[must_use]
    pub fn build(filters: &SearchFilters) -> Option<Self> {
        let terms = tokenize(&filters.text_match);
        if terms.is_empty() {
            return None;
        }
        Some(Self { terms, require_unarchived: !filters.archived })
    }

    /// Terms eligible for fuzzy matching.
    pub fn fuzzy_terms(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().filter(|t| t.len() > FUZZY_MIN_TERM_LENGTH).map(String::as_str)
    }
}

/// Split text into lowercase alphanumeric tokens.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        assert_eq!(tokenize("New Todo"), vec!["new", "todo"]);
        assert_eq!(tokenize("Won't match"), vec!["won", "t", "match"]);
        assert_eq!(tokenize("  spaced\tout\n"), vec!["spaced", "out"]);
        assert!(tokenize("").is_empty());
        assert!(tokenize(" \t \n").is_empty());
    }

    #[test]
    fn test_build_blank_is_none() {
        let filters = SearchFilters { archived: false, text_match: "   ".to_string() };
        assert!(TextQuery::build(&filters).is_none());
    }

    #[test]
    fn test_build_keeps_term_order() {
        let filters = SearchFilters { archived: false, text_match: "Fix the Parser".to_string() };
        let q = TextQuery::build(&filters).unwrap();
        assert_eq!(q.terms, vec!["fix", "the", "parser"]);
        assert!(q.require_unarchived);
    }

    #[test]
    fn test_build_archived_search_has_no_unarchived_clause() {
        let filters = SearchFilters { archived: true, text_match: "old".to_string() };
        let q = TextQuery::build(&filters).unwrap();
        assert!(!q.require_unarchived);
    }

    #[test]
    fn test_fuzzy_terms_skip_short_terms() {
        let filters = SearchFilters { archived: false, text_match: "fix the parser".to_string() };
        let q = TextQuery::build(&filters).unwrap();
        let fuzzy: Vec<_> = q.fuzzy_terms().collect();
        assert_eq!(fuzzy, vec!["parser"]);
    }
}
