//! Derived full-text index.
//!
//! The index is rebuildable from the primary collection and is never the
//! source of truth. The store is its only writer and keeps it in lockstep
//! with the task collection inside the store's critical section.

use std::collections::HashMap;

use crate::error::Result;
use crate::store::query::{
    TextQuery, tokenize, BOOST_FUZZY_DESCRIPTION, BOOST_FUZZY_TITLE, BOOST_PHRASE_DESCRIPTION,
    BOOST_PHRASE_TITLE, BOOST_TERM_DESCRIPTION, BOOST_TERM_TITLE,
};

/// Full-text index over task titles and descriptions.
///
/// The trait is the seam between the store and the index implementation;
/// every method is fallible so the store's rollback paths stay honest even
/// though [`MemoryIndex`] itself cannot fail.
pub trait TextIndex: Send {
    /// Insert or replace the document for `id`.
    fn upsert(&mut self, id: i64, title: &str, description: &str, archived: bool) -> Result<()>;

    /// Remove the document for `id`. Removing an unknown id is not an error.
    fn remove(&mut self, id: i64) -> Result<()>;

    /// Execute a ranked query, returning matching ids ordered by descending
    /// relevance (ties broken by ascending id).
    fn search(&self, query: &TextQuery) -> Result<Vec<i64>>;
}

/// One indexed document.
#[derive(Debug, Clone)]
struct IndexedDoc {
    title_tokens: Vec<String>,
    description_tokens: Vec<String>,
    archived: bool,
}

/// In-memory [`TextIndex`] implementation.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    docs: HashMap<i64, IndexedDoc>,
}

impl MemoryIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Whether the index holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn score(doc: &IndexedDoc, query: &TextQuery) -> f64 {
        let mut score = 0.0;

        if contains_phrase(&doc.title_tokens, &query.terms) {
            score += BOOST_PHRASE_TITLE;
        }
        if contains_phrase(&doc.description_tokens, &query.terms) {
            score += BOOST_PHRASE_DESCRIPTION;
        }

        for term in &query.terms {
            if doc.title_tokens.iter().any(|t| t == term) {
                score += BOOST_TERM_TITLE;
            }
            if doc.description_tokens.iter().any(|t| t == term) {
                score += BOOST_TERM_DESCRIPTION;
            }
        }

        for term in query.fuzzy_terms() {
            if doc.title_tokens.iter().any(|t| within_one_edit(t, term)) {
                score += BOOST_FUZZY_TITLE;
            }
            if doc.description_tokens.iter().any(|t| within_one_edit(t, term)) {
                score += BOOST_FUZZY_DESCRIPTION;
            }
        }

        score
    }
}

impl TextIndex for MemoryIndex {
    fn upsert(&mut self, id: i64, title: &str, description: &str, archived: bool) -> Result<()> {
        self.docs.insert(
            id,
            IndexedDoc {
                title_tokens: tokenize(title),
                description_tokens: tokenize(description),
                archived,
            },
        );
        Ok(())
    }

    fn remove(&mut self, id: i64) -> Result<()> {
        self.docs.remove(&id);
        Ok(())
    }

    fn search(&self, query: &TextQuery) -> Result<Vec<i64>> {
        let mut hits: Vec<(i64, f64)> = self
            .docs
            .iter()
            .filter(|(_, doc)| !(query.require_unarchived && doc.archived))
            .filter_map(|(&id, doc)| {
                let score = Self::score(doc, query);
                (score > 0.0).then_some((id, score))
            })
            .collect();

        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        Ok(hits.into_iter().map(|(id, _)| id).collect())
    }
}

/// Check whether `tokens` contains `phrase` as a consecutive run.
fn contains_phrase(tokens: &[String], phrase: &[String]) -> bool {
    if phrase.is_empty() || phrase.len() > tokens.len() {
        return false;
    }
    tokens.windows(phrase.len()).any(|w| w == phrase)
}

/// Check whether `a` and `b` are within Levenshtein edit distance 1.
fn within_one_edit(a: &str, b: &str) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    match long.len() - short.len() {
        0 => {
            // At most one substitution.
            short.iter().zip(long.iter()).filter(|(x, y)| x != y).count() <= 1
        }
        1 => {
            // At most one insertion into the shorter string.
            let mut i = 0;
            let mut j = 0;
            let mut edited = false;
            while i < short.len() && j < long.len() {
                if short[i] == long[j] {
                    i += 1;
                    j += 1;
                } else if edited {
                    return false;
                } else {
                    edited = true;
                    j += 1;
                }
            }
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::SearchFilters;

    fn query(text: &str, archived: bool) -> TextQuery {
        TextQuery::build(&SearchFilters { archived, text_match: text.to_string() }).unwrap()
    }

    #[test]
    fn test_upsert_replaces_document() {
        let mut idx = MemoryIndex::new();
        idx.upsert(1, "First title", "", false).unwrap();
        idx.upsert(1, "Completely different", "", false).unwrap();
        assert_eq!(idx.len(), 1);
        assert!(idx.search(&query("first", false)).unwrap().is_empty());
        assert_eq!(idx.search(&query("different", false)).unwrap(), vec![1]);
    }

    #[test]
    fn test_remove_unknown_id_is_ok() {
        let mut idx = MemoryIndex::new();
        idx.remove(42).unwrap();
        assert!(idx.is_empty());
    }

    #[test]
    fn test_phrase_outranks_term_match() {
        let mut idx = MemoryIndex::new();
        idx.upsert(1, "Todo something new", "", false).unwrap();
        idx.upsert(2, "New Todo", "", false).unwrap();
        // Doc 2 matches the phrase "new todo", doc 1 only the loose terms.
        assert_eq!(idx.search(&query("new todo", false)).unwrap(), vec![2, 1]);
    }

    #[test]
    fn test_title_outranks_description() {
        let mut idx = MemoryIndex::new();
        idx.upsert(1, "Unrelated", "mentions groceries here", false).unwrap();
        idx.upsert(2, "Buy groceries", "", false).unwrap();
        assert_eq!(idx.search(&query("groceries", false)).unwrap(), vec![2, 1]);
    }

    #[test]
    fn test_fuzzy_matches_single_typo() {
        let mut idx = MemoryIndex::new();
        idx.upsert(1, "Refactor parser", "", false).unwrap();
        assert_eq!(idx.search(&query("parsre", false)).unwrap(), Vec::<i64>::new());
        assert_eq!(idx.search(&query("parsir", false)).unwrap(), vec![1]);
        assert_eq!(idx.search(&query("parse", false)).unwrap(), vec![1]);
    }

    #[test]
    fn test_short_terms_are_not_fuzzy_matched() {
        let mut idx = MemoryIndex::new();
        idx.upsert(1, "fix bug", "", false).unwrap();
        // "bag" is 3 bytes, below the fuzzy threshold; no hit.
        assert!(idx.search(&query("bag", false)).unwrap().is_empty());
    }

    #[test]
    fn test_unarchived_clause_excludes_archived_docs() {
        let mut idx = MemoryIndex::new();
        idx.upsert(1, "Shared title", "", false).unwrap();
        idx.upsert(2, "Shared title", "", true).unwrap();
        assert_eq!(idx.search(&query("shared", false)).unwrap(), vec![1]);
        // An archived-side search carries no flag clause.
        assert_eq!(idx.search(&query("shared", true)).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_within_one_edit() {
        assert!(within_one_edit("parser", "parser"));
        assert!(within_one_edit("parser", "parsers"));
        assert!(within_one_edit("parser", "parse"));
        assert!(within_one_edit("parser", "porser"));
        assert!(!within_one_edit("parser", "parsre"));
        assert!(!within_one_edit("parser", "pa"));
        assert!(within_one_edit("", "a"));
        assert!(!within_one_edit("", "ab"));
    }

    #[test]
    fn test_contains_phrase() {
        let tokens: Vec<String> =
            ["another", "new", "todo"].iter().map(ToString::to_string).collect();
        let phrase: Vec<String> = ["new", "todo"].iter().map(ToString::to_string).collect();
        assert!(contains_phrase(&tokens, &phrase));
        let reversed: Vec<String> = ["todo", "new"].iter().map(ToString::to_string).collect();
        assert!(!contains_phrase(&tokens, &reversed));
        assert!(!contains_phrase(&tokens, &[]));
    }
}
