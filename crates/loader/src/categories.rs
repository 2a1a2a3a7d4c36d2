//! Categorical attribute deduplicator
//!
//! Expands comma-separated multi-valued fields into a stable enumeration:
//! each distinct trimmed token gets a zero-based id in first-seen order.
//! Comparison is exact post-trim string equality; casing variants stay
//! distinct (preserved source behavior, see DESIGN.md).

use std::collections::HashMap;

use ludobot_common::errors::{AppError, Result};
use ludobot_common::models::Category;

/// Split a raw categorical field into trimmed tokens; empty fields yield
/// no tokens
pub fn split_tokens(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|t| !t.is_empty())
}

/// A deduplicated enumeration of one categorical field across a corpus
///
/// Ids are process-local to the run that built the index; rebuilding from a
/// changed corpus reassigns them.
#[derive(Debug, Clone)]
pub struct CategoryIndex {
    kind: String,
    entries: Vec<Category>,
    by_name: HashMap<String, i64>,
}

impl CategoryIndex {
    /// Build the enumeration from the raw field value of every entity, in
    /// corpus order
    pub fn build<'a>(kind: &str, fields: impl IntoIterator<Item = &'a str>) -> Self {
        let mut entries = Vec::new();
        let mut by_name: HashMap<String, i64> = HashMap::new();

        for raw in fields {
            for token in split_tokens(raw) {
                if by_name.contains_key(token) {
                    continue;
                }
                let id = entries.len() as i64;
                by_name.insert(token.to_string(), id);
                entries.push(Category {
                    id,
                    name: token.to_string(),
                });
            }
        }

        Self {
            kind: kind.to_string(),
            entries,
            by_name,
        }
    }

    /// Look up the id assigned to a token. An unknown token means the
    /// enumeration was built from a different corpus than the one being
    /// linked; that inconsistency is fatal and never silently skipped.
    pub fn id_of(&self, token: &str) -> Result<i64> {
        self.by_name
            .get(token)
            .copied()
            .ok_or_else(|| AppError::LookupInconsistency {
                kind: self.kind.clone(),
                token: token.to_string(),
            })
    }

    /// Full (id, token) enumeration in id order
    pub fn entries(&self) -> &[Category] {
        &self.entries
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_order_and_zero_based_ids() {
        let index = CategoryIndex::build("genre", ["Action, Adventure", "Adventure, RPG"]);
        let names: Vec<_> = index.entries().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Action", "Adventure", "RPG"]);
        let ids: Vec<_> = index.entries().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_determinism_on_same_input() {
        let fields = ["Shooter, Puzzle", "Puzzle", "Racing, Shooter"];
        let a = CategoryIndex::build("genre", fields);
        let b = CategoryIndex::build("genre", fields);
        assert_eq!(a.entries(), b.entries());
    }

    #[test]
    fn test_tokens_are_trimmed_but_case_sensitive() {
        // "drama " trims to "drama", which is distinct from "Drama"
        let index = CategoryIndex::build("genre", ["Action, Drama", "drama "]);
        let names: Vec<_> = index.entries().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Action", "Drama", "drama"]);
        assert_eq!(index.id_of("Drama").unwrap(), 1);
        assert_eq!(index.id_of("drama").unwrap(), 2);
    }

    #[test]
    fn test_known_normalization_gap_scenario() {
        // corpus = [genre:"Action, Drama", genre:"drama "]; ids 0 and 1 go
        // to the first two distinct trimmed tokens
        let index = CategoryIndex::build("genre", ["Action, Drama", "drama "]);
        assert_eq!(index.id_of("Action").unwrap(), 0);
        assert_eq!(index.id_of("Drama").unwrap(), 1);
    }

    #[test]
    fn test_empty_field_contributes_nothing() {
        let index = CategoryIndex::build("genre", ["", "Action"]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.entries()[0].name, "Action");
    }

    #[test]
    fn test_single_token_without_comma() {
        let index = CategoryIndex::build("platform", ["PC"]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.id_of("PC").unwrap(), 0);
    }

    #[test]
    fn test_unknown_token_is_lookup_inconsistency() {
        let index = CategoryIndex::build("genre", ["Action"]);
        let err = index.id_of("Sports").unwrap_err();
        assert!(matches!(err, AppError::LookupInconsistency { .. }));
        assert!(err.is_fatal());
    }
}
