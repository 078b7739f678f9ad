//! Name resolution: map a user query to exactly one worktree.
//!
//! Tiers are tried in order and the first tier with any candidate wins:
//!
//! 1. exact relative path (`feature/auth`)
//! 2. leaf name (`auth`)
//! 3. substring of the relative path (`au`)
//!
//! Matching is case-sensitive and literal. Ambiguity is returned as data,
//! never resolved by picking a candidate.

use std::collections::BTreeMap;

use crate::catalog::{Catalog, WorktreeRecord};
use crate::error::ResolveError;

/// Which tier produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    Leaf,
    Substring,
}

/// Outcome of resolving a query against a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    Resolved {
        record: &'a WorktreeRecord,
        tier: MatchTier,
    },
    NoMatch {
        query: String,
        available: Vec<&'a WorktreeRecord>,
    },
    Ambiguous {
        query: String,
        tier: MatchTier,
        candidates: Vec<&'a WorktreeRecord>,
    },
}

impl<'a> Resolution<'a> {
    pub fn into_result(self) -> Result<&'a WorktreeRecord, ResolveError> {
        match self {
            Self::Resolved { record, .. } => Ok(record),
            Self::NoMatch { query, available } => Err(ResolveError::NoMatch {
                query,
                available: available.iter().map(|r| r.name()).collect(),
            }),
            Self::Ambiguous {
                query, candidates, ..
            } => Err(ResolveError::Ambiguous {
                query,
                candidates: candidates.iter().map(|r| r.name()).collect(),
            }),
        }
    }
}

/// Resolve `query` to a single worktree in `catalog`.
pub fn resolve<'a>(catalog: &'a Catalog, query: &str) -> Resolution<'a> {
    let query = normalize_query(query);

    if let Some(record) = catalog.iter().find(|r| r.name() == query) {
        return Resolution::Resolved {
            record,
            tier: MatchTier::Exact,
        };
    }

    let leaf_matches: Vec<&WorktreeRecord> = catalog.iter().filter(|r| r.leaf() == query).collect();
    if !leaf_matches.is_empty() {
        return from_candidates(query, MatchTier::Leaf, leaf_matches);
    }

    // One candidate per record, however many times the query occurs in its path.
    let substring_matches: Vec<&WorktreeRecord> = catalog
        .iter()
        .filter(|r| r.name().contains(query.as_str()))
        .collect();
    if !substring_matches.is_empty() {
        return from_candidates(query, MatchTier::Substring, substring_matches);
    }

    Resolution::NoMatch {
        query,
        available: catalog.iter().collect(),
    }
}

fn from_candidates(
    query: String,
    tier: MatchTier,
    mut candidates: Vec<&WorktreeRecord>,
) -> Resolution<'_> {
    if candidates.len() == 1 {
        Resolution::Resolved {
            record: candidates.remove(0),
            tier,
        }
    } else {
        Resolution::Ambiguous {
            query,
            tier,
            candidates,
        }
    }
}

/// Normalize separators so `feature\auth` and `feature/auth/` match `feature/auth`.
fn normalize_query(query: &str) -> String {
    query.replace('\\', "/").trim_matches('/').to_string()
}

/// Leaf names shared by more than one worktree, mapped to their relative paths.
///
/// Keys are sorted; paths keep catalog order.
pub fn detect_leaf_collisions(catalog: &Catalog) -> BTreeMap<String, Vec<String>> {
    let mut by_leaf: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for record in catalog {
        by_leaf
            .entry(record.leaf().to_string())
            .or_default()
            .push(record.name());
    }
    by_leaf.retain(|_, paths| paths.len() > 1);
    by_leaf
}

/// Fail with [`ResolveError::LeafCollision`] if `record`'s leaf is shared.
pub fn ensure_unique_leaf(catalog: &Catalog, record: &WorktreeRecord) -> Result<(), ResolveError> {
    match detect_leaf_collisions(catalog).remove(record.leaf()) {
        Some(paths) => Err(ResolveError::LeafCollision {
            leaf: record.leaf().to_string(),
            paths,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::catalog;

    fn names(records: &[&WorktreeRecord]) -> Vec<String> {
        records.iter().map(|r| r.name()).collect()
    }

    fn resolved_name(catalog: &Catalog, query: &str) -> Option<String> {
        resolve(catalog, query).into_result().ok().map(WorktreeRecord::name)
    }

    fn standard() -> Catalog {
        catalog(&["feature/auth", "fix/parser-bug", "refactor-models"])
    }

    #[test]
    fn exact_path_match() {
        let c = standard();
        let res = resolve(&c, "feature/auth");
        assert!(matches!(
            res,
            Resolution::Resolved {
                tier: MatchTier::Exact,
                ..
            }
        ));
        assert_eq!(resolved_name(&c, "feature/auth").as_deref(), Some("feature/auth"));
    }

    #[test]
    fn every_relative_path_resolves_exactly() {
        let c = catalog(&["a/b", "b", "a/b/c", "ab"]);
        for record in &c {
            assert_eq!(resolved_name(&c, &record.name()), Some(record.name()));
        }
    }

    #[test]
    fn leaf_match_unique() {
        let c = standard();
        let res = resolve(&c, "auth");
        assert!(matches!(
            res,
            Resolution::Resolved {
                tier: MatchTier::Leaf,
                ..
            }
        ));
        assert_eq!(resolved_name(&c, "auth").as_deref(), Some("feature/auth"));
    }

    #[test]
    fn leaf_beats_substring() {
        // "auth" is the leaf of one record and a substring of two others.
        let c = catalog(&["oauth-client", "feature/auth", "authz/rules"]);
        assert_eq!(resolved_name(&c, "auth").as_deref(), Some("feature/auth"));
    }

    #[test]
    fn substring_match_unique() {
        let c = standard();
        let res = resolve(&c, "parser");
        assert!(matches!(
            res,
            Resolution::Resolved {
                tier: MatchTier::Substring,
                ..
            }
        ));
        assert_eq!(resolved_name(&c, "parser").as_deref(), Some("fix/parser-bug"));
    }

    #[test]
    fn ambiguous_substring() {
        // "re" occurs in "featu(re)/auth" and "(re)factor-models".
        let c = standard();
        match resolve(&c, "re") {
            Resolution::Ambiguous {
                query,
                tier,
                candidates,
            } => {
                assert_eq!(query, "re");
                assert_eq!(tier, MatchTier::Substring);
                assert_eq!(names(&candidates), vec!["feature/auth", "refactor-models"]);
            }
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn substring_unique_then_ambiguous_when_second_match_added() {
        let c = catalog(&["fix/parser-bug", "refactor-models"]);
        assert_eq!(resolved_name(&c, "ref").as_deref(), Some("refactor-models"));

        let c = catalog(&["fix/parser-bug", "refactor-models", "pre-ref-cleanup"]);
        assert!(matches!(resolve(&c, "ref"), Resolution::Ambiguous { .. }));
    }

    #[test]
    fn no_match_lists_whole_catalog() {
        let c = standard();
        match resolve(&c, "nonexistent") {
            Resolution::NoMatch { query, available } => {
                assert_eq!(query, "nonexistent");
                assert_eq!(available.len(), 3);
            }
            other => panic!("expected NoMatch, got {other:?}"),
        }
    }

    #[test]
    fn no_match_on_empty_catalog() {
        let c = Catalog::default();
        assert!(matches!(resolve(&c, "auth"), Resolution::NoMatch { .. }));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let c = standard();
        assert!(matches!(resolve(&c, "AUTH"), Resolution::NoMatch { .. }));
    }

    #[test]
    fn shared_leaf_is_ambiguous_even_with_substring_hits() {
        let c = catalog(&["feature/auth", "legacy/auth", "oauth-client"]);
        match resolve(&c, "auth") {
            Resolution::Ambiguous {
                tier, candidates, ..
            } => {
                assert_eq!(tier, MatchTier::Leaf);
                assert_eq!(names(&candidates), vec!["feature/auth", "legacy/auth"]);
            }
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn exact_path_overrides_ambiguous_leaf() {
        let c = catalog(&["feature/auth", "fix/auth"]);
        assert_eq!(
            resolved_name(&c, "feature/auth").as_deref(),
            Some("feature/auth")
        );
    }

    #[test]
    fn substring_counts_records_not_occurrences() {
        // "ab" occurs twice in "ab/ab-x" but only once per record.
        let c = catalog(&["ab/ab-x", "other"]);
        assert_eq!(resolved_name(&c, "ab").as_deref(), Some("ab/ab-x"));
    }

    #[test]
    fn query_separators_are_normalized() {
        let c = standard();
        assert_eq!(
            resolved_name(&c, "feature\\auth").as_deref(),
            Some("feature/auth")
        );
        assert_eq!(
            resolved_name(&c, "feature/auth/").as_deref(),
            Some("feature/auth")
        );
    }

    #[test]
    fn into_result_maps_errors() {
        let c = standard();
        let err = resolve(&c, "re").into_result().unwrap_err();
        assert_eq!(
            err,
            ResolveError::Ambiguous {
                query: "re".to_string(),
                candidates: vec!["feature/auth".to_string(), "refactor-models".to_string()],
            }
        );

        let err = resolve(&c, "zzz").into_result().unwrap_err();
        assert!(matches!(err, ResolveError::NoMatch { ref available, .. } if available.len() == 3));
    }

    #[test]
    fn detect_collisions_reports_shared_leaves() {
        let c = catalog(&["feature/auth", "fix/parser-bug", "legacy/auth"]);
        let collisions = detect_leaf_collisions(&c);
        assert_eq!(collisions.len(), 1);
        assert_eq!(
            collisions.get("auth"),
            Some(&vec!["feature/auth".to_string(), "legacy/auth".to_string()])
        );
    }

    #[test]
    fn detect_collisions_empty_when_unique() {
        let c = standard();
        assert!(detect_leaf_collisions(&c).is_empty());
    }

    #[test]
    fn detect_collisions_sorted_by_leaf() {
        let c = catalog(&["x/zeta", "y/zeta", "x/alpha", "y/alpha"]);
        let collisions = detect_leaf_collisions(&c);
        let keys: Vec<&String> = collisions.keys().collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }

    #[test]
    fn ensure_unique_leaf_rejects_collision() {
        let c = catalog(&["feature/auth", "fix/auth", "fix/parser"]);
        let record = &c.records()[0];
        let err = ensure_unique_leaf(&c, record).unwrap_err();
        assert_eq!(
            err,
            ResolveError::LeafCollision {
                leaf: "auth".to_string(),
                paths: vec!["feature/auth".to_string(), "fix/auth".to_string()],
            }
        );
        assert!(ensure_unique_leaf(&c, &c.records()[2]).is_ok());
    }
}
