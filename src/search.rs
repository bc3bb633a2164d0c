//! Attachment search with recognition keyword matching.
//!
//! [`build_search`] turns a free-text query into SQL clauses over the
//! `attachments` table. [`augment_with_keywords`] rewrites those clauses so
//! every description condition also checks the stored keyword string, which
//! makes images findable by what is in them.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::store::KEYWORDS_KEY;

/// Alias of the joined keyword meta row.
const KEYWORDS_ALIAS: &str = "recognition_keywords_meta";

static DESCRIPTION_CONDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(attachments\.description (NOT LIKE|LIKE) (\?\d+(?: ESCAPE '\\')?)\)").expect("valid regex")
});

/// The parts of a search query that extensions may rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryClauses {
    /// Extra JOINs, appended after `FROM attachments`
    pub join: String,
    /// Boolean condition, without the `WHERE` keyword
    pub where_clause: String,
    /// Grouping expression, without `GROUP BY`; empty for none
    pub group_by: String,
}

/// Clauses plus the values for their numbered parameters (`?1`, `?2`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub clauses: QueryClauses,
    pub patterns: Vec<String>,
}

/// Build search clauses for a whitespace-separated query.
///
/// Every term must match the title, caption or description. A term
/// prefixed with `-` must match none of them. Terms match literally: `%`
/// and `_` are not wildcards. Returns `None` when the query has no terms.
pub fn build_search(query: &str) -> Option<SearchQuery> {
    let mut conditions = Vec::new();
    let mut patterns = Vec::new();

    for term in query.split_whitespace() {
        let (negated, word) = match term.strip_prefix('-') {
            Some(rest) if !rest.is_empty() => (true, rest),
            _ => (false, term),
        };

        patterns.push(format!("%{}%", escape_like(word)));
        let param = format!("?{} ESCAPE '\\'", patterns.len());

        let condition = if negated {
            format!(
                "((attachments.title NOT LIKE {p}) AND (attachments.excerpt NOT LIKE {p}) AND (attachments.description NOT LIKE {p}))",
                p = param
            )
        } else {
            format!(
                "((attachments.title LIKE {p}) OR (attachments.excerpt LIKE {p}) OR (attachments.description LIKE {p}))",
                p = param
            )
        };
        conditions.push(condition);
    }

    if conditions.is_empty() {
        return None;
    }

    Some(SearchQuery {
        clauses: QueryClauses {
            join: String::new(),
            where_clause: conditions.join(" AND "),
            group_by: String::new(),
        },
        patterns,
    })
}

/// Escape `LIKE` wildcards so the word matches literally under `ESCAPE '\'`.
fn escape_like(word: &str) -> String {
    let mut escaped = String::with_capacity(word.len());
    for c in word.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Extend description conditions to also match recognition keywords.
///
/// Left-joins the keyword meta row, so existing joins are untouched, and
/// groups by attachment so no row is returned twice. `LIKE` conditions
/// become "description or keywords"; `NOT LIKE` conditions become
/// "neither description nor keywords". Clauses without a description
/// condition are returned unchanged. Applying this twice is the same as
/// applying it once.
pub fn augment_with_keywords(clauses: QueryClauses) -> QueryClauses {
    if clauses.join.contains(KEYWORDS_ALIAS) || !DESCRIPTION_CONDITION.is_match(&clauses.where_clause) {
        return clauses;
    }

    let join = format!(
        "{} LEFT JOIN attachment_meta AS {a} ON (attachments.id = {a}.attachment_id AND {a}.meta_key = '{key}')",
        clauses.join,
        a = KEYWORDS_ALIAS,
        key = KEYWORDS_KEY,
    );

    let where_clause = DESCRIPTION_CONDITION
        .replace_all(&clauses.where_clause, |caps: &Captures| {
            let op = &caps[1];
            let param = &caps[2];
            if op == "LIKE" {
                format!("({} OR ({}.meta_value LIKE {}))", &caps[0], KEYWORDS_ALIAS, param)
            } else {
                format!(
                    "({} AND (COALESCE({}.meta_value, '') NOT LIKE {}))",
                    &caps[0], KEYWORDS_ALIAS, param
                )
            }
        })
        .into_owned();

    QueryClauses {
        join: join.trim_start().to_string(),
        where_clause,
        group_by: "attachments.id".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_search_terms() {
        let search = build_search("  red  -car ").unwrap();
        assert_eq!(search.patterns, vec!["%red%", "%car%"]);
        assert!(search.clauses.where_clause.contains("attachments.title LIKE ?1 ESCAPE '\\'"));
        assert!(search.clauses.where_clause.contains("attachments.description NOT LIKE ?2 ESCAPE '\\'"));
        assert!(search.clauses.join.is_empty());
    }

    #[test]
    fn test_build_search_empty() {
        assert!(build_search("").is_none());
        assert!(build_search(" \t ").is_none());
    }

    #[test]
    fn test_lone_dash_is_a_term() {
        let search = build_search("-").unwrap();
        assert_eq!(search.patterns, vec!["%-%"]);
        assert!(!search.clauses.where_clause.contains("NOT LIKE"));
    }

    #[test]
    fn test_wildcards_are_escaped() {
        let search = build_search("100% snake_case a\\b").unwrap();
        assert_eq!(search.patterns, vec![r"%100\%%", r"%snake\_case%", r"%a\\b%"]);
    }

    #[test]
    fn test_augment_adds_join_group_and_keyword_match() {
        let clauses = build_search("sunset").unwrap().clauses;
        let augmented = augment_with_keywords(clauses);

        assert!(augmented.join.starts_with("LEFT JOIN attachment_meta AS recognition_keywords_meta"));
        assert!(augmented.join.contains("'recognition_keywords'"));
        assert_eq!(augmented.group_by, "attachments.id");
        assert!(augmented
            .where_clause
            .contains(r"((attachments.description LIKE ?1 ESCAPE '\') OR (recognition_keywords_meta.meta_value LIKE ?1 ESCAPE '\'))"));
    }

    #[test]
    fn test_augment_negated_term_excludes_keywords() {
        let augmented = augment_with_keywords(build_search("-dog").unwrap().clauses);
        assert!(augmented
            .where_clause
            .contains(r"AND (COALESCE(recognition_keywords_meta.meta_value, '') NOT LIKE ?1 ESCAPE '\')"));
    }

    #[test]
    fn test_augment_keeps_existing_join() {
        let mut clauses = build_search("cat").unwrap().clauses;
        clauses.join = "JOIN albums ON albums.id = attachments.id".to_string();
        let augmented = augment_with_keywords(clauses);
        assert!(augmented.join.starts_with("JOIN albums ON albums.id = attachments.id LEFT JOIN"));
    }

    #[test]
    fn test_augment_is_idempotent() {
        let once = augment_with_keywords(build_search("sky -sea").unwrap().clauses);
        let twice = augment_with_keywords(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_augment_without_description_condition_is_unchanged() {
        let clauses = QueryClauses {
            join: String::new(),
            where_clause: "attachments.mime_type LIKE 'image/%'".to_string(),
            group_by: String::new(),
        };
        assert_eq!(augment_with_keywords(clauses.clone()), clauses);
    }
}
