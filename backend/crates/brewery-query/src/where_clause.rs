//! Extraction of the handful of attribute predicates the upstream can filter
//! on from a SQL-like `where` expression.
//!
//! This is a closed-set extractor, not a parser: each supported predicate is
//! one row in [`PREDICATES`] pairing its field aliases with the upstream
//! parameter it feeds. Only `<alias> = '<value>'` fragments are recognised
//! and only the first fragment per predicate counts.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use tracing::debug;

/// A predicate the upstream can evaluate natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WherePredicate {
    /// Exact city match (`by_city`).
    City,
    /// Exact state or province match (`by_state`).
    State,
    /// Postal code match (`by_postal`).
    Postal,
    /// Brewery type match (`by_type`).
    Type,
}

/// Field aliases accepted for each predicate.
const PREDICATES: [(WherePredicate, &[&str]); 4] = [
    (WherePredicate::City, &["city"]),
    (WherePredicate::State, &["state_province", "state"]),
    (WherePredicate::Postal, &["postal_code"]),
    (WherePredicate::Type, &["brewery_type", "type"]),
];

struct PredicatePattern {
    predicate: WherePredicate,
    pattern: Regex,
}

#[expect(
    clippy::expect_used,
    reason = "patterns are assembled from compile-time aliases and covered by tests"
)]
static PATTERNS: LazyLock<Vec<PredicatePattern>> = LazyLock::new(|| {
    PREDICATES
        .iter()
        .map(|(predicate, aliases)| PredicatePattern {
            predicate: *predicate,
            pattern: RegexBuilder::new(&format!(r"\b({})\s*=\s*'(.*?)'", aliases.join("|")))
                .case_insensitive(true)
                .build()
                .expect("predicate pattern compiles"),
        })
        .collect()
});

/// Predicates extracted from one `where` expression, values already in
/// upstream form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhereParams {
    /// City value for `by_city`.
    pub by_city: Option<String>,
    /// State value for `by_state`.
    pub by_state: Option<String>,
    /// Postal code for `by_postal`.
    pub by_postal: Option<String>,
    /// Type label for `by_type`.
    pub by_type: Option<String>,
}

impl WhereParams {
    /// Whether nothing was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn slot(&mut self, predicate: WherePredicate) -> &mut Option<String> {
        match predicate {
            WherePredicate::City => &mut self.by_city,
            WherePredicate::State => &mut self.by_state,
            WherePredicate::Postal => &mut self.by_postal,
            WherePredicate::Type => &mut self.by_type,
        }
    }
}

/// Extract the supported predicates from `where_clause`.
///
/// Whitespace inside a value becomes `_`, which the upstream treats as a word
/// separator. Fragments with an empty value are ignored.
///
/// # Examples
///
/// ```
/// use brewery_query::where_clause::extract_where_params;
///
/// let params = extract_where_params("city = 'san diego' AND state_province = 'california'");
/// assert_eq!(params.by_city.as_deref(), Some("san_diego"));
/// assert_eq!(params.by_state.as_deref(), Some("california"));
/// ```
#[must_use]
pub fn extract_where_params(where_clause: &str) -> WhereParams {
    let mut params = WhereParams::default();
    if where_clause.trim().is_empty() {
        return params;
    }

    for entry in PATTERNS.iter() {
        let value = entry
            .pattern
            .captures(where_clause)
            .and_then(|captures| captures.get(2))
            .map(|value| value.as_str().trim())
            .filter(|value| !value.is_empty());
        match value {
            Some(text) => {
                *params.slot(entry.predicate) = Some(upstream_words(text));
            }
            None if entry.pattern.is_match(where_clause) => {
                debug!(predicate = ?entry.predicate, "ignoring empty where predicate value");
            }
            None => {}
        }
    }
    params
}

/// Whether any supported predicate appears in `where_clause`.
///
/// This only reports that a recognised fragment exists; it does not prove
/// the rest of the expression (other fields, `OR` branches) was honoured.
#[must_use]
pub fn did_apply_where_filter(where_clause: Option<&str>) -> bool {
    where_clause.is_some_and(|clause| {
        PATTERNS
            .iter()
            .any(|entry| entry.pattern.is_match(clause))
    })
}

fn upstream_words(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}
