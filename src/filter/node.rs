use super::glob::glob_match;
use crate::row::{Row, canonical_string};
use serde_json::Value;

/// One value alternative of a wildcard check, e.g. `err*` or `!debug`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobAlternative {
    pub pattern: String,
    pub negated: bool,
}

impl GlobAlternative {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('!') {
            Some(pattern) => Self {
                pattern: pattern.to_string(),
                negated: true,
            },
            None => Self {
                pattern: raw.to_string(),
                negated: false,
            },
        }
    }

    fn matches(&self, value: &str) -> bool {
        glob_match(&self.pattern, value) != self.negated
    }
}

/// Immutable boolean predicate tree over a [`Row`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterNode {
    All,
    /// Field present and its string form equals one of the values
    Equal { field: String, values: Vec<String> },
    /// Field present and its string form contains one of the substrings
    Contains {
        field: String,
        substrings: Vec<String>,
    },
    /// Field pattern (may contain `*`) and glob alternatives
    Wildcard {
        field: String,
        alternatives: Vec<GlobAlternative>,
    },
    Not(Box<FilterNode>),
    And(Box<FilterNode>, Box<FilterNode>),
    Or(Box<FilterNode>, Box<FilterNode>),
}

/// Split a value token into its `|`-delimited alternatives
pub fn alternatives(value: &str) -> Vec<String> {
    value.split('|').map(str::to_string).collect()
}

impl FilterNode {
    pub fn equal(field: &str, value: &str) -> Self {
        FilterNode::Equal {
            field: field.to_string(),
            values: alternatives(value),
        }
    }

    pub fn contains(field: &str, value: &str) -> Self {
        FilterNode::Contains {
            field: field.to_string(),
            substrings: alternatives(value),
        }
    }

    pub fn wildcard(field: &str, value: &str) -> Self {
        FilterNode::Wildcard {
            field: field.to_string(),
            alternatives: value.split('|').map(GlobAlternative::parse).collect(),
        }
    }

    pub fn not(child: FilterNode) -> Self {
        FilterNode::Not(Box::new(child))
    }

    pub fn and(left: FilterNode, right: FilterNode) -> Self {
        FilterNode::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: FilterNode, right: FilterNode) -> Self {
        FilterNode::Or(Box::new(left), Box::new(right))
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            FilterNode::All => true,
            FilterNode::Equal { field, values } => row.get(field).is_some_and(|value| {
                let value = canonical_string(value);
                values.iter().any(|v| v.as_str() == value.as_ref())
            }),
            FilterNode::Contains { field, substrings } => row.get(field).is_some_and(|value| {
                let value = canonical_string(value);
                substrings.iter().any(|s| value.contains(s.as_str()))
            }),
            FilterNode::Wildcard {
                field,
                alternatives,
            } => {
                let value_matches = |value: &Value| {
                    let value = canonical_string(value);
                    alternatives.iter().any(|alt| alt.matches(&value))
                };
                if field.contains('*') {
                    row.data()
                        .iter()
                        .filter(|(key, _)| glob_match(field, key))
                        .any(|(_, value)| value_matches(value))
                } else {
                    row.get(field).is_some_and(value_matches)
                }
            }
            FilterNode::Not(child) => !child.matches(row),
            FilterNode::And(left, right) => left.matches(row) && right.matches(row),
            FilterNode::Or(left, right) => left.matches(row) || right.matches(row),
        }
    }
}
