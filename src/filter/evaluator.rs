//! Filter expression evaluator
//!
//! Evaluates rule trees against records to determine which records match.
//!
//! # Condition Semantics
//!
//! - `column=value` / `column!=value` - Text comparison, `*` in the value matches any run of characters
//! - `column>value` etc. - Numeric when both sides parse as numbers, lexicographic otherwise
//! - `column=(a|b)` - Matches when any element matches (`!=`: when none does)
//! - `column` / `!column` - Present and not `""`, `0` or `false` (and its complement)
//!
//! A record without the column never satisfies a comparison.

use crate::filter::rule::{Chain, ComparisonOp, Condition, LogicalOp, Rule, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Column lookup for evaluation
pub trait Record {
    /// Text of a column, or `None` when the record lacks it
    fn field(&self, column: &str) -> Option<String>;
}

impl Record for serde_json::Map<String, serde_json::Value> {
    fn field(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl Record for HashMap<String, String> {
    fn field(&self, column: &str) -> Option<String> {
        self.get(column).cloned()
    }
}

impl Rule {
    /// Evaluate the rule against a record
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        match self {
            Rule::Condition(condition) => condition.matches(record),
            Rule::Chain(chain) => chain.matches(record),
        }
    }
}

impl Chain {
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        match self.op {
            LogicalOp::All => self.children.iter().all(|child| child.matches(record)),
            LogicalOp::Any => {
                // An empty ANY chain is no constraint
                self.children.is_empty() || self.children.iter().any(|child| child.matches(record))
            }
            LogicalOp::None => !self.children.iter().any(|child| child.matches(record)),
        }
    }
}

impl Condition {
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        let field = record.field(&self.column);

        if let Value::Bool(expected) = self.value {
            return is_truthy(field.as_deref()) == expected;
        }
        let Some(field) = field else {
            return false;
        };

        match (&self.value, self.op) {
            (Value::List(items), ComparisonOp::Eq) => items.iter().any(|item| wildcard_match(item, &field)),
            (Value::List(items), ComparisonOp::Neq) => !items.iter().any(|item| wildcard_match(item, &field)),
            (Value::List(items), op) => items.iter().any(|item| compare(&field, op, item)),
            (Value::Scalar(value), op) => compare(&field, op, value),
            (Value::Bool(_), _) => false,
        }
    }
}

fn is_truthy(field: Option<&str>) -> bool {
    !matches!(field, None | Some("") | Some("0") | Some("false"))
}

fn compare(field: &str, op: ComparisonOp, value: &str) -> bool {
    match op {
        ComparisonOp::Eq => wildcard_match(value, field),
        ComparisonOp::Neq => !wildcard_match(value, field),
        ComparisonOp::Gt => order(field, value) == Ordering::Greater,
        ComparisonOp::Lt => order(field, value) == Ordering::Less,
        ComparisonOp::Gte => order(field, value) != Ordering::Less,
        ComparisonOp::Lte => order(field, value) != Ordering::Greater,
    }
}

fn order(field: &str, value: &str) -> Ordering {
    match (field.trim().parse::<f64>(), value.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => field.cmp(value),
    }
}

/// Match `text` against `pattern`, where `*` stands for any run of characters
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == text;
    }

    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or("");
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    let mut middle: Vec<&str> = parts.collect();
    let last = middle.pop().unwrap_or("");
    for part in middle {
        match rest.find(part) {
            Some(index) => rest = &rest[index + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}

/// Keep the records a rule matches, in order
pub fn filter_records<'a, R: Record>(records: &'a [R], rule: &Rule) -> Vec<&'a R> {
    records.iter().filter(|record| rule.matches(*record)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_filter;
    use serde_json::json;

    fn record(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    fn check(filter: &str, value: serde_json::Value) -> bool {
        parse_filter(filter).unwrap().matches(&record(value))
    }

    #[test]
    fn test_equality() {
        assert!(check("host=web", json!({"host": "web"})));
        assert!(!check("host=web", json!({"host": "db"})));
        assert!(check("host!=web", json!({"host": "db"})));
        assert!(check("state=2", json!({"state": 2})));
    }

    #[test]
    fn test_wildcards() {
        assert!(check("host=web*", json!({"host": "web-01"})));
        assert!(check("host=*01", json!({"host": "web-01"})));
        assert!(check("host=w*-*1", json!({"host": "web-01"})));
        assert!(!check("host=db*", json!({"host": "web-01"})));
        assert!(check("host=*", json!({"host": ""})));
        assert!(!check("host=a*a", json!({"host": "a"})));
    }

    #[test]
    fn test_ordering() {
        assert!(check("load>1.5", json!({"load": 2})));
        assert!(!check("load>10", json!({"load": 9})));
        assert!(check("load<=9", json!({"load": "9"})));
        assert!(check("name>alpha", json!({"name": "beta"})));
        assert!(check("name>=beta", json!({"name": "beta"})));
        assert!(!check("name<alpha", json!({"name": "beta"})));
    }

    #[test]
    fn test_array_values() {
        assert!(check("port=(80|443)", json!({"port": 443})));
        assert!(!check("port=(80|443)", json!({"port": 22})));
        assert!(check("port!=(80|443)", json!({"port": 22})));
        assert!(!check("port!=(80|443)", json!({"port": 80})));
    }

    #[test]
    fn test_boolean_tests() {
        assert!(check("active", json!({"active": true})));
        assert!(check("active", json!({"active": "yes"})));
        assert!(!check("active", json!({"active": 0})));
        assert!(!check("active", json!({"active": false})));
        assert!(!check("active", json!({})));
        assert!(check("!active", json!({"active": ""})));
        assert!(check("!active", json!({"active": null})));
    }

    #[test]
    fn test_missing_column_never_matches() {
        assert!(!check("host=web", json!({})));
        assert!(!check("host!=web", json!({})));
        assert!(!check("load>1", json!({"load": null})));
    }

    #[test]
    fn test_chains() {
        let r = json!({"a": "1", "b": "2"});
        assert!(check("a=1&b=2", r.clone()));
        assert!(!check("a=1&b=3", r.clone()));
        assert!(check("a=9|b=2", r.clone()));
        assert!(!check("!(a=1|b=3)", r.clone()));
        assert!(check("!(a=3|b=3)", r.clone()));
        assert!(Rule::empty().matches(&record(r)));
    }

    #[test]
    fn test_filter_records() {
        let records = vec![
            record(json!({"host": "web-01"})),
            record(json!({"host": "db-01"})),
            record(json!({"host": "web-02"})),
        ];
        let rule = parse_filter("host=web*").unwrap();
        let matched = filter_records(&records, &rule);
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[1].field("host").as_deref(), Some("web-02"));
    }

    #[test]
    fn test_hashmap_record() {
        let mut map = HashMap::new();
        map.insert("host".to_string(), "web".to_string());
        assert!(Rule::equal("host", "web").matches(&map));
    }
}
