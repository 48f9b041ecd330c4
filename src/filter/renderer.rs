//! Canonical query string rendering
//!
//! [`render`] is the inverse of [`crate::filter::parse_filter`]: for any tree
//! the parser produces, `parse(render(tree)) == tree`. Rendering is driven by
//! [`fragments`], the same walk the term index is projected from, so the
//! editor's tokens always concatenate to the canonical string.
//!
//! Parentheses are emitted only where precedence needs them: around nested
//! ALL/ANY chains with more than one child, and after a NONE's `!` when it
//! negates several children or another NONE.

use crate::filter::rule::{Chain, Condition, LogicalOp, Rule, RulePath, Value};
use crate::utils::encoding::encode;
use std::borrow::Cow;
use std::fmt;

/// One lexical unit of the canonical form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment<'r> {
    Column(&'r Condition),
    Operator(&'r Condition),
    Value(&'r Condition),
    /// `!` in front of a NONE chain or a false boolean test
    Negation,
    /// Separator preceding the child at `before`
    LogicalOperator { op: LogicalOp, before: usize },
    GroupOpen,
    GroupClose,
}

impl<'r> Fragment<'r> {
    /// Wire text of the fragment
    pub fn raw(&self) -> Cow<'r, str> {
        match *self {
            Fragment::Column(condition) => encode(&condition.column),
            Fragment::Operator(condition) => Cow::Borrowed(condition.op.symbol()),
            Fragment::Value(condition) => render_value(&condition.value),
            Fragment::Negation => Cow::Borrowed("!"),
            Fragment::LogicalOperator { op: LogicalOp::All, .. } => Cow::Borrowed("&"),
            Fragment::LogicalOperator { .. } => Cow::Borrowed("|"),
            Fragment::GroupOpen => Cow::Borrowed("("),
            Fragment::GroupClose => Cow::Borrowed(")"),
        }
    }
}

fn render_value(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Bool(_) => Cow::Borrowed(""),
        Value::Scalar(text) => encode(text),
        Value::List(items) => {
            let items: Vec<Cow<'_, str>> = items.iter().map(|item| encode(item)).collect();
            Cow::Owned(format!("({})", items.join("|")))
        }
    }
}

/// Render a rule tree to its canonical query string
pub fn render(rule: &Rule) -> String {
    fragments(rule).iter().map(|(_, fragment)| fragment.raw()).collect()
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}

/// Walk a tree in rendering order, tagging each fragment with the path of the
/// node it came from
pub fn fragments(rule: &Rule) -> Vec<(RulePath, Fragment<'_>)> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    let mut node = rule;

    // Single-child ALL/ANY chains at the root add nothing
    while let Rule::Chain(chain) = node {
        if chain.op == LogicalOp::None {
            break;
        }
        let mut visible = visible_children(chain);
        match (visible.next(), visible.next()) {
            (Some((index, child)), None) => {
                path.push(index);
                node = child;
            }
            _ => break,
        }
    }

    if is_blank(node) {
        return out;
    }
    match node {
        Rule::Condition(condition) => emit_condition(condition, &path, &mut out),
        Rule::Chain(chain) => emit_chain_body(chain, &path, &mut out),
    }
    out
}

fn emit_condition<'r>(condition: &'r Condition, path: &RulePath, out: &mut Vec<(RulePath, Fragment<'r>)>) {
    match condition.value {
        Value::Bool(true) => out.push((path.clone(), Fragment::Column(condition))),
        Value::Bool(false) => {
            out.push((path.clone(), Fragment::Negation));
            out.push((path.clone(), Fragment::Column(condition)));
        }
        _ => {
            out.push((path.clone(), Fragment::Column(condition)));
            out.push((path.clone(), Fragment::Operator(condition)));
            out.push((path.clone(), Fragment::Value(condition)));
        }
    }
}

/// Emit a chain without surrounding parentheses
fn emit_chain_body<'r>(chain: &'r Chain, path: &RulePath, out: &mut Vec<(RulePath, Fragment<'r>)>) {
    if chain.op != LogicalOp::None {
        emit_children(chain, chain.op, path, out);
        return;
    }

    out.push((path.clone(), Fragment::Negation));
    let mut visible = visible_children(chain);
    let force_parens = match (visible.next(), visible.next()) {
        (Some(_), Some(_)) => true,
        (Some((_, only)), None) => renders_negated(only),
        _ => false,
    };
    if force_parens {
        out.push((path.clone(), Fragment::GroupOpen));
    }
    emit_children(chain, LogicalOp::Any, path, out);
    if force_parens {
        out.push((path.clone(), Fragment::GroupClose));
    }
}

fn emit_children<'r>(
    chain: &'r Chain,
    separator: LogicalOp,
    path: &RulePath,
    out: &mut Vec<(RulePath, Fragment<'r>)>,
) {
    for (position, (index, child)) in visible_children(chain).enumerate() {
        if position > 0 {
            out.push((path.clone(), Fragment::LogicalOperator { op: separator, before: index }));
        }
        let mut child_path = path.clone();
        child_path.push(index);
        emit_child(child, &child_path, out);
    }
}

fn emit_child<'r>(child: &'r Rule, path: &RulePath, out: &mut Vec<(RulePath, Fragment<'r>)>) {
    match child {
        Rule::Condition(condition) => emit_condition(condition, path, out),
        // `!` binds tightly, a NONE never needs outer parentheses
        Rule::Chain(chain) if chain.op == LogicalOp::None => emit_chain_body(chain, path, out),
        Rule::Chain(chain) if visible_children(chain).nth(1).is_some() => {
            out.push((path.clone(), Fragment::GroupOpen));
            emit_chain_body(chain, path, out);
            out.push((path.clone(), Fragment::GroupClose));
        }
        Rule::Chain(chain) => emit_chain_body(chain, path, out),
    }
}

/// Children that render to something, with their original indices
fn visible_children<'a>(chain: &'a Chain) -> impl Iterator<Item = (usize, &'a Rule)> + 'a {
    chain.children.iter().enumerate().filter(|(_, child)| !is_blank(child))
}

/// Whether a visible rule's rendering opens with its own `!`
///
/// Chains with a single visible child render as that child, so they are
/// looked through.
fn renders_negated(rule: &Rule) -> bool {
    match rule {
        Rule::Condition(_) => false,
        Rule::Chain(chain) if chain.op == LogicalOp::None => true,
        Rule::Chain(chain) => {
            let mut visible = visible_children(chain);
            match (visible.next(), visible.next()) {
                (Some((_, only)), None) => renders_negated(only),
                _ => false,
            }
        }
    }
}

/// A chain with nothing to render (empty, or only blank descendants)
fn is_blank(rule: &Rule) -> bool {
    match rule {
        Rule::Condition(_) => false,
        Rule::Chain(chain) => chain.children.iter().all(is_blank),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_filter;

    #[test]
    fn test_render_conditions() {
        assert_eq!(render(&Rule::equal("host", "web")), "host=web");
        assert_eq!(render(&Rule::unequal("state", "2")), "state!=2");
        assert_eq!(render(&Rule::less_than_or_equal("load", "0.5")), "load<=0.5");
        assert_eq!(render(&Rule::boolean("active", true)), "active");
        assert_eq!(render(&Rule::boolean("active", false)), "!active");
    }

    #[test]
    fn test_render_encodes_text() {
        let rule = Rule::equal("display name", "a|b & (c)");
        assert_eq!(render(&rule), "display%20name=a%7Cb%20%26%20%28c%29");
    }

    #[test]
    fn test_render_array_value() {
        let rule = Rule::equal("port", vec![80, 8080]);
        assert_eq!(render(&rule), "port=(80|8080)");
        assert_eq!(parse_filter(&render(&rule)).unwrap(), rule);
    }

    #[test]
    fn test_nested_chains_get_parentheses() {
        let rule = Rule::all(vec![
            Rule::equal("a", "1"),
            Rule::any(vec![Rule::equal("b", "2"), Rule::equal("c", "3")]),
        ]);
        assert_eq!(render(&rule), "a=1&(b=2|c=3)");
    }

    #[test]
    fn test_single_child_chains_render_without_parentheses() {
        let rule = Rule::all(vec![
            Rule::equal("a", "1"),
            Rule::any(vec![Rule::equal("b", "2")]),
        ]);
        assert_eq!(render(&rule), "a=1&b=2");

        let rule = Rule::all(vec![Rule::any(vec![Rule::equal("b", "2"), Rule::equal("c", "3")])]);
        assert_eq!(render(&rule), "b=2|c=3");
    }

    #[test]
    fn test_none_chain() {
        assert_eq!(render(&Rule::none(vec![Rule::equal("a", "1")])), "!a=1");
        assert_eq!(
            render(&Rule::none(vec![Rule::equal("a", "1"), Rule::equal("b", "2")])),
            "!(a=1|b=2)"
        );
        assert_eq!(
            render(&Rule::none(vec![Rule::all(vec![Rule::equal("a", "1"), Rule::equal("b", "2")])])),
            "!(a=1&b=2)"
        );
        assert_eq!(
            render(&Rule::none(vec![Rule::none(vec![Rule::equal("a", "1")])])),
            "!(!a=1)"
        );
    }

    #[test]
    fn test_none_chain_sees_through_single_child_chains() {
        let rule = Rule::none(vec![Rule::all(vec![Rule::none(vec![Rule::equal("a", "1")])])]);
        assert_eq!(render(&rule), "!(!a=1)");
        assert_eq!(render(&parse_filter(&render(&rule)).unwrap()), "!(!a=1)");

        let rule = Rule::none(vec![Rule::any(vec![
            Rule::all(vec![]),
            Rule::all(vec![Rule::none(vec![Rule::equal("a", "1")])]),
        ])]);
        assert_eq!(render(&rule), "!(!a=1)");

        let rule = Rule::none(vec![Rule::all(vec![Rule::equal("a", "1")])]);
        assert_eq!(render(&rule), "!a=1");
    }

    #[test]
    fn test_none_chain_inside_chain() {
        let rule = Rule::any(vec![
            Rule::equal("a", "1"),
            Rule::none(vec![Rule::equal("b", "2"), Rule::equal("c", "3")]),
        ]);
        assert_eq!(render(&rule), "a=1|!(b=2|c=3)");
        assert_eq!(parse_filter(&render(&rule)).unwrap(), Rule::any(vec![
            Rule::equal("a", "1"),
            Rule::none(vec![Rule::any(vec![Rule::equal("b", "2"), Rule::equal("c", "3")])]),
        ]));
    }

    #[test]
    fn test_empty_chains_render_nothing() {
        assert_eq!(render(&Rule::empty()), "");
        let rule = Rule::all(vec![Rule::equal("a", "1"), Rule::any(vec![]), Rule::equal("b", "2")]);
        assert_eq!(render(&rule), "a=1&b=2");
    }

    #[test]
    fn test_display() {
        assert_eq!(Rule::equal("a", "b").to_string(), "a=b");
    }

    #[test]
    fn test_fragments_carry_paths() {
        let rule = parse_filter("a=1&(b=2|c=3)").unwrap();
        let paths: Vec<(RulePath, String)> = fragments(&rule)
            .into_iter()
            .map(|(path, fragment)| (path, fragment.raw().into_owned()))
            .collect();
        assert_eq!(paths[0], (vec![0], "a".to_string()));
        assert_eq!(paths[3], (vec![], "&".to_string()));
        assert_eq!(paths[4], (vec![1], "(".to_string()));
        assert_eq!(paths[5], (vec![1, 0], "b".to_string()));
        assert_eq!(paths.last().unwrap(), &(vec![1], ")".to_string()));
    }
}
