//! Structural edits on rule trees
//!
//! Edits arrive as textual directives from the tree editor, addressing nodes
//! by dash-joined child indices from the root (`0-2-1`; the root itself is the
//! empty path):
//!
//! ```text
//! drop-rule:<path>
//! condition-before:<path>   condition-after:<path>
//! chain-before:<path>       chain-after:<path>
//! move-rule:<path> <before|after|into>:<path>
//! negate-rule:<path>
//! chain-operator:<path>:<and|or|not>
//! ```
//!
//! [`apply_edit`] never touches the tree it is given; it returns a new root.
//! A directive naming a path that does not exist leaves the tree unchanged.

use crate::filter::rule::{format_path, Chain, LogicalOp, Rule, RulePath};
use log::debug;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("Unknown edit directive '{0}'")]
    UnknownDirective(String),
    #[error("Invalid rule path '{0}'. Paths are child indices joined by '-', e.g. 0-2-1")]
    InvalidPath(String),
    #[error("Unknown placement '{0}'. Expected one of: before, after, into")]
    UnknownPlacement(String),
    #[error("move-rule:{0} requires a target such as after:<path>")]
    MissingPlacement(String),
    #[error("Unknown chain operator '{0}'. Expected one of: and, or, not")]
    UnknownOperator(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
    /// Append as the last child of the target chain
    Into,
}

impl Placement {
    fn from_name(name: &str) -> Result<Self, EditError> {
        match name {
            "before" => Ok(Placement::Before),
            "after" => Ok(Placement::After),
            "into" => Ok(Placement::Into),
            other => Err(EditError::UnknownPlacement(other.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Placement::Before => "before",
            Placement::After => "after",
            Placement::Into => "into",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditDirective {
    Drop(RulePath),
    Insert { path: RulePath, placement: Placement, rule: Rule },
    Move { from: RulePath, placement: Placement, to: RulePath },
    Negate(RulePath),
    SetChainOperator(RulePath, LogicalOp),
}

impl fmt::Display for EditDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditDirective::Drop(path) => write!(f, "drop-rule:{}", format_path(path)),
            EditDirective::Insert { path, placement, rule } => {
                let kind = if rule.as_chain().is_some() { "chain" } else { "condition" };
                write!(f, "{}-{}:{}", kind, placement.name(), format_path(path))
            }
            EditDirective::Move { from, placement, to } => write!(
                f,
                "move-rule:{} {}:{}",
                format_path(from),
                placement.name(),
                format_path(to)
            ),
            EditDirective::Negate(path) => write!(f, "negate-rule:{}", format_path(path)),
            EditDirective::SetChainOperator(path, op) => {
                let name = match op {
                    LogicalOp::All => "and",
                    LogicalOp::Any => "or",
                    LogicalOp::None => "not",
                };
                write!(f, "chain-operator:{}:{}", format_path(path), name)
            }
        }
    }
}

/// Placeholder inserted by condition-before/after when no rule is supplied
///
/// It renders as `column=`, which parses back to the same condition.
pub fn placeholder_condition() -> Rule {
    Rule::equal("column", "")
}

/// Parse a dash-joined rule path
pub fn parse_path(text: &str) -> Result<RulePath, EditError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split('-')
        .map(|part| part.parse::<usize>().map_err(|_| EditError::InvalidPath(text.to_string())))
        .collect()
}

/// Parse a list of directive arguments
///
/// `move-rule:<path>` consumes the following argument as its target. It may
/// also be joined to it with `+` (`move-rule:0+after:2`). `payload`, when
/// given, is the rule inserted by condition-/chain- directives.
pub fn parse_directives(args: &[String], payload: Option<&Rule>) -> Result<Vec<EditDirective>, EditError> {
    let mut directives = Vec::new();
    let mut iter = args.iter().flat_map(|arg| arg.split('+')).peekable();

    while let Some(arg) = iter.next() {
        let (name, rest) = arg
            .split_once(':')
            .ok_or_else(|| EditError::UnknownDirective(arg.to_string()))?;

        let directive = match name {
            "drop-rule" => EditDirective::Drop(parse_path(rest)?),
            "condition-before" | "condition-after" | "chain-before" | "chain-after" => {
                let (kind, placement) = name.split_once('-').unwrap_or((name, ""));
                let placement = Placement::from_name(placement)?;
                let rule = payload.cloned().unwrap_or_else(placeholder_condition);
                let rule = match (kind, rule) {
                    ("chain", rule @ Rule::Chain(_)) => rule,
                    ("chain", rule) => Rule::all(vec![rule]),
                    (_, rule) => rule,
                };
                EditDirective::Insert { path: parse_path(rest)?, placement, rule }
            }
            "move-rule" => {
                let from = parse_path(rest)?;
                let target = iter
                    .next()
                    .ok_or_else(|| EditError::MissingPlacement(rest.to_string()))?;
                let (placement, to) = target
                    .split_once(':')
                    .ok_or_else(|| EditError::MissingPlacement(rest.to_string()))?;
                EditDirective::Move {
                    from,
                    placement: Placement::from_name(placement)?,
                    to: parse_path(to)?,
                }
            }
            "negate-rule" => EditDirective::Negate(parse_path(rest)?),
            "chain-operator" => {
                let (path, op) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| EditError::UnknownOperator(rest.to_string()))?;
                let op = LogicalOp::from_name(op).ok_or_else(|| EditError::UnknownOperator(op.to_string()))?;
                EditDirective::SetChainOperator(parse_path(path)?, op)
            }
            _ => return Err(EditError::UnknownDirective(arg.to_string())),
        };
        directives.push(directive);
    }

    Ok(directives)
}

/// Apply one directive, returning the new root
pub fn apply_edit(root: &Rule, directive: &EditDirective) -> Rule {
    let mut next = root.clone();
    let applied = match directive {
        EditDirective::Drop(path) => remove_at(&mut next, path).is_some(),
        EditDirective::Insert { path, placement, rule } => insert_at(&mut next, path, *placement, rule.clone()),
        EditDirective::Move { from, placement, to } => move_rule(&mut next, from, *placement, to),
        EditDirective::Negate(path) => negate_at(&mut next, path),
        EditDirective::SetChainOperator(path, op) => match get_mut(&mut next, path) {
            Some(Rule::Chain(chain)) => {
                chain.op = *op;
                true
            }
            _ => false,
        },
    };

    if !applied {
        debug!("edit '{}' does not apply, tree unchanged", directive);
        return root.clone();
    }
    prune(&mut next);
    next
}

/// Apply directives in order
pub fn apply_edits(root: &Rule, directives: &[EditDirective]) -> Rule {
    directives
        .iter()
        .fold(root.clone(), |rule, directive| apply_edit(&rule, directive))
}

fn get_mut<'a>(root: &'a mut Rule, path: &[usize]) -> Option<&'a mut Rule> {
    let mut node = root;
    for &index in path {
        node = match node {
            Rule::Chain(chain) => chain.children.get_mut(index)?,
            Rule::Condition(_) => return None,
        };
    }
    Some(node)
}

fn parent_chain<'a>(root: &'a mut Rule, path: &[usize]) -> Option<(&'a mut Chain, usize)> {
    let (&index, parent) = path.split_last()?;
    match get_mut(root, parent)? {
        Rule::Chain(chain) if index < chain.children.len() => Some((chain, index)),
        _ => None,
    }
}

fn remove_at(root: &mut Rule, path: &[usize]) -> Option<Rule> {
    if path.is_empty() {
        return Some(std::mem::replace(root, Rule::empty()));
    }
    let (chain, index) = parent_chain(root, path)?;
    Some(chain.children.remove(index))
}

fn insert_at(root: &mut Rule, path: &[usize], placement: Placement, rule: Rule) -> bool {
    if placement == Placement::Into {
        return match get_mut(root, path) {
            Some(Rule::Chain(chain)) => {
                chain.children.push(rule);
                true
            }
            _ => false,
        };
    }

    if path.is_empty() {
        // Siblings of the root: extend an ALL/ANY root, otherwise wrap it
        return match root {
            Rule::Chain(chain) if chain.op != LogicalOp::None => {
                match placement {
                    Placement::Before => chain.children.insert(0, rule),
                    _ => chain.children.push(rule),
                }
                true
            }
            _ => {
                let old = std::mem::replace(root, Rule::empty());
                *root = match placement {
                    Placement::Before => Rule::all(vec![rule, old]),
                    _ => Rule::all(vec![old, rule]),
                };
                true
            }
        };
    }

    match parent_chain(root, path) {
        Some((chain, index)) => {
            let index = if placement == Placement::After { index + 1 } else { index };
            chain.children.insert(index, rule);
            true
        }
        None => false,
    }
}

fn move_rule(root: &mut Rule, from: &[usize], placement: Placement, to: &[usize]) -> bool {
    if to.starts_with(from) {
        debug!("cannot move {} into its own subtree", format_path(from));
        return false;
    }
    if root.get(to).is_none() {
        return false;
    }
    let Some(moved) = remove_at(root, from) else {
        return false;
    };

    // Removing `from` shifts later siblings on its level
    let mut target = to.to_vec();
    let level = from.len() - 1;
    if target.len() > level && target[..level] == from[..level] && target[level] > from[level] {
        target[level] -= 1;
    }

    insert_at(root, &target, placement, moved)
}

fn negate_at(root: &mut Rule, path: &[usize]) -> bool {
    let Some(node) = get_mut(root, path) else {
        return false;
    };
    let old = std::mem::replace(node, Rule::empty());
    *node = match old {
        Rule::Chain(Chain { op: LogicalOp::None, mut children }) if children.len() == 1 => {
            children.pop().unwrap_or_else(Rule::empty)
        }
        other => other.negate(),
    };
    true
}

/// Remove empty chains below the root
fn prune(rule: &mut Rule) {
    if let Rule::Chain(chain) = rule {
        for child in chain.children.iter_mut() {
            prune(child);
        }
        chain.children.retain(|child| !child.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{parse_filter, render};

    fn edit(input: &str, directives: &[&str]) -> String {
        let args: Vec<String> = directives.iter().map(|s| s.to_string()).collect();
        let directives = parse_directives(&args, None).unwrap();
        render(&apply_edits(&parse_filter(input).unwrap(), &directives))
    }

    fn edit_with(input: &str, directive: &str, payload: &str) -> String {
        let payload = parse_filter(payload).unwrap();
        let directives = parse_directives(&[directive.to_string()], Some(&payload)).unwrap();
        render(&apply_edits(&parse_filter(input).unwrap(), &directives))
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(parse_path("").unwrap(), Vec::<usize>::new());
        assert_eq!(parse_path("0-2-1").unwrap(), vec![0, 2, 1]);
        assert!(parse_path("0-x").is_err());
    }

    #[test]
    fn test_parse_directives_errors() {
        let err = parse_directives(&["explode:0".to_string()], None).unwrap_err();
        assert_eq!(err, EditError::UnknownDirective("explode:0".into()));
        let err = parse_directives(&["move-rule:0".to_string()], None).unwrap_err();
        assert!(matches!(err, EditError::MissingPlacement(_)));
        let err = parse_directives(&["move-rule:0".to_string(), "beside:1".to_string()], None).unwrap_err();
        assert_eq!(err, EditError::UnknownPlacement("beside".into()));
        let err = parse_directives(&["chain-operator:0:xor".to_string()], None).unwrap_err();
        assert_eq!(err, EditError::UnknownOperator("xor".into()));
    }

    #[test]
    fn test_drop_rule() {
        assert_eq!(edit("a=1&b=2&c=3", &["drop-rule:1"]), "a=1&c=3");
        assert_eq!(edit("a=1&(b=2|c=3)", &["drop-rule:1-0"]), "a=1&c=3");
        assert_eq!(edit("a=1&b=2", &["drop-rule:"]), "");
    }

    #[test]
    fn test_drop_last_child_prunes_chain() {
        let rule = parse_filter("a=1&!(b=2)").unwrap();
        let next = apply_edit(&rule, &EditDirective::Drop(vec![1, 0]));
        assert_eq!(next, Rule::all(vec![Rule::equal("a", "1")]));
    }

    #[test]
    fn test_missing_path_is_noop() {
        let rule = parse_filter("a=1&b=2").unwrap();
        assert_eq!(apply_edit(&rule, &EditDirective::Drop(vec![7])), rule);
        assert_eq!(apply_edit(&rule, &EditDirective::Drop(vec![0, 0])), rule);
        assert_eq!(edit("a=1&b=2", &["move-rule:0", "after:9"]), "a=1&b=2");
    }

    #[test]
    fn test_condition_before_and_after() {
        assert_eq!(edit_with("a=1&b=2", "condition-before:1", "x=9"), "a=1&x=9&b=2");
        assert_eq!(edit_with("a=1&b=2", "condition-after:1", "x=9"), "a=1&b=2&x=9");
        assert_eq!(edit_with("a=1", "condition-after:", "x=9"), "a=1&x=9");
    }

    #[test]
    fn test_placeholder_condition() {
        let rule = parse_filter("a=1&b=2").unwrap();
        let directives = parse_directives(&["condition-after:0".to_string()], None).unwrap();
        let next = apply_edits(&rule, &directives);
        assert_eq!(next.get(&[1]), Some(&placeholder_condition()));
        assert_eq!(render(&next), "a=1&column=&b=2");
        assert_eq!(parse_filter(&render(&next)).unwrap(), next);
    }

    #[test]
    fn test_chain_after() {
        assert_eq!(edit_with("a=1&b=2", "chain-after:0", "x=9|y=8"), "a=1&(x=9|y=8)&b=2");
        let rule = parse_filter("a=1&b=2").unwrap();
        let payload = parse_filter("x=9").unwrap();
        let directives = parse_directives(&["chain-before:0".to_string()], Some(&payload)).unwrap();
        let next = apply_edits(&rule, &directives);
        assert_eq!(next.get(&[0]), Some(&Rule::all(vec![Rule::equal("x", "9")])));
    }

    #[test]
    fn test_move_rule_within_chain() {
        assert_eq!(edit("a=1&b=2&c=3", &["move-rule:0", "after:2"]), "b=2&c=3&a=1");
        assert_eq!(edit("a=1&b=2&c=3", &["move-rule:2+before:0"]), "c=3&a=1&b=2");
    }

    #[test]
    fn test_move_rule_between_chains() {
        assert_eq!(edit("a=1&(b=2|c=3)", &["move-rule:0", "into:1"]), "b=2|c=3|a=1");
        assert_eq!(edit("a=1&(b=2|c=3)&d=4", &["move-rule:2", "before:1-1"]), "a=1&(b=2|d=4|c=3)");
    }

    #[test]
    fn test_move_into_own_subtree_is_noop() {
        let rule = parse_filter("a=1&(b=2|c=3)").unwrap();
        let directive = EditDirective::Move { from: vec![1], placement: Placement::Into, to: vec![1] };
        assert_eq!(apply_edit(&rule, &directive), rule);
    }

    #[test]
    fn test_negate_rule() {
        assert_eq!(edit("a=1&b=2", &["negate-rule:1"]), "a=1&!b=2");
        assert_eq!(edit("a=1&!b=2", &["negate-rule:1"]), "a=1&b=2");
        assert_eq!(edit("a=1&active", &["negate-rule:1"]), "a=1&!active");
        assert_eq!(edit("a=1|b=2", &["negate-rule:"]), "!(a=1|b=2)");
    }

    #[test]
    fn test_chain_operator() {
        assert_eq!(edit("a=1&b=2", &["chain-operator::or"]), "a=1|b=2");
        assert_eq!(edit("a=1&(b=2|c=3)", &["chain-operator:1:and"]), "a=1&(b=2&c=3)");
        assert_eq!(edit("a=1&b=2", &["chain-operator:0:or"]), "a=1&b=2");
    }

    #[test]
    fn test_edit_leaves_original_untouched() {
        let rule = parse_filter("a=1&b=2").unwrap();
        let before = rule.clone();
        let _ = apply_edit(&rule, &EditDirective::Drop(vec![0]));
        assert_eq!(rule, before);
    }

    #[test]
    fn test_directive_display() {
        let args = vec!["move-rule:0-1".to_string(), "after:2".to_string()];
        let directives = parse_directives(&args, None).unwrap();
        assert_eq!(directives[0].to_string(), "move-rule:0-1 after:2");
    }
}
