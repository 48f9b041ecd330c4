//! Linear term view of a rule tree
//!
//! A [`TermIndex`] lists the tokens of a tree's canonical form in order. It
//! is projected from the same fragment walk the renderer uses, so the raw
//! text of all tokens concatenates to exactly `render(rule)`.
//!
//! The index can also be edited token by token. Every mutation goes through
//! [`TermIndex::splice`], which patches grouping counterparts in place,
//! re-derives tree paths and source offsets from the edited text, and reports
//! a single [`Change`] no matter how many tokens it touched. An edited index
//! is equal to [`TermIndex::from_tokens`] over the same tokens, and for
//! canonical text to [`TermIndex::build`] over its parsed tree.

use crate::filter::renderer::{fragments, Fragment};
use crate::filter::rule::{Rule, RulePath, Value};
use crate::filter::{parse_filter, parse_lenient, ParseError};
use crate::terms::token::{ConditionPart, TermPath, Token, TokenKind};
use serde::Serialize;
use std::ops::Range;

/// One coalesced change to a token sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Change {
    pub start: usize,
    pub removed: usize,
    pub inserted: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TermIndex {
    tokens: Vec<Token>,
}

impl TermIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project a tree into its tokens
    pub fn build(rule: &Rule) -> Self {
        let mut tokens: Vec<Token> = fragments(rule)
            .into_iter()
            .map(|(path, fragment)| project(path, fragment))
            .collect();
        link_counterparts(&mut tokens);
        Self { tokens }
    }

    /// Parse a query string and project the result
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        Ok(Self::build(&parse_filter(input)?))
    }

    /// Wrap existing tokens, recomputing counterparts, paths and offsets
    /// from scratch
    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        link_counterparts(&mut tokens);
        let mut index = Self { tokens };
        index.reindex();
        index
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn last(&self) -> Option<&Token> {
        self.tokens.last()
    }

    /// Query string spelled by the tokens
    pub fn raw(&self) -> String {
        self.tokens.iter().map(|token| token.raw.as_str()).collect()
    }

    /// Tree node the token at `index` came from
    pub fn rule_path_at(&self, index: usize) -> Option<&RulePath> {
        self.tokens.get(index)?.path.as_ref().map(|path| &path.rule)
    }

    /// Parse the tokens back into a tree
    pub fn to_rule(&self) -> Result<Rule, ParseError> {
        parse_filter(&self.raw())
    }

    /// Number of open groups without a closing counterpart
    pub fn open_groups(&self) -> usize {
        self.tokens
            .iter()
            .filter(|token| token.kind == TokenKind::GroupingOperatorOpen && token.counterpart.is_none())
            .count()
    }

    /// Replace the tokens in `range` with `replacement`
    ///
    /// Out-of-bounds ranges are clamped to the sequence.
    pub fn splice(&mut self, range: Range<usize>, replacement: Vec<Token>) -> (Vec<Token>, Change) {
        let end = range.end.min(self.tokens.len());
        let start = range.start.min(end);
        let inserted = replacement.len();

        let relink = replacement.iter().any(|token| token.kind.is_grouping())
            || self.tokens[start..end].iter().any(|token| token.kind.is_grouping());

        let removed: Vec<Token> = self.tokens.splice(start..end, replacement).collect();

        if relink {
            link_counterparts(&mut self.tokens);
        } else if inserted != removed.len() {
            // Only grouping tokens are ever counterparts, and none moved
            // within the spliced range, so everything after it shifts uniformly
            for token in self.tokens.iter_mut() {
                if let Some(counterpart) = token.counterpart.as_mut() {
                    if *counterpart >= end {
                        *counterpart = *counterpart + inserted - removed.len();
                    }
                }
            }
        }

        self.reindex();
        let change = Change { start, removed: removed.len(), inserted };
        (removed, change)
    }

    /// Re-derive tree paths and source offsets from the tokens' own text
    ///
    /// The tokens are matched in order against the projection of the tree
    /// their text parses to. Empty projected values (`a=` followed by an
    /// operator) may be skipped. From the first token that does not match on,
    /// which happens for half-typed or non-canonical input, tokens belong to
    /// no node and carry neither path nor offset. Labels are left alone.
    pub fn reindex(&mut self) {
        let (rule, _) = parse_lenient(&self.raw());
        let mut projected = Self::build(&rule).tokens.into_iter();
        let mut aligned = true;

        for token in self.tokens.iter_mut() {
            let same = |candidate: &Token| candidate.kind == token.kind && candidate.raw == token.raw;
            let source = if aligned {
                projected
                    .find(|candidate| !candidate.raw.is_empty() || same(candidate))
                    .filter(same)
            } else {
                None
            };
            aligned = source.is_some();

            match source {
                Some(candidate) => {
                    token.path = candidate.path;
                    token.source_offset = candidate.source_offset;
                }
                None => {
                    token.path = None;
                    token.source_offset = None;
                }
            }
        }
    }

    pub fn insert(&mut self, index: usize, token: Token) -> Change {
        self.splice(index..index, vec![token]).1
    }

    pub fn push(&mut self, token: Token) -> Change {
        self.insert(self.tokens.len(), token)
    }

    pub fn remove(&mut self, index: usize) -> Option<(Token, Change)> {
        if index >= self.tokens.len() {
            return None;
        }
        let (mut removed, change) = self.splice(index..index + 1, Vec::new());
        removed.pop().map(|token| (token, change))
    }

    pub fn pop(&mut self) -> Option<Token> {
        let last = self.tokens.len().checked_sub(1)?;
        self.remove(last).map(|(token, _)| token)
    }

    /// Remove a contiguous selection as one change
    pub fn remove_range(&mut self, range: Range<usize>) -> (Vec<Token>, Change) {
        self.splice(range, Vec::new())
    }
}

fn project(path: RulePath, fragment: Fragment<'_>) -> Token {
    let raw = fragment.raw().into_owned();
    let (kind, part, source_offset, label) = match fragment {
        Fragment::Column(condition) => (
            TokenKind::Column,
            Some(ConditionPart::Column),
            condition.meta.column_offset,
            condition.display_column().to_string(),
        ),
        Fragment::Operator(condition) => (
            TokenKind::Operator,
            Some(ConditionPart::Operator),
            condition.meta.operator_offset,
            raw.clone(),
        ),
        Fragment::Value(condition) => (
            TokenKind::Value,
            Some(ConditionPart::Value),
            condition.meta.value_offset,
            value_label(&condition.value),
        ),
        Fragment::Negation | Fragment::LogicalOperator { .. } => (TokenKind::LogicalOperator, None, None, raw.clone()),
        Fragment::GroupOpen => (TokenKind::GroupingOperatorOpen, None, None, raw.clone()),
        Fragment::GroupClose => (TokenKind::GroupingOperatorClose, None, None, raw.clone()),
    };

    Token {
        kind,
        raw,
        label,
        path: Some(TermPath { rule: path, part }),
        source_offset,
        counterpart: None,
    }
}

fn value_label(value: &Value) -> String {
    match value {
        Value::Bool(_) => String::new(),
        Value::Scalar(text) => text.clone(),
        Value::List(items) => format!("({})", items.join("|")),
    }
}

/// Pair every open group with its close; unmatched ones get no counterpart
pub fn link_counterparts(tokens: &mut [Token]) {
    let mut open = Vec::new();
    for index in 0..tokens.len() {
        tokens[index].counterpart = None;
        match tokens[index].kind {
            TokenKind::GroupingOperatorOpen => open.push(index),
            TokenKind::GroupingOperatorClose => {
                if let Some(start) = open.pop() {
                    tokens[start].counterpart = Some(index);
                    tokens[index].counterpart = Some(start);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::render;

    fn kinds(index: &TermIndex) -> Vec<TokenKind> {
        index.tokens().iter().map(|token| token.kind).collect()
    }

    fn relinked(index: &TermIndex) -> TermIndex {
        TermIndex::from_tokens(index.tokens().to_vec())
    }

    #[test]
    fn test_tokens_concatenate_to_rendered_form() {
        for input in [
            "a=b",
            "a=b&c=d|e=|g",
            "!((foo=bar|bar=foo))",
            "a=1&!(b=2|c=3)&!active",
            "port=(80|8080)&name=a%20b",
            "((a=1|b=2)&c=3)|d>=4",
            "",
        ] {
            let rule = parse_filter(input).unwrap();
            assert_eq!(TermIndex::build(&rule).raw(), render(&rule), "input {:?}", input);
        }
    }

    #[test]
    fn test_token_kinds() {
        let index = TermIndex::parse("!active|a!=1").unwrap();
        assert_eq!(
            kinds(&index),
            vec![
                TokenKind::LogicalOperator,
                TokenKind::Column,
                TokenKind::LogicalOperator,
                TokenKind::Column,
                TokenKind::Operator,
                TokenKind::Value,
            ]
        );
    }

    #[test]
    fn test_source_offsets_follow_condition_metadata() {
        let index = TermIndex::parse("a=b&c=d|e=|g").unwrap();
        let offsets: Vec<usize> = index.tokens().iter().filter_map(|t| t.source_offset).collect();
        assert_eq!(offsets, vec![0, 1, 2, 4, 5, 6, 8, 9, 11]);
    }

    #[test]
    fn test_counterparts() {
        let index = TermIndex::parse("a=1&(b=2|c=3)").unwrap();
        assert_eq!(index.get(4).unwrap().counterpart, Some(12));
        assert_eq!(index.get(12).unwrap().counterpart, Some(4));
        assert_eq!(index.get(5).unwrap().counterpart, None);
        assert_eq!(index.open_groups(), 0);
    }

    #[test]
    fn test_paths_and_labels() {
        let rule = Rule::all(vec![
            Rule::Condition(crate::filter::Condition::new("host_name", crate::filter::ComparisonOp::Eq, "web").with_label("Host")),
            Rule::any(vec![Rule::equal("b", "2"), Rule::equal("c", vec!["x", "y"])]),
        ]);
        let index = TermIndex::build(&rule);
        assert_eq!(index.get(0).unwrap().label, "Host");
        assert_eq!(index.get(0).unwrap().raw, "host_name");
        assert_eq!(index.rule_path_at(0), Some(&vec![0]));
        assert_eq!(index.rule_path_at(3), Some(&vec![]));
        assert_eq!(index.rule_path_at(5), Some(&vec![1, 0]));
        assert_eq!(index.get(11).unwrap().label, "(x|y)");
        assert_eq!(index.get(5).unwrap().path.as_ref().unwrap().to_string(), "1-0:column");
        assert_eq!(index.to_rule().unwrap(), rule);
    }

    #[test]
    fn test_insert_shifts_counterparts() {
        let mut index = TermIndex::parse("a=1&(b=2|c=3)").unwrap();
        let change = index.insert(5, Token::symbol(TokenKind::LogicalOperator, "!"));
        assert_eq!(change, Change { start: 5, removed: 0, inserted: 1 });
        assert_eq!(index.get(4).unwrap().counterpart, Some(13));
        assert_eq!(index.get(13).unwrap().counterpart, Some(4));
        assert_eq!(index, relinked(&index));
        assert_eq!(index.raw(), "a=1&(!b=2|c=3)");
    }

    #[test]
    fn test_remove_shifts_counterparts() {
        let mut index = TermIndex::parse("(a=1|b=2)&(c=3|d=4)").unwrap();
        let (token, change) = index.remove(0).unwrap();
        assert_eq!(token.kind, TokenKind::GroupingOperatorOpen);
        assert_eq!(change, Change { start: 0, removed: 1, inserted: 0 });
        assert_eq!(index.get(8).unwrap().counterpart, None);
        assert_eq!(index.get(9).unwrap().counterpart, Some(17));
        assert_eq!(index, relinked(&index));
        assert!(index.remove(99).is_none());
    }

    #[test]
    fn test_remove_range_is_one_change() {
        let mut index = TermIndex::parse("a=1&(b=2|c=3)&d=4").unwrap();
        let (removed, change) = index.remove_range(3..13);
        assert_eq!(removed.len(), 10);
        assert_eq!(change, Change { start: 3, removed: 10, inserted: 0 });
        assert_eq!(index.raw(), "a=1&d=4");
    }

    #[test]
    fn test_incremental_edits_match_full_recompute() {
        let mut index = TermIndex::parse("(a=1|b=2)&c=3&(d=4|(e=5&f=6))").unwrap();
        index.remove_range(9..13);
        assert_eq!(index.raw(), "(a=1|b=2)&(d=4|(e=5&f=6))");
        assert_eq!(index, TermIndex::build(&index.to_rule().unwrap()));
        assert_eq!(index.rule_path_at(11), Some(&vec![1, 0]));
        assert_eq!(index.rule_path_at(16), Some(&vec![1, 1, 0]));

        // Half-typed text has no tree to compare against
        index.insert(3, Token::new(TokenKind::Value, "9", "9"));
        assert_eq!(index, relinked(&index));
        index.insert(0, Token::symbol(TokenKind::GroupingOperatorOpen, "("));
        assert_eq!(index, relinked(&index));
        index.splice(2..4, vec![Token::symbol(TokenKind::GroupingOperatorClose, ")")]);
        assert_eq!(index, relinked(&index));
        index.pop();
        assert_eq!(index, relinked(&index));
    }

    #[test]
    fn test_removing_a_sibling_collapses_paths() {
        let mut index = TermIndex::parse("a=1&b=2").unwrap();
        assert_eq!(index.rule_path_at(4), Some(&vec![1]));
        index.remove_range(0..4);
        assert_eq!(index.raw(), "b=2");
        assert_eq!(index.rule_path_at(0), Some(&vec![]));
        assert_eq!(index.get(0).unwrap().source_offset, Some(0));
        assert_eq!(index, TermIndex::build(&index.to_rule().unwrap()));
    }

    #[test]
    fn test_typed_tokens_gain_paths() {
        let mut index = TermIndex::new();
        for (kind, raw) in [
            (TokenKind::Column, "a"),
            (TokenKind::Operator, "="),
            (TokenKind::Value, "1"),
            (TokenKind::LogicalOperator, "&"),
            (TokenKind::Column, "b"),
        ] {
            index.push(Token::new(kind, raw, raw));
        }
        assert_eq!(index.rule_path_at(0), Some(&vec![0]));
        assert_eq!(index.get(4).unwrap().source_offset, Some(4));

        index.push(Token::symbol(TokenKind::Operator, "="));
        index.push(Token::new(TokenKind::Value, "2", "2"));
        assert_eq!(index, TermIndex::build(&index.to_rule().unwrap()));
    }
}
