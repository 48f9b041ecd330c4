use crate::filter::rule::{format_path, RulePath};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a term in the editor's linear view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Column,
    Operator,
    Value,
    /// `&`, `|`, and the negation `!`
    LogicalOperator,
    GroupingOperatorOpen,
    GroupingOperatorClose,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Column => "column",
            TokenKind::Operator => "operator",
            TokenKind::Value => "value",
            TokenKind::LogicalOperator => "logical_operator",
            TokenKind::GroupingOperatorOpen => "grouping_operator_open",
            TokenKind::GroupingOperatorClose => "grouping_operator_close",
        }
    }

    /// Column and value terms hold arbitrary text; everything else is a fixed symbol
    pub fn is_free_text(&self) -> bool {
        matches!(self, TokenKind::Column | TokenKind::Value)
    }

    pub fn is_grouping(&self) -> bool {
        matches!(self, TokenKind::GroupingOperatorOpen | TokenKind::GroupingOperatorClose)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which part of a condition a token spells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionPart {
    Column,
    Operator,
    Value,
}

/// Position in the rule tree a token was projected from. Identifies a node,
/// never owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPath {
    pub rule: RulePath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<ConditionPart>,
}

impl fmt::Display for TermPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = format_path(&self.rule);
        let path = if path.is_empty() { "root" } else { path.as_str() };
        match self.part {
            Some(ConditionPart::Column) => write!(f, "{}:column", path),
            Some(ConditionPart::Operator) => write!(f, "{}:operator", path),
            Some(ConditionPart::Value) => write!(f, "{}:value", path),
            None => f.write_str(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Encoded text as it appears in the query string
    pub raw: String,
    pub label: String,
    /// Tree position; absent for terms that belong to no parsed node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<TermPath>,
    /// Offset in the parsed source where this term began
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_offset: Option<usize>,
    /// Index of the matching grouping token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterpart: Option<usize>,
}

impl Token {
    pub fn new(kind: TokenKind, raw: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
            label: label.into(),
            path: None,
            source_offset: None,
            counterpart: None,
        }
    }

    /// Fixed-symbol token whose label is its raw text
    pub fn symbol(kind: TokenKind, symbol: &str) -> Self {
        Self::new(kind, symbol, symbol)
    }
}
