//! Which term the editor expects next
//!
//! The expectation cycles `column -> operator -> value -> logical_operator`.
//! It is derived from the last committed term and the number of groups left
//! open, never stored separately, so it cannot drift from the sequence.

use crate::filter::rule::ComparisonOp;
use crate::terms::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Column,
    Operator,
    Value,
    LogicalOperator,
}

impl Expect {
    /// Expectation after the given committed terms
    pub fn after(terms: &[Token]) -> Self {
        match terms.last().map(|token| token.kind) {
            None | Some(TokenKind::LogicalOperator) | Some(TokenKind::GroupingOperatorOpen) => Expect::Column,
            Some(TokenKind::Column) => Expect::Operator,
            Some(TokenKind::Operator) => Expect::Value,
            Some(TokenKind::Value) | Some(TokenKind::GroupingOperatorClose) => Expect::LogicalOperator,
        }
    }

    /// Kind of a free-text term typed in this state
    pub fn free_text_kind(&self) -> Option<TokenKind> {
        match self {
            Expect::Column => Some(TokenKind::Column),
            Expect::Value => Some(TokenKind::Value),
            Expect::Operator | Expect::LogicalOperator => None,
        }
    }

    /// Kind reported to the suggestion source
    pub fn term_kind(&self) -> TokenKind {
        match self {
            Expect::Column => TokenKind::Column,
            Expect::Operator => TokenKind::Operator,
            Expect::Value => TokenKind::Value,
            Expect::LogicalOperator => TokenKind::LogicalOperator,
        }
    }

    /// Fixed symbols legal in this state, with the term kind each commits as
    ///
    /// A column may stand alone as a boolean test, so the operator state also
    /// accepts logical operators; an operator may be followed by an empty
    /// value, so the value state does too.
    pub fn symbols(&self, open_groups: usize) -> Vec<(&'static str, TokenKind)> {
        let mut symbols = Vec::new();
        match self {
            Expect::Column => {
                symbols.push(("(", TokenKind::GroupingOperatorOpen));
                symbols.push(("!", TokenKind::LogicalOperator));
                return symbols;
            }
            Expect::Operator => {
                symbols.extend(ComparisonOp::ALL.iter().map(|op| (op.symbol(), TokenKind::Operator)));
            }
            Expect::Value | Expect::LogicalOperator => {}
        }
        symbols.push(("&", TokenKind::LogicalOperator));
        symbols.push(("|", TokenKind::LogicalOperator));
        if open_groups > 0 {
            symbols.push((")", TokenKind::GroupingOperatorClose));
        }
        symbols
    }
}

/// Groups opened and not yet closed in `terms`
pub fn open_groups(terms: &[Token]) -> usize {
    terms.iter().fold(0, |depth, token| match token.kind {
        TokenKind::GroupingOperatorOpen => depth + 1,
        TokenKind::GroupingOperatorClose => depth.saturating_sub(1),
        _ => depth,
    })
}

/// Outcome of matching typed text against fixed symbols
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolMatch {
    /// Exactly one candidate, and the text spells it
    Exact(&'static str, TokenKind),
    /// Text is a prefix of one or more candidates
    Partial,
    None,
}

pub fn match_symbol(text: &str, symbols: &[(&'static str, TokenKind)]) -> SymbolMatch {
    let mut candidates = symbols.iter().filter(|(symbol, _)| symbol.starts_with(text));
    match (candidates.next(), candidates.next()) {
        (Some(&(symbol, kind)), None) if symbol == text => SymbolMatch::Exact(symbol, kind),
        (Some(_), _) => SymbolMatch::Partial,
        (None, _) => SymbolMatch::None,
    }
}

/// Find the symbol spelled exactly by `text`, ambiguous or not
pub fn exact_symbol(text: &str, symbols: &[(&'static str, TokenKind)]) -> Option<(&'static str, TokenKind)> {
    symbols.iter().find(|(symbol, _)| *symbol == text).copied()
}
