//! Filter parser for query strings
//!
//! Recursive-descent parser turning a query string into a [`Rule`] tree.
//!
//! # Grammar
//!
//! ```text
//! chain     := orTerm
//! orTerm    := andTerm ( '|' andTerm )*
//! andTerm   := unary ( '&' unary )*
//! unary     := '!' unary | group | condition
//! group     := '(' chain ')'
//! condition := column [ operator value ]
//! operator  := '!=' | '=' | '>=' | '<=' | '>' | '<'
//! value     := run | '(' run ( '|' run )* ')'
//! ```
//!
//! # Precedence
//!
//! 1. `!` (highest, binds its immediate operand)
//! 2. `&`
//! 3. `|` (lowest)
//!
//! # Recovery
//!
//! The editor re-parses half-typed input on every change, so almost every
//! malformation is corrected instead of rejected:
//!
//! - runs of logical operators collapse to the first one (`a=b&&c=d`)
//! - groups still open at end of input are closed
//! - dangling operators and negations at end of input are dropped
//! - chains left with a single child are replaced by that child
//!
//! There are two hard errors: two operands without a logical operator
//! between them, e.g. `(a=b|c=d)e=f`, and groups or negations nested more
//! than [`MAX_NESTING`] deep.
//!
//! # Examples
//!
//! ```
//! use filterq::filter::{parse_filter, render};
//!
//! let rule = parse_filter("foo=bar|bar=foo&foo=bar").unwrap();
//! assert_eq!(render(&rule), "foo=bar|(bar=foo&foo=bar)");
//! ```

use crate::filter::messages::{DefaultMessages, Messages};
use crate::filter::rule::{Chain, ComparisonOp, Condition, ConditionMeta, LogicalOp, Rule, Value};
use crate::filter::scanner::{Scanner, DELIMITERS};
use log::{debug, trace};
use thiserror::Error;

/// Groups and negations nested deeper than this are rejected
pub const MAX_NESTING: usize = 64;

/// Input the parser could not recover from
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid filter \"{filter}\", unexpected {character} at pos {position}: {message}")]
pub struct ParseError {
    /// The complete input that failed to parse
    pub filter: String,
    /// The offending character
    pub character: char,
    /// Cursor position right after the offending character was read
    pub position: usize,
    pub message: String,
}

impl ParseError {
    /// Offset of the offending character itself
    pub fn offset(&self) -> usize {
        self.position - self.character.len_utf8()
    }
}

/// Parse a query string into a rule tree
///
/// Empty (or whitespace-only) input yields [`Rule::empty`].
pub fn parse_filter(input: &str) -> Result<Rule, ParseError> {
    Parser::new(input).parse()
}

/// Parse a query string, falling back to the longest valid prefix on error
///
/// Returns the tree for the part that parsed and the error, if any.
pub fn parse_lenient(input: &str) -> (Rule, Option<ParseError>) {
    match parse_filter(input) {
        Ok(rule) => (rule, None),
        Err(err) => {
            let prefix = &input[..err.offset()];
            let rule = parse_filter(prefix).unwrap_or_else(|_| Rule::empty());
            (rule, Some(err))
        }
    }
}

pub struct Parser<'a> {
    scanner: Scanner<'a>,
    messages: &'a dyn Messages,
    /// Open groups and negations around the current position
    nesting: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_messages(input, &DefaultMessages)
    }

    pub fn with_messages(input: &'a str, messages: &'a dyn Messages) -> Self {
        Self {
            scanner: Scanner::new(input),
            messages,
            nesting: 0,
        }
    }

    pub fn parse(mut self) -> Result<Rule, ParseError> {
        trace!("parsing filter {:?}", self.scanner.input());
        let rule = self.parse_or(0)?;
        Ok(rule.unwrap_or_else(Rule::empty))
    }

    fn parse_or(&mut self, depth: usize) -> Result<Option<Rule>, ParseError> {
        let mut terms = Vec::new();
        loop {
            self.skip_operator_run(depth);
            if self.at_group_end() {
                break;
            }
            if let Some(term) = self.parse_and(depth)? {
                terms.push(term);
            }

            self.skip_trailing(depth);
            match self.scanner.peek() {
                None | Some(')') => break,
                Some('|') => {
                    self.scanner.advance();
                }
                Some(ch) => return Err(self.unexpected(ch)),
            }
        }
        Ok(combine(LogicalOp::Any, terms))
    }

    fn parse_and(&mut self, depth: usize) -> Result<Option<Rule>, ParseError> {
        let mut operands = Vec::new();
        loop {
            self.skip_operator_run(depth);
            if self.at_group_end() {
                break;
            }
            if let Some(operand) = self.parse_unary(depth)? {
                operands.push(operand);
            }

            self.skip_trailing(depth);
            if !self.scanner.eat('&') {
                break;
            }
        }
        Ok(combine(LogicalOp::All, operands))
    }

    fn parse_unary(&mut self, depth: usize) -> Result<Option<Rule>, ParseError> {
        self.scanner.skip_whitespace();
        match self.scanner.peek() {
            None | Some(')') => Ok(None),
            Some(ch @ ('!' | '(')) if self.nesting >= MAX_NESTING => {
                let message = self.messages.nesting_too_deep(MAX_NESTING);
                Err(self.error_at(ch, message))
            }
            Some('!') => {
                self.scanner.advance();
                self.nesting += 1;
                let operand = self.parse_unary(depth);
                self.nesting -= 1;
                let operand = operand?;
                if operand.is_none() {
                    debug!("dropping dangling negation at pos {}", self.scanner.position());
                }
                Ok(operand.map(Rule::negate))
            }
            Some('(') => {
                self.nesting += 1;
                let group = self.parse_group(depth);
                self.nesting -= 1;
                group
            }
            Some(_) => Ok(self.parse_condition().map(Rule::Condition)),
        }
    }

    fn parse_group(&mut self, depth: usize) -> Result<Option<Rule>, ParseError> {
        self.scanner.advance();
        let inner = self.parse_or(depth + 1)?;
        self.scanner.skip_whitespace();
        if !self.scanner.eat(')') {
            debug!("closing group left open at end of input");
        }
        Ok(inner)
    }

    fn parse_condition(&mut self) -> Option<Condition> {
        let column = self.scanner.read_run(DELIMITERS);
        let operator_offset = self.scanner.position();
        let Some(op) = self.read_comparison_op() else {
            if column.is_empty() {
                return None;
            }
            return Some(Condition {
                column: column.decoded(),
                op: ComparisonOp::Eq,
                value: Value::Bool(true),
                meta: ConditionMeta {
                    column_offset: Some(column.offset),
                    ..ConditionMeta::default()
                },
            });
        };

        let (value, value_offset) = self.read_value();
        if column.is_empty() {
            debug!("dropping condition without column at pos {}", column.offset);
            return None;
        }

        Some(Condition {
            column: column.decoded(),
            op,
            value,
            meta: ConditionMeta {
                column_offset: Some(column.offset),
                operator_offset: Some(operator_offset),
                value_offset,
                label: None,
            },
        })
    }

    fn read_comparison_op(&mut self) -> Option<ComparisonOp> {
        let op = match self.scanner.peek()? {
            '=' => ComparisonOp::Eq,
            '!' if self.scanner.peek_second() == Some('=') => {
                self.scanner.advance();
                ComparisonOp::Neq
            }
            '>' => {
                self.scanner.advance();
                return Some(if self.scanner.eat('=') { ComparisonOp::Gte } else { ComparisonOp::Gt });
            }
            '<' => {
                self.scanner.advance();
                return Some(if self.scanner.eat('=') { ComparisonOp::Lte } else { ComparisonOp::Lt });
            }
            _ => return None,
        };
        self.scanner.advance();
        Some(op)
    }

    fn read_value(&mut self) -> (Value, Option<usize>) {
        self.scanner.skip_whitespace();
        if self.scanner.peek() == Some('(') {
            let offset = self.scanner.position();
            self.scanner.advance();
            let mut items = Vec::new();
            loop {
                items.push(self.scanner.read_run(DELIMITERS).decoded());
                match self.scanner.peek() {
                    Some('|') => {
                        self.scanner.advance();
                    }
                    Some(')') => {
                        self.scanner.advance();
                        break;
                    }
                    // End of input or a stray delimiter ends the array early
                    _ => break,
                }
            }
            return (Value::List(items), Some(offset));
        }

        let run = self.scanner.read_run(DELIMITERS);
        if run.is_empty() {
            (Value::Scalar(String::new()), None)
        } else {
            (Value::Scalar(run.decoded()), Some(run.offset))
        }
    }

    /// Skip logical operators that have no operand before them. At the top
    /// level an unmatched `)` is skipped as well.
    fn skip_operator_run(&mut self, depth: usize) {
        loop {
            self.scanner.skip_whitespace();
            match self.scanner.peek() {
                Some('&') | Some('|') => {
                    trace!("skipping redundant operator at pos {}", self.scanner.position());
                    self.scanner.advance();
                }
                Some(')') if depth == 0 => {
                    debug!("skipping unmatched ')' at pos {}", self.scanner.position());
                    self.scanner.advance();
                }
                _ => break,
            }
        }
    }

    fn skip_trailing(&mut self, depth: usize) {
        loop {
            self.scanner.skip_whitespace();
            if depth == 0 && self.scanner.peek() == Some(')') {
                debug!("skipping unmatched ')' at pos {}", self.scanner.position());
                self.scanner.advance();
            } else {
                break;
            }
        }
    }

    fn at_group_end(&self) -> bool {
        matches!(self.scanner.peek(), None | Some(')'))
    }

    fn unexpected(&mut self, character: char) -> ParseError {
        let message = self.messages.expected_logical_operator();
        self.error_at(character, message)
    }

    fn error_at(&mut self, character: char, message: String) -> ParseError {
        self.scanner.advance();
        ParseError {
            filter: self.scanner.input().to_string(),
            character,
            position: self.scanner.position(),
            message,
        }
    }
}

fn combine(op: LogicalOp, mut items: Vec<Rule>) -> Option<Rule> {
    match items.len() {
        0 => None,
        1 => items.pop(),
        _ => Some(Rule::Chain(Chain::new(op, items))),
    }
}
