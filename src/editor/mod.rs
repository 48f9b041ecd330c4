//! Interactive term editor
//!
//! Builds a filter one term at a time from keystrokes. The editor keeps the
//! committed terms, the fragment still being typed and a suggestion session.
//! It never blocks typing: input that cannot be a legal next term only raises
//! a recoverable syntax error, which blocks [`Editor::submit`] until fixed.
//!
//! Fixed symbols (operators, `&`, `|`, `!`, parentheses) are committed as
//! soon as the typed text spells exactly one of them. Column and value text
//! is committed on [`Editor::commit`] or when a structural character follows
//! it.
//!
//! Time is passed in explicitly (`now`) so callers drive the debounce clock.
//!
//! ```
//! use filterq::editor::Editor;
//! use std::time::Instant;
//!
//! let mut editor = Editor::new();
//! editor.type_str("host=web&", Instant::now());
//! assert_eq!(editor.query(), "host=web&");
//! ```

pub mod state;
pub mod suggest;

pub use state::Expect;
pub use suggest::{
    CancellationToken, LocalSuggestions, SessionState, Suggestion, SuggestionRequest, SuggestionResponse,
    SuggestionSession, SuggestionSource, SuggestionTerm, TransportError,
};

use crate::filter::messages::{DefaultMessages, Messages};
use crate::filter::rule::Rule;
use crate::filter::scanner::DELIMITERS;
use crate::filter::{parse_filter, parse_lenient, render, ParseError, Parser};
use crate::terms::{Change, TermIndex, Token, TokenKind};
use crate::utils::encoding::{decode, encode};
use log::debug;
use state::{exact_symbol, match_symbol, open_groups, SymbolMatch};
use std::ops::Range;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Syntax error flag set, or a pending fragment that is not a legal term
    #[error("{message}")]
    Invalid { message: String },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub struct Editor {
    terms: TermIndex,
    fragment: String,
    syntax_error: Option<String>,
    session: SuggestionSession,
    suggestions: Vec<Suggestion>,
    default_suggestion: Option<Suggestion>,
    notice: Option<String>,
    changes: Vec<Change>,
    messages: Box<dyn Messages>,
    /// Groups left open by the committed terms
    open_groups: usize,
    /// First invalid committed term, refreshed when the terms change
    terms_error: Option<String>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self {
            terms: TermIndex::new(),
            fragment: String::new(),
            syntax_error: None,
            session: SuggestionSession::new(DEFAULT_DEBOUNCE),
            suggestions: Vec::new(),
            default_suggestion: None,
            notice: None,
            changes: Vec::new(),
            messages: Box::new(DefaultMessages),
            open_groups: 0,
            terms_error: None,
        }
    }

    /// Seed the editor with the terms of an existing tree
    pub fn from_rule(rule: &Rule) -> Self {
        let mut editor = Self::new();
        editor.terms = TermIndex::build(rule);
        // Offsets point into the canonical query, not the tree's source
        editor.terms.reindex();
        editor.terms_changed();
        editor.refresh_validity();
        editor
    }

    pub fn from_query(query: &str) -> Result<Self, ParseError> {
        Ok(Self::from_rule(&parse_filter(query)?))
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.session = SuggestionSession::new(debounce);
        self
    }

    pub fn with_messages(mut self, messages: Box<dyn Messages>) -> Self {
        self.messages = messages;
        self.terms_changed();
        self.refresh_validity();
        self
    }

    pub fn terms(&self) -> &TermIndex {
        &self.terms
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn syntax_error(&self) -> Option<&str> {
        self.syntax_error.as_deref()
    }

    pub fn is_valid(&self) -> bool {
        self.syntax_error.is_none()
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn default_suggestion(&self) -> Option<&Suggestion> {
        self.default_suggestion.as_ref()
    }

    /// Message shown in place of suggestions, e.g. after a transport failure
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn session(&self) -> &SuggestionSession {
        &self.session
    }

    /// Drain the change notifications recorded since the last call
    pub fn take_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.changes)
    }

    /// What the next term has to be
    pub fn expect(&self) -> Expect {
        Expect::after(self.terms.tokens())
    }

    /// Transport value: the committed terms as a query string
    pub fn query(&self) -> String {
        self.terms.raw()
    }

    /// Best-effort tree for the committed terms
    pub fn rule(&self) -> (Rule, Option<ParseError>) {
        parse_lenient(&self.query())
    }

    /// Term index of the canonical form, with tree paths
    pub fn reindexed(&self) -> TermIndex {
        TermIndex::build(&self.rule().0)
    }

    pub fn type_str(&mut self, text: &str, now: Instant) {
        for c in text.chars() {
            self.type_char(c, now);
        }
    }

    /// Append one typed character
    pub fn type_char(&mut self, c: char, now: Instant) {
        if self.expect().free_text_kind().is_none() {
            self.type_symbol(c, now);
            return;
        }

        if DELIMITERS.contains(&c) {
            if self.fragment.trim().is_empty() {
                self.fragment.clear();
                self.type_symbol(c, now);
            } else if self.commit_free_text() {
                self.type_char(c, now);
            } else {
                self.fragment.push(c);
                self.refresh_validity();
            }
            return;
        }

        if c.is_whitespace() && self.fragment.is_empty() {
            return;
        }
        self.fragment.push(c);
        self.refresh_validity();
        self.schedule_suggestions(now);
    }

    fn type_symbol(&mut self, c: char, now: Instant) {
        if c.is_whitespace() && self.fragment.is_empty() {
            return;
        }
        let symbols = self.expect().symbols(self.open_groups);
        let mut text = self.fragment.clone();
        text.push(c);

        match match_symbol(&text, &symbols) {
            SymbolMatch::Exact(symbol, kind) => {
                self.fragment.clear();
                self.push_term(Token::symbol(kind, symbol));
            }
            SymbolMatch::Partial => {
                self.fragment = text;
                self.refresh_validity();
                self.schedule_suggestions(now);
            }
            SymbolMatch::None => match exact_symbol(&self.fragment, &symbols) {
                // `>` followed by value text: the shorter symbol was meant
                Some((symbol, kind)) => {
                    self.fragment.clear();
                    self.push_term(Token::symbol(kind, symbol));
                    self.type_char(c, now);
                }
                None => {
                    self.fragment = text;
                    self.session.cancel();
                    self.refresh_validity();
                }
            },
        }
    }

    /// Finalize the pending fragment (separator key, or a completion)
    ///
    /// Returns false and raises the syntax error when the fragment is not a
    /// legal term here.
    pub fn commit(&mut self) -> bool {
        if self.fragment.trim().is_empty() {
            self.fragment.clear();
            self.refresh_validity();
            return true;
        }
        if self.expect().free_text_kind().is_some() {
            return self.commit_free_text();
        }

        let symbols = self.expect().symbols(self.open_groups);
        match exact_symbol(self.fragment.trim(), &symbols) {
            Some((symbol, kind)) => {
                self.fragment.clear();
                self.push_term(Token::symbol(kind, symbol));
                true
            }
            None => {
                self.refresh_validity();
                false
            }
        }
    }

    fn commit_free_text(&mut self) -> bool {
        let Some(kind) = self.expect().free_text_kind() else {
            return false;
        };
        if self.fragment_error().is_some() {
            self.refresh_validity();
            return false;
        }
        let text = self.fragment.trim().to_string();
        let token = Token::new(kind, encode(&text).into_owned(), text);
        self.fragment.clear();
        self.push_term(token);
        true
    }

    /// Accept a suggestion for the pending fragment
    pub fn complete(&mut self, suggestion: &Suggestion) -> bool {
        self.fragment = suggestion.search.clone();
        self.commit()
    }

    /// Delete one character, pulling the last term back into the fragment
    /// when the fragment is already empty
    pub fn backspace(&mut self, now: Instant) {
        if self.fragment.pop().is_none() {
            let Some(last) = self.terms.len().checked_sub(1) else {
                return;
            };
            if let Some((token, change)) = self.terms.remove(last) {
                self.changes.push(change);
                self.terms_changed();
                let mut text = if token.kind.is_free_text() {
                    decode(&token.raw).into_owned()
                } else {
                    token.raw
                };
                text.pop();
                self.fragment = text;
            }
        }

        self.refresh_validity();
        if self.fragment.is_empty() {
            self.session.cancel();
        } else {
            self.schedule_suggestions(now);
        }
    }

    /// Leave the widget: commit what was typed, drop pending suggestions
    pub fn blur(&mut self) {
        self.commit();
        self.session.cancel();
        self.suggestions.clear();
        self.default_suggestion = None;
    }

    pub fn insert(&mut self, index: usize, token: Token) -> Change {
        let change = self.terms.insert(index, token);
        self.record(change)
    }

    pub fn remove(&mut self, index: usize) -> Option<Token> {
        let (token, change) = self.terms.remove(index)?;
        self.record(change);
        Some(token)
    }

    /// Remove a selected range of terms as one change
    pub fn remove_range(&mut self, range: Range<usize>) -> Vec<Token> {
        let (removed, change) = self.terms.remove_range(range);
        self.record(change);
        removed
    }

    /// Replace the term at `index` with typed text, validated against what is
    /// legal at that position
    pub fn replace_term(&mut self, index: usize, text: &str) -> Result<Change, String> {
        let kind = self
            .terms
            .get(index)
            .map(|token| token.kind)
            .ok_or_else(|| self.messages.expected_term("term"))?;
        if let Err(message) = self.validate_term(index, kind, text) {
            self.syntax_error = Some(message.clone());
            return Err(message);
        }
        let token = if kind.is_free_text() {
            Token::new(kind, encode(text.trim()), text.trim())
        } else {
            Token::symbol(kind, text)
        };
        let (_, change) = self.terms.splice(index..index + 1, vec![token]);
        Ok(self.record(change))
    }

    /// Surround the terms in `range` with a group
    pub fn wrap_in_group(&mut self, range: Range<usize>) -> Option<Change> {
        if range.start >= range.end || range.end > self.terms.len() {
            return None;
        }
        let mut replacement = Vec::with_capacity(range.len() + 2);
        replacement.push(Token::symbol(TokenKind::GroupingOperatorOpen, "("));
        replacement.extend_from_slice(&self.terms.tokens()[range.clone()]);
        replacement.push(Token::symbol(TokenKind::GroupingOperatorClose, ")"));

        let (_, change) = self.terms.splice(range, replacement);
        Some(self.record(change))
    }

    /// Toggle the negation in front of the group opened at `open_index`
    pub fn negate_group(&mut self, open_index: usize) -> Option<Change> {
        let token = self.terms.get(open_index)?;
        if token.kind != TokenKind::GroupingOperatorOpen {
            return None;
        }
        let negated = open_index
            .checked_sub(1)
            .and_then(|index| self.terms.get(index))
            .is_some_and(|token| token.kind == TokenKind::LogicalOperator && token.raw == "!");

        let change = if negated {
            self.terms.remove(open_index - 1)?.1
        } else {
            self.terms.insert(open_index, Token::symbol(TokenKind::LogicalOperator, "!"))
        };
        Some(self.record(change))
    }

    /// Check typed text for a term of `kind` at `index`
    pub fn validate_term(&self, index: usize, kind: TokenKind, text: &str) -> Result<(), String> {
        let before = &self.terms.tokens()[..index.min(self.terms.len())];
        self.check_term(Expect::after(before), open_groups(before), kind, text)
    }

    /// First invalid committed term, if any
    ///
    /// One pass: the expectation and group depth are carried along instead
    /// of being recomputed from each prefix.
    pub fn validate(&self) -> Result<(), String> {
        let mut expect = Expect::Column;
        let mut open = 0usize;
        for token in self.terms.tokens() {
            let text = if token.kind.is_free_text() {
                decode(&token.raw).into_owned()
            } else {
                token.raw.clone()
            };
            self.check_term(expect, open, token.kind, &text)?;

            match token.kind {
                TokenKind::GroupingOperatorOpen => open += 1,
                TokenKind::GroupingOperatorClose => open = open.saturating_sub(1),
                _ => {}
            }
            expect = Expect::after(std::slice::from_ref(token));
        }
        Ok(())
    }

    fn check_term(&self, expect: Expect, open: usize, kind: TokenKind, text: &str) -> Result<(), String> {
        if kind.is_free_text() {
            return match expect.free_text_kind() {
                Some(expected) if expected == kind && !(kind == TokenKind::Column && text.trim().is_empty()) => Ok(()),
                Some(expected) => Err(self.messages.expected_term(expected.as_str())),
                None => Err(self.one_of(expect, open)),
            };
        }

        match exact_symbol(text, &expect.symbols(open)) {
            Some((_, found)) if found == kind => Ok(()),
            _ => Err(self.one_of(expect, open)),
        }
    }

    /// Validated canonical query string
    pub fn submit(&mut self) -> Result<String, SubmitError> {
        if !self.commit() {
            let message = self.syntax_error.clone().unwrap_or_default();
            return Err(SubmitError::Invalid { message });
        }
        if let Some(message) = &self.syntax_error {
            return Err(SubmitError::Invalid { message: message.clone() });
        }
        let query = self.query();
        let rule = Parser::with_messages(&query, self.messages.as_ref()).parse()?;
        Ok(render(&rule))
    }

    /// Fire the pending suggestion request if its quiet period is over
    pub fn poll(&mut self, now: Instant) -> Option<(CancellationToken, SuggestionRequest)> {
        self.session.poll(now)
    }

    /// Deliver the outcome of a request. Returns whether it was applied.
    pub fn receive(&mut self, token: &CancellationToken, result: Result<SuggestionResponse, TransportError>) -> bool {
        if !self.session.complete(token) {
            return false;
        }
        match result {
            Ok(response) => {
                self.notice = None;
                self.suggestions = response.items;
                self.default_suggestion = response.default;
            }
            Err(TransportError::Aborted) => {
                debug!("suggestion request {} aborted", token.version());
                return false;
            }
            Err(TransportError::Failed(reason)) => {
                debug!("suggestion request {} failed: {}", token.version(), reason);
                self.suggestions.clear();
                self.default_suggestion = None;
                self.notice = Some(self.messages.no_suggestions());
            }
        }
        true
    }

    /// Poll and answer synchronously from `source`
    pub fn fetch_suggestions(&mut self, source: &dyn SuggestionSource, now: Instant) -> bool {
        match self.poll(now) {
            Some((token, request)) => {
                let result = source.suggest(&request);
                self.receive(&token, result)
            }
            None => false,
        }
    }

    fn push_term(&mut self, token: Token) {
        let change = self.terms.push(token);
        self.record(change);
        self.session.cancel();
        self.suggestions.clear();
        self.default_suggestion = None;
    }

    fn record(&mut self, change: Change) -> Change {
        self.changes.push(change);
        self.terms_changed();
        self.refresh_validity();
        change
    }

    fn schedule_suggestions(&mut self, now: Instant) {
        let request = self.suggestion_request();
        self.session.schedule(request, now);
    }

    /// Request describing the pending fragment in the current state
    pub fn suggestion_request(&self) -> SuggestionRequest {
        let expect = self.expect();
        let search = self.fragment.trim().to_string();
        let column = match expect {
            Expect::Value => self
                .terms
                .tokens()
                .iter()
                .rev()
                .find(|token| token.kind == TokenKind::Column)
                .map(|token| decode(&token.raw).into_owned()),
            _ => None,
        };
        SuggestionRequest {
            term: SuggestionTerm {
                label: search.clone(),
                search,
                kind: expect.term_kind(),
            },
            column,
            exclude: Vec::new(),
        }
    }

    /// Recompute what depends on the committed terms; keystrokes that only
    /// touch the fragment reuse it
    fn terms_changed(&mut self) {
        self.open_groups = open_groups(self.terms.tokens());
        self.terms_error = self.validate().err();
    }

    fn refresh_validity(&mut self) {
        self.syntax_error = self.terms_error.clone().or_else(|| self.fragment_error());
    }

    fn fragment_error(&self) -> Option<String> {
        if self.fragment.is_empty() {
            return None;
        }
        let expect = self.expect();
        let open = self.open_groups;
        if expect.free_text_kind().is_some() {
            // Free text never starts with a raw delimiter unless a symbol was
            // typed where none is legal
            return self
                .fragment
                .starts_with(|c| DELIMITERS.contains(&c))
                .then(|| self.one_of(expect, open));
        }
        match match_symbol(&self.fragment, &expect.symbols(open)) {
            SymbolMatch::None => Some(self.one_of(expect, open)),
            _ => None,
        }
    }

    fn one_of(&self, expect: Expect, open: usize) -> String {
        let symbols = expect.symbols(open);
        let names: Vec<&str> = symbols.iter().map(|(symbol, _)| *symbol).collect();
        match expect.free_text_kind() {
            Some(kind) => format!("{} / {}", self.messages.expected_term(kind.as_str()), self.messages.type_one_of(&names)),
            None => self.messages.type_one_of(&names),
        }
    }
}
