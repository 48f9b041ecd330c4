//! Suggestion protocol and the per-editor request session
//!
//! A session is a small state machine:
//!
//! ```text
//! Idle --schedule--> Debouncing --poll (quiet period over)--> InFlight --complete--> Idle
//!          ^             |                                       |
//!          +--schedule---+---------------schedule----------------+
//! ```
//!
//! Entering a new non-idle state always cancels the pending debounce and
//! aborts the in-flight request first, so at most one request is ever
//! outstanding. Requests are tagged with a [`CancellationToken`]; responses
//! whose token was superseded are discarded.

use crate::filter::rule::ComparisonOp;
use crate::terms::TokenKind;
use crate::utils::fuzzy::find_near_matches;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// The term a suggestion is requested for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionTerm {
    pub search: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub term: SuggestionTerm,
    /// Column the value is compared against, for value suggestions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Terms already used, to be left out
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub search: String,
    pub label: String,
    /// Type-specific extras passed through from the source
    #[serde(default, flatten, skip_serializing_if = "serde_json::Map::is_empty")]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Suggestion {
    pub fn new(search: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            label: label.into(),
            meta: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionResponse {
    pub items: Vec<Suggestion>,
    /// Fallback offered when nothing matches exactly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Suggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request was superseded and aborted by the editor itself
    #[error("request aborted")]
    Aborted,
    #[error("suggestion request failed: {0}")]
    Failed(String),
}

/// Anything that can answer suggestion requests
pub trait SuggestionSource {
    fn suggest(&self, request: &SuggestionRequest) -> Result<SuggestionResponse, TransportError>;
}

/// Marks one request; cancelled as soon as the session issues a newer one
#[derive(Debug, Clone)]
pub struct CancellationToken {
    version: u64,
    active: Arc<AtomicU64>,
}

impl CancellationToken {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_cancelled(&self) -> bool {
        self.active.load(Ordering::SeqCst) != self.version
    }
}

#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,
    Debouncing { due: Instant, request: SuggestionRequest },
    InFlight { token: CancellationToken, request: SuggestionRequest },
}

/// Debounced, cancellable suggestion requests for one editor
#[derive(Debug)]
pub struct SuggestionSession {
    state: SessionState,
    debounce: Duration,
    active: Arc<AtomicU64>,
}

impl SuggestionSession {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            debounce,
            active: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, SessionState::Idle)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, SessionState::InFlight { .. })
    }

    /// Start the quiet period for a new request, dropping whatever was pending
    pub fn schedule(&mut self, request: SuggestionRequest, now: Instant) {
        self.cancel();
        self.state = SessionState::Debouncing {
            due: now + self.debounce,
            request,
        };
    }

    /// Cancel the pending debounce and abort the in-flight request
    pub fn cancel(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Idle => {}
            SessionState::Debouncing { request, .. } => {
                debug!("cancelled pending suggestion for {:?}", request.term.search);
            }
            SessionState::InFlight { token, .. } => {
                debug!("aborting suggestion request {}", token.version);
                self.active.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Fire the pending request once its quiet period is over
    pub fn poll(&mut self, now: Instant) -> Option<(CancellationToken, SuggestionRequest)> {
        let due = match &self.state {
            SessionState::Debouncing { due, .. } => *due,
            _ => return None,
        };
        if now < due {
            return None;
        }

        let SessionState::Debouncing { request, .. } = std::mem::replace(&mut self.state, SessionState::Idle) else {
            return None;
        };
        let version = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken {
            version,
            active: Arc::clone(&self.active),
        };
        self.state = SessionState::InFlight {
            token: token.clone(),
            request: request.clone(),
        };
        Some((token, request))
    }

    /// Settle the in-flight request. Returns false when the response belongs
    /// to a superseded request and must be discarded.
    pub fn complete(&mut self, token: &CancellationToken) -> bool {
        if token.is_cancelled() {
            debug!("discarding response to superseded request {}", token.version);
            return false;
        }
        match &self.state {
            SessionState::InFlight { token: current, .. } if current.version == token.version => {
                self.state = SessionState::Idle;
                true
            }
            _ => false,
        }
    }
}

/// Suggestions from a fixed list of column names
#[derive(Debug, Clone)]
pub struct LocalSuggestions {
    columns: Vec<String>,
    limit: usize,
    max_distance: usize,
}

impl LocalSuggestions {
    pub fn new(columns: Vec<String>, limit: usize) -> Self {
        Self {
            columns,
            limit,
            max_distance: 2,
        }
    }
}

impl SuggestionSource for LocalSuggestions {
    fn suggest(&self, request: &SuggestionRequest) -> Result<SuggestionResponse, TransportError> {
        let search = request.term.search.as_str();
        let symbols = |candidates: &[&str]| -> Vec<Suggestion> {
            candidates
                .iter()
                .filter(|symbol| symbol.starts_with(search))
                .map(|symbol| Suggestion::new(*symbol, *symbol))
                .collect()
        };

        let items = match request.term.kind {
            TokenKind::Column => {
                let columns: Vec<String> = self
                    .columns
                    .iter()
                    .filter(|column| !request.exclude.contains(column))
                    .cloned()
                    .collect();
                find_near_matches(search, &columns, self.max_distance, self.limit)
                    .into_iter()
                    .map(|column| Suggestion::new(column, column))
                    .collect()
            }
            TokenKind::Operator => {
                let ops: Vec<&str> = ComparisonOp::ALL.iter().map(|op| op.symbol()).collect();
                symbols(&ops)
            }
            TokenKind::LogicalOperator => symbols(&["&", "|"]),
            _ => Vec::new(),
        };

        let exact = items.iter().any(|item| item.search == search);
        let default = (request.term.kind.is_free_text() && !search.is_empty() && !exact)
            .then(|| Suggestion::new(search, search));

        Ok(SuggestionResponse { items, default })
    }
}
