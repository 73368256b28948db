//! Session state and stale-response guard
//!
//! Each aggregate call is tagged with a generation from a monotonically
//! increasing counter. Only the call holding the latest generation may
//! commit; results of superseded calls are dropped when they arrive.
//!
//! Lifecycle: Idle -> Fetching -> Success | Failed

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::aggregator::Aggregator;
use crate::error::Result;
use crate::schemas::{Article, Filter, QueryResult};

#[derive(Debug, Clone, PartialEq)]
pub enum FeedState {
    Idle,
    Fetching {
        generation: u64,
    },
    Success {
        generation: u64,
        result: QueryResult,
        page_count: u64,
    },
    /// Articles are empty in this state
    Failed {
        generation: u64,
        message: String,
    },
}

/// Proof of which call issued a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

pub struct Session {
    latest: AtomicU64,
    state: RwLock<FeedState>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
            state: RwLock::new(FeedState::Idle),
        }
    }

    /// Starts a new call, superseding any call still in flight
    pub fn begin(&self) -> Ticket {
        let mut state = self.state.write();
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        *state = FeedState::Fetching { generation };
        Ticket { generation }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.generation
    }

    /// Commits `outcome` if `ticket` is still the latest call.
    ///
    /// Returns whether the outcome was committed.
    pub fn commit(&self, ticket: Ticket, outcome: Result<QueryResult>) -> bool {
        let mut state = self.state.write();
        if !self.is_current(ticket) {
            debug!(
                generation = ticket.generation,
                latest = self.latest.load(Ordering::SeqCst),
                "Discarding superseded result"
            );
            return false;
        }

        *state = match outcome {
            Ok(result) => FeedState::Success {
                generation: ticket.generation,
                page_count: result.page_count(),
                result,
            },
            Err(e) => {
                warn!(generation = ticket.generation, error = %e, "Aggregate call failed");
                FeedState::Failed {
                    generation: ticket.generation,
                    message: e.to_string(),
                }
            }
        };
        true
    }

    /// Runs one aggregate call for `filter` and commits it unless superseded
    pub async fn refresh(&self, aggregator: &Aggregator, filter: &Filter) -> bool {
        let ticket = self.begin();
        let outcome = aggregator.aggregate(filter, filter.page).await;
        self.commit(ticket, outcome)
    }

    pub fn state(&self) -> FeedState {
        self.state.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.state.read(), FeedState::Fetching { .. })
    }

    /// Committed articles; empty unless the last call succeeded
    pub fn articles(&self) -> Vec<Article> {
        match &*self.state.read() {
            FeedState::Success { result, .. } => result.articles.clone(),
            _ => Vec::new(),
        }
    }
}
