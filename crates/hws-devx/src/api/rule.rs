//! Rule migration interface.
//!
//! Per-rule insertion and deletion is not part of the steering core. During
//! a resize the core only decides whether a move is allowed and then hands
//! the rule to the rule engine.

use crate::error::DevxResult;
use crate::types::MatcherId;

/// Rule as seen by the steering core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleHandle {
    pub id: u64,
    /// Matcher the rule currently lives in.
    pub matcher: MatcherId,
}

impl RuleHandle {
    /// Creates a rule handle.
    pub fn new(id: u64, matcher: MatcherId) -> Self {
        Self { id, matcher }
    }
}

/// Queue attributes of a rule operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuleAttr {
    pub queue_id: u16,
    /// Caller context returned on completion.
    pub user_data: u64,
    /// Submit immediately instead of batching.
    pub burst: bool,
    /// Rule index for insert-by-index matchers.
    pub rule_idx: Option<u32>,
}

/// Rule engine collaborator.
pub trait RuleMover: Send + Sync {
    /// Re-inserts `rule` into the resize destination of its matcher.
    fn move_rule(&self, rule: &RuleHandle, destination: MatcherId, attr: &RuleAttr)
        -> DevxResult<()>;
}
