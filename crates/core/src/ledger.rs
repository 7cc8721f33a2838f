//! Append-only attempt ledger.
//!
//! Every admission, rejection, simulation, submission, and confirmation
//! appends one [`ExecutionAttempt`] record. Writes must never block the
//! pipeline: the ledger is a bounded ring buffer behind a short-held
//! `parking_lot::Mutex`, matching the lock discipline the rest of the
//! workspace uses for short-critical-section shared state. Unlike the
//! staged-transaction store this is adapted from, the ledger's access
//! pattern is append-and-drain rather than per-key lookup, so a `VecDeque`
//! replaces the `DashMap`.

use alloy::primitives::B256;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::candidate::DedupKey;
use crate::simulator::Plan;

/// Status of an execution attempt. Transitions are monotone along
/// `rejected | (simulated -> submitted -> (mined-ok | mined-revert | timeout))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptStatus {
    Rejected,
    Simulated,
    Submitted,
    MinedOk,
    MinedRevert,
    Timeout,
}

impl AttemptStatus {
    /// Whether `next` is a legal transition from `self`.
    pub fn can_transition_to(&self, next: AttemptStatus) -> bool {
        use AttemptStatus::*;
        matches!(
            (self, next),
            (Simulated, Submitted)
                | (Submitted, MinedOk)
                | (Submitted, MinedRevert)
                | (Submitted, Timeout)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionAttempt {
    pub id: u64,
    pub chain_id: u64,
    /// Digest of the candidate's dedup key, for correlation without
    /// carrying the full candidate payload.
    pub candidate_digest: DedupKey,
    pub plan: Option<Plan>,
    pub status: AttemptStatus,
    pub reason: String,
    pub tx_hash: Option<B256>,
    pub gas_used: Option<u64>,
    pub realized_profit_usd: Option<f64>,
    pub created_at: u64,
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerStats {
    pub len: usize,
    pub capacity: usize,
    pub overflow_dropped: u64,
}

/// Bounded, append-only ledger of execution attempts.
pub struct AttemptLedger {
    buffer: Mutex<VecDeque<ExecutionAttempt>>,
    capacity: usize,
    next_id: AtomicU64,
    overflow_dropped: AtomicU64,
}

impl AttemptLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            next_id: AtomicU64::new(1),
            overflow_dropped: AtomicU64::new(0),
        }
    }

    /// Append a new attempt with the given reason/status, assigning a
    /// monotone id. Never blocks on anything but the in-memory mutex; if
    /// the buffer is saturated the oldest *non-terminal* record is dropped
    /// to make room and the overflow counter is bumped.
    pub fn append(
        &self,
        chain_id: u64,
        candidate_digest: DedupKey,
        plan: Option<Plan>,
        status: AttemptStatus,
        reason: impl Into<String>,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let attempt = ExecutionAttempt {
            id,
            chain_id,
            candidate_digest,
            plan,
            status,
            reason: reason.into(),
            tx_hash: None,
            gas_used: None,
            realized_profit_usd: None,
            created_at: now_unix(),
        };

        let mut buffer = self.buffer.lock();
        if buffer.len() >= self.capacity {
            if let Some(idx) = buffer.iter().position(|a| !is_terminal(a.status)) {
                buffer.remove(idx);
                self.overflow_dropped.fetch_add(1, Ordering::Relaxed);
            } else {
                buffer.pop_front();
                self.overflow_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
        buffer.push_back(attempt);
        id
    }

    /// Advance the status of an existing attempt by id, validating the
    /// transition is monotone. No-op (logged by the caller) if the id is
    /// gone from the ring buffer or the transition is illegal.
    pub fn advance(
        &self,
        id: u64,
        next: AttemptStatus,
        tx_hash: Option<B256>,
        gas_used: Option<u64>,
        realized_profit_usd: Option<f64>,
    ) -> bool {
        let mut buffer = self.buffer.lock();
        if let Some(attempt) = buffer.iter_mut().find(|a| a.id == id) {
            if !attempt.status.can_transition_to(next) {
                return false;
            }
            attempt.status = next;
            if tx_hash.is_some() {
                attempt.tx_hash = tx_hash;
            }
            if gas_used.is_some() {
                attempt.gas_used = gas_used;
            }
            if realized_profit_usd.is_some() {
                attempt.realized_profit_usd = realized_profit_usd;
            }
            true
        } else {
            false
        }
    }

    pub fn stats(&self) -> LedgerStats {
        let buffer = self.buffer.lock();
        LedgerStats {
            len: buffer.len(),
            capacity: self.capacity,
            overflow_dropped: self.overflow_dropped.load(Ordering::Relaxed),
        }
    }

    /// Snapshot the current contents. Intended for in-process inspection;
    /// reader queries against a durable store are out of scope here.
    pub fn snapshot(&self) -> Vec<ExecutionAttempt> {
        self.buffer.lock().iter().cloned().collect()
    }

    /// Per-chain health snapshot: successes/reverts in the last hour and a
    /// breakdown of rejection reasons.
    pub fn chain_health(&self, chain_id: u64) -> ChainHealth {
        let cutoff = now_unix().saturating_sub(3600);
        let buffer = self.buffer.lock();
        let mut health = ChainHealth {
            chain_id,
            last_attempt_at: None,
            successes_1h: 0,
            reverts_1h: 0,
            rejections_by_reason: std::collections::HashMap::new(),
        };

        for attempt in buffer.iter().filter(|a| a.chain_id == chain_id) {
            health.last_attempt_at = Some(health.last_attempt_at.unwrap_or(0).max(attempt.created_at));
            if attempt.created_at < cutoff {
                continue;
            }
            match attempt.status {
                AttemptStatus::MinedOk => health.successes_1h += 1,
                AttemptStatus::MinedRevert => health.reverts_1h += 1,
                AttemptStatus::Rejected => {
                    *health
                        .rejections_by_reason
                        .entry(attempt.reason.clone())
                        .or_insert(0) += 1;
                }
                _ => {}
            }
        }
        health
    }
}

fn is_terminal(status: AttemptStatus) -> bool {
    matches!(
        status,
        AttemptStatus::Rejected
            | AttemptStatus::MinedOk
            | AttemptStatus::MinedRevert
            | AttemptStatus::Timeout
    )
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainHealth {
    pub chain_id: u64,
    pub last_attempt_at: Option<u64>,
    pub successes_1h: u64,
    pub reverts_1h: u64,
    pub rejections_by_reason: std::collections::HashMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::ProtocolTag;
    use alloy::primitives::Address;

    fn key() -> DedupKey {
        DedupKey {
            chain_id: 1,
            borrower: Address::ZERO,
            debt_token: Address::ZERO,
            collateral_token: Address::ZERO,
            protocol: ProtocolTag::Aave,
        }
    }

    #[test]
    fn append_assigns_monotone_ids() {
        let ledger = AttemptLedger::new(10);
        let id1 = ledger.append(1, key(), None, AttemptStatus::Rejected, "policy_skip:cooldown");
        let id2 = ledger.append(1, key(), None, AttemptStatus::Rejected, "policy_skip:cooldown");
        assert!(id2 > id1);
    }

    #[test]
    fn overflow_drops_oldest_non_terminal_and_counts() {
        let ledger = AttemptLedger::new(2);
        ledger.append(1, key(), None, AttemptStatus::Simulated, "ok");
        ledger.append(1, key(), None, AttemptStatus::Simulated, "ok");
        ledger.append(1, key(), None, AttemptStatus::Simulated, "ok");
        let stats = ledger.stats();
        assert_eq!(stats.len, 2);
        assert_eq!(stats.overflow_dropped, 1);
    }

    #[test]
    fn status_transitions_are_monotone() {
        let ledger = AttemptLedger::new(10);
        let id = ledger.append(1, key(), None, AttemptStatus::Simulated, "ok");
        assert!(ledger.advance(id, AttemptStatus::Submitted, None, None, None));
        assert!(ledger.advance(id, AttemptStatus::MinedOk, Some(B256::ZERO), Some(150_000), Some(12.5)));
        // Illegal: already terminal.
        assert!(!ledger.advance(id, AttemptStatus::Submitted, None, None, None));
    }

    #[test]
    fn chain_health_aggregates_recent_window() {
        let ledger = AttemptLedger::new(10);
        ledger.append(7, key(), None, AttemptStatus::MinedOk, "ok");
        ledger.append(7, key(), None, AttemptStatus::Rejected, "policy_skip:cooldown");
        let health = ledger.chain_health(7);
        assert_eq!(health.successes_1h, 1);
        assert_eq!(health.rejections_by_reason.get("policy_skip:cooldown"), Some(&1));
    }
}
