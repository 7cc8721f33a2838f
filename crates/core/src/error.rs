//! Typed error taxonomy for the decision/execution pipeline.
//!
//! `anyhow::Result` is still used at task and I/O boundaries, matching the
//! rest of the workspace. `EngineError` lives at the policy/simulator/ledger
//! boundary, where callers need to branch on *what kind* of rejection
//! happened rather than just log a string.

use alloy::primitives::Address;
use thiserror::Error;

/// Error kinds produced by the policy engine, simulator, and execution
/// coordinator. Each variant carries a machine-readable reason tag via
/// [`EngineError::reason_tag`] that the attempt ledger stores verbatim.
#[derive(Debug, Error, Clone)]
pub enum EngineError {
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    #[error("rate limited{}", .retry_after_secs.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("data schema error: {0}")]
    DataSchema(String),

    #[error("price missing for {token}")]
    PriceMissing { token: Address },

    #[error("simulation rejected: {reason}")]
    SimulationReject { reason: String },

    #[error("reverted on-chain: {reason}")]
    RevertOnChain { reason: String },

    #[error("nonce gap: expected {expected}, chain reported {observed}")]
    NonceGap { expected: u64, observed: u64 },

    #[error("sequencer down for chain {chain_id}")]
    SequencerDown { chain_id: u64 },

    #[error("fatal: {0}")]
    Fatal(String),
}

impl EngineError {
    /// Machine-readable reason tag, as stored in `ExecutionAttempt::reason`.
    pub fn reason_tag(&self) -> String {
        match self {
            Self::TransientNetwork(_) => "transient-network".to_string(),
            Self::RateLimited { .. } => "rate-limited".to_string(),
            Self::DataSchema(_) => "data-schema".to_string(),
            Self::PriceMissing { .. } => "policy_skip:price-missing".to_string(),
            Self::SimulationReject { reason } => format!("plan-null:{reason}"),
            Self::RevertOnChain { .. } => "mined-revert".to_string(),
            Self::NonceGap { .. } => "nonce-gap".to_string(),
            Self::SequencerDown { .. } => "policy_skip:sequencer-down".to_string(),
            Self::Fatal(_) => "fatal".to_string(),
        }
    }

    /// Whether the caller should retry at the boundary that raised this
    /// error, rather than propagate it to the ledger as a terminal outcome.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransientNetwork(_) | Self::RateLimited { .. } | Self::NonceGap { .. }
        )
    }

    /// Whether this error should halt only the affected chain rather than
    /// the whole process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_tags_match_spec_prefixes() {
        let err = EngineError::SequencerDown { chain_id: 42161 };
        assert_eq!(err.reason_tag(), "policy_skip:sequencer-down");

        let err = EngineError::SimulationReject {
            reason: "pnl-multiple".to_string(),
        };
        assert_eq!(err.reason_tag(), "plan-null:pnl-multiple");
    }

    #[test]
    fn transient_classification() {
        assert!(EngineError::TransientNetwork("timeout".into()).is_transient());
        assert!(!EngineError::Fatal("bad config".into()).is_transient());
        assert!(EngineError::Fatal("bad config".into()).is_fatal());
    }
}
