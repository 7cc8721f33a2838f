//! Tagged candidate model and dedup tracking.
//!
//! A [`Candidate`] is an immutable record of a liquidatable position as
//! reported by exactly one protocol adapter. Adapters are polymorphic over a
//! common capability set (stream/poll/simulate/classify-rejection per
//! protocol); the candidate itself is the common projection every downstream
//! stage (policy, simulator, ledger) operates on regardless of source
//! protocol.

use alloy::primitives::{Address, B256};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Protocol family a candidate was sourced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolTag {
    Aave,
    CompoundV3,
    MorphoBlue,
    Radiant,
    Seamless,
}

impl ProtocolTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aave => "aave",
            Self::CompoundV3 => "compound-v3",
            Self::MorphoBlue => "morpho-blue",
            Self::Radiant => "radiant",
            Self::Seamless => "seamless",
        }
    }
}

/// One leg (debt or collateral side) of a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenLeg {
    pub token: Address,
    pub symbol: String,
    pub decimals: u8,
    /// Amount in the token's smallest unit.
    pub amount: alloy::primitives::U256,
}

/// Immutable liquidation candidate, as emitted by a protocol adapter.
///
/// Invariants (enforced by adapters before emission, not re-checked here):
/// decimals on both legs are valid u8s; amounts are non-negative (U256 is
/// unsigned so this is structural); `health_factor` is monotone in the sense
/// that positions with HF at or above the policy bound are never emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub borrower: Address,
    pub chain_id: u64,
    pub protocol: ProtocolTag,
    pub debt: TokenLeg,
    pub collateral: TokenLeg,
    pub health_factor: f64,
    /// Protocol-specific key, e.g. a Morpho Blue market id.
    pub market_id: Option<B256>,
}

impl Candidate {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            chain_id: self.chain_id,
            borrower: self.borrower,
            debt_token: self.debt.token,
            collateral_token: self.collateral.token,
            protocol: self.protocol,
        }
    }
}

/// Dedup key: (chainId, borrower, debtToken, collateralToken, protocol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey {
    pub chain_id: u64,
    pub borrower: Address,
    pub debt_token: Address,
    pub collateral_token: Address,
    pub protocol: ProtocolTag,
}

struct SeenEntry {
    health_factor: f64,
    seen_at: Instant,
}

/// Dedup filter sitting between the intake multiplexer and the policy
/// engine. A candidate seen within the TTL window is dropped unless it
/// carries a strictly lower health factor, in which case the window resets.
pub struct CandidateDedup {
    seen: DashMap<DedupKey, SeenEntry>,
    ttl: Duration,
}

impl CandidateDedup {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            ttl,
        }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(120))
    }

    /// Returns `true` if this candidate should be forwarded downstream,
    /// `false` if it's a duplicate within the TTL window.
    pub fn admit(&self, candidate: &Candidate) -> bool {
        let key = candidate.dedup_key();
        let now = Instant::now();

        match self.seen.get(&key) {
            Some(entry) => {
                let expired = now.duration_since(entry.seen_at) >= self.ttl;
                let improved = candidate.health_factor < entry.health_factor;
                drop(entry);
                if expired || improved {
                    self.seen.insert(
                        key,
                        SeenEntry {
                            health_factor: candidate.health_factor,
                            seen_at: now,
                        },
                    );
                    true
                } else {
                    false
                }
            }
            None => {
                self.seen.insert(
                    key,
                    SeenEntry {
                        health_factor: candidate.health_factor,
                        seen_at: now,
                    },
                );
                true
            }
        }
    }

    /// Drop entries whose TTL has lapsed, bounding memory growth.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        self.seen
            .retain(|_, entry| now.duration_since(entry.seen_at) < self.ttl);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};

    fn make_candidate(hf: f64) -> Candidate {
        Candidate {
            borrower: Address::repeat_byte(1),
            chain_id: 42161,
            protocol: ProtocolTag::Aave,
            debt: TokenLeg {
                token: Address::repeat_byte(2),
                symbol: "USDC".to_string(),
                decimals: 6,
                amount: U256::from(1000_000_000u64),
            },
            collateral: TokenLeg {
                token: Address::repeat_byte(3),
                symbol: "WETH".to_string(),
                decimals: 18,
                amount: U256::from(1000u64),
            },
            health_factor: hf,
            market_id: None,
        }
    }

    #[test]
    fn first_sighting_is_admitted() {
        let dedup = CandidateDedup::with_default_ttl();
        assert!(dedup.admit(&make_candidate(0.95)));
    }

    #[test]
    fn duplicate_within_ttl_dropped_unless_hf_improves() {
        let dedup = CandidateDedup::new(Duration::from_secs(120));
        assert!(dedup.admit(&make_candidate(0.95)));
        // Same HF, within TTL -> dropped.
        assert!(!dedup.admit(&make_candidate(0.95)));
        // Strictly lower HF -> admitted, resets window.
        assert!(dedup.admit(&make_candidate(0.90)));
        // Higher HF than last recorded -> dropped.
        assert!(!dedup.admit(&make_candidate(0.93)));
    }

    #[test]
    fn expired_entry_is_admitted_again() {
        let dedup = CandidateDedup::new(Duration::from_millis(1));
        assert!(dedup.admit(&make_candidate(0.95)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(dedup.admit(&make_candidate(0.95)));
    }
}
