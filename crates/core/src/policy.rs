//! Policy engine: ordered admission checks run before simulation.
//!
//! Grounded on `Liquidator::build_and_execute`'s early-profitability-check
//! style (check cheap things before expensive ones) and `config/bot.rs`'s
//! threshold-holding config structs, generalized into an explicit ordered
//! chain of checks returning a typed rejection instead of inline early
//! returns.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::adaptive::AdaptiveThresholds;
use crate::candidate::{Candidate, DedupKey};

const COOLDOWN_AFTER_FAILURE: Duration = Duration::from_secs(60);
const COOLDOWN_AFTER_REVERT: Duration = Duration::from_secs(300);
const COOLDOWN_AFTER_SUCCESS: Duration = Duration::from_secs(30);

/// Why an execution imposed a cooldown on its dedup key, which determines
/// how long the cooldown lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownCause {
    Failure,
    Revert,
    Success,
}

impl CooldownCause {
    fn duration(&self) -> Duration {
        match self {
            Self::Failure => COOLDOWN_AFTER_FAILURE,
            Self::Revert => COOLDOWN_AFTER_REVERT,
            Self::Success => COOLDOWN_AFTER_SUCCESS,
        }
    }
}

struct CooldownEntry {
    until: Instant,
}

/// Per-chain policy thresholds. One instance per configured chain.
#[derive(Debug, Clone)]
pub struct ChainPolicyConfig {
    pub chain_id: u64,
    pub enabled: bool,
    pub min_position_usd: f64,
    pub max_position_usd: f64,
    pub allowed_debt_tokens: Vec<alloy::primitives::Address>,
    pub allowed_collateral_tokens: Vec<alloy::primitives::Address>,
}

impl ChainPolicyConfig {
    fn token_allowed(&self, token: alloy::primitives::Address, allowlist: &[alloy::primitives::Address]) -> bool {
        allowlist.iter().any(|t| *t == token)
    }
}

/// Typed admission rejection, each mapping onto a `policy_skip:*` ledger tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyRejectReason {
    ChainDisabled,
    SequencerDown,
    Cooldown,
    HfAboveAdaptive,
    SizeBelowMin,
    SizeAboveMax,
    TokenNotAllowed,
    PriceMissing,
}

impl PolicyRejectReason {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ChainDisabled => "policy_skip:chain-disabled",
            Self::SequencerDown => "policy_skip:sequencer-down",
            Self::Cooldown => "policy_skip:cooldown",
            Self::HfAboveAdaptive => "policy_skip:hf-above-adaptive",
            Self::SizeBelowMin => "policy_skip:size-below-min",
            Self::SizeAboveMax => "policy_skip:size-above-max",
            Self::TokenNotAllowed => "policy_skip:token-not-allowed",
            Self::PriceMissing => "policy_skip:price-missing",
        }
    }
}

/// Prices and sizing facts the policy engine needs but does not itself
/// source; supplied by the caller after a price-watcher lookup.
pub struct PolicyPriceContext {
    pub debt_price_usd: Option<f64>,
    pub collateral_price_usd: Option<f64>,
    pub position_usd: f64,
    pub asset_key: String,
}

/// Admits or rejects candidates ahead of simulation. Holds per-dedup-key
/// cooldown state; chain config and adaptive thresholds are injected per
/// call since they're owned by longer-lived shared state elsewhere.
pub struct PolicyEngine {
    cooldowns: DashMap<DedupKey, CooldownEntry>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self {
            cooldowns: DashMap::new(),
        }
    }

    /// Run the five ordered checks, failing fast on the first that rejects.
    pub fn admit(
        &self,
        candidate: &Candidate,
        chain_cfg: &ChainPolicyConfig,
        sequencer_up: bool,
        adaptive: &AdaptiveThresholds,
        prices: &PolicyPriceContext,
    ) -> Result<(), PolicyRejectReason> {
        // 1. Chain enabled, sequencer OK.
        if !chain_cfg.enabled {
            return Err(PolicyRejectReason::ChainDisabled);
        }
        if !sequencer_up {
            return Err(PolicyRejectReason::SequencerDown);
        }

        // 2. Cooldown on (borrower, debt, collateral) not active.
        if self.is_cooling_down(&candidate.dedup_key()) {
            return Err(PolicyRejectReason::Cooldown);
        }

        // 3. Adaptive HF gate.
        let hf_max = adaptive.health_factor_max(chain_cfg.chain_id, &prices.asset_key, 1.0);
        if candidate.health_factor > hf_max {
            return Err(PolicyRejectReason::HfAboveAdaptive);
        }

        // 4. Position size within bounds.
        if prices.position_usd < chain_cfg.min_position_usd {
            return Err(PolicyRejectReason::SizeBelowMin);
        }
        if prices.position_usd > chain_cfg.max_position_usd {
            return Err(PolicyRejectReason::SizeAboveMax);
        }

        // 5. Tokens allow-listed and priced.
        if !chain_cfg.token_allowed(candidate.debt.token, &chain_cfg.allowed_debt_tokens)
            || !chain_cfg.token_allowed(candidate.collateral.token, &chain_cfg.allowed_collateral_tokens)
        {
            return Err(PolicyRejectReason::TokenNotAllowed);
        }
        if prices.debt_price_usd.is_none() || prices.collateral_price_usd.is_none() {
            return Err(PolicyRejectReason::PriceMissing);
        }

        Ok(())
    }

    fn is_cooling_down(&self, key: &DedupKey) -> bool {
        match self.cooldowns.get(key) {
            Some(entry) if Instant::now() < entry.until => true,
            Some(_) => false,
            None => false,
        }
    }

    /// Record the outcome of an execution attempt, arming the cooldown
    /// whose duration matches the cause.
    pub fn impose_cooldown(&self, key: DedupKey, cause: CooldownCause) {
        self.cooldowns.insert(
            key,
            CooldownEntry {
                until: Instant::now() + cause.duration(),
            },
        );
    }

    /// Drop cooldowns that have lapsed, bounding memory growth.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        self.cooldowns.retain(|_, entry| now < entry.until);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{ProtocolTag, TokenLeg};
    use alloy::primitives::{Address, U256};

    fn debt_token() -> Address {
        Address::repeat_byte(2)
    }

    fn collateral_token() -> Address {
        Address::repeat_byte(3)
    }

    fn make_candidate(hf: f64) -> Candidate {
        Candidate {
            borrower: Address::repeat_byte(1),
            chain_id: 42161,
            protocol: ProtocolTag::Aave,
            debt: TokenLeg {
                token: debt_token(),
                symbol: "USDC".to_string(),
                decimals: 6,
                amount: U256::from(1_000_000_000u64),
            },
            collateral: TokenLeg {
                token: collateral_token(),
                symbol: "WETH".to_string(),
                decimals: 18,
                amount: U256::from(1_000u64),
            },
            health_factor: hf,
            market_id: None,
        }
    }

    fn make_chain_cfg() -> ChainPolicyConfig {
        ChainPolicyConfig {
            chain_id: 42161,
            enabled: true,
            min_position_usd: 100.0,
            max_position_usd: 1_000_000.0,
            allowed_debt_tokens: vec![debt_token()],
            allowed_collateral_tokens: vec![collateral_token()],
        }
    }

    fn make_prices() -> PolicyPriceContext {
        PolicyPriceContext {
            debt_price_usd: Some(1.0),
            collateral_price_usd: Some(2000.0),
            position_usd: 1000.0,
            asset_key: "WETH".to_string(),
        }
    }

    #[test]
    fn healthy_candidate_is_admitted() {
        let engine = PolicyEngine::new();
        let adaptive = AdaptiveThresholds::new();
        let result = engine.admit(
            &make_candidate(0.95),
            &make_chain_cfg(),
            true,
            &adaptive,
            &make_prices(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn disabled_chain_rejects_first() {
        let engine = PolicyEngine::new();
        let adaptive = AdaptiveThresholds::new();
        let mut cfg = make_chain_cfg();
        cfg.enabled = false;
        let result = engine.admit(&make_candidate(0.95), &cfg, true, &adaptive, &make_prices());
        assert_eq!(result, Err(PolicyRejectReason::ChainDisabled));
    }

    #[test]
    fn sequencer_down_rejects_before_cooldown() {
        let engine = PolicyEngine::new();
        let adaptive = AdaptiveThresholds::new();
        let result = engine.admit(
            &make_candidate(0.95),
            &make_chain_cfg(),
            false,
            &adaptive,
            &make_prices(),
        );
        assert_eq!(result, Err(PolicyRejectReason::SequencerDown));
    }

    #[test]
    fn active_cooldown_rejects_resubmission() {
        let engine = PolicyEngine::new();
        let adaptive = AdaptiveThresholds::new();
        let candidate = make_candidate(0.95);
        engine.impose_cooldown(candidate.dedup_key(), CooldownCause::Revert);
        let result = engine.admit(&candidate, &make_chain_cfg(), true, &adaptive, &make_prices());
        assert_eq!(result, Err(PolicyRejectReason::Cooldown));
    }

    #[test]
    fn size_outside_bounds_rejects() {
        let engine = PolicyEngine::new();
        let adaptive = AdaptiveThresholds::new();
        let mut prices = make_prices();
        prices.position_usd = 10.0;
        let result = engine.admit(&make_candidate(0.95), &make_chain_cfg(), true, &adaptive, &prices);
        assert_eq!(result, Err(PolicyRejectReason::SizeBelowMin));
    }

    #[test]
    fn missing_price_rejects_last() {
        let engine = PolicyEngine::new();
        let adaptive = AdaptiveThresholds::new();
        let mut prices = make_prices();
        prices.debt_price_usd = None;
        let result = engine.admit(&make_candidate(0.95), &make_chain_cfg(), true, &adaptive, &prices);
        assert_eq!(result, Err(PolicyRejectReason::PriceMissing));
    }

    #[test]
    fn hf_above_adaptive_bound_rejects() {
        let engine = PolicyEngine::new();
        let adaptive = AdaptiveThresholds::new();
        // hf 1.05 is above the default base_hf_max passed as 1.0 fallback.
        let result = engine.admit(&make_candidate(1.05), &make_chain_cfg(), true, &adaptive, &make_prices());
        assert_eq!(result, Err(PolicyRejectReason::HfAboveAdaptive));
    }
}
