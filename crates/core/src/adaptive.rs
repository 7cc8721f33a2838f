//! Adaptive threshold controller.
//!
//! Tracks an EWMA of oracle/DEX price-gap volatility per (chain, assetKey)
//! and derives tightened or relaxed admission bounds from it. Generalizes
//! the per-position sensitivity cache pattern (DashMap keyed, staleness
//! checked against a threshold) to a per-market volatility cache.

use dashmap::DashMap;
use std::time::{Duration, Instant};

const EWMA_ALPHA: f64 = 0.2;

/// Sensitivity of the health-factor bound and gap cap to measured
/// volatility. `normalize(sigma)` maps raw EWMA volatility (bps) into
/// [0, 1] by dividing by this reference scale and clamping; 1000 bps
/// of sustained oracle/DEX gap volatility saturates the adjustment.
const VOLATILITY_NORMALIZATION_BPS: f64 = 1000.0;

const K_HF: f64 = 0.06;
const K_GAP: f64 = 1.0;

/// Per-(chain, assetKey) adaptive state. Created on first observation,
/// updated on every price-gap observation, never destroyed.
#[derive(Debug, Clone)]
pub struct AdaptiveState {
    pub base_hf_max: f64,
    pub base_gap_cap_bps: f64,
    pub ewma_mean_bps: f64,
    pub ewma_volatility_bps: f64,
    pub last_update_at: Instant,
}

impl AdaptiveState {
    fn new(base_hf_max: f64, base_gap_cap_bps: f64) -> Self {
        Self {
            base_hf_max,
            base_gap_cap_bps,
            ewma_mean_bps: 0.0,
            ewma_volatility_bps: 0.0,
            last_update_at: Instant::now(),
        }
    }

    fn normalized_volatility(&self) -> f64 {
        (self.ewma_volatility_bps / VOLATILITY_NORMALIZATION_BPS).clamp(0.0, 1.0)
    }

    /// healthFactorMax = baseHfMax - k_hf * normalize(sigma), clamped to
    /// [baseHfMax - 0.04, baseHfMax + 0.02].
    pub fn health_factor_max(&self) -> f64 {
        let raw = self.base_hf_max - K_HF * self.normalized_volatility();
        raw.clamp(self.base_hf_max - 0.04, self.base_hf_max + 0.02)
    }

    /// gapCapBps = baseGapCapBps * (1 - k_gap * normalize(sigma)), clamped
    /// to [0.5*base, 1.5*base].
    pub fn gap_cap_bps(&self) -> f64 {
        let raw = self.base_gap_cap_bps * (1.0 - K_GAP * self.normalized_volatility());
        raw.clamp(self.base_gap_cap_bps * 0.5, self.base_gap_cap_bps * 1.5)
    }
}

/// Adaptive threshold controller, one instance shared across all chains.
pub struct AdaptiveThresholds {
    states: DashMap<(u64, String), AdaptiveState>,
}

impl Default for AdaptiveThresholds {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveThresholds {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
        }
    }

    /// Feed one observed oracle/DEX gap (in bps) for (chain, assetKey),
    /// updating its EWMA volatility. `base_hf_max`/`base_gap_cap_bps` seed
    /// state on first observation and are otherwise ignored.
    pub fn observe_gap(
        &self,
        chain_id: u64,
        asset_key: &str,
        gap_bps: f64,
        base_hf_max: f64,
        base_gap_cap_bps: f64,
    ) {
        let key = (chain_id, asset_key.to_string());
        let mut state = self
            .states
            .entry(key)
            .or_insert_with(|| AdaptiveState::new(base_hf_max, base_gap_cap_bps));

        let deviation = (gap_bps - state.ewma_mean_bps).abs();
        state.ewma_volatility_bps =
            EWMA_ALPHA * deviation + (1.0 - EWMA_ALPHA) * state.ewma_volatility_bps;
        state.ewma_mean_bps = EWMA_ALPHA * gap_bps + (1.0 - EWMA_ALPHA) * state.ewma_mean_bps;
        state.last_update_at = Instant::now();
    }

    pub fn health_factor_max(&self, chain_id: u64, asset_key: &str, default_base: f64) -> f64 {
        self.states
            .get(&(chain_id, asset_key.to_string()))
            .map(|s| s.health_factor_max())
            .unwrap_or(default_base)
    }

    pub fn gap_cap_bps(&self, chain_id: u64, asset_key: &str, default_base: f64) -> f64 {
        self.states
            .get(&(chain_id, asset_key.to_string()))
            .map(|s| s.gap_cap_bps())
            .unwrap_or(default_base)
    }

    pub fn state(&self, chain_id: u64, asset_key: &str) -> Option<AdaptiveState> {
        self.states
            .get(&(chain_id, asset_key.to_string()))
            .map(|s| s.clone())
    }

    pub fn is_stale(&self, chain_id: u64, asset_key: &str, threshold: Duration) -> bool {
        self.states
            .get(&(chain_id, asset_key.to_string()))
            .map(|s| s.last_update_at.elapsed() > threshold)
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calm_market_relaxes_bounds_toward_base() {
        let controller = AdaptiveThresholds::new();
        for _ in 0..6 {
            controller.observe_gap(1, "WETH", 5.0, 1.03, 50.0);
        }
        let state = controller.state(1, "WETH").unwrap();
        assert!(state.health_factor_max() <= 1.03 + 0.02);
        assert!(state.health_factor_max() >= 1.03 - 0.04);
    }

    #[test]
    fn turbulent_market_tightens_bounds() {
        let controller = AdaptiveThresholds::new();
        // Scenario 5 from the testable-properties list: six observations of
        // a 600bps gap against an assetKey.
        for _ in 0..6 {
            controller.observe_gap(42161, "WSTETH", 600.0, 1.03, 50.0);
        }
        let hf_max = controller.health_factor_max(42161, "WSTETH", 1.03);
        let gap_cap = controller.gap_cap_bps(42161, "WSTETH", 50.0);
        assert!(hf_max <= 1.03);
        assert!(gap_cap <= 50.0);
    }

    #[test]
    fn bounds_stay_within_clamp_range() {
        let controller = AdaptiveThresholds::new();
        for _ in 0..50 {
            controller.observe_gap(1, "X", 10_000.0, 1.03, 50.0);
        }
        let state = controller.state(1, "X").unwrap();
        assert!(state.health_factor_max() >= 1.03 - 0.04 - 1e-9);
        assert!(state.health_factor_max() <= 1.03 + 0.02 + 1e-9);
        assert!(state.gap_cap_bps() >= 50.0 * 0.5 - 1e-9);
        assert!(state.gap_cap_bps() <= 50.0 * 1.5 + 1e-9);
    }
}
