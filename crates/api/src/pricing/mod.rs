//! Price watcher: cache -> Chainlink oracle -> protocol subgraph -> DEX-TWAP
//! fallback chain.
//!
//! Grounded on `oracle::provider::OracleProvider` (cache-first `get_price`,
//! TTL staleness via `is_stale`) and its tiered-fallback shape, reused here
//! as three fallback tiers (oracle, subgraph, DEX-TWAP) each with the same
//! "try, log, fall through" structure. The oracle leg
//! itself is read through the injected [`OracleReader`] rather than this
//! crate talking to chain RPCs directly, since `liquidator-api` does not
//! depend on `liquidator-chain`; `liquidator-core` wires a chain-backed
//! reader in. The subgraph and DEX-TWAP legs are new, grounded on
//! `blockanalitica.rs`'s reqwest client shape and
//! `swap::SwapRouterRegistry::get_route_with_fallback` respectively.

pub mod subgraph;

pub use subgraph::{SubgraphClient, SubgraphConfig};

use alloy::primitives::Address;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::swap::{SwapParams, SwapRouterRegistry};

/// Cache is returned without consulting any fallback tier.
const CACHE_FRESH_SECS: u64 = 15;
/// Beyond this age a cached quote is never returned, even as a last resort.
const PRICE_MAX_AGE_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceSource {
    Cache,
    Oracle,
    /// Oracle leg, but the feed was denominated in ETH and had to be
    /// multiplied by a WETH/USD feed to reach a USD price.
    ChainlinkEthConverted,
    Subgraph,
    DexTwap,
}

/// A priced token, tagged with the tier that produced it. Price is USD per
/// whole token (not smallest-unit, not fixed-point).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub token: Address,
    pub price_usd: f64,
    pub source: PriceSource,
    pub timestamp: u64,
}

/// Reads a token's USD price from whatever on-chain oracle the caller has
/// wired up (Chainlink aggregator, RedStone, etc.). Implemented against
/// `liquidator-chain`'s oracle types by the crate that owns both
/// dependencies.
#[async_trait]
pub trait OracleReader: Send + Sync + Debug {
    /// Returns the USD price along with the precise source tag the reader
    /// produced it under (e.g. a plain Chainlink feed versus one that needed
    /// an ETH/USD conversion leg), so callers can record provenance without
    /// re-deriving it.
    async fn read_price(&self, chain_id: u64, token: Address) -> Result<(f64, PriceSource)>;
}

/// Receives every successful price quote as a volatility side-channel input.
/// Implemented by `liquidator-core`'s adaptive-threshold controller.
pub trait VolatilityObserver: Send + Sync {
    fn observe(&self, chain_id: u64, token: Address, price_usd: f64, timestamp: u64);
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

struct CacheEntry {
    quote: PriceQuote,
}

/// Per-chain price watcher. One instance per configured chain, since the
/// oracle reader, subgraph endpoint, and router registry are all
/// chain-scoped.
pub struct PriceWatcher {
    chain_id: u64,
    weth: Address,
    oracle: Arc<dyn OracleReader>,
    subgraph: Option<SubgraphClient>,
    routers: Arc<SwapRouterRegistry>,
    cache: DashMap<Address, CacheEntry>,
    volatility: Option<Arc<dyn VolatilityObserver>>,
}

impl PriceWatcher {
    pub fn new(chain_id: u64, weth: Address, oracle: Arc<dyn OracleReader>, routers: Arc<SwapRouterRegistry>) -> Self {
        Self {
            chain_id,
            weth,
            oracle,
            subgraph: None,
            routers,
            cache: DashMap::new(),
            volatility: None,
        }
    }

    pub fn with_subgraph(mut self, subgraph: SubgraphClient) -> Self {
        self.subgraph = Some(subgraph);
        self
    }

    pub fn with_volatility_observer(mut self, observer: Arc<dyn VolatilityObserver>) -> Self {
        self.volatility = Some(observer);
        self
    }

    /// Resolve `token`'s USD price, walking the fallback chain on miss.
    pub async fn price_usd(&self, token: Address) -> Result<PriceQuote> {
        if let Some(quote) = self.fresh_cache_hit(token, CACHE_FRESH_SECS) {
            return Ok(quote);
        }

        if let Some(quote) = self.try_oracle(token).await {
            return Ok(quote);
        }

        if let Some(quote) = self.try_subgraph(token).await {
            return Ok(quote);
        }

        if let Some(quote) = self.try_dex_twap(token).await {
            return Ok(quote);
        }

        // Last resort: an older-but-not-too-old cached quote.
        if let Some(quote) = self.fresh_cache_hit(token, PRICE_MAX_AGE_SECS) {
            warn!(token = %token, "all price tiers failed, returning aged cache entry");
            return Ok(quote);
        }

        Err(anyhow!("no price source available for {token} on chain {}", self.chain_id))
    }

    fn fresh_cache_hit(&self, token: Address, max_age_secs: u64) -> Option<PriceQuote> {
        let entry = self.cache.get(&token)?;
        if now_unix().saturating_sub(entry.quote.timestamp) <= max_age_secs {
            Some(entry.quote.clone())
        } else {
            None
        }
    }

    async fn try_oracle(&self, token: Address) -> Option<PriceQuote> {
        match self.oracle.read_price(self.chain_id, token).await {
            Ok((price_usd, source)) => Some(self.record(token, price_usd, source)),
            Err(e) => {
                debug!(token = %token, error = %e, "oracle leg failed, falling back to subgraph");
                None
            }
        }
    }

    async fn try_subgraph(&self, token: Address) -> Option<PriceQuote> {
        let subgraph = self.subgraph.as_ref()?;
        match subgraph.fetch_price_usd(token).await {
            Ok(price_usd) => Some(self.record(token, price_usd, PriceSource::Subgraph)),
            Err(e) => {
                debug!(token = %token, error = %e, "subgraph leg failed, falling back to dex-twap");
                None
            }
        }
    }

    /// DEX-TWAP fallback: quote token -> WETH for a small reference amount
    /// and scale by WETH's own USD price. WETH itself can never take this
    /// path (it would need its own price to price itself), so pricing WETH
    /// relies solely on the oracle and subgraph tiers above.
    async fn try_dex_twap(&self, token: Address) -> Option<PriceQuote> {
        if token == self.weth {
            return None;
        }

        let weth_price = match self.weth_price_usd_no_dex().await {
            Some(p) => p,
            None => {
                debug!("dex-twap leg needs a WETH price and none of the upstream tiers produced one");
                return None;
            }
        };

        let reference_amount = alloy::primitives::U256::from(10u128.pow(15)); // 0.001 token, 18dp assumed by caller
        let params = SwapParams::new(token, self.weth, reference_amount, 18);
        let route = self.routers.get_route_with_fallback(self.chain_id, params).await.ok()?;

        let weth_out = route.expected_output.to_string().parse::<f64>().ok()? / 1e18;
        if weth_out <= 0.0 {
            return None;
        }
        let implied_price = (weth_out * weth_price) / 0.001;
        Some(self.record(token, implied_price, PriceSource::DexTwap))
    }

    async fn weth_price_usd_no_dex(&self) -> Option<f64> {
        if let Some(quote) = self.fresh_cache_hit(self.weth, PRICE_MAX_AGE_SECS) {
            return Some(quote.price_usd);
        }
        if let Ok((price, _)) = self.oracle.read_price(self.chain_id, self.weth).await {
            return Some(price);
        }
        if let Some(subgraph) = &self.subgraph {
            if let Ok(price) = subgraph.fetch_price_usd(self.weth).await {
                return Some(price);
            }
        }
        None
    }

    fn record(&self, token: Address, price_usd: f64, source: PriceSource) -> PriceQuote {
        let timestamp = now_unix();
        let quote = PriceQuote {
            token,
            price_usd,
            source,
            timestamp,
        };
        self.cache.insert(
            token,
            CacheEntry {
                quote: quote.clone(),
            },
        );
        if let Some(observer) = &self.volatility {
            observer.observe(self.chain_id, token, price_usd, timestamp);
        }
        quote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct FlakyOracle {
        fail: bool,
        price: f64,
    }

    #[async_trait]
    impl OracleReader for FlakyOracle {
        async fn read_price(&self, _chain_id: u64, _token: Address) -> Result<(f64, PriceSource)> {
            if self.fail {
                Err(anyhow!("rpc timeout"))
            } else {
                Ok((self.price, PriceSource::Oracle))
            }
        }
    }

    struct CountingObserver {
        count: AtomicUsize,
    }

    impl VolatilityObserver for CountingObserver {
        fn observe(&self, _chain_id: u64, _token: Address, _price_usd: f64, _timestamp: u64) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn oracle_hit_is_cached_and_observed() {
        let oracle = Arc::new(FlakyOracle { fail: false, price: 2000.0 });
        let routers = Arc::new(SwapRouterRegistry::new());
        let observer = Arc::new(CountingObserver { count: AtomicUsize::new(0) });
        let watcher = PriceWatcher::new(1, Address::repeat_byte(9), oracle, routers)
            .with_volatility_observer(observer.clone());

        let token = Address::repeat_byte(1);
        let quote = watcher.price_usd(token).await.unwrap();
        assert_eq!(quote.source, PriceSource::Oracle);
        assert_eq!(quote.price_usd, 2000.0);
        assert_eq!(observer.count.load(Ordering::SeqCst), 1);

        // Second call within the fresh window hits cache, no new observation.
        let quote2 = watcher.price_usd(token).await.unwrap();
        assert_eq!(quote2.source, PriceSource::Cache);
        assert_eq!(observer.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn weth_never_takes_dex_twap_path() {
        let weth = Address::repeat_byte(9);
        let oracle = Arc::new(FlakyOracle { fail: true, price: 0.0 });
        let routers = Arc::new(SwapRouterRegistry::new());
        let watcher = PriceWatcher::new(1, weth, oracle, routers);
        assert!(watcher.try_dex_twap(weth).await.is_none());
    }

    #[tokio::test]
    async fn all_tiers_failing_returns_error() {
        let oracle = Arc::new(FlakyOracle { fail: true, price: 0.0 });
        let routers = Arc::new(SwapRouterRegistry::new());
        let watcher = PriceWatcher::new(1, Address::repeat_byte(9), oracle, routers);
        let result = watcher.price_usd(Address::repeat_byte(1)).await;
        assert!(result.is_err());
    }
}
