//! Morpho Blue protocol implementation.
//!
//! Morpho Blue has no pool-wide state at all: every position lives in an
//! isolated market identified by a `bytes32` id (hash of loan token,
//! collateral token, oracle, IRM, and LLTV), and the singleton contract is
//! queried per-market rather than per-asset. This adapter is therefore
//! scoped to one market, not one chain deployment; a chain running several
//! Morpho markets runs one `MorphoBlueProtocol` instance per market, same
//! as `CompoundV3Protocol` runs one instance per Comet.
//!
//! Grounded on `protocol::aave_v3::AaveV3Protocol` for the trait-impl shape
//! and `protocol::compound_v3::CompoundV3Protocol` for the generic-provider
//! `sol!`-binding pattern used where no `ProviderManager` helper contract
//! exists for the protocol. Position math (shares -> assets conversion) is
//! new, grounded directly on Morpho Blue's published accounting invariant
//! (`assets = shares * totalAssets / totalShares`).

use super::{
    CollateralPosition, DebtPosition, LendingProtocol, LiquidatableProtocol,
    LiquidationCallParams, LiquidationParams, PositionData, ProtocolEventSignatures,
    ProtocolVersion,
};
use alloy::primitives::{keccak256, Address, Bytes, FixedBytes, B256, U256};
use alloy::providers::Provider;
use alloy::sol;
use alloy::sol_types::{SolCall, SolType};
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::debug;

sol! {
    #[sol(rpc)]
    interface IMorphoBlue {
        struct MarketParams {
            address loanToken;
            address collateralToken;
            address oracle;
            address irm;
            uint256 lltv;
        }

        struct Position {
            uint256 supplyShares;
            uint128 borrowShares;
            uint128 collateral;
        }

        struct Market {
            uint128 totalSupplyAssets;
            uint128 totalSupplyShares;
            uint128 totalBorrowAssets;
            uint128 totalBorrowShares;
            uint128 lastUpdate;
            uint128 fee;
        }

        function position(bytes32 id, address user) external view returns (Position memory);
        function market(bytes32 id) external view returns (Market memory);
        function idToMarketParams(bytes32 id) external view returns (MarketParams memory);

        function liquidate(
            MarketParams calldata marketParams,
            address borrower,
            uint256 seizedAssets,
            uint256 repaidShares,
            bytes calldata data
        ) external returns (uint256, uint256);
    }

    #[sol(rpc)]
    interface IMorphoOracle {
        // Morpho oracles quote collateral in loan-token units, scaled by 1e36
        // divided by the collateral token's decimals, per the Morpho spec.
        function price() external view returns (uint256);
    }
}

/// One Morpho Blue market's fixed parameters and the pre-liquidation factor
/// this deployment opted into (1.0 if the market uses the protocol default
/// liquidation, i.e. full LLTV-bound seizure).
#[derive(Debug, Clone)]
pub struct MorphoMarketConfig {
    pub protocol_id: String,
    pub chain_id: u64,
    pub morpho_address: Address,
    pub liquidator_address: Address,
    pub loan_token: Address,
    pub loan_token_decimals: u8,
    pub collateral_token: Address,
    pub collateral_token_decimals: u8,
    pub oracle: Address,
    pub irm: Address,
    pub lltv: U256,
    pub pre_liquidation_factor: f64,
    pub liquidation_bonus_bps: u16,
}

impl MorphoMarketConfig {
    /// Morpho Blue market ids are `keccak256(abi.encode(MarketParams))`.
    pub fn market_id(&self) -> B256 {
        let params = IMorphoBlue::MarketParams {
            loanToken: self.loan_token,
            collateralToken: self.collateral_token,
            oracle: self.oracle,
            irm: self.irm,
            lltv: self.lltv,
        };
        keccak256(IMorphoBlue::MarketParams::abi_encode(&params))
    }
}

#[derive(Debug)]
pub struct MorphoBlueProtocol<P> {
    config: MorphoMarketConfig,
    market_id: FixedBytes<32>,
    provider: Arc<P>,
}

impl<P: Provider + Clone + Send + Sync + 'static> MorphoBlueProtocol<P> {
    pub fn new(config: MorphoMarketConfig, provider: Arc<P>) -> Self {
        let market_id = config.market_id();
        Self {
            config,
            market_id,
            provider,
        }
    }

    /// Convert a shares amount to the underlying asset amount using the
    /// market's current totals. Returns zero on an empty market rather than
    /// dividing by zero, matching a freshly-created market with no activity.
    fn shares_to_assets(shares: U256, total_shares: U256, total_assets: U256) -> U256 {
        if total_shares.is_zero() {
            return U256::ZERO;
        }
        shares * total_assets / total_shares
    }

    async fn read_collateral_price(&self) -> Result<U256> {
        let oracle = IMorphoOracle::new(self.config.oracle, &*self.provider);
        Ok(oracle.price().call().await?)
    }
}

#[async_trait]
impl<P: Provider + Clone + Send + Sync + 'static> LendingProtocol for MorphoBlueProtocol<P> {
    fn protocol_id(&self) -> &str {
        &self.config.protocol_id
    }

    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::Custom
    }

    fn pool_address(&self) -> Address {
        self.config.morpho_address
    }

    fn oracle_address(&self) -> Option<Address> {
        Some(self.config.oracle)
    }

    async fn get_position(&self, user: Address) -> Result<PositionData> {
        debug!(user = %user, protocol = self.protocol_id(), "fetching Morpho Blue position");

        let morpho = IMorphoBlue::new(self.config.morpho_address, &*self.provider);
        let position = morpho.position(self.market_id, user).call().await?;
        let market = morpho.market(self.market_id).call().await?;

        let mut collaterals = SmallVec::new();
        let mut debts = SmallVec::new();

        if position.collateral > 0 {
            // Morpho's oracle price is collateral-denominated-in-loan-token,
            // scaled 1e36; converting straight to a USD figure requires the
            // loan token's own USD price, which this adapter doesn't have —
            // callers combine this with the loan token's price from the
            // price watcher rather than this module inventing a conversion.
            let collateral_price = self.read_collateral_price().await.unwrap_or(U256::ZERO);
            let value_usd = morpho_collateral_usd(
                U256::from(position.collateral),
                collateral_price,
                self.config.collateral_token_decimals,
            );
            collaterals.push(CollateralPosition {
                asset: self.config.collateral_token,
                balance: U256::from(position.collateral),
                price: collateral_price,
                decimals: self.config.collateral_token_decimals,
                value_usd,
                liquidation_threshold_bps: lltv_to_bps(self.config.lltv),
                enabled: true,
            });
        }

        if position.borrowShares > 0 {
            let borrow_assets = Self::shares_to_assets(
                U256::from(position.borrowShares),
                U256::from(market.totalBorrowShares),
                U256::from(market.totalBorrowAssets),
            );
            debts.push(DebtPosition {
                asset: self.config.loan_token,
                balance: borrow_assets,
                price: U256::ZERO,
                decimals: self.config.loan_token_decimals,
                value_usd: 0.0,
            });
        }

        let total_collateral_usd: f64 = collaterals.iter().map(|c| c.value_usd).sum();
        let total_debt_usd: f64 = debts.iter().map(|d| d.value_usd).sum();
        let health_factor = self.calculate_health_factor(&collaterals, &debts);
        let timestamp = self.provider.get_block_number().await.unwrap_or(0);

        Ok(PositionData {
            user,
            collaterals,
            debts,
            health_factor,
            total_collateral_usd,
            total_debt_usd,
            timestamp,
        })
    }

    async fn get_positions_batch(
        &self,
        users: &[Address],
        concurrency: usize,
    ) -> Vec<(Address, Result<PositionData>)> {
        stream::iter(users.iter().cloned())
            .map(|user| async move {
                let result = self.get_position(user).await;
                (user, result)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await
    }

    fn calculate_health_factor(
        &self,
        collaterals: &[CollateralPosition],
        debts: &[DebtPosition],
    ) -> f64 {
        let total_collateral_adjusted: f64 = collaterals
            .iter()
            .filter(|c| c.enabled)
            .map(|c| c.value_usd * (c.liquidation_threshold_bps as f64 / 10_000.0))
            .sum();
        let total_debt: f64 = debts.iter().map(|d| d.value_usd).sum();

        if total_debt == 0.0 {
            return f64::MAX;
        }
        total_collateral_adjusted / total_debt
    }

    fn event_signatures(&self) -> ProtocolEventSignatures {
        ProtocolEventSignatures::default()
    }

    async fn is_asset_supported(&self, asset: Address) -> Result<bool> {
        Ok(asset == self.config.loan_token || asset == self.config.collateral_token)
    }
}

#[async_trait]
impl<P: Provider + Clone + Send + Sync + 'static> LiquidatableProtocol for MorphoBlueProtocol<P> {
    fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    fn liquidation_params(&self) -> LiquidationParams {
        LiquidationParams {
            close_factor: self.config.pre_liquidation_factor,
            liquidation_threshold: 1.0,
            default_liquidation_bonus_bps: self.config.liquidation_bonus_bps,
        }
    }

    async fn get_liquidation_bonus(&self, _asset: Address) -> Result<u16> {
        Ok(self.config.liquidation_bonus_bps)
    }

    // Morpho's liquidate() takes either a seized-assets OR a repaid-shares
    // amount (the other must be zero); the simulator always sizes by seized
    // collateral, so repaidShares is left at zero here.
    fn encode_liquidation(&self, params: &LiquidationCallParams) -> Result<Bytes> {
        let market_params = IMorphoBlue::MarketParams {
            loanToken: self.config.loan_token,
            collateralToken: self.config.collateral_token,
            oracle: self.config.oracle,
            irm: self.config.irm,
            lltv: self.config.lltv,
        };
        let call = IMorphoBlue::liquidateCall {
            marketParams: market_params,
            borrower: params.user,
            seizedAssets: params.min_collateral_out,
            repaidShares: U256::ZERO,
            data: params.swap_data.clone().unwrap_or_default(),
        };
        Ok(Bytes::from(call.abi_encode()))
    }

    fn liquidation_target(&self) -> Address {
        self.config.morpho_address
    }
}

fn lltv_to_bps(lltv: U256) -> u16 {
    // LLTV is WAD-scaled (1e18 = 100%).
    let scaled = lltv * U256::from(10_000) / U256::from(10u128.pow(18));
    scaled.to_string().parse::<u16>().unwrap_or(8000)
}

fn morpho_collateral_usd(collateral_amount: U256, oracle_price: U256, collateral_decimals: u8) -> f64 {
    if collateral_amount.is_zero() || oracle_price.is_zero() {
        return 0.0;
    }
    // Morpho oracle price is scaled by 1e36 / 10^collateral_decimals, giving
    // loan-token-smallest-units per whole collateral token. This returns the
    // collateral amount priced in loan-token smallest units, not USD; the
    // caller multiplies by the loan token's own USD price.
    let amount_f64 = collateral_amount.to_string().parse::<f64>().unwrap_or(0.0);
    let price_f64 = oracle_price.to_string().parse::<f64>().unwrap_or(0.0);
    let scale = 10_f64.powi(36) / 10_f64.powi(collateral_decimals as i32);
    amount_f64 * price_f64 / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lltv_bps_conversion() {
        let lltv = U256::from(860_000_000_000_000_000u128); // 0.86e18 = 86%
        assert_eq!(lltv_to_bps(lltv), 8600);
    }

    #[test]
    fn market_id_is_deterministic() {
        let config = MorphoMarketConfig {
            protocol_id: "morpho-blue".to_string(),
            chain_id: 1,
            morpho_address: Address::ZERO,
            liquidator_address: Address::ZERO,
            loan_token: Address::repeat_byte(1),
            loan_token_decimals: 6,
            collateral_token: Address::repeat_byte(2),
            collateral_token_decimals: 18,
            oracle: Address::repeat_byte(3),
            irm: Address::repeat_byte(4),
            lltv: U256::from(860_000_000_000_000_000u128),
            pre_liquidation_factor: 1.0,
            liquidation_bonus_bps: 500,
        };
        let id_a = config.market_id();
        let id_b = config.market_id();
        assert_eq!(id_a, id_b);
    }
}
