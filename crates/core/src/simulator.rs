//! Simulator: turns an admitted candidate plus live prices into a [`Plan`]
//! or a typed rejection.
//!
//! Grounded on `Liquidator::build_and_execute`/`estimate_profit` (profit
//! accounting shape) and `api::swap::SwapRouterRegistry::get_route_with_fallback`
//! (multi-router quote enumeration), generalized with an explicit
//! binary-search repay-size optimizer since swap price impact grows
//! convexly with size and a single close-factor-sized repay is not always
//! optimal.

use alloy::primitives::{Address, U256};
use liquidator_api::swap::{SwapParams, SwapRoute, SwapRouterRegistry};
use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;
use crate::u256_math;

/// One leg of a chosen swap route, as recorded on the accepted [`Plan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteLeg {
    pub router: String,
    pub pool: Address,
    pub fee_bps: u32,
    pub token_in: Address,
    pub token_out: Address,
}

/// Snapshot of the adaptive-threshold bounds in effect when a plan was
/// built, recorded for after-the-fact auditing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveSnapshot {
    pub health_factor_max: f64,
    pub gap_cap_bps: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub candidate: Candidate,
    pub repay_amount: U256,
    pub expected_seized_collateral: U256,
    pub swap_route: Vec<RouteLeg>,
    pub gross_profit_usd: f64,
    pub estimated_gas_usd: f64,
    pub net_profit_usd: f64,
    pub slippage_bps: u16,
    pub deadline_seconds: u64,
    pub adaptive_thresholds_snapshot: AdaptiveSnapshot,
}

/// Typed rejection reasons, each mapped onto a `plan-null:*` ledger tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimRejectReason {
    NoRoute,
    NegativeEv,
    PnlMultiple,
    PriceImpact,
    QuoterRevert,
}

impl SimRejectReason {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NoRoute => "plan-null:no-route",
            Self::NegativeEv => "plan-null:negative-ev",
            Self::PnlMultiple => "plan-null:pnl-multiple",
            Self::PriceImpact => "plan-null:price-impact",
            Self::QuoterRevert => "plan-null:quoter-revert",
        }
    }
}

/// Per-protocol maximum-repayable-debt rule. Aave applies a close factor
/// that widens to 100% once HF drops below a crisis band; Compound v3
/// repays the full base-asset debt in one shot; Morpho Blue exposes an
/// opt-in pre-liquidation factor.
#[derive(Debug, Clone, Copy)]
pub enum CloseFactorRule {
    Aave { normal: f64, crisis_hf: f64, crisis: f64 },
    CompoundFullRepay,
    MorphoPreLiquidation { factor: f64 },
}

impl CloseFactorRule {
    pub fn max_repay_fraction(&self, health_factor: f64) -> f64 {
        match self {
            Self::Aave { normal, crisis_hf, crisis } => {
                if health_factor < *crisis_hf {
                    *crisis
                } else {
                    *normal
                }
            }
            Self::CompoundFullRepay => 1.0,
            Self::MorphoPreLiquidation { factor } => *factor,
        }
    }
}

/// All inputs the simulator needs to price and size a liquidation.
pub struct SimInput<'a> {
    pub candidate: &'a Candidate,
    pub debt_price_usd: f64,
    pub collateral_price_usd: f64,
    pub liquidation_bonus_bps: u16,
    pub close_factor_rule: CloseFactorRule,
    /// Smallest repay size worth bothering with (avoids optimizing around
    /// dust-sized positions).
    pub dust_floor: U256,
    pub chain_id: u64,
    pub gas_units: u64,
    pub gas_price_wei: u128,
    pub native_price_usd: f64,
    pub slippage_bps: u16,
    pub deadline_seconds: u64,
    pub min_net_usd: f64,
    pub pnl_multiple_min: f64,
    pub safety_margin_bps: u16,
    pub adaptive_snapshot: AdaptiveSnapshot,
}

/// Evaluate a candidate against live prices, searching for the
/// profit-maximizing repay size. Runs the swap-route quoter 4-6 times
/// (binary search over repay amount) since the convexity of price impact
/// means neither the dust floor nor the protocol-max repay is generally
/// optimal.
pub async fn simulate(
    input: SimInput<'_>,
    routers: &SwapRouterRegistry,
) -> Result<Plan, SimRejectReason> {
    let max_repay_fraction = input
        .close_factor_rule
        .max_repay_fraction(input.candidate.health_factor);
    let max_repay = u256_math::apply_basis_points(
        input.candidate.debt.amount,
        (max_repay_fraction * 10_000.0).round() as u16,
    );

    if max_repay <= input.dust_floor {
        return Err(SimRejectReason::NegativeEv);
    }

    let gas_usd = gas_cost_usd(input.gas_units, input.gas_price_wei, input.native_price_usd);

    let mut lo = input.dust_floor;
    let mut hi = max_repay;
    let mut best: Option<(U256, SwapRoute, f64)> = None;

    // 5 bisection steps, enough to converge on a repay size close to the
    // convex-cost optimum without hammering the quoter.
    for _ in 0..5 {
        let mid = lo + (hi - lo) / U256::from(2);
        if mid.is_zero() {
            break;
        }

        let seized = seized_collateral(
            mid,
            input.candidate.debt.decimals,
            input.debt_price_usd,
            input.collateral_price_usd,
            input.liquidation_bonus_bps,
            input.candidate.collateral.decimals,
        );

        let params = SwapParams::new(
            input.candidate.collateral.token,
            input.candidate.debt.token,
            seized,
            input.candidate.collateral.decimals,
        )
        .with_slippage_bps(input.slippage_bps);

        let route = match routers.get_route_with_fallback(input.chain_id, params).await {
            Ok(route) => route,
            Err(_) => {
                // Quoter failed for this size; shrink the search window and
                // try a smaller repay instead of aborting outright.
                hi = mid;
                continue;
            }
        };

        let net_received_usd = route
            .expected_output_usd
            .unwrap_or(0.0)
            * (1.0 - input.slippage_bps as f64 / 10_000.0);
        let repay_usd = amount_to_f64(mid, input.candidate.debt.decimals) * input.debt_price_usd;
        let gross_profit = net_received_usd - repay_usd;
        let net_profit = gross_profit - gas_usd;

        let improves = best
            .as_ref()
            .map(|(_, _, best_net)| net_profit > *best_net)
            .unwrap_or(true);
        if improves {
            best = Some((mid, route, net_profit));
        }

        // Price impact grows convexly: if the midpoint is already net
        // negative, smaller sizes are more likely to be profitable.
        if net_profit < 0.0 {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    let (repay_amount, route, net_profit_usd) = best.ok_or(SimRejectReason::NoRoute)?;

    let gross_profit_usd = net_profit_usd + gas_usd;

    if net_profit_usd < input.min_net_usd {
        return Err(SimRejectReason::NegativeEv);
    }
    if net_profit_usd < input.pnl_multiple_min * gas_usd {
        return Err(SimRejectReason::PnlMultiple);
    }

    let expected_net_received = route.expected_output.saturating_sub(
        u256_math::apply_basis_points(route.expected_output, input.slippage_bps),
    );
    let safety_floor = repay_amount
        + u256_math::apply_basis_points(repay_amount, input.safety_margin_bps);
    if expected_net_received < safety_floor {
        return Err(SimRejectReason::PriceImpact);
    }

    let swap_route = route
        .hops
        .iter()
        .flat_map(|hop| hop.allocations.iter())
        .map(|alloc| RouteLeg {
            router: format!("router-{}", alloc.router_index),
            pool: alloc.token_out,
            fee_bps: alloc.fee,
            token_in: alloc.token_in,
            token_out: alloc.token_out,
        })
        .collect();

    Ok(Plan {
        candidate: input.candidate.clone(),
        repay_amount,
        expected_seized_collateral: route.amount_in,
        swap_route,
        gross_profit_usd,
        estimated_gas_usd: gas_usd,
        net_profit_usd,
        slippage_bps: input.slippage_bps,
        deadline_seconds: input.deadline_seconds,
        adaptive_thresholds_snapshot: input.adaptive_snapshot,
    })
}

/// seizedCollateral = repayDebtUsd * (1 + liquidationBonus) / collateralPriceUsd,
/// expressed in collateral smallest units.
fn seized_collateral(
    repay_amount: U256,
    debt_decimals: u8,
    debt_price_usd: f64,
    collateral_price_usd: f64,
    liquidation_bonus_bps: u16,
    collateral_decimals: u8,
) -> U256 {
    if collateral_price_usd <= 0.0 {
        return U256::ZERO;
    }
    let repay_f = amount_to_f64(repay_amount, debt_decimals);
    let bonus_multiplier = 1.0 + liquidation_bonus_bps as f64 / 10_000.0;
    let seized_usd = repay_f * debt_price_usd * bonus_multiplier;
    let seized_tokens = seized_usd / collateral_price_usd;
    f64_to_amount(seized_tokens, collateral_decimals)
}

/// Converts a raw smallest-unit amount to a whole-token `f64`, e.g. 1_000_000
/// raw units at 6 decimals becomes `1.0`. Precision loss beyond `f64`'s ~15
/// significant digits is acceptable here: this value only feeds profit
/// estimation, never the amount actually submitted on-chain.
fn amount_to_f64(amount: U256, decimals: u8) -> f64 {
    let raw: f64 = amount.to_string().parse().unwrap_or(0.0);
    raw / 10f64.powi(decimals as i32)
}

fn f64_to_amount(value: f64, decimals: u8) -> U256 {
    if value <= 0.0 {
        return U256::ZERO;
    }
    let raw = value * 10f64.powi(decimals as i32);
    if raw >= u128::MAX as f64 {
        return U256::from(u128::MAX);
    }
    U256::from(raw as u128)
}

fn gas_cost_usd(gas_units: u64, gas_price_wei: u128, native_price_usd: f64) -> f64 {
    let gas_cost_native = (gas_units as f64) * (gas_price_wei as f64) / 1e18;
    gas_cost_native * native_price_usd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_factor_widens_in_crisis_band() {
        let rule = CloseFactorRule::Aave {
            normal: 0.5,
            crisis_hf: 0.95,
            crisis: 1.0,
        };
        assert_eq!(rule.max_repay_fraction(1.0), 0.5);
        assert_eq!(rule.max_repay_fraction(0.9), 1.0);
    }

    #[test]
    fn compound_always_repays_in_full() {
        let rule = CloseFactorRule::CompoundFullRepay;
        assert_eq!(rule.max_repay_fraction(0.5), 1.0);
        assert_eq!(rule.max_repay_fraction(0.99), 1.0);
    }

    #[test]
    fn gas_cost_conversion() {
        // 200k gas @ 1 gwei, native at $2000/ETH
        let usd = gas_cost_usd(200_000, 1_000_000_000, 2000.0);
        assert!((usd - 0.0004).abs() < 1e-6);
    }

    #[test]
    fn amount_conversion_round_trips_through_decimals() {
        let raw = U256::from(1_500_000u64); // 1.5 USDC at 6 decimals
        assert!((amount_to_f64(raw, 6) - 1.5).abs() < 1e-9);
        assert_eq!(f64_to_amount(1.5, 6), raw);
    }

    #[test]
    fn seized_collateral_applies_bonus_and_scales_decimals() {
        // Repay 1000 USDC (6 decimals) of debt at $1, 5% bonus, WETH at
        // $2000 (18 decimals) -> seize 1000 * 1.05 / 2000 = 0.525 WETH.
        let repay = U256::from(1_000_000_000u64);
        let seized = seized_collateral(repay, 6, 1.0, 2000.0, 500, 18);
        let seized_tokens = amount_to_f64(seized, 18);
        assert!((seized_tokens - 0.525).abs() < 1e-6);
    }
}
