//! Liquidation engine entrypoint.
//!
//! Wires one configured chain's intake -> policy -> simulator -> execution
//! pipeline and runs it until shut down. Config/env loading, CLI flags, and
//! metrics/alerting exposition are deliberately out of scope here; this is
//! just component construction and the long-lived task set.

mod wiring;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{Provider, ProviderBuilder};
use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use liquidator_api::blockanalitica::BlockAnaliticaClient;
use liquidator_api::pricing::PriceWatcher;
use liquidator_api::swap::{uniswap_v3::UniswapV3Router, SwapRouterRegistry};
use liquidator_chain::gas::create_gas_strategy;
use liquidator_chain::protocol::{
    AaveV3ConfigBuilder, CometAssetConfig, CompoundV3ConfigBuilder, LendingProtocol,
    LiquidatableProtocol, LiquidationCallParams, MorphoMarketConfigBuilder, ProtocolFactory,
};
use liquidator_chain::sequencer::AlwaysUp;
use liquidator_chain::{
    ChainCoordinatorConfig, PlanRequest, ProviderManager, SequencerLiveness, TransactionSender,
};
use liquidator_core::candidate::{Candidate, CandidateDedup, ProtocolTag, TokenLeg};
use liquidator_core::simulator::{simulate, CloseFactorRule, SimInput};
use liquidator_core::{
    AdaptiveThresholds, AttemptLedger, AttemptStatus, ChainPolicyConfig, CooldownCause,
    PolicyEngine, PolicyPriceContext, REGISTRY,
};

use wiring::{
    AggregatorConfig, ChainlinkOracleReader, DriftVolatilityObserver, GasAwareRevalidator,
    GasNetProfitDecoder, NoL1DataFee,
};

/// Environment variable names.
mod env {
    pub const RPC_URL: &str = "RPC_URL";
    pub const SEND_RPC: &str = "SEND_RPC";
    pub const WS_URL: &str = "WS_URL";
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
    pub const POOL: &str = "POOL";
    pub const BALANCES_READER: &str = "BALANCES_READER";
    pub const LIQUIDATOR: &str = "LIQUIDATOR";
    pub const CHAIN_ID: &str = "CHAIN_ID";
    pub const WETH: &str = "WETH";
    // Compound V3 (Comet) adapter, enabled only when COMET_ADDRESS is set.
    pub const COMET_ADDRESS: &str = "COMET_ADDRESS";
    pub const COMET_BASE_TOKEN: &str = "COMET_BASE_TOKEN";
    pub const COMET_BASE_TOKEN_DECIMALS: &str = "COMET_BASE_TOKEN_DECIMALS";
    // Morpho Blue adapter, enabled only when every MORPHO_* var below is set.
    pub const MORPHO_ADDRESS: &str = "MORPHO_ADDRESS";
    pub const MORPHO_LOAN_TOKEN: &str = "MORPHO_LOAN_TOKEN";
    pub const MORPHO_LOAN_TOKEN_DECIMALS: &str = "MORPHO_LOAN_TOKEN_DECIMALS";
    pub const MORPHO_COLLATERAL_TOKEN: &str = "MORPHO_COLLATERAL_TOKEN";
    pub const MORPHO_COLLATERAL_TOKEN_DECIMALS: &str = "MORPHO_COLLATERAL_TOKEN_DECIMALS";
    pub const MORPHO_ORACLE: &str = "MORPHO_ORACLE";
    pub const MORPHO_IRM: &str = "MORPHO_IRM";
    pub const MORPHO_LLTV: &str = "MORPHO_LLTV";
}

struct Config {
    rpc_url: String,
    send_url: String,
    ws_url: String,
    chain_id: u64,
    pool: Address,
    weth: Address,
    balances_reader: Address,
    liquidator_contract: Address,
    private_key: String,
    comet_address: Option<Address>,
    comet_base_token: Option<Address>,
    comet_base_token_decimals: u8,
    morpho_address: Option<Address>,
    morpho_loan_token: Option<Address>,
    morpho_loan_token_decimals: u8,
    morpho_collateral_token: Option<Address>,
    morpho_collateral_token_decimals: u8,
    morpho_oracle: Option<Address>,
    morpho_irm: Option<Address>,
    morpho_lltv: Option<U256>,
}

fn load_config() -> Result<Config> {
    let get_env = |name: &str| -> Result<String> {
        std::env::var(name).map_err(|_| anyhow::anyhow!("Missing env var: {}", name))
    };
    let get_address = |name: &str| -> Result<Address> {
        get_env(name)?
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid address for {}: {}", name, e))
    };
    let opt_address = |name: &str| -> Option<Address> { std::env::var(name).ok()?.parse().ok() };
    let opt_u8 = |name: &str, default: u8| -> u8 {
        std::env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
    };

    Ok(Config {
        rpc_url: get_env(env::RPC_URL)?,
        send_url: std::env::var(env::SEND_RPC).unwrap_or_else(|_| get_env(env::RPC_URL).unwrap()),
        ws_url: get_env(env::WS_URL).unwrap_or_default(),
        chain_id: std::env::var(env::CHAIN_ID)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1),
        pool: get_address(env::POOL)?,
        weth: get_address(env::WETH)?,
        balances_reader: get_address(env::BALANCES_READER)?,
        liquidator_contract: get_address(env::LIQUIDATOR)?,
        private_key: get_env(env::PRIVATE_KEY)?,
        comet_address: opt_address(env::COMET_ADDRESS),
        comet_base_token: opt_address(env::COMET_BASE_TOKEN),
        comet_base_token_decimals: opt_u8(env::COMET_BASE_TOKEN_DECIMALS, 18),
        morpho_address: opt_address(env::MORPHO_ADDRESS),
        morpho_loan_token: opt_address(env::MORPHO_LOAN_TOKEN),
        morpho_loan_token_decimals: opt_u8(env::MORPHO_LOAN_TOKEN_DECIMALS, 18),
        morpho_collateral_token: opt_address(env::MORPHO_COLLATERAL_TOKEN),
        morpho_collateral_token_decimals: opt_u8(env::MORPHO_COLLATERAL_TOKEN_DECIMALS, 18),
        morpho_oracle: opt_address(env::MORPHO_ORACLE),
        morpho_irm: opt_address(env::MORPHO_IRM),
        morpho_lltv: std::env::var(env::MORPHO_LLTV).ok().and_then(|s| s.parse().ok()),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,liquidator_core=debug,liquidator_chain=debug")),
        )
        .init();

    info!("Starting liquidation engine");

    let config = load_config()?;
    run_chain(config).await
}

/// Spawns the engine's long-lived tasks for one chain and blocks until the
/// candidate-intake loop returns (on unrecoverable error or shutdown
/// signal). A multi-chain deployment runs one of these per configured
/// chain; nothing here is chain-singleton.
async fn run_chain(config: Config) -> Result<()> {
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Generic alloy provider, used by the Chainlink oracle reader and any
    // generic-`Provider` protocol adapter (Compound/Morpho). Aave's own
    // adapter uses the concrete `ProviderManager` helper-contract wrapper.
    let rpc_provider = Arc::new(ProviderBuilder::new().on_http(config.rpc_url.parse()?));
    let block = rpc_provider.get_block_number().await?;
    info!(chain_id = config.chain_id, block = block, "RPC connection verified");

    let provider_manager = Arc::new(
        ProviderManager::new(
            &config.rpc_url,
            &config.rpc_url,
            &config.send_url,
            &config.ws_url,
            config.pool,
            config.balances_reader,
        )
        .await?,
    );

    let tx_sender = Arc::new(
        TransactionSender::new(&config.private_key, &config.send_url, config.chain_id).await?,
    );
    info!(address = %tx_sender.address, "transaction sender initialized");

    let protocol_factory = ProtocolFactory::new();
    let aave_config = AaveV3ConfigBuilder::new("aave-v3")
        .chain_id(config.chain_id)
        .pool_address(config.pool)
        .balances_reader_address(config.balances_reader)
        .liquidator_address(config.liquidator_contract)
        .build();
    let aave_protocol = Arc::new(protocol_factory.create_aave_v3_with_sender(
        aave_config,
        provider_manager.clone(),
        tx_sender.clone(),
    ));

    // Every enabled adapter runs its own intake task below, all polling
    // concurrently into a single candidate queue. Aave is always on;
    // Compound V3 and Morpho Blue light up only when their deployment
    // addresses are present in the environment.
    let mut adapters: Vec<(ProtocolTag, Arc<dyn LiquidatableProtocol>)> =
        vec![(ProtocolTag::Aave, aave_protocol.clone() as Arc<dyn LiquidatableProtocol>)];

    if let Some(comet_address) = config.comet_address {
        let mut comet_builder = CompoundV3ConfigBuilder::new("compound-v3")
            .chain_id(config.chain_id)
            .comet_address(comet_address)
            .liquidator_address(config.liquidator_contract)
            .base_token(
                config.comet_base_token.unwrap_or(config.weth),
                config.comet_base_token_decimals,
            );
        for asset in REGISTRY.active_assets() {
            comet_builder = comet_builder.add_collateral_asset(CometAssetConfig {
                address: asset.token,
                decimals: asset.decimals,
                liquidate_collateral_factor_bps: 8_000,
                liquidation_bonus_bps: asset.liquidation_bonus_bps,
            });
        }
        let comet_protocol =
            protocol_factory.create_compound_v3(comet_builder.build(), rpc_provider.clone());
        adapters.push((ProtocolTag::CompoundV3, Arc::new(comet_protocol) as Arc<dyn LiquidatableProtocol>));
        info!(comet_address = %comet_address, "Compound V3 adapter enabled");
    }

    if let (Some(morpho_address), Some(loan_token), Some(collateral_token), Some(oracle), Some(irm), Some(lltv)) = (
        config.morpho_address,
        config.morpho_loan_token,
        config.morpho_collateral_token,
        config.morpho_oracle,
        config.morpho_irm,
        config.morpho_lltv,
    ) {
        let morpho_config = MorphoMarketConfigBuilder::new("morpho-blue")
            .chain_id(config.chain_id)
            .morpho_address(morpho_address)
            .liquidator_address(config.liquidator_contract)
            .loan_token(loan_token, config.morpho_loan_token_decimals)
            .collateral_token(collateral_token, config.morpho_collateral_token_decimals)
            .oracle(oracle)
            .irm(irm)
            .lltv(lltv)
            .liquidation_bonus_bps(REGISTRY.get_liquidation_bonus_bps(&collateral_token))
            .build();
        let morpho_protocol = protocol_factory.create_morpho_blue(morpho_config, rpc_provider.clone());
        adapters.push((ProtocolTag::MorphoBlue, Arc::new(morpho_protocol) as Arc<dyn LiquidatableProtocol>));
        info!(morpho_address = %morpho_address, "Morpho Blue adapter enabled");
    }

    // Price watcher: Chainlink oracle reader (populated lazily below as
    // assets are discovered) -> subgraph -> DEX-TWAP via the swap registry.
    let swap_registry = Arc::new(
        SwapRouterRegistry::new()
            .with_router(Arc::new(UniswapV3Router::new(config.rpc_url.clone(), config.chain_id))),
    );
    // Per-asset Chainlink aggregator addresses are ordinarily sourced from
    // the asset registry (out of scope here); left empty means every quote
    // falls through to the subgraph/DEX-TWAP tiers, which is a safe default.
    let aggregators: HashMap<Address, AggregatorConfig> = HashMap::new();
    let oracle_reader = Arc::new(ChainlinkOracleReader::new(
        config.chain_id,
        rpc_provider.clone(),
        config.weth,
        aggregators,
    ));
    let adaptive = Arc::new(AdaptiveThresholds::new());
    let volatility_observer = Arc::new(DriftVolatilityObserver::new(adaptive.clone(), 1.03, 300.0));

    let price_watcher = Arc::new(
        PriceWatcher::new(
            config.chain_id,
            config.weth,
            oracle_reader,
            swap_registry.clone(),
        )
        .with_volatility_observer(volatility_observer),
    );

    let policy = Arc::new(PolicyEngine::new());
    let ledger = Arc::new(AttemptLedger::new(4096));
    let dedup = Arc::new(CandidateDedup::with_default_ttl());
    let sequencer: Arc<dyn SequencerLiveness> = Arc::new(AlwaysUp);

    let gas_strategy = create_gas_strategy("Eip1559", 1.0, 200.0, Some(2.0));
    let coordinator = liquidator_chain::coordinator::spawn(
        ChainCoordinatorConfig {
            chain_id: config.chain_id,
            max_concurrent: 4,
            tx_timeout: Duration::from_secs(30),
            min_gas_price_wei: 1_000_000_000,
            max_gas_price_wei: 500_000_000_000,
            priority_fee_wei: 2_000_000_000,
        },
        tx_sender.clone(),
        gas_strategy,
        Some(Arc::new(NoL1DataFee)),
        Arc::new(GasAwareRevalidator::new(3_000.0)),
        Arc::new(GasNetProfitDecoder::new(0.0, 3_000.0)),
    );

    let blockanalitica = Arc::new(BlockAnaliticaClient::new());
    // The allowlist tracks every token this deployment knows how to price and
    // liquidate, sourced from the same asset registry the Chainlink/DEX price
    // tiers draw on; an empty allowlist here would reject every candidate at
    // policy check 5 regardless of profitability, so there is no safe "leave
    // it empty" default the way there is for the aggregator map above.
    let known_tokens: Vec<Address> = REGISTRY.active_assets().map(|asset| asset.token).collect();
    let chain_policy = ChainPolicyConfig {
        chain_id: config.chain_id,
        enabled: true,
        min_position_usd: 100.0,
        max_position_usd: 5_000_000.0,
        allowed_debt_tokens: known_tokens.clone(),
        allowed_collateral_tokens: known_tokens,
    };

    info!(adapters = adapters.len(), "all components initialized, entering intake loop");

    // One bounded queue shared by every adapter's intake task; run_chain
    // drains it below and runs the policy/simulate/submit pipeline generically
    // over whatever candidate arrives, regardless of which protocol found it.
    let (candidate_tx, mut candidate_rx) = tokio::sync::mpsc::channel::<IntakeItem>(256);

    let mut intake_handles = Vec::new();
    for (tag, protocol) in adapters {
        let tx = candidate_tx.clone();
        let blockanalitica = blockanalitica.clone();
        let chain_id = config.chain_id;
        let mut shutdown_rx = shutdown_tx.subscribe();
        intake_handles.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(Duration::from_secs(10)) => {
                        if let Err(err) = intake_scan(tag, chain_id, &protocol, &blockanalitica, &tx).await {
                            error!(protocol = tag.as_str(), error = %err, "intake scan failed");
                        }
                    }
                }
            }
        }));
    }
    drop(candidate_tx);

    let mut shutdown_rx = shutdown_tx.subscribe();
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("shutdown signal received");
                break;
            }
            item = candidate_rx.recv() => {
                let Some(item) = item else {
                    info!("all intake adapters exited, stopping");
                    break;
                };
                if let Err(err) = process_candidate(
                    item,
                    &config,
                    &dedup,
                    &policy,
                    &chain_policy,
                    &adaptive,
                    &price_watcher,
                    &swap_registry,
                    sequencer.as_ref(),
                    &ledger,
                    &coordinator,
                ).await {
                    error!(error = %err, "candidate processing failed");
                }
            }
        }
    }

    for handle in intake_handles {
        handle.abort();
    }

    Ok(())
}

/// A candidate paired with the protocol adapter that found it, so the
/// common admit/simulate/submit pipeline can call back into the right
/// protocol (e.g. to encode liquidation calldata) without knowing which
/// concrete adapter produced it.
struct IntakeItem {
    protocol: Arc<dyn LiquidatableProtocol>,
    candidate: Candidate,
    position_usd: f64,
}

/// One scan of a single adapter: fetch at-risk wallets and read this
/// protocol's view of each position, pushing discovered candidates onto
/// the shared queue. Runs independently per adapter so a slow or failing
/// protocol never blocks intake for the others.
async fn intake_scan(
    tag: ProtocolTag,
    chain_id: u64,
    protocol: &Arc<dyn LiquidatableProtocol>,
    blockanalitica: &BlockAnaliticaClient,
    tx: &tokio::sync::mpsc::Sender<IntakeItem>,
) -> Result<()> {
    let wallets = blockanalitica
        .fetch_all_approaching_liquidation(0.95, 1.05)
        .await?;

    for wallet in wallets {
        let Some(user) = wallet.address() else { continue };

        let position = match protocol.get_position(user).await {
            Ok(p) => p,
            Err(err) => {
                warn!(protocol = tag.as_str(), user = %user, error = %err, "position read failed, skipping candidate");
                continue;
            }
        };
        if position.collaterals.is_empty() || position.debts.is_empty() {
            continue;
        }

        let Some(largest_collateral) = position.largest_collateral() else { continue };
        let Some(largest_debt) = position.largest_debt() else { continue };

        let candidate = Candidate {
            borrower: user,
            chain_id,
            protocol: tag,
            debt: TokenLeg {
                token: largest_debt.asset,
                symbol: String::new(),
                decimals: largest_debt.decimals,
                amount: largest_debt.balance,
            },
            collateral: TokenLeg {
                token: largest_collateral.asset,
                symbol: String::new(),
                decimals: largest_collateral.decimals,
                amount: largest_collateral.balance,
            },
            health_factor: position.health_factor,
            market_id: None,
        };

        if tx
            .send(IntakeItem {
                protocol: protocol.clone(),
                position_usd: position.total_collateral_usd,
                candidate,
            })
            .await
            .is_err()
        {
            // Receiver gone, engine is shutting down.
            return Ok(());
        }
    }

    Ok(())
}

/// Run one candidate through admission, simulation, and execution. Shared
/// across every protocol adapter; all protocol-specific behavior is reached
/// through `item.protocol`'s trait methods.
#[allow(clippy::too_many_arguments)]
async fn process_candidate(
    item: IntakeItem,
    config: &Config,
    dedup: &CandidateDedup,
    policy: &PolicyEngine,
    chain_policy: &ChainPolicyConfig,
    adaptive: &AdaptiveThresholds,
    price_watcher: &PriceWatcher,
    swap_registry: &SwapRouterRegistry,
    sequencer: &dyn SequencerLiveness,
    ledger: &AttemptLedger,
    coordinator: &liquidator_chain::CoordinatorHandle,
) -> Result<()> {
    let protocol = item.protocol;
    let candidate = item.candidate;
    let user = candidate.borrower;

    if !dedup.admit(&candidate) {
        return Ok(());
    }

    let debt_price = price_watcher.price_usd(candidate.debt.token).await.ok();
    let collateral_price = price_watcher
        .price_usd(candidate.collateral.token)
        .await
        .ok();
    let prices = PolicyPriceContext {
        debt_price_usd: debt_price.as_ref().map(|q| q.price_usd),
        collateral_price_usd: collateral_price.as_ref().map(|q| q.price_usd),
        position_usd: item.position_usd,
        asset_key: format!("{:#x}", candidate.debt.token),
    };

    if let Err(reason) = policy.admit(
        &candidate,
        chain_policy,
        sequencer.is_up(),
        adaptive,
        &prices,
    ) {
        ledger.append(
            config.chain_id,
            candidate.dedup_key(),
            None,
            AttemptStatus::Rejected,
            format!("policy_skip:{}", reason.tag()),
        );
        return Ok(());
    }

    let (Some(debt_price_usd), Some(collateral_price_usd)) =
        (prices.debt_price_usd, prices.collateral_price_usd)
    else {
        return Ok(());
    };

    let liquidation_params = protocol.liquidation_params();
    let sim_input = SimInput {
        candidate: &candidate,
        debt_price_usd,
        collateral_price_usd,
        liquidation_bonus_bps: protocol
            .get_liquidation_bonus(candidate.collateral.token)
            .await
            .unwrap_or(liquidation_params.default_liquidation_bonus_bps),
        close_factor_rule: CloseFactorRule::Aave {
            normal: liquidation_params.close_factor,
            crisis_hf: 0.95,
            crisis: 1.0,
        },
        dust_floor: U256::from(1_000u64),
        chain_id: config.chain_id,
        gas_units: 600_000,
        gas_price_wei: 20_000_000_000,
        native_price_usd: 3_000.0,
        slippage_bps: 100,
        deadline_seconds: 60,
        min_net_usd: 20.0,
        pnl_multiple_min: 1.5,
        safety_margin_bps: 50,
        adaptive_snapshot: liquidator_core::simulator::AdaptiveSnapshot {
            health_factor_max: adaptive.health_factor_max(config.chain_id, &prices.asset_key, 1.0),
            gap_cap_bps: adaptive.gap_cap_bps(config.chain_id, &prices.asset_key, 300.0),
        },
    };

    let plan = match simulate(sim_input, swap_registry).await {
        Ok(plan) => plan,
        Err(reason) => {
            ledger.append(
                config.chain_id,
                candidate.dedup_key(),
                None,
                AttemptStatus::Rejected,
                reason.tag(),
            );
            return Ok(());
        }
    };

    let calldata: Bytes = match protocol.encode_liquidation(&LiquidationCallParams {
        user: candidate.borrower,
        collateral_asset: candidate.collateral.token,
        debt_asset: candidate.debt.token,
        debt_to_cover: plan.repay_amount,
        min_collateral_out: plan.expected_seized_collateral,
        swap_data: None,
        receive_atoken: false,
    }) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(user = %user, error = %err, "liquidation call encoding failed");
            return Ok(());
        }
    };

    let attempt_id = ledger.append(
        config.chain_id,
        candidate.dedup_key(),
        Some(plan.clone()),
        AttemptStatus::Submitted,
        "submitted",
    );

    let request = PlanRequest {
        dedup_key: format!("{:?}", candidate.dedup_key()),
        target: protocol.liquidation_target(),
        calldata,
        value: U256::ZERO,
        gas_units: 600_000,
        min_profit_usd: plan.net_profit_usd,
        deadline_unix: now_unix() + plan.deadline_seconds,
    };

    match coordinator.submit(request).await {
        Ok(outcome) => {
            info!(user = %user, outcome = ?outcome, "execution outcome");
            let (status, cause, tx_hash, realized_profit_usd) = outcome_to_ledger(&outcome);
            ledger.advance(attempt_id, status, tx_hash, None, realized_profit_usd);
            policy.impose_cooldown(candidate.dedup_key(), cause);
        }
        Err(err) => {
            error!(user = %user, error = %err, "coordinator submission failed");
        }
    }

    Ok(())
}

fn outcome_to_ledger(
    outcome: &liquidator_chain::ExecutionOutcome,
) -> (AttemptStatus, CooldownCause, Option<alloy::primitives::B256>, Option<f64>) {
    use liquidator_chain::ExecutionOutcome::*;
    match outcome {
        Confirmed { tx_hash, realized_profit_usd } => {
            (AttemptStatus::MinedOk, CooldownCause::Success, Some(*tx_hash), Some(*realized_profit_usd))
        }
        Reverted { tx_hash } => (AttemptStatus::MinedRevert, CooldownCause::Revert, Some(*tx_hash), None),
        Timeout => (AttemptStatus::Timeout, CooldownCause::Failure, None, None),
        Skipped { .. } | Failed { .. } => {
            (AttemptStatus::Rejected, CooldownCause::Failure, None, None)
        }
    }
}

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn print_banner() {
    println!(
        r#"
    ╦  ┬┌─┐ ┬ ┬┬┌┬┐┌─┐┌┬┐┌─┐┬─┐
    ║  │├┬┘ │││ │ │ ││├┤  ├┬┘
    ╩═╝┴┴└─ └┴┘ ┴ ┴ ┴ ┴ └─┘┴└─
    "#
    );
}
