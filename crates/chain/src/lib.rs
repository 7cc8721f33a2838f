//! Multi-protocol chain interaction layer.
//!
//! This crate provides:
//! - Protocol adapters (`protocol`): AAVE V3, Compound V3, Morpho Blue
//! - Oracle reads (`oracle`): Chainlink aggregators, tiered fallback config
//! - Gas pricing strategies (`gas`): Legacy and EIP-1559
//! - Execution (`coordinator`, `signer`): nonce/gas management, atomic
//!   executor-contract submission, timeout-bump-resubmit
//! - Sequencer liveness gate (`sequencer`) for rollup deployments
//! - Contract bindings (`contracts`)

pub mod contracts;
pub mod coordinator;
pub mod gas;
pub mod oracle;
pub mod protocol;
mod provider;
pub mod sequencer;
pub mod signer;

pub use contracts::{
    event_signatures, LiquidatorContract, OracleAggregator, PoolContract, SwapAllocation,
};
pub use coordinator::{
    ChainCoordinatorConfig, CoordinatorHandle, ExecutionOutcome, L1GasOracle, PlanRequest,
    ProfitDecoder, Revalidator,
};
pub use provider::{BalanceData, ProviderManager};
pub use sequencer::{AlwaysUp, SequencerGate, SequencerLiveness, SequencerStatus};
pub use signer::TransactionSender;
