//! Core decision pipeline for the liquidation engine.
//!
//! This crate owns the chain-agnostic data model and decision logic:
//! - Candidate model and cross-adapter dedup
//! - Adaptive, volatility-aware admission thresholds
//! - Policy engine (ordered admission checks, cooldowns)
//! - Simulator (repay-size optimization, route selection, profit accounting)
//! - Append-only attempt ledger
//! - Typed error taxonomy at the policy/simulator/ledger boundary
//! - Asset registry with oracle configurations

mod adaptive;
mod assets;
pub mod candidate;
pub mod config;
mod error;
mod ledger;
mod policy;
pub mod simulator;
pub mod u256_math;

pub use adaptive::{AdaptiveState, AdaptiveThresholds};
pub use assets::{Asset, AssetRegistry, OracleType, ASSETS, REGISTRY};
pub use candidate::{Candidate, CandidateDedup, DedupKey, ProtocolTag, TokenLeg};
pub use config::{BotConfig, config, init_config};
pub use error::EngineError;
pub use ledger::{AttemptLedger, AttemptStatus, ChainHealth, ExecutionAttempt, LedgerStats};
pub use policy::{ChainPolicyConfig, CooldownCause, PolicyEngine, PolicyPriceContext, PolicyRejectReason};
pub use simulator::{AdaptiveSnapshot, CloseFactorRule, Plan, RouteLeg, SimInput, SimRejectReason};
