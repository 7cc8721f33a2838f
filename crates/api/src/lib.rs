//! HTTP/RPC clients consumed by the decision pipeline in `liquidator-core`.
//!
//! This crate provides:
//! - `pricing`: oracle/subgraph/DEX-TWAP price fallback chain
//! - `swap`: trait-based multi-router swap route quoting
//! - BlockAnalitica: at-risk wallet discovery (candidate intake source)

mod blockanalitica;
mod liqd;
pub mod pricing;
pub mod swap;

pub use blockanalitica::{AtRiskWallet, BlockAnaliticaClient, PositionDistribution, ProfitabilityFilter, WalletAsset, WalletStats};
pub use pricing::{PriceQuote, PriceSource, PriceWatcher};
pub use swap::{SwapParams, SwapRoute, SwapRouter, SwapRouterRegistry};
