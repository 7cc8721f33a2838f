//! GraphQL client against a lending protocol's subgraph.
//!
//! Grounded on `blockanalitica.rs`'s reqwest-client-plus-base-url shape; the
//! teacher never talks to a subgraph so the POST-body-and-parse logic here is
//! new, following the same `serde_json`-typed-response pattern.

use alloy::primitives::Address;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// One subgraph endpoint, scoped to a single protocol deployment on a
/// single chain (e.g. Aave v3's Arbitrum subgraph).
#[derive(Debug, Clone)]
pub struct SubgraphConfig {
    pub url: String,
    pub chain_id: u64,
}

/// Thin GraphQL client for reading an asset's oracle-reported USD price off
/// a protocol subgraph, used as the second-tier price fallback.
#[derive(Debug, Clone)]
pub struct SubgraphClient {
    client: reqwest::Client,
    config: SubgraphConfig,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ReservePriceData {
    reserve: Option<ReservePrice>,
}

#[derive(Debug, Deserialize)]
struct ReservePrice {
    #[serde(rename = "priceInUsd")]
    price_in_usd: Option<String>,
}

impl SubgraphClient {
    pub fn new(config: SubgraphConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    /// Query the subgraph's reserve/market entity for `token`'s oracle
    /// price, denominated directly in USD (Aave-style subgraphs expose
    /// `priceInUsd` on the reserve entity).
    pub async fn fetch_price_usd(&self, token: Address) -> Result<f64> {
        let reserve_id = format!("{:#x}", token).to_lowercase();
        let query = r#"
            query ReservePrice($id: ID!) {
                reserve(id: $id) {
                    priceInUsd
                }
            }
        "#;
        let body = json!({
            "query": query,
            "variables": { "id": reserve_id },
        });

        let response = self.client.post(&self.config.url).json(&body).send().await?;
        let parsed: GraphQlResponse<ReservePriceData> = response.json().await?;

        if let Some(errors) = parsed.errors {
            let joined = errors.into_iter().map(|e| e.message).collect::<Vec<_>>().join("; ");
            return Err(anyhow!("subgraph returned errors: {joined}"));
        }

        let price_str = parsed
            .data
            .and_then(|d| d.reserve)
            .and_then(|r| r.price_in_usd)
            .ok_or_else(|| anyhow!("subgraph has no reserve entry for {token}"))?;

        let price: f64 = price_str
            .parse()
            .map_err(|_| anyhow!("subgraph returned unparseable price {price_str:?} for {token}"))?;

        debug!(token = %token, price_usd = price, "subgraph price fetched");
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_id_is_lowercased_hex() {
        let token = Address::repeat_byte(0xAB);
        let id = format!("{:#x}", token).to_lowercase();
        assert!(id.starts_with("0x"));
        assert_eq!(id, id.to_lowercase());
    }
}
