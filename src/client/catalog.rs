use crate::models::Item;
use reqwest::Client;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("network error: {0}")]
    Network(String),
    #[error("catalog error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Keep items priced at or above `min_price`
pub fn apply_min_price(items: Vec<Item>, min_price: f64) -> Vec<Item> {
    items.into_iter().filter(|i| i.price >= min_price).collect()
}

/// Client for the remote catalog search endpoint
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: Client,
    base_url: String,
    min_price: f64,
}

impl CatalogClient {
    pub fn new(http: Client, base_url: impl Into<String>, min_price: f64) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            min_price,
        }
    }

    pub fn min_price(&self) -> f64 {
        self.min_price
    }

    /// Search the catalog, dropping items below the minimum price.
    ///
    /// A blank query makes no request and returns no items.
    pub async fn search(&self, query: &str) -> Result<Vec<Item>, CatalogError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let resp = self
            .http
            .get(&self.base_url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(CatalogError::Api(
                resp.status().as_u16(),
                resp.text().await.unwrap_or_default(),
            ));
        }

        let items: Vec<Item> = resp
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;
        let total = items.len();
        let items = apply_min_price(items, self.min_price);

        tracing::info!(
            "Catalog search {:?}: {} results, {} after price filter (>= {})",
            query,
            total,
            items.len(),
            self.min_price
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_filter_is_inclusive_at_threshold() {
        let items = [5.0, 10.0, 9.99, 10.01]
            .iter()
            .enumerate()
            .map(|(i, p)| Item::new(format!("item-{i}"), "X", *p))
            .collect();

        let prices: Vec<f64> = apply_min_price(items, 10.0)
            .into_iter()
            .map(|i| i.price)
            .collect();

        assert_eq!(prices, vec![10.0, 10.01]);
    }

    #[tokio::test]
    async fn blank_query_returns_nothing_without_a_request() {
        // unroutable address: any request would fail
        let client = CatalogClient::new(Client::new(), "http://127.0.0.1:9/", 10.0);

        assert!(client.search("").await.unwrap().is_empty());
        assert!(client.search("   ").await.unwrap().is_empty());
    }
}
