use crate::{
    error::FetchError,
    models::{TransactionRecord, TransactionsResponse},
};
use async_trait::async_trait;
use std::time::Duration;

/// Source of the most recent transactions on the receiving address.
#[async_trait]
pub trait ChainTransactionFetcher: Send + Sync {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<TransactionRecord>, FetchError>;
}

/// TonAPI-compatible explorer client.
pub struct TonApiFetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    address: String,
}

impl TonApiFetcher {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        address: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            address: address.to_string(),
        })
    }
}

#[async_trait]
impl ChainTransactionFetcher for TonApiFetcher {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<TransactionRecord>, FetchError> {
        let url = format!("{}/accounts/{}/transactions", self.base_url, self.address);

        let mut request = self.client.get(&url).query(&[("limit", limit)]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: TransactionsResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        let records = parsed.into_records();
        tracing::debug!("Fetched {} transactions for {}", records.len(), self.address);

        Ok(records)
    }
}
