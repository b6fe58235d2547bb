use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::core::rates::{RateFetcher, RateSource, RateTable};
use crate::providers::fallback::fallback_rates;

pub const DEFAULT_BASE_URL: &str = "https://v6.exchangerate-api.com/v6";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: String,
    #[serde(default)]
    conversion_rates: Option<HashMap<String, f64>>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
}

// Fetches "latest rates for base" from an exchangerate-api style endpoint
pub struct ExchangeRateApiFetcher {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ExchangeRateApiFetcher {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("xrate/0.1")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
            client,
        })
    }

    fn latest_url(&self, base_currency: &str) -> String {
        match &self.api_key {
            Some(key) => format!("{}/{}/latest/{}", self.base_url, key, base_currency),
            None => format!("{}/latest/{}", self.base_url, base_currency),
        }
    }

    /// Fetches and parses the provider's latest rates, failing on any deviation.
    pub async fn fetch_latest(&self, base_currency: &str) -> Result<RateTable> {
        let url = self.latest_url(base_currency);
        debug!("Requesting exchange rates for {}", base_currency);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for base currency: {}", e, base_currency))?;

        if !response.status().is_success() {
            bail!(
                "HTTP error: {} for base currency: {}",
                response.status(),
                base_currency
            );
        }

        let text = response.text().await?;
        let data: LatestRatesResponse = serde_json::from_str(&text).map_err(|e| {
            anyhow!(
                "Failed to parse JSON response for {}: {}",
                base_currency,
                e
            )
        })?;

        if data.result != "success" {
            bail!(
                "Provider error: {} for base currency: {}",
                data.error_type.as_deref().unwrap_or("unknown"),
                base_currency
            );
        }

        let rates = data
            .conversion_rates
            .ok_or_else(|| anyhow!("No conversion rates for base currency: {}", base_currency))?;

        let table = RateTable::from_base_rates(
            base_currency,
            RateSource::Provider,
            rates.iter().map(|(code, rate)| (code.as_str(), *rate)),
        );

        if table.is_empty() {
            bail!("No usable rates for base currency: {}", base_currency);
        }

        Ok(table)
    }
}

#[async_trait]
impl RateFetcher for ExchangeRateApiFetcher {
    #[instrument(name = "ExchangeRateFetch", skip(self), fields(base = %base_currency))]
    async fn fetch(&self, base_currency: &str) -> RateTable {
        match self.fetch_latest(base_currency).await {
            Ok(table) => {
                info!(entries = table.len(), "Fetched exchange rates from provider");
                table
            }
            Err(e) => {
                warn!(error = %e, "Exchange rate fetch failed, using fallback rates");
                fallback_rates(base_currency)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API_KEY: &str = "test-key";

    async fn mount(server: &MockServer, base: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(format!("/{API_KEY}/latest/{base}")))
            .respond_with(response)
            .mount(server)
            .await;
    }

    fn fetcher(server: &MockServer) -> ExchangeRateApiFetcher {
        ExchangeRateApiFetcher::new(&server.uri(), Some(API_KEY), Duration::from_millis(500))
            .expect("client should build")
    }

    #[tokio::test]
    async fn test_successful_fetch_flattens_rates() {
        let mock_server = MockServer::start().await;
        let body = r#"{
            "result": "success",
            "base_code": "USD",
            "conversion_rates": {
                "USD": 1,
                "KES": 129.5,
                "UGX": 3712.25,
                "EUR": 0.9213
            }
        }"#;
        mount(
            &mock_server,
            "USD",
            ResponseTemplate::new(200).set_body_string(body),
        )
        .await;

        let table = fetcher(&mock_server).fetch("USD").await;
        assert_eq!(table.source(), RateSource::Provider);
        assert_eq!(table.base(), "USD");
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("USD", "KES"), Some(129.5));
        assert_eq!(table.get("USD", "UGX"), Some(3712.25));
        assert!(!table.contains("USD", "USD"));
    }

    #[tokio::test]
    async fn test_fetch_without_api_key() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest/EUR"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"result": "success", "conversion_rates": {"EUR": 1, "GBP": 0.85}}"#,
            ))
            .mount(&mock_server)
            .await;

        let fetcher =
            ExchangeRateApiFetcher::new(&format!("{}/", mock_server.uri()), None, DEFAULT_TIMEOUT)
                .unwrap();
        let table = fetcher.fetch_latest("EUR").await.unwrap();
        assert_eq!(table.get("EUR", "GBP"), Some(0.85));
    }

    #[tokio::test]
    async fn test_http_error_uses_fallback() {
        let mock_server = MockServer::start().await;
        mount(&mock_server, "USD", ResponseTemplate::new(500)).await;

        let fetcher = fetcher(&mock_server);
        let err = fetcher.fetch_latest("USD").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "HTTP error: 500 Internal Server Error for base currency: USD"
        );

        let table = fetcher.fetch("USD").await;
        assert_eq!(table.source(), RateSource::Fallback);
        assert!(table.contains("USD", "KES"));
        assert!(table.contains("USD", "UGX"));
    }

    #[tokio::test]
    async fn test_provider_error_uses_fallback() {
        let mock_server = MockServer::start().await;
        mount(
            &mock_server,
            "USD",
            ResponseTemplate::new(200)
                .set_body_string(r#"{"result": "error", "error-type": "invalid-key"}"#),
        )
        .await;

        let fetcher = fetcher(&mock_server);
        let err = fetcher.fetch_latest("USD").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Provider error: invalid-key for base currency: USD"
        );
        assert_eq!(fetcher.fetch("USD").await.source(), RateSource::Fallback);
    }

    #[tokio::test]
    async fn test_malformed_response_uses_fallback() {
        let mock_server = MockServer::start().await;
        mount(
            &mock_server,
            "USD",
            ResponseTemplate::new(200)
                .set_body_string(r#"{"result": "success", "conversion_rates": {"KES": "lots"}}"#),
        )
        .await;

        let fetcher = fetcher(&mock_server);
        let err = fetcher.fetch_latest("USD").await.unwrap_err();
        assert!(
            err.to_string()
                .contains("Failed to parse JSON response for USD")
        );
        assert_eq!(fetcher.fetch("USD").await.source(), RateSource::Fallback);
    }

    #[tokio::test]
    async fn test_missing_or_empty_rates_use_fallback() {
        let mock_server = MockServer::start().await;
        mount(
            &mock_server,
            "USD",
            ResponseTemplate::new(200).set_body_string(r#"{"result": "success"}"#),
        )
        .await;
        mount(
            &mock_server,
            "KES",
            ResponseTemplate::new(200).set_body_string(
                r#"{"result": "success", "conversion_rates": {"KES": 1, "UGX": 0}}"#,
            ),
        )
        .await;

        let fetcher = fetcher(&mock_server);
        assert!(fetcher.fetch_latest("USD").await.is_err());
        let err = fetcher.fetch_latest("KES").await.unwrap_err();
        assert_eq!(err.to_string(), "No usable rates for base currency: KES");
        assert_eq!(fetcher.fetch("KES").await.source(), RateSource::Fallback);
    }

    #[tokio::test]
    async fn test_timeout_uses_fallback() {
        let mock_server = MockServer::start().await;
        mount(
            &mock_server,
            "USD",
            ResponseTemplate::new(200)
                .set_body_string(r#"{"result": "success", "conversion_rates": {"KES": 1}}"#)
                .set_delay(Duration::from_secs(2)),
        )
        .await;

        let fetcher = ExchangeRateApiFetcher::new(
            &mock_server.uri(),
            Some(API_KEY),
            Duration::from_millis(100),
        )
        .unwrap();
        let table = fetcher.fetch("USD").await;
        assert_eq!(table.source(), RateSource::Fallback);
        assert_eq!(table.get("USD", "KES"), Some(130.0));
    }

    #[tokio::test]
    async fn test_connection_refused_uses_fallback() {
        // Reserve a free port, then close it so nothing is listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher =
            ExchangeRateApiFetcher::new(&format!("http://{addr}"), Some(API_KEY), DEFAULT_TIMEOUT)
                .unwrap();
        let err = fetcher.fetch_latest("KES").await.unwrap_err();
        assert!(err.to_string().starts_with("Request error:"));
        assert!(err.to_string().ends_with("for base currency: KES"));

        let table = fetcher.fetch("KES").await;
        assert_eq!(table.source(), RateSource::Fallback);
        assert_eq!(table.base(), "KES");
        assert!(table.contains("KES", "UGX"));
    }
}
