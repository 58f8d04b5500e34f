// Outbound adapters for the two third-party sources: the airline reference
// table and the flight price API

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError { status_code: u16, message: String },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

// Envelope of the prices_for_dates response; offers stay untyped here so a
// single bad entry can be skipped later instead of failing the whole body
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PricesResponse {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuery {
    pub origin: String,
    pub destination: String,
    // Passed through verbatim, usually "YYYY-MM"
    pub departure_at: String,
    pub currency: String,
}

#[async_trait]
pub trait AirlineSource: Send + Sync + 'static {
    // Raw comma-separated airline table
    async fn fetch_airlines(&self) -> Result<Bytes, SourceError>;
}

#[async_trait]
pub trait PricingSource: Send + Sync + 'static {
    async fn prices_for_dates(
        &self,
        query: &PriceQuery,
    ) -> Result<Vec<serde_json::Value>, SourceError>;
}

fn http_client(timeout_ms: u64) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|e| SourceError::NetworkError(e.to_string()))
}

// The request URL carries the API token, so it is stripped before the error
// is turned into a message
fn transport_error(err: reqwest::Error, timeout_ms: u64) -> SourceError {
    if err.is_timeout() {
        SourceError::Timeout(timeout_ms)
    } else {
        SourceError::NetworkError(err.without_url().to_string())
    }
}

pub struct OpenFlightsClient {
    http: reqwest::Client,
    url: String,
    timeout_ms: u64,
}

impl OpenFlightsClient {
    pub fn new(url: impl Into<String>, timeout_ms: u64) -> Result<Self, SourceError> {
        Ok(Self {
            http: http_client(timeout_ms)?,
            url: url.into(),
            timeout_ms,
        })
    }
}

#[async_trait]
impl AirlineSource for OpenFlightsClient {
    async fn fetch_airlines(&self) -> Result<Bytes, SourceError> {
        debug!(url = %self.url, "fetching airline table");

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::ApiResponseError {
                status_code: status.as_u16(),
                message: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| transport_error(e, self.timeout_ms))
    }
}

pub struct TravelpayoutsClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    timeout_ms: u64,
}

impl TravelpayoutsClient {
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        timeout_ms: u64,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            http: http_client(timeout_ms)?,
            base_url: base_url.into(),
            api_token: api_token.into(),
            timeout_ms,
        })
    }
}

#[async_trait]
impl PricingSource for TravelpayoutsClient {
    async fn prices_for_dates(
        &self,
        query: &PriceQuery,
    ) -> Result<Vec<serde_json::Value>, SourceError> {
        debug!(
            origin = %query.origin,
            destination = %query.destination,
            departure_at = %query.departure_at,
            "requesting prices"
        );

        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("origin", query.origin.as_str()),
                ("destination", query.destination.as_str()),
                ("departure_at", query.departure_at.as_str()),
                ("currency", query.currency.as_str()),
                ("token", self.api_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "pricing source rejected request");
            return Err(SourceError::ApiResponseError {
                status_code: status.as_u16(),
                message,
            });
        }

        let body: PricesResponse = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidPayload(e.without_url().to_string()))?;

        if body.success == Some(false) {
            return Err(SourceError::ApiResponseError {
                status_code: status.as_u16(),
                message: body
                    .error
                    .unwrap_or_else(|| "request unsuccessful".to_string()),
            });
        }

        Ok(body.data)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::airline::{AirlineDirectory, DirectoryError};
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    // Serves the router on an ephemeral local port and returns its base URL
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn tpe_nrt_query() -> PriceQuery {
        PriceQuery {
            origin: "TPE".to_string(),
            destination: "NRT".to_string(),
            departure_at: "2024-06".to_string(),
            currency: "TWD".to_string(),
        }
    }

    async fn pricing_client(router: Router) -> TravelpayoutsClient {
        let base_url = serve(router).await;
        TravelpayoutsClient::new(format!("{}/prices_for_dates", base_url), "tok", 2_000).unwrap()
    }

    #[test]
    fn test_prices_envelope_keeps_offers_untyped() {
        let body = json!({
            "success": true,
            "currency": "twd",
            "data": [
                {"price": 5000, "flight_number": "CI101", "departure_at": "2024-06-01T08:00:00+08:00", "link": "/search?t=CI123"},
                {"price": "not a number"}
            ]
        });

        let response: PricesResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.success, Some(true));
        assert_eq!(response.data.len(), 2);
    }

    #[test]
    fn test_prices_envelope_without_data() {
        let response: PricesResponse =
            serde_json::from_str(r#"{"success": false, "error": "Unauthorized"}"#).unwrap();
        assert!(response.data.is_empty());
        assert_eq!(response.error.as_deref(), Some("Unauthorized"));
    }

    #[tokio::test]
    async fn test_mock_pricing_source_records_queries() {
        let source = mock_source::StaticPricingSource::with_offers(vec![json!({"price": 1})]);
        let query = PriceQuery {
            origin: "TPE".to_string(),
            destination: "NRT".to_string(),
            departure_at: "2024-06".to_string(),
            currency: "TWD".to_string(),
        };

        let offers = source.prices_for_dates(&query).await.unwrap();
        assert_eq!(offers.len(), 1);
        assert_eq!(source.calls(), vec![query]);
    }

    #[tokio::test]
    async fn test_pricing_client_sends_query_parameters() {
        // Echoes the query string back as the single offer
        let router = Router::new().route(
            "/prices_for_dates",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                Json(json!({"success": true, "data": [params]}))
            }),
        );
        let client = pricing_client(router).await;

        let offers = client.prices_for_dates(&tpe_nrt_query()).await.unwrap();

        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0]["origin"], "TPE");
        assert_eq!(offers[0]["destination"], "NRT");
        assert_eq!(offers[0]["departure_at"], "2024-06");
        assert_eq!(offers[0]["currency"], "TWD");
        assert_eq!(offers[0]["token"], "tok");
    }

    #[tokio::test]
    async fn test_pricing_client_unsuccessful_envelope() {
        let router = Router::new().route(
            "/prices_for_dates",
            get(|| async { Json(json!({"success": false, "error": "bad token"})) }),
        );
        let client = pricing_client(router).await;

        let err = client.prices_for_dates(&tpe_nrt_query()).await.unwrap_err();

        assert_eq!(
            err,
            SourceError::ApiResponseError {
                status_code: 200,
                message: "bad token".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_pricing_client_non_success_status() {
        let router = Router::new().route(
            "/prices_for_dates",
            get(|| async { (StatusCode::UNAUTHORIZED, "Unauthorized") }),
        );
        let client = pricing_client(router).await;

        let err = client.prices_for_dates(&tpe_nrt_query()).await.unwrap_err();

        assert_eq!(
            err,
            SourceError::ApiResponseError {
                status_code: 401,
                message: "Unauthorized".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_pricing_client_missing_data_is_empty() {
        let router = Router::new().route(
            "/prices_for_dates",
            get(|| async { Json(json!({"success": true})) }),
        );
        let client = pricing_client(router).await;

        let offers = client.prices_for_dates(&tpe_nrt_query()).await.unwrap();
        assert!(offers.is_empty());
    }

    #[tokio::test]
    async fn test_pricing_client_rejects_non_json_body() {
        let router = Router::new().route("/prices_for_dates", get(|| async { "<html>oops</html>" }));
        let client = pricing_client(router).await;

        let err = client.prices_for_dates(&tpe_nrt_query()).await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_airline_client_builds_directory() {
        let router = Router::new().route(
            "/airlines.dat",
            get(|| async {
                "1308,\"China Airlines\",\\N,\"CI\",\"CAL\",\"DYNASTY\",\"Taiwan\",\"Y\"\n"
            }),
        );
        let base_url = serve(router).await;
        let client = OpenFlightsClient::new(format!("{}/airlines.dat", base_url), 2_000).unwrap();

        let directory = AirlineDirectory::build(&client).await.unwrap();

        assert_eq!(directory.len(), 1);
        assert_eq!(directory.lookup("CI").name_english, "China Airlines");
    }

    #[tokio::test]
    async fn test_airline_client_non_success_status_is_source_unavailable() {
        let router = Router::new().route(
            "/airlines.dat",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base_url = serve(router).await;
        let client = OpenFlightsClient::new(format!("{}/airlines.dat", base_url), 2_000).unwrap();

        let err = client.fetch_airlines().await.unwrap_err();
        assert_eq!(
            err,
            SourceError::ApiResponseError {
                status_code: 500,
                message: "Internal Server Error".to_string()
            }
        );

        let result = AirlineDirectory::build(&client).await;
        match result {
            Err(DirectoryError::SourceUnavailable(message)) => assert!(message.contains("500")),
            other => panic!("Expected SourceUnavailable, got {:?}", other),
        }
    }
}
