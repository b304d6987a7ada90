//! Live exchange-rate lookup against a Frankfurter-compatible endpoint.

use std::{collections::HashMap, str::FromStr, time::Duration};

use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{macros::format_description, Date};

use crate::util::version::user_agent;

const DEFAULT_BASE_URL: &str = "https://api.frankfurter.app/";
const DEFAULT_TIMEOUT_MS: u64 = 2_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxSettings {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_ms: u64,
    /// Currency the rate is quoted from.
    pub base: String,
    /// Currency the rate is quoted in.
    pub quote: String,
}

impl Default for FxSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_BASE_URL.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            base: "USD".into(),
            quote: "KRW".into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FxClientError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("response has no {0} rate")]
    MissingCurrency(String),
    #[error("rate {0:?} is not a number")]
    InvalidRate(String),
    #[error("invalid as-of date {0:?}")]
    InvalidDate(String),
}

/// One published rate: `quote` units per `base` unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FxQuote {
    pub rate: Decimal,
    pub as_of: Date,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    date: String,
    #[serde(default)]
    rates: HashMap<String, serde_json::Value>,
}

#[derive(Clone, Debug)]
pub struct FxClient {
    http: Client,
    base_url: Url,
    base: String,
    quote: String,
}

impl FxClient {
    pub fn new(settings: &FxSettings) -> Result<Self, FxClientError> {
        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;
        Ok(Self {
            http,
            base_url: parse_base_url(&settings.base_url)?,
            base: settings.base.clone(),
            quote: settings.quote.clone(),
        })
    }

    pub fn with_base_url(base: &str) -> Result<Self, FxClientError> {
        Self::new(&FxSettings {
            base_url: base.to_string(),
            ..FxSettings::default()
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn latest(&self) -> Result<FxQuote, FxClientError> {
        let mut url = self.base_url.join("latest")?;
        url.query_pairs_mut()
            .append_pair("from", &self.base)
            .append_pair("to", &self.quote);

        let response = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<LatestResponse>()
            .await?;

        let raw = response
            .rates
            .get(&self.quote)
            .ok_or_else(|| FxClientError::MissingCurrency(self.quote.clone()))?;
        let rate = parse_rate(raw)?;

        let as_of = Date::parse(&response.date, format_description!("[year]-[month]-[day]"))
            .map_err(|_| FxClientError::InvalidDate(response.date.clone()))?;

        tracing::debug!(base = %self.base, quote = %self.quote, %rate, %as_of, "fetched live exchange rate");
        Ok(FxQuote { rate, as_of })
    }
}

// `join` drops the last path segment unless the base ends with a slash.
fn parse_base_url(base: &str) -> Result<Url, url::ParseError> {
    if base.ends_with('/') {
        Url::parse(base)
    } else {
        Url::parse(&format!("{base}/"))
    }
}

fn parse_rate(raw: &serde_json::Value) -> Result<Decimal, FxClientError> {
    let text = match raw {
        serde_json::Value::Number(number) => number.to_string(),
        serde_json::Value::String(text) => text.clone(),
        other => return Err(FxClientError::InvalidRate(other.to_string())),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| FxClientError::InvalidRate(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use time::macros::date;

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = FxClient::with_base_url("http://localhost:9000/fx").unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:9000/fx/");
        assert_eq!(
            client.base_url().join("latest").unwrap().as_str(),
            "http://localhost:9000/fx/latest"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            FxClient::with_base_url("not a url"),
            Err(FxClientError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn parses_latest_rate() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/latest")
                    .query_param("from", "USD")
                    .query_param("to", "KRW");
                then.status(200).json_body(json!({
                    "amount": 1.0,
                    "base": "USD",
                    "date": "2025-09-12",
                    "rates": { "KRW": 1392.5 }
                }));
            })
            .await;

        let client = FxClient::with_base_url(&server.base_url()).unwrap();
        let quote = client.latest().await.unwrap();

        assert_eq!(quote.rate, dec!(1392.5));
        assert_eq!(quote.as_of, date!(2025 - 09 - 12));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_currency_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/latest");
                then.status(200).json_body(json!({
                    "amount": 1.0,
                    "base": "USD",
                    "date": "2025-09-12",
                    "rates": { "EUR": 0.85 }
                }));
            })
            .await;

        let client = FxClient::with_base_url(&server.base_url()).unwrap();
        let err = client.latest().await.unwrap_err();
        assert!(matches!(err, FxClientError::MissingCurrency(ref code) if code == "KRW"));
    }

    #[tokio::test]
    async fn server_error_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/latest");
                then.status(503).body("Service Unavailable");
            })
            .await;

        let client = FxClient::with_base_url(&server.base_url()).unwrap();
        assert!(matches!(
            client.latest().await,
            Err(FxClientError::Http(_))
        ));
    }

    #[tokio::test]
    async fn bad_date_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/latest");
                then.status(200).json_body(json!({
                    "date": "12/09/2025",
                    "rates": { "KRW": 1392.5 }
                }));
            })
            .await;

        let client = FxClient::with_base_url(&server.base_url()).unwrap();
        assert!(matches!(
            client.latest().await,
            Err(FxClientError::InvalidDate(_))
        ));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/latest");
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .json_body(json!({ "date": "2025-09-12", "rates": { "KRW": 1392.5 } }));
            })
            .await;

        let client = FxClient::new(&FxSettings {
            base_url: server.base_url(),
            timeout_ms: 50,
            ..FxSettings::default()
        })
        .unwrap();
        assert!(matches!(
            client.latest().await,
            Err(FxClientError::Http(_))
        ));
    }

    #[test]
    fn rate_accepts_numbers_and_strings() {
        assert_eq!(parse_rate(&json!(1380)).unwrap(), dec!(1380));
        assert_eq!(parse_rate(&json!("1402.75")).unwrap(), dec!(1402.75));
        assert!(parse_rate(&json!(null)).is_err());
    }
}
