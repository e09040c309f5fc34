//! Single-endpoint JSON transport shared by the Midgard and Thornode clients

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thorchain_core::{ClientError, EndpointConfig};

use crate::failover::Failover;
use crate::Result;

/// Responses that can carry an error reported by the remote service instead
/// of a value (quote endpoints answer `{"error": "..."}` on bad input)
pub trait RemoteError: Default {
    fn set_error(&mut self, message: String);

    fn from_remote_error(message: String) -> Self {
        let mut value = Self::default();
        value.set_error(message);
        value
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// One base URL plus a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    base_url: String,
    http: reqwest::Client,
}

impl HttpEndpoint {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Unreachable {
                url: base_url.clone(),
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a failover list from endpoint configuration
    pub fn failover(service: &'static str, config: &EndpointConfig) -> Result<Failover<Self>> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let endpoints = config
            .base_urls
            .iter()
            .map(|url| Self::new(url.as_str(), timeout))
            .collect::<Result<Vec<_>>>()?;
        Ok(Failover::new(service, endpoints))
    }

    async fn send(&self, path: &str, query: &[(&str, String)]) -> Result<(String, StatusCode, String)> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| ClientError::Unreachable {
                url: url.clone(),
                message: e.to_string(),
            })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| ClientError::ParseError {
            url: url.clone(),
            message: format!("Failed to read body: {}", e),
        })?;
        Ok((url, status, body))
    }

    /// GET a JSON document; any non-success status is an error
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let (url, status, body) = self.send(path, query).await?;
        if !status.is_success() {
            return Err(ClientError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }
        parse_body(&url, &body)
    }

    /// GET a JSON document, mapping 404 to `None`
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let (url, status, body) = self.send(path, query).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ClientError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }
        parse_body(&url, &body).map(Some)
    }

    /// GET a quote-style document. A non-success status whose body names an
    /// error is returned as a value carrying that error, not as a failure.
    pub async fn get_quote<T: DeserializeOwned + RemoteError>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let (url, status, body) = self.send(path, query).await?;
        if status.is_success() {
            return parse_body(&url, &body);
        }
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody {
                error: Some(message),
                ..
            })
            | Ok(ErrorBody {
                message: Some(message),
                ..
            }) => Ok(T::from_remote_error(message)),
            _ => Err(ClientError::HttpStatus {
                url,
                status: status.as_u16(),
            }),
        }
    }
}

fn parse_body<T: DeserializeOwned>(url: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| ClientError::ParseError {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Append `key=value` to a query list when the value is present
pub(crate) fn push_opt<V: ToString>(query: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<V>) {
    if let Some(v) = value {
        query.push((key, v.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    struct Quote {
        memo: Option<String>,
        error: Option<String>,
    }

    impl RemoteError for Quote {
        fn set_error(&mut self, message: String) {
            self.error = Some(message);
        }
    }

    #[test]
    fn test_from_remote_error() {
        let quote = Quote::from_remote_error("not enough asset to pay for fees".to_string());
        assert!(quote.memo.is_none());
        assert_eq!(quote.error.as_deref(), Some("not enough asset to pay for fees"));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let ep = HttpEndpoint::new("https://thornode.ninerealms.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(ep.base_url(), "https://thornode.ninerealms.com");
    }

    #[test]
    fn test_failover_from_config() {
        let config = EndpointConfig::new(&["http://a", "http://b"]);
        let failover = HttpEndpoint::failover("midgard", &config).unwrap();
        assert_eq!(failover.endpoints().len(), 2);
        assert_eq!(failover.endpoints()[1].base_url(), "http://b");
    }

    #[test]
    fn test_push_opt() {
        let mut query = Vec::new();
        push_opt(&mut query, "height", Some(42u64));
        push_opt::<u64>(&mut query, "missing", None);
        assert_eq!(query, vec![("height", "42".to_string())]);
    }

    #[test]
    fn test_parse_body_error() {
        let err = parse_body::<Quote>("http://x", "not json").unwrap_err();
        assert!(matches!(err, ClientError::ParseError { .. }));
    }
}
