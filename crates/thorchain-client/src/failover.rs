//! Ordered endpoint failover
//!
//! Every upstream service is configured with a list of base URLs. A request
//! is tried against each in order and the first success wins; only when all
//! of them fail does the caller see an error.

use std::future::Future;

use thorchain_core::ClientError;

use crate::Result;

/// Strategy object over an ordered list of endpoint clients
#[derive(Debug, Clone)]
pub struct Failover<E> {
    service: &'static str,
    endpoints: Vec<E>,
}

impl<E> Failover<E> {
    pub fn new(service: &'static str, endpoints: Vec<E>) -> Self {
        Self { service, endpoints }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn endpoints(&self) -> &[E] {
        &self.endpoints
    }

    /// Run `op` against each endpoint in order, returning the first success
    pub async fn first_success<'a, T, F, Fut>(&'a self, mut op: F) -> Result<T>
    where
        F: FnMut(&'a E) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.endpoints.is_empty() {
            return Err(ClientError::NoEndpoints {
                service: self.service,
            });
        }

        let mut last_error = None;
        for (index, endpoint) in self.endpoints.iter().enumerate() {
            match op(endpoint).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::debug!(
                        service = self.service,
                        endpoint = index,
                        "Endpoint failed, trying next: {}",
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        let last = last_error.map(|e| e.to_string()).unwrap_or_default();
        tracing::warn!(service = self.service, "All endpoints failed: {}", last);
        Err(ClientError::AllEndpointsFailed {
            service: self.service,
            attempts: self.endpoints.len(),
            last,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeEndpoint {
        name: &'static str,
        healthy: bool,
        calls: AtomicUsize,
    }

    impl FakeEndpoint {
        fn new(name: &'static str, healthy: bool) -> Self {
            Self {
                name,
                healthy,
                calls: AtomicUsize::new(0),
            }
        }

        async fn fetch(&self) -> Result<&'static str> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.healthy {
                Ok(self.name)
            } else {
                Err(ClientError::Unreachable {
                    url: self.name.to_string(),
                    message: "connection refused".to_string(),
                })
            }
        }
    }

    #[tokio::test]
    async fn test_first_healthy_endpoint_wins() {
        let failover = Failover::new(
            "thornode",
            vec![
                FakeEndpoint::new("a", false),
                FakeEndpoint::new("b", true),
                FakeEndpoint::new("c", true),
            ],
        );

        let result = failover.first_success(|ep| ep.fetch()).await.unwrap();
        assert_eq!(result, "b");

        let calls: Vec<usize> = failover
            .endpoints()
            .iter()
            .map(|ep| ep.calls.load(Ordering::SeqCst))
            .collect();
        assert_eq!(calls, vec![1, 1, 0]);
    }

    #[tokio::test]
    async fn test_all_endpoints_fail() {
        let failover = Failover::new(
            "THORNode",
            vec![FakeEndpoint::new("a", false), FakeEndpoint::new("b", false)],
        );

        let err = failover.first_success(|ep| ep.fetch()).await.unwrap_err();
        match err {
            ClientError::AllEndpointsFailed {
                service, attempts, ..
            } => {
                assert_eq!(service, "THORNode");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_no_endpoints() {
        let failover: Failover<FakeEndpoint> = Failover::new("midgard", Vec::new());
        let err = failover.first_success(|ep| ep.fetch()).await.unwrap_err();
        assert!(matches!(err, ClientError::NoEndpoints { .. }));
    }
}
