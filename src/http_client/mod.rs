//! A reusable, thread-safe pool of outbound HTTP clients.
//!
//! Destination kinds differ in their total-request deadline (20 s for the
//! Alertmanager API, 60 s for webhook and Slack endpoints), and a
//! `reqwest::Client`'s timeout is fixed at build time, so the pool keys
//! clients by deadline. Reusing clients across reconciler ticks keeps
//! connection pooling effective.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client as ReqwestClient;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur within the [`HttpClientPool`].
#[derive(Debug, Error)]
pub enum HttpClientPoolError {
    /// The underlying `reqwest::Client` could not be built.
    #[error("failed to create HTTP client: {0}")]
    Build(String),
}

/// A pool of HTTP clients keyed by their total-request deadline.
pub struct HttpClientPool {
    clients: RwLock<HashMap<Duration, Arc<ClientWithMiddleware>>>,
}

impl HttpClientPool {
    /// Creates a new, empty pool.
    pub fn new() -> Self {
        HttpClientPool { clients: RwLock::new(HashMap::new()) }
    }

    /// Gets the client for the given deadline, creating it on first use.
    ///
    /// Uses a double-checked locking pattern so concurrent delivery workers
    /// contend only on the first request per deadline.
    pub async fn get_or_create(
        &self,
        deadline: Duration,
    ) -> Result<Arc<ClientWithMiddleware>, HttpClientPoolError> {
        if let Some(client) = self.clients.read().await.get(&deadline) {
            return Ok(Arc::clone(client));
        }

        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(&deadline) {
            return Ok(Arc::clone(client));
        }

        let base_client = ReqwestClient::builder()
            .timeout(deadline)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| HttpClientPoolError::Build(e.to_string()))?;

        let client = Arc::new(ClientBuilder::new(base_client).build());
        clients.insert(deadline, Arc::clone(&client));

        Ok(client)
    }

    #[cfg(test)]
    async fn active_client_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

impl Default for HttpClientPool {
    fn default() -> Self {
        Self::new()
    }
}
