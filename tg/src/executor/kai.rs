//! Kai remote-call executor

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, info};

use super::{Executor, ExecutorError};
use crate::config::KaiConfig;
use crate::domain::Request;

/// Sends each request to the Kai backend over HTTP
///
/// Without an endpoint the call is simulated by sleeping, which keeps the
/// slot occupied for a realistic duration.
pub struct KaiExecutor {
    http: Client,
    endpoint: Option<Url>,
    simulate: Duration,
}

impl KaiExecutor {
    /// Create an executor from config
    pub fn from_config(config: &KaiConfig) -> Result<Self, ExecutorError> {
        debug!(endpoint = ?config.endpoint, timeout_ms = config.timeout_ms, "KaiExecutor::from_config: called");
        let endpoint = config
            .endpoint
            .as_deref()
            .map(|raw| Url::parse(raw).map_err(|e| ExecutorError::InvalidEndpoint(format!("{}: {}", raw, e))))
            .transpose()?;
        let http = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            http,
            endpoint,
            simulate: config.simulate(),
        })
    }

    /// Executor that only simulates calls
    pub fn simulated(duration: Duration) -> Self {
        Self {
            http: Client::new(),
            endpoint: None,
            simulate: duration,
        }
    }
}

#[async_trait]
impl Executor for KaiExecutor {
    fn name(&self) -> &'static str {
        "kai"
    }

    async fn execute(&self, request: Request) -> Result<(), ExecutorError> {
        let Some(url) = &self.endpoint else {
            info!(id = %request.id, name = %request.name, simulate = ?self.simulate, "Calling Kai backend (simulated)");
            tokio::time::sleep(self.simulate).await;
            info!(id = %request.id, name = %request.name, "Kai backend processed");
            return Ok(());
        };

        info!(id = %request.id, name = %request.name, %url, "Calling Kai backend");
        let response = self.http.post(url.clone()).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(id = %request.id, status = status.as_u16(), %message, "KaiExecutor::execute: backend rejected request");
            return Err(ExecutorError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        info!(id = %request.id, name = %request.name, "Kai backend processed");
        Ok(())
    }
}
