use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::errors::GatewayError;
use super::types::{SolveRequest, SolveResponse};
use crate::config::{MatrixEncoding, SolverConfig};
use crate::workflow::SolverType;

/// Transport to the external solving service. Stateless; no retries.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SolverGateway: Send + Sync {
    /// Submit a compiled request and parse the verdict
    async fn solve(&self, request: &SolveRequest) -> Result<SolveResponse, GatewayError>;

    /// Liveness probe; returns the service's status text
    async fn health(&self) -> Result<String, GatewayError>;

    /// Solver backends the service advertises
    async fn supported_solvers(&self) -> Result<Vec<SolverType>, GatewayError>;
}

/// JSON-over-HTTP gateway
#[derive(Debug, Clone)]
pub struct HttpSolverGateway {
    client: Client,
    settings: SolverConfig,
}

impl HttpSolverGateway {
    pub fn new(settings: SolverConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(GatewayError::Transport)?;

        Ok(Self { client, settings })
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Serialize the request, optionally rewriting the matrix as 0/1 ints
    pub(crate) fn encode(&self, request: &SolveRequest) -> Result<Value, GatewayError> {
        let mut body = serde_json::to_value(request)?;
        if self.settings.matrix_encoding == MatrixEncoding::Integer {
            let numeric: Vec<Vec<u8>> = request
                .authorized
                .iter()
                .map(|row| row.iter().map(|&cell| u8::from(cell)).collect())
                .collect();
            body["authorized"] = serde_json::to_value(numeric)?;
        }
        Ok(body)
    }

    async fn get_text(&self, path: &str) -> Result<String, GatewayError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(GatewayError::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(GatewayError::Transport)?;
        if !status.is_success() {
            return Err(GatewayError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl SolverGateway for HttpSolverGateway {
    async fn solve(&self, request: &SolveRequest) -> Result<SolveResponse, GatewayError> {
        let url = self.url(&self.settings.solve_path);
        let body = self.encode(request)?;
        debug!(
            url = %url,
            solver = %request.solver_type,
            num_steps = request.num_steps,
            num_users = request.num_users,
            "Posting solve request"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(GatewayError::Transport)?;

        let status = response.status();
        let text = response.text().await.map_err(GatewayError::Transport)?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "Solver service rejected request");
            return Err(GatewayError::Server {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: SolveResponse =
            serde_json::from_str(&text).map_err(|e| GatewayError::Protocol {
                reason: e.to_string(),
            })?;

        info!(
            solver_used = %parsed.solver_used,
            solution_found = parsed.solution_found,
            solving_time_ms = parsed.solving_time_ms,
            "Solver responded"
        );
        Ok(parsed)
    }

    async fn health(&self) -> Result<String, GatewayError> {
        self.get_text(&self.settings.health_path).await
    }

    async fn supported_solvers(&self) -> Result<Vec<SolverType>, GatewayError> {
        let body = self.get_text(&self.settings.solvers_path).await?;
        let names: Vec<String> =
            serde_json::from_str(&body).map_err(|e| GatewayError::Protocol {
                reason: e.to_string(),
            })?;

        Ok(names
            .iter()
            .filter_map(|name| match name.parse::<SolverType>() {
                Ok(solver) => Some(solver),
                Err(_) => {
                    warn!(solver = %name, "Ignoring unknown solver advertised by service");
                    None
                }
            })
            .collect())
    }
}
