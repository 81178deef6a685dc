// One solve round trip: validate, compile, call the gateway, record

use thiserror::Error;
use tracing::{info, warn, Instrument};

use crate::observability::{solve_metrics, OperationTimer};
use crate::solver::{GatewayError, SolveResponse, SolverGateway};
use crate::telemetry::{create_solve_span, generate_correlation_id};
use crate::workflow::{SolverType, ValidationError, WorkflowStore};

/// Why a solve produced no response. A response saying "no solution" is
/// not an error.
#[derive(Debug, Error)]
pub enum SolveError {
    /// Rejected locally; nothing was sent
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl SolveError {
    /// True when the solver service could not be used at all
    pub fn is_solver_unavailable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Gateway(e) => e.is_unavailable(),
        }
    }
}

/// Run `prepare_solve`, send the request through `gateway` and apply the
/// outcome to the store
pub async fn solve(
    store: &mut WorkflowStore,
    gateway: &dyn SolverGateway,
    solver_type: SolverType,
) -> Result<SolveResponse, SolveError> {
    let prepared = store.prepare_solve(solver_type)?;
    let correlation_id = generate_correlation_id();
    let span = create_solve_span(solver_type, prepared.generation, &correlation_id);

    let metrics = solve_metrics();
    metrics.record_solve_started();
    let timer = OperationTimer::new("wsp_solve");

    let outcome = gateway
        .solve(&prepared.request)
        .instrument(span.clone())
        .await;
    let elapsed = timer.finish();

    span.in_scope(|| match &outcome {
        Ok(response) => {
            metrics.record_response(response.solution_found, elapsed);
            info!(
                solution_found = response.solution_found,
                warnings = prepared.warnings.len(),
                elapsed_ms = elapsed.as_millis(),
                "Solve finished"
            );
        }
        Err(e) => {
            metrics.record_gateway_failure();
            warn!(error = %e, unavailable = e.is_unavailable(), "Solve failed");
        }
    });

    Ok(store.complete_solve(&prepared, outcome)?)
}
