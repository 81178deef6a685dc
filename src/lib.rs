// WSP Workbench Library - workflow state and constraint compilation for
// Workflow Satisfiability Problem instances

pub mod config;
pub mod observability;
pub mod persistence;
pub mod session;
pub mod solver;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use config::{config, init_config, WorkbenchConfig};
pub use observability::{solve_metrics, OperationTimer, SolveMetrics, SolveStats};
pub use persistence::{
    FileStorage, KeyValueStorage, MemoryStorage, PersistenceError, PersistencePort,
    SnapshotRepository, WorkflowSnapshot,
};
pub use session::{solve, SolveError};
pub use solver::{GatewayError, HttpSolverGateway, SolveRequest, SolveResponse, SolverGateway};
pub use telemetry::{create_solve_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
pub use workflow::{
    compile, AuthorizationMatrix, Constraint, ConstraintId, ConstraintType, SolverType,
    ValidationError, WorkflowConfig, WorkflowState, WorkflowStore,
};
