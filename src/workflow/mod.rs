// Workflow state and constraint compilation

pub mod compiler;
pub mod errors;
pub mod history;
pub mod matrix;
pub mod registry;
pub mod store;
pub mod types;

pub use compiler::{check_ready, compile, Compilation, CompileWarning};
pub use errors::ValidationError;
pub use history::{HistoryEntry, SolutionHistory, HISTORY_CAPACITY};
pub use matrix::{is_complete, resize, AuthorizationMatrix};
pub use registry::ConstraintRegistry;
pub use store::{
    PreparedSolve, SolveStatus, StoreEvent, SubscriptionId, WorkflowState, WorkflowStore,
};
pub use types::{
    Constraint, ConstraintId, ConstraintType, SolverType, WorkflowConfig, DEFAULT_DIMENSION,
};
