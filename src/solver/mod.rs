// Solver gateway: the only component that talks to the network

pub mod errors;
pub mod gateway;
pub mod types;

pub use errors::GatewayError;
pub use gateway::{HttpSolverGateway, SolverGateway};
pub use types::{SolveRequest, SolveResponse, StepPair};

#[cfg(any(test, feature = "testing"))]
pub use gateway::MockSolverGateway;
