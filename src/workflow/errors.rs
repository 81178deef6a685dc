use thiserror::Error;

/// Local validation failures. These block compilation and solving and never
/// reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("workflow needs at least one step and one user (got {steps} steps, {users} users)")]
    EmptyDimension { steps: usize, users: usize },

    #[error("constraint needs at least 2 distinct steps within 1..={max_step}, found {distinct_valid}")]
    TooFewSteps { distinct_valid: usize, max_step: usize },

    #[error(
        "authorization matrix is {actual_steps}x{actual_users}, expected {expected_steps}x{expected_users}"
    )]
    MatrixShape {
        expected_steps: usize,
        expected_users: usize,
        actual_steps: usize,
        actual_users: usize,
    },

    #[error("step index {step} is outside 0..{max_step}")]
    StepOutOfRange { step: usize, max_step: usize },

    #[error("user index {user} is outside 0..{max_user}")]
    UserOutOfRange { user: usize, max_user: usize },

    #[error("authorization matrix is incomplete: no user is authorized for steps {unauthorized_steps:?}")]
    IncompleteMatrix { unauthorized_steps: Vec<usize> },

    #[error("unknown constraint type '{0}' (expected SameUser/BOD/binding or DifferentUser/SOD/separation)")]
    UnknownConstraintType(String),

    #[error("unknown solver type '{0}' (expected SAT, CSP, BACKTRACKING or PBT)")]
    UnknownSolverType(String),
}
