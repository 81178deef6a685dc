// Core value types shared by the store, the compiler and the wire layer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::errors::ValidationError;

/// Default number of steps and users for a fresh session
pub const DEFAULT_DIMENSION: usize = 4;

/// Problem dimensions. Both values are at least 1 once accepted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub steps: usize,
    pub users: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_DIMENSION,
            users: DEFAULT_DIMENSION,
        }
    }
}

impl WorkflowConfig {
    pub fn new(steps: usize, users: usize) -> Result<Self, ValidationError> {
        if steps == 0 || users == 0 {
            return Err(ValidationError::EmptyDimension { steps, users });
        }
        Ok(Self { steps, users })
    }
}

/// Normalized constraint kind. Legacy spellings are only accepted at the
/// ingestion edge (`FromStr`, which deserialization of persisted data also
/// goes through).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum ConstraintType {
    /// Binding of duty: both steps must be performed by the same user
    SameUser,
    /// Separation of duty: the steps must be performed by different users
    DifferentUser,
}

impl TryFrom<String> for ConstraintType {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl FromStr for ConstraintType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sameuser" | "same_user" | "bod" | "binding" | "must_same" => Ok(Self::SameUser),
            "differentuser" | "different_user" | "sod" | "separation" | "must_different" => {
                Ok(Self::DifferentUser)
            }
            _ => Err(ValidationError::UnknownConstraintType(s.to_string())),
        }
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SameUser => write!(f, "SameUser"),
            Self::DifferentUser => write!(f, "DifferentUser"),
        }
    }
}

/// Opaque identity of a registered constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintId(Uuid);

impl ConstraintId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConstraintId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-declared constraint. Step references are 1-based as shown in the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub id: ConstraintId,
    #[serde(rename = "type")]
    pub kind: ConstraintType,
    #[serde(rename = "stepRefs", alias = "steps")]
    pub step_refs: Vec<usize>,
}

/// Solver backends understood by the solving service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SolverType {
    #[default]
    #[serde(rename = "SAT")]
    Sat,
    #[serde(rename = "CSP")]
    Csp,
    #[serde(rename = "BACKTRACKING")]
    Backtracking,
    #[serde(rename = "PBT")]
    Pbt,
}

impl SolverType {
    pub const ALL: [SolverType; 4] = [Self::Sat, Self::Csp, Self::Backtracking, Self::Pbt];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sat => "SAT",
            Self::Csp => "CSP",
            Self::Backtracking => "BACKTRACKING",
            Self::Pbt => "PBT",
        }
    }
}

impl FromStr for SolverType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|solver| solver.as_str() == wanted)
            .ok_or_else(|| ValidationError::UnknownSolverType(s.to_string()))
    }
}

impl fmt::Display for SolverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
