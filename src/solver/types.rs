// Wire-facing request/response contract of the solving service

use serde::{Deserialize, Deserializer, Serialize};

use crate::workflow::SolverType;

/// A 0-based pair of steps tied by a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepPair {
    pub step1: usize,
    pub step2: usize,
}

impl StepPair {
    pub fn new(step1: usize, step2: usize) -> Self {
        Self { step1, step2 }
    }
}

impl From<(usize, usize)> for StepPair {
    fn from((step1, step2): (usize, usize)) -> Self {
        Self { step1, step2 }
    }
}

/// Normalized solve request. Everything in here is 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub num_steps: usize,
    pub num_users: usize,
    pub authorized: Vec<Vec<bool>>,
    pub must_same_constraints: Vec<StepPair>,
    pub must_different_constraints: Vec<StepPair>,
    pub solver_type: SolverType,
}

/// Solver verdict. `solution_found == false` is a valid answer ("no
/// solution"), not a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResponse {
    pub solution_found: bool,
    /// One user index per step; negative values mean "unassigned"
    #[serde(default, deserialize_with = "null_as_empty")]
    pub assignment: Vec<i64>,
    #[serde(default)]
    pub solving_time_ms: f64,
    #[serde(default)]
    pub solver_used: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl SolveResponse {
    /// 0-based user assigned to `step`, if any
    pub fn assigned_user(&self, step: usize) -> Option<usize> {
        self.assignment
            .get(step)
            .and_then(|&user| usize::try_from(user).ok())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<i64>>::deserialize(deserializer)?.unwrap_or_default())
}
