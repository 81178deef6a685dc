// Persisted session snapshot and the readers for older layouts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::PersistenceError;
use crate::solver::SolveResponse;
use crate::workflow::{
    AuthorizationMatrix, Constraint, ConstraintId, ConstraintType, HistoryEntry, WorkflowConfig,
};

/// Layout version written by this crate
pub const SNAPSHOT_VERSION: u32 = 2;

/// Everything needed to rebuild a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub version: u32,
    pub config: WorkflowConfig,
    pub matrix: AuthorizationMatrix,
    /// Insertion order
    pub constraints: Vec<Constraint>,
    /// Newest first
    pub history: Vec<HistoryEntry>,
}

impl WorkflowSnapshot {
    pub fn new(
        config: WorkflowConfig,
        matrix: AuthorizationMatrix,
        constraints: Vec<Constraint>,
        history: Vec<HistoryEntry>,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            config,
            matrix,
            constraints,
            history,
        }
    }
}

/// Parse the unified blob. Blobs without a `version` field are the first
/// unified layout and are converted; newer versions are refused.
pub fn decode(text: &str) -> Result<WorkflowSnapshot, PersistenceError> {
    let raw: Value = serde_json::from_str(text)?;
    let version = raw
        .get("version")
        .and_then(Value::as_u64)
        .map_or(1, |v| u32::try_from(v).unwrap_or(u32::MAX));

    if version > SNAPSHOT_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: version,
            supported: SNAPSHOT_VERSION,
        });
    }
    if version == SNAPSHOT_VERSION {
        return Ok(serde_json::from_value(raw)?);
    }

    debug!(version, "Converting unversioned snapshot");
    let legacy: LegacyAppState = serde_json::from_value(raw)?;
    Ok(legacy.into_snapshot())
}

/// Build a snapshot from the three pre-unification keys. Missing pieces
/// fall back to empty values; the store repairs dimensions on restore.
pub fn from_legacy_keys(
    config: Option<&str>,
    constraints: Option<&str>,
    matrix: Option<&str>,
) -> Result<WorkflowSnapshot, PersistenceError> {
    let config: LegacyConfig = match config {
        Some(text) => serde_json::from_str(text)?,
        None => LegacyConfig::default(),
    };
    let constraints: Vec<LegacyConstraint> = match constraints {
        Some(text) => serde_json::from_str(text)?,
        None => Vec::new(),
    };
    let matrix: Vec<Vec<LegacyCell>> = match matrix {
        Some(text) => serde_json::from_str(text)?,
        None => Vec::new(),
    };

    Ok(LegacyAppState {
        config,
        constraints,
        auth_matrix: matrix,
        solutions: Vec::new(),
    }
    .into_snapshot())
}

#[derive(Debug, Default, Deserialize)]
struct LegacyConfig {
    #[serde(default)]
    steps: usize,
    #[serde(default)]
    users: usize,
}

#[derive(Debug, Deserialize)]
struct LegacyConstraint {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    steps: Vec<i64>,
}

/// Older writers stored cells either as booleans or as 0/1 numbers
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum LegacyCell {
    Flag(bool),
    Number(i64),
}

impl From<LegacyCell> for bool {
    fn from(cell: LegacyCell) -> Self {
        match cell {
            LegacyCell::Flag(flag) => flag,
            LegacyCell::Number(n) => n != 0,
        }
    }
}

/// Version 1 of the unified blob
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyAppState {
    #[serde(default)]
    config: LegacyConfig,
    #[serde(default)]
    constraints: Vec<LegacyConstraint>,
    #[serde(default, alias = "matrix")]
    auth_matrix: Vec<Vec<LegacyCell>>,
    /// Oldest first
    #[serde(default)]
    solutions: Vec<SolveResponse>,
}

impl LegacyAppState {
    fn into_snapshot(self) -> WorkflowSnapshot {
        let config = WorkflowConfig {
            steps: self.config.steps,
            users: self.config.users,
        };

        let rows: Vec<Vec<bool>> = self
            .auth_matrix
            .into_iter()
            .map(|row| row.into_iter().map(bool::from).collect())
            .collect();
        let matrix = AuthorizationMatrix::from_rows(rows).unwrap_or_else(|e| {
            warn!(error = %e, "Discarding malformed legacy authorization matrix");
            AuthorizationMatrix::default()
        });

        let constraints = self
            .constraints
            .into_iter()
            .filter_map(convert_constraint)
            .collect();

        let history = self
            .solutions
            .into_iter()
            .rev()
            .map(|response| {
                let received_at = response
                    .timestamp
                    .as_deref()
                    .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                    .map_or_else(Utc::now, |ts| ts.with_timezone(&Utc));
                HistoryEntry {
                    response,
                    received_at,
                }
            })
            .collect();

        WorkflowSnapshot::new(config, matrix, constraints, history)
    }
}

fn convert_constraint(legacy: LegacyConstraint) -> Option<Constraint> {
    let kind = match legacy.kind.parse::<ConstraintType>() {
        Ok(kind) => kind,
        Err(e) => {
            warn!(error = %e, "Dropping legacy constraint");
            return None;
        }
    };

    let mut step_refs: Vec<usize> = Vec::with_capacity(legacy.steps.len());
    for step in legacy.steps {
        if let Ok(step) = usize::try_from(step) {
            if step >= 1 && !step_refs.contains(&step) {
                step_refs.push(step);
            }
        }
    }
    if step_refs.len() < 2 {
        warn!(kind = %kind, "Dropping legacy constraint with fewer than two steps");
        return None;
    }

    Some(Constraint {
        id: ConstraintId::new(),
        kind,
        step_refs,
    })
}
