// Workflow state store: the single point of mutation for a session

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::compiler::{check_ready, compile, CompileWarning};
use super::errors::ValidationError;
use super::history::{HistoryEntry, SolutionHistory};
use super::matrix::AuthorizationMatrix;
use super::registry::{dedup_preserving_order, ConstraintRegistry};
use super::types::{Constraint, ConstraintId, ConstraintType, SolverType, WorkflowConfig};
use crate::config::WorkflowDefaults;
use crate::observability::solve_metrics;
use crate::persistence::{DisabledPersistence, PersistencePort, WorkflowSnapshot};
use crate::solver::{GatewayError, SolveRequest, SolveResponse};

/// Whether a solve is awaiting the solver service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolveStatus {
    #[default]
    Idle,
    InFlight {
        generation: u64,
        solver_type: SolverType,
        started_at: DateTime<Utc>,
    },
}

impl SolveStatus {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight { .. })
    }
}

/// Everything the store owns. Handed out read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    pub config: WorkflowConfig,
    pub matrix: AuthorizationMatrix,
    pub constraints: ConstraintRegistry,
    pub history: SolutionHistory,
    pub solve_status: SolveStatus,
    /// Message of the most recent failed solve, cleared by the next attempt
    pub last_error: Option<String>,
}

impl WorkflowState {
    fn fresh(defaults: &WorkflowDefaults) -> Self {
        let config = default_config(defaults);
        Self {
            config,
            matrix: AuthorizationMatrix::new(config.steps, config.users),
            constraints: ConstraintRegistry::new(),
            history: SolutionHistory::with_capacity(defaults.history_capacity),
            solve_status: SolveStatus::Idle,
            last_error: None,
        }
    }

    /// The most recent solver response
    pub fn current_solution(&self) -> Option<&HistoryEntry> {
        self.history.current()
    }

    fn to_snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot::new(
            self.config,
            self.matrix.clone(),
            self.constraints.iter().cloned().collect(),
            self.history.list().cloned().collect(),
        )
    }
}

/// What a committed mutation changed
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    ConfigChanged(WorkflowConfig),
    MatrixChanged,
    ConstraintAdded(ConstraintId),
    ConstraintRemoved(ConstraintId),
    ConstraintsCleared,
    SolutionRecorded,
    HistoryCleared,
    Reset,
    SolveStarted {
        generation: u64,
        solver_type: SolverType,
    },
    SolveFinished {
        generation: u64,
        succeeded: bool,
    },
    /// `prepare_solve` refused the current instance; see `last_error`
    SolveRejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn Fn(&StoreEvent, &WorkflowState) + Send>;

/// Output of [`WorkflowStore::prepare_solve`]: the request to send and the
/// generation it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSolve {
    pub request: SolveRequest,
    pub warnings: Vec<CompileWarning>,
    pub generation: u64,
    pub solver_type: SolverType,
}

pub struct WorkflowStore {
    state: WorkflowState,
    port: Box<dyn PersistencePort>,
    defaults: WorkflowDefaults,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    generation: u64,
}

impl std::fmt::Debug for WorkflowStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowStore")
            .field("state", &self.state)
            .field("subscribers", &self.subscribers.len())
            .field("generation", &self.generation)
            .finish()
    }
}

impl WorkflowStore {
    /// Restore the session from `port`, falling back to defaults when there
    /// is nothing to restore or the snapshot cannot be read
    pub fn open(port: Box<dyn PersistencePort>, defaults: WorkflowDefaults) -> Self {
        let state = match port.load() {
            Ok(Some(snapshot)) => restore(snapshot, &defaults),
            Ok(None) => {
                debug!("No saved session, starting from defaults");
                WorkflowState::fresh(&defaults)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load saved session, starting from defaults");
                solve_metrics().record_persistence_failure();
                WorkflowState::fresh(&defaults)
            }
        };

        Self {
            state,
            port,
            defaults,
            subscribers: Vec::new(),
            next_subscription: 0,
            generation: 0,
        }
    }

    /// A store that never persists
    pub fn in_memory(defaults: WorkflowDefaults) -> Self {
        Self::open(Box::new(DisabledPersistence), defaults)
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Generation of the most recently prepared solve
    pub fn solve_generation(&self) -> u64 {
        self.generation
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&StoreEvent, &WorkflowState) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    /// Change the dimensions, carrying the overlapping part of the matrix over
    pub fn set_config(&mut self, steps: usize, users: usize) -> Result<(), ValidationError> {
        let config = WorkflowConfig::new(steps, users)?;
        let matrix = self.state.matrix.resize(config.steps, config.users);
        self.state.config = config;
        self.state.matrix = matrix;
        self.commit(StoreEvent::ConfigChanged(config));
        Ok(())
    }

    /// Replace the whole matrix. Its shape must match the current config.
    pub fn set_matrix(&mut self, matrix: AuthorizationMatrix) -> Result<(), ValidationError> {
        let (actual_steps, actual_users) = matrix.dimensions();
        let config = self.state.config;
        if (actual_steps, actual_users) != (config.steps, config.users) {
            return Err(ValidationError::MatrixShape {
                expected_steps: config.steps,
                expected_users: config.users,
                actual_steps,
                actual_users,
            });
        }
        self.state.matrix = matrix;
        self.commit(StoreEvent::MatrixChanged);
        Ok(())
    }

    /// Set one 0-based cell
    pub fn set_authorization(
        &mut self,
        step: usize,
        user: usize,
        value: bool,
    ) -> Result<(), ValidationError> {
        self.state.matrix.set(step, user, value)?;
        self.commit(StoreEvent::MatrixChanged);
        Ok(())
    }

    /// Flip one 0-based cell, returning its new value
    pub fn toggle_authorization(&mut self, step: usize, user: usize) -> Result<bool, ValidationError> {
        let value = self.state.matrix.toggle(step, user)?;
        self.commit(StoreEvent::MatrixChanged);
        Ok(value)
    }

    /// Register a constraint over 1-based step references
    pub fn add_constraint(
        &mut self,
        kind: ConstraintType,
        step_refs: &[usize],
    ) -> Result<ConstraintId, ValidationError> {
        let id = self
            .state
            .constraints
            .add(kind, step_refs, self.state.config.steps)?;
        info!(constraint = %id, kind = %kind, steps = ?step_refs, "Constraint added");
        self.commit(StoreEvent::ConstraintAdded(id));
        Ok(id)
    }

    /// Unknown ids are ignored
    pub fn remove_constraint(&mut self, id: ConstraintId) -> Option<Constraint> {
        let removed = self.state.constraints.remove(id)?;
        self.commit(StoreEvent::ConstraintRemoved(id));
        Some(removed)
    }

    pub fn clear_constraints(&mut self) {
        self.state.constraints.clear();
        self.commit(StoreEvent::ConstraintsCleared);
    }

    /// Put a response at the front of the history
    pub fn record_solution(&mut self, response: SolveResponse) {
        self.state.history.append(HistoryEntry::new(response));
        self.commit(StoreEvent::SolutionRecorded);
    }

    pub fn clear_history(&mut self) {
        self.state.history.clear();
        self.commit(StoreEvent::HistoryCleared);
    }

    /// Back to the default dimensions with an empty matrix and no
    /// constraints. History is kept.
    pub fn reset(&mut self) {
        let history = std::mem::take(&mut self.state.history);
        let solve_status = self.state.solve_status;
        self.state = WorkflowState {
            history,
            solve_status,
            ..WorkflowState::fresh(&self.defaults)
        };
        self.commit(StoreEvent::Reset);
    }

    /// Validate and compile the current instance, then enter the in-flight
    /// state. Nothing is sent anywhere; the caller owns the network call.
    pub fn prepare_solve(&mut self, solver_type: SolverType) -> Result<PreparedSolve, ValidationError> {
        if let Err(e) = check_ready(&self.state.config, &self.state.matrix) {
            warn!(error = %e, "Solve blocked by validation");
            solve_metrics().record_validation_rejection();
            self.state.last_error = Some(e.to_string());
            self.notify(&StoreEvent::SolveRejected);
            return Err(e);
        }

        let compilation = compile(
            &self.state.config,
            &self.state.matrix,
            &self.state.constraints,
            solver_type,
        );
        for warning in &compilation.warnings {
            warn!(warning = %warning, "Constraint pair skipped");
        }
        solve_metrics().record_compile_warnings(compilation.warnings.len());

        if let SolveStatus::InFlight { generation, .. } = self.state.solve_status {
            warn!(
                pending_generation = generation,
                "Starting a solve while another is still in flight"
            );
        }

        self.generation += 1;
        let generation = self.generation;
        self.state.solve_status = SolveStatus::InFlight {
            generation,
            solver_type,
            started_at: Utc::now(),
        };
        self.state.last_error = None;
        self.notify(&StoreEvent::SolveStarted {
            generation,
            solver_type,
        });

        Ok(PreparedSolve {
            request: compilation.request,
            warnings: compilation.warnings,
            generation,
            solver_type,
        })
    }

    /// Apply the gateway outcome as one transition. Responses are always
    /// recorded; the status only returns to idle when `prepared` is the most
    /// recent solve.
    pub fn complete_solve(
        &mut self,
        prepared: &PreparedSolve,
        outcome: Result<SolveResponse, GatewayError>,
    ) -> Result<SolveResponse, GatewayError> {
        let latest = prepared.generation == self.generation;
        if latest {
            self.state.solve_status = SolveStatus::Idle;
        } else {
            debug!(
                generation = prepared.generation,
                latest = self.generation,
                "Late solve result"
            );
        }

        let event = StoreEvent::SolveFinished {
            generation: prepared.generation,
            succeeded: outcome.is_ok(),
        };
        match &outcome {
            Ok(response) => {
                self.state
                    .history
                    .append(HistoryEntry::new(response.clone()));
                if latest {
                    self.state.last_error = None;
                }
                self.commit(event);
            }
            Err(e) => {
                if latest {
                    self.state.last_error = Some(e.to_string());
                }
                self.notify(&event);
            }
        }
        outcome
    }

    /// Save then notify
    fn commit(&mut self, event: StoreEvent) {
        debug!(event = ?event, "Store mutation committed");
        self.persist();
        self.notify(&event);
    }

    fn persist(&self) {
        if let Err(e) = self.port.save(&self.state.to_snapshot()) {
            warn!(error = %e, "Failed to save session snapshot");
            solve_metrics().record_persistence_failure();
        }
    }

    fn notify(&self, event: &StoreEvent) {
        for (_, subscriber) in &self.subscribers {
            subscriber(event, &self.state);
        }
    }
}

fn default_config(defaults: &WorkflowDefaults) -> WorkflowConfig {
    WorkflowConfig::new(defaults.default_steps, defaults.default_users).unwrap_or_default()
}

/// Rebuild state from a snapshot, repairing whatever does not line up
fn restore(snapshot: WorkflowSnapshot, defaults: &WorkflowDefaults) -> WorkflowState {
    let config = WorkflowConfig::new(snapshot.config.steps, snapshot.config.users)
        .unwrap_or_else(|e| {
            warn!(error = %e, "Saved dimensions invalid, using defaults");
            default_config(defaults)
        });

    let matrix = if snapshot.matrix.dimensions() == (config.steps, config.users) {
        snapshot.matrix
    } else {
        warn!(
            saved = ?snapshot.matrix.dimensions(),
            steps = config.steps,
            users = config.users,
            "Saved matrix shape differs from config, resizing"
        );
        snapshot.matrix.resize(config.steps, config.users)
    };

    let mut constraints = ConstraintRegistry::new();
    for mut constraint in snapshot.constraints {
        let id = constraint.id;
        let refs: Vec<usize> = constraint
            .step_refs
            .iter()
            .copied()
            .filter(|&step| step >= 1)
            .collect();
        constraint.step_refs = dedup_preserving_order(&refs);
        if constraint.step_refs.len() < 2 {
            warn!(constraint = %id, "Dropping invalid saved constraint");
            continue;
        }
        if !constraints.restore(constraint) {
            warn!(constraint = %id, "Dropping duplicate saved constraint");
        }
    }

    let history = SolutionHistory::from_entries(defaults.history_capacity, snapshot.history);

    info!(
        steps = config.steps,
        users = config.users,
        constraints = constraints.len(),
        history = history.len(),
        "Restored saved session"
    );

    WorkflowState {
        config,
        matrix,
        constraints,
        history,
        solve_status: SolveStatus::Idle,
        last_error: None,
    }
}
