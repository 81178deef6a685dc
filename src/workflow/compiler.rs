// Constraint compiler: (config, matrix, registry) -> normalized solve request
//
// This is the only place that converts the UI's 1-based step numbers into
// the solver's 0-based indices.

use serde::Serialize;
use std::fmt;

use super::errors::ValidationError;
use super::matrix::AuthorizationMatrix;
use super::registry::ConstraintRegistry;
use super::types::{ConstraintId, ConstraintType, SolverType, WorkflowConfig};
use crate::solver::{SolveRequest, StepPair};

/// A candidate pair that was skipped instead of aborting compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CompileWarning {
    /// One of the 1-based steps lies outside `1..=max_step`
    StepOutOfRange {
        constraint: ConstraintId,
        step1: usize,
        step2: usize,
        max_step: usize,
    },
    /// A constraint names the same step twice
    DuplicateStep { constraint: ConstraintId, step: usize },
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepOutOfRange {
                constraint,
                step1,
                step2,
                max_step,
            } => write!(
                f,
                "constraint {constraint}: pair ({step1}, {step2}) skipped, steps must be within 1..={max_step}"
            ),
            Self::DuplicateStep { constraint, step } => {
                write!(f, "constraint {constraint}: step {step} named twice")
            }
        }
    }
}

/// Output of [`compile`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation {
    pub request: SolveRequest,
    pub warnings: Vec<CompileWarning>,
}

/// Compile the current problem into a solve request.
///
/// Every constraint expands to all pairs `(refs[i], refs[j])` with `i < j`,
/// in registry order then stored reference order, so identical inputs always
/// produce identical output.
pub fn compile(
    config: &WorkflowConfig,
    matrix: &AuthorizationMatrix,
    registry: &ConstraintRegistry,
    solver_type: SolverType,
) -> Compilation {
    let mut must_same = Vec::new();
    let mut must_different = Vec::new();
    let mut warnings = Vec::new();

    for constraint in registry {
        let refs = &constraint.step_refs;
        for (i, &first) in refs.iter().enumerate() {
            for &second in &refs[i + 1..] {
                let pair = match to_zero_based(first, second, config.steps) {
                    Ok(pair) => pair,
                    Err(PairRejection::Duplicate) => {
                        warnings.push(CompileWarning::DuplicateStep {
                            constraint: constraint.id,
                            step: first,
                        });
                        continue;
                    }
                    Err(PairRejection::OutOfRange) => {
                        warnings.push(CompileWarning::StepOutOfRange {
                            constraint: constraint.id,
                            step1: first,
                            step2: second,
                            max_step: config.steps,
                        });
                        continue;
                    }
                };

                match constraint.kind {
                    ConstraintType::SameUser => must_same.push(pair),
                    ConstraintType::DifferentUser => must_different.push(pair),
                }
            }
        }
    }

    Compilation {
        request: SolveRequest {
            num_steps: config.steps,
            num_users: config.users,
            authorized: matrix.rows().to_vec(),
            must_same_constraints: must_same,
            must_different_constraints: must_different,
            solver_type,
        },
        warnings,
    }
}

/// The solve gate: dimensions are non-zero, the matrix matches the config
/// and every step has at least one authorized user.
pub fn check_ready(
    config: &WorkflowConfig,
    matrix: &AuthorizationMatrix,
) -> Result<(), ValidationError> {
    if config.steps == 0 || config.users == 0 {
        return Err(ValidationError::EmptyDimension {
            steps: config.steps,
            users: config.users,
        });
    }

    let (actual_steps, actual_users) = matrix.dimensions();
    if (actual_steps, actual_users) != (config.steps, config.users) {
        return Err(ValidationError::MatrixShape {
            expected_steps: config.steps,
            expected_users: config.users,
            actual_steps,
            actual_users,
        });
    }

    let unauthorized_steps = matrix.unauthorized_steps();
    if !unauthorized_steps.is_empty() {
        return Err(ValidationError::IncompleteMatrix { unauthorized_steps });
    }
    Ok(())
}

enum PairRejection {
    Duplicate,
    OutOfRange,
}

fn to_zero_based(first: usize, second: usize, max_step: usize) -> Result<StepPair, PairRejection> {
    if first == second {
        return Err(PairRejection::Duplicate);
    }
    let in_range = |step: usize| (1..=max_step).contains(&step);
    if !in_range(first) || !in_range(second) {
        return Err(PairRejection::OutOfRange);
    }
    Ok(StepPair::new(first - 1, second - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Constraint;

    fn complete_matrix(steps: usize, users: usize) -> AuthorizationMatrix {
        AuthorizationMatrix::from_rows(vec![vec![true; users]; steps]).unwrap()
    }

    #[test]
    fn test_same_user_expands_to_all_pairs() {
        let config = WorkflowConfig::new(3, 2).unwrap();
        let mut registry = ConstraintRegistry::new();
        registry.add(ConstraintType::SameUser, &[1, 2, 3], 3).unwrap();

        let out = compile(&config, &complete_matrix(3, 2), &registry, SolverType::Sat);

        assert_eq!(
            out.request.must_same_constraints,
            vec![StepPair::new(0, 1), StepPair::new(0, 2), StepPair::new(1, 2)]
        );
        assert!(out.request.must_different_constraints.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_pairs_follow_stored_reference_order() {
        let config = WorkflowConfig::new(4, 1).unwrap();
        let mut registry = ConstraintRegistry::new();
        registry.add(ConstraintType::DifferentUser, &[4, 2, 1], 4).unwrap();

        let out = compile(&config, &complete_matrix(4, 1), &registry, SolverType::Csp);

        assert_eq!(
            out.request.must_different_constraints,
            vec![StepPair::new(3, 1), StepPair::new(3, 0), StepPair::new(1, 0)]
        );
    }

    #[test]
    fn test_out_of_range_step_is_skipped_with_warning() {
        let config = WorkflowConfig::new(3, 2).unwrap();
        let mut registry = ConstraintRegistry::new();
        let id = registry.add(ConstraintType::DifferentUser, &[1, 2, 5], 3).unwrap();
        registry.add(ConstraintType::SameUser, &[2, 3], 3).unwrap();

        let out = compile(&config, &complete_matrix(3, 2), &registry, SolverType::Sat);

        assert_eq!(out.request.must_different_constraints, vec![StepPair::new(0, 1)]);
        assert_eq!(out.request.must_same_constraints, vec![StepPair::new(1, 2)]);
        assert_eq!(
            out.warnings,
            vec![
                CompileWarning::StepOutOfRange { constraint: id, step1: 1, step2: 5, max_step: 3 },
                CompileWarning::StepOutOfRange { constraint: id, step1: 2, step2: 5, max_step: 3 },
            ]
        );
    }

    #[test]
    fn test_duplicate_refs_from_restored_data_are_warned() {
        let config = WorkflowConfig::new(2, 1).unwrap();
        let mut registry = ConstraintRegistry::new();
        let constraint = Constraint {
            id: ConstraintId::new(),
            kind: ConstraintType::SameUser,
            step_refs: vec![1, 1, 2],
        };
        let id = constraint.id;
        registry.restore(constraint);

        let out = compile(&config, &complete_matrix(2, 1), &registry, SolverType::Sat);

        assert_eq!(
            out.request.must_same_constraints,
            vec![StepPair::new(0, 1), StepPair::new(0, 1)]
        );
        assert_eq!(out.warnings, vec![CompileWarning::DuplicateStep { constraint: id, step: 1 }]);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let config = WorkflowConfig::new(4, 3).unwrap();
        let mut matrix = AuthorizationMatrix::new(4, 3);
        matrix.set(2, 1, true).unwrap();
        let mut registry = ConstraintRegistry::new();
        registry.add(ConstraintType::SameUser, &[1, 3, 4], 4).unwrap();
        registry.add(ConstraintType::DifferentUser, &[2, 4], 4).unwrap();

        let first = compile(&config, &matrix, &registry, SolverType::Pbt);
        let second = compile(&config, &matrix, &registry, SolverType::Pbt);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first.request).unwrap(),
            serde_json::to_vec(&second.request).unwrap()
        );
        assert_eq!(first.request.authorized, matrix.rows());
        assert_eq!(first.request.num_steps, 4);
        assert_eq!(first.request.num_users, 3);
        assert_eq!(first.request.solver_type, SolverType::Pbt);
    }

    #[test]
    fn test_check_ready_rejects_incomplete_matrix() {
        let config = WorkflowConfig::new(2, 2).unwrap();
        let mut matrix = AuthorizationMatrix::new(2, 2);
        matrix.set(1, 0, true).unwrap();

        assert_eq!(
            check_ready(&config, &matrix),
            Err(ValidationError::IncompleteMatrix { unauthorized_steps: vec![0] })
        );
        matrix.set(0, 1, true).unwrap();
        assert_eq!(check_ready(&config, &matrix), Ok(()));
    }

    #[test]
    fn test_check_ready_rejects_shape_mismatch() {
        let config = WorkflowConfig::new(3, 2).unwrap();
        assert!(matches!(
            check_ready(&config, &complete_matrix(2, 2)),
            Err(ValidationError::MatrixShape { expected_steps: 3, actual_steps: 2, .. })
        ));
    }
}
