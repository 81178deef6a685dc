// Ordered constraint registry with stable per-entry identity

use serde::{Deserialize, Serialize};

use super::errors::ValidationError;
use super::types::{Constraint, ConstraintId, ConstraintType};

/// Constraints in insertion order. Entries are never edited in place; they
/// are added with a fresh id and removed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintRegistry {
    entries: Vec<Constraint>,
}

impl ConstraintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constraint over 1-based `step_refs`.
    ///
    /// Duplicate references are collapsed, keeping first-occurrence order.
    /// The constraint is accepted when at least two distinct references fall
    /// within `1..=max_step`; references outside that range are kept and
    /// surface later as compile warnings.
    pub fn add(
        &mut self,
        kind: ConstraintType,
        step_refs: &[usize],
        max_step: usize,
    ) -> Result<ConstraintId, ValidationError> {
        let step_refs = dedup_preserving_order(step_refs);
        let distinct_valid = step_refs
            .iter()
            .filter(|&&step| (1..=max_step).contains(&step))
            .count();
        if distinct_valid < 2 {
            return Err(ValidationError::TooFewSteps {
                distinct_valid,
                max_step,
            });
        }

        let constraint = Constraint {
            id: ConstraintId::new(),
            kind,
            step_refs,
        };
        let id = constraint.id;
        self.entries.push(constraint);
        Ok(id)
    }

    /// Re-insert an already identified constraint, e.g. when restoring a
    /// snapshot. Returns false if the id is already present.
    pub(crate) fn restore(&mut self, constraint: Constraint) -> bool {
        if self.get(constraint.id).is_some() {
            return false;
        }
        self.entries.push(constraint);
        true
    }

    /// Remove by id, returning the removed entry
    pub fn remove(&mut self, id: ConstraintId) -> Option<Constraint> {
        let index = self.entries.iter().position(|c| c.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, id: ConstraintId) -> Option<&Constraint> {
        self.entries.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ConstraintRegistry {
    type Item = &'a Constraint;
    type IntoIter = std::slice::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

pub(crate) fn dedup_preserving_order(step_refs: &[usize]) -> Vec<usize> {
    let mut seen = Vec::with_capacity(step_refs.len());
    for &step in step_refs {
        if !seen.contains(&step) {
            seen.push(step);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_assigns_unique_ids_in_order() {
        let mut registry = ConstraintRegistry::new();
        let first = registry.add(ConstraintType::SameUser, &[1, 2], 3).unwrap();
        let second = registry.add(ConstraintType::DifferentUser, &[2, 3], 3).unwrap();

        assert_ne!(first, second);
        let ids: Vec<_> = registry.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn test_add_rejects_fewer_than_two_distinct_valid_steps() {
        let mut registry = ConstraintRegistry::new();

        assert_eq!(
            registry.add(ConstraintType::SameUser, &[2, 2, 2], 3),
            Err(ValidationError::TooFewSteps { distinct_valid: 1, max_step: 3 })
        );
        assert_eq!(
            registry.add(ConstraintType::SameUser, &[1, 7, 9], 3),
            Err(ValidationError::TooFewSteps { distinct_valid: 1, max_step: 3 })
        );
        assert!(registry.add(ConstraintType::SameUser, &[0, 4], 3).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_add_collapses_duplicates_and_keeps_out_of_range_refs() {
        let mut registry = ConstraintRegistry::new();
        let id = registry
            .add(ConstraintType::DifferentUser, &[3, 1, 3, 5], 3)
            .unwrap();
        assert_eq!(registry.get(id).unwrap().step_refs, vec![3, 1, 5]);
    }

    #[test]
    fn test_remove_by_id() {
        let mut registry = ConstraintRegistry::new();
        let keep = registry.add(ConstraintType::SameUser, &[1, 2], 2).unwrap();
        let drop = registry.add(ConstraintType::DifferentUser, &[1, 2], 2).unwrap();

        assert_eq!(registry.remove(drop).map(|c| c.id), Some(drop));
        assert!(registry.remove(drop).is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.get(keep).is_some());
    }
}
