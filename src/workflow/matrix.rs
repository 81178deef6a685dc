// Authorization matrix: steps x users booleans, 0-based on both axes

use serde::{Deserialize, Serialize};

use super::errors::ValidationError;

/// Which users may perform which steps. Row `s` holds one flag per user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<bool>>", into = "Vec<Vec<bool>>")]
pub struct AuthorizationMatrix {
    rows: Vec<Vec<bool>>,
}

impl AuthorizationMatrix {
    /// A matrix with nobody authorized for anything
    pub fn new(steps: usize, users: usize) -> Self {
        Self {
            rows: vec![vec![false; users]; steps],
        }
    }

    /// Build from explicit rows. Every row must have the same width.
    pub fn from_rows(rows: Vec<Vec<bool>>) -> Result<Self, ValidationError> {
        let users = rows.first().map_or(0, Vec::len);
        if let Some(ragged) = rows.iter().find(|row| row.len() != users) {
            return Err(ValidationError::MatrixShape {
                expected_steps: rows.len(),
                expected_users: users,
                actual_steps: rows.len(),
                actual_users: ragged.len(),
            });
        }
        Ok(Self { rows })
    }

    /// (steps, users)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows.len(), self.rows.first().map_or(0, Vec::len))
    }

    pub fn rows(&self) -> &[Vec<bool>] {
        &self.rows
    }

    pub fn get(&self, step: usize, user: usize) -> Option<bool> {
        self.rows.get(step).and_then(|row| row.get(user)).copied()
    }

    pub fn set(&mut self, step: usize, user: usize, value: bool) -> Result<(), ValidationError> {
        let cell = self.cell_mut(step, user)?;
        *cell = value;
        Ok(())
    }

    /// Flip one cell, returning its new value
    pub fn toggle(&mut self, step: usize, user: usize) -> Result<bool, ValidationError> {
        let cell = self.cell_mut(step, user)?;
        *cell = !*cell;
        Ok(*cell)
    }

    fn cell_mut(&mut self, step: usize, user: usize) -> Result<&mut bool, ValidationError> {
        let (steps, users) = self.dimensions();
        let row = self
            .rows
            .get_mut(step)
            .ok_or(ValidationError::StepOutOfRange { step, max_step: steps })?;
        row.get_mut(user)
            .ok_or(ValidationError::UserOutOfRange { user, max_user: users })
    }

    /// Copy the overlapping top-left block into a `new_steps` x `new_users`
    /// matrix. New rows and columns start unauthorized; anything outside the
    /// new bounds is dropped.
    pub fn resize(&self, new_steps: usize, new_users: usize) -> Self {
        let mut resized = Self::new(new_steps, new_users);
        for (target, source) in resized.rows.iter_mut().zip(&self.rows) {
            let keep = new_users.min(source.len());
            target[..keep].copy_from_slice(&source[..keep]);
        }
        resized
    }

    /// True iff every step has at least one authorized user
    pub fn is_complete(&self) -> bool {
        self.rows.iter().all(|row| row.iter().any(|&cell| cell))
    }

    /// 0-based steps that nobody may perform
    pub fn unauthorized_steps(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.iter().any(|&cell| cell))
            .map(|(step, _)| step)
            .collect()
    }
}

impl TryFrom<Vec<Vec<bool>>> for AuthorizationMatrix {
    type Error = ValidationError;

    fn try_from(rows: Vec<Vec<bool>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<AuthorizationMatrix> for Vec<Vec<bool>> {
    fn from(matrix: AuthorizationMatrix) -> Self {
        matrix.rows
    }
}

/// Functional form of [`AuthorizationMatrix::resize`]
pub fn resize(old: &AuthorizationMatrix, new_steps: usize, new_users: usize) -> AuthorizationMatrix {
    old.resize(new_steps, new_users)
}

/// Functional form of [`AuthorizationMatrix::is_complete`]
pub fn is_complete(matrix: &AuthorizationMatrix) -> bool {
    matrix.is_complete()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(steps: usize, users: usize) -> AuthorizationMatrix {
        AuthorizationMatrix::from_rows(vec![vec![true; users]; steps]).unwrap()
    }

    #[test]
    fn test_resize_preserves_overlap_and_drops_excess() {
        let resized = resize(&filled(3, 2), 2, 4);

        assert_eq!(resized.dimensions(), (2, 4));
        for step in 0..2 {
            assert_eq!(resized.get(step, 0), Some(true));
            assert_eq!(resized.get(step, 1), Some(true));
            assert_eq!(resized.get(step, 2), Some(false));
            assert_eq!(resized.get(step, 3), Some(false));
        }
        assert_eq!(resized.get(2, 0), None);
    }

    #[test]
    fn test_resize_growing_adds_unauthorized_rows() {
        let resized = filled(1, 1).resize(3, 2);
        assert_eq!(
            resized.rows(),
            &[vec![true, false], vec![false, false], vec![false, false]]
        );
    }

    #[test]
    fn test_is_complete_requires_every_row() {
        let mut matrix = filled(3, 3);
        assert!(is_complete(&matrix));

        for user in 0..3 {
            matrix.set(0, user, false).unwrap();
        }
        assert!(!is_complete(&matrix));
        assert_eq!(matrix.unauthorized_steps(), vec![0]);
    }

    #[test]
    fn test_cell_edits_are_bounds_checked() {
        let mut matrix = AuthorizationMatrix::new(2, 2);
        assert!(matrix.toggle(1, 1).unwrap());
        assert!(!matrix.toggle(1, 1).unwrap());
        assert_eq!(
            matrix.set(2, 0, true),
            Err(ValidationError::StepOutOfRange { step: 2, max_step: 2 })
        );
        assert_eq!(
            matrix.set(0, 5, true),
            Err(ValidationError::UserOutOfRange { user: 5, max_user: 2 })
        );
    }

    #[test]
    fn test_deserialize_validates_shape() {
        let matrix: AuthorizationMatrix = serde_json::from_str("[[true,false],[false,true]]").unwrap();
        assert_eq!(matrix.dimensions(), (2, 2));
        assert!(serde_json::from_str::<AuthorizationMatrix>("[[true],[false,true]]").is_err());
    }

    #[test]
    fn test_from_rows_rejects_ragged_input() {
        let ragged = vec![vec![true, false], vec![true]];
        assert!(matches!(
            AuthorizationMatrix::from_rows(ragged),
            Err(ValidationError::MatrixShape { actual_users: 1, .. })
        ));
    }
}
