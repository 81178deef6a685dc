// Bounded, newest-first log of solver responses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::solver::SolveResponse;

/// Default number of retained entries
pub const HISTORY_CAPACITY: usize = 100;

/// A solver response together with the moment the engine received it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub response: SolveResponse,
    pub received_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(response: SolveResponse) -> Self {
        Self {
            response,
            received_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolutionHistory {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

impl Default for SolutionHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl SolutionHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Insert at the front, evicting the oldest entry first when full
    pub fn append(&mut self, entry: HistoryEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(entry);
    }

    /// Newest first
    pub fn list(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// The most recent entry
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rebuild from a newest-first list, dropping anything past capacity
    pub(crate) fn from_entries(capacity: usize, entries: Vec<HistoryEntry>) -> Self {
        let mut history = Self::with_capacity(capacity);
        history
            .entries
            .extend(entries.into_iter().take(history.capacity));
        history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(n: usize) -> SolveResponse {
        SolveResponse {
            solution_found: true,
            assignment: vec![n as i64],
            solving_time_ms: 1.0,
            solver_used: "SAT".to_string(),
            message: format!("run {n}"),
            timestamp: None,
        }
    }

    #[test]
    fn test_append_evicts_oldest_at_capacity() {
        let mut history = SolutionHistory::default();
        for n in 1..=101 {
            history.append(HistoryEntry::new(response(n)));
        }

        assert_eq!(history.len(), 100);
        assert_eq!(history.current().unwrap().response.message, "run 101");
        assert!(history.list().all(|entry| entry.response.message != "run 1"));
        assert_eq!(history.list().last().unwrap().response.message, "run 2");
    }

    #[test]
    fn test_list_is_newest_first() {
        let mut history = SolutionHistory::with_capacity(3);
        for n in 1..=3 {
            history.append(HistoryEntry::new(response(n)));
        }
        let messages: Vec<_> = history.list().map(|e| e.response.message.as_str()).collect();
        assert_eq!(messages, vec!["run 3", "run 2", "run 1"]);
    }

    #[test]
    fn test_clear_empties_current() {
        let mut history = SolutionHistory::default();
        history.append(HistoryEntry::new(response(1)));
        history.clear();
        assert!(history.current().is_none());
        assert!(history.is_empty());
    }

    #[test]
    fn test_from_entries_truncates() {
        let entries = (1..=5).map(|n| HistoryEntry::new(response(n))).collect();
        let history = SolutionHistory::from_entries(2, entries);
        assert_eq!(history.len(), 2);
        assert_eq!(history.current().unwrap().response.message, "run 1");
    }
}
