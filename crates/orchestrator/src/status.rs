use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use courtbot_core::types::{RunStatus, StatusSnapshot};

/// Per-configuration run status, written only by the orchestrator.
/// Writes are ordered by attempt timestamp, not completion order: a
/// stale cancelled attempt finishing late can never clobber the status
/// a newer attempt already recorded.
pub struct StatusBoard {
    entries: DashMap<String, StatusSnapshot>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// Record a status for the given attempt. Returns false when the
    /// write was stale (a newer attempt owns the entry).
    pub fn record(&self, id: &str, attempt: DateTime<Utc>, status: RunStatus) -> bool {
        match self.entries.entry(id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if attempt < entry.attempt_started {
                    return false;
                }
                entry.status = status;
                entry.attempt_started = attempt;
                entry.updated_at = Utc::now();
                true
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StatusSnapshot {
                    id: id.to_string(),
                    status,
                    step: String::new(),
                    attempt_started: attempt,
                    updated_at: Utc::now(),
                });
                true
            }
        }
    }

    /// Record the flow's current human-readable step. Same staleness
    /// rule as `record`.
    pub fn record_step(&self, id: &str, attempt: DateTime<Utc>, step: &str) -> bool {
        let mut applied = false;
        if let Some(mut entry) = self.entries.get_mut(id) {
            if attempt >= entry.attempt_started {
                entry.step = step.to_string();
                entry.updated_at = Utc::now();
                applied = true;
            }
        }
        applied
    }

    pub fn get(&self, id: &str) -> Option<StatusSnapshot> {
        self.entries.get(id).map(|e| e.clone())
    }

    pub fn all(&self) -> Vec<StatusSnapshot> {
        self.entries.iter().map(|e| e.clone()).collect()
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn stale_attempt_cannot_clobber_newer_terminal_status() {
        let board = StatusBoard::new();
        let old_attempt = Utc::now() - Duration::seconds(30);
        let new_attempt = Utc::now();

        board.record("club-1", old_attempt, RunStatus::Running);
        board.record("club-1", new_attempt, RunStatus::Success);

        // The cancelled old attempt reports in late.
        let applied = board.record("club-1", old_attempt, RunStatus::Stopped);
        assert!(!applied);
        assert_eq!(board.get("club-1").unwrap().status, RunStatus::Success);
    }

    #[test]
    fn same_attempt_writes_progress_in_order() {
        let board = StatusBoard::new();
        let attempt = Utc::now();

        board.record("club-1", attempt, RunStatus::Running);
        board.record("club-1", attempt, RunStatus::Failed("slot gone".into()));

        assert_eq!(
            board.get("club-1").unwrap().status,
            RunStatus::Failed("slot gone".into())
        );
    }

    #[test]
    fn steps_follow_the_same_staleness_rule() {
        let board = StatusBoard::new();
        let old_attempt = Utc::now() - Duration::seconds(30);
        let new_attempt = Utc::now();

        board.record("club-1", new_attempt, RunStatus::Running);
        assert!(board.record_step("club-1", new_attempt, "selecting a time slot"));
        assert!(!board.record_step("club-1", old_attempt, "starting"));
        assert_eq!(board.get("club-1").unwrap().step, "selecting a time slot");
    }

    #[test]
    fn entries_are_independent_per_id() {
        let board = StatusBoard::new();
        let attempt = Utc::now();
        board.record("a", attempt, RunStatus::Success);
        board.record("b", attempt, RunStatus::Failed("x".into()));
        assert_eq!(board.all().len(), 2);
    }
}
