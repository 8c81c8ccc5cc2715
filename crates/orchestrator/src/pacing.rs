use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Last-connection-attempt timestamp for diagnostic pacing. This is the
/// one piece of process-wide state the system keeps; it lives in an
/// explicit, thread-safe component instead of a bare global.
pub struct ConnectionPacer {
    last_attempt: Mutex<Option<Instant>>,
}

impl ConnectionPacer {
    pub fn new() -> Self {
        Self { last_attempt: Mutex::new(None) }
    }

    /// Mark a new connection attempt; returns the gap since the previous
    /// one, if there was one.
    pub fn note(&self) -> Option<Duration> {
        let mut last = self.last_attempt.lock().unwrap();
        let gap = last.map(|t| t.elapsed());
        *last = Some(Instant::now());
        gap
    }

    pub fn since_last(&self) -> Option<Duration> {
        self.last_attempt.lock().unwrap().map(|t| t.elapsed())
    }
}

impl Default for ConnectionPacer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_note_has_no_gap() {
        let pacer = ConnectionPacer::new();
        assert!(pacer.since_last().is_none());
        assert!(pacer.note().is_none());
        assert!(pacer.note().is_some());
        assert!(pacer.since_last().is_some());
    }
}
