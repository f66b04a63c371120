//! Bounded in-memory status log
//!
//! The only channel through which device and voice components report
//! progress to the browser UI. Keeps the most recent 500 lines, exposes the
//! most recent 200.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Lines retained in memory
const CAPACITY: usize = 500;

/// Lines returned to external readers
const DUMP_LEN: usize = 200;

/// Shared, bounded log of human-readable status lines
#[derive(Clone)]
pub struct EventLog {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl EventLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(CAPACITY))),
        }
    }

    /// Append a line, evicting the oldest entries past capacity
    pub fn add(&self, msg: impl Into<String>) {
        let line = msg.into().trim().to_string();
        tracing::info!("{line}");

        if let Ok(mut lines) = self.lines.lock() {
            lines.push_back(line);
            while lines.len() > CAPACITY {
                lines.pop_front();
            }
        }
    }

    /// Most recent lines, oldest first
    #[must_use]
    pub fn dump(&self) -> Vec<String> {
        self.lines.lock().map_or_else(
            |_| Vec::new(),
            |lines| {
                let skip = lines.len().saturating_sub(DUMP_LEN);
                lines.iter().skip(skip).cloned().collect()
            },
        )
    }

    /// Number of retained lines
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.lock().map_or(0, |lines| lines.len())
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_returns_most_recent_200() {
        let log = EventLog::new();
        for i in 0..250 {
            log.add(format!("line {i}"));
        }

        let dump = log.dump();
        assert_eq!(dump.len(), 200);
        assert_eq!(dump.first().unwrap(), "line 50");
        assert_eq!(dump.last().unwrap(), "line 249");
    }

    #[test]
    fn capacity_evicts_oldest() {
        let log = EventLog::new();
        for i in 0..600 {
            log.add(format!("line {i}"));
        }

        assert_eq!(log.len(), 500);
        // Oldest retained line is 100; dump starts at 400
        assert_eq!(log.dump().first().unwrap(), "line 400");
    }

    #[test]
    fn add_trims_whitespace() {
        let log = EventLog::new();
        log.add("  padded  ");
        assert_eq!(log.dump(), vec!["padded".to_string()]);
    }
}
