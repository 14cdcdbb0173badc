//! Bounded, rate-limited log of optimization suggestions

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// A short advisory generated when a threshold is crossed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    /// Issue category, e.g. `high_latency` or `error_timeout`
    pub kind: String,

    pub message: String,

    pub created_at: DateTime<Utc>,
}

/// Keeps the most recent suggestions, at most one per kind per cooldown
#[derive(Debug)]
pub(crate) struct SuggestionLog {
    entries: VecDeque<Suggestion>,
    last_emitted: HashMap<String, Instant>,
    capacity: usize,
    cooldown: Duration,
}

impl SuggestionLog {
    pub(crate) fn new(capacity: usize, cooldown: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            last_emitted: HashMap::new(),
            capacity: capacity.max(1),
            cooldown,
        }
    }

    /// Append a suggestion unless one of the same kind was added within the
    /// cooldown. Returns whether it was added.
    pub(crate) fn offer(&mut self, kind: &str, message: String, now: Instant) -> bool {
        let cooldown = self.cooldown;
        self.last_emitted
            .retain(|_, last| now.saturating_duration_since(*last) < cooldown);
        if self.last_emitted.contains_key(kind) {
            return false;
        }

        self.last_emitted.insert(kind.to_string(), now);
        self.entries.push_back(Suggestion {
            kind: kind.to_string(),
            message,
            created_at: Utc::now(),
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        true
    }

    pub(crate) fn to_vec(&self) -> Vec<Suggestion> {
        self.entries.iter().cloned().collect()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.last_emitted.clear();
    }
}
