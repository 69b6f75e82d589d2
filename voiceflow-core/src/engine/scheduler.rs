//! Deadline queue for deferred work.
//!
//! One queue serves command debounce, the keyword continuation window and the
//! force-end timeout. It never sleeps on its own: the owner asks for
//! `next_deadline()`, waits however it likes, then calls `pop_due(now)`.
//! Keeping time explicit makes the dispatcher fully deterministic in tests.

use std::collections::HashMap;
use std::time::Instant;

/// Identity of a deferred command execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingExecutionKey {
    pub key: String,
    pub end_word_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    Command(PendingExecutionKey),
    KeywordContinuation,
    ForceEndTimeout,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    at: Instant,
    /// Arming order, for ties.
    seq: u64,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    entries: HashMap<TimerKey, Entry>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `key` to fire at `at`. Returns `false` when `key` is already armed.
    pub fn schedule(&mut self, key: TimerKey, at: Instant) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.insert(key, at);
        true
    }

    /// Arm `key`, replacing any existing deadline.
    pub fn reschedule(&mut self, key: TimerKey, at: Instant) {
        self.insert(key, at);
    }

    fn insert(&mut self, key: TimerKey, at: Instant) {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.entries.insert(key, Entry { at, seq });
    }

    pub fn cancel_key(&mut self, key: &TimerKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every pending command execution.
    pub fn cancel_commands(&mut self) {
        self.entries
            .retain(|key, _| !matches!(key, TimerKey::Command(_)));
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|e| e.at).min()
    }

    /// Remove and return every timer due at `now`, earliest first (ties in
    /// scheduling order).
    pub fn pop_due(&mut self, now: Instant) -> Vec<TimerKey> {
        let mut due: Vec<(Instant, u64, TimerKey)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.at <= now)
            .map(|(k, e)| (e.at, e.seq, k.clone()))
            .collect();
        due.sort_by_key(|(at, seq, _)| (*at, *seq));
        for (_, _, key) in &due {
            self.entries.remove(key);
        }
        due.into_iter().map(|(_, _, key)| key).collect()
    }
}
